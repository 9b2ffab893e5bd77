use crate::{
    Client, CommandResult, Reply, ReplyError, Store,
    bytes::{lex, parse},
    command::{Arity, Command, CommandKind},
    db::{ScoreBound, SortedSet},
    slice::slice,
};
use logos::Logos;
use ordered_float::NotNan;

#[derive(Clone, Copy, Debug, Eq, Hash, Logos, PartialEq)]
enum RangeOption {
    #[regex(b"(?i:withscores)")]
    Withscores,
}

/// Parse a score range limit: a float, `±inf`, or `(value` for exclusive.
fn score_bound(bytes: &[u8]) -> Result<ScoreBound, ReplyError> {
    match bytes {
        [b'(', rest @ ..] => parse(rest)
            .map(ScoreBound::Exclusive)
            .ok_or(ReplyError::Float),
        _ => parse(bytes).map(ScoreBound::Inclusive).ok_or(ReplyError::Float),
    }
}

fn score(client: &mut Client) -> Result<NotNan<f64>, ReplyError> {
    let value = client.request.f64()?;
    NotNan::new(value).map_err(|_| ReplyError::Float)
}

pub static ZADD: Command = Command {
    kind: CommandKind::Zadd,
    name: "zadd",
    arity: Arity::Minimum(4),
    run: zadd,
};

fn zadd(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    client.request.assert_pairs()?;

    // Parse every pair before mutating anything.
    let mut pairs = Vec::with_capacity(client.request.remaining() / 2);
    while !client.request.is_empty() {
        let score = score(client)?;
        let member = client.request.pop()?;
        pairs.push((member, score));
    }

    let set = store.db.sorted_set_or_default(&key)?;
    let mut added = 0;
    for (member, score) in pairs {
        if set.insert(member, score) {
            added += 1;
        }
    }

    store.touch(&key);
    client.reply(added);
    Ok(None)
}

pub static ZREM: Command = Command {
    kind: CommandKind::Zrem,
    name: "zrem",
    arity: Arity::Minimum(3),
    run: zrem,
};

fn zrem(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let Some(set) = store.db.mut_sorted_set(&key)? else {
        client.reply(0);
        return Ok(None);
    };

    let mut removed = 0;
    while !client.request.is_empty() {
        let member = client.request.pop()?;
        if set.remove(&member) {
            removed += 1;
        }
    }

    if set.is_empty() {
        store.db.remove(&key);
    }

    if removed > 0 {
        store.touch(&key);
    }
    client.reply(removed);
    Ok(None)
}

/// Pop an optional trailing WITHSCORES flag.
fn withscores(client: &mut Client) -> Result<bool, ReplyError> {
    match client.request.try_pop() {
        None => Ok(false),
        Some(flag) => match lex(&flag) {
            Some(RangeOption::Withscores) => {
                if client.request.is_empty() {
                    Ok(true)
                } else {
                    Err(ReplyError::Syntax)
                }
            }
            None => Err(ReplyError::Syntax),
        },
    }
}

pub static ZRANGE: Command = Command {
    kind: CommandKind::Zrange,
    name: "zrange",
    arity: Arity::Minimum(4),
    run: zrange,
};

fn zrange(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let start = client.request.i64()?;
    let stop = client.request.i64()?;
    let withscores = withscores(client)?;

    let Some(set) = store.db.get_sorted_set(&key)? else {
        client.reply(Reply::Array(0));
        return Ok(None);
    };

    let Some(range) = slice(set.len(), start, stop) else {
        client.reply(Reply::Array(0));
        return Ok(None);
    };

    let width = if withscores { 2 } else { 1 };
    client.reply(Reply::Array(range.len() * width));
    for (member, score) in set.iter().skip(range.start).take(range.len()) {
        client.reply(member);
        if withscores {
            client.reply(score);
        }
    }
    Ok(None)
}

pub static ZRANGEBYSCORE: Command = Command {
    kind: CommandKind::Zrangebyscore,
    name: "zrangebyscore",
    arity: Arity::Minimum(4),
    run: zrangebyscore,
};

fn zrangebyscore(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let min = score_bound(&client.request.pop()?)?;
    let max = score_bound(&client.request.pop()?)?;
    let withscores = withscores(client)?;

    let Some(set) = store.db.get_sorted_set(&key)? else {
        client.reply(Reply::Array(0));
        return Ok(None);
    };

    let members: Vec<_> = set.range_by_score(min, max).collect();
    let width = if withscores { 2 } else { 1 };
    client.reply(Reply::Array(members.len() * width));
    for (member, score) in members {
        client.reply(member);
        if withscores {
            client.reply(score);
        }
    }
    Ok(None)
}

pub static ZSCORE: Command = Command {
    kind: CommandKind::Zscore,
    name: "zscore",
    arity: Arity::Exact(3),
    run: zscore,
};

fn zscore(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let member = client.request.pop()?;
    let Some(set) = store.db.get_sorted_set(&key)? else {
        client.reply(Reply::Nil);
        return Ok(None);
    };
    client.reply(set.score(&member));
    Ok(None)
}

pub static ZINCRBY: Command = Command {
    kind: CommandKind::Zincrby,
    name: "zincrby",
    arity: Arity::Exact(4),
    run: zincrby,
};

fn zincrby(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let by = client.request.f64()?;
    let member = client.request.pop()?;

    let set = store.db.sorted_set_or_default(&key)?;
    let score = set.increment(member, by).ok_or(ReplyError::ZaddNan)?;

    store.touch(&key);
    client.reply(score);
    Ok(None)
}

pub static ZCARD: Command = Command {
    kind: CommandKind::Zcard,
    name: "zcard",
    arity: Arity::Exact(2),
    run: zcard,
};

fn zcard(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let len = store.db.get_sorted_set(&key)?.map_or(0, SortedSet::len);
    client.reply(len);
    Ok(None)
}

pub static ZCOUNT: Command = Command {
    kind: CommandKind::Zcount,
    name: "zcount",
    arity: Arity::Exact(4),
    run: zcount,
};

fn zcount(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let min = score_bound(&client.request.pop()?)?;
    let max = score_bound(&client.request.pop()?)?;

    let count = store
        .db
        .get_sorted_set(&key)?
        .map_or(0, |set| set.count(min, max));
    client.reply(count);
    Ok(None)
}

pub static ZRANK: Command = Command {
    kind: CommandKind::Zrank,
    name: "zrank",
    arity: Arity::Exact(3),
    run: zrank,
};

fn zrank(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let member = client.request.pop()?;
    let rank = store
        .db
        .get_sorted_set(&key)?
        .and_then(|set| set.rank(&member));
    client.reply(rank.map(|rank| rank as i64));
    Ok(None)
}

pub static ZREVRANK: Command = Command {
    kind: CommandKind::Zrevrank,
    name: "zrevrank",
    arity: Arity::Exact(3),
    run: zrevrank,
};

fn zrevrank(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let member = client.request.pop()?;
    let rank = store
        .db
        .get_sorted_set(&key)?
        .and_then(|set| set.rank(&member).map(|rank| set.len() - 1 - rank));
    client.reply(rank.map(|rank| rank as i64));
    Ok(None)
}

pub static ZREMRANGEBYSCORE: Command = Command {
    kind: CommandKind::Zremrangebyscore,
    name: "zremrangebyscore",
    arity: Arity::Exact(4),
    run: zremrangebyscore,
};

fn zremrangebyscore(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let min = score_bound(&client.request.pop()?)?;
    let max = score_bound(&client.request.pop()?)?;

    let Some(set) = store.db.mut_sorted_set(&key)? else {
        client.reply(0);
        return Ok(None);
    };

    let removed = set.remove_range_by_score(min, max);
    if set.is_empty() {
        store.db.remove(&key);
    }

    if removed > 0 {
        store.touch(&key);
    }
    client.reply(removed);
    Ok(None)
}
