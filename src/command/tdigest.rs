use crate::{
    Client, CommandResult, Reply, ReplyError, Store,
    bytes::lex,
    command::{Arity, Command, CommandKind},
    db::{TDigest, Value},
};
use logos::Logos;

#[derive(Clone, Copy, Debug, Eq, Hash, Logos, PartialEq)]
enum CompressionOption {
    #[regex(b"(?i:compression)")]
    Compression,
}

/// Fetch a mutable digest, or the error for a missing key.
fn digest<'a>(store: &'a mut Store, key: &[u8]) -> Result<&'a mut TDigest, Reply> {
    let Some(value) = store.db.get_mut(key) else {
        return Err(ReplyError::NoSuchKey.into());
    };
    Ok(value.mut_tdigest()?)
}

pub static TDIGEST_CREATE: Command = Command {
    kind: CommandKind::TdigestCreate,
    name: "tdigest.create",
    arity: Arity::Minimum(2),
    run: tdigest_create,
};

fn tdigest_create(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;

    let compression = match client.request.try_pop() {
        None => TDigest::DEFAULT_COMPRESSION,
        Some(flag) => match lex(&flag) {
            Some(CompressionOption::Compression) => {
                let compression = client.request.usize()?;
                if compression == 0 || !client.request.is_empty() {
                    return Err(ReplyError::Syntax.into());
                }
                compression
            }
            None => return Err(ReplyError::Syntax.into()),
        },
    };

    if store.db.exists(&key) {
        return Err(ReplyError::ItemExists.into());
    }

    store.db.set(&key, Value::from(TDigest::new(compression)));
    store.touch(&key);
    client.reply("OK");
    Ok(None)
}

pub static TDIGEST_RESET: Command = Command {
    kind: CommandKind::TdigestReset,
    name: "tdigest.reset",
    arity: Arity::Exact(2),
    run: tdigest_reset,
};

fn tdigest_reset(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    digest(store, &key)?.reset();
    store.touch(&key);
    client.reply("OK");
    Ok(None)
}

pub static TDIGEST_ADD: Command = Command {
    kind: CommandKind::TdigestAdd,
    name: "tdigest.add",
    arity: Arity::Minimum(3),
    run: tdigest_add,
};

fn tdigest_add(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;

    let mut values = Vec::with_capacity(client.request.remaining());
    while !client.request.is_empty() {
        values.push(client.request.finite_f64()?);
    }

    let digest = digest(store, &key)?;
    for value in values {
        digest.add(value);
    }

    store.touch(&key);
    client.reply("OK");
    Ok(None)
}

/// Run one query per remaining argument and reply with the results.
fn for_each_value(
    client: &mut Client,
    store: &mut Store,
    query: fn(&mut TDigest, f64) -> Reply,
) -> CommandResult {
    let key = client.request.pop()?;

    let mut values = Vec::with_capacity(client.request.remaining());
    while !client.request.is_empty() {
        values.push(client.request.f64()?);
    }

    let digest = digest(store, &key)?;
    let results: Vec<Reply> = values.into_iter().map(|value| query(digest, value)).collect();

    client.reply(Reply::Array(results.len()));
    for result in results {
        client.reply(result);
    }
    Ok(None)
}

pub static TDIGEST_QUANTILE: Command = Command {
    kind: CommandKind::TdigestQuantile,
    name: "tdigest.quantile",
    arity: Arity::Minimum(3),
    run: tdigest_quantile,
};

fn tdigest_quantile(client: &mut Client, store: &mut Store) -> CommandResult {
    for_each_value(client, store, |digest, q| digest.quantile(q).into())
}

pub static TDIGEST_CDF: Command = Command {
    kind: CommandKind::TdigestCdf,
    name: "tdigest.cdf",
    arity: Arity::Minimum(3),
    run: tdigest_cdf,
};

fn tdigest_cdf(client: &mut Client, store: &mut Store) -> CommandResult {
    for_each_value(client, store, |digest, value| digest.cdf(value).into())
}

pub static TDIGEST_RANK: Command = Command {
    kind: CommandKind::TdigestRank,
    name: "tdigest.rank",
    arity: Arity::Minimum(3),
    run: tdigest_rank,
};

fn tdigest_rank(client: &mut Client, store: &mut Store) -> CommandResult {
    for_each_value(client, store, |digest, value| digest.rank(value).into())
}

pub static TDIGEST_REVRANK: Command = Command {
    kind: CommandKind::TdigestRevrank,
    name: "tdigest.revrank",
    arity: Arity::Minimum(3),
    run: tdigest_revrank,
};

fn tdigest_revrank(client: &mut Client, store: &mut Store) -> CommandResult {
    for_each_value(client, store, |digest, value| digest.revrank(value).into())
}

/// Run one query per remaining rank argument.
fn for_each_rank(
    client: &mut Client,
    store: &mut Store,
    query: fn(&mut TDigest, u64) -> Reply,
) -> CommandResult {
    let key = client.request.pop()?;

    let mut ranks = Vec::with_capacity(client.request.remaining());
    while !client.request.is_empty() {
        ranks.push(client.request.u64()?);
    }

    let digest = digest(store, &key)?;
    let results: Vec<Reply> = ranks.into_iter().map(|rank| query(digest, rank)).collect();

    client.reply(Reply::Array(results.len()));
    for result in results {
        client.reply(result);
    }
    Ok(None)
}

pub static TDIGEST_BYRANK: Command = Command {
    kind: CommandKind::TdigestByrank,
    name: "tdigest.byrank",
    arity: Arity::Minimum(3),
    run: tdigest_byrank,
};

fn tdigest_byrank(client: &mut Client, store: &mut Store) -> CommandResult {
    for_each_rank(client, store, |digest, rank| digest.by_rank(rank).into())
}

pub static TDIGEST_BYREVRANK: Command = Command {
    kind: CommandKind::TdigestByrevrank,
    name: "tdigest.byrevrank",
    arity: Arity::Minimum(3),
    run: tdigest_byrevrank,
};

fn tdigest_byrevrank(client: &mut Client, store: &mut Store) -> CommandResult {
    for_each_rank(client, store, |digest, rank| digest.by_revrank(rank).into())
}

pub static TDIGEST_TRIMMED_MEAN: Command = Command {
    kind: CommandKind::TdigestTrimmedMean,
    name: "tdigest.trimmed_mean",
    arity: Arity::Exact(4),
    run: tdigest_trimmed_mean,
};

fn tdigest_trimmed_mean(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let lo = client.request.f64()?;
    let hi = client.request.f64()?;

    if !(0.0..=1.0).contains(&lo) || !(0.0..=1.0).contains(&hi) {
        return Err(ReplyError::Float.into());
    }

    let mean = digest(store, &key)?.trimmed_mean(lo, hi);
    client.reply(mean);
    Ok(None)
}

pub static TDIGEST_MIN: Command = Command {
    kind: CommandKind::TdigestMin,
    name: "tdigest.min",
    arity: Arity::Exact(2),
    run: tdigest_min,
};

fn tdigest_min(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let min = digest(store, &key)?.min();
    client.reply(min);
    Ok(None)
}

pub static TDIGEST_MAX: Command = Command {
    kind: CommandKind::TdigestMax,
    name: "tdigest.max",
    arity: Arity::Exact(2),
    run: tdigest_max,
};

fn tdigest_max(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let max = digest(store, &key)?.max();
    client.reply(max);
    Ok(None)
}

pub static TDIGEST_INFO: Command = Command {
    kind: CommandKind::TdigestInfo,
    name: "tdigest.info",
    arity: Arity::Exact(2),
    run: tdigest_info,
};

fn tdigest_info(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let digest = digest(store, &key)?;

    let compression = digest.compression();
    let merged = digest.merged_nodes();
    let unmerged = digest.unmerged_nodes();
    let observations = digest.count();

    client.reply(Reply::Array(8));
    client.bulk("Compression");
    client.reply(compression);
    client.bulk("Merged nodes");
    client.reply(merged);
    client.bulk("Unmerged nodes");
    client.reply(unmerged);
    client.bulk("Observations");
    client.reply(observations as i64);
    Ok(None)
}
