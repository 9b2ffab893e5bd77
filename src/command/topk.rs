use crate::{
    Client, CommandResult, Reply, ReplyError, Store,
    bytes::lex,
    command::{Arity, Command, CommandKind},
    db::{TopK, Value},
};
use logos::Logos;

/// Fetch a mutable sketch, or the error for a missing key.
fn topk<'a>(store: &'a mut Store, key: &[u8]) -> Result<&'a mut TopK, Reply> {
    let Some(value) = store.db.get_mut(key) else {
        return Err(ReplyError::NoSuchKey.into());
    };
    Ok(value.mut_topk()?)
}

pub static TOPK_RESERVE: Command = Command {
    kind: CommandKind::TopkReserve,
    name: "topk.reserve",
    arity: Arity::Minimum(3),
    run: topk_reserve,
};

fn topk_reserve(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let k = client.request.usize()?;

    let (width, depth, decay) = if client.request.is_empty() {
        (TopK::DEFAULT_WIDTH, TopK::DEFAULT_DEPTH, TopK::DEFAULT_DECAY)
    } else {
        let width = client.request.usize()?;
        let depth = client.request.usize()?;
        let decay = client.request.f64()?;
        if !client.request.is_empty() {
            return Err(client.request.wrong_arguments().into());
        }
        (width, depth, decay)
    };

    if k == 0 || width == 0 || depth == 0 || !(0.0..=1.0).contains(&decay) || decay == 0.0 {
        return Err(ReplyError::Syntax.into());
    }
    if store.db.exists(&key) {
        return Err(ReplyError::ItemExists.into());
    }

    store.db.set(&key, Value::from(TopK::new(k, width, depth, decay)));
    store.touch(&key);
    client.reply("OK");
    Ok(None)
}

pub static TOPK_ADD: Command = Command {
    kind: CommandKind::TopkAdd,
    name: "topk.add",
    arity: Arity::Minimum(3),
    run: topk_add,
};

fn topk_add(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;

    let mut items = Vec::with_capacity(client.request.remaining());
    while !client.request.is_empty() {
        items.push(client.request.pop()?);
    }

    let sketch = topk(store, &key)?;
    let evicted: Vec<_> = items.iter().map(|item| sketch.add(item, 1)).collect();

    store.touch(&key);
    client.reply(Reply::Array(evicted.len()));
    for dropped in evicted {
        client.reply(dropped);
    }
    Ok(None)
}

pub static TOPK_INCRBY: Command = Command {
    kind: CommandKind::TopkIncrby,
    name: "topk.incrby",
    arity: Arity::Minimum(4),
    run: topk_incrby,
};

fn topk_incrby(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    client.request.assert_pairs()?;

    let mut pairs = Vec::with_capacity(client.request.remaining() / 2);
    while !client.request.is_empty() {
        let item = client.request.pop()?;
        let increment = client.request.u64()?;
        pairs.push((item, increment));
    }

    let sketch = topk(store, &key)?;
    let evicted: Vec<_> = pairs
        .iter()
        .map(|(item, increment)| sketch.add(item, *increment))
        .collect();

    store.touch(&key);
    client.reply(Reply::Array(evicted.len()));
    for dropped in evicted {
        client.reply(dropped);
    }
    Ok(None)
}

pub static TOPK_QUERY: Command = Command {
    kind: CommandKind::TopkQuery,
    name: "topk.query",
    arity: Arity::Minimum(3),
    run: topk_query,
};

fn topk_query(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let sketch = topk(store, &key)?;

    let mut results = Vec::with_capacity(client.request.remaining());
    while !client.request.is_empty() {
        let item = client.request.pop()?;
        results.push(sketch.query(&item));
    }

    client.reply(Reply::Array(results.len()));
    for found in results {
        client.reply(i64::from(found));
    }
    Ok(None)
}

pub static TOPK_COUNT: Command = Command {
    kind: CommandKind::TopkCount,
    name: "topk.count",
    arity: Arity::Minimum(3),
    run: topk_count,
};

fn topk_count(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let sketch = topk(store, &key)?;

    let mut counts = Vec::with_capacity(client.request.remaining());
    while !client.request.is_empty() {
        let item = client.request.pop()?;
        counts.push(sketch.count(&item));
    }

    client.reply(Reply::Array(counts.len()));
    for count in counts {
        client.reply(count as i64);
    }
    Ok(None)
}

#[derive(Clone, Copy, Debug, Eq, Hash, Logos, PartialEq)]
enum ListOption {
    #[regex(b"(?i:withcount)")]
    Withcount,
}

pub static TOPK_LIST: Command = Command {
    kind: CommandKind::TopkList,
    name: "topk.list",
    arity: Arity::Minimum(2),
    run: topk_list,
};

fn topk_list(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;

    let withcount = match client.request.try_pop() {
        None => false,
        Some(flag) => match lex(&flag) {
            Some(ListOption::Withcount) if client.request.is_empty() => true,
            _ => return Err(ReplyError::Syntax.into()),
        },
    };

    let items = topk(store, &key)?.list();

    let width = if withcount { 2 } else { 1 };
    client.reply(Reply::Array(items.len() * width));
    for (item, count) in items {
        client.reply(item);
        if withcount {
            client.reply(count as i64);
        }
    }
    Ok(None)
}

pub static TOPK_INFO: Command = Command {
    kind: CommandKind::TopkInfo,
    name: "topk.info",
    arity: Arity::Exact(2),
    run: topk_info,
};

fn topk_info(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let sketch = topk(store, &key)?;

    let (k, width, depth, decay) = (sketch.k(), sketch.width(), sketch.depth(), sketch.decay());

    client.reply(Reply::Array(8));
    client.bulk("k");
    client.reply(k);
    client.bulk("width");
    client.reply(width);
    client.bulk("depth");
    client.reply(depth);
    client.bulk("decay");
    client.reply(decay);
    Ok(None)
}
