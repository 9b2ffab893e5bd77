use crate::{
    Client, CommandResult, Reply, ReplyError, Store,
    command::{Arity, Command, CommandKind},
    db::List,
    slice::slice,
};

/// The left or right edge of a list.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Edge {
    Left,
    Right,
}

pub static LPUSH: Command = Command {
    kind: CommandKind::Lpush,
    name: "lpush",
    arity: Arity::Minimum(3),
    run: lpush,
};

fn lpush(client: &mut Client, store: &mut Store) -> CommandResult {
    push(client, store, Edge::Left)
}

pub static RPUSH: Command = Command {
    kind: CommandKind::Rpush,
    name: "rpush",
    arity: Arity::Minimum(3),
    run: rpush,
};

fn rpush(client: &mut Client, store: &mut Store) -> CommandResult {
    push(client, store, Edge::Right)
}

fn push(client: &mut Client, store: &mut Store, edge: Edge) -> CommandResult {
    let key = client.request.pop()?;
    let list = store.db.list_or_default(&key)?;

    while !client.request.is_empty() {
        let item = client.request.pop()?;
        match edge {
            Edge::Left => list.push_front(item),
            Edge::Right => list.push_back(item),
        }
    }

    let len = list.len();
    store.touch(&key);
    client.reply(len);
    Ok(None)
}

pub static LPOP: Command = Command {
    kind: CommandKind::Lpop,
    name: "lpop",
    arity: Arity::Exact(2),
    run: lpop,
};

fn lpop(client: &mut Client, store: &mut Store) -> CommandResult {
    pop(client, store, Edge::Left)
}

pub static RPOP: Command = Command {
    kind: CommandKind::Rpop,
    name: "rpop",
    arity: Arity::Exact(2),
    run: rpop,
};

fn rpop(client: &mut Client, store: &mut Store) -> CommandResult {
    pop(client, store, Edge::Right)
}

fn pop(client: &mut Client, store: &mut Store, edge: Edge) -> CommandResult {
    let key = client.request.pop()?;
    let Some(list) = store.db.mut_list(&key)? else {
        client.reply(Reply::Nil);
        return Ok(None);
    };

    let item = match edge {
        Edge::Left => list.pop_front(),
        Edge::Right => list.pop_back(),
    };

    if list.is_empty() {
        store.db.remove(&key);
    }

    store.touch(&key);
    client.reply(item);
    Ok(None)
}

pub static LRANGE: Command = Command {
    kind: CommandKind::Lrange,
    name: "lrange",
    arity: Arity::Exact(4),
    run: lrange,
};

fn lrange(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let start = client.request.i64()?;
    let stop = client.request.i64()?;

    let Some(list) = store.db.get_list(&key)? else {
        client.reply(Reply::Array(0));
        return Ok(None);
    };

    let Some(range) = slice(list.len(), start, stop) else {
        client.reply(Reply::Array(0));
        return Ok(None);
    };

    client.array(list.range(range));
    Ok(None)
}

pub static LLEN: Command = Command {
    kind: CommandKind::Llen,
    name: "llen",
    arity: Arity::Exact(2),
    run: llen,
};

fn llen(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let len = store.db.get_list(&key)?.map_or(0, List::len);
    client.reply(len);
    Ok(None)
}

pub static LINDEX: Command = Command {
    kind: CommandKind::Lindex,
    name: "lindex",
    arity: Arity::Exact(3),
    run: lindex,
};

/// Resolve a possibly negative index against a length.
fn resolve(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let index = if index < 0 { index + len } else { index };
    if (0..len).contains(&index) {
        usize::try_from(index).ok()
    } else {
        None
    }
}

fn lindex(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let index = client.request.i64()?;

    let Some(list) = store.db.get_list(&key)? else {
        client.reply(Reply::Nil);
        return Ok(None);
    };

    let item = resolve(index, list.len()).and_then(|index| list.get(index));
    client.reply(item.cloned());
    Ok(None)
}

pub static LSET: Command = Command {
    kind: CommandKind::Lset,
    name: "lset",
    arity: Arity::Exact(4),
    run: lset,
};

fn lset(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let index = client.request.i64()?;
    let item = client.request.pop()?;

    let Some(list) = store.db.mut_list(&key)? else {
        return Err(ReplyError::NoSuchKey.into());
    };

    let Some(index) = resolve(index, list.len()) else {
        return Err(ReplyError::IndexOutOfRange.into());
    };

    list.set(index, item);
    store.touch(&key);
    client.reply("OK");
    Ok(None)
}

pub static LTRIM: Command = Command {
    kind: CommandKind::Ltrim,
    name: "ltrim",
    arity: Arity::Exact(4),
    run: ltrim,
};

fn ltrim(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let start = client.request.i64()?;
    let stop = client.request.i64()?;

    if let Some(list) = store.db.mut_list(&key)? {
        list.trim(slice(list.len(), start, stop));
        if list.is_empty() {
            store.db.remove(&key);
        }
        store.touch(&key);
    }

    client.reply("OK");
    Ok(None)
}
