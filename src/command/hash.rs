use crate::{
    Client, CommandResult, Reply, Store,
    command::{Arity, Command, CommandKind},
};

pub static HSET: Command = Command {
    kind: CommandKind::Hset,
    name: "hset",
    arity: Arity::Minimum(4),
    run: hset,
};

fn hset(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    client.request.assert_pairs()?;

    let hash = store.db.hash_or_default(&key)?;
    let mut created = 0;

    while !client.request.is_empty() {
        let field = client.request.pop()?;
        let value = client.request.pop()?;
        if hash.set(field, value) {
            created += 1;
        }
    }

    store.touch(&key);
    client.reply(created);
    Ok(None)
}

pub static HGET: Command = Command {
    kind: CommandKind::Hget,
    name: "hget",
    arity: Arity::Exact(3),
    run: hget,
};

fn hget(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let field = client.request.pop()?;
    let hash = store.db.get_hash(&key)?.ok_or(Reply::Nil)?;
    client.reply(hash.get(&field).cloned());
    Ok(None)
}

pub static HDEL: Command = Command {
    kind: CommandKind::Hdel,
    name: "hdel",
    arity: Arity::Minimum(3),
    run: hdel,
};

fn hdel(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let Some(hash) = store.db.mut_hash(&key)? else {
        client.reply(0);
        return Ok(None);
    };

    let mut removed = 0;
    while !client.request.is_empty() {
        let field = client.request.pop()?;
        if hash.remove(&field) {
            removed += 1;
        }
    }

    // An emptied hash disappears.
    if hash.is_empty() {
        store.db.remove(&key);
    }

    if removed > 0 {
        store.touch(&key);
    }
    client.reply(removed);
    Ok(None)
}

pub static HGETALL: Command = Command {
    kind: CommandKind::Hgetall,
    name: "hgetall",
    arity: Arity::Exact(2),
    run: hgetall,
};

fn hgetall(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let Some(hash) = store.db.get_hash(&key)? else {
        client.reply(Reply::Array(0));
        return Ok(None);
    };

    client.reply(Reply::Array(2 * hash.len()));
    for (field, value) in hash.iter() {
        client.reply(field);
        client.reply(value);
    }
    Ok(None)
}
