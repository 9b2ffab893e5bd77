use crate::{
    Client, CommandResult, Reply, Store,
    command::{Arity, Command, CommandKind},
    db::Set,
};

pub static SADD: Command = Command {
    kind: CommandKind::Sadd,
    name: "sadd",
    arity: Arity::Minimum(3),
    run: sadd,
};

fn sadd(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let set = store.db.set_or_default(&key)?;

    let mut added = 0;
    while !client.request.is_empty() {
        let member = client.request.pop()?;
        if set.add(member) {
            added += 1;
        }
    }

    store.touch(&key);
    client.reply(added);
    Ok(None)
}

pub static SREM: Command = Command {
    kind: CommandKind::Srem,
    name: "srem",
    arity: Arity::Minimum(3),
    run: srem,
};

fn srem(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let Some(set) = store.db.mut_set(&key)? else {
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

pub static SMEMBERS: Command = Command {
    kind: CommandKind::Smembers,
    name: "smembers",
    arity: Arity::Exact(2),
    run: smembers,
};

fn smembers(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let Some(set) = store.db.get_set(&key)? else {
        client.reply(Reply::Array(0));
        return Ok(None);
    };

    client.array(set.iter());
    Ok(None)
}

pub static SCARD: Command = Command {
    kind: CommandKind::Scard,
    name: "scard",
    arity: Arity::Exact(2),
    run: scard,
};

fn scard(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let len = store.db.get_set(&key)?.map_or(0, Set::len);
    client.reply(len);
    Ok(None)
}
