use crate::{
    Client, CommandResult, Reply, ReplyError, Store,
    bytes::lex,
    command::{Arity, Command, CommandKind},
    db::Value,
    epoch,
};
use bytes::Bytes;
use logos::Logos;

pub static GET: Command = Command {
    kind: CommandKind::Get,
    name: "get",
    arity: Arity::Exact(2),
    run: get,
};

fn get(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let value = store.db.get_string(&key)?.ok_or(Reply::Nil)?;
    client.reply(value);
    Ok(None)
}

pub static SET: Command = Command {
    kind: CommandKind::Set,
    name: "set",
    arity: Arity::Minimum(3),
    run: set,
};

#[derive(Debug, Default, Eq, PartialEq)]
enum Ttl {
    Ex(u64),
    #[default]
    None,
    Px(u64),
}

#[derive(Clone, Copy, Debug, Eq, Hash, Logos, PartialEq)]
enum SetOption {
    #[regex(b"(?i:ex)")]
    Ex,

    #[regex(b"(?i:px)")]
    Px,

    #[regex(b"(?i:nx)")]
    Nx,

    #[regex(b"(?i:xx)")]
    Xx,
}

fn set(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let value = client.request.pop()?;
    let mut ttl = Ttl::None;
    let mut exists = None;

    while !client.request.is_empty() {
        let Some(option) = lex(&client.request.pop()?[..]) else {
            return Err(ReplyError::Syntax.into());
        };

        use SetOption::*;
        match option {
            Ex if ttl == Ttl::None => {
                ttl = Ttl::Ex(client.request.u64()?);
            }
            Px if ttl == Ttl::None => {
                ttl = Ttl::Px(client.request.u64()?);
            }
            Nx if exists.is_none() => {
                exists = Some(false);
            }
            Xx if exists.is_none() => {
                exists = Some(true);
            }
            _ => return Err(ReplyError::Syntax.into()),
        }
    }

    // The condition gates every effect, including the TTL.
    match exists {
        Some(required) if store.db.exists(&key) != required => return Err(Reply::Nil),
        _ => {}
    }

    match ttl {
        Ttl::None => store.db.set(&key, value),
        Ttl::Ex(seconds) => {
            let at = epoch().as_millis() + u128::from(seconds) * 1000;
            store.db.setex(&key, value, at)
        }
        Ttl::Px(millis) => {
            let at = epoch().as_millis() + u128::from(millis);
            store.db.setex(&key, value, at)
        }
    };

    store.touch(&key);
    client.reply("OK");
    Ok(None)
}

pub static MGET: Command = Command {
    kind: CommandKind::Mget,
    name: "mget",
    arity: Arity::Minimum(2),
    run: mget,
};

fn mget(client: &mut Client, store: &mut Store) -> CommandResult {
    client.reply(Reply::Array(client.request.remaining()));

    while !client.request.is_empty() {
        let key = client.request.pop()?;
        let value = store.db.get_string(&key).ok().flatten();
        client.reply(value);
    }

    Ok(None)
}

pub static MSET: Command = Command {
    kind: CommandKind::Mset,
    name: "mset",
    arity: Arity::Minimum(3),
    run: mset,
};

fn mset(client: &mut Client, store: &mut Store) -> CommandResult {
    client.request.assert_pairs()?;

    while !client.request.is_empty() {
        let key = client.request.pop()?;
        let value = client.request.pop()?;
        store.db.set(&key, value);
        store.touch(&key);
    }

    client.reply("OK");
    Ok(None)
}

pub static INCR: Command = Command {
    kind: CommandKind::Incr,
    name: "incr",
    arity: Arity::Exact(2),
    run: incr,
};

fn incr(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    increment(client, store, key, 1)
}

pub static DECR: Command = Command {
    kind: CommandKind::Decr,
    name: "decr",
    arity: Arity::Exact(2),
    run: decr,
};

fn decr(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    increment(client, store, key, -1)
}

pub static INCRBY: Command = Command {
    kind: CommandKind::Incrby,
    name: "incrby",
    arity: Arity::Exact(3),
    run: incrby,
};

fn incrby(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let by = client.request.i64()?;
    increment(client, store, key, by)
}

pub static DECRBY: Command = Command {
    kind: CommandKind::Decrby,
    name: "decrby",
    arity: Arity::Exact(3),
    run: decrby,
};

fn decrby(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let by = client.request.i64()?.checked_neg().ok_or(ReplyError::Integer)?;
    increment(client, store, key, by)
}

fn increment(client: &mut Client, store: &mut Store, key: Bytes, by: i64) -> CommandResult {
    let value = store
        .db
        .entry_or_insert_with(&key, || Value::from(0i64))
        .mut_string()?;

    let sum = value
        .integer()
        .ok_or(ReplyError::Integer)?
        .checked_add(by)
        .ok_or(ReplyError::Integer)?;

    value.set_integer(sum);
    client.reply(sum);

    store.touch(&key);
    Ok(None)
}
