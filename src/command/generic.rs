use crate::{
    Client, CommandResult, Reply, Store,
    command::{Arity, Command, CommandKind},
    epoch,
};

pub static PING: Command = Command {
    kind: CommandKind::Ping,
    name: "ping",
    arity: Arity::Minimum(1),
    run: ping,
};

fn ping(client: &mut Client, _: &mut Store) -> CommandResult {
    match client.request.remaining() {
        0 => client.reply("PONG"),
        1 => {
            let message = client.request.pop()?;
            client.reply(message);
        }
        _ => return Err(client.request.wrong_arguments().into()),
    }
    Ok(None)
}

pub static ECHO: Command = Command {
    kind: CommandKind::Echo,
    name: "echo",
    arity: Arity::Exact(2),
    run: echo,
};

fn echo(client: &mut Client, _: &mut Store) -> CommandResult {
    let message = client.request.pop()?;
    client.reply(message);
    Ok(None)
}

pub static QUIT: Command = Command {
    kind: CommandKind::Quit,
    name: "quit",
    arity: Arity::Exact(1),
    run: quit,
};

fn quit(client: &mut Client, _: &mut Store) -> CommandResult {
    client.reply("OK");
    client.quit();
    Ok(None)
}

pub static DEL: Command = Command {
    kind: CommandKind::Del,
    name: "del",
    arity: Arity::Minimum(2),
    run: del,
};

fn del(client: &mut Client, store: &mut Store) -> CommandResult {
    let mut count = 0;
    while !client.request.is_empty() {
        let key = client.request.pop()?;
        if store.db.remove(&key).is_some() {
            count += 1;
            store.touch(&key);
        }
    }
    client.reply(count);
    Ok(None)
}

pub static EXISTS: Command = Command {
    kind: CommandKind::Exists,
    name: "exists",
    arity: Arity::Minimum(2),
    run: exists,
};

fn exists(client: &mut Client, store: &mut Store) -> CommandResult {
    let mut count = 0;
    while !client.request.is_empty() {
        let key = client.request.pop()?;
        if store.db.exists(&key) {
            count += 1;
        }
    }
    client.reply(count);
    Ok(None)
}

pub static EXPIRE: Command = Command {
    kind: CommandKind::Expire,
    name: "expire",
    arity: Arity::Exact(3),
    run: expire,
};

fn expire(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let seconds = client.request.i64()?;
    set_expiration(client, store, &key, seconds.saturating_mul(1000))
}

pub static PEXPIRE: Command = Command {
    kind: CommandKind::Pexpire,
    name: "pexpire",
    arity: Arity::Exact(3),
    run: pexpire,
};

fn pexpire(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let millis = client.request.i64()?;
    set_expiration(client, store, &key, millis)
}

fn set_expiration(
    client: &mut Client,
    store: &mut Store,
    key: &bytes::Bytes,
    millis: i64,
) -> CommandResult {
    if !store.db.exists(key) {
        client.reply(0);
        return Ok(None);
    }

    // A TTL in the past deletes the key outright.
    if millis <= 0 {
        store.db.remove(key);
    } else {
        store.db.expire(key, epoch().as_millis() + millis as u128);
    }

    store.touch(key);
    client.reply(1);
    Ok(None)
}

pub static TTL: Command = Command {
    kind: CommandKind::Ttl,
    name: "ttl",
    arity: Arity::Exact(2),
    run: ttl,
};

fn ttl(client: &mut Client, store: &mut Store) -> CommandResult {
    let remaining = get_ttl(client, store)?;
    client.reply(if remaining > 0 {
        remaining / 1000
    } else {
        remaining
    });
    Ok(None)
}

pub static PTTL: Command = Command {
    kind: CommandKind::Pttl,
    name: "pttl",
    arity: Arity::Exact(2),
    run: pttl,
};

fn pttl(client: &mut Client, store: &mut Store) -> CommandResult {
    let remaining = get_ttl(client, store)?;
    client.reply(remaining);
    Ok(None)
}

/// `-2` for a missing key, `-1` for no expiry, else remaining milliseconds.
fn get_ttl(client: &mut Client, store: &mut Store) -> Result<i64, Reply> {
    let key = client.request.pop()?;
    if !store.db.exists(&key) {
        return Ok(-2);
    }
    match store.db.ttl(&key) {
        Some(millis) => Ok(i64::try_from(millis).unwrap_or(i64::MAX)),
        None => Ok(-1),
    }
}
