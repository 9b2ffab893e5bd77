use crate::{
    Client, CommandResult, ReplyError, Store,
    command::{Arity, Command, CommandKind},
    db::Value,
    hll,
};
use bytes::Bytes;

/// Fetch a copy of a key's sketch bytes. Missing keys yield `None`; a string
/// that isn't a sketch, or any other kind, is an error.
fn sketch(store: &Store, key: &[u8]) -> Result<Option<Vec<u8>>, ReplyError> {
    let Some(value) = store.db.get(key) else {
        return Ok(None);
    };
    let string = value.as_string().map_err(|_| ReplyError::WrongType)?;
    if !hll::is_valid(string.as_slice()) {
        return Err(ReplyError::NotHyperLogLog);
    }
    Ok(Some(string.as_slice().to_vec()))
}

/// Fetch a key's sketch bytes for mutation, creating a fresh sketch when the
/// key is missing. Writing in place keeps an existing key's expiration.
fn sketch_mut<'a>(store: &'a mut Store, key: &Bytes) -> Result<&'a mut Vec<u8>, ReplyError> {
    let value = store
        .db
        .entry_or_insert_with(key, || Value::from(hll::empty()));
    let string = value.mut_string().map_err(|_| ReplyError::WrongType)?;
    if !hll::is_valid(string.as_slice()) {
        return Err(ReplyError::NotHyperLogLog);
    }
    Ok(string.make_mut())
}

pub static PFADD: Command = Command {
    kind: CommandKind::Pfadd,
    name: "pfadd",
    arity: Arity::Minimum(2),
    run: pfadd,
};

fn pfadd(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let created = !store.db.exists(&key);

    let bytes = sketch_mut(store, &key)?;
    let mut changed = false;
    while !client.request.is_empty() {
        let item = client.request.pop()?;
        changed |= hll::add(bytes, &item);
    }

    if created || changed {
        store.touch(&key);
    }

    client.reply(i64::from(created || changed));
    Ok(None)
}

pub static PFCOUNT: Command = Command {
    kind: CommandKind::Pfcount,
    name: "pfcount",
    arity: Arity::Minimum(2),
    run: pfcount,
};

fn pfcount(client: &mut Client, store: &mut Store) -> CommandResult {
    let mut keys: Vec<Bytes> = Vec::with_capacity(client.request.remaining());
    while !client.request.is_empty() {
        keys.push(client.request.pop()?);
    }

    // A single key counts directly; several count their union.
    let mut merged: Option<Vec<u8>> = None;
    for key in &keys {
        let Some(bytes) = sketch(store, key)? else {
            continue;
        };
        match merged.as_mut() {
            Some(merged) => hll::merge_into(merged, &bytes),
            None => merged = Some(bytes),
        }
    }

    let count = merged.map_or(0, |bytes| hll::count(&bytes));
    client.reply(count as i64);
    Ok(None)
}

pub static PFMERGE: Command = Command {
    kind: CommandKind::Pfmerge,
    name: "pfmerge",
    arity: Arity::Minimum(2),
    run: pfmerge,
};

fn pfmerge(client: &mut Client, store: &mut Store) -> CommandResult {
    let destination = client.request.pop()?;

    // Validate and copy every source before touching the destination.
    let mut sources = Vec::with_capacity(client.request.remaining());
    while !client.request.is_empty() {
        let key = client.request.pop()?;
        if let Some(bytes) = sketch(store, &key)? {
            sources.push(bytes);
        }
    }

    let merged = sketch_mut(store, &destination)?;
    for source in &sources {
        hll::merge_into(merged, source);
    }

    store.touch(&destination);
    client.reply("OK");
    Ok(None)
}
