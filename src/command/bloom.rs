use crate::{
    Client, CommandResult, Reply, ReplyError, Store,
    command::{Arity, Command, CommandKind},
    db::{Bloom, Value},
};

pub static BF_RESERVE: Command = Command {
    kind: CommandKind::BfReserve,
    name: "bf.reserve",
    arity: Arity::Exact(4),
    run: bf_reserve,
};

fn bf_reserve(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let error = client.request.f64()?;
    let capacity = client.request.usize()?;

    if !(0.0..1.0).contains(&error) || error == 0.0 || capacity == 0 {
        return Err(ReplyError::Syntax.into());
    }
    if store.db.exists(&key) {
        return Err(ReplyError::ItemExists.into());
    }

    store.db.set(&key, Value::from(Bloom::new(error, capacity)));
    store.touch(&key);
    client.reply("OK");
    Ok(None)
}

pub static BF_ADD: Command = Command {
    kind: CommandKind::BfAdd,
    name: "bf.add",
    arity: Arity::Exact(3),
    run: bf_add,
};

fn bf_add(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let item = client.request.pop()?;

    let filter = store
        .db
        .entry_or_insert_with(&key, || {
            Value::from(Bloom::new(Bloom::DEFAULT_ERROR, Bloom::DEFAULT_CAPACITY))
        })
        .mut_bloom()?;

    let added = filter.add(&item);
    if added {
        store.touch(&key);
    }
    client.reply(i64::from(added));
    Ok(None)
}

pub static BF_MADD: Command = Command {
    kind: CommandKind::BfMadd,
    name: "bf.madd",
    arity: Arity::Minimum(3),
    run: bf_madd,
};

fn bf_madd(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;

    let filter = store
        .db
        .entry_or_insert_with(&key, || {
            Value::from(Bloom::new(Bloom::DEFAULT_ERROR, Bloom::DEFAULT_CAPACITY))
        })
        .mut_bloom()?;

    let mut results = Vec::with_capacity(client.request.remaining());
    while !client.request.is_empty() {
        let item = client.request.pop()?;
        results.push(filter.add(&item));
    }

    store.touch(&key);
    client.reply(Reply::Array(results.len()));
    for added in results {
        client.reply(i64::from(added));
    }
    Ok(None)
}

pub static BF_EXISTS: Command = Command {
    kind: CommandKind::BfExists,
    name: "bf.exists",
    arity: Arity::Exact(3),
    run: bf_exists,
};

fn bf_exists(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let item = client.request.pop()?;

    let found = match store.db.get(&key) {
        Some(value) => value.as_bloom()?.contains(&item),
        None => false,
    };
    client.reply(i64::from(found));
    Ok(None)
}

pub static BF_MEXISTS: Command = Command {
    kind: CommandKind::BfMexists,
    name: "bf.mexists",
    arity: Arity::Minimum(3),
    run: bf_mexists,
};

fn bf_mexists(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;

    client.reply(Reply::Array(client.request.remaining()));
    while !client.request.is_empty() {
        let item = client.request.pop()?;
        let found = match store.db.get(&key) {
            Some(value) => value.as_bloom()?.contains(&item),
            None => false,
        };
        client.reply(i64::from(found));
    }
    Ok(None)
}

pub static BF_INFO: Command = Command {
    kind: CommandKind::BfInfo,
    name: "bf.info",
    arity: Arity::Exact(2),
    run: bf_info,
};

fn bf_info(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let Some(value) = store.db.get(&key) else {
        return Err(ReplyError::NoSuchKey.into());
    };
    let filter = value.as_bloom()?;

    client.reply(Reply::Array(10));
    client.bulk("Capacity");
    client.reply(filter.capacity());
    client.bulk("Size");
    client.reply((filter.size_bits() / 8) as i64);
    client.bulk("Number of filters");
    client.reply(filter.filters());
    client.bulk("Number of items inserted");
    client.reply(filter.items());
    client.bulk("Expansion rate");
    client.reply(filter.expansion());
    Ok(None)
}
