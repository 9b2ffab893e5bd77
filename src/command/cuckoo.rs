use crate::{
    Client, CommandResult, Reply, ReplyError, Store,
    bytes::lex,
    command::{Arity, Command, CommandKind},
    db::{Cuckoo, Value},
};
use logos::Logos;

pub static CF_RESERVE: Command = Command {
    kind: CommandKind::CfReserve,
    name: "cf.reserve",
    arity: Arity::Exact(3),
    run: cf_reserve,
};

fn cf_reserve(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let capacity = client.request.usize()?;

    if capacity == 0 {
        return Err(ReplyError::Syntax.into());
    }
    if store.db.exists(&key) {
        return Err(ReplyError::ItemExists.into());
    }

    store.db.set(&key, Value::from(Cuckoo::new(capacity)));
    store.touch(&key);
    client.reply("OK");
    Ok(None)
}

pub static CF_ADD: Command = Command {
    kind: CommandKind::CfAdd,
    name: "cf.add",
    arity: Arity::Exact(3),
    run: cf_add,
};

fn cf_add(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let item = client.request.pop()?;

    let filter = store
        .db
        .entry_or_insert_with(&key, || Value::from(Cuckoo::new(Cuckoo::DEFAULT_CAPACITY)))
        .mut_cuckoo()?;

    if !filter.add(&item) {
        return Err(ReplyError::TooManyItems.into());
    }

    store.touch(&key);
    client.reply(1);
    Ok(None)
}

pub static CF_ADDNX: Command = Command {
    kind: CommandKind::CfAddnx,
    name: "cf.addnx",
    arity: Arity::Exact(3),
    run: cf_addnx,
};

fn cf_addnx(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let item = client.request.pop()?;

    let filter = store
        .db
        .entry_or_insert_with(&key, || Value::from(Cuckoo::new(Cuckoo::DEFAULT_CAPACITY)))
        .mut_cuckoo()?;

    match filter.add_unique(&item) {
        Some(true) => {
            store.touch(&key);
            client.reply(1);
        }
        Some(false) => client.reply(0),
        None => return Err(ReplyError::TooManyItems.into()),
    }
    Ok(None)
}

#[derive(Clone, Copy, Debug, Eq, Hash, Logos, PartialEq)]
enum CfInsertOption {
    #[regex(b"(?i:capacity)")]
    Capacity,

    #[regex(b"(?i:items)")]
    Items,
}

pub static CF_INSERT: Command = Command {
    kind: CommandKind::CfInsert,
    name: "cf.insert",
    arity: Arity::Minimum(4),
    run: cf_insert,
};

fn cf_insert(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;

    let mut capacity = Cuckoo::DEFAULT_CAPACITY;
    loop {
        let Some(argument) = client.request.try_pop() else {
            return Err(ReplyError::Syntax.into());
        };
        match lex(&argument) {
            Some(CfInsertOption::Capacity) => capacity = client.request.usize()?,
            Some(CfInsertOption::Items) => break,
            None => return Err(ReplyError::Syntax.into()),
        }
    }

    if client.request.is_empty() {
        return Err(client.request.wrong_arguments().into());
    }

    if store.db.get(&key).is_none() {
        store.db.set(&key, Value::from(Cuckoo::new(capacity)));
    }
    let filter = store
        .db
        .get_mut(&key)
        .expect("just inserted")
        .mut_cuckoo()?;

    let mut results = Vec::with_capacity(client.request.remaining());
    while !client.request.is_empty() {
        let item = client.request.pop()?;
        results.push(filter.add(&item));
    }

    store.touch(&key);
    client.reply(Reply::Array(results.len()));
    for added in results {
        client.reply(if added { 1 } else { -1 });
    }
    Ok(None)
}

pub static CF_EXISTS: Command = Command {
    kind: CommandKind::CfExists,
    name: "cf.exists",
    arity: Arity::Exact(3),
    run: cf_exists,
};

fn cf_exists(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let item = client.request.pop()?;

    let found = match store.db.get(&key) {
        Some(value) => value.as_cuckoo()?.contains(&item),
        None => false,
    };
    client.reply(i64::from(found));
    Ok(None)
}

pub static CF_DEL: Command = Command {
    kind: CommandKind::CfDel,
    name: "cf.del",
    arity: Arity::Exact(3),
    run: cf_del,
};

fn cf_del(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let item = client.request.pop()?;

    let Some(value) = store.db.get_mut(&key) else {
        return Err(ReplyError::NoSuchKey.into());
    };

    let removed = value.mut_cuckoo()?.remove(&item);
    if removed {
        store.touch(&key);
    }
    client.reply(i64::from(removed));
    Ok(None)
}

pub static CF_COUNT: Command = Command {
    kind: CommandKind::CfCount,
    name: "cf.count",
    arity: Arity::Exact(3),
    run: cf_count,
};

fn cf_count(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let item = client.request.pop()?;

    let count = match store.db.get(&key) {
        Some(value) => value.as_cuckoo()?.count(&item),
        None => 0,
    };
    client.reply(count);
    Ok(None)
}

pub static CF_INFO: Command = Command {
    kind: CommandKind::CfInfo,
    name: "cf.info",
    arity: Arity::Exact(2),
    run: cf_info,
};

fn cf_info(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let Some(value) = store.db.get(&key) else {
        return Err(ReplyError::NoSuchKey.into());
    };
    let filter = value.as_cuckoo()?;

    client.reply(Reply::Array(10));
    client.bulk("Size");
    client.reply(filter.size());
    client.bulk("Number of buckets");
    client.reply(filter.num_buckets());
    client.bulk("Number of items inserted");
    client.reply(filter.items());
    client.bulk("Bucket size");
    client.reply(filter.bucket_size());
    client.bulk("Max iterations");
    client.reply(filter.max_iterations());
    Ok(None)
}
