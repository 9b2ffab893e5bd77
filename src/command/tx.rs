use crate::{
    Client, CommandResult, Reply, ReplyError, Store,
    client::{Argument, Tx},
    command::{Arity, Command, CommandKind},
};

pub static MULTI: Command = Command {
    kind: CommandKind::Multi,
    name: "multi",
    arity: Arity::Exact(1),
    run: multi,
};

fn multi(client: &mut Client, _: &mut Store) -> CommandResult {
    if !matches!(client.tx(), Tx::None) {
        return Err(ReplyError::MultiNested.into());
    }
    debug_assert!(client.queue.is_empty());
    client.set_tx(Tx::Some(0));
    client.reply("OK");
    Ok(None)
}

pub static EXEC: Command = Command {
    kind: CommandKind::Exec,
    name: "exec",
    arity: Arity::Exact(1),
    run: exec,
};

fn exec(client: &mut Client, store: &mut Store) -> CommandResult {
    let count = match client.set_tx(Tx::None) {
        Tx::None => return Err(ReplyError::ExecWithoutMulti.into()),
        Tx::Some(count) => count,
    };

    // A write to any watched key aborts the whole transaction.
    if store.is_dirty(client.id) {
        client.queue.clear();
        store.unwatch(client.id);
        return Err(Reply::Nil);
    }

    client.reply(Reply::Array(count));
    client.in_exec = true;
    client.request.clear();

    for _ in 0..count {
        while let Some(Argument::Push(argument)) = client.queue.pop_front() {
            client.request.push_back(argument);
        }
        client.run(store);
    }

    client.queue.clear();
    client.in_exec = false;

    store.unwatch(client.id);
    Ok(None)
}

pub static DISCARD: Command = Command {
    kind: CommandKind::Discard,
    name: "discard",
    arity: Arity::Exact(1),
    run: discard,
};

fn discard(client: &mut Client, store: &mut Store) -> CommandResult {
    if matches!(client.tx(), Tx::None) {
        return Err(ReplyError::DiscardWithoutMulti.into());
    }
    client.discard(store);
    client.reply("OK");
    Ok(None)
}

pub static WATCH: Command = Command {
    kind: CommandKind::Watch,
    name: "watch",
    arity: Arity::Minimum(2),
    run: watch,
};

fn watch(client: &mut Client, store: &mut Store) -> CommandResult {
    if !matches!(client.tx(), Tx::None) {
        return Err(ReplyError::WatchInMulti.into());
    }

    while !client.request.is_empty() {
        let key = client.request.pop()?;
        store.watching.add(&key, client.id);
    }

    client.reply("OK");
    Ok(None)
}

pub static UNWATCH: Command = Command {
    kind: CommandKind::Unwatch,
    name: "unwatch",
    arity: Arity::Exact(1),
    run: unwatch,
};

fn unwatch(client: &mut Client, store: &mut Store) -> CommandResult {
    store.unwatch(client.id);
    client.reply("OK");
    Ok(None)
}
