use crate::{
    Client, CommandResult, Store,
    command::{Arity, Command, CommandKind},
};

pub static PUBLISH: Command = Command {
    kind: CommandKind::Publish,
    name: "publish",
    arity: Arity::Exact(3),
    run: publish,
};

fn publish(client: &mut Client, store: &mut Store) -> CommandResult {
    let channel = client.request.pop()?;
    let message = client.request.pop()?;
    let count = store.pubsub.publish(&channel, &message);
    client.reply(count);
    Ok(None)
}

pub static SUBSCRIBE: Command = Command {
    kind: CommandKind::Subscribe,
    name: "subscribe",
    arity: Arity::Minimum(2),
    run: subscribe,
};

fn subscribe(client: &mut Client, store: &mut Store) -> CommandResult {
    while !client.request.is_empty() {
        let channel = client.request.pop()?;
        store.pubsub.subscribe(channel, client);
    }
    Ok(None)
}

pub static UNSUBSCRIBE: Command = Command {
    kind: CommandKind::Unsubscribe,
    name: "unsubscribe",
    arity: Arity::Minimum(1),
    run: unsubscribe,
};

fn unsubscribe(client: &mut Client, store: &mut Store) -> CommandResult {
    if client.request.is_empty() {
        store.pubsub.unsubscribe_all(client);
        return Ok(None);
    }

    while !client.request.is_empty() {
        let channel = client.request.pop()?;
        store.pubsub.unsubscribe(channel, client);
    }
    Ok(None)
}

pub static PSUBSCRIBE: Command = Command {
    kind: CommandKind::Psubscribe,
    name: "psubscribe",
    arity: Arity::Minimum(2),
    run: psubscribe,
};

fn psubscribe(client: &mut Client, store: &mut Store) -> CommandResult {
    while !client.request.is_empty() {
        let pattern = client.request.pop()?;
        store.pubsub.psubscribe(pattern, client);
    }
    Ok(None)
}

pub static PUNSUBSCRIBE: Command = Command {
    kind: CommandKind::Punsubscribe,
    name: "punsubscribe",
    arity: Arity::Minimum(1),
    run: punsubscribe,
};

fn punsubscribe(client: &mut Client, store: &mut Store) -> CommandResult {
    if client.request.is_empty() {
        store.pubsub.punsubscribe_all(client);
        return Ok(None);
    }

    while !client.request.is_empty() {
        let pattern = client.request.pop()?;
        store.pubsub.punsubscribe(pattern, client);
    }
    Ok(None)
}
