use crate::{
    Client, CommandResult, Reply, ReplyError, Store,
    command::{Arity, BlockResult, Command, CommandKind},
    db::{PendingEntry, StreamId},
    time::epoch_ms,
};
use bytes::Bytes;
use logos::Logos;
use std::ops::Bound::{Excluded, Unbounded};

type Entry = (StreamId, Vec<(Bytes, Bytes)>);

/// Parse a range start: `-` is the smallest id, a bare `ms` means `ms-0`.
fn range_start(bytes: &[u8]) -> Result<StreamId, ReplyError> {
    match bytes {
        b"-" => Ok(StreamId::MIN),
        _ => StreamId::parse(bytes, 0).ok_or(ReplyError::InvalidStreamId),
    }
}

/// Parse a range end: `+` is the largest id, a bare `ms` means `ms-max`.
fn range_end(bytes: &[u8]) -> Result<StreamId, ReplyError> {
    match bytes {
        b"+" => Ok(StreamId::MAX),
        _ => StreamId::parse(bytes, u64::MAX).ok_or(ReplyError::InvalidStreamId),
    }
}

/// Reply with one entry: its id and the flattened field value list.
fn reply_entry(client: &mut Client, id: StreamId, fields: &[(Bytes, Bytes)]) {
    client.reply(Reply::Array(2));
    client.reply(id);
    client.reply(Reply::Array(2 * fields.len()));
    for (field, value) in fields {
        client.reply(field);
        client.reply(value);
    }
}

/// Remove a stream key once it has no entries and no groups left.
fn cleanup(store: &mut Store, key: &Bytes) {
    if let Ok(Some(stream)) = store.db.get_stream(key) {
        if stream.is_empty() && !stream.has_groups() {
            store.db.remove(key);
        }
    }
}

pub static XADD: Command = Command {
    kind: CommandKind::Xadd,
    name: "xadd",
    arity: Arity::Minimum(5),
    run: xadd,
};

fn xadd(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let id_arg = client.request.pop()?;
    client.request.assert_pairs()?;

    let mut fields = Vec::with_capacity(client.request.remaining() / 2);
    while !client.request.is_empty() {
        let field = client.request.pop()?;
        let value = client.request.pop()?;
        fields.push((field, value));
    }

    // Validate the id against the current tail before creating anything.
    let last = store
        .db
        .get_stream(&key)?
        .map_or(StreamId::MIN, |stream| stream.last_id());

    let explicit = match &id_arg[..] {
        b"*" => None,
        bytes => {
            let id = StreamId::parse(bytes, 0).ok_or(ReplyError::InvalidStreamId)?;
            if id <= last || id == StreamId::MIN {
                return Err(ReplyError::SmallStreamId.into());
            }
            Some(id)
        }
    };

    let now = epoch_ms();
    let stream = store.db.stream_or_default(&key)?;
    let id = explicit.unwrap_or_else(|| stream.next_id(now));

    if !stream.insert(id, fields) {
        return Err(ReplyError::SmallStreamId.into());
    }

    store.touch(&key);
    store.mark_ready(&key);
    client.reply(id);
    Ok(None)
}

pub static XLEN: Command = Command {
    kind: CommandKind::Xlen,
    name: "xlen",
    arity: Arity::Exact(2),
    run: xlen,
};

fn xlen(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let len = store.db.get_stream(&key)?.map_or(0, |stream| stream.len());
    client.reply(len);
    Ok(None)
}

pub static XDEL: Command = Command {
    kind: CommandKind::Xdel,
    name: "xdel",
    arity: Arity::Minimum(3),
    run: xdel,
};

fn xdel(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;

    let mut ids = Vec::with_capacity(client.request.remaining());
    while !client.request.is_empty() {
        let id = client.request.pop()?;
        ids.push(StreamId::parse(&id, 0).ok_or(ReplyError::InvalidStreamId)?);
    }

    let Some(stream) = store.db.mut_stream(&key)? else {
        client.reply(0);
        return Ok(None);
    };

    let mut removed = 0;
    for id in ids {
        if stream.remove(id) {
            removed += 1;
        }
    }

    cleanup(store, &key);
    if removed > 0 {
        store.touch(&key);
    }
    client.reply(removed);
    Ok(None)
}

#[derive(Clone, Copy, Debug, Eq, Hash, Logos, PartialEq)]
enum TrimStrategy {
    #[regex(b"(?i:maxlen)")]
    Maxlen,

    #[regex(b"(?i:minid)")]
    Minid,
}

pub static XTRIM: Command = Command {
    kind: CommandKind::Xtrim,
    name: "xtrim",
    arity: Arity::Exact(4),
    run: xtrim,
};

fn xtrim(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let strategy = crate::bytes::lex::<TrimStrategy>(&client.request.pop()?)
        .ok_or(ReplyError::Syntax)?;
    let argument = client.request.pop()?;

    let Some(stream) = store.db.mut_stream(&key)? else {
        client.reply(0);
        return Ok(None);
    };

    let removed = match strategy {
        TrimStrategy::Maxlen => {
            let keep = crate::bytes::parse_u64_exact(&argument)
                .and_then(|keep| usize::try_from(keep).ok())
                .ok_or(ReplyError::Integer)?;
            stream.trim_maxlen(keep)
        }
        TrimStrategy::Minid => {
            let minid = range_start(&argument)?;
            stream.trim_minid(minid)
        }
    };

    cleanup(store, &key);
    if removed > 0 {
        store.touch(&key);
    }
    client.reply(removed);
    Ok(None)
}

/// Parse an optional trailing `COUNT n`.
#[derive(Clone, Copy, Debug, Eq, Hash, Logos, PartialEq)]
enum CountOption {
    #[regex(b"(?i:count)")]
    Count,
}

fn count_option(client: &mut Client) -> Result<Option<usize>, ReplyError> {
    match client.request.try_pop() {
        None => Ok(None),
        Some(flag) => match crate::bytes::lex(&flag) {
            Some(CountOption::Count) => {
                let count = client.request.usize()?;
                if client.request.is_empty() {
                    Ok(Some(count))
                } else {
                    Err(ReplyError::Syntax)
                }
            }
            None => Err(ReplyError::Syntax),
        },
    }
}

pub static XRANGE: Command = Command {
    kind: CommandKind::Xrange,
    name: "xrange",
    arity: Arity::Minimum(4),
    run: xrange,
};

fn xrange(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let start = range_start(&client.request.pop()?)?;
    let end = range_end(&client.request.pop()?)?;
    let count = count_option(client)?.unwrap_or(usize::MAX);

    let Some(stream) = store.db.get_stream(&key)? else {
        client.reply(Reply::Array(0));
        return Ok(None);
    };

    let entries: Vec<Entry> = stream
        .range(start, end)
        .take(count)
        .map(|(id, fields)| (id, fields.clone()))
        .collect();

    client.reply(Reply::Array(entries.len()));
    for (id, fields) in entries {
        reply_entry(client, id, &fields);
    }
    Ok(None)
}

pub static XREVRANGE: Command = Command {
    kind: CommandKind::Xrevrange,
    name: "xrevrange",
    arity: Arity::Minimum(4),
    run: xrevrange,
};

fn xrevrange(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let end = range_end(&client.request.pop()?)?;
    let start = range_start(&client.request.pop()?)?;
    let count = count_option(client)?.unwrap_or(usize::MAX);

    let Some(stream) = store.db.get_stream(&key)? else {
        client.reply(Reply::Array(0));
        return Ok(None);
    };

    let entries: Vec<Entry> = stream
        .range(start, end)
        .rev()
        .take(count)
        .map(|(id, fields)| (id, fields.clone()))
        .collect();

    client.reply(Reply::Array(entries.len()));
    for (id, fields) in entries {
        reply_entry(client, id, &fields);
    }
    Ok(None)
}

pub static XSETID: Command = Command {
    kind: CommandKind::Xsetid,
    name: "xsetid",
    arity: Arity::Exact(3),
    run: xsetid,
};

fn xsetid(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let id = StreamId::parse(&client.request.pop()?, 0).ok_or(ReplyError::InvalidStreamId)?;

    let Some(stream) = store.db.mut_stream(&key)? else {
        return Err(ReplyError::NoSuchKey.into());
    };

    stream.set_last_id(id);
    store.touch(&key);
    client.reply("OK");
    Ok(None)
}

#[derive(Clone, Copy, Debug, Eq, Hash, Logos, PartialEq)]
enum XreadOption {
    #[regex(b"(?i:count)")]
    Count,

    #[regex(b"(?i:block)")]
    Block,

    #[regex(b"(?i:streams)")]
    Streams,
}

pub static XREAD: Command = Command {
    kind: CommandKind::Xread,
    name: "xread",
    arity: Arity::Minimum(4),
    run: xread,
};

fn xread(client: &mut Client, store: &mut Store) -> CommandResult {
    let mut count = None;
    let mut block = None;

    loop {
        let Some(argument) = client.request.try_pop() else {
            return Err(ReplyError::Syntax.into());
        };
        match crate::bytes::lex(&argument) {
            Some(XreadOption::Count) => count = Some(client.request.usize()?),
            Some(XreadOption::Block) => block = Some(client.request.timeout()?),
            Some(XreadOption::Streams) => break,
            None => return Err(ReplyError::Syntax.into()),
        }
    }

    let remaining = client.request.remaining();
    if remaining == 0 || remaining % 2 != 0 {
        return Err(ReplyError::Syntax.into());
    }

    let streams = remaining / 2;
    let first_key = client.request.next();
    let mut results: Vec<(Bytes, Vec<Entry>)> = Vec::new();

    for index in 0..streams {
        let key = client.request.get(first_key + index).unwrap();
        let id_index = first_key + streams + index;
        let id_arg = client.request.get(id_index).unwrap();

        let stream = store.db.get_stream(&key)?;

        let after = match &id_arg[..] {
            // `$` pins to the current tail; remember the resolved id so a
            // rerun after blocking doesn't skip entries added meanwhile.
            b"$" => {
                let last = stream.map_or(StreamId::MIN, |stream| stream.last_id());
                client.request.replace(id_index, last.to_bytes());
                last
            }
            bytes => StreamId::parse(bytes, 0).ok_or(ReplyError::InvalidStreamId)?,
        };

        if let Some(stream) = stream {
            let entries: Vec<Entry> = stream
                .after(after)
                .take(count.unwrap_or(usize::MAX))
                .map(|(id, fields)| (id, fields.clone()))
                .collect();
            if !entries.is_empty() {
                results.push((key, entries));
            }
        }
    }

    if !results.is_empty() {
        reply_streams(client, results);
        return Ok(None);
    }

    match block {
        Some(timeout) if !client.in_exec => Ok(Some(BlockResult::new(
            timeout,
            (first_key..first_key + streams).step_by(1),
        ))),
        _ => {
            client.reply(Reply::Nil);
            Ok(None)
        }
    }
}

fn reply_streams(client: &mut Client, results: Vec<(Bytes, Vec<Entry>)>) {
    client.reply(Reply::Array(results.len()));
    for (key, entries) in results {
        client.reply(Reply::Array(2));
        client.reply(key);
        client.reply(Reply::Array(entries.len()));
        for (id, fields) in entries {
            reply_entry(client, id, &fields);
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, Logos, PartialEq)]
enum XreadgroupOption {
    #[regex(b"(?i:group)")]
    Group,

    #[regex(b"(?i:count)")]
    Count,

    #[regex(b"(?i:block)")]
    Block,

    #[regex(b"(?i:streams)")]
    Streams,
}

pub static XREADGROUP: Command = Command {
    kind: CommandKind::Xreadgroup,
    name: "xreadgroup",
    arity: Arity::Minimum(7),
    run: xreadgroup,
};

fn xreadgroup(client: &mut Client, store: &mut Store) -> CommandResult {
    // The GROUP clause is mandatory and comes first.
    match crate::bytes::lex(&client.request.pop()?) {
        Some(XreadgroupOption::Group) => {}
        _ => return Err(ReplyError::Syntax.into()),
    }
    let group = client.request.pop()?;
    let consumer = client.request.pop()?;

    let mut count = None;
    let mut block = None;

    loop {
        let Some(argument) = client.request.try_pop() else {
            return Err(ReplyError::Syntax.into());
        };
        match crate::bytes::lex(&argument) {
            Some(XreadgroupOption::Count) => count = Some(client.request.usize()?),
            Some(XreadgroupOption::Block) => block = Some(client.request.timeout()?),
            Some(XreadgroupOption::Streams) => break,
            _ => return Err(ReplyError::Syntax.into()),
        }
    }

    let remaining = client.request.remaining();
    if remaining == 0 || remaining % 2 != 0 {
        return Err(ReplyError::Syntax.into());
    }

    let streams = remaining / 2;
    let first_key = client.request.next();
    let now = epoch_ms();

    // A stream read with an explicit id always appears in the reply, even
    // when empty. `>` streams appear only when they deliver something.
    let mut results: Vec<(Bytes, Vec<Entry>)> = Vec::new();
    let mut explicit = false;

    for index in 0..streams {
        let key = client.request.get(first_key + index).unwrap();
        let id_arg = client.request.get(first_key + streams + index).unwrap();

        let Some(stream) = store.db.mut_stream(&key)? else {
            return Err(ReplyError::NoGroup(key, group).into());
        };
        if stream.group(&group).is_none() {
            return Err(ReplyError::NoGroup(key, group).into());
        }

        if &id_arg[..] == b">" {
            // Deliver entries past the group's checkpoint and record them
            // as pending.
            let last = stream.group(&group).unwrap().last_delivered;
            let entries: Vec<Entry> = stream
                .after(last)
                .take(count.unwrap_or(usize::MAX))
                .map(|(id, fields)| (id, fields.clone()))
                .collect();

            let state = stream.group_mut(&group).unwrap();
            for (id, _) in &entries {
                state.deliver(*id, &consumer, now);
                state.last_delivered = state.last_delivered.max(*id);
            }

            if !entries.is_empty() {
                store.touch(&key);
                results.push((key, entries));
            }
        } else {
            // A concrete id rereads this consumer's own pending entries
            // without touching delivery state.
            explicit = true;
            let after = StreamId::parse(&id_arg, 0).ok_or(ReplyError::InvalidStreamId)?;
            let state = stream.group(&group).unwrap();

            let ids: Vec<StreamId> = state
                .pel
                .range((Excluded(after), Unbounded))
                .filter(|(_, pending)| pending.consumer == consumer)
                .take(count.unwrap_or(usize::MAX))
                .map(|(id, _)| *id)
                .collect();

            let entries: Vec<Entry> = ids
                .into_iter()
                .filter_map(|id| stream.get(id).map(|fields| (id, fields.clone())))
                .collect();
            results.push((key, entries));
        }
    }

    if explicit || !results.is_empty() {
        reply_streams(client, results);
        return Ok(None);
    }

    match block {
        Some(timeout) if !client.in_exec => Ok(Some(BlockResult::new(
            timeout,
            (first_key..first_key + streams).step_by(1),
        ))),
        _ => {
            client.reply(Reply::Nil);
            Ok(None)
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, Logos, PartialEq)]
enum XgroupSubcommand {
    #[regex(b"(?i:create)")]
    Create,

    #[regex(b"(?i:destroy)")]
    Destroy,

    #[regex(b"(?i:setid)")]
    Setid,

    #[regex(b"(?i:delconsumer)")]
    Delconsumer,
}

#[derive(Clone, Copy, Debug, Eq, Hash, Logos, PartialEq)]
enum MkstreamOption {
    #[regex(b"(?i:mkstream)")]
    Mkstream,
}

pub static XGROUP: Command = Command {
    kind: CommandKind::Xgroup,
    name: "xgroup",
    arity: Arity::Minimum(4),
    run: xgroup,
};

fn xgroup(client: &mut Client, store: &mut Store) -> CommandResult {
    let subcommand = crate::bytes::lex::<XgroupSubcommand>(&client.request.pop()?)
        .ok_or(ReplyError::Syntax)?;
    let key = client.request.pop()?;
    let group = client.request.pop()?;

    use XgroupSubcommand::*;
    match subcommand {
        Create => {
            let start = client.request.pop()?;
            let mkstream = match client.request.try_pop() {
                None => false,
                Some(flag) => match crate::bytes::lex(&flag) {
                    Some(MkstreamOption::Mkstream) => true,
                    None => return Err(ReplyError::Syntax.into()),
                },
            };

            if store.db.get_stream(&key)?.is_none() && !mkstream {
                return Err(ReplyError::XGroupKeyMissing.into());
            }

            let stream = store.db.stream_or_default(&key)?;
            let start = match &start[..] {
                b"-" => StreamId::MIN,
                b"$" => stream.last_id(),
                bytes => StreamId::parse(bytes, 0).ok_or(ReplyError::InvalidStreamId)?,
            };

            if !stream.create_group(group, start) {
                return Err(ReplyError::BusyGroup.into());
            }

            store.touch(&key);
            client.reply("OK");
        }
        Destroy => {
            let Some(stream) = store.db.mut_stream(&key)? else {
                client.reply(0);
                return Ok(None);
            };
            let destroyed = stream.destroy_group(&group);
            cleanup(store, &key);
            if destroyed {
                store.touch(&key);
            }
            client.reply(i64::from(destroyed));
        }
        Setid => {
            let id = client.request.pop()?;
            let Some(stream) = store.db.mut_stream(&key)? else {
                return Err(ReplyError::XGroupKeyMissing.into());
            };
            let id = match &id[..] {
                b"-" => StreamId::MIN,
                b"$" => stream.last_id(),
                bytes => StreamId::parse(bytes, 0).ok_or(ReplyError::InvalidStreamId)?,
            };
            let Some(state) = stream.group_mut(&group) else {
                return Err(ReplyError::NoGroup(key, group).into());
            };
            state.last_delivered = id;
            store.touch(&key);
            client.reply("OK");
        }
        Delconsumer => {
            let consumer = client.request.pop()?;
            let Some(stream) = store.db.mut_stream(&key)? else {
                return Err(ReplyError::XGroupKeyMissing.into());
            };
            let Some(state) = stream.group_mut(&group) else {
                return Err(ReplyError::NoGroup(key, group).into());
            };
            let removed = state.delete_consumer(&consumer);
            if removed > 0 {
                store.touch(&key);
            }
            client.reply(removed);
        }
    }

    Ok(None)
}

pub static XACK: Command = Command {
    kind: CommandKind::Xack,
    name: "xack",
    arity: Arity::Minimum(4),
    run: xack,
};

fn xack(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let group = client.request.pop()?;

    let mut ids = Vec::with_capacity(client.request.remaining());
    while !client.request.is_empty() {
        let id = client.request.pop()?;
        ids.push(StreamId::parse(&id, 0).ok_or(ReplyError::InvalidStreamId)?);
    }

    let acked = match store.db.mut_stream(&key)? {
        Some(stream) => match stream.group_mut(&group) {
            Some(state) => ids.into_iter().filter(|id| state.ack(*id)).count(),
            None => 0,
        },
        None => 0,
    };

    if acked > 0 {
        store.touch(&key);
    }
    client.reply(acked);
    Ok(None)
}

#[derive(Clone, Copy, Debug, Eq, Hash, Logos, PartialEq)]
enum IdleOption {
    #[regex(b"(?i:idle)")]
    Idle,
}

pub static XPENDING: Command = Command {
    kind: CommandKind::Xpending,
    name: "xpending",
    arity: Arity::Minimum(3),
    run: xpending,
};

fn xpending(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let group = client.request.pop()?;

    let Some(stream) = store.db.get_stream(&key)? else {
        return Err(ReplyError::NoGroup(key, group).into());
    };
    let Some(state) = stream.group(&group) else {
        return Err(ReplyError::NoGroup(key, group).into());
    };

    if client.request.is_empty() {
        // Summary form: count, smallest, largest, per-consumer counts.
        client.reply(Reply::Array(4));
        client.reply(state.pel.len());

        match (state.pel.keys().next(), state.pel.keys().next_back()) {
            (Some(first), Some(last)) => {
                client.reply(*first);
                client.reply(*last);
            }
            _ => {
                client.reply(Reply::Nil);
                client.reply(Reply::Nil);
            }
        }

        let consumers = state.consumer_counts();
        if consumers.is_empty() {
            client.reply(Reply::Nil);
        } else {
            client.reply(Reply::Array(consumers.len()));
            for (consumer, pending) in consumers {
                client.reply(Reply::Array(2));
                client.reply(consumer);
                client.bulk(format!("{pending}").into_bytes());
            }
        }
        return Ok(None);
    }

    // Extended form: [IDLE ms] start end count [consumer].
    let min_idle = match client.request.peek() {
        Some(flag) if crate::bytes::lex::<IdleOption>(&flag).is_some() => {
            _ = client.request.pop()?;
            client.request.u64()?
        }
        _ => 0,
    };

    let start = range_start(&client.request.pop()?)?;
    let end = range_end(&client.request.pop()?)?;
    let count = client.request.usize()?;
    let consumer = client.request.try_pop();

    if !client.request.is_empty() {
        return Err(ReplyError::Syntax.into());
    }

    let now = epoch_ms();
    let rows: Vec<(StreamId, PendingEntry)> = state
        .pel
        .range(start..=end)
        .filter(|(_, pending)| now.saturating_sub(pending.delivery_time) >= min_idle)
        .filter(|(_, pending)| {
            consumer
                .as_ref()
                .is_none_or(|consumer| pending.consumer == *consumer)
        })
        .take(count)
        .map(|(id, pending)| (*id, pending.clone()))
        .collect();

    client.reply(Reply::Array(rows.len()));
    for (id, pending) in rows {
        client.reply(Reply::Array(4));
        client.reply(id);
        client.reply(pending.consumer);
        client.reply(now.saturating_sub(pending.delivery_time) as i64);
        client.reply(pending.delivery_count as i64);
    }
    Ok(None)
}

#[derive(Clone, Copy, Debug, Eq, Hash, Logos, PartialEq)]
enum XclaimOption {
    #[regex(b"(?i:idle)")]
    Idle,

    #[regex(b"(?i:time)")]
    Time,

    #[regex(b"(?i:retrycount)")]
    Retrycount,

    #[regex(b"(?i:force)")]
    Force,

    #[regex(b"(?i:justid)")]
    Justid,
}

pub static XCLAIM: Command = Command {
    kind: CommandKind::Xclaim,
    name: "xclaim",
    arity: Arity::Minimum(6),
    run: xclaim,
};

fn xclaim(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let group = client.request.pop()?;
    let consumer = client.request.pop()?;
    let min_idle = client.request.u64()?;

    let mut ids = Vec::new();
    let mut idle = None;
    let mut time = None;
    let mut retrycount = None;
    let mut force = false;
    let mut justid = false;

    while let Some(argument) = client.request.try_pop() {
        if let Some(id) = StreamId::parse(&argument, 0) {
            // Ids come before any option.
            if idle.is_some() || time.is_some() || retrycount.is_some() || force || justid {
                return Err(ReplyError::Syntax.into());
            }
            ids.push(id);
            continue;
        }

        use XclaimOption::*;
        match crate::bytes::lex(&argument) {
            Some(Idle) => idle = Some(client.request.u64()?),
            Some(Time) => time = Some(client.request.u64()?),
            Some(Retrycount) => retrycount = Some(client.request.u64()?),
            Some(Force) => force = true,
            Some(Justid) => justid = true,
            None => return Err(ReplyError::InvalidStreamId.into()),
        }
    }

    if ids.is_empty() {
        return Err(ReplyError::InvalidStreamId.into());
    }

    let Some(stream) = store.db.mut_stream(&key)? else {
        return Err(ReplyError::NoGroup(key, group).into());
    };
    if stream.group(&group).is_none() {
        return Err(ReplyError::NoGroup(key, group).into());
    }

    let now = epoch_ms();
    let mut claimed: Vec<Entry> = Vec::new();

    for id in ids {
        let fields = stream.get(id).cloned();
        let state = stream.group_mut(&group).unwrap();

        match state.pel.get(&id) {
            Some(_) if fields.is_none() => {
                // The entry is gone from the stream; drop the dangling
                // pending reference instead of claiming it.
                state.pel.remove(&id);
                continue;
            }
            Some(pending) => {
                if now.saturating_sub(pending.delivery_time) < min_idle {
                    continue;
                }
            }
            None if force && fields.is_some() => {
                state.pel.insert(
                    id,
                    PendingEntry {
                        consumer: consumer.clone(),
                        delivery_time: now,
                        delivery_count: 0,
                    },
                );
            }
            None => continue,
        }

        let pending = state.pel.get_mut(&id).unwrap();
        pending.consumer = consumer.clone();
        pending.delivery_time = match (time, idle) {
            (Some(time), _) => time,
            (None, Some(idle)) => now.saturating_sub(idle),
            (None, None) => now,
        };
        pending.delivery_count = match retrycount {
            Some(count) => count,
            None if justid => pending.delivery_count,
            None => pending.delivery_count + 1,
        };

        claimed.push((id, fields.unwrap_or_default()));
    }

    store.touch(&key);

    if justid {
        client.reply(Reply::Array(claimed.len()));
        for (id, _) in claimed {
            client.reply(id);
        }
    } else {
        client.reply(Reply::Array(claimed.len()));
        for (id, fields) in claimed {
            reply_entry(client, id, &fields);
        }
    }
    Ok(None)
}

#[derive(Clone, Copy, Debug, Eq, Hash, Logos, PartialEq)]
enum XinfoSubcommand {
    #[regex(b"(?i:stream)")]
    Stream,

    #[regex(b"(?i:groups)")]
    Groups,

    #[regex(b"(?i:consumers)")]
    Consumers,
}

pub static XINFO: Command = Command {
    kind: CommandKind::Xinfo,
    name: "xinfo",
    arity: Arity::Minimum(3),
    run: xinfo,
};

fn xinfo(client: &mut Client, store: &mut Store) -> CommandResult {
    let subcommand = crate::bytes::lex::<XinfoSubcommand>(&client.request.pop()?)
        .ok_or(ReplyError::Syntax)?;
    let key = client.request.pop()?;

    let Some(stream) = store.db.get_stream(&key)? else {
        return Err(ReplyError::NoSuchKey.into());
    };

    use XinfoSubcommand::*;
    match subcommand {
        Stream => {
            let first = stream.range(StreamId::MIN, StreamId::MAX).next();
            let first = first.map(|(id, fields)| (id, fields.clone()));
            let last = stream.range(StreamId::MIN, StreamId::MAX).next_back();
            let last = last.map(|(id, fields)| (id, fields.clone()));

            client.reply(Reply::Array(10));
            client.bulk("length");
            client.reply(stream.len());
            client.bulk("last-generated-id");
            client.reply(stream.last_id());
            client.bulk("groups");
            client.reply(stream.groups().len());
            client.bulk("first-entry");
            match first {
                Some((id, fields)) => reply_entry(client, id, &fields),
                None => client.reply(Reply::Nil),
            }
            client.bulk("last-entry");
            match last {
                Some((id, fields)) => reply_entry(client, id, &fields),
                None => client.reply(Reply::Nil),
            }
        }
        Groups => {
            let groups: Vec<_> = stream
                .groups()
                .map(|(name, state)| {
                    (
                        name.clone(),
                        state.consumer_counts().len(),
                        state.pel.len(),
                        state.last_delivered,
                    )
                })
                .collect();

            client.reply(Reply::Array(groups.len()));
            for (name, consumers, pending, last_delivered) in groups {
                client.reply(Reply::Array(8));
                client.bulk("name");
                client.reply(name);
                client.bulk("consumers");
                client.reply(consumers);
                client.bulk("pending");
                client.reply(pending);
                client.bulk("last-delivered-id");
                client.reply(last_delivered);
            }
        }
        Consumers => {
            let group = client.request.pop()?;
            let Some(state) = stream.group(&group) else {
                return Err(ReplyError::NoGroup(key, group).into());
            };

            let now = epoch_ms();
            let mut consumers: Vec<(Bytes, usize, u64)> = Vec::new();
            for pending in state.pel.values() {
                match consumers.iter_mut().find(|(c, _, _)| *c == pending.consumer) {
                    Some((_, count, newest)) => {
                        *count += 1;
                        *newest = (*newest).max(pending.delivery_time);
                    }
                    None => consumers.push((pending.consumer.clone(), 1, pending.delivery_time)),
                }
            }

            client.reply(Reply::Array(consumers.len()));
            for (name, pending, newest) in consumers {
                client.reply(Reply::Array(6));
                client.bulk("name");
                client.reply(name);
                client.bulk("pending");
                client.reply(pending);
                client.bulk("idle");
                client.reply(now.saturating_sub(newest) as i64);
            }
        }
    }

    Ok(None)
}
