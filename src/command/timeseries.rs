use crate::{
    Client, CommandResult, Reply, ReplyError, Store,
    bytes::{lex, parse_u64_exact},
    command::{Arity, Command, CommandKind},
    db::{Aggregation, TimeSeries, Value},
    time::epoch_ms,
};
use logos::Logos;

#[derive(Clone, Copy, Debug, Eq, Hash, Logos, PartialEq)]
enum TsOption {
    #[regex(b"(?i:retention)")]
    Retention,

    #[regex(b"(?i:timestamp)")]
    Timestamp,

    #[regex(b"(?i:aggregation)")]
    Aggregation,

    #[regex(b"(?i:count)")]
    Count,
}

/// Fetch a mutable series, or the error for a missing key.
fn series<'a>(store: &'a mut Store, key: &[u8]) -> Result<&'a mut TimeSeries, Reply> {
    let Some(value) = store.db.get_mut(key) else {
        return Err(ReplyError::NoSuchKey.into());
    };
    Ok(value.mut_series()?)
}

/// Parse a range endpoint: `-`/`+` or a timestamp in milliseconds.
fn endpoint(bytes: &[u8], open: u64) -> Result<u64, ReplyError> {
    match bytes {
        b"-" | b"+" => Ok(open),
        _ => parse_u64_exact(bytes).ok_or(ReplyError::TsdbInvalidArguments),
    }
}

pub static TS_CREATE: Command = Command {
    kind: CommandKind::TsCreate,
    name: "ts.create",
    arity: Arity::Minimum(2),
    run: ts_create,
};

fn ts_create(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;

    let retention = match client.request.try_pop() {
        None => 0,
        Some(flag) => match lex(&flag) {
            Some(TsOption::Retention) => {
                let retention = client
                    .request
                    .u64()
                    .map_err(|_| ReplyError::TsdbInvalidArguments)?;
                if !client.request.is_empty() {
                    return Err(ReplyError::TsdbInvalidArguments.into());
                }
                retention
            }
            _ => return Err(ReplyError::TsdbInvalidArguments.into()),
        },
    };

    if store.db.exists(&key) {
        return Err(ReplyError::TsdbKeyExists.into());
    }

    store.db.set(&key, Value::from(TimeSeries::new(retention)));
    store.touch(&key);
    client.reply("OK");
    Ok(None)
}

pub static TS_ADD: Command = Command {
    kind: CommandKind::TsAdd,
    name: "ts.add",
    arity: Arity::Exact(4),
    run: ts_add,
};

fn ts_add(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let timestamp = client.request.pop()?;
    let value = client
        .request
        .f64()
        .map_err(|_| ReplyError::TsdbInvalidArguments)?;

    let timestamp = match &timestamp[..] {
        b"*" => epoch_ms(),
        bytes => parse_u64_exact(bytes).ok_or(ReplyError::TsdbInvalidArguments)?,
    };

    // The first TS.ADD on a missing key creates the series.
    let series = store
        .db
        .entry_or_insert_with(&key, || Value::from(TimeSeries::new(0)))
        .mut_series()?;

    series.add(timestamp, value);
    store.touch(&key);
    client.reply(timestamp as i64);
    Ok(None)
}

pub static TS_INCRBY: Command = Command {
    kind: CommandKind::TsIncrby,
    name: "ts.incrby",
    arity: Arity::Minimum(3),
    run: ts_incrby,
};

fn ts_incrby(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let delta = client
        .request
        .f64()
        .map_err(|_| ReplyError::TsdbInvalidArguments)?;
    apply_delta(client, store, key, delta)
}

pub static TS_DECRBY: Command = Command {
    kind: CommandKind::TsDecrby,
    name: "ts.decrby",
    arity: Arity::Minimum(3),
    run: ts_decrby,
};

fn ts_decrby(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let delta = client
        .request
        .f64()
        .map_err(|_| ReplyError::TsdbInvalidArguments)?;
    apply_delta(client, store, key, -delta)
}

fn apply_delta(
    client: &mut Client,
    store: &mut Store,
    key: bytes::Bytes,
    delta: f64,
) -> CommandResult {
    let timestamp = match client.request.try_pop() {
        None => epoch_ms(),
        Some(flag) => match lex(&flag) {
            Some(TsOption::Timestamp) => {
                let at = client.request.pop()?;
                if !client.request.is_empty() {
                    return Err(ReplyError::TsdbInvalidArguments.into());
                }
                match &at[..] {
                    b"*" => epoch_ms(),
                    bytes => parse_u64_exact(bytes).ok_or(ReplyError::TsdbInvalidArguments)?,
                }
            }
            _ => return Err(ReplyError::TsdbInvalidArguments.into()),
        },
    };

    let series = store
        .db
        .entry_or_insert_with(&key, || Value::from(TimeSeries::new(0)))
        .mut_series()?;

    let (last_ts, last_value) = series.last().unwrap_or((0, 0.0));
    if timestamp < last_ts {
        return Err(ReplyError::TsdbInvalidArguments.into());
    }

    series.add(timestamp, last_value + delta);
    store.touch(&key);
    client.reply(timestamp as i64);
    Ok(None)
}

pub static TS_GET: Command = Command {
    kind: CommandKind::TsGet,
    name: "ts.get",
    arity: Arity::Exact(2),
    run: ts_get,
};

fn ts_get(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let series = series(store, &key)?;

    match series.last() {
        Some((timestamp, value)) => {
            client.reply(Reply::Array(2));
            client.reply(timestamp as i64);
            client.reply(value);
        }
        None => client.reply(Reply::Array(0)),
    }
    Ok(None)
}

fn range(client: &mut Client, store: &mut Store, reverse: bool) -> CommandResult {
    let key = client.request.pop()?;
    let from = endpoint(&client.request.pop()?, 0)?;
    let to = endpoint(&client.request.pop()?, u64::MAX)?;

    let mut aggregation = None;
    let mut count = None;

    while let Some(flag) = client.request.try_pop() {
        match lex(&flag) {
            Some(TsOption::Aggregation) => {
                let function = Aggregation::parse(&client.request.pop()?)
                    .ok_or(ReplyError::TsdbInvalidArguments)?;
                let bucket = client
                    .request
                    .u64()
                    .map_err(|_| ReplyError::TsdbInvalidArguments)?;
                if bucket == 0 {
                    return Err(ReplyError::TsdbInvalidArguments.into());
                }
                aggregation = Some((function, bucket));
            }
            Some(TsOption::Count) => {
                count = Some(
                    client
                        .request
                        .usize()
                        .map_err(|_| ReplyError::TsdbInvalidArguments)?,
                );
            }
            _ => return Err(ReplyError::TsdbInvalidArguments.into()),
        }
    }

    let series = series(store, &key)?;

    let mut rows: Vec<(u64, f64)> = match aggregation {
        None => series.range(from, to).collect(),
        Some((function, bucket)) => {
            // Group samples into aligned buckets, then fold each one.
            let mut buckets: Vec<(u64, Vec<f64>)> = Vec::new();
            for (timestamp, value) in series.range(from, to) {
                let start = timestamp - timestamp % bucket;
                match buckets.last_mut() {
                    Some((current, values)) if *current == start => values.push(value),
                    _ => buckets.push((start, vec![value])),
                }
            }
            buckets
                .into_iter()
                .map(|(start, values)| (start, function.apply(&values)))
                .collect()
        }
    };

    if reverse {
        rows.reverse();
    }
    if let Some(count) = count {
        rows.truncate(count);
    }

    client.reply(Reply::Array(rows.len()));
    for (timestamp, value) in rows {
        client.reply(Reply::Array(2));
        client.reply(timestamp as i64);
        client.reply(value);
    }
    Ok(None)
}

pub static TS_RANGE: Command = Command {
    kind: CommandKind::TsRange,
    name: "ts.range",
    arity: Arity::Minimum(4),
    run: ts_range,
};

fn ts_range(client: &mut Client, store: &mut Store) -> CommandResult {
    range(client, store, false)
}

pub static TS_REVRANGE: Command = Command {
    kind: CommandKind::TsRevrange,
    name: "ts.revrange",
    arity: Arity::Minimum(4),
    run: ts_revrange,
};

fn ts_revrange(client: &mut Client, store: &mut Store) -> CommandResult {
    range(client, store, true)
}

pub static TS_DEL: Command = Command {
    kind: CommandKind::TsDel,
    name: "ts.del",
    arity: Arity::Exact(4),
    run: ts_del,
};

fn ts_del(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let from = endpoint(&client.request.pop()?, 0)?;
    let to = endpoint(&client.request.pop()?, u64::MAX)?;

    let removed = series(store, &key)?.delete(from, to);
    if removed > 0 {
        store.touch(&key);
    }
    client.reply(removed);
    Ok(None)
}

pub static TS_INFO: Command = Command {
    kind: CommandKind::TsInfo,
    name: "ts.info",
    arity: Arity::Exact(2),
    run: ts_info,
};

fn ts_info(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let series = series(store, &key)?;

    let samples = series.len();
    let first = series.first().map_or(0, |(timestamp, _)| timestamp);
    let last = series.last().map_or(0, |(timestamp, _)| timestamp);
    let retention = series.retention();

    client.reply(Reply::Array(8));
    client.bulk("totalSamples");
    client.reply(samples);
    client.bulk("firstTimestamp");
    client.reply(first as i64);
    client.bulk("lastTimestamp");
    client.reply(last as i64);
    client.bulk("retentionTime");
    client.reply(retention as i64);
    Ok(None)
}
