use crate::{
    Client, CommandResult, Reply, ReplyError, Store,
    bytes::{parse, parse_u64_exact},
    command::{Arity, Command, CommandKind},
    db::{Metric, Value, Vector},
};
use bytes::Bytes;

/// How VSEARCH's result window was requested: a positional `topK`, or a
/// keyword `LIMIT offset count`. The two forms are mutually exclusive.
#[derive(Debug, Eq, PartialEq)]
enum Window {
    Top(usize),
    Limit(usize, usize),
}

pub static VSET: Command = Command {
    kind: CommandKind::Vset,
    name: "vset",
    arity: Arity::Minimum(3),
    run: vset,
};

fn vset(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;

    let mut components = Vec::with_capacity(client.request.remaining());
    while !client.request.is_empty() {
        components.push(client.request.finite_f64()?);
    }

    // Overwriting an existing vector kind is allowed; any other kind is not.
    if let Some(value) = store.db.get(&key) {
        value.as_vector()?;
    }

    store.db.set(&key, Value::from(Vector::new(components)));
    store.touch(&key);
    client.reply("OK");
    Ok(None)
}

pub static VGET: Command = Command {
    kind: CommandKind::Vget,
    name: "vget",
    arity: Arity::Exact(2),
    run: vget,
};

fn vget(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let Some(value) = store.db.get(&key) else {
        return Err(Reply::Nil);
    };
    let vector = value.as_vector()?;

    let components: Vec<f64> = vector.components().to_vec();
    client.reply(Reply::Array(components.len()));
    for component in components {
        client.reply(component);
    }
    Ok(None)
}

pub static VDIM: Command = Command {
    kind: CommandKind::Vdim,
    name: "vdim",
    arity: Arity::Exact(2),
    run: vdim,
};

fn vdim(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let Some(value) = store.db.get(&key) else {
        return Err(ReplyError::NoSuchKey.into());
    };
    let dim = value.as_vector()?.dim();
    client.reply(dim);
    Ok(None)
}

pub static VDEL: Command = Command {
    kind: CommandKind::Vdel,
    name: "vdel",
    arity: Arity::Exact(2),
    run: vdel,
};

fn vdel(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;

    if let Some(value) = store.db.get(&key) {
        value.as_vector()?;
    } else {
        client.reply(0);
        return Ok(None);
    }

    store.db.remove(&key);
    store.touch(&key);
    client.reply(1);
    Ok(None)
}

pub static VSIM: Command = Command {
    kind: CommandKind::Vsim,
    name: "vsim",
    arity: Arity::Minimum(3),
    run: vsim,
};

fn vsim(client: &mut Client, store: &mut Store) -> CommandResult {
    let a = client.request.pop()?;
    let b = client.request.pop()?;

    let metric = match client.request.try_pop() {
        None => Metric::Cosine,
        Some(name) => {
            if !client.request.is_empty() {
                return Err(ReplyError::Syntax.into());
            }
            Metric::parse(&name).ok_or(ReplyError::InvalidVector)?
        }
    };

    let Some(a) = store.db.get(&a) else {
        return Err(ReplyError::NoSuchKey.into());
    };
    let a = a.as_vector()?;
    let Some(b) = store.db.get(&b) else {
        return Err(ReplyError::NoSuchKey.into());
    };
    let b = b.as_vector()?;

    let score = a
        .score(b.components(), metric)
        .ok_or(ReplyError::InvalidVector)?;
    client.reply(score);
    Ok(None)
}

pub static VSEARCH: Command = Command {
    kind: CommandKind::Vsearch,
    name: "vsearch",
    arity: Arity::Minimum(4),
    run: vsearch,
};

fn vsearch(client: &mut Client, store: &mut Store) -> CommandResult {
    let prefix = client.request.pop()?;

    // Positional form: `topK metric`. Keyword form: `metric LIMIT off count`.
    let first = client.request.pop()?;
    let (window, metric) = match parse_u64_exact(&first) {
        Some(top) => {
            let top = usize::try_from(top).map_err(|_| ReplyError::Integer)?;
            let metric =
                Metric::parse(&client.request.pop()?).ok_or(ReplyError::InvalidVector)?;
            (Window::Top(top), metric)
        }
        None => {
            let metric = Metric::parse(&first).ok_or(ReplyError::InvalidVector)?;
            let keyword = client.request.pop()?;
            if !keyword.eq_ignore_ascii_case(b"limit") {
                return Err(ReplyError::LimitRequired.into());
            }
            let offset = client.request.usize()?;
            let count = client.request.usize()?;
            (Window::Limit(offset, count), metric)
        }
    };

    let mut query = Vec::with_capacity(client.request.remaining());
    while !client.request.is_empty() {
        let component = client.request.pop()?;
        // A stray keyword here means the two forms were mixed.
        let Some(component) = parse::<f64>(&component) else {
            return Err(ReplyError::Syntax.into());
        };
        query.push(component);
    }

    if query.is_empty() {
        return Err(client.request.wrong_arguments().into());
    }

    // Score every vector key under the prefix; other kinds and mismatched
    // dimensions are skipped.
    let mut scored: Vec<(Bytes, f64)> = store
        .db
        .iter()
        .filter(|(key, _)| key.starts_with(&prefix[..]))
        .filter_map(|(key, value)| {
            let vector = value.as_vector().ok()?;
            let score = vector.score(&query, metric)?;
            Some((key.clone(), score))
        })
        .collect();

    scored.sort_by(|(a_key, a), (b_key, b)| {
        if metric.better(*a, *b) {
            std::cmp::Ordering::Less
        } else if metric.better(*b, *a) {
            std::cmp::Ordering::Greater
        } else {
            a_key.cmp(b_key)
        }
    });

    let results: Vec<(Bytes, f64)> = match window {
        Window::Top(top) => scored.into_iter().take(top).collect(),
        Window::Limit(offset, count) => scored.into_iter().skip(offset).take(count).collect(),
    };

    client.reply(Reply::Array(2 * results.len()));
    for (key, score) in results {
        client.reply(key);
        client.reply(score);
    }
    Ok(None)
}
