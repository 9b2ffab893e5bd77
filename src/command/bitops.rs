use crate::{
    Client, CommandResult, Reply, ReplyError, Store,
    bytes::{lex, parse_u64_exact},
    command::{Arity, Command, CommandKind},
    db::Value,
    slice::slice,
};
use logos::Logos;
use std::cmp::max;

#[derive(Clone, Copy, Debug, Eq, Hash, Logos, PartialEq)]
enum Unit {
    #[regex(b"(?i:bit)")]
    Bit,

    #[regex(b"(?i:byte)")]
    Byte,
}

/// A bitfield slot: signedness, width in bits, and absolute bit offset.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
struct Field {
    signed: bool,
    bits: usize,
    offset: usize,
}

#[derive(Clone, Copy, Debug, Eq, Logos, PartialEq)]
enum OverflowType {
    #[regex(b"(?i:wrap)")]
    Wrap,

    #[regex(b"(?i:sat)")]
    Sat,

    #[regex(b"(?i:fail)")]
    Fail,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Overflow {
    Wrap,
    Sat,
    Fail,
}

#[derive(Debug, Eq, PartialEq)]
enum BitfieldOp {
    Get(Field),
    Set(Field, i64),
    Incrby(Field, i64),
    Overflow(Overflow),
}

/// Read a field out of the value, sign- or zero-extending to an i64.
fn get_field(mut value: &[u8], field: Field) -> i64 {
    let Field {
        signed,
        bits,
        offset,
    } = field;

    if value.len() > offset / 8 {
        value = &value[offset / 8..];
    }

    let mut buffer = [0u8; 16];
    let len = value.len().min(buffer.len());
    buffer[..len].copy_from_slice(&value[..len]);

    if signed {
        let wide = i128::from_be_bytes(buffer) << (offset % 8);
        i64::try_from(wide >> (128 - bits)).unwrap()
    } else {
        let wide = u128::from_be_bytes(buffer) << (offset % 8);
        i64::try_from(wide >> (128 - bits)).unwrap()
    }
}

/// Write a field into the value, leaving surrounding bits untouched.
fn set_field(value: &mut [u8], field: Field, n: i64) {
    let Field { bits, offset, .. } = field;

    let value = {
        let end = (offset + bits - 1) / 8 + 1;
        &mut value[offset / 8..end]
    };

    // Build the new bits, the existing bytes, and a mask selecting the
    // field's position, all left-aligned in 128 bits.
    let inner = (n as u128) << (128 - bits - offset % 8);

    let outer = {
        let mut bytes = [0u8; 16];
        bytes[..value.len()].copy_from_slice(value);
        u128::from_be_bytes(bytes)
    };

    let mask = (!0u128 << (128 - bits)) >> (offset % 8);

    let result = (outer & !mask | inner & mask).to_be_bytes();
    value.copy_from_slice(&result[..value.len()]);
}

/// Add `by` to `value` within the field's width, applying the overflow
/// policy. `None` means the operation failed.
fn increment_field(field: Field, value: i64, by: i64, overflow: Overflow) -> Option<i64> {
    let Field { signed, bits, .. } = field;

    let (result, mut wrapped) = value.overflowing_add(by);

    // Detect overflow at the field's width.
    wrapped |= if signed {
        let mask = !0 << (bits - 1);
        if result >= 0 {
            result & mask != 0
        } else {
            !result & mask != 0
        }
    } else {
        let mask = !0 << bits;
        result < 0 || mask & result != 0
    };

    if !wrapped {
        return Some(result);
    }

    use Overflow::*;
    match overflow {
        Fail => None,
        Wrap if bits >= 64 => Some(result),
        Wrap => Some(result & !(!0 << bits)),
        Sat => Some(match (signed, result < 0) {
            (true, true) => !0 << (bits - 1),
            (true, false) => !(!0 << (bits - 1)),
            (false, true) => 0,
            (false, false) => !(!0 << bits),
        }),
    }
}

pub static SETBIT: Command = Command {
    kind: CommandKind::Setbit,
    name: "setbit",
    arity: Arity::Exact(4),
    run: setbit,
};

fn setbit(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let offset = client.request.bit_offset()?;
    let bit = client.request.bit()?;

    let byte = offset / 8;
    let mask = 0x80 >> (offset % 8);

    if byte >= store.reader_config.blob_limit() {
        return Err(ReplyError::BitOffset.into());
    }

    let value = store
        .db
        .entry_or_insert_with(&key, Value::string)
        .mut_string()?
        .make_mut();

    if value.len() <= byte {
        value.resize(byte + 1, 0);
    }

    let original = value[byte] & mask != 0;

    if bit {
        value[byte] |= mask;
    } else {
        value[byte] &= !mask;
    }

    store.touch(&key);
    client.reply(i64::from(original));
    Ok(None)
}

pub static GETBIT: Command = Command {
    kind: CommandKind::Getbit,
    name: "getbit",
    arity: Arity::Exact(3),
    run: getbit,
};

fn getbit(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let offset = client.request.bit_offset()?;
    let value = store.db.get_string(&key)?.ok_or(0)?;

    let byte = value.as_slice().get(offset / 8).copied().unwrap_or(0);
    let bit = byte & (0x80 >> (offset % 8)) != 0;

    client.reply(i64::from(bit));
    Ok(None)
}

pub static BITCOUNT: Command = Command {
    kind: CommandKind::Bitcount,
    name: "bitcount",
    arity: Arity::Minimum(2),
    run: bitcount,
};

/// Count the set bits of `value` inside a half-open bit range.
fn count_bits(value: &[u8], bits: std::ops::Range<usize>) -> i64 {
    let mut count = 0i64;
    for index in bits.start / 8..=(bits.end - 1) / 8 {
        let mut byte = value[index];

        // Mask off bits before the range in the first byte and after the
        // range in the last byte.
        if index == bits.start / 8 {
            byte &= !0u8 >> (bits.start % 8);
        }
        if index == (bits.end - 1) / 8 {
            let keep = (bits.end - 1) % 8;
            byte &= 0xffu8 << (7 - keep);
        }

        count += i64::from(byte.count_ones());
    }
    count
}

fn bit_range(client: &mut Client, len: usize) -> Result<Option<std::ops::Range<usize>>, Reply> {
    let (start, end) = match client.request.remaining() {
        0 => (0, -1),
        2 => {
            let start = client.request.i64()?;
            let end = client.request.i64()?;
            (8 * start, 7 + 8 * end)
        }
        3 => {
            let start = client.request.i64()?;
            let end = client.request.i64()?;
            match lex(&client.request.pop()?) {
                Some(Unit::Bit) => (start, end),
                Some(Unit::Byte) => (8 * start, 7 + 8 * end),
                None => return Err(ReplyError::Syntax.into()),
            }
        }
        _ => return Err(ReplyError::Syntax.into()),
    };

    Ok(slice(8 * len, start, end))
}

fn bitcount(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let value = store.db.get_string(&key)?.cloned().unwrap_or_default();
    let Some(range) = bit_range(client, value.len())? else {
        return Err(0.into());
    };

    client.reply(count_bits(value.as_slice(), range));
    Ok(None)
}

pub static BITPOS: Command = Command {
    kind: CommandKind::Bitpos,
    name: "bitpos",
    arity: Arity::Minimum(3),
    run: bitpos,
};

fn bitpos(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let bit = client.request.bit()?;
    let end_given = client.request.remaining() >= 2;

    let (start, end) = match client.request.remaining() {
        0 => (0, -1),
        1 => (8 * client.request.i64()?, -1),
        2 | 3 => {
            let start = client.request.i64()?;
            let end = client.request.i64()?;
            match client.request.try_pop() {
                None => (8 * start, 7 + 8 * end),
                Some(unit) => match lex(&unit) {
                    Some(Unit::Bit) => (start, end),
                    Some(Unit::Byte) => (8 * start, 7 + 8 * end),
                    None => return Err(ReplyError::Syntax.into()),
                },
            }
        }
        _ => return Err(ReplyError::Syntax.into()),
    };

    let value = store.db.get_string(&key)?.cloned().unwrap_or_default();

    if value.is_empty() {
        client.reply(if bit { -1 } else { 0 });
        return Ok(None);
    }

    let Some(range) = slice(8 * value.len(), start, end) else {
        return Err((-1).into());
    };

    let bytes = value.as_slice();
    let found = range.clone().find(|position| {
        let byte = bytes[position / 8];
        (byte & (0x80 >> (position % 8)) != 0) == bit
    });

    match found {
        Some(position) => client.reply(position),
        // Looking for a zero past the end of the string succeeds unless the
        // caller limited the range explicitly.
        None if !bit && !end_given => client.reply(8 * value.len()),
        None => client.reply(-1),
    }

    Ok(None)
}

pub static BITOP: Command = Command {
    kind: CommandKind::Bitop,
    name: "bitop",
    arity: Arity::Minimum(4),
    run: bitop,
};

#[derive(Debug, Eq, PartialEq, Logos)]
enum BitopType {
    #[regex(b"(?i:and)")]
    And,

    #[regex(b"(?i:or)")]
    Or,

    #[regex(b"(?i:xor)")]
    Xor,

    #[regex(b"(?i:not)")]
    Not,
}

fn bitop(client: &mut Client, store: &mut Store) -> CommandResult {
    let Some(op) = lex::<BitopType>(&client.request.pop()?) else {
        return Err(ReplyError::Syntax.into());
    };

    if op == BitopType::Not {
        return bitop_not(client, store);
    }

    let destination = client.request.pop()?;
    let mut sources: Vec<Vec<u8>> = Vec::new();

    while !client.request.is_empty() {
        let key = client.request.pop()?;
        let value = store
            .db
            .get_string(&key)?
            .map(|value| value.as_slice().to_vec())
            .unwrap_or_default();
        sources.push(value);
    }

    let len = sources.iter().map(Vec::len).fold(0, max);

    // All-empty sources delete the destination.
    if len == 0 {
        if store.db.remove(&destination).is_some() {
            store.touch(&destination);
        }
        client.reply(0);
        return Ok(None);
    }

    let (init, op): (u8, fn(u8, u8) -> u8) = match op {
        BitopType::And => (0xff, |a, b| a & b),
        BitopType::Or => (0, |a, b| a | b),
        BitopType::Xor => (0, |a, b| a ^ b),
        BitopType::Not => unreachable!(),
    };

    let mut result = vec![init; len];
    for source in &sources {
        for (index, value) in result.iter_mut().enumerate() {
            *value = op(*value, source.get(index).copied().unwrap_or(0));
        }
    }

    store.db.set(&destination, result);
    store.touch(&destination);
    client.reply(len);
    Ok(None)
}

fn bitop_not(client: &mut Client, store: &mut Store) -> CommandResult {
    let destination = client.request.pop()?;
    let source = client.request.pop()?;

    if !client.request.is_empty() {
        return Err(ReplyError::BitopNot.into());
    }

    let value = store.db.get_string(&source)?.cloned().unwrap_or_default();
    let len = value.len();

    if len == 0 {
        if store.db.remove(&destination).is_some() {
            store.touch(&destination);
        }
        client.reply(0);
        return Ok(None);
    }

    let result: Vec<u8> = value.as_slice().iter().map(|byte| !byte).collect();
    store.db.set(&destination, result);
    store.touch(&destination);
    client.reply(len);
    Ok(None)
}

pub static BITFIELD: Command = Command {
    kind: CommandKind::Bitfield,
    name: "bitfield",
    arity: Arity::Minimum(2),
    run: bitfield,
};

#[derive(Clone, Copy, Debug, Eq, Logos, PartialEq)]
enum BitfieldOpType {
    #[regex(b"(?i:get)")]
    Get,

    #[regex(b"(?i:set)")]
    Set,

    #[regex(b"(?i:incrby)")]
    Incrby,

    #[regex(b"(?i:overflow)")]
    Overflow,
}

fn field(client: &mut Client) -> Result<Field, ReplyError> {
    let arg = client.request.pop()?;
    let signed = match arg.first() {
        Some(b'i') => true,
        Some(b'u') => false,
        _ => return Err(ReplyError::InvalidBitfield),
    };

    let bits = match parse_u64_exact(&arg[1..]) {
        Some(bits) if signed && bits <= 64 && bits > 0 => bits as usize,
        Some(bits) if !signed && bits <= 63 && bits > 0 => bits as usize,
        _ => return Err(ReplyError::InvalidBitfield),
    };

    let offset = client.request.pop()?;
    let offset = match offset.first() {
        Some(b'#') => parse_u64_exact(&offset[1..])
            .and_then(|n| usize::try_from(n).ok())
            .and_then(|n| n.checked_mul(bits)),
        _ => parse_u64_exact(&offset[..]).and_then(|n| usize::try_from(n).ok()),
    }
    .ok_or(ReplyError::BitOffset)?;

    Ok(Field {
        signed,
        bits,
        offset,
    })
}

/// Parse every subcommand up front, so a malformed argument rejects the
/// whole call before any state changes.
fn bitfield_ops(client: &mut Client) -> Result<Vec<BitfieldOp>, ReplyError> {
    let mut ops = Vec::new();

    while !client.request.is_empty() {
        let Some(op) = lex(&client.request.pop()?[..]) else {
            return Err(ReplyError::Syntax);
        };

        ops.push(match op {
            BitfieldOpType::Get => BitfieldOp::Get(field(client)?),
            BitfieldOpType::Set => {
                let field = field(client)?;
                BitfieldOp::Set(field, client.request.i64()?)
            }
            BitfieldOpType::Incrby => {
                let field = field(client)?;
                BitfieldOp::Incrby(field, client.request.i64()?)
            }
            BitfieldOpType::Overflow => match lex(&client.request.pop()?[..]) {
                Some(OverflowType::Wrap) => BitfieldOp::Overflow(Overflow::Wrap),
                Some(OverflowType::Sat) => BitfieldOp::Overflow(Overflow::Sat),
                Some(OverflowType::Fail) => BitfieldOp::Overflow(Overflow::Fail),
                None => return Err(ReplyError::InvalidOverflow),
            },
        });
    }

    Ok(ops)
}

fn bitfield(client: &mut Client, store: &mut Store) -> CommandResult {
    let key = client.request.pop()?;
    let ops = bitfield_ops(client)?;

    // The last byte any write touches decides how far the value grows.
    let last_write = ops
        .iter()
        .filter_map(|op| match op {
            BitfieldOp::Set(field, _) | BitfieldOp::Incrby(field, _) => {
                Some((field.offset + field.bits - 1) / 8 + 1)
            }
            _ => None,
        })
        .fold(None, |acc: Option<usize>, byte| {
            Some(acc.map_or(byte, |acc| acc.max(byte)))
        });

    if last_write.is_some_and(|byte| byte > store.reader_config.blob_limit()) {
        return Err(ReplyError::BitOffset.into());
    }

    let results = ops
        .iter()
        .filter(|op| !matches!(op, BitfieldOp::Overflow(_)))
        .count();
    client.reply(Reply::Array(results));

    let mut stack;
    let value: &mut Vec<u8> = match last_write {
        Some(byte) => {
            let value = store
                .db
                .entry_or_insert_with(&key, Value::string)
                .mut_string()?
                .make_mut();
            if value.len() < byte {
                value.resize(byte, 0);
            }
            value
        }
        None => {
            stack = store
                .db
                .get_string(&key)?
                .map(|value| value.as_slice().to_vec())
                .unwrap_or_default();
            &mut stack
        }
    };

    let mut overflow = Overflow::Wrap;
    for op in ops {
        use BitfieldOp::*;
        match op {
            Get(field) => {
                client.reply(get_field(value, field));
            }
            Set(field, n) => {
                let original = get_field(value, field);
                if let Some(result) = increment_field(field, n, 0, overflow) {
                    set_field(value, field, result);
                    client.reply(original);
                } else {
                    client.reply(Reply::Nil);
                }
            }
            Incrby(field, by) => {
                let n = get_field(value, field);
                if let Some(result) = increment_field(field, n, by, overflow) {
                    set_field(value, field, result);
                    client.reply(result);
                } else {
                    client.reply(Reply::Nil);
                }
            }
            Overflow(value) => {
                overflow = value;
            }
        }
    }

    if last_write.is_some() {
        store.touch(&key);
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_round_trip() {
        let mut value = vec![0u8; 4];
        let field = Field {
            signed: false,
            bits: 8,
            offset: 0,
        };
        set_field(&mut value, field, 200);
        assert_eq!(get_field(&value, field), 200);
    }

    #[test]
    fn signed_fields_sign_extend() {
        let mut value = vec![0u8; 2];
        let field = Field {
            signed: true,
            bits: 5,
            offset: 3,
        };
        set_field(&mut value, field, -5);
        assert_eq!(get_field(&value, field), -5);
    }

    #[test]
    fn unaligned_fields_do_not_clobber_neighbors() {
        let mut value = vec![0xffu8; 3];
        let field = Field {
            signed: false,
            bits: 7,
            offset: 5,
        };
        set_field(&mut value, field, 0);
        assert_eq!(get_field(&value, field), 0);
        assert_eq!(value[0] & 0xf8, 0xf8);
        assert_eq!(value[1] & 0x0f, 0x0f);
    }

    #[test]
    fn wrap_overflow() {
        let field = Field {
            signed: false,
            bits: 8,
            offset: 0,
        };
        assert_eq!(increment_field(field, 200, 60, Overflow::Wrap), Some(4));
    }

    #[test]
    fn sat_overflow() {
        let signed = Field {
            signed: true,
            bits: 8,
            offset: 0,
        };
        assert_eq!(increment_field(signed, 120, 20, Overflow::Sat), Some(127));
        assert_eq!(increment_field(signed, -120, -20, Overflow::Sat), Some(-128));

        let unsigned = Field {
            signed: false,
            bits: 8,
            offset: 0,
        };
        assert_eq!(increment_field(unsigned, 200, 60, Overflow::Sat), Some(255));
        assert_eq!(increment_field(unsigned, 10, -20, Overflow::Sat), Some(0));
    }

    #[test]
    fn fail_overflow() {
        let field = Field {
            signed: true,
            bits: 8,
            offset: 0,
        };
        assert_eq!(increment_field(field, 127, 1, Overflow::Fail), None);
        assert_eq!(increment_field(field, 100, 1, Overflow::Fail), Some(101));
    }

    #[test]
    fn count_bit_ranges() {
        // 0b01000000 0b00000001
        let value = [0x40u8, 0x01];
        assert_eq!(count_bits(&value, 0..16), 2);
        assert_eq!(count_bits(&value, 0..8), 1);
        assert_eq!(count_bits(&value, 2..16), 1);
        assert_eq!(count_bits(&value, 15..16), 1);
    }
}
