use crate::{Command, bytes::Output};
use bytes::Bytes;
use respite::RespError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplyError {
    #[error("ERR The bit argument must be 1 or 0.")]
    BitArgument,

    #[error("ERR bit offset is not an integer or out of range")]
    BitOffset,

    #[error("ERR BITOP NOT must be called with a single source key.")]
    BitopNot,

    #[error("BUSYGROUP Consumer Group name already exists")]
    BusyGroup,

    #[error("ERR DISCARD without MULTI")]
    DiscardWithoutMulti,

    #[error("ERR EXEC without MULTI")]
    ExecWithoutMulti,

    #[error("ERR value is not a valid float")]
    Float,

    #[error("ERR index out of range")]
    IndexOutOfRange,

    #[error("ERR value is not an integer or out of range")]
    Integer,

    #[error("ERR item exists")]
    ItemExists,

    #[error("ERR Invalid argument(s)")]
    InvalidArgument,

    #[error(
        "ERR Invalid bitfield type. Use something like i16 u8. Note that u64 is not supported but i64 is."
    )]
    InvalidBitfield,

    #[error("ERR Invalid OVERFLOW type specified")]
    InvalidOverflow,

    #[error("ERR Invalid stream ID specified as stream command argument")]
    InvalidStreamId,

    #[error("ERR invalid vector operation")]
    InvalidVector,

    #[error("ERR timeout is not an integer or out of range")]
    InvalidTimeout,

    #[error("ERR LIMIT is required")]
    LimitRequired,

    #[error("ERR MULTI calls can not be nested")]
    MultiNested,

    #[error("ERR timeout is negative")]
    NegativeTimeout,

    #[error("NOGROUP No such consumer group '{}' for key name '{}'", Output(.1), Output(.0))]
    NoGroup(Bytes, Bytes),

    #[error("ERR key does not exist")]
    NoSuchKey,

    #[error("WRONGTYPE Key is not a valid HyperLogLog string value.")]
    NotHyperLogLog,

    #[error(
        "ERR Can't execute '{}': only (P)SUBSCRIBE / (P)UNSUBSCRIBE / PING / QUIT are allowed in this context",
        .0.name
    )]
    Pubsub(&'static Command),

    #[error("ERR Protocol Error: {}", .0)]
    Resp(#[from] RespError),

    #[error("ERR The ID specified in XADD is equal or smaller than the target stream top item")]
    SmallStreamId,

    #[error("ERR syntax error")]
    Syntax,

    #[error("ERR too many items")]
    TooManyItems,

    #[error("ERR TSDB: key already exists")]
    TsdbKeyExists,

    #[error("ERR invalid arguments")]
    TsdbInvalidArguments,

    #[error("ERR unknown command")]
    UnknownCommand,

    #[error("ERR WATCH inside MULTI is not allowed")]
    WatchInMulti,

    #[error("ERR wrong number of arguments for '{}' command", .0.name)]
    WrongArguments(&'static Command),

    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,

    #[error("ERR resulting score is not a number (NaN)")]
    ZaddNan,

    #[error("ERR The XGROUP subcommand requires the key to exist")]
    XGroupKeyMissing,
}
