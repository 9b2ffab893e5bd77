mod bitops;
mod bloom;
mod cuckoo;
mod generic;
mod hash;
mod hll;
mod list;
mod pubsub;
mod set;
mod sorted_set;
mod stream;
mod string;
mod tdigest;
mod timeseries;
mod topk;
mod tx;
mod vector;

pub use bitops::*;
pub use bloom::*;
pub use cuckoo::*;
pub use generic::*;
pub use hash::*;
pub use hll::*;
pub use list::*;
pub use pubsub::*;
pub use set::*;
pub use sorted_set::*;
pub use stream::*;
pub use string::*;
pub use tdigest::*;
pub use timeseries::*;
pub use topk::*;
pub use tx::*;
pub use vector::*;

use crate::{bytes::lex, client::Client, reply::Reply, store::Store};
use logos::Logos;
use std::{iter::StepBy, ops::Range, time::Duration};

/// A description of the number of arguments a command accepts, counting the
/// command name itself.
#[derive(Debug)]
pub enum Arity {
    Exact(u8),
    Minimum(u8),
}

/// The result of a blocking command: which argument positions hold the keys
/// to wait on, and for how long.
pub struct BlockResult {
    /// The keys a command is blocking on, as argument indices.
    pub keys: StepBy<Range<usize>>,

    /// The timeout for the blocking operation. Zero means forever.
    pub timeout: Duration,
}

impl BlockResult {
    pub fn new(timeout: Duration, keys: StepBy<Range<usize>>) -> Self {
        Self { timeout, keys }
    }
}

/// The result of a command being run.
pub type CommandResult = Result<Option<BlockResult>, Reply>;

/// Information about a particular command that can be run.
pub struct Command {
    /// What kind of command is this?
    pub kind: CommandKind,

    /// The name of the command.
    pub name: &'static str,

    /// What are the arguments to this command?
    pub arity: Arity,

    /// What function runs this command?
    pub run: fn(&mut Client, &mut Store) -> CommandResult,
}

impl From<&[u8]> for &'static Command {
    fn from(value: &[u8]) -> &'static Command {
        lex::<CommandKind>(value).map_or(&UNKNOWN, |kind| kind.command())
    }
}

impl Command {
    /// Is this command allowed while subscribed?
    pub fn pubsub_allowed(&self) -> bool {
        use CommandKind::*;
        matches!(
            self.kind,
            Subscribe | Psubscribe | Unsubscribe | Punsubscribe | Ping | Quit
        )
    }

    /// Is this command queueable during a transaction?
    pub fn queueable(&self) -> bool {
        use CommandKind::*;
        !matches!(self.kind, Exec | Discard | Multi | Watch | Quit | Unknown)
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("arity", &self.arity)
            .field("kind", &self.kind)
            .field("name", &self.name)
            .finish()
    }
}

pub static UNKNOWN: Command = Command {
    kind: CommandKind::Unknown,
    name: "unknown",
    arity: Arity::Minimum(0),
    run: unknown,
};

fn unknown(_: &mut Client, _: &mut Store) -> CommandResult {
    Err(crate::reply::ReplyError::UnknownCommand.into())
}

#[derive(Clone, Copy, Debug, Eq, Hash, Logos, PartialEq)]
pub enum CommandKind {
    #[regex(b"(?i:bitcount)")]
    Bitcount,

    #[regex(b"(?i:bitfield)")]
    Bitfield,

    #[regex(b"(?i:bitop)")]
    Bitop,

    #[regex(b"(?i:bitpos)")]
    Bitpos,

    #[regex(b"(?i:bf\\.add)")]
    BfAdd,

    #[regex(b"(?i:bf\\.exists)")]
    BfExists,

    #[regex(b"(?i:bf\\.info)")]
    BfInfo,

    #[regex(b"(?i:bf\\.madd)")]
    BfMadd,

    #[regex(b"(?i:bf\\.mexists)")]
    BfMexists,

    #[regex(b"(?i:bf\\.reserve)")]
    BfReserve,

    #[regex(b"(?i:cf\\.add)")]
    CfAdd,

    #[regex(b"(?i:cf\\.addnx)")]
    CfAddnx,

    #[regex(b"(?i:cf\\.count)")]
    CfCount,

    #[regex(b"(?i:cf\\.del)")]
    CfDel,

    #[regex(b"(?i:cf\\.exists)")]
    CfExists,

    #[regex(b"(?i:cf\\.info)")]
    CfInfo,

    #[regex(b"(?i:cf\\.insert)")]
    CfInsert,

    #[regex(b"(?i:cf\\.reserve)")]
    CfReserve,

    #[regex(b"(?i:decr)")]
    Decr,

    #[regex(b"(?i:decrby)")]
    Decrby,

    #[regex(b"(?i:del)")]
    Del,

    #[regex(b"(?i:discard)")]
    Discard,

    #[regex(b"(?i:echo)")]
    Echo,

    #[regex(b"(?i:exec)")]
    Exec,

    #[regex(b"(?i:exists)")]
    Exists,

    #[regex(b"(?i:expire)")]
    Expire,

    #[regex(b"(?i:get)")]
    Get,

    #[regex(b"(?i:getbit)")]
    Getbit,

    #[regex(b"(?i:hdel)")]
    Hdel,

    #[regex(b"(?i:hget)")]
    Hget,

    #[regex(b"(?i:hgetall)")]
    Hgetall,

    #[regex(b"(?i:hset)")]
    Hset,

    #[regex(b"(?i:incr)")]
    Incr,

    #[regex(b"(?i:incrby)")]
    Incrby,

    #[regex(b"(?i:lindex)")]
    Lindex,

    #[regex(b"(?i:llen)")]
    Llen,

    #[regex(b"(?i:lpop)")]
    Lpop,

    #[regex(b"(?i:lpush)")]
    Lpush,

    #[regex(b"(?i:lrange)")]
    Lrange,

    #[regex(b"(?i:lset)")]
    Lset,

    #[regex(b"(?i:ltrim)")]
    Ltrim,

    #[regex(b"(?i:mget)")]
    Mget,

    #[regex(b"(?i:mset)")]
    Mset,

    #[regex(b"(?i:multi)")]
    Multi,

    #[regex(b"(?i:pexpire)")]
    Pexpire,

    #[regex(b"(?i:pfadd)")]
    Pfadd,

    #[regex(b"(?i:pfcount)")]
    Pfcount,

    #[regex(b"(?i:pfmerge)")]
    Pfmerge,

    #[regex(b"(?i:ping)")]
    Ping,

    #[regex(b"(?i:psubscribe)")]
    Psubscribe,

    #[regex(b"(?i:pttl)")]
    Pttl,

    #[regex(b"(?i:publish)")]
    Publish,

    #[regex(b"(?i:punsubscribe)")]
    Punsubscribe,

    #[regex(b"(?i:quit)")]
    Quit,

    #[regex(b"(?i:rpop)")]
    Rpop,

    #[regex(b"(?i:rpush)")]
    Rpush,

    #[regex(b"(?i:sadd)")]
    Sadd,

    #[regex(b"(?i:scard)")]
    Scard,

    #[regex(b"(?i:set)")]
    Set,

    #[regex(b"(?i:setbit)")]
    Setbit,

    #[regex(b"(?i:smembers)")]
    Smembers,

    #[regex(b"(?i:srem)")]
    Srem,

    #[regex(b"(?i:subscribe)")]
    Subscribe,

    #[regex(b"(?i:tdigest\\.add)")]
    TdigestAdd,

    #[regex(b"(?i:tdigest\\.byrank)")]
    TdigestByrank,

    #[regex(b"(?i:tdigest\\.byrevrank)")]
    TdigestByrevrank,

    #[regex(b"(?i:tdigest\\.cdf)")]
    TdigestCdf,

    #[regex(b"(?i:tdigest\\.create)")]
    TdigestCreate,

    #[regex(b"(?i:tdigest\\.info)")]
    TdigestInfo,

    #[regex(b"(?i:tdigest\\.max)")]
    TdigestMax,

    #[regex(b"(?i:tdigest\\.min)")]
    TdigestMin,

    #[regex(b"(?i:tdigest\\.quantile)")]
    TdigestQuantile,

    #[regex(b"(?i:tdigest\\.rank)")]
    TdigestRank,

    #[regex(b"(?i:tdigest\\.reset)")]
    TdigestReset,

    #[regex(b"(?i:tdigest\\.revrank)")]
    TdigestRevrank,

    #[regex(b"(?i:tdigest\\.trimmed_mean)")]
    TdigestTrimmedMean,

    #[regex(b"(?i:topk\\.add)")]
    TopkAdd,

    #[regex(b"(?i:topk\\.count)")]
    TopkCount,

    #[regex(b"(?i:topk\\.incrby)")]
    TopkIncrby,

    #[regex(b"(?i:topk\\.info)")]
    TopkInfo,

    #[regex(b"(?i:topk\\.list)")]
    TopkList,

    #[regex(b"(?i:topk\\.query)")]
    TopkQuery,

    #[regex(b"(?i:topk\\.reserve)")]
    TopkReserve,

    #[regex(b"(?i:ts\\.add)")]
    TsAdd,

    #[regex(b"(?i:ts\\.create)")]
    TsCreate,

    #[regex(b"(?i:ts\\.decrby)")]
    TsDecrby,

    #[regex(b"(?i:ts\\.del)")]
    TsDel,

    #[regex(b"(?i:ts\\.get)")]
    TsGet,

    #[regex(b"(?i:ts\\.incrby)")]
    TsIncrby,

    #[regex(b"(?i:ts\\.info)")]
    TsInfo,

    #[regex(b"(?i:ts\\.range)")]
    TsRange,

    #[regex(b"(?i:ts\\.revrange)")]
    TsRevrange,

    #[regex(b"(?i:ttl)")]
    Ttl,

    #[regex(b"(?i:unsubscribe)")]
    Unsubscribe,

    #[regex(b"(?i:unwatch)")]
    Unwatch,

    #[regex(b"(?i:vdel)")]
    Vdel,

    #[regex(b"(?i:vdim)")]
    Vdim,

    #[regex(b"(?i:vget)")]
    Vget,

    #[regex(b"(?i:vsearch)")]
    Vsearch,

    #[regex(b"(?i:vset)")]
    Vset,

    #[regex(b"(?i:vsim)")]
    Vsim,

    #[regex(b"(?i:watch)")]
    Watch,

    #[regex(b"(?i:xack)")]
    Xack,

    #[regex(b"(?i:xadd)")]
    Xadd,

    #[regex(b"(?i:xclaim)")]
    Xclaim,

    #[regex(b"(?i:xdel)")]
    Xdel,

    #[regex(b"(?i:xgroup)")]
    Xgroup,

    #[regex(b"(?i:xinfo)")]
    Xinfo,

    #[regex(b"(?i:xlen)")]
    Xlen,

    #[regex(b"(?i:xpending)")]
    Xpending,

    #[regex(b"(?i:xrange)")]
    Xrange,

    #[regex(b"(?i:xread)")]
    Xread,

    #[regex(b"(?i:xreadgroup)")]
    Xreadgroup,

    #[regex(b"(?i:xrevrange)")]
    Xrevrange,

    #[regex(b"(?i:xsetid)")]
    Xsetid,

    #[regex(b"(?i:xtrim)")]
    Xtrim,

    #[regex(b"(?i:zadd)")]
    Zadd,

    #[regex(b"(?i:zcard)")]
    Zcard,

    #[regex(b"(?i:zcount)")]
    Zcount,

    #[regex(b"(?i:zincrby)")]
    Zincrby,

    #[regex(b"(?i:zrange)")]
    Zrange,

    #[regex(b"(?i:zrangebyscore)")]
    Zrangebyscore,

    #[regex(b"(?i:zrank)")]
    Zrank,

    #[regex(b"(?i:zrem)")]
    Zrem,

    #[regex(b"(?i:zremrangebyscore)")]
    Zremrangebyscore,

    #[regex(b"(?i:zrevrank)")]
    Zrevrank,

    #[regex(b"(?i:zscore)")]
    Zscore,

    Unknown,
}

impl CommandKind {
    pub fn command(self) -> &'static Command {
        use CommandKind::*;

        match self {
            Bitcount => &BITCOUNT,
            Bitfield => &BITFIELD,
            Bitop => &BITOP,
            Bitpos => &BITPOS,
            BfAdd => &BF_ADD,
            BfExists => &BF_EXISTS,
            BfInfo => &BF_INFO,
            BfMadd => &BF_MADD,
            BfMexists => &BF_MEXISTS,
            BfReserve => &BF_RESERVE,
            CfAdd => &CF_ADD,
            CfAddnx => &CF_ADDNX,
            CfCount => &CF_COUNT,
            CfDel => &CF_DEL,
            CfExists => &CF_EXISTS,
            CfInfo => &CF_INFO,
            CfInsert => &CF_INSERT,
            CfReserve => &CF_RESERVE,
            Decr => &DECR,
            Decrby => &DECRBY,
            Del => &DEL,
            Discard => &DISCARD,
            Echo => &ECHO,
            Exec => &EXEC,
            Exists => &EXISTS,
            Expire => &EXPIRE,
            Get => &GET,
            Getbit => &GETBIT,
            Hdel => &HDEL,
            Hget => &HGET,
            Hgetall => &HGETALL,
            Hset => &HSET,
            Incr => &INCR,
            Incrby => &INCRBY,
            Lindex => &LINDEX,
            Llen => &LLEN,
            Lpop => &LPOP,
            Lpush => &LPUSH,
            Lrange => &LRANGE,
            Lset => &LSET,
            Ltrim => &LTRIM,
            Mget => &MGET,
            Mset => &MSET,
            Multi => &MULTI,
            Pexpire => &PEXPIRE,
            Pfadd => &PFADD,
            Pfcount => &PFCOUNT,
            Pfmerge => &PFMERGE,
            Ping => &PING,
            Psubscribe => &PSUBSCRIBE,
            Pttl => &PTTL,
            Publish => &PUBLISH,
            Punsubscribe => &PUNSUBSCRIBE,
            Quit => &QUIT,
            Rpop => &RPOP,
            Rpush => &RPUSH,
            Sadd => &SADD,
            Scard => &SCARD,
            Set => &SET,
            Setbit => &SETBIT,
            Smembers => &SMEMBERS,
            Srem => &SREM,
            Subscribe => &SUBSCRIBE,
            TdigestAdd => &TDIGEST_ADD,
            TdigestByrank => &TDIGEST_BYRANK,
            TdigestByrevrank => &TDIGEST_BYREVRANK,
            TdigestCdf => &TDIGEST_CDF,
            TdigestCreate => &TDIGEST_CREATE,
            TdigestInfo => &TDIGEST_INFO,
            TdigestMax => &TDIGEST_MAX,
            TdigestMin => &TDIGEST_MIN,
            TdigestQuantile => &TDIGEST_QUANTILE,
            TdigestRank => &TDIGEST_RANK,
            TdigestReset => &TDIGEST_RESET,
            TdigestRevrank => &TDIGEST_REVRANK,
            TdigestTrimmedMean => &TDIGEST_TRIMMED_MEAN,
            TopkAdd => &TOPK_ADD,
            TopkCount => &TOPK_COUNT,
            TopkIncrby => &TOPK_INCRBY,
            TopkInfo => &TOPK_INFO,
            TopkList => &TOPK_LIST,
            TopkQuery => &TOPK_QUERY,
            TopkReserve => &TOPK_RESERVE,
            TsAdd => &TS_ADD,
            TsCreate => &TS_CREATE,
            TsDecrby => &TS_DECRBY,
            TsDel => &TS_DEL,
            TsGet => &TS_GET,
            TsIncrby => &TS_INCRBY,
            TsInfo => &TS_INFO,
            TsRange => &TS_RANGE,
            TsRevrange => &TS_REVRANGE,
            Ttl => &TTL,
            Unsubscribe => &UNSUBSCRIBE,
            Unwatch => &UNWATCH,
            Unknown => &UNKNOWN,
            Vdel => &VDEL,
            Vdim => &VDIM,
            Vget => &VGET,
            Vsearch => &VSEARCH,
            Vset => &VSET,
            Vsim => &VSIM,
            Watch => &WATCH,
            Xack => &XACK,
            Xadd => &XADD,
            Xclaim => &XCLAIM,
            Xdel => &XDEL,
            Xgroup => &XGROUP,
            Xinfo => &XINFO,
            Xlen => &XLEN,
            Xpending => &XPENDING,
            Xrange => &XRANGE,
            Xread => &XREAD,
            Xreadgroup => &XREADGROUP,
            Xrevrange => &XREVRANGE,
            Xsetid => &XSETID,
            Xtrim => &XTRIM,
            Zadd => &ZADD,
            Zcard => &ZCARD,
            Zcount => &ZCOUNT,
            Zincrby => &ZINCRBY,
            Zrange => &ZRANGE,
            Zrangebyscore => &ZRANGEBYSCORE,
            Zrank => &ZRANK,
            Zrem => &ZREM,
            Zremrangebyscore => &ZREMRANGEBYSCORE,
            Zrevrank => &ZREVRANK,
            Zscore => &ZSCORE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_resolve_case_insensitively() {
        let command: &'static Command = b"GET"[..].into();
        assert_eq!(command.kind, CommandKind::Get);
        let command: &'static Command = b"tdigest.trimmed_MEAN"[..].into();
        assert_eq!(command.kind, CommandKind::TdigestTrimmedMean);
    }

    #[test]
    fn unknown_names_resolve_to_unknown() {
        let command: &'static Command = b"flushdb"[..].into();
        assert_eq!(command.kind, CommandKind::Unknown);
        let command: &'static Command = b""[..].into();
        assert_eq!(command.kind, CommandKind::Unknown);
    }
}
