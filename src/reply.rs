mod error;

pub use error::ReplyError;

use crate::db::{StreamId, StringValue, ValueError};
use bytes::Bytes;
use ordered_float::NotNan;
use respite::RespError;

/// A reply frame, or the header of an aggregate one. Arrays are emitted as a
/// header followed by their elements.
#[derive(Debug)]
pub enum Reply {
    Array(usize),
    Bulk(Bytes),
    Error(ReplyError),
    Integer(i64),
    Nil,
    Status(&'static str),
}

impl From<i64> for Reply {
    fn from(value: i64) -> Self {
        Reply::Integer(value)
    }
}

impl From<i32> for Reply {
    fn from(value: i32) -> Self {
        Reply::Integer(value.into())
    }
}

impl From<usize> for Reply {
    fn from(value: usize) -> Self {
        Reply::Integer(value as i64)
    }
}

impl From<f64> for Reply {
    fn from(value: f64) -> Self {
        Reply::Bulk(crate::bytes::format_f64(value).into())
    }
}

impl From<NotNan<f64>> for Reply {
    fn from(value: NotNan<f64>) -> Self {
        value.into_inner().into()
    }
}

impl From<Bytes> for Reply {
    fn from(value: Bytes) -> Self {
        Reply::Bulk(value)
    }
}

impl From<&Bytes> for Reply {
    fn from(value: &Bytes) -> Self {
        Reply::Bulk(value.clone())
    }
}

impl From<Vec<u8>> for Reply {
    fn from(value: Vec<u8>) -> Self {
        Reply::Bulk(value.into())
    }
}

impl From<&'static str> for Reply {
    fn from(value: &'static str) -> Self {
        Reply::Status(value)
    }
}

impl From<StringValue> for Reply {
    fn from(value: StringValue) -> Self {
        Reply::Bulk(value.to_bytes())
    }
}

impl From<&StringValue> for Reply {
    fn from(value: &StringValue) -> Self {
        Reply::Bulk(value.to_bytes())
    }
}

impl From<StreamId> for Reply {
    fn from(id: StreamId) -> Self {
        Reply::Bulk(id.to_bytes())
    }
}

impl From<ReplyError> for Reply {
    fn from(error: ReplyError) -> Self {
        Reply::Error(error)
    }
}

impl From<ValueError> for Reply {
    fn from(error: ValueError) -> Self {
        use ValueError::*;
        match error {
            WrongType => ReplyError::WrongType.into(),
        }
    }
}

impl From<RespError> for Reply {
    fn from(error: RespError) -> Self {
        Reply::Error(ReplyError::Resp(error))
    }
}

impl<T: Into<Reply>> From<Option<T>> for Reply {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => value.into(),
            None => Reply::Nil,
        }
    }
}
