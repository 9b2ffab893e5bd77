mod bloom;
mod cuckoo;
mod hash;
mod list;
mod set;
mod sorted_set;
mod stream;
mod string;
mod tdigest;
mod timeseries;
mod topk;
mod vector;

pub use bloom::Bloom;
pub use cuckoo::Cuckoo;
pub use hash::Hash;
pub use list::List;
pub use set::Set;
pub use sorted_set::{ScoreBound, SortedSet};
pub use stream::{Group, PendingEntry, Stream, StreamId};
pub use string::StringValue;
pub use tdigest::TDigest;
pub use timeseries::{Aggregation, TimeSeries};
pub use topk::TopK;
pub use vector::{Metric, Vector};

/// An error from an operation on a `Value`.
#[derive(Debug)]
pub enum ValueError {
    /// The key holds a different kind of value.
    WrongType,
}

/// A value in the keyspace. Each key is bound to exactly one kind at a time;
/// commands for any other kind fail without converting.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bloom(Box<Bloom>),
    Cuckoo(Box<Cuckoo>),
    Hash(Box<Hash>),
    List(Box<List>),
    Set(Box<Set>),
    SortedSet(Box<SortedSet>),
    Stream(Box<Stream>),
    String(StringValue),
    TDigest(Box<TDigest>),
    TimeSeries(Box<TimeSeries>),
    TopK(Box<TopK>),
    Vector(Box<Vector>),
}

macro_rules! accessors {
    ($as_name:ident, $mut_name:ident, $variant:ident, $kind:ty) => {
        pub fn $as_name(&self) -> Result<&$kind, ValueError> {
            match self {
                Value::$variant(inner) => Ok(inner),
                _ => Err(ValueError::WrongType),
            }
        }

        pub fn $mut_name(&mut self) -> Result<&mut $kind, ValueError> {
            match self {
                Value::$variant(inner) => Ok(inner),
                _ => Err(ValueError::WrongType),
            }
        }
    };
}

impl Value {
    /// Create a new hash value.
    pub fn hash() -> Self {
        Value::Hash(Box::default())
    }

    /// Create a new list value.
    pub fn list() -> Self {
        Value::List(Box::default())
    }

    /// Create a new set value.
    pub fn set() -> Self {
        Value::Set(Box::default())
    }

    /// Create a new sorted set value.
    pub fn sorted_set() -> Self {
        Value::SortedSet(Box::default())
    }

    /// Create a new stream value.
    pub fn stream() -> Self {
        Value::Stream(Box::default())
    }

    /// Create a new string value.
    pub fn string() -> Self {
        Value::String(StringValue::default())
    }

    accessors!(as_hash, mut_hash, Hash, Hash);
    accessors!(as_list, mut_list, List, List);
    accessors!(as_set, mut_set, Set, Set);
    accessors!(as_sorted_set, mut_sorted_set, SortedSet, SortedSet);
    accessors!(as_stream, mut_stream, Stream, Stream);
    accessors!(as_bloom, mut_bloom, Bloom, Bloom);
    accessors!(as_cuckoo, mut_cuckoo, Cuckoo, Cuckoo);
    accessors!(as_tdigest, mut_tdigest, TDigest, TDigest);
    accessors!(as_series, mut_series, TimeSeries, TimeSeries);
    accessors!(as_topk, mut_topk, TopK, TopK);
    accessors!(as_vector, mut_vector, Vector, Vector);

    /// Return a reference to the inner string value or an error.
    pub fn as_string(&self) -> Result<&StringValue, ValueError> {
        match self {
            Value::String(s) => Ok(s),
            _ => Err(ValueError::WrongType),
        }
    }

    /// Return a mutable reference to the inner string value or an error.
    pub fn mut_string(&mut self) -> Result<&mut StringValue, ValueError> {
        match self {
            Value::String(s) => Ok(s),
            _ => Err(ValueError::WrongType),
        }
    }
}

impl From<StringValue> for Value {
    fn from(value: StringValue) -> Self {
        Value::String(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::String(value.into())
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Value::String(value.into())
    }
}

impl From<bytes::Bytes> for Value {
    fn from(value: bytes::Bytes) -> Self {
        Value::String(value.into())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::String(value.into())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.as_bytes().into())
    }
}

impl From<Bloom> for Value {
    fn from(value: Bloom) -> Self {
        Value::Bloom(Box::new(value))
    }
}

impl From<Cuckoo> for Value {
    fn from(value: Cuckoo) -> Self {
        Value::Cuckoo(Box::new(value))
    }
}

impl From<TDigest> for Value {
    fn from(value: TDigest) -> Self {
        Value::TDigest(Box::new(value))
    }
}

impl From<TimeSeries> for Value {
    fn from(value: TimeSeries) -> Self {
        Value::TimeSeries(Box::new(value))
    }
}

impl From<TopK> for Value {
    fn from(value: TopK) -> Self {
        Value::TopK(Box::new(value))
    }
}

impl From<Vector> for Value {
    fn from(value: Vector) -> Self {
        Value::Vector(Box::new(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_exclusive() {
        let value = Value::string();
        assert!(value.as_string().is_ok());
        assert!(value.as_list().is_err());
        assert!(value.as_stream().is_err());

        let mut value = Value::list();
        assert!(value.mut_list().is_ok());
        assert!(value.mut_string().is_err());
    }
}
