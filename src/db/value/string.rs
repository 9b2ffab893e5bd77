use crate::bytes::parse_i64_exact;
use bytes::Bytes;

/// A string value, stored as owned bytes. Integer-valued strings participate
/// in the INCR family via exact decimal parsing.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct StringValue(Vec<u8>);

impl StringValue {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// A mutable view of the raw bytes, for in-place bit operations.
    pub fn make_mut(&mut self) -> &mut Vec<u8> {
        &mut self.0
    }

    /// Parse as an i64 if the representation is exact.
    pub fn integer(&self) -> Option<i64> {
        parse_i64_exact(&self.0)
    }

    /// Replace the contents with the decimal rendering of an integer.
    pub fn set_integer(&mut self, value: i64) {
        self.0.clear();
        self.0.extend_from_slice(format!("{value}").as_bytes());
    }

    /// Copy the contents into a cheaply clonable handle for replies.
    pub fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(&self.0)
    }
}

impl From<Vec<u8>> for StringValue {
    fn from(value: Vec<u8>) -> Self {
        StringValue(value)
    }
}

impl From<&[u8]> for StringValue {
    fn from(value: &[u8]) -> Self {
        StringValue(value.to_vec())
    }
}

impl From<Bytes> for StringValue {
    fn from(value: Bytes) -> Self {
        StringValue(value.to_vec())
    }
}

impl From<&Bytes> for StringValue {
    fn from(value: &Bytes) -> Self {
        StringValue(value.to_vec())
    }
}

impl From<i64> for StringValue {
    fn from(value: i64) -> Self {
        StringValue(format!("{value}").into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_round_trip() {
        let mut value = StringValue::from(41i64);
        assert_eq!(value.integer(), Some(41));
        value.set_integer(42);
        assert_eq!(value.as_slice(), b"42");
    }

    #[test]
    fn non_integer() {
        let value = StringValue::from(&b"not-a-number"[..]);
        assert_eq!(value.integer(), None);
        assert_eq!(StringValue::from(&b"01"[..]).integer(), None);
    }
}
