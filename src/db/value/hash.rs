use bytes::Bytes;
use indexmap::IndexMap;

/// A hash value, mapping fields to byte strings. Iteration order stays stable
/// for the lifetime of the key, so it's backed by an insertion-ordered map.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Hash {
    fields: IndexMap<Bytes, Bytes>,
}

impl Hash {
    /// Set a field, returning `true` when the field is newly created.
    pub fn set(&mut self, field: Bytes, value: Bytes) -> bool {
        self.fields.insert(field, value).is_none()
    }

    pub fn get(&self, field: &[u8]) -> Option<&Bytes> {
        self.fields.get(field)
    }

    /// Remove a field, preserving the order of the remaining fields.
    pub fn remove(&mut self, field: &[u8]) -> bool {
        self.fields.shift_remove(field).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&Bytes, &Bytes)> {
        self.fields.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get() {
        let mut hash = Hash::default();
        assert!(hash.set("a".into(), "1".into()));
        assert!(!hash.set("a".into(), "2".into()));
        assert_eq!(hash.get(b"a"), Some(&Bytes::from("2")));
        assert_eq!(hash.get(b"b"), None);
    }

    #[test]
    fn stable_order() {
        let mut hash = Hash::default();
        hash.set("c".into(), "1".into());
        hash.set("a".into(), "2".into());
        hash.set("b".into(), "3".into());
        hash.remove(b"a");
        let fields: Vec<_> = hash.iter().map(|(f, _)| f.clone()).collect();
        assert_eq!(fields, vec![Bytes::from("c"), Bytes::from("b")]);
    }
}
