mod value;

pub use value::{
    Aggregation, Bloom, Cuckoo, Hash, List, Metric, PendingEntry, ScoreBound, Set,
    SortedSet, Stream, StreamId, StringValue, TDigest, TimeSeries, TopK, Value, ValueError, Vector,
};

use crate::epoch;
use bytes::Bytes;
use hashbrown::HashMap;
use rand::Rng;

/// The keyspace: every value and the expiration times of volatile keys.
#[derive(Clone, Debug, Default)]
pub struct Db {
    /// All key value pairs.
    objects: HashMap<Bytes, Value>,

    /// Absolute expiration instants in epoch milliseconds.
    expires: HashMap<Bytes, u128>,
}

macro_rules! typed {
    ($get:ident, $get_mut:ident, $or_default:ident, $as_fn:ident, $mut_fn:ident, $ctor:expr, $kind:ty) => {
        pub fn $get(&self, key: &[u8]) -> Result<Option<&$kind>, ValueError> {
            self.get(key).map(Value::$as_fn).transpose()
        }

        pub fn $get_mut(&mut self, key: &[u8]) -> Result<Option<&mut $kind>, ValueError> {
            self.get_mut(key).map(Value::$mut_fn).transpose()
        }

        pub fn $or_default(&mut self, key: &Bytes) -> Result<&mut $kind, ValueError> {
            self.entry_or_insert_with(key, $ctor).$mut_fn()
        }
    };
}

impl Db {
    /// Get the value for `key`, unless it has expired.
    pub fn get(&self, key: &[u8]) -> Option<&Value> {
        if self.is_expired(key) {
            None
        } else {
            self.objects.get(key)
        }
    }

    /// Get the mutable value for `key`, reaping it if expired.
    pub fn get_mut(&mut self, key: &[u8]) -> Option<&mut Value> {
        if self.is_expired(key) {
            self.remove(key);
            None
        } else {
            self.objects.get_mut(key)
        }
    }

    /// Does `key` exist?
    pub fn exists(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    /// Get the value for `key`, inserting a fresh one when missing. Reaps an
    /// expired value first so the default never inherits a stale expiry.
    pub fn entry_or_insert_with(&mut self, key: &Bytes, default: fn() -> Value) -> &mut Value {
        if self.is_expired(key) {
            self.remove(key);
        }
        self.objects.entry(key.clone()).or_insert_with(default)
    }

    /// Bind `key` to `value`, clearing any expiration.
    pub fn set(&mut self, key: &Bytes, value: impl Into<Value>) -> Option<Value> {
        let expired = self.is_expired(key);
        self.expires.remove(&key[..]);
        let previous = self.objects.insert(key.clone(), value.into());
        if expired { None } else { previous }
    }

    /// Bind `key` to `value` with an absolute expiration instant.
    pub fn setex(&mut self, key: &Bytes, value: impl Into<Value>, at: u128) -> Option<Value> {
        let previous = self.set(key, value);
        self.expires.insert(key.clone(), at);
        previous
    }

    /// Remove `key`, returning its live value.
    pub fn remove(&mut self, key: &[u8]) -> Option<Value> {
        let expired = self.is_expired(key);
        self.expires.remove(key);
        let value = self.objects.remove(key);
        if expired { None } else { value }
    }

    /// Set the expiration for `key`. Returns `true` when the key exists.
    pub fn expire(&mut self, key: &[u8], at: u128) -> bool {
        if self.is_expired(key) {
            self.remove(key);
            return false;
        }
        if let Some((key, _)) = self.objects.get_key_value(key) {
            self.expires.insert(key.clone(), at);
            true
        } else {
            false
        }
    }

    /// The time until `key` expires, in milliseconds.
    pub fn ttl(&self, key: &[u8]) -> Option<u128> {
        let at = self.expires.get(key)?;
        let now = epoch().as_millis();
        if now >= *at { None } else { Some(*at - now) }
    }

    /// Is `key` past its expiration?
    fn is_expired(&self, key: &[u8]) -> bool {
        match self.expires.get(key) {
            Some(at) => epoch().as_millis() >= *at,
            None => false,
        }
    }

    /// Iterate live key value pairs, skipping unreaped expired keys.
    pub fn iter(&self) -> impl Iterator<Item = (&Bytes, &Value)> {
        self.objects
            .iter()
            .filter(|(key, _)| !self.is_expired(key))
    }

    /// Sample up to `sample` random volatile keys and remove the expired
    /// ones. Returns how many were sampled and the keys removed.
    pub fn sweep(&mut self, sample: usize) -> (usize, Vec<Bytes>) {
        let mut rng = rand::thread_rng();
        let mut sampled: Vec<Bytes> = Vec::with_capacity(sample);

        // Reservoir sampling over the volatile keys.
        for (seen, key) in self.expires.keys().enumerate() {
            if sampled.len() < sample {
                sampled.push(key.clone());
            } else {
                let slot = rng.gen_range(0..=seen);
                if slot < sample {
                    sampled[slot] = key.clone();
                }
            }
        }

        let count = sampled.len();
        let mut removed = Vec::new();
        for key in sampled {
            if self.is_expired(&key) {
                self.remove(&key);
                removed.push(key);
            }
        }
        (count, removed)
    }

    typed!(get_hash, mut_hash, hash_or_default, as_hash, mut_hash, Value::hash, Hash);
    typed!(get_list, mut_list, list_or_default, as_list, mut_list, Value::list, List);
    typed!(get_set, mut_set, set_or_default, as_set, mut_set, Value::set, Set);
    typed!(
        get_sorted_set,
        mut_sorted_set,
        sorted_set_or_default,
        as_sorted_set,
        mut_sorted_set,
        Value::sorted_set,
        SortedSet
    );
    typed!(
        get_stream,
        mut_stream,
        stream_or_default,
        as_stream,
        mut_stream,
        Value::stream,
        Stream
    );
    typed!(
        get_string,
        mut_string,
        string_or_default,
        as_string,
        mut_string,
        Value::string,
        StringValue
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> Bytes {
        Bytes::copy_from_slice(name.as_bytes())
    }

    #[test]
    fn set_and_get() {
        let mut db = Db::default();
        assert_eq!(db.set(&key("a"), "x"), None);
        assert_eq!(db.get(b"a"), Some(&"x".into()));
        assert_eq!(db.set(&key("a"), "y"), Some("x".into()));
    }

    #[test]
    fn expired_keys_are_absent() {
        let mut db = Db::default();
        db.set(&key("a"), "x");
        db.expire(b"a", epoch().as_millis() - 10_000);
        assert_eq!(db.get(b"a"), None);
        assert!(!db.exists(b"a"));
        assert_eq!(db.remove(b"a"), None);
    }

    #[test]
    fn set_clears_expiry() {
        let mut db = Db::default();
        db.setex(&key("a"), "x", epoch().as_millis() + 10_000);
        assert!(db.ttl(b"a").is_some());
        db.set(&key("a"), "y");
        assert_eq!(db.ttl(b"a"), None);
    }

    #[test]
    fn ttl_reports_remaining() {
        let mut db = Db::default();
        db.setex(&key("a"), "x", epoch().as_millis() + 10_000);
        let ttl = db.ttl(b"a").unwrap();
        assert!((9_000..=10_000).contains(&ttl));
        assert_eq!(db.ttl(b"missing"), None);
    }

    #[test]
    fn expire_missing_key() {
        let mut db = Db::default();
        assert!(!db.expire(b"a", epoch().as_millis() + 1_000));
        db.set(&key("a"), "x");
        assert!(db.expire(b"a", epoch().as_millis() + 1_000));
    }

    #[test]
    fn wrong_kind_is_rejected_without_mutation() {
        let mut db = Db::default();
        db.set(&key("a"), "x");
        assert!(db.get_list(b"a").is_err());
        assert!(db.list_or_default(&key("a")).is_err());
        assert_eq!(db.get(b"a"), Some(&"x".into()));
    }

    #[test]
    fn or_default_creates_lazily() {
        let mut db = Db::default();
        let list = db.list_or_default(&key("l")).unwrap();
        list.push_back("a".into());
        assert_eq!(db.get_list(b"l").unwrap().unwrap().len(), 1);
    }

    #[test]
    fn sweep_removes_expired_samples() {
        let mut db = Db::default();
        for i in 0..10 {
            let name = key(&format!("stale:{i}"));
            db.setex(&name, "x", epoch().as_millis() - 1);
        }
        db.setex(&key("fresh"), "x", epoch().as_millis() + 60_000);

        let (sampled, removed) = db.sweep(32);
        assert_eq!(sampled, 11);
        assert_eq!(removed.len(), 10);
        assert!(db.exists(b"fresh"));
    }
}
