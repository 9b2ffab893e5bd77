use crate::bytes::parse;
use bytes::Bytes;
use hashbrown::HashMap;
use std::collections::BTreeMap;

/// A stream entry id, ordered by `(ms, seq)`.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct StreamId {
    pub ms: u64,
    pub seq: u64,
}

impl StreamId {
    pub const MIN: StreamId = StreamId { ms: 0, seq: 0 };
    pub const MAX: StreamId = StreamId {
        ms: u64::MAX,
        seq: u64::MAX,
    };

    pub fn new(ms: u64, seq: u64) -> Self {
        StreamId { ms, seq }
    }

    /// Parse an id of the form `ms` or `ms-seq`. A bare `ms` takes
    /// `default_seq` as its sequence number.
    pub fn parse(bytes: &[u8], default_seq: u64) -> Option<Self> {
        match bytes.iter().position(|&b| b == b'-') {
            Some(dash) => {
                let ms = parse(&bytes[..dash])?;
                let seq = parse(&bytes[dash + 1..])?;
                Some(StreamId { ms, seq })
            }
            None => {
                let ms = parse(bytes)?;
                Some(StreamId {
                    ms,
                    seq: default_seq,
                })
            }
        }
    }

    pub fn to_bytes(self) -> Bytes {
        format!("{self}").into()
    }
}

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.ms, self.seq)
    }
}

/// A delivered-but-unacknowledged entry in a group's pending entries list.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingEntry {
    /// The consumer this entry was last delivered to.
    pub consumer: Bytes,

    /// When this entry was last delivered, in epoch milliseconds.
    pub delivery_time: u64,

    /// How many times this entry has been delivered.
    pub delivery_count: u64,
}

/// A consumer group: a delivery checkpoint plus a pending entries list.
/// Consumers exist implicitly as PEL owners.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Group {
    /// The highest id ever delivered to a consumer via `>`.
    pub last_delivered: StreamId,

    /// Pending entries, keyed by entry id.
    pub pel: BTreeMap<StreamId, PendingEntry>,
}

impl Group {
    pub fn new(last_delivered: StreamId) -> Self {
        Group {
            last_delivered,
            pel: BTreeMap::new(),
        }
    }

    /// Record a delivery to a consumer, bumping the delivery count when the
    /// entry is already pending.
    pub fn deliver(&mut self, id: StreamId, consumer: &Bytes, now_ms: u64) {
        let count = self.pel.get(&id).map_or(0, |p| p.delivery_count);
        self.pel.insert(
            id,
            PendingEntry {
                consumer: consumer.clone(),
                delivery_time: now_ms,
                delivery_count: count + 1,
            },
        );
    }

    /// Acknowledge an entry. Returns `true` when it was pending.
    pub fn ack(&mut self, id: StreamId) -> bool {
        self.pel.remove(&id).is_some()
    }

    /// Drop every pending entry owned by `consumer`, returning how many.
    pub fn delete_consumer(&mut self, consumer: &[u8]) -> usize {
        let before = self.pel.len();
        self.pel.retain(|_, pending| pending.consumer != consumer);
        before - self.pel.len()
    }

    /// Pending counts per consumer, in first-pending order.
    pub fn consumer_counts(&self) -> Vec<(Bytes, usize)> {
        let mut counts: Vec<(Bytes, usize)> = Vec::new();
        for pending in self.pel.values() {
            match counts.iter_mut().find(|(c, _)| *c == pending.consumer) {
                Some((_, count)) => *count += 1,
                None => counts.push((pending.consumer.clone(), 1)),
            }
        }
        counts
    }
}

/// A stream value: an ordered log of field-value entries plus its groups.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Stream {
    entries: BTreeMap<StreamId, Vec<(Bytes, Bytes)>>,
    last_id: StreamId,
    groups: HashMap<Bytes, Group>,
}

impl Stream {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The last generated id. Monotonic; it may exceed the tail entry after
    /// deletions or an explicit reset.
    pub fn last_id(&self) -> StreamId {
        self.last_id
    }

    pub fn set_last_id(&mut self, id: StreamId) {
        self.last_id = id;
    }

    /// The id an auto-generated append would take right now.
    pub fn next_id(&self, now_ms: u64) -> StreamId {
        if now_ms > self.last_id.ms {
            StreamId::new(now_ms, 0)
        } else {
            StreamId::new(self.last_id.ms, self.last_id.seq.saturating_add(1))
        }
    }

    /// Append an entry. The id must be greater than `last_id`; returns
    /// `false` without mutating otherwise.
    pub fn insert(&mut self, id: StreamId, fields: Vec<(Bytes, Bytes)>) -> bool {
        if id <= self.last_id {
            return false;
        }
        self.entries.insert(id, fields);
        self.last_id = id;
        true
    }

    pub fn get(&self, id: StreamId) -> Option<&Vec<(Bytes, Bytes)>> {
        self.entries.get(&id)
    }

    pub fn contains(&self, id: StreamId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Iterate entries with ids inside the inclusive range.
    pub fn range(
        &self,
        start: StreamId,
        end: StreamId,
    ) -> impl DoubleEndedIterator<Item = (StreamId, &Vec<(Bytes, Bytes)>)> {
        self.entries.range(start..=end).map(|(id, f)| (*id, f))
    }

    /// Iterate entries strictly after `id`.
    pub fn after(
        &self,
        id: StreamId,
    ) -> impl Iterator<Item = (StreamId, &Vec<(Bytes, Bytes)>)> {
        use std::ops::Bound::{Excluded, Unbounded};
        self.entries
            .range((Excluded(id), Unbounded))
            .map(|(id, f)| (*id, f))
    }

    /// Remove one entry and every PEL reference to it, across all groups.
    pub fn remove(&mut self, id: StreamId) -> bool {
        if self.entries.remove(&id).is_none() {
            return false;
        }
        for group in self.groups.values_mut() {
            group.pel.remove(&id);
        }
        true
    }

    /// Trim to the newest `keep` entries. Returns the number removed.
    pub fn trim_maxlen(&mut self, keep: usize) -> usize {
        let excess = self.entries.len().saturating_sub(keep);
        let doomed: Vec<StreamId> = self.entries.keys().take(excess).copied().collect();
        for id in &doomed {
            self.remove(*id);
        }
        doomed.len()
    }

    /// Drop entries with ids below `minid`. Returns the number removed.
    pub fn trim_minid(&mut self, minid: StreamId) -> usize {
        let doomed: Vec<StreamId> = self
            .entries
            .range(..minid)
            .map(|(id, _)| *id)
            .collect();
        for id in &doomed {
            self.remove(*id);
        }
        doomed.len()
    }

    /// Create a group. Returns `false` when the name is taken.
    pub fn create_group(&mut self, name: Bytes, start: StreamId) -> bool {
        if self.groups.contains_key(&name) {
            return false;
        }
        self.groups.insert(name, Group::new(start));
        true
    }

    pub fn destroy_group(&mut self, name: &[u8]) -> bool {
        self.groups.remove(name).is_some()
    }

    pub fn group(&self, name: &[u8]) -> Option<&Group> {
        self.groups.get(name)
    }

    pub fn group_mut(&mut self, name: &[u8]) -> Option<&mut Group> {
        self.groups.get_mut(name)
    }

    pub fn groups(&self) -> impl ExactSizeIterator<Item = (&Bytes, &Group)> {
        self.groups.iter()
    }

    pub fn has_groups(&self) -> bool {
        !self.groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> Vec<(Bytes, Bytes)> {
        pairs
            .iter()
            .map(|(f, v)| {
                (
                    Bytes::copy_from_slice(f.as_bytes()),
                    Bytes::copy_from_slice(v.as_bytes()),
                )
            })
            .collect()
    }

    #[test]
    fn parse_ids() {
        assert_eq!(StreamId::parse(b"5-3", 0), Some(StreamId::new(5, 3)));
        assert_eq!(StreamId::parse(b"5", 0), Some(StreamId::new(5, 0)));
        assert_eq!(StreamId::parse(b"5", u64::MAX), Some(StreamId::new(5, u64::MAX)));
        assert_eq!(StreamId::parse(b"", 0), None);
        assert_eq!(StreamId::parse(b"a-1", 0), None);
        assert_eq!(StreamId::parse(b"1-", 0), None);
    }

    #[test]
    fn auto_ids_are_monotonic() {
        let mut stream = Stream::default();
        let first = stream.next_id(100);
        assert_eq!(first, StreamId::new(100, 0));
        assert!(stream.insert(first, fields(&[("a", "1")])));

        // Same millisecond bumps the sequence.
        assert_eq!(stream.next_id(100), StreamId::new(100, 1));

        // A later millisecond resets it.
        assert_eq!(stream.next_id(250), StreamId::new(250, 0));

        // A clock that runs backwards still moves forward.
        assert_eq!(stream.next_id(50), StreamId::new(100, 1));
    }

    #[test]
    fn insert_rejects_stale_ids() {
        let mut stream = Stream::default();
        assert!(stream.insert(StreamId::new(5, 0), fields(&[("a", "1")])));
        assert!(!stream.insert(StreamId::new(5, 0), fields(&[("b", "2")])));
        assert!(!stream.insert(StreamId::new(4, 9), fields(&[("b", "2")])));
        assert_eq!(stream.len(), 1);
    }

    #[test]
    fn last_id_survives_removal() {
        let mut stream = Stream::default();
        stream.insert(StreamId::new(1, 0), fields(&[("a", "1")]));
        stream.insert(StreamId::new(2, 0), fields(&[("b", "2")]));
        stream.remove(StreamId::new(2, 0));
        assert_eq!(stream.last_id(), StreamId::new(2, 0));
        assert_eq!(stream.next_id(0), StreamId::new(2, 1));
    }

    #[test]
    fn trim_purges_pending() {
        let mut stream = Stream::default();
        for ms in 1..=4 {
            stream.insert(StreamId::new(ms, 0), fields(&[("a", "1")]));
        }
        stream.create_group("g".into(), StreamId::MIN);
        let group = stream.group_mut(b"g").unwrap();
        group.deliver(StreamId::new(1, 0), &Bytes::from("c"), 0);
        group.deliver(StreamId::new(4, 0), &Bytes::from("c"), 0);

        assert_eq!(stream.trim_maxlen(1), 3);
        let group = stream.group(b"g").unwrap();
        assert_eq!(group.pel.len(), 1);
        assert!(group.pel.contains_key(&StreamId::new(4, 0)));
    }

    #[test]
    fn trim_minid() {
        let mut stream = Stream::default();
        for ms in 1..=4 {
            stream.insert(StreamId::new(ms, 0), fields(&[("a", "1")]));
        }
        assert_eq!(stream.trim_minid(StreamId::new(3, 0)), 2);
        assert_eq!(stream.len(), 2);
        assert!(stream.contains(StreamId::new(3, 0)));
    }

    #[test]
    fn delivery_counts_accumulate() {
        let mut group = Group::new(StreamId::MIN);
        let consumer = Bytes::from("c1");
        group.deliver(StreamId::new(1, 0), &consumer, 10);
        group.deliver(StreamId::new(1, 0), &consumer, 20);
        let pending = &group.pel[&StreamId::new(1, 0)];
        assert_eq!(pending.delivery_count, 2);
        assert_eq!(pending.delivery_time, 20);

        assert!(group.ack(StreamId::new(1, 0)));
        assert!(!group.ack(StreamId::new(1, 0)));
    }

    #[test]
    fn delete_consumer() {
        let mut group = Group::new(StreamId::MIN);
        group.deliver(StreamId::new(1, 0), &Bytes::from("a"), 0);
        group.deliver(StreamId::new(2, 0), &Bytes::from("b"), 0);
        group.deliver(StreamId::new(3, 0), &Bytes::from("a"), 0);
        assert_eq!(group.delete_consumer(b"a"), 2);
        assert_eq!(group.pel.len(), 1);
    }
}
