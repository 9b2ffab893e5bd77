use bytes::Bytes;
use std::{collections::VecDeque, ops::Range};

/// A list value with O(1) push and pop at both edges.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct List {
    items: VecDeque<Bytes>,
}

impl List {
    pub fn push_front(&mut self, item: Bytes) {
        self.items.push_front(item);
    }

    pub fn push_back(&mut self, item: Bytes) {
        self.items.push_back(item);
    }

    pub fn pop_front(&mut self) -> Option<Bytes> {
        self.items.pop_front()
    }

    pub fn pop_back(&mut self) -> Option<Bytes> {
        self.items.pop_back()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Bytes> {
        self.items.get(index)
    }

    /// Replace the item at `index`. Returns `false` when out of range.
    pub fn set(&mut self, index: usize, item: Bytes) -> bool {
        match self.items.get_mut(index) {
            Some(slot) => {
                *slot = item;
                true
            }
            None => false,
        }
    }

    pub fn range(&self, range: Range<usize>) -> impl ExactSizeIterator<Item = &Bytes> {
        self.items.range(range)
    }

    /// Keep only the items inside `range`, dropping the rest.
    pub fn trim(&mut self, range: Option<Range<usize>>) {
        let Some(range) = range else {
            self.items.clear();
            return;
        };
        self.items.truncate(range.end);
        self.items.drain(..range.start);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> List {
        let mut list = List::default();
        for item in items {
            list.push_back(Bytes::copy_from_slice(item.as_bytes()));
        }
        list
    }

    #[test]
    fn edges() {
        let mut list = list(&["b", "c"]);
        list.push_front("a".into());
        assert_eq!(list.pop_back(), Some(Bytes::from("c")));
        assert_eq!(list.pop_front(), Some(Bytes::from("a")));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn trim() {
        let mut list = list(&["a", "b", "c", "d"]);
        list.trim(Some(1..3));
        let items: Vec<_> = list.range(0..list.len()).cloned().collect();
        assert_eq!(items, vec![Bytes::from("b"), Bytes::from("c")]);

        list.trim(None);
        assert!(list.is_empty());
    }
}
