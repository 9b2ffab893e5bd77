use crate::sketch::hash64;
use rand::Rng;

const FP_SEED: u64 = 0xcf01;
const INDEX_SEED: u64 = 0xcf02;
const ALT_SEED: u64 = 0xcf03;

/// A cuckoo filter: buckets of one-byte fingerprints with two candidate
/// buckets per item. Supports deletion and per-item counts, and doubles as a
/// multiset because a fingerprint may appear several times.
#[derive(Clone, Debug, PartialEq)]
pub struct Cuckoo {
    buckets: Vec<Vec<u8>>,
    bucket_size: usize,
    max_iterations: usize,
    items: usize,
}

impl Cuckoo {
    pub const DEFAULT_CAPACITY: usize = 1024;
    const BUCKET_SIZE: usize = 4;
    const MAX_ITERATIONS: usize = 20;

    pub fn new(capacity: usize) -> Self {
        let buckets = (capacity / Self::BUCKET_SIZE)
            .next_power_of_two()
            .max(1);
        Cuckoo {
            buckets: vec![Vec::new(); buckets],
            bucket_size: Self::BUCKET_SIZE,
            max_iterations: Self::MAX_ITERATIONS,
            items: 0,
        }
    }

    fn fingerprint(item: &[u8]) -> u8 {
        match (hash64(item, FP_SEED) & 0xff) as u8 {
            0 => 1,
            fp => fp,
        }
    }

    fn index(&self, item: &[u8]) -> usize {
        hash64(item, INDEX_SEED) as usize & (self.buckets.len() - 1)
    }

    /// The partner bucket for a fingerprint. Involutive, so it works from
    /// either of the two candidates.
    fn alt_index(&self, index: usize, fingerprint: u8) -> usize {
        let mask = self.buckets.len() - 1;
        index ^ (hash64(&[fingerprint], ALT_SEED) as usize & mask)
    }

    /// Add one occurrence of an item. Returns `false` when the filter is too
    /// full to place it.
    pub fn add(&mut self, item: &[u8]) -> bool {
        let fingerprint = Self::fingerprint(item);
        let i1 = self.index(item);
        let i2 = self.alt_index(i1, fingerprint);

        for index in [i1, i2] {
            if self.buckets[index].len() < self.bucket_size {
                self.buckets[index].push(fingerprint);
                self.items += 1;
                return true;
            }
        }

        // Both candidates are full; relocate a victim fingerprint.
        let mut rng = rand::thread_rng();
        let mut index = if rng.r#gen() { i1 } else { i2 };
        let mut fingerprint = fingerprint;

        for _ in 0..self.max_iterations {
            let slot = rng.gen_range(0..self.bucket_size);
            std::mem::swap(&mut fingerprint, &mut self.buckets[index][slot]);
            index = self.alt_index(index, fingerprint);

            if self.buckets[index].len() < self.bucket_size {
                self.buckets[index].push(fingerprint);
                self.items += 1;
                return true;
            }
        }

        // Undo is impossible at this point; the displaced chain stays, which
        // only affects accuracy, not correctness.
        false
    }

    /// Add only when the item doesn't appear to be present.
    pub fn add_unique(&mut self, item: &[u8]) -> Option<bool> {
        if self.contains(item) {
            return Some(false);
        }
        self.add(item).then_some(true)
    }

    pub fn contains(&self, item: &[u8]) -> bool {
        self.count(item) > 0
    }

    /// How many occurrences of this item the filter holds.
    pub fn count(&self, item: &[u8]) -> usize {
        let fingerprint = Self::fingerprint(item);
        let i1 = self.index(item);
        let i2 = self.alt_index(i1, fingerprint);

        let occurrences = |index: usize| {
            self.buckets[index]
                .iter()
                .filter(|&&fp| fp == fingerprint)
                .count()
        };

        if i1 == i2 {
            occurrences(i1)
        } else {
            occurrences(i1) + occurrences(i2)
        }
    }

    /// Remove one occurrence. Returns `false` when the item wasn't present.
    pub fn remove(&mut self, item: &[u8]) -> bool {
        let fingerprint = Self::fingerprint(item);
        let i1 = self.index(item);
        let i2 = self.alt_index(i1, fingerprint);

        for index in [i1, i2] {
            let bucket = &mut self.buckets[index];
            if let Some(slot) = bucket.iter().position(|&fp| fp == fingerprint) {
                bucket.swap_remove(slot);
                self.items -= 1;
                return true;
            }
        }
        false
    }

    pub fn size(&self) -> usize {
        self.buckets.len() * self.bucket_size
    }

    pub fn num_buckets(&self) -> usize {
        self.buckets.len()
    }

    pub fn bucket_size(&self) -> usize {
        self.bucket_size
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn items(&self) -> usize {
        self.items
    }
}
