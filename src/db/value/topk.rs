use crate::sketch::hash64;
use bytes::Bytes;
use rand::Rng;

const FP_SEED: u64 = 0x70b0;
const ROW_SEED: u64 = 0x70c0;

/// One counter cell: a fingerprint and its decaying count.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Counter {
    fingerprint: u64,
    count: u64,
}

/// A heavy-hitters sketch: a `width × depth` grid of decaying counters plus a
/// bounded list of the current top `k` items.
#[derive(Clone, Debug, PartialEq)]
pub struct TopK {
    k: usize,
    width: usize,
    depth: usize,
    decay: f64,
    counters: Vec<Counter>,
    top: Vec<(Bytes, u64)>,
}

impl TopK {
    pub const DEFAULT_WIDTH: usize = 8;
    pub const DEFAULT_DEPTH: usize = 7;
    pub const DEFAULT_DECAY: f64 = 0.9;

    pub fn new(k: usize, width: usize, depth: usize, decay: f64) -> Self {
        TopK {
            k: k.max(1),
            width: width.max(1),
            depth: depth.max(1),
            decay,
            counters: vec![Counter::default(); width.max(1) * depth.max(1)],
            top: Vec::new(),
        }
    }

    fn cell(&self, item: &[u8], row: usize) -> usize {
        let column = hash64(item, ROW_SEED + row as u64) as usize % self.width;
        row * self.width + column
    }

    /// Count one occurrence in the sketch and return the new estimate.
    fn bump(&mut self, item: &[u8]) -> u64 {
        let fingerprint = hash64(item, FP_SEED);
        let mut rng = rand::thread_rng();
        let mut estimate = 0;

        for row in 0..self.depth {
            let decay = self.decay;
            let index = self.cell(item, row);
            let counter = &mut self.counters[index];

            if counter.count == 0 || counter.fingerprint == fingerprint {
                counter.fingerprint = fingerprint;
                counter.count += 1;
                estimate = estimate.max(counter.count);
            } else if rng.r#gen::<f64>() < decay.powf(counter.count as f64) {
                counter.count -= 1;
                if counter.count == 0 {
                    counter.fingerprint = fingerprint;
                    counter.count = 1;
                    estimate = estimate.max(1);
                }
            }
        }

        estimate
    }

    /// Add `increment` occurrences. Returns the item evicted from the top
    /// list, if the addition pushed one out.
    pub fn add(&mut self, item: &Bytes, increment: u64) -> Option<Bytes> {
        let mut evicted = None;
        for _ in 0..increment {
            let estimate = self.bump(item);

            if let Some(slot) = self.top.iter_mut().find(|(i, _)| i == item) {
                slot.1 = slot.1.max(estimate);
                continue;
            }

            if estimate == 0 {
                continue;
            }

            if self.top.len() < self.k {
                self.top.push((item.clone(), estimate));
            } else if let Some(min) = self
                .top
                .iter()
                .enumerate()
                .min_by_key(|(_, (_, count))| *count)
                .map(|(index, _)| index)
            {
                if estimate > self.top[min].1 {
                    let (dropped, _) = std::mem::replace(&mut self.top[min], (item.clone(), estimate));
                    evicted = Some(dropped);
                }
            }
        }
        evicted
    }

    /// Is this item currently one of the top `k`?
    pub fn query(&self, item: &[u8]) -> bool {
        self.top.iter().any(|(i, _)| i == item)
    }

    /// The sketch's count estimate for an item.
    pub fn count(&self, item: &[u8]) -> u64 {
        let fingerprint = hash64(item, FP_SEED);
        (0..self.depth)
            .map(|row| {
                let counter = self.counters[self.cell(item, row)];
                if counter.fingerprint == fingerprint {
                    counter.count
                } else {
                    0
                }
            })
            .max()
            .unwrap_or(0)
    }

    /// The current top items, heaviest first, ties broken lexically.
    pub fn list(&self) -> Vec<(Bytes, u64)> {
        let mut items = self.top.clone();
        items.sort_by(|(a, ac), (b, bc)| bc.cmp(ac).then_with(|| a.cmp(b)));
        items
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn decay(&self) -> f64 {
        self.decay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_heavy_hitters() {
        let mut topk = TopK::new(2, 8, 7, 0.9);
        for _ in 0..100 {
            topk.add(&Bytes::from("heavy"), 1);
        }
        for _ in 0..50 {
            topk.add(&Bytes::from("medium"), 1);
        }
        topk.add(&Bytes::from("light"), 1);

        assert!(topk.query(b"heavy"));
        assert!(topk.query(b"medium"));
        assert!(!topk.query(b"light"));

        let list = topk.list();
        assert_eq!(list[0].0, Bytes::from("heavy"));
        assert_eq!(list[1].0, Bytes::from("medium"));
    }

    #[test]
    fn count_estimates() {
        let mut topk = TopK::new(3, 64, 7, 0.9);
        topk.add(&Bytes::from("a"), 10);
        assert!(topk.count(b"a") >= 9);
        assert_eq!(topk.count(b"missing"), 0);
    }

    #[test]
    fn eviction_reports_dropped_item() {
        let mut topk = TopK::new(1, 64, 7, 0.9);
        topk.add(&Bytes::from("first"), 1);
        let evicted = topk.add(&Bytes::from("second"), 5);
        assert_eq!(evicted, Some(Bytes::from("first")));
        assert!(topk.query(b"second"));
        assert!(!topk.query(b"first"));
    }
}
