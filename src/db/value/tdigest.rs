/// A centroid: a weighted mean of nearby observations.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Centroid {
    mean: f64,
    weight: f64,
}

/// A merging t-digest. Observations accumulate in a buffer and collapse into
/// a compression-bounded centroid list, which keeps quantile queries accurate
/// at the tails.
#[derive(Clone, Debug, PartialEq)]
pub struct TDigest {
    compression: usize,
    centroids: Vec<Centroid>,
    buffer: Vec<f64>,
    min: f64,
    max: f64,
    count: u64,
}

impl TDigest {
    pub const DEFAULT_COMPRESSION: usize = 100;

    pub fn new(compression: usize) -> Self {
        TDigest {
            compression: compression.max(1),
            centroids: Vec::new(),
            buffer: Vec::new(),
            min: f64::NAN,
            max: f64::NAN,
            count: 0,
        }
    }

    pub fn reset(&mut self) {
        self.centroids.clear();
        self.buffer.clear();
        self.min = f64::NAN;
        self.max = f64::NAN;
        self.count = 0;
    }

    pub fn add(&mut self, value: f64) {
        if !(self.min <= value) {
            self.min = value;
        }
        if !(self.max >= value) {
            self.max = value;
        }
        self.count += 1;
        self.buffer.push(value);
        if self.buffer.len() >= 4 * self.compression {
            self.compress();
        }
    }

    /// Fold the buffer into the centroid list, merging neighbors while the
    /// k-size bound `4·n·q(1-q)/compression` allows.
    fn compress(&mut self) {
        if self.buffer.is_empty() {
            return;
        }

        let mut all: Vec<Centroid> = self.centroids.drain(..).collect();
        all.extend(self.buffer.drain(..).map(|mean| Centroid { mean, weight: 1.0 }));
        all.sort_by(|a, b| a.mean.total_cmp(&b.mean));

        let total = self.count as f64;
        let compression = self.compression as f64;
        let mut merged: Vec<Centroid> = Vec::new();
        let mut cum = 0.0;
        let mut current = all[0];

        for next in &all[1..] {
            let proposed = current.weight + next.weight;
            let q = (cum + proposed / 2.0) / total;
            let bound = 4.0 * total * q * (1.0 - q) / compression;

            if proposed <= bound {
                current.mean =
                    (current.mean * current.weight + next.mean * next.weight) / proposed;
                current.weight = proposed;
            } else {
                cum += current.weight;
                merged.push(current);
                current = *next;
            }
        }
        merged.push(current);
        self.centroids = merged;
    }

    /// The value at quantile `q`, interpolated between centroid midpoints.
    pub fn quantile(&mut self, q: f64) -> f64 {
        self.compress();
        if self.count == 0 || q.is_nan() {
            return f64::NAN;
        }
        if q <= 0.0 {
            return self.min;
        }
        if q >= 1.0 {
            return self.max;
        }

        let index = q * self.count as f64;
        let mut cum = 0.0;
        let mut prev: Option<(f64, f64)> = None;

        for centroid in &self.centroids {
            let mid = cum + centroid.weight / 2.0;
            if index < mid {
                let value = match prev {
                    Some((pmid, pmean)) => {
                        let t = (index - pmid) / (mid - pmid);
                        pmean + t * (centroid.mean - pmean)
                    }
                    None => self.min,
                };
                return value.clamp(self.min, self.max);
            }
            prev = Some((mid, centroid.mean));
            cum += centroid.weight;
        }

        self.max
    }

    /// The fraction of observations at or below `value`.
    pub fn cdf(&mut self, value: f64) -> f64 {
        self.compress();
        if self.count == 0 {
            return f64::NAN;
        }
        if value < self.min {
            return 0.0;
        }
        if value >= self.max {
            return 1.0;
        }

        let total = self.count as f64;
        let mut cum = 0.0;
        let mut prev: Option<(f64, f64)> = None;

        for centroid in &self.centroids {
            let mid = cum + centroid.weight / 2.0;
            if value < centroid.mean {
                let index = match prev {
                    Some((pmid, pmean)) => {
                        let t = if centroid.mean > pmean {
                            (value - pmean) / (centroid.mean - pmean)
                        } else {
                            0.0
                        };
                        pmid + t * (mid - pmid)
                    }
                    None => {
                        let t = if centroid.mean > self.min {
                            (value - self.min) / (centroid.mean - self.min)
                        } else {
                            0.0
                        };
                        t * mid
                    }
                };
                return index / total;
            }
            prev = Some((mid, centroid.mean));
            cum += centroid.weight;
        }

        1.0
    }

    /// The number of observations below `value`. `-1` below the minimum,
    /// `-2` for an empty sketch.
    pub fn rank(&mut self, value: f64) -> i64 {
        self.compress();
        if self.count == 0 {
            return -2;
        }
        if value < self.min {
            return -1;
        }
        if value > self.max {
            return self.count as i64;
        }
        let below: f64 = self
            .centroids
            .iter()
            .filter(|centroid| centroid.mean < value)
            .map(|centroid| centroid.weight)
            .sum();
        (below.round() as i64).min(self.count as i64)
    }

    /// The number of observations above `value`. `-1` above the maximum,
    /// `-2` for an empty sketch.
    pub fn revrank(&mut self, value: f64) -> i64 {
        self.compress();
        if self.count == 0 {
            return -2;
        }
        if value > self.max {
            return -1;
        }
        if value < self.min {
            return self.count as i64;
        }
        let above: f64 = self
            .centroids
            .iter()
            .filter(|centroid| centroid.mean > value)
            .map(|centroid| centroid.weight)
            .sum();
        (above.round() as i64).min(self.count as i64)
    }

    /// The value at ascending rank `rank`, `+inf` past the end.
    pub fn by_rank(&mut self, rank: u64) -> f64 {
        if self.count == 0 {
            return f64::NAN;
        }
        if rank >= self.count {
            return f64::INFINITY;
        }
        self.quantile((rank as f64 + 0.5) / self.count as f64)
    }

    /// The value at descending rank `rank`, `-inf` past the end.
    pub fn by_revrank(&mut self, rank: u64) -> f64 {
        if self.count == 0 {
            return f64::NAN;
        }
        if rank >= self.count {
            return f64::NEG_INFINITY;
        }
        self.by_rank(self.count - 1 - rank)
    }

    /// The mean of observations between quantiles `lo` and `hi`.
    pub fn trimmed_mean(&mut self, lo: f64, hi: f64) -> f64 {
        self.compress();
        if self.count == 0 || lo >= hi {
            return f64::NAN;
        }

        let total = self.count as f64;
        let lo_index = lo.clamp(0.0, 1.0) * total;
        let hi_index = hi.clamp(0.0, 1.0) * total;

        let mut cum = 0.0;
        let mut sum = 0.0;
        let mut weight = 0.0;

        for centroid in &self.centroids {
            let start = cum;
            let end = cum + centroid.weight;
            let overlap = hi_index.min(end) - lo_index.max(start);
            if overlap > 0.0 {
                sum += centroid.mean * overlap;
                weight += overlap;
            }
            cum = end;
        }

        if weight > 0.0 { sum / weight } else { f64::NAN }
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn compression(&self) -> usize {
        self.compression
    }

    pub fn merged_nodes(&self) -> usize {
        self.centroids.len()
    }

    pub fn unmerged_nodes(&self) -> usize {
        self.buffer.len()
    }
}
