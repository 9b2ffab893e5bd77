use crate::bytes::lex;
use logos::Logos;
use std::collections::BTreeMap;

/// A bucket aggregation function for range queries.
#[derive(Clone, Copy, Debug, Eq, Hash, Logos, PartialEq)]
pub enum Aggregation {
    #[regex(b"(?i:avg)")]
    Avg,

    #[regex(b"(?i:sum)")]
    Sum,

    #[regex(b"(?i:min)")]
    Min,

    #[regex(b"(?i:max)")]
    Max,

    #[regex(b"(?i:count)")]
    Count,

    #[regex(b"(?i:first)")]
    First,

    #[regex(b"(?i:last)")]
    Last,
}

impl Aggregation {
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        lex(bytes)
    }

    /// Fold the samples of one bucket into a single value.
    pub fn apply(self, samples: &[f64]) -> f64 {
        use Aggregation::*;
        match self {
            Avg => samples.iter().sum::<f64>() / samples.len() as f64,
            Sum => samples.iter().sum(),
            Min => samples.iter().copied().fold(f64::INFINITY, f64::min),
            Max => samples.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Count => samples.len() as f64,
            First => samples.first().copied().unwrap_or(f64::NAN),
            Last => samples.last().copied().unwrap_or(f64::NAN),
        }
    }
}

/// A time series: timestamped samples with an optional retention window.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimeSeries {
    samples: BTreeMap<u64, f64>,
    retention: u64,
}

impl TimeSeries {
    pub fn new(retention: u64) -> Self {
        TimeSeries {
            samples: BTreeMap::new(),
            retention,
        }
    }

    /// Insert a sample and enforce retention against the newest timestamp.
    pub fn add(&mut self, timestamp: u64, value: f64) {
        self.samples.insert(timestamp, value);
        if self.retention > 0 {
            let newest = *self.samples.keys().next_back().expect("just inserted");
            let horizon = newest.saturating_sub(self.retention);
            self.samples.retain(|ts, _| *ts >= horizon);
        }
    }

    /// The newest sample.
    pub fn last(&self) -> Option<(u64, f64)> {
        self.samples.iter().next_back().map(|(ts, v)| (*ts, *v))
    }

    pub fn first(&self) -> Option<(u64, f64)> {
        self.samples.iter().next().map(|(ts, v)| (*ts, *v))
    }

    pub fn range(&self, from: u64, to: u64) -> impl DoubleEndedIterator<Item = (u64, f64)> {
        self.samples.range(from..=to).map(|(ts, v)| (*ts, *v))
    }

    /// Delete samples inside the inclusive range, returning how many.
    pub fn delete(&mut self, from: u64, to: u64) -> usize {
        let doomed: Vec<u64> = self.samples.range(from..=to).map(|(ts, _)| *ts).collect();
        for timestamp in &doomed {
            self.samples.remove(timestamp);
        }
        doomed.len()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn retention(&self) -> u64 {
        self.retention
    }
}
