use crate::bytes::lex;
use logos::Logos;

/// A similarity metric for vector comparison and search.
#[derive(Clone, Copy, Debug, Eq, Hash, Logos, PartialEq)]
pub enum Metric {
    #[regex(b"(?i:cosine)")]
    Cosine,

    #[regex(b"(?i:dot)")]
    Dot,

    #[regex(b"(?i:l2)")]
    L2,
}

impl Metric {
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        lex(bytes)
    }

    /// Is score `a` a better match than score `b` under this metric?
    pub fn better(self, a: f64, b: f64) -> bool {
        match self {
            Metric::Cosine | Metric::Dot => a > b,
            Metric::L2 => a < b,
        }
    }
}

/// A dense vector value of fixed dimension.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Vector {
    components: Vec<f64>,
}

impl Vector {
    pub fn new(components: Vec<f64>) -> Self {
        Vector { components }
    }

    pub fn dim(&self) -> usize {
        self.components.len()
    }

    pub fn components(&self) -> &[f64] {
        &self.components
    }

    /// Score this vector against another. `None` on dimension mismatch.
    pub fn score(&self, other: &[f64], metric: Metric) -> Option<f64> {
        if self.components.len() != other.len() {
            return None;
        }

        let dot: f64 = self
            .components
            .iter()
            .zip(other)
            .map(|(a, b)| a * b)
            .sum();

        Some(match metric {
            Metric::Dot => dot,
            Metric::Cosine => {
                let na: f64 = self.components.iter().map(|a| a * a).sum::<f64>().sqrt();
                let nb: f64 = other.iter().map(|b| b * b).sum::<f64>().sqrt();
                if na == 0.0 || nb == 0.0 {
                    0.0
                } else {
                    dot / (na * nb)
                }
            }
            Metric::L2 => self
                .components
                .iter()
                .zip(other)
                .map(|(a, b)| (a - b) * (a - b))
                .sum::<f64>()
                .sqrt(),
        })
    }
}
