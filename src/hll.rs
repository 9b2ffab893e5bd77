//! The dense HyperLogLog codec. A sketch lives inside an ordinary string
//! value: a `DHLL` header followed by 2^14 one-byte registers, so the PF
//! commands detect it by prefix and everything else sees plain bytes.

use crate::sketch::hash64;

const MAGIC: &[u8; 4] = b"DHLL";
const VERSION: u8 = 0x01;
const PRECISION: u8 = 0x0e;
const REGISTERS: usize = 1 << 14;
const HEADER: usize = 7;
const LEN: usize = HEADER + REGISTERS;
const MAX_RANK: u8 = 50;
const HASH_SEED: u64 = 0x4447;

/// A fresh sketch with all registers at zero.
pub fn empty() -> Vec<u8> {
    let mut bytes = vec![0u8; LEN];
    bytes[..4].copy_from_slice(MAGIC);
    bytes[4] = VERSION;
    bytes[5] = PRECISION;
    bytes
}

/// Does this string hold a well-formed sketch?
pub fn is_valid(bytes: &[u8]) -> bool {
    bytes.len() == LEN && bytes.starts_with(MAGIC)
}

/// Observe an item. Returns `true` when a register changed.
pub fn add(bytes: &mut [u8], item: &[u8]) -> bool {
    let hash = hash64(item, HASH_SEED);

    // The top 14 bits pick a register; the rank is the position of the first
    // set bit in the rest.
    let index = (hash >> (64 - 14)) as usize;
    let rest = hash << 14;
    let rank = (rest.leading_zeros() as u8 + 1).min(MAX_RANK);

    let register = &mut bytes[HEADER + index];
    if rank > *register {
        *register = rank;
        true
    } else {
        false
    }
}

/// Estimate the cardinality from the registers.
pub fn count(bytes: &[u8]) -> u64 {
    let registers = &bytes[HEADER..];
    let m = REGISTERS as f64;
    let alpha = 0.7213 / (1.0 + 1.079 / m);

    let mut sum = 0.0;
    let mut zeros = 0u64;
    for &register in registers {
        sum += 2f64.powi(-i32::from(register));
        if register == 0 {
            zeros += 1;
        }
    }

    let mut estimate = alpha * m * m / sum;

    // Linear counting in the small range.
    if estimate <= 2.5 * m && zeros > 0 {
        estimate = m * (m / zeros as f64).ln();
    }

    estimate.round() as u64
}

/// Fold the registers of `src` into `dst` by taking maxima.
pub fn merge_into(dst: &mut [u8], src: &[u8]) {
    for (d, s) in dst[HEADER..].iter_mut().zip(&src[HEADER..]) {
        *d = (*d).max(*s);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_valid_and_counts_zero() {
        let bytes = empty();
        assert!(is_valid(&bytes));
        assert_eq!(count(&bytes), 0);
    }

    #[test]
    fn detection_rejects_plain_strings() {
        assert!(!is_valid(b"hello"));
        assert!(!is_valid(b"DHLL"));
        let mut truncated = empty();
        truncated.pop();
        assert!(!is_valid(&truncated));
    }

    #[test]
    fn add_is_idempotent() {
        let mut bytes = empty();
        assert!(add(&mut bytes, b"item"));
        assert!(!add(&mut bytes, b"item"));
        assert_eq!(count(&bytes), 1);
    }

    #[test]
    fn estimates_distinct_items() {
        let mut bytes = empty();
        for i in 0..10_000u32 {
            add(&mut bytes, format!("item:{i}").as_bytes());
        }
        let estimate = count(&bytes) as f64;
        assert!((estimate - 10_000.0).abs() / 10_000.0 < 0.03, "{estimate}");
    }

    #[test]
    fn merge_unions() {
        let mut a = empty();
        let mut b = empty();
        for i in 0..500u32 {
            add(&mut a, format!("a:{i}").as_bytes());
            add(&mut b, format!("b:{i}").as_bytes());
        }
        merge_into(&mut a, &b);
        let estimate = count(&a) as f64;
        assert!((estimate - 1_000.0).abs() / 1_000.0 < 0.05, "{estimate}");
    }
}
