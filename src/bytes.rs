use logos::Logos;

/// Lex a Logos token from a byte slice.
pub fn lex<'a, T>(bytes: &'a [u8]) -> Option<T>
where
    T: Logos<'a, Source = [u8]>,
    <T as Logos<'a>>::Extras: Default,
{
    let mut lexer = T::lexer(bytes);
    let token = lexer.next()?.ok()?;

    // Make sure there is only one token
    if lexer.remainder().is_empty() {
        Some(token)
    } else {
        None
    }
}

/// Parse a byte slice into an arbitrary type via utf8.
pub fn parse<T: std::str::FromStr>(bytes: &[u8]) -> Option<T> {
    std::str::from_utf8(bytes).ok()?.parse().ok()
}

/// Parse an i64 if the string representation can be exactly reproduced. This
/// means no surrounding space, no leading `+`, and no leading zeros.
pub fn parse_i64_exact(item: &[u8]) -> Option<i64> {
    let mut n: i64 = 0;
    let mut negative = false;
    let mut rest = match item {
        [b'0'] => return Some(0),
        [b'1'..=b'9', ..] => item,
        [b'-', b'1'..=b'9', ..] => {
            negative = true;
            &item[1..]
        }
        _ => return None,
    };

    loop {
        rest = match rest {
            [] => return Some(n),
            [b @ b'0'..=b'9', rest @ ..] => {
                let value = (*b - b'0').into();
                n = n.checked_mul(10)?;
                n = if negative {
                    n.checked_sub(value)?
                } else {
                    n.checked_add(value)?
                };
                rest
            }
            _ => return None,
        }
    }
}

/// Parse a u64 if the string representation can be exactly reproduced. This
/// means no surrounding space, no sign, and no leading zeros.
pub fn parse_u64_exact(item: &[u8]) -> Option<u64> {
    let mut n: u64 = 0;
    let mut rest = match item {
        [b'0'] => return Some(0),
        [b'1'..=b'9', ..] => item,
        _ => return None,
    };

    loop {
        rest = match rest {
            [] => return Some(n),
            [b @ b'0'..=b'9', rest @ ..] => {
                let value = (*b - b'0').into();
                n = n.checked_mul(10)?;
                n = n.checked_add(value)?;
                rest
            }
            _ => return None,
        }
    }
}

/// Render an f64 in the shortest decimal form that parses back to the same
/// float. Integral values render without a fraction (`5`, not `5.0`).
pub fn format_f64(value: f64) -> Vec<u8> {
    if value.is_nan() {
        return b"nan".to_vec();
    }
    if value == f64::INFINITY {
        return b"inf".to_vec();
    }
    if value == f64::NEG_INFINITY {
        return b"-inf".to_vec();
    }
    format!("{value}").into_bytes()
}

/// An output wrapper for an arbitrary byte sequence. Printable ASCII
/// characters are output directly and all others are escaped.
pub struct Output<'a>(pub &'a [u8]);

impl std::fmt::Debug for Output<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

impl std::fmt::Display for Output<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match std::str::from_utf8(self.0) {
            Ok(s) => write!(f, "{s}"),
            Err(_) => write!(f, "{}", self.0.escape_ascii()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_i64_exact_success() {
        assert_eq!(parse_i64_exact(b"0"), Some(0));
        assert_eq!(parse_i64_exact(b"7"), Some(7));
        assert_eq!(parse_i64_exact(b"-7"), Some(-7));
        assert_eq!(parse_i64_exact(b"1203"), Some(1203));
        let mut buf = Vec::new();
        write!(buf, "{}", i64::MIN).unwrap();
        assert_eq!(parse_i64_exact(&buf), Some(i64::MIN));
    }

    #[test]
    fn parse_i64_exact_failure() {
        assert_eq!(parse_i64_exact(b""), None);
        assert_eq!(parse_i64_exact(b"01"), None);
        assert_eq!(parse_i64_exact(b"+1"), None);
        assert_eq!(parse_i64_exact(b"-0"), None);
        assert_eq!(parse_i64_exact(b" 1"), None);
        assert_eq!(parse_i64_exact(b"1 "), None);
        assert_eq!(parse_i64_exact(b"1.5"), None);
        let mut buf = Vec::new();
        write!(buf, "{}", i128::from(i64::MAX) + 1).unwrap();
        assert_eq!(parse_i64_exact(&buf), None);
    }

    #[test]
    fn parse_u64_exact_success() {
        assert_eq!(parse_u64_exact(b"0"), Some(0));
        assert_eq!(parse_u64_exact(b"42"), Some(42));
        let mut buf = Vec::new();
        write!(buf, "{}", u64::MAX).unwrap();
        assert_eq!(parse_u64_exact(&buf), Some(u64::MAX));
    }

    #[test]
    fn parse_u64_exact_failure() {
        assert_eq!(parse_u64_exact(b""), None);
        assert_eq!(parse_u64_exact(b"-1"), None);
        assert_eq!(parse_u64_exact(b"+1"), None);
        assert_eq!(parse_u64_exact(b"007"), None);
        assert_eq!(parse_u64_exact(b" 1"), None);
        assert_eq!(parse_u64_exact(b"1 "), None);
        let mut buf = Vec::new();
        write!(buf, "{}", u128::from(u64::MAX) + 1).unwrap();
        assert_eq!(parse_u64_exact(&buf), None);
    }

    #[test]
    fn format_shortest() {
        assert_eq!(format_f64(5.0), b"5");
        assert_eq!(format_f64(2.5), b"2.5");
        assert_eq!(format_f64(-0.25), b"-0.25");
        assert_eq!(format_f64(f64::INFINITY), b"inf");
    }

    #[test]
    fn lex_exact_bytes() {
        #[derive(Logos)]
        pub enum Test {
            #[regex(b"(?i:test)")]
            Test,
        }

        assert!(matches!(lex(b"TeSt"), Some(Test::Test)));
        assert!(lex::<Test>(b"x").is_none());
        assert!(lex::<Test>(b"test  ").is_none());
    }
}

#[cfg(test)]
#[cfg(not(miri))]
mod proptests {
    use super::*;
    use proptest::{collection::vec, prelude::*};
    use std::io::Write;

    proptest! {
        #[test]
        fn parse_i64_exact_round_trips(x in vec(any::<u8>(), 0..30)) {
            if let Some(i) = parse_i64_exact(&x[..]) {
                let mut v = Vec::new();
                write!(v, "{i}").unwrap();
                prop_assert_eq!(x, v);
            }
        }

        #[test]
        fn parse_u64_exact_round_trips(x in vec(any::<u8>(), 0..30)) {
            if let Some(i) = parse_u64_exact(&x[..]) {
                let mut v = Vec::new();
                write!(v, "{i}").unwrap();
                prop_assert_eq!(x, v);
            }
        }

        #[test]
        fn format_f64_round_trips(x in any::<f64>().prop_filter("finite", |x| x.is_finite())) {
            let rendered = format_f64(x);
            let parsed: f64 = std::str::from_utf8(&rendered).unwrap().parse().unwrap();
            prop_assert_eq!(parsed, x);
        }
    }
}
