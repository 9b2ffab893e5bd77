/// Match `byte` against a character class, returning the rest of the pattern
/// when the class matches. An unterminated class matches through the end of
/// the pattern.
fn class(pattern: &[u8], byte: u8) -> Option<&[u8]> {
    let (mut pattern, negated) = match pattern {
        [b'^', rest @ ..] => (rest, true),
        _ => (pattern, false),
    };

    let mut hit = false;
    loop {
        pattern = match pattern {
            [] => break,
            [b']', rest @ ..] => {
                pattern = rest;
                break;
            }
            [b'\\', c, rest @ ..] => {
                hit |= *c == byte;
                rest
            }
            [lo, b'-', hi, rest @ ..] => {
                hit |= (*lo..=*hi).contains(&byte);
                rest
            }
            [c, rest @ ..] => {
                hit |= *c == byte;
                rest
            }
        };
    }

    (hit != negated).then_some(pattern)
}

/// Match a byte string against a glob pattern. `*` matches any run of bytes,
/// `?` matches exactly one, `[…]` matches a class, and `\` escapes the next
/// byte. Matching is byte-wise and case sensitive.
pub fn matches(string: &[u8], pattern: &[u8]) -> bool {
    match pattern {
        [] => string.is_empty(),
        [b'*', rest @ ..] => (0..=string.len()).any(|skip| matches(&string[skip..], rest)),
        [b'?', rest @ ..] => match string {
            [_, tail @ ..] => matches(tail, rest),
            [] => false,
        },
        [b'[', class_pattern @ ..] => match string {
            [c, tail @ ..] => class(class_pattern, *c).is_some_and(|rest| matches(tail, rest)),
            [] => false,
        },
        [b'\\', p, rest @ ..] | [p, rest @ ..] => match string {
            [c, tail @ ..] if c == p => matches(tail, rest),
            _ => false,
        },
    }
}


#[cfg(test)]
#[cfg(not(miri))]
mod proptests {
    use super::*;
    use proptest::{collection::vec, prelude::*};

    proptest! {
        #[test]
        fn star_matches_everything(s in vec(any::<u8>(), 0..40)) {
            prop_assert!(matches(&s, b"*"));
        }

        #[test]
        fn literal_matches_itself(s in vec(any::<u8>(), 0..40)) {
            // Escape every byte so metacharacters are literal.
            let mut pattern = Vec::new();
            for b in &s {
                pattern.push(b'\\');
                pattern.push(*b);
            }
            prop_assert!(matches(&s, &pattern));
        }
    }
}
