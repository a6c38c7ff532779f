//! IMAP command tag generator.
//!
//! Tags are used to match commands with their responses.

use std::sync::atomic::{AtomicU64, Ordering};

/// Tag generator for IMAP commands.
///
/// Generates unique sequential tags in the format "a0000000001",
/// "a0000000002", etc. The fixed width keeps tags in lexicographic issuance
/// order for the first ten billion tags of a session; later tags stay unique
/// but grow wider.
#[derive(Debug)]
pub struct TagGenerator {
    counter: AtomicU64,
    prefix: char,
}

impl TagGenerator {
    /// Creates a new tag generator with the given prefix.
    #[must_use]
    pub const fn new(prefix: char) -> Self {
        Self {
            counter: AtomicU64::new(0),
            prefix,
        }
    }

    /// Generates the next tag.
    #[must_use]
    pub fn next(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}{:010}", self.prefix, n)
    }

    /// Resets the counter to zero.
    pub fn reset(&self) {
        self.counter.store(0, Ordering::Relaxed);
    }
}

impl Default for TagGenerator {
    fn default() -> Self {
        Self::new('a')
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::needless_collect,
    clippy::unreadable_literal
)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_tag_generation() {
        let generator = TagGenerator::default();
        assert_eq!(generator.next(), "a0000000001");
        assert_eq!(generator.next(), "a0000000002");
        assert_eq!(generator.next(), "a0000000003");
    }

    #[test]
    fn test_custom_prefix() {
        let generator = TagGenerator::new('T');
        assert_eq!(generator.next(), "T0000000001");
        assert_eq!(generator.next(), "T0000000002");
    }

    #[test]
    fn test_reset() {
        let generator = TagGenerator::default();
        let _ = generator.next();
        let _ = generator.next();
        generator.reset();
        assert_eq!(generator.next(), "a0000000001");
    }

    #[test]
    fn test_past_a_million_tags() {
        let generator = TagGenerator::default();
        generator.counter.store(999_999, Ordering::Relaxed);
        let before = generator.next();
        let after = generator.next();
        assert_eq!(before, "a0001000000");
        assert_eq!(after, "a0001000001");
        assert!(before < after);
    }

    #[test]
    fn test_widest_fixed_tag() {
        let generator = TagGenerator::default();
        generator.counter.store(9_999_999_998, Ordering::Relaxed);
        assert_eq!(generator.next(), "a9999999999");
        assert_eq!(generator.next(), "a10000000000");
    }

    proptest! {
        #[test]
        fn tags_are_distinct_and_increasing(start in 0u64..9_999_990_000, n in 1usize..2000) {
            let generator = TagGenerator::default();
            generator.counter.store(start, Ordering::Relaxed);
            let tags: Vec<String> = (0..n).map(|_| generator.next()).collect();
            for pair in tags.windows(2) {
                prop_assert!(pair[0] < pair[1], "{} !< {}", pair[0], pair[1]);
            }
            prop_assert!(tags.iter().all(|t| t.len() == 11));
        }
    }
}
