//! Storage quota values.

/// Storage usage and limit for a quota root, in the server's units (KiB).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Quota {
    /// Storage currently used.
    pub used: u64,
    /// Storage limit.
    pub limit: u64,
}

impl Quota {
    /// Creates a new quota value.
    #[must_use]
    pub const fn new(used: u64, limit: u64) -> Self {
        Self { used, limit }
    }

    /// Returns usage as a percentage of the limit, or `None` for a zero limit.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn usage_percent(&self) -> Option<f64> {
        (self.limit != 0).then(|| self.used as f64 * 100.0 / self.limit as f64)
    }

    /// Returns true if usage has reached the limit.
    #[must_use]
    pub const fn is_exceeded(&self) -> bool {
        self.limit != 0 && self.used >= self.limit
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_percent() {
        let quota = Quota::new(1234, 5000);
        let pct = quota.usage_percent().unwrap();
        assert!((pct - 24.68).abs() < 1e-9);
    }

    #[test]
    fn test_zero_limit() {
        assert_eq!(Quota::new(10, 0).usage_percent(), None);
        assert!(!Quota::new(10, 0).is_exceeded());
    }

    #[test]
    fn test_exceeded() {
        assert!(Quota::new(5000, 5000).is_exceeded());
        assert!(!Quota::new(4999, 5000).is_exceeded());
    }
}
