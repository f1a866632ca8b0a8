//! Error types shared across the Lumen crates.

use std::error::Error;
use std::fmt;

/// Largest level count a propagator accepts (exclusive).
///
/// Level values share a byte with the "not queued" sentinel, so the range
/// must leave headroom above the darkest level.
pub const LEVEL_COUNT_LIMIT: usize = 254;

/// Rejected level count for a min-fixed-point propagator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LevelError {
    /// A propagator needs at least one level.
    Empty,
    /// The requested count collides with the byte-sized sentinels.
    TooManyLevels {
        /// The requested level count.
        requested: usize,
    },
}

impl fmt::Display for LevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "level count must be at least 1"),
            Self::TooManyLevels { requested } => write!(
                f,
                "level count {requested} must be below {LEVEL_COUNT_LIMIT}"
            ),
        }
    }
}

impl Error for LevelError {}

/// Persisted layer bytes of the wrong length.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayerSizeError {
    /// Required byte count.
    pub expected: usize,
    /// Byte count actually supplied.
    pub actual: usize,
}

impl fmt::Display for LayerSizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "light layer must be {} bytes, got {}",
            self.expected, self.actual
        )
    }
}

impl Error for LayerSizeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mentions_limit() {
        let msg = LevelError::TooManyLevels { requested: 300 }.to_string();
        assert!(msg.contains("300"));
        assert!(msg.contains("254"));
    }

    #[test]
    fn layer_size_display() {
        let err = LayerSizeError {
            expected: 2048,
            actual: 12,
        };
        assert_eq!(err.to_string(), "light layer must be 2048 bytes, got 12");
    }
}
