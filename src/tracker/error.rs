//! Module loading errors.

use thiserror::Error;

/// Why a module blob was rejected.
///
/// Loading is all-or-nothing: any of these means the player is never built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModuleError {
    #[error("module is {len} bytes, too small for the {needed}-byte header")]
    TooSmall { len: usize, needed: usize },

    #[error("song length {0} is outside 1..=128")]
    InvalidSongLength(u8),

    #[error("format tag {tag:?} implies {channels} channels (max {max})")]
    InvalidChannelCount {
        tag: String,
        channels: usize,
        max: usize,
    },

    #[error("pattern data for {patterns} patterns needs {needed} bytes, module has {available}")]
    PatternsTruncated {
        patterns: usize,
        needed: usize,
        available: usize,
    },

    #[error("sample {index} data needs {needed} bytes, module has {available}")]
    SampleTruncated {
        index: usize,
        needed: usize,
        available: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            ModuleError::TooSmall { len: 10, needed: 1084 }.to_string(),
            "module is 10 bytes, too small for the 1084-byte header"
        );
        assert_eq!(
            ModuleError::InvalidSongLength(0).to_string(),
            "song length 0 is outside 1..=128"
        );
        assert_eq!(
            ModuleError::SampleTruncated {
                index: 3,
                needed: 4000,
                available: 3500
            }
            .to_string(),
            "sample 3 data needs 4000 bytes, module has 3500"
        );
    }
}
