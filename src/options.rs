//! Pattern options and engine settings.

use bitflags::bitflags;

use crate::error::{Result, RexError};
use crate::types::CharEncoding;

bitflags! {
    /// Options a pattern is compiled under.
    ///
    /// Bit values follow the .NET `RegexOptions` enumeration.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RegexOptions: u32 {
        const IGNORE_CASE = 1;
        /// `^` and `$` also match around line breaks.
        const MULTILINE = 2;
        /// `.` also matches `\n`.
        const SINGLELINE = 16;
        const IGNORE_PATTERN_WHITESPACE = 32;
        /// Accepted for compatibility; it does not change the language.
        const RIGHT_TO_LEFT = 64;
    }
}

impl RegexOptions {
    /// Options from raw bits, rejecting bits that name no option.
    pub fn from_raw(bits: u32) -> Result<Self> {
        Self::from_bits(bits).ok_or_else(|| {
            RexError::InvalidArgument(format!(
                "unrecognized option bits {:#x}",
                bits & !Self::all().bits()
            ))
        })
    }

    /// The options that affect the compiled language.
    pub fn effective(self) -> Self {
        self.difference(Self::RIGHT_TO_LEFT)
    }
}

/// Configuration of a [`RexEngine`][crate::engine::RexEngine].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RexSettings {
    pub encoding: CharEncoding,
    /// Seed of the random source; `None` draws one from the OS.
    pub seed: Option<u64>,
}

impl RexSettings {
    pub fn with_encoding(mut self, encoding: CharEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw() {
        assert_eq!(RegexOptions::from_raw(0).unwrap(), RegexOptions::empty());
        assert_eq!(
            RegexOptions::from_raw(1 | 2).unwrap(),
            RegexOptions::IGNORE_CASE | RegexOptions::MULTILINE
        );
        assert!(matches!(
            RegexOptions::from_raw(1 << 10),
            Err(RexError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_effective_strips_right_to_left() {
        let options = RegexOptions::RIGHT_TO_LEFT | RegexOptions::IGNORE_CASE;
        assert_eq!(options.effective(), RegexOptions::IGNORE_CASE);
    }

    #[test]
    fn test_settings_builder() {
        let settings = RexSettings::default().with_encoding(CharEncoding::Latin1).with_seed(9);
        assert_eq!(settings.encoding, CharEncoding::Latin1);
        assert_eq!(settings.seed, Some(9));
        assert_eq!(RexSettings::default().seed, None);
    }
}
