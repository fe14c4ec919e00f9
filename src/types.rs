//! Character encodings and their code units.
//!
//! Generation works on fixed-width code units: the encoding decides how many bits a
//! [`Bdd`][crate::bdd::Bdd] condition ranges over and which units stand for a character.

use std::fmt;
use std::str::FromStr;

use crate::error::RexError;

/// The encoding whose code units generated strings are made of.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum CharEncoding {
    /// 7-bit ASCII.
    #[default]
    Ascii,
    /// ISO-8859-1, one byte per character.
    Latin1,
    /// UTF-16 code units; surrogates never stand alone.
    Utf16,
}

impl CharEncoding {
    pub const ALL: [CharEncoding; 3] = [CharEncoding::Ascii, CharEncoding::Latin1, CharEncoding::Utf16];

    /// Bits per code unit.
    pub const fn bit_width(self) -> u32 {
        match self {
            CharEncoding::Ascii => 7,
            CharEncoding::Latin1 => 8,
            CharEncoding::Utf16 => 16,
        }
    }

    pub const fn max_code(self) -> u32 {
        (1u32 << self.bit_width()) - 1
    }

    /// The character a single code unit stands for, if any.
    pub fn decode_unit(self, unit: u32) -> Option<char> {
        if unit > self.max_code() {
            return None;
        }
        // Every code unit of these encodings coincides with its code point.
        char::from_u32(unit)
    }

    /// The single code unit standing for `c`, if `c` fits in one.
    pub fn encode_char(self, c: char) -> Option<u32> {
        let code = c as u32;
        (code <= self.max_code()).then_some(code)
    }

    /// Whether `unit` survives a decode/encode round trip.
    pub fn round_trips(self, unit: u32) -> bool {
        self.decode_unit(unit)
            .and_then(|c| self.encode_char(c))
            .is_some_and(|u| u == unit)
    }

    pub const fn name(self) -> &'static str {
        match self {
            CharEncoding::Ascii => "ascii",
            CharEncoding::Latin1 => "latin1",
            CharEncoding::Utf16 => "utf16",
        }
    }
}

impl fmt::Display for CharEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CharEncoding {
    type Err = RexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "ascii" | "usascii" => Ok(CharEncoding::Ascii),
            "latin1" | "iso88591" => Ok(CharEncoding::Latin1),
            "utf16" | "unicode" => Ok(CharEncoding::Utf16),
            _ => Err(RexError::InvalidArgument(format!("unknown encoding '{}'", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_width() {
        assert_eq!(CharEncoding::Ascii.bit_width(), 7);
        assert_eq!(CharEncoding::Latin1.bit_width(), 8);
        assert_eq!(CharEncoding::Utf16.bit_width(), 16);
        assert_eq!(CharEncoding::Latin1.max_code(), 0xFF);
        assert_eq!(CharEncoding::default(), CharEncoding::Ascii);
    }

    #[test]
    fn test_round_trip() {
        assert!(CharEncoding::Ascii.round_trips(0x41));
        assert!(!CharEncoding::Ascii.round_trips(0x80));
        assert!(CharEncoding::Latin1.round_trips(0xE9));
        assert!(CharEncoding::Utf16.round_trips(0x20AC));
        assert!(!CharEncoding::Utf16.round_trips(0xD800));
        assert_eq!(CharEncoding::Ascii.encode_char('é'), None);
        assert_eq!(CharEncoding::Latin1.encode_char('é'), Some(0xE9));
    }

    #[test]
    fn test_from_str() {
        assert_eq!("ASCII".parse::<CharEncoding>().unwrap(), CharEncoding::Ascii);
        assert_eq!("iso-8859-1".parse::<CharEncoding>().unwrap(), CharEncoding::Latin1);
        assert_eq!("utf-16".parse::<CharEncoding>().unwrap(), CharEncoding::Utf16);
        assert!("ebcdic".parse::<CharEncoding>().is_err());
    }
}
