//! SQLSTATE condition codes.
//!
//! Exception conditions are identified by five-character SQLSTATE codes
//! (digits and uppercase letters). The compiler maps condition names from
//! EXCEPTION clauses onto these codes; the executor matches raised errors
//! against them.

use std::fmt;

/// A five-character SQLSTATE condition code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SqlState([u8; 5]);

impl SqlState {
    /// Parse a literal SQLSTATE spelling.
    ///
    /// Accepts exactly five characters drawn from `0-9A-Z`; anything else
    /// returns `None`.
    pub fn from_code(code: &str) -> Option<Self> {
        let bytes = code.as_bytes();
        if bytes.len() != 5 {
            return None;
        }
        if !bytes.iter().all(|b| b.is_ascii_digit() || b.is_ascii_uppercase()) {
            return None;
        }
        Some(Self([bytes[0], bytes[1], bytes[2], bytes[3], bytes[4]]))
    }

    /// Construct from five raw characters, without validation.
    ///
    /// For use by the built-in condition table, whose entries are known good.
    pub const fn from_chars(c: [u8; 5]) -> Self {
        Self(c)
    }

    /// The code as a string slice.
    pub fn as_str(&self) -> &str {
        // Construction guarantees ASCII.
        std::str::from_utf8(&self.0).expect("SQLSTATE is always ASCII")
    }

    /// The two-character class prefix of this code.
    pub fn class(&self) -> &str {
        &self.as_str()[..2]
    }
}

impl fmt::Display for SqlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_codes() {
        let state = SqlState::from_code("22012").unwrap();
        assert_eq!(state.as_str(), "22012");
        assert_eq!(state.class(), "22");

        assert!(SqlState::from_code("P0001").is_some());
    }

    #[test]
    fn rejects_malformed_codes() {
        assert!(SqlState::from_code("2201").is_none());
        assert!(SqlState::from_code("220122").is_none());
        assert!(SqlState::from_code("22o12").is_none());
        assert!(SqlState::from_code("22-12").is_none());
    }
}
