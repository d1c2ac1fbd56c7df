//! Canonical city keys.
//!
//! One function turns a raw `city` parameter into the string used for the
//! cache, the durable table, and the provider's `location` parameter.

use std::fmt;

/// Trimmed, percent-encoded city name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CityKey(String);

impl CityKey {
    /// Canonicalize a raw city name.
    ///
    /// Returns `None` if nothing is left after trimming.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(urlencoding::encode(trimmed).into_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CityKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
