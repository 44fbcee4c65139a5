//! Child key rules for the hierarchical collection.
//!
//! Keys address one child under a collection and double as note ids, so
//! they must survive as path segments in any backend.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Upper bound on key length in UTF-8 bytes.
pub const MAX_KEY_BYTES: usize = 768;

static FORBIDDEN_KEY_CHARS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.$#\[\]/\x00-\x1F\x7F]").expect("valid key regex"));

/// Key validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    Empty,
    TooLong(usize),
    ForbiddenCharacter { key: String, found: String },
}

impl Display for KeyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "key must not be empty"),
            Self::TooLong(len) => {
                write!(f, "key is {len} bytes; at most {MAX_KEY_BYTES} allowed")
            }
            Self::ForbiddenCharacter { key, found } => {
                write!(f, "key `{key}` contains forbidden character {found:?}")
            }
        }
    }
}

impl Error for KeyError {}

/// Checks that `key` can address a collection child.
pub fn validate_key(key: &str) -> Result<(), KeyError> {
    if key.is_empty() {
        return Err(KeyError::Empty);
    }
    if key.len() > MAX_KEY_BYTES {
        return Err(KeyError::TooLong(key.len()));
    }
    if let Some(found) = FORBIDDEN_KEY_CHARS_RE.find(key) {
        return Err(KeyError::ForbiddenCharacter {
            key: key.to_string(),
            found: found.as_str().to_string(),
        });
    }
    Ok(())
}
