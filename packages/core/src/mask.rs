//! Case-insensitive glob masks for identifier filters.
//!
//! Masks use `*` for any run of characters and `?` for exactly one; every
//! other character matches itself, ignoring ASCII case. A mask converts to a
//! [`Regex`] for in-memory filtering and to a SQL `LIKE` pattern (escaped
//! with `\`) for database filtering.

use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("invalid id mask {mask:?}: {source}")]
pub struct MaskError {
    pub mask: String,
    #[source]
    pub source: regex::Error,
}

/// A compiled identifier mask.
#[derive(Debug, Clone)]
pub struct IdMask {
    raw: String,
    regex: Regex,
}

impl IdMask {
    pub fn new(mask: &str) -> Result<Self, MaskError> {
        let mut pattern = String::with_capacity(mask.len() + 8);
        pattern.push('^');
        for c in mask.chars() {
            match c {
                '*' => pattern.push_str(".*"),
                '?' => pattern.push('.'),
                // ASCII folding only, the same as SQLite's LIKE.
                c if c.is_ascii_alphabetic() => {
                    pattern.push('[');
                    pattern.push(c.to_ascii_lowercase());
                    pattern.push(c.to_ascii_uppercase());
                    pattern.push(']');
                }
                other => pattern.push_str(&regex::escape(other.encode_utf8(&mut [0u8; 4]))),
            }
        }
        pattern.push('$');

        let regex = Regex::new(&pattern).map_err(|source| MaskError {
            mask: mask.to_string(),
            source,
        })?;
        Ok(Self {
            raw: mask.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, id: &str) -> bool {
        self.regex.is_match(id)
    }

    /// The mask as a `LIKE` pattern to be used with `ESCAPE '\'`.
    pub fn to_like(&self) -> String {
        let mut like = String::with_capacity(self.raw.len());
        for c in self.raw.chars() {
            match c {
                '*' => like.push('%'),
                '?' => like.push('_'),
                '%' | '_' | '\\' => {
                    like.push('\\');
                    like.push(c);
                }
                other => like.push(other),
            }
        }
        like
    }
}
