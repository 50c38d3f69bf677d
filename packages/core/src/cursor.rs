//! Stateless pagination cursors.
//!
//! A cursor token is the delimited triple `offset|total|pageSize`, where
//! `total` is the literal `null` while the size of the result set is
//! unknown:
//!
//! ```text
//! 0|null|500      first page, total not counted
//! 500|1234|500    second page of a 1234-parent listing
//! ```
//!
//! Clients treat the token as opaque and hand it back verbatim to continue a
//! listing. Decoding never fails: a missing, truncated, or corrupted token
//! restarts the listing at offset 0 rather than rejecting the request.

use std::fmt;

const DELIMITER: char = '|';
const UNKNOWN_TOTAL: &str = "null";

/// Position within a paged listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    /// Number of parents already returned by earlier pages.
    pub offset: u64,
    /// Parent count of the whole listing, when known.
    pub total: Option<u64>,
    /// Parents per page. Always positive; fixed for the whole listing.
    pub page_size: u32,
}

impl Cursor {
    /// The cursor for the first page of a listing.
    pub fn first(page_size: u32) -> Self {
        Self {
            offset: 0,
            total: None,
            page_size: page_size.max(1),
        }
    }

    /// Decode a token, falling back field by field on anything unusable.
    ///
    /// - absent or empty token, or fewer than three fields: first page with
    ///   `default_page_size`;
    /// - unparseable offset: 0;
    /// - unparseable total (other than `null`): unknown;
    /// - unparseable or zero page size: `default_page_size`;
    /// - a known total below the offset is stale and becomes unknown.
    ///
    /// Fields beyond the third are ignored.
    pub fn decode(token: Option<&str>, default_page_size: u32) -> Self {
        let fallback = Self::first(default_page_size);
        let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) else {
            return fallback;
        };

        let parts: Vec<&str> = token.split(DELIMITER).collect();
        if parts.len() < 3 {
            tracing::info!(token, "cursor has fewer than three fields; restarting at offset 0");
            return fallback;
        }

        let offset = match parts[0].trim().parse::<u64>() {
            Ok(offset) => offset,
            Err(_) => {
                tracing::info!(field = parts[0], "could not parse cursor offset; using 0");
                0
            }
        };

        let total = match parts[1].trim() {
            UNKNOWN_TOTAL => None,
            raw => match raw.parse::<u64>() {
                Ok(total) => Some(total),
                Err(_) => {
                    tracing::info!(field = raw, "could not parse cursor total; treating as unknown");
                    None
                }
            },
        };

        let page_size = match parts[2].trim().parse::<u32>() {
            Ok(size) if size > 0 => size,
            _ => {
                tracing::info!(field = parts[2], "unusable cursor page size; using default");
                fallback.page_size
            }
        };

        let total = match total {
            Some(total) if total < offset => {
                tracing::info!(offset, total, "cursor total is below its offset; recounting");
                None
            }
            other => other,
        };

        Self {
            offset,
            total,
            page_size,
        }
    }

    /// Render the token form of this cursor.
    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// The cursor following a page that returned `returned` parents.
    pub fn advance(&self, returned: u64) -> Self {
        Self {
            offset: self.offset + returned,
            ..*self
        }
    }

    /// Whether the known total has been reached.
    pub fn is_exhausted(&self) -> bool {
        self.total.is_some_and(|total| self.offset >= total)
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.total {
            Some(total) => write!(f, "{}{DELIMITER}{total}{DELIMITER}{}", self.offset, self.page_size),
            None => write!(
                f,
                "{}{DELIMITER}{UNKNOWN_TOTAL}{DELIMITER}{}",
                self.offset, self.page_size
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_known_and_unknown_total() {
        let c = Cursor {
            offset: 500,
            total: Some(1234),
            page_size: 500,
        };
        assert_eq!(c.encode(), "500|1234|500");
        assert_eq!(Cursor::first(20).encode(), "0|null|20");
    }

    #[test]
    fn round_trip() {
        let cursors = [
            Cursor::first(1),
            Cursor {
                offset: 0,
                total: Some(0),
                page_size: 10,
            },
            Cursor {
                offset: 40,
                total: Some(41),
                page_size: 20,
            },
            Cursor {
                offset: u64::MAX,
                total: None,
                page_size: u32::MAX,
            },
        ];
        for c in cursors {
            assert_eq!(Cursor::decode(Some(&c.encode()), 7), c);
        }
    }

    #[test]
    fn absent_or_empty_token_is_first_page() {
        assert_eq!(Cursor::decode(None, 25), Cursor::first(25));
        assert_eq!(Cursor::decode(Some(""), 25), Cursor::first(25));
        assert_eq!(Cursor::decode(Some("   "), 25), Cursor::first(25));
    }

    #[test]
    fn garbage_restarts_at_offset_zero() {
        for token in ["garbage", "a|b|c", "||", "-5|null|10", "12|34", "\u{0}|\u{1}|\u{2}"] {
            let c = Cursor::decode(Some(token), 50);
            assert_eq!(c.offset, 0, "token {token:?}");
        }
    }

    #[test]
    fn fields_fall_back_independently() {
        let c = Cursor::decode(Some("x|99|10"), 50);
        assert_eq!(c, Cursor { offset: 0, total: Some(99), page_size: 10 });

        let c = Cursor::decode(Some("20|lots|10"), 50);
        assert_eq!(c, Cursor { offset: 20, total: None, page_size: 10 });

        let c = Cursor::decode(Some("20|null|0"), 50);
        assert_eq!(c.page_size, 50);
    }

    #[test]
    fn cursor_page_size_wins_over_default() {
        assert_eq!(Cursor::decode(Some("0|null|10"), 500).page_size, 10);
    }

    #[test]
    fn stale_total_is_dropped() {
        let c = Cursor::decode(Some("30|10|10"), 50);
        assert_eq!(c.offset, 30);
        assert_eq!(c.total, None);
    }

    #[test]
    fn extra_fields_are_ignored() {
        let c = Cursor::decode(Some("10|20|5|extra"), 50);
        assert_eq!(c, Cursor { offset: 10, total: Some(20), page_size: 5 });
    }

    #[test]
    fn zero_default_page_size_is_clamped() {
        assert_eq!(Cursor::decode(None, 0).page_size, 1);
    }
}
