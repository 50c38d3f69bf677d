//! Content types and `Accept` header parsing.

use std::cmp::Ordering;
use std::fmt;

/// A media type reduced to what format matching looks at: the lowercase
/// essence (`application/json`) and the optional `version` parameter.
///
/// Legacy short names such as `json` are represented with the bare token as
/// their base and no version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentType {
    base: String,
    version: Option<String>,
}

impl ContentType {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim().to_ascii_lowercase(),
            version: None,
        }
    }

    pub fn versioned(base: &str, version: &str) -> Self {
        Self {
            base: base.trim().to_ascii_lowercase(),
            version: Some(version.trim().to_string()),
        }
    }

    /// Parse a single media range or legacy token.
    ///
    /// Parameters other than `version` are dropped. Returns `None` for empty
    /// input and for values that are neither a valid media type nor a bare
    /// token.
    pub fn parse(raw: &str) -> Option<Self> {
        Self::parse_with_quality(raw).map(|(ct, _)| ct)
    }

    fn parse_with_quality(raw: &str) -> Option<(Self, f32)> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if !raw.contains('/') {
            let token = raw.split(';').next().unwrap_or(raw).trim();
            let valid = !token.is_empty()
                && token
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '+' | '.' | '_'));
            return valid.then(|| (Self::new(token), 1.0));
        }

        let mime: mime::Mime = raw.parse().ok()?;
        let version = mime
            .get_param("version")
            .map(|v| v.as_str().trim_matches('"').to_string());
        let quality = mime
            .get_param("q")
            .and_then(|q| q.as_str().parse::<f32>().ok())
            .unwrap_or(1.0);

        Some((
            Self {
                base: mime.essence_str().to_ascii_lowercase(),
                version,
            },
            quality,
        ))
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// `*/*`.
    pub fn is_any(&self) -> bool {
        self.base == "*/*"
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{};version={}", self.base, version),
            None => f.write_str(&self.base),
        }
    }
}

/// One entry of an `Accept` value.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub content_type: ContentType,
    pub quality: f32,
}

/// The candidates of an `Accept` value, most preferred first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AcceptHeader {
    candidates: Vec<Candidate>,
}

impl AcceptHeader {
    /// Split a header (or a single legacy `format` value) into candidates.
    ///
    /// Entries with `q=0` are dropped, unparseable entries are skipped, and
    /// the rest are ordered by descending quality with the stated order
    /// breaking ties.
    pub fn parse(raw: &str) -> Self {
        let mut candidates: Vec<Candidate> = raw
            .split(',')
            .filter(|entry| !entry.trim().is_empty())
            .filter_map(|entry| match ContentType::parse_with_quality(entry) {
                Some((content_type, quality)) => Some(Candidate {
                    content_type,
                    quality,
                }),
                None => {
                    tracing::debug!(entry = entry.trim(), "skipping unparseable accept entry");
                    None
                }
            })
            .filter(|c| c.quality > 0.0)
            .collect();

        // Stable, so equal qualities keep the client's order.
        candidates.sort_by(|a, b| b.quality.partial_cmp(&a.quality).unwrap_or(Ordering::Equal));
        Self { candidates }
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }
}

/// Choose the value to negotiate on from the request.
///
/// The `Accept` header wins unless it is absent, blank, or `*/*`, in which
/// case a non-blank legacy `format` query value is used instead.
pub fn negotiate<'a>(accept: Option<&'a str>, format: Option<&'a str>) -> &'a str {
    let accept = accept.map(str::trim).filter(|a| !a.is_empty());
    let format = format.map(str::trim).filter(|f| !f.is_empty());
    match (accept, format) {
        (Some(accept), Some(format)) if accept == "*/*" => format,
        (Some(accept), _) => accept,
        (None, Some(format)) => format,
        (None, None) => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_version_and_drops_other_params() {
        let ct = ContentType::parse("Application/JSON; version=2; charset=utf-8").unwrap();
        assert_eq!(ct, ContentType::versioned("application/json", "2"));
        assert_eq!(ct.to_string(), "application/json;version=2");
    }

    #[test]
    fn bare_token_is_legacy_name() {
        assert_eq!(ContentType::parse(" JSON "), Some(ContentType::new("json")));
        assert_eq!(ContentType::parse("geojson"), Some(ContentType::new("geojson")));
        assert_eq!(ContentType::parse("not a type"), None);
        assert_eq!(ContentType::parse(""), None);
    }

    #[test]
    fn orders_by_quality_then_position() {
        let h = AcceptHeader::parse("text/csv;q=0.5, application/xml, application/json;q=0.9, text/plain");
        let order: Vec<String> = h
            .candidates()
            .iter()
            .map(|c| c.content_type.to_string())
            .collect();
        assert_eq!(
            order,
            vec!["application/xml", "text/plain", "application/json", "text/csv"]
        );
    }

    #[test]
    fn zero_quality_and_garbage_dropped() {
        let h = AcceptHeader::parse("application/json;q=0, ///, text/csv");
        assert_eq!(h.candidates().len(), 1);
        assert_eq!(h.candidates()[0].content_type, ContentType::new("text/csv"));
    }

    #[test]
    fn wildcard_is_recognised() {
        let h = AcceptHeader::parse("*/*");
        assert!(h.candidates()[0].content_type.is_any());
    }

    #[test]
    fn accept_preferred_over_format() {
        assert_eq!(negotiate(Some("application/xml"), Some("json")), "application/xml");
        assert_eq!(negotiate(Some("*/*"), Some("csv")), "csv");
        assert_eq!(negotiate(None, Some("tab")), "tab");
        assert_eq!(negotiate(Some("  "), None), "");
        assert_eq!(negotiate(Some("*/*"), None), "*/*");
    }
}
