//! Query parameters of the listing and lookup endpoints.
//!
//! Field names follow the kebab-case query keys (`page-size`,
//! `template-id-mask`). Every field is optional; unknown keys are ignored.

use serde::{Deserialize, Serialize};

/// Parameters shared by every endpoint: the legacy `format` value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormatQuery {
    /// Legacy format name (`json`, `xml`, `csv`, `tab`, `geojson`) or a
    /// content type. Only consulted when `Accept` is absent or `*/*`.
    pub format: Option<String>,
}

/// `GET /offices` and `GET /offices/{office}`.
pub type OfficeQuery = FormatQuery;

/// `GET /locations`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct LocationQuery {
    pub office: Option<String>,
    /// Glob mask over location names (`*`, `?`), case-insensitive.
    pub names: Option<String>,
    /// Cursor token from a previous page's `next-page`.
    pub page: Option<String>,
    pub page_size: Option<u32>,
    /// Count the listing on the first page.
    pub include_total: Option<bool>,
    pub format: Option<String>,
}

/// `GET /ratings/template`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct TemplateQuery {
    pub office: Option<String>,
    /// Glob mask over template ids, case-insensitive.
    pub template_id_mask: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<u32>,
    pub include_total: Option<bool>,
    pub format: Option<String>,
}

/// `GET /ratings/template/{template-id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TemplateLookupQuery {
    /// Restrict the lookup to one office. Without it, a template id shared by
    /// several offices is ambiguous.
    pub office: Option<String>,
    pub format: Option<String>,
}

/// Clamp a requested page size to `1..=max`, falling back to `default`.
pub fn effective_page_size(requested: Option<u32>, default: u32, max: u32) -> u32 {
    let max = max.max(1);
    requested.unwrap_or(default).clamp(1, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kebab_case_keys() {
        let q: TemplateQuery = serde_json::from_value(serde_json::json!({
            "template-id-mask": "Elev;*",
            "page-size": 20,
            "include-total": true
        }))
        .unwrap();
        assert_eq!(q.template_id_mask.as_deref(), Some("Elev;*"));
        assert_eq!(q.page_size, Some(20));
        assert_eq!(q.include_total, Some(true));
    }

    #[test]
    fn page_size_clamped() {
        assert_eq!(effective_page_size(None, 500, 5000), 500);
        assert_eq!(effective_page_size(Some(0), 500, 5000), 1);
        assert_eq!(effective_page_size(Some(9000), 500, 5000), 5000);
        assert_eq!(effective_page_size(Some(25), 500, 5000), 25);
    }
}
