//! Format catalog: `GET /formats`.

use riverdata::EntityKind;
use serde::{Deserialize, Serialize};

/// One registered content type.
///
/// ```json
/// { "content-type": "json", "alias-of": "application/json;version=1", "kinds": ["Office", "Location"] }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct FormatInfo {
    pub content_type: String,
    /// The canonical type an alias resolves to; absent for canonical types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias_of: Option<String>,
    /// Entity kinds the type can represent.
    pub kinds: Vec<EntityKind>,
}

/// Response body for `GET /formats`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormatCatalog {
    pub formats: Vec<FormatInfo>,
}

impl FormatCatalog {
    /// The entry for `content_type`, if registered.
    pub fn find(&self, content_type: &str) -> Option<&FormatInfo> {
        self.formats.iter().find(|f| f.content_type == content_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_field_omitted_for_canonical_types() {
        let info = FormatInfo {
            content_type: "text/csv;version=1".into(),
            alias_of: None,
            kinds: vec![EntityKind::Office],
        };
        let v = serde_json::to_value(&info).unwrap();
        assert!(v.get("alias-of").is_none());
        assert_eq!(v["kinds"][0], "Office");
    }

    #[test]
    fn find_by_content_type() {
        let catalog = FormatCatalog {
            formats: vec![FormatInfo {
                content_type: "csv".into(),
                alias_of: Some("text/csv;version=1".into()),
                kinds: vec![EntityKind::Office],
            }],
        };
        assert!(catalog.find("csv").is_some());
        assert!(catalog.find("tab").is_none());
    }
}
