//! JSON formatters.
//!
//! | Formatter | Single | List | Page |
//! |-----------|--------|------|------|
//! | [`JsonV1`] | offices wrapped, locations bare | offices wrapped, locations as array | same as list |
//! | [`JsonV2`] | bare object | array | envelope with paging fields |

use serde_json::{Map, Value};

use super::{undeclared, ContentType, EntityRef, Formatter, FormattingError, Payload};
use crate::kind::EntityKind;
use crate::paging::PageInfo;

/// Legacy JSON. Office documents keep the historic double `offices`
/// wrapper, even for a single office. Pages render like lists; their cursors
/// travel in the response headers.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonV1;

/// Current JSON, covering every entity kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonV2;

const V1_KINDS: &[EntityKind] = &[EntityKind::Office, EntityKind::Location];
const V2_KINDS: &[EntityKind] = &EntityKind::ALL;

fn to_value(
    formatter: &dyn Formatter,
    kind: EntityKind,
    items: &[EntityRef<'_>],
) -> Result<Vec<Value>, FormattingError> {
    items
        .iter()
        .map(|item| {
            serde_json::to_value(item)
                .map_err(|e| FormattingError::new(&formatter.content_type(), kind, e.to_string()))
        })
        .collect()
}

fn render(formatter: &dyn Formatter, kind: EntityKind, value: &Value) -> Result<String, FormattingError> {
    serde_json::to_string(value)
        .map_err(|e| FormattingError::new(&formatter.content_type(), kind, e.to_string()))
}

impl Formatter for JsonV1 {
    fn name(&self) -> &'static str {
        "JsonV1"
    }

    fn content_type(&self) -> ContentType {
        ContentType::versioned("application/json", "1")
    }

    fn kinds(&self) -> &'static [EntityKind] {
        V1_KINDS
    }

    fn format(&self, payload: &Payload<'_>) -> Result<String, FormattingError> {
        let kind = payload.kind();
        if !self.supports(kind) {
            return Err(undeclared(self, kind));
        }
        let mut values = to_value(self, kind, payload.items())?;

        let value = match (kind, payload) {
            (EntityKind::Office, _) => {
                let inner = Value::Object(Map::from_iter([(
                    "offices".to_string(),
                    Value::Array(values),
                )]));
                Value::Object(Map::from_iter([("offices".to_string(), inner)]))
            }
            (_, Payload::One(_)) => values.pop().unwrap_or(Value::Null),
            _ => Value::Array(values),
        };
        render(self, kind, &value)
    }
}

/// Paging fields of a v2 page envelope.
pub(crate) fn page_fields(info: &PageInfo) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("page".into(), Value::String(info.page.clone()));
    if let Some(next) = &info.next_page {
        map.insert("next-page".into(), Value::String(next.clone()));
    }
    if let Some(total) = info.total {
        map.insert("total".into(), Value::from(total));
    }
    map.insert("page-size".into(), Value::from(info.page_size));
    map
}

impl Formatter for JsonV2 {
    fn name(&self) -> &'static str {
        "JsonV2"
    }

    fn content_type(&self) -> ContentType {
        ContentType::versioned("application/json", "2")
    }

    fn kinds(&self) -> &'static [EntityKind] {
        V2_KINDS
    }

    fn format(&self, payload: &Payload<'_>) -> Result<String, FormattingError> {
        let kind = payload.kind();
        if !self.supports(kind) {
            return Err(undeclared(self, kind));
        }
        let mut values = to_value(self, kind, payload.items())?;

        let value = match payload {
            Payload::One(_) => values.pop().unwrap_or(Value::Null),
            Payload::Many { .. } => Value::Array(values),
            Payload::Page { info, .. } => {
                let mut envelope = page_fields(info);
                envelope.insert(kind.plural().to_string(), Value::Array(values));
                Value::Object(envelope)
            }
        };
        render(self, kind, &value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Location, Office, ProjectId, WaterUser};

    fn office(name: &str) -> Office {
        Office {
            name: name.into(),
            long_name: format!("{name} District"),
            office_type: "DIS".into(),
            reports_to: None,
        }
    }

    fn location() -> Location {
        Location {
            office_id: "SWT".into(),
            name: "KEYS".into(),
            latitude: Some(36.15),
            longitude: Some(-96.25),
            horizontal_datum: None,
            timezone_name: None,
            location_kind: None,
            public_name: None,
            active: true,
            aliases: vec!["Keystone".into()],
        }
    }

    fn parse(s: &str) -> Value {
        serde_json::from_str(s).unwrap()
    }

    #[test]
    fn v1_wraps_office_lists() {
        let offices = vec![office("SPK"), office("SWT")];
        let out = JsonV1.format(&Payload::many(&offices)).unwrap();
        let v = parse(&out);
        assert_eq!(v["offices"]["offices"][1]["name"], "SWT");
    }

    #[test]
    fn v1_single_office_is_wrapped() {
        let o = office("SPK");
        let v = parse(&JsonV1.format(&Payload::one(&o)).unwrap());
        assert_eq!(v["offices"]["offices"].as_array().unwrap().len(), 1);
        assert_eq!(v["offices"]["offices"][0]["long-name"], "SPK District");
    }

    #[test]
    fn v1_single_location_is_bare() {
        let l = location();
        let v = parse(&JsonV1.format(&Payload::one(&l)).unwrap());
        assert_eq!(v["name"], "KEYS");
    }

    #[test]
    fn v1_locations_are_an_array() {
        let locs = vec![location()];
        let v = parse(&JsonV1.format(&Payload::many(&locs)).unwrap());
        assert_eq!(v[0]["aliases"][0], "Keystone");
    }

    #[test]
    fn v1_refuses_water_users() {
        let w = WaterUser {
            entity_name: "City".into(),
            project_id: ProjectId {
                office_id: "SWT".into(),
                name: "KEYS".into(),
            },
            water_right: None,
        };
        let err = JsonV1.format(&Payload::one(&w)).unwrap_err();
        assert_eq!(err.kind, EntityKind::WaterUser);
    }

    #[test]
    fn v2_page_carries_envelope() {
        let locs = vec![location()];
        let payload = Payload::Page {
            kind: EntityKind::Location,
            items: locs.iter().map(|l| EntityRef::Location(l)).collect(),
            info: PageInfo {
                page: "0|2|1".into(),
                next_page: Some("1|2|1".into()),
                total: Some(2),
                page_size: 1,
            },
        };
        let v = parse(&JsonV2.format(&payload).unwrap());
        assert_eq!(v["page"], "0|2|1");
        assert_eq!(v["next-page"], "1|2|1");
        assert_eq!(v["total"], 2);
        assert_eq!(v["page-size"], 1);
        assert_eq!(v["locations"][0]["name"], "KEYS");
    }

    #[test]
    fn v2_last_page_omits_next_and_unknown_total() {
        let locs: Vec<Location> = vec![];
        let payload = Payload::Page {
            kind: EntityKind::Location,
            items: locs.iter().map(|l| EntityRef::Location(l)).collect(),
            info: PageInfo {
                page: "5|null|5".into(),
                next_page: None,
                total: None,
                page_size: 5,
            },
        };
        let v = parse(&JsonV2.format(&payload).unwrap());
        assert!(v.get("next-page").is_none());
        assert!(v.get("total").is_none());
        assert_eq!(v["locations"], Value::Array(vec![]));
    }
}
