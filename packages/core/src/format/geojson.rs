//! GeoJSON for locations.
//!
//! A single location renders as a `Feature`; lists and pages render as a
//! `FeatureCollection`. Locations without both coordinates get a `null`
//! geometry. The remaining location fields go into `properties`.

use serde_json::{json, Value};

use super::json::page_fields;
use super::{undeclared, ContentType, EntityRef, Formatter, FormattingError, Payload};
use crate::kind::EntityKind;
use crate::types::Location;

/// GeoJSON, version 1.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoJsonV1;

const KINDS: &[EntityKind] = &[EntityKind::Location];

impl GeoJsonV1 {
    fn feature(&self, location: &Location) -> Result<Value, FormattingError> {
        let mut properties = serde_json::to_value(location)
            .map_err(|e| FormattingError::new(&self.content_type(), EntityKind::Location, e.to_string()))?;
        if let Some(map) = properties.as_object_mut() {
            map.remove("latitude");
            map.remove("longitude");
        }

        let geometry = match (location.longitude, location.latitude) {
            (Some(lon), Some(lat)) => json!({ "type": "Point", "coordinates": [lon, lat] }),
            _ => Value::Null,
        };

        Ok(json!({
            "type": "Feature",
            "id": format!("{}/{}", location.office_id, location.name),
            "geometry": geometry,
            "properties": properties,
        }))
    }
}

impl Formatter for GeoJsonV1 {
    fn name(&self) -> &'static str {
        "GeoJsonV1"
    }

    fn content_type(&self) -> ContentType {
        ContentType::versioned("application/geo+json", "1")
    }

    fn kinds(&self) -> &'static [EntityKind] {
        KINDS
    }

    fn format(&self, payload: &Payload<'_>) -> Result<String, FormattingError> {
        let kind = payload.kind();
        if !self.supports(kind) {
            return Err(undeclared(self, kind));
        }

        let mut features = Vec::with_capacity(payload.items().len());
        for item in payload.items() {
            let EntityRef::Location(location) = item else {
                return Err(undeclared(self, item.kind()));
            };
            features.push(self.feature(location)?);
        }

        let value = match payload {
            Payload::One(_) => features.pop().unwrap_or(Value::Null),
            Payload::Many { .. } => json!({ "type": "FeatureCollection", "features": features }),
            Payload::Page { info, .. } => {
                let mut collection = page_fields(info);
                collection.insert("type".into(), Value::from("FeatureCollection"));
                collection.insert("features".into(), Value::Array(features));
                Value::Object(collection)
            }
        };

        serde_json::to_string(&value)
            .map_err(|e| FormattingError::new(&self.content_type(), kind, e.to_string()))
    }
}
