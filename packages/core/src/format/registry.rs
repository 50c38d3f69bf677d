//! The process-wide format table.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use super::media::{AcceptHeader, ContentType};
use super::{
    Delimited, FormatError, Formatter, GeoJsonV1, JsonV1, JsonV2, Payload, XmlV1, XmlV2, CSV,
    CSVV1, GEOJSON, GEOJSONV1, JSON, JSONV1, JSONV2, TAB, TABV1, XML, XMLV2,
};
use crate::kind::EntityKind;

/// A registered content type.
///
/// A descriptor with `alias_of` set stands in for another descriptor;
/// following aliases always ends at a canonical descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatDescriptor {
    pub content_type: ContentType,
    pub alias_of: Option<ContentType>,
}

/// Errors detected while building a registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("{0:?} is not a valid content type")]
    InvalidContentType(String),

    #[error("alias {alias} points at unregistered content type {target}")]
    DanglingAlias { alias: String, target: String },

    #[error("alias cycle through {0}")]
    AliasCycle(String),

    #[error("{0} is registered both as an alias and as a formatter's content type")]
    AliasShadowsFormat(String),

    #[error("alias {0} registered twice")]
    DuplicateAlias(String),

    #[error("two formatters for {content_type} both declare {kind}")]
    DuplicateBinding {
        content_type: String,
        kind: EntityKind,
    },
}

/// The outcome of a successful resolution.
#[derive(Clone)]
pub struct Resolved {
    /// Canonical content type, suitable for the response `Content-Type`.
    pub content_type: ContentType,
    formatter: Arc<dyn Formatter>,
}

impl Resolved {
    pub fn formatter(&self) -> &Arc<dyn Formatter> {
        &self.formatter
    }

    /// Serialise `payload`, rejecting kinds the formatter does not declare.
    pub fn format(&self, payload: &Payload<'_>) -> Result<String, FormatError> {
        let kind = payload.kind();
        if !self.formatter.supports(kind) {
            return Err(FormatError::NotImplemented {
                content_type: self.content_type.to_string(),
                kind,
            });
        }
        Ok(self.formatter.format(payload)?)
    }
}

impl fmt::Debug for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolved")
            .field("content_type", &self.content_type)
            .field("formatter", &self.formatter.name())
            .finish()
    }
}

/// One row of the registry catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatEntry {
    pub content_type: ContentType,
    /// Canonical type this entry resolves to, for aliases.
    pub alias_of: Option<ContentType>,
    pub kinds: Vec<EntityKind>,
}

/// Maps requested formats and entity kinds to formatters.
pub struct FormatRegistry {
    descriptors: HashMap<ContentType, FormatDescriptor>,
    formatters: HashMap<ContentType, Vec<Arc<dyn Formatter>>>,
    default_type: ContentType,
}

impl FormatRegistry {
    pub fn builder() -> FormatRegistryBuilder {
        FormatRegistryBuilder::default()
    }

    /// The registry of every built-in format and legacy alias.
    pub fn standard() -> Result<Self, RegistryError> {
        Self::builder()
            .formatter(Arc::new(JsonV1))
            .formatter(Arc::new(JsonV2))
            .formatter(Arc::new(XmlV1))
            .formatter(Arc::new(XmlV2))
            .formatter(Arc::new(Delimited::csv_v1()))
            .formatter(Arc::new(Delimited::tab_v1()))
            .formatter(Arc::new(GeoJsonV1))
            .alias(JSON, JSONV2)
            .alias("json", JSONV1)
            .alias(XML, XMLV2)
            .alias("xml", XML)
            .alias(CSV, CSVV1)
            .alias("csv", CSV)
            .alias(TAB, TABV1)
            .alias("tab", TAB)
            .alias(GEOJSON, GEOJSONV1)
            .alias("geojson", GEOJSON)
            .default_type(JSON)
            .build()
    }

    /// Follow aliases from `content_type` to its canonical descriptor.
    pub fn canonical(&self, content_type: &ContentType) -> Option<&ContentType> {
        let mut current = self.descriptors.get(content_type)?;
        // Cycles are rejected at build time.
        for _ in 0..=self.descriptors.len() {
            match &current.alias_of {
                None => return Some(&current.content_type),
                Some(target) => current = self.descriptors.get(target)?,
            }
        }
        None
    }

    fn formatter_for(&self, canonical: &ContentType, kind: EntityKind) -> Option<&Arc<dyn Formatter>> {
        self.formatters
            .get(canonical)?
            .iter()
            .find(|f| f.supports(kind))
    }

    /// Resolve a requested value (an `Accept` header or legacy `format`
    /// name) for an entity kind.
    ///
    /// Candidates are tried in preference order; the first whose canonical
    /// format has a formatter for `kind` wins. A blank value or `*/*` means
    /// the default type.
    pub fn resolve(&self, requested: &str, kind: EntityKind) -> Result<Resolved, FormatError> {
        let header = if requested.trim().is_empty() {
            AcceptHeader::parse(&self.default_type.to_string())
        } else {
            AcceptHeader::parse(requested)
        };

        let mut unsupported: Option<&ContentType> = None;
        for candidate in header.candidates() {
            let wanted = if candidate.content_type.is_any() {
                &self.default_type
            } else {
                &candidate.content_type
            };
            let Some(canonical) = self.canonical(wanted) else {
                tracing::debug!(candidate = %wanted, "no registered format");
                continue;
            };
            if let Some(formatter) = self.formatter_for(canonical, kind) {
                tracing::debug!(
                    requested = %wanted,
                    canonical = %canonical,
                    formatter = formatter.name(),
                    %kind,
                    "format resolved"
                );
                return Ok(Resolved {
                    content_type: canonical.clone(),
                    formatter: Arc::clone(formatter),
                });
            }
            unsupported.get_or_insert(canonical);
        }

        match unsupported {
            Some(content_type) => Err(FormatError::NotImplemented {
                content_type: content_type.to_string(),
                kind,
            }),
            None => Err(FormatError::NotAcceptable {
                requested: requested.to_string(),
                kind,
            }),
        }
    }

    /// Every registered content type with the kinds it resolves for.
    pub fn catalog(&self) -> Vec<FormatEntry> {
        let mut entries: Vec<FormatEntry> = self
            .descriptors
            .values()
            .map(|d| {
                let canonical = self.canonical(&d.content_type);
                let mut kinds: Vec<EntityKind> = canonical
                    .and_then(|c| self.formatters.get(c))
                    .map(|fs| fs.iter().flat_map(|f| f.kinds().iter().copied()).collect())
                    .unwrap_or_default();
                kinds.sort();
                kinds.dedup();
                FormatEntry {
                    content_type: d.content_type.clone(),
                    alias_of: d.alias_of.as_ref().and(canonical.cloned()),
                    kinds,
                }
            })
            .collect();
        entries.sort_by(|a, b| a.content_type.cmp(&b.content_type));
        entries
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Collects formatters and aliases; [`build`](Self::build) validates them.
#[derive(Default)]
pub struct FormatRegistryBuilder {
    formatters: Vec<Arc<dyn Formatter>>,
    aliases: Vec<(String, String)>,
    default_type: Option<String>,
}

impl FormatRegistryBuilder {
    pub fn formatter(mut self, formatter: Arc<dyn Formatter>) -> Self {
        self.formatters.push(formatter);
        self
    }

    /// Register `alias` as another name for `target` (itself possibly an alias).
    pub fn alias(mut self, alias: &str, target: &str) -> Self {
        self.aliases.push((alias.to_string(), target.to_string()));
        self
    }

    /// Content type used for blank requests and `*/*`. Defaults to `application/json`.
    pub fn default_type(mut self, content_type: &str) -> Self {
        self.default_type = Some(content_type.to_string());
        self
    }

    pub fn build(self) -> Result<FormatRegistry, RegistryError> {
        let mut descriptors: HashMap<ContentType, FormatDescriptor> = HashMap::new();
        let mut formatters: HashMap<ContentType, Vec<Arc<dyn Formatter>>> = HashMap::new();

        for formatter in self.formatters {
            let content_type = formatter.content_type();
            let bound = formatters.entry(content_type.clone()).or_default();
            for kind in formatter.kinds() {
                if bound.iter().any(|f| f.supports(*kind)) {
                    return Err(RegistryError::DuplicateBinding {
                        content_type: content_type.to_string(),
                        kind: *kind,
                    });
                }
            }
            bound.push(formatter);
            descriptors
                .entry(content_type.clone())
                .or_insert_with(|| FormatDescriptor {
                    content_type,
                    alias_of: None,
                });
        }

        let mut seen_aliases: HashSet<ContentType> = HashSet::new();
        for (alias, target) in &self.aliases {
            let alias_ct = parse(alias)?;
            let target_ct = parse(target)?;
            if formatters.contains_key(&alias_ct) {
                return Err(RegistryError::AliasShadowsFormat(alias_ct.to_string()));
            }
            if !seen_aliases.insert(alias_ct.clone()) {
                return Err(RegistryError::DuplicateAlias(alias_ct.to_string()));
            }
            descriptors.insert(
                alias_ct.clone(),
                FormatDescriptor {
                    content_type: alias_ct,
                    alias_of: Some(target_ct),
                },
            );
        }

        for start in descriptors.keys() {
            check_chain(&descriptors, start)?;
        }

        let default_type = parse(self.default_type.as_deref().unwrap_or(JSON))?;
        if !descriptors.contains_key(&default_type) {
            return Err(RegistryError::DanglingAlias {
                alias: "*/*".to_string(),
                target: default_type.to_string(),
            });
        }

        Ok(FormatRegistry {
            descriptors,
            formatters,
            default_type,
        })
    }
}

fn parse(raw: &str) -> Result<ContentType, RegistryError> {
    ContentType::parse(raw).ok_or_else(|| RegistryError::InvalidContentType(raw.to_string()))
}

/// Walk the alias chain from `start`, failing on a dangling target or a cycle.
fn check_chain(
    descriptors: &HashMap<ContentType, FormatDescriptor>,
    start: &ContentType,
) -> Result<(), RegistryError> {
    let mut visited: HashSet<&ContentType> = HashSet::new();
    let mut current = start;
    loop {
        if !visited.insert(current) {
            return Err(RegistryError::AliasCycle(start.to_string()));
        }
        let descriptor = descriptors.get(current).ok_or_else(|| RegistryError::DanglingAlias {
            alias: start.to_string(),
            target: current.to_string(),
        })?;
        match &descriptor.alias_of {
            None => return Ok(()),
            Some(target) => current = target,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{FormattingError, XMLV1};
    use crate::types::{Office, RatingTemplate};

    fn registry() -> FormatRegistry {
        FormatRegistry::standard().unwrap()
    }

    struct Stub(&'static str, &'static [EntityKind]);

    impl Formatter for Stub {
        fn name(&self) -> &'static str {
            "Stub"
        }
        fn content_type(&self) -> ContentType {
            ContentType::parse(self.0).unwrap()
        }
        fn kinds(&self) -> &'static [EntityKind] {
            self.1
        }
        fn format(&self, _payload: &Payload<'_>) -> Result<String, FormattingError> {
            Ok(String::new())
        }
    }

    #[test]
    fn aliases_resolve_to_the_same_formatter_as_their_canonical_type() {
        let reg = registry();
        let pairs = [
            ("json", JSONV1),
            (JSON, JSONV2),
            ("xml", XMLV2),
            (XML, XMLV2),
            ("csv", CSVV1),
            (CSV, CSVV1),
            ("tab", TABV1),
            (TAB, TABV1),
            ("geojson", GEOJSONV1),
            (GEOJSON, GEOJSONV1),
        ];
        for (alias, canonical) in pairs {
            for kind in EntityKind::ALL {
                let via_alias = reg.resolve(alias, kind);
                let direct = reg.resolve(canonical, kind);
                assert_eq!(via_alias.is_ok(), direct.is_ok(), "{alias} vs {canonical} for {kind}");
                if let (Ok(a), Ok(d)) = (via_alias, direct) {
                    assert!(Arc::ptr_eq(a.formatter(), d.formatter()));
                    assert_eq!(a.content_type, d.content_type);
                }
            }
        }
    }

    #[test]
    fn unknown_type_is_not_acceptable() {
        let err = registry()
            .resolve("text/unknown-vendor", EntityKind::RatingTemplate)
            .unwrap_err();
        assert_eq!(
            err,
            FormatError::NotAcceptable {
                requested: "text/unknown-vendor".into(),
                kind: EntityKind::RatingTemplate,
            }
        );
    }

    #[test]
    fn known_type_without_formatter_for_kind_is_not_implemented() {
        let err = registry().resolve("json", EntityKind::RatingTemplate).unwrap_err();
        assert_eq!(
            err,
            FormatError::NotImplemented {
                content_type: JSONV1.into(),
                kind: EntityKind::RatingTemplate,
            }
        );
    }

    #[test]
    fn first_supporting_candidate_wins() {
        let reg = registry();
        let r = reg
            .resolve("text/csv, application/json;version=2", EntityKind::RatingTemplate)
            .unwrap();
        assert_eq!(r.content_type.to_string(), JSONV2);

        let r = reg
            .resolve("application/json;version=2;q=0.5, application/xml", EntityKind::Office)
            .unwrap();
        assert_eq!(r.content_type.to_string(), XMLV2);
    }

    #[test]
    fn wildcard_and_blank_use_default() {
        let reg = registry();
        assert_eq!(reg.resolve("*/*", EntityKind::Office).unwrap().content_type.to_string(), JSONV2);
        assert_eq!(reg.resolve("", EntityKind::Location).unwrap().content_type.to_string(), JSONV2);
    }

    #[test]
    fn default_and_plain_json_cover_every_kind() {
        let reg = registry();
        for kind in EntityKind::ALL {
            for requested in ["", "*/*", JSON] {
                let r = reg.resolve(requested, kind).unwrap();
                assert_eq!(r.content_type.to_string(), JSONV2, "{requested:?} for {kind}");
            }
        }
    }

    #[test]
    fn legacy_xml_version_is_negotiable() {
        let reg = registry();
        for kind in [EntityKind::Office, EntityKind::Location] {
            assert_eq!(reg.resolve(XMLV1, kind).unwrap().content_type.to_string(), XMLV1);
        }
        assert!(matches!(
            reg.resolve(XMLV1, EntityKind::WaterUser),
            Err(FormatError::NotImplemented { .. })
        ));
    }

    #[test]
    fn unparseable_header_is_not_acceptable() {
        let err = registry().resolve("///, ;;", EntityKind::Office).unwrap_err();
        assert!(matches!(err, FormatError::NotAcceptable { .. }));
    }

    #[test]
    fn resolved_rejects_undeclared_kind() {
        let reg = registry();
        let r = reg.resolve(CSV, EntityKind::Office).unwrap();
        let t = RatingTemplate {
            office_id: "SWT".into(),
            id: "Elev;Area.Linear".into(),
            version: "Linear".into(),
            description: None,
            dependent_parameter: "Area".into(),
            independent_parameter_specs: vec![],
            rating_ids: vec![],
        };
        let err = r.format(&Payload::one(&t)).unwrap_err();
        assert!(matches!(err, FormatError::NotImplemented { .. }));

        let o = Office {
            name: "SPK".into(),
            long_name: "Sacramento District".into(),
            office_type: "DIS".into(),
            reports_to: None,
        };
        assert!(r.format(&Payload::one(&o)).is_ok());
    }

    #[test]
    fn alias_cycle_rejected() {
        let err = FormatRegistry::builder()
            .formatter(Arc::new(Stub("application/x-a;version=1", &[EntityKind::Office])))
            .alias("application/x-b", "application/x-c")
            .alias("application/x-c", "application/x-b")
            .default_type("application/x-a;version=1")
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, RegistryError::AliasCycle(_)));
    }

    #[test]
    fn dangling_alias_rejected() {
        let err = FormatRegistry::builder()
            .formatter(Arc::new(Stub("application/x-a;version=1", &[EntityKind::Office])))
            .alias("a", "application/x-missing")
            .default_type("application/x-a;version=1")
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, RegistryError::DanglingAlias { .. }));
    }

    #[test]
    fn duplicate_binding_rejected() {
        let err = FormatRegistry::builder()
            .formatter(Arc::new(Stub("application/x-a;version=1", &[EntityKind::Office])))
            .formatter(Arc::new(Stub(
                "application/x-a;version=1",
                &[EntityKind::Location, EntityKind::Office],
            )))
            .default_type("application/x-a;version=1")
            .build()
            .err()
            .unwrap();
        assert!(matches!(
            err,
            RegistryError::DuplicateBinding {
                kind: EntityKind::Office,
                ..
            }
        ));
    }

    #[test]
    fn two_formatters_may_share_a_type_for_different_kinds() {
        let reg = FormatRegistry::builder()
            .formatter(Arc::new(Stub("application/x-a;version=1", &[EntityKind::Office])))
            .formatter(Arc::new(Stub("application/x-a;version=1", &[EntityKind::Location])))
            .default_type("application/x-a;version=1")
            .build()
            .unwrap();
        assert!(reg.resolve("application/x-a;version=1", EntityKind::Location).is_ok());
        assert!(reg.resolve("application/x-a;version=1", EntityKind::WaterUser).is_err());
    }

    #[test]
    fn catalog_lists_aliases_with_canonical_target() {
        let catalog = registry().catalog();
        let json = catalog
            .iter()
            .find(|e| e.content_type == ContentType::new("json"))
            .unwrap();
        assert_eq!(json.alias_of.as_ref().map(ToString::to_string).as_deref(), Some(JSONV1));
        assert!(json.kinds.contains(&EntityKind::Office));
    }
}
