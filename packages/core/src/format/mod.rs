//! Content negotiation and document serialisation.
//!
//! # Model
//!
//! | Type | Role |
//! |------|------|
//! | [`ContentType`] | Media type essence plus optional `version` |
//! | [`FormatDescriptor`] | A registered content type, possibly an alias of another |
//! | [`Formatter`] | Serialises [`Payload`]s of the [`EntityKind`]s it declares |
//! | [`FormatRegistry`] | Resolves an `Accept`/`format` value and a kind to one formatter |
//!
//! The registry is built once at start-up and only read afterwards.
//!
//! # Standard formats
//!
//! | Canonical type | Formatter | Kinds |
//! |----------------|-----------|-------|
//! | `application/json;version=1` | [`JsonV1`] | Office, Location |
//! | `application/json;version=2` | [`JsonV2`] | Office, Location, RatingTemplate, WaterUser |
//! | `application/xml;version=1` | [`XmlV1`] | Office, Location |
//! | `application/xml;version=2` | [`XmlV2`] | Office, Location |
//! | `text/csv;version=1` | [`Delimited::csv_v1`] | Office |
//! | `text/tab-separated-values;version=1` | [`Delimited::tab_v1`] | Office |
//! | `application/geo+json;version=1` | [`GeoJsonV1`] | Location |
//!
//! Unversioned types and the legacy names `json`, `xml`, `csv`, `tab` and
//! `geojson` are aliases of the rows above. `application/json` (and so `*/*`)
//! means JSON v2; the legacy `json` name keeps meaning JSON v1.

mod delimited;
mod geojson;
mod json;
mod media;
mod registry;
mod xml;

use serde::Serialize;
use thiserror::Error;

use crate::kind::EntityKind;
use crate::paging::{Page, PageInfo};
use crate::types::{Entity, Location, Office, RatingTemplate, WaterUser};

pub use delimited::Delimited;
pub use geojson::GeoJsonV1;
pub use json::{JsonV1, JsonV2};
pub use media::{negotiate, AcceptHeader, Candidate, ContentType};
pub use registry::{
    FormatDescriptor, FormatEntry, FormatRegistry, FormatRegistryBuilder, RegistryError, Resolved,
};
pub use xml::{XmlV1, XmlV2};

pub const JSON: &str = "application/json";
pub const JSONV1: &str = "application/json;version=1";
pub const JSONV2: &str = "application/json;version=2";
pub const XML: &str = "application/xml";
pub const XMLV1: &str = "application/xml;version=1";
pub const XMLV2: &str = "application/xml;version=2";
pub const CSV: &str = "text/csv";
pub const CSVV1: &str = "text/csv;version=1";
pub const TAB: &str = "text/tab-separated-values";
pub const TABV1: &str = "text/tab-separated-values;version=1";
pub const GEOJSON: &str = "application/geo+json";
pub const GEOJSONV1: &str = "application/geo+json;version=1";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A formatter failed on a value it declared support for.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not format {kind} as {content_type}: {message}")]
pub struct FormattingError {
    pub content_type: String,
    pub kind: EntityKind,
    pub message: String,
}

impl FormattingError {
    pub fn new(content_type: &ContentType, kind: EntityKind, message: impl Into<String>) -> Self {
        Self {
            content_type: content_type.to_string(),
            kind,
            message: message.into(),
        }
    }
}

/// Why a representation could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// Nothing in the requested value names a registered format.
    #[error("requested format {requested:?} is not acceptable for {kind}")]
    NotAcceptable { requested: String, kind: EntityKind },

    /// The format is known but has no formatter for this kind.
    #[error("format {content_type} is not implemented for {kind}")]
    NotImplemented {
        content_type: String,
        kind: EntityKind,
    },

    #[error(transparent)]
    Formatting(#[from] FormattingError),
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// A borrowed entity tagged with its kind.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(untagged)]
pub enum EntityRef<'a> {
    Office(&'a Office),
    Location(&'a Location),
    RatingTemplate(&'a RatingTemplate),
    WaterUser(&'a WaterUser),
}

impl EntityRef<'_> {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityRef::Office(_) => EntityKind::Office,
            EntityRef::Location(_) => EntityKind::Location,
            EntityRef::RatingTemplate(_) => EntityKind::RatingTemplate,
            EntityRef::WaterUser(_) => EntityKind::WaterUser,
        }
    }
}

/// Entities that can be handed to a formatter.
pub trait AsEntity: Entity {
    fn as_entity(&self) -> EntityRef<'_>;
}

impl AsEntity for Office {
    fn as_entity(&self) -> EntityRef<'_> {
        EntityRef::Office(self)
    }
}

impl AsEntity for Location {
    fn as_entity(&self) -> EntityRef<'_> {
        EntityRef::Location(self)
    }
}

impl AsEntity for RatingTemplate {
    fn as_entity(&self) -> EntityRef<'_> {
        EntityRef::RatingTemplate(self)
    }
}

impl AsEntity for WaterUser {
    fn as_entity(&self) -> EntityRef<'_> {
        EntityRef::WaterUser(self)
    }
}

/// A homogeneous value to serialise.
#[derive(Debug, Clone)]
pub enum Payload<'a> {
    One(EntityRef<'a>),
    Many {
        kind: EntityKind,
        items: Vec<EntityRef<'a>>,
    },
    Page {
        kind: EntityKind,
        items: Vec<EntityRef<'a>>,
        info: PageInfo,
    },
}

impl<'a> Payload<'a> {
    pub fn one<T: AsEntity>(item: &'a T) -> Self {
        Payload::One(item.as_entity())
    }

    pub fn many<T: AsEntity>(items: &'a [T]) -> Self {
        Payload::Many {
            kind: T::KIND,
            items: items.iter().map(AsEntity::as_entity).collect(),
        }
    }

    pub fn page<T: AsEntity>(page: &'a Page<T>) -> Self {
        Payload::Page {
            kind: T::KIND,
            items: page.items.iter().map(AsEntity::as_entity).collect(),
            info: page.info(),
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Payload::One(item) => item.kind(),
            Payload::Many { kind, .. } | Payload::Page { kind, .. } => *kind,
        }
    }

    /// The entities carried, in order.
    pub fn items(&self) -> &[EntityRef<'a>] {
        match self {
            Payload::One(item) => std::slice::from_ref(item),
            Payload::Many { items, .. } | Payload::Page { items, .. } => items,
        }
    }
}

// ---------------------------------------------------------------------------
// Formatter
// ---------------------------------------------------------------------------

/// A serialisation strategy bound to one canonical content type.
///
/// The registry only hands a formatter payloads whose kind appears in
/// [`Formatter::kinds`].
pub trait Formatter: Send + Sync {
    /// Short name used in logs and the format catalog.
    fn name(&self) -> &'static str;

    /// The canonical content type this formatter produces.
    fn content_type(&self) -> ContentType;

    /// The entity kinds this formatter can serialise.
    fn kinds(&self) -> &'static [EntityKind];

    fn supports(&self, kind: EntityKind) -> bool {
        self.kinds().contains(&kind)
    }

    fn format(&self, payload: &Payload<'_>) -> Result<String, FormattingError>;
}

/// Error for a payload that reached a formatter outside its declared kinds.
pub(crate) fn undeclared(formatter: &dyn Formatter, kind: EntityKind) -> FormattingError {
    FormattingError::new(
        &formatter.content_type(),
        kind,
        format!("{} does not declare {kind}", formatter.name()),
    )
}
