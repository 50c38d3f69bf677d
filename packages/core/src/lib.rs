//! Core of the riverdata service.
//!
//! This crate holds everything that decides *what* a response contains,
//! independent of any transport or database: the entity types, content
//! negotiation, cursor pagination, and the grouping of one-to-many join rows
//! back into entities. The `riverdata-server` crate wires these into HTTP
//! handlers and storage backends.
//!
//! # Crate layout
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`types`] | Entity types: [`Office`], [`Location`], [`RatingTemplate`], [`WaterUser`] |
//! | [`kind`] | [`EntityKind`], the tag formatters declare support for |
//! | [`format`] | [`FormatRegistry`], [`Formatter`] and the built-in formats |
//! | [`cursor`] | The `offset|total|pageSize` [`Cursor`] codec |
//! | [`grouping`] | [`RowGrouper`]: join rows to parents with ordered, deduplicated children |
//! | [`paging`] | [`PagedQuery`]: pages windowed by parent count over a [`RowSource`] |
//! | [`mask`] | Glob-style identifier masks ([`IdMask`]) |
//!
//! # Quick start
//!
//! ```rust,ignore
//! use riverdata::{EntityKind, FormatRegistry, Payload};
//!
//! let registry = FormatRegistry::standard()?;
//! let resolved = registry.resolve("application/json;version=2", EntityKind::Office)?;
//! let body = resolved.format(&Payload::many(&offices))?;
//! ```

pub mod cursor;
pub mod format;
pub mod grouping;
pub mod kind;
pub mod mask;
pub mod paging;
pub mod types;

pub use cursor::Cursor;
pub use format::{
    negotiate, AsEntity, ContentType, EntityRef, FormatError, FormatRegistry, Formatter,
    FormattingError, Payload, RegistryError, Resolved,
};
pub use grouping::{group_rows, single, Assemble, Group, GroupKey, IntegrityViolation, JoinRow, RowGrouper};
pub use kind::EntityKind;
pub use mask::{IdMask, MaskError};
pub use paging::{Page, PageInfo, PageRequest, PagedQuery, RowSource};
pub use types::{Entity, Location, Office, ParameterSpec, ProjectId, RatingTemplate, SpecParseError, WaterUser};
