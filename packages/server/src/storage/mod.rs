//! Storage abstraction layer for the riverdata server.
//!
//! The [`Storage`] trait defines the contract between the HTTP handler layer
//! and persistence. Content negotiation and response shaping live in the
//! handlers; storage only reads and writes records.
//!
//! Paged reads are answered by the core [`PagedQuery`](riverdata::PagedQuery)
//! executor running over a backend-specific [`RowSource`](riverdata::RowSource),
//! so both backends window pages by parent count in the same way.
//!
//! # Implementations
//!
//! | Type | When to use |
//! |------|-------------|
//! | [`MemoryStorage`] | Tests, conformance suite, ephemeral servers |
//! | [`SqliteStorage`] | Production; durable single-file database |
//!
//! [`MemoryStorage`]: memory::MemoryStorage
//! [`SqliteStorage`]: sqlite::SqliteStorage

pub mod memory;
pub mod seed;
pub mod sqlite;

use async_trait::async_trait;
use riverdata::{
    IdMask, IntegrityViolation, Location, Office, Page, PageRequest, RatingTemplate, WaterUser,
};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// StorageError
// ---------------------------------------------------------------------------

/// Errors that storage operations can return.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested item does not exist.
    #[error("not found")]
    NotFound,

    /// An item with the same key already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A record was rejected before it was stored.
    #[error("invalid record: {0}")]
    Invalid(String),

    /// A singleton lookup matched several entities.
    #[error(transparent)]
    Integrity(#[from] IntegrityViolation),

    /// An unexpected error in the underlying storage backend.
    #[error("internal storage error: {0}")]
    Internal(String),
}

// ---------------------------------------------------------------------------
// Records without an entity type of their own
// ---------------------------------------------------------------------------

/// An alternate name for a location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct LocationAlias {
    pub office_id: String,
    pub location_id: String,
    pub alias_id: String,
}

/// A rating specification: one concrete rating built on a template.
///
/// Specs with `aliased_item` set are aliases of another spec and never show
/// up in a template's `rating-ids`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct RatingSpec {
    pub office_id: String,
    pub rating_id: String,
    pub template_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aliased_item: Option<String>,
}

// ---------------------------------------------------------------------------
// Filters and paging
// ---------------------------------------------------------------------------

/// Criteria for [`Storage::locations_page`].
#[derive(Debug, Clone, Default)]
pub struct LocationFilter {
    /// Office id, matched case-insensitively.
    pub office: Option<String>,
    /// Mask over location names.
    pub names: Option<IdMask>,
}

impl LocationFilter {
    pub fn matches(&self, location: &Location) -> bool {
        office_matches(self.office.as_deref(), &location.office_id)
            && self.names.as_ref().map_or(true, |m| m.matches(&location.name))
    }
}

/// Criteria for [`Storage::rating_templates_page`].
#[derive(Debug, Clone, Default)]
pub struct TemplateFilter {
    /// Office id, matched case-insensitively.
    pub office: Option<String>,
    /// Mask over template ids.
    pub id_mask: Option<IdMask>,
}

impl TemplateFilter {
    pub fn matches(&self, template: &RatingTemplate) -> bool {
        office_matches(self.office.as_deref(), &template.office_id)
            && self.id_mask.as_ref().map_or(true, |m| m.matches(&template.id))
    }
}

pub(crate) fn office_matches(wanted: Option<&str>, office_id: &str) -> bool {
    wanted.map_or(true, |w| w.eq_ignore_ascii_case(office_id))
}

/// Owned paging parameters, so a request can move into a blocking task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageParams {
    /// Cursor token from the previous page.
    pub cursor: Option<String>,
    /// Page size when the cursor carries none.
    pub page_size: u32,
    /// Count the listing when the cursor does not know its total.
    pub include_total: bool,
}

impl PageParams {
    pub fn request(&self) -> PageRequest<'_> {
        PageRequest::new(self.cursor.as_deref(), self.page_size).with_total(self.include_total)
    }
}

// ---------------------------------------------------------------------------
// Storage trait
// ---------------------------------------------------------------------------

/// The persistence contract for the riverdata server.
///
/// All methods are `async` and return `Result<_, StorageError>`. Implementations
/// must be `Send + Sync + 'static` so they can be held in an `Arc<dyn Storage>`.
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    // --- Offices -------------------------------------------------------------

    /// Store an office. [`StorageError::Conflict`] if the name is taken.
    async fn put_office(&self, office: &Office) -> Result<(), StorageError>;

    /// All offices, ordered by name.
    async fn list_offices(&self) -> Result<Vec<Office>, StorageError>;

    /// The office named `name` (case-insensitive).
    async fn get_office(&self, name: &str) -> Result<Option<Office>, StorageError>;

    // --- Locations -----------------------------------------------------------

    /// Store a location together with any aliases it already carries.
    async fn put_location(&self, location: &Location) -> Result<(), StorageError>;

    /// Attach an alias to an existing location. Idempotent.
    async fn put_location_alias(&self, alias: &LocationAlias) -> Result<(), StorageError>;

    /// One location with its aliases.
    async fn get_location(&self, office: &str, name: &str) -> Result<Option<Location>, StorageError>;

    /// A page of locations ordered by `(office, name)`.
    async fn locations_page(
        &self,
        filter: &LocationFilter,
        page: &PageParams,
    ) -> Result<Page<Location>, StorageError>;

    // --- Rating templates ----------------------------------------------------

    /// Store a template. Its `rating_ids` are ignored; they are derived from
    /// the stored rating specs.
    async fn put_rating_template(&self, template: &RatingTemplate) -> Result<(), StorageError>;

    /// Store a rating spec. Its template must already exist.
    async fn put_rating_spec(&self, spec: &RatingSpec) -> Result<(), StorageError>;

    /// The template with id `id`, optionally restricted to one office.
    ///
    /// Fails with [`StorageError::Integrity`] when the id matches templates
    /// of several offices.
    async fn get_rating_template(
        &self,
        office: Option<&str>,
        id: &str,
    ) -> Result<Option<RatingTemplate>, StorageError>;

    /// A page of templates ordered by `(office, template id)`, each with the
    /// ids of its non-aliased rating specs.
    async fn rating_templates_page(
        &self,
        filter: &TemplateFilter,
        page: &PageParams,
    ) -> Result<Page<RatingTemplate>, StorageError>;

    // --- Water users ---------------------------------------------------------

    /// Store a water user. [`StorageError::Conflict`] on a duplicate.
    async fn put_water_user(&self, user: &WaterUser) -> Result<(), StorageError>;

    async fn get_water_user(
        &self,
        office: &str,
        project: &str,
        entity_name: &str,
    ) -> Result<Option<WaterUser>, StorageError>;
}

/// Reject templates that could not be read back.
pub(crate) fn check_template(template: &RatingTemplate) -> Result<(), StorageError> {
    if template.independent_parameter_specs.is_empty() {
        return Err(StorageError::Invalid(format!(
            "rating template {} has no independent parameters",
            template.id
        )));
    }
    Ok(())
}

/// Describes a template lookup for integrity errors.
pub(crate) fn template_what(office: Option<&str>, id: &str) -> String {
    match office {
        Some(office) => format!("rating template {id} in office {office}"),
        None => format!("rating template {id}"),
    }
}
