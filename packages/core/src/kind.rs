//! Entity kinds: the tag formatters declare support for.

use serde::{Deserialize, Serialize};

/// Identifies the logical record type behind a document.
///
/// Formatters declare the kinds they can serialise and the format registry
/// keys its lookups on them, so no formatter ever needs to inspect the
/// concrete type of the value it is handed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    Office,
    Location,
    RatingTemplate,
    WaterUser,
}

impl EntityKind {
    /// Every kind, in declaration order.
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Office,
        EntityKind::Location,
        EntityKind::RatingTemplate,
        EntityKind::WaterUser,
    ];

    /// The DTO name of the kind (e.g. `"RatingTemplate"`).
    pub fn name(self) -> &'static str {
        match self {
            EntityKind::Office => "Office",
            EntityKind::Location => "Location",
            EntityKind::RatingTemplate => "RatingTemplate",
            EntityKind::WaterUser => "WaterUser",
        }
    }

    /// Kebab-case element name for a single record (e.g. `"rating-template"`).
    pub fn element(self) -> &'static str {
        match self {
            EntityKind::Office => "office",
            EntityKind::Location => "location",
            EntityKind::RatingTemplate => "rating-template",
            EntityKind::WaterUser => "water-user",
        }
    }

    /// Kebab-case collection name (e.g. `"rating-templates"`).
    pub fn plural(self) -> &'static str {
        match self {
            EntityKind::Office => "offices",
            EntityKind::Location => "locations",
            EntityKind::RatingTemplate => "rating-templates",
            EntityKind::WaterUser => "water-users",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
