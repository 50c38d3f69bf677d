//! Start-up seed documents.
//!
//! A seed is a single JSON document whose arrays are inserted in dependency
//! order (offices, locations, aliases, templates, specs, water users):
//!
//! ```json
//! {
//!   "offices": [{ "name": "SWT", "long-name": "Tulsa District", "type": "DIS" }],
//!   "locations": [{ "office-id": "SWT", "name": "KEYS" }],
//!   "location-aliases": [{ "office-id": "SWT", "location-id": "KEYS", "alias-id": "Keystone" }],
//!   "rating-templates": [],
//!   "rating-specs": [],
//!   "water-users": []
//! }
//! ```
//!
//! Every array is optional.

use std::path::Path;

use riverdata::{Location, Office, RatingTemplate, WaterUser};
use serde::Deserialize;

use super::{LocationAlias, RatingSpec, Storage, StorageError};

/// Errors raised while reading or applying a seed document.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("cannot read seed file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed seed document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("seeding {what} failed: {source}")]
    Storage {
        what: String,
        #[source]
        source: StorageError,
    },
}

/// How many records of each kind a seed inserted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub offices: usize,
    pub locations: usize,
    pub location_aliases: usize,
    pub rating_templates: usize,
    pub rating_specs: usize,
    pub water_users: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SeedDocument {
    pub offices: Vec<Office>,
    pub locations: Vec<Location>,
    pub location_aliases: Vec<LocationAlias>,
    pub rating_templates: Vec<RatingTemplate>,
    pub rating_specs: Vec<RatingSpec>,
    pub water_users: Vec<WaterUser>,
}

impl SeedDocument {
    pub fn from_json(json: &str) -> Result<Self, SeedError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SeedError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Insert every record into `storage`, stopping at the first failure.
    pub async fn load(&self, storage: &dyn Storage) -> Result<SeedSummary, SeedError> {
        fn failed(what: String) -> impl FnOnce(StorageError) -> SeedError {
            move |source| SeedError::Storage { what, source }
        }

        for office in &self.offices {
            storage
                .put_office(office)
                .await
                .map_err(failed(format!("office {}", office.name)))?;
        }
        for location in &self.locations {
            storage
                .put_location(location)
                .await
                .map_err(failed(format!("location {}/{}", location.office_id, location.name)))?;
        }
        for alias in &self.location_aliases {
            storage.put_location_alias(alias).await.map_err(failed(format!(
                "alias {} of {}/{}",
                alias.alias_id, alias.office_id, alias.location_id
            )))?;
        }
        for template in &self.rating_templates {
            storage.put_rating_template(template).await.map_err(failed(format!(
                "rating template {}/{}",
                template.office_id, template.id
            )))?;
        }
        for spec in &self.rating_specs {
            storage.put_rating_spec(spec).await.map_err(failed(format!(
                "rating spec {}/{}",
                spec.office_id, spec.rating_id
            )))?;
        }
        for user in &self.water_users {
            storage.put_water_user(user).await.map_err(failed(format!(
                "water user {} at {}/{}",
                user.entity_name, user.project_id.office_id, user.project_id.name
            )))?;
        }

        let summary = SeedSummary {
            offices: self.offices.len(),
            locations: self.locations.len(),
            location_aliases: self.location_aliases.len(),
            rating_templates: self.rating_templates.len(),
            rating_specs: self.rating_specs.len(),
            water_users: self.water_users.len(),
        };
        tracing::info!(?summary, "seed loaded");
        Ok(summary)
    }
}
