//! Entity types served by the API.
//!
//! This module defines the records exposed as documents: [`Office`],
//! [`Location`], [`RatingTemplate`] (with its [`ParameterSpec`]s), and
//! [`WaterUser`]. All types serialise to and from kebab-case JSON, the field
//! naming every formatter builds on.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::grouping::{Assemble, GroupKey};
use crate::kind::EntityKind;

/// Ties a DTO type to its [`EntityKind`].
pub trait Entity {
    const KIND: EntityKind;
}

// ---------------------------------------------------------------------------
// Office
// ---------------------------------------------------------------------------

/// A district or division office owning data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub struct Office {
    /// Short office id (e.g. `"SPK"`).
    pub name: String,
    pub long_name: String,
    /// Office classification (e.g. `"DIS"`, `"MSC"`).
    #[serde(rename = "type")]
    pub office_type: String,
    /// The office this one reports to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reports_to: Option<String>,
}

impl Entity for Office {
    const KIND: EntityKind = EntityKind::Office;
}

// ---------------------------------------------------------------------------
// Location
// ---------------------------------------------------------------------------

/// A named, optionally geo-referenced site owned by an office.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Location {
    pub office_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub horizontal_datum: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_name: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    /// Alternate names, collected from the alias join.
    #[serde(default)]
    pub aliases: Vec<String>,
}

fn default_active() -> bool {
    true
}

impl Entity for Location {
    const KIND: EntityKind = EntityKind::Location;
}

/// Coordinates compare by bit pattern so the key is `Eq + Hash`.
impl GroupKey for Location {
    type Key = (
        String,
        String,
        Option<u64>,
        Option<u64>,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
        bool,
    );

    fn group_key(&self) -> Self::Key {
        (
            self.office_id.clone(),
            self.name.clone(),
            self.latitude.map(f64::to_bits),
            self.longitude.map(f64::to_bits),
            self.horizontal_datum.clone(),
            self.timezone_name.clone(),
            self.location_kind.clone(),
            self.public_name.clone(),
            self.active,
        )
    }
}

impl Assemble<String> for Location {
    fn assemble(mut self, children: Vec<String>) -> Self {
        self.aliases = children;
        self
    }
}

// ---------------------------------------------------------------------------
// Rating templates
// ---------------------------------------------------------------------------

/// How one independent parameter of a rating is looked up.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub struct ParameterSpec {
    pub parameter: String,
    pub in_range_method: String,
    pub out_range_low_method: String,
    pub out_range_high_method: String,
}

/// The stored columns of a template could not be split into parameter specs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecParseError {
    #[error(
        "number of independent parameters does not match number of rating methods. \
         independent parameters: {parameters:?} rating methods: {methods:?}"
    )]
    CountMismatch { parameters: String, methods: String },

    #[error("rating methods {0:?} must be a low,in-range,high triple")]
    IncompleteMethods(String),
}

impl ParameterSpec {
    /// Build specs from the stored column pair.
    ///
    /// `parameters` is comma separated (`"Elev,Stor"`); `methods` holds one
    /// `low,in-range,high` triple per parameter, separated by `/`.
    pub fn parse_all(parameters: &str, methods: &str) -> Result<Vec<Self>, SpecParseError> {
        let params: Vec<&str> = parameters.split(',').collect();
        let triples: Vec<&str> = methods.split('/').collect();

        if params.len() != triples.len() {
            return Err(SpecParseError::CountMismatch {
                parameters: parameters.to_string(),
                methods: methods.to_string(),
            });
        }

        params
            .iter()
            .zip(triples)
            .map(|(param, triple)| {
                let parts: Vec<&str> = triple.split(',').collect();
                match parts.as_slice() {
                    [low, in_range, high] => Ok(ParameterSpec {
                        parameter: param.trim().to_string(),
                        in_range_method: in_range.trim().to_string(),
                        out_range_low_method: low.trim().to_string(),
                        out_range_high_method: high.trim().to_string(),
                    }),
                    _ => Err(SpecParseError::IncompleteMethods(triple.to_string())),
                }
            })
            .collect()
    }

    /// The inverse of [`parse_all`](Self::parse_all): the stored
    /// `(parameters, methods)` column pair.
    pub fn join_all(specs: &[Self]) -> (String, String) {
        let parameters: Vec<&str> = specs.iter().map(|s| s.parameter.as_str()).collect();
        let methods: Vec<String> = specs
            .iter()
            .map(|s| {
                format!(
                    "{},{},{}",
                    s.out_range_low_method, s.in_range_method, s.out_range_high_method
                )
            })
            .collect();
        (parameters.join(","), methods.join("/"))
    }
}

/// Describes the shape of a family of ratings (`"Elev;Area.Standard"`).
///
/// `rating_ids` lists the rating specifications built on this template; it
/// is the child side of the template/spec join and is excluded from the
/// template's grouping identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub struct RatingTemplate {
    pub office_id: String,
    pub id: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub dependent_parameter: String,
    pub independent_parameter_specs: Vec<ParameterSpec>,
    #[serde(default)]
    pub rating_ids: Vec<String>,
}

impl Entity for RatingTemplate {
    const KIND: EntityKind = EntityKind::RatingTemplate;
}

impl GroupKey for RatingTemplate {
    type Key = (String, String, String, Option<String>, String, Vec<ParameterSpec>);

    fn group_key(&self) -> Self::Key {
        (
            self.office_id.clone(),
            self.id.clone(),
            self.version.clone(),
            self.description.clone(),
            self.dependent_parameter.clone(),
            self.independent_parameter_specs.clone(),
        )
    }
}

impl Assemble<String> for RatingTemplate {
    fn assemble(mut self, children: Vec<String>) -> Self {
        self.rating_ids = children;
        self
    }
}

// ---------------------------------------------------------------------------
// Water supply
// ---------------------------------------------------------------------------

/// Office-qualified identifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub struct ProjectId {
    pub office_id: String,
    pub name: String,
}

/// An entity holding a water-supply contract at a project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub struct WaterUser {
    pub entity_name: String,
    pub project_id: ProjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub water_right: Option<String>,
}

impl Entity for WaterUser {
    const KIND: EntityKind = EntityKind::WaterUser;
}
