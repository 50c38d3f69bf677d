//! Request and response types for the riverdata HTTP API.
//!
//! Entity documents themselves are produced by the formatters in
//! [`riverdata::format`]; this crate covers everything around them that
//! servers and clients must agree on.
//!
//! # Endpoints covered
//!
//! | Method | Path | Type |
//! |--------|------|------|
//! | GET | `/offices` | [`OfficeQuery`] → office documents |
//! | GET | `/offices/{office}` | [`OfficeQuery`] → office document |
//! | GET | `/locations` | [`LocationQuery`] → paged location documents |
//! | GET | `/locations/{office}/{name}` | [`FormatQuery`] → location document |
//! | GET | `/ratings/template` | [`TemplateQuery`] → paged rating template documents |
//! | GET | `/ratings/template/{template-id}` | [`TemplateLookupQuery`] → rating template document |
//! | GET | `/projects/{office}/{project-id}/water-user/{water-user}` | [`FormatQuery`] → water user document |
//! | GET | `/formats` | → [`FormatCatalog`] |
//!
//! Every error is an [`ErrorResponse`]. Paged listings also set the
//! [`headers`] below.

pub mod catalog;
pub mod error;
pub mod headers;
pub mod query;

pub use catalog::{FormatCatalog, FormatInfo};
pub use error::{codes, ErrorResponse};
pub use query::{
    effective_page_size, FormatQuery, LocationQuery, OfficeQuery, TemplateLookupQuery, TemplateQuery,
};
