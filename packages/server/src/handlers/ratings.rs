//! Rating template handlers.
//!
//! A template document carries the ids of the non-aliased rating specs built
//! on it. Templates are identified by id within an office; a lookup without
//! an office that matches templates of several offices is an integrity
//! violation, reported as 500.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::Response,
};
use riverdata::{EntityKind, IdMask, Payload};
use riverdata_api::{TemplateLookupQuery, TemplateQuery};

use super::{respond, AppState};
use crate::{error::AppError, storage::TemplateFilter};

/// `GET /ratings/template`
pub async fn list_templates(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<TemplateQuery>,
) -> Result<Response, AppError> {
    let resolved = state.resolve(&headers, query.format.as_deref(), EntityKind::RatingTemplate)?;

    let filter = TemplateFilter {
        office: query.office,
        id_mask: query.template_id_mask.as_deref().map(IdMask::new).transpose()?,
    };
    let params = state.page_params(query.page, query.page_size, query.include_total);
    let page = state.storage.rating_templates_page(&filter, &params).await?;
    respond(&resolved, &Payload::page(&page))
}

/// `GET /ratings/template/{template-id}`
pub async fn get_template(
    State(state): State<AppState>,
    Path(template_id): Path<String>,
    headers: HeaderMap,
    Query(query): Query<TemplateLookupQuery>,
) -> Result<Response, AppError> {
    let resolved = state.resolve(&headers, query.format.as_deref(), EntityKind::RatingTemplate)?;
    let template = state
        .storage
        .get_rating_template(query.office.as_deref(), &template_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("rating template {template_id} not found")))?;
    respond(&resolved, &Payload::one(&template))
}
