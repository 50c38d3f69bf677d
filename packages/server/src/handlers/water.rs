//! Water supply handler: `GET /projects/{office}/{project-id}/water-user/{water-user}`.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::Response,
};
use riverdata::{EntityKind, Payload};
use riverdata_api::FormatQuery;

use super::{respond, AppState};
use crate::error::AppError;

pub async fn get_water_user(
    State(state): State<AppState>,
    Path((office, project, entity_name)): Path<(String, String, String)>,
    headers: HeaderMap,
    Query(query): Query<FormatQuery>,
) -> Result<Response, AppError> {
    let resolved = state.resolve(&headers, query.format.as_deref(), EntityKind::WaterUser)?;
    let user = state
        .storage
        .get_water_user(&office, &project, &entity_name)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "water user {entity_name} not found at project {office}/{project}"
            ))
        })?;
    respond(&resolved, &Payload::one(&user))
}
