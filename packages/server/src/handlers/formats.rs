//! Format catalog handler: `GET /formats`.

use axum::{extract::State, Json};
use riverdata_api::{FormatCatalog, FormatInfo};

use super::AppState;

/// `GET /formats`
///
/// Lists every registered content type, canonical or alias, with the entity
/// kinds it resolves for.
pub async fn catalog(State(state): State<AppState>) -> Json<FormatCatalog> {
    let formats = state
        .registry
        .catalog()
        .into_iter()
        .map(|entry| FormatInfo {
            content_type: entry.content_type.to_string(),
            alias_of: entry.alias_of.map(|c| c.to_string()),
            kinds: entry.kinds,
        })
        .collect();
    Json(FormatCatalog { formats })
}
