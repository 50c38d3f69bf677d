//! Office handlers: `GET /offices` and `GET /offices/{office}`.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::Response,
};
use riverdata::{EntityKind, Payload};
use riverdata_api::OfficeQuery;

use super::{respond, AppState};
use crate::error::AppError;

/// `GET /offices`
pub async fn list(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<OfficeQuery>,
) -> Result<Response, AppError> {
    let resolved = state.resolve(&headers, query.format.as_deref(), EntityKind::Office)?;
    let offices = state.storage.list_offices().await?;
    respond(&resolved, &Payload::many(&offices))
}

/// `GET /offices/{office}`
pub async fn get(
    State(state): State<AppState>,
    Path(office): Path<String>,
    headers: HeaderMap,
    Query(query): Query<OfficeQuery>,
) -> Result<Response, AppError> {
    let resolved = state.resolve(&headers, query.format.as_deref(), EntityKind::Office)?;
    let office = state
        .storage
        .get_office(&office)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("office {office} not found")))?;
    respond(&resolved, &Payload::one(&office))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::Value;

    use crate::handlers::test_support::{app, content_type, get};

    #[tokio::test]
    async fn default_format_is_json_v2() {
        for accept in [None, Some("application/json")] {
            let (resp, body) = get(app().await, "/offices", accept).await;
            assert_eq!(resp.status(), StatusCode::OK);
            assert_eq!(content_type(&resp), "application/json;version=2");
            let v: Value = serde_json::from_str(&body).unwrap();
            assert_eq!(v[0]["name"], "SPK");
            assert_eq!(v[1]["name"], "SWT");
        }
    }

    #[tokio::test]
    async fn star_accept_selects_default() {
        let (resp, _) = get(app().await, "/offices", Some("*/*")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(content_type(&resp), "application/json;version=2");
    }

    #[tokio::test]
    async fn legacy_json_name_keeps_the_v1_wrapper() {
        let (resp, body) = get(app().await, "/offices?format=json", None).await;
        assert_eq!(content_type(&resp), "application/json;version=1");
        let v: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(v["offices"]["offices"][0]["name"], "SPK");
        assert_eq!(v["offices"]["offices"][1]["name"], "SWT");
    }

    #[tokio::test]
    async fn v1_single_office_is_wrapped_like_a_list() {
        let (resp, body) = get(app().await, "/offices/SWT", Some("application/json;version=1")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let v: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(v["offices"]["offices"], serde_json::json!([{
            "name": "SWT",
            "long-name": "Tulsa District",
            "type": "DIS",
            "reports-to": "SWD"
        }]));
    }

    #[tokio::test]
    async fn xml_v1_for_offices() {
        let (resp, body) = get(app().await, "/offices/SPK", Some("application/xml;version=1")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(content_type(&resp), "application/xml;version=1");
        assert!(body.contains("<offices>\n  <office>\n"));
    }

    #[tokio::test]
    async fn csv_by_legacy_format_param() {
        let (resp, body) = get(app().await, "/offices?format=csv", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(content_type(&resp), "text/csv;version=1");
        assert!(body.starts_with("#Office Name,Long Name,Office Type,Reports To Office"));
        assert!(body.contains("SWT,Tulsa District,DIS,SWD"));
    }

    #[tokio::test]
    async fn accept_header_wins_over_format_param() {
        let (resp, _) = get(
            app().await,
            "/offices?format=csv",
            Some("application/xml;version=2"),
        )
        .await;
        assert_eq!(content_type(&resp), "application/xml;version=2");
    }

    #[tokio::test]
    async fn single_office() {
        let (resp, body) = get(app().await, "/offices/swt", Some("application/json;version=2")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let v: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(v["long-name"], "Tulsa District");
    }

    #[tokio::test]
    async fn unknown_office_is_404() {
        let (resp, body) = get(app().await, "/offices/XYZ", None).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let v: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(v["code"], "not_found");
    }

    #[tokio::test]
    async fn unknown_type_is_406_even_for_missing_office() {
        let (resp, body) = get(app().await, "/offices/XYZ", Some("text/plain")).await;
        assert_eq!(resp.status(), StatusCode::NOT_ACCEPTABLE);
        let v: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(v["code"], "not_acceptable");
    }
}
