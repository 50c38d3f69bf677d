//! Location handlers: paged listing and single lookup.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::Response,
};
use riverdata::{EntityKind, IdMask, Payload};
use riverdata_api::{FormatQuery, LocationQuery};

use super::{respond, AppState};
use crate::{error::AppError, storage::LocationFilter};

/// `GET /locations`
///
/// Pages are windowed by location, so a location's aliases are never split
/// across pages.
pub async fn list(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LocationQuery>,
) -> Result<Response, AppError> {
    let resolved = state.resolve(&headers, query.format.as_deref(), EntityKind::Location)?;

    let filter = LocationFilter {
        office: query.office,
        names: query.names.as_deref().map(IdMask::new).transpose()?,
    };
    let params = state.page_params(query.page, query.page_size, query.include_total);
    let page = state.storage.locations_page(&filter, &params).await?;
    respond(&resolved, &Payload::page(&page))
}

/// `GET /locations/{office}/{name}`
pub async fn get(
    State(state): State<AppState>,
    Path((office, name)): Path<(String, String)>,
    headers: HeaderMap,
    Query(query): Query<FormatQuery>,
) -> Result<Response, AppError> {
    let resolved = state.resolve(&headers, query.format.as_deref(), EntityKind::Location)?;
    let location = state
        .storage
        .get_location(&office, &name)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("location {office}/{name} not found")))?;
    respond(&resolved, &Payload::one(&location))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::Value;

    use crate::config::ServerConfig;
    use crate::handlers::test_support::{app, app_with, content_type, get};

    const V2: Option<&str> = Some("application/json;version=2");

    #[tokio::test]
    async fn v2_page_envelope() {
        let (resp, body) = get(app().await, "/locations?page-size=2&include-total=true", V2).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let v: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(v["page"], "0|3|2");
        assert_eq!(v["next-page"], "2|3|2");
        assert_eq!(v["total"], 3);
        assert_eq!(v["page-size"], 2);
        let names: Vec<&str> = v["locations"]
            .as_array()
            .unwrap()
            .iter()
            .map(|l| l["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["KAW", "KEYS"]);
        assert_eq!(v["locations"][1]["aliases"], serde_json::json!(["KEYO2", "Keystone"]));

        assert_eq!(resp.headers()["page"], "0|3|2");
        assert_eq!(resp.headers()["next-page"], "2|3|2");
        assert_eq!(resp.headers()["total"], "3");
    }

    /// Walk `/locations` two at a time by the `next-page` header. The first
    /// request asks for the total, so the walk ends without an empty page.
    async fn walk(accept: Option<&str>) -> Vec<String> {
        let config = ServerConfig {
            default_page_size: 2,
            ..ServerConfig::default()
        };
        let app = app_with(config).await;
        let mut bodies = Vec::new();
        let mut uri = "/locations?include-total=true".to_string();
        loop {
            let (resp, body) = get(app.clone(), &uri, accept).await;
            assert_eq!(resp.status(), StatusCode::OK, "{accept:?}");
            assert_eq!(resp.headers()["page-size"], "2");
            bodies.push(body);
            let Some(next) = resp.headers().get("next-page") else {
                return bodies;
            };
            uri = format!("/locations?page={}", urlencode(next.to_str().unwrap()));
            assert!(bodies.len() < 5, "walk did not terminate for {accept:?}");
        }
    }

    fn xml_names(body: &str) -> Vec<String> {
        body.split("<name>")
            .skip(1)
            .filter_map(|rest| rest.split("</name>").next())
            .map(str::to_string)
            .collect()
    }

    fn json_names(items: &Value) -> Vec<String> {
        items
            .as_array()
            .unwrap()
            .iter()
            .map(|l| l["name"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn every_format_walks_to_the_end() {
        type Names = fn(&str) -> Vec<String>;
        let cases: [(Option<&str>, Names); 6] = [
            (None, |b| json_names(&serde_json::from_str::<Value>(b).unwrap()["locations"])),
            (Some("application/json;version=1"), |b| {
                json_names(&serde_json::from_str::<Value>(b).unwrap())
            }),
            (Some("application/json;version=2"), |b| {
                json_names(&serde_json::from_str::<Value>(b).unwrap()["locations"])
            }),
            (Some("application/xml;version=1"), xml_names),
            (Some("application/xml;version=2"), xml_names),
            (Some("application/geo+json"), |b| {
                let v: Value = serde_json::from_str(b).unwrap();
                v["features"]
                    .as_array()
                    .unwrap()
                    .iter()
                    .map(|f| f["properties"]["name"].as_str().unwrap().to_string())
                    .collect()
            }),
        ];

        for (accept, names) in cases {
            let bodies = walk(accept).await;
            assert_eq!(bodies.len(), 2, "{accept:?}");
            let seen: Vec<String> = bodies.iter().flat_map(|b| names(b)).collect();
            assert_eq!(seen, vec!["KAW", "KEYS", "TULSA"], "{accept:?}");
        }
    }

    #[tokio::test]
    async fn following_next_page_reaches_the_end() {
        let uri = format!("/locations?page={}", urlencode("2|3|2"));
        let (resp, body) = get(app().await, &uri, V2).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let v: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(v["locations"][0]["name"], "TULSA");
        assert!(v.get("next-page").is_none());
    }

    #[tokio::test]
    async fn page_past_the_end_is_empty_and_stable() {
        let uri = format!("/locations?page={}", urlencode("3|3|2"));
        let (_, body) = get(app().await, &uri, V2).await;
        let v: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(v["page"], "3|3|2");
        assert_eq!(v["locations"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn cursor_page_size_clamped_to_max() {
        let config = ServerConfig {
            max_page_size: 1,
            default_page_size: 1,
            ..ServerConfig::default()
        };
        let uri = format!("/locations?page={}", urlencode("0|null|50"));
        let (_, body) = get(app_with(config).await, &uri, V2).await;
        let v: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(v["page-size"], 1);
        assert_eq!(v["locations"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn name_mask_filters() {
        let (_, body) = get(app().await, "/locations?office=swt&names=k*", V2).await;
        let v: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(v["locations"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn single_location_as_geojson() {
        let (resp, body) = get(app().await, "/locations/SWT/KEYS", Some("application/geo+json")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(content_type(&resp), "application/geo+json;version=1");
        let v: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(v["type"], "Feature");
        assert_eq!(v["geometry"]["coordinates"], serde_json::json!([-96.25, 36.15]));
    }

    #[tokio::test]
    async fn csv_for_locations_is_501() {
        let (resp, body) = get(app().await, "/locations", Some("text/csv")).await;
        assert_eq!(resp.status(), StatusCode::NOT_IMPLEMENTED);
        let v: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(v["code"], "not_implemented");
    }

    #[tokio::test]
    async fn falls_through_to_next_acceptable_type() {
        let (resp, _) = get(
            app().await,
            "/locations/SWT/KAW",
            Some("text/csv, application/xml;q=0.5"),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(content_type(&resp), "application/xml;version=2");
    }

    fn urlencode(token: &str) -> String {
        token.replace('|', "%7C")
    }
}
