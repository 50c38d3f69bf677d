//! HTTP request handlers for all riverdata endpoints.
//!
//! Each submodule covers one resource. Handlers are pure async functions that
//! receive Axum extractors and return `Result<Response, AppError>`.
//!
//! Every entity handler resolves its response format *before* touching
//! storage, so an unusable `Accept` value fails fast with 406 or 501 even when
//! the requested entity does not exist.

pub mod formats;
pub mod locations;
pub mod offices;
pub mod ratings;
pub mod water;

use std::sync::Arc;

use axum::{
    http::{header, HeaderMap, HeaderName, HeaderValue},
    response::{IntoResponse, Response},
};
use riverdata::{negotiate, Cursor, EntityKind, FormatRegistry, Payload, Resolved};
use riverdata_api::{effective_page_size, headers};

use crate::{
    config::ServerConfig,
    error::AppError,
    storage::{PageParams, Storage},
};

/// Shared application state threaded through all Axum handlers via [`axum::extract::State`].
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub registry: Arc<FormatRegistry>,
    pub config: ServerConfig,
}

impl AppState {
    /// Pick the formatter for `kind` from the `Accept` header, falling back
    /// to the legacy `format` query value.
    pub(crate) fn resolve(
        &self,
        headers: &HeaderMap,
        format: Option<&str>,
        kind: EntityKind,
    ) -> Result<Resolved, AppError> {
        let accept = headers
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok());
        let requested = negotiate(accept, format);
        Ok(self.registry.resolve(requested, kind)?)
    }

    /// Paging parameters for a listing request.
    ///
    /// A cursor carrying a page size above the configured maximum is
    /// re-encoded with the maximum.
    pub(crate) fn page_params(
        &self,
        page: Option<String>,
        page_size: Option<u32>,
        include_total: Option<bool>,
    ) -> PageParams {
        let max = self.config.max_page_size;
        let page_size = effective_page_size(page_size, self.config.default_page_size, max);

        let cursor = page.map(|token| {
            let mut cursor = Cursor::decode(Some(&token), page_size);
            if cursor.page_size > max {
                tracing::debug!(requested = cursor.page_size, max, "clamping cursor page size");
                cursor.page_size = max;
                cursor.encode()
            } else {
                token
            }
        });

        PageParams {
            cursor,
            page_size,
            include_total: include_total.unwrap_or(false),
        }
    }
}

/// Render `payload` with the resolved formatter and label the response with
/// its canonical content type.
///
/// Pages also carry their cursor tokens in the [`headers`] response headers,
/// so formats without a page envelope can still be walked.
pub(crate) fn respond(resolved: &Resolved, payload: &Payload<'_>) -> Result<Response, AppError> {
    let body = resolved.format(payload)?;

    let mut response_headers = HeaderMap::new();
    let content_type = HeaderValue::from_str(&resolved.content_type.to_string())
        .map_err(|e| AppError::Internal(format!("invalid content type header: {e}")))?;
    response_headers.insert(header::CONTENT_TYPE, content_type);

    if let Payload::Page { info, .. } = payload {
        insert_token(&mut response_headers, headers::PAGE, &info.page);
        if let Some(next) = &info.next_page {
            insert_token(&mut response_headers, headers::NEXT_PAGE, next);
        }
        if let Some(total) = info.total {
            response_headers.insert(HeaderName::from_static(headers::TOTAL), HeaderValue::from(total));
        }
        response_headers.insert(
            HeaderName::from_static(headers::PAGE_SIZE),
            HeaderValue::from(info.page_size),
        );
    }

    Ok((response_headers, body).into_response())
}

/// An echoed client token may not be a legal header value; such a token is
/// left out of the headers and still appears in the body.
fn insert_token(map: &mut HeaderMap, name: &'static str, token: &str) {
    match HeaderValue::from_str(token) {
        Ok(value) => {
            map.insert(HeaderName::from_static(name), value);
        }
        Err(_) => tracing::debug!(header = name, "cursor token is not a valid header value"),
    }
}
