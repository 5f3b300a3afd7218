// src/middleware/params.rs

use std::sync::Arc;

use axum::{
    body::{Body, to_bytes},
    extract::State,
    http::{
        HeaderMap, HeaderValue, Request, Uri, header,
        uri::PathAndQuery,
    },
    middleware::Next,
    response::Response,
};
use http_body_util::LengthLimitError;
use serde_json::Value;
use url::form_urlencoded;

use crate::{config::Config, error::AppError, sanitize::Sanitizer};

/// How a request body carries parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Json,
    Form,
    Other,
}

impl BodyKind {
    pub fn of(headers: &HeaderMap) -> Self {
        let Some(content_type) = headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
        else {
            return BodyKind::Other;
        };
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if mime == "application/json" || mime.ends_with("+json") {
            BodyKind::Json
        } else if mime == "application/x-www-form-urlencoded" {
            BodyKind::Form
        } else {
            BodyKind::Other
        }
    }
}

/// Axum Middleware: Parameter sanitization.
///
/// Cleans every query value, every form value and every string leaf of a JSON
/// body with the sanitizer's default policy before the handler sees them.
/// Other bodies pass through untouched.
pub async fn sanitize_params(
    State(sanitizer): State<Arc<Sanitizer>>,
    State(config): State<Config>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let (mut parts, body) = req.into_parts();
    let mut cleaned = 0;

    if let Some(query) = parts.uri.query() {
        let (query, count) = clean_form(&sanitizer, query);
        if count > 0 {
            parts.uri = with_query(&parts.uri, &query)?;
            cleaned += count;
        }
    }

    let body = match BodyKind::of(&parts.headers) {
        BodyKind::Other => body,
        kind => {
            let bytes = to_bytes(body, config.max_body_bytes)
                .await
                .map_err(body_read_error)?;

            let rewritten = match kind {
                _ if bytes.is_empty() => None,
                BodyKind::Json => {
                    let mut tree: Value = serde_json::from_slice(&bytes)?;
                    let count = sanitizer.sanitize_tree(&mut tree);
                    cleaned += count;
                    if count > 0 {
                        let json = serde_json::to_vec(&tree)
                            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
                        Some(json)
                    } else {
                        None
                    }
                }
                _ => {
                    let form = String::from_utf8_lossy(&bytes);
                    let (form, count) = clean_form(&sanitizer, &form);
                    cleaned += count;
                    (count > 0).then(|| form.into_bytes())
                }
            };

            match rewritten {
                Some(bytes) => {
                    parts
                        .headers
                        .insert(header::CONTENT_LENGTH, HeaderValue::from(bytes.len()));
                    Body::from(bytes)
                }
                None => Body::from(bytes),
            }
        }
    };

    if cleaned > 0 {
        tracing::debug!(cleaned, path = %parts.uri.path(), "sanitized request parameters");
    }

    Ok(next.run(Request::from_parts(parts, body)).await)
}

/// Only an exceeded limit is a 413; a body that fails mid-stream is the client's fault.
fn body_read_error(err: axum::Error) -> AppError {
    let err = err.into_inner();
    if err.downcast_ref::<LengthLimitError>().is_some() {
        AppError::PayloadTooLarge(err.to_string())
    } else {
        AppError::BadRequest(format!("failed to read request body: {}", err))
    }
}

/// Decodes `application/x-www-form-urlencoded` text, cleans the values and
/// re-encodes it. Returns the number of values that changed.
fn clean_form(sanitizer: &Sanitizer, encoded: &str) -> (String, usize) {
    let mut pairs: Vec<(String, String)> = form_urlencoded::parse(encoded.as_bytes())
        .into_owned()
        .collect();
    let count = sanitizer.sanitize_pairs(&mut pairs);
    if count == 0 {
        return (encoded.to_string(), 0);
    }

    let encoded = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(&pairs)
        .finish();
    (encoded, count)
}

fn with_query(uri: &Uri, query: &str) -> Result<Uri, AppError> {
    let path_and_query = if query.is_empty() {
        uri.path().to_string()
    } else {
        format!("{}?{}", uri.path(), query)
    };

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(
        path_and_query
            .parse::<PathAndQuery>()
            .map_err(|e| AppError::BadRequest(e.to_string()))?,
    );
    Uri::from_parts(parts).map_err(|e| AppError::InternalServerError(e.to_string()))
}
