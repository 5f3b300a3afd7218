use axum::{
    Json,
    body::Bytes,
    extract::Query,
    http::HeaderMap,
    response::IntoResponse,
};
use serde_json::Value;
use url::form_urlencoded;

use crate::{
    error::AppError,
    middleware::params::BodyKind,
    models::params::{ParamsEcho, pairs_to_object},
};

/// Echoes the request parameters back.
/// Mounted behind `sanitize_params`, so the echo shows what handlers receive.
pub async fn echo_params(
    Query(query): Query<Vec<(String, String)>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let body = match BodyKind::of(&headers) {
        _ if body.is_empty() => Value::Null,
        BodyKind::Json => serde_json::from_slice(&body)?,
        BodyKind::Form => Value::Object(pairs_to_object(
            form_urlencoded::parse(&body).into_owned(),
        )),
        BodyKind::Other => Value::Null,
    };

    Ok(Json(ParamsEcho {
        query: pairs_to_object(query),
        body,
    }))
}
