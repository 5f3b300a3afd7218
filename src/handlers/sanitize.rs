use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use validator::Validate;

use crate::{
    error::AppError,
    models::sanitize::{CleanRequest, CleanResponse},
    sanitize::{CleanOptions, Sanitizer},
};

/// Cleans a single piece of text under the requested policy.
/// Unknown policy names are rejected with 400 rather than falling back.
pub async fn clean_text(
    State(sanitizer): State<Arc<Sanitizer>>,
    Json(payload): Json<CleanRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let policy = sanitizer.resolve(payload.policy.as_deref())?.name().to_string();
    let options = CleanOptions::with_policy(policy.clone()).template_tags(payload.template_tags);

    let mut text = payload.text;
    let changed = sanitizer.clean_in_place(&mut text, &options)?;

    Ok(Json(CleanResponse {
        text,
        changed,
        policy,
    }))
}
