use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{error::AppError, models::policy::PolicySummary, sanitize::Sanitizer};

/// Lists every registered policy, sorted by name.
pub async fn list_policies(State(sanitizer): State<Arc<Sanitizer>>) -> impl IntoResponse {
    let default_policy = sanitizer.default_policy().name();
    let policies: Vec<PolicySummary> = sanitizer
        .policies()
        .iter()
        .map(|policy| PolicySummary::new(policy, default_policy))
        .collect();

    Json(policies)
}

/// Full whitelist of a single policy.
pub async fn get_policy(
    State(sanitizer): State<Arc<Sanitizer>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let compiled = sanitizer
        .policies()
        .get(&name)
        .map_err(|_| AppError::NotFound(format!("Policy '{}' not found", name)))?;

    Ok(Json(compiled.policy().clone()))
}
