use crate::config::Config;
use crate::sanitize::{PolicyTable, SanitizeError, Sanitizer};
use axum::extract::FromRef;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub sanitizer: Arc<Sanitizer>,
    pub config: Config,
}

impl AppState {
    /// Compiles the policy table and checks the configured default policy.
    pub fn from_config(config: Config) -> Result<Self, SanitizeError> {
        let sanitizer = Sanitizer::new(PolicyTable::builtin()?, &config.default_policy)?
            .with_template_tags(config.template_tags);

        Ok(Self {
            sanitizer: Arc::new(sanitizer),
            config,
        })
    }
}

impl FromRef<AppState> for Arc<Sanitizer> {
    fn from_ref(state: &AppState) -> Self {
        state.sanitizer.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
