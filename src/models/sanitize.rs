use serde::{Deserialize, Serialize};
use validator::Validate;

/// DTO for cleaning a single piece of text.
#[derive(Debug, Deserialize, Validate)]
pub struct CleanRequest {
    #[validate(length(
        min = 1,
        max = 100000,
        message = "Text length must be between 1 and 100000 chars"
    ))]
    pub text: String,

    /// Policy name; the server default is used when absent.
    #[validate(length(min = 1, max = 64))]
    pub policy: Option<String>,

    /// Preserve `<r:... />` template tags.
    #[serde(default)]
    pub template_tags: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CleanResponse {
    pub text: String,
    /// Whether cleaning altered the input.
    pub changed: bool,
    /// The policy that was applied.
    pub policy: String,
}
