use serde::Serialize;

use crate::sanitize::Policy;

/// Overview entry for the policy listing.
#[derive(Debug, Serialize)]
pub struct PolicySummary {
    pub name: String,
    pub elements: Vec<&'static str>,
    pub generic_attributes: Vec<&'static str>,
    pub remove_contents: Vec<&'static str>,
    /// Whether this is the server's default policy.
    pub is_default: bool,
}

impl PolicySummary {
    pub fn new(policy: &Policy, default_policy: &str) -> Self {
        Self {
            name: policy.name().to_string(),
            elements: policy.elements().iter().copied().collect(),
            generic_attributes: policy.generic_attributes().iter().copied().collect(),
            remove_contents: policy.remove_contents().iter().copied().collect(),
            is_default: policy.name() == default_policy,
        }
    }
}
