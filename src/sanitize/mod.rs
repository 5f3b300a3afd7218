// src/sanitize/mod.rs

//! Whitelist-based markup sanitization built on ammonia.
//!
//! A [`Sanitizer`] owns an immutable [`PolicyTable`] and a default policy.
//! It cleans single strings under a named policy and walks whole parameter
//! trees (see [`tree`]) cleaning every string leaf.

pub mod error;
pub mod policy;
pub mod template;
pub mod tree;

use std::sync::Arc;

pub use error::SanitizeError;
pub use policy::{
    CompiledPolicy, Policy, PolicyBuilder, PolicyName, PolicyTable, Protocol, ProtocolRule,
};

const CARRIAGE_RETURN_ENTITY: &str = "&#13;";

const MAX_PASSES: usize = 8;

/// Per-call settings for [`Sanitizer::clean`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanOptions {
    /// Policy name; `None` uses the sanitizer's default policy.
    pub policy: Option<String>,
    /// Preserve `<r:... />` template tags across the cleaning pass.
    pub template_tags: bool,
}

impl CleanOptions {
    pub fn with_policy(name: impl Into<String>) -> Self {
        Self {
            policy: Some(name.into()),
            template_tags: false,
        }
    }

    pub fn template_tags(mut self, enabled: bool) -> Self {
        self.template_tags = enabled;
        self
    }
}

/// Cleans text and parameter trees against a fixed policy table.
#[derive(Debug)]
pub struct Sanitizer {
    table: PolicyTable,
    default_policy: Arc<CompiledPolicy>,
    template_tags: bool,
}

impl Sanitizer {
    /// Fails fast if `default_policy` is not in `table`.
    pub fn new(table: PolicyTable, default_policy: &str) -> Result<Self, SanitizeError> {
        let default_policy = Arc::clone(table.get(default_policy)?);
        Ok(Self {
            table,
            default_policy,
            template_tags: false,
        })
    }

    /// Built-in policies, defaulting to the strip-everything policy.
    pub fn builtin() -> Result<Self, SanitizeError> {
        Self::new(PolicyTable::builtin()?, PolicyName::Default.as_str())
    }

    /// Whether tree walking preserves template tags.
    pub fn with_template_tags(mut self, enabled: bool) -> Self {
        self.template_tags = enabled;
        self
    }

    pub fn policies(&self) -> &PolicyTable {
        &self.table
    }

    pub fn default_policy(&self) -> &CompiledPolicy {
        &self.default_policy
    }

    pub fn template_tags(&self) -> bool {
        self.template_tags
    }

    /// Looks up `name`, or the default policy when `None`.
    pub fn resolve(&self, name: Option<&str>) -> Result<&CompiledPolicy, SanitizeError> {
        match name {
            Some(name) => self.table.get(name).map(|policy| policy.as_ref()),
            None => Ok(&self.default_policy),
        }
    }

    /// Returns a cleaned copy of `text`.
    ///
    /// The only error is an unknown policy name; malformed markup is always
    /// cleaned on a best-effort basis.
    pub fn clean(&self, text: &str, options: &CleanOptions) -> Result<String, SanitizeError> {
        let policy = self.resolve(options.policy.as_deref())?;
        Ok(clean_with(policy, text, options.template_tags))
    }

    /// Cleans `text` in place. Returns `false` when it was already clean, in
    /// which case it is left untouched.
    pub fn clean_in_place(
        &self,
        text: &mut String,
        options: &CleanOptions,
    ) -> Result<bool, SanitizeError> {
        let cleaned = self.clean(text, options)?;
        if cleaned == *text {
            return Ok(false);
        }
        *text = cleaned;
        Ok(true)
    }
}

/// Cleans `text` under an already resolved policy.
pub fn clean_with(policy: &CompiledPolicy, text: &str, template_tags: bool) -> String {
    if template_tags {
        let escaped = template::escape(text);
        template::unescape(&settle(policy, &escaped)).into_owned()
    } else {
        settle(policy, text)
    }
}

/// Repeats the cleaning pass until its output re-parses to itself.
///
/// Serialized output does not always parse back to the same tree: a newline
/// right after `<pre>` is dropped, and unwrapping can leave nesting the parser
/// will not rebuild (`<li>` inside `<li>`).
fn settle(policy: &CompiledPolicy, text: &str) -> String {
    let mut cleaned = strip_carriage_returns(policy.clean_markup(text));
    for _ in 1..MAX_PASSES {
        let next = strip_carriage_returns(policy.clean_markup(&cleaned));
        if next == cleaned {
            break;
        }
        cleaned = next;
    }
    cleaned
}

// The parser decodes `&#13;` into a bare CR; both spellings are dropped.
fn strip_carriage_returns(text: String) -> String {
    if text.contains('\r') || text.contains(CARRIAGE_RETURN_ENTITY) {
        text.replace(CARRIAGE_RETURN_ENTITY, "").replace('\r', "")
    } else {
        text
    }
}
