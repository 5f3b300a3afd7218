// src/sanitize/policy.rs

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use ammonia::{Builder, UrlRelative};
use serde::Serialize;
use url::Url;

use super::error::SanitizeError;

/// Tags whose entire subtree is dropped by every built-in policy.
pub const REMOVE_CONTENTS: [&str; 3] = ["script", "embed", "iframe"];

/// Attributes whose value is a URL; whitelisting one requires a [`ProtocolRule`].
const URL_ATTRIBUTES: [&str; 13] = [
    "action",
    "background",
    "cite",
    "codebase",
    "data",
    "formaction",
    "href",
    "longdesc",
    "manifest",
    "ping",
    "poster",
    "src",
    "usemap",
];

/// Names of the built-in policies, from least to most permissive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyName {
    /// Strips every tag, keeping only text.
    Default,
    /// Simple inline formatting only.
    Restricted,
    /// Common text markup plus links and quotes.
    Basic,
    /// Basic plus headings, images and tables.
    Relaxed,
    /// Hand-tuned whitelist with `class` attributes and table layout.
    Extended,
}

impl PolicyName {
    pub const ALL: [PolicyName; 5] = [
        PolicyName::Default,
        PolicyName::Restricted,
        PolicyName::Basic,
        PolicyName::Relaxed,
        PolicyName::Extended,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyName::Default => "default",
            PolicyName::Restricted => "restricted",
            PolicyName::Basic => "basic",
            PolicyName::Relaxed => "relaxed",
            PolicyName::Extended => "extended",
        }
    }

    /// Builds the whitelist for this built-in policy.
    pub fn policy(self) -> Policy {
        match self {
            PolicyName::Default => Policy::builder(self.as_str()),
            PolicyName::Restricted => {
                Policy::builder(self.as_str()).elements(["b", "em", "i", "strong", "u"])
            }
            PolicyName::Basic => basic(),
            PolicyName::Relaxed => relaxed(),
            PolicyName::Extended => extended(),
        }
        .remove_contents(REMOVE_CONTENTS)
        .finish()
    }
}

impl fmt::Display for PolicyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyName {
    type Err = SanitizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        PolicyName::ALL
            .into_iter()
            .find(|name| name.as_str() == wanted)
            .ok_or_else(|| SanitizeError::UnknownPolicy(s.to_string()))
    }
}

/// One entry of a policy's protocol whitelist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// An explicit URI scheme such as `https`.
    Scheme(&'static str),
    /// Scheme-relative and path-relative URIs.
    Relative,
}

/// Allowed URI schemes for one (element, attribute) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProtocolRule {
    pub schemes: BTreeSet<&'static str>,
    pub relative: bool,
}

impl ProtocolRule {
    /// Whether `value` may stay on the attribute.
    ///
    /// Values that fail to parse for any reason other than missing a scheme
    /// are rejected.
    pub fn allows(&self, value: &str) -> bool {
        match Url::parse(value) {
            Ok(url) => self.schemes.contains(url.scheme()),
            Err(url::ParseError::RelativeUrlWithoutBase) => self.relative,
            Err(_) => false,
        }
    }
}

/// An immutable whitelist describing what survives sanitization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Policy {
    name: String,
    elements: BTreeSet<&'static str>,
    attributes: BTreeMap<&'static str, BTreeSet<&'static str>>,
    generic_attributes: BTreeSet<&'static str>,
    protocols: BTreeMap<&'static str, BTreeMap<&'static str, ProtocolRule>>,
    remove_contents: BTreeSet<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    link_rel: Option<&'static str>,
}

impl Policy {
    pub fn builder(name: &str) -> PolicyBuilder {
        PolicyBuilder {
            policy: Policy {
                name: normalize(name),
                elements: BTreeSet::new(),
                attributes: BTreeMap::new(),
                generic_attributes: BTreeSet::new(),
                protocols: BTreeMap::new(),
                remove_contents: BTreeSet::new(),
                link_rel: None,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn elements(&self) -> &BTreeSet<&'static str> {
        &self.elements
    }

    pub fn attributes(&self) -> &BTreeMap<&'static str, BTreeSet<&'static str>> {
        &self.attributes
    }

    pub fn generic_attributes(&self) -> &BTreeSet<&'static str> {
        &self.generic_attributes
    }

    pub fn protocols(&self) -> &BTreeMap<&'static str, BTreeMap<&'static str, ProtocolRule>> {
        &self.protocols
    }

    pub fn remove_contents(&self) -> &BTreeSet<&'static str> {
        &self.remove_contents
    }

    pub fn protocol_rule(&self, element: &str, attribute: &str) -> Option<&ProtocolRule> {
        self.protocols.get(element)?.get(attribute)
    }

    /// Checks that the whitelists do not contradict each other.
    pub fn validate(&self) -> Result<(), SanitizeError> {
        if let Some(tag) = self.elements.intersection(&self.remove_contents).next() {
            return Err(self.invalid(format!(
                "<{}> is both allowed and listed for content removal",
                tag
            )));
        }
        if self.link_rel.is_some() {
            let rel_allowed = self.generic_attributes.contains("rel")
                || self.attributes.get("a").is_some_and(|attrs| attrs.contains("rel"));
            if rel_allowed {
                return Err(self.invalid(
                    "'rel' cannot be whitelisted when the policy sets it on links".to_string(),
                ));
            }
        }
        if let Some(attr) = self
            .generic_attributes
            .iter()
            .find(|attr| URL_ATTRIBUTES.contains(*attr))
        {
            return Err(self.invalid(format!(
                "'{}' carries a URL and cannot be a generic attribute",
                attr
            )));
        }
        for (tag, attrs) in &self.attributes {
            let unchecked = attrs.iter().find(|attr| {
                URL_ATTRIBUTES.contains(*attr) && self.protocol_rule(tag, attr).is_none()
            });
            if let Some(attr) = unchecked {
                return Err(self.invalid(format!(
                    "<{}> attribute '{}' carries a URL but has no protocol rule",
                    tag, attr
                )));
            }
        }
        Ok(())
    }

    /// Validates the policy and prepares the ammonia builder that enforces it.
    pub fn compile(self) -> Result<CompiledPolicy, SanitizeError> {
        self.validate()?;

        let schemes: HashSet<&'static str> = self
            .protocols
            .values()
            .flat_map(|attrs| attrs.values())
            .flat_map(|rule| rule.schemes.iter().copied())
            .collect();
        let any_relative = self
            .protocols
            .values()
            .flat_map(|attrs| attrs.values())
            .any(|rule| rule.relative);

        let mut builder = Builder::empty();
        builder
            .tags(self.elements.iter().copied().collect())
            .tag_attributes(
                self.attributes
                    .iter()
                    .map(|(tag, attrs)| (*tag, attrs.iter().copied().collect::<HashSet<_>>()))
                    .collect::<HashMap<_, _>>(),
            )
            .generic_attributes(self.generic_attributes.iter().copied().collect())
            .clean_content_tags(self.remove_contents.iter().copied().collect())
            .url_schemes(schemes)
            .url_relative(if any_relative {
                UrlRelative::PassThrough
            } else {
                UrlRelative::Deny
            })
            .link_rel(self.link_rel)
            .strip_comments(true);

        // ammonia only knows a global scheme list, the per-attribute rules are applied here.
        let protocols = self.protocols.clone();
        builder.attribute_filter(move |element, attribute, value| {
            match protocols.get(element).and_then(|attrs| attrs.get(attribute)) {
                Some(rule) if !rule.allows(value) => None,
                _ => Some(Cow::Borrowed(value)),
            }
        });

        Ok(CompiledPolicy {
            policy: self,
            builder,
        })
    }

    fn invalid(&self, reason: String) -> SanitizeError {
        SanitizeError::InvalidPolicy {
            policy: self.name.clone(),
            reason,
        }
    }
}

/// Incrementally assembles a [`Policy`].
#[derive(Debug, Clone)]
pub struct PolicyBuilder {
    policy: Policy,
}

impl PolicyBuilder {
    pub fn elements<I>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = &'static str>,
    {
        self.policy.elements.extend(tags);
        self
    }

    pub fn attributes<I>(mut self, tag: &'static str, attrs: I) -> Self
    where
        I: IntoIterator<Item = &'static str>,
    {
        self.policy.attributes.entry(tag).or_default().extend(attrs);
        self
    }

    /// Attributes allowed on every whitelisted element.
    pub fn generic_attributes<I>(mut self, attrs: I) -> Self
    where
        I: IntoIterator<Item = &'static str>,
    {
        self.policy.generic_attributes.extend(attrs);
        self
    }

    pub fn protocols<I>(mut self, tag: &'static str, attr: &'static str, protocols: I) -> Self
    where
        I: IntoIterator<Item = Protocol>,
    {
        let rule = self
            .policy
            .protocols
            .entry(tag)
            .or_default()
            .entry(attr)
            .or_default();
        for protocol in protocols {
            match protocol {
                Protocol::Scheme(scheme) => {
                    rule.schemes.insert(scheme);
                }
                Protocol::Relative => rule.relative = true,
            }
        }
        self
    }

    pub fn remove_contents<I>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = &'static str>,
    {
        self.policy.remove_contents.extend(tags);
        self
    }

    /// Adds `rel="<value>"` to every surviving link.
    pub fn link_rel(mut self, value: &'static str) -> Self {
        self.policy.link_rel = Some(value);
        self
    }

    pub fn build(self) -> Result<Policy, SanitizeError> {
        self.policy.validate()?;
        Ok(self.policy)
    }

    /// Skips validation; the policy table validates on compile.
    pub(crate) fn finish(self) -> Policy {
        self.policy
    }
}

/// A policy together with the ready-to-use ammonia builder.
pub struct CompiledPolicy {
    policy: Policy,
    builder: Builder<'static>,
}

impl CompiledPolicy {
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn name(&self) -> &str {
        self.policy.name()
    }

    /// Runs the raw ammonia pass, without any pre- or post-processing.
    pub(crate) fn clean_markup(&self, text: &str) -> String {
        self.builder.clean(text).to_string()
    }
}

impl fmt::Debug for CompiledPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledPolicy")
            .field("name", &self.policy.name)
            .finish_non_exhaustive()
    }
}

/// Name-indexed, immutable set of compiled policies.
#[derive(Debug)]
pub struct PolicyTable {
    policies: BTreeMap<String, Arc<CompiledPolicy>>,
}

impl PolicyTable {
    /// The five built-in policies.
    pub fn builtin() -> Result<Self, SanitizeError> {
        Self::with_custom(std::iter::empty())
    }

    /// The built-in policies plus `custom` ones.
    ///
    /// A custom policy registered under a built-in name replaces it.
    pub fn with_custom<I>(custom: I) -> Result<Self, SanitizeError>
    where
        I: IntoIterator<Item = Policy>,
    {
        let mut policies = BTreeMap::new();
        for policy in PolicyName::ALL
            .into_iter()
            .map(PolicyName::policy)
            .chain(custom)
        {
            let compiled = policy.compile()?;
            tracing::debug!(policy = compiled.name(), "compiled sanitize policy");
            policies.insert(compiled.name().to_string(), Arc::new(compiled));
        }
        Ok(Self { policies })
    }

    pub fn get(&self, name: &str) -> Result<&Arc<CompiledPolicy>, SanitizeError> {
        self.policies
            .get(&normalize(name))
            .ok_or_else(|| SanitizeError::UnknownPolicy(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.policies.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Policy> {
        self.policies.values().map(|compiled| compiled.policy())
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

const WEB: [Protocol; 3] = [
    Protocol::Scheme("http"),
    Protocol::Scheme("https"),
    Protocol::Relative,
];

const LINK: [Protocol; 5] = [
    Protocol::Scheme("ftp"),
    Protocol::Scheme("http"),
    Protocol::Scheme("https"),
    Protocol::Scheme("mailto"),
    Protocol::Relative,
];

fn basic() -> PolicyBuilder {
    Policy::builder(PolicyName::Basic.as_str())
        .elements([
            "a", "abbr", "b", "blockquote", "br", "cite", "code", "dd", "dfn", "dl", "dt", "em",
            "i", "kbd", "li", "mark", "ol", "p", "pre", "q", "s", "samp", "small", "strike",
            "strong", "sub", "sup", "time", "u", "ul", "var",
        ])
        .attributes("a", ["href"])
        .attributes("abbr", ["title"])
        .attributes("blockquote", ["cite"])
        .attributes("dfn", ["title"])
        .attributes("q", ["cite"])
        .attributes("time", ["datetime", "pubdate"])
        .link_rel("nofollow")
        .protocols("a", "href", LINK)
        .protocols("blockquote", "cite", WEB)
        .protocols("q", "cite", WEB)
}

fn relaxed() -> PolicyBuilder {
    Policy::builder(PolicyName::Relaxed.as_str())
        .elements([
            "a", "abbr", "b", "bdo", "blockquote", "br", "caption", "cite", "code", "col",
            "colgroup", "dd", "del", "dfn", "dl", "dt", "em", "figcaption", "figure", "h1", "h2",
            "h3", "h4", "h5", "h6", "hgroup", "i", "img", "ins", "kbd", "li", "mark", "ol", "p",
            "pre", "q", "rp", "rt", "ruby", "s", "samp", "small", "strike", "strong", "sub",
            "sup", "table", "tbody", "td", "tfoot", "th", "thead", "time", "tr", "u", "ul", "var",
            "wbr",
        ])
        .generic_attributes(["dir", "lang", "title"])
        .attributes("a", ["href"])
        .attributes("blockquote", ["cite"])
        .attributes("col", ["span", "width"])
        .attributes("colgroup", ["span", "width"])
        .attributes("del", ["cite", "datetime"])
        .attributes("img", ["align", "alt", "height", "src", "width"])
        .attributes("ins", ["cite", "datetime"])
        .attributes("ol", ["start", "reversed", "type"])
        .attributes("q", ["cite"])
        .attributes("table", ["summary", "width"])
        .attributes("td", ["abbr", "axis", "colspan", "rowspan", "width"])
        .attributes("th", ["abbr", "axis", "colspan", "rowspan", "scope", "width"])
        .attributes("time", ["datetime", "pubdate"])
        .attributes("ul", ["type"])
        .protocols("a", "href", LINK)
        .protocols("blockquote", "cite", WEB)
        .protocols("del", "cite", WEB)
        .protocols("img", "src", WEB)
        .protocols("ins", "cite", WEB)
        .protocols("q", "cite", WEB)
}

fn extended() -> PolicyBuilder {
    Policy::builder(PolicyName::Extended.as_str())
        .elements([
            "a", "b", "blockquote", "br", "caption", "cite", "code", "col", "colgroup", "dd", "dl",
            "dt", "em", "h1", "h2", "h3", "h4", "h5", "h6", "hr", "i", "img", "li", "ol", "p",
            "pre", "q", "small", "strike", "strong", "sub", "sup", "table", "tbody", "td", "tfoot",
            "th", "thead", "tr", "u", "ul",
        ])
        .attributes("a", ["class", "href", "title"])
        .attributes("blockquote", ["class", "cite"])
        .attributes("br", ["class"])
        .attributes("code", ["class"])
        .attributes("col", ["class", "span", "width"])
        .attributes("colgroup", ["class", "span", "width"])
        .attributes("hr", ["class"])
        .attributes("img", ["class", "align", "alt", "height", "src", "title", "width"])
        .attributes("li", ["class", "title"])
        .attributes("ol", ["class", "start", "type"])
        .attributes("p", ["class", "title"])
        .attributes("q", ["class", "cite"])
        .attributes(
            "table",
            ["border", "class", "cellspacing", "cellpadding", "summary", "width"],
        )
        .attributes(
            "td",
            ["abbr", "axis", "class", "colspan", "rowspan", "width", "title"],
        )
        .attributes(
            "th",
            ["abbr", "axis", "class", "colspan", "rowspan", "scope", "width", "title"],
        )
        .attributes("ul", ["class", "type"])
        .protocols("a", "href", LINK)
        .protocols("blockquote", "cite", WEB)
        .protocols("img", "src", WEB)
        .protocols("q", "cite", WEB)
}
