// tests/properties.rs

use ms_tools::sanitize::{CleanOptions, PolicyName, PolicyTable, Sanitizer};
use proptest::prelude::*;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Serialized text escapes `<`, so every match is an element tag.
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[a-zA-Z][^>]*>").unwrap());

const FRAGMENTS: &[&str] = &[
    "<b>",
    "</b>",
    "<i>",
    "</i>",
    "<em>",
    "</em>",
    "<bogus>",
    "</bogus>",
    "<script>alert(1)</script>",
    "<a href=\"javascript:x()\" onclick=\"y()\">",
    "<a href=\"https://x.test\" class=\"c\">",
    "<a href=\"/rel\">",
    "</a>",
    "<p>",
    "</p>",
    "<br>",
    "<img src=\"//cdn.test/i.png\" alt=\"i\">",
    "<r:snippet name=\"x\" />",
    "text",
    " ",
    "1 < 2",
    "&amp;",
    "&#13;",
    "&lt;b&gt;",
    "<pre>",
    "</pre>",
    "\n",
    "<form>",
    "</form>",
    "<li>",
    "</li>",
    "<style>",
    "</style>",
    "<table>",
    "</table>",
    "<td>",
    "</td>",
];

fn markup() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(FRAGMENTS), 0..12).prop_map(|parts| parts.concat())
}

fn policy() -> impl Strategy<Value = PolicyName> {
    prop::sample::select(PolicyName::ALL.to_vec())
}

fn tree() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        markup().prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::vec(("[a-z]{1,6}", inner), 0..6)
                .prop_map(|entries| Value::Object(entries.into_iter().collect())),
        ]
    })
}

/// Same containers, same keys in the same order, same non-string scalars.
fn same_shape(before: &Value, after: &Value) -> bool {
    match (before, after) {
        (Value::String(_), Value::String(_)) => true,
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| same_shape(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.keys().eq(b.keys()) && a.values().zip(b.values()).all(|(x, y)| same_shape(x, y))
        }
        (a, b) => a == b,
    }
}

proptest! {
    #[test]
    fn clean_is_idempotent(text in markup(), name in policy(), template_tags in any::<bool>()) {
        let sanitizer = Sanitizer::builtin().unwrap();
        let options = CleanOptions::with_policy(name.as_str()).template_tags(template_tags);

        let once = sanitizer.clean(&text, &options).unwrap();
        let twice = sanitizer.clean(&once, &options).unwrap();
        prop_assert_eq!(twice, once);
    }

    #[test]
    fn clean_never_leaks_scripts_or_carriage_returns(text in markup(), name in policy()) {
        let sanitizer = Sanitizer::builtin().unwrap();
        let cleaned = sanitizer.clean(&text, &CleanOptions::with_policy(name.as_str())).unwrap();

        prop_assert!(!cleaned.contains("<script"));
        // `<style>` contents survive as escaped text, so only real tags are checked.
        for tag in TAG.find_iter(&cleaned) {
            prop_assert!(!tag.as_str().contains("javascript:"), "{}", tag.as_str());
            prop_assert!(!tag.as_str().contains("onclick"), "{}", tag.as_str());
        }
        prop_assert!(!cleaned.contains('\r'));
        prop_assert!(!cleaned.contains("&#13;"));
    }

    #[test]
    fn tree_walk_preserves_structure(value in tree(), name in policy()) {
        let sanitizer = Sanitizer::new(PolicyTable::builtin().unwrap(), name.as_str()).unwrap();
        let cleaned = sanitizer.sanitized(value.clone());

        prop_assert!(same_shape(&value, &cleaned));
        // Cleaning an already cleaned tree changes nothing.
        let mut again = cleaned.clone();
        prop_assert_eq!(sanitizer.sanitize_tree(&mut again), 0);
        prop_assert_eq!(again, cleaned);
    }
}
