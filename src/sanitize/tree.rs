// src/sanitize/tree.rs

//! Recursive cleaning of request parameter trees.
//!
//! Trees are `serde_json::Value`s: every string leaf is cleaned with the
//! sanitizer's default policy, containers are descended into, and all other
//! scalars pass through. Object keys and ordering are never touched.

use serde_json::Value;

use super::{CompiledPolicy, Sanitizer, clean_with};

impl Sanitizer {
    /// Cleans every string leaf of `tree` in place.
    ///
    /// Returns how many leaves actually changed.
    pub fn sanitize_tree(&self, tree: &mut Value) -> usize {
        walk(tree, self.default_policy(), self.template_tags())
    }

    /// By-value variant of [`Sanitizer::sanitize_tree`].
    pub fn sanitized(&self, mut tree: Value) -> Value {
        self.sanitize_tree(&mut tree);
        tree
    }

    /// Cleans the values of decoded form or query pairs. Keys are kept as is.
    pub fn sanitize_pairs(&self, pairs: &mut [(String, String)]) -> usize {
        pairs
            .iter_mut()
            .map(|(_, value)| clean_leaf(value, self.default_policy(), self.template_tags()))
            .sum()
    }
}

fn walk(value: &mut Value, policy: &CompiledPolicy, template_tags: bool) -> usize {
    match value {
        Value::String(text) => clean_leaf(text, policy, template_tags),
        Value::Array(items) => items
            .iter_mut()
            .map(|item| walk(item, policy, template_tags))
            .sum(),
        Value::Object(map) => map
            .values_mut()
            .map(|item| walk(item, policy, template_tags))
            .sum(),
        Value::Null | Value::Bool(_) | Value::Number(_) => 0,
    }
}

fn clean_leaf(text: &mut String, policy: &CompiledPolicy, template_tags: bool) -> usize {
    let cleaned = clean_with(policy, text, template_tags);
    if cleaned == *text {
        0
    } else {
        *text = cleaned;
        1
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::sanitize::PolicyTable;

    fn basic() -> Sanitizer {
        Sanitizer::new(PolicyTable::builtin().unwrap(), "basic").unwrap()
    }

    #[test]
    fn every_string_leaf_is_cleaned() {
        let mut tree = json!({
            "a": "<script>x</script>",
            "b": ["<i>ok</i>", { "c": "safe" }]
        });
        let changed = basic().sanitize_tree(&mut tree);

        assert_eq!(changed, 1);
        assert_eq!(
            tree,
            json!({ "a": "", "b": ["<i>ok</i>", { "c": "safe" }] })
        );
    }

    #[test]
    fn non_string_scalars_pass_through() {
        let tree = json!({
            "n": 42,
            "f": 1.5,
            "t": true,
            "nil": null,
            "deep": [[[{ "x": "<b>b</b><bogus>y</bogus>", "y": false }]]]
        });
        let cleaned = basic().sanitized(tree);

        assert_eq!(cleaned["n"], 42);
        assert_eq!(cleaned["f"], 1.5);
        assert_eq!(cleaned["t"], true);
        assert!(cleaned["nil"].is_null());
        assert_eq!(cleaned["deep"][0][0][0]["x"], "<b>b</b>y");
        assert_eq!(cleaned["deep"][0][0][0]["y"], false);
    }

    #[test]
    fn key_order_and_keys_are_preserved() {
        let tree = json!({ "zeta": "<b>z</b>", "<alpha>": "a", "mid": ["1", "2"] });
        let cleaned = Sanitizer::builtin().unwrap().sanitized(tree);

        let keys: Vec<&String> = cleaned.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["zeta", "<alpha>", "mid"]);
        assert_eq!(cleaned["zeta"], "z");
    }

    #[test]
    fn top_level_string_is_cleaned() {
        let mut tree = Value::String("<em>hi</em>".to_string());
        Sanitizer::builtin().unwrap().sanitize_tree(&mut tree);
        assert_eq!(tree, "hi");
    }

    #[test]
    fn tree_walk_honours_template_tags() {
        let sanitizer = Sanitizer::builtin().unwrap().with_template_tags(true);
        let tree = sanitizer.sanitized(json!(["<r:content part=\"body\" /><p>x</p>"]));
        assert_eq!(tree, json!(["<r:content part=\"body\" />x"]));
    }

    #[test]
    fn pairs_keep_keys() {
        let mut pairs = vec![
            ("<b>k</b>".to_string(), "<b>v</b>".to_string()),
            ("plain".to_string(), "text".to_string()),
        ];
        let changed = Sanitizer::builtin().unwrap().sanitize_pairs(&mut pairs);

        assert_eq!(changed, 1);
        assert_eq!(pairs[0], ("<b>k</b>".to_string(), "v".to_string()));
        assert_eq!(pairs[1].1, "text");
    }
}
