// src/sanitize/template.rs

//! Round-trip escape for `<r:... />` template tags.
//!
//! The HTML parser would treat such a tag as an unknown element and drop it, so
//! it is rewritten to `(r:... /)` before cleaning and restored afterwards. The
//! prefix is written as lowercase `r` in both directions.
//!
//! Text that already contains the bracket form is restored too. Input such as
//! `(r:x onclick=alert /)` therefore comes back as the element
//! `<r:x onclick=alert />`, carrying whatever `[a-z0-9_'"=-]` attributes the
//! bracket text spelled out. Only enable template mode where that output is
//! consumed by the template engine and never rendered as HTML.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

static TEMPLATE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<r:([a-z0-9 _'"=-]+) />"#).expect("template tag pattern is valid")
});

static ESCAPED_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\(r:([a-z0-9 _'"=-]+) /\)"#).expect("escaped tag pattern is valid")
});

/// `<r:name="x" />` becomes `(r:name="x" /)`.
pub fn escape(text: &str) -> Cow<'_, str> {
    TEMPLATE_TAG.replace_all(text, "(r:${1} /)")
}

/// `(r:name="x" /)` becomes `<r:name="x" />`.
pub fn unescape(text: &str) -> Cow<'_, str> {
    ESCAPED_TAG.replace_all(text, "<r:${1} />")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_and_restores_template_tags() {
        let text = r#"Hi <r:snippet name="footer" /> and <r:title />"#;
        let escaped = escape(text);
        assert_eq!(escaped, r#"Hi (r:snippet name="footer" /) and (r:title /)"#);
        assert_eq!(unescape(&escaped), text);
    }

    #[test]
    fn prefix_comes_back_lowercase() {
        let escaped = escape("<R:Title />");
        assert_eq!(escaped, "(r:Title /)");
        assert_eq!(unescape(&escaped), "<r:Title />");
        assert_eq!(unescape("(R:Title /)"), "<r:Title />");
    }

    #[test]
    fn leaves_other_markup_alone() {
        assert!(matches!(escape("<p>plain</p>"), Cow::Borrowed(_)));
        assert!(matches!(escape("<r:no-space/>"), Cow::Borrowed(_)));
        assert!(matches!(escape("<r:bad&chars />"), Cow::Borrowed(_)));
    }

    #[test]
    fn unescape_also_rewrites_preexisting_bracket_form() {
        assert_eq!(unescape("(r:literal /)"), "<r:literal />");
        assert_eq!(
            unescape("(r:x onclick=alert /)"),
            "<r:x onclick=alert />"
        );
    }
}
