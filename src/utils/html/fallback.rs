// src/utils/html/fallback.rs

use std::sync::OnceLock;

use regex::Regex;

use super::{MarkupError, MarkupProcessor, PlainText, SafeHtml};

/// Regex-only processor used when no HTML parser is compiled in.
///
/// The sanitize pass is deliberately partial: it removes script/style blocks,
/// quoted event handlers and `javascript:` substrings, nothing more. Content that
/// only went through this tier must be re-sanitized by the structured processor
/// before it is trusted.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexProcessor;

fn script_style_blocks() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>")
            .expect("valid regex")
    })
}

fn event_handlers() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)\s*\bon[a-z]+\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]+)"#).expect("valid regex")
    })
}

fn javascript_scheme() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)javascript:").expect("valid regex"))
}

fn tags() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid regex"))
}

/// Entities decoded by the regex tier, in the order they are applied.
const ENTITIES: &[(&str, &str)] = &[
    ("&nbsp;", " "),
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&apos;", "'"),
];

impl MarkupProcessor for RegexProcessor {
    fn name(&self) -> &'static str {
        "regex"
    }

    fn sanitize(&self, html: &str) -> Result<SafeHtml, MarkupError> {
        let html = script_style_blocks().replace_all(html, "");
        let html = event_handlers().replace_all(&html, "");
        let html = javascript_scheme().replace_all(&html, "");
        Ok(SafeHtml::new(html.into_owned()))
    }

    fn plain_text(&self, html: &str) -> Result<PlainText, MarkupError> {
        let without_blocks = script_style_blocks().replace_all(html, " ");
        let mut text = tags().replace_all(&without_blocks, " ").into_owned();
        for (entity, replacement) in ENTITIES {
            if text.contains(entity) {
                text = text.replace(entity, replacement);
            }
        }
        Ok(PlainText::normalized(&text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sanitize(html: &str) -> String {
        RegexProcessor.sanitize(html).unwrap().into_inner()
    }

    fn plain(html: &str) -> String {
        RegexProcessor.plain_text(html).unwrap().into_inner()
    }

    #[test]
    fn removes_script_and_style_blocks_across_lines() {
        let out = sanitize("<p>a</p><SCRIPT type=\"x\">\nalert(1)\n</script ><style>p{}</style><p>b</p>");
        assert_eq!(out, "<p>a</p><p>b</p>");
    }

    #[test]
    fn script_removal_is_non_greedy() {
        let out = sanitize("<script>1</script>keep<script>2</script>");
        assert_eq!(out, "keep");
    }

    #[test]
    fn strips_event_handlers() {
        assert_eq!(sanitize(r#"<div onclick="evil()">hi</div>"#), "<div>hi</div>");
        assert_eq!(sanitize("<img src=x onerror='evil()'>"), "<img src=x>");
        assert_eq!(sanitize("<b OnMouseOver=evil()>x</b>"), "<b>x</b>");
    }

    #[test]
    fn strips_javascript_scheme() {
        assert_eq!(
            sanitize(r#"<a href="JavaScript:alert(1)">x</a>"#),
            r#"<a href="alert(1)">x</a>"#
        );
    }

    #[test]
    fn plain_text_decodes_in_fixed_order() {
        assert_eq!(plain("<p>A &amp; B</p>"), "A & B");
        assert_eq!(plain("&quot;hi&quot; &#39;there&apos;"), "\"hi\" 'there'");
        assert_eq!(plain("a&nbsp;&nbsp;b"), "a b");
        // &amp; is decoded before &lt;, so double-encoded input decodes twice.
        assert_eq!(plain("&amp;lt;"), "<");
    }

    #[test]
    fn plain_text_separates_blocks_and_trims() {
        assert_eq!(plain("<p>Line1</p><p>Line2</p>"), "Line1 Line2");
        assert_eq!(plain("  <div>\n\t spaced \n</div>  "), "spaced");
        assert_eq!(plain("<script>alert(1)</script>"), "");
        assert_eq!(plain("A<b>B</b>"), "A B");
    }
}
