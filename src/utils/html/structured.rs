// src/utils/html/structured.rs

use scraper::{ElementRef, Html, Node};

use super::{
    ALLOWED_ATTRIBUTES, ALLOWED_TAGS, BLOCKED_TAGS, MarkupError, MarkupProcessor, PlainText,
    SafeHtml, escape_attribute, escape_text, is_blocked_href,
};

/// Deepest element nesting the allow-list filter will follow.
pub const MAX_DEPTH: usize = 512;

/// Elements whose boundaries separate words in the text projection.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav",
    "ol", "p", "pre", "section", "table", "tbody", "td", "tfoot", "th", "thead", "tr", "ul",
];

/// Parser-backed processor.
///
/// The input is parsed once, filtered into a fresh output tree and then
/// serialized. The parsed document is never mutated.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuredProcessor;

/// Output tree of the allow-list filter.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SafeNode {
    Text(String),
    Element {
        tag: &'static str,
        attrs: Vec<(&'static str, String)>,
        children: Vec<SafeNode>,
    },
}

impl MarkupProcessor for StructuredProcessor {
    fn name(&self) -> &'static str {
        "structured"
    }

    fn sanitize(&self, html: &str) -> Result<SafeHtml, MarkupError> {
        let fragment = Html::parse_fragment(html);
        let nodes = filter_children(fragment.root_element(), 0)?;

        let mut out = String::with_capacity(html.len());
        for node in &nodes {
            serialize(node, &mut out);
        }
        Ok(SafeHtml::new(out))
    }

    fn plain_text(&self, html: &str) -> Result<PlainText, MarkupError> {
        let fragment = Html::parse_fragment(html);
        let text = PlainText::normalized(&collect_text(fragment.root_element()));
        if text.is_empty() {
            return Err(MarkupError::Empty);
        }
        Ok(text)
    }
}

/// Filters every child of `parent`, splicing unwrapped elements in place.
fn filter_children(parent: ElementRef<'_>, depth: usize) -> Result<Vec<SafeNode>, MarkupError> {
    if depth > MAX_DEPTH {
        return Err(MarkupError::TooDeep(MAX_DEPTH));
    }

    let mut out = Vec::new();
    for child in parent.children() {
        match child.value() {
            Node::Text(text) => out.push(SafeNode::Text(String::from(&**text))),
            Node::Element(_) => {
                if let Some(element) = ElementRef::wrap(child) {
                    out.extend(filter_element(element, depth + 1)?);
                }
            }
            // Comments, doctypes and processing instructions are dropped.
            _ => {}
        }
    }
    Ok(out)
}

/// Returns the filtered element, nothing (blocked), or its filtered children (unwrapped).
fn filter_element(element: ElementRef<'_>, depth: usize) -> Result<Vec<SafeNode>, MarkupError> {
    let name = element.value().name();
    if BLOCKED_TAGS.iter().any(|t| t.eq_ignore_ascii_case(name)) {
        return Ok(Vec::new());
    }

    let children = filter_children(element, depth)?;
    let Some(tag) = ALLOWED_TAGS
        .iter()
        .copied()
        .find(|t| t.eq_ignore_ascii_case(name))
    else {
        return Ok(children);
    };

    Ok(vec![SafeNode::Element {
        tag,
        attrs: filter_attributes(tag, element),
        children,
    }])
}

/// Keeps allow-listed attributes, sorted by name so a re-parse yields the same order.
fn filter_attributes(tag: &'static str, element: ElementRef<'_>) -> Vec<(&'static str, String)> {
    let mut attrs: Vec<(&'static str, String)> = Vec::new();
    for (name, value) in element.value().attrs() {
        let Some(allowed) = ALLOWED_ATTRIBUTES
            .iter()
            .copied()
            .find(|a| a.eq_ignore_ascii_case(name))
        else {
            continue;
        };
        if allowed == "href" && is_blocked_href(value) {
            continue;
        }
        if attrs.iter().any(|(n, _)| *n == allowed) {
            continue;
        }
        attrs.push((allowed, value.to_string()));
    }

    // Decide from what was kept: foreign content can carry a second, namespaced href.
    if tag == "a" && attrs.iter().any(|(n, _)| *n == "href") {
        set_attribute(&mut attrs, "target", "_blank");
        set_attribute(&mut attrs, "rel", "noopener noreferrer");
    }
    attrs.sort_by_key(|(n, _)| *n);
    attrs
}

fn set_attribute(attrs: &mut Vec<(&'static str, String)>, name: &'static str, value: &str) {
    match attrs.iter_mut().find(|(n, _)| *n == name) {
        Some((_, v)) => *v = value.to_string(),
        None => attrs.push((name, value.to_string())),
    }
}

fn serialize(node: &SafeNode, out: &mut String) {
    match node {
        SafeNode::Text(text) => escape_text(text, out),
        SafeNode::Element {
            tag,
            attrs,
            children,
        } => {
            out.push('<');
            out.push_str(tag);
            for (name, value) in attrs {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                escape_attribute(value, out);
                out.push('"');
            }
            out.push('>');

            // `br` is the only void element on the allow-list.
            if *tag == "br" {
                return;
            }
            for child in children {
                serialize(child, out);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}

enum Visit<'a> {
    Element(ElementRef<'a>),
    Text(&'a str),
    Gap,
}

/// Text content of `root`, skipping script/style bodies and spacing block boundaries.
///
/// Walks with an explicit stack so deep nesting cannot exhaust the call stack.
fn collect_text(root: ElementRef<'_>) -> String {
    let mut out = String::new();
    let mut stack = vec![Visit::Element(root)];

    while let Some(visit) = stack.pop() {
        match visit {
            Visit::Text(text) => out.push_str(text),
            Visit::Gap => out.push(' '),
            Visit::Element(element) => {
                let name = element.value().name();
                if BLOCKED_TAGS.iter().any(|t| *t == name) || name == "template" {
                    continue;
                }
                let is_block = BLOCK_TAGS.iter().any(|t| *t == name);
                if is_block {
                    out.push(' ');
                    stack.push(Visit::Gap);
                }

                let children: Vec<_> = element.children().collect();
                for child in children.into_iter().rev() {
                    match child.value() {
                        Node::Text(text) => stack.push(Visit::Text(&**text)),
                        Node::Element(_) => {
                            if let Some(el) = ElementRef::wrap(child) {
                                stack.push(Visit::Element(el));
                            }
                        }
                        _ => {}
                    }
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sanitize(html: &str) -> String {
        StructuredProcessor.sanitize(html).unwrap().into_inner()
    }

    #[test]
    fn keeps_allowed_markup() {
        let html = "<p>Hello <strong>world</strong><br><em>!</em></p><ul><li>a</li></ul>";
        assert_eq!(sanitize(html), html);
    }

    #[test]
    fn external_link_gets_target_and_rel() {
        assert_eq!(
            sanitize(r#"<a href="https://example.com">x</a>"#),
            r#"<a href="https://example.com" rel="noopener noreferrer" target="_blank">x</a>"#
        );
    }

    #[test]
    fn existing_target_and_rel_are_overwritten() {
        assert_eq!(
            sanitize(r#"<a rel="opener" href="/about" target="_self">x</a>"#),
            r#"<a href="/about" rel="noopener noreferrer" target="_blank">x</a>"#
        );
    }

    #[test]
    fn dangerous_schemes_lose_href() {
        for href in ["javascript:alert(1)", "DATA:text/html,x", " vbscript:x", "jav&#x09;ascript:x"] {
            let out = sanitize(&format!(r#"<a href="{href}" title="t">x</a>"#));
            assert_eq!(out, r#"<a title="t">x</a>"#, "href {href}");
        }
    }

    #[test]
    fn blocked_elements_are_removed_with_content() {
        let html = "<p>a</p><script>alert(1)</script><style>p{}</style>\
                    <iframe src=x>f</iframe><object>o</object><embed src=x>\
                    <form><input value=v><button>b</button>inner</form><p>b</p>";
        assert_eq!(sanitize(html), "<p>a</p><p>b</p>");
    }

    #[test]
    fn disallowed_elements_are_unwrapped_in_order() {
        assert_eq!(sanitize("<table><tr><td>x</td></tr></table>"), "x");
        assert_eq!(
            sanitize("<section>one <code>two</code> <p>three</p></section>"),
            "one two <p>three</p>"
        );
    }

    #[test]
    fn unwrapped_children_are_still_filtered() {
        assert_eq!(
            sanitize(r#"<article><div id="x" style="color:red" title="t">a<script>b</script></div></article>"#),
            r#"<div title="t">a</div>"#
        );
        assert_eq!(sanitize("<font><img src=x onerror=alert(1)>ok</font>"), "ok");
    }

    #[test]
    fn attributes_are_filtered_tag_agnostically() {
        assert_eq!(
            sanitize(r#"<span class="c" alt="a" title="t" onmouseover="x()" data-x="1">s</span>"#),
            r#"<span alt="a" title="t">s</span>"#
        );
    }

    #[test]
    fn href_on_non_anchor_is_checked_but_not_decorated() {
        assert_eq!(
            sanitize(r#"<div href="javascript:x">a</div><div href="/ok">b</div>"#),
            r#"<div>a</div><div href="/ok">b</div>"#
        );
    }

    #[test]
    fn anchor_is_decorated_only_when_href_is_kept() {
        assert_eq!(
            sanitize(r#"<svg><a href="javascript:x" xlink:href="https://e.com">x</a></svg>"#),
            r#"<a href="https://e.com" rel="noopener noreferrer" target="_blank">x</a>"#
        );
        assert_eq!(
            sanitize(r#"<svg><a xlink:href="javascript:alert(1)">x</a></svg>"#),
            "<a>x</a>"
        );
        assert_eq!(sanitize(r#"<a title="t">x</a>"#), r#"<a title="t">x</a>"#);
    }

    #[test]
    fn removed_href_output_is_stable() {
        let once = sanitize("<a title=x HREF=' javascript:1'>q</a>");
        assert_eq!(once, r#"<a title="x">q</a>"#);
        assert_eq!(sanitize(&once), once);
    }

    #[test]
    fn text_and_attributes_are_escaped() {
        assert_eq!(
            sanitize(r#"<p title="a&quot;b">1 &lt; 2 &amp; 3</p>"#),
            r#"<p title="a&quot;b">1 &lt; 2 &amp; 3</p>"#
        );
    }

    #[test]
    fn comments_are_dropped() {
        assert_eq!(sanitize("<p>a<!-- hidden -->b</p>"), "<p>ab</p>");
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let inputs = [
            r#"<p>Hi <a href="https://example.org">there</a></p>"#,
            r#"<div title="x">a<br>b</div>"#,
            "<h2>T</h2><blockquote><i>q</i> &amp; <u>u</u></blockquote>",
            "<p>x&nbsp;y</p><sup>1</sup><sub>2</sub>",
            r#"<a title="t" href="/join" target="_self" alt="a">join</a>"#,
        ];
        for input in inputs {
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once, "input {input}");
        }
    }

    #[test]
    fn excessive_nesting_is_an_error() {
        let html = format!("{}x{}", "<div>".repeat(MAX_DEPTH + 10), "</div>".repeat(MAX_DEPTH + 10));
        assert_eq!(
            StructuredProcessor.sanitize(&html),
            Err(MarkupError::TooDeep(MAX_DEPTH))
        );
    }

    #[test]
    fn text_projection_skips_scripts_and_spaces_blocks() {
        let text = StructuredProcessor
            .plain_text("<h1>Title</h1><p>A<b>B</b> &lt;c&gt;</p><script>x()</script><ul><li>1</li><li>2</li></ul>")
            .unwrap();
        assert_eq!(text.as_str(), "Title AB <c> 1 2");
    }

    #[test]
    fn empty_text_projection_is_an_error() {
        assert_eq!(
            StructuredProcessor.plain_text("<br><img src=x>"),
            Err(MarkupError::Empty)
        );
    }
}
