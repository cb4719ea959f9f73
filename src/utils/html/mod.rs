// src/utils/html/mod.rs

//! Rich-text handling for article bodies and form submissions.
//!
//! Untrusted HTML goes through one of two entry points before it reaches a page:
//!
//! * [`sanitize`] produces [`SafeHtml`]: an allow-listed subset of markup that can be
//!   injected into a rendered document.
//! * [`to_plain_text`] produces [`PlainText`]: all markup removed, entities decoded and
//!   whitespace collapsed.
//!
//! The work is done by a [`MarkupProcessor`]. When the crate is built with the `dom`
//! feature the parser-backed processor is used; otherwise a conservative regex pass runs.

mod fallback;
#[cfg(feature = "dom")]
mod structured;

use std::fmt;

use serde::Serialize;

pub use fallback::RegexProcessor;
#[cfg(feature = "dom")]
pub use structured::StructuredProcessor;

/// Elements dropped together with everything inside them.
pub const BLOCKED_TAGS: &[&str] = &[
    "script", "style", "iframe", "object", "embed", "form", "input", "button",
];

/// Elements kept as-is. Anything else is unwrapped (its children take its place).
pub const ALLOWED_TAGS: &[&str] = &[
    "p",
    "br",
    "strong",
    "b",
    "em",
    "i",
    "u",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "ul",
    "ol",
    "li",
    "blockquote",
    "a",
    "span",
    "div",
    "sup",
    "sub",
];

/// Attributes kept on any surviving element.
pub const ALLOWED_ATTRIBUTES: &[&str] = &["href", "target", "rel", "alt", "title"];

/// URL schemes that cause an `href` to be removed.
pub const BLOCKED_SCHEMES: &[&str] = &["javascript:", "data:", "vbscript:"];

/// HTML that passed the allow-list filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SafeHtml(String);

impl SafeHtml {
    pub(crate) fn new(html: String) -> Self {
        Self(html)
    }

    /// Escapes plain text so it can stand in for markup.
    pub fn from_text(text: &PlainText) -> Self {
        let mut out = String::with_capacity(text.as_str().len());
        escape_text(text.as_str(), &mut out);
        Self(out)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SafeHtml {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SafeHtml {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Markup-free, entity-decoded text with single spaces between words.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PlainText(String);

impl PlainText {
    /// Collapses whitespace runs to one space and trims both ends.
    pub(crate) fn normalized(raw: &str) -> Self {
        Self(raw.split_whitespace().collect::<Vec<_>>().join(" "))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for PlainText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PlainText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Failure inside a processor. Never escapes [`sanitize`] or [`to_plain_text`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupError {
    /// Element nesting exceeded the processor's limit.
    TooDeep(usize),
    /// The processor produced nothing usable.
    Empty,
}

impl fmt::Display for MarkupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkupError::TooDeep(limit) => write!(f, "markup nested deeper than {limit} levels"),
            MarkupError::Empty => write!(f, "markup produced no output"),
        }
    }
}

impl std::error::Error for MarkupError {}

/// A way of turning untrusted HTML into its safe projections.
pub trait MarkupProcessor: Send + Sync {
    fn name(&self) -> &'static str;

    fn sanitize(&self, html: &str) -> Result<SafeHtml, MarkupError>;

    fn plain_text(&self, html: &str) -> Result<PlainText, MarkupError>;
}

/// Returns the strongest processor this build can run.
pub fn processor() -> &'static dyn MarkupProcessor {
    #[cfg(feature = "dom")]
    {
        &StructuredProcessor
    }
    #[cfg(not(feature = "dom"))]
    {
        &RegexProcessor
    }
}

/// Filters untrusted HTML down to the allow-listed subset.
///
/// Never fails: if the processor cannot handle the input, the result is the
/// escaped plain-text projection of it.
pub fn sanitize(html: &str) -> SafeHtml {
    if html.is_empty() {
        return SafeHtml::default();
    }

    let processor = processor();
    match processor.sanitize(html) {
        Ok(safe) => safe,
        Err(e) => {
            tracing::warn!(
                "{} sanitizer failed ({}), degrading to plain text",
                processor.name(),
                e
            );
            SafeHtml::from_text(&to_plain_text(html))
        }
    }
}

/// Strips all markup, decodes entities and normalizes whitespace.
pub fn to_plain_text(html: &str) -> PlainText {
    if html.is_empty() {
        return PlainText::default();
    }

    match processor().plain_text(html) {
        Ok(text) if !text.is_empty() => text,
        _ => RegexProcessor.plain_text(html).unwrap_or_default(),
    }
}

/// True when `href` would execute or embed content instead of navigating.
///
/// ASCII whitespace and control characters are ignored, matching how browsers
/// read the scheme.
pub fn is_blocked_href(href: &str) -> bool {
    let compact: String = href
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_ascii_control())
        .take(16)
        .collect::<String>()
        .to_ascii_lowercase();

    BLOCKED_SCHEMES
        .iter()
        .any(|scheme| compact.starts_with(scheme))
}

// Text nodes never need `"` escaped and quoted attribute values never need `<`.
pub(crate) fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}

pub(crate) fn escape_attribute(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}
