// src/models/content.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::utils::html::{PlainText, SafeHtml};

/// Default excerpt length for article previews, in characters.
pub const DEFAULT_EXCERPT_LENGTH: usize = 160;

/// Untrusted HTML submitted for rendering.
/// A missing or null `html` is treated as empty.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RichTextRequest {
    #[serde(default)]
    #[validate(length(max = 200000, message = "Rich text must be at most 200000 chars"))]
    pub html: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SanitizedResponse {
    #[schema(value_type = String)]
    pub html: SafeHtml,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PlainTextResponse {
    #[schema(value_type = String)]
    pub text: PlainText,
}

/// An article body as stored by authors, to be rendered for a page.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ArticleRenderRequest {
    #[validate(length(
        min = 1,
        max = 200,
        message = "Title length must be between 1 and 200 chars"
    ))]
    pub title: String,

    #[serde(default)]
    #[validate(length(max = 200000, message = "Article body must be at most 200000 chars"))]
    pub body: Option<String>,

    /// Maximum excerpt length in characters (default: 160).
    #[validate(range(min = 20, max = 1000))]
    pub excerpt_length: Option<usize>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RenderedArticle {
    #[schema(value_type = String)]
    pub title: PlainText,

    #[schema(value_type = String)]
    pub body: SafeHtml,

    /// Plain-text preview cut at a word boundary.
    pub excerpt: String,

    pub word_count: usize,
}
