// src/handlers/content.rs

use axum::{Json, response::IntoResponse};
use validator::Validate;

use crate::{
    error::AppError,
    models::content::{
        ArticleRenderRequest, DEFAULT_EXCERPT_LENGTH, PlainTextResponse, RenderedArticle,
        RichTextRequest, SanitizedResponse,
    },
    utils::html::{PlainText, sanitize, to_plain_text},
};

/// Filters untrusted HTML down to the allow-listed subset.
#[utoipa::path(
    post,
    path = "/api/content/sanitize",
    request_body = RichTextRequest,
    responses(
        (status = 200, description = "Sanitized HTML", body = SanitizedResponse),
        (status = 400, description = "Payload failed validation")
    )
)]
pub async fn sanitize_html(
    Json(payload): Json<RichTextRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let html = sanitize(payload.html.as_deref().unwrap_or_default());
    tracing::debug!("Sanitized rich text into {} bytes", html.as_str().len());

    Ok(Json(SanitizedResponse { html }))
}

/// Strips markup and returns normalized text.
#[utoipa::path(
    post,
    path = "/api/content/plain-text",
    request_body = RichTextRequest,
    responses(
        (status = 200, description = "Plain text projection", body = PlainTextResponse),
        (status = 400, description = "Payload failed validation")
    )
)]
pub async fn plain_text(
    Json(payload): Json<RichTextRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let text = to_plain_text(payload.html.as_deref().unwrap_or_default());

    Ok(Json(PlainTextResponse { text }))
}

/// Renders an article for display: safe body, plain title and a short excerpt.
#[utoipa::path(
    post,
    path = "/api/content/article",
    request_body = ArticleRenderRequest,
    responses(
        (status = 200, description = "Rendered article", body = RenderedArticle),
        (status = 400, description = "Payload failed validation")
    )
)]
pub async fn render_article(
    Json(payload): Json<ArticleRenderRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let title = to_plain_text(&payload.title);
    if title.is_empty() {
        return Err(AppError::BadRequest(
            "Title must contain visible text".to_string(),
        ));
    }

    let body_source = payload.body.as_deref().unwrap_or_default();
    let body = sanitize(body_source);
    let text = to_plain_text(body_source);
    let max_chars = payload.excerpt_length.unwrap_or(DEFAULT_EXCERPT_LENGTH);

    Ok(Json(RenderedArticle {
        title,
        body,
        excerpt: excerpt(&text, max_chars),
        word_count: text.as_str().split(' ').filter(|w| !w.is_empty()).count(),
    }))
}

/// Cuts `text` to at most `max_chars` characters, preferring a word boundary.
/// A trailing ellipsis (counted in the limit) marks truncation.
fn excerpt(text: &PlainText, max_chars: usize) -> String {
    let text = text.as_str();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let budget = max_chars.saturating_sub(1);
    let cut = text
        .char_indices()
        .nth(budget)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let head = &text[..cut];

    // Break at the last space only if the cut landed inside a word.
    let head = if text[cut..].starts_with(' ') {
        head
    } else {
        match head.rfind(' ') {
            Some(space) if space > 0 => &head[..space],
            _ => head,
        }
    };

    format!("{}…", head.trim_end())
}
