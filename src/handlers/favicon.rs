// src/handlers/favicon.rs

use std::net::IpAddr;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{self, StatusCode, header},
    response::Response,
};
use reqwest::redirect::{Attempt, Policy};
use serde::Deserialize;
use url::{Host, Url};
use utoipa::IntoParams;

use crate::{config::Config, error::AppError};

const DEFAULT_SIZE: u16 = 64;
const MIN_SIZE: u16 = 16;
const MAX_SIZE: u16 = 256;

const MAX_REDIRECTS: usize = 3;

const UPSTREAM_CACHE: &str = "public, max-age=86400";
const FALLBACK_CACHE: &str = "public, max-age=3600";

/// Served when no upstream source produced an icon.
pub const FALLBACK_ICON: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 64 64"><rect width="64" height="64" rx="12" fill="#d9dee7"/><circle cx="32" cy="32" r="18" fill="none" stroke="#6b7686" stroke-width="4"/><path d="M14 32h36M32 14c-6 6-8 12-8 18s2 12 8 18c6-6 8-12 8-18s-2-12-8-18z" fill="none" stroke="#6b7686" stroke-width="3"/></svg>"##;

/// Query parameters for the favicon proxy.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FaviconParams {
    /// Host name whose icon is wanted, e.g. `example.org`.
    pub domain: Option<String>,
    /// Requested edge length in pixels (default: 64, clamped to 16..=256).
    pub size: Option<u16>,
}

/// Fetches a site's favicon through the configured sources, falling back to a
/// built-in placeholder.
#[utoipa::path(
    get,
    path = "/api/favicon",
    params(FaviconParams),
    responses(
        (status = 200, description = "Icon image (upstream or placeholder)"),
        (status = 400, description = "Missing or invalid domain")
    )
)]
pub async fn get_favicon(
    State(config): State<Config>,
    State(http): State<reqwest::Client>,
    Query(params): Query<FaviconParams>,
) -> Result<Response, AppError> {
    let domain = params
        .domain
        .as_deref()
        .ok_or(AppError::BadRequest("domain is required".to_string()))?;
    let domain = normalize_domain(domain)?;
    let size = params.size.unwrap_or(DEFAULT_SIZE).clamp(MIN_SIZE, MAX_SIZE);

    for template in &config.favicon.sources {
        let source = expand_source(template, &domain, size);
        match fetch_icon(&http, &source, config.favicon.max_bytes).await {
            Ok((content_type, bytes)) => {
                tracing::debug!("Favicon for {} served from {}", domain, source);
                return Ok(http::Response::builder()
                    .status(StatusCode::OK)
                    .header(header::CONTENT_TYPE, content_type)
                    .header(header::CACHE_CONTROL, UPSTREAM_CACHE)
                    .body(Body::from(bytes))?);
            }
            Err(reason) => {
                tracing::debug!("Favicon source {} failed: {}", source, reason);
            }
        }
    }

    tracing::warn!("No favicon source answered for {}, serving placeholder", domain);
    Ok(http::Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "image/svg+xml")
        .header(header::CACHE_CONTROL, FALLBACK_CACHE)
        .body(Body::from(FALLBACK_ICON))?)
}

/// Accepts a bare DNS host name (`example.org`) and returns it lowercased.
///
/// Rejects anything that would let the proxy reach an arbitrary endpoint:
/// schemes, ports, paths, credentials, IP literals and single-label hosts.
pub fn normalize_domain(raw: &str) -> Result<String, AppError> {
    let invalid = || AppError::BadRequest(format!("'{}' is not a valid domain", raw));

    let raw = raw.trim().trim_end_matches('.');
    if raw.is_empty() || raw.len() > 253 || raw.parse::<IpAddr>().is_ok() {
        return Err(invalid());
    }
    if !raw
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
    {
        return Err(invalid());
    }

    let url = Url::parse(&format!("https://{}/", raw)).map_err(|_| invalid())?;
    let host = match url.host() {
        Some(Host::Domain(host)) => host.to_string(),
        _ => return Err(invalid()),
    };

    let labels_ok = host
        .split('.')
        .all(|l| !l.is_empty() && l.len() <= 63 && !l.starts_with('-') && !l.ends_with('-'));
    if !labels_ok || !host.contains('.') || url.port().is_some() {
        return Err(invalid());
    }
    Ok(host)
}

/// Redirect policy for upstream fetches.
///
/// Configured sources are trusted, but where they redirect to is not: only a
/// few hops to default-port http(s) URLs on public host names are followed.
/// Anything else stops, and the redirect response itself counts as a failure.
pub fn redirect_policy() -> Policy {
    Policy::custom(|attempt: Attempt<'_>| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error("too many redirects");
        }
        let url = attempt.url();
        let public_host = matches!(
            url.host(),
            Some(Host::Domain(host)) if host.contains('.') && !host.ends_with(".localhost")
        );
        if matches!(url.scheme(), "http" | "https") && url.port().is_none() && public_host {
            attempt.follow()
        } else {
            attempt.stop()
        }
    })
}

fn expand_source(template: &str, domain: &str, size: u16) -> String {
    template
        .replace("{domain}", domain)
        .replace("{size}", &size.to_string())
}

/// Fetches one source. Returns the content type and body when the answer looks
/// like a usable image.
async fn fetch_icon(
    http: &reqwest::Client,
    source: &str,
    max_bytes: usize,
) -> Result<(String, Vec<u8>), String> {
    let mut response = http.get(source).send().await.map_err(|e| e.to_string())?;

    let status = response.status();
    if !status.is_success() {
        return Err(format!("status {}", status));
    }

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    if !content_type.to_ascii_lowercase().starts_with("image/") {
        return Err(format!("content type '{}' is not an image", content_type));
    }

    if response
        .content_length()
        .is_some_and(|len| len > max_bytes as u64)
    {
        return Err("declared length exceeds limit".to_string());
    }

    // Content-Length may be absent (chunked), so the limit is enforced while reading.
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(|e| e.to_string())? {
        if body.len() + chunk.len() > max_bytes {
            return Err(format!("body exceeds {} bytes", max_bytes));
        }
        body.extend_from_slice(&chunk);
    }
    if body.is_empty() {
        return Err("empty body".to_string());
    }

    Ok((content_type, body))
}
