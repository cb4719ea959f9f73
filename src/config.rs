// src/config.rs

use std::{env, net::SocketAddr, time::Duration};

use dotenvy::dotenv;

/// Favicon sources tried in order. `{domain}` and `{size}` are substituted per request.
pub const DEFAULT_FAVICON_SOURCES: &[&str] = &[
    "https://www.google.com/s2/favicons?domain={domain}&sz={size}",
    "https://icons.duckduckgo.com/ip3/{domain}.ico",
    "https://{domain}/favicon.ico",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub rust_log: String,
    /// Directory for the daily rolling log file.
    pub log_dir: String,
    pub cors_origins: Vec<String>,
    pub favicon: FaviconConfig,
}

#[derive(Debug, Clone)]
pub struct FaviconConfig {
    pub sources: Vec<String>,
    pub timeout: Duration,
    /// Upstream icons larger than this are rejected.
    pub max_bytes: usize,
}

impl Default for FaviconConfig {
    fn default() -> Self {
        Self {
            sources: DEFAULT_FAVICON_SOURCES.iter().map(|s| s.to_string()).collect(),
            timeout: Duration::from_secs(5),
            max_bytes: 256 * 1024,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            rust_log: "info".to_string(),
            log_dir: "logs".to_string(),
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            favicon: FaviconConfig::default(),
        }
    }
}

impl Config {
    /// Reads configuration from the environment (and `.env`, if present).
    /// Unset variables fall back to [`Config::default`].
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenv().ok();

        let mut config = Self::default();

        if let Ok(addr) = env::var("BIND_ADDR") {
            config.bind_addr = addr
                .parse()
                .map_err(|e| format!("BIND_ADDR '{}' is invalid: {}", addr, e))?;
        }

        if let Ok(level) = env::var("RUST_LOG") {
            config.rust_log = level;
        }

        if let Ok(dir) = env::var("LOG_DIR") {
            config.log_dir = dir;
        }

        if let Ok(origins) = env::var("CORS_ORIGINS") {
            config.cors_origins = split_list(&origins);
        }

        if let Ok(sources) = env::var("FAVICON_SOURCES") {
            let sources = split_list(&sources);
            if sources.is_empty() {
                return Err("FAVICON_SOURCES must list at least one source".into());
            }
            config.favicon.sources = sources;
        }

        if let Ok(secs) = env::var("FAVICON_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .map_err(|e| format!("FAVICON_TIMEOUT_SECS '{}' is invalid: {}", secs, e))?;
            config.favicon.timeout = Duration::from_secs(secs);
        }

        if let Ok(bytes) = env::var("FAVICON_MAX_BYTES") {
            config.favicon.max_bytes = bytes
                .parse()
                .map_err(|e| format!("FAVICON_MAX_BYTES '{}' is invalid: {}", bytes, e))?;
        }

        Ok(config)
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_list_trims_and_skips_blanks() {
        assert_eq!(
            split_list(" http://a.org , ,http://b.org,"),
            vec!["http://a.org".to_string(), "http://b.org".to_string()]
        );
    }

    #[test]
    fn defaults_cover_every_favicon_source() {
        let config = Config::default();
        assert_eq!(config.favicon.sources.len(), DEFAULT_FAVICON_SOURCES.len());
        assert_eq!(config.bind_addr.port(), 3000);
    }
}
