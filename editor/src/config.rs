use std::time::Duration;

use url::Url;

use crate::layout::{LayoutPolicy, MICRO_DISPLAY_BELOW, SMALL_DISPLAY_BELOW};

const DEFAULT_API_URL: &str = "http://localhost:8080/";
const DEFAULT_OWNER_TAG: &str = "editor";

#[derive(Debug, Clone)]
pub struct EditorConfig {
    /// Base URL of the CMS API (`api/edit/*`, `api/files/*` are joined onto it)
    pub api_base_url: Url,
    /// Public URL of the site; preview links are made absolute against it
    pub site_base_url: Url,
    /// Optional bearer token for API requests
    pub api_token: Option<String>,
    pub request_timeout: Duration,
    /// Upload body chunk size; one progress report per chunk
    pub upload_chunk_bytes: usize,
    pub layout: LayoutPolicy,
    /// Tag the session registers its listeners under
    pub owner_tag: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        let local = Url::parse(DEFAULT_API_URL).expect("default URL is valid");
        Self {
            api_base_url: local.clone(),
            site_base_url: local,
            api_token: None,
            request_timeout: Duration::from_secs(30),
            upload_chunk_bytes: 64 * 1024,
            layout: LayoutPolicy::default(),
            owner_tag: DEFAULT_OWNER_TAG.to_string(),
        }
    }
}

impl EditorConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let api_base_url = base_url(
            "SITE_EDITOR_API_URL",
            &lookup("SITE_EDITOR_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        )?;
        let site_base_url = match lookup("SITE_EDITOR_SITE_URL") {
            Some(raw) => base_url("SITE_EDITOR_SITE_URL", &raw)?,
            None => api_base_url.clone(),
        };

        let upload_chunk_bytes = parse_or(&lookup, "SITE_EDITOR_UPLOAD_CHUNK_BYTES", 64 * 1024)?;
        if upload_chunk_bytes == 0 {
            anyhow::bail!("SITE_EDITOR_UPLOAD_CHUNK_BYTES must be greater than zero");
        }

        Ok(Self {
            api_base_url,
            site_base_url,
            api_token: lookup("SITE_EDITOR_API_TOKEN").filter(|t| !t.trim().is_empty()),
            request_timeout: Duration::from_secs(parse_or(&lookup, "SITE_EDITOR_TIMEOUT_SECS", 30)?),
            upload_chunk_bytes,
            layout: LayoutPolicy {
                small_below: parse_or(&lookup, "SITE_EDITOR_SMALL_BELOW", SMALL_DISPLAY_BELOW)?,
                micro_below: parse_or(&lookup, "SITE_EDITOR_MICRO_BELOW", MICRO_DISPLAY_BELOW)?,
            },
            owner_tag: lookup("SITE_EDITOR_OWNER_TAG")
                .unwrap_or_else(|| DEFAULT_OWNER_TAG.to_string()),
        })
    }
}

/// Parse a base URL, forcing a trailing slash so relative joins append.
fn base_url(key: &str, raw: &str) -> anyhow::Result<Url> {
    let mut url = Url::parse(raw.trim())
        .map_err(|e| anyhow::anyhow!("Failed to parse env var {key}={raw}: {e}"))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(val) => val
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Failed to parse env var {key}={val}: {e}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EditorConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.api_base_url.as_str(), "http://localhost:8080/");
        assert_eq!(config.site_base_url, config.api_base_url);
        assert_eq!(config.layout, LayoutPolicy::default());
        assert_eq!(config.owner_tag, "editor");
        assert!(config.api_token.is_none());
    }

    #[test]
    fn test_base_urls_gain_trailing_slash() {
        let config = EditorConfig::from_lookup(lookup(&[
            ("SITE_EDITOR_API_URL", "https://cms.example.com/v1"),
            ("SITE_EDITOR_SITE_URL", "https://colin.example.com"),
        ]))
        .unwrap();
        assert_eq!(config.api_base_url.as_str(), "https://cms.example.com/v1/");
        assert_eq!(config.site_base_url.as_str(), "https://colin.example.com/");
    }

    #[test]
    fn test_overrides_and_bad_values() {
        let config = EditorConfig::from_lookup(lookup(&[
            ("SITE_EDITOR_SMALL_BELOW", "900"),
            ("SITE_EDITOR_API_TOKEN", "secret"),
            ("SITE_EDITOR_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.layout.small_below, 900);
        assert_eq!(config.api_token.as_deref(), Some("secret"));
        assert_eq!(config.request_timeout, Duration::from_secs(5));

        assert!(EditorConfig::from_lookup(lookup(&[("SITE_EDITOR_MICRO_BELOW", "wide")])).is_err());
        assert!(EditorConfig::from_lookup(lookup(&[("SITE_EDITOR_API_URL", "not a url")])).is_err());
        assert!(
            EditorConfig::from_lookup(lookup(&[("SITE_EDITOR_UPLOAD_CHUNK_BYTES", "0")])).is_err()
        );
    }
}
