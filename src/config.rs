//! Adaptor settings
//!
//! Read-only configuration supplied by the caller: the thinking-adapter switch, the
//! per-model API version table, optional safety threshold and media fetch limits.
//! Settings load from YAML and accept environment overrides.
//!
//! ```yaml
//! thinking_adapter_enabled: true
//! version_settings:
//!   default: v1beta
//!   gemini-1.0-pro: v1
//! safety_threshold: BLOCK_NONE
//! media:
//!   fetch_timeout_secs: 20
//!   max_bytes: 10485760
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::path::Path;

use crate::drivers::gemini::endpoint::VersionLookup;
use crate::{Error, Result};

/// API version used when neither the model nor the `default` entry is configured.
pub const FALLBACK_API_VERSION: &str = "v1beta";

/// Key of the catch-all entry in [`GeminiSettings::version_settings`].
pub const DEFAULT_VERSION_KEY: &str = "default";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiSettings {
    /// Decode `-thinking-<budget>`, `-thinking` and `-nothinking` model-name suffixes.
    pub thinking_adapter_enabled: bool,
    /// Model id → API version segment (`v1`, `v1beta`, ...).
    pub version_settings: HashMap<String, String>,
    /// Threshold applied to every harm category (e.g., `BLOCK_NONE`); unset sends none.
    pub safety_threshold: Option<String>,
    pub media: MediaSettings,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        let mut version_settings = HashMap::new();
        version_settings.insert(
            DEFAULT_VERSION_KEY.to_string(),
            FALLBACK_API_VERSION.to_string(),
        );
        Self {
            thinking_adapter_enabled: false,
            version_settings,
            safety_threshold: None,
            media: MediaSettings::default(),
        }
    }
}

/// Limits for fetching remote images referenced by URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaSettings {
    pub fetch_timeout_secs: u64,
    pub max_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: 30,
            max_bytes: 20 * 1024 * 1024,
            proxy_url: None,
        }
    }
}

impl GeminiSettings {
    pub fn from_yaml_str(source: &str) -> Result<Self> {
        serde_yaml::from_str(source).map_err(|e| {
            Error::configuration(format!("Failed to parse gemini settings: {}", e))
        })
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&source)
    }

    /// Apply `GEMINI_*` environment overrides on top of the current values.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(enabled) = env_parse::<bool>("GEMINI_THINKING_ADAPTER_ENABLED") {
            self.thinking_adapter_enabled = enabled;
        }
        if let Ok(threshold) = env::var("GEMINI_SAFETY_THRESHOLD") {
            self.safety_threshold = Some(threshold).filter(|t| !t.is_empty());
        }
        if let Some(secs) = env_parse::<u64>("GEMINI_MEDIA_FETCH_TIMEOUT_SECS") {
            self.media.fetch_timeout_secs = secs;
        }
        if let Some(bytes) = env_parse::<u64>("GEMINI_MEDIA_MAX_BYTES") {
            self.media.max_bytes = bytes;
        }
        if let Ok(proxy) = env::var("GEMINI_MEDIA_PROXY_URL") {
            self.media.proxy_url = Some(proxy).filter(|p| !p.is_empty());
        }
        self
    }

    pub fn with_thinking_adapter(mut self, enabled: bool) -> Self {
        self.thinking_adapter_enabled = enabled;
        self
    }

    pub fn with_version(mut self, model: impl Into<String>, version: impl Into<String>) -> Self {
        self.version_settings.insert(model.into(), version.into());
        self
    }

    /// Version for `model`: exact entry, then `default`, then `v1beta`.
    pub fn version_for(&self, model: &str) -> &str {
        self.version_settings
            .get(model)
            .or_else(|| self.version_settings.get(DEFAULT_VERSION_KEY))
            .map(String::as_str)
            .unwrap_or(FALLBACK_API_VERSION)
    }
}

impl VersionLookup for GeminiSettings {
    fn api_version(&self, model: &str) -> String {
        self.version_for(model).to_string()
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_lookup_fallbacks() {
        let settings = GeminiSettings::default().with_version("gemini-1.0-pro", "v1");
        assert_eq!(settings.version_for("gemini-1.0-pro"), "v1");
        assert_eq!(settings.version_for("gemini-2.5-pro"), "v1beta");

        let mut bare = GeminiSettings::default();
        bare.version_settings.clear();
        assert_eq!(bare.version_for("anything"), FALLBACK_API_VERSION);
    }

    #[test]
    fn test_from_yaml() {
        let settings = GeminiSettings::from_yaml_str(
            r#"
thinking_adapter_enabled: true
version_settings:
  default: v1
  imagen-3.0-generate-002: v1beta
media:
  max_bytes: 1024
"#,
        )
        .unwrap();
        assert!(settings.thinking_adapter_enabled);
        assert_eq!(settings.version_for("gemini-2.0-flash"), "v1");
        assert_eq!(settings.version_for("imagen-3.0-generate-002"), "v1beta");
        assert_eq!(settings.media.max_bytes, 1024);
        assert_eq!(settings.media.fetch_timeout_secs, 30);
        assert!(settings.safety_threshold.is_none());
    }

    #[test]
    fn test_from_yaml_rejects_bad_types() {
        let err = GeminiSettings::from_yaml_str("thinking_adapter_enabled: [1]").unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }
}
