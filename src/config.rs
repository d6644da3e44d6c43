//! Client configuration
//!
//! Settings come from, in increasing precedence: defaults, a TOML file,
//! `LFVIEW_*` environment variables, and builder calls. TOML values may
//! reference environment variables as `${NAME}`.

use crate::compression::CompressionLevel;
use crate::error::{ClientError, Result};
use crate::urls::{validate_endpoint, DEFAULT_ENDPOINT};
use crate::utils::validate_chunk_size;
use crate::{CHUNK_SIZE, DEFAULT_SOURCE};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const ENV_API_KEY: &str = "LFVIEW_API_KEY";
pub const ENV_ENDPOINT: &str = "LFVIEW_ENDPOINT";
pub const ENV_SOURCE: &str = "LFVIEW_SOURCE";

/// Default number of concurrent uploads
pub const DEFAULT_WORKERS: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the LF View API
    pub endpoint: String,
    pub api_key: Option<String>,
    /// Provenance header sent with every request; empty removes it
    pub source: Option<String>,
    pub chunk_size: usize,
    pub parallel: bool,
    pub workers: usize,
    pub compression_level: CompressionLevel,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            source: Some(DEFAULT_SOURCE.to_string()),
            chunk_size: CHUNK_SIZE,
            parallel: true,
            workers: DEFAULT_WORKERS,
            compression_level: CompressionLevel::default(),
        }
    }
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::default().with_api_key(api_key)
    }

    /// Defaults overridden by the environment
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(|name| std::env::var(name).ok());
        config
    }

    /// Load a TOML file, then apply environment overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = substitute_env_vars(content)?;
        let mut config: Self = toml::from_str(&processed)
            .map_err(|e| ClientError::Configuration(format!("TOML parsing error: {}", e)))?;
        config.normalize();
        Ok(config)
    }

    /// Override fields from `LFVIEW_*` variables found by `lookup`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ENV_API_KEY) {
            self.api_key = Some(key);
        }
        if let Some(endpoint) = lookup(ENV_ENDPOINT) {
            self.endpoint = endpoint;
        }
        if let Some(source) = lookup(ENV_SOURCE) {
            self.source = Some(source);
        }
        self.normalize();
    }

    fn normalize(&mut self) {
        self.endpoint = self.endpoint.trim_end_matches('/').to_string();
        if self.source.as_deref().is_some_and(str::is_empty) {
            self.source = None;
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self.normalize();
        self
    }

    pub fn with_source(mut self, source: Option<String>) -> Self {
        self.source = source;
        self.normalize();
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Concurrent uploads actually allowed
    pub fn effective_workers(&self) -> usize {
        if self.parallel {
            self.workers.max(1)
        } else {
            1
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_endpoint(&self.endpoint)?;
        match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() && !key.contains("${") => {}
            _ => {
                return Err(ClientError::Configuration(
                    "User not logged in - please set api_key".to_string(),
                ))
            }
        }
        validate_chunk_size(self.chunk_size)?;
        if self.workers == 0 {
            return Err(ClientError::Configuration(
                "workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Replace `${NAME}` with environment values; unknown names are kept
fn substitute_env_vars(content: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([^}]+)\}")
        .map_err(|e| ClientError::Configuration(e.to_string()))?;
    let result = re.replace_all(content, |caps: &regex::Captures| {
        let name = &caps[1];
        std::env::var(name).unwrap_or_else(|_| format!("${{{}}}", name))
    });
    Ok(result.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.endpoint, "https://lfview.com");
        assert_eq!(config.chunk_size, 80 * 256 * 1024);
        assert_eq!(config.workers, 100);
        assert!(config.source.as_deref().unwrap().starts_with("Rust API Client v"));
        assert!(config.validate().is_err());
        assert!(ClientConfig::new("my_key").validate().is_ok());
    }

    #[test]
    fn test_parse_toml() {
        let config = ClientConfig::from_toml_str(
            r#"
endpoint = "https://example.com/"
api_key = "abc123"
source = ""
workers = 4
compression_level = 9
"#,
        )
        .unwrap();
        assert_eq!(config.endpoint, "https://example.com");
        assert_eq!(config.api_key.as_deref(), Some("abc123"));
        assert_eq!(config.source, None);
        assert_eq!(config.workers, 4);
        assert_eq!(config.compression_level, CompressionLevel::best());
        assert_eq!(config.chunk_size, CHUNK_SIZE);
        config.validate().unwrap();
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("LFVIEW_TEST_SUBSTITUTED_KEY", "from-env");
        let config = ClientConfig::from_toml_str(
            r#"api_key = "${LFVIEW_TEST_SUBSTITUTED_KEY}""#,
        )
        .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("from-env"));

        let missing = ClientConfig::from_toml_str(r#"api_key = "${LFVIEW_TEST_NEVER_SET}""#).unwrap();
        assert_eq!(missing.api_key.as_deref(), Some("${LFVIEW_TEST_NEVER_SET}"));
        assert!(missing.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ClientConfig::new("file-key");
        config.apply_env(|name| match name {
            ENV_API_KEY => Some("env-key".to_string()),
            ENV_ENDPOINT => Some("http://localhost:8000/".to_string()),
            _ => None,
        });
        assert_eq!(config.api_key.as_deref(), Some("env-key"));
        assert_eq!(config.endpoint, "http://localhost:8000");
        assert!(config.source.is_some());
    }

    #[test]
    fn test_validation() {
        let config = ClientConfig::new("key");
        assert!(config.clone().with_chunk_size(1000).validate().is_err());
        assert!(config.clone().with_workers(0).validate().is_err());
        assert!(config.clone().with_endpoint("lfview.com").validate().is_err());
        assert_eq!(config.clone().with_parallel(false).effective_workers(), 1);
    }

    #[test]
    fn test_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "api_key = \"file-key\"\nparallel = false").unwrap();
        let config = ClientConfig::from_file(file.path()).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("file-key"));
        assert!(!config.parallel);
        assert!(ClientConfig::from_file("/nonexistent/lfview.toml").is_err());
    }
}
