//! Client configuration and factory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use trainhub_core::progress::ProgressPolicy;

use crate::http::{HttpClient, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS};

/// Top-level trainhub configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainhubConfig {
    /// Root URL of the backend; `/api` is appended per request.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Where the session token is persisted between invocations.
    #[serde(default = "default_token_path")]
    pub token_path: PathBuf,
    #[serde(default)]
    pub progress: ProgressPolicy,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
fn default_token_path() -> PathBuf {
    match dirs_path() {
        Some(dir) => dir.join("token.json"),
        None => PathBuf::from(".trainhub-token.json"),
    }
}

impl Default for TrainhubConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            token_path: default_token_path(),
            progress: ProgressPolicy::default(),
        }
    }
}

impl TrainhubConfig {
    /// Build the HTTP client this configuration describes.
    pub fn client(&self) -> Result<HttpClient> {
        HttpClient::new(&self.base_url, self.timeout_secs)
            .with_context(|| format!("cannot use backend at {}", self.base_url))
    }
}

/// Expand `${VAR}` and `${VAR:-fallback}` from the environment.
///
/// Unset variables without a fallback expand to nothing. An unterminated
/// `${` is kept as written.
fn resolve_env_vars(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start + 2..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let reference = &rest[start + 2..start + 2 + len];
        let (name, fallback) = match reference.split_once(":-") {
            Some((name, fallback)) => (name, fallback),
            None => (reference, ""),
        };
        match std::env::var(name) {
            Ok(value) if !value.is_empty() => out.push_str(&value),
            _ => out.push_str(fallback),
        }
        rest = &rest[start + 3 + len..];
    }
    out.push_str(rest);
    out
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `trainhub.toml` in the current directory
/// 2. `~/.config/trainhub/config.toml`
///
/// Environment variable overrides: `TRAINHUB_BASE_URL`, `TRAINHUB_TOKEN_PATH`.
pub fn load_config() -> Result<TrainhubConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<TrainhubConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("trainhub.toml");
        if local.exists() {
            Some(local)
        } else if let Some(home) = dirs_path() {
            let global = home.join("config.toml");
            if global.exists() {
                Some(global)
            } else {
                None
            }
        } else {
            None
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            tracing::debug!(path = %path.display(), "loaded config");
            toml::from_str::<TrainhubConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => TrainhubConfig::default(),
    };

    // Apply env var overrides
    if let Ok(url) = std::env::var("TRAINHUB_BASE_URL") {
        config.base_url = url;
    }
    if let Ok(token_path) = std::env::var("TRAINHUB_TOKEN_PATH") {
        config.token_path = PathBuf::from(token_path);
    }

    config.base_url = resolve_env_vars(&config.base_url);
    config.token_path = PathBuf::from(resolve_env_vars(&config.token_path.to_string_lossy()));

    if config.timeout_secs == 0 {
        anyhow::bail!("timeout_secs must be at least 1");
    }

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("trainhub"))
}

/// Sample configuration written by `trainhub init`.
pub const SAMPLE_CONFIG: &str = r#"# trainhub configuration

# Root URL of the training backend.
base_url = "http://localhost:8001"

# Per-request timeout in seconds.
timeout_secs = 30

# Session token location. ${VAR} references are expanded.
# token_path = "${HOME}/.config/trainhub/token.json"

[progress]
sample_interval_secs = 10.0
completion_threshold = 95
image_time_spent_secs = 30
pdf_time_spent_secs = 300
document_time_spent_secs = 180
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_TRAINHUB_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_TRAINHUB_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_TRAINHUB_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        assert_eq!(resolve_env_vars("${unterminated"), "${unterminated");
        assert_eq!(resolve_env_vars("a${_TRAINHUB_UNSET_VAR}b"), "ab");
        assert_eq!(
            resolve_env_vars("${_TRAINHUB_UNSET_VAR:-http://localhost:8001}"),
            "http://localhost:8001"
        );
        assert_eq!(resolve_env_vars("${_TRAINHUB_TEST_VAR:-x}"), "hello");
        std::env::remove_var("_TRAINHUB_TEST_VAR");
    }

    #[test]
    fn default_config() {
        let config = TrainhubConfig::default();
        assert_eq!(config.base_url, "http://localhost:8001");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.progress.completion_threshold, 95);
        assert!(config.token_path.ends_with("token.json"));
    }

    #[test]
    fn sample_config_parses() {
        let config: TrainhubConfig = toml::from_str(SAMPLE_CONFIG).unwrap();
        assert_eq!(config.progress, ProgressPolicy::default());
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn partial_progress_table() {
        let config: TrainhubConfig = toml::from_str(
            r#"
base_url = "https://training.example.com"

[progress]
pdf_time_spent_secs = 600
"#,
        )
        .unwrap();
        assert_eq!(config.base_url, "https://training.example.com");
        assert_eq!(config.progress.pdf_time_spent_secs, 600);
        assert_eq!(config.progress.sample_interval_secs, 10.0);
    }

    #[test]
    fn explicit_path_must_exist() {
        let err = load_config_from(Some(Path::new("/nonexistent/trainhub.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn explicit_path_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "base_url = \"http://10.0.0.5:9000\"\ntimeout_secs = 5\n",
        )
        .unwrap();

        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.timeout_secs, 5);
        assert!(config.client().is_ok());
    }

    #[test]
    fn zero_timeout_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "timeout_secs = 0\n").unwrap();
        assert!(load_config_from(Some(&path)).is_err());
    }
}
