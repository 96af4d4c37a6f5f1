//! Configuration loading and parsing.
//!
//! Parses `ghostline.toml` (or an override path provided by the binary)
//! extracting the suggestion policy knobs: debounce quiet period, short-input
//! threshold, suggestion endpoint, and the storage directory. Unknown fields
//! are ignored (TOML deserialization tolerance) so the file can evolve
//! forward without warnings, and a missing or unparsable file falls back to
//! defaults — configuration is never a fatal path.

use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
pub struct SuggestConfig {
    /// Quiet period after the last edit before a fetch is issued.
    #[serde(default = "SuggestConfig::default_debounce_ms")]
    pub debounce_ms: u64,
    /// Minimum document length (in characters) required to fetch. Shorter
    /// documents clear the suggestion instead.
    #[serde(default = "SuggestConfig::default_min_chars")]
    pub min_chars: usize,
    /// Suggestion endpoint receiving `POST { "code": ... }`.
    #[serde(default = "SuggestConfig::default_endpoint")]
    pub endpoint: String,
}

impl Default for SuggestConfig {
    fn default() -> Self {
        Self {
            debounce_ms: Self::default_debounce_ms(),
            min_chars: Self::default_min_chars(),
            endpoint: Self::default_endpoint(),
        }
    }
}

impl SuggestConfig {
    const fn default_debounce_ms() -> u64 {
        600
    }
    const fn default_min_chars() -> usize {
        5
    }
    fn default_endpoint() -> String {
        "http://127.0.0.1:8090/suggest".to_string()
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct StorageConfig {
    /// Directory for persisted per-language documents. Defaults to
    /// `<platform data dir>/ghostline` when absent.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ConfigFile {
    #[serde(default)]
    pub suggest: SuggestConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub raw: Option<String>, // original file string (optional)
    pub file: ConfigFile,    // parsed (or default) data
}

impl Config {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.file.suggest.debounce_ms)
    }

    pub fn min_chars(&self) -> usize {
        self.file.suggest.min_chars
    }

    pub fn endpoint(&self) -> &str {
        &self.file.suggest.endpoint
    }

    /// Effective storage directory: configured value, else platform data
    /// dir, else a dot-directory in the working directory.
    pub fn storage_dir(&self) -> PathBuf {
        if let Some(dir) = &self.file.storage.dir {
            return dir.clone();
        }
        if let Some(dir) = dirs::data_dir() {
            return dir.join("ghostline");
        }
        PathBuf::from(".ghostline")
    }
}

/// Best-effort config path following platform conventions: prefer a local
/// `ghostline.toml`, then the platform config dir.
pub fn discover() -> PathBuf {
    let local = PathBuf::from("ghostline.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("ghostline").join("ghostline.toml");
    }
    PathBuf::from("ghostline.toml")
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    if let Ok(content) = fs::read_to_string(&path) {
        match toml::from_str::<ConfigFile>(&content) {
            Ok(file) => {
                info!(
                    target: "config",
                    path = %path.display(),
                    debounce_ms = file.suggest.debounce_ms,
                    min_chars = file.suggest.min_chars,
                    "config_loaded"
                );
                Ok(Config {
                    raw: Some(content),
                    file,
                })
            }
            Err(_e) => {
                // On parse error fall back to defaults; suggestions stay
                // available with stock policy.
                Ok(Config::default())
            }
        }
    } else {
        Ok(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_when_missing_file() {
        let cfg = load_from(Some(PathBuf::from("__nonexistent_hopefully__.toml"))).unwrap();
        assert_eq!(cfg.file.suggest.debounce_ms, 600);
        assert_eq!(cfg.min_chars(), 5);
        assert_eq!(cfg.endpoint(), "http://127.0.0.1:8090/suggest");
    }

    #[test]
    fn parses_suggest_values() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            tmp.path(),
            "[suggest]\ndebounce_ms = 150\nmin_chars = 3\nendpoint = \"http://example.test/suggest\"\n",
        )
        .unwrap();
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.debounce(), Duration::from_millis(150));
        assert_eq!(cfg.min_chars(), 3);
        assert_eq!(cfg.endpoint(), "http://example.test/suggest");
    }

    #[test]
    fn parse_error_falls_back_to_defaults() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "[suggest]\ndebounce_ms = \"not a number\"\n").unwrap();
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.file.suggest.debounce_ms, 600);
        assert!(cfg.raw.is_none());
    }

    #[test]
    fn storage_dir_prefers_configured_value() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "[storage]\ndir = \"/tmp/gl-store\"\n").unwrap();
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.storage_dir(), PathBuf::from("/tmp/gl-store"));
    }

    #[test]
    fn unknown_fields_are_tolerated() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            tmp.path(),
            "[suggest]\nmin_chars = 2\n[future]\nshiny = true\n",
        )
        .unwrap();
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.min_chars(), 2);
    }
}
