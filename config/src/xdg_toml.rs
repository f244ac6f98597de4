//! `$XDG_CONFIG_HOME/<app>/config.toml`: the `[env]` table plus typed pipeline tables.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::LoadError;

/// Config directory: `XDG_CONFIG_HOME` when set, else the platform default.
fn config_home() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(dirs::config_dir)
}

/// Path of `config.toml` for `app_name`, whether or not it exists. `None` when the platform
/// has no config directory.
pub fn config_path(app_name: &str) -> Option<PathBuf> {
    config_home().map(|home| home.join(app_name).join("config.toml"))
}

/// `[models]`: model names per stage and sampling temperature.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ModelsSection {
    pub ocr: Option<String>,
    pub research: Option<String>,
    pub verdict: Option<String>,
    pub temperature: Option<f32>,
}

/// `[search]`: provider name (`tavily` or `exa`) and results per query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SearchSection {
    pub provider: Option<String>,
    pub max_results: Option<usize>,
}

/// `[extract]`: optional full-page extraction budget.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExtractSection {
    pub enabled: Option<bool>,
    pub max_urls: Option<usize>,
    pub max_chars: Option<usize>,
}

/// `[pipeline]`: run-level policies. Enum-like values stay strings here; the core crate parses
/// them so this crate does not depend on it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    pub timeout_secs: Option<u64>,
    pub max_tool_rounds: Option<usize>,
    pub missing_image: Option<String>,
    pub source_policy: Option<String>,
    pub tool_count_fallback: Option<usize>,
}

/// Whole `config.toml`. Every table is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub env: HashMap<String, String>,
    pub models: ModelsSection,
    pub search: SearchSection,
    pub extract: ExtractSection,
    pub pipeline: PipelineSection,
}

/// Parses one file. Missing file returns defaults.
pub fn load_file_config_at(path: &Path) -> Result<FileConfig, LoadError> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(FileConfig::default()),
        Err(e) => return Err(LoadError::XdgRead(e)),
    };
    Ok(toml::from_str(&content)?)
}

/// Parses `config.toml` for `app_name`. Missing file returns defaults.
pub fn load_file_config(app_name: &str) -> Result<FileConfig, LoadError> {
    match config_path(app_name) {
        Some(path) => load_file_config_at(&path),
        None => Ok(FileConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_file_config_at(&dir.path().join("config.toml")).unwrap();
        assert_eq!(cfg, FileConfig::default());
    }

    #[test]
    fn reads_env_and_typed_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
[env]
OPENAI_API_KEY = "sk-from-toml"

[models]
ocr = "gpt-4o-mini"
research = "gpt-4.1"
temperature = 0.2

[search]
provider = "exa"
max_results = 8

[extract]
enabled = false
max_chars = 500

[pipeline]
timeout_secs = 60
missing_image = "placeholder"
tool_count_fallback = 1
"#,
        );
        let cfg = load_file_config_at(&path).unwrap();
        assert_eq!(cfg.env.get("OPENAI_API_KEY").map(String::as_str), Some("sk-from-toml"));
        assert_eq!(cfg.models.research.as_deref(), Some("gpt-4.1"));
        assert_eq!(cfg.models.verdict, None);
        assert_eq!(cfg.models.temperature, Some(0.2));
        assert_eq!(cfg.search.provider.as_deref(), Some("exa"));
        assert_eq!(cfg.search.max_results, Some(8));
        assert_eq!(cfg.extract.enabled, Some(false));
        assert_eq!(cfg.extract.max_urls, None);
        assert_eq!(cfg.pipeline.timeout_secs, Some(60));
        assert_eq!(cfg.pipeline.missing_image.as_deref(), Some("placeholder"));
        assert_eq!(cfg.pipeline.tool_count_fallback, Some(1));
    }

    #[test]
    fn unrelated_tables_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "[other]\nkey = \"ignored\"\n");
        let cfg = load_file_config_at(&path).unwrap();
        assert!(cfg.env.is_empty());
    }

    #[test]
    fn invalid_toml_returns_xdg_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "not valid toml [[[\n");
        assert!(matches!(
            load_file_config_at(&path),
            Err(LoadError::XdgParse(_))
        ));
    }

    #[test]
    fn wrong_value_type_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "[search]\nmax_results = \"five\"\n");
        assert!(matches!(
            load_file_config_at(&path),
            Err(LoadError::XdgParse(_))
        ));
    }
}
