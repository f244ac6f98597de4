//! Load configuration from XDG `config.toml` and project `.env`.
//!
//! [`load_and_apply`] copies values into the process environment with priority
//! **existing env > .env > XDG `[env]`**. [`load_file_config`] returns the typed
//! `[models]`, `[search]`, `[extract]` and `[pipeline]` tables for the pipeline settings.

mod dotenv_file;
#[cfg(feature = "tracing-init")]
mod tracing_init;
mod xdg_toml;

use std::collections::{HashMap, HashSet};
use std::path::Path;
use thiserror::Error;

#[cfg(feature = "tracing-init")]
pub use tracing_init::{init_tracing, TracingGuard, DEFAULT_LOG_FILTER};
pub use xdg_toml::{
    config_path, load_file_config, load_file_config_at, ExtractSection, FileConfig,
    ModelsSection, PipelineSection, SearchSection,
};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("read xdg config: {0}")]
    XdgRead(std::io::Error),
    #[error("parse xdg toml: {0}")]
    XdgParse(#[from] toml::de::Error),
    #[error("read .env {path}: {message}")]
    Dotenv { path: String, message: String },
}

/// For each key missing from the process env, picks the `.env` value, else the XDG value.
fn apply_maps(dotenv_map: &HashMap<String, String>, xdg_map: &HashMap<String, String>) {
    let keys: HashSet<&String> = dotenv_map.keys().chain(xdg_map.keys()).collect();
    for key in keys {
        if std::env::var_os(key).is_some() {
            continue;
        }
        if let Some(v) = dotenv_map.get(key).or_else(|| xdg_map.get(key)) {
            std::env::set_var(key, v);
        }
    }
}

/// Loads `.env` and the XDG `[env]` table, then sets only the variables that are not
/// already set.
///
/// * `app_name`: e.g. `"factcheck"`, used for `~/.config/<app_name>/config.toml`.
/// * `override_dir`: look for `.env` here instead of the current directory.
pub fn load_and_apply(app_name: &str, override_dir: Option<&Path>) -> Result<(), LoadError> {
    let xdg = load_file_config(app_name)?;
    let dotenv_map = dotenv_file::load_env_map(override_dir)?;
    apply_maps(&dotenv_map, &xdg.env);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn existing_env_wins() {
        env::set_var("FACTCHECK_CONFIG_TEST_EXISTING", "from_env");
        apply_maps(
            &map(&[("FACTCHECK_CONFIG_TEST_EXISTING", "from_dotenv")]),
            &map(&[("FACTCHECK_CONFIG_TEST_EXISTING", "from_xdg")]),
        );
        assert_eq!(
            env::var("FACTCHECK_CONFIG_TEST_EXISTING").as_deref(),
            Ok("from_env")
        );
        env::remove_var("FACTCHECK_CONFIG_TEST_EXISTING");
    }

    #[test]
    fn dotenv_overrides_xdg() {
        env::remove_var("FACTCHECK_CONFIG_TEST_PRIORITY");
        apply_maps(
            &map(&[("FACTCHECK_CONFIG_TEST_PRIORITY", "from_dotenv")]),
            &map(&[("FACTCHECK_CONFIG_TEST_PRIORITY", "from_xdg")]),
        );
        let val = env::var("FACTCHECK_CONFIG_TEST_PRIORITY").unwrap();
        env::remove_var("FACTCHECK_CONFIG_TEST_PRIORITY");
        assert_eq!(val, "from_dotenv");
    }

    #[test]
    fn xdg_applied_when_no_dotenv_value() {
        env::remove_var("FACTCHECK_CONFIG_TEST_XDG_ONLY");
        apply_maps(
            &HashMap::new(),
            &map(&[("FACTCHECK_CONFIG_TEST_XDG_ONLY", "from_xdg")]),
        );
        let val = env::var("FACTCHECK_CONFIG_TEST_XDG_ONLY").unwrap();
        env::remove_var("FACTCHECK_CONFIG_TEST_XDG_ONLY");
        assert_eq!(val, "from_xdg");
    }

    #[test]
    fn dotenv_file_is_applied_for_unknown_app() {
        let dotenv_dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dotenv_dir.path().join(".env"),
            "FACTCHECK_CONFIG_TEST_DOTENV_ONLY=from_dotenv_only\n",
        )
        .unwrap();

        env::remove_var("FACTCHECK_CONFIG_TEST_DOTENV_ONLY");
        let r = load_and_apply("factcheck-config-nonexistent-app-xyz", Some(dotenv_dir.path()));
        let val = env::var("FACTCHECK_CONFIG_TEST_DOTENV_ONLY").ok();
        env::remove_var("FACTCHECK_CONFIG_TEST_DOTENV_ONLY");

        assert!(r.is_ok());
        assert_eq!(val.as_deref(), Some("from_dotenv_only"));
    }
}
