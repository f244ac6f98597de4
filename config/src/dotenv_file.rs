//! Read a project `.env` into a key-value map without touching the process env.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::LoadError;

/// `.env` in `override_dir` if given, else in the current directory.
fn dotenv_path(override_dir: Option<&Path>) -> Option<PathBuf> {
    let dir = override_dir
        .map(Path::to_path_buf)
        .or_else(|| std::env::current_dir().ok())?;
    let path = dir.join(".env");
    path.is_file().then_some(path)
}

/// Parses `.env` with the `dotenv` crate (quotes, comments, `export` prefix). Missing file
/// returns an empty map.
pub fn load_env_map(override_dir: Option<&Path>) -> Result<HashMap<String, String>, LoadError> {
    let Some(path) = dotenv_path(override_dir) else {
        return Ok(HashMap::new());
    };
    let iter = dotenv::from_path_iter(&path).map_err(|e| LoadError::Dotenv {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let mut out = HashMap::new();
    for item in iter {
        let (key, value) = item.map_err(|e| LoadError::Dotenv {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        out.insert(key, value);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_of(content: &str) -> HashMap<String, String> {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".env"), content).unwrap();
        load_env_map(Some(dir.path())).unwrap()
    }

    #[test]
    fn missing_file_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_env_map(Some(dir.path())).unwrap().is_empty());
    }

    #[test]
    fn reads_pairs_and_skips_comments() {
        let m = map_of("# keys\nTAVILY_API_KEY=tvly-1\n\nFACTCHECK_SEARCH_PROVIDER=exa\n");
        assert_eq!(m.get("TAVILY_API_KEY").map(String::as_str), Some("tvly-1"));
        assert_eq!(m.get("FACTCHECK_SEARCH_PROVIDER").map(String::as_str), Some("exa"));
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn quoted_values_are_unquoted() {
        let m = map_of("A=\"hello world\"\nB='single quoted'\n");
        assert_eq!(m.get("A").map(String::as_str), Some("hello world"));
        assert_eq!(m.get("B").map(String::as_str), Some("single quoted"));
    }
}
