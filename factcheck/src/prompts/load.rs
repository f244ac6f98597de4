//! Load stage prompts from a directory and apply env overrides.
//!
//! Default text lives in `factcheck/prompts/factcheck.yaml`, embedded at compile time. A
//! `factcheck.yaml` in the prompts directory overrides individual keys; env vars override
//! both.

use std::path::{Path, PathBuf};

use super::{FactcheckPrompts, PromptsFile};

const EMBED_FACTCHECK: &str = include_str!("../../prompts/factcheck.yaml");

const PROMPTS_FILE: &str = "factcheck.yaml";
const DEFAULT_PROMPTS_DIR: &str = "prompts";

/// Directory to read `factcheck.yaml` from when none is passed.
pub const ENV_PROMPTS_DIR: &str = "FACTCHECK_PROMPTS_DIR";
pub const ENV_OCR_INSTRUCTIONS: &str = "FACTCHECK_OCR_INSTRUCTIONS";
pub const ENV_RESEARCH_INSTRUCTIONS: &str = "FACTCHECK_RESEARCH_INSTRUCTIONS";
pub const ENV_VERDICT_INSTRUCTIONS: &str = "FACTCHECK_VERDICT_INSTRUCTIONS";

/// Error when loading prompts from a directory (missing dir, invalid YAML).
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("prompts directory not found or not readable: {0}")]
    DirNotFound(String),
    #[error("failed to read prompts file {path}: {message}")]
    ReadFile { path: String, message: String },
    #[error("failed to parse YAML in {path}: {message}")]
    ParseYaml { path: String, message: String },
}

fn prompts_dir(dir: Option<&Path>) -> PathBuf {
    dir.map(PathBuf::from).unwrap_or_else(|| {
        std::env::var(ENV_PROMPTS_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_PROMPTS_DIR))
    })
}

fn read_prompts_file(dir: &Path) -> Result<Option<PromptsFile>, LoadError> {
    let path = dir.join(PROMPTS_FILE);
    let content = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(LoadError::ReadFile {
                path: path.display().to_string(),
                message: e.to_string(),
            })
        }
    };
    serde_yaml::from_str(&content)
        .map(Some)
        .map_err(|e| LoadError::ParseYaml {
            path: path.display().to_string(),
            message: e.to_string(),
        })
}

fn embedded_file() -> PromptsFile {
    serde_yaml::from_str(EMBED_FACTCHECK).unwrap_or_default()
}

/// Env vars (looked up through `lookup`) replace the matching instructions.
pub(crate) fn apply_env_with<F>(mut file: PromptsFile, lookup: F) -> PromptsFile
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(s) = lookup(ENV_OCR_INSTRUCTIONS) {
        file.ocr_instructions = Some(s);
    }
    if let Some(s) = lookup(ENV_RESEARCH_INSTRUCTIONS) {
        file.research_instructions = Some(s);
    }
    if let Some(s) = lookup(ENV_VERDICT_INSTRUCTIONS) {
        file.verdict_instructions = Some(s);
    }
    file
}

fn apply_env(file: PromptsFile) -> PromptsFile {
    apply_env_with(file, |k| std::env::var(k).ok())
}

/// Loads `factcheck.yaml` from `dir` (or `FACTCHECK_PROMPTS_DIR`, or `./prompts`).
///
/// Keys missing from the file keep the embedded defaults; a missing file inside an existing
/// directory is not an error. Errors when the directory is missing or the file fails to parse.
pub fn load(dir: Option<&Path>) -> Result<FactcheckPrompts, LoadError> {
    let base = prompts_dir(dir);
    if !base.is_dir() {
        return Err(LoadError::DirNotFound(base.display().to_string()));
    }
    let file = match read_prompts_file(&base)? {
        Some(over) => embedded_file().merged_with(over),
        None => embedded_file(),
    };
    Ok(FactcheckPrompts {
        file: apply_env(file),
    })
}

/// Defaults from the embedded YAML, with env overrides applied.
pub fn default_from_embedded() -> FactcheckPrompts {
    FactcheckPrompts {
        file: apply_env(embedded_file()),
    }
}

/// [`load`], falling back to [`default_from_embedded`] when the directory is absent or invalid.
pub fn load_or_default(dir: Option<&Path>) -> FactcheckPrompts {
    load(dir).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "using embedded prompts");
        default_from_embedded()
    })
}

/// Reads a plain-text instruction file; surrounding whitespace is trimmed.
pub fn load_instruction_from_file(path: impl AsRef<Path>) -> Result<String, LoadError> {
    let path = path.as_ref();
    std::fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .map_err(|e| LoadError::ReadFile {
            path: path.display().to_string(),
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts::TRANSCRIPTION_DIRECTIVE;

    #[test]
    fn embedded_yaml_defines_every_prompt() {
        let file = embedded_file();
        assert_eq!(file.transcription_directive.as_deref(), Some(TRANSCRIPTION_DIRECTIVE));
        assert!(file.ocr_instructions.is_some());
        assert!(file.research_instructions.is_some());
        assert!(file.verdict_instructions.is_some());
    }

    #[test]
    fn load_nonexistent_dir_returns_error() {
        let result = load(Some(Path::new("/nonexistent_prompts_dir_12345")));
        assert!(matches!(result.unwrap_err(), LoadError::DirNotFound(_)));
    }

    #[test]
    fn load_or_default_nonexistent_returns_embedded() {
        let p = load_or_default(Some(Path::new("/nonexistent_prompts_dir_12345")));
        assert_eq!(p.transcription_directive(), TRANSCRIPTION_DIRECTIVE);
        assert!(!p.research_instructions().is_empty());
    }

    #[test]
    fn file_in_dir_overrides_single_key() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("factcheck.yaml"),
            "verdict_instructions: \"From file.\"\n",
        )
        .unwrap();
        let p = load(Some(temp.path())).unwrap();
        assert_eq!(p.file.verdict_instructions.as_deref(), Some("From file."));
        assert_eq!(p.transcription_directive(), TRANSCRIPTION_DIRECTIVE);
        assert!(!p.ocr_instructions().is_empty());
    }

    #[test]
    fn dir_without_file_uses_embedded() {
        let temp = tempfile::TempDir::new().unwrap();
        let p = load(Some(temp.path())).unwrap();
        assert_eq!(p.file.transcription_directive.as_deref(), Some(TRANSCRIPTION_DIRECTIVE));
    }

    #[test]
    fn invalid_yaml_returns_parse_error() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("factcheck.yaml"), "ocr_instructions: [not closed")
            .unwrap();
        let err = load(Some(temp.path())).unwrap_err();
        assert!(matches!(err, LoadError::ParseYaml { .. }));
    }

    #[test]
    fn env_overrides_win_over_file() {
        let file = PromptsFile {
            research_instructions: Some("file".into()),
            verdict_instructions: Some("file".into()),
            ..Default::default()
        };
        let out = apply_env_with(file, |k| {
            (k == ENV_RESEARCH_INSTRUCTIONS).then(|| "from env".to_string())
        });
        assert_eq!(out.research_instructions.as_deref(), Some("from env"));
        assert_eq!(out.verdict_instructions.as_deref(), Some("file"));
    }

    #[test]
    fn instruction_file_is_read_and_trimmed() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("ocr_instructions.txt");
        std::fs::write(&path, "\nYou are an OCR expert.\n\n").unwrap();
        assert_eq!(load_instruction_from_file(&path).unwrap(), "You are an OCR expert.");

        let err = load_instruction_from_file(temp.path().join("missing.txt")).unwrap_err();
        assert!(matches!(err, LoadError::ReadFile { .. }));
    }
}
