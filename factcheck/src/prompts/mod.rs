//! Stage prompts loaded from YAML (optional override for the embedded defaults).
//!
//! See [`FactcheckPrompts`] and [`load`].

mod load;

use serde::Deserialize;

pub use load::{
    default_from_embedded, load, load_instruction_from_file, load_or_default, LoadError,
    ENV_OCR_INSTRUCTIONS, ENV_PROMPTS_DIR, ENV_RESEARCH_INSTRUCTIONS, ENV_VERDICT_INSTRUCTIONS,
};

/// Directive sent with the post image when nothing overrides it.
pub const TRANSCRIPTION_DIRECTIVE: &str = "Summarize the following post:";

/// YAML shape of `prompts/factcheck.yaml`. All keys optional.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct PromptsFile {
    pub transcription_directive: Option<String>,
    pub ocr_instructions: Option<String>,
    pub research_instructions: Option<String>,
    pub verdict_instructions: Option<String>,
}

impl PromptsFile {
    /// Keys set in `over` replace the ones in `self`.
    pub fn merged_with(self, over: PromptsFile) -> PromptsFile {
        PromptsFile {
            transcription_directive: over.transcription_directive.or(self.transcription_directive),
            ocr_instructions: over.ocr_instructions.or(self.ocr_instructions),
            research_instructions: over.research_instructions.or(self.research_instructions),
            verdict_instructions: over.verdict_instructions.or(self.verdict_instructions),
        }
    }
}

/// Effective prompts for the three model-backed stages.
///
/// Build via [`load`] or [`load_or_default`]; env overrides are already applied.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FactcheckPrompts {
    pub file: PromptsFile,
}

impl FactcheckPrompts {
    pub fn transcription_directive(&self) -> String {
        self.file
            .transcription_directive
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| TRANSCRIPTION_DIRECTIVE.to_string())
    }

    pub fn ocr_instructions(&self) -> String {
        trimmed(&self.file.ocr_instructions)
    }

    pub fn research_instructions(&self) -> String {
        trimmed(&self.file.research_instructions)
    }

    pub fn verdict_instructions(&self) -> String {
        trimmed(&self.file.verdict_instructions)
    }
}

fn trimmed(s: &Option<String>) -> String {
    s.as_deref().map(str::trim).unwrap_or_default().to_string()
}
