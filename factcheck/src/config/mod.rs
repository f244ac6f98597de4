//! Resolved pipeline settings.
//!
//! Priority, lowest first: built-in defaults, the XDG `config.toml` tables
//! ([`env_config::FileConfig`]), then `FACTCHECK_*` environment variables. Env lookups go
//! through a closure so callers and tests decide where values come from.
//!
//! Credentials are not part of [`Settings`]; [`Settings::check_credentials`] only verifies
//! that the keys the selected backends need are present.

use std::time::Duration;

use env_config::FileConfig;
use thiserror::Error;

use crate::pipeline::ToolCountPolicy;
use crate::post::MissingImagePolicy;
use crate::verdict::SourcePolicy;

pub const DEFAULT_OCR_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_RESEARCH_MODEL: &str = "gpt-4o";
pub const DEFAULT_SEARCH_MAX_RESULTS: usize = 5;
pub const DEFAULT_EXTRACT_MAX_URLS: usize = 3;
pub const DEFAULT_EXTRACT_MAX_CHARS: usize = 2000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 180;
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 3;

pub const ENV_OCR_MODEL: &str = "FACTCHECK_OCR_MODEL";
pub const ENV_RESEARCH_MODEL: &str = "FACTCHECK_RESEARCH_MODEL";
pub const ENV_VERDICT_MODEL: &str = "FACTCHECK_VERDICT_MODEL";
pub const ENV_TEMPERATURE: &str = "FACTCHECK_TEMPERATURE";
pub const ENV_SEARCH_PROVIDER: &str = "FACTCHECK_SEARCH_PROVIDER";
pub const ENV_SEARCH_MAX_RESULTS: &str = "FACTCHECK_SEARCH_MAX_RESULTS";
pub const ENV_EXTRACT: &str = "FACTCHECK_EXTRACT";
pub const ENV_EXTRACT_MAX_URLS: &str = "FACTCHECK_EXTRACT_MAX_URLS";
pub const ENV_EXTRACT_MAX_CHARS: &str = "FACTCHECK_EXTRACT_MAX_CHARS";
pub const ENV_TIMEOUT_SECS: &str = "FACTCHECK_TIMEOUT_SECS";
pub const ENV_MAX_TOOL_ROUNDS: &str = "FACTCHECK_MAX_TOOL_ROUNDS";
pub const ENV_MISSING_IMAGE: &str = "FACTCHECK_MISSING_IMAGE";
pub const ENV_SOURCE_POLICY: &str = "FACTCHECK_SOURCE_POLICY";
pub const ENV_TOOL_COUNT_FALLBACK: &str = "FACTCHECK_TOOL_COUNT_FALLBACK";

pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const TAVILY_API_KEY: &str = "TAVILY_API_KEY";
pub const EXA_API_KEY: &str = "EXA_API_KEY";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("invalid value for {key}: {value:?} ({message})")]
    InvalidValue {
        key: String,
        value: String,
        message: String,
    },
    #[error("missing credential {var} required by {provider}")]
    MissingCredential { provider: String, var: String },
}

/// Web search backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchProvider {
    #[default]
    Tavily,
    Exa,
}

impl SearchProvider {
    /// Env var holding this provider's API key.
    pub fn api_key_var(&self) -> &'static str {
        match self {
            SearchProvider::Tavily => TAVILY_API_KEY,
            SearchProvider::Exa => EXA_API_KEY,
        }
    }

    /// Only Tavily offers page extraction.
    pub fn supports_extraction(&self) -> bool {
        matches!(self, SearchProvider::Tavily)
    }
}

impl std::fmt::Display for SearchProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SearchProvider::Tavily => "tavily",
            SearchProvider::Exa => "exa",
        })
    }
}

impl std::str::FromStr for SearchProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tavily" => Ok(Self::Tavily),
            "exa" => Ok(Self::Exa),
            _ => Err(format!("unknown search provider: {} (use tavily or exa)", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub ocr: String,
    pub research: String,
    pub verdict: String,
    pub temperature: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractSettings {
    pub enabled: bool,
    pub max_urls: usize,
    pub max_chars: usize,
}

/// Everything the orchestrator and the CLI need to build a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub models: ModelSettings,
    pub search_provider: SearchProvider,
    pub search_max_results: usize,
    pub extract: ExtractSettings,
    pub timeout: Duration,
    pub max_tool_rounds: usize,
    pub missing_image: MissingImagePolicy,
    pub source_policy: SourcePolicy,
    pub tool_count: ToolCountPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            models: ModelSettings {
                ocr: DEFAULT_OCR_MODEL.to_string(),
                research: DEFAULT_RESEARCH_MODEL.to_string(),
                verdict: DEFAULT_RESEARCH_MODEL.to_string(),
                temperature: 0.0,
            },
            search_provider: SearchProvider::default(),
            search_max_results: DEFAULT_SEARCH_MAX_RESULTS,
            extract: ExtractSettings {
                enabled: true,
                max_urls: DEFAULT_EXTRACT_MAX_URLS,
                max_chars: DEFAULT_EXTRACT_MAX_CHARS,
            },
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            missing_image: MissingImagePolicy::default(),
            source_policy: SourcePolicy::default(),
            tool_count: ToolCountPolicy::default(),
        }
    }
}

fn invalid(key: &str, value: &str, message: impl Into<String>) -> SettingsError {
    SettingsError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        message: message.into(),
    }
}

fn parse_with<T, E: std::fmt::Display>(
    key: &str,
    raw: &str,
    parse: impl Fn(&str) -> Result<T, E>,
) -> Result<T, SettingsError> {
    parse(raw.trim()).map_err(|e| invalid(key, raw, e.to_string()))
}

fn positive(key: &str, raw: &str, n: usize) -> Result<usize, SettingsError> {
    if n == 0 {
        Err(invalid(key, raw, "must be at least 1"))
    } else {
        Ok(n)
    }
}

fn parse_bool(s: &str) -> Result<bool, String> {
    match s.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err("expected true or false".to_string()),
    }
}

/// `none`/`0`/empty means exact counts; `n > 0` reports at least `n`.
fn parse_fallback(s: &str) -> Result<ToolCountPolicy, String> {
    match s.to_lowercase().as_str() {
        "" | "none" | "exact" | "0" => Ok(ToolCountPolicy::Exact),
        other => other
            .parse::<usize>()
            .map(ToolCountPolicy::from_floor)
            .map_err(|_| "expected none or a positive integer".to_string()),
    }
}

impl Settings {
    /// Defaults, then `file`, then env vars read through `env`.
    pub fn resolve<F>(file: &FileConfig, env: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut s = Settings::default();
        s.apply_file(file)?;
        s.apply_env(env, file.models.verdict.is_some())?;
        Ok(s)
    }

    /// [`Settings::resolve`] against the process environment.
    pub fn from_env(file: &FileConfig) -> Result<Self, SettingsError> {
        Self::resolve(file, |k| std::env::var(k).ok())
    }

    fn apply_file(&mut self, file: &FileConfig) -> Result<(), SettingsError> {
        let m = &file.models;
        if let Some(v) = &m.ocr {
            self.models.ocr = v.clone();
        }
        if let Some(v) = &m.research {
            self.models.research = v.clone();
            self.models.verdict = v.clone();
        }
        if let Some(v) = &m.verdict {
            self.models.verdict = v.clone();
        }
        if let Some(t) = m.temperature {
            self.set_temperature("models.temperature", &t.to_string(), t)?;
        }

        if let Some(p) = &file.search.provider {
            self.search_provider = parse_with("search.provider", p, str::parse)?;
        }
        if let Some(n) = file.search.max_results {
            self.search_max_results = positive("search.max_results", &n.to_string(), n)?;
        }

        if let Some(b) = file.extract.enabled {
            self.extract.enabled = b;
        }
        if let Some(n) = file.extract.max_urls {
            self.extract.max_urls = positive("extract.max_urls", &n.to_string(), n)?;
        }
        if let Some(n) = file.extract.max_chars {
            self.extract.max_chars = positive("extract.max_chars", &n.to_string(), n)?;
        }

        let p = &file.pipeline;
        if let Some(secs) = p.timeout_secs {
            self.set_timeout("pipeline.timeout_secs", &secs.to_string(), secs)?;
        }
        if let Some(n) = p.max_tool_rounds {
            self.max_tool_rounds = positive("pipeline.max_tool_rounds", &n.to_string(), n)?;
        }
        if let Some(v) = &p.missing_image {
            self.missing_image = parse_with("pipeline.missing_image", v, str::parse)?;
        }
        if let Some(v) = &p.source_policy {
            self.source_policy = parse_with("pipeline.source_policy", v, str::parse)?;
        }
        if let Some(n) = p.tool_count_fallback {
            self.tool_count = ToolCountPolicy::from_floor(n);
        }
        Ok(())
    }

    /// `verdict_pinned`: the file set `[models] verdict`, so a research override leaves it alone.
    fn apply_env<F>(&mut self, env: F, verdict_pinned: bool) -> Result<(), SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| env(k).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_OCR_MODEL) {
            self.models.ocr = v.trim().to_string();
        }
        if let Some(v) = get(ENV_RESEARCH_MODEL) {
            self.models.research = v.trim().to_string();
            if !verdict_pinned && get(ENV_VERDICT_MODEL).is_none() {
                self.models.verdict = v.trim().to_string();
            }
        }
        if let Some(v) = get(ENV_VERDICT_MODEL) {
            self.models.verdict = v.trim().to_string();
        }
        if let Some(v) = get(ENV_TEMPERATURE) {
            let t: f32 = parse_with(ENV_TEMPERATURE, &v, str::parse)?;
            self.set_temperature(ENV_TEMPERATURE, &v, t)?;
        }

        if let Some(v) = get(ENV_SEARCH_PROVIDER) {
            self.search_provider = parse_with(ENV_SEARCH_PROVIDER, &v, str::parse)?;
        }
        if let Some(v) = get(ENV_SEARCH_MAX_RESULTS) {
            let n = parse_with(ENV_SEARCH_MAX_RESULTS, &v, str::parse::<usize>)?;
            self.search_max_results = positive(ENV_SEARCH_MAX_RESULTS, &v, n)?;
        }

        if let Some(v) = get(ENV_EXTRACT) {
            self.extract.enabled = parse_with(ENV_EXTRACT, &v, parse_bool)?;
        }
        if let Some(v) = get(ENV_EXTRACT_MAX_URLS) {
            let n = parse_with(ENV_EXTRACT_MAX_URLS, &v, str::parse::<usize>)?;
            self.extract.max_urls = positive(ENV_EXTRACT_MAX_URLS, &v, n)?;
        }
        if let Some(v) = get(ENV_EXTRACT_MAX_CHARS) {
            let n = parse_with(ENV_EXTRACT_MAX_CHARS, &v, str::parse::<usize>)?;
            self.extract.max_chars = positive(ENV_EXTRACT_MAX_CHARS, &v, n)?;
        }

        if let Some(v) = get(ENV_TIMEOUT_SECS) {
            let secs = parse_with(ENV_TIMEOUT_SECS, &v, str::parse::<u64>)?;
            self.set_timeout(ENV_TIMEOUT_SECS, &v, secs)?;
        }
        if let Some(v) = get(ENV_MAX_TOOL_ROUNDS) {
            let n = parse_with(ENV_MAX_TOOL_ROUNDS, &v, str::parse::<usize>)?;
            self.max_tool_rounds = positive(ENV_MAX_TOOL_ROUNDS, &v, n)?;
        }
        if let Some(v) = get(ENV_MISSING_IMAGE) {
            self.missing_image = parse_with(ENV_MISSING_IMAGE, &v, str::parse)?;
        }
        if let Some(v) = get(ENV_SOURCE_POLICY) {
            self.source_policy = parse_with(ENV_SOURCE_POLICY, &v, str::parse)?;
        }
        if let Some(v) = get(ENV_TOOL_COUNT_FALLBACK) {
            self.tool_count = parse_with(ENV_TOOL_COUNT_FALLBACK, &v, parse_fallback)?;
        }
        Ok(())
    }

    fn set_temperature(&mut self, key: &str, raw: &str, t: f32) -> Result<(), SettingsError> {
        if !(0.0..=2.0).contains(&t) {
            return Err(invalid(key, raw, "must be between 0 and 2"));
        }
        self.models.temperature = t;
        Ok(())
    }

    fn set_timeout(&mut self, key: &str, raw: &str, secs: u64) -> Result<(), SettingsError> {
        if secs == 0 {
            return Err(invalid(key, raw, "must be at least 1 second"));
        }
        self.timeout = Duration::from_secs(secs);
        Ok(())
    }

    /// Extraction runs only when enabled and the search provider can extract.
    pub fn extraction_active(&self) -> bool {
        self.extract.enabled && self.search_provider.supports_extraction()
    }

    /// Verifies the API keys needed by the configured backends.
    pub fn check_credentials<F>(&self, env: F) -> Result<(), SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let has = |k: &str| env(k).map(|v| !v.trim().is_empty()).unwrap_or(false);
        if !has(OPENAI_API_KEY) {
            return Err(SettingsError::MissingCredential {
                provider: "openai".to_string(),
                var: OPENAI_API_KEY.to_string(),
            });
        }
        let var = self.search_provider.api_key_var();
        if !has(var) {
            return Err(SettingsError::MissingCredential {
                provider: self.search_provider.to_string(),
                var: var.to_string(),
            });
        }
        Ok(())
    }
}
