//! Builds a [`FactChecker`] from resolved settings: OpenAI models plus Tavily or Exa.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_openai::config::OpenAIConfig;
use factcheck::config::{EXA_API_KEY, OPENAI_API_KEY, TAVILY_API_KEY};
use factcheck::prompts::{self, FactcheckPrompts};
use factcheck::{
    BuildError, ChatOpenAI, ExaSearch, FactChecker, LlmClient, MissingImagePolicy,
    SearchProvider, Settings, SettingsError, SourcePolicy, TavilyClient, ToolCountPolicy,
};
use thiserror::Error;

pub const ENV_OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";

#[derive(Debug, Error)]
pub enum CliError {
    #[error("config file error: {0}")]
    Config(#[from] config::LoadError),
    #[error("{0}")]
    Settings(#[from] SettingsError),
    #[error("prompt loading failed: {0}")]
    Prompts(#[from] prompts::LoadError),
    #[error("{0}")]
    Build(#[from] BuildError),
}

/// Command-line values that take priority over config file and env.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub search: Option<SearchProvider>,
    pub no_extract: bool,
    pub timeout_secs: Option<u64>,
    pub max_tool_rounds: Option<usize>,
    pub missing_image: Option<MissingImagePolicy>,
    pub restrict_sources: bool,
    pub report_at_least: Option<usize>,
}

fn at_least_one(flag: &str, n: u64) -> Result<u64, SettingsError> {
    if n == 0 {
        Err(SettingsError::InvalidValue {
            key: flag.to_string(),
            value: n.to_string(),
            message: "must be at least 1".to_string(),
        })
    } else {
        Ok(n)
    }
}

impl Overrides {
    pub fn apply(&self, settings: &mut Settings) -> Result<(), SettingsError> {
        if let Some(provider) = self.search {
            settings.search_provider = provider;
        }
        if self.no_extract {
            settings.extract.enabled = false;
        }
        if let Some(secs) = self.timeout_secs {
            settings.timeout = Duration::from_secs(at_least_one("--timeout-secs", secs)?);
        }
        if let Some(rounds) = self.max_tool_rounds {
            settings.max_tool_rounds = at_least_one("--max-tool-rounds", rounds as u64)? as usize;
        }
        if let Some(policy) = self.missing_image {
            settings.missing_image = policy;
        }
        if self.restrict_sources {
            settings.source_policy = SourcePolicy::RestrictToContext;
        }
        if let Some(n) = self.report_at_least {
            settings.tool_count = ToolCountPolicy::from_floor(n);
        }
        Ok(())
    }
}

/// Settings from the XDG config file and env, then `overrides`.
pub fn resolve_settings(overrides: &Overrides) -> Result<Settings, CliError> {
    let file = config::load_file_config("factcheck")?;
    let mut settings = Settings::from_env(&file)?;
    overrides.apply(&mut settings)?;
    Ok(settings)
}

/// `--prompts-dir` must exist; without it, on-disk prompts are optional.
pub fn resolve_prompts(dir: Option<&Path>) -> Result<FactcheckPrompts, CliError> {
    match dir {
        Some(d) => Ok(prompts::load(Some(d))?),
        None => Ok(prompts::load_or_default(None)),
    }
}

fn openai_config<F>(env: &F) -> OpenAIConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = OpenAIConfig::new().with_api_key(env(OPENAI_API_KEY).unwrap_or_default());
    if let Some(base) = env(ENV_OPENAI_BASE_URL).filter(|s| !s.trim().is_empty()) {
        config = config.with_api_base(base.trim_end_matches('/'));
    }
    config
}

fn chat_model<F>(env: &F, model: &str, temperature: f32) -> Arc<dyn LlmClient>
where
    F: Fn(&str) -> Option<String>,
{
    Arc::new(ChatOpenAI::with_config(openai_config(env), model).with_temperature(temperature))
}

/// Wires the configured backends. Credentials come from `env`.
pub fn build_checker<F>(
    settings: &Settings,
    prompts: FactcheckPrompts,
    env: F,
) -> Result<FactChecker, CliError>
where
    F: Fn(&str) -> Option<String>,
{
    settings.check_credentials(&env)?;
    let models = &settings.models;
    let mut builder = FactChecker::builder()
        .ocr_llm(chat_model(&env, &models.ocr, models.temperature))
        .research_llm(chat_model(&env, &models.research, models.temperature))
        .verdict_llm(chat_model(&env, &models.verdict, models.temperature))
        .prompts(prompts)
        .settings(settings);

    builder = match settings.search_provider {
        SearchProvider::Tavily => {
            let tavily = Arc::new(
                TavilyClient::new(env(TAVILY_API_KEY).unwrap_or_default())
                    .with_max_results(settings.search_max_results),
            );
            builder.search(tavily.clone()).extractor(tavily)
        }
        SearchProvider::Exa => builder.search(Arc::new(
            ExaSearch::new(env(EXA_API_KEY).unwrap_or_default())
                .with_max_results(settings.search_max_results),
        )),
    };
    Ok(builder.build()?)
}

/// Settings, prompts and backends in startup order; the first failure stops startup.
pub fn prepare_checker<F>(
    overrides: &Overrides,
    prompts_dir: Option<&Path>,
    env: F,
) -> Result<FactChecker, CliError>
where
    F: Fn(&str) -> Option<String>,
{
    let settings = resolve_settings(overrides)?;
    let prompts = resolve_prompts(prompts_dir)?;
    tracing::debug!(?settings, "settings resolved");
    build_checker(&settings, prompts, env)
}
