//! Verdict record, its JSON schema, and validation of model output against it.
//!
//! The verdict stage asks the model for `{"fake_news", "reasoning", "relevant_sources"}`.
//! Providers that honor `response_format` hand back a parsed value; others return text that
//! may be wrapped in a Markdown fence. Either way the payload goes through
//! [`Verdict::from_value`], which rejects anything that does not match the schema instead of
//! guessing.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::llm::OutputSchema;
use crate::state::{normalize_url, ResearchContext};

/// Schema name sent to the provider.
pub const VERDICT_SCHEMA_NAME: &str = "fact_check_verdict";

/// Final classification of a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    #[serde(rename = "fake_news")]
    pub is_fake: bool,
    pub reasoning: String,
    #[serde(rename = "relevant_sources")]
    pub sources: Vec<String>,
}

/// Model output did not match the verdict schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "verdict schema validation failed at {}: expected {}, found {}",
    .field.as_deref().unwrap_or("<root>"),
    .expected,
    .found
)]
pub struct SchemaValidationError {
    /// Offending field; `None` when the payload itself is wrong (not JSON, not an object).
    pub field: Option<String>,
    pub expected: String,
    pub found: String,
}

impl SchemaValidationError {
    fn at(field: &str, expected: &str, found: &Value) -> Self {
        Self {
            field: Some(field.to_string()),
            expected: expected.to_string(),
            found: json_type_name(found).to_string(),
        }
    }

    fn missing(field: &str, expected: &str) -> Self {
        Self {
            field: Some(field.to_string()),
            expected: expected.to_string(),
            found: "nothing".to_string(),
        }
    }
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn required<'a>(
    obj: &'a Map<String, Value>,
    field: &str,
    expected: &str,
) -> Result<&'a Value, SchemaValidationError> {
    obj.get(field)
        .ok_or_else(|| SchemaValidationError::missing(field, expected))
}

impl Verdict {
    /// JSON schema for the verdict payload (strict mode compatible).
    pub fn json_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "fake_news": {
                    "type": "boolean",
                    "description": "True if the post is fake news, false if it is legitimate."
                },
                "reasoning": {
                    "type": "string",
                    "description": "Why the post was classified this way, citing the evidence."
                },
                "relevant_sources": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "URLs of the sources that support the verdict."
                }
            },
            "required": ["fake_news", "reasoning", "relevant_sources"],
            "additionalProperties": false
        })
    }

    /// Output schema attached to the verdict model call.
    pub fn output_schema() -> OutputSchema {
        OutputSchema {
            name: VERDICT_SCHEMA_NAME.to_string(),
            description: Some("Fact-check verdict for a social media post".to_string()),
            schema: Self::json_schema(),
            strict: true,
        }
    }

    /// Validates a payload field by field. Unknown fields are ignored.
    pub fn from_value(value: &Value) -> Result<Self, SchemaValidationError> {
        let obj = value.as_object().ok_or_else(|| SchemaValidationError {
            field: None,
            expected: "object".to_string(),
            found: json_type_name(value).to_string(),
        })?;

        let is_fake = match required(obj, "fake_news", "boolean")? {
            Value::Bool(b) => *b,
            other => return Err(SchemaValidationError::at("fake_news", "boolean", other)),
        };
        let reasoning = match required(obj, "reasoning", "string")? {
            Value::String(s) => s.clone(),
            other => return Err(SchemaValidationError::at("reasoning", "string", other)),
        };
        let sources = match required(obj, "relevant_sources", "array of strings")? {
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| match item {
                    Value::String(s) => Ok(s.clone()),
                    other => Err(SchemaValidationError::at(
                        &format!("relevant_sources[{}]", i),
                        "string",
                        other,
                    )),
                })
                .collect::<Result<Vec<_>, _>>()?,
            other => {
                return Err(SchemaValidationError::at(
                    "relevant_sources",
                    "array of strings",
                    other,
                ))
            }
        };

        Ok(Self {
            is_fake,
            reasoning,
            sources,
        })
    }

    /// Parses model text (optionally inside a ```json fence) and validates it.
    pub fn from_text(text: &str) -> Result<Self, SchemaValidationError> {
        let value = parse_payload(text)?;
        Self::from_value(&value)
    }
}

/// Strips one surrounding Markdown code fence, if any.
fn strip_code_fence(text: &str) -> &str {
    let t = text.trim();
    let Some(rest) = t.strip_prefix("```") else {
        return t;
    };
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// JSON value from model text; non-JSON is a root-level validation error.
pub fn parse_payload(text: &str) -> Result<Value, SchemaValidationError> {
    serde_json::from_str(strip_code_fence(text)).map_err(|e| SchemaValidationError {
        field: None,
        expected: "JSON object".to_string(),
        found: format!("unparseable text ({})", e),
    })
}

/// How verdict sources relate to the gathered evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourcePolicy {
    /// Keep whatever the model cited.
    #[default]
    PassThrough,
    /// Drop sources that do not appear in the research context.
    RestrictToContext,
}

impl std::str::FromStr for SourcePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pass-through" | "pass_through" | "passthrough" => Ok(Self::PassThrough),
            "restrict" | "restrict-to-context" | "restrict_to_context" => {
                Ok(Self::RestrictToContext)
            }
            _ => Err(format!(
                "unknown source policy: {} (use pass-through or restrict)",
                s
            )),
        }
    }
}

impl SourcePolicy {
    /// Applies the policy to `verdict.sources` in place; returns the dropped URLs.
    pub fn apply(self, verdict: &mut Verdict, context: &ResearchContext) -> Vec<String> {
        if self == SourcePolicy::PassThrough {
            return vec![];
        }
        let (kept, dropped): (Vec<String>, Vec<String>) = std::mem::take(&mut verdict.sources)
            .into_iter()
            .partition(|s| context.contains_url(s));
        if !dropped.is_empty() {
            warn!(
                dropped = ?dropped,
                kept = kept.len(),
                "verdict cited sources absent from research context"
            );
        }
        verdict.sources = kept;
        dropped
    }
}

/// True when every source appears in the context (normalized comparison).
pub fn sources_within_context(verdict: &Verdict, context: &ResearchContext) -> bool {
    verdict
        .sources
        .iter()
        .all(|s| !normalize_url(s).is_empty() && context.contains_url(s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool_source::SearchHit;

    #[test]
    fn valid_payload_parses_and_ignores_extra_fields() {
        let v = json!({
            "fake_news": true,
            "reasoning": "No such study exists.",
            "relevant_sources": ["https://a.example"],
            "confidence": 0.9
        });
        let verdict = Verdict::from_value(&v).unwrap();
        assert!(verdict.is_fake);
        assert_eq!(verdict.sources, vec!["https://a.example"]);
    }

    #[test]
    fn string_fake_news_is_rejected() {
        let err = Verdict::from_value(&json!({"fake_news": "maybe"})).unwrap_err();
        assert_eq!(err.field.as_deref(), Some("fake_news"));
        assert_eq!(err.expected, "boolean");
        assert_eq!(err.found, "string");
    }

    #[test]
    fn missing_and_mistyped_fields_are_named() {
        let err = Verdict::from_value(&json!({"fake_news": false, "relevant_sources": []}))
            .unwrap_err();
        assert_eq!(err.field.as_deref(), Some("reasoning"));
        assert_eq!(err.found, "nothing");

        let err = Verdict::from_value(&json!({
            "fake_news": false, "reasoning": "r", "relevant_sources": ["ok", 3]
        }))
        .unwrap_err();
        assert_eq!(err.field.as_deref(), Some("relevant_sources[1]"));
        assert_eq!(err.found, "number");
    }

    #[test]
    fn non_object_payload_is_root_error() {
        let err = Verdict::from_value(&json!([1, 2])).unwrap_err();
        assert_eq!(err.field, None);
        assert_eq!(err.expected, "object");
        assert!(err.to_string().contains("<root>"));
    }

    #[test]
    fn fenced_text_is_parsed() {
        let text = "```json\n{\"fake_news\": false, \"reasoning\": \"ok\", \"relevant_sources\": []}\n```";
        let verdict = Verdict::from_text(text).unwrap();
        assert!(!verdict.is_fake);
        assert!(verdict.sources.is_empty());
    }

    #[test]
    fn prose_is_not_a_verdict() {
        let err = Verdict::from_text("I think it is fake.").unwrap_err();
        assert_eq!(err.field, None);
        assert_eq!(err.expected, "JSON object");
    }

    #[test]
    fn wire_names_are_used_when_serializing() {
        let v = Verdict {
            is_fake: false,
            reasoning: "r".into(),
            sources: vec![],
        };
        assert_eq!(
            serde_json::to_string(&v).unwrap(),
            r#"{"fake_news":false,"reasoning":"r","relevant_sources":[]}"#
        );
    }

    #[test]
    fn schema_requires_all_fields() {
        let schema = Verdict::json_schema();
        assert_eq!(
            schema["required"],
            json!(["fake_news", "reasoning", "relevant_sources"])
        );
        assert_eq!(schema["additionalProperties"], false);
        assert_eq!(Verdict::output_schema().name, VERDICT_SCHEMA_NAME);
    }

    #[test]
    fn restrict_policy_drops_unknown_sources() {
        let mut ctx = ResearchContext::new();
        ctx.add_hits(&[SearchHit::new("https://a.example/x/", "snippet")]);
        let mut verdict = Verdict {
            is_fake: true,
            reasoning: "r".into(),
            sources: vec!["https://a.example/x".into(), "https://made-up.example".into()],
        };

        let dropped = SourcePolicy::PassThrough.apply(&mut verdict.clone(), &ctx);
        assert!(dropped.is_empty());
        assert!(!sources_within_context(&verdict, &ctx));

        let dropped = SourcePolicy::RestrictToContext.apply(&mut verdict, &ctx);
        assert_eq!(dropped, vec!["https://made-up.example"]);
        assert_eq!(verdict.sources, vec!["https://a.example/x"]);
        assert!(sources_within_context(&verdict, &ctx));
    }

    #[test]
    fn source_policy_parses() {
        assert_eq!("restrict".parse::<SourcePolicy>().unwrap(), SourcePolicy::RestrictToContext);
        assert_eq!("pass-through".parse::<SourcePolicy>().unwrap(), SourcePolicy::PassThrough);
        assert!("strict".parse::<SourcePolicy>().is_err());
    }
}
