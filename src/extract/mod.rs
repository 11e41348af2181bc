//! Extraction provider adapter: turns (title, body) into an [`ExtractedInsight`]
//! or a typed [`ExtractionError`]. The orchestrator relies on this boundary never
//! panicking; every upstream problem comes back as an `Err`.

pub mod chat;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::ProviderConfig;
use crate::error::ExtractionError;
use crate::model::{ExtractedInsight, NamedEntities, UNKNOWN_CATEGORY};

pub use chat::ChatCompletionsExtractor;

#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, title: &str, body: &str) -> Result<ExtractedInsight, ExtractionError>;
    /// Provider name for diagnostics.
    fn name(&self) -> &'static str;
}

pub type DynExtractor = Arc<dyn Extractor>;

/// Factory: build an extractor according to config and environment variables.
///
/// * If `EXTRACTOR_TEST_MODE=mock`, returns a deterministic mock extractor.
/// * Else if `config.enabled==false`, every call fails with `Disabled`
///   (articles get `failed` insights and can be retried later).
/// * Else the chat-completions provider.
pub fn build_extractor(config: &ProviderConfig) -> anyhow::Result<DynExtractor> {
    if std::env::var("EXTRACTOR_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Ok(Arc::new(MockExtractor::default()));
    }
    if !config.enabled {
        tracing::warn!("extraction provider disabled; all articles will be marked failed");
        return Ok(Arc::new(DisabledExtractor));
    }
    Ok(Arc::new(ChatCompletionsExtractor::new(config)?))
}

/// Fails every call; used when no provider is configured.
pub struct DisabledExtractor;

#[async_trait]
impl Extractor for DisabledExtractor {
    async fn extract(
        &self,
        _title: &str,
        _body: &str,
    ) -> Result<ExtractedInsight, ExtractionError> {
        Err(ExtractionError::Disabled)
    }
    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Returns the same insight for every article.
#[derive(Clone)]
pub struct MockExtractor {
    pub fixed: ExtractedInsight,
}

impl Default for MockExtractor {
    fn default() -> Self {
        Self {
            fixed: ExtractedInsight {
                topics: "General".to_string(),
                keywords: "news".to_string(),
                named_entities: NamedEntities::default(),
                category: UNKNOWN_CATEGORY.to_string(),
            },
        }
    }
}

#[async_trait]
impl Extractor for MockExtractor {
    async fn extract(
        &self,
        _title: &str,
        _body: &str,
    ) -> Result<ExtractedInsight, ExtractionError> {
        Ok(self.fixed.clone())
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}

/// First `max_chars` characters of `s` (never splits a code point).
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// ------------------------------------------------------------
// Response parsing
// ------------------------------------------------------------

/// Models answer with either `"a, b"` or `["a", "b"]`; accept both.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TextField {
    Text(String),
    List(Vec<String>),
}

fn flatten(field: Option<TextField>) -> String {
    match field {
        Some(TextField::Text(s)) => s.trim().to_string(),
        Some(TextField::List(items)) => items
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        None => String::new(),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireInsight {
    #[serde(default)]
    topics: Option<TextField>,
    #[serde(default)]
    keywords: Option<TextField>,
    #[serde(default, alias = "named_entities")]
    named_entities: Option<WireEntities>,
    #[serde(default)]
    category: Option<TextField>,
}

#[derive(Debug, Default, Deserialize)]
struct WireEntities {
    #[serde(default)]
    people: Option<TextField>,
    #[serde(default)]
    organizations: Option<TextField>,
    #[serde(default)]
    locations: Option<TextField>,
}

/// Parses the provider's text answer. Prose around the JSON object is
/// ignored: only the span from the first `{` to the last `}` is decoded.
pub fn parse_insight_json(raw: &str) -> Result<ExtractedInsight, ExtractionError> {
    let span = match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if end > start => &raw[start..=end],
        _ => {
            return Err(ExtractionError::Parse(
                "no JSON object found in response".to_string(),
            ))
        }
    };
    let wire: WireInsight =
        serde_json::from_str(span).map_err(|e| ExtractionError::Parse(e.to_string()))?;

    let entities = wire.named_entities.unwrap_or_default();
    let category = flatten(wire.category);
    Ok(ExtractedInsight {
        topics: flatten(wire.topics),
        keywords: flatten(wire.keywords),
        named_entities: NamedEntities {
            people: flatten(entities.people),
            organizations: flatten(entities.organizations),
            locations: flatten(entities.locations),
        },
        category: if category.is_empty() {
            UNKNOWN_CATEGORY.to_string()
        } else {
            category
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapped_json_is_extracted() {
        let raw = r#"here is your answer: {"topics":"a,b","keywords":"k","namedEntities":{"people":"P","organizations":"O","locations":"L"},"category":"Science"} thanks"#;
        let out = parse_insight_json(raw).unwrap();
        assert_eq!(out.topics, "a,b");
        assert_eq!(out.keywords, "k");
        assert_eq!(out.named_entities.people, "P");
        assert_eq!(out.named_entities.organizations, "O");
        assert_eq!(out.named_entities.locations, "L");
        assert_eq!(out.category, "Science");
    }

    #[test]
    fn code_fenced_json_is_extracted() {
        let raw = "```json\n{\"topics\": \"x\", \"category\": \"Health\"}\n```";
        let out = parse_insight_json(raw).unwrap();
        assert_eq!(out.topics, "x");
        assert_eq!(out.category, "Health");
    }

    #[test]
    fn arrays_are_joined() {
        let raw = r#"{"topics":["a"," b ",""],"named_entities":{"people":["X","Y"]}}"#;
        let out = parse_insight_json(raw).unwrap();
        assert_eq!(out.topics, "a, b");
        assert_eq!(out.named_entities.people, "X, Y");
        assert_eq!(out.named_entities.locations, "");
    }

    #[test]
    fn missing_category_defaults_to_unknown() {
        let out = parse_insight_json(r#"{"topics":"t","category":null}"#).unwrap();
        assert_eq!(out.category, UNKNOWN_CATEGORY);
    }

    #[test]
    fn no_braces_is_parse_error() {
        let err = parse_insight_json("I could not analyze this article.").unwrap_err();
        assert!(matches!(err, ExtractionError::Parse(_)));
    }

    #[test]
    fn reversed_braces_is_parse_error() {
        let err = parse_insight_json("} nothing here {").unwrap_err();
        assert!(matches!(err, ExtractionError::Parse(_)));
    }

    #[test]
    fn broken_json_span_is_parse_error() {
        let err = parse_insight_json(r#"{"topics": "a", }"#).unwrap_err();
        assert!(matches!(err, ExtractionError::Parse(_)));
    }

    #[test]
    fn truncation_counts_chars_not_bytes() {
        let s = "žluťoučký kůň";
        assert_eq!(truncate_chars(s, 4), "žluť");
        assert_eq!(truncate_chars(s, 100), s);
        assert_eq!(truncate_chars("", 3), "");
    }

    #[tokio::test]
    async fn disabled_extractor_fails_typed() {
        let res = DisabledExtractor.extract("t", "b").await;
        assert!(matches!(res, Err(ExtractionError::Disabled)));
    }
}
