//! OpenAI-compatible chat-completions provider (Groq by default).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{parse_insight_json, truncate_chars, Extractor};
use crate::config::ProviderConfig;
use crate::error::ExtractionError;
use crate::model::ExtractedInsight;

const SYSTEM_PROMPT: &str =
    "You analyze news articles. Answer with a single JSON object and nothing else.";

pub struct ChatCompletionsExtractor {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_body_chars: usize,
}

impl ChatCompletionsExtractor {
    pub fn new(cfg: &ProviderConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("feed-insights/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", cfg.base_url.trim_end_matches('/')),
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            max_body_chars: cfg.max_body_chars,
        })
    }
}

/// User prompt asking for the canonical insight shape.
pub fn build_prompt(title: &str, body: &str) -> String {
    format!(
        r#"Analyze this news article and extract the following information in JSON format:
1. Main topics (up to 3), as a comma-separated string
2. Keywords (up to 5), as a comma-separated string
3. Named entities (people, organizations, locations), each as a comma-separated string
4. Category (one of: Politics, Technology, Business, Sports, Entertainment, Science, Health)

Title: {title}
Content: {body}

Respond only with a JSON object containing these fields:
{{
  "topics": "",
  "keywords": "",
  "namedEntities": {{"people": "", "organizations": "", "locations": ""}},
  "category": ""
}}"#
    )
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    temperature: f32,
}

#[derive(Deserialize)]
struct Resp {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMsg,
}

#[derive(Deserialize)]
struct ChoiceMsg {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl Extractor for ChatCompletionsExtractor {
    async fn extract(&self, title: &str, body: &str) -> Result<ExtractedInsight, ExtractionError> {
        if self.api_key.is_empty() {
            return Err(ExtractionError::MissingApiKey("chat-completions"));
        }

        let prompt = build_prompt(title, truncate_chars(body, self.max_body_chars));
        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Msg {
                    role: "user",
                    content: &prompt,
                },
            ],
            temperature: 0.2,
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ExtractionError::Status {
                status: status.as_u16(),
                body: truncate_chars(&text, 200).to_string(),
            });
        }

        let text = resp.text().await?;
        let body: Resp =
            serde_json::from_str(&text).map_err(|e| ExtractionError::Parse(e.to_string()))?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        if content.trim().is_empty() {
            return Err(ExtractionError::EmptyResponse);
        }
        parse_insight_json(&content)
    }

    fn name(&self) -> &'static str {
        "chat-completions"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_carries_title_and_body() {
        let p = build_prompt("Rates held", "The central bank kept rates.");
        assert!(p.contains("Title: Rates held"));
        assert!(p.contains("Content: The central bank kept rates."));
        assert!(p.contains("\"namedEntities\""));
    }

    #[tokio::test]
    async fn missing_key_fails_without_network() {
        let cfg = ProviderConfig {
            enabled: true,
            ..ProviderConfig::default()
        };
        let ex = ChatCompletionsExtractor::new(&cfg).unwrap();
        let res = ex.extract("t", "b").await;
        assert!(matches!(res, Err(ExtractionError::MissingApiKey(_))));
    }

    #[test]
    fn endpoint_joins_base_url() {
        let cfg = ProviderConfig {
            base_url: "http://localhost:9999/v1/".into(),
            ..ProviderConfig::default()
        };
        let ex = ChatCompletionsExtractor::new(&cfg).unwrap();
        assert_eq!(ex.endpoint, "http://localhost:9999/v1/chat/completions");
    }

    // Canned upstream served on a loopback port; one path prefix per behaviour.
    mod upstream {
        use std::sync::{Arc, Mutex};

        use axum::extract::State;
        use axum::http::StatusCode;
        use axum::routing::post;
        use axum::{Json, Router};
        use serde_json::{json, Value};

        use crate::config::ProviderConfig;
        use crate::error::ExtractionError;
        use crate::extract::chat::ChatCompletionsExtractor;
        use crate::extract::Extractor;

        type Seen = Arc<Mutex<Vec<Value>>>;

        async fn answer(State(seen): State<Seen>, Json(req): Json<Value>) -> Json<Value> {
            seen.lock().unwrap().push(req);
            let content = r#"Sure, here it is: {"topics": ["rates", "inflation"], "keywords": "fed, cpi", "namedEntities": {"people": "Powell", "organizations": "Fed", "locations": "US"}, "category": ""} Hope this helps."#;
            Json(json!({ "choices": [{ "message": { "content": content } }] }))
        }

        async fn serve() -> (String, Seen) {
            let seen = Seen::default();
            let app = Router::new()
                .route("/ok/chat/completions", post(answer))
                .route(
                    "/down/chat/completions",
                    post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "upstream busy") }),
                )
                .route("/garbled/chat/completions", post(|| async { "<html>" }))
                .route(
                    "/silent/chat/completions",
                    post(|| async { Json(json!({ "choices": [] })) }),
                )
                .with_state(seen.clone());
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
            (format!("http://{addr}"), seen)
        }

        fn extractor_at(base: &str, path: &str) -> ChatCompletionsExtractor {
            let cfg = ProviderConfig {
                enabled: true,
                base_url: format!("{base}/{path}"),
                api_key: "test-key".into(),
                ..ProviderConfig::default()
            };
            ChatCompletionsExtractor::new(&cfg).unwrap()
        }

        #[tokio::test]
        async fn wrapped_reply_is_parsed_and_body_truncated() {
            let (base, seen) = serve().await;
            let body = "é".repeat(5_000);

            let out = extractor_at(&base, "ok").extract("Rates", &body).await.unwrap();
            assert_eq!(out.topics, "rates, inflation");
            assert_eq!(out.keywords, "fed, cpi");
            assert_eq!(out.named_entities.people, "Powell");
            assert_eq!(out.category, "Unknown");

            let seen = seen.lock().unwrap();
            assert_eq!(seen.len(), 1);
            let prompt = seen[0]["messages"][1]["content"].as_str().unwrap();
            let sent = prompt
                .split_once("Content: ")
                .and_then(|(_, rest)| rest.split_once("\n\nRespond"))
                .map(|(content, _)| content)
                .unwrap();
            assert_eq!(sent.chars().count(), 4_000);
        }

        #[tokio::test]
        async fn non_success_status_is_reported() {
            let (base, _) = serve().await;
            let err = extractor_at(&base, "down").extract("t", "b").await.unwrap_err();
            match err {
                ExtractionError::Status { status, body } => {
                    assert_eq!(status, 503);
                    assert_eq!(body, "upstream busy");
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }

        #[tokio::test]
        async fn malformed_envelope_is_a_parse_error() {
            let (base, _) = serve().await;
            let err = extractor_at(&base, "garbled").extract("t", "b").await.unwrap_err();
            assert!(matches!(err, ExtractionError::Parse(_)), "{err:?}");
        }

        #[tokio::test]
        async fn no_choices_is_an_empty_response() {
            let (base, _) = serve().await;
            let err = extractor_at(&base, "silent").extract("t", "b").await.unwrap_err();
            assert!(matches!(err, ExtractionError::EmptyResponse), "{err:?}");
        }
    }
}
