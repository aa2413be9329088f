//! Model Router: sends the prompt envelope to a mock LLM or a live Ollama-compatible
//! `/api/chat` endpoint and returns the generated text.

use dlp_core::prompts::{LEGAL_DISCLAIMER, OUT_OF_SCOPE_REPLY};
use dlp_core::{CoreConfig, GatewayError, LlmGateway, PromptEnvelope, NO_DOCUMENTS_FOUND};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_HOST: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "qwen2.5:1.5b";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const MOCK_MODEL: &str = "mock";
/// Upper bound on upstream error text carried in a gateway cause.
const ERROR_PREVIEW_CHARS: usize = 200;

/// Mode for LLM invocation: mock (offline, deterministic) or live (calls the chat service).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LlmMode {
    Mock,
    #[default]
    Live,
}

impl LlmMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mock" => Some(LlmMode::Mock),
            "live" | "ollama" => Some(LlmMode::Live),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: String,
}

/// Routes a prompt envelope to the mock generator or the live chat endpoint.
/// One attempt per call; no retries.
pub struct ModelRouter {
    mode: LlmMode,
    host: String,
    model: String,
    client: reqwest::Client,
}

impl ModelRouter {
    /// Live router against `host` with a bounded per-request wait.
    pub fn new(host: &str, model: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(
                    target: "dlp::llm",
                    error = %e,
                    "HTTP client build failed; falling back to a client without timeout"
                );
                reqwest::Client::new()
            });
        Self {
            mode: LlmMode::Live,
            host: host.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client,
        }
    }

    pub fn mock() -> Self {
        Self::with_mode(LlmMode::Mock)
    }

    pub fn with_mode(mode: LlmMode) -> Self {
        let mut router = Self::new(DEFAULT_HOST, DEFAULT_MODEL, DEFAULT_TIMEOUT);
        router.mode = mode;
        if mode == LlmMode::Mock {
            router.model = MOCK_MODEL.to_string();
        }
        router
    }

    pub fn from_config(config: &CoreConfig) -> Self {
        let mode = LlmMode::parse(&config.llm_mode).unwrap_or_else(|| {
            tracing::warn!(target: "dlp::llm", value = %config.llm_mode, "Unknown llm_mode; using live");
            LlmMode::Live
        });
        let mut router = Self::new(
            &config.llm_host,
            &config.llm_model,
            Duration::from_secs(config.llm_timeout_secs.max(1)),
        );
        router.mode = mode;
        if mode == LlmMode::Mock {
            router.model = MOCK_MODEL.to_string();
        }
        router
    }

    pub fn mode(&self) -> LlmMode {
        self.mode
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.host)
    }

    /// Mock LLM: follows the answering contract without a model. Off-topic (no documents)
    /// gets the scope refusal; otherwise the start of the retrieved context is echoed.
    fn mock_generate(&self, envelope: &PromptEnvelope) -> String {
        let body = if envelope.user_message.contains(NO_DOCUMENTS_FOUND) {
            OUT_OF_SCOPE_REPLY.to_string()
        } else {
            let context = envelope
                .user_message
                .lines()
                .skip(1)
                .take_while(|l| !l.starts_with("### "))
                .collect::<Vec<_>>()
                .join(" ");
            format!(
                "[Generated – Mock LLM] Based on the knowledge base: {}",
                preview(&context, 160).trim()
            )
        };
        format!("{}\n\n{}", body, LEGAL_DISCLAIMER)
    }

    async fn live_generate(&self, envelope: &PromptEnvelope) -> Result<String, GatewayError> {
        let url = self.chat_url();
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: envelope.system_message,
                },
                ChatMessage {
                    role: "user",
                    content: &envelope.user_message,
                },
            ],
            stream: false,
        };

        tracing::debug!(target: "dlp::llm", url = %url, model = %self.model, "Sending chat request");
        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(classify)?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            tracing::error!(target: "dlp::llm", %status, body = %body, "LLM API returned an error status");
            return Err(GatewayError::Status(format!(
                "LLM API error {}: {}",
                status,
                preview(&body, ERROR_PREVIEW_CHARS)
            )));
        }

        let parsed: ChatResponse = res.json().await.map_err(classify)?;
        if parsed.message.content.trim().is_empty() {
            return Err(GatewayError::MalformedResponse(
                "LLM returned an empty completion".to_string(),
            ));
        }
        tracing::debug!(target: "dlp::llm", chars = parsed.message.content.len(), "Chat response received");
        Ok(parsed.message.content)
    }
}

/// First `max_chars` characters of `text`, with `…` when cut.
fn preview(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        out.push('…');
    }
    out
}

/// Maps a reqwest failure onto the gateway taxonomy.
fn classify(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout(format!("LLM request timed out: {}", e))
    } else if e.is_decode() {
        GatewayError::MalformedResponse(format!("LLM response parse failed: {}", e))
    } else {
        GatewayError::Transport(format!("LLM request failed: {}", e))
    }
}

impl Default for ModelRouter {
    fn default() -> Self {
        Self::with_mode(LlmMode::default())
    }
}

#[async_trait::async_trait]
impl LlmGateway for ModelRouter {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, envelope: &PromptEnvelope) -> Result<String, GatewayError> {
        match self.mode {
            LlmMode::Mock => Ok(self.mock_generate(envelope)),
            LlmMode::Live => self.live_generate(envelope).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dlp_core::{KnowledgeBase, PromptBuilder, QueryProcessor};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn envelope(query: &str) -> PromptEnvelope {
        let kb = KnowledgeBase::dlp_default().unwrap();
        PromptBuilder::new().build(query, &kb.lookup(query))
    }

    /// Serves exactly one HTTP request with the given raw status line and body.
    /// `None` accepts the connection and never answers.
    async fn one_shot_server(response: Option<(&'static str, String)>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 64 * 1024];
            let mut read = 0;
            loop {
                let n = socket.read(&mut buf[read..]).await.unwrap_or(0);
                if n == 0 {
                    break;
                }
                read += n;
                let text = String::from_utf8_lossy(&buf[..read]);
                if let Some(end) = text.find("\r\n\r\n") {
                    let len = text[..end]
                        .lines()
                        .find_map(|l| {
                            l.to_ascii_lowercase()
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                        })
                        .unwrap_or(0);
                    if read >= end + 4 + len {
                        break;
                    }
                }
            }
            match response {
                Some((status, body)) => {
                    let reply = format!(
                        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(reply.as_bytes()).await;
                    let _ = socket.shutdown().await;
                }
                None => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                }
            }
        });
        format!("http://{}", addr)
    }

    #[test]
    fn llm_mode_parsing() {
        assert_eq!(LlmMode::parse("mock"), Some(LlmMode::Mock));
        assert_eq!(LlmMode::parse("LIVE"), Some(LlmMode::Live));
        assert_eq!(LlmMode::parse("ollama"), Some(LlmMode::Live));
        assert_eq!(LlmMode::parse("gpt"), None);
    }

    #[test]
    fn from_config_uses_configured_model_and_mode() {
        let config = CoreConfig {
            llm_mode: "live".into(),
            llm_model: "llama3".into(),
            llm_host: "http://10.0.0.5:11434/".into(),
            ..CoreConfig::default()
        };
        let router = ModelRouter::from_config(&config);
        assert_eq!(router.mode(), LlmMode::Live);
        assert_eq!(router.model(), "llama3");
        assert_eq!(router.chat_url(), "http://10.0.0.5:11434/api/chat");

        let mock = ModelRouter::from_config(&CoreConfig {
            llm_mode: "mock".into(),
            ..CoreConfig::default()
        });
        assert_eq!(mock.mode(), LlmMode::Mock);
        assert_eq!(mock.model(), "mock");
    }

    #[tokio::test]
    async fn mock_refuses_off_topic_and_always_appends_disclaimer() {
        let router = ModelRouter::mock();
        let off_topic = router.complete(&envelope("how do I bake bread")).await.unwrap();
        assert!(off_topic.starts_with(OUT_OF_SCOPE_REPLY));
        assert!(off_topic.ends_with(LEGAL_DISCLAIMER));

        let on_topic = router.complete(&envelope("Can I go to the tribunal?")).await.unwrap();
        assert!(on_topic.contains("12 months after expiry"));
        assert!(on_topic.ends_with(LEGAL_DISCLAIMER));
    }

    #[tokio::test]
    async fn live_returns_message_content() {
        let host = one_shot_server(Some((
            "200 OK",
            r#"{"model":"qwen2.5:1.5b","message":{"role":"assistant","content":"24 months."},"done":true}"#.to_string(),
        )))
        .await;
        let router = ModelRouter::new(&host, "qwen2.5:1.5b", Duration::from_secs(5));
        let text = router.complete(&envelope("duration?")).await.unwrap();
        assert_eq!(text, "24 months.");
    }

    #[tokio::test]
    async fn live_non_success_status_is_status_error() {
        let host = one_shot_server(Some(("500 Internal Server Error", r#"{"error":"model not found"}"#.to_string()))).await;
        let router = ModelRouter::new(&host, "missing", Duration::from_secs(5));
        let err = router.complete(&envelope("duration?")).await.unwrap_err();
        assert!(matches!(err, GatewayError::Status(_)));
        assert!(err.to_string().contains("model not found"));
    }

    #[tokio::test]
    async fn large_error_body_is_truncated_in_the_answer() {
        let body = format!(
            r#"{{"error":"{} internal trace: /srv/ollama/secret_path.go"}}"#,
            "x".repeat(20 * 1024)
        );
        let host = one_shot_server(Some(("500 Internal Server Error", body))).await;
        let router = ModelRouter::new(&host, "m", Duration::from_secs(5));
        let processor = QueryProcessor::new(
            Arc::new(KnowledgeBase::dlp_default().unwrap()),
            Arc::new(router),
        );
        let answer = processor.resolve("duration?").await;
        assert!(answer.starts_with("System Error: LLM API error 500"));
        assert!(answer.ends_with('…'));
        assert!(!answer.contains("secret_path.go"));
        assert!(answer.chars().count() < 300, "answer length {}", answer.len());
    }

    #[test]
    fn preview_cuts_on_char_boundaries() {
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("ééééé", 3), "ééé…");
    }

    #[tokio::test]
    async fn live_malformed_body_is_malformed_response() {
        let host = one_shot_server(Some(("200 OK", r#"{"unexpected":true}"#.to_string()))).await;
        let router = ModelRouter::new(&host, "m", Duration::from_secs(5));
        let err = router.complete(&envelope("duration?")).await.unwrap_err();
        assert!(matches!(err, GatewayError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn live_blank_content_is_malformed_response() {
        let host = one_shot_server(Some(("200 OK", r#"{"message":{"role":"assistant","content":"  "}}"#.to_string()))).await;
        let router = ModelRouter::new(&host, "m", Duration::from_secs(5));
        let err = router.complete(&envelope("duration?")).await.unwrap_err();
        assert!(matches!(err, GatewayError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn live_timeout_is_timeout_error() {
        let host = one_shot_server(None).await;
        let router = ModelRouter::new(&host, "m", Duration::from_millis(200));
        let err = router.complete(&envelope("duration?")).await.unwrap_err();
        assert!(matches!(err, GatewayError::Timeout(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn live_unreachable_host_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let router = ModelRouter::new(&format!("http://{}", addr), "m", Duration::from_secs(5));
        let err = router.complete(&envelope("duration?")).await.unwrap_err();
        assert!(matches!(err, GatewayError::Transport(_)), "got {:?}", err);
    }
}
