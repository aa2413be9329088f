//! Axum-based API Gateway: HTTP entry point for the DLP assistant. Config-driven via CoreConfig.

mod handlers;

use axum::{
    extract::State,
    http::Method,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use dlp_core::prompts::DLP_ASSISTANT_PROMPT_VERSION;
use dlp_core::{ConversationLog, CoreConfig, KnowledgeBase, KnowledgeError, QueryProcessor};
use dlp_skills::ModelRouter;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tracing::field::{Field, Visit};
use tracing_subscriber::layer::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Captures the "message" field and the remaining fields of a tracing event.
#[derive(Default)]
struct FieldCollector {
    message: String,
    fields: Vec<String>,
}

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push(format!("{}={}", field.name(), value));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.fields.push(format!("{}={:?}", field.name(), value));
        }
    }
}

/// Sends each tracing event as a line to a broadcast channel for SSE log streaming.
#[derive(Clone)]
struct LogBroadcastLayer {
    tx: broadcast::Sender<String>,
}

impl<S> tracing_subscriber::Layer<S> for LogBroadcastLayer
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut collector = FieldCollector::default();
        event.record(&mut collector);
        let mut line = format!(
            "{} [{}] {}",
            event.metadata().level(),
            event.metadata().target(),
            collector.message
        );
        if !collector.fields.is_empty() {
            line.push(' ');
            line.push_str(&collector.fields.join(" "));
        }
        // No subscribers is the normal case; dropping the line is fine.
        let _ = self.tx.send(line);
    }
}

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) config: Arc<CoreConfig>,
    pub(crate) processor: Arc<QueryProcessor>,
    pub(crate) history: Arc<ConversationLog>,
    pub(crate) log_tx: broadcast::Sender<String>,
}

/// Bundled DLP set unless `knowledge_path` points at a JSON file.
fn load_knowledge(config: &CoreConfig) -> Result<KnowledgeBase, KnowledgeError> {
    match config.knowledge_path.as_deref().filter(|p| !p.trim().is_empty()) {
        Some(path) => KnowledgeBase::load_json_path(path),
        None => KnowledgeBase::dlp_default(),
    }
}

/// Pre-flight check: config, knowledge set, history DB and port.
fn run_verify() -> Result<(), String> {
    let config = CoreConfig::load().map_err(|e| format!("Config load failed: {}", e))?;

    print!("Checking knowledge base... ");
    let kb = load_knowledge(&config).map_err(|e| format!("Knowledge base invalid: {}", e))?;
    println!("OK ({} entries)", kb.len());

    let history_path = config.history_path();
    print!("Checking {}... ", history_path.display());
    let log = ConversationLog::open_path(&history_path)
        .map_err(|e| format!("dlp_history LOCKED or inaccessible: {}", e))?;
    log.recent_exchanges(1)
        .map_err(|e| format!("dlp_history unreadable: {}", e))?;
    drop(log);
    println!("OK");

    let port = config.port;
    print!("Checking port {}... ", port);
    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));
    match std::net::TcpListener::bind(addr) {
        Ok(listener) => {
            drop(listener);
            println!("OK (available)");
        }
        Err(e) => return Err(format!("Port {} BLOCKED: {}", port, e)),
    }

    println!(
        "\nSUCCESS: ready to start gateway (llm_mode={}, model={}).",
        config.llm_mode, config.llm_model
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env::var calls)
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[dlp-gateway] .env not loaded: {} (using system environment)", e);
    }

    if std::env::args().any(|a| a == "--verify") {
        match run_verify() {
            Ok(()) => std::process::exit(0),
            Err(e) => {
                eprintln!("PRE-FLIGHT FAILED: {}", e);
                std::process::exit(1);
            }
        }
    }

    let (log_tx, _) = broadcast::channel(1000);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .with(LogBroadcastLayer { tx: log_tx.clone() })
        .init();

    let config = match CoreConfig::load() {
        Ok(c) => Arc::new(c),
        Err(e) => {
            tracing::error!(target: "dlp::gateway", error = %e, "Config load failed");
            std::process::exit(1);
        }
    };

    let knowledge = match load_knowledge(&config) {
        Ok(kb) => Arc::new(kb),
        Err(e) => {
            tracing::error!(target: "dlp::gateway", error = %e, "Knowledge base load failed");
            std::process::exit(1);
        }
    };
    tracing::info!(target: "dlp::knowledge", entries = knowledge.len(), "Knowledge base ready");

    let history = match ConversationLog::open_path(config.history_path()) {
        Ok(h) => Arc::new(h),
        Err(e) => {
            tracing::error!(target: "dlp::gateway", error = %e, "Conversation log open failed");
            std::process::exit(1);
        }
    };

    let router = Arc::new(ModelRouter::from_config(&config));
    tracing::info!(
        target: "dlp::llm",
        mode = ?router.mode(),
        host = %config.llm_host,
        model = %config.llm_model,
        timeout_secs = config.llm_timeout_secs,
        "LLM gateway configured"
    );
    let processor = Arc::new(QueryProcessor::new(knowledge, router).with_mode(config.resolve_mode()));

    let app = build_app(AppState {
        config: Arc::clone(&config),
        processor,
        history,
        log_tx,
    });

    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(target: "dlp::gateway", %addr, error = %e, "Bind failed");
            std::process::exit(1);
        }
    };
    tracing::info!(target: "dlp::gateway", "{} listening on {}", config.app_name, addr);
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(target: "dlp::gateway", error = %e, "Server stopped");
        std::process::exit(1);
    }
}

fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/v1/status", get(status))
        .route("/api/v1/health", get(health))
        .route("/api/v1/logs", get(logs_stream))
        .route("/api/chat", post(handlers::chat::chat))
        .route("/api/guidelines", get(handlers::content::guidelines))
        .route("/api/legal-references", get(handlers::content::legal_references))
        .route("/api/history", get(handlers::content::history))
        .route("/api/feedback", post(handlers::feedback::feedback))
        .with_state(state)
        .layer(cors)
}

/// GET /api/v1/health – liveness check for UI and scripts.
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /v1/status – app identity and pipeline configuration.
async fn status(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "app_name": state.config.app_name,
        "port": state.config.port,
        "llm_mode": state.config.llm_mode,
        "llm_model": state.processor.gateway_model(),
        "resolve_mode": state.processor.mode(),
        "knowledge_entries": state.processor.knowledge().len(),
        "prompt_version": DLP_ASSISTANT_PROMPT_VERSION,
    }))
}

/// GET /api/v1/logs – Server-Sent Events stream of gateway logs (tracing output).
async fn logs_stream(
    State(state): State<AppState>,
) -> Sse<impl futures_util::Stream<Item = Result<Event, std::convert::Infallible>> + Send + 'static> {
    use async_stream::stream;
    let mut rx = state.log_tx.subscribe();
    let stream = stream! {
        loop {
            match rx.recv().await {
                Ok(line) => yield Ok(Event::default().data(line)),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    yield Ok(Event::default().data(format!("... {} log lines dropped", n)));
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };
    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)).text("keepalive"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use dlp_core::prompts::{LEGAL_DISCLAIMER, OUT_OF_SCOPE_REPLY};
    use dlp_core::{GatewayError, LlmGateway, PromptEnvelope};
    use tower::ServiceExt;

    struct TimeoutGateway;

    #[async_trait::async_trait]
    impl LlmGateway for TimeoutGateway {
        fn model(&self) -> &str {
            "timeout"
        }

        async fn complete(&self, _envelope: &PromptEnvelope) -> Result<String, GatewayError> {
            Err(GatewayError::timeout("deadline exceeded"))
        }
    }

    fn test_config() -> CoreConfig {
        CoreConfig {
            app_name: "Test Gateway".to_string(),
            llm_mode: "mock".to_string(),
            ..CoreConfig::default()
        }
    }

    fn test_state(dir: &tempfile::TempDir, gateway: Arc<dyn LlmGateway>) -> AppState {
        let (log_tx, _) = broadcast::channel(1);
        let knowledge = Arc::new(KnowledgeBase::dlp_default().unwrap());
        AppState {
            config: Arc::new(test_config()),
            processor: Arc::new(QueryProcessor::new(knowledge, gateway)),
            history: Arc::new(ConversationLog::open_path(dir.path().join("history")).unwrap()),
            log_tx,
        }
    }

    fn mock_state(dir: &tempfile::TempDir) -> AppState {
        test_state(dir, Arc::new(ModelRouter::mock()))
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap()
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let (status, json) = send(build_app(mock_state(&dir)), get_req("/api/v1/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_status_reports_pipeline_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let (status, json) = send(build_app(mock_state(&dir)), get_req("/v1/status")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["app_name"], "Test Gateway");
        assert_eq!(json["llm_mode"], "mock");
        assert_eq!(json["llm_model"], "mock");
        assert_eq!(json["resolve_mode"], "augment");
        assert_eq!(json["knowledge_entries"], dlp_core::DLP_RULES.len());
        assert_eq!(json["prompt_version"], DLP_ASSISTANT_PROMPT_VERSION);
    }

    #[tokio::test]
    async fn test_chat_rejects_empty_message() {
        let dir = tempfile::tempdir().unwrap();
        let state = mock_state(&dir);
        let history = Arc::clone(&state.history);
        let (status, json) = send(
            build_app(state),
            post_json("/api/chat", serde_json::json!({ "message": "   " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Empty message");
        assert!(history.recent_exchanges(10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_chat_answers_and_records_exchange() {
        let dir = tempfile::tempdir().unwrap();
        let state = mock_state(&dir);
        let history = Arc::clone(&state.history);
        let (status, json) = send(
            build_app(state),
            post_json("/api/chat", serde_json::json!({ "message": "  What is the DLP duration?  " })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["sources"], serde_json::json!(["duration"]));
        assert_eq!(json["outcome"], "generated");
        let response = json["response"].as_str().unwrap();
        assert!(response.ends_with(LEGAL_DISCLAIMER));

        let saved = history.recent_exchanges(1).unwrap();
        assert_eq!(saved[0].user, "What is the DLP duration?");
        assert_eq!(saved[0].bot, response);
    }

    #[tokio::test]
    async fn test_chat_off_topic_gets_scope_refusal() {
        let dir = tempfile::tempdir().unwrap();
        let (status, json) = send(
            build_app(mock_state(&dir)),
            post_json("/api/chat", serde_json::json!({ "message": "how do I bake bread" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["sources"], serde_json::json!([]));
        assert!(json["response"].as_str().unwrap().starts_with(OUT_OF_SCOPE_REPLY));
    }

    #[tokio::test]
    async fn test_chat_gateway_failure_is_system_error_answer() {
        let dir = tempfile::tempdir().unwrap();
        let (status, json) = send(
            build_app(test_state(&dir, Arc::new(TimeoutGateway))),
            post_json("/api/chat", serde_json::json!({ "message": "tribunal fee?" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["response"], "System Error: deadline exceeded");
        assert_eq!(json["outcome"], "failed");
    }

    #[tokio::test]
    async fn test_static_content_endpoints() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_app(mock_state(&dir));
        let (_, guidelines) = send(app.clone(), get_req("/api/guidelines")).await;
        assert_eq!(guidelines["guidelines"].as_array().unwrap().len(), 10);
        assert_eq!(guidelines["guidelines"][0]["title"], "DLP Duration");

        let (_, refs) = send(app, get_req("/api/legal-references")).await;
        assert_eq!(refs["references"].as_array().unwrap().len(), 4);
        assert_eq!(refs["references"][2]["title"], "Strata Management Act 2013");
    }

    #[tokio::test]
    async fn test_feedback_saved_and_validated() {
        let dir = tempfile::tempdir().unwrap();
        let state = mock_state(&dir);
        let history = Arc::clone(&state.history);
        let app = build_app(state);

        let (status, json) = send(
            app.clone(),
            post_json(
                "/api/feedback",
                serde_json::json!({ "type": "general", "rating": 5, "message": "Clear answers", "email": "" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");

        let (status, json) = send(
            app,
            post_json(
                "/api/feedback",
                serde_json::json!({ "type": "bug", "rating": 9, "message": "?" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("rating"));

        let stored = history.recent_feedback(10).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].message, "Clear answers");
    }

    #[tokio::test]
    async fn test_feedback_out_of_range_and_undecodable_bodies_are_400() {
        let dir = tempfile::tempdir().unwrap();
        let state = mock_state(&dir);
        let history = Arc::clone(&state.history);
        let app = build_app(state);

        for rating in [-1, 300] {
            let (status, json) = send(
                app.clone(),
                post_json(
                    "/api/feedback",
                    serde_json::json!({ "type": "bug", "rating": rating, "message": "?" }),
                ),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "rating {}", rating);
            assert!(json["error"].as_str().unwrap().contains(&format!("got {}", rating)));
        }

        let (status, json) = send(
            app,
            post_json("/api/feedback", serde_json::json!({ "type": "bug", "rating": "five" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].is_string());
        assert!(history.recent_feedback(10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_history_endpoint_returns_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let state = mock_state(&dir);
        state.history.save_exchange("older", "a").unwrap();
        state.history.save_exchange("newer", "b").unwrap();

        let (status, json) = send(build_app(state), get_req("/api/history?limit=1")).await;
        assert_eq!(status, StatusCode::OK);
        let items = json["history"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["user"], "newer");
    }

    #[test]
    fn test_load_knowledge_prefers_configured_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kb.json");
        std::fs::write(&path, r#"[{"key":"schedule g","text":"Landed."}]"#).unwrap();
        let config = CoreConfig {
            knowledge_path: Some(path.to_string_lossy().into_owned()),
            ..CoreConfig::default()
        };
        let kb = load_knowledge(&config).unwrap();
        assert_eq!(kb.len(), 1);

        let bundled = load_knowledge(&CoreConfig::default()).unwrap();
        assert_eq!(bundled.len(), dlp_core::DLP_RULES.len());
    }
}
