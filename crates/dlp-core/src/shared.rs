//! Configuration shared by the gateway and its LLM backend.

use crate::orchestrator::ResolveMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global application configuration. Load from TOML or env.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Application identity reported by `/v1/status`.
    pub app_name: String,
    /// HTTP port for the gateway.
    pub port: u16,
    /// Base directory for sled DBs (the conversation log path is derived from this).
    pub storage_path: String,
    /// LLM mode: "mock" or "live".
    pub llm_mode: String,
    /// Base URL of the Ollama-compatible chat service.
    pub llm_host: String,
    /// Model identifier sent with every completion request.
    pub llm_model: String,
    /// Bounded wait for one completion call.
    pub llm_timeout_secs: u64,
    /// "augment" (always consult the model) or "direct" (rule-based fast path on a hit).
    pub resolve_mode: String,
    /// Optional JSON knowledge file replacing the bundled DLP set.
    #[serde(default)]
    pub knowledge_path: Option<String>,
}

impl CoreConfig {
    /// Load config from file and environment. Precedence: env `DLP__*` > file at `DLP_CONFIG`
    /// (default `config/gateway`) > defaults.
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path = std::env::var("DLP_CONFIG").unwrap_or_else(|_| "config/gateway".to_string());
        let builder = config::Config::builder()
            .set_default("app_name", "DLP Assistant")?
            .set_default("port", 8001_i64)?
            .set_default("storage_path", "./data")?
            .set_default("llm_mode", "live")?
            .set_default("llm_host", "http://localhost:11434")?
            .set_default("llm_model", "qwen2.5:1.5b")?
            .set_default("llm_timeout_secs", 60_i64)?
            .set_default("resolve_mode", "augment")?;

        // `File::with_name` also resolves `config/gateway` to `config/gateway.toml`.
        let builder = builder.add_source(config::File::with_name(&config_path).required(false));

        let built = builder
            .add_source(config::Environment::with_prefix("DLP").separator("__"))
            .build()?;

        built.try_deserialize()
    }

    /// Parsed resolve mode; unknown values fall back to `Augment`.
    pub fn resolve_mode(&self) -> ResolveMode {
        ResolveMode::parse(&self.resolve_mode).unwrap_or_else(|| {
            tracing::warn!(
                target: "dlp::config",
                value = %self.resolve_mode,
                "Unknown resolve_mode; using augment"
            );
            ResolveMode::Augment
        })
    }

    /// Location of the sled conversation log.
    pub fn history_path(&self) -> PathBuf {
        Path::new(&self.storage_path).join("dlp_history")
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            app_name: "DLP Assistant".to_string(),
            port: 8001,
            storage_path: "./data".to_string(),
            llm_mode: "live".to_string(),
            llm_host: "http://localhost:11434".to_string(),
            llm_model: "qwen2.5:1.5b".to_string(),
            llm_timeout_secs: 60,
            resolve_mode: "augment".to_string(),
            knowledge_path: None,
        }
    }
}
