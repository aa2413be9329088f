//! Concrete LLM backends for the DLP query pipeline.

pub use dlp_core::{GatewayError, LlmGateway};

mod model_router;

pub use model_router::{LlmMode, ModelRouter};
