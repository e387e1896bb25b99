pub mod client;
pub mod params;
pub mod providers;

pub use client::{LlmClient, LlmError, LlmResponse, ToolLoopClient};
pub use params::{ModelOverrides, ModelParams};
pub use providers::create_client;
pub use providers::gemini::GeminiToolProvider;
