//! # agent-runtime
//!
//! Runtime pieces for the weather assistant.
//!
//! ## Providers
//!
//! - **OpenAI**: any OpenAI-compatible chat-completions endpoint
//! - **Ollama** (feature `ollama`): local LLM inference via Ollama
//!
//! ## Tool channel
//!
//! - [`channel::StdioChannel`]: spawns the Tool Host and talks JSON-RPC over its stdio
//! - [`server::ToolServer`]: the Tool Host side of the same protocol
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_runtime::{OpenAiProvider, StdioChannel};
//!
//! let provider = OpenAiProvider::from_env()?;
//! let channel = StdioChannel::spawn("weather-server", &[], client_info).await?;
//! let session = Session::open(Box::new(channel)).await?;
//! ```

pub mod channel;
pub mod logging;
pub mod openai;
pub mod server;

#[cfg(feature = "ollama")]
pub mod ollama;

pub use channel::{InProcessChannel, RpcChannel, StdioChannel};
pub use logging::{LogConfig, RotatingFileSink};
pub use openai::{OpenAiConfig, OpenAiProvider};
pub use server::ToolServer;

#[cfg(feature = "ollama")]
pub use ollama::{OllamaConfig, OllamaProvider};

// Re-export core types for convenience
pub use agent_core::{
    AgentError, LlmProvider, Message, Result, Role, Session, Tool, ToolChannel, ToolRegistry,
};
