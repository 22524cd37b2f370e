//! # agent-core
//!
//! Provider-agnostic LLM abstraction, tool system and tool channel sessions.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────┐        ┌──────────────────────────────┐
//! │        Orchestrator          │        │          Tool Host           │
//! │  ┌─────────────┐             │ tools/ │  ┌─────────────────────┐     │
//! │  │ LlmProvider │  Session ───┼─list───┼──│    ToolRegistry     │     │
//! │  │ (Strategy)  │  (channel)  │ tools/ │  │  (Tool trait impls) │     │
//! │  └─────────────┘             │─call───┼──└─────────────────────┘     │
//! └──────────────────────────────┘        └──────────────────────────────┘
//! ```
//!
//! The `LlmProvider` trait enables swapping between OpenAI, Ollama,
//! or any other provider without changing orchestration logic. The
//! `ToolChannel` trait hides how tool calls reach the Tool Host.

pub mod error;
pub mod message;
pub mod protocol;
pub mod provider;
pub mod session;
pub mod tool;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use error::{AgentError, Result};
pub use message::{Message, Role};
pub use provider::{GenerationOptions, LlmProvider};
pub use session::{Session, ToolChannel};
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult, ToolSchema};
