//! Mock provider for testing.
//!
//! [`MockProvider`] is a queue-based fake: tests push the completions (or
//! failures) it should hand out, and every call is recorded for later
//! assertions. An empty queue answers with a provider error rather than
//! panicking, so a test that expects "no LLM call" can simply check
//! [`MockProvider::call_count`].

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{AgentError, Result};
use crate::message::{Message, Role};
use crate::provider::{Completion, GenerationOptions, LlmProvider, ProviderInfo};

/// One recorded `complete` call
#[derive(Clone, Debug)]
pub struct RecordedCall {
    pub system: String,
    pub user: String,
    pub options: GenerationOptions,
}

/// Scripted LLM provider
#[derive(Default)]
pub struct MockProvider {
    replies: Mutex<VecDeque<std::result::Result<String, String>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build with a fixed script of successful replies
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mock = Self::new();
        for reply in replies {
            mock.queue_reply(reply);
        }
        mock
    }

    pub fn queue_reply(&self, reply: impl Into<String>) {
        self.lock_replies().push_back(Ok(reply.into()));
    }

    pub fn queue_failure(&self, message: impl Into<String>) {
        self.lock_replies().push_back(Err(message.into()));
    }

    pub fn call_count(&self) -> usize {
        self.lock_calls().len()
    }

    pub fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.lock_calls().clone()
    }

    fn lock_replies(&self) -> std::sync::MutexGuard<'_, VecDeque<std::result::Result<String, String>>> {
        self.replies.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn lock_calls(&self) -> std::sync::MutexGuard<'_, Vec<RecordedCall>> {
        self.calls.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

fn content_of(messages: &[Message], role: Role) -> String {
    messages
        .iter()
        .filter(|m| m.role == role)
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: "Mock".into(),
            endpoint: "memory://".into(),
            authenticated: true,
        }
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        self.lock_calls().push(RecordedCall {
            system: content_of(messages, Role::System),
            user: content_of(messages, Role::User),
            options: options.clone(),
        });

        match self.lock_replies().pop_front() {
            Some(Ok(content)) => Ok(Completion {
                content,
                model: options.model.clone(),
            }),
            Some(Err(message)) => Err(AgentError::Provider(message)),
            None => Err(AgentError::Provider("mock reply queue is empty".into())),
        }
    }
}
