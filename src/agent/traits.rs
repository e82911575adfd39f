//! Agent trait definition.
//!
//! The reviewer, editor and pipeline stage agents implement this trait,
//! which provides a uniform way to turn a user message into a provider call.

use async_trait::async_trait;

use super::message::{
    ChatRequest, ResponseSchema, TokenUsage, system_message, user_message,
};
use super::provider::LlmProvider;
use crate::error::AgentError;

/// Response from an agent execution.
#[derive(Debug, Clone)]
pub struct AgentResponse {
    /// The agent's text output.
    pub content: String,
    /// Token usage for this call.
    pub usage: TokenUsage,
    /// Why the model stopped generating (e.g. `"stop"`, `"length"`).
    pub finish_reason: Option<String>,
}

impl AgentResponse {
    /// Whether the output was cut off by the token budget.
    #[must_use]
    pub fn truncated(&self) -> bool {
        self.finish_reason.as_deref() == Some("length")
    }
}

/// Trait implemented by all agents in the system.
///
/// Agents encapsulate a specific role (reviewing, editing, writing) with a
/// fixed system prompt and model configuration.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Agent name for logging and identification.
    fn name(&self) -> &'static str;

    /// Model identifier to use for this agent.
    fn model(&self) -> &str;

    /// System prompt that defines the agent's role and behavior.
    fn system_prompt(&self) -> &str;

    /// Whether to request JSON-formatted output.
    fn json_mode(&self) -> bool {
        false
    }

    /// Schema the response must follow, if any.
    fn response_schema(&self) -> Option<ResponseSchema> {
        None
    }

    /// Sampling temperature (0.0 = deterministic, higher = more creative).
    fn temperature(&self) -> f32 {
        0.7
    }

    /// Maximum tokens for the response.
    fn max_tokens(&self) -> u32 {
        2048
    }

    /// Builds the request for a user message from the agent's configuration.
    fn request(&self, user_msg: &str) -> ChatRequest {
        ChatRequest {
            model: self.model().to_string(),
            messages: vec![system_message(self.system_prompt()), user_message(user_msg)],
            temperature: Some(self.temperature()),
            max_tokens: Some(self.max_tokens()),
            json_mode: self.json_mode(),
            response_schema: self.response_schema(),
        }
    }

    /// Executes the agent with the given user message.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on API failures.
    async fn execute(
        &self,
        provider: &dyn LlmProvider,
        user_msg: &str,
    ) -> Result<AgentResponse, AgentError> {
        send(provider, &self.request(user_msg)).await
    }
}

/// Sends a prepared request and wraps the result.
///
/// # Errors
///
/// Returns [`AgentError`] on API failures.
pub async fn send(
    provider: &dyn LlmProvider,
    request: &ChatRequest,
) -> Result<AgentResponse, AgentError> {
    let response = provider.chat(request).await?;
    Ok(AgentResponse {
        content: response.content,
        usage: response.usage,
        finish_reason: response.finish_reason,
    })
}
