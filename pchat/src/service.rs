//! Renders a prompt and forwards the result to the chat-completion provider.

use std::sync::Arc;

use pprovider::{ChatCompletion, Message, ModelProvider, ModelRequest, Role};
use prender::{RenderOptions, Rendered, Renderer};

use crate::{ChatError, ChatRequest};

#[derive(Clone)]
pub struct ChatService {
    renderer: Renderer,
    provider: Arc<dyn ModelProvider>,
}

impl std::fmt::Debug for ChatService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatService")
            .field("provider", &self.provider.name())
            .finish()
    }
}

impl ChatService {
    pub fn new(renderer: Renderer, provider: Arc<dyn ModelProvider>) -> Self {
        Self { renderer, provider }
    }

    pub fn provider(&self) -> &Arc<dyn ModelProvider> {
        &self.provider
    }

    /// Renders `prompt_id` with `request.args`, then completes it.
    ///
    /// Provider errors are returned as [`ChatError::Upstream`] without retry.
    pub async fn chat(
        &self,
        prompt_id: &str,
        request: ChatRequest,
        options: RenderOptions,
    ) -> Result<ChatCompletion, ChatError> {
        if request.model.trim().is_empty() {
            return Err(ChatError::InvalidRequest("model must not be empty".to_string()));
        }

        let trace_id = options.trace_id.clone();
        let rendered = self
            .renderer
            .render(prompt_id, request.args.clone(), options)
            .await?;
        let messages = to_chat_messages(rendered)?;

        let model_request = ModelRequest::new(request.model.clone(), messages)
            .with_options(request.options())
            .with_metadata("prompt_id", prompt_id)
            .with_metadata("trace_id", trace_id.as_str());

        let completion = self.provider.complete(model_request).await?;
        tracing::debug!(
            prompt_id = %prompt_id,
            trace_id = %trace_id,
            model = %request.model,
            total_tokens = completion.usage.total_tokens,
            "chat completed"
        );
        Ok(completion)
    }
}

/// A single template becomes one user message; message lists pass through.
pub fn to_chat_messages(rendered: Rendered) -> Result<Vec<Message>, ChatError> {
    match rendered {
        Rendered::Prompt { prompt } => Ok(vec![Message::new(Role::User, prompt)]),
        Rendered::Messages { messages } => messages
            .into_iter()
            .map(|message| {
                let role = message
                    .role
                    .parse::<Role>()
                    .map_err(|err| ChatError::InvalidRequest(err.message))?;
                Ok(Message::new(role, message.content))
            })
            .collect(),
    }
}
