use std::time::Duration;

use async_trait::async_trait;
use chatgpt::client::ChatGPT;
use chatgpt::config::ChatGPTEngine;
use chatgpt::types::CompletionResponse;
use log::debug;

/// Model used for both question generation and feedback.
pub const MODEL: &str = "gpt-4o-mini";

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error(transparent)]
    ChatGPT(#[from] chatgpt::err::Error),
    #[error("no completion received within {0:?}")]
    Timeout(Duration),
}

/// A text-completion backend: one user message in, the raw reply text out.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError>;
}

pub struct ChatGptProvider {
    chat_gpt: ChatGPT,
}

impl ChatGptProvider {
    pub fn new(api_key: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let mut chat_gpt = ChatGPT::new(api_key)?;

        chat_gpt.config.engine = ChatGPTEngine::Custom(MODEL);
        chat_gpt.config.timeout = timeout;

        Ok(Self { chat_gpt })
    }
}

#[async_trait]
impl CompletionProvider for ChatGptProvider {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let response: CompletionResponse = self.chat_gpt.send_message(prompt).await?;
        Ok(response.message().content.clone())
    }
}

/// Sends `prompt` and waits at most `timeout` for the reply.
///
/// The pending request is dropped, and with it cancelled, once the deadline passes.
pub async fn ask(
    provider: &dyn CompletionProvider,
    prompt: &str,
    timeout: Duration,
) -> Result<String, ProviderError> {
    debug!("Sending prompt ({} chars)", prompt.len());

    let content = tokio::time::timeout(timeout, provider.complete(prompt))
        .await
        .map_err(|_| ProviderError::Timeout(timeout))??;

    debug!("Completion received ({} chars)", content.len());
    Ok(content)
}
