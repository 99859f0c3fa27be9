use async_trait::async_trait;
use crate::config::LLMConfig;
use crate::types::{LLMRequest, LLMResponse, AppResult};

#[async_trait]
pub trait LLMAdapter: Send + Sync {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse>;
}

pub struct LLM {
    adapter: Box<dyn LLMAdapter>,
    model: String,
    temperature: f32,
}

impl LLM {
    /// Build the client for the OpenAI-compatible endpoint named in the config
    pub fn from_config(config: &LLMConfig) -> Self {
        let adapter = crate::llm::openai::OpenAIAdapter::new(
            &config.base_url,
            config.api_key.as_deref(),
        );
        Self::with_adapter(Box::new(adapter), &config.model, config.temperature)
    }

    pub fn with_adapter(adapter: Box<dyn LLMAdapter>, model: &str, temperature: f32) -> Self {
        Self {
            adapter,
            model: model.to_string(),
            temperature,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        self.adapter.create_chat_completion(request).await
    }

    /// Single-prompt completion with the configured model and temperature
    pub async fn invoke(&self, prompt: &str) -> AppResult<String> {
        let request = LLMRequest::new(&self.model, vec![crate::types::LLMMessage::user(prompt)])
            .with_temperature(self.temperature);
        let response = self.create_chat_completion(&request).await?;
        Ok(response.content)
    }
}
