// Canned LLM adapter for unit tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::llm::provider::{LLMAdapter, LLM};
use crate::types::{AppError, AppResult, LLMRequest, LLMResponse, TokenUsage, ToolCall};

/// Replies with queued responses in order and records every request
#[derive(Clone, Default)]
pub struct ScriptedAdapter {
    replies: Arc<Mutex<VecDeque<AppResult<LLMResponse>>>>,
    requests: Arc<Mutex<Vec<LLMRequest>>>,
}

impl ScriptedAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(self, content: &str) -> Self {
        self.push(Ok(LLMResponse {
            content: content.to_string(),
            finish_reason: "stop".to_string(),
            tool_calls: Vec::new(),
            usage: TokenUsage::default(),
        }))
    }

    pub fn tool_call(self, name: &str, arguments: serde_json::Value) -> Self {
        let id = format!("call_{}", self.requests_len() + self.replies_len());
        self.push(Ok(LLMResponse {
            content: String::new(),
            finish_reason: "tool_calls".to_string(),
            tool_calls: vec![ToolCall {
                id,
                name: name.to_string(),
                arguments: arguments.to_string(),
            }],
            usage: TokenUsage::default(),
        }))
    }

    pub fn raw_tool_call(self, name: &str, arguments: &str) -> Self {
        self.push(Ok(LLMResponse {
            content: String::new(),
            finish_reason: "tool_calls".to_string(),
            tool_calls: vec![ToolCall {
                id: "call_raw".to_string(),
                name: name.to_string(),
                arguments: arguments.to_string(),
            }],
            usage: TokenUsage::default(),
        }))
    }

    pub fn error(self, message: &str) -> Self {
        self.push(Err(AppError::LLMApi(message.to_string())))
    }

    fn push(self, reply: AppResult<LLMResponse>) -> Self {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
        self
    }

    fn replies_len(&self) -> usize {
        self.replies.lock().map(|r| r.len()).unwrap_or(0)
    }

    fn requests_len(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn requests(&self) -> Vec<LLMRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn into_llm(self) -> LLM {
        LLM::with_adapter(Box::new(self), "gpt-4o", 0.7)
    }
}

#[async_trait]
impl LLMAdapter for ScriptedAdapter {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        self.replies
            .lock()
            .ok()
            .and_then(|mut replies| replies.pop_front())
            .unwrap_or_else(|| Err(AppError::LLMApi("no scripted reply left".to_string())))
    }
}
