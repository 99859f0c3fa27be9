use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::agents::ResearchPipeline;
use crate::charts::ChartRequest;
use crate::config::Config;
use crate::session::ChatSession;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub pipeline: Arc<ResearchPipeline>,
    /// Held for the whole turn, so turns are serialized
    pub session: Arc<Mutex<ChatSession>>,
}

impl AppState {
    pub fn new(config: Config, pipeline: ResearchPipeline) -> Self {
        Self {
            config,
            pipeline: Arc::new(pipeline),
            session: Arc::new(Mutex::new(ChatSession::new())),
        }
    }
}

/// One searched sub-question and its serialized result (or error text)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub question: String,
    pub result: String,
}

/// Output of one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    pub answer: String,
    pub sources: Vec<SearchResult>,
    pub subquestions: Vec<String>,
    pub chart: Option<ChartRequest>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// An entry of the chat log.
///
/// Sources, sub-questions and charts can only be attached through
/// [`Message::assistant`], so user messages never carry them.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    id: Uuid,
    role: Role,
    content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sources: Vec<SearchResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    subquestions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    chart: Option<ChartRequest>,
    timestamp: DateTime<Utc>,
}

impl Message {
    fn new(role: Role, content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content,
            sources: Vec::new(),
            subquestions: Vec::new(),
            chart: None,
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content.into())
    }

    pub fn assistant(response: AgentResponse) -> Self {
        Self {
            sources: response.sources,
            subquestions: response.subquestions,
            chart: response.chart,
            ..Self::new(Role::Assistant, response.answer)
        }
    }

    /// Assistant entry for a failed turn
    pub fn assistant_error(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text.into())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn sources(&self) -> &[SearchResult] {
        &self.sources
    }

    pub fn subquestions(&self) -> &[String] {
        &self.subquestions
    }

    pub fn chart(&self) -> Option<&ChartRequest> {
        self.chart.as_ref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

// API Request/Response types

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// A message as the web page sees it
#[derive(Debug, Serialize)]
pub struct MessageView {
    #[serde(flatten)]
    pub message: Message,
    /// Rendered chart as base64 PNG, when the message carries one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_png: Option<String>,
    /// Render failure text together with the offending request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub message: MessageView,
    pub subquestions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub model: String,
    pub search_configured: bool,
    pub charts_enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_carries_no_extras() {
        let msg = Message::user("Что если бы Наполеон победил?");
        assert_eq!(msg.role(), Role::User);
        assert!(msg.sources().is_empty());
        assert!(msg.chart().is_none());

        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "user");
        assert!(json.get("sources").is_none());
    }

    #[test]
    fn test_assistant_message_keeps_response_parts() {
        let msg = Message::assistant(AgentResponse {
            answer: "ответ".to_string(),
            sources: vec![SearchResult {
                question: "q".to_string(),
                result: "[]".to_string(),
            }],
            subquestions: vec!["q".to_string()],
            chart: Some(ChartRequest::Script {
                script: "plt.plot([1])".to_string(),
            }),
        });
        assert_eq!(msg.role(), Role::Assistant);
        assert_eq!(msg.content(), "ответ");
        assert_eq!(msg.sources().len(), 1);
        assert_eq!(msg.subquestions(), ["q".to_string()]);
        assert!(msg.chart().is_some());
    }
}
