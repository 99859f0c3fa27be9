//! Chat session
//!
//! The ordered, in-memory message log of one conversation. Each turn appends
//! exactly one user message and one assistant message, so the log always
//! alternates user/assistant.

use tracing::{error, info};
use uuid::Uuid;

use crate::agents::{PipelineProgress, ResearchPipeline};
use crate::models::Message;
use crate::types::AppResult;

#[derive(Debug, Default)]
pub struct ChatSession {
    messages: Vec<Message>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn message(&self, id: Uuid) -> Option<&Message> {
        self.messages.iter().find(|m| m.id() == id)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Start a new chat
    pub fn clear(&mut self) {
        info!(dropped = self.messages.len(), "Clearing chat session");
        self.messages.clear();
    }

    pub async fn submit(&mut self, pipeline: &ResearchPipeline, input: &str) -> AppResult<&Message> {
        self.submit_with_progress(pipeline, input, |_| {}).await
    }

    /// Run one turn. On failure the error text is logged as the assistant's
    /// reply before the error is returned.
    pub async fn submit_with_progress<F>(
        &mut self,
        pipeline: &ResearchPipeline,
        input: &str,
        on_progress: F,
    ) -> AppResult<&Message>
    where
        F: FnMut(PipelineProgress) + Send,
    {
        self.messages.push(Message::user(input));

        let reply = match pipeline.process_query_with_progress(input, on_progress).await {
            Ok(response) => Message::assistant(response),
            Err(e) => {
                error!(error = %e, "Chat turn failed");
                self.messages.push(Message::assistant_error(format!("Error: {}", e)));
                return Err(e);
            }
        };

        self.messages.push(reply);
        let last = self.messages.len() - 1;
        Ok(&self.messages[last])
    }

    /// Record a turn that ran elsewhere, such as a spawned TUI task
    pub fn record_turn(&mut self, input: &str, reply: Message) {
        self.messages.push(Message::user(input));
        self.messages.push(reply);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::llm::scripted::ScriptedAdapter;
    use crate::models::Role;

    fn offline_config() -> Config {
        let mut config = Config::for_endpoints("http://127.0.0.1:9", "http://127.0.0.1:9/search");
        config.search.api_key = String::new();
        config
    }

    #[tokio::test]
    async fn test_log_alternates_after_n_turns() {
        let mut adapter = ScriptedAdapter::new();
        for turn in 0..3 {
            adapter = adapter.text("Подвопрос").text(&format!("Ответ {turn}"));
        }
        let pipeline = ResearchPipeline::with_llm(&offline_config(), adapter.into_llm());

        let mut session = ChatSession::new();
        for turn in 0..3 {
            let reply = session.submit(&pipeline, &format!("Вопрос {turn}")).await.unwrap();
            assert_eq!(reply.content(), format!("Ответ {turn}"));
        }

        assert_eq!(session.len(), 6);
        for (i, message) in session.messages().iter().enumerate() {
            let expected = if i % 2 == 0 { Role::User } else { Role::Assistant };
            assert_eq!(message.role(), expected);
        }
        assert_eq!(session.messages()[0].content(), "Вопрос 0");
        assert_eq!(session.messages()[1].sources().len(), 1);
        assert!(session.messages()[0].sources().is_empty());
    }

    #[tokio::test]
    async fn test_failed_turn_keeps_alternation() {
        let adapter = ScriptedAdapter::new().error("model unavailable");
        let pipeline = ResearchPipeline::with_llm(&offline_config(), adapter.into_llm());

        let mut session = ChatSession::new();
        let err = session.submit(&pipeline, "Вопрос").await.unwrap_err();

        assert!(err.to_string().contains("model unavailable"));
        assert_eq!(session.len(), 2);
        assert_eq!(session.messages()[1].role(), Role::Assistant);
        assert!(session.messages()[1].content().contains("model unavailable"));
    }

    #[tokio::test]
    async fn test_clear_empties_the_log() {
        let adapter = ScriptedAdapter::new().text("q").text("a");
        let pipeline = ResearchPipeline::with_llm(&offline_config(), adapter.into_llm());
        let mut session = ChatSession::new();
        let id = session.submit(&pipeline, "Вопрос").await.unwrap().id();

        assert!(session.message(id).is_some());
        session.clear();
        assert!(session.is_empty());
        assert!(session.message(id).is_none());
    }
}
