//! Agent System
//!
//! The research pipeline behind every chat turn:
//!
//! ```text
//! User Query
//!      │
//!      ▼
//! ┌──────────────┐
//! │ Sub-question │  → 2-3 narrower research questions
//! │  Generator   │
//! └──────────────┘
//!      │
//!      ▼
//! ┌──────────────┐
//! │   Research   │  → One web search per sub-question (sequential, paced)
//! │     Loop     │
//! └──────────────┘
//!      │
//!      ▼
//! ┌──────────────┐
//! │    Answer    │  → Tool-calling agent: search again, render_chart
//! │ Synthesizer  │
//! └──────────────┘
//!      │
//!      ▼
//!  AgentResponse (answer, sources, sub-questions, chart request)
//! ```

pub mod prompts;
pub mod research;
pub mod subquestions;
pub mod synthesis;
pub mod transcript;

pub use research::ResearchLoop;
pub use subquestions::SubquestionGenerator;
pub use synthesis::{AnswerSynthesizer, ITERATION_LIMIT_MESSAGE};
pub use transcript::{extract_chart, AgentRun, ToolInvocation};

use std::time::Duration;

use tracing::info;

use crate::config::Config;
use crate::llm::LLM;
use crate::models::AgentResponse;
use crate::search::SearchClient;
use crate::types::{AppError, AppResult};

/// Stage reached by a running pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineProgress {
    Subquestions,
    Searching {
        index: usize,
        total: usize,
        question: String,
    },
    Synthesizing,
}

pub struct ResearchPipeline {
    llm: LLM,
    search: SearchClient,
    search_delay: Duration,
    max_iterations: usize,
    charts_enabled: bool,
}

impl ResearchPipeline {
    pub fn new(config: &Config) -> Self {
        Self::with_llm(config, LLM::from_config(&config.llm))
    }

    /// Pipeline with a caller-supplied model client
    pub fn with_llm(config: &Config, llm: LLM) -> Self {
        Self {
            llm,
            search: SearchClient::from_config(&config.search),
            search_delay: Duration::from_millis(config.search.delay_ms),
            max_iterations: config.agent.max_iterations,
            charts_enabled: config.charts.enabled,
        }
    }

    pub fn charts_enabled(&self) -> bool {
        self.charts_enabled
    }

    pub async fn process_query(&self, query: &str) -> AppResult<AgentResponse> {
        self.process_query_with_progress(query, |_| {}).await
    }

    pub async fn process_query_with_progress<F>(&self, query: &str, mut on_progress: F) -> AppResult<AgentResponse>
    where
        F: FnMut(PipelineProgress) + Send,
    {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::InvalidRequest("query is empty".to_string()));
        }

        info!(query_len = query.len(), "Starting research pipeline");

        // Step 1: Sub-questions
        on_progress(PipelineProgress::Subquestions);
        let subquestions = SubquestionGenerator::generate(&self.llm, query).await?;

        // Step 2: Sequential searches
        let sources = ResearchLoop::new(&self.search, self.search_delay)
            .run_with_progress(&subquestions, |index, total, question| {
                on_progress(PipelineProgress::Searching {
                    index,
                    total,
                    question: question.to_string(),
                })
            })
            .await;

        // Step 3: Synthesis
        on_progress(PipelineProgress::Synthesizing);
        let run = AnswerSynthesizer::new(&self.llm, &self.search)
            .with_charts(self.charts_enabled)
            .with_max_iterations(self.max_iterations)
            .synthesize(query, &sources)
            .await?;

        let chart = if self.charts_enabled { run.chart() } else { None };

        info!(
            answer_len = run.output.len(),
            sources = sources.len(),
            tool_calls = run.transcript.len(),
            has_chart = chart.is_some(),
            "Research pipeline complete"
        );

        Ok(AgentResponse {
            answer: run.output,
            sources,
            subquestions,
            chart,
        })
    }
}
