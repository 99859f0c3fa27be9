//! Answer Synthesizer
//!
//! Runs the tool-calling agent over the collected search results:
//!
//! 1. Send the conversation and the tool definitions to the model
//! 2. If the reply requests tools, run each one, append its output as a
//!    `tool` message and record it in the transcript, then go to 1
//! 3. A reply without tool calls is the answer
//!
//! The loop gives up after a fixed number of model calls.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::agents::prompts::{self, CHART_TOOL, SEARCH_TOOL};
use crate::agents::transcript::{AgentRun, ToolInvocation};
use crate::charts::ChartRequest;
use crate::llm::LLM;
use crate::models::SearchResult;
use crate::search::SearchClient;
use crate::types::{AppResult, LLMMessage, LLMRequest, ToolCall};

pub const ITERATION_LIMIT_MESSAGE: &str = "Agent stopped due to iteration limit.";

#[derive(Deserialize)]
struct SearchArgs {
    query: String,
}

pub struct AnswerSynthesizer<'a> {
    llm: &'a LLM,
    search: &'a SearchClient,
    charts_enabled: bool,
    max_iterations: usize,
}

impl<'a> AnswerSynthesizer<'a> {
    pub fn new(llm: &'a LLM, search: &'a SearchClient) -> Self {
        Self {
            llm,
            search,
            charts_enabled: true,
            max_iterations: 8,
        }
    }

    pub fn with_charts(mut self, enabled: bool) -> Self {
        self.charts_enabled = enabled;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub async fn synthesize(&self, query: &str, sources: &[SearchResult]) -> AppResult<AgentRun> {
        info!(sources = sources.len(), "Synthesizing answer");
        self.run_agent(&prompts::synthesis_prompt(query, sources)).await
    }

    /// Run the agent loop on one input
    pub async fn run_agent(&self, input: &str) -> AppResult<AgentRun> {
        let mut tools = vec![prompts::search_tool()];
        if self.charts_enabled {
            tools.push(prompts::chart_tool());
        }

        let mut messages = vec![LLMMessage::user(input)];
        let mut transcript = Vec::new();

        for iteration in 0..self.max_iterations {
            let request = LLMRequest::new(self.llm.model(), messages.clone())
                .with_temperature(self.llm.temperature())
                .with_system(prompts::system_prompt(self.charts_enabled))
                .with_tools(tools.clone());

            let response = self.llm.create_chat_completion(&request).await?;
            debug!(
                iteration,
                tool_calls = response.tool_calls.len(),
                finish_reason = %response.finish_reason,
                "Agent step"
            );

            if response.tool_calls.is_empty() {
                info!(iterations = iteration + 1, tool_calls = transcript.len(), "Agent finished");
                return Ok(AgentRun {
                    output: response.content.trim().to_string(),
                    transcript,
                });
            }

            messages.push(LLMMessage::assistant_with_tools(
                response.content.clone(),
                response.tool_calls.clone(),
            ));

            for call in &response.tool_calls {
                let invocation = self.execute_tool(call).await;
                messages.push(LLMMessage::tool_result(&call.id, &invocation.output));
                transcript.push(invocation);
            }
        }

        warn!(max_iterations = self.max_iterations, "Agent hit the iteration limit");
        Ok(AgentRun {
            output: ITERATION_LIMIT_MESSAGE.to_string(),
            transcript,
        })
    }

    /// Tool failures become the tool's output; the model sees them and carries on
    async fn execute_tool(&self, call: &ToolCall) -> ToolInvocation {
        let arguments = match serde_json::from_str::<Value>(&call.arguments) {
            Ok(value) => value,
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool arguments are not valid JSON");
                return ToolInvocation {
                    name: call.name.clone(),
                    arguments: Value::String(call.arguments.clone()),
                    output: format!("Invalid arguments for {}: {}", call.name, e),
                };
            }
        };

        info!(tool = %call.name, "Agent invoked tool");
        let output = match call.name.as_str() {
            SEARCH_TOOL => match serde_json::from_value::<SearchArgs>(arguments.clone()) {
                Ok(args) => self.search.search(&args.query).await,
                Err(e) => format!("Invalid arguments for {}: {}", SEARCH_TOOL, e),
            },
            CHART_TOOL if self.charts_enabled => Self::check_chart(&arguments),
            other => format!("Unknown tool: {}", other),
        };

        ToolInvocation {
            name: call.name.clone(),
            arguments,
            output,
        }
    }

    /// Validate without drawing; the views render the accepted request later
    fn check_chart(arguments: &Value) -> String {
        let request = match serde_json::from_value::<ChartRequest>(arguments.clone()) {
            Ok(request) => request,
            Err(e) => return format!("Invalid chart request: {}", e),
        };
        match request.to_spec().and_then(|spec| spec.validate()) {
            Ok(()) => "Chart accepted and will be shown to the user.".to_string(),
            Err(e) => e.to_string(),
        }
    }
}
