//! Agent transcript
//!
//! Every tool call the agent makes is recorded as a typed [`ToolInvocation`].
//! The chart request is read from these records, never from the model's text.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::agents::prompts::CHART_TOOL;
use crate::charts::ChartRequest;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub name: String,
    pub arguments: serde_json::Value,
    pub output: String,
}

/// Final answer plus everything the agent did to get there
#[derive(Debug, Clone, Default)]
pub struct AgentRun {
    pub output: String,
    pub transcript: Vec<ToolInvocation>,
}

impl AgentRun {
    pub fn chart(&self) -> Option<ChartRequest> {
        extract_chart(&self.transcript)
    }
}

/// Arguments of the last chart tool call, if it decodes
pub fn extract_chart(transcript: &[ToolInvocation]) -> Option<ChartRequest> {
    let invocation = transcript.iter().rev().find(|inv| inv.name == CHART_TOOL)?;

    match serde_json::from_value(invocation.arguments.clone()) {
        Ok(request) => Some(request),
        Err(e) => {
            warn!(error = %e, "Chart tool arguments do not decode");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn invocation(name: &str, arguments: serde_json::Value) -> ToolInvocation {
        ToolInvocation {
            name: name.to_string(),
            arguments,
            output: String::new(),
        }
    }

    #[test]
    fn test_no_chart_call_is_none() {
        let transcript = vec![invocation("search", json!({"query": "Бородино"}))];
        assert_eq!(extract_chart(&transcript), None);
        assert_eq!(extract_chart(&[]), None);
    }

    #[test]
    fn test_last_chart_call_wins() {
        let transcript = vec![
            invocation(CHART_TOOL, json!({"script": "plt.plot([1])"})),
            invocation("search", json!({"query": "x"})),
            invocation(CHART_TOOL, json!({"code": "plt.bar(['a'], [2])"})),
        ];
        assert_eq!(
            extract_chart(&transcript),
            Some(ChartRequest::Script {
                script: "plt.bar(['a'], [2])".to_string()
            })
        );
    }

    #[test]
    fn test_declarative_arguments_decode_to_spec() {
        let transcript = vec![invocation(
            CHART_TOOL,
            json!({"chart_type": "bar", "categories": ["1812", "1813"], "series": [{"y": [600, 100]}]}),
        )];
        assert!(matches!(extract_chart(&transcript), Some(ChartRequest::Spec(_))));
    }

    #[test]
    fn test_undecodable_arguments_are_skipped() {
        let transcript = vec![invocation(CHART_TOOL, json!({"colour": "red"}))];
        assert_eq!(extract_chart(&transcript), None);
    }
}
