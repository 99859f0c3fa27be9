//! Sub-question Generator
//!
//! Expands one user query into a few narrower research questions.

use tracing::{info, warn};

use crate::agents::prompts;
use crate::llm::LLM;
use crate::types::AppResult;

pub struct SubquestionGenerator;

impl SubquestionGenerator {
    pub async fn generate(llm: &LLM, query: &str) -> AppResult<Vec<String>> {
        let response = llm.invoke(&prompts::subquestion_prompt(query)).await?;
        let subquestions = Self::parse(&response, query);

        info!(count = subquestions.len(), "Generated sub-questions");
        Ok(subquestions)
    }

    /// One question per non-blank line, trimmed. Falls back to the query itself.
    pub fn parse(response: &str, query: &str) -> Vec<String> {
        let lines: Vec<String> = response
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect();

        if lines.is_empty() {
            warn!("Model returned no sub-questions, searching the query itself");
            return vec![query.trim().to_string()];
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims_and_drops_blank_lines() {
        let response = "1. Какова была численность армии Наполеона?\n\n   2. Как прошло Бородинское сражение?  \n\t\n3. Почему Наполеон ушёл из Москвы?\n";
        let questions = SubquestionGenerator::parse(response, "q");
        assert_eq!(
            questions,
            vec![
                "1. Какова была численность армии Наполеона?",
                "2. Как прошло Бородинское сражение?",
                "3. Почему Наполеон ушёл из Москвы?",
            ]
        );
    }

    #[test]
    fn test_parse_keeps_lines_verbatim() {
        // No count or format validation
        let questions = SubquestionGenerator::parse("Вот вопросы:\n- a\n- b\n- c\n- d", "q");
        assert_eq!(questions.len(), 5);
        assert_eq!(questions[0], "Вот вопросы:");
    }

    #[test]
    fn test_parse_blank_response_falls_back_to_query() {
        let questions = SubquestionGenerator::parse("  \n \n", " Что если? ");
        assert_eq!(questions, vec!["Что если?"]);
    }
}
