//! Research Loop
//!
//! Searches each sub-question in turn, pausing between requests.

use std::time::Duration;

use tracing::{debug, info};

use crate::models::SearchResult;
use crate::search::SearchClient;

pub struct ResearchLoop<'a> {
    search: &'a SearchClient,
    delay: Duration,
}

impl<'a> ResearchLoop<'a> {
    pub fn new(search: &'a SearchClient, delay: Duration) -> Self {
        Self { search, delay }
    }

    pub async fn run(&self, subquestions: &[String]) -> Vec<SearchResult> {
        self.run_with_progress(subquestions, |_, _, _| {}).await
    }

    /// `on_search(index, total, question)` fires before each search
    pub async fn run_with_progress<F>(&self, subquestions: &[String], mut on_search: F) -> Vec<SearchResult>
    where
        F: FnMut(usize, usize, &str) + Send,
    {
        let total = subquestions.len();
        let mut results = Vec::with_capacity(total);

        for (index, question) in subquestions.iter().enumerate() {
            if index > 0 && !self.delay.is_zero() {
                debug!(delay_ms = self.delay.as_millis() as u64, "Pausing between searches");
                tokio::time::sleep(self.delay).await;
            }

            on_search(index, total, question);
            let result = self.search.search(question).await;
            results.push(SearchResult {
                question: question.clone(),
                result,
            });
        }

        info!(count = results.len(), "Research loop complete");
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_every_question_is_searched_in_order() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/search")
            .with_status(200)
            .with_body(r#"{"organic":[{"title":"t","link":"https://e.example","snippet":"s"}]}"#)
            .expect(3)
            .create_async()
            .await;

        let client = SearchClient::new("k").with_endpoint(&format!("{}/search", server.url()));
        let questions: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();

        let mut seen = Vec::new();
        let results = ResearchLoop::new(&client, Duration::ZERO)
            .run_with_progress(&questions, |i, total, q| seen.push((i, total, q.to_string())))
            .await;

        mock.assert_async().await;
        assert_eq!(results.len(), 3);
        assert_eq!(results[1].question, "b");
        assert!(results[2].result.contains("https://e.example"));
        assert_eq!(seen[0], (0, 3, "a".to_string()));
        assert_eq!(seen[2].0, 2);
    }

    #[tokio::test]
    async fn test_errors_are_stored_as_results() {
        let client = SearchClient::new("k").with_endpoint("http://127.0.0.1:9/search");
        let results = ResearchLoop::new(&client, Duration::ZERO)
            .run(&["a".to_string(), "b".to_string()])
            .await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.result.starts_with("Search request failed")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pauses_only_between_searches() {
        let client = SearchClient::new("");
        let start = tokio::time::Instant::now();
        ResearchLoop::new(&client, Duration::from_secs(2))
            .run(&["a".to_string(), "b".to_string(), "c".to_string()])
            .await;
        assert_eq!(start.elapsed(), Duration::from_secs(4));
    }
}
