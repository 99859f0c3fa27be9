//! Search Module
//!
//! Web search for historical sources via the Serper Google Search API.
//! Results are normalized to `{title, link, snippet}` records and handed to
//! the agents as a JSON string, so a failed search reads like any other result.

pub mod serper;

pub use serper::{links_in, SearchClient, SearchError, SearchHit};
