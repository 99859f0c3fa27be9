use anyhow::Result;
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

pub const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o";
pub const DEFAULT_LLM_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://google.serper.dev/search";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LLMConfig,
    pub search: SearchConfig,
    pub agent: AgentConfig,
    pub charts: ChartConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub log_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LLMConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    pub api_key: String,
    pub endpoint: String,
    /// Pause between consecutive sub-question searches
    pub delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    pub max_iterations: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartConfig {
    pub enabled: bool,
    pub output_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8501".to_string())
                    .parse()?,
                host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
                log_dir: env::var("LOG_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("logs")),
            },
            llm: LLMConfig {
                base_url: env::var("OPENAI_API_BASE")
                    .ok()
                    .filter(|v| !v.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string()),
                api_key: env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty()),
                model: env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_LLM_MODEL.to_string()),
                temperature: match env::var("LLM_TEMPERATURE") {
                    Ok(v) => v.parse()?,
                    Err(_) => DEFAULT_LLM_TEMPERATURE,
                },
            },
            search: SearchConfig {
                api_key: env::var("SERPAPI_API_KEY").unwrap_or_default(),
                endpoint: env::var("SEARCH_ENDPOINT")
                    .unwrap_or_else(|_| DEFAULT_SEARCH_ENDPOINT.to_string()),
                delay_ms: env::var("SEARCH_DELAY_MS")
                    .unwrap_or_else(|_| "2000".to_string())
                    .parse()?,
            },
            agent: AgentConfig {
                max_iterations: env::var("AGENT_MAX_ITERATIONS")
                    .unwrap_or_else(|_| "8".to_string())
                    .parse()?,
            },
            charts: ChartConfig {
                enabled: env::var("ENABLE_CHARTS")
                    .unwrap_or_else(|_| "true".to_string())
                    .parse()?,
                output_dir: env::var("CHART_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("charts")),
            },
        })
    }

    /// Configuration pointing both external APIs at the given base URLs.
    /// Used by tests and the one-shot mode against local mocks.
    pub fn for_endpoints(llm_base_url: &str, search_endpoint: &str) -> Self {
        Self {
            server: ServerConfig {
                port: 8501,
                host: "127.0.0.1".to_string(),
                log_dir: PathBuf::from("logs"),
            },
            llm: LLMConfig {
                base_url: llm_base_url.to_string(),
                api_key: None,
                model: DEFAULT_LLM_MODEL.to_string(),
                temperature: DEFAULT_LLM_TEMPERATURE,
            },
            search: SearchConfig {
                api_key: "test-key".to_string(),
                endpoint: search_endpoint.to_string(),
                delay_ms: 0,
            },
            agent: AgentConfig { max_iterations: 8 },
            charts: ChartConfig {
                enabled: true,
                output_dir: PathBuf::from("charts"),
            },
        }
    }

    pub fn has_search_key(&self) -> bool {
        !self.search.api_key.trim().is_empty()
    }
}
