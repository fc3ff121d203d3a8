//! Process configuration, read from the environment once at start-up.

use lmweb_core::{Error, Result};
use serde::Serialize;
use std::time::Duration;

pub const DEFAULT_LM_BASE: &str = "http://localhost:1234/v1";
pub const DEFAULT_MODEL: &str = "mistralai/mistral-7b-instruct-v0.3";
pub const DEFAULT_TAVILY_ENDPOINT: &str = "https://api.tavily.com/search";
pub const DEFAULT_WIKIPEDIA_BASE: &str = "https://en.wikipedia.org";
pub const DEFAULT_TOP_K: usize = 3;

/// How the orchestrator decides whether to search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Offer the tools and let the model decide (one optional round-trip).
    #[default]
    Auto,
    /// Search up front and answer from the results, without tool calling.
    Always,
}

impl std::str::FromStr for SearchMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "always" => Ok(Self::Always),
            other => Err(Error::InvalidConfig(format!(
                "unknown search mode {other:?} (allowed: auto, always)"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// OpenAI-compatible base URL, including the `/v1` prefix.
    pub lm_base: String,
    pub model: String,
    pub lm_api_key: Option<String>,
    pub tavily_api_key: Option<String>,
    pub tavily_endpoint: String,
    pub wikipedia_base: String,
    pub search_mode: SearchMode,
    /// Append `site:.gov` to searches that mention an office holder.
    pub gov_site_filter: bool,
    pub top_k: usize,
    pub completion_timeout: Duration,
    pub fetch_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lm_base: DEFAULT_LM_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            lm_api_key: None,
            tavily_api_key: None,
            tavily_endpoint: DEFAULT_TAVILY_ENDPOINT.to_string(),
            wikipedia_base: DEFAULT_WIKIPEDIA_BASE.to_string(),
            search_mode: SearchMode::Auto,
            gov_site_filter: false,
            top_k: DEFAULT_TOP_K,
            completion_timeout: Duration::from_secs(60),
            fetch_timeout: Duration::from_secs(30),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Builds a config from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |k: &str| {
            lookup(k)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        let d = Self::default();

        let search_mode = match get("LMWEB_SEARCH_MODE") {
            Some(s) => s.parse()?,
            None => d.search_mode,
        };
        let gov_site_filter = match get("LMWEB_GOV_SITE_FILTER") {
            Some(s) => parse_bool(&s).ok_or_else(|| {
                Error::InvalidConfig(format!("LMWEB_GOV_SITE_FILTER: not a boolean: {s:?}"))
            })?,
            None => d.gov_site_filter,
        };
        let top_k = match get("LMWEB_TOP_K") {
            Some(s) => s
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| Error::InvalidConfig(format!("LMWEB_TOP_K: {s:?}")))?,
            None => d.top_k,
        };

        Ok(Self {
            lm_base: get("LM_BASE").unwrap_or(d.lm_base),
            model: get("LM_MODEL").unwrap_or(d.model),
            lm_api_key: get("LM_API_KEY"),
            tavily_api_key: get("LMWEB_TAVILY_API_KEY").or_else(|| get("TAVILY_API_KEY")),
            tavily_endpoint: get("LMWEB_TAVILY_ENDPOINT").unwrap_or(d.tavily_endpoint),
            wikipedia_base: get("LMWEB_WIKIPEDIA_BASE").unwrap_or(d.wikipedia_base),
            search_mode,
            gov_site_filter,
            top_k,
            ..d
        })
    }

    pub fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.lm_base.trim_end_matches('/'))
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
