//! The two tools the model may call, and the dispatcher that runs them.
//!
//! The dispatcher never fails: provider and network errors are turned into `{"error": ..}`
//! payloads so the model can still produce an answer.

use crate::config::Config;
use crate::http::HttpClient;
use crate::search::{TavilySearchProvider, WikipediaSearchProvider};
use crate::LocalFetcher;
use lmweb_core::chat::ToolSpec;
use lmweb_core::truncate::truncate_bytes;
use lmweb_core::{
    FetchBackend, FetchRequest, Result, SearchProvider, SearchQuery, ToolRequest, ToolResult,
    FETCH_MAX_BYTES,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

pub const SEARCH_WEB: &str = "search_web";
pub const FETCH_URL: &str = "fetch_url";

const MAX_TOP_K: usize = 10;
const FETCH_USER_AGENT: &str = "Mozilla/5.0";
const GOV_KEYWORDS: [&str; 5] = ["secretary", "governor", "senator", "minister", "president"];

pub fn tool_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: SEARCH_WEB,
            description: "Search the web and return the top results (title, url, snippet).",
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "Search query."},
                    "top_k": {"type": "integer", "minimum": 1, "maximum": MAX_TOP_K, "default": 3}
                },
                "required": ["query"]
            }),
        },
        ToolSpec {
            name: FETCH_URL,
            description: "Fetch a URL and return the first part of its body as text.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "url": {"type": "string", "description": "Absolute http(s) URL."}
                },
                "required": ["url"]
            }),
        },
    ]
}

/// Appends `site:.gov` when the query names an office holder.
pub fn rewrite_query(query: &str, gov_site_filter: bool) -> String {
    if !gov_site_filter {
        return query.to_string();
    }
    let lower = query.to_lowercase();
    if GOV_KEYWORDS.iter().any(|k| lower.contains(k)) {
        format!("{query} site:.gov")
    } else {
        query.to_string()
    }
}

pub struct ToolDispatcher {
    primary: Option<Arc<dyn SearchProvider>>,
    fallback: Arc<dyn SearchProvider>,
    fetcher: Arc<dyn FetchBackend>,
    gov_site_filter: bool,
    default_top_k: usize,
    fetch_timeout: Duration,
}

impl ToolDispatcher {
    pub fn new(
        primary: Option<Arc<dyn SearchProvider>>,
        fallback: Arc<dyn SearchProvider>,
        fetcher: Arc<dyn FetchBackend>,
    ) -> Self {
        Self {
            primary,
            fallback,
            fetcher,
            gov_site_filter: false,
            default_top_k: crate::config::DEFAULT_TOP_K,
            fetch_timeout: Duration::from_secs(30),
        }
    }

    /// Tavily when a key is configured, Wikipedia always, and a plain network fetcher.
    pub fn from_config(http: HttpClient, cfg: &Config) -> Result<Self> {
        let primary: Option<Arc<dyn SearchProvider>> =
            match TavilySearchProvider::from_config(http.clone(), cfg) {
                Ok(p) => Some(Arc::new(p)),
                Err(e) => {
                    tracing::debug!(error = %e, "primary search provider disabled");
                    None
                }
            };
        let fallback = Arc::new(WikipediaSearchProvider::from_config(http.clone(), cfg)?);
        let fetcher = Arc::new(LocalFetcher::from_client(http.client().clone()));
        Ok(Self {
            gov_site_filter: cfg.gov_site_filter,
            default_top_k: cfg.top_k,
            fetch_timeout: cfg.fetch_timeout,
            ..Self::new(primary, fallback, fetcher)
        })
    }

    pub fn with_gov_site_filter(mut self, on: bool) -> Self {
        self.gov_site_filter = on;
        self
    }

    pub fn default_top_k(&self) -> usize {
        self.default_top_k
    }

    pub async fn dispatch(&self, call: &ToolRequest) -> ToolResult {
        let args = call.arguments();
        match call.name() {
            SEARCH_WEB => {
                let query = args
                    .get("query")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .trim();
                let top_k = parse_top_k(args.get("top_k")).unwrap_or(self.default_top_k);
                self.search_web(query, top_k).await
            }
            FETCH_URL => {
                let url = args.get("url").and_then(Value::as_str).unwrap_or("").trim();
                self.fetch_url(url).await
            }
            other => {
                let msg = format!("unknown tool: {other}");
                tracing::warn!(tool = other, "model requested an unknown tool");
                ToolResult::failed(json!({ "error": msg }), msg)
            }
        }
    }

    /// Primary provider first; the fallback runs when the primary is absent or fails.
    pub async fn search_web(&self, query: &str, top_k: usize) -> ToolResult {
        if query.is_empty() {
            let msg = "search_web: missing query".to_string();
            return ToolResult::failed(json!({ "error": msg }), msg);
        }
        let q = SearchQuery::new(
            rewrite_query(query, self.gov_site_filter),
            top_k.clamp(1, MAX_TOP_K),
        );
        tracing::info!(query = %q.query, top_k = q.max_results, "searching");

        if let Some(primary) = &self.primary {
            match primary.search(&q).await {
                Ok(resp) => {
                    tracing::info!(
                        provider = %resp.provider,
                        hits = resp.hits.len(),
                        timings_ms = ?resp.timings_ms,
                        "search done"
                    );
                    return ToolResult::ok(json!({ "source": resp.provider, "items": resp.hits }));
                }
                Err(e) => {
                    tracing::warn!(provider = primary.name(), error = %e, "search failed; falling back");
                }
            }
        }

        match self.fallback.search(&q).await {
            Ok(resp) => {
                tracing::info!(
                    provider = %resp.provider,
                    hits = resp.hits.len(),
                    timings_ms = ?resp.timings_ms,
                    "search done"
                );
                ToolResult::ok(json!({ "source": resp.provider, "items": resp.hits }))
            }
            Err(e) => {
                let msg = e.to_string();
                tracing::warn!(provider = self.fallback.name(), error = %msg, "search failed");
                ToolResult::failed(json!({ "source": self.fallback.name(), "error": msg }), msg)
            }
        }
    }

    pub async fn fetch_url(&self, url: &str) -> ToolResult {
        let mut req = FetchRequest::new(url);
        req.timeout_ms = Some(self.fetch_timeout.as_millis() as u64);
        req.max_bytes = Some(FETCH_MAX_BYTES as u64);
        req.headers
            .insert("User-Agent".to_string(), FETCH_USER_AGENT.to_string());

        let failed = |msg: String| ToolResult::failed(json!({ "url": url, "error": msg }), msg);
        match self.fetcher.fetch(&req).await {
            Ok(resp) if resp.is_success() => {
                tracing::info!(
                    url,
                    bytes = resp.bytes.len(),
                    truncated = resp.truncated,
                    timings_ms = ?resp.timings_ms,
                    "fetched"
                );
                let text = resp.text_lossy();
                let snippet = truncate_bytes(&text, FETCH_MAX_BYTES);
                ToolResult::ok(json!({ "url": url, "snippet": snippet }))
            }
            Ok(resp) => {
                let body = resp.text_lossy();
                failed(
                    lmweb_core::Error::HttpStatus {
                        status: resp.status,
                        body: truncate_bytes(&body, 500).to_string(),
                    }
                    .to_string(),
                )
            }
            Err(e) => failed(e.to_string()),
        }
    }
}

/// `top_k` as a JSON number or numeric string.
fn parse_top_k(v: Option<&Value>) -> Option<usize> {
    match v? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .map(|n| n as usize),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
