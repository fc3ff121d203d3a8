use crate::config::Config;
use crate::http::HttpClient;
use lmweb_core::{Error, Result, SearchHit, SearchProvider, SearchQuery, SearchResponse};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

fn timeout_from_query(q: &SearchQuery, default: Duration) -> Duration {
    // Keep a conservative cap even if callers pass something huge.
    q.timeout_ms
        .map(Duration::from_millis)
        .unwrap_or(default)
        .clamp(Duration::from_secs(1), Duration::from_secs(60))
}

/// Paid primary provider.
#[derive(Debug, Clone)]
pub struct TavilySearchProvider {
    http: HttpClient,
    api_key: String,
    endpoint: String,
    timeout: Duration,
}

impl TavilySearchProvider {
    pub fn new(http: HttpClient, api_key: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn from_config(http: HttpClient, cfg: &Config) -> Result<Self> {
        let api_key = cfg.tavily_api_key.clone().ok_or_else(|| {
            Error::NotConfigured("missing LMWEB_TAVILY_API_KEY (or TAVILY_API_KEY)".to_string())
        })?;
        Ok(Self {
            timeout: cfg.completion_timeout,
            ..Self::new(http, api_key, cfg.tavily_endpoint.clone())
        })
    }
}

#[derive(Debug, Deserialize)]
struct TavilySearchResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    url: Option<String>,
    title: Option<String>,
    content: Option<String>,
}

#[async_trait::async_trait]
impl SearchProvider for TavilySearchProvider {
    fn name(&self) -> &'static str {
        "tavily"
    }

    async fn search(&self, q: &SearchQuery) -> Result<SearchResponse> {
        let t0 = Instant::now();
        let body = serde_json::json!({
            "query": q.query,
            "max_results": q.max_results,
            "search_depth": "basic",
            "include_images": false,
            "include_answer": false,
        });

        let parsed: TavilySearchResponse = self
            .http
            .post_json(
                &self.endpoint,
                &body,
                Some(&self.api_key),
                timeout_from_query(q, self.timeout),
            )
            .await?;

        let hits = parsed
            .results
            .into_iter()
            .take(q.max_results)
            .map(|r| {
                SearchHit::new(
                    r.title.unwrap_or_default(),
                    r.url.unwrap_or_default(),
                    r.content.unwrap_or_default(),
                )
            })
            .collect();

        let mut timings_ms = BTreeMap::new();
        timings_ms.insert("search".to_string(), t0.elapsed().as_millis());

        Ok(SearchResponse {
            provider: self.name().to_string(),
            hits,
            timings_ms,
        })
    }
}

/// Public fallback: MediaWiki full-text search, then one REST summary per hit.
#[derive(Debug, Clone)]
pub struct WikipediaSearchProvider {
    http: HttpClient,
    base: url::Url,
    timeout: Duration,
}

impl WikipediaSearchProvider {
    pub fn new(http: HttpClient, base: &str) -> Result<Self> {
        let base = url::Url::parse(base).map_err(|e| Error::InvalidUrl(format!("{base}: {e}")))?;
        Ok(Self {
            http,
            base,
            timeout: Duration::from_secs(30),
        })
    }

    pub fn from_config(http: HttpClient, cfg: &Config) -> Result<Self> {
        let mut p = Self::new(http, &cfg.wikipedia_base)?;
        p.timeout = cfg.fetch_timeout;
        Ok(p)
    }

    /// `base` + path segments, each percent-encoded.
    fn url_with_segments(&self, segments: &[&str]) -> Result<url::Url> {
        let mut u = self.base.clone();
        u.path_segments_mut()
            .map_err(|_| Error::InvalidUrl(format!("cannot be a base: {}", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(u)
    }

    fn search_url(&self, q: &SearchQuery) -> Result<url::Url> {
        let mut u = self.url_with_segments(&["w", "api.php"])?;
        u.query_pairs_mut()
            .append_pair("action", "query")
            .append_pair("list", "search")
            .append_pair("srsearch", &q.query)
            .append_pair("format", "json")
            .append_pair("srlimit", &q.max_results.to_string());
        Ok(u)
    }

    pub fn page_url(&self, slug: &str) -> Result<url::Url> {
        self.url_with_segments(&["wiki", slug])
    }

    fn summary_url(&self, slug: &str) -> Result<url::Url> {
        self.url_with_segments(&["api", "rest_v1", "page", "summary", slug])
    }

    async fn summary_extract(&self, slug: &str, timeout: Duration) -> String {
        let Ok(u) = self.summary_url(slug) else {
            return String::new();
        };
        match self.http.get_json::<WikiSummary>(u.as_str(), timeout).await {
            Ok(s) => s.extract.unwrap_or_default(),
            Err(e) => {
                tracing::debug!(slug, error = %e, "wikipedia summary unavailable");
                String::new()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct WikiSearchResponse {
    query: Option<WikiQuery>,
}

#[derive(Debug, Deserialize)]
struct WikiQuery {
    #[serde(default)]
    search: Vec<WikiSearchHit>,
}

#[derive(Debug, Deserialize)]
struct WikiSearchHit {
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct WikiSummary {
    extract: Option<String>,
}

#[async_trait::async_trait]
impl SearchProvider for WikipediaSearchProvider {
    fn name(&self) -> &'static str {
        "wikipedia"
    }

    async fn search(&self, q: &SearchQuery) -> Result<SearchResponse> {
        let t0 = Instant::now();
        let timeout = timeout_from_query(q, self.timeout);

        let parsed: WikiSearchResponse = self
            .http
            .get_json(self.search_url(q)?.as_str(), timeout)
            .await?;
        let titles: Vec<String> = parsed
            .query
            .map(|qq| qq.search)
            .unwrap_or_default()
            .into_iter()
            .take(q.max_results)
            .map(|h| h.title)
            .collect();
        let mut timings_ms = BTreeMap::new();
        timings_ms.insert("search".to_string(), t0.elapsed().as_millis());

        // Summaries are fetched one at a time, in rank order.
        let t1 = Instant::now();
        let mut hits = Vec::with_capacity(titles.len());
        for title in titles {
            let slug = title.replace(' ', "_");
            let snippet = self.summary_extract(&slug, timeout).await;
            let url = self.page_url(&slug)?.to_string();
            hits.push(SearchHit::new(title, url, snippet));
        }
        timings_ms.insert("summaries".to_string(), t1.elapsed().as_millis());

        Ok(SearchResponse {
            provider: self.name().to_string(),
            hits,
            timings_ms,
        })
    }
}
