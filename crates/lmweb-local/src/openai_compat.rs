use crate::config::Config;
use crate::http::HttpClient;
use lmweb_core::chat::{message_content, ChatRequest, ChatResponse, ToolSpec, Turn};
use lmweb_core::Result;
use serde_json::Value;
use std::time::Duration;

/// Client for an OpenAI-compatible `/chat/completions` endpoint (LM Studio, llama.cpp, vLLM, ...).
#[derive(Debug, Clone)]
pub struct OpenAiCompatClient {
    http: HttpClient,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    timeout: Duration,
}

impl OpenAiCompatClient {
    pub fn new(http: HttpClient, cfg: &Config) -> Self {
        Self {
            http,
            endpoint: cfg.chat_completions_url(),
            api_key: cfg.lm_api_key.clone(),
            model: cfg.model.clone(),
            timeout: cfg.completion_timeout,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// One completion round. Returns the first choice's raw message (`Null` if none).
    ///
    /// With a non-empty `tools`, they are declared in both the modern and the legacy
    /// convention so older servers can still call them.
    pub async fn complete(&self, messages: &[Turn], tools: &[ToolSpec]) -> Result<Value> {
        let mut req = ChatRequest::new(self.model.clone(), messages.to_vec());
        if !tools.is_empty() {
            req = req.with_tools(tools);
        }
        let resp: ChatResponse = self
            .http
            .post_json(&self.endpoint, &req, self.api_key.as_deref(), self.timeout)
            .await?;
        Ok(resp.into_message())
    }

    /// Single-turn chat without tools; used as a reachability smoke test.
    pub async fn chat(&self, user: &str) -> Result<Option<String>> {
        let msg = self.complete(&[Turn::user(user)], &[]).await?;
        Ok(message_content(&msg).map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::HeaderMap, routing::post, Json, Router};
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn chat_posts_model_and_messages_with_optional_key() {
        let seen: Arc<Mutex<Vec<(Option<String>, Value)>>> = Arc::default();
        let seen2 = seen.clone();
        let app = Router::new().route(
            "/v1/chat/completions",
            post(move |headers: HeaderMap, Json(v): Json<Value>| {
                let seen = seen2.clone();
                async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|h| h.to_str().ok())
                        .map(str::to_string);
                    seen.lock().unwrap().push((auth, v));
                    Json(serde_json::json!({
                        "choices": [{"message": {"role": "assistant", "content": "Hi there"}}]
                    }))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let mut cfg = Config {
            lm_base: format!("http://{addr}/v1"),
            model: "tiny".to_string(),
            ..Config::default()
        };
        let http = HttpClient::new().unwrap();
        let out = OpenAiCompatClient::new(http.clone(), &cfg)
            .chat("Hello")
            .await
            .unwrap();
        assert_eq!(out.as_deref(), Some("Hi there"));

        cfg.lm_api_key = Some("lm-key".to_string());
        OpenAiCompatClient::new(http, &cfg).chat("Hello").await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0, None);
        assert_eq!(seen[0].1["model"], "tiny");
        assert_eq!(seen[0].1["messages"][0]["content"], "Hello");
        assert!(seen[0].1.get("tools").is_none());
        assert_eq!(seen[1].0.as_deref(), Some("Bearer lm-key"));
    }
}
