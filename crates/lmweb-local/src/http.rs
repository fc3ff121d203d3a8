//! Thin request helpers: JSON POST and plain GET with explicit timeouts.
//!
//! Every transport failure is converted here, once, into `lmweb_core::Error`; non-2xx
//! responses become [`Error::HttpStatus`] with the body attached.

use lmweb_core::truncate::truncate_bytes;
use lmweb_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Error bodies are attached to errors, but not unbounded.
const ERROR_BODY_MAX_BYTES: usize = 4_000;

#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("lmweb/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(10))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub async fn post_json<B, R>(
        &self,
        url: &str,
        body: &B,
        bearer: Option<&str>,
        timeout: Duration,
    ) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let mut rb = self
            .client
            .post(url)
            .timeout(timeout)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(body);
        if let Some(k) = bearer {
            rb = rb.header(reqwest::header::AUTHORIZATION, format!("Bearer {k}"));
        }
        let resp = rb
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        let resp = error_for_status(resp).await?;
        resp.json::<R>()
            .await
            .map_err(|e| Error::Decode(e.to_string()))
    }

    pub async fn get_text(&self, url: &str, timeout: Duration) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        let resp = error_for_status(resp).await?;
        resp.text()
            .await
            .map_err(|e| Error::Transport(e.to_string()))
    }

    pub async fn get_json<R: DeserializeOwned>(&self, url: &str, timeout: Duration) -> Result<R> {
        let text = self.get_text(url, timeout).await?;
        serde_json::from_str(&text).map_err(|e| Error::Decode(e.to_string()))
    }
}

async fn error_for_status(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(Error::HttpStatus {
        status: status.as_u16(),
        body: truncate_bytes(&body, ERROR_BODY_MAX_BYTES).to_string(),
    })
}
