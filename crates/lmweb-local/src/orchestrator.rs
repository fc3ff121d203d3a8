//! One question in, one answer out.
//!
//! `Auto` mode: ask with tools declared, run at most one requested call, ask again.
//! `Always` mode: search first, then a single tool-free completion over the results.

use crate::config::{Config, SearchMode};
use crate::http::HttpClient;
use crate::openai_compat::OpenAiCompatClient;
use crate::tools::{tool_specs, ToolDispatcher, SEARCH_WEB};
use lmweb_core::chat::{message_content, Turn};
use lmweb_core::{normalize, Result, SearchHit, TOOL_RESULT_MAX_BYTES};
use serde_json::Value;

pub const NO_CONTENT: &str = "(no content)";

const SYSTEM_PROMPT: &str = "You are a careful research assistant with two tools.\n\
- search_web(query, top_k): call it at most once, unless the first search returned nothing.\n\
- fetch_url(url): optionally fetch one page from the results when snippets are not enough.\n\
Answer concisely. Cite 1-3 source URLs and include dates when the sources give them. \
If the sources do not contain the answer, say so.";

pub struct ChatOrchestrator {
    llm: OpenAiCompatClient,
    tools: ToolDispatcher,
    mode: SearchMode,
}

impl ChatOrchestrator {
    pub fn new(llm: OpenAiCompatClient, tools: ToolDispatcher, mode: SearchMode) -> Self {
        Self { llm, tools, mode }
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let http = HttpClient::new()?;
        Ok(Self::new(
            OpenAiCompatClient::new(http.clone(), cfg),
            ToolDispatcher::from_config(http, cfg)?,
            cfg.search_mode,
        ))
    }

    pub fn llm(&self) -> &OpenAiCompatClient {
        &self.llm
    }

    /// Runs one query. Only completion-endpoint failures are returned as errors.
    pub async fn answer(&self, question: &str) -> Result<String> {
        tracing::info!(question, mode = ?self.mode, "question");
        let answer = match self.mode {
            SearchMode::Auto => self.answer_with_tools(question).await?,
            SearchMode::Always => self.answer_after_search(question).await?,
        };
        tracing::info!(answer_len = answer.len(), "answered");
        Ok(answer)
    }

    async fn answer_with_tools(&self, question: &str) -> Result<String> {
        let specs = tool_specs();
        let mut conversation = vec![Turn::system(SYSTEM_PROMPT), Turn::user(question)];

        let first = self.llm.complete(&conversation, &specs).await?;
        let Some(call) = normalize(&first) else {
            tracing::debug!("no tool call; returning first response");
            return Ok(content_or_placeholder(&first));
        };

        tracing::debug!(tool = call.name(), origin = ?call.origin(), "executing tool call");
        conversation.push(Turn::assistant_call(&call, message_content(&first)));
        let result = self.tools.dispatch(&call).await;
        if let Some(e) = &result.error {
            tracing::warn!(tool = call.name(), error = %e, "tool call failed");
        }
        conversation.push(Turn::tool_result(
            &call,
            result.to_turn_content(TOOL_RESULT_MAX_BYTES),
        ));

        tracing::debug!("requesting final answer");
        let second = self.llm.complete(&conversation, &specs).await?;
        Ok(content_or_placeholder(&second))
    }

    async fn answer_after_search(&self, question: &str) -> Result<String> {
        let result = self
            .tools
            .search_web(question.trim(), self.tools.default_top_k())
            .await;
        let hits: Vec<SearchHit> = match result.payload.get("items") {
            Some(items) => serde_json::from_value(items.clone()).unwrap_or_default(),
            None => {
                tracing::warn!(tool = SEARCH_WEB, payload = %result.payload, "pre-search failed");
                Vec::new()
            }
        };

        let prompt = grounded_prompt(question, &hits);
        let msg = self.llm.complete(&[Turn::user(prompt)], &[]).await?;
        Ok(content_or_placeholder(&msg))
    }
}

fn content_or_placeholder(message: &Value) -> String {
    message_content(message).unwrap_or(NO_CONTENT).to_string()
}

/// Single-turn prompt that inlines search results as the only allowed context.
fn grounded_prompt(question: &str, hits: &[SearchHit]) -> String {
    let mut context = String::new();
    if !hits.is_empty() {
        context.push_str("Search results:\n");
        for h in hits {
            context.push_str(&format!("- {}: {} ({})\n", h.title, h.snippet, h.url));
        }
    }
    format!(
        "Answer this question using ONLY the search results provided. \
If the information is not in the search results, say so.\n\n\
Question: {question}\n\n\
Instructions:\n\
- Use only facts from the search results\n\
- Cite 1-2 source URLs\n\
- Include dates when available\n\
- Prefer official sources\n\n\
{context}\n\
Answer:"
    )
}
