use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

/// One server standing in for both the model endpoint and Wikipedia.
#[derive(Clone, Default)]
struct Fixture {
    replies: Arc<Mutex<VecDeque<Value>>>,
    llm_requests: Arc<Mutex<Vec<Value>>>,
    wiki_queries: Arc<Mutex<Vec<String>>>,
}

async fn completions(State(f): State<Fixture>, Json(body): Json<Value>) -> Json<Value> {
    f.llm_requests.lock().unwrap().push(body);
    let msg = f
        .replies
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| json!({"content": "unexpected extra round"}));
    Json(json!({"choices": [{"index": 0, "message": msg}]}))
}

async fn wiki_search(
    State(f): State<Fixture>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let q = params.get("srsearch").cloned().unwrap_or_default();
    f.wiki_queries.lock().unwrap().push(q);
    Json(json!({"query": {"search": [{"title": "Answer Page"}]}}))
}

async fn wiki_summary(Path(slug): Path<String>) -> Json<Value> {
    Json(json!({"extract": format!("Summary of {slug}, updated 2025-01-01.")}))
}

async fn start(replies: Vec<Value>) -> (SocketAddr, Fixture) {
    let f = Fixture {
        replies: Arc::new(Mutex::new(replies.into())),
        ..Fixture::default()
    };
    let app = Router::new()
        .route("/v1/chat/completions", post(completions))
        .route("/w/api.php", get(wiki_search))
        .route("/api/rest_v1/page/summary/:slug", get(wiki_summary))
        .with_state(f.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, f)
}

async fn lmweb(lm_base: &str, wiki_base: &str, args: &[&str]) -> std::process::Output {
    let bin = assert_cmd::cargo::cargo_bin!("lmweb");
    tokio::process::Command::new(bin)
        .args(args)
        .env("LM_BASE", lm_base)
        .env("LMWEB_WIKIPEDIA_BASE", wiki_base)
        .env("RUST_LOG", "error")
        // Keep the run hermetic: no paid provider, no env file.
        .env_remove("LMWEB_TAVILY_API_KEY")
        .env_remove("TAVILY_API_KEY")
        .env_remove("LM_API_KEY")
        .env_remove("LMWEB_ENV_FILE")
        .env_remove("LMWEB_SEARCH_MODE")
        .env_remove("LMWEB_GOV_SITE_FILTER")
        .env_remove("LMWEB_TOP_K")
        .output()
        .await
        .expect("run lmweb")
}

#[tokio::test]
async fn ask_direct_answer_skips_search() {
    let (addr, f) = start(vec![json!({"role": "assistant", "content": "4"})]).await;
    let out = lmweb(
        &format!("http://{addr}/v1"),
        &format!("http://{addr}"),
        &["ask", "What", "is", "2+2?"],
    )
    .await;
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(String::from_utf8_lossy(&out.stdout).trim_end(), "4");

    assert!(f.wiki_queries.lock().unwrap().is_empty());
    let reqs = f.llm_requests.lock().unwrap();
    assert_eq!(reqs.len(), 1);
    assert_eq!(reqs[0]["messages"][1]["content"], "What is 2+2?");
}

#[tokio::test]
async fn ask_structured_search_runs_one_extra_round() {
    let (addr, f) = start(vec![
        json!({
            "role": "assistant",
            "content": null,
            "tool_calls": [{"id": "call_1", "type": "function",
                "function": {"name": "search_web", "arguments": "{\"query\":\"Q\",\"top_k\":3}"}}]
        }),
        json!({"role": "assistant", "content": "Final answer (source: Answer Page)."}),
    ])
    .await;
    let out = lmweb(
        &format!("http://{addr}/v1"),
        &format!("http://{addr}"),
        &["ask", "--output", "json", "Something current?"],
    )
    .await;
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let v: Value = serde_json::from_slice(&out.stdout).expect("ask json");
    assert_eq!(v["kind"], "ask");
    assert_eq!(v["ok"], true);
    assert_eq!(v["answer"], "Final answer (source: Answer Page).");

    assert_eq!(*f.wiki_queries.lock().unwrap(), vec!["Q".to_string()]);
    let reqs = f.llm_requests.lock().unwrap();
    assert_eq!(reqs.len(), 2);
    let tool_turn = &reqs[1]["messages"][3];
    assert_eq!(tool_turn["role"], "tool");
    assert!(tool_turn["content"]
        .as_str()
        .unwrap()
        .contains("Summary of Answer_Page"));
}

#[tokio::test]
async fn ask_always_mode_presearches_with_gov_filter() {
    let (addr, f) = start(vec![json!({"content": "The Secretary is X [1]."})]).await;
    let out = lmweb(
        &format!("http://{addr}/v1"),
        &format!("http://{addr}"),
        &[
            "ask",
            "--search-mode",
            "always",
            "--gov-site-filter",
            "true",
            "Who is the Secretary of Labor?",
        ],
    )
    .await;
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(
        String::from_utf8_lossy(&out.stdout).trim_end(),
        "The Secretary is X [1]."
    );
    assert_eq!(
        *f.wiki_queries.lock().unwrap(),
        vec!["Who is the Secretary of Labor? site:.gov".to_string()]
    );
    let reqs = f.llm_requests.lock().unwrap();
    assert_eq!(reqs.len(), 1);
    assert!(reqs[0].get("tools").is_none());
}

#[tokio::test]
async fn ask_unreachable_model_fails_with_hints() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let out = lmweb(
        &format!("http://{addr}/v1"),
        &format!("http://{addr}"),
        &["ask", "hello?"],
    )
    .await;
    assert!(!out.status.success());
    let err = String::from_utf8_lossy(&out.stderr);
    assert!(err.contains("Troubleshooting"), "{err}");
    assert!(err.contains("request failed"), "{err}");
}
