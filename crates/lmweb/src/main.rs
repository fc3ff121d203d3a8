use anyhow::Result;
use clap::{Parser, Subcommand};
use lmweb_local::{ChatOrchestrator, Config, SearchMode};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "lmweb")]
#[command(about = "Answer questions with a local LLM plus one optional web search/fetch", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer one question and print the answer.
    Ask(AskCmd),
    /// Serve `POST /ask {"question"} -> {"answer"}` over HTTP.
    Serve(ServeCmd),
    /// Send a single "Hello" to the model to check the endpoint is up.
    Ping(PingCmd),
    /// Diagnose configuration (json; no secrets).
    Doctor(DoctorCmd),
    /// Print version info.
    Version(VersionCmd),
}

/// Command-line overrides applied on top of the environment.
#[derive(clap::Args, Debug)]
struct ConfigOverrides {
    /// Model id sent to the completion endpoint (default: $LM_MODEL).
    #[arg(long)]
    model: Option<String>,
    /// Allowed: auto (model decides), always (search first, no tool calling).
    #[arg(long)]
    search_mode: Option<SearchMode>,
    /// Append `site:.gov` to searches naming an office holder.
    #[arg(long, action = clap::ArgAction::Set)]
    gov_site_filter: Option<bool>,
    /// Results requested per search.
    #[arg(long)]
    top_k: Option<usize>,
}

impl ConfigOverrides {
    fn apply(self, mut cfg: Config) -> Config {
        if let Some(m) = self.model {
            cfg.model = m;
        }
        if let Some(m) = self.search_mode {
            cfg.search_mode = m;
        }
        if let Some(b) = self.gov_site_filter {
            cfg.gov_site_filter = b;
        }
        if let Some(k) = self.top_k.filter(|k| *k > 0) {
            cfg.top_k = k;
        }
        cfg
    }
}

#[derive(clap::Args, Debug)]
struct AskCmd {
    /// The question (multiple words are joined with spaces).
    #[arg(required = true, num_args = 1..)]
    question: Vec<String>,
    #[command(flatten)]
    overrides: ConfigOverrides,
    /// Output format: text|json
    #[arg(long = "output", alias = "format", default_value = "text")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct ServeCmd {
    #[arg(long, default_value = "127.0.0.1:5055")]
    addr: std::net::SocketAddr,
    #[command(flatten)]
    overrides: ConfigOverrides,
}

#[derive(clap::Args, Debug)]
struct PingCmd {
    #[arg(long)]
    model: Option<String>,
}

#[derive(clap::Args, Debug)]
struct DoctorCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
    /// Also send one tiny completion to the model endpoint.
    #[arg(long, action = clap::ArgAction::Set, default_value_t = false)]
    check_lm: bool,
}

#[derive(clap::Args, Debug)]
struct VersionCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

/// Loads `KEY=VALUE` lines from `$LMWEB_ENV_FILE` without overriding the process env.
fn load_env_file() {
    let Ok(p) = std::env::var("LMWEB_ENV_FILE") else {
        return;
    };
    let p = p.trim();
    if p.is_empty() {
        return;
    }
    let Ok(txt) = std::fs::read_to_string(p) else {
        return;
    };
    for raw in txt.lines() {
        let s = raw.trim();
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        let Some((k, v)) = s.split_once('=') else {
            continue;
        };
        let k = k.trim();
        if k.is_empty() {
            continue;
        }
        if std::env::var_os(k).is_none() {
            std::env::set_var(k, v.trim());
        }
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn print_troubleshooting(cfg: &Config) {
    eprintln!("\nTroubleshooting:");
    eprintln!("1. Make sure the model server is running at {}", cfg.lm_base);
    eprintln!("2. Load a model (current: {})", cfg.model);
    eprintln!("3. Start the server's OpenAI-compatible API");
    eprintln!("4. If tool calls misbehave, try --search-mode always");
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env_file();
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Ask(args) => {
            let cfg = args.overrides.apply(Config::from_env()?);
            let question = args.question.join(" ");
            let orchestrator = ChatOrchestrator::from_config(&cfg)?;

            let t0 = std::time::Instant::now();
            let answer = match orchestrator.answer(&question).await {
                Ok(a) => a,
                Err(e) => {
                    print_troubleshooting(&cfg);
                    return Err(e.into());
                }
            };
            let elapsed_ms = t0.elapsed().as_millis();

            match args.output.to_ascii_lowercase().as_str() {
                "json" => {
                    let v = serde_json::json!({
                        "schema_version": 1,
                        "kind": "ask",
                        "ok": true,
                        "question": question,
                        "answer": answer,
                        "search_mode": cfg.search_mode,
                        "elapsed_ms": elapsed_ms,
                    });
                    println!("{v}");
                }
                _ => {
                    println!("{answer}");
                    eprintln!("(elapsed {:.2}s)", elapsed_ms as f64 / 1000.0);
                }
            }
        }
        Commands::Serve(args) => {
            let cfg = args.overrides.apply(Config::from_env()?);
            let orchestrator = Arc::new(ChatOrchestrator::from_config(&cfg)?);
            lmweb::server::serve(args.addr, orchestrator).await?;
        }
        Commands::Ping(args) => {
            let mut cfg = Config::from_env()?;
            if let Some(m) = args.model {
                cfg.model = m;
            }
            let orchestrator = ChatOrchestrator::from_config(&cfg)?;
            let llm = orchestrator.llm();
            let res = llm.chat("Hello").await;
            let ok = res.is_ok();
            let v = serde_json::json!({
                "schema_version": 1,
                "kind": "ping",
                "ok": ok,
                "endpoint": llm.endpoint(),
                "model": llm.model(),
                "reply": res.as_ref().ok().cloned().flatten(),
                "error": res.as_ref().err().map(|e| e.to_string()),
            });
            println!("{v}");
            if let Err(e) = res {
                print_troubleshooting(&cfg);
                return Err(e.into());
            }
        }
        Commands::Doctor(args) => {
            let t0 = std::time::Instant::now();
            let cfg = Config::from_env();
            let mut checks: Vec<serde_json::Value> = Vec::new();

            let config_error = cfg.as_ref().err().map(|e| e.to_string());
            checks.push(serde_json::json!({
                "name": "config_valid",
                "ok": config_error.is_none(),
                "error": config_error,
            }));
            let cfg = cfg.unwrap_or_default();

            // Check: one completion round-trip (optional).
            let mut lm_check = serde_json::json!({
                "name": "lm_reachable",
                "ok": true,
                "skipped": !args.check_lm,
                "error": null,
                "elapsed_ms": 0,
            });
            if args.check_lm {
                let check_t0 = std::time::Instant::now();
                let res = match ChatOrchestrator::from_config(&cfg) {
                    Ok(o) => o.llm().chat("Hello").await.map(|_| ()),
                    Err(e) => Err(e),
                };
                lm_check["ok"] = serde_json::json!(res.is_ok());
                lm_check["error"] = serde_json::json!(res.err().map(|e| e.to_string()));
                lm_check["elapsed_ms"] = serde_json::json!(check_t0.elapsed().as_millis());
            }
            checks.push(lm_check);

            let ok = checks.iter().all(|c| c["ok"].as_bool() == Some(true));
            // Booleans only for secrets; never print their values.
            let v = serde_json::json!({
                "schema_version": 1,
                "kind": "doctor",
                "ok": ok,
                "name": "lmweb",
                "version": env!("CARGO_PKG_VERSION"),
                "elapsed_ms": t0.elapsed().as_millis(),
                "configured": {
                    "lm_base": cfg.lm_base,
                    "model": cfg.model,
                    "lm_api_key": cfg.lm_api_key.is_some(),
                    "providers": {
                        "tavily": cfg.tavily_api_key.is_some(),
                        "wikipedia": true,
                    },
                    "search_mode": cfg.search_mode,
                    "gov_site_filter": cfg.gov_site_filter,
                    "top_k": cfg.top_k,
                },
                "checks": checks,
            });
            match args.output.to_ascii_lowercase().as_str() {
                "text" => {
                    println!("lmweb {} ok={}", env!("CARGO_PKG_VERSION"), ok);
                    println!("lm_base: {} (model {})", cfg.lm_base, cfg.model);
                    println!(
                        "tavily: {}",
                        if cfg.tavily_api_key.is_some() {
                            "configured"
                        } else {
                            "not configured (wikipedia only)"
                        }
                    );
                    println!("checks:");
                    for c in &checks {
                        println!(
                            "- {}: ok={} {}",
                            c["name"].as_str().unwrap_or(""),
                            c["ok"],
                            c["error"].as_str().unwrap_or("")
                        );
                    }
                }
                _ => println!("{}", v),
            }
        }
        Commands::Version(args) => {
            let v = serde_json::json!({
                "schema_version": 1,
                "kind": "version",
                "ok": true,
                "name": "lmweb",
                "version": env!("CARGO_PKG_VERSION"),
            });
            match args.output.to_ascii_lowercase().as_str() {
                "text" => println!("lmweb {}", env!("CARGO_PKG_VERSION")),
                _ => println!("{}", v),
            }
        }
    }

    Ok(())
}
