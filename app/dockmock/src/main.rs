//! Line-oriented console for the simulator.
//!
//! Reads one request per stdin line:
//!
//! ```text
//! GET /containers/json?all=1
//! POST /containers/create?name=web {"Image": "tutum/wordpress"}
//! POST /containers/web/start
//! DELETE /images/fedora:rawhide
//! ```
//!
//! Each request is numbered. Replies, errors and events are printed to
//! stdout as one JSON object per line; deferred replies are printed when
//! they settle, so they may interleave with later requests.

use anyhow::{Context, Result};
use clap::Parser;
use dockmock_core::{Config, Simulator};
use dockmock_docker::{DockerError, Reply, Request, RequestRouter, Verb};
use serde_json::json;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "dockmock")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file to load instead of the system and user files.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Delay before deferred operations commit, in milliseconds.
    #[arg(long)]
    latency_ms: Option<u64>,

    /// Start with an empty store instead of the demo data.
    #[arg(long)]
    no_seed: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load().context("Failed to load config")?,
    };
    if let Some(latency_ms) = args.latency_ms {
        config.engine.latency_ms = latency_ms;
    }
    if args.no_seed {
        config.fixtures.seed = false;
    }

    let level = config.logging.level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("dockmock={level},dockmock_core={level},dockmock_docker={level}").into()
            }),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    run(config).await
}

async fn run(config: Config) -> Result<()> {
    let sim = Simulator::with_tokio(config).context("Failed to create simulator")?;
    sim.events().subscribe(|event| {
        println!("{}", json!({ "event": event }));
    });
    let router = RequestRouter::new(sim);
    info!(
        latency_ms = router.simulator().config().engine.latency_ms,
        seeded = router.simulator().config().fixtures.seed,
        "Reading requests from stdin"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pending = JoinSet::new();
    let mut seq: u64 = 0;

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        seq += 1;

        match parse_line(line).and_then(|request| router.dispatch(request)) {
            Ok(reply) => {
                pending.spawn(async move { print_outcome(seq, reply.await) });
            }
            Err(e) => print_outcome(seq, Err(e)),
        }
    }

    debug!(outstanding = pending.len(), "stdin closed");
    while pending.join_next().await.is_some() {}
    Ok(())
}

/// Parses `VERB PATH [JSON]`.
fn parse_line(line: &str) -> dockmock_docker::Result<Request> {
    let mut parts = line.splitn(3, char::is_whitespace);
    let word = parts.next().unwrap_or_default();
    let target = parts.next().unwrap_or_default().trim();
    let path = target.split('?').next().unwrap_or(target);

    let verb = Verb::parse(word, path).ok_or_else(|| DockerError::Unrecognized(line.to_string()))?;
    let body = match parts.next().map(str::trim).filter(|b| !b.is_empty()) {
        Some(raw) => Some(
            serde_json::from_str(raw).map_err(|e| DockerError::malformed(path, e.to_string()))?,
        ),
        None => None,
    };

    Ok(Request {
        verb,
        target: target.to_string(),
        body,
    })
}

fn print_outcome(seq: u64, outcome: dockmock_docker::Result<Reply>) {
    let line = match outcome {
        Ok(reply) => json!({ "request": seq, "reply": reply }),
        Err(e) => json!({
            "request": seq,
            "error": {
                "kind": format!("{:?}", e.kind()),
                "status": e.status_code().as_u16(),
                "message": e.to_string(),
            },
        }),
    };
    println!("{line}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_verb_path_and_body() {
        let request = parse_line(r#"POST /containers/create?name=web {"Image": "fedora"}"#).unwrap();
        assert_eq!(request.verb, Verb::Create);
        assert_eq!(request.target, "/containers/create?name=web");
        assert_eq!(request.body, Some(json!({"Image": "fedora"})));

        let request = parse_line("delete /images/tutum/lamp").unwrap();
        assert_eq!(request.verb, Verb::Delete);
        assert_eq!(request.body, None);
    }

    #[test]
    fn rejects_bad_lines() {
        assert!(matches!(
            parse_line("FROB /containers/json"),
            Err(DockerError::Unrecognized(_))
        ));
        assert!(matches!(
            parse_line("POST /containers/create {oops"),
            Err(DockerError::Malformed { .. })
        ));
    }

    #[test]
    fn args_parse() {
        let args = Args::parse_from(["dockmock", "--latency-ms", "0", "--no-seed"]);
        assert_eq!(args.latency_ms, Some(0));
        assert!(args.no_seed);
        assert!(args.config.is_none());
    }
}
