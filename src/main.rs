// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Kalamari Intercept CLI
//!
//! Replays captured `Fetch.requestPaused` notifications through a handler
//! chain and prints the commands that would be sent to the browser.

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context};
use futures::future::join_all;

use kalamari_intercept::{
    FulfillResponse, HeaderInjector, InterceptConfig, Interceptor, MockResponder,
    RecordingChannel, RequestLogger, RequestPaused, UrlBlocker,
};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("kalamari_intercept=info".parse().unwrap()),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return ExitCode::from(1);
    }

    match args[1].as_str() {
        "replay" => {
            if args.len() < 3 {
                eprintln!("Usage: kalamari-intercept replay <events.json> [OPTIONS]");
                return ExitCode::from(1);
            }
            match replay(&args[2..]).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("Replay failed: {:#}", e);
                    ExitCode::from(1)
                }
            }
        }
        "--help" | "-h" | "help" => {
            print_usage();
            ExitCode::SUCCESS
        }
        "--version" | "-v" | "version" => {
            println!("kalamari-intercept {}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        cmd => {
            eprintln!("Unknown command: {}", cmd);
            print_usage();
            ExitCode::from(1)
        }
    }
}

fn print_usage() {
    println!(
        r#"Kalamari Intercept - CDP request interception

USAGE:
    kalamari-intercept <COMMAND> [OPTIONS]

COMMANDS:
    replay <events.json>    Replay requestPaused params through a handler chain
    help                    Show this help message
    version                 Show version information

REPLAY OPTIONS:
    --block <regex>                 Abort requests whose URL matches
    --mock <regex>=<status>:<body>  Fulfill matching requests
    --header <name>:<value>         Inject a header into remaining requests
    --config <file>                 Load interception config (JSON)

EXAMPLES:
    kalamari-intercept replay paused.json --block '\.(png|woff2)$'
    kalamari-intercept replay paused.json --mock '/api/user$=200:{{"id":1}}'
"#
    );
}

/// Parsed replay arguments
#[derive(Debug, Default)]
struct ReplayArgs {
    events: String,
    blocks: Vec<String>,
    mocks: Vec<(String, u16, String)>,
    headers: Vec<(String, String)>,
    config: Option<String>,
}

fn parse_replay_args(args: &[String]) -> anyhow::Result<ReplayArgs> {
    let mut parsed = ReplayArgs {
        events: args[0].clone(),
        ..Default::default()
    };

    let mut rest = args[1..].iter();
    while let Some(flag) = rest.next() {
        let value = rest
            .next()
            .with_context(|| format!("{} requires a value", flag))?;

        match flag.as_str() {
            "--block" => parsed.blocks.push(value.clone()),
            "--mock" => {
                let (pattern, status, body) = split_mock(value)
                    .with_context(|| format!("--mock expects <regex>=<status>:<body>, got {}", value))?;
                parsed.mocks.push((pattern.to_string(), status, body.to_string()));
            }
            "--header" => {
                let (name, header_value) = value
                    .split_once(':')
                    .with_context(|| format!("--header expects <name>:<value>, got {}", value))?;
                parsed
                    .headers
                    .push((name.trim().to_string(), header_value.trim().to_string()));
            }
            "--config" => parsed.config = Some(value.clone()),
            other => bail!("unknown option {}", other),
        }
    }

    Ok(parsed)
}

/// Split `<regex>=<status>[:<body>]` at the first `=` followed by a status
fn split_mock(value: &str) -> Option<(&str, u16, &str)> {
    value.match_indices('=').find_map(|(index, _)| {
        let response = &value[index + 1..];
        let (status, body) = response.split_once(':').unwrap_or((response, ""));
        if status.is_empty() || !status.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let status: u16 = status.parse().ok()?;
        (100..=599).contains(&status).then_some((&value[..index], status, body))
    })
}

async fn replay(args: &[String]) -> anyhow::Result<()> {
    let args = parse_replay_args(args)?;

    let config = match args.config {
        Some(ref path) => InterceptConfig::from_file(path)?,
        None => InterceptConfig::default(),
    };

    let channel = Arc::new(RecordingChannel::new());
    let interceptor = Interceptor::with_config(channel.clone(), config)?;

    interceptor.register(RequestLogger::new());

    if !args.blocks.is_empty() {
        let mut blocker = UrlBlocker::new();
        for pattern in &args.blocks {
            blocker = blocker.pattern(pattern)?;
        }
        interceptor.register(blocker);
    }

    if !args.mocks.is_empty() {
        let mut responder = MockResponder::new();
        for (pattern, status, body) in &args.mocks {
            responder =
                responder.route(pattern, FulfillResponse::new().status(*status).body(body.clone()))?;
        }
        interceptor.register(responder);
    }

    if !args.headers.is_empty() {
        let mut injector = HeaderInjector::new();
        for (name, value) in &args.headers {
            injector = injector.header(name.clone(), value.clone());
        }
        interceptor.register(injector);
    }

    let raw = std::fs::read_to_string(&args.events)
        .with_context(|| format!("reading {}", args.events))?;
    let events: Vec<serde_json::Value> =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", args.events))?;

    let mut notifications = Vec::with_capacity(events.len());
    for params in events {
        notifications.push(RequestPaused::from_params(params)?);
    }
    if notifications.is_empty() {
        bail!("{} contains no notifications", args.events);
    }

    let results = join_all(
        notifications
            .into_iter()
            .map(|paused| interceptor.on_request_paused(paused)),
    )
    .await;

    for err in results.into_iter().filter_map(|r| r.err()) {
        tracing::error!(error = %err, "Replay dispatch failed");
    }

    for command in channel.commands() {
        println!("{}", serde_json::to_string(&command)?);
    }

    eprintln!("{}", serde_json::to_string_pretty(&interceptor.stats())?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_replay_args() {
        let parsed = parse_replay_args(&args(&[
            "paused.json",
            "--block",
            r"\.png$",
            "--mock",
            "/api/a=b$=404:not found",
            "--header",
            "X-Scan: 1",
        ]))
        .unwrap();

        assert_eq!(parsed.events, "paused.json");
        assert_eq!(parsed.blocks, vec![r"\.png$".to_string()]);
        assert_eq!(
            parsed.mocks,
            vec![("/api/a=b$".to_string(), 404, "not found".to_string())]
        );
        assert_eq!(parsed.headers, vec![("X-Scan".to_string(), "1".to_string())]);
    }

    #[test]
    fn test_mock_body_with_equals() {
        let parsed = parse_replay_args(&args(&[
            "paused.json",
            "--mock",
            "/api$=200:a=b",
            "--mock",
            "token=x$=401:dG9rZW4=",
            "--mock",
            "/empty$=204",
            "--mock",
            "/q$=200:id=3:x",
        ]))
        .unwrap();

        assert_eq!(
            parsed.mocks,
            vec![
                ("/api$".to_string(), 200, "a=b".to_string()),
                ("token=x$".to_string(), 401, "dG9rZW4=".to_string()),
                ("/empty$".to_string(), 204, String::new()),
                ("/q$".to_string(), 200, "id=3:x".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_replay_args_errors() {
        assert!(parse_replay_args(&args(&["paused.json", "--block"])).is_err());
        assert!(parse_replay_args(&args(&["paused.json", "--mock", "nostatus"])).is_err());
        assert!(parse_replay_args(&args(&["paused.json", "--bogus", "x"])).is_err());
    }

    #[tokio::test]
    async fn test_replay_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paused.json");
        std::fs::write(
            &path,
            r#"[
                {"requestId": "1", "request": {"url": "https://example.com/", "method": "GET"}, "resourceType": "Document"},
                {"requestId": "2", "request": {"url": "https://example.com/a.png", "method": "GET"}, "resourceType": "Image"}
            ]"#,
        )
        .unwrap();

        let result = replay(&args(&[path.to_str().unwrap(), "--block", r"\.png$"])).await;
        assert!(result.is_ok());
    }
}
