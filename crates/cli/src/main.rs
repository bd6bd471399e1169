//! `wdsession` CLI entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Load configuration**: merge flags, environment, and the optional
//!    TOML file into a [`config::CliConfig`]; invalid configuration fails
//!    before any network activity.
//! 2. **Wire observability**: install `tracing-subscriber` (text or JSON on
//!    stderr) and, when an OTLP endpoint is configured, an OpenTelemetry
//!    layer. All spans emitted by `session` flow through it.
//! 3. **Construct infrastructure**: build an [`http_transport::HttpTransport`]
//!    with the configured timeout.
//! 4. **Negotiate**: open one session and print it to stdout as JSON.

mod config;
mod observability;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use http_transport::HttpTransport;
use serde::Serialize;
use session::Timestamp;
use tracing::error;

use crate::config::{Args, CliConfig};

/// What gets printed on success.
#[derive(Debug, Serialize)]
struct SessionReport<'a> {
    session_id: &'a str,
    session_url: &'a str,
    has_status: bool,
    opened_at: Timestamp,
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match CliConfig::load(Args::parse()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err:#}");
            return ExitCode::from(2);
        }
    };

    let telemetry = match observability::init(&config) {
        Ok(telemetry) => telemetry,
        Err(err) => {
            eprintln!("error: {err:#}");
            return ExitCode::from(2);
        }
    };

    let result = run(&config).await;
    let code = match &result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %format!("{err:#}"), "Session negotiation failed");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    };

    telemetry.shutdown();
    code
}

async fn run(config: &CliConfig) -> Result<()> {
    let transport =
        HttpTransport::with_timeout(config.timeout).context("Failed to build HTTP client")?;

    let (session, has_status) =
        session::connect_with(&config.server_url, Some(&config.capabilities), transport)
            .await
            .with_context(|| format!("Failed to open a session at {}", config.server_url))?;

    let report = SessionReport {
        session_id: session.id().as_str(),
        session_url: session.url().as_str(),
        has_status,
        opened_at: session.opened_at(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
