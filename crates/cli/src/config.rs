//! Command-line and file configuration for `wdsession`.
//!
//! Priority, highest first: command-line flags, environment variables, the
//! TOML file named by `--config`, built-in defaults.
//!
//! ```toml
//! server_url = "http://localhost:4444/wd/hub"
//! timeout_secs = 10
//! log_format = "json"
//!
//! [capabilities]
//! browserName = "firefox"
//! acceptInsecureCerts = true
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use serde_json::Value;
use session::Capabilities;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Parser)]
#[command(
    name = "wdsession",
    version,
    about = "Open a WebDriver session and print its address"
)]
pub struct Args {
    /// Base address of the WebDriver remote end, e.g. http://localhost:4444/wd/hub
    #[arg(long, env = "WDSESSION_SERVER_URL")]
    pub server_url: Option<String>,

    /// TOML configuration file
    #[arg(long, env = "WDSESSION_CONFIG")]
    pub config: Option<PathBuf>,

    /// JSON file holding a desired-capabilities object
    #[arg(long)]
    pub capabilities_file: Option<PathBuf>,

    /// Desired capability as KEY=VALUE; VALUE is parsed as JSON, else taken as a string
    #[arg(long = "capability", value_name = "KEY=VALUE")]
    pub capabilities: Vec<String>,

    /// Transport timeout in seconds
    #[arg(long, env = "WDSESSION_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Log filter directive (overrides RUST_LOG), e.g. "debug" or "session=trace"
    #[arg(long, env = "WDSESSION_LOG_LEVEL")]
    pub log_level: Option<String>,

    #[arg(long, value_enum, env = "WDSESSION_LOG_FORMAT")]
    pub log_format: Option<LogFormat>,

    /// OTLP gRPC endpoint for trace export, e.g. http://localhost:4317
    #[arg(long, env = "WDSESSION_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Shape of the `--config` TOML file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    server_url: Option<String>,
    timeout_secs: Option<u64>,
    log_level: Option<String>,
    log_format: Option<LogFormat>,
    otlp_endpoint: Option<String>,
    #[serde(default)]
    capabilities: toml::Table,
}

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct CliConfig {
    pub server_url: String,
    pub capabilities: Capabilities,
    pub timeout: Duration,
    pub log_level: Option<String>,
    pub log_format: LogFormat,
    pub otlp_endpoint: Option<String>,
}

impl CliConfig {
    /// Reads whatever files `args` names and merges everything into one config.
    pub fn load(args: Args) -> Result<Self> {
        let file = match &args.config {
            Some(path) => Some(read_to_string(path)?),
            None => None,
        };
        let capabilities_json = match &args.capabilities_file {
            Some(path) => Some(read_to_string(path)?),
            None => None,
        };
        Self::from_sources(args, file.as_deref(), capabilities_json.as_deref())
    }

    fn from_sources(
        args: Args,
        config_toml: Option<&str>,
        capabilities_json: Option<&str>,
    ) -> Result<Self> {
        let file: ConfigFile = match config_toml {
            Some(text) => toml::from_str(text).context("Invalid configuration file")?,
            None => ConfigFile::default(),
        };

        let server_url = args
            .server_url
            .or(file.server_url)
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                anyhow!("No server URL: pass --server-url, set WDSESSION_SERVER_URL, or set server_url in the config file")
            })?;

        let mut capabilities = table_to_json("capabilities", file.capabilities)?;

        if let Some(text) = capabilities_json {
            match serde_json::from_str::<Value>(text).context("Capabilities file is not valid JSON")? {
                Value::Object(map) => capabilities.extend(map),
                _ => bail!("Capabilities file must contain a JSON object"),
            }
        }

        for pair in &args.capabilities {
            let (key, value) = parse_capability(pair)?;
            capabilities.insert(key, value);
        }

        Ok(Self {
            server_url,
            capabilities,
            timeout: Duration::from_secs(
                args.timeout_secs
                    .or(file.timeout_secs)
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
            log_level: args.log_level.or(file.log_level),
            log_format: args.log_format.or(file.log_format).unwrap_or_default(),
            otlp_endpoint: args.otlp_endpoint.or(file.otlp_endpoint),
        })
    }
}

fn read_to_string(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Converts a TOML table to a JSON object. Datetimes become their TOML
/// (RFC 3339) string form; NaN and infinite floats have no JSON encoding and
/// are rejected.
fn table_to_json(path: &str, table: toml::Table) -> Result<Capabilities> {
    table
        .into_iter()
        .map(|(key, value)| {
            let value = toml_to_json(&format!("{path}.{key}"), value)?;
            Ok((key, value))
        })
        .collect()
}

fn toml_to_json(path: &str, value: toml::Value) -> Result<Value> {
    Ok(match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .ok_or_else(|| anyhow!("'{path}' is {f}, which has no JSON representation"))?,
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(
            items
                .into_iter()
                .enumerate()
                .map(|(i, item)| toml_to_json(&format!("{path}[{i}]"), item))
                .collect::<Result<_>>()?,
        ),
        toml::Value::Table(table) => Value::Object(table_to_json(path, table)?),
    })
}

/// Splits `KEY=VALUE`. The value is parsed as JSON when it can be
/// (`true`, `5`, `{"a":1}`) and otherwise kept as a plain string.
fn parse_capability(pair: &str) -> Result<(String, Value)> {
    let (key, raw) = pair
        .split_once('=')
        .ok_or_else(|| anyhow!("Capability '{pair}' is not of the form KEY=VALUE"))?;
    let key = key.trim();
    if key.is_empty() {
        bail!("Capability '{pair}' has an empty key");
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_owned()));
    Ok((key.to_owned(), value))
}
