//! CLI command implementations.

pub mod documents;
pub mod query;
pub mod server;
pub mod watch;

use crate::Cli;
use kimdb_client::{ClientConfig, ClientResult, KimDbClient, RetryConfig};
use serde_json::Value;
use std::time::Duration;

/// Error type returned by every command.
pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Builds an HTTP client from the global flags.
pub fn http_client(cli: &Cli) -> ClientResult<KimDbClient> {
    let mut config = ClientConfig::new(&cli.url)
        .with_timeout(Duration::from_secs(cli.timeout))
        .with_retry(RetryConfig::new(cli.retries));
    if let Some(token) = &cli.token {
        config = config.with_token(token);
    }
    if let Some(api_key) = &cli.api_key {
        config = config.with_api_key(api_key);
    }
    KimDbClient::new(config)
}

/// Prints a JSON value, pretty-printed.
pub fn print_json(value: &Value) -> CommandResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
