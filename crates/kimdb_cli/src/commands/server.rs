//! Server status commands.

use super::{http_client, print_json, CommandResult};
use crate::Cli;

/// Runs the health command.
pub fn health(cli: &Cli) -> CommandResult {
    let client = http_client(cli)?;
    print_json(&client.health()?)
}

/// Runs the metrics command.
pub fn metrics(cli: &Cli) -> CommandResult {
    let client = http_client(cli)?;
    print_json(&client.metrics()?)
}

/// Runs the collections command.
pub fn collections(cli: &Cli) -> CommandResult {
    let client = http_client(cli)?;
    let names = client.list_collections()?;
    if names.is_empty() {
        println!("No collections");
    }
    for name in names {
        println!("{name}");
    }
    Ok(())
}
