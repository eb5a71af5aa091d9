//! Query commands.

use super::{http_client, print_json, CommandResult};
use crate::Cli;
use serde_json::Value;

/// Parses a `--param` value as JSON, falling back to a plain string.
pub fn parse_param(raw: &str) -> Result<Value, String> {
    Ok(serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())))
}

/// Runs the sql command.
pub fn sql(cli: &Cli, collection: &str, sql: &str, params: &[Value]) -> CommandResult {
    let client = http_client(cli)?;
    print_json(&client.query(sql, collection, params)?)
}

/// Runs the count command.
pub fn count(cli: &Cli, collection: &str, condition: Option<&str>) -> CommandResult {
    let client = http_client(cli)?;
    println!("{}", client.count(collection, condition)?);
    Ok(())
}

/// Runs the group-by command.
pub fn group_by(cli: &Cli, collection: &str, field: &str) -> CommandResult {
    let client = http_client(cli)?;
    let groups = client.group_by(collection, field)?;

    let width = groups.keys().map(String::len).max().unwrap_or(0);
    for (value, count) in &groups {
        println!("{value:<width$}  {count}");
    }
    Ok(())
}
