//! Document read commands.

use super::{http_client, print_json, CommandResult};
use crate::Cli;
use kimdb_client::DocumentQuery;

/// Runs the list command.
pub fn list(
    cli: &Cli,
    collection: &str,
    limit: Option<u64>,
    skip: Option<u64>,
    sort: Option<&str>,
) -> CommandResult {
    let mut query = DocumentQuery::new();
    if let Some(limit) = limit {
        query = query.with_limit(limit);
    }
    if let Some(skip) = skip {
        query = query.with_skip(skip);
    }
    if let Some(sort) = sort {
        query = query.with_sort(sort);
    }

    let client = http_client(cli)?;
    print_json(&client.get_collection(collection, Some(&query))?)
}

/// Runs the get command.
pub fn get(cli: &Cli, collection: &str, id: &str) -> CommandResult {
    let client = http_client(cli)?;
    let document = client.get_document(collection, id)?;
    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}
