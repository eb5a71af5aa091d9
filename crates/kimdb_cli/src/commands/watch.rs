//! Watch command implementation.

use super::CommandResult;
use crate::Cli;
use kimdb_realtime::{Event, EventKind, RealtimeClient, RealtimeConfig};
use std::sync::mpsc;

/// Event kinds printed by `watch`.
const WATCHED: [EventKind; 6] = [
    EventKind::Subscribed,
    EventKind::DocSynced,
    EventKind::DocUpdated,
    EventKind::PresenceChanged,
    EventKind::Pong,
    EventKind::Error,
];

/// Derives the realtime endpoint from the HTTP base URL.
pub fn realtime_url(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    };
    format!("{base}/ws")
}

/// Runs the watch command.
pub fn run(cli: &Cli, collection: &str, doc: Option<&str>) -> CommandResult {
    let url = cli
        .ws_url
        .clone()
        .unwrap_or_else(|| realtime_url(&cli.url));
    let client = RealtimeClient::new(RealtimeConfig::new(url))?;

    for kind in WATCHED {
        client.on(kind, print_event);
    }
    let (closed_tx, closed_rx) = mpsc::channel();
    client.on(EventKind::Disconnected, move |_| {
        let _ = closed_tx.send(());
    });

    client.connect()?;
    match doc {
        Some(doc_id) => client.subscribe_document(collection, doc_id)?,
        None => client.subscribe(collection)?,
    }
    tracing::info!(node_id = client.node_id(), collection, "watching");

    // blocks until the server closes the channel
    let _ = closed_rx.recv();
    Ok(())
}

fn print_event(event: &Event) {
    println!("{} {}", event.kind(), event.payload());
}
