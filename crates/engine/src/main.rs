use std::path::PathBuf;

use room_engine::state::EngineSettings;
use room_engine::{EngineEvent, HostBridge, RoomEngine};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() {
    // stdout carries the bridge protocol; logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "room_engine=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = match parse_settings_arg() {
        Some(path) => match EngineSettings::load_from(&path) {
            Ok(settings) => {
                tracing::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                tracing::error!("Failed to read settings {}: {e}", path.display());
                return;
            }
        },
        None => EngineSettings::load(),
    };

    let (bridge, events) = HostBridge::channel();
    let mut engine = match RoomEngine::new(settings, bridge) {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!("Failed to start engine: {e}");
            return;
        }
    };

    let writer = tokio::spawn(write_events(events));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if !line.trim().is_empty() {
                        engine.handle_line(&line);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::error!("Failed to read stdin: {e}");
                    break;
                }
            },
            Some(completion) = engine.next_completion() => {
                engine.apply_completion(completion);
            }
        }
    }

    tracing::info!("Host closed the bridge, shutting down");
    // Dropping the engine closes the event channel and ends the writer
    drop(engine);
    if let Err(e) = writer.await {
        tracing::error!("Event writer failed: {e}");
    }
}

/// Write each event as one JSON line on stdout.
async fn write_events(mut events: mpsc::UnboundedReceiver<EngineEvent>) {
    let mut stdout = tokio::io::stdout();
    while let Some(event) = events.recv().await {
        let mut line = match serde_json::to_string(&event.to_message()) {
            Ok(line) => line,
            Err(e) => {
                tracing::error!("Failed to encode {}: {e}", event.method());
                continue;
            }
        };
        line.push('\n');
        if let Err(e) = stdout.write_all(line.as_bytes()).await {
            tracing::error!("Failed to write to stdout: {e}");
            break;
        }
        let _ = stdout.flush().await;
    }
}

/// Parse `--settings <path>`
fn parse_settings_arg() -> Option<PathBuf> {
    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;
    while i < args.len() {
        if args[i] == "--settings" && i + 1 < args.len() {
            return Some(PathBuf::from(&args[i + 1]));
        }
        i += 1;
    }
    None
}
