use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use serde_json::{Value, json};
use tokio::{sync::mpsc::UnboundedReceiver, time::timeout};

use sketch_mesh::{PeerSession, SessionEvent, Switchboard, cli::Cli};

const EVENT_TIMEOUT: Duration = Duration::from_secs(2);

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let switchboard = Switchboard::new();

    let (host, mut host_events) =
        PeerSession::initialize(switchboard.clone(), cli.host.as_str()).await;
    let room_id = host.create_room().await?;
    println!("*** room {room_id} hosted by {}", cli.host);
    print_lobby(&mut host_events, 1).await?;

    let mut guests = Vec::new();
    for name in &cli.guests {
        let (guest, guest_events) =
            PeerSession::initialize(switchboard.clone(), name.as_str()).await;
        guest
            .join_room(room_id.clone())
            .await
            .with_context(|| format!("{name} failed to join room {room_id}"))?;
        guests.push((name.clone(), guest, guest_events));

        // The host republishes the roster once per arrival.
        print_lobby(&mut host_events, guests.len() + 1).await?;
    }

    // Every guest converges on the full roster before the game starts.
    for (name, _, events) in &mut guests {
        wait_for_lobby(events, cli.guests.len() + 1)
            .await
            .with_context(|| format!("{name} never converged on the lobby"))?;
    }

    host.start_game()?;
    match next_event(&mut host_events).await? {
        SessionEvent::GameStarted { players } => {
            println!("*** game started with {} players", players.len());
        }
        other => return Err(anyhow!("host expected game start, got {other:?}")),
    }
    for (name, _, events) in &mut guests {
        match next_event(events).await? {
            SessionEvent::GameStarted { .. } => {}
            other => return Err(anyhow!("{name} expected game start, got {other:?}")),
        }
    }

    // One stroke: incremental path data, then the end-of-path marker.
    host.send_update(json!({
        "pathData": "M 10 10 L 42 42",
        "color": "#000000",
        "width": 5,
    }))?;
    for (name, _, events) in &mut guests {
        let payload = next_gameplay(events).await?;
        anyhow::ensure!(
            payload.get("type") == Some(&json!("DRAWING_UPDATE")),
            "{name} expected a DRAWING_UPDATE, got {payload}"
        );
        println!("*** {name} received a DRAWING_UPDATE");
    }

    host.send_update(json!({
        "type": "PATH_END",
        "color": "#000000",
        "width": 5,
    }))?;
    for (name, _, events) in &mut guests {
        let payload = next_gameplay(events).await?;
        anyhow::ensure!(
            payload.get("type") == Some(&json!("PATH_END")),
            "{name} expected a PATH_END, got {payload}"
        );
        println!("*** {name} saw the stroke end");
    }

    println!("*** demo complete");
    Ok(())
}

async fn next_event(events: &mut UnboundedReceiver<SessionEvent>) -> Result<SessionEvent> {
    match timeout(EVENT_TIMEOUT, events.recv()).await {
        Ok(Some(event)) => Ok(event),
        Ok(None) => Err(anyhow!("session event stream ended")),
        Err(_) => Err(anyhow!("timed out waiting for a session event")),
    }
}

async fn next_gameplay(events: &mut UnboundedReceiver<SessionEvent>) -> Result<Value> {
    match next_event(events).await? {
        SessionEvent::PeerUpdate { payload } => Ok(payload),
        other => Err(anyhow!("expected a gameplay update, got {other:?}")),
    }
}

/// Waits for the next roster of the given size on the host side and prints
/// it in insertion order.
async fn print_lobby(
    events: &mut UnboundedReceiver<SessionEvent>,
    expected: usize,
) -> Result<()> {
    let players = wait_for_lobby(events, expected).await?;
    println!("*** lobby: {}", players.join(", "));
    Ok(())
}

/// Skips intermediate snapshots until one with `expected` entries arrives.
async fn wait_for_lobby(
    events: &mut UnboundedReceiver<SessionEvent>,
    expected: usize,
) -> Result<Vec<String>> {
    loop {
        if let SessionEvent::LobbyUpdated { players } = next_event(events).await? {
            if players.len() == expected {
                return Ok(players.into_iter().map(|(_, info)| info.name).collect());
            }
        }
    }
}
