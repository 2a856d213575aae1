//! # Local Party Example
//!
//! Plays one full round between two players sharing an in-memory store:
//!
//! 1. The host creates a room and a guest joins it by code
//! 2. The host starts the round
//! 3. A caller reads out words in random order; both players mark them
//! 4. The first completed line wins and everyone sees the same winner
//! 5. The host resets the room for another round
//!
//! ## Running
//!
//! ```sh
//! cargo run --example local_party
//!
//! # See every store write and snapshot:
//! RUST_LOG=debug cargo run --example local_party
//! ```

use std::sync::Arc;

use bingo_room_client::{
    BingoConfig, MarkOutcome, MemoryKeyValueStore, MemoryStore, RoomEvent, RoomStatus,
    RoomSyncController, WordPool,
};
use rand::seq::SliceRandom;

type Controller = RoomSyncController<MemoryStore, MemoryKeyValueStore>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Logging ─────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // ── Setup ───────────────────────────────────────────────────────
    // Clones of one store behave like two devices on one database.
    let store = Arc::new(MemoryStore::new());
    let (mut host, mut host_events) =
        RoomSyncController::new(Arc::clone(&store), MemoryKeyValueStore::new(), BingoConfig::default());
    let (mut guest, mut guest_events) =
        RoomSyncController::new(Arc::clone(&store), MemoryKeyValueStore::new(), BingoConfig::default());

    host.add_custom_word("Someone cries at the toast")?;

    let code = host.create("Hana").await?;
    tracing::info!("Room {code} created");
    guest.join("Gus", &code).await?;
    tracing::info!("Gus joined {code}");

    host.start().await?;
    wait_until_active(&mut host_events).await;
    wait_until_active(&mut guest_events).await;

    // ── Calling words ───────────────────────────────────────────────
    let mut calls = WordPool::new().words();
    calls.extend(host.word_pool().custom().iter().cloned());
    calls.shuffle(&mut rand::rng());

    'calling: for word in &calls {
        tracing::info!("Caller: {word}");
        for player in [&mut host, &mut guest] {
            if mark_word(player, word).await? == Some(MarkOutcome::Bingo) {
                tracing::info!("{} shouts BINGO!", player.last_name());
                break 'calling;
            }
        }
    }

    // ── Result ──────────────────────────────────────────────────────
    // The winner's counter is bumped once the declaration has settled.
    let mut winner_id = None;
    while let Some(event) = guest_events.recv().await {
        match event {
            RoomEvent::WinnerDeclared { winner, .. } => {
                tracing::info!("Everyone sees the winner: {}", winner.name);
                winner_id = Some(winner.player_id);
            }
            RoomEvent::Snapshot(view)
                if view
                    .players
                    .iter()
                    .any(|t| winner_id.as_ref() == Some(&t.player_id) && t.wins > 0) =>
            {
                break;
            }
            RoomEvent::RoomClosed { .. } => break,
            _ => {}
        }
    }
    if let Some(view) = guest.projection().await {
        tracing::info!("Round time {} | {}", view.timer_text, view.helper_text);
        for tag in &view.players {
            tracing::info!("  {} ({} wins){}", tag.name, tag.wins, if tag.is_host { " [host]" } else { "" });
        }
    }

    host.reset().await?;
    tracing::info!("Room reset; boards reshuffled");

    guest.leave().await?;
    host.leave().await?;
    Ok(())
}

/// Mark `word` on `player`'s board if it is there.
async fn mark_word(
    player: &mut Controller,
    word: &str,
) -> Result<Option<MarkOutcome>, bingo_room_client::BingoError> {
    let Some(room) = player.current_room().await else {
        return Ok(None);
    };
    let Some(me) = room.player(player.player_id()) else {
        return Ok(None);
    };
    match me.board.iter().position(|w| w == word) {
        Some(index) => player.mark(index).await.map(Some),
        None => Ok(None),
    }
}

async fn wait_until_active(events: &mut tokio::sync::mpsc::Receiver<RoomEvent>) {
    while let Some(event) = events.recv().await {
        if let RoomEvent::Snapshot(view) = event {
            if view.status == RoomStatus::Active {
                return;
            }
        }
    }
}
