//! Game lifecycle events

use std::time::Duration;
use tracing::info;

use super::Latency;
use crate::error::Result;
use crate::models::{GameAction, GameEventJob};

/// Simulated work for each action
pub fn work_duration(action: &GameAction) -> Duration {
    match action {
        GameAction::Create | GameAction::Update => Duration::from_secs(1),
        GameAction::Delete => Duration::from_millis(500),
        GameAction::Process => Duration::from_secs(2),
        GameAction::Other(_) => Duration::ZERO,
    }
}

/// Handle a game event
pub async fn handle(job: &GameEventJob, latency: &Latency) -> Result<()> {
    let title = job
        .game_data
        .get("title")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown");

    match &job.action {
        GameAction::Create => info!(game_id = %job.game_id, title, "Processing new game"),
        GameAction::Update => info!(game_id = %job.game_id, title, "Processing game update"),
        GameAction::Delete => info!(game_id = %job.game_id, "Processing game deletion"),
        GameAction::Process => info!(game_id = %job.game_id, title, "Running game processing"),
        GameAction::Other(action) => {
            info!(game_id = %job.game_id, action = %action, "No work for action")
        },
    }

    latency.pause(work_duration(&job.action)).await;

    info!(game_id = %job.game_id, action = %job.action, "Game event handled");
    Ok(())
}
