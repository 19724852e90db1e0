//! Handles game lifecycle events and custom messages from the `game_events` queue

use queue_workers::{Result, ServiceKind};

#[tokio::main]
async fn main() -> Result<()> {
    queue_workers::run(ServiceKind::MessageConsumer).await
}
