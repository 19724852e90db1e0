//! Generates enriched game metadata from the `metadata_enrichment` queue

use queue_workers::{Result, ServiceKind};

#[tokio::main]
async fn main() -> Result<()> {
    queue_workers::run(ServiceKind::MetadataEnricher).await
}
