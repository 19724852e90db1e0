//! The three worker services and their fixed per-service settings

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Which worker process is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceKind {
    /// Downloads, resizes and stores game cover images
    ImageProcessor,
    /// Handles game lifecycle events and custom messages
    MessageConsumer,
    /// Generates enriched metadata for games
    MetadataEnricher,
}

impl ServiceKind {
    /// Process name, used in logs and consumer tags
    pub fn name(&self) -> &'static str {
        match self {
            ServiceKind::ImageProcessor => "image-processor",
            ServiceKind::MessageConsumer => "message-consumer",
            ServiceKind::MetadataEnricher => "metadata-enricher",
        }
    }

    /// Durable queue this service consumes from
    pub fn queue_name(&self) -> &'static str {
        match self {
            ServiceKind::ImageProcessor => "image_processing",
            ServiceKind::MessageConsumer => "game_events",
            ServiceKind::MetadataEnricher => "metadata_enrichment",
        }
    }

    /// Startup connection attempts when not configured
    pub fn default_connect_attempts(&self) -> u32 {
        match self {
            ServiceKind::MessageConsumer => 30,
            ServiceKind::ImageProcessor | ServiceKind::MetadataEnricher => 10,
        }
    }

    /// Backend request timeout when not configured
    pub fn default_backend_timeout(&self) -> Duration {
        match self {
            ServiceKind::MessageConsumer => Duration::from_secs(5),
            ServiceKind::ImageProcessor | ServiceKind::MetadataEnricher => {
                Duration::from_secs(10)
            },
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
