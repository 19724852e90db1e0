//! Status updates sent to the backend once a delivery is resolved

use serde::Serialize;
use serde_json::{Map, Value};

use super::job::Job;
use super::outcome::{JobResult, ProcessedImages, ProcessingOutcome, Terminal};

/// Endpoint for game processing status
pub const PROCESS_COMPLETE_ENDPOINT: &str = "process-complete";
/// Endpoint for processed image paths
pub const IMAGES_ENDPOINT: &str = "images";
/// Endpoint for enriched metadata
pub const METADATA_ENDPOINT: &str = "metadata";

const GAMES: &str = "games";

/// A terminal status update for one backend entity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationRequest {
    /// Collection name in the backend API (e.g. `games`)
    pub entity: String,
    pub entity_id: String,
    /// Last path segment of the update endpoint
    pub endpoint: String,
    pub status: Option<String>,
    pub extra_fields: Map<String, Value>,
}

impl NotificationRequest {
    /// Game processing finished with `status`
    pub fn game_status(game_id: &str, status: &str) -> Self {
        Self {
            entity: GAMES.to_string(),
            entity_id: game_id.to_string(),
            endpoint: PROCESS_COMPLETE_ENDPOINT.to_string(),
            status: Some(status.to_string()),
            extra_fields: Map::new(),
        }
    }

    /// New image locations for a game
    pub fn game_images(game_id: &str, images: &ProcessedImages) -> Self {
        let mut extra_fields = Map::new();
        extra_fields.insert("imageUrl".to_string(), Value::from(images.main.clone()));
        extra_fields.insert(
            "thumbnailUrl".to_string(),
            Value::from(images.thumbnail.clone()),
        );

        Self {
            entity: GAMES.to_string(),
            entity_id: game_id.to_string(),
            endpoint: IMAGES_ENDPOINT.to_string(),
            status: None,
            extra_fields,
        }
    }

    /// Enriched metadata fields for a game
    pub fn game_metadata(game_id: &str, fields: Map<String, Value>) -> Self {
        Self {
            entity: GAMES.to_string(),
            entity_id: game_id.to_string(),
            endpoint: METADATA_ENDPOINT.to_string(),
            status: None,
            extra_fields: fields,
        }
    }

    /// Pick the update to send for a resolved delivery, if any
    pub fn for_terminal(
        job: &Job,
        outcome: &ProcessingOutcome,
        terminal: Terminal,
    ) -> Option<Self> {
        match (job, terminal, outcome) {
            (Job::GameEvent(event), Terminal::Delivered, _) => {
                Some(Self::game_status(&event.game_id, "completed"))
            },
            (Job::GameEvent(event), Terminal::GaveUp, _) => {
                Some(Self::game_status(&event.game_id, "failed"))
            },
            (
                Job::Image(image),
                Terminal::Delivered,
                ProcessingOutcome::Success(JobResult::ImagesProcessed(Some(paths))),
            ) => Some(Self::game_images(&image.game_id, paths)),
            (
                Job::Metadata(metadata),
                Terminal::Delivered,
                ProcessingOutcome::Success(JobResult::MetadataEnriched(enriched)),
            ) => match serde_json::to_value(enriched) {
                Ok(Value::Object(fields)) => Some(Self::game_metadata(&metadata.game_id, fields)),
                _ => None,
            },
            _ => None,
        }
    }

    /// Path segments relative to the backend base URL, unencoded
    pub fn segments(&self) -> [&str; 4] {
        ["api", &self.entity, &self.entity_id, &self.endpoint]
    }

    /// Request path for logs, segments joined unencoded
    pub fn path(&self) -> String {
        format!("/{}", self.segments().join("/"))
    }

    /// JSON body: the status (if any) merged with the extra fields
    pub fn body(&self) -> Value {
        let mut body = self.extra_fields.clone();
        if let Some(status) = &self.status {
            body.insert("status".to_string(), Value::from(status.clone()));
        }
        Value::Object(body)
    }
}
