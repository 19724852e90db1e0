//! Job models decoded from inbound payloads
//!
//! Each service accepts a closed set of job kinds. Decoding happens once at
//! ingestion: the payload object is inspected, required fields are checked
//! and the result is a [`Job`] variant the processor can match on.

use serde_json::{Map, Value};
use std::fmt;

use super::error::{ValidationError, ValidationErrorKind, ValidationResult};
use super::service::ServiceKind;

/// Lifecycle action carried by a game event
///
/// Actions outside the known set are kept verbatim. They need no work but
/// the game still gets its completion update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameAction {
    Create,
    Update,
    Delete,
    Process,
    Other(String),
}

impl GameAction {
    /// Parse action from string
    pub fn parse(s: &str) -> Self {
        match s {
            "create" => GameAction::Create,
            "update" => GameAction::Update,
            "delete" => GameAction::Delete,
            "process" => GameAction::Process,
            other => GameAction::Other(other.to_string()),
        }
    }

    /// Convert to string representation
    pub fn as_str(&self) -> &str {
        match self {
            GameAction::Create => "create",
            GameAction::Update => "update",
            GameAction::Delete => "delete",
            GameAction::Process => "process",
            GameAction::Other(action) => action,
        }
    }
}

impl fmt::Display for GameAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resize a game's cover image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageJob {
    pub game_id: String,
    pub image_url: Option<String>,
}

impl ImageJob {
    /// The URL to download, unless the game only has a placeholder
    pub fn source_url(&self) -> Option<&str> {
        self.image_url
            .as_deref()
            .filter(|url| !url.is_empty() && !url.starts_with("/placeholder.svg"))
    }
}

/// React to a game lifecycle event
#[derive(Debug, Clone, PartialEq)]
pub struct GameEventJob {
    pub game_id: String,
    pub action: GameAction,
    pub game_data: Value,
}

/// Free-form message published on the events queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomJob {
    pub message: String,
    pub timestamp: Option<String>,
}

/// Generate enriched metadata for a game
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataJob {
    pub game_id: String,
    pub title: String,
    pub developer: Option<String>,
}

/// A decoded unit of work
#[derive(Debug, Clone, PartialEq)]
pub enum Job {
    Image(ImageJob),
    GameEvent(GameEventJob),
    Custom(CustomJob),
    Metadata(MetadataJob),
}

impl Job {
    /// Decode the payload of a message received by `service`
    pub fn decode(service: ServiceKind, payload: &Map<String, Value>) -> ValidationResult<Self> {
        match service {
            ServiceKind::ImageProcessor => Ok(Job::Image(ImageJob {
                game_id: required_id(payload, "gameId")?,
                image_url: optional_str(payload, "imageUrl")?,
            })),
            ServiceKind::MessageConsumer => {
                if payload.get("type").and_then(Value::as_str) == Some("custom") {
                    return Ok(Job::Custom(CustomJob {
                        message: required_message(payload)?,
                        timestamp: optional_str(payload, "timestamp")?,
                    }));
                }

                let game_id = required_id(payload, "gameId")?;
                let action = required_str(payload, "action")?;

                Ok(Job::GameEvent(GameEventJob {
                    game_id,
                    action: GameAction::parse(&action),
                    game_data: payload
                        .get("gameData")
                        .cloned()
                        .unwrap_or_else(|| Value::Object(Map::new())),
                }))
            },
            ServiceKind::MetadataEnricher => Ok(Job::Metadata(MetadataJob {
                game_id: required_id(payload, "gameId")?,
                title: required_str(payload, "title")?,
                developer: optional_str(payload, "developer")?,
            })),
        }
    }

    /// Short name of the job kind, for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Job::Image(_) => "image",
            Job::GameEvent(_) => "game_event",
            Job::Custom(_) => "custom",
            Job::Metadata(_) => "metadata",
        }
    }

    /// Identifier of the backend entity this job is about
    pub fn entity_id(&self) -> Option<&str> {
        match self {
            Job::Image(job) => Some(&job.game_id),
            Job::GameEvent(job) => Some(&job.game_id),
            Job::Metadata(job) => Some(&job.game_id),
            Job::Custom(_) => None,
        }
    }
}

fn required_str(payload: &Map<String, Value>, field: &str) -> ValidationResult<String> {
    match payload.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::String(_)) | Some(Value::Null) | None => Err(ValidationError::required(field)),
        Some(_) => Err(ValidationError::new(ValidationErrorKind::InvalidType, field)),
    }
}

/// Entity ids are accepted as strings or integers
fn required_id(payload: &Map<String, Value>, field: &str) -> ValidationResult<String> {
    match payload.get(field) {
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => required_str(payload, field),
    }
}

fn optional_str(payload: &Map<String, Value>, field: &str) -> ValidationResult<Option<String>> {
    match payload.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ValidationError::new(ValidationErrorKind::InvalidType, field)),
    }
}

/// Custom messages may carry any JSON value as their message
fn required_message(payload: &Map<String, Value>) -> ValidationResult<String> {
    match payload.get("message") {
        None | Some(Value::Null) => Err(ValidationError::required("message")),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Ok(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_decode_game_event() {
        let payload = object(json!({
            "gameId": "g1",
            "action": "create",
            "gameData": {"title": "Tetris"}
        }));

        let job = Job::decode(ServiceKind::MessageConsumer, &payload).unwrap();
        match job {
            Job::GameEvent(event) => {
                assert_eq!(event.game_id, "g1");
                assert_eq!(event.action, GameAction::Create);
                assert_eq!(event.game_data["title"], "Tetris");
            },
            other => panic!("unexpected job: {:?}", other),
        }
    }

    #[test]
    fn test_decode_game_event_defaults_game_data() {
        let payload = object(json!({"gameId": 42, "action": "delete"}));
        let job = Job::decode(ServiceKind::MessageConsumer, &payload).unwrap();
        assert_eq!(job.entity_id(), Some("42"));
        if let Job::GameEvent(event) = job {
            assert_eq!(event.game_data, json!({}));
        }
    }

    #[test]
    fn test_decode_game_event_missing_fields() {
        let missing_id = object(json!({"action": "create"}));
        let err = Job::decode(ServiceKind::MessageConsumer, &missing_id).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::RequiredField);
        assert_eq!(err.field, "gameId");

        let empty_action = object(json!({"gameId": "g1", "action": ""}));
        let err = Job::decode(ServiceKind::MessageConsumer, &empty_action).unwrap_err();
        assert_eq!(err.field, "action");
    }

    #[test]
    fn test_decode_unknown_action_is_kept() {
        let payload = object(json!({"gameId": "g1", "action": "archive"}));
        match Job::decode(ServiceKind::MessageConsumer, &payload).unwrap() {
            Job::GameEvent(event) => {
                assert_eq!(event.action, GameAction::Other("archive".to_string()));
                assert_eq!(event.action.as_str(), "archive");
            },
            other => panic!("unexpected job: {:?}", other),
        }
    }

    #[test]
    fn test_decode_custom_message() {
        let payload = object(json!({"type": "custom", "message": "hello"}));
        let job = Job::decode(ServiceKind::MessageConsumer, &payload).unwrap();
        assert_eq!(
            job,
            Job::Custom(CustomJob {
                message: "hello".to_string(),
                timestamp: None
            })
        );
        assert_eq!(job.entity_id(), None);

        let missing = object(json!({"type": "custom"}));
        assert!(Job::decode(ServiceKind::MessageConsumer, &missing).is_err());
    }

    #[test]
    fn test_decode_image_job() {
        let payload = object(json!({"gameId": "g1", "imageUrl": "/placeholder.svg?h=200"}));
        let job = Job::decode(ServiceKind::ImageProcessor, &payload).unwrap();
        match job {
            Job::Image(image) => assert_eq!(image.source_url(), None),
            other => panic!("unexpected job: {:?}", other),
        }

        let payload = object(json!({"gameId": "g1", "imageUrl": "http://cdn/cover.png"}));
        if let Job::Image(image) = Job::decode(ServiceKind::ImageProcessor, &payload).unwrap() {
            assert_eq!(image.source_url(), Some("http://cdn/cover.png"));
        }
    }

    #[test]
    fn test_decode_metadata_job() {
        let payload = object(json!({"gameId": "g7", "title": "Doom", "developer": "id"}));
        let job = Job::decode(ServiceKind::MetadataEnricher, &payload).unwrap();
        assert_eq!(job.kind(), "metadata");

        let missing_title = object(json!({"gameId": "g7"}));
        let err = Job::decode(ServiceKind::MetadataEnricher, &missing_title).unwrap_err();
        assert_eq!(err.field, "title");
    }

    #[test]
    fn test_wrong_type_is_rejected() {
        let payload = object(json!({"gameId": "g1", "imageUrl": 12}));
        let err = Job::decode(ServiceKind::ImageProcessor, &payload).unwrap_err();
        assert_eq!(err.kind, ValidationErrorKind::InvalidType);
    }
}
