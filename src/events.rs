//! Event logging subsystem for meld.
//!
//! Every build appends what it did to `.meld/events/events.ndjson` (one JSON
//! object per line), so a failed overnight build can be diagnosed after the
//! console output is gone.
//!
//! # Event Format
//!
//! Each event is a JSON object with the following fields:
//! - `ts`: RFC3339 timestamp
//! - `action`: The step performed (build_start, combine, backend_attempt, etc.)
//! - `actor`: The owner string (e.g., `user@HOST`)
//! - `target`: Optional target caption for target-specific events
//! - `details`: Freeform object with action-specific details
//!
//! # Usage
//!
//! ```no_run
//! use meld::events::{Event, EventAction, append_event};
//! use meld::context::BuildContext;
//! use serde_json::json;
//!
//! let ctx = BuildContext::resolve()?;
//! let event = Event::new(EventAction::Combine)
//!     .with_details(json!({"tasks": 120, "tools": 118}));
//! append_event(&ctx, &event)?;
//! # Ok::<(), meld::error::MeldError>(())
//! ```

use crate::context::BuildContext;
use crate::error::{MeldError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

/// Actions that can be logged as events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// Working directory initialized
    Init,
    /// A build began
    BuildStart,
    /// A build ended, successfully or not
    BuildFinish,
    /// Declared outputs deleted before a clean build
    Clean,
    /// A target was built directly by the driver
    DirectBuild,
    /// The driver exported a target's action graph
    GraphGenerate,
    /// Action graphs were combined
    Combine,
    /// One attempt of the graph backend finished
    BackendAttempt,
    /// The distributed backend could not connect and is being retried
    ConnectionRetry,
    /// Declared outputs deleted before a retry attempt
    Purge,
    /// A target's outputs were verified and registered
    Reconcile,
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventAction::Init => write!(f, "init"),
            EventAction::BuildStart => write!(f, "build_start"),
            EventAction::BuildFinish => write!(f, "build_finish"),
            EventAction::Clean => write!(f, "clean"),
            EventAction::DirectBuild => write!(f, "direct_build"),
            EventAction::GraphGenerate => write!(f, "graph_generate"),
            EventAction::Combine => write!(f, "combine"),
            EventAction::BackendAttempt => write!(f, "backend_attempt"),
            EventAction::ConnectionRetry => write!(f, "connection_retry"),
            EventAction::Purge => write!(f, "purge"),
            EventAction::Reconcile => write!(f, "reconcile"),
        }
    }
}

/// An event record for the build log.
///
/// Events are serialized as single-line JSON objects and appended to
/// the events.ndjson file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// RFC3339 timestamp when the event occurred.
    pub ts: DateTime<Utc>,

    /// The action that was performed.
    pub action: EventAction,

    /// Who ran the build (e.g., `user@HOST`).
    pub actor: String,

    /// Target caption for target-specific events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    /// Freeform details object with action-specific information.
    pub details: Value,
}

impl Event {
    /// Create a new event with the given action.
    ///
    /// The timestamp is set to the current time, and the actor is
    /// determined from the environment (USER@HOSTNAME).
    pub fn new(action: EventAction) -> Self {
        Self {
            ts: Utc::now(),
            action,
            actor: get_actor_string(),
            target: None,
            details: Value::Object(serde_json::Map::new()),
        }
    }

    /// Set the target caption for this event.
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Set the details object for this event.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Serialize the event to a single-line JSON string.
    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| MeldError::UserError(format!("failed to serialize event to JSON: {}", e)))
    }
}

/// Get the actor string for event metadata.
fn get_actor_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

/// Get the path to the events file.
pub fn events_file_path(ctx: &BuildContext) -> PathBuf {
    ctx.events_file()
}

/// Append an event to the events log.
///
/// The file is created if it doesn't exist. Each append results in one line
/// with a trailing newline.
pub fn append_event(ctx: &BuildContext, event: &Event) -> Result<()> {
    let events_file = events_file_path(ctx);

    let json_line = event.to_ndjson_line()?;

    let events_dir = ctx.events_dir();
    if !events_dir.exists() {
        fs::create_dir_all(&events_dir).map_err(|e| {
            MeldError::UserError(format!(
                "failed to create events directory '{}': {}",
                events_dir.display(),
                e
            ))
        })?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&events_file)
        .map_err(|e| {
            MeldError::UserError(format!(
                "failed to open events file '{}': {}",
                events_file.display(),
                e
            ))
        })?;

    writeln!(file, "{}", json_line).map_err(|e| {
        MeldError::UserError(format!(
            "failed to write event to '{}': {}",
            events_file.display(),
            e
        ))
    })?;

    Ok(())
}

/// Append an event, reporting a failure as a warning instead of an error.
///
/// Used on build paths, where an unwritable log must not change the outcome.
pub fn record_event(ctx: &BuildContext, event: &Event) {
    if let Err(e) = append_event(ctx, event) {
        eprintln!("Warning: failed to log {} event: {}", event.action, e);
    }
}

/// Read every event from the log, oldest first. A missing log reads as empty.
pub fn read_events(ctx: &BuildContext) -> Result<Vec<Event>> {
    let events_file = events_file_path(ctx);
    if !events_file.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(&events_file).map_err(|e| {
        MeldError::UserError(format!(
            "failed to read events file '{}': {}",
            events_file.display(),
            e
        ))
    })?;

    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            serde_json::from_str(line).map_err(|e| {
                MeldError::UserError(format!(
                    "failed to parse event in '{}': {}",
                    events_file.display(),
                    e
                ))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn create_test_context() -> (TempDir, BuildContext) {
        let temp_dir = TempDir::new().unwrap();
        let ctx = BuildContext::at(temp_dir.path());
        (temp_dir, ctx)
    }

    #[test]
    fn test_event_creation() {
        let event = Event::new(EventAction::BuildStart);

        assert_eq!(event.action, EventAction::BuildStart);
        assert!(!event.actor.is_empty());
        assert!(event.target.is_none());
        // Timestamp should be recent (within last minute)
        let age = Utc::now().signed_duration_since(event.ts);
        assert!(age.num_minutes() < 1);
    }

    #[test]
    fn test_event_with_target_and_details() {
        let event = Event::new(EventAction::DirectBuild)
            .with_target("UnrealHeaderTool-Win64-Development")
            .with_details(json!({"exit_code": 0}));

        assert_eq!(
            event.target.as_deref(),
            Some("UnrealHeaderTool-Win64-Development")
        );
        assert_eq!(event.details["exit_code"], 0);
    }

    #[test]
    fn test_event_serialization() {
        let event = Event::new(EventAction::BackendAttempt)
            .with_details(json!({"attempt": 1, "exit_code": 4}));

        let json_line = event.to_ndjson_line().unwrap();

        let parsed: Event = serde_json::from_str(&json_line).unwrap();
        assert_eq!(parsed.action, EventAction::BackendAttempt);
        assert_eq!(parsed.details["attempt"], 1);

        // Should not contain newlines (single line)
        assert!(!json_line.contains('\n'));
    }

    #[test]
    fn test_event_action_serialization() {
        let json_line = Event::new(EventAction::ConnectionRetry)
            .to_ndjson_line()
            .unwrap();
        assert!(json_line.contains("\"connection_retry\""));
        assert_eq!(EventAction::GraphGenerate.to_string(), "graph_generate");
    }

    #[test]
    fn test_event_without_target_omits_field() {
        let json_line = Event::new(EventAction::Combine).to_ndjson_line().unwrap();

        let parsed: Value = serde_json::from_str(&json_line).unwrap();
        assert!(parsed.get("target").is_none());
    }

    #[test]
    fn test_append_event_creates_file() {
        let (_temp_dir, ctx) = create_test_context();
        let events_file = events_file_path(&ctx);
        assert!(!events_file.exists());

        append_event(&ctx, &Event::new(EventAction::Init)).unwrap();

        assert!(events_file.exists());
        let events = read_events(&ctx).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, EventAction::Init);
    }

    #[test]
    fn test_append_event_multiple_lines() {
        let (_temp_dir, ctx) = create_test_context();

        append_event(&ctx, &Event::new(EventAction::BuildStart)).unwrap();
        append_event(
            &ctx,
            &Event::new(EventAction::Reconcile).with_target("Game-Win64-Shipping"),
        )
        .unwrap();

        let content = fs::read_to_string(events_file_path(&ctx)).unwrap();
        assert_eq!(content.lines().count(), 2);

        let events = read_events(&ctx).unwrap();
        assert_eq!(events[1].action, EventAction::Reconcile);
        assert_eq!(events[1].target.as_deref(), Some("Game-Win64-Shipping"));
    }

    #[test]
    fn test_read_events_missing_log_is_empty() {
        let (_temp_dir, ctx) = create_test_context();
        assert!(read_events(&ctx).unwrap().is_empty());
    }
}
