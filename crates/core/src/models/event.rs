//! Event records.
//!
//! An event binds a slug that client applications trigger to a template and
//! the integration used to send it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Environment, EventId, IntegrationId, TemplateId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub environment: Option<Environment>,
    #[serde(default)]
    pub template: Option<TemplateId>,
    #[serde(default)]
    pub template_name: Option<String>,
    #[serde(default)]
    pub integration: Option<IntegrationId>,
    #[serde(default)]
    pub integration_name: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create payload (`POST /events/`). The slug is derived server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub template: Option<TemplateId>,
    pub integration: Option<IntegrationId>,
    pub is_active: bool,
}

/// Partial event update (`PATCH /events/{id}/`).
///
/// `template` and `integration` use a nested option so a binding can be
/// cleared explicitly (`Some(None)` serializes as `null`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<Option<TemplateId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integration: Option<Option<IntegrationId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl From<EventInput> for EventPatch {
    fn from(input: EventInput) -> Self {
        Self {
            name: Some(input.name),
            description: Some(input.description),
            template: Some(input.template),
            integration: Some(input.integration),
            is_active: Some(input.is_active),
        }
    }
}

/// Production copy of an event returned by `POST /events/{id}/promote/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotedEvent {
    #[serde(flatten)]
    pub event: Event,
    /// Bindings that could not be resolved in production.
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Test send (`POST /events/{id}/test/`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSendRequest {
    pub recipient: String,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

/// Acknowledgement of a queued test send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSendResult {
    #[serde(default)]
    pub detail: String,
    #[serde(default)]
    pub task_id: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_promoted_event_flattens_warnings() {
        let promoted: PromotedEvent = serde_json::from_value(serde_json::json!({
            "id": 9,
            "name": "Signup",
            "slug": "signup",
            "description": "",
            "environment": "production",
            "template": null,
            "template_name": null,
            "integration": null,
            "integration_name": null,
            "is_active": true,
            "created_at": "2025-03-01T10:00:00Z",
            "updated_at": "2025-03-01T10:00:00Z",
            "warnings": ["Template \"Welcome\" has not been promoted to production yet."]
        }))
        .unwrap();

        assert_eq!(promoted.event.slug, "signup");
        assert_eq!(promoted.event.environment, Some(Environment::Production));
        assert_eq!(promoted.warnings.len(), 1);
    }

    #[test]
    fn test_patch_can_clear_template() {
        let patch = EventPatch {
            template: Some(None),
            ..EventPatch::default()
        };
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            serde_json::json!({"template": null})
        );
    }
}
