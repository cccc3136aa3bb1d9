//! Email template records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::placeholder::Placeholder;
use crate::types::{Environment, TemplateId};

/// An email template.
///
/// List responses omit `html_content` and `design_json`; both default to
/// empty when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailTemplate {
    pub id: TemplateId,
    pub name: String,
    #[serde(default)]
    pub environment: Option<Environment>,
    pub subject: String,
    #[serde(default)]
    pub html_content: String,
    /// Editor project data. `None` for templates created from raw HTML.
    #[serde(default)]
    pub design_json: Option<serde_json::Value>,
    #[serde(default)]
    pub placeholders: Vec<Placeholder>,
    #[serde(default)]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create or fully replace a template's content (builder save).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateInput {
    pub name: String,
    pub subject: String,
    pub html_content: String,
    pub design_json: Option<serde_json::Value>,
}

/// Partial template update (`PATCH /templates/{id}/`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplatePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub design_json: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl From<TemplateInput> for TemplatePatch {
    fn from(input: TemplateInput) -> Self {
        Self {
            name: Some(input.name),
            subject: Some(input.subject),
            html_content: Some(input.html_content),
            design_json: input.design_json,
            is_active: None,
        }
    }
}

/// Raw HTML upload (`POST /templates/upload-html/`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadHtml {
    pub name: String,
    pub subject: String,
    pub html_content: String,
}

/// Server-side render of a template with a placeholder context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplatePreview {
    pub subject: String,
    pub html: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_list_item_without_content() {
        let template: EmailTemplate = serde_json::from_value(serde_json::json!({
            "id": 4,
            "name": "Welcome",
            "environment": "sandbox",
            "subject": "Hi {{name}}",
            "placeholders": [{"name": "name", "default_value": "there"}],
            "is_active": true,
            "created_at": "2025-03-01T10:00:00Z",
            "updated_at": "2025-03-01T10:00:00Z"
        }))
        .unwrap();

        assert_eq!(template.environment, Some(Environment::Sandbox));
        assert!(template.html_content.is_empty());
        assert!(template.design_json.is_none());
        assert_eq!(template.placeholders.len(), 1);
    }

    #[test]
    fn test_input_into_patch_keeps_null_design() {
        let patch = TemplatePatch::from(TemplateInput {
            name: "Receipt".to_string(),
            subject: "Your receipt".to_string(),
            html_content: "<p>Thanks</p>".to_string(),
            design_json: None,
        });
        let value = serde_json::to_value(&patch).unwrap();
        assert_eq!(value["name"], "Receipt");
        assert!(value.get("design_json").is_none());
    }
}
