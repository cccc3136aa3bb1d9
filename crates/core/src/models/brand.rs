//! Reusable brand components (headers, footers, logos) for the builder.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{BrandCategory, BrandComponentId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandComponent {
    pub id: BrandComponentId,
    pub name: String,
    #[serde(default)]
    pub category: BrandCategory,
    #[serde(default)]
    pub category_display: String,
    pub html_content: String,
    #[serde(default)]
    pub thumbnail_url: String,
    #[serde(default)]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BrandComponent {
    /// Server label when provided, local label otherwise.
    #[must_use]
    pub fn category_label(&self) -> &str {
        if self.category_display.is_empty() {
            self.category.label()
        } else {
            &self.category_display
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandComponentInput {
    pub name: String,
    pub category: BrandCategory,
    pub html_content: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub thumbnail_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandComponentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<BrandCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl From<BrandComponentInput> for BrandComponentPatch {
    fn from(input: BrandComponentInput) -> Self {
        Self {
            name: Some(input.name),
            category: Some(input.category),
            html_content: Some(input.html_content),
            thumbnail_url: Some(input.thumbnail_url),
            is_active: None,
        }
    }
}
