//! Amazon SES integration records.
//!
//! AWS credentials are write-only: they are sent on create and update but
//! never returned. The create payload lives in the client crate so the
//! secret key can be held as a `SecretString`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Environment, IntegrationId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SesIntegration {
    pub id: IntegrationId,
    pub name: String,
    #[serde(default)]
    pub environment: Option<Environment>,
    pub region: String,
    pub sender_email: String,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update of the non-secret fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// Result of `GET /integrations/{id}/check_verification/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationStatus {
    pub is_verified: bool,
}

/// Result of `POST /integrations/{id}/test_connection/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionTest {
    pub success: bool,
    #[serde(default)]
    pub detail: Option<String>,
}
