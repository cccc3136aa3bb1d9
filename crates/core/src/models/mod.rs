//! Resource records exchanged with the Xyno REST API.
//!
//! These mirror the JSON bodies the API returns. They are server-owned: the
//! dashboard fetches them fresh for every view and never caches them across
//! navigations.

pub mod api_key;
pub mod brand;
pub mod event;
pub mod integration;
pub mod log;
pub mod pagination;
pub mod template;
pub mod user;

pub use api_key::{ApiKey, ApiKeyPatch};
pub use brand::{BrandComponent, BrandComponentInput, BrandComponentPatch};
pub use event::{Event, EventInput, EventPatch, PromotedEvent, TestSendRequest, TestSendResult};
pub use integration::{ConnectionTest, IntegrationPatch, SesIntegration, VerificationStatus};
pub use log::{DailyCount, DashboardStats, EmailLog};
pub use pagination::Paginated;
pub use template::{EmailTemplate, TemplateInput, TemplatePatch, TemplatePreview, UploadHtml};
pub use user::{InviteRequest, InviteResponse, ManagedUser, MemberPatch, ProfilePatch, User};

use serde::{Deserialize, Serialize};

/// Generic `{ "detail": "..." }` acknowledgement body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Detail {
    #[serde(default)]
    pub detail: String,
}
