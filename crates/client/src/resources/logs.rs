//! Send logs and dashboard statistics.

use chrono::NaiveDate;
use tracing::instrument;
use xyno_core::{
    DashboardStats, DeliveryStatus, EmailLog, EventId, IntegrationId, LogId, Paginated, TemplateId,
};

use crate::error::ApiError;
use crate::http::{ApiClient, ApiRequest};

/// Query filters for [`list`]. Unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilter {
    pub page: Option<u32>,
    pub status: Option<DeliveryStatus>,
    /// Free-text match on recipient, subject and event.
    pub search: Option<String>,
    pub recipient: Option<String>,
    pub event: Option<EventId>,
    pub event_slug: Option<String>,
    pub template: Option<TemplateId>,
    pub integration: Option<IntegrationId>,
    pub sent_after: Option<NaiveDate>,
    pub sent_before: Option<NaiveDate>,
}

impl LogFilter {
    /// Query string pairs, skipping unset and blank values.
    #[must_use]
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        let mut push = |key: &str, value: Option<String>| {
            if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
                pairs.push((key.to_string(), value));
            }
        };

        push("page", self.page.map(|p| p.to_string()));
        push("status", self.status.map(|s| s.as_str().to_string()));
        push("search", self.search.clone());
        push("recipient", self.recipient.clone());
        push("event", self.event.map(|id| id.to_string()));
        push("event_slug", self.event_slug.clone());
        push("template", self.template.map(|id| id.to_string()));
        push("integration", self.integration.map(|id| id.to_string()));
        push("sent_after", self.sent_after.map(|d| d.to_string()));
        push("sent_before", self.sent_before.map(|d| d.to_string()));
        pairs
    }
}

/// # Errors
///
/// Returns an error if the request fails.
#[instrument(skip(client))]
pub async fn list(client: &ApiClient, filter: &LogFilter) -> Result<Paginated<EmailLog>, ApiError> {
    client
        .fetch(ApiRequest::get("logs/").query(filter.to_query()))
        .await
}

/// # Errors
///
/// Returns an error if the request fails.
#[instrument(skip(client))]
pub async fn get(client: &ApiClient, id: LogId) -> Result<EmailLog, ApiError> {
    client.fetch(ApiRequest::get(format!("logs/{id}/"))).await
}

/// Totals, a 30-day daily breakdown and the most recent sends.
///
/// # Errors
///
/// Returns an error if the request fails.
#[instrument(skip(client))]
pub async fn dashboard_stats(client: &ApiClient) -> Result<DashboardStats, ApiError> {
    client.fetch(ApiRequest::get("logs/dashboard-stats/")).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter_sends_nothing() {
        assert!(LogFilter::default().to_query().is_empty());
    }

    #[test]
    fn test_filter_skips_blank_values() {
        let filter = LogFilter {
            page: Some(2),
            status: Some(DeliveryStatus::Failed),
            search: Some("  ".to_string()),
            sent_after: Some(NaiveDate::from_ymd_opt(2025, 1, 31).unwrap()),
            ..LogFilter::default()
        };
        assert_eq!(
            filter.to_query(),
            vec![
                ("page".to_string(), "2".to_string()),
                ("status".to_string(), "failed".to_string()),
                ("sent_after".to_string(), "2025-01-31".to_string()),
            ]
        );
    }
}
