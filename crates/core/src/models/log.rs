//! Send logs and dashboard statistics.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{DeliveryStatus, EventId, IntegrationId, LogId, TemplateId};

/// One attempted email delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailLog {
    pub id: LogId,
    #[serde(default)]
    pub event: Option<EventId>,
    #[serde(default)]
    pub event_name: Option<String>,
    #[serde(default)]
    pub event_slug: Option<String>,
    #[serde(default)]
    pub template: Option<TemplateId>,
    #[serde(default)]
    pub template_name: Option<String>,
    #[serde(default)]
    pub integration: Option<IntegrationId>,
    #[serde(default)]
    pub integration_name: Option<String>,
    pub recipient: String,
    #[serde(default)]
    pub subject: String,
    pub status: DeliveryStatus,
    #[serde(default)]
    pub ses_message_id: String,
    #[serde(default)]
    pub error_message: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub sent_at: DateTime<Utc>,
}

/// Sent/failed totals for one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub sent: u64,
    pub failed: u64,
}

/// Aggregates shown on the dashboard home page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DashboardStats {
    pub total_sent: u64,
    pub total_failed: u64,
    pub sent_today: u64,
    pub sent_last_7_days: u64,
    pub sent_last_30_days: u64,
    pub active_integrations: u64,
    pub active_events: u64,
    pub total_templates: u64,
    #[serde(default)]
    pub daily_breakdown: Vec<DailyCount>,
    #[serde(default)]
    pub recent_logs: Vec<EmailLog>,
}

impl DashboardStats {
    /// Failure share of all attempts, in percent.
    #[must_use]
    pub fn failure_rate(&self) -> f64 {
        let total = self.total_sent + self.total_failed;
        if total == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)] // counts stay far below f64 precision
        let rate = self.total_failed as f64 / total as f64 * 100.0;
        rate
    }

    /// Largest daily volume, used to scale the activity chart.
    #[must_use]
    pub fn peak_daily_volume(&self) -> u64 {
        self.daily_breakdown
            .iter()
            .map(|day| day.sent + day.failed)
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_rate() {
        let stats = DashboardStats {
            total_sent: 90,
            total_failed: 10,
            ..DashboardStats::default()
        };
        assert!((stats.failure_rate() - 10.0).abs() < f64::EPSILON);
        assert!(DashboardStats::default().failure_rate().abs() < f64::EPSILON);
    }

    #[test]
    fn test_peak_daily_volume() {
        let stats: DashboardStats = serde_json::from_value(serde_json::json!({
            "total_sent": 5, "total_failed": 1, "sent_today": 1,
            "sent_last_7_days": 5, "sent_last_30_days": 5,
            "active_integrations": 1, "active_events": 2, "total_templates": 3,
            "daily_breakdown": [
                {"date": "2025-03-01", "sent": 2, "failed": 0},
                {"date": "2025-03-02", "sent": 3, "failed": 1}
            ],
            "recent_logs": []
        }))
        .unwrap();
        assert_eq!(stats.peak_daily_volume(), 4);
    }
}
