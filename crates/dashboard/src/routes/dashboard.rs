//! Dashboard overview and the environment switcher.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::Query,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{error, info, instrument};
use xyno_client::resources::logs;
use xyno_core::{DashboardStats, Environment};

use crate::filters;
use crate::middleware::RequireAuth;
use crate::page::{Flash, MessageQuery, PageContext, redirect_with, safe_return_path};

/// Stat card on the overview.
#[derive(Debug, Clone)]
pub struct StatCard {
    pub title: &'static str,
    pub value: u64,
}

/// Bar in the 7-day volume chart, as percentages of the busiest day.
#[derive(Debug, Clone)]
pub struct VolumeBar {
    pub date: String,
    pub sent: u64,
    pub failed: u64,
    pub sent_pct: u64,
    pub failed_pct: u64,
}

/// Dashboard page template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard/index.html")]
pub struct DashboardTemplate {
    pub page: PageContext,
    pub cards: Vec<StatCard>,
    pub volume: Vec<VolumeBar>,
    pub stats: DashboardStats,
}

fn stat_cards(stats: &DashboardStats) -> Vec<StatCard> {
    vec![
        StatCard { title: "Sent Today", value: stats.sent_today },
        StatCard { title: "Sent (7 days)", value: stats.sent_last_7_days },
        StatCard { title: "Total Failed", value: stats.total_failed },
        StatCard { title: "Active Integrations", value: stats.active_integrations },
        StatCard { title: "Active Events", value: stats.active_events },
        StatCard { title: "Templates", value: stats.total_templates },
    ]
}

fn volume_bars(stats: &DashboardStats) -> Vec<VolumeBar> {
    let peak = stats.peak_daily_volume().max(1);
    stats
        .daily_breakdown
        .iter()
        .map(|day| VolumeBar {
            date: day.date.format("%b %d").to_string(),
            sent: day.sent,
            failed: day.failed,
            sent_pct: day.sent * 100 / peak,
            failed_pct: day.failed * 100 / peak,
        })
        .collect()
}

/// Overview page: counters, the 7-day volume chart and the latest sends.
///
/// A failed stats call still renders the page, with zeroed counters.
#[instrument(skip_all)]
pub async fn index(
    RequireAuth(current): RequireAuth,
    Query(query): Query<MessageQuery>,
) -> Response {
    let mut page = PageContext::new(&current, "/dashboard", query);

    let stats = match logs::dashboard_stats(&current.client).await {
        Ok(stats) => stats,
        Err(e) => {
            error!(error = %e, "Failed to load dashboard stats");
            page = page.with_error("Failed to load dashboard");
            DashboardStats::default()
        }
    };

    DashboardTemplate {
        page,
        cards: stat_cards(&stats),
        volume: volume_bars(&stats),
        stats,
    }
    .into_response()
}

/// Environment switch form data.
#[derive(Debug, Deserialize)]
pub struct EnvironmentForm {
    /// Target environment; the current one is toggled when absent.
    pub environment: Option<String>,
    pub return_to: Option<String>,
}

/// Switch between sandbox and production, then return to the page.
#[instrument(skip(current))]
pub async fn switch_environment(
    RequireAuth(current): RequireAuth,
    Form(form): Form<EnvironmentForm>,
) -> Response {
    let return_to = safe_return_path(form.return_to.as_deref(), "/dashboard");

    if !current.is_admin() {
        return redirect_with(
            &return_to,
            Flash::Error,
            "Only admins can switch environments.",
        )
        .into_response();
    }

    let state = current.client.environment();
    let result = match form.environment.as_deref().map(str::parse::<Environment>) {
        Some(Ok(target)) => state.set(target).map(|()| target),
        Some(Err(e)) => {
            return redirect_with(&return_to, Flash::Error, &e).into_response();
        }
        None => state.toggle(),
    };

    match result {
        Ok(environment) => {
            info!(environment = %environment, "Environment switched");
            redirect_with(
                &return_to,
                Flash::Success,
                &format!("Now viewing {}", environment.label()),
            )
            .into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to switch environment");
            redirect_with(&return_to, Flash::Error, "Failed to switch environment").into_response()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_bars_scale_to_peak() {
        let stats: DashboardStats = serde_json::from_value(serde_json::json!({
            "total_sent": 6, "total_failed": 2, "sent_today": 1,
            "sent_last_7_days": 6, "sent_last_30_days": 6,
            "active_integrations": 1, "active_events": 1, "total_templates": 1,
            "daily_breakdown": [
                {"date": "2025-03-01", "sent": 2, "failed": 0},
                {"date": "2025-03-02", "sent": 3, "failed": 1}
            ]
        }))
        .unwrap();

        let bars = volume_bars(&stats);
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, "Mar 01");
        assert_eq!(bars[0].sent_pct, 50);
        assert_eq!(bars[1].sent_pct, 75);
        assert_eq!(bars[1].failed_pct, 25);
    }

    #[test]
    fn test_empty_stats_have_no_bars() {
        assert!(volume_bars(&DashboardStats::default()).is_empty());
        assert_eq!(stat_cards(&DashboardStats::default()).len(), 6);
    }
}
