//! Email log route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{error, instrument};
use xyno_client::resources::logs::{self, LogFilter};
use xyno_core::{DeliveryStatus, EmailLog, LogId, Paginated};

use crate::filters;
use crate::middleware::RequireAuth;
use crate::page::{Flash, MessageQuery, PageContext, redirect_with};

const LIST_PATH: &str = "/logs";

/// Log list query: filters plus the banner parameters.
#[derive(Debug, Default, Deserialize)]
pub struct LogsQuery {
    pub page: Option<u32>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub search: String,
    pub sent_after: Option<String>,
    pub sent_before: Option<String>,
    pub error: Option<String>,
}

impl LogsQuery {
    fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    fn filter(&self) -> LogFilter {
        LogFilter {
            page: Some(self.page()),
            status: self.status.parse::<DeliveryStatus>().ok(),
            search: Some(self.search.trim().to_string()),
            sent_after: parse_date(self.sent_after.as_deref()),
            sent_before: parse_date(self.sent_before.as_deref()),
            ..LogFilter::default()
        }
    }

    /// Link to another page of the same filtered list.
    fn page_link(&self, page: u32) -> String {
        let mut filter = self.filter();
        filter.page = Some(page);
        let query = filter
            .to_query()
            .iter()
            .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{LIST_PATH}?{query}")
    }
}

fn parse_date(raw: Option<&str>) -> Option<chrono::NaiveDate> {
    raw.and_then(|d| chrono::NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok())
}

/// Log list page.
#[derive(Template, WebTemplate)]
#[template(path = "logs/index.html")]
pub struct LogsTemplate {
    pub page: PageContext,
    pub logs: Vec<EmailLog>,
    pub total: u64,
    pub statuses: [DeliveryStatus; 5],
    pub status: String,
    pub search: String,
    pub sent_after: String,
    pub sent_before: String,
    pub current_page: u32,
    pub previous_link: Option<String>,
    pub next_link: Option<String>,
}

/// Log detail page.
#[derive(Template, WebTemplate)]
#[template(path = "logs/detail.html")]
pub struct LogDetailTemplate {
    pub page: PageContext,
    pub log: EmailLog,
    pub metadata: String,
}

/// Filtered, paginated log list.
#[instrument(skip_all)]
pub async fn index(RequireAuth(current): RequireAuth, Query(query): Query<LogsQuery>) -> Response {
    let messages = MessageQuery {
        error: query.error.clone(),
        ..MessageQuery::default()
    };
    let mut page = PageContext::new(&current, LIST_PATH, messages);

    let result = match logs::list(&current.client, &query.filter()).await {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, "Failed to load logs");
            page = page.with_error("Failed to load logs");
            Paginated::default()
        }
    };

    let current_page = query.page();
    LogsTemplate {
        page,
        total: result.count,
        previous_link: result
            .has_previous()
            .then(|| query.page_link(current_page.saturating_sub(1).max(1))),
        next_link: result.has_next().then(|| query.page_link(current_page + 1)),
        logs: result.into_results(),
        statuses: DeliveryStatus::ALL,
        status: query.status.clone(),
        search: query.search.clone(),
        sent_after: query.sent_after.clone().unwrap_or_default(),
        sent_before: query.sent_before.clone().unwrap_or_default(),
        current_page,
    }
    .into_response()
}

/// One log entry with its metadata.
#[instrument(skip(current))]
pub async fn detail(RequireAuth(current): RequireAuth, Path(id): Path<LogId>) -> Response {
    match logs::get(&current.client, id).await {
        Ok(log) => {
            let metadata = if log.metadata.is_null() {
                String::new()
            } else {
                serde_json::to_string_pretty(&log.metadata).unwrap_or_default()
            };
            LogDetailTemplate {
                page: PageContext::new(&current, LIST_PATH, MessageQuery::default()),
                log,
                metadata,
            }
            .into_response()
        }
        Err(e) => {
            error!(log_id = %id, error = %e, "Failed to load log");
            redirect_with(LIST_PATH, Flash::Error, "Failed to load logs").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_ignores_unknown_status_and_bad_dates() {
        let query = LogsQuery {
            status: "lost".to_string(),
            sent_after: Some("yesterday".to_string()),
            sent_before: Some("2025-03-09".to_string()),
            ..LogsQuery::default()
        };
        let filter = query.filter();
        assert_eq!(filter.page, Some(1));
        assert_eq!(filter.status, None);
        assert_eq!(filter.sent_after, None);
        assert_eq!(filter.sent_before.map(|d| d.to_string()).as_deref(), Some("2025-03-09"));
    }

    #[test]
    fn test_page_link_keeps_filters() {
        let query = LogsQuery {
            page: Some(2),
            status: "failed".to_string(),
            search: "ada lovelace".to_string(),
            ..LogsQuery::default()
        };
        assert_eq!(
            query.page_link(3),
            "/logs?page=3&status=failed&search=ada%20lovelace"
        );
    }
}
