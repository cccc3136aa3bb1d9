//! Send log and statistics commands.

use chrono::NaiveDate;
use clap::{Args, Subcommand};
use xyno_client::resources::logs::{self, LogFilter};
use xyno_core::{DashboardStats, DeliveryStatus, EmailLog, LogId};

use super::{CliError, Context, print_table};

#[derive(Subcommand)]
pub enum LogsAction {
    /// List send logs, newest first
    List(ListArgs),
    /// Show one log entry with its metadata
    Show { id: LogId },
    /// Sending statistics for the selected environment
    Stats,
}

#[derive(Args)]
pub struct ListArgs {
    /// `pending`, `sent`, `failed`, `bounced` or `complained`
    #[arg(short, long)]
    status: Option<DeliveryStatus>,
    /// Match recipient, subject or event
    #[arg(short = 'q', long)]
    search: Option<String>,
    /// Only logs sent on or after this date (YYYY-MM-DD)
    #[arg(long)]
    after: Option<NaiveDate>,
    /// Only logs sent on or before this date (YYYY-MM-DD)
    #[arg(long)]
    before: Option<NaiveDate>,
    #[arg(short, long, default_value_t = 1)]
    page: u32,
}

impl ListArgs {
    fn filter(self) -> LogFilter {
        LogFilter {
            page: Some(self.page.max(1)),
            status: self.status,
            search: self.search,
            sent_after: self.after,
            sent_before: self.before,
            ..LogFilter::default()
        }
    }
}

/// Run a `logs` subcommand.
///
/// # Errors
///
/// Returns an error if the API call fails.
pub async fn run(ctx: &Context, action: LogsAction) -> Result<(), CliError> {
    match action {
        LogsAction::List(args) => {
            let filter = args.filter();
            let page = logs::list(&ctx.client, &filter).await?;
            ctx.emit(&page, |page| {
                let rows: Vec<Vec<String>> = page.results.iter().map(log_row).collect();
                print_table(&["ID", "SENT", "STATUS", "RECIPIENT", "EVENT", "SUBJECT"], &rows);
                println!();
                println!(
                    "Page {} of {} total{}",
                    filter.page.unwrap_or(1),
                    page.count,
                    if page.has_next() { " (more with --page)" } else { "" }
                );
            })
        }
        LogsAction::Show { id } => {
            let log = logs::get(&ctx.client, id).await?;
            ctx.emit(&log, print_log)
        }
        LogsAction::Stats => {
            let stats = logs::dashboard_stats(&ctx.client).await?;
            ctx.emit(&stats, print_stats)
        }
    }
}

fn log_row(log: &EmailLog) -> Vec<String> {
    vec![
        log.id.to_string(),
        log.sent_at.format("%Y-%m-%d %H:%M").to_string(),
        log.status.to_string(),
        log.recipient.clone(),
        log.event_slug.clone().unwrap_or_else(|| "-".to_string()),
        log.subject.clone(),
    ]
}

fn print_log(log: &EmailLog) {
    println!("Log {} ({})", log.id, log.status);
    println!("  to:       {}", log.recipient);
    println!("  subject:  {}", log.subject);
    println!("  sent:     {}", log.sent_at.to_rfc3339());
    if let Some(event) = &log.event_name {
        println!("  event:    {event}");
    }
    if let Some(template) = &log.template_name {
        println!("  template: {template}");
    }
    if let Some(integration) = &log.integration_name {
        println!("  via:      {integration}");
    }
    if !log.ses_message_id.is_empty() {
        println!("  ses id:   {}", log.ses_message_id);
    }
    if !log.error_message.is_empty() {
        println!("  error:    {}", log.error_message);
    }
    if !log.metadata.is_null() {
        if let Ok(metadata) = serde_json::to_string_pretty(&log.metadata) {
            println!("  metadata:\n{metadata}");
        }
    }
}

fn print_stats(stats: &DashboardStats) {
    println!("Sent today:        {}", stats.sent_today);
    println!("Sent last 7 days:  {}", stats.sent_last_7_days);
    println!("Sent last 30 days: {}", stats.sent_last_30_days);
    println!("Total sent:        {}", stats.total_sent);
    println!(
        "Total failed:      {} ({:.1}%)",
        stats.total_failed,
        stats.failure_rate()
    );
    println!("Active events:     {}", stats.active_events);
    println!("Active SES:        {}", stats.active_integrations);
    println!("Templates:         {}", stats.total_templates);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_list_args_clamp_page() {
        let args = ListArgs {
            status: Some(DeliveryStatus::Failed),
            search: None,
            after: NaiveDate::from_ymd_opt(2025, 3, 1),
            before: None,
            page: 0,
        };
        let filter = args.filter();
        assert_eq!(filter.page, Some(1));
        assert_eq!(filter.status, Some(DeliveryStatus::Failed));
        assert_eq!(
            filter.to_query(),
            vec![
                ("page".to_string(), "1".to_string()),
                ("status".to_string(), "failed".to_string()),
                ("sent_after".to_string(), "2025-03-01".to_string()),
            ]
        );
    }
}
