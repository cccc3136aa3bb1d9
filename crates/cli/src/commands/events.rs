//! Event commands.
//!
//! # Usage
//!
//! ```bash
//! xyno events list
//! xyno events create --name Signup --template 4 --integration 2
//! xyno events snippet 12
//! xyno events test 12 --to ada@example.com --set name=Ada
//! xyno events promote 12
//! ```

use clap::Subcommand;
use tracing::{info, warn};
use xyno_client::resources::{events, templates};
use xyno_core::placeholder::placeholder_defaults;
use xyno_core::snippet::trigger_snippet;
use xyno_core::{
    Email, Event, EventId, EventInput, IntegrationId, Placeholder, TemplateId, TestSendRequest,
};

use super::{CliError, Context, env_label, parse_pairs, print_table, yes_no};

#[derive(Subcommand)]
pub enum EventsAction {
    /// List events in the selected environment
    List,
    /// Create an event
    Create {
        #[arg(short, long)]
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
        /// Template to send
        #[arg(short, long)]
        template: Option<TemplateId>,
        /// SES integration to send through
        #[arg(short, long)]
        integration: Option<IntegrationId>,
        /// Create the event switched off
        #[arg(long)]
        inactive: bool,
    },
    /// Copy a sandbox event into production
    Promote { id: EventId },
    /// Queue a test send
    Test {
        id: EventId,
        /// Recipient address
        #[arg(long)]
        to: Email,
        /// `name=value`, repeatable; unset placeholders use their defaults
        #[arg(long = "set", value_name = "NAME=VALUE")]
        values: Vec<String>,
    },
    /// Delete an event
    Delete { id: EventId },
    /// Print a curl command that triggers the event
    Snippet { id: EventId },
}

/// Run an `events` subcommand.
///
/// # Errors
///
/// Returns an error if the API call fails or an argument is invalid.
pub async fn run(ctx: &Context, action: EventsAction) -> Result<(), CliError> {
    match action {
        EventsAction::List => {
            let page = events::list(&ctx.client).await?;
            ctx.emit(&page, |page| {
                let rows: Vec<Vec<String>> = page.results.iter().map(event_row).collect();
                print_table(
                    &["ID", "NAME", "SLUG", "TEMPLATE", "INTEGRATION", "ACTIVE", "ENV"],
                    &rows,
                );
            })
        }
        EventsAction::Create {
            name,
            description,
            template,
            integration,
            inactive,
        } => {
            let input = EventInput {
                name,
                description,
                template,
                integration,
                is_active: !inactive,
            };
            let event = events::create(&ctx.client, &input).await?;
            info!(event_id = %event.id, slug = %event.slug, "Event created");
            ctx.emit(&event, |e| {
                println!("Created event {} (slug {})", e.id, e.slug);
            })
        }
        EventsAction::Promote { id } => {
            ctx.require_sandbox()?;
            let promoted = events::promote(&ctx.client, id).await?;
            for warning in &promoted.warnings {
                warn!(event_id = %id, warning = %warning, "Promoted with warning");
            }
            ctx.emit(&promoted, |p| {
                println!("Promoted {} to production (id {})", p.event.name, p.event.id);
                for warning in &p.warnings {
                    println!("  warning: {warning}");
                }
            })
        }
        EventsAction::Test { id, to, values } => {
            let event = events::get(&ctx.client, id).await?;
            let mut data = placeholder_defaults(&bound_placeholders(ctx, &event).await?);
            data.extend(parse_pairs(&values)?);
            let request = TestSendRequest {
                recipient: to.into_inner(),
                data,
            };
            let result = events::test(&ctx.client, id, &request).await?;
            ctx.emit(&result, |r| {
                if r.detail.is_empty() {
                    println!("Test email queued for {}", request.recipient);
                } else {
                    println!("{}", r.detail);
                }
                if let Some(task_id) = &r.task_id {
                    println!("  task: {task_id}");
                }
            })
        }
        EventsAction::Delete { id } => {
            events::delete(&ctx.client, id).await?;
            println!("Deleted event {id}");
            Ok(())
        }
        EventsAction::Snippet { id } => {
            let event = events::get(&ctx.client, id).await?;
            let placeholders = bound_placeholders(ctx, &event).await?;
            let api_base = ctx.client.base_url().as_str().trim_end_matches('/');
            println!("{}", trigger_snippet(api_base, &event.slug, &placeholders));
            Ok(())
        }
    }
}

/// Placeholders of the event's template, empty when none is bound.
async fn bound_placeholders(ctx: &Context, event: &Event) -> Result<Vec<Placeholder>, CliError> {
    match event.template {
        Some(template_id) => Ok(templates::get(&ctx.client, template_id)
            .await?
            .placeholders),
        None => Ok(Vec::new()),
    }
}

fn event_row(event: &Event) -> Vec<String> {
    vec![
        event.id.to_string(),
        event.name.clone(),
        event.slug.clone(),
        event.template_name.clone().unwrap_or_else(|| "-".to_string()),
        event
            .integration_name
            .clone()
            .unwrap_or_else(|| "-".to_string()),
        yes_no(event.is_active).to_string(),
        env_label(event.environment).to_string(),
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_event_row_marks_unbound_fields() {
        let event: Event = serde_json::from_value(serde_json::json!({
            "id": 12,
            "name": "Signup",
            "slug": "signup",
            "template_name": "Welcome",
            "is_active": true,
            "environment": "sandbox",
            "created_at": "2025-03-01T10:00:00Z",
            "updated_at": "2025-03-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(
            event_row(&event),
            vec!["12", "Signup", "signup", "Welcome", "-", "yes", "sandbox"]
        );
    }
}
