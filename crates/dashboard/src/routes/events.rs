//! Event route handlers.
//!
//! Events bind a slug to a template and an SES integration. The detail page
//! carries the edit form, the trigger snippet and the test-send form.

use std::collections::BTreeMap;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{error, info, instrument, warn};
use xyno_client::resources::{events, integrations, templates};
use xyno_core::{
    Email, EmailTemplate, Event, EventId, EventInput, EventPatch, IntegrationId, SesIntegration,
    TemplateId, TestSendRequest, placeholder::placeholder_defaults, snippet::trigger_snippet,
};

use crate::filters;
use crate::middleware::{CurrentUser, RequireAuth};
use crate::page::{Flash, MessageQuery, PageContext, failure_message, redirect_with};
use crate::state::AppState;

const LIST_PATH: &str = "/events";

/// Prefix of the per-placeholder inputs on the test-send form.
const DATA_FIELD_PREFIX: &str = "data:";

// =============================================================================
// Templates
// =============================================================================

/// Event list page with the create form.
#[derive(Template, WebTemplate)]
#[template(path = "events/index.html")]
pub struct EventsIndexTemplate {
    pub page: PageContext,
    pub events: Vec<Event>,
    pub templates: Vec<EmailTemplate>,
    pub integrations: Vec<SesIntegration>,
}

/// Event detail page.
#[derive(Template, WebTemplate)]
#[template(path = "events/detail.html")]
pub struct EventDetailTemplate {
    pub page: PageContext,
    pub event: Event,
    pub templates: Vec<EmailTemplate>,
    pub integrations: Vec<SesIntegration>,
    pub snippet: String,
    pub test_data: BTreeMap<String, String>,
    pub data_field_prefix: &'static str,
}

// =============================================================================
// Form Types
// =============================================================================

/// Create/edit form data. Select boxes submit an empty string for "None".
#[derive(Debug, Deserialize)]
pub struct EventForm {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub template: String,
    #[serde(default)]
    pub integration: String,
    /// Checkbox: present when ticked.
    pub is_active: Option<String>,
}

impl EventForm {
    fn into_input(self) -> Result<EventInput, String> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err("Event name is required".to_string());
        }
        Ok(EventInput {
            name,
            description: self.description.trim().to_string(),
            template: optional_id::<TemplateId>(&self.template)?,
            integration: optional_id::<IntegrationId>(&self.integration)?,
            is_active: self.is_active.is_some(),
        })
    }
}

/// Blank means unset.
fn optional_id<T: std::str::FromStr>(raw: &str) -> Result<Option<T>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<T>()
        .map(Some)
        .map_err(|_| format!("Invalid selection: {raw}"))
}

// =============================================================================
// Routes
// =============================================================================

/// List events with the create form.
#[instrument(skip_all)]
pub async fn index(RequireAuth(current): RequireAuth, Query(query): Query<MessageQuery>) -> Response {
    let mut page = PageContext::new(&current, LIST_PATH, query);

    let events = match events::list(&current.client).await {
        Ok(list) => list.into_results(),
        Err(e) => {
            error!(error = %e, "Failed to load events");
            page = page.with_error("Failed to load events");
            Vec::new()
        }
    };
    let (templates, integrations) = bindings(&current).await;

    EventsIndexTemplate {
        page,
        events,
        templates,
        integrations,
    }
    .into_response()
}

/// Create an event.
#[instrument(skip_all, fields(name = %form.name))]
pub async fn create(RequireAuth(current): RequireAuth, Form(form): Form<EventForm>) -> Response {
    let input = match form.into_input() {
        Ok(input) => input,
        Err(message) => return redirect_with(LIST_PATH, Flash::Error, &message).into_response(),
    };

    match events::create(&current.client, &input).await {
        Ok(event) => {
            info!(event_id = %event.id, slug = %event.slug, "Event created");
            redirect_with(&format!("/events/{}", event.id), Flash::Success, "Event created")
                .into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to create event");
            redirect_with(LIST_PATH, Flash::Error, &failure_message("Failed to save event", &e))
                .into_response()
        }
    }
}

/// Event detail: edit form, trigger snippet and test send.
#[instrument(skip(state, current, query))]
pub async fn detail(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Path(id): Path<EventId>,
    Query(query): Query<MessageQuery>,
) -> Response {
    let event = match events::get(&current.client, id).await {
        Ok(event) => event,
        Err(e) => {
            error!(event_id = %id, error = %e, "Failed to load event");
            return redirect_with(LIST_PATH, Flash::Error, "Failed to load event").into_response();
        }
    };

    // The snippet and the test form list the bound template's placeholders.
    let placeholders = match event.template {
        Some(template_id) => match templates::get(&current.client, template_id).await {
            Ok(template) => template.placeholders,
            Err(e) => {
                warn!(template_id = %template_id, error = %e, "Failed to load bound template");
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    let (templates, integrations) = bindings(&current).await;
    let page = PageContext::new(&current, &format!("/events/{id}"), query);

    EventDetailTemplate {
        page,
        snippet: trigger_snippet(&state.config().api_url, &event.slug, &placeholders),
        test_data: placeholder_defaults(&placeholders),
        event,
        templates,
        integrations,
        data_field_prefix: DATA_FIELD_PREFIX,
    }
    .into_response()
}

/// Update an event.
#[instrument(skip(current, form))]
pub async fn update(
    RequireAuth(current): RequireAuth,
    Path(id): Path<EventId>,
    Form(form): Form<EventForm>,
) -> Response {
    let back = format!("/events/{id}");
    let input = match form.into_input() {
        Ok(input) => input,
        Err(message) => return redirect_with(&back, Flash::Error, &message).into_response(),
    };

    match events::update(&current.client, id, &EventPatch::from(input)).await {
        Ok(_) => {
            info!(event_id = %id, "Event updated");
            redirect_with(&back, Flash::Success, "Event updated").into_response()
        }
        Err(e) => {
            error!(event_id = %id, error = %e, "Failed to update event");
            redirect_with(&back, Flash::Error, &failure_message("Failed to save event", &e))
                .into_response()
        }
    }
}

/// Delete an event.
#[instrument(skip(current))]
pub async fn delete(RequireAuth(current): RequireAuth, Path(id): Path<EventId>) -> Response {
    match events::delete(&current.client, id).await {
        Ok(()) => {
            info!(event_id = %id, "Event deleted");
            redirect_with(LIST_PATH, Flash::Success, "Event deleted").into_response()
        }
        Err(e) => {
            error!(event_id = %id, error = %e, "Failed to delete event");
            redirect_with(LIST_PATH, Flash::Error, "Failed to delete event").into_response()
        }
    }
}

/// Copy a sandbox event into production.
///
/// Unresolved bindings come back as warnings and are shown instead of the
/// success banner.
#[instrument(skip(current))]
pub async fn promote(RequireAuth(current): RequireAuth, Path(id): Path<EventId>) -> Response {
    if !current.environment().is_sandbox() {
        return redirect_with(LIST_PATH, Flash::Error, "Only sandbox events can be promoted")
            .into_response();
    }

    match events::promote(&current.client, id).await {
        Ok(promoted) if promoted.warnings.is_empty() => {
            info!(event_id = %id, production_id = %promoted.event.id, "Event promoted");
            redirect_with(LIST_PATH, Flash::Success, "Event promoted to Production").into_response()
        }
        Ok(promoted) => {
            warn!(event_id = %id, warnings = ?promoted.warnings, "Event promoted with warnings");
            let message = format!("Promoted with warnings: {}", promoted.warnings.join("; "));
            redirect_with(LIST_PATH, Flash::Warning, &message).into_response()
        }
        Err(e) => {
            error!(event_id = %id, error = %e, "Failed to promote event");
            redirect_with(LIST_PATH, Flash::Error, &failure_message("Failed to promote event", &e))
                .into_response()
        }
    }
}

/// Queue a test send. Expects `recipient` plus one `data:<name>` input per
/// placeholder.
#[instrument(skip(current, form))]
pub async fn test(
    RequireAuth(current): RequireAuth,
    Path(id): Path<EventId>,
    Form(form): Form<BTreeMap<String, String>>,
) -> Response {
    let back = format!("/events/{id}");
    let Some(request) = test_request(&form) else {
        return redirect_with(&back, Flash::Error, "A valid recipient email is required").into_response();
    };

    match events::test(&current.client, id, &request).await {
        Ok(result) => {
            info!(event_id = %id, task_id = ?result.task_id, "Test email queued");
            let message = if result.detail.is_empty() {
                "Test email queued".to_string()
            } else {
                result.detail
            };
            redirect_with(&back, Flash::Success, &message).into_response()
        }
        Err(e) => {
            error!(event_id = %id, error = %e, "Failed to send test email");
            redirect_with(&back, Flash::Error, &failure_message("Failed to send test email", &e))
                .into_response()
        }
    }
}

fn test_request(form: &BTreeMap<String, String>) -> Option<TestSendRequest> {
    let recipient = Email::parse(form.get("recipient")?).ok()?;
    let data = form
        .iter()
        .filter_map(|(key, value)| {
            key.strip_prefix(DATA_FIELD_PREFIX)
                .map(|name| (name.to_string(), value.clone()))
        })
        .collect();
    Some(TestSendRequest {
        recipient: recipient.into_inner(),
        data,
    })
}

/// Templates and integrations offered in the binding selects.
async fn bindings(current: &CurrentUser) -> (Vec<EmailTemplate>, Vec<SesIntegration>) {
    let (templates, integrations) = tokio::join!(
        templates::list(&current.client),
        integrations::list(&current.client)
    );

    let templates = templates.map(|list| list.into_results()).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load templates for event form");
        Vec::new()
    });
    let integrations = integrations
        .map(|list| list.into_results())
        .unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load integrations for event form");
            Vec::new()
        });
    (templates, integrations)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(template: &str, is_active: Option<&str>) -> EventForm {
        EventForm {
            name: " Welcome ".to_string(),
            description: String::new(),
            template: template.to_string(),
            integration: String::new(),
            is_active: is_active.map(str::to_string),
        }
    }

    #[test]
    fn test_event_form_blank_selects_are_unset() {
        let input = form("", Some("on")).into_input().unwrap();
        assert_eq!(input.name, "Welcome");
        assert_eq!(input.template, None);
        assert_eq!(input.integration, None);
        assert!(input.is_active);
    }

    #[test]
    fn test_event_form_parses_ids() {
        let input = form("7", None).into_input().unwrap();
        assert_eq!(input.template, Some(TemplateId::new(7)));
        assert!(!input.is_active);
        assert!(form("seven", None).into_input().is_err());
    }

    #[test]
    fn test_event_form_requires_name() {
        let mut blank = form("", None);
        blank.name = "  ".to_string();
        assert_eq!(blank.into_input().unwrap_err(), "Event name is required");
    }

    #[test]
    fn test_test_request_collects_data_fields() {
        let form = BTreeMap::from([
            ("recipient".to_string(), " ada@example.com ".to_string()),
            ("data:name".to_string(), "Ada".to_string()),
            ("other".to_string(), "ignored".to_string()),
        ]);
        let request = test_request(&form).unwrap();
        assert_eq!(request.recipient, "ada@example.com");
        assert_eq!(request.data.len(), 1);
        assert_eq!(request.data["name"], "Ada");

        assert!(test_request(&BTreeMap::new()).is_none());
    }

    fn detail_page(event: Event) -> EventDetailTemplate {
        let template: EmailTemplate = serde_json::from_value(serde_json::json!({
            "id": 3,
            "name": "Welcome",
            "subject": "Hi",
            "created_at": "2025-03-01T00:00:00Z",
            "updated_at": "2025-03-01T00:00:00Z",
        }))
        .unwrap();
        let integration: SesIntegration = serde_json::from_value(serde_json::json!({
            "id": 4,
            "name": "Primary",
            "region": "us-east-1",
            "sender_email": "noreply@xyno.io",
            "created_at": "2025-03-01T00:00:00Z",
            "updated_at": "2025-03-01T00:00:00Z",
        }))
        .unwrap();
        EventDetailTemplate {
            page: PageContext {
                username: "ada".to_string(),
                email: "ada@example.com".to_string(),
                is_admin: true,
                environment: xyno_core::Environment::Sandbox,
                current_path: "/events/9".to_string(),
                success: None,
                error: None,
                warning: None,
            },
            event,
            templates: vec![template],
            integrations: vec![integration],
            snippet: "curl".to_string(),
            test_data: BTreeMap::from([("name".to_string(), "Ada".to_string())]),
            data_field_prefix: DATA_FIELD_PREFIX,
        }
    }

    fn event(template: Option<i64>, integration: Option<i64>) -> Event {
        serde_json::from_value(serde_json::json!({
            "id": 9,
            "name": "User Signup",
            "slug": "user-signup",
            "template": template,
            "integration": integration,
            "is_active": true,
            "created_at": "2025-03-01T00:00:00Z",
            "updated_at": "2025-03-01T00:00:00Z",
        }))
        .unwrap()
    }

    #[test]
    fn test_detail_page_marks_bound_template_and_integration() {
        let html = detail_page(event(Some(3), Some(4))).render().unwrap();
        assert!(html.contains(r#"<option value="3" selected>Welcome</option>"#));
        assert!(html.contains(r#"<option value="4" selected>Primary"#));
        assert!(html.contains(r#"name="data:name" value="Ada""#));
    }

    #[test]
    fn test_detail_page_without_bindings_selects_nothing() {
        let html = detail_page(event(None, None)).render().unwrap();
        assert!(html.contains(r#"<option value="3" >Welcome</option>"#));
        assert!(!html.contains("selected>"));
    }
}
