//! Email template route handlers.
//!
//! The list page, raw HTML upload, promotion to production, placeholder
//! defaults, the builder and the rendered preview.

use std::collections::BTreeMap;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Multipart, Path, Query},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{error, info, instrument, warn};
use xyno_client::resources::{brand_components, templates};
use xyno_core::{
    BrandComponent, BrandComponentId, EmailTemplate, Placeholder, PlaceholderError,
    PlaceholderSet, TemplateId, TemplatePatch, TemplatePreview, UploadHtml,
    design::{DesignEditor, DesignSource, HtmlDocumentEditor, TemplateDraft},
    placeholder::placeholder_defaults,
};

use crate::filters;
use crate::middleware::{CurrentUser, RequireAuth};
use crate::page::{Flash, MessageQuery, PageContext, failure_message, redirect_with};

const LIST_PATH: &str = "/templates";

/// Prefix of the per-placeholder inputs on the placeholder and preview forms.
const DEFAULT_FIELD_PREFIX: &str = "default:";

// =============================================================================
// Templates
// =============================================================================

/// Template list page.
#[derive(Template, WebTemplate)]
#[template(path = "templates/index.html")]
pub struct TemplatesIndexTemplate {
    pub page: PageContext,
    pub templates: Vec<EmailTemplate>,
    pub default_field_prefix: &'static str,
}

/// Template builder page.
#[derive(Template, WebTemplate)]
#[template(path = "templates/builder.html")]
pub struct BuilderTemplate {
    pub page: PageContext,
    pub template_id: Option<TemplateId>,
    pub name: String,
    pub subject: String,
    pub html: String,
    pub css: String,
    pub placeholders: String,
    pub imported: bool,
    pub components: Vec<BrandComponent>,
}

/// Rendered preview page.
#[derive(Template, WebTemplate)]
#[template(path = "templates/preview.html")]
pub struct PreviewTemplate {
    pub page: PageContext,
    pub template: EmailTemplate,
    pub preview: TemplatePreview,
    pub context: BTreeMap<String, String>,
    pub default_field_prefix: &'static str,
}

// =============================================================================
// List Routes
// =============================================================================

/// List templates in the current environment.
#[instrument(skip_all)]
pub async fn index(RequireAuth(current): RequireAuth, Query(query): Query<MessageQuery>) -> Response {
    let mut page = PageContext::new(&current, LIST_PATH, query);

    let templates = match templates::list(&current.client).await {
        Ok(list) => list.into_results(),
        Err(e) => {
            error!(error = %e, "Failed to load templates");
            page = page.with_error("Failed to load templates");
            Vec::new()
        }
    };

    TemplatesIndexTemplate {
        page,
        templates,
        default_field_prefix: DEFAULT_FIELD_PREFIX,
    }
    .into_response()
}

/// Create a template from an uploaded HTML file.
///
/// Expects multipart fields `name`, `subject` and `file`.
#[instrument(skip_all)]
pub async fn upload(RequireAuth(current): RequireAuth, multipart: Multipart) -> Response {
    let upload = match read_upload(multipart).await {
        Ok(upload) => upload,
        Err(message) => {
            return redirect_with(LIST_PATH, Flash::Error, &message).into_response();
        }
    };

    match templates::upload_html(&current.client, &upload).await {
        Ok(template) => {
            info!(template_id = %template.id, placeholders = template.placeholders.len(), "Template uploaded");
            redirect_with(LIST_PATH, Flash::Success, "Template uploaded").into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to upload template");
            redirect_with(LIST_PATH, Flash::Error, &failure_message("Failed to upload template", &e))
                .into_response()
        }
    }
}

async fn read_upload(mut multipart: Multipart) -> Result<UploadHtml, String> {
    let mut name = String::new();
    let mut subject = String::new();
    let mut html_content = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| e.body_text())? {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("name") => name = field.text().await.map_err(|e| e.body_text())?,
            Some("subject") => subject = field.text().await.map_err(|e| e.body_text())?,
            Some("file") => {
                let bytes = field.bytes().await.map_err(|e| e.body_text())?;
                let html = String::from_utf8(bytes.to_vec())
                    .map_err(|_| "The file must be UTF-8 encoded HTML".to_string())?;
                html_content = Some(html);
            }
            _ => {}
        }
    }

    let html_content = html_content
        .filter(|html| !html.trim().is_empty())
        .ok_or_else(|| "Choose an HTML file to upload".to_string())?;
    if name.trim().is_empty() {
        return Err("Template name is required".to_string());
    }
    if subject.trim().is_empty() {
        return Err("Subject line is required".to_string());
    }

    Ok(UploadHtml {
        name: name.trim().to_string(),
        subject: subject.trim().to_string(),
        html_content,
    })
}

/// Copy a sandbox template into production.
#[instrument(skip(current))]
pub async fn promote(RequireAuth(current): RequireAuth, Path(id): Path<TemplateId>) -> Response {
    if !current.environment().is_sandbox() {
        return redirect_with(LIST_PATH, Flash::Error, "Only sandbox templates can be promoted")
            .into_response();
    }

    match templates::promote(&current.client, id).await {
        Ok(promoted) => {
            info!(template_id = %id, production_id = %promoted.id, "Template promoted");
            redirect_with(LIST_PATH, Flash::Success, "Template promoted to Production").into_response()
        }
        Err(e) => {
            error!(template_id = %id, error = %e, "Failed to promote template");
            redirect_with(LIST_PATH, Flash::Error, &failure_message("Failed to promote template", &e))
                .into_response()
        }
    }
}

/// Delete a template.
#[instrument(skip(current))]
pub async fn delete(RequireAuth(current): RequireAuth, Path(id): Path<TemplateId>) -> Response {
    match templates::delete(&current.client, id).await {
        Ok(()) => {
            info!(template_id = %id, "Template deleted");
            redirect_with(LIST_PATH, Flash::Success, "Template deleted").into_response()
        }
        Err(e) => {
            error!(template_id = %id, error = %e, "Failed to delete template");
            redirect_with(LIST_PATH, Flash::Error, "Failed to delete template").into_response()
        }
    }
}

/// Save placeholder default values from the "Manage Placeholders" form.
#[instrument(skip(current, form))]
pub async fn placeholders(
    RequireAuth(current): RequireAuth,
    Path(id): Path<TemplateId>,
    Form(form): Form<BTreeMap<String, String>>,
) -> Response {
    let placeholders = defaults_from_form(&form);

    match templates::update_placeholders(&current.client, id, &placeholders).await {
        Ok(_) => redirect_with(LIST_PATH, Flash::Success, "Placeholder defaults saved").into_response(),
        Err(e) => {
            error!(template_id = %id, error = %e, "Failed to save placeholders");
            redirect_with(LIST_PATH, Flash::Error, "Failed to save placeholders").into_response()
        }
    }
}

/// Collect `default:<name>` inputs into placeholder values.
fn defaults_from_form(form: &BTreeMap<String, String>) -> Vec<Placeholder> {
    form.iter()
        .filter_map(|(key, value)| {
            key.strip_prefix(DEFAULT_FIELD_PREFIX).map(|name| Placeholder {
                name: name.to_string(),
                default_value: value.clone(),
            })
        })
        .collect()
}

// =============================================================================
// Builder Routes
// =============================================================================

/// Builder for a new template.
pub async fn new_template(
    RequireAuth(current): RequireAuth,
    Query(query): Query<MessageQuery>,
) -> Response {
    let page = PageContext::new(&current, "/templates/new", query);
    let components = builder_components(&current).await;

    BuilderTemplate {
        page,
        template_id: None,
        name: String::new(),
        subject: String::new(),
        html: String::new(),
        css: String::new(),
        placeholders: String::new(),
        imported: false,
        components,
    }
    .into_response()
}

/// Builder for an existing template.
#[instrument(skip(current, query))]
pub async fn edit(
    RequireAuth(current): RequireAuth,
    Path(id): Path<TemplateId>,
    Query(query): Query<MessageQuery>,
) -> Response {
    let template = match templates::get(&current.client, id).await {
        Ok(template) => template,
        Err(e) => {
            error!(template_id = %id, error = %e, "Failed to load template");
            return redirect_with(LIST_PATH, Flash::Error, "Failed to load template").into_response();
        }
    };

    let source = DesignSource::classify(template.design_json.as_ref(), &template.html_content);
    let editor = HtmlDocumentEditor::open(template.design_json.as_ref(), &template.html_content);
    let page = PageContext::new(&current, &format!("/templates/{id}/edit"), query);
    let components = builder_components(&current).await;

    BuilderTemplate {
        page,
        template_id: Some(id),
        name: template.name,
        subject: template.subject,
        html: editor.html(),
        css: editor.css(),
        placeholders: placeholder_lines(&template.placeholders),
        imported: source.is_imported(),
        components,
    }
    .into_response()
}

/// Builder form data.
///
/// `action` is `save` (the default), `insert` (append the brand component
/// named by `component`) or `add_placeholder` (append `new_placeholder`).
#[derive(Debug, Deserialize)]
pub struct BuilderForm {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub subject: String,
    #[serde(default)]
    pub html: String,
    #[serde(default)]
    pub css: String,
    #[serde(default)]
    pub placeholders: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub component: String,
    #[serde(default)]
    pub new_placeholder: String,
}

/// Handle every builder submission.
#[instrument(skip_all, fields(action = %form.action))]
pub async fn save_builder(RequireAuth(current): RequireAuth, Form(form): Form<BuilderForm>) -> Response {
    let template_id = form.id.parse::<TemplateId>().ok();
    let mut editor = HtmlDocumentEditor::new(form.html.clone(), form.css.clone());

    let mut placeholder_set = match parse_placeholder_lines(&form.placeholders) {
        Ok(set) => set,
        Err(e) => {
            return render_builder(&current, template_id, &form, &editor, None, Some(e.to_string())).await;
        }
    };

    let action = form.action.clone();
    match action.as_str() {
        "insert" => {
            let Ok(component_id) = form.component.parse::<BrandComponentId>() else {
                let error = Some("Choose a component to insert".to_string());
                return render_builder(&current, template_id, &form, &editor, None, error).await;
            };
            match brand_components::get(&current.client, component_id).await {
                Ok(component) => {
                    editor.insert_fragment(&component.html_content);
                    let notice = Some(format!("\"{}\" inserted", component.name));
                    render_builder(&current, template_id, &form, &editor, notice, None).await
                }
                Err(e) => {
                    error!(component_id = %component_id, error = %e, "Failed to load brand component");
                    let error = Some("Failed to load component".to_string());
                    render_builder(&current, template_id, &form, &editor, None, error).await
                }
            }
        }
        "add_placeholder" => {
            let (notice, error) = match placeholder_set.add(&form.new_placeholder) {
                Ok(name) => (Some(format!("Placeholder \"{name}\" added")), None),
                Err(e) => (None, Some(e.to_string())),
            };
            let form = BuilderForm {
                placeholders: placeholder_lines(placeholder_set.as_slice()),
                ..form
            };
            render_builder(&current, template_id, &form, &editor, notice, error).await
        }
        _ => save(&current, template_id, form, &editor, placeholder_set).await,
    }
}

async fn save(
    current: &CurrentUser,
    template_id: Option<TemplateId>,
    form: BuilderForm,
    editor: &HtmlDocumentEditor,
    placeholder_set: PlaceholderSet,
) -> Response {
    let draft = TemplateDraft {
        name: form.name.trim().to_string(),
        subject: form.subject.trim().to_string(),
        design: editor.serialize(),
    };
    let input = match draft.into_input() {
        Ok(input) => input,
        Err(e) => {
            return render_builder(current, template_id, &form, editor, None, Some(e.to_string())).await;
        }
    };

    let saved = match template_id {
        Some(id) => templates::update(&current.client, id, &TemplatePatch::from(input)).await,
        None => templates::create(&current.client, &input).await,
    };
    let saved = match saved {
        Ok(saved) => saved,
        Err(e) => {
            error!(error = %e, "Failed to save template");
            let error = Some(failure_message("Failed to save template", &e));
            return render_builder(current, template_id, &form, editor, None, error).await;
        }
    };

    if !placeholder_set.is_empty()
        && let Err(e) =
            templates::update_placeholders(&current.client, saved.id, placeholder_set.as_slice()).await
    {
        warn!(template_id = %saved.id, error = %e, "Template saved but placeholders were not");
        return redirect_with(LIST_PATH, Flash::Warning, "Template saved, but placeholder defaults failed to save")
            .into_response();
    }

    info!(template_id = %saved.id, created = template_id.is_none(), "Template saved");
    let message = if template_id.is_some() {
        "Template updated"
    } else {
        "Template created"
    };
    redirect_with(LIST_PATH, Flash::Success, message).into_response()
}

async fn render_builder(
    current: &CurrentUser,
    template_id: Option<TemplateId>,
    form: &BuilderForm,
    editor: &HtmlDocumentEditor,
    success: Option<String>,
    error: Option<String>,
) -> Response {
    let path = template_id.map_or_else(|| "/templates/new".to_string(), |id| format!("/templates/{id}/edit"));
    let messages = MessageQuery {
        success,
        error,
        warning: None,
    };

    BuilderTemplate {
        page: PageContext::new(current, &path, messages),
        template_id,
        name: form.name.clone(),
        subject: form.subject.clone(),
        html: editor.html(),
        css: editor.css(),
        placeholders: form.placeholders.clone(),
        imported: false,
        components: builder_components(current).await,
    }
    .into_response()
}

/// Active brand components offered in the builder's insert menu.
async fn builder_components(current: &CurrentUser) -> Vec<BrandComponent> {
    match brand_components::list(&current.client, None).await {
        Ok(list) => list
            .into_results()
            .into_iter()
            .filter(|component| component.is_active)
            .collect(),
        Err(e) => {
            warn!(error = %e, "Failed to load brand components for the builder");
            Vec::new()
        }
    }
}

/// One `name=default` line per placeholder.
fn placeholder_lines(placeholders: &[Placeholder]) -> String {
    placeholders
        .iter()
        .map(|p| format!("{}={}", p.name, p.default_value))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse the builder's placeholder textarea. Blank lines are skipped; a
/// line without `=` declares a placeholder with no default.
fn parse_placeholder_lines(text: &str) -> Result<PlaceholderSet, PlaceholderError> {
    let mut set = PlaceholderSet::new();
    for line in text.lines().filter(|line| !line.trim().is_empty()) {
        let (name, default_value) = line.split_once('=').unwrap_or((line, ""));
        let name = set.add(name)?;
        set.set_default(&name, default_value.trim());
    }
    Ok(set)
}

// =============================================================================
// Preview Routes
// =============================================================================

/// Render a template server side.
///
/// Placeholder values come from the form's `default:<name>` inputs, falling
/// back to the stored defaults.
#[instrument(skip(current, form))]
pub async fn preview(
    RequireAuth(current): RequireAuth,
    Path(id): Path<TemplateId>,
    Form(form): Form<BTreeMap<String, String>>,
) -> Response {
    let template = match templates::get(&current.client, id).await {
        Ok(template) => template,
        Err(e) => {
            error!(template_id = %id, error = %e, "Failed to load template");
            return redirect_with(LIST_PATH, Flash::Error, "Failed to load template").into_response();
        }
    };

    let mut context = placeholder_defaults(&template.placeholders);
    for placeholder in defaults_from_form(&form) {
        context.insert(placeholder.name, placeholder.default_value);
    }

    match templates::preview(&current.client, id, &context).await {
        Ok(preview) => PreviewTemplate {
            page: PageContext::new(&current, LIST_PATH, MessageQuery::default()),
            template,
            preview,
            context,
            default_field_prefix: DEFAULT_FIELD_PREFIX,
        }
        .into_response(),
        Err(e) => {
            error!(template_id = %id, error = %e, "Failed to render preview");
            redirect_with(LIST_PATH, Flash::Error, &failure_message("Failed to render preview", &e))
                .into_response()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_placeholder_lines() {
        let set = parse_placeholder_lines("First Name=there\n\norder_id\nplan = pro ").unwrap();
        let names: Vec<_> = set.as_slice().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["first_name", "order_id", "plan"]);
        assert_eq!(set.as_slice()[0].default_value, "there");
        assert_eq!(set.as_slice()[1].default_value, "");
        assert_eq!(set.as_slice()[2].default_value, "pro");
    }

    #[test]
    fn test_parse_placeholder_lines_rejects_duplicates() {
        let err = parse_placeholder_lines("name=a\nName=b").unwrap_err();
        assert_eq!(err.to_string(), "Placeholder \"name\" already exists");
    }

    #[test]
    fn test_placeholder_lines_round_trip() {
        let placeholders = vec![
            Placeholder {
                name: "name".to_string(),
                default_value: "there".to_string(),
            },
            Placeholder {
                name: "code".to_string(),
                default_value: String::new(),
            },
        ];
        let text = placeholder_lines(&placeholders);
        assert_eq!(text, "name=there\ncode=");
        assert_eq!(parse_placeholder_lines(&text).unwrap().into_vec(), placeholders);
    }

    #[test]
    fn test_defaults_from_form_ignores_other_fields() {
        let form = BTreeMap::from([
            ("default:name".to_string(), "Ada".to_string()),
            ("csrf".to_string(), "x".to_string()),
        ]);
        let defaults = defaults_from_form(&form);
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].name, "name");
        assert_eq!(defaults[0].default_value, "Ada");
    }
}
