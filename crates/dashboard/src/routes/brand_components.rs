//! Brand component library route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Multipart, Path, Query},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{error, info, instrument};
use xyno_client::resources::{brand_components, media};
use xyno_core::{
    BrandCategory, BrandComponent, BrandComponentId, BrandComponentInput, BrandComponentPatch,
};

use crate::filters;
use crate::middleware::RequireAuth;
use crate::page::{Flash, MessageQuery, PageContext, failure_message, redirect_with};
use crate::routes::media::read_file;

const LIST_PATH: &str = "/brand-components";

/// Component library page.
#[derive(Template, WebTemplate)]
#[template(path = "brand_components/index.html")]
pub struct BrandComponentsTemplate {
    pub page: PageContext,
    pub components: Vec<BrandComponent>,
    pub categories: [BrandCategory; 5],
    pub selected: Option<BrandCategory>,
}

/// Component edit page with a live preview.
#[derive(Template, WebTemplate)]
#[template(path = "brand_components/edit.html")]
pub struct BrandComponentEditTemplate {
    pub page: PageContext,
    pub component: BrandComponent,
    pub categories: [BrandCategory; 5],
}

/// Library query: category filter plus the banner parameters.
#[derive(Debug, Default, Deserialize)]
pub struct LibraryQuery {
    #[serde(default)]
    pub category: String,
    #[serde(flatten)]
    pub messages: MessageQuery,
}

/// Add/edit form data.
#[derive(Debug, Deserialize)]
pub struct ComponentForm {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub html_content: String,
    #[serde(default)]
    pub thumbnail_url: String,
}

impl ComponentForm {
    fn into_input(self) -> Result<BrandComponentInput, String> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err("Component name is required".to_string());
        }
        if self.html_content.trim().is_empty() {
            return Err("Component HTML is required".to_string());
        }
        Ok(BrandComponentInput {
            name,
            category: self.category.parse()?,
            html_content: self.html_content,
            thumbnail_url: self.thumbnail_url.trim().to_string(),
        })
    }
}

/// The component library, optionally filtered by category.
#[instrument(skip_all, fields(category = %query.category))]
pub async fn index(RequireAuth(current): RequireAuth, Query(query): Query<LibraryQuery>) -> Response {
    let selected = query.category.parse::<BrandCategory>().ok();
    let mut page = PageContext::new(&current, LIST_PATH, query.messages);

    let components = match brand_components::list(&current.client, selected).await {
        Ok(list) => list.into_results(),
        Err(e) => {
            error!(error = %e, "Failed to load brand components");
            page = page.with_error("Failed to load components");
            Vec::new()
        }
    };

    BrandComponentsTemplate {
        page,
        components,
        categories: BrandCategory::ALL,
        selected,
    }
    .into_response()
}

/// Add a component.
#[instrument(skip_all, fields(name = %form.name))]
pub async fn create(RequireAuth(current): RequireAuth, Form(form): Form<ComponentForm>) -> Response {
    let input = match form.into_input() {
        Ok(input) => input,
        Err(message) => return redirect_with(LIST_PATH, Flash::Error, &message).into_response(),
    };

    match brand_components::create(&current.client, &input).await {
        Ok(component) => {
            info!(component_id = %component.id, "Brand component created");
            redirect_with(LIST_PATH, Flash::Success, "Component created").into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to create brand component");
            redirect_with(LIST_PATH, Flash::Error, &failure_message("Failed to save component", &e))
                .into_response()
        }
    }
}

/// Edit page for one component.
#[instrument(skip(current, query))]
pub async fn edit(
    RequireAuth(current): RequireAuth,
    Path(id): Path<BrandComponentId>,
    Query(query): Query<MessageQuery>,
) -> Response {
    match brand_components::get(&current.client, id).await {
        Ok(component) => BrandComponentEditTemplate {
            page: PageContext::new(&current, &format!("{LIST_PATH}/{id}"), query),
            component,
            categories: BrandCategory::ALL,
        }
        .into_response(),
        Err(e) => {
            error!(component_id = %id, error = %e, "Failed to load brand component");
            redirect_with(LIST_PATH, Flash::Error, "Failed to load component").into_response()
        }
    }
}

/// Save an edited component.
#[instrument(skip(current, form))]
pub async fn update(
    RequireAuth(current): RequireAuth,
    Path(id): Path<BrandComponentId>,
    Form(form): Form<ComponentForm>,
) -> Response {
    let back = format!("{LIST_PATH}/{id}");
    let input = match form.into_input() {
        Ok(input) => input,
        Err(message) => return redirect_with(&back, Flash::Error, &message).into_response(),
    };

    match brand_components::update(&current.client, id, &BrandComponentPatch::from(input)).await {
        Ok(_) => {
            info!(component_id = %id, "Brand component updated");
            redirect_with(LIST_PATH, Flash::Success, "Component updated").into_response()
        }
        Err(e) => {
            error!(component_id = %id, error = %e, "Failed to update brand component");
            redirect_with(&back, Flash::Error, &failure_message("Failed to save component", &e))
                .into_response()
        }
    }
}

/// Upload a thumbnail image and attach it to the component.
#[instrument(skip(current, multipart))]
pub async fn thumbnail(
    RequireAuth(current): RequireAuth,
    Path(id): Path<BrandComponentId>,
    multipart: Multipart,
) -> Response {
    let back = format!("{LIST_PATH}/{id}");
    let file = match read_file(multipart).await {
        Ok(file) => file,
        Err(message) => return redirect_with(&back, Flash::Error, &message).into_response(),
    };

    let url = match media::upload(&current.client, file).await {
        Ok(url) => url,
        Err(e) => {
            error!(component_id = %id, error = %e, "Thumbnail upload failed");
            return redirect_with(&back, Flash::Error, &failure_message("Upload failed", &e))
                .into_response();
        }
    };

    let patch = BrandComponentPatch {
        thumbnail_url: Some(url),
        ..BrandComponentPatch::default()
    };
    match brand_components::update(&current.client, id, &patch).await {
        Ok(_) => redirect_with(&back, Flash::Success, "Thumbnail uploaded").into_response(),
        Err(e) => {
            error!(component_id = %id, error = %e, "Failed to attach thumbnail");
            redirect_with(&back, Flash::Error, "Failed to save component").into_response()
        }
    }
}

/// Delete a component.
#[instrument(skip(current))]
pub async fn delete(RequireAuth(current): RequireAuth, Path(id): Path<BrandComponentId>) -> Response {
    match brand_components::delete(&current.client, id).await {
        Ok(()) => {
            info!(component_id = %id, "Brand component deleted");
            redirect_with(LIST_PATH, Flash::Success, "Component deleted").into_response()
        }
        Err(e) => {
            error!(component_id = %id, error = %e, "Failed to delete brand component");
            redirect_with(LIST_PATH, Flash::Error, "Failed to delete component").into_response()
        }
    }
}
