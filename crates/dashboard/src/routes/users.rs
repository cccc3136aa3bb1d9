//! Team member management. Admins only.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{error, info, instrument, warn};
use xyno_client::resources::users;
use xyno_core::{
    Email, InviteRequest, InviteResponse, ManagedUser, MemberPatch, UserId, UserRole,
};

use crate::filters;
use crate::middleware::{CurrentUser, RequireAdmin};
use crate::page::{Flash, MessageQuery, PageContext, failure_message, redirect_with};

const LIST_PATH: &str = "/users";

/// User management page.
#[derive(Template, WebTemplate)]
#[template(path = "users/index.html")]
pub struct UsersTemplate {
    pub page: PageContext,
    pub members: Vec<ManagedUser>,
    pub roles: [UserRole; 2],
    /// Set right after an invitation was sent.
    pub invite: Option<InviteResponse>,
    pub current_user_id: UserId,
}

/// "Invite User" form data.
#[derive(Debug, Deserialize)]
pub struct InviteForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub role: String,
}

/// "Edit User" form data.
#[derive(Debug, Deserialize)]
pub struct MemberForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
    pub role: String,
}

impl InviteForm {
    fn into_request(self) -> Result<InviteRequest, String> {
        if self.email.trim().is_empty() {
            return Err("Email is required".to_string());
        }
        let email = Email::parse(&self.email).map_err(|e| format!("Invalid email: {e}"))?;
        Ok(InviteRequest {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: email.into_inner(),
            phone: self.phone.trim().to_string(),
            role: self.role.parse()?,
        })
    }
}

impl MemberForm {
    fn into_patch(self) -> Result<MemberPatch, String> {
        Ok(MemberPatch {
            first_name: Some(self.first_name.trim().to_string()),
            last_name: Some(self.last_name.trim().to_string()),
            phone: Some(self.phone.trim().to_string()),
            role: Some(self.role.parse()?),
        })
    }
}

/// List team members.
#[instrument(skip_all)]
pub async fn index(RequireAdmin(current): RequireAdmin, Query(query): Query<MessageQuery>) -> Response {
    let page = PageContext::new(&current, LIST_PATH, query);
    render(&current, page, None).await
}

async fn render(current: &CurrentUser, mut page: PageContext, invite: Option<InviteResponse>) -> Response {
    let members = match users::list(&current.client).await {
        Ok(list) => list.into_results(),
        Err(e) => {
            error!(error = %e, "Failed to load users");
            page = page.with_error("Failed to load users");
            Vec::new()
        }
    };

    UsersTemplate {
        page,
        members,
        roles: [UserRole::Developer, UserRole::Admin],
        invite,
        current_user_id: current.user.id,
    }
    .into_response()
}

/// Invite a member. The invite link is shown on the page that follows, in
/// case the email does not arrive.
#[instrument(skip_all, fields(email = %form.email))]
pub async fn invite(RequireAdmin(current): RequireAdmin, Form(form): Form<InviteForm>) -> Response {
    let request = match form.into_request() {
        Ok(request) => request,
        Err(message) => return redirect_with(LIST_PATH, Flash::Error, &message).into_response(),
    };

    match users::invite(&current.client, &request).await {
        Ok(response) => {
            info!(role = %request.role, "Invitation sent");
            let mut messages = MessageQuery {
                success: Some(response.detail.clone()).filter(|d| !d.is_empty()),
                ..MessageQuery::default()
            };
            if let Some(warning) = &response.warning {
                warn!(warning = %warning, "Invitation created with a warning");
                messages.warning = Some(warning.clone());
            }
            let page = PageContext::new(&current, LIST_PATH, messages);
            render(&current, page, Some(response)).await
        }
        Err(e) => {
            error!(error = %e, "Failed to send invite");
            redirect_with(LIST_PATH, Flash::Error, &failure_message("Failed to send invite", &e))
                .into_response()
        }
    }
}

/// Update a member's profile fields and role.
#[instrument(skip(current, form))]
pub async fn update(
    RequireAdmin(current): RequireAdmin,
    Path(id): Path<UserId>,
    Form(form): Form<MemberForm>,
) -> Response {
    let patch = match form.into_patch() {
        Ok(patch) => patch,
        Err(message) => return redirect_with(LIST_PATH, Flash::Error, &message).into_response(),
    };

    match users::update(&current.client, id, &patch).await {
        Ok(_) => {
            info!(user_id = %id, "User updated");
            redirect_with(LIST_PATH, Flash::Success, "User updated").into_response()
        }
        Err(e) => {
            error!(user_id = %id, error = %e, "Failed to update user");
            redirect_with(LIST_PATH, Flash::Error, &failure_message("Failed to update user", &e))
                .into_response()
        }
    }
}

/// Remove a member. Admins cannot remove themselves.
#[instrument(skip(current))]
pub async fn delete(RequireAdmin(current): RequireAdmin, Path(id): Path<UserId>) -> Response {
    if id == current.user.id {
        return redirect_with(LIST_PATH, Flash::Error, "You cannot remove yourself").into_response();
    }

    match users::delete(&current.client, id).await {
        Ok(()) => {
            info!(user_id = %id, "User removed");
            redirect_with(LIST_PATH, Flash::Success, "User removed").into_response()
        }
        Err(e) => {
            error!(user_id = %id, error = %e, "Failed to remove user");
            redirect_with(LIST_PATH, Flash::Error, &failure_message("Failed to remove user", &e))
                .into_response()
        }
    }
}
