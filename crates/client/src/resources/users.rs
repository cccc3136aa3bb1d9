//! Organization members. Admin only on the API side.

use tracing::instrument;
use xyno_core::{InviteRequest, InviteResponse, ManagedUser, MemberPatch, Paginated, UserId};

use crate::error::ApiError;
use crate::http::{ApiClient, ApiRequest};

/// # Errors
///
/// Returns an error if the request fails.
#[instrument(skip(client))]
pub async fn list(client: &ApiClient) -> Result<Paginated<ManagedUser>, ApiError> {
    client.fetch(ApiRequest::get("auth/users/")).await
}

/// # Errors
///
/// Returns an error if the request fails.
#[instrument(skip(client, patch))]
pub async fn update(client: &ApiClient, id: UserId, patch: &MemberPatch) -> Result<ManagedUser, ApiError> {
    client
        .fetch(ApiRequest::patch(format!("auth/users/{id}/")).json(patch)?)
        .await
}

/// # Errors
///
/// Returns an error if the request fails.
#[instrument(skip(client))]
pub async fn delete(client: &ApiClient, id: UserId) -> Result<(), ApiError> {
    client
        .send(ApiRequest::delete(format!("auth/users/{id}/")))
        .await
}

/// Invite a member. The response carries the set-password link; `warning`
/// is set when the invitation email could not be sent.
///
/// # Errors
///
/// Returns an error if the request fails.
#[instrument(skip(client, invite), fields(email = %invite.email, role = %invite.role))]
pub async fn invite(client: &ApiClient, invite: &InviteRequest) -> Result<InviteResponse, ApiError> {
    client
        .fetch(ApiRequest::post("auth/users/invite/").json(invite)?)
        .await
}
