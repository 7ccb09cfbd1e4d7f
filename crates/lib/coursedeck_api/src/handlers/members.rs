//! Admin member management: the two operations the authorization gate
//! protects. Both run behind the admin route guard, which injects the
//! caller's fresh identity.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use coursedeck_core::models::Role;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::guard::CurrentUser;

#[derive(Debug, Serialize)]
pub struct MemberResponse {
    pub id: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct RoleUpdateRequest {
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

/// `DELETE /admin/members/{id}` — remove a member.
///
/// Deleting your own account is forbidden regardless of role.
pub async fn delete_member_handler(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> AppResult<Json<DeleteResponse>> {
    if caller.id == id {
        return Err(AppError::Forbidden("Cannot delete your own account".into()));
    }
    let target = state
        .users
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No member with id {id}")))?;

    state.users.delete(&id).await?;
    info!(admin = %caller.email, deleted = %target.identity.email, "member deleted");
    Ok(Json(DeleteResponse { deleted: true }))
}

/// `PUT /admin/members/{id}/role` — change a member's role.
///
/// Revoking your own admin role is forbidden (no self-lockout).
pub async fn update_member_role_handler(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(body): Json<RoleUpdateRequest>,
) -> AppResult<Json<MemberResponse>> {
    if caller.id == id && body.role != Role::Admin {
        return Err(AppError::Forbidden(
            "Cannot revoke your own admin role".into(),
        ));
    }
    let target = state
        .users
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No member with id {id}")))?;

    state.users.set_role(&id, body.role).await?;
    info!(
        admin = %caller.email,
        member = %target.identity.email,
        role = body.role.as_str(),
        "member role updated"
    );
    Ok(Json(MemberResponse {
        id: target.identity.id,
        email: target.identity.email,
        role: body.role,
    }))
}
