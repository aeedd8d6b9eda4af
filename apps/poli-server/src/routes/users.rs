//! Staff accounts. SYSADMIN only.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use crate::auth::Authenticated;
use crate::error::ApiResult;
use crate::state::AppState;
use poli_core::{NewUser, User};
use poli_db::AuditAction;

pub(super) fn routes() -> Router<AppState> {
    Router::new().route("/api/users", get(list).post(create))
}

async fn list(State(state): State<AppState>, caller: Authenticated) -> ApiResult<Json<Vec<User>>> {
    caller.require_sysadmin("list users")?;
    Ok(Json(state.db.users().list().await?))
}

async fn create(
    State(state): State<AppState>,
    caller: Authenticated,
    body: Result<Json<NewUser>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<User>)> {
    caller.require_sysadmin("create users")?;
    let Json(new) = body?;
    let user = state.db.users().create(new).await?;

    state
        .audit(&caller.0, AuditAction::CreateUser, "users", &user.id, None, Some(&user))
        .await;

    Ok((StatusCode::CREATED, Json(user)))
}
