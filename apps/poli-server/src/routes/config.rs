//! Restaurant-wide settings. SYSADMIN only.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::auth::Authenticated;
use crate::error::ApiResult;
use crate::state::AppState;
use poli_core::{BackupInfo, SystemConfig};
use poli_db::AuditAction;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/config", get(get_config).put(update_config))
        .route("/api/config/backup", post(create_backup))
}

async fn get_config(State(state): State<AppState>, caller: Authenticated) -> ApiResult<Json<SystemConfig>> {
    caller.require_sysadmin("read system configuration")?;
    Ok(Json(state.db.system_config().get().await?))
}

async fn update_config(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    body: Result<Json<SystemConfig>, JsonRejection>,
) -> ApiResult<Json<SystemConfig>> {
    let Json(config) = body?;
    let updated = state.db.system_config().update(&caller, config).await?;

    state
        .audit(
            &caller,
            AuditAction::UpdateConfig,
            "system_config",
            "system",
            Some(&updated.before),
            Some(&updated.after),
        )
        .await;

    Ok(Json(updated.after))
}

async fn create_backup(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
) -> ApiResult<(StatusCode, Json<BackupInfo>)> {
    let backup = state
        .db
        .backups()
        .create(&caller, &state.config.backup.directory)
        .await?;

    state
        .audit(
            &caller,
            AuditAction::CreateBackup,
            "backup",
            &backup.file_name,
            None,
            Some(&backup),
        )
        .await;

    Ok((StatusCode::CREATED, Json(backup)))
}
