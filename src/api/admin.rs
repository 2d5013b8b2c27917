//! Admin dashboard endpoints. Every handler requires [`AdminUser`].

use crate::{
    api::{
        AppState,
        extract::{AdminUser, Json, Path, Query},
    },
    core::{
        dashboard::{self, AdminStats, PaymentSummary},
        system_log, user,
    },
    entities::{
        system_log::{LogLevel, Model as SystemLogModel},
        user::{Model as UserModel, Role},
    },
    errors::{Error, Result},
};
use axum::extract::State;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

/// Upper bound on list endpoints
const MAX_LIMIT: u64 = 500;

pub async fn stats(State(state): State<AppState>, AdminUser(_admin): AdminUser) -> Result<Json<AdminStats>> {
    Ok(Json(dashboard::admin_stats(&state.db, Utc::now()).await?))
}

pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<Vec<UserModel>>> {
    Ok(Json(user::list_users(&state.db).await?))
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: Role,
}

pub async fn set_role(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<i64>,
    Json(req): Json<RoleRequest>,
) -> Result<Json<UserModel>> {
    let updated = user::set_user_role(&state.db, user_id, req.role).await?;
    tracing::info!(admin_id = admin.id, user_id, role = ?req.role, "Changed user role");
    Ok(Json(updated))
}

#[derive(Debug, Deserialize)]
pub struct LogQuery {
    pub limit: Option<u64>,
    pub level: Option<LogLevel>,
}

pub async fn list_logs(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<LogQuery>,
) -> Result<Json<Vec<SystemLogModel>>> {
    let limit = query.limit.unwrap_or(100).min(MAX_LIMIT);
    Ok(Json(system_log::list_recent(&state.db, limit, query.level).await?))
}

#[derive(Debug, Deserialize)]
pub struct PurgeQuery {
    /// Entries older than this many days are removed
    pub older_than_days: i64,
}

#[derive(Debug, Serialize)]
pub struct PurgeResponse {
    pub removed: u64,
}

pub async fn purge_logs(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Query(query): Query<PurgeQuery>,
) -> Result<Json<PurgeResponse>> {
    if query.older_than_days < 1 {
        return Err(Error::validation("older_than_days", "must be at least 1"));
    }
    let cutoff = Utc::now() - Duration::days(query.older_than_days);
    let removed = system_log::purge_older_than(&state.db, cutoff).await?;
    tracing::info!(admin_id = admin.id, removed, "Purged system logs");
    Ok(Json(PurgeResponse { removed }))
}

#[derive(Debug, Deserialize)]
pub struct PaymentQuery {
    pub limit: Option<u64>,
}

pub async fn list_payments(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<PaymentQuery>,
) -> Result<Json<Vec<PaymentSummary>>> {
    let limit = query.limit.unwrap_or(50).min(MAX_LIMIT);
    Ok(Json(dashboard::recent_payments(&state.db, limit).await?))
}
