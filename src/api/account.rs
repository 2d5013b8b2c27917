//! Per-user endpoints: login sync, inbox, appearance and the assistant.

use crate::{
    api::{
        AppState,
        extract::{CurrentUser, Json, Path, Query},
    },
    core::{
        assistant::{self, ChatReply},
        notification,
        theme::{self, ThemeSettings, ThemeUpdate},
        user,
    },
    entities::{notification::Model as NotificationModel, user::Model as UserModel},
    errors::Result,
    integrations::email,
};
use axum::{extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct SyncRequest {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub user: UserModel,
    pub created: bool,
}

/// Called by the session provider after sign-in. First logins create a
/// student account and get a welcome email.
pub async fn sync_user(
    State(state): State<AppState>,
    Json(req): Json<SyncRequest>,
) -> Result<(StatusCode, Json<SyncResponse>)> {
    let (synced, created) = user::sync_user(&state.db, &req.email, &req.name).await?;
    if !created {
        return Ok((StatusCode::OK, Json(SyncResponse { user: synced, created })));
    }

    let welcome = email::welcome(&synced.email, &synced.name, &state.config.public_link("/dashboard"));
    if let Err(e) = state.mailer.send(&welcome).await {
        tracing::warn!(user_id = synced.id, "Failed to send welcome email: {}", e);
    }
    Ok((StatusCode::CREATED, Json(SyncResponse { user: synced, created })))
}

pub async fn me(CurrentUser(current): CurrentUser) -> Json<UserModel> {
    Json(current)
}

#[derive(Debug, Default, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread: bool,
}

#[derive(Debug, Serialize)]
pub struct NotificationList {
    pub unread_count: u64,
    pub notifications: Vec<NotificationModel>,
}

pub async fn list_notifications(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<NotificationList>> {
    let notifications = notification::list_notifications(&state.db, current.id, query.unread).await?;
    let unread_count = notification::unread_count(&state.db, current.id).await?;
    Ok(Json(NotificationList {
        unread_count,
        notifications,
    }))
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    Path(notification_id): Path<i64>,
) -> Result<Json<NotificationModel>> {
    Ok(Json(notification::mark_read(&state.db, current.id, notification_id).await?))
}

#[derive(Debug, Serialize)]
pub struct MarkAllResponse {
    pub updated: u64,
}

pub async fn mark_all_notifications_read(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
) -> Result<Json<MarkAllResponse>> {
    let updated = notification::mark_all_read(&state.db, current.id).await?;
    Ok(Json(MarkAllResponse { updated }))
}

pub async fn delete_notification(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    Path(notification_id): Path<i64>,
) -> Result<StatusCode> {
    notification::delete_notification(&state.db, current.id, notification_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_theme(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
) -> Result<Json<ThemeSettings>> {
    Ok(Json(theme::get_user_theme(&state.db, current.id).await?))
}

pub async fn update_theme(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    Json(update): Json<ThemeUpdate>,
) -> Result<Json<ThemeSettings>> {
    Ok(Json(theme::set_user_theme(&state.db, current.id, update).await?))
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

pub async fn chat(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatReply>> {
    Ok(Json(assistant::reply(&state.db, current.id, &req.message).await?))
}
