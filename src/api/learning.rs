//! Learner endpoints.

use crate::{
    api::{
        AppState,
        extract::{CurrentUser, Json, Path},
    },
    core::{
        enrollment::{self, EnrollmentSummary},
        video::{self, SignedUrl},
    },
    entities::enrollment::Model as EnrollmentModel,
    errors::Result,
};
use axum::extract::State;
use chrono::Utc;
use serde::Deserialize;

pub async fn list_enrollments(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
) -> Result<Json<Vec<EnrollmentSummary>>> {
    Ok(Json(enrollment::list_enrollments_for_user(&state.db, current.id).await?))
}

pub async fn complete_lesson(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    Path(lesson_id): Path<i64>,
) -> Result<Json<EnrollmentModel>> {
    Ok(Json(enrollment::complete_lesson(&state.db, current.id, lesson_id).await?))
}

pub async fn lesson_video(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    Path(lesson_id): Path<i64>,
) -> Result<Json<SignedUrl>> {
    let signed = video::lesson_video_url(&state.db, &state.signer, &current, lesson_id, Utc::now()).await?;
    Ok(Json(signed))
}

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    /// Storage key the file will be written to
    pub key: String,
}

pub async fn create_upload(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    Json(req): Json<UploadRequest>,
) -> Result<Json<SignedUrl>> {
    Ok(Json(video::upload_url(&state.signer, &current, &req.key, Utc::now())?))
}
