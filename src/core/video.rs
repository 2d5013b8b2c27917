//! Video business logic - Time-limited storage URLs for lesson media.
//!
//! Objects are never public. Every read or upload goes through a URL carrying
//! `expires` (unix seconds) and an HMAC over `"{METHOD}\n{key}\n{expires}"`,
//! which the storage edge checks with the same key.

use crate::{
    core::{course, curriculum, enrollment},
    entities::user::{self, Role},
    errors::{Error, Result},
    integrations::signing::{hmac_sha256_hex, verify_hmac_sha256_hex},
};
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use serde::Serialize;

/// HTTP verbs a signed URL can be issued for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
}

impl Method {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
        }
    }
}

/// A signed URL handed to the browser
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedUrl {
    /// Full URL including the signature
    pub url: String,
    /// Unix time after which the URL is rejected
    pub expires_at: i64,
}

/// Signs and verifies storage URLs
#[derive(Clone)]
pub struct UrlSigner {
    base_url: String,
    key: Vec<u8>,
    ttl_secs: i64,
}

impl std::fmt::Debug for UrlSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlSigner")
            .field("base_url", &self.base_url)
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

fn check_object_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && !key.starts_with('/')
        && !key.split('/').any(|part| part.is_empty() || part == "." || part == "..")
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/'));
    if valid {
        Ok(())
    } else {
        Err(Error::validation("key", "must be a relative path of [A-Za-z0-9._-] segments"))
    }
}

impl UrlSigner {
    #[must_use]
    pub fn new(base_url: &str, key: &str, ttl_secs: i64) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            key: key.as_bytes().to_vec(),
            ttl_secs,
        }
    }

    /// Hex signature for one object, verb and expiry.
    #[must_use]
    pub fn sign(&self, method: Method, key: &str, expires_at: i64) -> String {
        hmac_sha256_hex(&self.key, signing_payload(method, key, expires_at).as_bytes())
    }

    /// Issues a URL valid for the configured lifetime from `now`.
    pub fn signed_url(&self, method: Method, key: &str, now: DateTime<Utc>) -> Result<SignedUrl> {
        check_object_key(key)?;
        let expires_at = now.timestamp() + self.ttl_secs;
        let signature = self.sign(method, key, expires_at);
        Ok(SignedUrl {
            url: format!(
                "{}/{key}?expires={expires_at}&signature={signature}",
                self.base_url
            ),
            expires_at,
        })
    }

    /// Checks a signature presented back to us.
    #[must_use]
    pub fn verify(
        &self,
        method: Method,
        key: &str,
        expires_at: i64,
        signature: &str,
        now: DateTime<Utc>,
    ) -> bool {
        if now.timestamp() > expires_at {
            return false;
        }
        let payload = signing_payload(method, key, expires_at);
        verify_hmac_sha256_hex(&self.key, payload.as_bytes(), signature)
    }
}

fn signing_payload(method: Method, key: &str, expires_at: i64) -> String {
    format!("{}\n{key}\n{expires_at}", method.as_str())
}

/// Returns a playback URL for a lesson's video if the user may watch it.
///
/// Free previews of published courses are open to everyone; otherwise the
/// viewer must be enrolled, an admin, or the course's instructor.
pub async fn lesson_video_url(
    db: &DatabaseConnection,
    signer: &UrlSigner,
    viewer: &user::Model,
    lesson_id: i64,
    now: DateTime<Utc>,
) -> Result<SignedUrl> {
    let lesson = curriculum::get_lesson_by_id(db, lesson_id)
        .await?
        .ok_or_else(|| Error::not_found("lesson", lesson_id))?;
    let video_key = lesson
        .video_key
        .as_deref()
        .ok_or_else(|| Error::not_found("video", lesson_id))?;

    let allowed = if viewer.role == Role::Admin {
        true
    } else {
        let course_id = curriculum::course_id_for_lesson(db, lesson_id).await?;
        let course = course::get_course_by_id(db, course_id)
            .await?
            .ok_or_else(|| Error::not_found("course", course_id))?;
        // Drafts stay private to their instructor, previews included
        let previewable = lesson.is_free_preview && course.is_published;
        previewable
            || course.instructor_id == viewer.id
            || enrollment::is_enrolled(db, viewer.id, course_id).await?
    };
    if !allowed {
        return Err(Error::forbidden("enroll in this course to watch the lesson"));
    }

    tracing::debug!(user_id = viewer.id, lesson_id, "Issued video URL");
    signer.signed_url(Method::Get, video_key, now)
}

/// Issues a `PUT` URL so an instructor or admin can upload directly to storage.
pub fn upload_url(
    signer: &UrlSigner,
    uploader: &user::Model,
    key: &str,
    now: DateTime<Utc>,
) -> Result<SignedUrl> {
    if !uploader.role.can_upload() {
        return Err(Error::forbidden("only instructors and admins can upload"));
    }
    signer.signed_url(Method::Put, key, now)
}
