//! Caller identity.
//!
//! Sessions live in the upstream auth provider, which forwards the signed-in
//! user's id in `x-user-id`. The extractors here turn that header into a user
//! row and enforce roles.

use crate::{
    api::AppState,
    core::user,
    entities::user::{Model as UserModel, Role},
    errors::Error,
};
use axum::{
    extract::{FromRequest, FromRequestParts},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Header carrying the authenticated user's id
pub const USER_ID_HEADER: &str = "x-user-id";

/// Any signed-in user
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserModel);

/// A signed-in user with the admin role
#[derive(Debug, Clone)]
pub struct AdminUser(pub UserModel);

/// A signed-in user if the header is present and valid
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<UserModel>);

async fn load_user(parts: &Parts, state: &AppState) -> Result<Option<UserModel>, Error> {
    let Some(raw) = parts.headers.get(USER_ID_HEADER) else {
        return Ok(None);
    };
    let Some(user_id) = raw.to_str().ok().and_then(|v| v.trim().parse::<i64>().ok()) else {
        return Ok(None);
    };
    user::get_user_by_id(&state.db, user_id).await
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        load_user(parts, state)
            .await?
            .map(Self)
            .ok_or(Error::Unauthorized)
    }
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(current) = CurrentUser::from_request_parts(parts, state).await?;
        if current.role != Role::Admin {
            return Err(Error::forbidden("admin role required"));
        }
        Ok(Self(current))
    }
}

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(Self(load_user(parts, state).await?))
    }
}

/// JSON body. Malformed input is answered with the usual validation error
/// body instead of axum's plain-text rejection.
#[derive(Debug, Clone, Copy, Default, FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// Query string, rejected as a validation error
#[derive(Debug, Clone, Copy, Default, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(Error))]
pub struct Query<T>(pub T);

/// Path parameters, rejected as a validation error
#[derive(Debug, Clone, Copy, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(Error))]
pub struct Path<T>(pub T);
