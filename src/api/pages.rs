use crate::{
    api::{AppState, extract::MaybeUser},
    core::theme,
    errors::Result,
};
use axum::{
    Json,
    extract::State,
    http::header,
    response::{Html, IntoResponse},
};
use serde_json::{Value, json};

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

/// Stylesheet for the caller's theme; visitors get the default.
pub async fn theme_css(State(state): State<AppState>, MaybeUser(viewer): MaybeUser) -> Result<impl IntoResponse> {
    let settings = match viewer {
        Some(viewer) => theme::get_user_theme(&state.db, viewer.id).await?,
        None => theme::ThemeSettings::default(),
    };
    Ok((
        [
            (header::CONTENT_TYPE, "text/css; charset=utf-8"),
            (header::CACHE_CONTROL, "private, max-age=60"),
        ],
        theme::render_css(&settings),
    ))
}

fn policy_page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!doctype html><html lang=\"en\"><head><meta charset=\"utf-8\">\
         <title>{title}</title><link rel=\"stylesheet\" href=\"/theme.css\"></head>\
         <body><main><h1>{title}</h1>{body}</main></body></html>"
    ))
}

pub async fn privacy() -> Html<String> {
    policy_page(
        "Privacy Policy",
        "<p>We store your name, email address and course progress to run your account. \
         Payments are processed by our payment provider; we never see or store card numbers.</p>\
         <p>We send transactional email only: receipts, enrollment confirmations and account notices.</p>\
         <p>To delete your account and data, contact support from the email address on the account.</p>",
    )
}

pub async fn terms() -> Html<String> {
    policy_page(
        "Terms of Service",
        "<p>Purchasing a course grants you a personal, non-transferable licence to its lessons \
         for as long as the course is offered.</p>\
         <p>Sharing paid videos or signed links outside your account is not permitted.</p>\
         <p>We may update course content at any time to keep it accurate.</p>",
    )
}

pub async fn refunds() -> Html<String> {
    policy_page(
        "Refund Policy",
        "<p>You can request a full refund within 14 days of purchase.</p>\
         <p>Once a refund is processed, access to the refunded courses is removed.</p>",
    )
}
