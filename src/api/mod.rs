//! HTTP surface.
//!
//! Handlers stay thin: parse the request, check the caller's role, call into
//! [`crate::core`] and serialise the result. Errors become JSON responses in
//! [`error`].

/// Account endpoints: login sync, notifications, theme, assistant
pub mod account;
/// Admin dashboard endpoints
pub mod admin;
/// Categories, courses and curriculum
pub mod catalog;
/// Checkout, webhooks, invoices and subscriptions
pub mod commerce;
/// Error to response mapping
pub mod error;
/// Caller identity extractors
pub mod extract;
/// Enrollments, lesson progress and media URLs
pub mod learning;
/// Health check, policy pages and the theme stylesheet
pub mod pages;
/// Router assembly and middleware
pub mod routes;
/// Shared handler state
pub mod state;

pub use routes::build_router;
pub use state::AppState;
