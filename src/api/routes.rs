use crate::{
    api::{AppState, account, admin, catalog, commerce, extract::USER_ID_HEADER, learning, pages},
    core::system_log,
    entities::system_log::LogLevel,
};
use axum::{
    Router,
    extract::{Request, State},
    http::{HeaderName, Method, StatusCode, header::CONTENT_TYPE},
    middleware::{Next, from_fn_with_state},
    response::Response,
    routing::{delete, get, post, put},
};
use serde_json::json;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Builds the full application router.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(USER_ID_HEADER)])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/api/health", get(pages::health))
        .route("/api/auth/sync", post(account::sync_user))
        .route("/api/me", get(account::me))
        // Catalogue
        .route("/api/categories", get(catalog::list_categories).post(catalog::create_category))
        .route(
            "/api/categories/{id}",
            put(catalog::update_category).delete(catalog::delete_category),
        )
        .route("/api/courses", get(catalog::list_courses).post(catalog::create_course))
        .route(
            "/api/courses/{id}",
            get(catalog::get_course)
                .put(catalog::update_course)
                .delete(catalog::delete_course),
        )
        .route("/api/courses/{id}/publish", post(catalog::publish_course))
        .route("/api/courses/{id}/modules", post(catalog::add_module))
        .route("/api/courses/{id}/modules/order", put(catalog::reorder_modules))
        .route("/api/modules/{id}", delete(catalog::delete_module))
        .route("/api/modules/{id}/lessons", post(catalog::add_lesson))
        .route("/api/modules/{id}/lessons/order", put(catalog::reorder_lessons))
        .route("/api/lessons/{id}", delete(catalog::delete_lesson))
        // Learning
        .route("/api/enrollments", get(learning::list_enrollments))
        .route("/api/lessons/{id}/complete", post(learning::complete_lesson))
        .route("/api/lessons/{id}/video", get(learning::lesson_video))
        .route("/api/uploads", post(learning::create_upload))
        // Commerce
        .route("/api/checkout", post(commerce::start_checkout))
        .route("/api/webhooks/payments", post(commerce::payment_webhook))
        .route("/api/invoices", get(commerce::list_invoices))
        .route("/api/subscription", get(commerce::get_subscription))
        // Account
        .route("/api/notifications", get(account::list_notifications))
        .route("/api/notifications/read-all", post(account::mark_all_notifications_read))
        .route("/api/notifications/{id}", delete(account::delete_notification))
        .route("/api/notifications/{id}/read", post(account::mark_notification_read))
        .route("/api/theme", get(account::get_theme).put(account::update_theme))
        .route("/api/ai/chat", post(account::chat))
        // Admin
        .route("/api/admin/stats", get(admin::stats))
        .route("/api/admin/users", get(admin::list_users))
        .route("/api/admin/users/{id}/role", put(admin::set_role))
        .route("/api/admin/logs", get(admin::list_logs).delete(admin::purge_logs))
        .route("/api/admin/payments", get(admin::list_payments))
        // Pages
        .route("/theme.css", get(pages::theme_css))
        .route("/privacy", get(pages::privacy))
        .route("/terms", get(pages::terms))
        .route("/refunds", get(pages::refunds))
        .layer(from_fn_with_state(state.clone(), record_server_errors))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Persists every 500 to `system_logs` so it shows on the admin dashboard.
async fn record_server_errors(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let response = next.run(request).await;

    if response.status() == StatusCode::INTERNAL_SERVER_ERROR {
        let context = json!({ "method": method.as_str(), "path": path });
        if let Err(e) = system_log::record(
            &state.db,
            LogLevel::Error,
            "http",
            &format!("{method} {path} failed"),
            Some(context),
        )
        .await
        {
            tracing::error!("Failed to persist server error: {}", e);
        }
    }
    response
}
