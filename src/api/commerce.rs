//! Purchase endpoints and the payment provider's webhook.

use crate::{
    api::{
        AppState,
        extract::{CurrentUser, Json},
    },
    core::{
        checkout::{self, CheckoutOutcome},
        invoice, subscription, system_log,
    },
    entities::{invoice::Model as InvoiceModel, subscription::Model as SubscriptionModel, system_log::LogLevel},
    errors::{Error, Result},
    integrations::payments,
};
use axum::{body::Bytes, extract::State, http::HeaderMap};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Header the provider signs webhook deliveries with
pub const SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, Deserialize)]
pub struct CheckoutBody {
    pub course_ids: Vec<i64>,
}

pub async fn start_checkout(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
    Json(req): Json<CheckoutBody>,
) -> Result<Json<CheckoutOutcome>> {
    let outcome = checkout::start_checkout(
        &state.db,
        state.gateway.as_ref(),
        &state.config,
        &current,
        &req.course_ids,
    )
    .await?;
    Ok(Json(outcome))
}

/// Receives provider events. The body is read raw because the signature
/// covers the exact bytes.
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let event = match payments::verify_webhook(
        &body,
        signature,
        &state.secrets.payment_webhook_secret,
        Utc::now().timestamp(),
        state.config.payments.webhook_tolerance_secs,
    ) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!("Rejected webhook: {}", e);
            system_log::record(&state.db, LogLevel::Warn, "webhook", "Rejected webhook delivery", Some(json!({ "error": e.to_string() })))
                .await?;
            return Err(match e {
                Error::Json(_) => Error::validation("body", "not a valid event"),
                other => other,
            });
        }
    };

    if let Err(e) = checkout::handle_webhook(&state.db, state.mailer.as_ref(), &state.config, &event).await {
        tracing::error!(event_id = %event.id, "Webhook {} failed: {}", event.event_type, e);
        system_log::record(
            &state.db,
            LogLevel::Error,
            "webhook",
            &format!("Failed to handle {}", event.event_type),
            Some(json!({ "event_id": event.id, "error": e.to_string() })),
        )
        .await?;
        return Err(e);
    }

    Ok(Json(json!({ "received": true })))
}

pub async fn list_invoices(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
) -> Result<Json<Vec<InvoiceModel>>> {
    Ok(Json(invoice::list_invoices_for_user(&state.db, current.id).await?))
}

#[derive(Debug, Serialize)]
pub struct SubscriptionStatusBody {
    pub active: bool,
    pub subscription: Option<SubscriptionModel>,
}

pub async fn get_subscription(
    State(state): State<AppState>,
    CurrentUser(current): CurrentUser,
) -> Result<Json<SubscriptionStatusBody>> {
    let found = subscription::get_active_subscription(&state.db, current.id, Utc::now()).await?;
    Ok(Json(SubscriptionStatusBody {
        active: found.is_some(),
        subscription: found,
    }))
}
