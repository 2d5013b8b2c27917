//! Hosted checkout provider.
//!
//! The provider owns capture, retries and disputes. This module only opens
//! checkout sessions over its REST API and authenticates the webhooks it sends
//! back. The wire format follows the widely used `checkout/sessions` API:
//! form-encoded requests with bearer auth, and a `t=<unix>,v1=<hex>` signature
//! header over `"{t}.{body}"`.

use crate::{
    errors::{Error, Result},
    integrations::signing::{hmac_sha256_hex, verify_hmac_sha256_hex},
};
use async_trait::async_trait;
use serde::Deserialize;

/// One purchasable line on a checkout session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    /// Product name shown on the hosted page
    pub name: String,
    /// Price in minor units
    pub unit_amount_cents: i64,
}

/// Everything the provider needs to open a session
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    /// Prefilled customer email
    pub customer_email: String,
    /// Our user id, echoed back on the completed session
    pub client_reference_id: String,
    /// ISO 4217 code shared by all items
    pub currency: String,
    /// Items to charge
    pub line_items: Vec<LineItem>,
    /// Redirect after payment
    pub success_url: String,
    /// Redirect when the customer backs out
    pub cancel_url: String,
    /// Extra key/value pairs stored on the session
    pub metadata: Vec<(String, String)>,
}

/// A session opened by the provider
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckoutSession {
    /// Session id, used to match the webhook later
    pub id: String,
    /// Hosted page to redirect the browser to
    pub url: String,
}

/// Opens hosted checkout sessions.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a session for the given items.
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession>;
}

/// REST client for the hosted checkout provider
#[derive(Debug, Clone)]
pub struct HostedCheckoutGateway {
    client: reqwest::Client,
    api_base: String,
    secret_key: String,
}

impl HostedCheckoutGateway {
    /// Creates a client for `api_base` authenticating with `secret_key`.
    #[must_use]
    pub fn new(api_base: &str, secret_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    error: ProviderError,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    message: String,
}

/// Flattens a request into the provider's bracketed form encoding.
#[must_use]
pub fn form_fields(request: &CheckoutRequest) -> Vec<(String, String)> {
    let currency = request.currency.to_ascii_lowercase();
    let mut fields = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
        ("client_reference_id".to_string(), request.client_reference_id.clone()),
        ("customer_email".to_string(), request.customer_email.clone()),
    ];

    for (i, item) in request.line_items.iter().enumerate() {
        let prefix = format!("line_items[{i}]");
        fields.push((format!("{prefix}[quantity]"), "1".to_string()));
        fields.push((format!("{prefix}[price_data][currency]"), currency.clone()));
        fields.push((
            format!("{prefix}[price_data][unit_amount]"),
            item.unit_amount_cents.to_string(),
        ));
        fields.push((
            format!("{prefix}[price_data][product_data][name]"),
            item.name.clone(),
        ));
    }

    for (key, value) in &request.metadata {
        fields.push((format!("metadata[{key}]"), value.clone()));
    }
    fields
}

#[async_trait]
impl PaymentGateway for HostedCheckoutGateway {
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession> {
        let url = format!("{}/v1/checkout/sessions", self.api_base);
        tracing::debug!(items = request.line_items.len(), "Creating checkout session");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.secret_key)
            .form(&form_fields(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ProviderErrorBody>(&body)
                .map_or_else(|_| format!("provider returned {status}"), |b| b.error.message);
            tracing::warn!(%status, "Checkout session rejected: {}", message);
            return Err(Error::Payment { message });
        }

        Ok(response.json::<CheckoutSession>().await?)
    }
}

/// A verified webhook event
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    /// Provider event id
    pub id: String,
    /// Event type, e.g. `checkout.session.completed`
    #[serde(rename = "type")]
    pub event_type: String,
    /// Event payload
    pub data: WebhookData,
}

/// Wrapper around the object the event is about
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookData {
    /// The session, charge or subscription as JSON
    pub object: serde_json::Value,
}

/// Builds a signature header for `payload`, as the provider would.
#[must_use]
pub fn sign_webhook(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let signed = signed_payload(payload, timestamp);
    format!("t={timestamp},v1={}", hmac_sha256_hex(secret.as_bytes(), &signed))
}

fn signed_payload(payload: &[u8], timestamp: i64) -> Vec<u8> {
    let mut signed = format!("{timestamp}.").into_bytes();
    signed.extend_from_slice(payload);
    signed
}

/// Authenticates a webhook body against its signature header and parses it.
///
/// Any of several `v1` signatures may match (the provider sends more than one
/// while secrets are rotated). Timestamps further than `tolerance_secs` from
/// `now` are rejected to stop replays.
pub fn verify_webhook(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
    now: i64,
    tolerance_secs: i64,
) -> Result<WebhookEvent> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(Error::InvalidSignature)?;
    if signatures.is_empty() || now.abs_diff(timestamp) > tolerance_secs.unsigned_abs() {
        return Err(Error::InvalidSignature);
    }

    let signed = signed_payload(payload, timestamp);
    let matched = signatures
        .iter()
        .any(|sig| verify_hmac_sha256_hex(secret.as_bytes(), &signed, sig));
    if !matched {
        return Err(Error::InvalidSignature);
    }

    Ok(serde_json::from_slice(payload)?)
}
