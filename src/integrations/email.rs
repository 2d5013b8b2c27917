//! Transactional email.
//!
//! Messages are rendered here and handed to a [`Mailer`]. Production uses the
//! provider's JSON API; without an API key the server falls back to
//! [`LogMailer`], which only traces what would have been sent.

use crate::errors::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;

/// A rendered message ready to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    /// Recipient address
    pub to: String,
    /// Subject line
    pub subject: String,
    /// HTML body
    pub html: String,
}

/// Delivers rendered messages.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Sends one message.
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Mailer backed by the provider's `POST /emails` endpoint
#[derive(Debug, Clone)]
pub struct HttpMailer {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    from: String,
}

#[derive(Debug, Serialize)]
struct SendEmailBody<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

impl HttpMailer {
    #[must_use]
    pub fn new(api_base: &str, api_key: &str, from: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            from: from.to_string(),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let body = SendEmailBody {
            from: &self.from,
            to: [&message.to],
            subject: &message.subject,
            html: &message.html,
        };

        let response = self
            .client
            .post(format!("{}/emails", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Email {
                message: format!("provider returned {status}: {detail}"),
            });
        }

        tracing::info!("Sent '{}' email", message.subject);
        Ok(())
    }
}

/// Mailer used when no provider is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        tracing::info!(
            to = %message.to,
            "Email delivery disabled, dropping '{}'",
            message.subject
        );
        Ok(())
    }
}

/// Escapes text for inclusion in an HTML body.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Formats minor units as `12.34 USD`.
#[must_use]
pub fn format_amount(amount_cents: i64, currency: &str) -> String {
    let sign = if amount_cents < 0 { "-" } else { "" };
    let abs = amount_cents.unsigned_abs();
    format!("{sign}{}.{:02} {}", abs / 100, abs % 100, currency.to_uppercase())
}

fn layout(heading: &str, body: &str) -> String {
    format!(
        "<!doctype html><html><body style=\"font-family:sans-serif\">\
         <h1>{}</h1>{body}</body></html>",
        escape_html(heading)
    )
}

pub fn welcome(to: &str, name: &str, dashboard_url: &str) -> EmailMessage {
    let body = format!(
        "<p>Hi {}, your account is ready.</p><p><a href=\"{}\">Go to your dashboard</a></p>",
        escape_html(name),
        escape_html(dashboard_url)
    );
    EmailMessage {
        to: to.to_string(),
        subject: "Welcome aboard".to_string(),
        html: layout("Welcome", &body),
    }
}

pub fn enrollment_confirmation(to: &str, course_titles: &[String], dashboard_url: &str) -> EmailMessage {
    let items: String = course_titles
        .iter()
        .map(|t| format!("<li>{}</li>", escape_html(t)))
        .collect();
    let body = format!(
        "<p>You now have access to:</p><ul>{items}</ul><p><a href=\"{}\">Start learning</a></p>",
        escape_html(dashboard_url)
    );
    EmailMessage {
        to: to.to_string(),
        subject: "You're enrolled".to_string(),
        html: layout("Enrollment confirmed", &body),
    }
}

pub fn payment_receipt(
    to: &str,
    invoice_number: &str,
    amount_cents: i64,
    currency: &str,
    invoice_url: &str,
) -> EmailMessage {
    let body = format!(
        "<p>We received your payment of <strong>{}</strong>.</p>\
         <p>Invoice {}: <a href=\"{}\">view online</a></p>",
        format_amount(amount_cents, currency),
        escape_html(invoice_number),
        escape_html(invoice_url)
    );
    EmailMessage {
        to: to.to_string(),
        subject: format!("Receipt {invoice_number}"),
        html: layout("Payment received", &body),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(1234, "usd"), "12.34 USD");
        assert_eq!(format_amount(5, "EUR"), "0.05 EUR");
        assert_eq!(format_amount(0, "USD"), "0.00 USD");
        assert_eq!(format_amount(-250, "USD"), "-2.50 USD");
    }

    #[test]
    fn test_templates_escape_user_input() {
        let msg = welcome("a@example.com", "<script>x</script>", "https://x.test/dashboard");
        assert!(msg.html.contains("&lt;script&gt;x&lt;/script&gt;"));
        assert!(!msg.html.contains("<script>"));

        let msg = enrollment_confirmation(
            "a@example.com",
            &["Rust & Friends".to_string(), "Go".to_string()],
            "https://x.test/dashboard",
        );
        assert!(msg.html.contains("<li>Rust &amp; Friends</li><li>Go</li>"));
    }

    #[test]
    fn test_payment_receipt() {
        let msg = payment_receipt("a@example.com", "INV-2026-000001", 4900, "usd", "https://x.test/i/1");
        assert_eq!(msg.subject, "Receipt INV-2026-000001");
        assert!(msg.html.contains("49.00 USD"));
        assert!(msg.html.contains("INV-2026-000001"));
    }

    #[tokio::test]
    async fn test_http_mailer_posts_to_provider() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/emails")
                .header("authorization", "Bearer re_test")
                .json_body(json!({
                    "from": "Courses <noreply@example.com>",
                    "to": ["a@example.com"],
                    "subject": "Hello",
                    "html": "<p>hi</p>"
                }));
            then.status(200).json_body(json!({"id": "email_1"}));
        });

        let mailer = HttpMailer::new(&server.base_url(), "re_test", "Courses <noreply@example.com>");
        let message = EmailMessage {
            to: "a@example.com".to_string(),
            subject: "Hello".to_string(),
            html: "<p>hi</p>".to_string(),
        };
        mailer.send(&message).await.unwrap();
        mock.assert();
    }

    #[tokio::test]
    async fn test_http_mailer_reports_failure() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/emails");
            then.status(422).body("invalid from");
        });

        let mailer = HttpMailer::new(&server.base_url(), "re_test", "bad");
        let message = EmailMessage {
            to: "a@example.com".to_string(),
            subject: "Hello".to_string(),
            html: String::new(),
        };
        let err = mailer.send(&message).await.unwrap_err();
        assert!(matches!(err, Error::Email { ref message } if message.contains("422")));
    }
}
