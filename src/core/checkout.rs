//! Checkout business logic - Hosted payment sessions and their webhooks.
//!
//! Opening a checkout only records a `pending` payment. Access is granted when
//! the provider reports `checkout.session.completed`, and webhooks may arrive
//! more than once, so every handler is safe to replay.

use crate::{
    config::AppConfig,
    core::{course, enrollment, invoice, notification, subscription, system_log, user},
    entities::{
        Course, Payment, PaymentItem, course as course_entity, notification::NotificationKind,
        payment, payment::PaymentStatus, payment_item, subscription::SubscriptionStatus,
        system_log::LogLevel,
    },
    errors::{Error, Result},
    integrations::{
        email::{self, Mailer},
        payments::{CheckoutRequest, LineItem, PaymentGateway, WebhookEvent},
    },
};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::HashSet;

/// Statuses a completed checkout may still settle from
const OPEN_STATUSES: [PaymentStatus; 3] =
    [PaymentStatus::Pending, PaymentStatus::Expired, PaymentStatus::Failed];

/// What the client should do after starting a checkout
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckoutOutcome {
    /// Nothing to pay; access was granted immediately
    Enrolled { course_ids: Vec<i64> },
    /// Send the browser to the provider's hosted page
    Redirect { url: String, session_id: String },
}

/// Finds a payment by its checkout session id.
pub async fn get_payment_by_session<C>(db: &C, session_id: &str) -> Result<Option<payment::Model>>
where
    C: ConnectionTrait,
{
    Payment::find()
        .filter(payment::Column::ProviderSessionId.eq(session_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Line items of a payment in insertion order.
pub async fn get_payment_items<C>(db: &C, payment_id: i64) -> Result<Vec<payment_item::Model>>
where
    C: ConnectionTrait,
{
    PaymentItem::find()
        .filter(payment_item::Column::PaymentId.eq(payment_id))
        .order_by_asc(payment_item::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Starts buying one or more courses.
///
/// Free baskets are enrolled straight away. Otherwise a hosted session is
/// opened and a pending payment with one item per course is stored.
pub async fn start_checkout(
    db: &DatabaseConnection,
    gateway: &dyn PaymentGateway,
    config: &AppConfig,
    buyer: &crate::entities::user::Model,
    course_ids: &[i64],
) -> Result<CheckoutOutcome> {
    let mut seen = HashSet::new();
    let course_ids: Vec<i64> = course_ids.iter().copied().filter(|id| seen.insert(*id)).collect();
    if course_ids.is_empty() {
        return Err(Error::validation("course_ids", "select at least one course"));
    }

    let mut courses = Vec::with_capacity(course_ids.len());
    for &course_id in &course_ids {
        let found = course::get_course_by_id(db, course_id)
            .await?
            .filter(|c| c.is_published)
            .ok_or_else(|| Error::not_found("course", course_id))?;
        if enrollment::is_enrolled(db, buyer.id, course_id).await? {
            return Err(Error::conflict(format!("already enrolled in '{}'", found.title)));
        }
        courses.push(found);
    }

    let currency = courses[0].currency.clone();
    if courses.iter().any(|c| c.currency != currency) {
        return Err(Error::validation("course_ids", "all courses must share one currency"));
    }
    let total: i64 = courses.iter().map(|c| c.price_cents).sum();

    if total == 0 {
        let txn = db.begin().await?;
        enrollment::enroll_many(&txn, buyer.id, &course_ids).await?;
        txn.commit().await?;
        tracing::info!(user_id = buyer.id, "Enrolled in {} free course(s)", course_ids.len());
        return Ok(CheckoutOutcome::Enrolled { course_ids });
    }

    let request = CheckoutRequest {
        customer_email: buyer.email.clone(),
        client_reference_id: buyer.id.to_string(),
        currency: currency.clone(),
        line_items: courses
            .iter()
            .map(|c| LineItem {
                name: c.title.clone(),
                unit_amount_cents: c.price_cents,
            })
            .collect(),
        success_url: format!(
            "{}?session_id={{CHECKOUT_SESSION_ID}}",
            config.public_link(&config.payments.success_path)
        ),
        cancel_url: config.public_link(&config.payments.cancel_path),
        metadata: vec![
            ("user_id".to_string(), buyer.id.to_string()),
            (
                "course_ids".to_string(),
                course_ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(","),
            ),
        ],
    };
    let session = gateway.create_checkout_session(&request).await?;

    let txn = db.begin().await?;
    let pending = payment::ActiveModel {
        user_id: Set(buyer.id),
        provider_session_id: Set(session.id.clone()),
        provider_payment_id: Set(None),
        amount_cents: Set(total),
        currency: Set(currency),
        status: Set(PaymentStatus::Pending),
        created_at: Set(Utc::now()),
        paid_at: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    for c in &courses {
        payment_item::ActiveModel {
            payment_id: Set(pending.id),
            course_id: Set(c.id),
            title: Set(c.title.clone()),
            amount_cents: Set(c.price_cents),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }
    txn.commit().await?;

    tracing::info!(
        user_id = buyer.id,
        payment_id = pending.id,
        amount_cents = total,
        "Opened checkout session {}",
        session.id
    );
    Ok(CheckoutOutcome::Redirect {
        url: session.url,
        session_id: session.id,
    })
}

fn str_field<'a>(object: &'a Value, key: &str) -> Option<&'a str> {
    object.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn required_str<'a>(object: &'a Value, key: &str) -> Result<&'a str> {
    str_field(object, key).ok_or_else(|| Error::validation("event", format!("missing data.object.{key}")))
}

/// Applies one verified provider event. Unknown event types are ignored.
pub async fn handle_webhook(
    db: &DatabaseConnection,
    mailer: &dyn Mailer,
    config: &AppConfig,
    event: &WebhookEvent,
) -> Result<()> {
    let object = &event.data.object;
    tracing::debug!(event_id = %event.id, "Handling {} event", event.event_type);

    match event.event_type.as_str() {
        "checkout.session.completed" => complete_session(db, mailer, config, object).await,
        "checkout.session.expired" => {
            let session_id = required_str(object, "id")?;
            close_pending(db, get_payment_by_session(db, session_id).await?, PaymentStatus::Expired).await
        }
        "payment_intent.payment_failed" => {
            let by_session = match object.get("metadata").and_then(|m| str_field(m, "session_id")) {
                Some(session_id) => get_payment_by_session(db, session_id).await?,
                None => None,
            };
            let found = match by_session {
                Some(found) => Some(found),
                None => match str_field(object, "id") {
                    Some(intent_id) => find_by_provider_payment(db, intent_id).await?,
                    None => None,
                },
            };
            close_pending(db, found, PaymentStatus::Failed).await
        }
        "charge.refunded" => refund(db, object).await,
        "customer.subscription.created"
        | "customer.subscription.updated"
        | "customer.subscription.deleted" => {
            subscription::upsert_subscription(db, subscription_update(object)?).await?;
            Ok(())
        }
        other => {
            tracing::debug!("Ignoring {} event", other);
            Ok(())
        }
    }
}

async fn find_by_provider_payment<C>(db: &C, provider_payment_id: &str) -> Result<Option<payment::Model>>
where
    C: ConnectionTrait,
{
    Payment::find()
        .filter(payment::Column::ProviderPaymentId.eq(provider_payment_id))
        .one(db)
        .await
        .map_err(Into::into)
}

async fn close_pending(
    db: &DatabaseConnection,
    found: Option<payment::Model>,
    status: PaymentStatus,
) -> Result<()> {
    let Some(found) = found else {
        tracing::debug!(?status, "No matching payment, ignoring");
        return Ok(());
    };
    let closed = Payment::update_many()
        .col_expr(payment::Column::Status, Expr::value(status))
        .filter(payment::Column::Id.eq(found.id))
        .filter(payment::Column::Status.eq(PaymentStatus::Pending))
        .exec(db)
        .await?;
    if closed.rows_affected == 1 {
        tracing::info!(payment_id = found.id, ?status, "Closed pending payment");
    }
    Ok(())
}

async fn complete_session(
    db: &DatabaseConnection,
    mailer: &dyn Mailer,
    config: &AppConfig,
    object: &Value,
) -> Result<()> {
    let session_id = required_str(object, "id")?;
    let found = get_payment_by_session(db, session_id)
        .await?
        .ok_or_else(|| Error::not_found("payment", session_id))?;
    let items = get_payment_items(db, found.id).await?;

    let txn = db.begin().await?;
    // Only one delivery of the event may move the payment out of an open state
    let mut settle = Payment::update_many()
        .col_expr(payment::Column::Status, Expr::value(PaymentStatus::Paid))
        .col_expr(payment::Column::PaidAt, Expr::value(Utc::now()));
    if let Some(intent_id) = str_field(object, "payment_intent") {
        settle = settle.col_expr(payment::Column::ProviderPaymentId, Expr::value(intent_id));
    }
    let settled = settle
        .filter(payment::Column::Id.eq(found.id))
        .filter(payment::Column::Status.is_in(OPEN_STATUSES))
        .exec(&txn)
        .await?;
    if settled.rows_affected != 1 {
        txn.rollback().await?;
        tracing::debug!(payment_id = found.id, "Payment already settled, skipping replay");
        return Ok(());
    }
    let paid = Payment::find_by_id(found.id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("payment", found.id))?;

    let purchased: Vec<i64> = items.iter().map(|i| i.course_id).collect();
    let available: HashSet<i64> = Course::find()
        .filter(course_entity::Column::Id.is_in(purchased.clone()))
        .all(&txn)
        .await?
        .into_iter()
        .map(|c| c.id)
        .collect();
    let (course_ids, missing): (Vec<i64>, Vec<i64>) =
        purchased.into_iter().partition(|id| available.contains(id));
    enrollment::enroll_many(&txn, paid.user_id, &course_ids).await?;
    let issued = invoice::issue_invoice(&txn, &paid).await?;
    txn.commit().await?;

    if !missing.is_empty() {
        tracing::warn!(payment_id = paid.id, ?missing, "Paid for courses that no longer exist");
        system_log::record(
            db,
            LogLevel::Warn,
            "payments",
            "Paid for courses that no longer exist",
            Some(json!({ "payment_id": paid.id, "course_ids": missing })),
        )
        .await?;
    }

    if let Some(customer_id) = str_field(object, "customer") {
        user::set_payment_customer_id(db, paid.user_id, customer_id).await?;
    }

    let titles: Vec<String> = items.into_iter().map(|i| i.title).collect();
    notification::notify(
        db,
        paid.user_id,
        NotificationKind::Payment,
        "Payment received",
        &format!("You now have access to {}.", titles.join(", ")),
        Some("/dashboard".to_string()),
    )
    .await?;
    system_log::record(
        db,
        LogLevel::Info,
        "payments",
        "Checkout completed",
        Some(json!({
            "payment_id": paid.id,
            "user_id": paid.user_id,
            "amount_cents": paid.amount_cents,
            "invoice": issued.number,
        })),
    )
    .await?;
    tracing::info!(payment_id = paid.id, user_id = paid.user_id, "Payment completed");

    if let Some(buyer) = user::get_user_by_id(db, paid.user_id).await? {
        let messages = [
            email::enrollment_confirmation(&buyer.email, &titles, &config.public_link("/dashboard")),
            email::payment_receipt(
                &buyer.email,
                &issued.number,
                issued.amount_cents,
                &issued.currency,
                &config.public_link(&format!("/invoices/{}", issued.id)),
            ),
        ];
        for message in &messages {
            // Access is already granted; a mail outage must not fail the webhook
            if let Err(e) = mailer.send(message).await {
                tracing::warn!("Failed to send '{}': {}", message.subject, e);
                system_log::record(
                    db,
                    LogLevel::Warn,
                    "email",
                    &format!("Failed to send '{}'", message.subject),
                    Some(json!({ "error": e.to_string(), "user_id": buyer.id })),
                )
                .await?;
            }
        }
    }
    Ok(())
}

async fn refund(db: &DatabaseConnection, object: &Value) -> Result<()> {
    let intent_id = str_field(object, "payment_intent")
        .or_else(|| str_field(object, "id"))
        .ok_or_else(|| Error::validation("event", "missing data.object.payment_intent"))?;
    let found = find_by_provider_payment(db, intent_id)
        .await?
        .ok_or_else(|| Error::not_found("payment", intent_id))?;
    if found.status != PaymentStatus::Paid {
        return Ok(());
    }

    let items = get_payment_items(db, found.id).await?;
    let txn = db.begin().await?;
    let reversed = Payment::update_many()
        .col_expr(payment::Column::Status, Expr::value(PaymentStatus::Refunded))
        .filter(payment::Column::Id.eq(found.id))
        .filter(payment::Column::Status.eq(PaymentStatus::Paid))
        .exec(&txn)
        .await?;
    if reversed.rows_affected != 1 {
        txn.rollback().await?;
        return Ok(());
    }
    let user_id = found.user_id;
    let refunded = payment::Model {
        status: PaymentStatus::Refunded,
        ..found
    };
    for item in &items {
        enrollment::unenroll(&txn, user_id, item.course_id).await?;
    }
    notification::notify(
        &txn,
        user_id,
        NotificationKind::Payment,
        "Refund processed",
        &format!(
            "Your payment of {} was refunded and access was removed.",
            email::format_amount(refunded.amount_cents, &refunded.currency)
        ),
        None,
    )
    .await?;
    txn.commit().await?;

    system_log::record(
        db,
        LogLevel::Info,
        "payments",
        "Payment refunded",
        Some(json!({ "payment_id": refunded.id, "user_id": user_id })),
    )
    .await?;
    tracing::info!(payment_id = refunded.id, "Payment refunded");
    Ok(())
}

fn subscription_update(object: &Value) -> Result<subscription::SubscriptionUpdate> {
    let first_item = object.pointer("/items/data/0");
    let period_end = object
        .get("current_period_end")
        .and_then(Value::as_i64)
        .or_else(|| first_item.and_then(|i| i.get("current_period_end")).and_then(Value::as_i64))
        .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
        .ok_or_else(|| Error::validation("event", "missing data.object.current_period_end"))?;
    let plan = first_item
        .and_then(|i| i.pointer("/price/id"))
        .or_else(|| object.pointer("/plan/id"))
        .and_then(Value::as_str)
        .unwrap_or("default");

    Ok(subscription::SubscriptionUpdate {
        provider_subscription_id: required_str(object, "id")?.to_string(),
        customer_id: required_str(object, "customer")?.to_string(),
        plan: plan.to_string(),
        status: SubscriptionStatus::from_provider(str_field(object, "status").unwrap_or_default()),
        current_period_end: period_end,
        cancel_at_period_end: object
            .get("cancel_at_period_end")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::invoice::list_invoices_for_user;
    use crate::core::notification::list_notifications;
    use crate::test_utils::*;
    use crate::entities::SystemLog;
    use sea_orm::PaginatorTrait;

    fn event(event_type: &str, object: Value) -> WebhookEvent {
        serde_json::from_value(json!({
            "id": "evt_test",
            "type": event_type,
            "data": { "object": object }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_start_checkout_validation() -> Result<()> {
        let (db, _instructor, course) = setup_with_course().await?;
        let buyer = create_test_user(&db, "buyer@example.com").await?;
        let gateway = FakeGateway::default();
        let config = AppConfig::default();

        let empty = start_checkout(&db, &gateway, &config, &buyer, &[]).await;
        assert!(matches!(empty, Err(Error::Validation { ref field, .. }) if field == "course_ids"));

        // Draft courses cannot be bought
        let draft = start_checkout(&db, &gateway, &config, &buyer, &[course.id]).await;
        assert!(matches!(draft, Err(Error::NotFound { .. })));
        let missing = start_checkout(&db, &gateway, &config, &buyer, &[999]).await;
        assert!(matches!(missing, Err(Error::NotFound { .. })));

        assert!(gateway.requests().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_start_checkout_rejects_owned_and_mixed_currency() -> Result<()> {
        let (db, instructor, course) = setup_with_published_course().await?;
        let buyer = create_test_user(&db, "buyer@example.com").await?;
        let gateway = FakeGateway::default();
        let config = AppConfig::default();

        enrollment::enroll(&db, buyer.id, course.id).await?;
        let owned = start_checkout(&db, &gateway, &config, &buyer, &[course.id]).await;
        assert!(matches!(owned, Err(Error::Conflict { .. })));

        let euro = create_published_course(&db, instructor.id, "Euro Course", 1000).await?;
        course::update_course(
            &db,
            euro.id,
            course::CourseUpdate {
                currency: Some("EUR".to_string()),
                ..Default::default()
            },
        )
        .await?;
        let usd = create_published_course(&db, instructor.id, "Dollar Course", 1000).await?;
        let mixed = start_checkout(&db, &gateway, &config, &buyer, &[euro.id, usd.id]).await;
        assert!(matches!(mixed, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_free_checkout_enrolls_directly() -> Result<()> {
        let (db, instructor, _course) = setup_with_published_course().await?;
        let free = create_published_course(&db, instructor.id, "Free Course", 0).await?;
        let buyer = create_test_user(&db, "buyer@example.com").await?;
        let gateway = FakeGateway::default();

        let outcome = start_checkout(&db, &gateway, &AppConfig::default(), &buyer, &[free.id, free.id]).await?;
        assert_eq!(outcome, CheckoutOutcome::Enrolled { course_ids: vec![free.id] });
        assert!(enrollment::is_enrolled(&db, buyer.id, free.id).await?);
        assert!(gateway.requests().is_empty());
        assert_eq!(Payment::find().count(&db).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_paid_checkout_opens_session() -> Result<()> {
        let (db, instructor, course) = setup_with_published_course().await?;
        let second = create_published_course(&db, instructor.id, "Async Rust", 2900).await?;
        let buyer = create_test_user(&db, "buyer@example.com").await?;
        let gateway = FakeGateway::default();
        let config = AppConfig::default();

        let outcome = start_checkout(&db, &gateway, &config, &buyer, &[course.id, second.id]).await?;
        let CheckoutOutcome::Redirect { url, session_id } = outcome else {
            panic!("expected a redirect");
        };
        assert_eq!(session_id, "cs_test_1");
        assert!(url.ends_with("cs_test_1"));

        let requests = gateway.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].customer_email, "buyer@example.com");
        assert_eq!(requests[0].line_items.len(), 2);
        assert_eq!(
            requests[0].success_url,
            "http://localhost:3000/checkout/success?session_id={CHECKOUT_SESSION_ID}"
        );

        let pending = get_payment_by_session(&db, "cs_test_1").await?.unwrap();
        assert_eq!(pending.status, PaymentStatus::Pending);
        assert_eq!(pending.amount_cents, 4900 + 2900);
        let items = get_payment_items(&db, pending.id).await?;
        assert_eq!(items.iter().map(|i| i.course_id).collect::<Vec<_>>(), vec![course.id, second.id]);

        // No access until the provider confirms
        assert!(!enrollment::is_enrolled(&db, buyer.id, course.id).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_completed_webhook_grants_access_once() -> Result<()> {
        let (db, _instructor, course) = setup_with_published_course().await?;
        let buyer = create_test_user(&db, "buyer@example.com").await?;
        let gateway = FakeGateway::default();
        let mailer = RecordingMailer::default();
        let config = AppConfig::default();
        start_checkout(&db, &gateway, &config, &buyer, &[course.id]).await?;

        let completed = event(
            "checkout.session.completed",
            json!({"id": "cs_test_1", "payment_intent": "pi_1", "customer": "cus_1"}),
        );
        handle_webhook(&db, &mailer, &config, &completed).await?;
        handle_webhook(&db, &mailer, &config, &completed).await?;

        let paid = get_payment_by_session(&db, "cs_test_1").await?.unwrap();
        assert_eq!(paid.status, PaymentStatus::Paid);
        assert_eq!(paid.provider_payment_id.as_deref(), Some("pi_1"));
        assert!(paid.paid_at.is_some());
        assert!(enrollment::is_enrolled(&db, buyer.id, course.id).await?);
        assert_eq!(list_invoices_for_user(&db, buyer.id).await?.len(), 1);
        assert_eq!(list_notifications(&db, buyer.id, false).await?.len(), 1);

        let buyer = user::get_user_by_id(&db, buyer.id).await?.unwrap();
        assert_eq!(buyer.payment_customer_id.as_deref(), Some("cus_1"));

        // Replay sent nothing extra
        let sent = mailer.messages();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|m| m.to == "buyer@example.com"));
        assert!(sent[1].html.contains("49.00 USD"));
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_completions_settle_once() -> Result<()> {
        let (db, _instructor, course) = setup_with_published_course().await?;
        let buyer = create_test_user(&db, "buyer@example.com").await?;
        let mailer = RecordingMailer::default();
        let config = AppConfig::default();
        start_checkout(&db, &FakeGateway::default(), &config, &buyer, &[course.id]).await?;

        let completed = event("checkout.session.completed", json!({"id": "cs_test_1"}));
        let (first, second) = tokio::join!(
            handle_webhook(&db, &mailer, &config, &completed),
            handle_webhook(&db, &mailer, &config, &completed),
        );
        first?;
        second?;

        assert_eq!(mailer.messages().len(), 2);
        assert_eq!(list_notifications(&db, buyer.id, false).await?.len(), 1);
        assert_eq!(list_invoices_for_user(&db, buyer.id).await?.len(), 1);
        let completions = SystemLog::find()
            .filter(crate::entities::system_log::Column::Message.eq("Checkout completed"))
            .count(&db)
            .await?;
        assert_eq!(completions, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_pending_checkout_blocks_course_deletion() -> Result<()> {
        let (db, _instructor, course) = setup_with_published_course().await?;
        let buyer = create_test_user(&db, "buyer@example.com").await?;
        let config = AppConfig::default();
        start_checkout(&db, &FakeGateway::default(), &config, &buyer, &[course.id]).await?;

        let result = course::delete_course(&db, course.id).await;
        assert!(matches!(result, Err(Error::Conflict { .. })));

        let completed = event("checkout.session.completed", json!({"id": "cs_test_1"}));
        handle_webhook(&db, &RecordingMailer::default(), &config, &completed).await?;
        assert!(enrollment::is_enrolled(&db, buyer.id, course.id).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_late_completion_skips_deleted_course() -> Result<()> {
        let (db, instructor, course) = setup_with_published_course().await?;
        let kept = create_published_course(&db, instructor.id, "Async Rust", 2900).await?;
        let buyer = create_test_user(&db, "buyer@example.com").await?;
        let mailer = RecordingMailer::default();
        let config = AppConfig::default();
        start_checkout(&db, &FakeGateway::default(), &config, &buyer, &[course.id, kept.id]).await?;

        // Session lapses, the course goes away, then the provider reports payment
        handle_webhook(&db, &mailer, &config, &event("checkout.session.expired", json!({"id": "cs_test_1"}))).await?;
        course::delete_course(&db, course.id).await?;
        handle_webhook(&db, &mailer, &config, &event("checkout.session.completed", json!({"id": "cs_test_1"}))).await?;

        let payment = get_payment_by_session(&db, "cs_test_1").await?.unwrap();
        assert_eq!(payment.status, PaymentStatus::Paid);
        assert!(enrollment::is_enrolled(&db, buyer.id, kept.id).await?);
        assert!(!enrollment::is_enrolled(&db, buyer.id, course.id).await?);
        let warnings = SystemLog::find()
            .filter(crate::entities::system_log::Column::Level.eq(LogLevel::Warn))
            .filter(crate::entities::system_log::Column::Source.eq("payments"))
            .count(&db)
            .await?;
        assert_eq!(warnings, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() -> Result<()> {
        let db = setup_test_db().await?;
        let completed = event("checkout.session.completed", json!({"id": "cs_missing"}));
        let result = handle_webhook(&db, &RecordingMailer::default(), &AppConfig::default(), &completed).await;
        assert!(matches!(result, Err(Error::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_expired_and_failed_sessions() -> Result<()> {
        let db = setup_test_db().await?;
        let buyer = create_test_user(&db, "buyer@example.com").await?;
        create_test_payment(&db, buyer.id, "cs_expiring", 1000).await?;
        create_test_payment(&db, buyer.id, "cs_failing", 1000).await?;
        let mailer = RecordingMailer::default();
        let config = AppConfig::default();

        handle_webhook(&db, &mailer, &config, &event("checkout.session.expired", json!({"id": "cs_expiring"}))).await?;
        handle_webhook(
            &db,
            &mailer,
            &config,
            &event("payment_intent.payment_failed", json!({"id": "pi_9", "metadata": {"session_id": "cs_failing"}})),
        )
        .await?;

        let expired = get_payment_by_session(&db, "cs_expiring").await?.unwrap();
        assert_eq!(expired.status, PaymentStatus::Expired);
        let failed = get_payment_by_session(&db, "cs_failing").await?.unwrap();
        assert_eq!(failed.status, PaymentStatus::Failed);

        // Unknown events are ignored
        handle_webhook(&db, &mailer, &config, &event("invoice.created", json!({}))).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_refund_revokes_access() -> Result<()> {
        let (db, _instructor, course) = setup_with_published_course().await?;
        let buyer = create_test_user(&db, "buyer@example.com").await?;
        let mailer = RecordingMailer::default();
        let config = AppConfig::default();
        start_checkout(&db, &FakeGateway::default(), &config, &buyer, &[course.id]).await?;
        handle_webhook(
            &db,
            &mailer,
            &config,
            &event("checkout.session.completed", json!({"id": "cs_test_1", "payment_intent": "pi_1"})),
        )
        .await?;

        let refunded = event("charge.refunded", json!({"id": "ch_1", "payment_intent": "pi_1"}));
        handle_webhook(&db, &mailer, &config, &refunded).await?;
        handle_webhook(&db, &mailer, &config, &refunded).await?;

        let payment = get_payment_by_session(&db, "cs_test_1").await?.unwrap();
        assert_eq!(payment.status, PaymentStatus::Refunded);
        assert!(!enrollment::is_enrolled(&db, buyer.id, course.id).await?);
        // Payment notice plus one refund notice
        assert_eq!(list_notifications(&db, buyer.id, false).await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_subscription_events_are_mirrored() -> Result<()> {
        let db = setup_test_db().await?;
        let buyer = create_test_user(&db, "buyer@example.com").await?;
        user::set_payment_customer_id(&db, buyer.id, "cus_42").await?;
        let period_end = (Utc::now() + chrono::Duration::days(30)).timestamp();
        let config = AppConfig::default();
        let mailer = RecordingMailer::default();

        let created = event(
            "customer.subscription.created",
            json!({
                "id": "sub_1",
                "customer": "cus_42",
                "status": "active",
                "cancel_at_period_end": false,
                "items": {"data": [{"current_period_end": period_end, "price": {"id": "price_pro"}}]}
            }),
        );
        handle_webhook(&db, &mailer, &config, &created).await?;
        let active = subscription::get_active_subscription(&db, buyer.id, Utc::now()).await?.unwrap();
        assert_eq!(active.plan, "price_pro");

        let deleted = event(
            "customer.subscription.deleted",
            json!({"id": "sub_1", "customer": "cus_42", "status": "canceled", "current_period_end": period_end}),
        );
        handle_webhook(&db, &mailer, &config, &deleted).await?;
        assert!(subscription::get_active_subscription(&db, buyer.id, Utc::now()).await?.is_none());
        Ok(())
    }
}
