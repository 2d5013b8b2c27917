//! Subscription business logic - Mirrors recurring plans from the payment provider.
//!
//! The provider is the source of truth; rows here are only written from
//! webhook events and read to decide whether a plan is currently active.

use crate::{
    entities::{Subscription, User, subscription, subscription::SubscriptionStatus, user},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, prelude::*};

/// Subscription state as reported by a provider event
#[derive(Debug, Clone)]
pub struct SubscriptionUpdate {
    /// Provider's subscription id
    pub provider_subscription_id: String,
    /// Provider's customer id, mapped to a user
    pub customer_id: String,
    /// Plan name or price id
    pub plan: String,
    /// Reported status
    pub status: SubscriptionStatus,
    /// End of the paid period
    pub current_period_end: DateTime<Utc>,
    /// Whether the plan ends instead of renewing
    pub cancel_at_period_end: bool,
}

/// Inserts or updates a subscription keyed by the provider's id.
///
/// The owning user is resolved through the stored payment customer id.
pub async fn upsert_subscription<C>(db: &C, update: SubscriptionUpdate) -> Result<subscription::Model>
where
    C: ConnectionTrait,
{
    let owner = User::find()
        .filter(user::Column::PaymentCustomerId.eq(update.customer_id.as_str()))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("customer", &update.customer_id))?;

    let existing = Subscription::find()
        .filter(subscription::Column::ProviderSubscriptionId.eq(update.provider_subscription_id.as_str()))
        .one(db)
        .await?;
    let now = Utc::now();

    let saved = if let Some(existing) = existing {
        let mut active: subscription::ActiveModel = existing.into();
        active.user_id = Set(owner.id);
        active.plan = Set(update.plan);
        active.status = Set(update.status);
        active.current_period_end = Set(update.current_period_end);
        active.cancel_at_period_end = Set(update.cancel_at_period_end);
        active.updated_at = Set(now);
        active.update(db).await?
    } else {
        subscription::ActiveModel {
            user_id: Set(owner.id),
            provider_subscription_id: Set(update.provider_subscription_id),
            plan: Set(update.plan),
            status: Set(update.status),
            current_period_end: Set(update.current_period_end),
            cancel_at_period_end: Set(update.cancel_at_period_end),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?
    };

    tracing::info!(
        user_id = saved.user_id,
        status = ?saved.status,
        "Synced subscription {}",
        saved.provider_subscription_id
    );
    Ok(saved)
}

/// Returns the user's subscription that currently grants access, if any.
pub async fn get_active_subscription(
    db: &DatabaseConnection,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<Option<subscription::Model>> {
    let candidates = Subscription::find()
        .filter(subscription::Column::UserId.eq(user_id))
        .order_by_desc(subscription::Column::CurrentPeriodEnd)
        .all(db)
        .await?;

    Ok(candidates
        .into_iter()
        .find(|s| s.status.grants_access() && s.current_period_end > now))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::user::set_payment_customer_id;
    use crate::test_utils::*;
    use chrono::Duration;

    fn update(status: SubscriptionStatus, period_end: DateTime<Utc>) -> SubscriptionUpdate {
        SubscriptionUpdate {
            provider_subscription_id: "sub_1".to_string(),
            customer_id: "cus_1".to_string(),
            plan: "pro-monthly".to_string(),
            status,
            current_period_end: period_end,
            cancel_at_period_end: false,
        }
    }

    #[test]
    fn test_status_from_provider() {
        assert_eq!(SubscriptionStatus::from_provider("active"), SubscriptionStatus::Active);
        assert_eq!(SubscriptionStatus::from_provider("unpaid"), SubscriptionStatus::PastDue);
        assert_eq!(
            SubscriptionStatus::from_provider("incomplete_expired"),
            SubscriptionStatus::Canceled
        );
        assert_eq!(SubscriptionStatus::from_provider("paused"), SubscriptionStatus::Incomplete);
        assert!(SubscriptionStatus::Trialing.grants_access());
        assert!(!SubscriptionStatus::PastDue.grants_access());
    }

    #[tokio::test]
    async fn test_upsert_requires_known_customer() -> Result<()> {
        let db = setup_test_db().await?;
        let result = upsert_subscription(&db, update(SubscriptionStatus::Active, Utc::now())).await;
        assert!(matches!(result, Err(Error::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_upsert_then_cancel() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "sub@example.com").await?;
        set_payment_customer_id(&db, user.id, "cus_1").await?;
        let now = Utc::now();

        let created = upsert_subscription(&db, update(SubscriptionStatus::Active, now + Duration::days(30))).await?;
        assert_eq!(created.user_id, user.id);
        let active = get_active_subscription(&db, user.id, now).await?;
        assert_eq!(active.unwrap().id, created.id);

        let canceled = upsert_subscription(&db, update(SubscriptionStatus::Canceled, now + Duration::days(30))).await?;
        assert_eq!(canceled.id, created.id);
        assert!(get_active_subscription(&db, user.id, now).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_expired_period_is_inactive() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "sub@example.com").await?;
        set_payment_customer_id(&db, user.id, "cus_1").await?;
        let now = Utc::now();

        upsert_subscription(&db, update(SubscriptionStatus::Active, now - Duration::days(1))).await?;
        assert!(get_active_subscription(&db, user.id, now).await?.is_none());
        Ok(())
    }
}
