//! Dashboard business logic - Headline figures for administrators.

use crate::{
    entities::{
        Course, Enrollment, Payment, SystemLog, User, course, payment, payment::PaymentStatus,
        system_log, system_log::LogLevel, user,
    },
    errors::Result,
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{PaginatorTrait, QueryOrder, QuerySelect, prelude::*};
use serde::Serialize;
use std::collections::BTreeMap;

/// Counts shown on the admin overview
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminStats {
    pub users: u64,
    pub courses: u64,
    pub published_courses: u64,
    pub enrollments: u64,
    /// Paid revenue in minor units, per currency
    pub revenue_cents: BTreeMap<String, i64>,
    pub pending_payments: u64,
    /// Error entries in `system_logs` over the last 24 hours
    pub errors_last_24h: u64,
}

/// A payment with the payer's email for the admin table
#[derive(Debug, Clone, Serialize)]
pub struct PaymentSummary {
    #[serde(flatten)]
    pub payment: payment::Model,
    pub user_email: Option<String>,
}

/// Gathers the overview figures as of `now`.
pub async fn admin_stats(db: &DatabaseConnection, now: DateTime<Utc>) -> Result<AdminStats> {
    let paid: Vec<(String, i64)> = Payment::find()
        .select_only()
        .column(payment::Column::Currency)
        .column(payment::Column::AmountCents)
        .filter(payment::Column::Status.eq(PaymentStatus::Paid))
        .into_tuple()
        .all(db)
        .await?;
    let mut revenue_cents = BTreeMap::new();
    for (currency, amount) in paid {
        *revenue_cents.entry(currency).or_insert(0) += amount;
    }

    Ok(AdminStats {
        users: User::find().count(db).await?,
        courses: Course::find().count(db).await?,
        published_courses: Course::find()
            .filter(course::Column::IsPublished.eq(true))
            .count(db)
            .await?,
        enrollments: Enrollment::find().count(db).await?,
        revenue_cents,
        pending_payments: Payment::find()
            .filter(payment::Column::Status.eq(PaymentStatus::Pending))
            .count(db)
            .await?,
        errors_last_24h: SystemLog::find()
            .filter(system_log::Column::Level.eq(LogLevel::Error))
            .filter(system_log::Column::CreatedAt.gte(now - Duration::hours(24)))
            .count(db)
            .await?,
    })
}

/// Newest payments of any status.
pub async fn recent_payments(db: &DatabaseConnection, limit: u64) -> Result<Vec<PaymentSummary>> {
    let rows = Payment::find()
        .order_by_desc(payment::Column::CreatedAt)
        .order_by_desc(payment::Column::Id)
        .limit(limit)
        .find_also_related(User)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(payment, payer): (payment::Model, Option<user::Model>)| PaymentSummary {
            payment,
            user_email: payer.map(|u| u.email),
        })
        .collect())
}
