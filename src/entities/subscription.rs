//! Subscription entity - Mirrors recurring plans managed by the payment provider.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Provider-reported subscription state
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Paid and current
    #[sea_orm(string_value = "active")]
    Active,
    /// In a free trial period
    #[sea_orm(string_value = "trialing")]
    Trialing,
    /// Renewal charge failed, provider is retrying
    #[sea_orm(string_value = "past_due")]
    PastDue,
    /// Ended
    #[sea_orm(string_value = "canceled")]
    Canceled,
    /// First charge not completed
    #[sea_orm(string_value = "incomplete")]
    Incomplete,
}

impl SubscriptionStatus {
    /// Parses the provider's status string; unknown values map to `Incomplete`.
    #[must_use]
    pub fn from_provider(value: &str) -> Self {
        match value {
            "active" => Self::Active,
            "trialing" => Self::Trialing,
            "past_due" | "unpaid" => Self::PastDue,
            "canceled" | "incomplete_expired" => Self::Canceled,
            _ => Self::Incomplete,
        }
    }

    /// Whether the plan currently grants access.
    #[must_use]
    pub const fn grants_access(self) -> bool {
        matches!(self, Self::Active | Self::Trialing)
    }
}

/// Subscription database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "subscriptions")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Subscribed user
    pub user_id: i64,
    /// Provider's subscription id
    #[sea_orm(unique)]
    pub provider_subscription_id: String,
    /// Plan name or price id
    pub plan: String,
    /// Current state as last reported
    pub status: SubscriptionStatus,
    /// End of the paid period
    pub current_period_end: DateTimeUtc,
    /// Whether the plan ends at `current_period_end` instead of renewing
    pub cancel_at_period_end: bool,
    /// First seen
    pub created_at: DateTimeUtc,
    /// Last webhook update
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Subscription and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each subscription belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
