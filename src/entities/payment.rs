//! Payment entity - One row per hosted checkout session.
//!
//! Rows are created `pending` when the session is opened and moved to their
//! final status by the payment provider's webhooks.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle of a checkout payment
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Session created, customer has not paid yet
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Provider confirmed the charge
    #[sea_orm(string_value = "paid")]
    Paid,
    /// Provider reported a failed charge
    #[sea_orm(string_value = "failed")]
    Failed,
    /// Session expired without payment
    #[sea_orm(string_value = "expired")]
    Expired,
    /// Charge was refunded after payment
    #[sea_orm(string_value = "refunded")]
    Refunded,
}

/// Payment database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    /// Unique identifier for the payment
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Paying user
    pub user_id: i64,
    /// Checkout session id returned by the provider
    #[sea_orm(unique)]
    pub provider_session_id: String,
    /// Provider's charge / payment intent id, known once paid
    pub provider_payment_id: Option<String>,
    /// Total in minor units
    pub amount_cents: i64,
    /// ISO 4217 currency code
    pub currency: String,
    /// Current lifecycle status
    pub status: PaymentStatus,
    /// When the session was opened
    pub created_at: DateTimeUtc,
    /// When the provider confirmed payment
    pub paid_at: Option<DateTimeUtc>,
}

/// Defines relationships between Payment and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each payment belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    /// One payment has many line items
    #[sea_orm(has_many = "super::payment_item::Entity")]
    Items,
    /// One payment has at most one invoice
    #[sea_orm(has_one = "super::invoice::Entity")]
    Invoice,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::payment_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl Related<super::invoice::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invoice.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
