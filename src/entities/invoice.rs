//! Invoice entity - The receipt issued for a paid checkout.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Invoice database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "invoices")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Billed user
    pub user_id: i64,
    /// Payment this invoice documents, at most one invoice each
    #[sea_orm(unique)]
    pub payment_id: i64,
    /// Human-facing number, e.g. `INV-2026-000042`
    #[sea_orm(unique)]
    pub number: String,
    /// Invoiced total in minor units
    pub amount_cents: i64,
    /// ISO 4217 currency code
    pub currency: String,
    /// When the invoice was issued
    pub issued_at: DateTimeUtc,
}

/// Defines relationships between Invoice and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each invoice documents one payment
    #[sea_orm(
        belongs_to = "super::payment::Entity",
        from = "Column::PaymentId",
        to = "super::payment::Column::Id"
    )]
    Payment,
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
