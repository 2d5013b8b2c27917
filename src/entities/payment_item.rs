//! Payment item entity - A course line on a checkout session.
//!
//! Title and amount are snapshots taken when the session was opened so later
//! course edits do not rewrite purchase history.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Payment item database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payment_items")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Parent payment
    pub payment_id: i64,
    /// Course being purchased
    pub course_id: i64,
    /// Course title at purchase time
    pub title: String,
    /// Course price at purchase time, minor units
    pub amount_cents: i64,
}

/// Defines relationships between `PaymentItem` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each item belongs to one payment
    #[sea_orm(
        belongs_to = "super::payment::Entity",
        from = "Column::PaymentId",
        to = "super::payment::Column::Id",
        on_delete = "Cascade"
    )]
    Payment,
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
