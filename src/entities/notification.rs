//! Notification entity - In-app inbox messages.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// What triggered a notification, used for inbox icons
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// General message
    #[sea_orm(string_value = "info")]
    Info,
    /// Course access granted or revoked
    #[sea_orm(string_value = "enrollment")]
    Enrollment,
    /// Payment or refund
    #[sea_orm(string_value = "payment")]
    Payment,
    /// Platform announcement
    #[sea_orm(string_value = "system")]
    System,
}

/// Notification database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Recipient
    pub user_id: i64,
    /// Category of message
    pub kind: NotificationKind,
    /// Short headline
    pub title: String,
    /// Message body
    pub body: String,
    /// Optional in-app link
    pub link: Option<String>,
    /// Whether the recipient has seen it
    pub is_read: bool,
    /// When it was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Notification and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each notification belongs to one user
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
