//! User entity - Everyone who signs in through the session provider.
//!
//! The role decides what the API lets a user do: students browse and buy,
//! instructors manage their own uploads, admins manage everything.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Authorization role stored on each user
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Default role for self-registered users
    #[sea_orm(string_value = "student")]
    Student,
    /// May upload course media
    #[sea_orm(string_value = "instructor")]
    Instructor,
    /// Full access to the admin dashboard
    #[sea_orm(string_value = "admin")]
    Admin,
}

impl Role {
    /// Whether this role may manage course media.
    #[must_use]
    pub const fn can_upload(self) -> bool {
        matches!(self, Self::Instructor | Self::Admin)
    }
}

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Normalised (trimmed, lowercase) email address
    #[sea_orm(unique)]
    pub email: String,
    /// Display name
    pub name: String,
    /// Authorization role
    pub role: Role,
    /// Customer id assigned by the payment provider, once known
    pub payment_customer_id: Option<String>,
    /// When the user first signed in
    pub created_at: DateTimeUtc,
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One user has many enrollments
    #[sea_orm(has_many = "super::enrollment::Entity")]
    Enrollments,
    /// One user has many notifications
    #[sea_orm(has_many = "super::notification::Entity")]
    Notifications,
    /// One user has many payments
    #[sea_orm(has_many = "super::payment::Entity")]
    Payments,
}

impl Related<super::enrollment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Enrollments.def()
    }
}

impl Related<super::notification::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Notifications.def()
    }
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
