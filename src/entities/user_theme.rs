//! User theme entity - Per-user appearance preferences.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Colour scheme selection
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(8))")]
#[serde(rename_all = "snake_case")]
pub enum ThemeMode {
    /// Always light
    #[sea_orm(string_value = "light")]
    Light,
    /// Always dark
    #[sea_orm(string_value = "dark")]
    Dark,
    /// Follow the operating system
    #[sea_orm(string_value = "system")]
    System,
}

/// User theme database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_themes")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owner, one theme row per user
    #[sea_orm(unique)]
    pub user_id: i64,
    /// Colour preset name (see `core::theme::PRESETS`)
    pub preset: String,
    /// Light / dark / system
    pub mode: ThemeMode,
    /// Corner radius in tenths of a rem (5 = 0.5rem)
    pub radius_tenths: i32,
    /// Last change
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between `UserTheme` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each theme belongs to one user
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
