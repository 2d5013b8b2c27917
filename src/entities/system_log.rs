//! System log entity - Operational events surfaced on the admin dashboard.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Severity of a system log entry
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(8))")]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Expected event worth keeping
    #[sea_orm(string_value = "info")]
    Info,
    /// Something unusual that did not fail a request
    #[sea_orm(string_value = "warn")]
    Warn,
    /// A request or webhook failed
    #[sea_orm(string_value = "error")]
    Error,
}

/// System log database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "system_logs")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Severity
    pub level: LogLevel,
    /// Subsystem that wrote the entry (e.g. `"checkout"`, `"http"`)
    pub source: String,
    /// Human-readable message
    pub message: String,
    /// Optional JSON context
    pub context: Option<String>,
    /// When it happened
    pub created_at: DateTimeUtc,
}

/// `SystemLog` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
