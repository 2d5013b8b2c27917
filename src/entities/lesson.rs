//! Lesson entity - A single video or text unit inside a module.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lesson database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "lessons")]
pub struct Model {
    /// Unique identifier for the lesson
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Module this lesson belongs to
    pub module_id: i64,
    /// Lesson heading
    pub title: String,
    /// Optional text body (markdown)
    pub content: Option<String>,
    /// Object storage key of the lesson video
    pub video_key: Option<String>,
    /// Video length in seconds, zero for text lessons
    pub duration_seconds: i32,
    /// 1-based position within the module
    pub position: i32,
    /// Whether non-enrolled users may watch this lesson
    pub is_free_preview: bool,
}

/// Defines relationships between Lesson and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each lesson belongs to one module; removed with it
    #[sea_orm(
        belongs_to = "super::course_module::Entity",
        from = "Column::ModuleId",
        to = "super::course_module::Column::Id",
        on_delete = "Cascade"
    )]
    Module,
}

impl Related<super::course_module::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Module.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
