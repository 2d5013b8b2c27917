//! Lesson completion entity - Records that an enrolled user finished a lesson.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lesson completion database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "lesson_completions")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Enrollment the completion counts towards
    pub enrollment_id: i64,
    /// Completed lesson
    pub lesson_id: i64,
    /// When the lesson was marked complete
    pub completed_at: DateTimeUtc,
}

/// Defines relationships between `LessonCompletion` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Removed together with the enrollment
    #[sea_orm(
        belongs_to = "super::enrollment::Entity",
        from = "Column::EnrollmentId",
        to = "super::enrollment::Column::Id",
        on_delete = "Cascade"
    )]
    Enrollment,
    /// Removed together with the lesson
    #[sea_orm(
        belongs_to = "super::lesson::Entity",
        from = "Column::LessonId",
        to = "super::lesson::Column::Id",
        on_delete = "Cascade"
    )]
    Lesson,
}

impl Related<super::enrollment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Enrollment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
