//! Enrollment entity - Grants a user access to a course.
//!
//! `(user_id, course_id)` is unique; `create_tables` adds the composite index.
//! Progress is derived from lesson completions and cached here.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Enrollment database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "enrollments")]
pub struct Model {
    /// Unique identifier for the enrollment
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Enrolled user
    pub user_id: i64,
    /// Course the user has access to
    pub course_id: i64,
    /// Completed lessons as a whole percentage (0-100)
    pub progress_percent: i32,
    /// Set once every lesson has been completed
    pub completed_at: Option<DateTimeUtc>,
    /// When access was granted
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Enrollment and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each enrollment belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
    /// Each enrollment belongs to one course
    #[sea_orm(
        belongs_to = "super::course::Entity",
        from = "Column::CourseId",
        to = "super::course::Column::Id"
    )]
    Course,
    /// One enrollment has many lesson completions
    #[sea_orm(has_many = "super::lesson_completion::Entity")]
    Completions,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::course::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Course.def()
    }
}

impl Related<super::lesson_completion::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Completions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
