//! Module entity - An ordered section of a course.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Course module database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "modules")]
pub struct Model {
    /// Unique identifier for the module
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Course this module belongs to
    pub course_id: i64,
    /// Section heading
    pub title: String,
    /// 1-based position within the course
    pub position: i32,
}

/// Defines relationships between Module and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each module belongs to one course; removed with it
    #[sea_orm(
        belongs_to = "super::course::Entity",
        from = "Column::CourseId",
        to = "super::course::Column::Id",
        on_delete = "Cascade"
    )]
    Course,
    /// One module has many lessons
    #[sea_orm(has_many = "super::lesson::Entity")]
    Lessons,
}

impl Related<super::course::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Course.def()
    }
}

impl Related<super::lesson::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lessons.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
