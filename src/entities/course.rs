//! Course entity - A sellable unit of content.
//!
//! Courses belong to a category and an instructor, carry a price in minor
//! currency units, and stay hidden from the catalogue until published.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Course database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "courses")]
pub struct Model {
    /// Unique identifier for the course
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Category this course is listed under
    pub category_id: Option<i64>,
    /// User who teaches the course
    pub instructor_id: i64,
    /// Display title
    pub title: String,
    /// URL-safe identifier, unique across courses
    #[sea_orm(unique)]
    pub slug: String,
    /// Long-form description
    pub description: String,
    /// Price in minor units (cents); zero means free
    pub price_cents: i64,
    /// ISO 4217 currency code, uppercase
    pub currency: String,
    /// Whether the course appears in the public catalogue
    pub is_published: bool,
    /// Object storage key of the thumbnail image
    pub thumbnail_key: Option<String>,
    /// When the course was created
    pub created_at: DateTimeUtc,
    /// When the course was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Course and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each course belongs to at most one category
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
    /// Each course is taught by one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::InstructorId",
        to = "super::user::Column::Id"
    )]
    Instructor,
    /// One course has many modules
    #[sea_orm(has_many = "super::course_module::Entity")]
    Modules,
    /// One course has many enrollments
    #[sea_orm(has_many = "super::enrollment::Entity")]
    Enrollments,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::course_module::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Modules.def()
    }
}

impl Related<super::enrollment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Enrollments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
