//! Database configuration module.
//!
//! This module handles the `SQLite` connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust
//! structs. Composite uniqueness that the entity attributes cannot express is
//! added as explicit indexes.

use crate::entities::{
    Category, Course, CourseModule, Enrollment, EnrollmentColumn, Invoice, Lesson,
    LessonCompletion, LessonCompletionColumn, Notification, Payment, PaymentItem, Subscription,
    SystemLog, User, UserTheme,
};
use crate::errors::Result;
use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/coursehub.sqlite?mode=rwc";

/// Gets the database URL from environment variable or returns default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by `DATABASE_URL`.
///
/// Falls back to a local `SQLite` file if no environment variable is set.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    tracing::debug!("Connecting to {}", database_url);
    Database::connect(&database_url).await.map_err(Into::into)
}

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates all tables and composite indexes. Safe to call on every start.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    // Parents before children so foreign keys resolve on every backend
    create_table(db, &schema, User).await?;
    create_table(db, &schema, Category).await?;
    create_table(db, &schema, Course).await?;
    create_table(db, &schema, CourseModule).await?;
    create_table(db, &schema, Lesson).await?;
    create_table(db, &schema, Enrollment).await?;
    create_table(db, &schema, LessonCompletion).await?;
    create_table(db, &schema, Payment).await?;
    create_table(db, &schema, PaymentItem).await?;
    create_table(db, &schema, Invoice).await?;
    create_table(db, &schema, Subscription).await?;
    create_table(db, &schema, Notification).await?;
    create_table(db, &schema, SystemLog).await?;
    create_table(db, &schema, UserTheme).await?;

    let enrollment_unique = Index::create()
        .name("idx_enrollments_user_course")
        .table(Enrollment)
        .col(EnrollmentColumn::UserId)
        .col(EnrollmentColumn::CourseId)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&enrollment_unique)).await?;

    let completion_unique = Index::create()
        .name("idx_lesson_completions_enrollment_lesson")
        .table(LessonCompletion)
        .col(LessonCompletionColumn::EnrollmentId)
        .col(LessonCompletionColumn::LessonId)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&completion_unique)).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        CategoryModel, CourseModel, EnrollmentModel, NotificationModel, PaymentModel,
        SystemLogModel, UserModel, UserThemeModel,
    };
    use sea_orm::QuerySelect;

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Test that tables exist by querying them
        let _: Vec<UserModel> = User::find().limit(1).all(&db).await?;
        let _: Vec<CategoryModel> = Category::find().limit(1).all(&db).await?;
        let _: Vec<CourseModel> = Course::find().limit(1).all(&db).await?;
        let _: Vec<EnrollmentModel> = Enrollment::find().limit(1).all(&db).await?;
        let _: Vec<PaymentModel> = Payment::find().limit(1).all(&db).await?;
        let _: Vec<NotificationModel> = Notification::find().limit(1).all(&db).await?;
        let _: Vec<SystemLogModel> = SystemLog::find().limit(1).all(&db).await?;
        let _: Vec<UserThemeModel> = UserTheme::find().limit(1).all(&db).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_idempotent() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }
}
