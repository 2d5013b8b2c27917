//! Course business logic - Catalogue management and course outlines.
//!
//! Prices are integers in minor currency units. Courses start unpublished and
//! can only be published once they contain at least one lesson. A course with
//! enrollments or open purchases cannot be deleted.

use crate::{
    core::{category::slugify, enrollment},
    entities::{
        Category, Course, CourseModule, Lesson, Payment, PaymentItem, category, course,
        course_module, lesson, payment, payment::PaymentStatus, payment_item,
    },
    errors::{Error, Result},
};
use sea_orm::{PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Serialize;

/// Input for creating a course
#[derive(Debug, Clone)]
pub struct NewCourse {
    /// Display title
    pub title: String,
    /// Explicit slug; derived from the title when `None`
    pub slug: Option<String>,
    /// Long-form description
    pub description: String,
    /// Category to list under
    pub category_id: Option<i64>,
    /// Teaching user
    pub instructor_id: i64,
    /// Price in minor units
    pub price_cents: i64,
    /// ISO 4217 code
    pub currency: String,
}

/// Partial update of a course; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct CourseUpdate {
    /// New title
    pub title: Option<String>,
    /// New slug
    pub slug: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New category
    pub category_id: Option<i64>,
    /// New price in minor units
    pub price_cents: Option<i64>,
    /// New currency
    pub currency: Option<String>,
    /// New thumbnail storage key
    pub thumbnail_key: Option<String>,
}

/// A module and its ordered lessons
#[derive(Debug, Clone, Serialize)]
pub struct ModuleOutline {
    /// The module row
    #[serde(flatten)]
    pub module: course_module::Model,
    /// Lessons ordered by position
    pub lessons: Vec<lesson::Model>,
}

/// A course with its full curriculum, as shown on the course page
#[derive(Debug, Clone, Serialize)]
pub struct CourseOutline {
    /// The course row
    pub course: course::Model,
    /// Modules ordered by position
    pub modules: Vec<ModuleOutline>,
    /// Number of lessons across all modules
    pub lesson_count: usize,
    /// Sum of lesson durations
    pub total_duration_seconds: i64,
}

fn validate_title(title: &str) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(Error::validation("title", "cannot be empty"));
    }
    Ok(title.to_string())
}

fn validate_price(price_cents: i64) -> Result<i64> {
    if price_cents < 0 {
        return Err(Error::validation("price_cents", "cannot be negative"));
    }
    Ok(price_cents)
}

/// Validates and uppercases an ISO 4217 style currency code.
pub fn normalize_currency(currency: &str) -> Result<String> {
    let currency = currency.trim();
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(Error::validation("currency", "must be a 3-letter code"));
    }
    Ok(currency.to_ascii_uppercase())
}

async fn ensure_category_exists(db: &DatabaseConnection, category_id: Option<i64>) -> Result<()> {
    if let Some(id) = category_id {
        let found: Option<category::Model> = Category::find_by_id(id).one(db).await?;
        if found.is_none() {
            return Err(Error::validation("category_id", format!("category {id} does not exist")));
        }
    }
    Ok(())
}

async fn ensure_slug_free(db: &DatabaseConnection, slug: &str, except: Option<i64>) -> Result<()> {
    if let Some(existing) = get_course_by_slug(db, slug).await? {
        if Some(existing.id) != except {
            return Err(Error::conflict(format!("course slug '{slug}' is already taken")));
        }
    }
    Ok(())
}

/// Creates an unpublished course after validating every field.
pub async fn create_course(db: &DatabaseConnection, new_course: NewCourse) -> Result<course::Model> {
    let title = validate_title(&new_course.title)?;
    let price_cents = validate_price(new_course.price_cents)?;
    let currency = normalize_currency(&new_course.currency)?;
    let slug = slugify(new_course.slug.as_deref().unwrap_or(&title))?;

    ensure_category_exists(db, new_course.category_id).await?;
    ensure_slug_free(db, &slug, None).await?;

    let now = chrono::Utc::now();
    let course = course::ActiveModel {
        category_id: Set(new_course.category_id),
        instructor_id: Set(new_course.instructor_id),
        title: Set(title),
        slug: Set(slug),
        description: Set(new_course.description.trim().to_string()),
        price_cents: Set(price_cents),
        currency: Set(currency),
        is_published: Set(false),
        thumbnail_key: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let created = course.insert(db).await?;
    tracing::info!(course_id = created.id, slug = %created.slug, "Created course");
    Ok(created)
}

/// Applies a partial update and bumps `updated_at`.
pub async fn update_course(
    db: &DatabaseConnection,
    course_id: i64,
    update: CourseUpdate,
) -> Result<course::Model> {
    let existing = get_course_by_id(db, course_id)
        .await?
        .ok_or_else(|| Error::not_found("course", course_id))?;
    let mut active: course::ActiveModel = existing.into();

    if let Some(title) = update.title {
        active.title = Set(validate_title(&title)?);
    }
    if let Some(slug) = update.slug {
        let slug = slugify(&slug)?;
        ensure_slug_free(db, &slug, Some(course_id)).await?;
        active.slug = Set(slug);
    }
    if let Some(description) = update.description {
        active.description = Set(description.trim().to_string());
    }
    if let Some(category_id) = update.category_id {
        ensure_category_exists(db, Some(category_id)).await?;
        active.category_id = Set(Some(category_id));
    }
    if let Some(price_cents) = update.price_cents {
        active.price_cents = Set(validate_price(price_cents)?);
    }
    if let Some(currency) = update.currency {
        active.currency = Set(normalize_currency(&currency)?);
    }
    if let Some(thumbnail_key) = update.thumbnail_key {
        active.thumbnail_key = Set(Some(thumbnail_key).filter(|k| !k.is_empty()));
    }
    active.updated_at = Set(chrono::Utc::now());

    Ok(active.update(db).await?)
}

/// Counts lessons across all modules of a course.
pub async fn count_lessons<C>(db: &C, course_id: i64) -> Result<u64>
where
    C: ConnectionTrait,
{
    Lesson::find()
        .inner_join(CourseModule)
        .filter(course_module::Column::CourseId.eq(course_id))
        .count(db)
        .await
        .map_err(Into::into)
}

/// Publishes or unpublishes a course. Publishing an empty course is rejected.
pub async fn set_published(
    db: &DatabaseConnection,
    course_id: i64,
    published: bool,
) -> Result<course::Model> {
    let existing = get_course_by_id(db, course_id)
        .await?
        .ok_or_else(|| Error::not_found("course", course_id))?;

    if published && count_lessons(db, course_id).await? == 0 {
        return Err(Error::validation(
            "is_published",
            "a course needs at least one lesson before it can be published",
        ));
    }

    let mut active: course::ActiveModel = existing.into();
    active.is_published = Set(published);
    active.updated_at = Set(chrono::Utc::now());
    Ok(active.update(db).await?)
}

/// Deletes a course and its curriculum. Refused while anyone is enrolled.
pub async fn delete_course(db: &DatabaseConnection, course_id: i64) -> Result<()> {
    let existing = get_course_by_id(db, course_id)
        .await?
        .ok_or_else(|| Error::not_found("course", course_id))?;

    let enrolled = enrollment::count_enrollments_for_course(db, course_id).await?;
    if enrolled > 0 {
        return Err(Error::conflict(format!(
            "course '{}' has {enrolled} enrollment(s) and cannot be deleted",
            existing.slug
        )));
    }

    let open_purchases = PaymentItem::find()
        .inner_join(Payment)
        .filter(payment_item::Column::CourseId.eq(course_id))
        .filter(payment::Column::Status.is_in([PaymentStatus::Pending, PaymentStatus::Paid]))
        .count(db)
        .await?;
    if open_purchases > 0 {
        return Err(Error::conflict(format!(
            "course '{}' has {open_purchases} pending or paid purchase(s) and cannot be deleted",
            existing.slug
        )));
    }

    let txn = db.begin().await?;
    let module_ids: Vec<i64> = CourseModule::find()
        .filter(course_module::Column::CourseId.eq(course_id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|m| m.id)
        .collect();
    Lesson::delete_many()
        .filter(lesson::Column::ModuleId.is_in(module_ids))
        .exec(&txn)
        .await?;
    CourseModule::delete_many()
        .filter(course_module::Column::CourseId.eq(course_id))
        .exec(&txn)
        .await?;
    existing.delete(&txn).await?;
    txn.commit().await?;

    tracing::info!(course_id, "Deleted course");
    Ok(())
}

/// Lists published courses, newest first, optionally within one category.
pub async fn list_published_courses(
    db: &DatabaseConnection,
    category_slug: Option<&str>,
) -> Result<Vec<course::Model>> {
    let mut query = Course::find().filter(course::Column::IsPublished.eq(true));

    if let Some(slug) = category_slug {
        let Some(category) = crate::core::category::get_category_by_slug(db, slug).await? else {
            return Ok(Vec::new());
        };
        query = query.filter(course::Column::CategoryId.eq(category.id));
    }

    query
        .order_by_desc(course::Column::CreatedAt)
        .order_by_desc(course::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lists every course including drafts, for the admin table.
pub async fn list_all_courses(db: &DatabaseConnection) -> Result<Vec<course::Model>> {
    Course::find()
        .order_by_asc(course::Column::Title)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds a course by primary key.
pub async fn get_course_by_id<C>(db: &C, course_id: i64) -> Result<Option<course::Model>>
where
    C: ConnectionTrait,
{
    Course::find_by_id(course_id).one(db).await.map_err(Into::into)
}

/// Finds a course by slug.
pub async fn get_course_by_slug(
    db: &DatabaseConnection,
    slug: &str,
) -> Result<Option<course::Model>> {
    Course::find()
        .filter(course::Column::Slug.eq(slug))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Loads a course with its modules and lessons in display order.
pub async fn get_course_outline(db: &DatabaseConnection, course_id: i64) -> Result<CourseOutline> {
    let course = get_course_by_id(db, course_id)
        .await?
        .ok_or_else(|| Error::not_found("course", course_id))?;

    let modules_with_lessons = CourseModule::find()
        .filter(course_module::Column::CourseId.eq(course_id))
        .order_by_asc(course_module::Column::Position)
        .find_with_related(Lesson)
        .all(db)
        .await?;

    let mut lesson_count = 0;
    let mut total_duration_seconds = 0_i64;
    let modules = modules_with_lessons
        .into_iter()
        .map(|(module, mut lessons)| {
            lessons.sort_by_key(|l| (l.position, l.id));
            lesson_count += lessons.len();
            total_duration_seconds += lessons
                .iter()
                .map(|l| i64::from(l.duration_seconds))
                .sum::<i64>();
            ModuleOutline { module, lessons }
        })
        .collect();

    Ok(CourseOutline {
        course,
        modules,
        lesson_count,
        total_duration_seconds,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::curriculum;
    use crate::test_utils::*;

    fn draft(instructor_id: i64, title: &str) -> NewCourse {
        NewCourse {
            title: title.to_string(),
            slug: None,
            description: "Learn things".to_string(),
            category_id: None,
            instructor_id,
            price_cents: 4900,
            currency: "usd".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_course_validation() -> Result<()> {
        let db = setup_test_db().await?;

        let result = create_course(&db, draft(1, "  ")).await;
        assert!(matches!(result, Err(Error::Validation { ref field, .. }) if field == "title"));

        let mut negative = draft(1, "Rust");
        negative.price_cents = -1;
        let result = create_course(&db, negative).await;
        assert!(matches!(result, Err(Error::Validation { ref field, .. }) if field == "price_cents"));

        let mut bad_currency = draft(1, "Rust");
        bad_currency.currency = "dollars".to_string();
        let result = create_course(&db, bad_currency).await;
        assert!(matches!(result, Err(Error::Validation { ref field, .. }) if field == "currency"));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_course_integration() -> Result<()> {
        let db = setup_test_db().await?;
        let instructor = create_test_user(&db, "teach@example.com").await?;

        let course = create_course(&db, draft(instructor.id, "Intro to Rust")).await?;
        assert_eq!(course.slug, "intro-to-rust");
        assert_eq!(course.currency, "USD");
        assert!(!course.is_published);

        let by_slug = get_course_by_slug(&db, "intro-to-rust").await?;
        assert_eq!(by_slug.unwrap().id, course.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_course_slug_is_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let instructor = create_test_user(&db, "teach@example.com").await?;
        create_course(&db, draft(instructor.id, "Intro to Rust")).await?;

        let result = create_course(&db, draft(instructor.id, "Intro to Rust")).await;
        assert!(matches!(result, Err(Error::Conflict { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_category_is_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let instructor = create_test_user(&db, "teach@example.com").await?;
        let mut new_course = draft(instructor.id, "Orphan");
        new_course.category_id = Some(42);

        let result = create_course(&db, new_course).await;
        assert!(matches!(result, Err(Error::Validation { ref field, .. }) if field == "category_id"));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_course() -> Result<()> {
        let (db, _instructor, course) = setup_with_course().await?;

        let updated = update_course(
            &db,
            course.id,
            CourseUpdate {
                title: Some("Advanced Rust".to_string()),
                price_cents: Some(9900),
                currency: Some("eur".to_string()),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(updated.title, "Advanced Rust");
        assert_eq!(updated.price_cents, 9900);
        assert_eq!(updated.currency, "EUR");
        // Slug is stable unless explicitly changed
        assert_eq!(updated.slug, course.slug);
        assert!(updated.updated_at >= course.updated_at);
        Ok(())
    }

    #[tokio::test]
    async fn test_publish_requires_lessons() -> Result<()> {
        let (db, _instructor, course) = setup_with_course().await?;

        let result = set_published(&db, course.id, true).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let module = curriculum::add_module(&db, course.id, "Basics").await?;
        create_test_lesson(&db, module.id, "Hello").await?;

        let published = set_published(&db, course.id, true).await?;
        assert!(published.is_published);

        let unpublished = set_published(&db, course.id, false).await?;
        assert!(!unpublished.is_published);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_course_with_enrollments_is_rejected() -> Result<()> {
        let (db, _instructor, course) = setup_with_published_course().await?;
        let student = create_test_user(&db, "student@example.com").await?;
        enrollment::enroll(&db, student.id, course.id).await?;

        let result = delete_course(&db, course.id).await;
        assert!(matches!(result, Err(Error::Conflict { .. })));
        assert!(get_course_by_id(&db, course.id).await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_course_removes_curriculum() -> Result<()> {
        let (db, _instructor, course) = setup_with_published_course().await?;

        delete_course(&db, course.id).await?;
        assert!(get_course_by_id(&db, course.id).await?.is_none());
        assert_eq!(CourseModule::find().count(&db).await?, 0);
        assert_eq!(Lesson::find().count(&db).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_list_published_courses_filters() -> Result<()> {
        let (db, instructor, published) = setup_with_published_course().await?;
        create_course(&db, draft(instructor.id, "Draft Only")).await?;
        let other_category = crate::core::category::create_category(&db, "Other", None, None).await?;

        let all = list_published_courses(&db, None).await?;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, published.id);

        let category = crate::core::category::get_category_by_id(&db, published.category_id.unwrap())
            .await?
            .unwrap();
        assert_eq!(list_published_courses(&db, Some(&category.slug)).await?.len(), 1);
        assert!(list_published_courses(&db, Some(&other_category.slug)).await?.is_empty());
        assert!(list_published_courses(&db, Some("nope")).await?.is_empty());

        assert_eq!(list_all_courses(&db).await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_course_outline_is_ordered() -> Result<()> {
        let (db, _instructor, course) = setup_with_course().await?;
        let second = curriculum::add_module(&db, course.id, "Second").await?;
        let first = curriculum::add_module(&db, course.id, "First").await?;
        curriculum::reorder_modules(&db, course.id, &[first.id, second.id]).await?;

        let b = create_test_lesson(&db, first.id, "B").await?;
        let a = create_test_lesson(&db, first.id, "A").await?;
        curriculum::reorder_lessons(&db, first.id, &[a.id, b.id]).await?;
        create_test_lesson(&db, second.id, "C").await?;

        let outline = get_course_outline(&db, course.id).await?;
        assert_eq!(outline.modules.len(), 2);
        assert_eq!(outline.modules[0].module.title, "First");
        assert_eq!(outline.modules[0].lessons[0].title, "A");
        assert_eq!(outline.modules[0].lessons[1].title, "B");
        assert_eq!(outline.lesson_count, 3);
        assert_eq!(outline.total_duration_seconds, 3 * 300);
        Ok(())
    }
}
