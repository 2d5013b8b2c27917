//! Enrollment business logic - Course access and lesson progress.
//!
//! An enrollment is the only thing that grants access to paid lessons. Progress
//! is `completed lessons * 100 / total lessons`, floored, and is recalculated
//! whenever either side of that ratio changes.

use crate::{
    core::{course, curriculum},
    entities::{Course, Enrollment, LessonCompletion, course as course_entity, enrollment, lesson_completion},
    errors::{Error, Result},
};
use sea_orm::{PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Serialize;

/// An enrollment joined with the course fields the dashboard shows
#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentSummary {
    /// The enrollment row
    #[serde(flatten)]
    pub enrollment: enrollment::Model,
    /// Course title
    pub course_title: String,
    /// Course slug for links
    pub course_slug: String,
    /// Course category, used by the assistant's recommendations
    pub category_id: Option<i64>,
}

/// Finds the enrollment of a user in a course.
pub async fn get_enrollment<C>(
    db: &C,
    user_id: i64,
    course_id: i64,
) -> Result<Option<enrollment::Model>>
where
    C: ConnectionTrait,
{
    Enrollment::find()
        .filter(enrollment::Column::UserId.eq(user_id))
        .filter(enrollment::Column::CourseId.eq(course_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Whether a user has access to a course.
pub async fn is_enrolled<C>(db: &C, user_id: i64, course_id: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    Ok(get_enrollment(db, user_id, course_id).await?.is_some())
}

async fn insert_enrollment<C>(db: &C, user_id: i64, course_id: i64) -> Result<enrollment::Model>
where
    C: ConnectionTrait,
{
    let enrollment = enrollment::ActiveModel {
        user_id: Set(user_id),
        course_id: Set(course_id),
        progress_percent: Set(0),
        completed_at: Set(None),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    Ok(enrollment.insert(db).await?)
}

/// Enrolls a user in a published course. Enrolling twice is a conflict.
pub async fn enroll(
    db: &DatabaseConnection,
    user_id: i64,
    course_id: i64,
) -> Result<enrollment::Model> {
    let course = course::get_course_by_id(db, course_id)
        .await?
        .filter(|c| c.is_published)
        .ok_or_else(|| Error::not_found("course", course_id))?;

    if is_enrolled(db, user_id, course_id).await? {
        return Err(Error::conflict(format!(
            "already enrolled in '{}'",
            course.title
        )));
    }

    let created = insert_enrollment(db, user_id, course_id).await?;
    tracing::info!(user_id, course_id, "Enrolled user");
    Ok(created)
}

/// Enrolls a user in several courses, skipping ones they already have.
///
/// Used when a payment completes, so it must be safe to replay. Returns only
/// the newly created enrollments.
pub async fn enroll_many<C>(
    db: &C,
    user_id: i64,
    course_ids: &[i64],
) -> Result<Vec<enrollment::Model>>
where
    C: ConnectionTrait,
{
    let mut created = Vec::new();
    for &course_id in course_ids {
        if !is_enrolled(db, user_id, course_id).await? {
            created.push(insert_enrollment(db, user_id, course_id).await?);
        }
    }
    Ok(created)
}

/// Removes a user's access to a course. Returns whether anything was removed.
pub async fn unenroll<C>(db: &C, user_id: i64, course_id: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    let Some(existing) = get_enrollment(db, user_id, course_id).await? else {
        return Ok(false);
    };
    LessonCompletion::delete_many()
        .filter(lesson_completion::Column::EnrollmentId.eq(existing.id))
        .exec(db)
        .await?;
    existing.delete(db).await?;
    tracing::info!(user_id, course_id, "Removed enrollment");
    Ok(true)
}

/// Lists a user's enrollments with course details, newest first.
pub async fn list_enrollments_for_user<C>(db: &C, user_id: i64) -> Result<Vec<EnrollmentSummary>>
where
    C: ConnectionTrait,
{
    let rows = Enrollment::find()
        .filter(enrollment::Column::UserId.eq(user_id))
        .order_by_desc(enrollment::Column::CreatedAt)
        .order_by_desc(enrollment::Column::Id)
        .find_also_related(Course)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(enrollment, course)| {
            course.map(|c: course_entity::Model| EnrollmentSummary {
                enrollment,
                course_title: c.title,
                course_slug: c.slug,
                category_id: c.category_id,
            })
        })
        .collect())
}

/// Number of users enrolled in a course.
pub async fn count_enrollments_for_course<C>(db: &C, course_id: i64) -> Result<u64>
where
    C: ConnectionTrait,
{
    Enrollment::find()
        .filter(enrollment::Column::CourseId.eq(course_id))
        .count(db)
        .await
        .map_err(Into::into)
}

/// Floors `completed * 100 / total` into 0..=100; an empty course is 0%.
#[must_use]
pub fn progress_percent(completed: u64, total: u64) -> i32 {
    if total == 0 {
        return 0;
    }
    let percent = completed.min(total) * 100 / total;
    i32::try_from(percent).unwrap_or(100)
}

async fn recalculate<C>(db: &C, existing: enrollment::Model, total: u64) -> Result<enrollment::Model>
where
    C: ConnectionTrait,
{
    let completed = LessonCompletion::find()
        .filter(lesson_completion::Column::EnrollmentId.eq(existing.id))
        .count(db)
        .await?;
    let percent = progress_percent(completed, total);

    if percent == existing.progress_percent
        && (percent == 100) == existing.completed_at.is_some()
    {
        return Ok(existing);
    }

    let completed_at = if percent == 100 {
        existing.completed_at.or_else(|| Some(chrono::Utc::now()))
    } else {
        None
    };
    let mut active: enrollment::ActiveModel = existing.into();
    active.progress_percent = Set(percent);
    active.completed_at = Set(completed_at);
    Ok(active.update(db).await?)
}

/// Recomputes progress for every enrollment in a course.
pub async fn recalculate_course_progress<C>(db: &C, course_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    let total = course::count_lessons(db, course_id).await?;
    let enrollments = Enrollment::find()
        .filter(enrollment::Column::CourseId.eq(course_id))
        .all(db)
        .await?;
    for existing in enrollments {
        recalculate(db, existing, total).await?;
    }
    Ok(())
}

/// Marks a lesson complete for an enrolled user and returns the updated
/// enrollment. Completing the same lesson again changes nothing.
pub async fn complete_lesson(
    db: &DatabaseConnection,
    user_id: i64,
    lesson_id: i64,
) -> Result<enrollment::Model> {
    let course_id = curriculum::course_id_for_lesson(db, lesson_id).await?;
    let existing = get_enrollment(db, user_id, course_id)
        .await?
        .ok_or_else(|| Error::forbidden("not enrolled in this course"))?;

    let txn = db.begin().await?;
    let already = LessonCompletion::find()
        .filter(lesson_completion::Column::EnrollmentId.eq(existing.id))
        .filter(lesson_completion::Column::LessonId.eq(lesson_id))
        .one(&txn)
        .await?;
    if already.is_none() {
        lesson_completion::ActiveModel {
            enrollment_id: Set(existing.id),
            lesson_id: Set(lesson_id),
            completed_at: Set(chrono::Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    let total = course::count_lessons(&txn, course_id).await?;
    let updated = recalculate(&txn, existing, total).await?;
    txn.commit().await?;

    Ok(updated)
}
