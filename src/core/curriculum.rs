//! Curriculum business logic - Modules and lessons inside a course.
//!
//! Positions are 1-based and contiguous. New items are appended; reordering
//! rewrites every position in one transaction. Removing lessons changes the
//! denominator of everyone's progress, so enrollments are recalculated.

use crate::{
    core::enrollment,
    entities::{CourseModule, Lesson, LessonCompletion, course_module, lesson, lesson_completion},
    errors::{Error, Result},
};
use sea_orm::sea_query::Expr;
use sea_orm::{QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*};
use std::collections::HashSet;

/// Input for a new lesson
#[derive(Debug, Clone, Default)]
pub struct NewLesson {
    /// Lesson heading
    pub title: String,
    /// Optional markdown body
    pub content: Option<String>,
    /// Object storage key of the video
    pub video_key: Option<String>,
    /// Video length in seconds
    pub duration_seconds: i32,
    /// Whether visitors may watch without enrolling
    pub is_free_preview: bool,
}

/// Finds a module by primary key.
pub async fn get_module_by_id<C>(db: &C, module_id: i64) -> Result<Option<course_module::Model>>
where
    C: ConnectionTrait,
{
    CourseModule::find_by_id(module_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a lesson by primary key.
pub async fn get_lesson_by_id<C>(db: &C, lesson_id: i64) -> Result<Option<lesson::Model>>
where
    C: ConnectionTrait,
{
    Lesson::find_by_id(lesson_id).one(db).await.map_err(Into::into)
}

/// Resolves the course a lesson belongs to.
pub async fn course_id_for_lesson<C>(db: &C, lesson_id: i64) -> Result<i64>
where
    C: ConnectionTrait,
{
    let lesson = get_lesson_by_id(db, lesson_id)
        .await?
        .ok_or_else(|| Error::not_found("lesson", lesson_id))?;
    let module = get_module_by_id(db, lesson.module_id)
        .await?
        .ok_or_else(|| Error::not_found("module", lesson.module_id))?;
    Ok(module.course_id)
}

/// Ids of every lesson in a course.
pub async fn lesson_ids_for_course<C>(db: &C, course_id: i64) -> Result<Vec<i64>>
where
    C: ConnectionTrait,
{
    Lesson::find()
        .select_only()
        .column(lesson::Column::Id)
        .inner_join(CourseModule)
        .filter(course_module::Column::CourseId.eq(course_id))
        .into_tuple()
        .all(db)
        .await
        .map_err(Into::into)
}

/// Appends a module to the end of a course.
pub async fn add_module(
    db: &DatabaseConnection,
    course_id: i64,
    title: &str,
) -> Result<course_module::Model> {
    let title = title.trim();
    if title.is_empty() {
        return Err(Error::validation("title", "cannot be empty"));
    }
    crate::core::course::get_course_by_id(db, course_id)
        .await?
        .ok_or_else(|| Error::not_found("course", course_id))?;

    let last: Option<course_module::Model> = CourseModule::find()
        .filter(course_module::Column::CourseId.eq(course_id))
        .order_by_desc(course_module::Column::Position)
        .one(db)
        .await?;

    let module = course_module::ActiveModel {
        course_id: Set(course_id),
        title: Set(title.to_string()),
        position: Set(last.map_or(1, |m| m.position + 1)),
        ..Default::default()
    };
    Ok(module.insert(db).await?)
}

/// Appends a lesson to the end of a module.
pub async fn add_lesson(
    db: &DatabaseConnection,
    module_id: i64,
    new_lesson: NewLesson,
) -> Result<lesson::Model> {
    let title = new_lesson.title.trim();
    if title.is_empty() {
        return Err(Error::validation("title", "cannot be empty"));
    }
    if new_lesson.duration_seconds < 0 {
        return Err(Error::validation("duration_seconds", "cannot be negative"));
    }
    let module = get_module_by_id(db, module_id)
        .await?
        .ok_or_else(|| Error::not_found("module", module_id))?;

    let last: Option<lesson::Model> = Lesson::find()
        .filter(lesson::Column::ModuleId.eq(module_id))
        .order_by_desc(lesson::Column::Position)
        .one(db)
        .await?;

    let txn = db.begin().await?;
    let lesson = lesson::ActiveModel {
        module_id: Set(module_id),
        title: Set(title.to_string()),
        content: Set(new_lesson.content.filter(|c| !c.trim().is_empty())),
        video_key: Set(new_lesson.video_key.filter(|k| !k.trim().is_empty())),
        duration_seconds: Set(new_lesson.duration_seconds),
        position: Set(last.map_or(1, |l| l.position + 1)),
        is_free_preview: Set(new_lesson.is_free_preview),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    // A new lesson lowers everyone's completion ratio
    enrollment::recalculate_course_progress(&txn, module.course_id).await?;
    txn.commit().await?;

    Ok(lesson)
}

fn check_same_members(current: &[i64], ordered_ids: &[i64], field: &str) -> Result<()> {
    let current: HashSet<i64> = current.iter().copied().collect();
    let requested: HashSet<i64> = ordered_ids.iter().copied().collect();
    if requested.len() != ordered_ids.len() || current != requested {
        return Err(Error::validation(
            field,
            "must list every existing id exactly once",
        ));
    }
    Ok(())
}

/// Rewrites module positions to follow `ordered_ids`.
pub async fn reorder_modules(
    db: &DatabaseConnection,
    course_id: i64,
    ordered_ids: &[i64],
) -> Result<()> {
    let current: Vec<i64> = CourseModule::find()
        .filter(course_module::Column::CourseId.eq(course_id))
        .all(db)
        .await?
        .into_iter()
        .map(|m| m.id)
        .collect();
    check_same_members(&current, ordered_ids, "module_ids")?;

    let txn = db.begin().await?;
    for (position, id) in (1..).zip(ordered_ids) {
        CourseModule::update_many()
            .col_expr(course_module::Column::Position, Expr::value(position))
            .filter(course_module::Column::Id.eq(*id))
            .exec(&txn)
            .await?;
    }
    txn.commit().await?;
    Ok(())
}

/// Rewrites lesson positions inside a module to follow `ordered_ids`.
pub async fn reorder_lessons(
    db: &DatabaseConnection,
    module_id: i64,
    ordered_ids: &[i64],
) -> Result<()> {
    let current: Vec<i64> = Lesson::find()
        .filter(lesson::Column::ModuleId.eq(module_id))
        .all(db)
        .await?
        .into_iter()
        .map(|l| l.id)
        .collect();
    check_same_members(&current, ordered_ids, "lesson_ids")?;

    let txn = db.begin().await?;
    for (position, id) in (1..).zip(ordered_ids) {
        Lesson::update_many()
            .col_expr(lesson::Column::Position, Expr::value(position))
            .filter(lesson::Column::Id.eq(*id))
            .exec(&txn)
            .await?;
    }
    txn.commit().await?;
    Ok(())
}

async fn close_position_gap<C>(db: &C, course_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    let modules = CourseModule::find()
        .filter(course_module::Column::CourseId.eq(course_id))
        .order_by_asc(course_module::Column::Position)
        .all(db)
        .await?;
    for (position, module) in (1..).zip(modules) {
        if module.position != position {
            let mut active: course_module::ActiveModel = module.into();
            active.position = Set(position);
            active.update(db).await?;
        }
    }
    Ok(())
}

/// Deletes a module with its lessons and their completion records.
pub async fn delete_module(db: &DatabaseConnection, module_id: i64) -> Result<()> {
    let module = get_module_by_id(db, module_id)
        .await?
        .ok_or_else(|| Error::not_found("module", module_id))?;
    let course_id = module.course_id;

    let txn = db.begin().await?;
    let lesson_ids: Vec<i64> = Lesson::find()
        .filter(lesson::Column::ModuleId.eq(module_id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|l| l.id)
        .collect();
    LessonCompletion::delete_many()
        .filter(lesson_completion::Column::LessonId.is_in(lesson_ids))
        .exec(&txn)
        .await?;
    Lesson::delete_many()
        .filter(lesson::Column::ModuleId.eq(module_id))
        .exec(&txn)
        .await?;
    module.delete(&txn).await?;
    close_position_gap(&txn, course_id).await?;
    enrollment::recalculate_course_progress(&txn, course_id).await?;
    txn.commit().await?;
    Ok(())
}

/// Deletes a lesson and its completion records, then renumbers its module.
pub async fn delete_lesson(db: &DatabaseConnection, lesson_id: i64) -> Result<()> {
    let lesson = get_lesson_by_id(db, lesson_id)
        .await?
        .ok_or_else(|| Error::not_found("lesson", lesson_id))?;
    let module_id = lesson.module_id;
    let course_id = course_id_for_lesson(db, lesson_id).await?;

    let txn = db.begin().await?;
    LessonCompletion::delete_many()
        .filter(lesson_completion::Column::LessonId.eq(lesson_id))
        .exec(&txn)
        .await?;
    lesson.delete(&txn).await?;

    let remaining = Lesson::find()
        .filter(lesson::Column::ModuleId.eq(module_id))
        .order_by_asc(lesson::Column::Position)
        .all(&txn)
        .await?;
    for (position, lesson) in (1..).zip(remaining) {
        if lesson.position != position {
            let mut active: lesson::ActiveModel = lesson.into();
            active.position = Set(position);
            active.update(&txn).await?;
        }
    }
    enrollment::recalculate_course_progress(&txn, course_id).await?;
    txn.commit().await?;
    Ok(())
}
