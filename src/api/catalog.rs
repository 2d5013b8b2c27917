//! Catalogue endpoints. Reads are public; writes need the admin role.

use crate::{
    api::{
        AppState,
        extract::{AdminUser, Json, MaybeUser, Path, Query},
    },
    core::{
        category::{self, CategoryUpdate},
        course::{self, CourseOutline, CourseUpdate, NewCourse},
        curriculum::{self, NewLesson},
    },
    entities::{category::Model as CategoryModel, course::Model as CourseModel, course_module, lesson, user::Role},
    errors::{Error, Result},
};
use axum::{extract::State, http::StatusCode};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
}

pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<CategoryModel>>> {
    Ok(Json(category::list_categories(&state.db).await?))
}

pub async fn create_category(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Json(req): Json<CategoryRequest>,
) -> Result<(StatusCode, Json<CategoryModel>)> {
    let created = category::create_category(&state.db, &req.name, req.slug.as_deref(), req.description).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_category(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(category_id): Path<i64>,
    Json(req): Json<CategoryPatch>,
) -> Result<Json<CategoryModel>> {
    let update = CategoryUpdate {
        name: req.name,
        slug: req.slug,
        description: req.description,
    };
    Ok(Json(category::update_category(&state.db, category_id, update).await?))
}

pub async fn delete_category(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(category_id): Path<i64>,
) -> Result<StatusCode> {
    category::delete_category(&state.db, category_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct CourseListQuery {
    pub category: Option<String>,
}

pub async fn list_courses(
    State(state): State<AppState>,
    Query(query): Query<CourseListQuery>,
) -> Result<Json<Vec<CourseModel>>> {
    let courses = course::list_published_courses(&state.db, query.category.as_deref()).await?;
    Ok(Json(courses))
}

/// Course outline by slug. Drafts are only visible to admins and their
/// instructor.
pub async fn get_course(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(slug): Path<String>,
) -> Result<Json<CourseOutline>> {
    let found = course::get_course_by_slug(&state.db, &slug)
        .await?
        .ok_or_else(|| Error::not_found("course", &slug))?;
    let can_preview = viewer.is_some_and(|v| v.role == Role::Admin || v.id == found.instructor_id);
    if !found.is_published && !can_preview {
        return Err(Error::not_found("course", slug));
    }
    Ok(Json(course::get_course_outline(&state.db, found.id).await?))
}

#[derive(Debug, Deserialize)]
pub struct CreateCourseRequest {
    pub title: String,
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    pub category_id: Option<i64>,
    /// Defaults to the creating admin
    pub instructor_id: Option<i64>,
    pub price_cents: i64,
    /// Defaults to the configured store currency
    pub currency: Option<String>,
}

pub async fn create_course(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(req): Json<CreateCourseRequest>,
) -> Result<(StatusCode, Json<CourseModel>)> {
    let new_course = NewCourse {
        title: req.title,
        slug: req.slug,
        description: req.description,
        category_id: req.category_id,
        instructor_id: req.instructor_id.unwrap_or(admin.id),
        price_cents: req.price_cents,
        currency: req.currency.unwrap_or_else(|| state.config.payments.currency.clone()),
    };
    let created = course::create_course(&state.db, new_course).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateCourseRequest {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub price_cents: Option<i64>,
    pub currency: Option<String>,
    pub thumbnail_key: Option<String>,
}

pub async fn update_course(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(course_id): Path<i64>,
    Json(req): Json<UpdateCourseRequest>,
) -> Result<Json<CourseModel>> {
    let update = CourseUpdate {
        title: req.title,
        slug: req.slug,
        description: req.description,
        category_id: req.category_id,
        price_cents: req.price_cents,
        currency: req.currency,
        thumbnail_key: req.thumbnail_key,
    };
    Ok(Json(course::update_course(&state.db, course_id, update).await?))
}

pub async fn delete_course(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(course_id): Path<i64>,
) -> Result<StatusCode> {
    course::delete_course(&state.db, course_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    pub published: bool,
}

pub async fn publish_course(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(course_id): Path<i64>,
    Json(req): Json<PublishRequest>,
) -> Result<Json<CourseModel>> {
    Ok(Json(course::set_published(&state.db, course_id, req.published).await?))
}

#[derive(Debug, Deserialize)]
pub struct ModuleRequest {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct OrderRequest {
    pub ids: Vec<i64>,
}

pub async fn add_module(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(course_id): Path<i64>,
    Json(req): Json<ModuleRequest>,
) -> Result<(StatusCode, Json<course_module::Model>)> {
    let created = curriculum::add_module(&state.db, course_id, &req.title).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn reorder_modules(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(course_id): Path<i64>,
    Json(req): Json<OrderRequest>,
) -> Result<StatusCode> {
    curriculum::reorder_modules(&state.db, course_id, &req.ids).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_module(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(module_id): Path<i64>,
) -> Result<StatusCode> {
    curriculum::delete_module(&state.db, module_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct LessonRequest {
    pub title: String,
    pub content: Option<String>,
    pub video_key: Option<String>,
    #[serde(default)]
    pub duration_seconds: i32,
    #[serde(default)]
    pub is_free_preview: bool,
}

pub async fn add_lesson(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(module_id): Path<i64>,
    Json(req): Json<LessonRequest>,
) -> Result<(StatusCode, Json<lesson::Model>)> {
    let new_lesson = NewLesson {
        title: req.title,
        content: req.content,
        video_key: req.video_key,
        duration_seconds: req.duration_seconds,
        is_free_preview: req.is_free_preview,
    };
    let created = curriculum::add_lesson(&state.db, module_id, new_lesson).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn reorder_lessons(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(module_id): Path<i64>,
    Json(req): Json<OrderRequest>,
) -> Result<StatusCode> {
    curriculum::reorder_lessons(&state.db, module_id, &req.ids).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_lesson(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(lesson_id): Path<i64>,
) -> Result<StatusCode> {
    curriculum::delete_lesson(&state.db, lesson_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
