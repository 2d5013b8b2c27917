//! Shared test utilities for `Coursehub`.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults, plus in-memory doubles
//! for the payment provider and mailer.

use crate::{
    core::{
        category,
        course::{self, NewCourse},
        curriculum::{self, NewLesson},
        user,
    },
    entities::{self, payment::PaymentStatus, user::Role},
    errors::Result,
    integrations::{
        email::{EmailMessage, Mailer},
        payments::{CheckoutRequest, CheckoutSession, PaymentGateway},
    },
};
use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use std::sync::Mutex;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a student with the local part of the email as name.
pub async fn create_test_user(db: &DatabaseConnection, email: &str) -> Result<entities::user::Model> {
    let name = email.split('@').next().unwrap_or(email);
    user::create_user(db, email, name, Role::Student).await
}

/// Appends a five-minute lesson to a module.
pub async fn create_test_lesson(
    db: &DatabaseConnection,
    module_id: i64,
    title: &str,
) -> Result<entities::lesson::Model> {
    curriculum::add_lesson(
        db,
        module_id,
        NewLesson {
            title: title.to_string(),
            duration_seconds: 300,
            ..Default::default()
        },
    )
    .await
}

/// Creates a published course with one module and one lesson.
///
/// # Defaults
/// * `category_id`: None
/// * `currency`: "USD"
pub async fn create_published_course(
    db: &DatabaseConnection,
    instructor_id: i64,
    title: &str,
    price_cents: i64,
) -> Result<entities::course::Model> {
    let created = course::create_course(
        db,
        NewCourse {
            title: title.to_string(),
            slug: None,
            description: format!("All about {title}"),
            category_id: None,
            instructor_id,
            price_cents,
            currency: "USD".to_string(),
        },
    )
    .await?;
    let module = curriculum::add_module(db, created.id, "Getting Started").await?;
    create_test_lesson(db, module.id, "Welcome").await?;
    course::set_published(db, created.id, true).await
}

/// Sets up a database with an instructor and a draft course.
///
/// # Defaults
/// * instructor: "instructor@example.com" with role instructor
/// * course: "Intro to Rust", 4900 USD, in category "Programming"
pub async fn setup_with_course() -> Result<(
    DatabaseConnection,
    entities::user::Model,
    entities::course::Model,
)> {
    let db = setup_test_db().await?;
    let instructor = create_test_user(&db, "instructor@example.com").await?;
    let instructor = user::set_user_role(&db, instructor.id, Role::Instructor).await?;
    let programming = category::create_category(&db, "Programming", None, None).await?;

    let created = course::create_course(
        &db,
        NewCourse {
            title: "Intro to Rust".to_string(),
            slug: None,
            description: "Ownership, borrowing and friends".to_string(),
            category_id: Some(programming.id),
            instructor_id: instructor.id,
            price_cents: 4900,
            currency: "USD".to_string(),
        },
    )
    .await?;
    Ok((db, instructor, created))
}

/// Same as [`setup_with_course`], but the course has one module with one
/// lesson and is published.
pub async fn setup_with_published_course() -> Result<(
    DatabaseConnection,
    entities::user::Model,
    entities::course::Model,
)> {
    let (db, instructor, draft) = setup_with_course().await?;
    let module = curriculum::add_module(&db, draft.id, "Basics").await?;
    create_test_lesson(&db, module.id, "Hello, Cargo").await?;
    let published = course::set_published(&db, draft.id, true).await?;
    Ok((db, instructor, published))
}

/// Inserts a pending payment without items.
pub async fn create_test_payment(
    db: &DatabaseConnection,
    user_id: i64,
    session_id: &str,
    amount_cents: i64,
) -> Result<entities::payment::Model> {
    let payment = entities::payment::ActiveModel {
        user_id: Set(user_id),
        provider_session_id: Set(session_id.to_string()),
        provider_payment_id: Set(None),
        amount_cents: Set(amount_cents),
        currency: Set("USD".to_string()),
        status: Set(PaymentStatus::Pending),
        created_at: Set(chrono::Utc::now()),
        paid_at: Set(None),
        ..Default::default()
    };
    Ok(payment.insert(db).await?)
}

/// Mailer that keeps every message in memory
#[derive(Debug, Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingMailer {
    pub fn messages(&self) -> Vec<EmailMessage> {
        self.sent.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(message.clone());
        }
        Ok(())
    }
}

/// Gateway that hands out sequential `cs_test_N` sessions and records requests
#[derive(Debug, Default)]
pub struct FakeGateway {
    pub requests: Mutex<Vec<CheckoutRequest>>,
}

impl FakeGateway {
    pub fn requests(&self) -> Vec<CheckoutRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession> {
        let mut requests = self
            .requests
            .lock()
            .map_err(|_| crate::errors::Error::Payment { message: "poisoned".to_string() })?;
        requests.push(request.clone());
        let id = format!("cs_test_{}", requests.len());
        Ok(CheckoutSession {
            url: format!("https://pay.example.com/{id}"),
            id,
        })
    }
}
