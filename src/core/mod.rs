//! Framework-agnostic business logic.
//!
//! Every operation takes a `SeaORM` connection and returns the crate `Result`;
//! the HTTP layer only parses requests, checks roles and calls into here.

/// Regex-driven course assistant over the user's enrollments
pub mod assistant;
/// Category management
pub mod category;
/// Checkout sessions and payment webhooks
pub mod checkout;
/// Course catalogue and outlines
pub mod course;
/// Modules and lessons inside a course
pub mod curriculum;
/// Admin dashboard figures
pub mod dashboard;
/// Course access and lesson progress
pub mod enrollment;
/// Invoices for paid checkouts
pub mod invoice;
/// In-app notification inbox
pub mod notification;
/// Recurring plans mirrored from the payment provider
pub mod subscription;
/// Operational log table
pub mod system_log;
/// Theme presets and CSS variable generation
pub mod theme;
/// Users and roles
pub mod user;
/// Signed object storage URLs for lesson media
pub mod video;
