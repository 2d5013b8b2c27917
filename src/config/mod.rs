/// Application settings from config.toml and secrets from the environment
pub mod app;

/// Database configuration and connection management
pub mod database;

/// Catalogue seeding from config.toml
pub mod seed;

pub use app::{AppConfig, Secrets};
