//! Clients for the managed services the platform delegates to.

/// Transactional email provider
pub mod email;
/// Hosted checkout provider and its webhooks
pub mod payments;
/// HMAC-SHA256 helpers shared by webhooks and signed URLs
pub mod signing;
