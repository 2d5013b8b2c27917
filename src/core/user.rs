//! User business logic - Accounts and roles.
//!
//! Accounts are created the first time the session provider reports a login
//! (`sync_user`); admins can promote users afterwards.

use crate::{
    entities::{User, user, user::Role},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};

fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if valid {
        Ok(email)
    } else {
        Err(Error::validation("email", "must be a valid email address"))
    }
}

/// Creates a user after normalising and validating the email.
pub async fn create_user(
    db: &DatabaseConnection,
    email: &str,
    name: &str,
    role: Role,
) -> Result<user::Model> {
    let email = normalize_email(email)?;
    if name.trim().is_empty() {
        return Err(Error::validation("name", "cannot be empty"));
    }

    if get_user_by_email(db, &email).await?.is_some() {
        return Err(Error::conflict(format!("a user with email {email} already exists")));
    }

    let user = user::ActiveModel {
        email: Set(email),
        name: Set(name.trim().to_string()),
        role: Set(role),
        payment_customer_id: Set(None),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    Ok(user.insert(db).await?)
}

/// Finds a user by primary key.
pub async fn get_user_by_id<C>(db: &C, user_id: i64) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find_by_id(user_id).one(db).await.map_err(Into::into)
}

/// Finds a user by email; the lookup is case-insensitive.
pub async fn get_user_by_email(
    db: &DatabaseConnection,
    email: &str,
) -> Result<Option<user::Model>> {
    User::find()
        .filter(user::Column::Email.eq(email.trim().to_lowercase()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists all users, newest first.
pub async fn list_users(db: &DatabaseConnection) -> Result<Vec<user::Model>> {
    User::find()
        .order_by_desc(user::Column::CreatedAt)
        .order_by_desc(user::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Changes a user's role.
pub async fn set_user_role(db: &DatabaseConnection, user_id: i64, role: Role) -> Result<user::Model> {
    let existing = get_user_by_id(db, user_id)
        .await?
        .ok_or_else(|| Error::not_found("user", user_id))?;

    let mut active: user::ActiveModel = existing.into();
    active.role = Set(role);
    Ok(active.update(db).await?)
}

/// Stores the payment provider's customer id on the user.
pub async fn set_payment_customer_id<C>(db: &C, user_id: i64, customer_id: &str) -> Result<()>
where
    C: ConnectionTrait,
{
    let existing = get_user_by_id(db, user_id)
        .await?
        .ok_or_else(|| Error::not_found("user", user_id))?;

    if existing.payment_customer_id.as_deref() != Some(customer_id) {
        let mut active: user::ActiveModel = existing.into();
        active.payment_customer_id = Set(Some(customer_id.to_string()));
        active.update(db).await?;
    }
    Ok(())
}

/// Returns the user for `email`, creating a student account on first login.
///
/// The boolean is `true` when the account was created by this call.
pub async fn sync_user(
    db: &DatabaseConnection,
    email: &str,
    name: &str,
) -> Result<(user::Model, bool)> {
    let normalized = normalize_email(email)?;
    if let Some(existing) = get_user_by_email(db, &normalized).await? {
        return Ok((existing, false));
    }

    let created = create_user(db, &normalized, name, Role::Student).await?;
    tracing::info!(user_id = created.id, "Registered new user");
    Ok((created, true))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_create_user_validation() -> Result<()> {
        let db = setup_test_db().await?;

        let result = create_user(&db, "not-an-email", "Ada", Role::Student).await;
        assert!(matches!(result, Err(Error::Validation { ref field, .. }) if field == "email"));

        let result = create_user(&db, "ada@example.com", "   ", Role::Student).await;
        assert!(matches!(result, Err(Error::Validation { ref field, .. }) if field == "name"));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_user_normalizes_email() -> Result<()> {
        let db = setup_test_db().await?;

        let user = create_user(&db, "  Ada@Example.COM ", "Ada", Role::Student).await?;
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.role, Role::Student);

        let found = get_user_by_email(&db, "ADA@example.com").await?;
        assert_eq!(found.unwrap().id, user.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_email_is_conflict() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_user(&db, "dup@example.com").await?;

        let result = create_user(&db, "DUP@example.com", "Other", Role::Student).await;
        assert!(matches!(result, Err(Error::Conflict { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_sync_user_creates_once() -> Result<()> {
        let db = setup_test_db().await?;

        let (first, created) = sync_user(&db, "new@example.com", "New").await?;
        assert!(created);

        let (second, created_again) = sync_user(&db, "New@Example.com", "Renamed").await?;
        assert!(!created_again);
        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "New");
        Ok(())
    }

    #[tokio::test]
    async fn test_set_user_role() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "promote@example.com").await?;

        let promoted = set_user_role(&db, user.id, Role::Instructor).await?;
        assert_eq!(promoted.role, Role::Instructor);

        let missing = set_user_role(&db, 999, Role::Admin).await;
        assert!(matches!(missing, Err(Error::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_users_newest_first() -> Result<()> {
        let db = setup_test_db().await?;
        let a = create_test_user(&db, "a@example.com").await?;
        let b = create_test_user(&db, "b@example.com").await?;

        let users = list_users(&db).await?;
        assert_eq!(users.len(), 2);
        // Same-second timestamps fall back to id ordering
        assert_eq!(users[0].id, b.id.max(a.id));
        Ok(())
    }

    #[tokio::test]
    async fn test_set_payment_customer_id() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "cust@example.com").await?;

        set_payment_customer_id(&db, user.id, "cus_123").await?;
        let reloaded = get_user_by_id(&db, user.id).await?.unwrap();
        assert_eq!(reloaded.payment_customer_id.as_deref(), Some("cus_123"));
        Ok(())
    }
}
