//! Notification business logic - The in-app inbox.
//!
//! Every query is scoped by the owning user; touching someone else's
//! notification behaves exactly like touching one that does not exist.

use crate::{
    entities::{Notification, notification, notification::NotificationKind},
    errors::{Error, Result},
};
use sea_orm::sea_query::Expr;
use sea_orm::{PaginatorTrait, QueryOrder, Set, prelude::*};

/// Adds a message to a user's inbox.
pub async fn notify<C>(
    db: &C,
    user_id: i64,
    kind: NotificationKind,
    title: &str,
    body: &str,
    link: Option<String>,
) -> Result<notification::Model>
where
    C: ConnectionTrait,
{
    let notification = notification::ActiveModel {
        user_id: Set(user_id),
        kind: Set(kind),
        title: Set(title.to_string()),
        body: Set(body.to_string()),
        link: Set(link),
        is_read: Set(false),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    Ok(notification.insert(db).await?)
}

/// Lists a user's notifications, newest first.
pub async fn list_notifications(
    db: &DatabaseConnection,
    user_id: i64,
    unread_only: bool,
) -> Result<Vec<notification::Model>> {
    let mut query = Notification::find().filter(notification::Column::UserId.eq(user_id));
    if unread_only {
        query = query.filter(notification::Column::IsRead.eq(false));
    }
    query
        .order_by_desc(notification::Column::CreatedAt)
        .order_by_desc(notification::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Number of unread notifications, for the header badge.
pub async fn unread_count(db: &DatabaseConnection, user_id: i64) -> Result<u64> {
    Notification::find()
        .filter(notification::Column::UserId.eq(user_id))
        .filter(notification::Column::IsRead.eq(false))
        .count(db)
        .await
        .map_err(Into::into)
}

async fn find_owned(
    db: &DatabaseConnection,
    user_id: i64,
    notification_id: i64,
) -> Result<notification::Model> {
    Notification::find_by_id(notification_id)
        .filter(notification::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("notification", notification_id))
}

/// Marks one notification as read.
pub async fn mark_read(
    db: &DatabaseConnection,
    user_id: i64,
    notification_id: i64,
) -> Result<notification::Model> {
    let existing = find_owned(db, user_id, notification_id).await?;
    if existing.is_read {
        return Ok(existing);
    }
    let mut active: notification::ActiveModel = existing.into();
    active.is_read = Set(true);
    Ok(active.update(db).await?)
}

/// Marks every unread notification as read; returns how many changed.
pub async fn mark_all_read(db: &DatabaseConnection, user_id: i64) -> Result<u64> {
    let result = Notification::update_many()
        .col_expr(notification::Column::IsRead, Expr::value(true))
        .filter(notification::Column::UserId.eq(user_id))
        .filter(notification::Column::IsRead.eq(false))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Deletes one notification.
pub async fn delete_notification(
    db: &DatabaseConnection,
    user_id: i64,
    notification_id: i64,
) -> Result<()> {
    let existing = find_owned(db, user_id, notification_id).await?;
    existing.delete(db).await?;
    Ok(())
}
