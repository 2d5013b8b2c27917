//! System log business logic - Persisted operational events.

use crate::{
    entities::{SystemLog, system_log, system_log::LogLevel},
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, QuerySelect, Set, prelude::*};

/// Writes one entry. `context` is stored as compact JSON.
pub async fn record<C>(
    db: &C,
    level: LogLevel,
    source: &str,
    message: &str,
    context: Option<serde_json::Value>,
) -> Result<system_log::Model>
where
    C: ConnectionTrait,
{
    let entry = system_log::ActiveModel {
        level: Set(level),
        source: Set(source.to_string()),
        message: Set(message.to_string()),
        context: Set(context.map(|c| c.to_string())),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    Ok(entry.insert(db).await?)
}

/// Newest entries first, optionally only one level.
pub async fn list_recent(
    db: &DatabaseConnection,
    limit: u64,
    level: Option<LogLevel>,
) -> Result<Vec<system_log::Model>> {
    let mut query = SystemLog::find();
    if let Some(level) = level {
        query = query.filter(system_log::Column::Level.eq(level));
    }
    query
        .order_by_desc(system_log::Column::CreatedAt)
        .order_by_desc(system_log::Column::Id)
        .limit(limit)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Deletes entries older than `cutoff`; returns how many were removed.
pub async fn purge_older_than(db: &DatabaseConnection, cutoff: DateTime<Utc>) -> Result<u64> {
    let result = SystemLog::delete_many()
        .filter(system_log::Column::CreatedAt.lt(cutoff))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use chrono::Duration;
    use serde_json::json;

    #[tokio::test]
    async fn test_record_and_filter() -> Result<()> {
        let db = setup_test_db().await?;
        record(&db, LogLevel::Info, "checkout", "Payment completed", Some(json!({"payment_id": 1}))).await?;
        record(&db, LogLevel::Error, "http", "POST /api/checkout returned 500", None).await?;

        let all = list_recent(&db, 10, None).await?;
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].source, "http");
        assert_eq!(all[1].context.as_deref(), Some(r#"{"payment_id":1}"#));

        let errors = list_recent(&db, 10, Some(LogLevel::Error)).await?;
        assert_eq!(errors.len(), 1);
        assert_eq!(list_recent(&db, 1, None).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_purge_older_than() -> Result<()> {
        let db = setup_test_db().await?;
        record(&db, LogLevel::Warn, "test", "recent", None).await?;

        assert_eq!(purge_older_than(&db, Utc::now() - Duration::days(1)).await?, 0);
        assert_eq!(purge_older_than(&db, Utc::now() + Duration::seconds(1)).await?, 1);
        assert!(list_recent(&db, 10, None).await?.is_empty());
        Ok(())
    }
}
