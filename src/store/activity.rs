use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::prelude::*;
use sea_orm::{ConnectionTrait, QueryOrder, QuerySelect};
use serde_json::Value;
use tracing::{debug, warn};

use crate::entities::admin_activity;

/// Appends an admin audit entry. Failures are logged and swallowed so that an
/// audit problem never fails the admin operation itself.
pub async fn record_activity<C: ConnectionTrait>(db: &C, action: &str, details: Value) {
    let entry = admin_activity::ActiveModel {
        action: Set(action.to_string()),
        details: Set(details),
        created_at: Set(Utc::now().fixed_offset()),
        ..Default::default()
    };
    match entry.insert(db).await {
        Ok(row) => debug!("Recorded admin activity {} ({action})", row.id),
        Err(err) => warn!("Failed to record admin activity {action}: {err}"),
    }
}

pub async fn recent_activity<C: ConnectionTrait>(
    db: &C,
    limit: u64,
) -> Result<Vec<admin_activity::Model>, DbErr> {
    admin_activity::Entity::find()
        .order_by_desc(admin_activity::Column::CreatedAt)
        .order_by_desc(admin_activity::Column::Id)
        .limit(limit)
        .all(db)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::memory_database;
    use serde_json::json;

    #[tokio::test]
    async fn newest_entries_first() {
        let db = memory_database().await;
        record_activity(&db, "settings_updated", json!({ "changes": ["siteName"] })).await;
        record_activity(&db, "backup_created", json!({})).await;
        let entries = recent_activity(&db, 10).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, "backup_created");
        assert_eq!(entries[1].details["changes"][0], "siteName");
    }
}
