use chrono::Utc;
use sea_orm::ActiveValue::{Set, Unchanged};
use sea_orm::prelude::*;
use sea_orm::{ConnectionTrait, EntityTrait};
use tracing::warn;

use crate::entities::app_setting;
use crate::models::settings::AppSettings;

use super::StoreResult;

const SETTINGS_ROW_ID: i32 = 1;

/// Stored settings, or the defaults when nothing has been saved yet.
pub async fn load_settings<C: ConnectionTrait>(db: &C) -> Result<AppSettings, DbErr> {
    let Some(row) = app_setting::Entity::find_by_id(SETTINGS_ROW_ID).one(db).await? else {
        return Ok(AppSettings::default());
    };
    match serde_json::from_value(row.settings) {
        Ok(settings) => Ok(settings),
        Err(err) => {
            warn!("Stored settings are malformed, serving defaults: {err}");
            Ok(AppSettings::default())
        }
    }
}

pub async fn save_settings<C: ConnectionTrait>(db: &C, settings: &AppSettings) -> StoreResult<AppSettings> {
    let document = serde_json::to_value(settings)?;
    let now = Utc::now().fixed_offset();
    let existing = app_setting::Entity::find_by_id(SETTINGS_ROW_ID).one(db).await?;
    let row = if existing.is_some() {
        app_setting::ActiveModel {
            id: Unchanged(SETTINGS_ROW_ID),
            settings: Set(document),
            updated_at: Set(now),
        }
        .update(db)
        .await?
    } else {
        app_setting::ActiveModel {
            id: Set(SETTINGS_ROW_ID),
            settings: Set(document),
            updated_at: Set(now),
        }
        .insert(db)
        .await?
    };
    Ok(serde_json::from_value(row.settings)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::memory_database;

    #[tokio::test]
    async fn defaults_until_saved_then_overwritten_in_place() {
        let db = memory_database().await;
        assert_eq!(load_settings(&db).await.unwrap(), AppSettings::default());

        let mut settings = AppSettings::default();
        settings.site_name = "Hunter Daily".to_string();
        save_settings(&db, &settings).await.unwrap();
        settings.maintenance_mode = true;
        let saved = save_settings(&db, &settings).await.unwrap();
        assert!(saved.maintenance_mode);

        assert_eq!(load_settings(&db).await.unwrap(), settings);
        assert_eq!(app_setting::Entity::find().all(&db).await.unwrap().len(), 1);
    }
}
