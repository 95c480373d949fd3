use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::prelude::*;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ConnectionTrait, DatabaseBackend, DatabaseConnection, IdenStatic, Iterable, QueryFilter,
    QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::entities::prelude::*;
use crate::entities::{airdrop, airdrop_step, app_setting, category};

use super::{StoreError, StoreResult};

pub const BACKUP_VERSION: &str = "1.0";

const SERIAL_TABLES: [&str; 3] = ["airdrops", "airdrop_steps", "categories"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupDocument {
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub data: BackupData,
    #[serde(default)]
    pub metadata: BackupMetadata,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupData {
    pub airdrops: Vec<airdrop::Model>,
    pub steps: Vec<airdrop_step::Model>,
    pub categories: Vec<category::Model>,
    pub settings: Vec<app_setting::Model>,
}

impl BackupData {
    pub fn total_records(&self) -> usize {
        self.airdrops.len() + self.steps.len() + self.categories.len() + self.settings.len()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackupMetadata {
    pub total_records: usize,
    pub tables: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRestore {
    pub table: &'static str,
    pub restored: usize,
}

pub async fn create_backup<C: ConnectionTrait>(db: &C) -> Result<BackupDocument, DbErr> {
    let data = BackupData {
        airdrops: Airdrop::find()
            .order_by_asc(airdrop::Column::Id)
            .all(db)
            .await?,
        steps: AirdropStep::find()
            .order_by_asc(airdrop_step::Column::AirdropId)
            .order_by_asc(airdrop_step::Column::StepNumber)
            .all(db)
            .await?,
        categories: Category::find()
            .order_by_asc(category::Column::Id)
            .all(db)
            .await?,
        settings: AppSetting::find().all(db).await?,
    };
    let metadata = BackupMetadata {
        total_records: data.total_records(),
        tables: ["airdrops", "airdrop_steps", "categories", "app_settings"]
            .into_iter()
            .map(str::to_string)
            .collect(),
    };
    Ok(BackupDocument {
        version: BACKUP_VERSION.to_string(),
        timestamp: Utc::now(),
        data,
        metadata,
    })
}

/// Upserts every record of the document by primary key inside one
/// transaction. Steps of restored airdrops are replaced wholesale so their
/// numbering matches the backup.
pub async fn restore_backup(
    db: &DatabaseConnection,
    document: &BackupDocument,
) -> StoreResult<Vec<TableRestore>> {
    if document.version != BACKUP_VERSION {
        return Err(StoreError::Rejected(format!(
            "Unsupported backup version {}",
            document.version
        )));
    }
    let data = &document.data;
    let airdrop_ids: BTreeSet<i32> = data.airdrops.iter().map(|row| row.id).collect();
    if let Some(orphan) = data
        .steps
        .iter()
        .find(|step| !airdrop_ids.contains(&step.airdrop_id))
    {
        return Err(StoreError::Rejected(format!(
            "Step {} references airdrop {} which is not in the backup",
            orphan.id, orphan.airdrop_id
        )));
    }

    let txn = db.begin().await?;
    let mut results = Vec::with_capacity(4);

    for row in &data.settings {
        app_setting::Entity::insert(app_setting::ActiveModel {
            id: Set(row.id),
            settings: Set(row.settings.clone()),
            updated_at: Set(row.updated_at),
        })
        .on_conflict(upsert_on_id::<app_setting::Entity>(app_setting::Column::Id))
        .exec(&txn)
        .await?;
    }
    results.push(TableRestore {
        table: "app_settings",
        restored: data.settings.len(),
    });

    for row in &data.categories {
        category::Entity::insert(category::ActiveModel {
            id: Set(row.id),
            name: Set(row.name.clone()),
            description: Set(row.description.clone()),
            color: Set(row.color.clone()),
            icon: Set(row.icon.clone()),
            created_at: Set(row.created_at),
            updated_at: Set(row.updated_at),
        })
        .on_conflict(upsert_on_id::<category::Entity>(category::Column::Id))
        .exec(&txn)
        .await?;
    }
    results.push(TableRestore {
        table: "categories",
        restored: data.categories.len(),
    });

    for row in &data.airdrops {
        airdrop::Entity::insert(airdrop_row(row))
            .on_conflict(upsert_on_id::<airdrop::Entity>(airdrop::Column::Id))
            .exec(&txn)
            .await?;
    }
    results.push(TableRestore {
        table: "airdrops",
        restored: data.airdrops.len(),
    });

    if !airdrop_ids.is_empty() {
        airdrop_step::Entity::delete_many()
            .filter(airdrop_step::Column::AirdropId.is_in(airdrop_ids.iter().copied()))
            .exec(&txn)
            .await?;
    }
    for row in &data.steps {
        airdrop_step::Entity::insert(airdrop_step::ActiveModel {
            id: Set(row.id),
            airdrop_id: Set(row.airdrop_id),
            step_number: Set(row.step_number),
            title: Set(row.title.clone()),
            description: Set(row.description.clone()),
            is_required: Set(row.is_required),
            created_at: Set(row.created_at),
        })
        .on_conflict(upsert_on_id::<airdrop_step::Entity>(airdrop_step::Column::Id))
        .exec(&txn)
        .await?;
    }
    results.push(TableRestore {
        table: "airdrop_steps",
        restored: data.steps.len(),
    });

    if txn.get_database_backend() == DatabaseBackend::Postgres {
        for table in SERIAL_TABLES {
            txn.execute_unprepared(&format!(
                "SELECT setval(pg_get_serial_sequence('{table}', 'id'), \
                 COALESCE((SELECT MAX(id) FROM {table}), 1))"
            ))
            .await?;
        }
    }
    txn.commit().await?;

    info!(
        "Restored backup from {} ({} records)",
        document.timestamp,
        data.total_records()
    );
    Ok(results)
}

fn upsert_on_id<E: EntityTrait>(id: E::Column) -> OnConflict {
    let id_name = id.as_str().to_string();
    OnConflict::column(id)
        .update_columns(E::Column::iter().filter(|column| column.as_str() != id_name))
        .to_owned()
}

fn airdrop_row(row: &airdrop::Model) -> airdrop::ActiveModel {
    airdrop::ActiveModel {
        id: Set(row.id),
        slug: Set(row.slug.clone()),
        name: Set(row.name.clone()),
        logo: Set(row.logo.clone()),
        description: Set(row.description.clone()),
        action: Set(row.action.clone()),
        category: Set(row.category.clone()),
        status: Set(row.status.clone()),
        difficulty: Set(row.difficulty.clone()),
        reward: Set(row.reward.clone()),
        start_date: Set(row.start_date.clone()),
        rating: Set(row.rating),
        total_ratings: Set(row.total_ratings),
        participants: Set(row.participants),
        social_links: Set(row.social_links.clone()),
        about: Set(row.about.clone()),
        requirements: Set(row.requirements.clone()),
        networks: Set(row.networks.clone()),
        is_hot: Set(row.is_hot),
        is_confirmed: Set(row.is_confirmed),
        created_at: Set(row.created_at),
        updated_at: Set(row.updated_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::airdrops::{create_airdrop, delete_airdrop, find_airdrop};
    use crate::testing::{memory_database, sample_draft};
    use sea_orm::PaginatorTrait;

    #[tokio::test]
    async fn backup_then_restore_recreates_deleted_rows() {
        let db = memory_database().await;
        let kept = create_airdrop(&db, &sample_draft("Kept")).await.unwrap();
        let lost = create_airdrop(&db, &sample_draft("Lost")).await.unwrap();

        let document = create_backup(&db).await.unwrap();
        assert_eq!(document.version, BACKUP_VERSION);
        assert_eq!(document.data.airdrops.len(), 2);
        assert_eq!(document.metadata.total_records, 6);

        delete_airdrop(&db, lost.id()).await.unwrap();
        let wire = serde_json::to_value(&document).unwrap();
        let parsed: BackupDocument = serde_json::from_value(wire).unwrap();
        let results = restore_backup(&db, &parsed).await.unwrap();
        assert!(results.iter().any(|r| r.table == "airdrops" && r.restored == 2));

        let restored = find_airdrop(&db, lost.id()).await.unwrap();
        assert_eq!(restored.summary.slug, "lost");
        assert_eq!(restored.steps.len(), 2);
        assert_eq!(find_airdrop(&db, kept.id()).await.unwrap().steps.len(), 2);
        assert_eq!(airdrop_step::Entity::find().count(&db).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn rejects_unknown_version_and_orphan_steps() {
        let db = memory_database().await;
        create_airdrop(&db, &sample_draft("Solo")).await.unwrap();
        let mut document = create_backup(&db).await.unwrap();
        document.version = "2.0".to_string();
        assert!(matches!(
            restore_backup(&db, &document).await,
            Err(StoreError::Rejected(_))
        ));

        document.version = BACKUP_VERSION.to_string();
        document.data.airdrops.clear();
        assert!(matches!(
            restore_backup(&db, &document).await,
            Err(StoreError::Rejected(_))
        ));
    }
}
