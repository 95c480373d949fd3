use std::collections::HashMap;

use chrono::Utc;
use sea_orm::ActiveValue::{Set, Unchanged};
use sea_orm::prelude::*;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ConnectionTrait, DatabaseConnection, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait,
};
use tracing::info;

use crate::entities::{airdrop, category};
use crate::models::category::{CategoryDraft, CategoryView};

use super::{StoreError, StoreResult};

pub const DEFAULT_CATEGORY_PAGE_SIZE: u64 = 10;

/// Airdrop counts keyed by lowercased category name.
async fn airdrop_counts<C: ConnectionTrait>(db: &C) -> Result<HashMap<String, u64>, DbErr> {
    let rows = airdrop::Entity::find()
        .select_only()
        .column(airdrop::Column::Category)
        .column_as(airdrop::Column::Id.count(), "airdrop_count")
        .group_by(airdrop::Column::Category)
        .into_tuple::<(String, i64)>()
        .all(db)
        .await?;
    let mut counts = HashMap::with_capacity(rows.len());
    for (name, count) in rows {
        *counts.entry(name.to_lowercase()).or_insert(0) += u64::try_from(count).unwrap_or(0);
    }
    Ok(counts)
}

pub async fn count_airdrops_in<C: ConnectionTrait>(db: &C, name: &str) -> Result<u64, DbErr> {
    airdrop::Entity::find()
        .filter(Expr::expr(Func::lower(Expr::col(airdrop::Column::Category))).eq(name.to_lowercase()))
        .count(db)
        .await
}

pub struct CategoryPage {
    pub items: Vec<CategoryView>,
    pub total: u64,
}

pub async fn list_categories<C: ConnectionTrait>(
    db: &C,
    page: u64,
    limit: u64,
    search: Option<&str>,
) -> Result<CategoryPage, DbErr> {
    assert!(limit > 0, "Category page size must be positive");
    let mut select = category::Entity::find();
    if let Some(search) = search {
        let pattern = format!("%{}%", search.to_lowercase());
        select = select.filter(Expr::expr(Func::lower(Expr::col(category::Column::Name))).like(pattern));
    }
    let total = select.clone().count(db).await?;
    let rows = select
        .order_by_asc(category::Column::Name)
        .offset(page.saturating_sub(1).saturating_mul(limit))
        .limit(limit)
        .all(db)
        .await?;
    let counts = airdrop_counts(db).await?;
    let items = rows
        .iter()
        .map(|row| {
            let count = counts.get(&row.name.to_lowercase()).copied().unwrap_or(0);
            CategoryView::from_model(row, count)
        })
        .collect();
    Ok(CategoryPage { items, total })
}

pub async fn find_category<C: ConnectionTrait>(db: &C, id: i32) -> StoreResult<CategoryView> {
    let model = category::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| StoreError::not_found("Category", id))?;
    let count = count_airdrops_in(db, &model.name).await?;
    Ok(CategoryView::from_model(&model, count))
}

pub async fn create_category(db: &DatabaseConnection, draft: &CategoryDraft) -> StoreResult<CategoryView> {
    let txn = db.begin().await?;
    ensure_name_available(&txn, &draft.name, None).await?;
    let now = Utc::now().fixed_offset();
    let model = category::ActiveModel {
        name: Set(draft.name.clone()),
        description: Set(draft.description.clone()),
        color: Set(draft.color.clone()),
        icon: Set(draft.icon.clone()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    let count = count_airdrops_in(&txn, &model.name).await?;
    txn.commit().await?;
    info!("Created category {} ({})", model.id, model.name);
    Ok(CategoryView::from_model(&model, count))
}

pub async fn update_category(
    db: &DatabaseConnection,
    id: i32,
    draft: &CategoryDraft,
) -> StoreResult<CategoryView> {
    let txn = db.begin().await?;
    if category::Entity::find_by_id(id).one(&txn).await?.is_none() {
        return Err(StoreError::not_found("Category", id));
    }
    ensure_name_available(&txn, &draft.name, Some(id)).await?;
    let model = category::ActiveModel {
        id: Unchanged(id),
        name: Set(draft.name.clone()),
        description: Set(draft.description.clone()),
        color: Set(draft.color.clone()),
        icon: Set(draft.icon.clone()),
        updated_at: Set(Utc::now().fixed_offset()),
        ..Default::default()
    }
    .update(&txn)
    .await?;
    let count = count_airdrops_in(&txn, &model.name).await?;
    txn.commit().await?;
    Ok(CategoryView::from_model(&model, count))
}

/// Refuses to delete a category that airdrops still reference.
pub async fn delete_category(db: &DatabaseConnection, id: i32) -> StoreResult<CategoryView> {
    let txn = db.begin().await?;
    let view = find_category(&txn, id).await?;
    if view.airdrop_count > 0 {
        return Err(StoreError::Rejected(format!(
            "Cannot delete category. It has {} airdrops associated with it.",
            view.airdrop_count
        )));
    }
    category::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;
    info!("Deleted category {id} ({})", view.name);
    Ok(view)
}

/// Deletes every listed category, or none if any of them is still in use.
pub async fn bulk_delete_categories(db: &DatabaseConnection, ids: &[i32]) -> StoreResult<u64> {
    if ids.is_empty() {
        return Err(StoreError::Rejected("No categories selected".to_string()));
    }
    let txn = db.begin().await?;
    let selected = category::Entity::find()
        .filter(category::Column::Id.is_in(ids.iter().copied()))
        .all(&txn)
        .await?;
    let counts = airdrop_counts(&txn).await?;
    let in_use = selected
        .iter()
        .filter(|row| counts.get(&row.name.to_lowercase()).copied().unwrap_or(0) > 0)
        .count();
    if in_use > 0 {
        return Err(StoreError::Rejected(format!(
            "Cannot delete {in_use} categories that have airdrops associated with them."
        )));
    }
    let result = category::Entity::delete_many()
        .filter(category::Column::Id.is_in(ids.iter().copied()))
        .exec(&txn)
        .await?;
    txn.commit().await?;
    Ok(result.rows_affected)
}

async fn ensure_name_available<C: ConnectionTrait>(
    db: &C,
    name: &str,
    exclude: Option<i32>,
) -> StoreResult<()> {
    let mut select = category::Entity::find()
        .filter(Expr::expr(Func::lower(Expr::col(category::Column::Name))).eq(name.to_lowercase()));
    if let Some(id) = exclude {
        select = select.filter(category::Column::Id.ne(id));
    }
    if select.count(db).await? > 0 {
        return Err(StoreError::Conflict {
            field: "name",
            value: name.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::airdrops::create_airdrop;
    use crate::testing::{memory_database, sample_draft};

    fn draft(name: &str) -> CategoryDraft {
        CategoryDraft {
            name: name.to_string(),
            description: format!("{name} airdrops"),
            color: "#7cb342".to_string(),
            icon: "folder".to_string(),
        }
    }

    #[tokio::test]
    async fn counts_match_case_insensitively() {
        let db = memory_database().await;
        let latest = create_category(&db, &draft("latest")).await.unwrap();
        create_category(&db, &draft("Hottest")).await.unwrap();
        // sample airdrops use the "Latest" category
        create_airdrop(&db, &sample_draft("Counted")).await.unwrap();

        let page = list_categories(&db, 1, 10, None).await.unwrap();
        assert_eq!(page.total, 2);
        let counts: Vec<_> = page
            .items
            .iter()
            .map(|item| (item.name.as_str(), item.airdrop_count))
            .collect();
        assert_eq!(counts, vec![("Hottest", 0), ("latest", 1)]);
        assert_eq!(find_category(&db, latest.id).await.unwrap().airdrop_count, 1);
    }

    #[tokio::test]
    async fn delete_refused_while_in_use() {
        let db = memory_database().await;
        let latest = create_category(&db, &draft("Latest")).await.unwrap();
        let unused = create_category(&db, &draft("Unused")).await.unwrap();
        create_airdrop(&db, &sample_draft("Blocking")).await.unwrap();

        let err = delete_category(&db, latest.id).await.unwrap_err();
        assert!(err.to_string().contains("It has 1 airdrops"));
        assert!(bulk_delete_categories(&db, &[latest.id, unused.id]).await.is_err());
        assert_eq!(bulk_delete_categories(&db, &[unused.id]).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn names_are_unique_ignoring_case() {
        let db = memory_database().await;
        let first = create_category(&db, &draft("DeFi")).await.unwrap();
        let err = create_category(&db, &draft("defi")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { field: "name", .. }));

        let renamed = update_category(&db, first.id, &draft("DeFi Blue Chips")).await.unwrap();
        assert_eq!(renamed.name, "DeFi Blue Chips");
        assert_eq!(renamed.created_at, first.created_at);
    }
}
