use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::prelude::*;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ConnectionTrait, DatabaseConnection, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use tracing::info;

use crate::entities::{airdrop, user_rating};
use crate::models::rating::RatingStats;

use super::{StoreError, StoreResult};

pub const MAX_USER_AGENT_LEN: usize = 512;

pub async fn rating_stats<C: ConnectionTrait>(db: &C, airdrop_id: i32) -> Result<RatingStats, DbErr> {
    let ratings = user_rating::Entity::find()
        .select_only()
        .column(user_rating::Column::Rating)
        .filter(user_rating::Column::AirdropId.eq(airdrop_id))
        .into_tuple::<i32>()
        .all(db)
        .await?;
    Ok(RatingStats::from_ratings(&ratings))
}

/// Stats across every rating on the site.
pub async fn overall_stats<C: ConnectionTrait>(db: &C) -> Result<RatingStats, DbErr> {
    let ratings = user_rating::Entity::find()
        .select_only()
        .column(user_rating::Column::Rating)
        .into_tuple::<i32>()
        .all(db)
        .await?;
    Ok(RatingStats::from_ratings(&ratings))
}

pub async fn user_rating<C: ConnectionTrait>(
    db: &C,
    airdrop_id: i32,
    user_ip: &str,
) -> Result<Option<i32>, DbErr> {
    let row = user_rating::Entity::find()
        .filter(user_rating::Column::AirdropId.eq(airdrop_id))
        .filter(user_rating::Column::UserIp.eq(user_ip))
        .one(db)
        .await?;
    Ok(row.map(|row| row.rating))
}

pub async fn ensure_airdrop_exists<C: ConnectionTrait>(db: &C, airdrop_id: i32) -> StoreResult<()> {
    match airdrop::Entity::find_by_id(airdrop_id).one(db).await? {
        Some(_) => Ok(()),
        None => Err(StoreError::not_found("Airdrop", airdrop_id)),
    }
}

/// Inserts or replaces the rating for `(airdrop_id, user_ip)` and refreshes the
/// airdrop's cached `rating`/`total_ratings` columns from the new aggregate.
pub async fn submit_rating(
    db: &DatabaseConnection,
    airdrop_id: i32,
    user_ip: &str,
    rating: i32,
    user_agent: Option<&str>,
) -> StoreResult<RatingStats> {
    assert!((1..=5).contains(&rating), "Rating must be validated before storing");
    let txn = db.begin().await?;
    ensure_airdrop_exists(&txn, airdrop_id).await?;

    let now = Utc::now().fixed_offset();
    let user_agent = user_agent.map(|agent| agent.chars().take(MAX_USER_AGENT_LEN).collect::<String>());
    let row = user_rating::ActiveModel {
        airdrop_id: Set(airdrop_id),
        user_ip: Set(user_ip.to_string()),
        rating: Set(rating),
        user_agent: Set(user_agent),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    user_rating::Entity::insert(row)
        .on_conflict(
            OnConflict::columns([user_rating::Column::AirdropId, user_rating::Column::UserIp])
                .update_columns([
                    user_rating::Column::Rating,
                    user_rating::Column::UserAgent,
                    user_rating::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec(&txn)
        .await?;

    let stats = rating_stats(&txn, airdrop_id).await?;
    let total = i32::try_from(stats.total_ratings).unwrap_or(i32::MAX);
    airdrop::Entity::update_many()
        .col_expr(airdrop::Column::Rating, Expr::value(stats.average_rating))
        .col_expr(airdrop::Column::TotalRatings, Expr::value(total))
        .filter(airdrop::Column::Id.eq(airdrop_id))
        .exec(&txn)
        .await?;
    txn.commit().await?;

    info!(
        "Rating {rating} recorded for airdrop {airdrop_id}; average now {}",
        stats.average_rating
    );
    Ok(stats)
}

#[derive(Debug, Clone)]
pub struct RecentRating {
    pub airdrop_id: i32,
    pub rating: i32,
    pub created_at: DateTimeWithTimeZone,
}

pub async fn recent_ratings<C: ConnectionTrait>(db: &C, limit: u64) -> Result<Vec<RecentRating>, DbErr> {
    let rows = user_rating::Entity::find()
        .order_by_desc(user_rating::Column::UpdatedAt)
        .limit(limit)
        .all(db)
        .await?;
    Ok(rows
        .into_iter()
        .map(|row| RecentRating {
            airdrop_id: row.airdrop_id,
            rating: row.rating,
            created_at: row.updated_at,
        })
        .collect())
}
