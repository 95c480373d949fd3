use std::collections::HashMap;

use chrono::Utc;
use sea_orm::ActiveValue::{Set, Unchanged};
use sea_orm::prelude::*;
use sea_orm::sea_query::{Expr, Func, SimpleExpr};
use sea_orm::{
    Condition, ConnectionTrait, DatabaseConnection, Order, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, QueryTrait, TransactionTrait, UpdateMany,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catalog::{StepDraft, StepList};
use crate::entities::{airdrop, airdrop_step, user_rating};
use crate::models::airdrop::{
    AirdropStatus, AirdropSummary, AirdropView, ListingPage, ListingStats, Pagination, StepView,
};
use crate::validation::AirdropDraft;

use super::{StoreError, StoreResult};

pub const DEFAULT_PAGE_SIZE: u64 = 12;
pub const MAX_PAGE_SIZE: u64 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortField {
    #[default]
    CreatedAt,
    Rating,
    Participants,
    Name,
}

impl SortField {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "createdAt" | "created_at" => Some(Self::CreatedAt),
            "rating" => Some(Self::Rating),
            "participants" => Some(Self::Participants),
            "name" => Some(Self::Name),
            _ => None,
        }
    }

    fn column(self) -> airdrop::Column {
        match self {
            Self::CreatedAt => airdrop::Column::CreatedAt,
            Self::Rating => airdrop::Column::Rating,
            Self::Participants => airdrop::Column::Participants,
            Self::Name => airdrop::Column::Name,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }
}

/// Normalized listing request. Equal queries select equal rows, so the
/// value doubles as a cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListingQuery {
    pub page: u64,
    pub limit: u64,
    /// Raw row offset when it does not fall on a page boundary
    pub offset: Option<u64>,
    pub search: Option<String>,
    pub category: Option<String>,
    pub status: Option<AirdropStatus>,
    pub sort_by: SortField,
    pub sort_order: SortDirection,
}

impl ListingQuery {
    pub fn home_feed(page_size: u64) -> Self {
        assert!(
            (1..=MAX_PAGE_SIZE).contains(&page_size),
            "Home feed page size out of range"
        );
        Self {
            page: 1,
            limit: page_size,
            offset: None,
            search: None,
            category: None,
            status: None,
            sort_by: SortField::CreatedAt,
            sort_order: SortDirection::Desc,
        }
    }

    /// Folds an explicit offset into `page` when it lands on a page boundary.
    pub fn with_offset(mut self, offset: u64) -> Self {
        if offset % self.limit == 0 {
            self.page = offset / self.limit + 1;
            self.offset = None;
        } else {
            self.offset = Some(offset);
        }
        self
    }

    pub fn start(&self) -> u64 {
        self.offset
            .unwrap_or_else(|| self.page.saturating_sub(1).saturating_mul(self.limit))
    }

    pub fn page_number(&self) -> u64 {
        match self.offset {
            Some(offset) => offset / self.limit + 1,
            None => self.page,
        }
    }
}

pub async fn list_airdrops<C: ConnectionTrait>(
    db: &C,
    query: &ListingQuery,
) -> Result<ListingPage, DbErr> {
    assert!(
        (1..=MAX_PAGE_SIZE).contains(&query.limit),
        "Listing limit must be normalized before querying"
    );
    let mut select = airdrop::Entity::find();
    if let Some(search) = query.search.as_deref() {
        let pattern = format!("%{}%", search.to_lowercase());
        select = select.filter(
            Condition::any()
                .add(lowered(airdrop::Column::Name).like(pattern.clone()))
                .add(lowered(airdrop::Column::Description).like(pattern)),
        );
    }
    if let Some(category) = query.category.as_deref() {
        select = select.filter(lowered(airdrop::Column::Category).eq(category.to_lowercase()));
    }
    if let Some(status) = query.status {
        select = select.filter(airdrop::Column::Status.eq(status.as_str()));
    }

    let total = select.clone().count(db).await?;
    let order = match query.sort_order {
        SortDirection::Asc => Order::Asc,
        SortDirection::Desc => Order::Desc,
    };
    let rows = select
        .order_by(query.sort_by.column(), order)
        .order_by_desc(airdrop::Column::Id)
        .offset(query.start())
        .limit(query.limit)
        .all(db)
        .await?;
    let stats = listing_stats(db).await?;

    Ok(ListingPage {
        items: rows.iter().map(AirdropSummary::from_model).collect(),
        stats,
        pagination: Pagination::new(query.page_number(), query.limit, total),
    })
}

/// Counts over the whole table, independent of any listing filter.
pub async fn listing_stats<C: ConnectionTrait>(db: &C) -> Result<ListingStats, DbErr> {
    let by_status = |status: AirdropStatus| {
        airdrop::Entity::find().filter(airdrop::Column::Status.eq(status.as_str()))
    };
    Ok(ListingStats {
        total: airdrop::Entity::find().count(db).await?,
        active: by_status(AirdropStatus::Active).count(db).await?,
        confirmed: airdrop::Entity::find()
            .filter(airdrop::Column::IsConfirmed.eq(true))
            .count(db)
            .await?,
        hot: airdrop::Entity::find()
            .filter(airdrop::Column::IsHot.eq(true))
            .count(db)
            .await?,
        upcoming: by_status(AirdropStatus::Upcoming).count(db).await?,
        ended: by_status(AirdropStatus::Ended).count(db).await?,
    })
}

/// Sum of the `participants` column. Added up here so the result type does
/// not depend on the backend's SUM widening.
pub async fn total_participants<C: ConnectionTrait>(db: &C) -> Result<i64, DbErr> {
    let counts = airdrop::Entity::find()
        .select_only()
        .column(airdrop::Column::Participants)
        .into_tuple::<i64>()
        .all(db)
        .await?;
    Ok(counts.into_iter().fold(0_i64, i64::saturating_add))
}

pub async fn recent_airdrops<C: ConnectionTrait>(
    db: &C,
    limit: u64,
) -> Result<Vec<AirdropSummary>, DbErr> {
    let rows = airdrop::Entity::find()
        .order_by_desc(airdrop::Column::CreatedAt)
        .order_by_desc(airdrop::Column::Id)
        .limit(limit)
        .all(db)
        .await?;
    Ok(rows.iter().map(AirdropSummary::from_model).collect())
}

pub async fn find_airdrop<C: ConnectionTrait>(db: &C, id: i32) -> StoreResult<AirdropView> {
    let model = airdrop::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| StoreError::not_found("Airdrop", id))?;
    let steps = load_steps(db, model.id).await?;
    Ok(AirdropView::from_parts(&model, &steps))
}

pub async fn find_airdrop_by_slug<C: ConnectionTrait>(
    db: &C,
    slug: &str,
) -> StoreResult<AirdropView> {
    let model = airdrop::Entity::find()
        .filter(airdrop::Column::Slug.eq(slug))
        .one(db)
        .await?
        .ok_or_else(|| StoreError::not_found("Airdrop", slug))?;
    let steps = load_steps(db, model.id).await?;
    Ok(AirdropView::from_parts(&model, &steps))
}

pub async fn load_steps<C: ConnectionTrait>(
    db: &C,
    airdrop_id: i32,
) -> Result<Vec<airdrop_step::Model>, DbErr> {
    airdrop_step::Entity::find()
        .filter(airdrop_step::Column::AirdropId.eq(airdrop_id))
        .order_by_asc(airdrop_step::Column::StepNumber)
        .all(db)
        .await
}

pub async fn create_airdrop(db: &DatabaseConnection, draft: &AirdropDraft) -> StoreResult<AirdropView> {
    let txn = db.begin().await?;
    ensure_slug_available(&txn, &draft.basic.slug, None).await?;

    let now = Utc::now().fixed_offset();
    let mut active = draft_columns(draft)?;
    active.rating = Set(0.0);
    active.total_ratings = Set(0);
    active.created_at = Set(now);
    active.updated_at = Set(now);
    let model = active.insert(&txn).await?;

    insert_steps(&txn, model.id, &draft.steps).await?;
    let steps = load_steps(&txn, model.id).await?;
    txn.commit().await?;

    info!(
        "Created airdrop {} ({}) with {} steps",
        model.id,
        model.slug,
        steps.len()
    );
    Ok(AirdropView::from_parts(&model, &steps))
}

/// Rewrites the row and replaces its steps, renumbered from 1, in one
/// transaction. Ratings and creation time are preserved.
pub async fn update_airdrop(
    db: &DatabaseConnection,
    id: i32,
    draft: &AirdropDraft,
) -> StoreResult<AirdropView> {
    let txn = db.begin().await?;
    if airdrop::Entity::find_by_id(id).one(&txn).await?.is_none() {
        return Err(StoreError::not_found("Airdrop", id));
    }
    ensure_slug_available(&txn, &draft.basic.slug, Some(id)).await?;

    let mut active = draft_columns(draft)?;
    active.id = Unchanged(id);
    active.updated_at = Set(Utc::now().fixed_offset());
    let model = active.update(&txn).await?;

    replace_steps(&txn, id, &draft.steps).await?;
    let steps = load_steps(&txn, id).await?;
    txn.commit().await?;

    info!("Updated airdrop {id} ({})", model.slug);
    Ok(AirdropView::from_parts(&model, &steps))
}

/// Removes the airdrop with its steps and ratings, returning what was deleted.
pub async fn delete_airdrop(db: &DatabaseConnection, id: i32) -> StoreResult<AirdropView> {
    let txn = db.begin().await?;
    let view = find_airdrop(&txn, id).await?;
    delete_dependents(&txn, &[id]).await?;
    let result = airdrop::Entity::delete_by_id(id).exec(&txn).await?;
    assert!(result.rows_affected <= 1, "Primary key delete touched many rows");
    txn.commit().await?;
    info!("Deleted airdrop {id} ({})", view.summary.slug);
    Ok(view)
}

/// `order[i]` is the current zero-based position of the step that moves to
/// position `i`.
pub async fn reorder_steps(
    db: &DatabaseConnection,
    airdrop_id: i32,
    order: &[usize],
) -> StoreResult<Vec<StepView>> {
    let txn = db.begin().await?;
    let mut list = load_step_list(&txn, airdrop_id).await?;
    list.reorder(order)
        .map_err(|err| StoreError::Rejected(err.to_string()))?;
    replace_steps(&txn, airdrop_id, &list).await?;
    touch(&txn, airdrop_id).await?;
    let steps = load_steps(&txn, airdrop_id).await?;
    txn.commit().await?;
    Ok(steps.iter().map(StepView::from).collect())
}

pub async fn remove_step(
    db: &DatabaseConnection,
    airdrop_id: i32,
    step_number: i32,
) -> StoreResult<Vec<StepView>> {
    let txn = db.begin().await?;
    let mut list = load_step_list(&txn, airdrop_id).await?;
    let index = step_number
        .checked_sub(1)
        .and_then(|index| usize::try_from(index).ok())
        .ok_or_else(|| StoreError::not_found("Step", step_number))?;
    if list.remove(index).is_none() {
        return Err(StoreError::not_found("Step", step_number));
    }
    replace_steps(&txn, airdrop_id, &list).await?;
    touch(&txn, airdrop_id).await?;
    let steps = load_steps(&txn, airdrop_id).await?;
    txn.commit().await?;
    Ok(steps.iter().map(StepView::from).collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BulkAction {
    Activate,
    Confirm,
    MarkHot,
    Delete,
    Export,
}

impl BulkAction {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "activate" => Some(Self::Activate),
            "confirm" => Some(Self::Confirm),
            "mark-hot" => Some(Self::MarkHot),
            "delete" => Some(Self::Delete),
            "export" => Some(Self::Export),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Activate => "activate",
            Self::Confirm => "confirm",
            Self::MarkHot => "mark-hot",
            Self::Delete => "delete",
            Self::Export => "export",
        }
    }

    pub fn summary(self, affected: u64) -> String {
        match self {
            Self::Activate => format!("Successfully activated {affected} airdrops"),
            Self::Confirm => format!("Successfully confirmed {affected} airdrops"),
            Self::MarkHot => format!("Successfully marked {affected} airdrops as hot"),
            Self::Delete => format!("Successfully deleted {affected} airdrops"),
            Self::Export => format!("Exported {affected} airdrops"),
        }
    }

    pub fn mutates(self) -> bool {
        !matches!(self, Self::Export)
    }
}

#[derive(Debug, Clone)]
pub struct BulkOutcome {
    pub action: BulkAction,
    pub affected: u64,
    pub message: String,
    pub exported: Option<Vec<AirdropView>>,
}

/// Applies one bulk action to `ids` in a single transaction. Unknown ids are
/// skipped and simply not counted.
pub async fn apply_bulk(
    db: &DatabaseConnection,
    action: BulkAction,
    ids: &[i32],
) -> StoreResult<BulkOutcome> {
    if ids.is_empty() {
        return Err(StoreError::Rejected("No airdrops selected".to_string()));
    }
    let txn = db.begin().await?;
    let (affected, exported) = match action {
        BulkAction::Activate => {
            let value = Expr::value(AirdropStatus::Active.as_str());
            (set_column(&txn, ids, airdrop::Column::Status, value).await?, None)
        }
        BulkAction::Confirm => {
            let value = Expr::value(true);
            (set_column(&txn, ids, airdrop::Column::IsConfirmed, value).await?, None)
        }
        BulkAction::MarkHot => {
            let value = Expr::value(true);
            (set_column(&txn, ids, airdrop::Column::IsHot, value).await?, None)
        }
        BulkAction::Delete => {
            delete_dependents(&txn, ids).await?;
            let result = airdrop::Entity::delete_many()
                .filter(airdrop::Column::Id.is_in(ids.iter().copied()))
                .exec(&txn)
                .await?;
            (result.rows_affected, None)
        }
        BulkAction::Export => {
            let views = load_views(&txn, ids).await?;
            (views.len() as u64, Some(views))
        }
    };
    txn.commit().await?;

    assert!(
        affected <= ids.len() as u64,
        "Bulk action affected more rows than ids supplied"
    );
    info!(
        "Bulk {} applied to {affected} of {} airdrops",
        action.as_str(),
        ids.len()
    );
    Ok(BulkOutcome {
        action,
        affected,
        message: action.summary(affected),
        exported,
    })
}

/// Full views for `ids`, ordered by id.
pub async fn load_views<C: ConnectionTrait>(db: &C, ids: &[i32]) -> Result<Vec<AirdropView>, DbErr> {
    let models = airdrop::Entity::find()
        .filter(airdrop::Column::Id.is_in(ids.iter().copied()))
        .order_by_asc(airdrop::Column::Id)
        .all(db)
        .await?;
    let steps = airdrop_step::Entity::find()
        .filter(airdrop_step::Column::AirdropId.is_in(ids.iter().copied()))
        .order_by_asc(airdrop_step::Column::AirdropId)
        .order_by_asc(airdrop_step::Column::StepNumber)
        .all(db)
        .await?;
    let mut grouped: HashMap<i32, Vec<airdrop_step::Model>> = HashMap::new();
    for step in steps {
        grouped.entry(step.airdrop_id).or_default().push(step);
    }
    Ok(models
        .iter()
        .map(|model| {
            let steps = grouped.get(&model.id).map(Vec::as_slice).unwrap_or(&[]);
            AirdropView::from_parts(model, steps)
        })
        .collect())
}

fn lowered(column: airdrop::Column) -> Expr {
    Expr::expr(Func::lower(Expr::col(column)))
}

fn draft_columns(draft: &AirdropDraft) -> StoreResult<airdrop::ActiveModel> {
    let basic = &draft.basic;
    Ok(airdrop::ActiveModel {
        slug: Set(basic.slug.clone()),
        name: Set(basic.name.clone()),
        logo: Set(Some(basic.logo.clone())),
        description: Set(basic.description.clone()),
        action: Set(basic.action.clone()),
        category: Set(basic.category.clone()),
        status: Set(basic.status.as_str().to_string()),
        difficulty: Set(basic.difficulty.as_str().to_string()),
        reward: Set(basic.reward.clone()),
        start_date: Set(basic.start_date.clone()),
        participants: Set(basic.participants),
        social_links: Set(serde_json::to_value(&draft.social_links)?),
        about: Set(serde_json::to_value(&draft.about)?),
        requirements: Set(serde_json::to_value(&draft.requirements)?),
        networks: Set(serde_json::to_value(&draft.networks)?),
        is_hot: Set(draft.is_hot),
        is_confirmed: Set(draft.is_confirmed),
        ..Default::default()
    })
}

async fn ensure_slug_available<C: ConnectionTrait>(
    db: &C,
    slug: &str,
    exclude: Option<i32>,
) -> StoreResult<()> {
    let mut select = airdrop::Entity::find().filter(airdrop::Column::Slug.eq(slug));
    if let Some(id) = exclude {
        select = select.filter(airdrop::Column::Id.ne(id));
    }
    if select.count(db).await? > 0 {
        return Err(StoreError::Conflict {
            field: "slug",
            value: slug.to_string(),
        });
    }
    Ok(())
}

async fn load_step_list<C: ConnectionTrait>(db: &C, airdrop_id: i32) -> StoreResult<StepList> {
    if airdrop::Entity::find_by_id(airdrop_id).one(db).await?.is_none() {
        return Err(StoreError::not_found("Airdrop", airdrop_id));
    }
    let steps = load_steps(db, airdrop_id).await?;
    Ok(StepList::from_steps(steps.into_iter().map(|step| StepDraft {
        step_number: step.step_number,
        title: step.title,
        description: step.description,
        is_required: step.is_required,
    })))
}

async fn insert_steps<C: ConnectionTrait>(
    db: &C,
    airdrop_id: i32,
    steps: &StepList,
) -> Result<(), DbErr> {
    let now = Utc::now().fixed_offset();
    for step in steps.iter() {
        airdrop_step::ActiveModel {
            airdrop_id: Set(airdrop_id),
            step_number: Set(step.step_number),
            title: Set(step.title.clone()),
            description: Set(step.description.clone()),
            is_required: Set(step.is_required),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

async fn replace_steps<C: ConnectionTrait>(
    db: &C,
    airdrop_id: i32,
    steps: &StepList,
) -> Result<(), DbErr> {
    airdrop_step::Entity::delete_many()
        .filter(airdrop_step::Column::AirdropId.eq(airdrop_id))
        .exec(db)
        .await?;
    insert_steps(db, airdrop_id, steps).await
}

async fn delete_dependents<C: ConnectionTrait>(db: &C, ids: &[i32]) -> Result<(), DbErr> {
    airdrop_step::Entity::delete_many()
        .filter(airdrop_step::Column::AirdropId.is_in(ids.iter().copied()))
        .exec(db)
        .await?;
    user_rating::Entity::delete_many()
        .filter(user_rating::Column::AirdropId.is_in(ids.iter().copied()))
        .exec(db)
        .await?;
    Ok(())
}

fn set_column_update(ids: &[i32], column: airdrop::Column, value: SimpleExpr) -> UpdateMany<airdrop::Entity> {
    assert!(
        !matches!(column, airdrop::Column::UpdatedAt),
        "updated_at is stamped by every bulk update"
    );
    airdrop::Entity::update_many()
        .col_expr(column, value)
        .col_expr(
            airdrop::Column::UpdatedAt,
            Expr::value(Utc::now().fixed_offset()),
        )
        .filter(airdrop::Column::Id.is_in(ids.iter().copied()))
}

fn touch_update(airdrop_id: i32) -> UpdateMany<airdrop::Entity> {
    airdrop::Entity::update_many()
        .col_expr(
            airdrop::Column::UpdatedAt,
            Expr::value(Utc::now().fixed_offset()),
        )
        .filter(airdrop::Column::Id.eq(airdrop_id))
}

async fn set_column<C: ConnectionTrait>(
    db: &C,
    ids: &[i32],
    column: airdrop::Column,
    value: SimpleExpr,
) -> Result<u64, DbErr> {
    let result = set_column_update(ids, column, value).exec(db).await?;
    Ok(result.rows_affected)
}

async fn touch<C: ConnectionTrait>(db: &C, airdrop_id: i32) -> Result<(), DbErr> {
    touch_update(airdrop_id).exec(db).await.map(|_| ())
}
