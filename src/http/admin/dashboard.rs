use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{EntityTrait, PaginatorTrait};
use serde::Serialize;

use crate::entities::category;
use crate::http::{Envelope, HttpError};
use crate::state::AppState;
use crate::store::activity::recent_activity;
use crate::store::airdrops::{listing_stats, recent_airdrops, total_participants};
use crate::store::ratings::{overall_stats, recent_ratings};

const ACTIVITY_LIMIT: usize = 10;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stats", get(stats))
        .route("/activity", get(activity))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DashboardStats {
    total_airdrops: u64,
    active_airdrops: u64,
    confirmed_airdrops: u64,
    hot_airdrops: u64,
    upcoming_airdrops: u64,
    ended_airdrops: u64,
    total_categories: u64,
    total_participants: i64,
    total_ratings: u64,
    average_rating: f64,
    last_updated: DateTime<Utc>,
}

async fn stats(State(state): State<AppState>) -> Result<Json<Envelope<DashboardStats>>, HttpError> {
    let database = state.database()?;
    let failed = |err| HttpError::internal("Failed to fetch admin statistics", err);
    let listing = listing_stats(database).await.map_err(failed)?;
    let categories = category::Entity::find().count(database).await.map_err(failed)?;
    let participants = total_participants(database).await.map_err(failed)?;
    let ratings = overall_stats(database).await.map_err(failed)?;
    Ok(Envelope::ok(DashboardStats {
        total_airdrops: listing.total,
        active_airdrops: listing.active,
        confirmed_airdrops: listing.confirmed,
        hot_airdrops: listing.hot,
        upcoming_airdrops: listing.upcoming,
        ended_airdrops: listing.ended,
        total_categories: categories,
        total_participants: participants,
        total_ratings: ratings.total_ratings,
        average_rating: ratings.average_rating,
        last_updated: Utc::now(),
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum ActivityKind {
    Airdrop,
    Rating,
    Admin,
}

#[derive(Debug, Serialize)]
struct ActivityEntry {
    #[serde(rename = "type")]
    kind: ActivityKind,
    action: String,
    description: String,
    time: String,
    timestamp: DateTime<FixedOffset>,
}

#[derive(Debug, Serialize)]
struct ActivityFeed {
    success: bool,
    activities: Vec<ActivityEntry>,
}

/// "settings_updated" -> "Settings updated"
fn humanize(action: &str) -> String {
    let spaced = action.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub(crate) fn format_time_ago(then: DateTime<FixedOffset>, now: DateTime<Utc>) -> String {
    let seconds = (now - then.with_timezone(&Utc)).num_seconds().max(0);
    let (amount, unit) = match seconds {
        0..=59 => return format!("{seconds} seconds ago"),
        60..=3_599 => (seconds / 60, "minute"),
        3_600..=86_399 => (seconds / 3_600, "hour"),
        _ => (seconds / 86_400, "day"),
    };
    let plural = if amount > 1 { "s" } else { "" };
    format!("{amount} {unit}{plural} ago")
}

async fn activity(State(state): State<AppState>) -> Result<Json<ActivityFeed>, HttpError> {
    let database = state.database()?;
    let failed = |err| HttpError::internal("Failed to fetch recent activity", err);
    let airdrops = recent_airdrops(database, 5).await.map_err(failed)?;
    let ratings = recent_ratings(database, 3).await.map_err(failed)?;
    let audit = recent_activity(database, 5).await.map_err(failed)?;

    let now = Utc::now();
    let mut activities: Vec<ActivityEntry> = airdrops
        .into_iter()
        .map(|airdrop| ActivityEntry {
            kind: ActivityKind::Airdrop,
            action: "New Airdrop Created".to_string(),
            description: format!("{} - Status: {}", airdrop.name, airdrop.status),
            time: format_time_ago(airdrop.created_at, now),
            timestamp: airdrop.created_at,
        })
        .chain(ratings.into_iter().map(|rating| ActivityEntry {
            kind: ActivityKind::Rating,
            action: "New Rating Submitted".to_string(),
            description: format!(
                "{} stars rating submitted for airdrop {}",
                rating.rating, rating.airdrop_id
            ),
            time: format_time_ago(rating.created_at, now),
            timestamp: rating.created_at,
        }))
        .chain(audit.into_iter().map(|entry| ActivityEntry {
            kind: ActivityKind::Admin,
            action: humanize(&entry.action),
            description: entry.details.to_string(),
            time: format_time_ago(entry.created_at, now),
            timestamp: entry.created_at,
        }))
        .collect();
    activities.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    activities.truncate(ACTIVITY_LIMIT);

    Ok(Json(ActivityFeed {
        success: true,
        activities,
    }))
}
