use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::entities::{airdrop, airdrop_step};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AirdropStatus {
    Active,
    Confirmed,
    Upcoming,
    Ended,
}

impl AirdropStatus {
    pub const ALL: [Self; 4] = [Self::Active, Self::Confirmed, Self::Upcoming, Self::Ended];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Confirmed => "confirmed",
            Self::Upcoming => "upcoming",
            Self::Ended => "ended",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(value))
    }
}

impl fmt::Display for AirdropStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Self; 3] = [Self::Easy, Self::Medium, Self::Hard];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "Easy",
            Self::Medium => "Medium",
            Self::Hard => "Hard",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|difficulty| difficulty.as_str().eq_ignore_ascii_case(value))
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a listing response was served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Database,
    Cache,
    Fallback,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialLinks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discord: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facebook: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instagram: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub youtube: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
}

impl SocialLinks {
    /// Field name paired with its value, in display order.
    pub fn entries(&self) -> [(&'static str, Option<&str>); 8] {
        [
            ("website", self.website.as_deref()),
            ("twitter", self.twitter.as_deref()),
            ("telegram", self.telegram.as_deref()),
            ("discord", self.discord.as_deref()),
            ("facebook", self.facebook.as_deref()),
            ("instagram", self.instagram.as_deref()),
            ("youtube", self.youtube.as_deref()),
            ("linkedin", self.linkedin.as_deref()),
        ]
    }

    pub fn set(&mut self, field: &str, value: Option<String>) {
        let slot = match field {
            "website" => &mut self.website,
            "twitter" => &mut self.twitter,
            "telegram" => &mut self.telegram,
            "discord" => &mut self.discord,
            "facebook" => &mut self.facebook,
            "instagram" => &mut self.instagram,
            "youtube" => &mut self.youtube,
            "linkedin" => &mut self.linkedin,
            _ => return,
        };
        *slot = value;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct About {
    pub overview: String,
    pub tokenomics: String,
    pub roadmap: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepView {
    pub step_number: i32,
    pub title: String,
    pub description: String,
    pub is_required: bool,
}

impl From<&airdrop_step::Model> for StepView {
    fn from(step: &airdrop_step::Model) -> Self {
        Self {
            step_number: step.step_number,
            title: step.title.clone(),
            description: step.description.clone(),
            is_required: step.is_required,
        }
    }
}

/// Card shape used by listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirdropSummary {
    pub id: i32,
    pub slug: String,
    pub name: String,
    pub logo: Option<String>,
    pub description: String,
    pub action: String,
    pub category: String,
    pub status: AirdropStatus,
    pub difficulty: Difficulty,
    pub reward: String,
    pub start_date: Option<String>,
    pub rating: f64,
    pub total_ratings: i32,
    pub participants: i64,
    pub is_hot: bool,
    pub is_confirmed: bool,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl AirdropSummary {
    pub fn from_model(model: &airdrop::Model) -> Self {
        Self {
            id: model.id,
            slug: model.slug.clone(),
            name: model.name.clone(),
            logo: model.logo.clone(),
            description: model.description.clone(),
            action: model.action.clone(),
            category: model.category.clone(),
            status: AirdropStatus::parse(&model.status).unwrap_or(AirdropStatus::Active),
            difficulty: Difficulty::parse(&model.difficulty).unwrap_or(Difficulty::Medium),
            reward: model.reward.clone(),
            start_date: model.start_date.clone(),
            rating: model.rating,
            total_ratings: model.total_ratings,
            participants: model.participants,
            is_hot: model.is_hot,
            is_confirmed: model.is_confirmed,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Full record including its ordered steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirdropView {
    #[serde(flatten)]
    pub summary: AirdropSummary,
    pub social_links: SocialLinks,
    pub about: About,
    pub requirements: Vec<String>,
    pub networks: Vec<String>,
    pub steps: Vec<StepView>,
}

impl AirdropView {
    pub fn from_parts(model: &airdrop::Model, steps: &[airdrop_step::Model]) -> Self {
        let mut ordered: Vec<StepView> = steps.iter().map(StepView::from).collect();
        ordered.sort_by_key(|step| step.step_number);
        Self {
            summary: AirdropSummary::from_model(model),
            social_links: decode_json(model.id, "social_links", &model.social_links),
            about: decode_json(model.id, "about", &model.about),
            requirements: decode_json(model.id, "requirements", &model.requirements),
            networks: decode_json(model.id, "networks", &model.networks),
            steps: ordered,
        }
    }

    pub fn id(&self) -> i32 {
        self.summary.id
    }
}

fn decode_json<T>(id: i32, column: &str, value: &serde_json::Value) -> T
where
    T: serde::de::DeserializeOwned + Default,
{
    if value.is_null() {
        return T::default();
    }
    match serde_json::from_value(value.clone()) {
        Ok(decoded) => decoded,
        Err(err) => {
            warn!("Airdrop {id} has malformed {column}: {err}");
            T::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingStats {
    pub total: u64,
    pub active: u64,
    pub confirmed: u64,
    pub hot: u64,
    pub upcoming: u64,
    pub ended: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(page: u64, limit: u64, total: u64) -> Self {
        assert!(limit > 0, "Pagination limit must be positive");
        Self {
            page,
            limit,
            total,
            total_pages: total.div_ceil(limit),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingPage {
    pub items: Vec<AirdropSummary>,
    pub stats: ListingStats,
    pub pagination: Pagination,
}

/// Wire shape of `GET /api/airdrops`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingResponse {
    pub success: bool,
    pub data: Vec<AirdropSummary>,
    pub stats: ListingStats,
    pub pagination: Pagination,
    pub data_source: DataSource,
}

impl ListingResponse {
    pub fn from_page(page: &ListingPage, data_source: DataSource) -> Self {
        Self {
            success: true,
            data: page.items.clone(),
            stats: page.stats,
            pagination: page.pagination,
            data_source,
        }
    }
}
