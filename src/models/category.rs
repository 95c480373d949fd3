use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::entities::category;

pub const DEFAULT_CATEGORY_COLOR: &str = "#7cb342";
pub const DEFAULT_CATEGORY_ICON: &str = "folder";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryView {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub color: String,
    pub icon: String,
    /// Airdrops whose category matches this name, ignoring case
    pub airdrop_count: u64,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl CategoryView {
    pub fn from_model(model: &category::Model, airdrop_count: u64) -> Self {
        Self {
            id: model.id,
            name: model.name.clone(),
            description: model.description.clone(),
            color: model.color.clone(),
            icon: model.icon.clone(),
            airdrop_count,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CategoryPayload {
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

/// A category that passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDraft {
    pub name: String,
    pub description: String,
    pub color: String,
    pub icon: String,
}
