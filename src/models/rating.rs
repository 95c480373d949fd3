use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingStats {
    pub average_rating: f64,
    pub total_ratings: u64,
    /// Star value (1..=5) to vote count; every star is present
    pub distribution: BTreeMap<u8, u64>,
}

impl RatingStats {
    pub fn from_ratings(ratings: &[i32]) -> Self {
        let mut distribution: BTreeMap<u8, u64> = (1..=5).map(|star| (star, 0)).collect();
        let mut sum: i64 = 0;
        let mut counted: u64 = 0;
        for &rating in ratings {
            let Ok(star) = u8::try_from(rating) else {
                continue;
            };
            if let Some(count) = distribution.get_mut(&star) {
                *count += 1;
                sum += i64::from(rating);
                counted += 1;
            }
        }
        let average_rating = if counted == 0 {
            0.0
        } else {
            round_one_decimal(sum as f64 / counted as f64)
        };
        Self {
            average_rating,
            total_ratings: counted,
            distribution,
        }
    }
}

impl Default for RatingStats {
    fn default() -> Self {
        Self::from_ratings(&[])
    }
}

pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RatingRequest {
    pub rating: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingResponse {
    pub success: bool,
    pub user_rating: Option<i32>,
    pub stats: RatingStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
