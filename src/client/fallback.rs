use chrono::Utc;

use crate::models::airdrop::{
    AirdropStatus, AirdropSummary, DataSource, Difficulty, ListingResponse, ListingStats,
    Pagination,
};

const PLACEHOLDER_LOGO: &str = "/placeholder.svg?height=40&width=40";

/// Canned listing served when the API cannot be reached.
pub fn fallback_listing() -> ListingResponse {
    let now = Utc::now().fixed_offset();
    let record = |id: i32, slug: &str, name: &str| AirdropSummary {
        id,
        slug: slug.to_string(),
        name: name.to_string(),
        logo: Some(PLACEHOLDER_LOGO.to_string()),
        description: String::new(),
        action: String::new(),
        category: String::new(),
        status: AirdropStatus::Active,
        difficulty: Difficulty::Medium,
        reward: "TBA".to_string(),
        start_date: None,
        rating: 0.0,
        total_ratings: 0,
        participants: 0,
        is_hot: true,
        is_confirmed: false,
        created_at: now,
        updated_at: now,
    };

    let layerzero = AirdropSummary {
        description: "Cross-chain protocol with potential airdrop for early users".to_string(),
        action: "Bridge tokens across different chains".to_string(),
        category: "latest".to_string(),
        start_date: Some("2024-01-15".to_string()),
        rating: 4.5,
        total_ratings: 1_250,
        participants: 45_000,
        ..record(1, "layerzero-airdrop", "LayerZero Airdrop")
    };
    let zksync = AirdropSummary {
        description: "Layer 2 scaling solution with confirmed airdrop for users".to_string(),
        action: "Use zkSync Era for transactions".to_string(),
        category: "hottest".to_string(),
        difficulty: Difficulty::Easy,
        reward: "ZK Tokens".to_string(),
        start_date: Some("2024-01-10".to_string()),
        rating: 4.8,
        total_ratings: 2_100,
        participants: 78_000,
        is_confirmed: true,
        ..record(2, "zksync-era-airdrop", "zkSync Era Airdrop")
    };

    let data = vec![layerzero, zksync];
    let stats = ListingStats {
        total: data.len() as u64,
        active: 2,
        confirmed: 1,
        hot: 2,
        upcoming: 0,
        ended: 0,
    };
    ListingResponse {
        success: true,
        pagination: Pagination::new(1, data.len() as u64, data.len() as u64),
        data,
        stats,
        data_source: DataSource::Fallback,
    }
}
