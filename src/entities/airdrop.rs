use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "airdrops")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub slug: String,
    pub name: String,
    pub logo: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub action: String,
    pub category: String,
    /// One of `active`, `confirmed`, `upcoming`, `ended`
    pub status: String,
    /// One of `Easy`, `Medium`, `Hard`
    pub difficulty: String,
    pub reward: String,
    /// `YYYY-MM-DD`
    pub start_date: Option<String>,
    pub rating: f64,
    pub total_ratings: i32,
    pub participants: i64,
    pub social_links: Json,
    pub about: Json,
    pub requirements: Json,
    pub networks: Json,
    pub is_hot: bool,
    pub is_confirmed: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::airdrop_step::Entity")]
    AirdropStep,
    #[sea_orm(has_many = "super::user_rating::Entity")]
    UserRating,
}

impl Related<super::airdrop_step::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AirdropStep.def()
    }
}

impl Related<super::user_rating::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserRating.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
