//! Per-visitor airdrop ratings, one row per (airdrop, ip).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_ratings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub airdrop_id: i32,
    /// Client address used as the rating identity
    #[sea_orm(column_type = "String(StringLen::N(45))")]
    pub user_ip: String,
    /// 1 through 5
    pub rating: i32,
    pub user_agent: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::airdrop::Entity",
        from = "Column::AirdropId",
        to = "super::airdrop::Column::Id",
        on_delete = "Cascade",
        on_update = "Cascade"
    )]
    Airdrop,
}

impl Related<super::airdrop::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Airdrop.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
