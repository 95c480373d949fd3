use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "airdrop_steps")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub airdrop_id: i32,
    /// 1-based, contiguous within an airdrop
    pub step_number: i32,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub is_required: bool,
    pub created_at: DateTimeWithTimeZone,
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
