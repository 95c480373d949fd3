use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_query::Expr;

use crate::m20260101_000001_create_airdrop_tables::Airdrops;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UserRatings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserRatings::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UserRatings::AirdropId).integer().not_null())
                    .col(
                        ColumnDef::new(UserRatings::UserIp)
                            .string_len(45) // IPv6 max length
                            .not_null(),
                    )
                    .col(ColumnDef::new(UserRatings::Rating).integer().not_null())
                    .col(ColumnDef::new(UserRatings::UserAgent).text().null())
                    .col(
                        ColumnDef::new(UserRatings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(UserRatings::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_ratings_airdrop")
                            .from(UserRatings::Table, UserRatings::AirdropId)
                            .to(Airdrops::Table, Airdrops::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One rating per (airdrop, ip); the upsert relies on this index.
        manager
            .create_index(
                Index::create()
                    .name("idx_user_ratings_airdrop_ip")
                    .table(UserRatings::Table)
                    .col(UserRatings::AirdropId)
                    .col(UserRatings::UserIp)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserRatings::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum UserRatings {
    Table,
    Id,
    AirdropId,
    UserIp,
    Rating,
    UserAgent,
    CreatedAt,
    UpdatedAt,
}
