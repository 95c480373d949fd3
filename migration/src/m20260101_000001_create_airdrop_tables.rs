use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_query::Expr;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Airdrops::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Airdrops::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Airdrops::Slug).string_len(128).not_null())
                    .col(ColumnDef::new(Airdrops::Name).string_len(100).not_null())
                    .col(ColumnDef::new(Airdrops::Logo).text().null())
                    .col(ColumnDef::new(Airdrops::Description).text().not_null())
                    .col(ColumnDef::new(Airdrops::Action).string_len(200).not_null())
                    .col(ColumnDef::new(Airdrops::Category).string_len(50).not_null())
                    .col(ColumnDef::new(Airdrops::Status).string_len(16).not_null())
                    .col(ColumnDef::new(Airdrops::Difficulty).string_len(16).not_null())
                    .col(
                        ColumnDef::new(Airdrops::Reward)
                            .string_len(128)
                            .not_null()
                            .default("TBA"),
                    )
                    .col(ColumnDef::new(Airdrops::StartDate).string_len(10).null())
                    .col(
                        ColumnDef::new(Airdrops::Rating)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Airdrops::TotalRatings)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Airdrops::Participants)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Airdrops::SocialLinks).json().not_null())
                    .col(ColumnDef::new(Airdrops::About).json().not_null())
                    .col(ColumnDef::new(Airdrops::Requirements).json().not_null())
                    .col(ColumnDef::new(Airdrops::Networks).json().not_null())
                    .col(
                        ColumnDef::new(Airdrops::IsHot)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Airdrops::IsConfirmed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Airdrops::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Airdrops::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_airdrops_slug")
                    .table(Airdrops::Table)
                    .col(Airdrops::Slug)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_airdrops_status_created")
                    .table(Airdrops::Table)
                    .col(Airdrops::Status)
                    .col(Airdrops::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AirdropSteps::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AirdropSteps::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AirdropSteps::AirdropId).integer().not_null())
                    .col(ColumnDef::new(AirdropSteps::StepNumber).integer().not_null())
                    .col(ColumnDef::new(AirdropSteps::Title).string_len(200).not_null())
                    .col(ColumnDef::new(AirdropSteps::Description).text().not_null())
                    .col(
                        ColumnDef::new(AirdropSteps::IsRequired)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(AirdropSteps::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_airdrop_steps_airdrop")
                            .from(AirdropSteps::Table, AirdropSteps::AirdropId)
                            .to(Airdrops::Table, Airdrops::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Step numbering is kept contiguous by the save path, not by a constraint.
        manager
            .create_index(
                Index::create()
                    .name("idx_airdrop_steps_order")
                    .table(AirdropSteps::Table)
                    .col(AirdropSteps::AirdropId)
                    .col(AirdropSteps::StepNumber)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AirdropSteps::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Airdrops::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub(crate) enum Airdrops {
    Table,
    Id,
    Slug,
    Name,
    Logo,
    Description,
    Action,
    Category,
    Status,
    Difficulty,
    Reward,
    StartDate,
    Rating,
    TotalRatings,
    Participants,
    SocialLinks,
    About,
    Requirements,
    Networks,
    IsHot,
    IsConfirmed,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum AirdropSteps {
    Table,
    Id,
    AirdropId,
    StepNumber,
    Title,
    Description,
    IsRequired,
    CreatedAt,
}
