pub use sea_orm_migration::prelude::*;

mod m20260101_000001_create_airdrop_tables;
mod m20260101_000002_create_categories;
mod m20260101_000003_create_user_ratings;
mod m20260101_000004_create_admin_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260101_000001_create_airdrop_tables::Migration),
            Box::new(m20260101_000002_create_categories::Migration),
            Box::new(m20260101_000003_create_user_ratings::Migration),
            Box::new(m20260101_000004_create_admin_tables::Migration),
        ]
    }
}
