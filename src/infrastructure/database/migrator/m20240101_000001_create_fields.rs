//! Create fields table
//!
//! The bookable catalog. Prices are stored in minor units.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Fields::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Fields::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Fields::Name).string().not_null())
                    .col(
                        ColumnDef::new(Fields::PricePerHourMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Fields::Description).text())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Fields::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Fields {
    Table,
    Id,
    Name,
    PricePerHourMinor,
    Description,
}
