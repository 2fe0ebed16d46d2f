//! Create payments table
//!
//! One row per booking, reused across payment attempts.

use sea_orm_migration::prelude::*;

use super::m20240101_000002_create_bookings::Bookings;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Payments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Payments::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Payments::BookingId)
                            .big_integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Payments::AmountMinor).big_integer().not_null())
                    .col(
                        ColumnDef::new(Payments::Status)
                            .string_len(20)
                            .not_null()
                            .default("PENDING"),
                    )
                    .col(
                        ColumnDef::new(Payments::Method)
                            .string_len(20)
                            .not_null()
                            .default("COD"),
                    )
                    .col(
                        ColumnDef::new(Payments::TransactionCode)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Payments::PaidAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Payments::RefundedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Payments::GatewayTxnRef).string_len(64))
                    .col(ColumnDef::new(Payments::GatewayOrderInfo).text())
                    .col(ColumnDef::new(Payments::GatewayResponseCode).string_len(8))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payments_booking")
                            .from(Payments::Table, Payments::BookingId)
                            .to(Bookings::Table, Bookings::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_payments_gateway_txn_ref")
                    .table(Payments::Table)
                    .col(Payments::GatewayTxnRef)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Payments::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Payments {
    Table,
    Id,
    BookingId,
    AmountMinor,
    Status,
    Method,
    TransactionCode,
    PaidAt,
    RefundedAt,
    GatewayTxnRef,
    GatewayOrderInfo,
    GatewayResponseCode,
}
