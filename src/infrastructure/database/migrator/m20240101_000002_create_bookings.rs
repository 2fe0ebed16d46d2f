//! Create bookings table
//!
//! Besides the unique booking code, the store itself refuses overlapping
//! active bookings on one field: a trigger on SQLite, an exclusion
//! constraint on PostgreSQL. Repositories map the failure to a conflict.

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{ConnectionTrait, DatabaseBackend};

use super::m20240101_000001_create_fields::Fields;

/// Error text raised by the overlap guard; repositories match on it.
pub const OVERLAP_GUARD: &str = "booking_overlap";

const SQLITE_INSERT_TRIGGER: &str = r#"
CREATE TRIGGER IF NOT EXISTS trg_bookings_no_overlap
BEFORE INSERT ON bookings
WHEN NEW.status IN ('PENDING', 'CONFIRMED')
BEGIN
    SELECT RAISE(ABORT, 'booking_overlap')
    WHERE EXISTS (
        SELECT 1 FROM bookings b
        WHERE b.field_id = NEW.field_id
          AND b.status IN ('PENDING', 'CONFIRMED')
          AND b.start_time < NEW.end_time
          AND NEW.start_time < b.end_time
    );
END;
"#;

const SQLITE_UPDATE_TRIGGER: &str = r#"
CREATE TRIGGER IF NOT EXISTS trg_bookings_no_overlap_update
BEFORE UPDATE OF field_id, start_time, end_time, status ON bookings
WHEN NEW.status IN ('PENDING', 'CONFIRMED')
BEGIN
    SELECT RAISE(ABORT, 'booking_overlap')
    WHERE EXISTS (
        SELECT 1 FROM bookings b
        WHERE b.id <> NEW.id
          AND b.field_id = NEW.field_id
          AND b.status IN ('PENDING', 'CONFIRMED')
          AND b.start_time < NEW.end_time
          AND NEW.start_time < b.end_time
    );
END;
"#;

const POSTGRES_EXCLUSION: &str = r#"
CREATE EXTENSION IF NOT EXISTS btree_gist;
ALTER TABLE bookings ADD CONSTRAINT booking_overlap
    EXCLUDE USING gist (field_id WITH =, tstzrange(start_time, end_time, '[)') WITH &&)
    WHERE (status IN ('PENDING', 'CONFIRMED'));
"#;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Bookings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Bookings::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Bookings::FieldId).big_integer().not_null())
                    .col(ColumnDef::new(Bookings::UserId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Bookings::StartTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Bookings::EndTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Bookings::PriceAtBookingMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Bookings::TotalAmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Bookings::BookingCode)
                            .string_len(32)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Bookings::Status)
                            .string_len(20)
                            .not_null()
                            .default("CONFIRMED"),
                    )
                    .col(
                        ColumnDef::new(Bookings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Bookings::CancelledAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Bookings::CancellationReason).text())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bookings_field")
                            .from(Bookings::Table, Bookings::FieldId)
                            .to(Fields::Table, Fields::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bookings_field_status")
                    .table(Bookings::Table)
                    .col(Bookings::FieldId)
                    .col(Bookings::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bookings_user")
                    .table(Bookings::Table)
                    .col(Bookings::UserId)
                    .to_owned(),
            )
            .await?;

        let db = manager.get_connection();
        match manager.get_database_backend() {
            DatabaseBackend::Sqlite => {
                db.execute_unprepared(SQLITE_INSERT_TRIGGER).await?;
                db.execute_unprepared(SQLITE_UPDATE_TRIGGER).await?;
            }
            DatabaseBackend::Postgres => {
                db.execute_unprepared(POSTGRES_EXCLUSION).await?;
            }
            // No equivalent on MySQL; the repository transaction is the only guard there.
            _ => {}
        }
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        if manager.get_database_backend() == DatabaseBackend::Sqlite {
            let db = manager.get_connection();
            db.execute_unprepared("DROP TRIGGER IF EXISTS trg_bookings_no_overlap_update")
                .await?;
            db.execute_unprepared("DROP TRIGGER IF EXISTS trg_bookings_no_overlap")
                .await?;
        }
        manager
            .drop_table(Table::drop().table(Bookings::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Bookings {
    Table,
    Id,
    FieldId,
    UserId,
    StartTime,
    EndTime,
    PriceAtBookingMinor,
    TotalAmountMinor,
    BookingCode,
    Status,
    CreatedAt,
    CancelledAt,
    CancellationReason,
}
