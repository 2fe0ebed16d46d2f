//! SeaORM implementation of BookingRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    NotSet, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::debug;

use super::{db_err, unique_violation};
use crate::domain::booking::ACTIVE_STATUSES;
use crate::domain::{Booking, BookingRepository, BookingStatus, DomainError, DomainResult};
use crate::infrastructure::database::entities::booking;
use crate::infrastructure::database::migrator::OVERLAP_GUARD;
use crate::shared::types::{from_minor_units, to_minor_units, PaginatedResult, PaginationParams};

pub struct SeaOrmBookingRepository {
    db: DatabaseConnection,
}

impl SeaOrmBookingRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: booking::Model) -> DomainResult<Booking> {
    let status = BookingStatus::from_str(&m.status).ok_or_else(|| {
        DomainError::Storage(format!("Unknown booking status '{}' for id {}", m.status, m.id))
    })?;
    Ok(Booking {
        id: m.id,
        field_id: m.field_id,
        user_id: m.user_id,
        start_time: m.start_time,
        end_time: m.end_time,
        price_at_booking: from_minor_units(m.price_at_booking_minor),
        total_amount: from_minor_units(m.total_amount_minor),
        booking_code: m.booking_code,
        status,
        created_at: m.created_at,
        cancelled_at: m.cancelled_at,
        cancellation_reason: m.cancellation_reason,
    })
}

fn models_to_domain(models: Vec<booking::Model>) -> DomainResult<Vec<Booking>> {
    models.into_iter().map(model_to_domain).collect()
}

fn to_active_model(b: &Booking) -> DomainResult<booking::ActiveModel> {
    Ok(booking::ActiveModel {
        id: if b.id == 0 { NotSet } else { Set(b.id) },
        field_id: Set(b.field_id),
        user_id: Set(b.user_id),
        start_time: Set(b.start_time),
        end_time: Set(b.end_time),
        price_at_booking_minor: Set(to_minor_units(b.price_at_booking)?),
        total_amount_minor: Set(to_minor_units(b.total_amount)?),
        booking_code: Set(b.booking_code.clone()),
        status: Set(b.status.as_str().to_string()),
        created_at: Set(b.created_at),
        cancelled_at: Set(b.cancelled_at),
        cancellation_reason: Set(b.cancellation_reason.clone()),
    })
}

fn active_status_values() -> Vec<&'static str> {
    ACTIVE_STATUSES.iter().map(|s| s.as_str()).collect()
}

fn write_err(e: DbErr, b: &Booking) -> DomainError {
    if e.to_string().contains(OVERLAP_GUARD) {
        return overlap_conflict();
    }
    match unique_violation(&e) {
        Some(msg) if msg.contains("booking_code") => DomainError::Duplicate {
            entity: "Booking",
            field: "booking_code",
            value: b.booking_code.clone(),
        },
        _ => db_err(e),
    }
}

fn overlap_conflict() -> DomainError {
    DomainError::Conflict("Field is already booked for the selected time range".to_string())
}

/// Update an existing booking on `conn`, which may be an open transaction.
pub(super) async fn update_on<C: ConnectionTrait>(conn: &C, b: Booking) -> DomainResult<()> {
    debug!(booking_id = b.id, status = b.status.as_str(), "Updating booking");

    let existing = booking::Entity::find_by_id(b.id)
        .one(conn)
        .await
        .map_err(db_err)?;
    if existing.is_none() {
        return Err(DomainError::not_found("Booking", "id", b.id));
    }

    to_active_model(&b)?
        .update(conn)
        .await
        .map_err(|e| write_err(e, &b))?;
    Ok(())
}

// ── BookingRepository impl ──────────────────────────────────────

#[async_trait]
impl BookingRepository for SeaOrmBookingRepository {
    async fn insert(&self, b: Booking) -> DomainResult<Booking> {
        debug!(field_id = b.field_id, code = %b.booking_code, "Inserting booking");

        let txn = self.db.begin().await.map_err(db_err)?;

        if b.status.is_active() {
            let overlapping = booking::Entity::find()
                .filter(booking::Column::FieldId.eq(b.field_id))
                .filter(booking::Column::Status.is_in(active_status_values()))
                .filter(booking::Column::StartTime.lt(b.end_time))
                .filter(booking::Column::EndTime.gt(b.start_time))
                .count(&txn)
                .await
                .map_err(db_err)?;
            if overlapping > 0 {
                return Err(overlap_conflict());
            }
        }

        let inserted = to_active_model(&b)?
            .insert(&txn)
            .await
            .map_err(|e| write_err(e, &b))?;
        txn.commit().await.map_err(|e| write_err(e, &b))?;

        model_to_domain(inserted)
    }

    async fn update(&self, b: Booking) -> DomainResult<()> {
        update_on(&self.db, b).await
    }

    async fn find_by_id(&self, id: i64) -> DomainResult<Option<Booking>> {
        booking::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(model_to_domain)
            .transpose()
    }

    async fn exists_by_code(&self, code: &str) -> DomainResult<bool> {
        let count = booking::Entity::find()
            .filter(booking::Column::BookingCode.eq(code))
            .count(&self.db)
            .await
            .map_err(db_err)?;
        Ok(count > 0)
    }

    async fn exists_overlap(
        &self,
        field_id: i64,
        statuses: &[BookingStatus],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<bool> {
        let statuses: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();
        let count = booking::Entity::find()
            .filter(booking::Column::FieldId.eq(field_id))
            .filter(booking::Column::Status.is_in(statuses))
            .filter(booking::Column::StartTime.lt(end))
            .filter(booking::Column::EndTime.gt(start))
            .count(&self.db)
            .await
            .map_err(db_err)?;
        Ok(count > 0)
    }

    async fn find_by_user(&self, user_id: i64) -> DomainResult<Vec<Booking>> {
        let models = booking::Entity::find()
            .filter(booking::Column::UserId.eq(user_id))
            .order_by_desc(booking::Column::StartTime)
            .order_by_desc(booking::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        models_to_domain(models)
    }

    async fn search(
        &self,
        code_filter: Option<&str>,
        params: PaginationParams,
    ) -> DomainResult<PaginatedResult<Booking>> {
        let mut query = booking::Entity::find();

        // Codes are stored upper-case.
        if let Some(filter) = code_filter {
            query = query.filter(booking::Column::BookingCode.contains(filter.to_uppercase()));
        }

        query = query
            .order_by_desc(booking::Column::CreatedAt)
            .order_by_desc(booking::Column::Id);

        let total = query.clone().count(&self.db).await.map_err(db_err)?;

        let models = query
            .offset(params.offset())
            .limit(params.limit as u64)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(PaginatedResult::new(
            models_to_domain(models)?,
            total,
            params.page,
            params.limit,
        ))
    }
}
