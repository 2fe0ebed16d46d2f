//! In-memory repositories for development and testing

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::domain::{
    Booking, BookingRepository, BookingStatus, DomainError, DomainResult, Field, FieldRepository,
    Payment, PaymentRepository, RepositoryProvider,
};
use crate::shared::types::{PaginatedResult, PaginationParams};

/// Keeps fields, bookings and payments in DashMaps.
///
/// Writes that must check-then-insert hold `write_guard` so the check and
/// the insert are atomic, matching what the database triggers and unique
/// indexes give the SeaORM provider.
pub struct InMemoryRepositoryProvider {
    fields: DashMap<i64, Field>,
    bookings: DashMap<i64, Booking>,
    payments: DashMap<i64, Payment>,
    booking_counter: AtomicI64,
    payment_counter: AtomicI64,
    write_guard: Mutex<()>,
}

impl InMemoryRepositoryProvider {
    pub fn new() -> Self {
        Self {
            fields: DashMap::new(),
            bookings: DashMap::new(),
            payments: DashMap::new(),
            booking_counter: AtomicI64::new(1),
            payment_counter: AtomicI64::new(1),
            write_guard: Mutex::new(()),
        }
    }

    /// Seed the field catalog.
    pub fn insert_field(&self, field: Field) {
        self.fields.insert(field.id, field);
    }

    fn lock_writes(&self) -> DomainResult<std::sync::MutexGuard<'_, ()>> {
        self.write_guard
            .lock()
            .map_err(|_| DomainError::Storage("in-memory write lock poisoned".into()))
    }

    fn check_booking_exists(&self, id: i64) -> DomainResult<()> {
        if self.bookings.contains_key(&id) {
            Ok(())
        } else {
            Err(DomainError::not_found("Booking", "id", id))
        }
    }

    /// Unique-key and existence checks for a payment write. Assigns the id
    /// of a new payment. Callers hold `write_guard`.
    fn check_payment(&self, mut payment: Payment) -> DomainResult<Payment> {
        let clash = self.payments.iter().find(|p| {
            p.id != payment.id
                && (p.transaction_code == payment.transaction_code
                    || p.booking_id == payment.booking_id)
        });
        if let Some(other) = clash {
            return Err(if other.transaction_code == payment.transaction_code {
                DomainError::Duplicate {
                    entity: "Payment",
                    field: "transaction_code",
                    value: payment.transaction_code.clone(),
                }
            } else {
                DomainError::Duplicate {
                    entity: "Payment",
                    field: "booking_id",
                    value: payment.booking_id.to_string(),
                }
            });
        }

        if payment.id == 0 {
            payment.id = self.payment_counter.fetch_add(1, Ordering::SeqCst);
        } else if !self.payments.contains_key(&payment.id) {
            return Err(DomainError::not_found("Payment", "id", payment.id));
        }
        Ok(payment)
    }

    fn overlaps(
        &self,
        field_id: i64,
        statuses: &[BookingStatus],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_id: Option<i64>,
    ) -> bool {
        self.bookings.iter().any(|b| {
            b.field_id == field_id
                && Some(b.id) != exclude_id
                && statuses.contains(&b.status)
                && b.start_time < end
                && b.end_time > start
        })
    }
}

impl Default for InMemoryRepositoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RepositoryProvider for InMemoryRepositoryProvider {
    fn fields(&self) -> &dyn FieldRepository {
        self
    }

    fn bookings(&self) -> &dyn BookingRepository {
        self
    }

    fn payments(&self) -> &dyn PaymentRepository {
        self
    }

    async fn save_payment_and_booking(
        &self,
        payment: Payment,
        booking: Option<Booking>,
    ) -> DomainResult<Payment> {
        let _guard = self.lock_writes()?;
        // Check both writes before applying either.
        if let Some(booking) = &booking {
            self.check_booking_exists(booking.id)?;
        }
        let payment = self.check_payment(payment)?;

        if let Some(booking) = booking {
            self.bookings.insert(booking.id, booking);
        }
        self.payments.insert(payment.id, payment.clone());
        Ok(payment)
    }
}

#[async_trait]
impl FieldRepository for InMemoryRepositoryProvider {
    async fn find_by_id(&self, id: i64) -> DomainResult<Option<Field>> {
        Ok(self.fields.get(&id).map(|f| f.clone()))
    }
}

#[async_trait]
impl BookingRepository for InMemoryRepositoryProvider {
    async fn insert(&self, mut booking: Booking) -> DomainResult<Booking> {
        let _guard = self.lock_writes()?;

        if self
            .bookings
            .iter()
            .any(|b| b.booking_code == booking.booking_code)
        {
            return Err(DomainError::Duplicate {
                entity: "Booking",
                field: "booking_code",
                value: booking.booking_code,
            });
        }
        if booking.status.is_active()
            && self.overlaps(
                booking.field_id,
                &crate::domain::booking::ACTIVE_STATUSES,
                booking.start_time,
                booking.end_time,
                None,
            )
        {
            return Err(DomainError::Conflict(
                "Field is already booked for the selected time range".into(),
            ));
        }

        booking.id = self.booking_counter.fetch_add(1, Ordering::SeqCst);
        self.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn update(&self, booking: Booking) -> DomainResult<()> {
        let _guard = self.lock_writes()?;
        self.check_booking_exists(booking.id)?;
        self.bookings.insert(booking.id, booking);
        Ok(())
    }

    async fn find_by_id(&self, id: i64) -> DomainResult<Option<Booking>> {
        Ok(self.bookings.get(&id).map(|b| b.clone()))
    }

    async fn exists_by_code(&self, code: &str) -> DomainResult<bool> {
        Ok(self.bookings.iter().any(|b| b.booking_code == code))
    }

    async fn exists_overlap(
        &self,
        field_id: i64,
        statuses: &[BookingStatus],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<bool> {
        Ok(self.overlaps(field_id, statuses, start, end, None))
    }

    async fn find_by_user(&self, user_id: i64) -> DomainResult<Vec<Booking>> {
        let mut list: Vec<Booking> = self
            .bookings
            .iter()
            .filter(|b| b.user_id == user_id)
            .map(|b| b.clone())
            .collect();
        list.sort_by(|a, b| b.start_time.cmp(&a.start_time).then(b.id.cmp(&a.id)));
        Ok(list)
    }

    async fn search(
        &self,
        code_filter: Option<&str>,
        params: PaginationParams,
    ) -> DomainResult<PaginatedResult<Booking>> {
        let needle = code_filter.map(|f| f.to_lowercase());
        let mut list: Vec<Booking> = self
            .bookings
            .iter()
            .filter(|b| match &needle {
                Some(n) => b.booking_code.to_lowercase().contains(n.as_str()),
                None => true,
            })
            .map(|b| b.clone())
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = list.len() as u64;
        let items = list
            .into_iter()
            .skip(params.offset() as usize)
            .take(params.limit as usize)
            .collect();
        Ok(PaginatedResult::new(items, total, params.page, params.limit))
    }
}

#[async_trait]
impl PaymentRepository for InMemoryRepositoryProvider {
    async fn save(&self, payment: Payment) -> DomainResult<Payment> {
        let _guard = self.lock_writes()?;
        let payment = self.check_payment(payment)?;
        self.payments.insert(payment.id, payment.clone());
        Ok(payment)
    }

    async fn find_by_booking_id(&self, booking_id: i64) -> DomainResult<Option<Payment>> {
        Ok(self
            .payments
            .iter()
            .find(|p| p.booking_id == booking_id)
            .map(|p| p.clone()))
    }

    async fn find_by_booking_ids(&self, booking_ids: &[i64]) -> DomainResult<Vec<Payment>> {
        Ok(self
            .payments
            .iter()
            .filter(|p| booking_ids.contains(&p.booking_id))
            .map(|p| p.clone())
            .collect())
    }

    async fn find_by_transaction_code(&self, code: &str) -> DomainResult<Option<Payment>> {
        Ok(self
            .payments
            .iter()
            .find(|p| p.transaction_code == code)
            .map(|p| p.clone()))
    }

    async fn exists_by_transaction_code(&self, code: &str) -> DomainResult<bool> {
        Ok(self.payments.iter().any(|p| p.transaction_code == code))
    }

    async fn find_by_gateway_ref(&self, gateway_ref: &str) -> DomainResult<Option<Payment>> {
        Ok(self
            .payments
            .iter()
            .find(|p| p.gateway_txn_ref.as_deref() == Some(gateway_ref))
            .map(|p| p.clone()))
    }
}

/// Reads from an in-memory store while every joint write fails.
#[cfg(test)]
pub(crate) struct FailingJointWrites(pub std::sync::Arc<InMemoryRepositoryProvider>);

#[cfg(test)]
#[async_trait]
impl RepositoryProvider for FailingJointWrites {
    fn fields(&self) -> &dyn FieldRepository {
        self.0.fields()
    }

    fn bookings(&self) -> &dyn BookingRepository {
        self.0.bookings()
    }

    fn payments(&self) -> &dyn PaymentRepository {
        self.0.payments()
    }

    async fn save_payment_and_booking(
        &self,
        _payment: Payment,
        _booking: Option<Booking>,
    ) -> DomainResult<Payment> {
        Err(DomainError::Storage("down".into()))
    }
}
