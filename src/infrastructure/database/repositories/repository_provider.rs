//! SeaORM implementation of RepositoryProvider

use async_trait::async_trait;
use sea_orm::{DatabaseConnection, TransactionTrait};

use crate::domain::repositories::RepositoryProvider;
use crate::domain::{
    Booking, BookingRepository, DomainResult, FieldRepository, Payment, PaymentRepository,
};

use super::booking_repository::{self, SeaOrmBookingRepository};
use super::db_err;
use super::field_repository::SeaOrmFieldRepository;
use super::payment_repository::{self, SeaOrmPaymentRepository};

/// Unified repository provider backed by SeaORM.
///
/// Holds one connection pool and exposes per-aggregate repository accessors.
///
/// ```ignore
/// let repos = SeaOrmRepositoryProvider::new(db.clone());
/// let field = repos.fields().find_by_id(1).await?;
/// let payment = repos.payments().find_by_transaction_code("TX123456").await?;
/// ```
pub struct SeaOrmRepositoryProvider {
    db: DatabaseConnection,
    fields: SeaOrmFieldRepository,
    bookings: SeaOrmBookingRepository,
    payments: SeaOrmPaymentRepository,
}

impl SeaOrmRepositoryProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            fields: SeaOrmFieldRepository::new(db.clone()),
            bookings: SeaOrmBookingRepository::new(db.clone()),
            payments: SeaOrmPaymentRepository::new(db.clone()),
            db,
        }
    }
}

#[async_trait]
impl RepositoryProvider for SeaOrmRepositoryProvider {
    fn fields(&self) -> &dyn FieldRepository {
        &self.fields
    }

    fn bookings(&self) -> &dyn BookingRepository {
        &self.bookings
    }

    fn payments(&self) -> &dyn PaymentRepository {
        &self.payments
    }

    async fn save_payment_and_booking(
        &self,
        payment: Payment,
        booking: Option<Booking>,
    ) -> DomainResult<Payment> {
        // Dropping the transaction on an early return rolls it back.
        let txn = self.db.begin().await.map_err(db_err)?;
        if let Some(booking) = booking {
            booking_repository::update_on(&txn, booking).await?;
        }
        let saved = payment_repository::save_on(&txn, payment).await?;
        txn.commit().await.map_err(db_err)?;
        Ok(saved)
    }
}
