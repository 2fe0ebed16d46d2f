//! SeaORM implementation of PaymentRepository

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    NotSet, PaginatorTrait, QueryFilter, Set,
};
use tracing::debug;

use super::{db_err, unique_violation};
use crate::domain::{
    DomainError, DomainResult, Payment, PaymentMethod, PaymentRepository, PaymentStatus,
};
use crate::infrastructure::database::entities::payment;
use crate::shared::types::{from_minor_units, to_minor_units};

pub struct SeaOrmPaymentRepository {
    db: DatabaseConnection,
}

impl SeaOrmPaymentRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: payment::Model) -> DomainResult<Payment> {
    let status = PaymentStatus::from_str(&m.status).ok_or_else(|| {
        DomainError::Storage(format!("Unknown payment status '{}' for id {}", m.status, m.id))
    })?;
    let method = PaymentMethod::from_str(&m.method).ok_or_else(|| {
        DomainError::Storage(format!("Unknown payment method '{}' for id {}", m.method, m.id))
    })?;
    Ok(Payment {
        id: m.id,
        booking_id: m.booking_id,
        amount: from_minor_units(m.amount_minor),
        status,
        method,
        transaction_code: m.transaction_code,
        paid_at: m.paid_at,
        refunded_at: m.refunded_at,
        gateway_txn_ref: m.gateway_txn_ref,
        gateway_order_info: m.gateway_order_info,
        gateway_response_code: m.gateway_response_code,
    })
}

fn to_active_model(p: &Payment) -> DomainResult<payment::ActiveModel> {
    Ok(payment::ActiveModel {
        id: if p.id == 0 { NotSet } else { Set(p.id) },
        booking_id: Set(p.booking_id),
        amount_minor: Set(to_minor_units(p.amount)?),
        status: Set(p.status.as_str().to_string()),
        method: Set(p.method.as_str().to_string()),
        transaction_code: Set(p.transaction_code.clone()),
        paid_at: Set(p.paid_at),
        refunded_at: Set(p.refunded_at),
        gateway_txn_ref: Set(p.gateway_txn_ref.clone()),
        gateway_order_info: Set(p.gateway_order_info.clone()),
        gateway_response_code: Set(p.gateway_response_code.clone()),
    })
}

fn write_err(e: DbErr, p: &Payment) -> DomainError {
    match unique_violation(&e) {
        Some(msg) if msg.contains("transaction_code") => DomainError::Duplicate {
            entity: "Payment",
            field: "transaction_code",
            value: p.transaction_code.clone(),
        },
        Some(msg) if msg.contains("booking_id") => DomainError::Duplicate {
            entity: "Payment",
            field: "booking_id",
            value: p.booking_id.to_string(),
        },
        _ => db_err(e),
    }
}

/// Insert or update `p` on `conn`, which may be an open transaction.
pub(super) async fn save_on<C: ConnectionTrait>(conn: &C, p: Payment) -> DomainResult<Payment> {
    debug!(booking_id = p.booking_id, status = p.status.as_str(), "Saving payment");

    let model = to_active_model(&p)?;
    if p.id != 0 {
        let exists = payment::Entity::find_by_id(p.id)
            .one(conn)
            .await
            .map_err(db_err)?
            .is_some();
        if !exists {
            return Err(DomainError::not_found("Payment", "id", p.id));
        }
    }

    let result = match p.id {
        0 => model.insert(conn).await,
        _ => model.update(conn).await,
    };
    let saved = result.map_err(|e| write_err(e, &p))?;

    model_to_domain(saved)
}

// ── PaymentRepository impl ──────────────────────────────────────

#[async_trait]
impl PaymentRepository for SeaOrmPaymentRepository {
    async fn save(&self, p: Payment) -> DomainResult<Payment> {
        save_on(&self.db, p).await
    }

    async fn find_by_booking_id(&self, booking_id: i64) -> DomainResult<Option<Payment>> {
        payment::Entity::find()
            .filter(payment::Column::BookingId.eq(booking_id))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(model_to_domain)
            .transpose()
    }

    async fn find_by_booking_ids(&self, booking_ids: &[i64]) -> DomainResult<Vec<Payment>> {
        if booking_ids.is_empty() {
            return Ok(Vec::new());
        }
        payment::Entity::find()
            .filter(payment::Column::BookingId.is_in(booking_ids.iter().copied()))
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(model_to_domain)
            .collect()
    }

    async fn find_by_transaction_code(&self, code: &str) -> DomainResult<Option<Payment>> {
        payment::Entity::find()
            .filter(payment::Column::TransactionCode.eq(code))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(model_to_domain)
            .transpose()
    }

    async fn exists_by_transaction_code(&self, code: &str) -> DomainResult<bool> {
        let count = payment::Entity::find()
            .filter(payment::Column::TransactionCode.eq(code))
            .count(&self.db)
            .await
            .map_err(db_err)?;
        Ok(count > 0)
    }

    async fn find_by_gateway_ref(&self, gateway_ref: &str) -> DomainResult<Option<Payment>> {
        payment::Entity::find()
            .filter(payment::Column::GatewayTxnRef.eq(gateway_ref))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(model_to_domain)
            .transpose()
    }
}
