//! Payment entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(unique)]
    pub booking_id: i64,

    pub amount_minor: i64,

    /// PENDING, PAID, REFUND_PENDING, REFUNDED
    pub status: String,

    /// COD or VNPAY
    pub method: String,

    #[sea_orm(unique)]
    pub transaction_code: String,

    #[sea_orm(nullable)]
    pub paid_at: Option<DateTimeUtc>,

    #[sea_orm(nullable)]
    pub refunded_at: Option<DateTimeUtc>,

    #[sea_orm(nullable)]
    pub gateway_txn_ref: Option<String>,

    #[sea_orm(nullable)]
    pub gateway_order_info: Option<String>,

    #[sea_orm(nullable)]
    pub gateway_response_code: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::booking::Entity",
        from = "Column::BookingId",
        to = "super::booking::Column::Id"
    )]
    Booking,
}

impl Related<super::booking::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Booking.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
