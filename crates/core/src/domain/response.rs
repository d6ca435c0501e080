use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::batch::BatchId;
use crate::domain::request::RequestId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResponseId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuotationItemId(pub String);

/// A vendor's submission against one batch. `total_amount` is always the sum
/// of the item subtotals computed at submit time; `selected` is flipped by
/// the admin's clear-then-set selection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuotationResponse {
    pub id: ResponseId,
    pub batch_id: BatchId,
    pub company_name: String,
    pub email: String,
    pub submitted_at: DateTime<Utc>,
    pub total_amount: Decimal,
    pub selected: bool,
}

impl QuotationResponse {
    pub fn new(batch_id: BatchId, company_name: String, email: String) -> Self {
        Self {
            id: ResponseId(format!("QR-{}", &Uuid::new_v4().simple().to_string()[..12])),
            batch_id,
            company_name,
            email,
            submitted_at: Utc::now(),
            total_amount: Decimal::ZERO,
            selected: false,
        }
    }
}

/// One priced line of a response. Immutable after bulk creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuotationItem {
    pub id: QuotationItemId,
    pub response_id: ResponseId,
    pub request_id: RequestId,
    pub device: String,
    pub brand: Option<String>,
    pub quantity: u32,
    pub price: Decimal,
    pub subtotal: Decimal,
}

impl QuotationItem {
    /// The subtotal is recomputed here from price and quantity; submitted
    /// subtotals are never trusted.
    pub fn new(
        response_id: ResponseId,
        request_id: RequestId,
        device: String,
        brand: Option<String>,
        quantity: u32,
        price: Decimal,
    ) -> Self {
        let quantity = quantity.max(1);
        Self {
            id: QuotationItemId(format!("QI-{}", &Uuid::new_v4().simple().to_string()[..12])),
            response_id,
            request_id,
            device,
            brand,
            quantity,
            price,
            subtotal: price * Decimal::from(quantity),
        }
    }
}
