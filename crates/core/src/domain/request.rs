use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::account::UserId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

/// One line of the equipment list a HOD attaches to a request.
///
/// Payloads come in from browser-built JSON, so every field except `device`
/// is optional with the defaults the fill form uses.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EquipmentItem {
    pub device: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub price: Decimal,
}

fn default_quantity() -> u32 {
    1
}

impl EquipmentItem {
    pub fn subtotal(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// The typed equipment list, parsed once at the store boundary.
///
/// Writes fail closed: a payload that is not a JSON array of items is a
/// `DomainError::InvalidItemsPayload` and nothing is persisted. Reads of
/// already-stored text use [`EquipmentList::parse_lenient`], which degrades
/// malformed payloads to the empty list so vendor-facing views never fail on
/// historical data.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EquipmentList(pub Vec<EquipmentItem>);

impl EquipmentList {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }

        let value: serde_json::Value = serde_json::from_str(raw)
            .map_err(|error| DomainError::InvalidItemsPayload(error.to_string()))?;

        // Legacy clients double-encode the list (a JSON string containing a
        // JSON array). Unwrap one level before decoding items.
        let value = match value {
            serde_json::Value::String(inner) => serde_json::from_str(&inner)
                .map_err(|error| DomainError::InvalidItemsPayload(error.to_string()))?,
            other => other,
        };

        let items: Vec<EquipmentItem> = serde_json::from_value(value)
            .map_err(|error| DomainError::InvalidItemsPayload(error.to_string()))?;

        if let Some(item) = items.iter().find(|item| item.quantity == 0) {
            return Err(DomainError::InvalidItemsPayload(format!(
                "quantity for `{}` must be at least 1",
                item.device
            )));
        }

        Ok(Self(items))
    }

    pub fn parse_lenient(raw: &str) -> Self {
        Self::parse(raw).unwrap_or_default()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total(&self) -> Decimal {
        self.0.iter().map(EquipmentItem::subtotal).sum()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceRequest {
    pub id: RequestId,
    pub hod: UserId,
    pub branch: String,
    pub title: String,
    pub lab_name: String,
    pub description: String,
    pub status: RequestStatus,
    pub admin_remark: Option<String>,
    pub items: EquipmentList,
    pub total_amount: Decimal,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MaintenanceRequest {
    /// `Pending` fans out to `Approved`/`Rejected`; only `Approved` can be
    /// closed out as `Completed`. Re-approving or re-rejecting in place is
    /// allowed so an admin can overwrite the remark and re-send the letter.
    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        matches!(
            (self.status, next),
            (RequestStatus::Pending, RequestStatus::Approved)
                | (RequestStatus::Pending, RequestStatus::Rejected)
                | (RequestStatus::Approved, RequestStatus::Completed)
                | (RequestStatus::Approved, RequestStatus::Approved)
                | (RequestStatus::Rejected, RequestStatus::Rejected)
        )
    }

    pub fn transition_to(&mut self, next: RequestStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            self.status = next;
            return Ok(());
        }

        Err(DomainError::InvalidStatusTransition { from: self.status, to: next })
    }
}
