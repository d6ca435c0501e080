use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::request::RequestId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchId(pub String);

/// Opaque vendor-facing lookup key. Unguessable, immutable, no expiry.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchToken(pub String);

impl BatchToken {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }
}

/// A group of approved requests sent out for one round of vendor quoting.
/// Immutable after creation; the request-id list defines exactly what the
/// token exposes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotationBatch {
    pub id: BatchId,
    pub token: BatchToken,
    pub request_ids: Vec<RequestId>,
    pub created_at: DateTime<Utc>,
}

impl QuotationBatch {
    pub fn new(request_ids: Vec<RequestId>) -> Result<Self, DomainError> {
        if request_ids.is_empty() {
            return Err(DomainError::EmptyBatch);
        }

        Ok(Self {
            id: BatchId(format!("QB-{}", &Uuid::new_v4().simple().to_string()[..12])),
            token: BatchToken::generate(),
            request_ids,
            created_at: Utc::now(),
        })
    }

    pub fn fill_path(&self) -> String {
        format!("/quotation/fill/{}", self.token.0)
    }

    /// Absolute vendor link when a public base URL is configured, otherwise
    /// the bare path so the caller can still hand something out.
    pub fn vendor_link(&self, public_base_url: Option<&str>) -> String {
        match public_base_url.map(str::trim).filter(|base| !base.is_empty()) {
            Some(base) => format!("{}{}", base.trim_end_matches('/'), self.fill_path()),
            None => self.fill_path(),
        }
    }
}
