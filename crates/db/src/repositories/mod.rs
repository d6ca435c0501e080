use async_trait::async_trait;
use thiserror::Error;

use upkeep_core::domain::account::{UserAccount, UserId};
use upkeep_core::domain::batch::{BatchId, QuotationBatch};
use upkeep_core::domain::request::{MaintenanceRequest, RequestId, RequestStatus};
use upkeep_core::domain::response::{QuotationItem, QuotationResponse, ResponseId};

pub mod account;
pub mod batch;
pub mod memory;
pub mod request;
pub mod response;

pub use account::SqlAccountRepository;
pub use batch::SqlBatchRepository;
pub use memory::{
    InMemoryAccountRepository, InMemoryBatchRepository, InMemoryRequestRepository,
    InMemoryResponseRepository,
};
pub use request::SqlRequestRepository;
pub use response::SqlResponseRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("constraint violation: {0}")]
    Constraint(String),
}

#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserAccount>, RepositoryError>;

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserAccount>, RepositoryError>;

    async fn save(&self, account: UserAccount) -> Result<(), RepositoryError>;

    /// Email addresses of every admin account that has one on file.
    /// Accounts without an email are silently skipped.
    async fn admin_emails(&self) -> Result<Vec<String>, RepositoryError>;
}

#[async_trait]
pub trait RequestRepository: Send + Sync {
    async fn find_by_id(&self, id: &RequestId)
        -> Result<Option<MaintenanceRequest>, RepositoryError>;

    /// Fetch several requests, preserving the order of `ids`. Unknown ids
    /// are skipped.
    async fn find_many(
        &self,
        ids: &[RequestId],
    ) -> Result<Vec<MaintenanceRequest>, RepositoryError>;

    async fn save(&self, request: MaintenanceRequest) -> Result<(), RepositoryError>;

    async fn list_by_status(
        &self,
        status: RequestStatus,
    ) -> Result<Vec<MaintenanceRequest>, RepositoryError>;
}

#[async_trait]
pub trait BatchRepository: Send + Sync {
    /// Persist a new batch. The token column is UNIQUE; a collision fails
    /// the whole creation rather than retrying.
    async fn create(&self, batch: QuotationBatch) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: &BatchId) -> Result<Option<QuotationBatch>, RepositoryError>;

    async fn find_by_token(&self, token: &str)
        -> Result<Option<QuotationBatch>, RepositoryError>;
}

#[async_trait]
pub trait ResponseRepository: Send + Sync {
    /// Persist a response and its items in one transaction.
    async fn create_with_items(
        &self,
        response: QuotationResponse,
        items: Vec<QuotationItem>,
    ) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: &ResponseId)
        -> Result<Option<QuotationResponse>, RepositoryError>;

    /// Responses for a batch, newest first.
    async fn list_for_batch(
        &self,
        batch_id: &BatchId,
    ) -> Result<Vec<QuotationResponse>, RepositoryError>;

    async fn items_for_response(
        &self,
        id: &ResponseId,
    ) -> Result<Vec<QuotationItem>, RepositoryError>;

    /// Atomically clear `selected` on every response in the target's batch,
    /// then set it on the target. One transaction; a crash can never leave
    /// two responses selected.
    async fn mark_selected(&self, id: &ResponseId) -> Result<(), RepositoryError>;
}
