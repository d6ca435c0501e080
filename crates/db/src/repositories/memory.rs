use std::collections::HashMap;

use tokio::sync::RwLock;

use upkeep_core::domain::account::{UserAccount, UserId};
use upkeep_core::domain::batch::{BatchId, QuotationBatch};
use upkeep_core::domain::request::{MaintenanceRequest, RequestId, RequestStatus};
use upkeep_core::domain::response::{QuotationItem, QuotationResponse, ResponseId};

use super::{
    AccountRepository, BatchRepository, RepositoryError, RequestRepository, ResponseRepository,
};

#[derive(Default)]
pub struct InMemoryAccountRepository {
    accounts: RwLock<HashMap<String, UserAccount>>,
}

#[async_trait::async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserAccount>, RepositoryError> {
        let accounts = self.accounts.read().await;
        Ok(accounts.get(&id.0).cloned())
    }

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserAccount>, RepositoryError> {
        let accounts = self.accounts.read().await;
        Ok(accounts.values().find(|account| account.username == username).cloned())
    }

    async fn save(&self, account: UserAccount) -> Result<(), RepositoryError> {
        let mut accounts = self.accounts.write().await;
        accounts.insert(account.id.0.clone(), account);
        Ok(())
    }

    async fn admin_emails(&self) -> Result<Vec<String>, RepositoryError> {
        let accounts = self.accounts.read().await;
        let mut emails: Vec<String> = accounts
            .values()
            .filter(|account| account.role.is_admin())
            .filter_map(|account| account.email.clone())
            .filter(|email| !email.is_empty())
            .collect();
        emails.sort();
        Ok(emails)
    }
}

#[derive(Default)]
pub struct InMemoryRequestRepository {
    requests: RwLock<HashMap<String, MaintenanceRequest>>,
}

#[async_trait::async_trait]
impl RequestRepository for InMemoryRequestRepository {
    async fn find_by_id(
        &self,
        id: &RequestId,
    ) -> Result<Option<MaintenanceRequest>, RepositoryError> {
        let requests = self.requests.read().await;
        Ok(requests.get(&id.0).cloned())
    }

    async fn find_many(
        &self,
        ids: &[RequestId],
    ) -> Result<Vec<MaintenanceRequest>, RepositoryError> {
        let requests = self.requests.read().await;
        Ok(ids.iter().filter_map(|id| requests.get(&id.0).cloned()).collect())
    }

    async fn save(&self, request: MaintenanceRequest) -> Result<(), RepositoryError> {
        let mut requests = self.requests.write().await;
        requests.insert(request.id.0.clone(), request);
        Ok(())
    }

    async fn list_by_status(
        &self,
        status: RequestStatus,
    ) -> Result<Vec<MaintenanceRequest>, RepositoryError> {
        let requests = self.requests.read().await;
        let mut matching: Vec<MaintenanceRequest> =
            requests.values().filter(|request| request.status == status).cloned().collect();
        matching.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(matching)
    }
}

#[derive(Default)]
pub struct InMemoryBatchRepository {
    batches: RwLock<HashMap<String, QuotationBatch>>,
}

#[async_trait::async_trait]
impl BatchRepository for InMemoryBatchRepository {
    async fn create(&self, batch: QuotationBatch) -> Result<(), RepositoryError> {
        let mut batches = self.batches.write().await;
        if batches.values().any(|existing| existing.token == batch.token) {
            return Err(RepositoryError::Constraint(format!(
                "batch token `{}` already exists",
                batch.token.0
            )));
        }
        batches.insert(batch.id.0.clone(), batch);
        Ok(())
    }

    async fn find_by_id(&self, id: &BatchId) -> Result<Option<QuotationBatch>, RepositoryError> {
        let batches = self.batches.read().await;
        Ok(batches.get(&id.0).cloned())
    }

    async fn find_by_token(
        &self,
        token: &str,
    ) -> Result<Option<QuotationBatch>, RepositoryError> {
        let batches = self.batches.read().await;
        Ok(batches.values().find(|batch| batch.token.0 == token).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryResponseRepository {
    responses: RwLock<HashMap<String, QuotationResponse>>,
    items: RwLock<HashMap<String, Vec<QuotationItem>>>,
}

#[async_trait::async_trait]
impl ResponseRepository for InMemoryResponseRepository {
    async fn create_with_items(
        &self,
        response: QuotationResponse,
        items: Vec<QuotationItem>,
    ) -> Result<(), RepositoryError> {
        let mut responses = self.responses.write().await;
        let mut stored_items = self.items.write().await;
        stored_items.insert(response.id.0.clone(), items);
        responses.insert(response.id.0.clone(), response);
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &ResponseId,
    ) -> Result<Option<QuotationResponse>, RepositoryError> {
        let responses = self.responses.read().await;
        Ok(responses.get(&id.0).cloned())
    }

    async fn list_for_batch(
        &self,
        batch_id: &BatchId,
    ) -> Result<Vec<QuotationResponse>, RepositoryError> {
        let responses = self.responses.read().await;
        let mut matching: Vec<QuotationResponse> = responses
            .values()
            .filter(|response| response.batch_id == *batch_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(matching)
    }

    async fn items_for_response(
        &self,
        id: &ResponseId,
    ) -> Result<Vec<QuotationItem>, RepositoryError> {
        let items = self.items.read().await;
        Ok(items.get(&id.0).cloned().unwrap_or_default())
    }

    async fn mark_selected(&self, id: &ResponseId) -> Result<(), RepositoryError> {
        let mut responses = self.responses.write().await;
        let batch_id = responses
            .get(&id.0)
            .map(|response| response.batch_id.clone())
            .ok_or_else(|| {
                RepositoryError::Constraint(format!("response `{}` does not exist", id.0))
            })?;

        for response in responses.values_mut() {
            if response.batch_id == batch_id {
                response.selected = response.id.0 == id.0;
            }
        }
        Ok(())
    }
}
