use chrono::{DateTime, Utc};
use sqlx::Row;

use upkeep_core::domain::batch::{BatchId, BatchToken, QuotationBatch};
use upkeep_core::domain::request::RequestId;

use super::{BatchRepository, RepositoryError};
use crate::DbPool;

pub struct SqlBatchRepository {
    pool: DbPool,
}

impl SqlBatchRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_batch(row: &sqlx::sqlite::SqliteRow) -> Result<QuotationBatch, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let token: String =
        row.try_get("token").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let request_ids_json: String =
        row.try_get("request_ids").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let request_ids: Vec<String> = serde_json::from_str(&request_ids_json)
        .map_err(|e| RepositoryError::Decode(format!("request_ids: {e}")))?;
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());

    Ok(QuotationBatch {
        id: BatchId(id),
        token: BatchToken(token),
        request_ids: request_ids.into_iter().map(RequestId).collect(),
        created_at,
    })
}

#[async_trait::async_trait]
impl BatchRepository for SqlBatchRepository {
    async fn create(&self, batch: QuotationBatch) -> Result<(), RepositoryError> {
        let request_ids: Vec<&str> =
            batch.request_ids.iter().map(|id| id.0.as_str()).collect();
        let request_ids_json = serde_json::to_string(&request_ids)
            .map_err(|e| RepositoryError::Decode(format!("request_ids: {e}")))?;

        sqlx::query(
            "INSERT INTO quotation_batch (id, token, request_ids, created_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(&batch.id.0)
        .bind(&batch.token.0)
        .bind(&request_ids_json)
        .bind(batch.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: &BatchId) -> Result<Option<QuotationBatch>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, token, request_ids, created_at FROM quotation_batch WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_batch(r)?)),
            None => Ok(None),
        }
    }

    async fn find_by_token(
        &self,
        token: &str,
    ) -> Result<Option<QuotationBatch>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, token, request_ids, created_at FROM quotation_batch WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_batch(r)?)),
            None => Ok(None),
        }
    }
}
