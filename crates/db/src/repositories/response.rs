use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::Row;

use upkeep_core::domain::batch::BatchId;
use upkeep_core::domain::request::RequestId;
use upkeep_core::domain::response::{
    QuotationItem, QuotationItemId, QuotationResponse, ResponseId,
};

use super::{RepositoryError, ResponseRepository};
use crate::DbPool;

pub struct SqlResponseRepository {
    pool: DbPool,
}

impl SqlResponseRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_response(row: &sqlx::sqlite::SqliteRow) -> Result<QuotationResponse, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let batch_id: String =
        row.try_get("batch_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let company_name: String =
        row.try_get("company_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let email: String =
        row.try_get("email").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let submitted_at_str: String =
        row.try_get("submitted_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let total_amount_str: String =
        row.try_get("total_amount").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let selected: bool =
        row.try_get("selected").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let submitted_at = DateTime::parse_from_rfc3339(&submitted_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());

    Ok(QuotationResponse {
        id: ResponseId(id),
        batch_id: BatchId(batch_id),
        company_name,
        email,
        submitted_at,
        total_amount: Decimal::from_str(&total_amount_str).unwrap_or_default(),
        selected,
    })
}

fn row_to_item(row: &sqlx::sqlite::SqliteRow) -> Result<QuotationItem, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let response_id: String =
        row.try_get("response_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let request_id: String =
        row.try_get("request_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let device: String =
        row.try_get("device").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let brand: Option<String> =
        row.try_get("brand").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let quantity: i64 =
        row.try_get("quantity").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let price_str: String =
        row.try_get("price").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let subtotal_str: String =
        row.try_get("subtotal").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(QuotationItem {
        id: QuotationItemId(id),
        response_id: ResponseId(response_id),
        request_id: RequestId(request_id),
        device,
        brand,
        quantity: quantity.max(1) as u32,
        price: Decimal::from_str(&price_str).unwrap_or_default(),
        subtotal: Decimal::from_str(&subtotal_str).unwrap_or_default(),
    })
}

#[async_trait::async_trait]
impl ResponseRepository for SqlResponseRepository {
    async fn create_with_items(
        &self,
        response: QuotationResponse,
        items: Vec<QuotationItem>,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO quotation_response
                 (id, batch_id, company_name, email, submitted_at, total_amount, selected)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&response.id.0)
        .bind(&response.batch_id.0)
        .bind(&response.company_name)
        .bind(&response.email)
        .bind(response.submitted_at.to_rfc3339())
        .bind(response.total_amount.to_string())
        .bind(response.selected)
        .execute(&mut *tx)
        .await?;

        for item in &items {
            sqlx::query(
                "INSERT INTO quotation_item
                     (id, response_id, request_id, device, brand, quantity, price, subtotal)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&item.id.0)
            .bind(&item.response_id.0)
            .bind(&item.request_id.0)
            .bind(&item.device)
            .bind(&item.brand)
            .bind(item.quantity as i64)
            .bind(item.price.to_string())
            .bind(item.subtotal.to_string())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &ResponseId,
    ) -> Result<Option<QuotationResponse>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, batch_id, company_name, email, submitted_at, total_amount, selected
             FROM quotation_response WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_response(r)?)),
            None => Ok(None),
        }
    }

    async fn list_for_batch(
        &self,
        batch_id: &BatchId,
    ) -> Result<Vec<QuotationResponse>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, batch_id, company_name, email, submitted_at, total_amount, selected
             FROM quotation_response
             WHERE batch_id = ?
             ORDER BY submitted_at DESC",
        )
        .bind(&batch_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_response).collect::<Result<Vec<_>, _>>()
    }

    async fn items_for_response(
        &self,
        id: &ResponseId,
    ) -> Result<Vec<QuotationItem>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, response_id, request_id, device, brand, quantity, price, subtotal
             FROM quotation_item
             WHERE response_id = ?
             ORDER BY id",
        )
        .bind(&id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_item).collect::<Result<Vec<_>, _>>()
    }

    async fn mark_selected(&self, id: &ResponseId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let batch_id: String =
            sqlx::query_scalar("SELECT batch_id FROM quotation_response WHERE id = ?")
                .bind(&id.0)
                .fetch_one(&mut *tx)
                .await?;

        sqlx::query("UPDATE quotation_response SET selected = 0 WHERE batch_id = ?")
            .bind(&batch_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE quotation_response SET selected = 1 WHERE id = ?")
            .bind(&id.0)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
