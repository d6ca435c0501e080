use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::Row;

use upkeep_core::domain::account::UserId;
use upkeep_core::domain::request::{
    EquipmentList, MaintenanceRequest, RequestId, RequestStatus,
};

use super::{RepositoryError, RequestRepository};
use crate::DbPool;

pub struct SqlRequestRepository {
    pool: DbPool,
}

impl SqlRequestRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_status(s: &str) -> RequestStatus {
    match s {
        "approved" => RequestStatus::Approved,
        "rejected" => RequestStatus::Rejected,
        "completed" => RequestStatus::Completed,
        _ => RequestStatus::Pending,
    }
}

pub fn status_as_str(status: RequestStatus) -> &'static str {
    match status {
        RequestStatus::Pending => "pending",
        RequestStatus::Approved => "approved",
        RequestStatus::Rejected => "rejected",
        RequestStatus::Completed => "completed",
    }
}

fn row_to_request(row: &sqlx::sqlite::SqliteRow) -> Result<MaintenanceRequest, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let hod_id: String =
        row.try_get("hod_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let branch: String =
        row.try_get("branch").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let title: String =
        row.try_get("title").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let lab_name: String =
        row.try_get("lab_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let description: String =
        row.try_get("description").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status_str: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let admin_remark: Option<String> =
        row.try_get("admin_remark").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let selected_items: String =
        row.try_get("selected_items").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let total_amount_str: String =
        row.try_get("total_amount").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let submitted_at_str: String =
        row.try_get("submitted_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at_str: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let submitted_at = DateTime::parse_from_rfc3339(&submitted_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());
    let updated_at = DateTime::parse_from_rfc3339(&updated_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());

    Ok(MaintenanceRequest {
        id: RequestId(id),
        hod: UserId(hod_id),
        branch,
        title,
        lab_name,
        description,
        status: parse_status(&status_str),
        admin_remark,
        // Writes validate the payload; historical rows degrade to an empty
        // list instead of failing every read.
        items: EquipmentList::parse_lenient(&selected_items),
        total_amount: Decimal::from_str(&total_amount_str).unwrap_or_default(),
        submitted_at,
        updated_at,
    })
}

#[async_trait::async_trait]
impl RequestRepository for SqlRequestRepository {
    async fn find_by_id(
        &self,
        id: &RequestId,
    ) -> Result<Option<MaintenanceRequest>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, hod_id, branch, title, lab_name, description, status,
                    admin_remark, selected_items, total_amount, submitted_at, updated_at
             FROM maintenance_request WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_request(r)?)),
            None => Ok(None),
        }
    }

    async fn find_many(
        &self,
        ids: &[RequestId],
    ) -> Result<Vec<MaintenanceRequest>, RepositoryError> {
        let mut requests = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(request) = self.find_by_id(id).await? {
                requests.push(request);
            }
        }
        Ok(requests)
    }

    async fn save(&self, request: MaintenanceRequest) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO maintenance_request
                 (id, hod_id, branch, title, lab_name, description, status,
                  admin_remark, selected_items, total_amount, submitted_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 branch = excluded.branch,
                 title = excluded.title,
                 lab_name = excluded.lab_name,
                 description = excluded.description,
                 status = excluded.status,
                 admin_remark = excluded.admin_remark,
                 selected_items = excluded.selected_items,
                 total_amount = excluded.total_amount,
                 updated_at = excluded.updated_at",
        )
        .bind(&request.id.0)
        .bind(&request.hod.0)
        .bind(&request.branch)
        .bind(&request.title)
        .bind(&request.lab_name)
        .bind(&request.description)
        .bind(status_as_str(request.status))
        .bind(&request.admin_remark)
        .bind(request.items.to_json())
        .bind(request.total_amount.to_string())
        .bind(request.submitted_at.to_rfc3339())
        .bind(request.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_by_status(
        &self,
        status: RequestStatus,
    ) -> Result<Vec<MaintenanceRequest>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, hod_id, branch, title, lab_name, description, status,
                    admin_remark, selected_items, total_amount, submitted_at, updated_at
             FROM maintenance_request
             WHERE status = ?
             ORDER BY submitted_at DESC",
        )
        .bind(status_as_str(status))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_request).collect::<Result<Vec<_>, _>>()
    }
}
