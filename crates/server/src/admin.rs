//! Staff-facing workflow routes.
//!
//! JSON API Endpoints:
//! - `POST /api/v1/requests`                          — HOD submits a request
//! - `POST /api/v1/requests/{id}/edit`                — admin edits a request
//! - `POST /api/v1/requests/{id}/approve`             — admin approves
//! - `POST /api/v1/requests/{id}/reject`              — admin rejects
//! - `POST /api/v1/quotations/links`                  — admin batches requests for quoting
//! - `GET  /api/v1/quotations/batches/{id}`           — batch detail with responses
//! - `POST /api/v1/quotations/responses/{id}/select`  — admin picks the winning quotation
//!
//! The acting account is taken from the `x-actor` header and resolved to a
//! typed role inside the workflow service; there is no session handling here.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use upkeep_core::domain::account::UserId;
use upkeep_core::domain::batch::BatchId;
use upkeep_core::domain::request::RequestId;
use upkeep_core::domain::response::ResponseId;
use upkeep_core::errors::{ApplicationError, DomainError, InterfaceError};

use crate::workflow::{NewRequest, RequestEdit, WorkflowService};

#[derive(Clone)]
pub struct AdminState {
    pub workflow: Arc<WorkflowService>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub correlation_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequestBody {
    pub branch: Option<String>,
    pub title: String,
    #[serde(default)]
    pub lab_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "empty_items")]
    pub selected_items: String,
    pub total_amount: Option<String>,
}

fn empty_items() -> String {
    "[]".to_string()
}

#[derive(Debug, Default, Deserialize)]
pub struct EditRequestBody {
    pub branch: Option<String>,
    pub title: Option<String>,
    pub lab_name: Option<String>,
    pub description: Option<String>,
    pub selected_items: Option<String>,
    pub total_amount: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RemarkBody {
    pub admin_remark: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateLinkBody {
    pub selected_requests: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct TransitionResponse {
    pub success: bool,
    pub new_status: String,
}

#[derive(Debug, Serialize)]
pub struct LinkResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SelectResponse {
    pub success: bool,
    pub batch_id: String,
}

pub fn router(workflow: Arc<WorkflowService>) -> Router {
    Router::new()
        .route("/api/v1/catalog", get(catalog_entries))
        .route("/api/v1/requests", post(submit_request))
        .route("/api/v1/requests/{id}/edit", post(edit_request))
        .route("/api/v1/requests/{id}/approve", post(approve_request))
        .route("/api/v1/requests/{id}/reject", post(reject_request))
        .route("/api/v1/quotations/links", post(create_quotation_link))
        .route("/api/v1/quotations/batches/{id}", get(batch_detail))
        .route("/api/v1/quotations/responses/{id}/select", post(select_quotation))
        .with_state(AdminState { workflow })
}

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

fn actor(headers: &HeaderMap) -> ApiResult<UserId> {
    headers
        .get("x-actor")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| UserId(value.to_string()))
        .ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(ApiError {
                    error: "x-actor header is required".to_string(),
                    correlation_id: fresh_correlation_id(),
                }),
            )
        })
}

fn fresh_correlation_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn app_error(error: ApplicationError) -> (StatusCode, Json<ApiError>) {
    let interface = error.into_interface(fresh_correlation_id());
    let status = match &interface {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
        InterfaceError::Forbidden { .. } => StatusCode::FORBIDDEN,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let correlation_id = match &interface {
        InterfaceError::BadRequest { correlation_id, .. }
        | InterfaceError::NotFound { correlation_id, .. }
        | InterfaceError::Forbidden { correlation_id, .. }
        | InterfaceError::ServiceUnavailable { correlation_id, .. }
        | InterfaceError::Internal { correlation_id, .. } => correlation_id.clone(),
    };

    (status, Json(ApiError { error: interface.to_string(), correlation_id }))
}

/// The fixed price list backing the request form.
async fn catalog_entries(
    headers: HeaderMap,
) -> ApiResult<Json<&'static [upkeep_core::CatalogEntry]>> {
    actor(&headers)?;
    Ok(Json(upkeep_core::catalog::entries()))
}

async fn submit_request(
    State(state): State<AdminState>,
    headers: HeaderMap,
    Json(body): Json<SubmitRequestBody>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let actor = actor(&headers)?;

    let outcome = state
        .workflow
        .submit_request(
            &actor,
            NewRequest {
                branch: body.branch,
                title: body.title,
                lab_name: body.lab_name,
                description: body.description,
                selected_items: body.selected_items,
                total_amount: body.total_amount,
            },
        )
        .await
        .map_err(app_error)?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "success": true,
            "request_id": outcome.request.id.0,
            "status": format!("{:?}", outcome.request.status),
        })),
    ))
}

async fn edit_request(
    State(state): State<AdminState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<EditRequestBody>,
) -> ApiResult<Json<serde_json::Value>> {
    let actor = actor(&headers)?;

    let request = state
        .workflow
        .edit_request(
            &actor,
            &RequestId(id),
            RequestEdit {
                branch: body.branch,
                title: body.title,
                lab_name: body.lab_name,
                description: body.description,
                selected_items: body.selected_items,
                total_amount: body.total_amount,
            },
        )
        .await
        .map_err(app_error)?;

    Ok(Json(serde_json::json!({
        "success": true,
        "request_id": request.id.0,
        "title": request.title,
        "total_amount": request.total_amount.to_string(),
    })))
}

async fn approve_request(
    State(state): State<AdminState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<RemarkBody>,
) -> ApiResult<Json<TransitionResponse>> {
    let actor = actor(&headers)?;

    let outcome = state
        .workflow
        .approve_request(&actor, &RequestId(id), body.admin_remark)
        .await
        .map_err(app_error)?;

    Ok(Json(TransitionResponse {
        success: true,
        new_status: format!("{:?}", outcome.request.status),
    }))
}

async fn reject_request(
    State(state): State<AdminState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<RemarkBody>,
) -> ApiResult<Json<TransitionResponse>> {
    let actor = actor(&headers)?;

    let outcome = state
        .workflow
        .reject_request(&actor, &RequestId(id), body.admin_remark)
        .await
        .map_err(app_error)?;

    Ok(Json(TransitionResponse {
        success: true,
        new_status: format!("{:?}", outcome.request.status),
    }))
}

async fn create_quotation_link(
    State(state): State<AdminState>,
    headers: HeaderMap,
    Json(body): Json<CreateLinkBody>,
) -> ApiResult<Json<LinkResponse>> {
    let actor = actor(&headers)?;

    match state.workflow.create_batch(&actor, body.selected_requests).await {
        Ok(outcome) => Ok(Json(LinkResponse {
            success: true,
            link: Some(outcome.link),
            batch_id: Some(outcome.batch.id.0),
            message: None,
        })),
        // An empty selection is an expected operator mistake; answer with a
        // structured message instead of an error status.
        Err(ApplicationError::Domain(DomainError::EmptyBatch)) => Ok(Json(LinkResponse {
            success: false,
            link: None,
            batch_id: None,
            message: Some("Please select at least one request.".to_string()),
        })),
        Err(error) => Err(app_error(error)),
    }
}

async fn batch_detail(
    State(state): State<AdminState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    let actor = actor(&headers)?;

    let (batch, responses) = state
        .workflow
        .batch_detail(&actor, &BatchId(id))
        .await
        .map_err(app_error)?;

    let responses: Vec<serde_json::Value> = responses
        .iter()
        .map(|response| {
            serde_json::json!({
                "id": response.id.0,
                "company_name": response.company_name,
                "email": response.email,
                "submitted_at": response.submitted_at.to_rfc3339(),
                "total_amount": response.total_amount.to_string(),
                "selected": response.selected,
            })
        })
        .collect();

    Ok(Json(serde_json::json!({
        "batch_id": batch.id.0,
        "token": batch.token.0,
        "request_ids": batch.request_ids.iter().map(|id| id.0.clone()).collect::<Vec<_>>(),
        "created_at": batch.created_at.to_rfc3339(),
        "responses": responses,
    })))
}

async fn select_quotation(
    State(state): State<AdminState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<SelectResponse>> {
    let actor = actor(&headers)?;

    let response = state
        .workflow
        .select_response(&actor, &ResponseId(id))
        .await
        .map_err(app_error)?;

    Ok(Json(SelectResponse { success: true, batch_id: response.batch_id.0 }))
}
