//! Workflow controller for the request/quotation lifecycle.
//!
//! Every transition follows the same shape: role check, primary state change
//! persisted first, then best-effort side effects (email, rendered letter)
//! whose failures are logged and reported out-of-band but never propagated.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{error, info, warn};
use uuid::Uuid;

use upkeep_core::domain::account::{UserAccount, UserId};
use upkeep_core::domain::batch::{BatchId, QuotationBatch};
use upkeep_core::domain::request::{
    EquipmentList, MaintenanceRequest, RequestId, RequestStatus,
};
use upkeep_core::domain::response::{QuotationItem, QuotationResponse, ResponseId};
use upkeep_core::errors::{ApplicationError, DomainError};
use upkeep_core::notify::{Notification, Notifier, SideEffectStatus};
use upkeep_core::render::LetterRenderer;
use upkeep_db::repositories::{
    AccountRepository, BatchRepository, RepositoryError, RequestRepository, ResponseRepository,
    SqlAccountRepository, SqlBatchRepository, SqlRequestRepository, SqlResponseRepository,
};
use upkeep_db::DbPool;

pub struct WorkflowService {
    accounts: Arc<dyn AccountRepository>,
    requests: Arc<dyn RequestRepository>,
    batches: Arc<dyn BatchRepository>,
    responses: Arc<dyn ResponseRepository>,
    notifier: Arc<dyn Notifier>,
    renderer: Arc<dyn LetterRenderer>,
    public_base_url: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct NewRequest {
    pub branch: Option<String>,
    pub title: String,
    pub lab_name: String,
    pub description: String,
    pub selected_items: String,
    pub total_amount: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct RequestEdit {
    pub branch: Option<String>,
    pub title: Option<String>,
    pub lab_name: Option<String>,
    pub description: Option<String>,
    pub selected_items: Option<String>,
    pub total_amount: Option<String>,
}

#[derive(Clone, Debug)]
pub struct SubmitOutcome {
    pub request: MaintenanceRequest,
    pub notification: SideEffectStatus,
}

#[derive(Clone, Debug)]
pub struct TransitionOutcome {
    pub request: MaintenanceRequest,
    pub notification: SideEffectStatus,
}

#[derive(Clone, Debug)]
pub struct BatchOutcome {
    pub batch: QuotationBatch,
    pub link: String,
}

/// One vendor-facing quotation line: the cross-product of a batch's requests
/// with each request's equipment list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchLineItem {
    pub request_id: RequestId,
    pub request_title: String,
    pub device: String,
    pub brand: Option<String>,
    pub size: Option<String>,
    pub quantity: u32,
}

impl BatchLineItem {
    /// Form-field key the fill page uses for this line's price input.
    pub fn price_key(&self) -> String {
        format!("price_{}_{}", self.request_id.0, self.device)
    }
}

#[derive(Clone, Debug, Default)]
pub struct VendorSubmission {
    pub company_name: String,
    pub email: String,
    pub prices: HashMap<String, String>,
}

fn persistence(error: RepositoryError) -> ApplicationError {
    ApplicationError::Persistence(error.to_string())
}

fn fresh_request_id() -> RequestId {
    RequestId(format!("REQ-{}", &Uuid::new_v4().simple().to_string()[..12]))
}

/// Invalid or absent totals coerce to zero rather than failing the call.
fn parse_total(raw: Option<&str>) -> Decimal {
    raw.and_then(|value| Decimal::from_str(value.trim()).ok()).unwrap_or_default()
}

impl WorkflowService {
    pub fn new(
        pool: DbPool,
        notifier: Arc<dyn Notifier>,
        renderer: Arc<dyn LetterRenderer>,
        public_base_url: Option<String>,
    ) -> Self {
        Self {
            accounts: Arc::new(SqlAccountRepository::new(pool.clone())),
            requests: Arc::new(SqlRequestRepository::new(pool.clone())),
            batches: Arc::new(SqlBatchRepository::new(pool.clone())),
            responses: Arc::new(SqlResponseRepository::new(pool)),
            notifier,
            renderer,
            public_base_url,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn with_repositories(
        accounts: Arc<dyn AccountRepository>,
        requests: Arc<dyn RequestRepository>,
        batches: Arc<dyn BatchRepository>,
        responses: Arc<dyn ResponseRepository>,
        notifier: Arc<dyn Notifier>,
        renderer: Arc<dyn LetterRenderer>,
        public_base_url: Option<String>,
    ) -> Self {
        Self { accounts, requests, batches, responses, notifier, renderer, public_base_url }
    }

    /// Resolve the acting account and require the admin role. Evaluated once
    /// per operation; everything downstream trusts the typed role.
    async fn require_admin(&self, actor: &UserId) -> Result<UserAccount, ApplicationError> {
        let account = self
            .accounts
            .find_by_id(actor)
            .await
            .map_err(persistence)?
            .ok_or_else(|| ApplicationError::Forbidden { actor: actor.0.clone() })?;

        if !account.role.is_admin() {
            return Err(ApplicationError::Forbidden { actor: account.username });
        }

        Ok(account)
    }

    async fn require_account(&self, actor: &UserId) -> Result<UserAccount, ApplicationError> {
        self.accounts
            .find_by_id(actor)
            .await
            .map_err(persistence)?
            .ok_or_else(|| ApplicationError::Forbidden { actor: actor.0.clone() })
    }

    // -----------------------------------------------------------------------
    // Request submission & edit
    // -----------------------------------------------------------------------

    pub async fn submit_request(
        &self,
        hod_id: &UserId,
        new_request: NewRequest,
    ) -> Result<SubmitOutcome, ApplicationError> {
        let hod = self.require_account(hod_id).await?;

        // Parse once at the boundary; a malformed payload creates nothing.
        let items = EquipmentList::parse(&new_request.selected_items)?;
        let total_amount = parse_total(new_request.total_amount.as_deref());
        let branch = new_request
            .branch
            .filter(|branch| !branch.trim().is_empty())
            .or_else(|| hod.branch.clone())
            .unwrap_or_default();

        let now = Utc::now();
        let request = MaintenanceRequest {
            id: fresh_request_id(),
            hod: hod.id.clone(),
            branch,
            title: new_request.title,
            lab_name: new_request.lab_name,
            description: new_request.description,
            status: RequestStatus::Pending,
            admin_remark: None,
            items,
            total_amount,
            submitted_at: now,
            updated_at: now,
        };

        self.requests.save(request.clone()).await.map_err(persistence)?;
        info!(
            event_name = "workflow.request.submitted",
            request_id = %request.id.0,
            hod = %hod.username,
            branch = %request.branch,
            "maintenance request submitted"
        );

        let notification = self.notify_admins_of_submission(&request, &hod).await;
        Ok(SubmitOutcome { request, notification })
    }

    pub async fn edit_request(
        &self,
        actor: &UserId,
        request_id: &RequestId,
        edit: RequestEdit,
    ) -> Result<MaintenanceRequest, ApplicationError> {
        self.require_admin(actor).await?;

        let mut request = self
            .requests
            .find_by_id(request_id)
            .await
            .map_err(persistence)?
            .ok_or_else(|| ApplicationError::NotFound {
                resource: "maintenance request",
                id: request_id.0.clone(),
            })?;

        // Validate the items payload before any field is touched: a bad
        // payload rejects the whole edit, co-submitted fields included.
        let parsed_items = match edit.selected_items.as_deref() {
            Some(raw) => Some(EquipmentList::parse(raw)?),
            None => None,
        };

        if let Some(branch) = edit.branch {
            request.branch = branch;
        }
        if let Some(title) = edit.title {
            request.title = title;
        }
        if let Some(lab_name) = edit.lab_name {
            request.lab_name = lab_name;
        }
        if let Some(description) = edit.description {
            request.description = description;
        }
        if let Some(items) = parsed_items {
            request.items = items;
        }
        if let Some(raw_total) = edit.total_amount {
            request.total_amount = parse_total(Some(&raw_total));
        }
        request.updated_at = Utc::now();

        self.requests.save(request.clone()).await.map_err(persistence)?;
        info!(
            event_name = "workflow.request.edited",
            request_id = %request.id.0,
            "maintenance request updated"
        );

        Ok(request)
    }

    // -----------------------------------------------------------------------
    // Approve / reject transitions
    // -----------------------------------------------------------------------

    pub async fn approve_request(
        &self,
        actor: &UserId,
        request_id: &RequestId,
        remark: Option<String>,
    ) -> Result<TransitionOutcome, ApplicationError> {
        let request = self
            .apply_transition(actor, request_id, RequestStatus::Approved, remark, "Approved by admin")
            .await?;
        info!(
            event_name = "workflow.request.approved",
            request_id = %request.id.0,
            "maintenance request approved"
        );

        let notification = self.notify_hod_of_decision(&request, true).await;
        Ok(TransitionOutcome { request, notification })
    }

    pub async fn reject_request(
        &self,
        actor: &UserId,
        request_id: &RequestId,
        remark: Option<String>,
    ) -> Result<TransitionOutcome, ApplicationError> {
        let request = self
            .apply_transition(actor, request_id, RequestStatus::Rejected, remark, "Rejected by admin")
            .await?;
        info!(
            event_name = "workflow.request.rejected",
            request_id = %request.id.0,
            "maintenance request rejected"
        );

        let notification = self.notify_hod_of_decision(&request, false).await;
        Ok(TransitionOutcome { request, notification })
    }

    async fn apply_transition(
        &self,
        actor: &UserId,
        request_id: &RequestId,
        next: RequestStatus,
        remark: Option<String>,
        default_remark: &str,
    ) -> Result<MaintenanceRequest, ApplicationError> {
        self.require_admin(actor).await?;

        let mut request = self
            .requests
            .find_by_id(request_id)
            .await
            .map_err(persistence)?
            .ok_or_else(|| ApplicationError::NotFound {
                resource: "maintenance request",
                id: request_id.0.clone(),
            })?;

        request.transition_to(next)?;
        request.admin_remark = Some(
            remark
                .filter(|remark| !remark.trim().is_empty())
                .unwrap_or_else(|| default_remark.to_string()),
        );
        request.updated_at = Utc::now();

        // Persisted before any side effect is attempted.
        self.requests.save(request.clone()).await.map_err(persistence)?;
        Ok(request)
    }

    // -----------------------------------------------------------------------
    // Batch creation
    // -----------------------------------------------------------------------

    pub async fn create_batch(
        &self,
        actor: &UserId,
        request_ids: Vec<String>,
    ) -> Result<BatchOutcome, ApplicationError> {
        self.require_admin(actor).await?;

        let ids = request_ids.into_iter().map(RequestId).collect();
        let batch = QuotationBatch::new(ids)?;

        // A token collision surfaces as a store error and fails the whole
        // creation; tokens are never reused or regenerated in place.
        self.batches.create(batch.clone()).await.map_err(persistence)?;

        let link = batch.vendor_link(self.public_base_url.as_deref());
        info!(
            event_name = "workflow.batch.created",
            batch_id = %batch.id.0,
            request_count = batch.request_ids.len(),
            "quotation batch created"
        );

        Ok(BatchOutcome { batch, link })
    }

    pub async fn batch_detail(
        &self,
        actor: &UserId,
        batch_id: &BatchId,
    ) -> Result<(QuotationBatch, Vec<QuotationResponse>), ApplicationError> {
        self.require_admin(actor).await?;

        let batch = self
            .batches
            .find_by_id(batch_id)
            .await
            .map_err(persistence)?
            .ok_or_else(|| ApplicationError::NotFound {
                resource: "quotation batch",
                id: batch_id.0.clone(),
            })?;
        let responses =
            self.responses.list_for_batch(&batch.id).await.map_err(persistence)?;

        Ok((batch, responses))
    }

    // -----------------------------------------------------------------------
    // Vendor quotation fill
    // -----------------------------------------------------------------------

    pub async fn fetch_batch_items(
        &self,
        token: &str,
    ) -> Result<(QuotationBatch, Vec<BatchLineItem>), ApplicationError> {
        let batch = self
            .batches
            .find_by_token(token)
            .await
            .map_err(persistence)?
            .ok_or_else(|| ApplicationError::NotFound {
                resource: "quotation batch",
                id: token.to_string(),
            })?;

        // Requests whose stored payload does not parse contribute zero
        // lines; the store already degrades those to an empty list.
        let requests = self.requests.find_many(&batch.request_ids).await.map_err(persistence)?;
        let mut lines = Vec::new();
        for request in &requests {
            for item in &request.items.0 {
                lines.push(BatchLineItem {
                    request_id: request.id.clone(),
                    request_title: request.title.clone(),
                    device: item.device.clone(),
                    brand: item.brand.clone(),
                    size: item.size.clone(),
                    quantity: item.quantity,
                });
            }
        }

        Ok((batch, lines))
    }

    pub async fn submit_response(
        &self,
        token: &str,
        submission: VendorSubmission,
    ) -> Result<QuotationResponse, ApplicationError> {
        let company_name = submission.company_name.trim().to_string();
        let email = submission.email.trim().to_string();
        if company_name.is_empty() {
            return Err(DomainError::MissingField { field: "company_name" }.into());
        }
        if email.is_empty() {
            return Err(DomainError::MissingField { field: "email" }.into());
        }

        let (batch, lines) = self.fetch_batch_items(token).await?;

        let mut response = QuotationResponse::new(batch.id.clone(), company_name, email);
        let items: Vec<QuotationItem> = lines
            .iter()
            .map(|line| {
                // Absent or non-numeric prices default to zero; vendors are
                // never hard-failed on a bad price input.
                let price = submission
                    .prices
                    .get(&line.price_key())
                    .and_then(|raw| Decimal::from_str(raw.trim()).ok())
                    .unwrap_or_default();
                QuotationItem::new(
                    response.id.clone(),
                    line.request_id.clone(),
                    line.device.clone(),
                    line.brand.clone(),
                    line.quantity,
                    price,
                )
            })
            .collect();
        response.total_amount = items.iter().map(|item| item.subtotal).sum();

        self.responses.create_with_items(response.clone(), items).await.map_err(persistence)?;
        info!(
            event_name = "workflow.quotation.submitted",
            batch_id = %batch.id.0,
            response_id = %response.id.0,
            company = %response.company_name,
            "vendor quotation submitted"
        );

        Ok(response)
    }

    // -----------------------------------------------------------------------
    // Quotation selection
    // -----------------------------------------------------------------------

    pub async fn select_response(
        &self,
        actor: &UserId,
        response_id: &ResponseId,
    ) -> Result<QuotationResponse, ApplicationError> {
        self.require_admin(actor).await?;

        let response = self
            .responses
            .find_by_id(response_id)
            .await
            .map_err(persistence)?
            .ok_or_else(|| ApplicationError::NotFound {
                resource: "quotation response",
                id: response_id.0.clone(),
            })?;

        self.responses.mark_selected(response_id).await.map_err(persistence)?;
        info!(
            event_name = "workflow.quotation.selected",
            batch_id = %response.batch_id.0,
            response_id = %response.id.0,
            company = %response.company_name,
            "quotation selected"
        );

        Ok(QuotationResponse { selected: true, ..response })
    }

    // -----------------------------------------------------------------------
    // Side effects
    // -----------------------------------------------------------------------

    async fn notify_admins_of_submission(
        &self,
        request: &MaintenanceRequest,
        hod: &UserAccount,
    ) -> SideEffectStatus {
        let recipients = match self.accounts.admin_emails().await {
            Ok(recipients) => recipients,
            Err(error) => {
                error!(
                    event_name = "workflow.notify.recipients_failed",
                    request_id = %request.id.0,
                    error = %error,
                    "failed to resolve admin recipients"
                );
                return SideEffectStatus::Failed(error.to_string());
            }
        };
        if recipients.is_empty() {
            return SideEffectStatus::Skipped;
        }

        let context = serde_json::json!({
            "request": request_context(request),
            "hod": { "username": hod.username, "email": hod.email },
        });
        let body = match self.renderer.render("request_summary", &context).await {
            Ok(document) => document
                .as_text()
                .map(str::to_string)
                .unwrap_or_else(|| plain_submission_summary(request, hod)),
            Err(error) => {
                warn!(
                    event_name = "workflow.render.failed",
                    request_id = %request.id.0,
                    template = "request_summary",
                    error = %error,
                    "summary render failed, sending plain-text body"
                );
                plain_submission_summary(request, hod)
            }
        };

        let notification = Notification::new(
            recipients,
            format!("New Maintenance Request Submitted: {}", request.title),
            body,
        );
        self.deliver(notification, request).await
    }

    async fn notify_hod_of_decision(
        &self,
        request: &MaintenanceRequest,
        approved: bool,
    ) -> SideEffectStatus {
        let hod = match self.accounts.find_by_id(&request.hod).await {
            Ok(Some(hod)) => hod,
            Ok(None) => return SideEffectStatus::Skipped,
            Err(error) => {
                error!(
                    event_name = "workflow.notify.recipients_failed",
                    request_id = %request.id.0,
                    error = %error,
                    "failed to resolve the owning HOD"
                );
                return SideEffectStatus::Failed(error.to_string());
            }
        };
        let Some(email) = hod.email.clone() else {
            return SideEffectStatus::Skipped;
        };

        let decision = if approved { "approved" } else { "rejected" };
        let body = format!(
            "Dear {},\n\n\
             Your maintenance request titled '{}' for branch {} has been {}.\n\n\
             Admin Remark: {}\n\
             Total Amount: {}\n\n\
             Thank you,\nAdmin Team",
            hod.username,
            request.title,
            request.branch,
            decision,
            request.admin_remark.as_deref().unwrap_or("-"),
            request.total_amount,
        );
        let subject = if approved {
            format!("Maintenance Request Approved: {}", request.title)
        } else {
            format!("Maintenance Request Rejected: {}", request.title)
        };
        let mut notification = Notification::new(vec![email], subject, body);

        // Approval letters ride along as an attachment; a render failure
        // degrades to a plain email rather than failing the notification.
        if approved {
            let context = serde_json::json!({
                "request": request_context(request),
                "hod": { "username": hod.username, "email": hod.email },
            });
            match self.renderer.render("request_letter", &context).await {
                Ok(document) => {
                    notification =
                        notification.with_attachment(document.into_attachment("RequestLetter"));
                }
                Err(error) => {
                    warn!(
                        event_name = "workflow.render.failed",
                        request_id = %request.id.0,
                        template = "request_letter",
                        error = %error,
                        "letter render failed, sending without attachment"
                    );
                }
            }
        }

        self.deliver(notification, request).await
    }

    async fn deliver(
        &self,
        notification: Notification,
        request: &MaintenanceRequest,
    ) -> SideEffectStatus {
        match self.notifier.send(notification).await {
            Ok(()) => SideEffectStatus::Delivered,
            Err(error) => {
                error!(
                    event_name = "workflow.notify.failed",
                    request_id = %request.id.0,
                    error = %error,
                    "notification delivery failed"
                );
                SideEffectStatus::Failed(error.to_string())
            }
        }
    }
}

/// Template context for a request, items expanded with per-line subtotals.
pub fn request_context(request: &MaintenanceRequest) -> serde_json::Value {
    let items: Vec<serde_json::Value> = request
        .items
        .0
        .iter()
        .map(|item| {
            serde_json::json!({
                "device": item.device,
                "brand": item.brand.as_deref().unwrap_or("-"),
                "size": item.size.as_deref().unwrap_or("-"),
                "quantity": item.quantity,
                "price": item.price.to_string(),
                "subtotal": item.subtotal().to_string(),
            })
        })
        .collect();

    serde_json::json!({
        "id": request.id.0,
        "branch": request.branch,
        "title": request.title,
        "lab_name": request.lab_name,
        "description": request.description,
        "status": format!("{:?}", request.status),
        "admin_remark": request.admin_remark,
        "total_amount": request.total_amount.to_string(),
        "submitted_at": request.submitted_at.to_rfc3339(),
        "items": items,
    })
}

fn plain_submission_summary(request: &MaintenanceRequest, hod: &UserAccount) -> String {
    format!(
        "A new maintenance request was submitted.\n\n\
         Title: {}\nBranch: {}\nLab: {}\nSubmitted by: {}\nTotal Amount: {}",
        request.title, request.branch, request.lab_name, hod.username, request.total_amount,
    )
}
