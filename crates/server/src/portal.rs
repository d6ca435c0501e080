//! Vendor-facing quotation portal.
//!
//! Endpoints:
//! - `GET  /quotation/fill/{token}` — render the fill form with the batch's line items
//! - `POST /quotation/fill/{token}` — submit a priced quotation (form-encoded)
//!
//! The token is the only credential: whoever holds the link can view the
//! batch and submit quotations. Unknown tokens are a plain 404.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Form, Path, State},
    http::StatusCode,
    response::Html,
    routing::get,
    Router,
};
use tera::{Context, Tera};
use tracing::warn;

use upkeep_core::errors::{ApplicationError, DomainError};

use crate::workflow::{BatchLineItem, VendorSubmission, WorkflowService};

#[derive(Clone)]
pub struct PortalState {
    workflow: Arc<WorkflowService>,
    templates: Arc<Tera>,
}

/// Initialize the tera engine with the portal templates.
fn init_templates() -> Arc<Tera> {
    let mut tera = match Tera::new("templates/portal/**/*") {
        Ok(t) => t,
        Err(e) => {
            warn!(error = %e, "Failed to load portal templates from filesystem, using empty Tera instance");
            Tera::default()
        }
    };

    // Embedded fallback in case filesystem templates are not available.
    tera.add_raw_template(
        "quotation_fill.html",
        include_str!("../../../templates/portal/quotation_fill.html"),
    )
    .ok();

    Arc::new(tera)
}

pub fn router(workflow: Arc<WorkflowService>) -> Router {
    Router::new()
        .route("/quotation/fill/{token}", get(quotation_fill_page).post(quotation_fill_submit))
        .with_state(PortalState { workflow, templates: init_templates() })
}

fn render_fill_page(
    templates: &Tera,
    batch_id: &str,
    items: &[BatchLineItem],
    message: Option<(&str, &str)>,
) -> Result<Html<String>, (StatusCode, Html<String>)> {
    let items: Vec<serde_json::Value> = items
        .iter()
        .map(|item| {
            serde_json::json!({
                "request_title": item.request_title,
                "device": item.device,
                "brand": item.brand.as_deref().unwrap_or("-"),
                "size": item.size.as_deref().unwrap_or("-"),
                "quantity": item.quantity,
                "price_key": item.price_key(),
            })
        })
        .collect();

    let mut context = Context::new();
    context.insert("batch_id", batch_id);
    context.insert("items", &items);
    let (message, message_kind) = message.unwrap_or(("", ""));
    context.insert("message", message);
    context.insert("message_kind", message_kind);

    let html = templates.render("quotation_fill.html", &context).map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(format!("<h1>Template Error</h1><pre>{:?}</pre>", e)),
        )
    })?;

    Ok(Html(html))
}

fn portal_error(error: ApplicationError) -> (StatusCode, Html<String>) {
    match error {
        ApplicationError::NotFound { .. } => {
            (StatusCode::NOT_FOUND, Html("<h1>Quotation batch not found</h1>".to_string()))
        }
        other => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(format!("<h1>Error</h1><p>{other}</p>")),
        ),
    }
}

async fn quotation_fill_page(
    Path(token): Path<String>,
    State(state): State<PortalState>,
) -> Result<Html<String>, (StatusCode, Html<String>)> {
    let (batch, items) =
        state.workflow.fetch_batch_items(&token).await.map_err(portal_error)?;

    render_fill_page(&state.templates, &batch.id.0, &items, None)
}

async fn quotation_fill_submit(
    Path(token): Path<String>,
    State(state): State<PortalState>,
    Form(mut form): Form<HashMap<String, String>>,
) -> Result<Html<String>, (StatusCode, Html<String>)> {
    let company_name = form.remove("company_name").unwrap_or_default();
    let email = form.remove("email").unwrap_or_default();

    let submission = VendorSubmission { company_name, email, prices: form };
    match state.workflow.submit_response(&token, submission).await {
        Ok(_) => {
            let (batch, items) =
                state.workflow.fetch_batch_items(&token).await.map_err(portal_error)?;
            render_fill_page(
                &state.templates,
                &batch.id.0,
                &items,
                Some(("Your quotation has been submitted successfully!", "success")),
            )
        }
        Err(ApplicationError::Domain(DomainError::MissingField { .. })) => {
            let (batch, items) =
                state.workflow.fetch_batch_items(&token).await.map_err(portal_error)?;
            let page = render_fill_page(
                &state.templates,
                &batch.id.0,
                &items,
                Some(("Company name and email are required.", "error")),
            )?;
            Err((StatusCode::BAD_REQUEST, page))
        }
        Err(error) => Err(portal_error(error)),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use axum::extract::{Form, Path, State};
    use axum::http::StatusCode;

    use upkeep_core::domain::account::{Role, UserAccount, UserId};
    use upkeep_core::notify::InMemoryNotifier;
    use upkeep_core::render::PlainTextRenderer;
    use upkeep_db::repositories::{AccountRepository, SqlAccountRepository};
    use upkeep_db::{connect_with_settings, migrations};

    use crate::workflow::{NewRequest, WorkflowService};

    use super::{init_templates, quotation_fill_page, quotation_fill_submit, PortalState};

    async fn setup() -> (PortalState, String, sqlx::SqlitePool) {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        let accounts = SqlAccountRepository::new(pool.clone());
        accounts
            .save(UserAccount {
                id: UserId("principal".to_string()),
                username: "principal".to_string(),
                email: None,
                role: Role::Admin,
                branch: None,
            })
            .await
            .expect("seed principal");
        accounts
            .save(UserAccount {
                id: UserId("hod-electronics".to_string()),
                username: "hod-electronics".to_string(),
                email: None,
                role: Role::Hod,
                branch: Some("Electronics".to_string()),
            })
            .await
            .expect("seed hod");

        let workflow = Arc::new(WorkflowService::new(
            pool.clone(),
            Arc::new(InMemoryNotifier::default()),
            Arc::new(PlainTextRenderer),
            None,
        ));

        let hod = UserId("hod-electronics".to_string());
        let admin = UserId("principal".to_string());
        let submitted = workflow
            .submit_request(
                &hod,
                NewRequest {
                    branch: None,
                    title: "Lab 2 PC repairs".to_string(),
                    lab_name: "Lab 2".to_string(),
                    description: String::new(),
                    selected_items: r#"[
                        {"device":"SSD","brand":"Any","size":"256GB","quantity":1,"price":1750},
                        {"device":"RAM","brand":"Any","size":"8GB ddr3","quantity":1,"price":1600}
                    ]"#
                    .to_string(),
                    total_amount: Some("3350".to_string()),
                },
            )
            .await
            .expect("submit");
        workflow.approve_request(&admin, &submitted.request.id, None).await.expect("approve");
        let batch = workflow
            .create_batch(&admin, vec![submitted.request.id.0.clone()])
            .await
            .expect("batch");

        let state = PortalState { workflow, templates: init_templates() };
        (state, batch.batch.token.0, pool)
    }

    fn vendor_form(prices: &[(&str, &str)]) -> HashMap<String, String> {
        let mut form = HashMap::new();
        form.insert("company_name".to_string(), "Souza Traders".to_string());
        form.insert("email".to_string(), "sales@souza.example".to_string());
        for (key, value) in prices {
            form.insert(key.to_string(), value.to_string());
        }
        form
    }

    #[tokio::test]
    async fn fill_page_lists_every_line_item() {
        let (state, token, _pool) = setup().await;

        let page = quotation_fill_page(Path(token), State(state)).await.expect("page");
        assert!(page.0.contains("SSD"));
        assert!(page.0.contains("RAM"));
        assert!(page.0.contains("company_name"));
    }

    #[tokio::test]
    async fn unknown_token_is_not_found() {
        let (state, _token, _pool) = setup().await;

        let result =
            quotation_fill_page(Path("no-such-token".to_string()), State(state)).await;
        let (status, _) = result.expect_err("unknown token");
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn submitting_prices_persists_a_response_with_the_computed_total() {
        let (state, token, pool) = setup().await;

        let (_, items) =
            state.workflow.fetch_batch_items(&token).await.expect("items");
        let keys: Vec<String> = items.iter().map(|item| item.price_key()).collect();
        let form = vendor_form(&[(keys[0].as_str(), "100"), (keys[1].as_str(), "200")]);

        let page = quotation_fill_submit(Path(token), State(state), Form(form))
            .await
            .expect("submit");
        assert!(page.0.contains("submitted successfully"));

        let total: String =
            sqlx::query_scalar("SELECT total_amount FROM quotation_response LIMIT 1")
                .fetch_one(&pool)
                .await
                .expect("total");
        assert_eq!(total, "300");
    }

    #[tokio::test]
    async fn missing_company_name_is_rejected_with_the_form_intact() {
        let (state, token, pool) = setup().await;

        let mut form = vendor_form(&[]);
        form.insert("company_name".to_string(), "   ".to_string());

        let result = quotation_fill_submit(Path(token), State(state), Form(form)).await;
        let (status, page) = result.expect_err("missing company");
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(page.0.contains("Company name and email are required."));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quotation_response")
            .fetch_one(&pool)
            .await
            .expect("count");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn vendors_may_resubmit_under_the_same_token() {
        let (state, token, pool) = setup().await;

        let form = vendor_form(&[]);
        quotation_fill_submit(Path(token.clone()), State(state.clone()), Form(form.clone()))
            .await
            .expect("first submit");
        quotation_fill_submit(Path(token), State(state), Form(form))
            .await
            .expect("second submit");

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quotation_response")
            .fetch_one(&pool)
            .await
            .expect("count");
        assert_eq!(count, 2);
    }
}
