use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use upkeep_core::config::{AppConfig, ConfigError, LoadOptions};
use upkeep_core::render::LetterRenderer;
use upkeep_db::{connect_with_settings, migrations, DbPool};

use crate::letters::LetterEngine;
use crate::mail::SmtpNotifier;
use crate::workflow::WorkflowService;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub workflow: Arc<WorkflowService>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let notifier = Arc::new(SmtpNotifier::new(config.mail.clone()));
    let renderer: Arc<dyn LetterRenderer> = match LetterEngine::new("templates/letters") {
        Ok(engine) => {
            info!(
                event_name = "system.bootstrap.templates_loaded",
                correlation_id = "bootstrap",
                "letter templates loaded from filesystem"
            );
            Arc::new(engine)
        }
        Err(error) => {
            warn!(
                event_name = "system.bootstrap.templates_fallback",
                correlation_id = "bootstrap",
                error = %error,
                "falling back to embedded letter templates"
            );
            Arc::new(LetterEngine::with_embedded_templates())
        }
    };

    let workflow = Arc::new(WorkflowService::new(
        db_pool.clone(),
        notifier,
        renderer,
        config.server.public_base_url.clone(),
    ));

    Ok(Application { config, db_pool, workflow })
}

#[cfg(test)]
mod tests {
    use upkeep_core::config::{ConfigOverrides, LoadOptions};
    use upkeep_core::domain::account::{Role, UserAccount, UserId};
    use upkeep_db::repositories::{AccountRepository, SqlAccountRepository};

    use crate::bootstrap::bootstrap;
    use crate::workflow::NewRequest;

    fn valid_overrides(database_url: &str) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_on_an_invalid_database_url() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("postgres://nope".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        assert!(result.is_err());
        let message = result.err().expect("error").to_string();
        assert!(message.contains("database.url"));
    }

    #[tokio::test]
    async fn integration_smoke_covers_startup_and_the_request_path() {
        let app = bootstrap(valid_overrides("sqlite::memory:?cache=shared"))
            .await
            .expect("bootstrap should succeed with valid overrides");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('user_account', 'maintenance_request', \
                                               'quotation_batch', 'quotation_response', \
                                               'quotation_item')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("expected foundation tables to be available after bootstrap");
        assert_eq!(table_count, 5, "bootstrap should expose the baseline workflow tables");

        let accounts = SqlAccountRepository::new(app.db_pool.clone());
        accounts
            .save(UserAccount {
                id: UserId("hod-smoke".to_string()),
                username: "hod-smoke".to_string(),
                email: None,
                role: Role::Hod,
                branch: Some("Electronics".to_string()),
            })
            .await
            .expect("seed account");
        accounts
            .save(UserAccount {
                id: UserId("admin-smoke".to_string()),
                username: "admin-smoke".to_string(),
                email: None,
                role: Role::Admin,
                branch: None,
            })
            .await
            .expect("seed admin");

        let submitted = app
            .workflow
            .submit_request(
                &UserId("hod-smoke".to_string()),
                NewRequest {
                    branch: None,
                    title: "Smoke".to_string(),
                    lab_name: "Lab".to_string(),
                    description: String::new(),
                    selected_items: "[]".to_string(),
                    total_amount: None,
                },
            )
            .await
            .expect("submit through the bootstrapped workflow");
        let approved = app
            .workflow
            .approve_request(&UserId("admin-smoke".to_string()), &submitted.request.id, None)
            .await
            .expect("approve through the bootstrapped workflow");
        assert_eq!(approved.request.admin_remark.as_deref(), Some("Approved by admin"));

        app.db_pool.close().await;
    }
}
