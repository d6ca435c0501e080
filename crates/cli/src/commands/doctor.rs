use serde::Serialize;

use crate::commands::CommandResult;
use upkeep_core::config::{AppConfig, LoadOptions};
use upkeep_db::{connect_with_settings, migrations};

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: &'static str,
    detail: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    command: &'static str,
    status: &'static str,
    checks: Vec<DoctorCheck>,
}

pub fn run(json: bool) -> CommandResult {
    let mut checks = Vec::new();

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config",
                status: "ok",
                detail: "configuration loaded and validated".to_string(),
            });
            Some(config)
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config",
                status: "failed",
                detail: error.to_string(),
            });
            None
        }
    };

    if let Some(config) = &config {
        checks.push(DoctorCheck {
            name: "mail",
            status: "ok",
            detail: if config.mail.enabled {
                format!(
                    "smtp relay configured at {}",
                    config.mail.smtp_host.as_deref().unwrap_or("<missing>")
                )
            } else {
                "mail disabled, notifications will be dropped".to_string()
            },
        });

        match tokio::runtime::Builder::new_current_thread().enable_all().build() {
            Ok(runtime) => {
                let database_check = runtime.block_on(async {
                    let pool = connect_with_settings(
                        &config.database.url,
                        config.database.max_connections,
                        config.database.timeout_secs,
                    )
                    .await
                    .map_err(|error| error.to_string())?;
                    migrations::run_pending(&pool)
                        .await
                        .map_err(|error| error.to_string())?;
                    pool.close().await;
                    Ok::<(), String>(())
                });

                checks.push(match database_check {
                    Ok(()) => DoctorCheck {
                        name: "database",
                        status: "ok",
                        detail: "connected and migrations applied".to_string(),
                    },
                    Err(detail) => DoctorCheck { name: "database", status: "failed", detail },
                });
            }
            Err(error) => {
                checks.push(DoctorCheck {
                    name: "database",
                    status: "failed",
                    detail: format!("failed to initialize async runtime: {error}"),
                });
            }
        }
    }

    let healthy = checks.iter().all(|check| check.status == "ok");
    let report = DoctorReport {
        command: "doctor",
        status: if healthy { "ok" } else { "error" },
        checks,
    };

    let output = if json {
        serde_json::to_string(&report).unwrap_or_else(|error| error.to_string())
    } else {
        let mut lines = vec![format!("doctor: {}", report.status)];
        for check in &report.checks {
            lines.push(format!("  [{}] {} - {}", check.status, check.name, check.detail));
        }
        lines.join("\n")
    };

    CommandResult { exit_code: if healthy { 0 } else { 1 }, output }
}
