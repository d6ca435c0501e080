use std::env;
use std::sync::{Mutex, OnceLock};

use serde_json::Value;
use upkeep_cli::commands::{config, doctor, migrate, seed};

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(
        &[("UPKEEP_DATABASE_URL", "sqlite::memory:"), ("UPKEEP_DATABASE_MAX_CONNECTIONS", "1")],
        || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_with_invalid_database_url() {
    with_env(&[("UPKEEP_DATABASE_URL", "postgres://not-sqlite")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_loads_and_verifies_the_demo_dataset() {
    with_env(
        &[("UPKEEP_DATABASE_URL", "sqlite::memory:"), ("UPKEEP_DATABASE_MAX_CONNECTIONS", "1")],
        || {
        let result = seed::run();
        assert_eq!(result.exit_code, 0, "expected deterministic seed success");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "seed");
        assert_eq!(payload["status"], "ok");

        let message = payload["message"].as_str().unwrap_or("");
        assert!(message.contains("3 accounts"));
        assert!(message.contains("2 requests"));
    });
}

#[test]
fn config_redacts_the_smtp_password() {
    with_env(
        &[
            ("UPKEEP_DATABASE_URL", "sqlite::memory:"),
            ("UPKEEP_MAIL_USERNAME", "upkeep"),
            ("UPKEEP_MAIL_PASSWORD", "super-secret-value"),
        ],
        || {
            let output = config::run();
            assert!(!output.contains("super-secret-value"), "password must be redacted");
            assert!(output.contains("[redacted]"));

            let payload = parse_payload(&output);
            assert_eq!(payload["database"]["url"], "sqlite::memory:");
        },
    );
}

#[test]
fn doctor_reports_ok_with_valid_env() {
    with_env(
        &[("UPKEEP_DATABASE_URL", "sqlite::memory:"), ("UPKEEP_DATABASE_MAX_CONNECTIONS", "1")],
        || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, 0, "expected healthy doctor report");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "doctor");
        assert_eq!(payload["status"], "ok");
        let checks = payload["checks"].as_array().expect("checks array");
        assert!(checks.iter().any(|check| check["name"] == "database"));
    });
}

#[test]
fn doctor_reports_failure_when_config_is_invalid() {
    with_env(&[("UPKEEP_MAIL_ENABLED", "true")], || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, 1, "expected doctor failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "UPKEEP_DATABASE_URL",
        "UPKEEP_DATABASE_MAX_CONNECTIONS",
        "UPKEEP_DATABASE_TIMEOUT_SECS",
        "UPKEEP_SERVER_BIND_ADDRESS",
        "UPKEEP_SERVER_PORT",
        "UPKEEP_SERVER_PUBLIC_BASE_URL",
        "UPKEEP_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "UPKEEP_MAIL_ENABLED",
        "UPKEEP_MAIL_SMTP_HOST",
        "UPKEEP_MAIL_SMTP_PORT",
        "UPKEEP_MAIL_FROM_ADDRESS",
        "UPKEEP_MAIL_USERNAME",
        "UPKEEP_MAIL_PASSWORD",
        "UPKEEP_LOGGING_LEVEL",
        "UPKEEP_LOGGING_FORMAT",
        "UPKEEP_LOG_LEVEL",
        "UPKEEP_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, previous) in previous_values {
        match previous {
            Some(value) => env::set_var(key, value),
            None => env::remove_var(key),
        }
    }
}
