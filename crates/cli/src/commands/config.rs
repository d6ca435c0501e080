use secrecy::ExposeSecret;
use upkeep_core::config::{AppConfig, LoadOptions};

/// Render the effective configuration as pretty JSON with secrets redacted.
pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return serde_json::json!({
                "command": "config",
                "status": "error",
                "message": format!("configuration issue: {error}"),
            })
            .to_string();
        }
    };

    let password_state = match &config.mail.password {
        Some(secret) if !secret.expose_secret().is_empty() => "[redacted]",
        _ => "[unset]",
    };

    let payload = serde_json::json!({
        "database": {
            "url": config.database.url,
            "max_connections": config.database.max_connections,
            "timeout_secs": config.database.timeout_secs,
        },
        "server": {
            "bind_address": config.server.bind_address,
            "port": config.server.port,
            "public_base_url": config.server.public_base_url,
            "graceful_shutdown_secs": config.server.graceful_shutdown_secs,
        },
        "mail": {
            "enabled": config.mail.enabled,
            "smtp_host": config.mail.smtp_host,
            "smtp_port": config.mail.smtp_port,
            "from_address": config.mail.from_address,
            "username": config.mail.username,
            "password": password_state,
        },
        "logging": {
            "level": config.logging.level,
            "format": format!("{:?}", config.logging.format).to_lowercase(),
        },
    });

    serde_json::to_string_pretty(&payload).unwrap_or_else(|error| error.to_string())
}
