use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use charterdesk_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(render_line(
        "database.url",
        &config.database.url,
        source("database.url", &["CHARTERDESK_DATABASE_URL"]),
    ));
    lines.push(render_line(
        "database.max_connections",
        &config.database.max_connections.to_string(),
        source("database.max_connections", &["CHARTERDESK_DATABASE_MAX_CONNECTIONS"]),
    ));
    lines.push(render_line(
        "database.timeout_secs",
        &config.database.timeout_secs.to_string(),
        source("database.timeout_secs", &["CHARTERDESK_DATABASE_TIMEOUT_SECS"]),
    ));

    lines.push(render_line(
        "smtp.host",
        &config.smtp.host,
        source("smtp.host", &["CHARTERDESK_SMTP_HOST"]),
    ));
    lines.push(render_line(
        "smtp.port",
        &config.smtp.port.to_string(),
        source("smtp.port", &["CHARTERDESK_SMTP_PORT"]),
    ));
    lines.push(render_line(
        "smtp.username",
        config.smtp.username.as_deref().unwrap_or("<unset>"),
        source("smtp.username", &["CHARTERDESK_SMTP_USERNAME"]),
    ));
    let smtp_password = if config.smtp.password.is_some() { "<redacted>" } else { "<unset>" };
    lines.push(render_line(
        "smtp.password",
        smtp_password,
        source("smtp.password", &["CHARTERDESK_SMTP_PASSWORD"]),
    ));
    lines.push(render_line(
        "smtp.from_address",
        &config.smtp.from_address,
        source("smtp.from_address", &["CHARTERDESK_SMTP_FROM_ADDRESS"]),
    ));
    lines.push(render_line(
        "smtp.from_name",
        &config.smtp.from_name,
        source("smtp.from_name", &["CHARTERDESK_SMTP_FROM_NAME"]),
    ));
    lines.push(render_line(
        "smtp.timeout_secs",
        &config.smtp.timeout_secs.to_string(),
        source("smtp.timeout_secs", &["CHARTERDESK_SMTP_TIMEOUT_SECS"]),
    ));
    lines.push(render_line(
        "smtp.implicit_tls",
        &config.smtp.implicit_tls.to_string(),
        source("smtp.implicit_tls", &["CHARTERDESK_SMTP_IMPLICIT_TLS"]),
    ));

    lines.push(render_line(
        "business.company_name",
        &config.business.company_name,
        source("business.company_name", &["CHARTERDESK_BUSINESS_COMPANY_NAME"]),
    ));
    lines.push(render_line(
        "business.currency",
        &config.business.currency,
        source("business.currency", &["CHARTERDESK_BUSINESS_CURRENCY"]),
    ));
    lines.push(render_line(
        "business.locale",
        &config.business.locale,
        source("business.locale", &["CHARTERDESK_BUSINESS_LOCALE"]),
    ));
    lines.push(render_line(
        "business.reply_to",
        config.business.reply_to.as_deref().unwrap_or("<unset>"),
        source("business.reply_to", &["CHARTERDESK_BUSINESS_REPLY_TO"]),
    ));

    lines.push(render_line(
        "server.bind_address",
        &config.server.bind_address,
        source("server.bind_address", &["CHARTERDESK_SERVER_BIND_ADDRESS"]),
    ));
    lines.push(render_line(
        "server.port",
        &config.server.port.to_string(),
        source("server.port", &["CHARTERDESK_SERVER_PORT"]),
    ));
    lines.push(render_line(
        "server.graceful_shutdown_secs",
        &config.server.graceful_shutdown_secs.to_string(),
        source("server.graceful_shutdown_secs", &["CHARTERDESK_SERVER_GRACEFUL_SHUTDOWN_SECS"]),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        source("logging.level", &["CHARTERDESK_LOGGING_LEVEL", "CHARTERDESK_LOG_LEVEL"]),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        source("logging.format", &["CHARTERDESK_LOGGING_FORMAT", "CHARTERDESK_LOG_FORMAT"]),
    ));

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("charterdesk.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/charterdesk.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    for env_key in env_keys {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
