use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub smtp: SmtpConfig,
    pub business: BusinessConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub from_address: String,
    pub from_name: String,
    pub timeout_secs: u64,
    pub implicit_tls: bool,
}

#[derive(Clone, Debug)]
pub struct BusinessConfig {
    pub company_name: String,
    pub currency: String,
    pub locale: String,
    pub reply_to: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub smtp_host: Option<String>,
    pub smtp_password: Option<String>,
    pub currency: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://charterdesk.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            smtp: SmtpConfig {
                host: "localhost".to_string(),
                port: 587,
                username: None,
                password: None,
                from_address: "bookings@charterdesk.local".to_string(),
                from_name: "Charterdesk Bookings".to_string(),
                timeout_secs: 20,
                implicit_tls: false,
            },
            business: BusinessConfig {
                company_name: "Charterdesk".to_string(),
                currency: "PHP".to_string(),
                locale: "en-PH".to_string(),
                reply_to: None,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("charterdesk.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(smtp) = patch.smtp {
            if let Some(host) = smtp.host {
                self.smtp.host = host;
            }
            if let Some(port) = smtp.port {
                self.smtp.port = port;
            }
            if let Some(username) = smtp.username {
                self.smtp.username = Some(username);
            }
            if let Some(password) = smtp.password {
                self.smtp.password = Some(secret_value(password));
            }
            if let Some(from_address) = smtp.from_address {
                self.smtp.from_address = from_address;
            }
            if let Some(from_name) = smtp.from_name {
                self.smtp.from_name = from_name;
            }
            if let Some(timeout_secs) = smtp.timeout_secs {
                self.smtp.timeout_secs = timeout_secs;
            }
            if let Some(implicit_tls) = smtp.implicit_tls {
                self.smtp.implicit_tls = implicit_tls;
            }
        }

        if let Some(business) = patch.business {
            if let Some(company_name) = business.company_name {
                self.business.company_name = company_name;
            }
            if let Some(currency) = business.currency {
                self.business.currency = currency;
            }
            if let Some(locale) = business.locale {
                self.business.locale = locale;
            }
            if let Some(reply_to) = business.reply_to {
                self.business.reply_to = Some(reply_to);
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("CHARTERDESK_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("CHARTERDESK_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("CHARTERDESK_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("CHARTERDESK_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("CHARTERDESK_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("CHARTERDESK_SMTP_HOST") {
            self.smtp.host = value;
        }
        if let Some(value) = read_env("CHARTERDESK_SMTP_PORT") {
            self.smtp.port = parse_u16("CHARTERDESK_SMTP_PORT", &value)?;
        }
        if let Some(value) = read_env("CHARTERDESK_SMTP_USERNAME") {
            self.smtp.username = Some(value);
        }
        if let Some(value) = read_env("CHARTERDESK_SMTP_PASSWORD") {
            self.smtp.password = Some(secret_value(value));
        }
        if let Some(value) = read_env("CHARTERDESK_SMTP_FROM_ADDRESS") {
            self.smtp.from_address = value;
        }
        if let Some(value) = read_env("CHARTERDESK_SMTP_FROM_NAME") {
            self.smtp.from_name = value;
        }
        if let Some(value) = read_env("CHARTERDESK_SMTP_TIMEOUT_SECS") {
            self.smtp.timeout_secs = parse_u64("CHARTERDESK_SMTP_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("CHARTERDESK_SMTP_IMPLICIT_TLS") {
            self.smtp.implicit_tls = parse_bool("CHARTERDESK_SMTP_IMPLICIT_TLS", &value)?;
        }

        if let Some(value) = read_env("CHARTERDESK_BUSINESS_COMPANY_NAME") {
            self.business.company_name = value;
        }
        if let Some(value) = read_env("CHARTERDESK_BUSINESS_CURRENCY") {
            self.business.currency = value;
        }
        if let Some(value) = read_env("CHARTERDESK_BUSINESS_LOCALE") {
            self.business.locale = value;
        }
        if let Some(value) = read_env("CHARTERDESK_BUSINESS_REPLY_TO") {
            self.business.reply_to = Some(value);
        }

        if let Some(value) = read_env("CHARTERDESK_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("CHARTERDESK_SERVER_PORT") {
            self.server.port = parse_u16("CHARTERDESK_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("CHARTERDESK_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("CHARTERDESK_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("CHARTERDESK_LOGGING_LEVEL").or_else(|| read_env("CHARTERDESK_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("CHARTERDESK_LOGGING_FORMAT").or_else(|| read_env("CHARTERDESK_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(smtp_host) = overrides.smtp_host {
            self.smtp.host = smtp_host;
        }
        if let Some(smtp_password) = overrides.smtp_password {
            self.smtp.password = Some(secret_value(smtp_password));
        }
        if let Some(currency) = overrides.currency {
            self.business.currency = currency;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_smtp(&self.smtp)?;
        validate_business(&self.business)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("charterdesk.toml"), PathBuf::from("config/charterdesk.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_smtp(smtp: &SmtpConfig) -> Result<(), ConfigError> {
    if smtp.host.trim().is_empty() {
        return Err(ConfigError::Validation("smtp.host must not be empty".to_string()));
    }
    if smtp.port == 0 {
        return Err(ConfigError::Validation("smtp.port must be greater than zero".to_string()));
    }
    if smtp.timeout_secs == 0 || smtp.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "smtp.timeout_secs must be in range 1..=300".to_string(),
        ));
    }
    if !smtp.from_address.contains('@') {
        return Err(ConfigError::Validation(
            "smtp.from_address must be a valid email address".to_string(),
        ));
    }
    if smtp.from_name.trim().is_empty() {
        return Err(ConfigError::Validation("smtp.from_name must not be empty".to_string()));
    }

    let has_username = smtp.username.as_ref().map(|value| !value.trim().is_empty()).unwrap_or(false);
    let has_password = smtp
        .password
        .as_ref()
        .map(|value| !value.expose_secret().trim().is_empty())
        .unwrap_or(false);
    if has_username != has_password {
        return Err(ConfigError::Validation(
            "smtp.username and smtp.password must be configured together".to_string(),
        ));
    }

    Ok(())
}

fn validate_business(business: &BusinessConfig) -> Result<(), ConfigError> {
    if business.company_name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "business.company_name must not be empty".to_string(),
        ));
    }

    let currency = business.currency.trim();
    let iso_like = currency.len() == 3 && currency.chars().all(|ch| ch.is_ascii_uppercase());
    if !iso_like {
        return Err(ConfigError::Validation(
            "business.currency must be a three-letter uppercase ISO 4217 code (e.g. PHP)"
                .to_string(),
        ));
    }

    if business.locale.trim().is_empty() {
        return Err(ConfigError::Validation("business.locale must not be empty".to_string()));
    }

    if let Some(reply_to) = &business.reply_to {
        if !reply_to.contains('@') {
            return Err(ConfigError::Validation(
                "business.reply_to must be a valid email address".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation(
            "server.port must be greater than zero".to_string(),
        ));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    smtp: Option<SmtpPatch>,
    business: Option<BusinessPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SmtpPatch {
    host: Option<String>,
    port: Option<u16>,
    username: Option<String>,
    password: Option<String>,
    from_address: Option<String>,
    from_name: Option<String>,
    timeout_secs: Option<u64>,
    implicit_tls: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct BusinessPatch {
    company_name: Option<String>,
    currency: Option<String>,
    locale: Option<String>,
    reply_to: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_validate_cleanly() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.business.currency == "PHP", "default currency should be PHP")?;
        ensure(config.smtp.port == 587, "default smtp port should be 587")?;
        ensure(
            matches!(config.logging.format, LogFormat::Compact),
            "default logging format should be compact",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_SMTP_PASSWORD", "relay-password");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("charterdesk.toml");
            fs::write(
                &path,
                r#"
[smtp]
host = "smtp.mailrelay.ph"
username = "charterdesk"
password = "${TEST_SMTP_PASSWORD}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.smtp.host == "smtp.mailrelay.ph", "smtp host should come from file")?;
            let password = config
                .smtp
                .password
                .as_ref()
                .ok_or_else(|| "smtp password should be set".to_string())?;
            ensure(
                password.expose_secret() == "relay-password",
                "smtp password should be interpolated from the environment",
            )
        })();

        clear_vars(&["TEST_SMTP_PASSWORD"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("CHARTERDESK_LOG_LEVEL", "warn");
        env::set_var("CHARTERDESK_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warn log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )
        })();

        clear_vars(&["CHARTERDESK_LOG_LEVEL", "CHARTERDESK_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("CHARTERDESK_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("CHARTERDESK_BUSINESS_CURRENCY", "USD");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("charterdesk.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[business]
currency = "EUR"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                config.business.currency == "USD",
                "env currency should win over file and defaults",
            )
        })();

        clear_vars(&["CHARTERDESK_DATABASE_URL", "CHARTERDESK_BUSINESS_CURRENCY"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("CHARTERDESK_BUSINESS_CURRENCY", "pesos");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("business.currency")
            );
            ensure(has_message, "validation failure should mention business.currency")
        })();

        clear_vars(&["CHARTERDESK_BUSINESS_CURRENCY"]);
        result
    }

    #[test]
    fn username_without_password_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("CHARTERDESK_SMTP_USERNAME", "charterdesk");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("configured together")
            );
            ensure(has_message, "validation failure should mention paired credentials")
        })();

        clear_vars(&["CHARTERDESK_SMTP_USERNAME"]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("CHARTERDESK_SMTP_USERNAME", "charterdesk");
        env::set_var("CHARTERDESK_SMTP_PASSWORD", "very-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(
                !debug.contains("very-secret-value"),
                "debug output should not contain the smtp password",
            )
        })();

        clear_vars(&["CHARTERDESK_SMTP_USERNAME", "CHARTERDESK_SMTP_PASSWORD"]);
        result
    }
}
