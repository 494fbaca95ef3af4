use std::env;
use std::sync::{Mutex, OnceLock};

use charterdesk_cli::commands::{config, doctor, migrate, seed};
use serde_json::Value;

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(
        &[
            ("CHARTERDESK_DATABASE_URL", "sqlite::memory:"),
            ("CHARTERDESK_DATABASE_MAX_CONNECTIONS", "1"),
        ],
        || {
            let result = migrate::run();
            assert_eq!(result.exit_code, 0, "expected successful migrate run");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "migrate");
            assert_eq!(payload["status"], "ok");
        },
    );
}

#[test]
fn migrate_returns_config_failure_with_an_invalid_currency() {
    with_env(&[("CHARTERDESK_BUSINESS_CURRENCY", "pesos")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_returns_success_with_valid_env() {
    with_env(
        &[
            ("CHARTERDESK_DATABASE_URL", "sqlite::memory:"),
            ("CHARTERDESK_DATABASE_MAX_CONNECTIONS", "1"),
        ],
        || {
            let result = seed::run();
            assert_eq!(result.exit_code, 0, "expected successful seed run");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "seed");
            assert_eq!(payload["status"], "ok");
        },
    );
}

#[test]
fn seed_reports_each_demo_quote() {
    with_env(
        &[
            ("CHARTERDESK_DATABASE_URL", "sqlite::memory:"),
            ("CHARTERDESK_DATABASE_MAX_CONNECTIONS", "1"),
        ],
        || {
            let result = seed::run();
            assert_eq!(result.exit_code, 0, "expected successful seed run");

            let payload = parse_payload(&result.output);
            let message = payload["message"].as_str().unwrap_or("");
            assert!(message
                .contains("  - QR-12AB34CD: pending (Day trip to Tagaytay awaiting a price)"));
            assert!(message
                .contains("  - QR-23BC45DE: quoted (Three-day Baguio charter, priced and emailed)"));
            assert!(message.contains(
                "  - QR-34CD56EF: approved (Approved Vigan charter with a confirmed booking)"
            ));
            assert!(message.contains("  - QR-45DE67F0: rejected (Rejected Moalboal request)"));
        },
    );
}

#[test]
fn seed_runs_produce_identical_summaries() {
    with_env(
        &[
            ("CHARTERDESK_DATABASE_URL", "sqlite::memory:"),
            ("CHARTERDESK_DATABASE_MAX_CONNECTIONS", "1"),
        ],
        || {
            let first = seed::run();
            assert_eq!(first.exit_code, 0, "expected first seed invocation success");
            let first_payload = parse_payload(&first.output);
            assert_eq!(first_payload["status"], "ok");

            let second = seed::run();
            assert_eq!(second.exit_code, 0, "expected second seed invocation success");
            let second_payload = parse_payload(&second.output);
            assert_eq!(second_payload["status"], "ok");

            assert_eq!(first_payload["message"], second_payload["message"]);
        },
    );
}

#[test]
fn config_reports_sources_and_redacts_the_password() {
    with_env(
        &[
            ("CHARTERDESK_DATABASE_URL", "sqlite::memory:"),
            ("CHARTERDESK_SMTP_USERNAME", "charterdesk-ops"),
            ("CHARTERDESK_SMTP_PASSWORD", "relay-secret"),
        ],
        || {
            let output = config::run();

            assert!(output
                .contains("- database.url = sqlite::memory: (source: env (CHARTERDESK_DATABASE_URL))"));
            assert!(output.contains(
                "- smtp.password = <redacted> (source: env (CHARTERDESK_SMTP_PASSWORD))"
            ));
            assert!(output.contains("- business.currency = PHP (source: default)"));
            assert!(!output.contains("relay-secret"), "the smtp password must never be printed");
        },
    );
}

#[test]
fn doctor_json_skips_downstream_checks_when_config_is_invalid() {
    with_env(&[("CHARTERDESK_BUSINESS_CURRENCY", "pesos")], || {
        let report: Value = serde_json::from_str(&doctor::run(true))
            .expect("doctor --json should emit valid JSON");

        assert_eq!(report["overall_status"], "fail");
        let checks = report["checks"].as_array().expect("checks array");
        assert_eq!(checks.len(), 3);
        assert_eq!(checks[0]["name"], "config_validation");
        assert_eq!(checks[0]["status"], "fail");
        assert_eq!(checks[1]["name"], "mail_transport");
        assert_eq!(checks[1]["status"], "skipped");
        assert_eq!(checks[2]["name"], "database_connectivity");
        assert_eq!(checks[2]["status"], "skipped");
    });
}

#[test]
fn doctor_human_output_lists_every_check() {
    with_env(&[("CHARTERDESK_DATABASE_URL", "sqlite::memory:")], || {
        let output = doctor::run(false);

        assert!(output.starts_with("doctor:"), "summary should lead the report: {output}");
        assert!(output.contains("- [ok] config_validation: configuration loaded and validated"));
        assert!(output.contains("mail_transport"));
        assert!(output.contains("- [ok] database_connectivity: connected using `sqlite::memory:`"));
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
        "CHARTERDESK_DATABASE_URL",
        "CHARTERDESK_DATABASE_MAX_CONNECTIONS",
        "CHARTERDESK_DATABASE_TIMEOUT_SECS",
        "CHARTERDESK_SMTP_HOST",
        "CHARTERDESK_SMTP_PORT",
        "CHARTERDESK_SMTP_USERNAME",
        "CHARTERDESK_SMTP_PASSWORD",
        "CHARTERDESK_SMTP_FROM_ADDRESS",
        "CHARTERDESK_SMTP_FROM_NAME",
        "CHARTERDESK_SMTP_TIMEOUT_SECS",
        "CHARTERDESK_SMTP_IMPLICIT_TLS",
        "CHARTERDESK_BUSINESS_COMPANY_NAME",
        "CHARTERDESK_BUSINESS_CURRENCY",
        "CHARTERDESK_BUSINESS_LOCALE",
        "CHARTERDESK_BUSINESS_REPLY_TO",
        "CHARTERDESK_SERVER_BIND_ADDRESS",
        "CHARTERDESK_SERVER_PORT",
        "CHARTERDESK_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "CHARTERDESK_LOGGING_LEVEL",
        "CHARTERDESK_LOGGING_FORMAT",
        "CHARTERDESK_LOG_LEVEL",
        "CHARTERDESK_LOG_FORMAT",
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

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
