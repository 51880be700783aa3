use std::env;
use std::sync::{Mutex, OnceLock};

use claimflow_cli::commands::{config, doctor, migrate, seed, start};
use serde_json::Value;

#[test]
fn start_returns_success_with_valid_env() {
    with_env(&[("CLAIMFLOW_DATABASE_URL", "sqlite::memory:")], || {
        let result = start::run();
        assert_eq!(result.exit_code, 0, "expected successful start preflight");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "start");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["details"]["claims_on_record"], 0);
    });
}

#[test]
fn start_returns_config_failure_with_a_foreign_database_url() {
    with_env(&[("CLAIMFLOW_DATABASE_URL", "postgres://claims")], || {
        let result = start::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "start");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
        let message = payload["message"].as_str().unwrap_or("");
        assert!(message.contains("database.url"));
    });
}

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[("CLAIMFLOW_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["details"]["migrations_known"], 1);
    });
}

#[test]
fn migrate_returns_config_failure_with_a_foreign_database_url() {
    with_env(&[("CLAIMFLOW_DATABASE_URL", "postgres://claims")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_loads_and_verifies_the_lifecycle_dataset() {
    with_env(&[("CLAIMFLOW_DATABASE_URL", "sqlite::memory:")], || {
        let result = seed::run();
        assert_eq!(result.exit_code, 0, "expected deterministic seed success");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "seed");
        assert_eq!(payload["status"], "ok");

        let message = payload["message"].as_str().unwrap_or("");
        let pending_line = "  - pending: claim 9001 (Fresh submission awaiting the coordinator)";
        let paid_line = "  - paid: claim 9004 (Settled claim from the previous payment run)";
        let manager_rejection_line =
            "  - rejected_by_manager: claim 9006 (Vetted by the coordinator, then rejected by the manager)";
        assert!(message.contains(pending_line));
        assert!(message.contains(paid_line));
        assert!(message.contains(manager_rejection_line));

        let seeded = payload["details"]["claims_seeded"].as_array().expect("seeded claim list");
        assert_eq!(seeded.len(), 6);
    });
}

#[test]
fn seed_is_idempotent_across_runs_on_the_same_database() {
    let dir = tempfile::TempDir::new().expect("create temp dir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("claimflow.db").display());

    with_env(&[("CLAIMFLOW_DATABASE_URL", url.as_str())], || {
        let first = seed::run();
        assert_eq!(first.exit_code, 0, "expected first seed invocation success");
        let first_payload = parse_payload(&first.output);
        assert_eq!(first_payload["status"], "ok");

        let second = seed::run();
        assert_eq!(second.exit_code, 0, "expected second seed invocation success");
        let second_payload = parse_payload(&second.output);
        assert_eq!(second_payload["status"], "ok");

        assert_eq!(first_payload["message"], second_payload["message"]);
    });
}

#[test]
fn doctor_reports_pass_after_migrate_on_a_file_database() {
    let dir = tempfile::TempDir::new().expect("create temp dir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("claimflow.db").display());

    with_env(&[("CLAIMFLOW_DATABASE_URL", url.as_str())], || {
        let migrated = migrate::run();
        assert_eq!(migrated.exit_code, 0, "expected migrate to prepare the schema");

        let report = parse_payload(&doctor::run(true));
        assert_eq!(report["overall_status"], "pass");
        let checks = report["checks"].as_array().expect("doctor check list");
        assert_eq!(checks.len(), 3);
        assert!(checks.iter().all(|check| check["status"] == "pass"));

        let human = doctor::run(false);
        assert!(human.starts_with("doctor: all readiness checks passed"));
        assert!(human.contains("- [ok] schema_presence"));
    });
}

#[test]
fn doctor_flags_a_missing_schema() {
    with_env(&[("CLAIMFLOW_DATABASE_URL", "sqlite::memory:")], || {
        let report = parse_payload(&doctor::run(true));
        assert_eq!(report["overall_status"], "fail");

        let checks = report["checks"].as_array().expect("doctor check list");
        let check = |name: &str| {
            checks
                .iter()
                .find(|candidate| candidate["name"] == name)
                .unwrap_or_else(|| panic!("doctor report should include {name}"))
        };

        assert_eq!(check("database_connectivity")["status"], "pass");
        let schema = check("schema_presence");
        assert_eq!(schema["status"], "fail");
        let details = schema["details"].as_str().unwrap_or("");
        assert!(details.contains("claimflow migrate"));
    });
}

#[test]
fn doctor_skips_dependent_checks_when_config_is_invalid() {
    with_env(&[("CLAIMFLOW_DATABASE_URL", "postgres://claims")], || {
        let report = parse_payload(&doctor::run(true));
        assert_eq!(report["overall_status"], "fail");

        let checks = report["checks"].as_array().expect("doctor check list");
        assert_eq!(checks[0]["name"], "config_validation");
        assert_eq!(checks[0]["status"], "fail");
        assert_eq!(checks[1]["status"], "skipped");
        assert_eq!(checks[2]["status"], "skipped");
    });
}

#[test]
fn config_lists_every_field_with_its_source() {
    with_env(&[("CLAIMFLOW_DATABASE_URL", "sqlite::memory:")], || {
        let output = config::run();

        assert!(output.starts_with("effective config (source precedence: env > file > default):"));
        assert!(output.contains("- database.url = sqlite::memory: (source: env (CLAIMFLOW_DATABASE_URL))"));
        assert!(output.contains("- server.port = 8080 (source: default)"));
        assert!(output.contains("- uploads.dir = uploads (source: default)"));
        assert!(output.contains("- logging.format = compact (source: default)"));
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
        "CLAIMFLOW_DATABASE_URL",
        "CLAIMFLOW_DATABASE_MAX_CONNECTIONS",
        "CLAIMFLOW_DATABASE_TIMEOUT_SECS",
        "CLAIMFLOW_SERVER_BIND_ADDRESS",
        "CLAIMFLOW_SERVER_PORT",
        "CLAIMFLOW_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "CLAIMFLOW_UPLOADS_DIR",
        "CLAIMFLOW_LOGGING_LEVEL",
        "CLAIMFLOW_LOGGING_FORMAT",
        "CLAIMFLOW_LOG_LEVEL",
        "CLAIMFLOW_LOG_FORMAT",
        "CLAIMFLOW_CONFIG",
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
