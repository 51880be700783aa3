use crate::commands::CommandResult;
use claimflow_core::config::{AppConfig, LoadOptions};
use claimflow_db::repositories::{ClaimRepository, SqlClaimRepository};
use claimflow_db::{connect_with_settings, migrations};

/// Startup preflight: proves the configuration, database, and schema are
/// ready before an operator launches the server proper.
pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "start",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "start",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let claims = SqlClaimRepository::new(pool.clone())
            .count()
            .await
            .map_err(|error| ("readiness", error.to_string(), 6u8))?;

        pool.close().await;
        Ok::<i64, (&'static str, String, u8)>(claims)
    });

    match result {
        Ok(claims) => CommandResult::success_with_details(
            "start",
            format!(
                "startup preflight passed: database `{}` is ready with {claims} claims on record",
                config.database.url
            ),
            serde_json::json!({ "claims_on_record": claims }),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("start", error_class, message, exit_code)
        }
    }
}
