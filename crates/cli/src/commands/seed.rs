use crate::commands::CommandResult;
use claimflow_core::config::{AppConfig, LoadOptions};
use claimflow_db::{connect_with_settings, migrations, SeedDataset, SeedResult};

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "seed",
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
                "seed",
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

        let seed_result = SeedDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        let verification = SeedDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        let run_result: Result<SeedResult, (&'static str, String, u8)> =
            if verification.all_present {
                Ok(seed_result)
            } else {
                Err(("seed_verification", verification_failure_message(&verification.checks), 6u8))
            };

        pool.close().await;
        run_result
    });

    match result {
        Ok(seed_result) => {
            let claim_lines: Vec<String> = seed_result
                .claims_seeded
                .iter()
                .map(|claim| {
                    format!("  - {}: claim {} ({})", claim.status, claim.claim_id, claim.description)
                })
                .collect();
            let message = format!(
                "seed dataset loaded: {} claims covering every lifecycle status:\n{}",
                seed_result.claims_seeded.len(),
                claim_lines.join("\n")
            );
            let details = serde_json::to_value(&seed_result)
                .unwrap_or_else(|_| serde_json::json!({ "claims_seeded": [] }));
            CommandResult::success_with_details("seed", message, details)
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

fn verification_failure_message(checks: &[(String, bool)]) -> String {
    let failed: Vec<&str> =
        checks.iter().filter(|(_, passed)| !passed).map(|(name, _)| name.as_str()).collect();

    if failed.is_empty() {
        "some seed data failed to load".to_string()
    } else {
        format!("seed verification failed for checks: {}", failed.join(", "))
    }
}
