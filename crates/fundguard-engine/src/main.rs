//! fundguard engine binary.
//!
//! Loads a YAML config (first argument, default `fundguard.yaml`), boots the
//! engine with its genesis funds and prints each fund record as a JSON line,
//! followed by the metrics snapshot.

use std::process::ExitCode;

use tracing_subscriber::{fmt, EnvFilter};

use fundguard_engine::{config, engine::Engine};

fn main() -> ExitCode {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "fundguard.yaml".to_string());

    let cfg = match config::load_from_file(&path) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(%path, error = %e, code = e.code().as_str(), "config load failed");
            return ExitCode::from(2);
        }
    };

    let engine = match Engine::from_config(cfg) {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!(error = %e, code = e.code().as_str(), "engine boot failed");
            return ExitCode::FAILURE;
        }
    };

    let lifecycle = engine.lifecycle();
    tracing::info!(
        funds = lifecycle.funds().len(),
        policies = ?engine.policies().registered_policies(),
        timelock_secs = lifecycle.migrations().timelock_secs(),
        "fundguard engine ready"
    );

    for fund in lifecycle.funds() {
        let line = lifecycle
            .fund(fund)
            .and_then(|rec| {
                serde_json::to_string(&rec)
                    .map_err(|e| fundguard_core::FundError::Internal(format!("encode failed: {e}")))
            });
        match line {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::warn!(%fund, error = %e, "fund snapshot failed"),
        }
    }
    print!("{}", engine.metrics().render());

    ExitCode::SUCCESS
}
