use std::process::ExitCode;

use solana_tx_scanner::blockchain::run;
use solana_tx_scanner::config::{AppConfig, LoggingConfig};
use solana_tx_scanner::error::ScannerError;
use solana_tx_scanner::logging::{init_logging, ErrorLogger, LogContext};
use solana_tx_scanner::output::WriteOutcome;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            let _ = init_logging(&LoggingConfig::default());
            let error = ScannerError::Config(e);
            ErrorLogger::log_error(&error, Some(LogContext::new("main", "load_config")));
            return exit_code(&error);
        }
    };

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    LogContext::new("main", "startup")
        .with_metadata("endpoint", serde_json::json!(config.rpc.endpoint))
        .with_metadata("threshold_sol", serde_json::json!(config.processing.threshold_sol))
        .with_metadata("output_path", serde_json::json!(config.output.path))
        .with_metadata("env_overrides", serde_json::json!(config.env_overrides))
        .info("Starting Solana significant transaction scan");

    if !config.env_overrides.is_empty() {
        LogContext::new("main", "startup")
            .with_metadata("env_overrides", serde_json::json!(config.env_overrides))
            .warn(&format!(
                "Configuration overridden from environment: {}",
                config.env_overrides.join(", ")
            ));
    }

    match run(&config).await {
        Ok(report) => {
            let context = LogContext::new("main", "scan_complete").with_slot(report.slot);
            match report.output {
                WriteOutcome::Written { path, records } => {
                    context.info(&format!("Saved {} significant transactions to {}", records, path.display()));
                }
                WriteOutcome::NothingToWrite => {
                    context.info(&format!(
                        "Found 0 transactions above {} SOL in slot {}",
                        config.processing.threshold_sol, report.slot
                    ));
                }
            }
            ExitCode::SUCCESS
        }
        Err(error) => {
            ErrorLogger::log_error(&error, Some(LogContext::new("main", "scan")));
            exit_code(&error)
        }
    }
}

fn exit_code(error: &ScannerError) -> ExitCode {
    ExitCode::from(error.exit_code() as u8)
}
