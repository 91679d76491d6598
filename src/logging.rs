use log::{info, warn, error, debug, log, trace, Level, LevelFilter};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::LoggingConfig;
use crate::error::{ErrorSeverity, ScannerError};

/// Structured logging context for the scanner
pub struct LogContext {
    pub component: String,
    pub operation: String,
    pub metadata: HashMap<String, Value>,
}

impl LogContext {
    pub fn new(component: &str, operation: &str) -> Self {
        Self {
            component: component.to_string(),
            operation: operation.to_string(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    pub fn with_slot(self, slot: u64) -> Self {
        self.with_metadata("slot", json!(slot))
    }

    pub fn with_signature(self, signature: &str) -> Self {
        self.with_metadata("signature", json!(signature))
    }

    pub fn with_account(self, account: &str) -> Self {
        self.with_metadata("account", json!(account))
    }

    pub fn with_amount_sol(self, amount_sol: f64) -> Self {
        self.with_metadata("amount_sol", json!(amount_sol))
    }

    pub fn with_duration_ms(self, duration_ms: u64) -> Self {
        self.with_metadata("duration_ms", json!(duration_ms))
    }

    pub fn with_error_code(self, error_code: &str) -> Self {
        self.with_metadata("error_code", json!(error_code))
    }

    fn format_message(&self, level: &str, message: &str) -> String {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let mut log_entry = json!({
            "timestamp": timestamp,
            "level": level,
            "component": self.component,
            "operation": self.operation,
            "message": message,
        });

        for (key, value) in &self.metadata {
            log_entry[key] = value.clone();
        }

        log_entry.to_string()
    }

    pub fn info(&self, message: &str) {
        info!("{}", self.format_message("INFO", message));
    }

    pub fn warn(&self, message: &str) {
        warn!("{}", self.format_message("WARN", message));
    }

    pub fn error(&self, message: &str) {
        error!("{}", self.format_message("ERROR", message));
    }

    pub fn debug(&self, message: &str) {
        debug!("{}", self.format_message("DEBUG", message));
    }

    pub fn trace(&self, message: &str) {
        trace!("{}", self.format_message("TRACE", message));
    }

    pub fn log(&self, level: Level, message: &str) {
        log!(level, "{}", self.format_message(level.as_str(), message));
    }
}

/// Times a single operation and reports it when finished
pub struct PerformanceMonitor {
    pub start_time: SystemTime,
    operation: String,
    metadata: HashMap<String, Value>,
}

impl PerformanceMonitor {
    pub fn new(operation: &str) -> Self {
        Self {
            start_time: SystemTime::now(),
            operation: operation.to_string(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    fn elapsed_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(self.start_time)
            .unwrap_or_default()
            .as_millis() as u64
    }

    pub fn finish_with_result<T, E>(self, result: &Result<T, E>) -> u64
    where
        E: std::fmt::Display
    {
        let duration = self.elapsed_ms();

        let mut context = LogContext::new("performance", &self.operation)
            .with_duration_ms(duration);

        for (key, value) in self.metadata {
            context = context.with_metadata(&key, value);
        }

        match result {
            Ok(_) => {
                context.debug(&format!("Operation completed successfully in {}ms", duration));
            }
            Err(e) => {
                context = context.with_metadata("error", json!(e.to_string()));
                context.warn(&format!("Operation failed after {}ms: {}", duration, e));
            }
        }

        duration
    }
}

/// Error logging utilities
pub struct ErrorLogger;

impl ErrorLogger {
    pub fn log_error(error: &ScannerError, context: Option<LogContext>) {
        let severity = error.severity();

        let log_context = context
            .unwrap_or_else(|| LogContext::new("error", "unknown"))
            .with_error_code(error.code())
            .with_metadata("severity", json!(format!("{:?}", severity)))
            .with_metadata("exit_code", json!(error.exit_code()));

        let message = match error {
            ScannerError::Rpc(crate::error::RpcError::RateLimited) => {
                "Rate limited by the RPC endpoint, try again later or use a dedicated endpoint".to_string()
            }
            _ => format!("Error occurred: {}", error),
        };

        match severity {
            ErrorSeverity::Critical | ErrorSeverity::High => log_context.error(&message),
            ErrorSeverity::Medium | ErrorSeverity::Low => log_context.warn(&message),
        }
    }
}

/// Run metrics
pub struct MetricsLogger;

impl MetricsLogger {
    pub fn log_rpc_call(method: &str, duration_ms: u64, success: bool) {
        let context = LogContext::new("metrics", "rpc_call")
            .with_metadata("method", json!(method))
            .with_duration_ms(duration_ms)
            .with_metadata("success", json!(success));

        if success {
            context.debug(&format!("RPC call {} completed in {}ms", method, duration_ms));
        } else {
            context.warn(&format!("RPC call {} failed after {}ms", method, duration_ms));
        }
    }

    pub fn log_significant_transaction(signature: &str, from: &str, amount_sol: f64, token_entries: usize) {
        let context = LogContext::new("metrics", "significant_transaction")
            .with_signature(signature)
            .with_account(from)
            .with_amount_sol(amount_sol)
            .with_metadata("token_entries", json!(token_entries));

        context.info(&format!("Significant transaction {}: {} SOL from {}", signature, amount_sol, from));
    }

    pub fn log_block_scanned(
        slot: u64,
        blockhash: Option<&str>,
        block_time: Option<i64>,
        transactions_scanned: usize,
        transactions_skipped: usize,
        significant: usize,
        processing_time_ms: u64,
    ) {
        let context = LogContext::new("metrics", "block_scanned")
            .with_slot(slot)
            .with_metadata("blockhash", json!(blockhash))
            .with_metadata("block_time", json!(block_time))
            .with_metadata("transactions_scanned", json!(transactions_scanned))
            .with_metadata("transactions_skipped", json!(transactions_skipped))
            .with_metadata("significant", json!(significant))
            .with_duration_ms(processing_time_ms);

        context.info(&format!(
            "Slot {} scanned: {} transactions, {} significant",
            slot, transactions_scanned, significant
        ));
    }
}

/// Initialize structured logging for the application
///
/// `RUST_LOG` wins over `config.level` when set.
pub fn init_logging(config: &LoggingConfig) -> Result<(), log::SetLoggerError> {
    let level = LevelFilter::from_str(&config.level).unwrap_or(LevelFilter::Info);
    let pretty = config.format != "json";

    env_logger::Builder::new()
        .filter_level(level)
        .parse_env("RUST_LOG")
        .format(move |buf, record| {
            use std::io::Write;

            // Structured records come from LogContext as a JSON object
            if let Ok(json_value) = serde_json::from_str::<Value>(record.args().to_string().as_str()) {
                if json_value.is_object() {
                    let rendered = if pretty {
                        serde_json::to_string_pretty(&json_value)?
                    } else {
                        json_value.to_string()
                    };
                    return writeln!(buf, "{}", rendered);
                }
            }

            writeln!(
                buf,
                "{} [{}] {}: {}",
                chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .try_init()?;

    info!("Structured logging initialized");
    Ok(())
}
