pub mod blockchain;
pub mod models;
pub mod error;
pub mod logging;
pub mod output;
pub mod config;

pub use blockchain::{run, BlockProcessor, RpcClient, ScanReport, TransferDetector};
pub use error::{ScannerError, Result};
pub use logging::{LogContext, PerformanceMonitor, ErrorLogger, MetricsLogger};
pub use output::{OutputWriter, WriteOutcome};
pub use config::{AppConfig, RpcConfig, ProcessingConfig, OutputConfig, LoggingConfig};
