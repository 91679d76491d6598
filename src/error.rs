use thiserror::Error;

/// Main error type for the Solana transaction scanner
#[derive(Error, Debug)]
pub enum ScannerError {
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// RPC-related errors
#[derive(Error, Debug)]
pub enum RpcError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP error: {status}")]
    Status { status: u16 },

    #[error("Rate limited by RPC endpoint (HTTP 429)")]
    RateLimited,

    #[error("RPC method error: code={code}, message={message}")]
    Method { code: i64, message: String },

    #[error("Missing data: {0}")]
    MissingData(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Per-transaction classification errors
///
/// These never abort a run: the block processor logs the transaction and
/// counts it as skipped, so they have no exit code of their own.
#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("Balance arrays misaligned for {signature}: {accounts} accounts, {pre} pre, {post} post")]
    MisalignedBalances {
        signature: String,
        accounts: usize,
        pre: usize,
        post: usize,
    },

    #[error("Transaction {0} carries no signature")]
    MissingSignature(String),
}

/// Output writer errors
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file could not be read: {0}")]
    FileNotFound(String),

    #[error("Configuration parsing failed: {0}")]
    Parsing(String),

    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ScannerError>;

/// Error severity levels for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// The run cannot start at all
    Critical,
    /// The run aborted on a fetch or write
    High,
    /// The endpoint pushed back or returned something unexpected
    Medium,
    /// Mostly informational
    Low,
}

impl ScannerError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ScannerError::Config(_) => ErrorSeverity::Critical,
            ScannerError::Output(_) => ErrorSeverity::Critical,

            ScannerError::Rpc(RpcError::Transport(_)) => ErrorSeverity::High,
            ScannerError::Rpc(RpcError::Status { .. }) => ErrorSeverity::High,
            ScannerError::Rpc(RpcError::Method { .. }) => ErrorSeverity::High,

            ScannerError::Rpc(RpcError::RateLimited) => ErrorSeverity::Medium,
            ScannerError::Rpc(RpcError::InvalidResponse(_)) => ErrorSeverity::Medium,

            ScannerError::Rpc(RpcError::MissingData(_)) => ErrorSeverity::Low,
        }
    }

    /// Process exit code for this failure kind
    ///
    /// | code | kind |
    /// |------|------|
    /// | 1 | configuration |
    /// | 2 | transport, HTTP status, JSON-RPC method error, invalid response |
    /// | 3 | rate limited |
    /// | 4 | missing `result` / `transactions` |
    /// | 5 | output write |
    pub fn exit_code(&self) -> i32 {
        match self {
            ScannerError::Config(_) => 1,
            ScannerError::Rpc(RpcError::RateLimited) => 3,
            ScannerError::Rpc(RpcError::MissingData(_)) => 4,
            ScannerError::Rpc(_) => 2,
            ScannerError::Output(_) => 5,
        }
    }

    /// Short machine-readable name used as the `error_code` log field
    pub fn code(&self) -> &'static str {
        match self {
            ScannerError::Config(_) => "config",
            ScannerError::Rpc(RpcError::RateLimited) => "rate_limited",
            ScannerError::Rpc(RpcError::MissingData(_)) => "missing_data",
            ScannerError::Rpc(_) => "transport",
            ScannerError::Output(_) => "output",
        }
    }
}
