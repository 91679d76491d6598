use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::RpcConfig;
use crate::error::RpcError;
use crate::logging::{LogContext, MetricsLogger, PerformanceMonitor};
use crate::models::{BlockResponse, TransactionWithMeta};

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'a str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// A fetched block with its transaction list guaranteed present
#[derive(Debug, Clone)]
pub struct Block {
    pub slot: u64,
    pub blockhash: Option<String>,
    pub block_time: Option<i64>,
    pub transactions: Vec<TransactionWithMeta>,
}

#[derive(Clone)]
pub struct RpcClient {
    client: Client,
    endpoint: String,
    commitment: String,
}

impl RpcClient {
    /// Client with default timeout and `finalized` commitment
    pub fn new(endpoint: String) -> Result<Self, RpcError> {
        Self::new_with_config(&RpcConfig {
            endpoint,
            ..RpcConfig::default()
        })
    }

    pub fn new_with_config(config: &RpcConfig) -> Result<Self, RpcError> {
        let context = LogContext::new("rpc_client", "initialization")
            .with_metadata("endpoint", json!(config.endpoint))
            .with_metadata("timeout_seconds", json!(config.timeout_seconds))
            .with_metadata("commitment", json!(config.commitment));
        context.debug("Initializing RPC client");

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            commitment: config.commitment.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn make_request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        };

        LogContext::new("rpc_client", "make_request")
            .with_metadata("method", json!(method))
            .trace(&format!("Sending RPC request: {}", method));

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(RpcError::RateLimited);
        }
        if !status.is_success() {
            return Err(RpcError::Status { status: status.as_u16() });
        }

        let rpc_response: JsonRpcResponse = response.json().await?;

        if let Some(error) = rpc_response.error {
            return Err(RpcError::Method {
                code: error.code,
                message: error.message,
            });
        }

        rpc_response
            .result
            .ok_or_else(|| RpcError::MissingData(format!("No result in {} response", method)))
    }

    /// Latest slot at the configured commitment
    pub async fn get_slot(&self) -> Result<u64, RpcError> {
        let monitor = PerformanceMonitor::new("rpc_get_slot");
        let params = json!([{ "commitment": self.commitment }]);

        let result = self.make_request("getSlot", params).await;
        let duration = monitor.finish_with_result(&result);
        MetricsLogger::log_rpc_call("getSlot", duration, result.is_ok());

        let slot = result?
            .as_u64()
            .ok_or_else(|| RpcError::InvalidResponse("Slot is not an unsigned integer".to_string()))?;

        LogContext::new("rpc_client", "get_slot")
            .with_slot(slot)
            .debug(&format!("Retrieved latest {} slot: {}", self.commitment, slot));

        Ok(slot)
    }

    /// Full parsed block for `slot`, rewards excluded
    pub async fn get_block(&self, slot: u64, max_supported_transaction_version: u8) -> Result<Block, RpcError> {
        let monitor = PerformanceMonitor::new("rpc_get_block")
            .with_metadata("slot", json!(slot));
        let params = json!([
            slot,
            {
                "encoding": "jsonParsed",
                "transactionDetails": "full",
                "rewards": false,
                "commitment": self.commitment,
                "maxSupportedTransactionVersion": max_supported_transaction_version,
            }
        ]);

        let result = self.make_request("getBlock", params).await;
        let duration = monitor.finish_with_result(&result);
        MetricsLogger::log_rpc_call("getBlock", duration, result.is_ok());

        let value = result.map_err(|e| match e {
            RpcError::MissingData(_) => RpcError::MissingData(format!("No block returned for slot {}", slot)),
            other => other,
        })?;

        let response: BlockResponse = serde_json::from_value(value)
            .map_err(|e| RpcError::InvalidResponse(format!("Failed to parse block {}: {}", slot, e)))?;

        let transactions = response
            .transactions
            .ok_or_else(|| RpcError::MissingData(format!("No transactions found for slot {}", slot)))?;

        LogContext::new("rpc_client", "get_block")
            .with_slot(slot)
            .with_metadata("transaction_count", json!(transactions.len()))
            .debug(&format!("Retrieved block {} with {} transactions", slot, transactions.len()));

        Ok(Block {
            slot,
            blockhash: response.blockhash,
            block_time: response.block_time,
            transactions,
        })
    }
}
