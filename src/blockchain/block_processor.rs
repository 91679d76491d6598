use serde_json::json;
use std::time::Instant;

use crate::blockchain::rpc_client::{Block, RpcClient};
use crate::blockchain::transfer_detector::TransferDetector;
use crate::config::AppConfig;
use crate::error::{Result, RpcError};
use crate::logging::{LogContext, MetricsLogger};
use crate::models::DetectedTransaction;
use crate::output::{OutputWriter, WriteOutcome};

/// Significant transactions found in one block
#[derive(Debug, Clone, PartialEq)]
pub struct BlockClassification {
    pub detected: Vec<DetectedTransaction>,
    pub transactions_scanned: usize,
    /// Transactions dropped because their balances could not be read safely
    pub transactions_skipped: usize,
}

/// Summary of one scan run
#[derive(Debug, PartialEq)]
pub struct ScanReport {
    pub slot: u64,
    pub transactions_scanned: usize,
    pub transactions_skipped: usize,
    pub significant: usize,
    pub output: WriteOutcome,
}

pub struct BlockProcessor {
    rpc_client: RpcClient,
    transfer_detector: TransferDetector,
    max_supported_transaction_version: u8,
}

impl BlockProcessor {
    pub fn new(rpc_client: RpcClient, transfer_detector: TransferDetector, max_supported_transaction_version: u8) -> Self {
        Self {
            rpc_client,
            transfer_detector,
            max_supported_transaction_version,
        }
    }

    pub fn from_config(config: &AppConfig) -> std::result::Result<Self, RpcError> {
        let rpc_client = RpcClient::new_with_config(&config.rpc)?;
        let transfer_detector = TransferDetector::new(config.processing.threshold_sol);
        Ok(Self::new(
            rpc_client,
            transfer_detector,
            config.processing.max_supported_transaction_version,
        ))
    }

    /// Latest slot, then its block. The block request waits on the slot.
    pub async fn fetch_latest_block(&self) -> std::result::Result<Block, RpcError> {
        let slot = self.rpc_client.get_slot().await?;
        LogContext::new("block_processor", "fetch_latest_block")
            .with_slot(slot)
            .info(&format!("Latest finalized slot: {}", slot));

        self.rpc_client
            .get_block(slot, self.max_supported_transaction_version)
            .await
    }

    /// Classify every transaction in the block, keeping those above the threshold
    ///
    /// A transaction that cannot be classified is logged and skipped; it never
    /// aborts the rest of the block.
    pub fn classify_block(&self, block: &Block) -> BlockClassification {
        let mut detected = Vec::new();
        let mut transactions_skipped = 0;

        for tx in &block.transactions {
            match self.transfer_detector.classify(tx) {
                Ok(classification) => {
                    if let Some(found) = classification.detected {
                        MetricsLogger::log_significant_transaction(
                            &found.signature,
                            &found.from,
                            found.amount_sol,
                            found.tokens.len(),
                        );
                        detected.push(found);
                    }
                }
                Err(e) => {
                    transactions_skipped += 1;
                    LogContext::new("block_processor", "classify_block")
                        .with_slot(block.slot)
                        .with_metadata("error", json!(e.to_string()))
                        .warn(&format!("Skipping transaction: {}", e));
                }
            }
        }

        BlockClassification {
            detected,
            transactions_scanned: block.transactions.len(),
            transactions_skipped,
        }
    }

    /// Fetch the latest finalized block, classify it and write the significant subset
    pub async fn process_latest_block(&self, writer: &OutputWriter) -> Result<ScanReport> {
        let block = self.fetch_latest_block().await?;

        let started = Instant::now();
        let classification = self.classify_block(&block);
        let significant = classification.detected.len();

        MetricsLogger::log_block_scanned(
            block.slot,
            block.blockhash.as_deref(),
            block.block_time,
            classification.transactions_scanned,
            classification.transactions_skipped,
            significant,
            started.elapsed().as_millis() as u64,
        );

        let output = writer.write_batch(classification.detected)?;

        Ok(ScanReport {
            slot: block.slot,
            transactions_scanned: classification.transactions_scanned,
            transactions_skipped: classification.transactions_skipped,
            significant,
            output,
        })
    }

    pub fn transfer_detector(&self) -> &TransferDetector {
        &self.transfer_detector
    }
}

/// One complete scan with the given configuration
pub async fn run(config: &AppConfig) -> Result<ScanReport> {
    let processor = BlockProcessor::from_config(config)?;
    let writer = OutputWriter::new(&config.output.path);
    processor.process_latest_block(&writer).await
}
