pub mod rpc_client;
pub mod block_processor;
pub mod transfer_detector;

pub use rpc_client::{Block, RpcClient};
pub use block_processor::{run, BlockClassification, BlockProcessor, ScanReport};
pub use transfer_detector::{
    Classification, TransferDetector, BALANCE_AUDIT_LEVEL, INSTRUCTION_KEYWORDS, INSTRUCTION_LOG_MARKER,
};
