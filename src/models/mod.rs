pub mod block;
pub mod transaction;
pub mod units;

pub use block::{AccountKey, BlockResponse, EncodedTransaction, TokenBalance, TransactionMeta, TransactionWithMeta, UiTokenAmount};
pub use transaction::{BalanceChange, DetectedTransaction, InstructionNote, SignificantTransaction, TokenAction, TokenEntry, TokenEvent};
pub use units::{base_units_to_ui, lamports_to_sol, ui_to_base_units, LAMPORTS_PER_SOL};
