use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Native balance movement of one account within a transaction
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceChange {
    pub account: String,
    pub account_index: usize,
    pub delta_lamports: i128,
    pub delta_sol: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenAction {
    /// Token balance of the owner went up
    Buy,
    /// Token balance of the owner went down
    Sell,
}

/// Token balance change for one (mint, owner) pair
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TokenEvent {
    #[serde(rename = "type")]
    pub action: TokenAction,
    pub mint: String,
    /// Absolute UI amount of the change
    pub amount: f64,
    pub decimals: u8,
    pub owner: String,
    pub pre_amount: f64,
    pub post_amount: f64,
}

/// Program log line that looks like a value-moving instruction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstructionNote {
    pub log: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TokenEntry {
    Balance(TokenEvent),
    Instruction(InstructionNote),
}

/// Classifier output for a transaction above the threshold, not yet stamped
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedTransaction {
    pub signature: String,
    pub from: String,
    pub amount_sol: f64,
    pub tokens: Vec<TokenEntry>,
}

impl DetectedTransaction {
    pub fn into_record(self, timestamp: DateTime<Utc>) -> SignificantTransaction {
        SignificantTransaction {
            signature: self.signature,
            timestamp,
            amount_sol: self.amount_sol,
            from: self.from,
            tokens: self.tokens,
        }
    }
}

/// Persisted record for a transaction above the threshold
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignificantTransaction {
    pub signature: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "amountSOL")]
    pub amount_sol: f64,
    /// First account key, conventionally the fee payer
    pub from: String,
    pub tokens: Vec<TokenEntry>,
}
