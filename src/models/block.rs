//! Typed schema for the `getBlock` response with `jsonParsed` encoding and
//! full transaction details. Only the fields the scanner reads are modelled;
//! everything else in the payload is ignored by serde.

use serde::{Deserialize, Serialize};

use crate::models::units::ui_to_base_units;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockResponse {
    #[serde(default)]
    pub blockhash: Option<String>,
    #[serde(default)]
    pub block_time: Option<i64>,
    /// Absent when the node has no transaction details for the slot
    #[serde(default)]
    pub transactions: Option<Vec<TransactionWithMeta>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionWithMeta {
    pub transaction: EncodedTransaction,
    #[serde(default)]
    pub meta: Option<TransactionMeta>,
}

impl TransactionWithMeta {
    /// Primary signature, the first in the signature list
    pub fn signature(&self) -> Option<&str> {
        self.transaction.signatures.first().map(String::as_str)
    }

    /// Account public keys in message order
    pub fn account_keys(&self) -> Vec<&str> {
        self.transaction
            .message
            .account_keys
            .iter()
            .map(AccountKey::pubkey)
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodedTransaction {
    #[serde(default)]
    pub signatures: Vec<String>,
    pub message: EncodedMessage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedMessage {
    #[serde(default)]
    pub account_keys: Vec<AccountKey>,
}

/// `jsonParsed` returns objects, plain `json` returns bare strings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AccountKey {
    Parsed { pubkey: String },
    Raw(String),
}

impl AccountKey {
    pub fn pubkey(&self) -> &str {
        match self {
            AccountKey::Parsed { pubkey } => pubkey,
            AccountKey::Raw(pubkey) => pubkey,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionMeta {
    #[serde(default)]
    pub pre_balances: Vec<u64>,
    #[serde(default)]
    pub post_balances: Vec<u64>,
    #[serde(default)]
    pub pre_token_balances: Option<Vec<TokenBalance>>,
    #[serde(default)]
    pub post_token_balances: Option<Vec<TokenBalance>>,
    #[serde(default)]
    pub log_messages: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    pub account_index: u32,
    pub mint: String,
    /// Older nodes omit the owner
    #[serde(default)]
    pub owner: Option<String>,
    pub ui_token_amount: UiTokenAmount,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UiTokenAmount {
    /// Raw integer amount in base units, as a decimal string
    #[serde(default)]
    pub amount: Option<String>,
    pub decimals: u8,
    /// Null for zero balances on some node versions
    #[serde(default)]
    pub ui_amount: Option<f64>,
    #[serde(default)]
    pub ui_amount_string: Option<String>,
}

impl UiTokenAmount {
    /// UI amount, falling back to the string form, then to zero
    pub fn value(&self) -> f64 {
        self.ui_amount
            .or_else(|| self.ui_amount_string.as_deref().and_then(|s| s.parse().ok()))
            .unwrap_or(0.0)
    }

    /// Raw base units; derived from the UI amount when `amount` is absent or unparsable
    pub fn base_units(&self) -> i128 {
        self.amount
            .as_deref()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_else(|| ui_to_base_units(self.value(), self.decimals))
    }
}
