use log::Level;
use std::collections::HashMap;

use crate::error::ProcessingError;
use crate::logging::LogContext;
use crate::models::{
    base_units_to_ui, lamports_to_sol, BalanceChange, DetectedTransaction, InstructionNote, TokenAction, TokenBalance,
    TokenEntry, TokenEvent, TransactionMeta, TransactionWithMeta,
};

/// Prefix the token programs and most DEX programs use for instruction names
pub const INSTRUCTION_LOG_MARKER: &str = "Program log: Instruction:";

/// Instruction names worth keeping as hints on a significant transaction
pub const INSTRUCTION_KEYWORDS: &[&str] = &["Transfer", "Swap", "Exchange", "Trade"];

/// Level of the per-account balance change audit trail
pub const BALANCE_AUDIT_LEVEL: Level = Level::Debug;

/// Result of classifying one transaction
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Every account whose native balance moved
    pub balance_changes: Vec<BalanceChange>,
    /// Net SOL given up by the first account, floored at zero
    pub amount_sol: f64,
    /// Present only when `amount_sol` is above the threshold
    pub detected: Option<DetectedTransaction>,
}

pub struct TransferDetector {
    threshold_sol: f64,
}

impl TransferDetector {
    pub fn new(threshold_sol: f64) -> Self {
        Self { threshold_sol }
    }

    pub fn threshold_sol(&self) -> f64 {
        self.threshold_sol
    }

    /// Strictly above the threshold; an amount equal to it is not significant
    pub fn is_significant(&self, amount_sol: f64) -> bool {
        amount_sol > self.threshold_sol
    }

    /// Classify a transaction: balance deltas, estimated amount and, above the
    /// threshold, token events and instruction notes
    pub fn classify(&self, tx: &TransactionWithMeta) -> Result<Classification, ProcessingError> {
        let signature = tx.signature().unwrap_or("<unsigned>");

        let meta = match &tx.meta {
            Some(meta) => meta,
            None => {
                LogContext::new("transfer_detector", "classify")
                    .with_signature(signature)
                    .debug("Transaction has no status meta, nothing to classify");
                return Ok(Classification {
                    balance_changes: Vec::new(),
                    amount_sol: 0.0,
                    detected: None,
                });
            }
        };

        let account_keys = tx.account_keys();
        let balance_changes = balance_changes(signature, &account_keys, meta)?;
        let amount_sol = estimate_amount_sol(meta);

        for change in &balance_changes {
            LogContext::new("transfer_detector", "balance_change")
                .with_signature(signature)
                .with_account(&change.account)
                .with_amount_sol(change.delta_sol)
                .log(BALANCE_AUDIT_LEVEL, &format!("{} moved {} lamports", change.account, change.delta_lamports));
        }

        if !self.is_significant(amount_sol) {
            return Ok(Classification {
                balance_changes,
                amount_sol,
                detected: None,
            });
        }

        let signature = tx
            .signature()
            .ok_or_else(|| ProcessingError::MissingSignature(account_keys.first().unwrap_or(&"").to_string()))?;

        let mut tokens: Vec<TokenEntry> = token_events(meta)
            .into_iter()
            .map(TokenEntry::Balance)
            .collect();
        if let Some(logs) = &meta.log_messages {
            tokens.extend(instruction_notes(logs).into_iter().map(TokenEntry::Instruction));
        }

        let detected = DetectedTransaction {
            signature: signature.to_string(),
            from: account_keys.first().map(|key| key.to_string()).unwrap_or_default(),
            amount_sol,
            tokens,
        };

        Ok(Classification {
            balance_changes,
            amount_sol,
            detected: Some(detected),
        })
    }
}

/// Per-account `post - pre` in lamports for every account that moved
///
/// Fails when the key list and both balance arrays do not line up index for index.
pub fn balance_changes(
    signature: &str,
    account_keys: &[&str],
    meta: &TransactionMeta,
) -> Result<Vec<BalanceChange>, ProcessingError> {
    let pre = &meta.pre_balances;
    let post = &meta.post_balances;

    if pre.len() != post.len() || pre.len() != account_keys.len() {
        return Err(ProcessingError::MisalignedBalances {
            signature: signature.to_string(),
            accounts: account_keys.len(),
            pre: pre.len(),
            post: post.len(),
        });
    }

    let changes = account_keys
        .iter()
        .zip(pre.iter().zip(post.iter()))
        .enumerate()
        .filter_map(|(index, (account, (pre, post)))| {
            let delta_lamports = *post as i128 - *pre as i128;
            (delta_lamports != 0).then(|| BalanceChange {
                account: account.to_string(),
                account_index: index,
                delta_lamports,
                delta_sol: lamports_to_sol(delta_lamports),
            })
        })
        .collect();

    Ok(changes)
}

/// `max(0, pre[0] - post[0])` in SOL. Fees and multi-sender flows are not separated out.
pub fn estimate_amount_sol(meta: &TransactionMeta) -> f64 {
    match (meta.pre_balances.first(), meta.post_balances.first()) {
        (Some(pre), Some(post)) => {
            let spent = (*pre as i128 - *post as i128).max(0);
            lamports_to_sol(spent)
        }
        _ => 0.0,
    }
}

#[derive(Clone, Copy)]
struct TokenPosition {
    base_units: i128,
    decimals: u8,
}

/// Keys in first-seen order plus the summed position for each (mint, owner)
fn token_positions(
    balances: &[TokenBalance],
) -> (Vec<(String, String)>, HashMap<(String, String), TokenPosition>) {
    let mut order = Vec::new();
    let mut positions: HashMap<(String, String), TokenPosition> = HashMap::new();

    for balance in balances {
        let key = (balance.mint.clone(), balance.owner.clone().unwrap_or_default());
        let base_units = balance.ui_token_amount.base_units();
        match positions.get_mut(&key) {
            Some(position) => position.base_units += base_units,
            None => {
                order.push(key.clone());
                positions.insert(key, TokenPosition { base_units, decimals: balance.ui_token_amount.decimals });
            }
        }
    }

    (order, positions)
}

/// Token balance changes per (mint, owner)
///
/// Only computed when the pre-token-balance list is present and non-empty; a
/// post list on its own yields nothing. Keys are visited pre-list first, then
/// post-only keys, each in list order. Positions are summed and compared in
/// raw base units, then reported in UI units.
pub fn token_events(meta: &TransactionMeta) -> Vec<TokenEvent> {
    let pre_balances = match &meta.pre_token_balances {
        Some(balances) if !balances.is_empty() => balances,
        _ => return Vec::new(),
    };
    let post_balances = meta.post_token_balances.as_deref().unwrap_or(&[]);

    let (pre_order, pre_positions) = token_positions(pre_balances);
    let (post_order, post_positions) = token_positions(post_balances);

    let mut keys = pre_order;
    for key in post_order {
        if !pre_positions.contains_key(&key) {
            keys.push(key);
        }
    }

    keys.into_iter()
        .filter_map(|key| {
            let pre = pre_positions.get(&key);
            let post = post_positions.get(&key);
            let pre_units = pre.map(|p| p.base_units).unwrap_or(0);
            let post_units = post.map(|p| p.base_units).unwrap_or(0);
            let decimals = pre.or(post).map(|p| p.decimals).unwrap_or(0);

            let change = post_units - pre_units;
            if change == 0 {
                return None;
            }

            let (mint, owner) = key;
            Some(TokenEvent {
                action: if change > 0 { TokenAction::Buy } else { TokenAction::Sell },
                mint,
                amount: base_units_to_ui(change.abs(), decimals),
                decimals,
                owner,
                pre_amount: base_units_to_ui(pre_units, decimals),
                post_amount: base_units_to_ui(post_units, decimals),
            })
        })
        .collect()
}

/// Log lines carrying the instruction marker and a value-moving keyword, in log order
pub fn instruction_notes(logs: &[String]) -> Vec<InstructionNote> {
    logs.iter()
        .filter(|line| line.contains(INSTRUCTION_LOG_MARKER))
        .filter(|line| INSTRUCTION_KEYWORDS.iter().any(|keyword| line.contains(keyword)))
        .map(|line| InstructionNote { log: line.clone() })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccountKey, EncodedTransaction, UiTokenAmount};
    use crate::models::block::EncodedMessage;

    fn token_balance(index: u32, mint: &str, owner: Option<&str>, ui_amount: f64, decimals: u8) -> TokenBalance {
        TokenBalance {
            account_index: index,
            mint: mint.to_string(),
            owner: owner.map(str::to_string),
            ui_token_amount: UiTokenAmount {
                amount: None,
                decimals,
                ui_amount: Some(ui_amount),
                ui_amount_string: Some(ui_amount.to_string()),
            },
        }
    }

    fn raw_token_balance(index: u32, mint: &str, owner: &str, amount: &str, decimals: u8) -> TokenBalance {
        TokenBalance {
            account_index: index,
            mint: mint.to_string(),
            owner: Some(owner.to_string()),
            ui_token_amount: UiTokenAmount {
                amount: Some(amount.to_string()),
                decimals,
                ui_amount: None,
                ui_amount_string: None,
            },
        }
    }

    fn transaction(keys: &[&str], pre: Vec<u64>, post: Vec<u64>) -> TransactionWithMeta {
        TransactionWithMeta {
            transaction: EncodedTransaction {
                signatures: vec!["5sig".to_string()],
                message: EncodedMessage {
                    account_keys: keys.iter().map(|k| AccountKey::Raw(k.to_string())).collect(),
                },
            },
            meta: Some(TransactionMeta {
                pre_balances: pre,
                post_balances: post,
                ..TransactionMeta::default()
            }),
        }
    }

    #[test]
    fn test_balance_changes_match_post_minus_pre() {
        let meta = TransactionMeta {
            pre_balances: vec![10_000_000_000, 0, 7, 42],
            post_balances: vec![4_000_000_000, 6_000_000_000, 7, 40],
            ..TransactionMeta::default()
        };
        let keys = ["A", "B", "C", "D"];

        let changes = balance_changes("sig", &keys, &meta).unwrap();

        assert_eq!(changes.len(), 3);
        for change in &changes {
            let i = change.account_index;
            assert_eq!(change.account, keys[i]);
            assert_eq!(change.delta_lamports, meta.post_balances[i] as i128 - meta.pre_balances[i] as i128);
        }
        assert_eq!(changes[0].delta_sol, -6.0);
        assert_eq!(changes[1].delta_sol, 6.0);
        assert_eq!(changes[2].account, "D");
        assert_eq!(changes[2].delta_lamports, -2);
    }

    #[test]
    fn test_misaligned_balances_rejected() {
        let meta = TransactionMeta {
            pre_balances: vec![1, 2],
            post_balances: vec![1],
            ..TransactionMeta::default()
        };
        let result = balance_changes("sig", &["A", "B"], &meta);
        assert!(matches!(result, Err(ProcessingError::MisalignedBalances { pre: 2, post: 1, .. })));

        let meta = TransactionMeta {
            pre_balances: vec![1, 2],
            post_balances: vec![1, 2],
            ..TransactionMeta::default()
        };
        assert!(balance_changes("sig", &["A"], &meta).is_err());
    }

    #[test]
    fn test_balance_audit_visible_at_debug() {
        assert_eq!(BALANCE_AUDIT_LEVEL, Level::Debug);
        assert!(BALANCE_AUDIT_LEVEL <= log::LevelFilter::Debug);
        assert!(BALANCE_AUDIT_LEVEL > log::LevelFilter::Info);
    }

    #[test]
    fn test_estimate_amount_floors_at_zero() {
        let spent = TransactionMeta {
            pre_balances: vec![10_000_000_000, 0],
            post_balances: vec![4_000_000_000, 6_000_000_000],
            ..TransactionMeta::default()
        };
        assert_eq!(estimate_amount_sol(&spent), 6.0);

        let received = TransactionMeta {
            pre_balances: vec![1_000_000_000],
            post_balances: vec![3_000_000_000],
            ..TransactionMeta::default()
        };
        assert_eq!(estimate_amount_sol(&received), 0.0);

        assert_eq!(estimate_amount_sol(&TransactionMeta::default()), 0.0);
    }

    #[test]
    fn test_threshold_is_strict() {
        let detector = TransferDetector::new(0.5);

        let exact = transaction(&["A", "B"], vec![1_500_000_000, 0], vec![1_000_000_000, 500_000_000]);
        let classification = detector.classify(&exact).unwrap();
        assert_eq!(classification.amount_sol, 0.5);
        assert!(classification.detected.is_none());

        let above = transaction(&["A", "B"], vec![1_500_000_001, 0], vec![1_000_000_000, 500_000_001]);
        let classification = detector.classify(&above).unwrap();
        assert!(classification.detected.is_some());
    }

    #[test]
    fn test_classify_significant_transaction() {
        let detector = TransferDetector::new(0.5);
        let tx = transaction(&["Payer", "Dest"], vec![10_000_000_000, 0], vec![4_000_000_000, 6_000_000_000]);

        let classification = detector.classify(&tx).unwrap();
        let detected = classification.detected.unwrap();

        assert_eq!(detected.signature, "5sig");
        assert_eq!(detected.from, "Payer");
        assert_eq!(detected.amount_sol, 6.0);
        assert!(detected.tokens.is_empty());
        assert_eq!(classification.balance_changes.len(), 2);
    }

    #[test]
    fn test_classify_without_meta() {
        let detector = TransferDetector::new(0.5);
        let mut tx = transaction(&["A"], vec![], vec![]);
        tx.meta = None;

        let classification = detector.classify(&tx).unwrap();
        assert!(classification.balance_changes.is_empty());
        assert_eq!(classification.amount_sol, 0.0);
        assert!(classification.detected.is_none());
    }

    #[test]
    fn test_classify_significant_without_signature() {
        let detector = TransferDetector::new(0.5);
        let mut tx = transaction(&["A"], vec![2_000_000_000], vec![0]);
        tx.transaction.signatures.clear();

        assert!(matches!(detector.classify(&tx), Err(ProcessingError::MissingSignature(_))));
    }

    #[test]
    fn test_token_events_union_of_keys() {
        let meta = TransactionMeta {
            pre_token_balances: Some(vec![
                token_balance(1, "MintA", Some("Alice"), 10.0, 6),
                token_balance(2, "MintB", Some("Bob"), 5.0, 9),
                token_balance(3, "MintC", Some("Carol"), 1.0, 2),
            ]),
            post_token_balances: Some(vec![
                token_balance(1, "MintA", Some("Alice"), 4.0, 6),
                token_balance(3, "MintC", Some("Carol"), 1.0, 2),
                token_balance(4, "MintD", Some("Dave"), 7.5, 3),
            ]),
            ..TransactionMeta::default()
        };

        let events = token_events(&meta);

        assert_eq!(events.len(), 3);

        assert_eq!(events[0].mint, "MintA");
        assert_eq!(events[0].action, TokenAction::Sell);
        assert_eq!(events[0].amount, 6.0);
        assert_eq!(events[0].pre_amount, 10.0);
        assert_eq!(events[0].post_amount, 4.0);

        // Closed account: only in pre, post defaults to zero
        assert_eq!(events[1].mint, "MintB");
        assert_eq!(events[1].owner, "Bob");
        assert_eq!(events[1].action, TokenAction::Sell);
        assert_eq!(events[1].amount, 5.0);
        assert_eq!(events[1].decimals, 9);

        // New account: only in post, decimals from the post side
        assert_eq!(events[2].mint, "MintD");
        assert_eq!(events[2].action, TokenAction::Buy);
        assert_eq!(events[2].amount, 7.5);
        assert_eq!(events[2].pre_amount, 0.0);
        assert_eq!(events[2].decimals, 3);
    }

    #[test]
    fn test_token_events_require_pre_list() {
        let post_only = TransactionMeta {
            pre_token_balances: Some(vec![]),
            post_token_balances: Some(vec![token_balance(1, "MintA", Some("Alice"), 4.0, 6)]),
            ..TransactionMeta::default()
        };
        assert!(token_events(&post_only).is_empty());

        let absent = TransactionMeta {
            pre_token_balances: None,
            post_token_balances: Some(vec![token_balance(1, "MintA", Some("Alice"), 4.0, 6)]),
            ..TransactionMeta::default()
        };
        assert!(token_events(&absent).is_empty());

        let pre_only = TransactionMeta {
            pre_token_balances: Some(vec![token_balance(1, "MintA", Some("Alice"), 4.0, 6)]),
            post_token_balances: None,
            ..TransactionMeta::default()
        };
        let events = token_events(&pre_only);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, TokenAction::Sell);
    }

    #[test]
    fn test_token_events_same_owner_two_accounts() {
        let meta = TransactionMeta {
            pre_token_balances: Some(vec![
                token_balance(1, "MintA", Some("Alice"), 1.0, 6),
                token_balance(2, "MintA", Some("Alice"), 2.0, 6),
            ]),
            post_token_balances: Some(vec![
                token_balance(1, "MintA", Some("Alice"), 0.5, 6),
                token_balance(2, "MintA", Some("Alice"), 2.0, 6),
            ]),
            ..TransactionMeta::default()
        };

        let events = token_events(&meta);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].pre_amount, 3.0);
        assert_eq!(events[0].post_amount, 2.5);
        assert_eq!(events[0].amount, 0.5);
    }

    #[test]
    fn test_token_events_split_accounts_unchanged_total() {
        let meta = TransactionMeta {
            pre_token_balances: Some(vec![
                token_balance(1, "MintA", Some("Alice"), 0.1, 6),
                token_balance(2, "MintA", Some("Alice"), 0.2, 6),
            ]),
            post_token_balances: Some(vec![token_balance(1, "MintA", Some("Alice"), 0.3, 6)]),
            ..TransactionMeta::default()
        };
        assert!(token_events(&meta).is_empty());

        let meta = TransactionMeta {
            pre_token_balances: Some(vec![
                raw_token_balance(1, "MintA", "Alice", "100000000000000001", 9),
                raw_token_balance(2, "MintA", "Alice", "200000000000000002", 9),
            ]),
            post_token_balances: Some(vec![
                raw_token_balance(1, "MintA", "Alice", "300000000000000002", 9),
                raw_token_balance(2, "MintA", "Alice", "1", 9),
            ]),
            ..TransactionMeta::default()
        };
        assert!(token_events(&meta).is_empty());
    }

    #[test]
    fn test_token_events_use_raw_amounts() {
        let meta = TransactionMeta {
            pre_token_balances: Some(vec![raw_token_balance(1, "MintA", "Alice", "1500000", 6)]),
            post_token_balances: Some(vec![raw_token_balance(1, "MintA", "Alice", "1499999", 6)]),
            ..TransactionMeta::default()
        };

        let events = token_events(&meta);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, TokenAction::Sell);
        assert_eq!(events[0].amount, 0.000001);
        assert_eq!(events[0].pre_amount, 1.5);
        assert_eq!(events[0].post_amount, 1.499999);
    }

    #[test]
    fn test_instruction_notes() {
        let logs = vec![
            "Program TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA invoke [1]".to_string(),
            "Program log: Instruction: TransferChecked".to_string(),
            "Program log: Instruction: InitializeAccount".to_string(),
            "Program log: Swap executed".to_string(),
            "Program log: Instruction: Swap".to_string(),
            "Program log: Instruction: Trade".to_string(),
        ];

        let notes = instruction_notes(&logs);

        assert_eq!(
            notes,
            vec![
                InstructionNote { log: "Program log: Instruction: TransferChecked".to_string() },
                InstructionNote { log: "Program log: Instruction: Swap".to_string() },
                InstructionNote { log: "Program log: Instruction: Trade".to_string() },
            ]
        );
    }

    #[test]
    fn test_token_entries_order_events_before_notes() {
        let detector = TransferDetector::new(0.5);
        let mut tx = transaction(&["Payer", "Pool"], vec![3_000_000_000, 0], vec![1_000_000_000, 2_000_000_000]);
        if let Some(meta) = tx.meta.as_mut() {
            meta.log_messages = Some(vec![
                "Program log: Instruction: Swap".to_string(),
                "Program log: Instruction: Transfer".to_string(),
            ]);
            meta.pre_token_balances = Some(vec![token_balance(2, "MintA", Some("Payer"), 0.0, 6)]);
            meta.post_token_balances = Some(vec![token_balance(2, "MintA", Some("Payer"), 100.0, 6)]);
        }

        let detected = detector.classify(&tx).unwrap().detected.unwrap();

        assert_eq!(detected.tokens.len(), 3);
        assert!(matches!(&detected.tokens[0], TokenEntry::Balance(event) if event.action == TokenAction::Buy));
        assert!(matches!(&detected.tokens[1], TokenEntry::Instruction(note) if note.log.ends_with("Swap")));
        assert!(matches!(&detected.tokens[2], TokenEntry::Instruction(note) if note.log.ends_with("Transfer")));
    }
}
