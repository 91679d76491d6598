/// Smallest native units per SOL
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Convert a signed lamport amount into SOL
pub fn lamports_to_sol(lamports: i128) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

/// Convert raw token base units into UI units for a mint with `decimals`
pub fn base_units_to_ui(raw: i128, decimals: u8) -> f64 {
    raw as f64 / 10f64.powi(decimals as i32)
}

/// Nearest raw base-unit amount for a UI amount
pub fn ui_to_base_units(ui_amount: f64, decimals: u8) -> i128 {
    (ui_amount * 10f64.powi(decimals as i32)).round() as i128
}
