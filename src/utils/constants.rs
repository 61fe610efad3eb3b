//! Ledger constants.
//!
//! All ledger-wide constants are defined here for easy auditing and modification.

// ═══════════════════════════════════════════════════════════════════════════════
// FIXED-POINT CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Fixed-point scale of the fee rate (10^18)
pub const FEE_SCALE: u128 = 1_000_000_000_000_000_000;

/// Seconds in one day
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Basis points divisor (10000 = 100%)
pub const BPS_DIVISOR: u128 = 10_000;

/// Default holding fee: 1 basis point per day, expressed per second at 10^18 scale.
///
/// 10^18 / 10^4 / 86400 = 1_157_407_407 (floored)
pub const DEFAULT_FEE_PER_SECOND: u128 = FEE_SCALE / BPS_DIVISOR / SECONDS_PER_DAY as u128;

// ═══════════════════════════════════════════════════════════════════════════════
// IDENTITY CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Length of an address in bytes
pub const ADDRESS_LENGTH: usize = 20;

/// Length of a hash in bytes
pub const HASH_LENGTH: usize = 32;

/// Reserved address denoting the native currency
pub const NATIVE_ASSET_ADDRESS: [u8; ADDRESS_LENGTH] = [0xee; ADDRESS_LENGTH];

/// Default custody address of the safe itself
pub const DEFAULT_CUSTODY_ADDRESS: [u8; ADDRESS_LENGTH] = [
    0x5a, 0xfe, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01,
];

// ═══════════════════════════════════════════════════════════════════════════════
// DISPLAY CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Decimals of the native currency
pub const NATIVE_DECIMALS: u8 = 18;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_fee_rate() {
        assert_eq!(DEFAULT_FEE_PER_SECOND, 1_157_407_407);
        // one day at the default rate on one whole unit is just under 1 bp
        let one_unit = FEE_SCALE;
        let fee = one_unit * SECONDS_PER_DAY as u128 * DEFAULT_FEE_PER_SECOND / FEE_SCALE;
        assert!(fee < one_unit / BPS_DIVISOR);
        assert!(fee > one_unit / BPS_DIVISOR - one_unit / 1_000_000_000);
    }
}
