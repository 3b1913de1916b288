//! Display-time rounding for monetary amounts
//!
//! All engine and ledger arithmetic stays in full-precision [`Decimal`];
//! rounding to the smallest currency unit happens only here, at the
//! presentation edge, so rounding error never compounds across
//! recipients.

use rust_decimal::{Decimal, RoundingStrategy};

/// Round an amount to cents using banker's rounding
pub fn to_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
}

/// Format an amount as a dollar string for CLI output
pub fn display(amount: Decimal) -> String {
    format!("${}", to_cents(amount))
}
