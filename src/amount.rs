//! Integer ("wei") amount arithmetic
//!
//! Every monetary value inside the SDK is a `U256` in the token's smallest
//! unit. Floats only appear in explicitly derived display values.

use crate::constants::{FIXIDITY_DECIMALS, MIN_DISPLAY_VALUE};
use crate::error::{ParysError, Result, ValidationErrors};
use crate::fees::FeeEstimate;
use crate::tokens::Token;
use crate::types::Balances;
use alloy::primitives::utils::{format_units, parse_units};
use alloy::primitives::U256;

/// Convert a human decimal string (e.g. `"1.5"`) into integer wei for `decimals`.
///
/// Fails with [`ParysError::InvalidAmount`] for negative, non-numeric or
/// over-precise input.
pub fn to_wei(amount: &str, decimals: u8) -> Result<U256> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err(ParysError::InvalidAmount("empty amount".into()));
    }
    if amount.starts_with('-') {
        return Err(ParysError::InvalidAmount(format!("negative amount {amount}")));
    }

    let (whole, fraction) = match amount.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (amount, ""),
    };
    let is_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !is_digits(whole) || !is_digits(fraction) {
        return Err(ParysError::InvalidAmount(format!("not a number: {amount}")));
    }
    if fraction.len() > decimals as usize {
        return Err(ParysError::InvalidAmount(format!(
            "{amount} exceeds {decimals} decimal places"
        )));
    }

    if decimals == 0 {
        return U256::from_str_radix(whole, 10)
            .map_err(|e| ParysError::InvalidAmount(format!("{amount}: {e}")));
    }

    let normalized = format!("{}.{}", if whole.is_empty() { "0" } else { whole }, fraction);
    parse_units(&normalized, decimals)
        .map(|parsed| parsed.get_absolute())
        .map_err(|e| ParysError::InvalidAmount(format!("{amount}: {e}")))
}

/// Convert integer wei into a trimmed decimal string (`"1.5"`, `"150"`).
pub fn from_wei(value: U256, decimals: u8) -> String {
    if decimals == 0 {
        return value.to_string();
    }
    match format_units(value, decimals) {
        Ok(formatted) => trim_decimal(formatted),
        // Units above 77 decimals are unrepresentable, fall back to raw wei
        Err(_) => value.to_string(),
    }
}

fn trim_decimal(formatted: String) -> String {
    if !formatted.contains('.') {
        return formatted;
    }
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Lossy conversion for display-only values
pub fn to_display_f64(value: U256, decimals: u8) -> f64 {
    from_wei(value, decimals).parse().unwrap_or(0.0)
}

/// Parse a fixidity (24 decimal) fraction such as `"0.0025"`
pub fn to_fixidity(value: &str) -> Result<U256> {
    to_wei(value, FIXIDITY_DECIMALS)
}

/// Display a fixidity value as a float
pub fn from_fixidity(value: U256) -> f64 {
    to_display_f64(value, FIXIDITY_DECIMALS)
}

/// Dust threshold for a token: [`MIN_DISPLAY_VALUE`] whole tokens
pub fn dust_threshold(decimals: u8) -> U256 {
    to_wei(MIN_DISPLAY_VALUE, decimals).unwrap_or(U256::from(1u8))
}

/// Whether two amounts differ by less than the token's dust threshold
pub fn are_amounts_nearly_equal(a: U256, b: U256, token: &Token) -> bool {
    let diff = if a > b { a - b } else { b - a };
    diff < dust_threshold(token.decimals)
}

/// Snap `amount` to `max` when they are nearly equal, and never exceed `max`.
///
/// Used to absorb rounding dust when the user asks for "everything".
pub fn adjusted_amount(amount: U256, max: U256, token: &Token) -> U256 {
    if are_amounts_nearly_equal(amount, max, token) || amount > max {
        max
    } else {
        amount
    }
}

/// Validate an amount against an optional balance, maximum and minimum.
pub fn validate_amount(
    amount: U256,
    token: &Token,
    balances: Option<&Balances>,
    max_amount: Option<U256>,
    min_amount: Option<U256>,
) -> ValidationErrors {
    if amount.is_zero() {
        return ValidationErrors::invalid("amount", "Invalid amount");
    }

    if let Some(min) = min_amount {
        if amount < min {
            return ValidationErrors::invalid(
                "amount",
                format!("Minimum amount is {}", from_wei(min, token.decimals)),
            );
        }
    }

    if let Some(balances) = balances {
        let balance = balances.token_balance(token.address);
        if amount > balance && !are_amounts_nearly_equal(amount, balance, token) {
            return ValidationErrors::invalid("amount", "Amount exceeds balance");
        }
    }

    if let Some(max) = max_amount {
        if amount > max && !are_amounts_nearly_equal(amount, max, token) {
            return ValidationErrors::invalid("amount", "Amount exceeds maximum");
        }
    }

    ValidationErrors::new()
}

/// Validate that the balance covers `amount` plus every fee paid in the same token,
/// and that fees in other tokens are covered by their own balances.
pub fn validate_amount_with_fees(
    amount: U256,
    token: &Token,
    balances: &Balances,
    fee_estimates: Option<&[FeeEstimate]>,
) -> ValidationErrors {
    let Some(estimates) = fee_estimates else {
        return ValidationErrors::new();
    };

    let mut same_token_total = amount;
    let mut other_fees: Vec<(alloy::primitives::Address, U256)> = Vec::new();
    for estimate in estimates {
        if estimate.fee_token == token.address {
            same_token_total += estimate.fee;
        } else {
            match other_fees.iter_mut().find(|(t, _)| *t == estimate.fee_token) {
                Some((_, total)) => *total += estimate.fee,
                None => other_fees.push((estimate.fee_token, estimate.fee)),
            }
        }
    }

    let balance = balances.token_balance(token.address);
    if same_token_total > balance && !are_amounts_nearly_equal(same_token_total, balance, token) {
        return ValidationErrors::invalid("amount", "Amount plus fees exceeds balance");
    }

    for (fee_token, total) in other_fees {
        if total > balances.token_balance(fee_token) {
            return ValidationErrors::invalid("fee", "Insufficient balance to pay fee");
        }
    }

    ValidationErrors::new()
}

/// Serialize `U256` amounts as decimal strings at the boundary
pub mod u256_decimal {
    use alloy::primitives::U256;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let s = String::deserialize(deserializer)?;
        U256::from_str_radix(&s, 10).map_err(D::Error::custom)
    }
}
