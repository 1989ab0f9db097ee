//! Sanity checks on fee estimates before signing

use super::FeeEstimate;
use crate::constants::{MAX_FEE_SIZE, MAX_GAS_LIMIT, MAX_GAS_PRICE};
use crate::error::ValidationErrors;
use crate::tokens::TokenRegistry;

/// Validate a single estimate against the fee token set and sanity ceilings
pub fn validate_fee_estimate(
    estimate: Option<&FeeEstimate>,
    tokens: &TokenRegistry,
) -> ValidationErrors {
    let Some(estimate) = estimate else {
        return ValidationErrors::invalid("fee", "No fee set");
    };

    if !tokens.is_native_token(estimate.fee_token) {
        tracing::error!(fee_token = %estimate.fee_token, "Invalid fee currency");
        return ValidationErrors::invalid("fee", "Invalid fee currency");
    }

    if estimate.gas_price.is_zero() || estimate.gas_price > MAX_GAS_PRICE {
        tracing::error!(gas_price = %estimate.gas_price, "Invalid gas price");
        return ValidationErrors::invalid("fee", "Invalid gas price");
    }

    if estimate.gas_limit == 0 || estimate.gas_limit > MAX_GAS_LIMIT {
        tracing::error!(gas_limit = estimate.gas_limit, "Invalid gas limit");
        return ValidationErrors::invalid("fee", "Invalid gas limit");
    }

    if estimate.fee.is_zero() {
        tracing::error!("No fee amount set");
        return ValidationErrors::invalid("fee", "No fee amount set");
    }

    if estimate.fee > MAX_FEE_SIZE {
        tracing::error!(fee = %estimate.fee, "Fee is too large");
        return ValidationErrors::invalid("fee", "Fee is too large");
    }

    ValidationErrors::new()
}

/// Validate every estimate; reports the first failure
pub fn validate_fee_estimates(
    estimates: Option<&[FeeEstimate]>,
    tokens: &TokenRegistry,
) -> ValidationErrors {
    let estimates = match estimates {
        Some(estimates) if !estimates.is_empty() => estimates,
        _ => return ValidationErrors::invalid("fee", "No fee set"),
    };

    estimates
        .iter()
        .map(|e| validate_fee_estimate(Some(e), tokens))
        .find(|errors| !errors.is_valid())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetworkConfig;
    use alloy::primitives::{Address, U256};

    fn tokens() -> TokenRegistry {
        TokenRegistry::new(&NetworkConfig::alfajores())
    }

    fn valid(tokens: &TokenRegistry) -> FeeEstimate {
        FeeEstimate::new(U256::from(1_000_000_000u64), 100_000, tokens.native().address)
    }

    #[test]
    fn test_valid_estimate() {
        let tokens = tokens();
        assert!(validate_fee_estimate(Some(&valid(&tokens)), &tokens).is_valid());
        assert!(validate_fee_estimates(Some(&[valid(&tokens), valid(&tokens)]), &tokens).is_valid());
    }

    #[test]
    fn test_rejections() {
        let tokens = tokens();
        assert_eq!(validate_fee_estimate(None, &tokens).get("fee"), Some("No fee set"));
        assert_eq!(validate_fee_estimates(Some(&[]), &tokens).get("fee"), Some("No fee set"));

        let mut foreign = valid(&tokens);
        foreign.fee_token = Address::repeat_byte(0x99);
        assert_eq!(
            validate_fee_estimate(Some(&foreign), &tokens).get("fee"),
            Some("Invalid fee currency")
        );

        let pricey = FeeEstimate::new(MAX_GAS_PRICE + U256::from(1u8), 10, tokens.native().address);
        assert_eq!(validate_fee_estimate(Some(&pricey), &tokens).get("fee"), Some("Invalid gas price"));

        let long = FeeEstimate::new(U256::from(1u8), MAX_GAS_LIMIT + 1, tokens.native().address);
        assert_eq!(validate_fee_estimate(Some(&long), &tokens).get("fee"), Some("Invalid gas limit"));

        let mut large = valid(&tokens);
        large.fee = MAX_FEE_SIZE + U256::from(1u8);
        assert_eq!(validate_fee_estimate(Some(&large), &tokens).get("fee"), Some("Fee is too large"));

        let second_bad = [valid(&tokens), foreign];
        assert!(!validate_fee_estimates(Some(&second_bad), &tokens).is_valid());
    }
}
