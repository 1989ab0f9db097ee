//! AMM exchange rate math
//!
//! Mirrors the reserve's constant-product formula on integers:
//!
//! ```text
//! reducedSell = amountIn × (1 − spread)
//! amountOut   = reducedSell × buyBucket / (reducedSell + sellBucket)
//! ```
//!
//! The spread is a fixidity fraction, so `reducedSell` carries an extra factor of
//! 10^24 which the sell bucket is scaled by as well. Division truncates.

use crate::amount::{to_display_f64, u256_decimal};
use crate::constants::{FIXIDITY_ONE, NATIVE_DECIMALS, WEI_PER_UNIT};
use crate::tokens::Token;
use alloy::primitives::{Address, U256, U512};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Raw AMM state of one stable token's exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRate {
    #[serde(with = "u256_decimal")]
    pub parys_bucket: U256,
    #[serde(with = "u256_decimal")]
    pub stable_bucket: U256,
    /// Fixidity fraction (10^24 = 1.0)
    #[serde(with = "u256_decimal")]
    pub spread: U256,
    /// Unix ms
    pub last_updated: u64,
}

impl ExchangeRate {
    /// `(buy_bucket, sell_bucket)` for a trade direction
    pub fn buckets(&self, sell_native: bool) -> (U256, U256) {
        if sell_native {
            (self.stable_bucket, self.parys_bucket)
        } else {
            (self.parys_bucket, self.stable_bucket)
        }
    }
}

/// Stable token address to its exchange state
pub type ToNativeRates = BTreeMap<Address, ExchangeRate>;

/// Result of [`calc_simple_exchange_rate`]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimpleExchangeRate {
    /// Display-only ratio of output to input
    pub rate: f64,
    /// `amountOut / amountIn` scaled by 10^18
    pub rate_wei: U256,
    /// Native token price in the other token, scaled by 10^18
    pub from_native_rate_wei: U256,
    /// Zero when the input amount was zero
    pub amount_out: U256,
}

fn u512(value: U256) -> U512 {
    let l = value.as_limbs();
    U512::from_limbs([l[0], l[1], l[2], l[3], 0, 0, 0, 0])
}

fn narrow(value: U512) -> Option<U256> {
    let limbs = value.as_limbs();
    if limbs[4..].iter().any(|l| *l != 0) {
        return None;
    }
    Some(U256::from_limbs([limbs[0], limbs[1], limbs[2], limbs[3]]))
}

fn try_calc(
    amount_in: U256,
    buy_bucket: U256,
    sell_bucket: U256,
    spread: U256,
    sell_native: bool,
) -> Option<SimpleExchangeRate> {
    if buy_bucket.is_zero() || sell_bucket.is_zero() || spread.is_zero() || spread >= FIXIDITY_ONE {
        return None;
    }

    let simulate = amount_in.is_zero();
    let amount_in = if simulate { WEI_PER_UNIT } else { amount_in };

    let reduced_sell = u512(amount_in) * u512(FIXIDITY_ONE - spread);
    let denominator = reduced_sell + u512(sell_bucket) * u512(FIXIDITY_ONE);
    let amount_out = narrow(reduced_sell * u512(buy_bucket) / denominator)?;
    if amount_out.is_zero() {
        return None;
    }

    let rate_wei = narrow(u512(amount_out) * u512(WEI_PER_UNIT) / u512(amount_in))?;
    let from_native_rate_wei = if sell_native {
        rate_wei
    } else {
        narrow(u512(amount_in) * u512(WEI_PER_UNIT) / u512(amount_out))?
    };

    Some(SimpleExchangeRate {
        rate: to_display_f64(rate_wei, NATIVE_DECIMALS),
        rate_wei,
        from_native_rate_wei,
        amount_out: if simulate { U256::ZERO } else { amount_out },
    })
}

/// Quote a trade against AMM buckets.
///
/// A zero `amount_in` quotes the rate for one whole token and reports an
/// `amount_out` of zero. Invalid input (a zero bucket, an unset zero spread or
/// a spread of one or more) yields the zeroed default instead of an error.
pub fn calc_simple_exchange_rate(
    amount_in: U256,
    buy_bucket: U256,
    sell_bucket: U256,
    spread: U256,
    sell_native: bool,
) -> SimpleExchangeRate {
    try_calc(amount_in, buy_bucket, sell_bucket, spread, sell_native).unwrap_or_else(|| {
        tracing::warn!(%buy_bucket, %sell_bucket, %spread, "Error computing exchange values");
        SimpleExchangeRate::default()
    })
}

/// Effective rate of a confirmed trade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmedTradeRate {
    /// Stable tokens per native token, scaled by 10^18
    pub rate_wei: U256,
    /// The non-native side of the trade
    pub other_token: Address,
}

/// Infer the rate of a confirmed trade from its recorded amounts.
///
/// Assumes one side is the native token. Returns a zero rate when either
/// amount is zero.
pub fn compute_rate_from_confirmed_trade(
    from_token: Address,
    to_token: Address,
    from_value: U256,
    to_value: U256,
    native_token: Address,
) -> ConfirmedTradeRate {
    let sell_native = from_token == native_token;
    let other_token = if sell_native { to_token } else { from_token };
    if from_value.is_zero() || to_value.is_zero() {
        return ConfirmedTradeRate {
            rate_wei: U256::ZERO,
            other_token,
        };
    }

    let (numerator, denominator) = if sell_native {
        (to_value, from_value)
    } else {
        (from_value, to_value)
    };
    let rate_wei = narrow(u512(numerator) * u512(WEI_PER_UNIT) / u512(denominator)).unwrap_or_default();
    ConfirmedTradeRate {
        rate_wei,
        other_token,
    }
}

/// Rate part of an exchange preview
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RatePreview {
    pub value: f64,
    pub wei_value: U256,
    pub from_native_wei_value: U256,
    pub last_updated: u64,
    /// `false` until rates for the pair are known
    pub is_ready: bool,
}

/// Preview of a pending exchange between the native token and a stable token
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeValues {
    pub from_amount: U256,
    pub from_token: Address,
    pub to_amount: U256,
    pub to_token: Address,
    pub rate: RatePreview,
}

impl ExchangeValues {
    fn not_ready(from_token: &Token, to_token: &Token) -> Self {
        Self {
            from_amount: U256::ZERO,
            from_token: from_token.address,
            to_amount: U256::ZERO,
            to_token: to_token.address,
            rate: RatePreview::default(),
        }
    }
}

/// Live preview for a trade of `from_amount` (wei) of `from_token` into `to_token`.
///
/// Not ready when neither side is the native token or the stable side has no rate.
pub fn exchange_values(
    from_amount: U256,
    from_token: &Token,
    to_token: &Token,
    native_token: Address,
    rates: &ToNativeRates,
) -> ExchangeValues {
    let sell_native = from_token.address == native_token;
    if !sell_native && to_token.address != native_token {
        return ExchangeValues::not_ready(from_token, to_token);
    }
    let stable_token = if sell_native { to_token } else { from_token };
    let Some(rate) = rates.get(&stable_token.address) else {
        return ExchangeValues::not_ready(from_token, to_token);
    };

    let (buy_bucket, sell_bucket) = rate.buckets(sell_native);
    let quote = calc_simple_exchange_rate(from_amount, buy_bucket, sell_bucket, rate.spread, sell_native);

    ExchangeValues {
        from_amount,
        from_token: from_token.address,
        to_amount: quote.amount_out,
        to_token: to_token.address,
        rate: RatePreview {
            value: quote.rate,
            wei_value: quote.rate_wei,
            from_native_wei_value: quote.from_native_rate_wei,
            last_updated: rate.last_updated,
            is_ready: true,
        },
    }
}
