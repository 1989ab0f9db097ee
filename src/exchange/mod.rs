//! Native/stable token exchange rates

pub mod fetch;
pub mod rate;

pub use fetch::{are_rates_stale, fetch_exchange_rate, fetch_exchange_rates, refresh_exchange_rates};
pub use rate::{
    calc_simple_exchange_rate, compute_rate_from_confirmed_trade, exchange_values,
    ConfirmedTradeRate, ExchangeRate, ExchangeValues, RatePreview, SimpleExchangeRate,
    ToNativeRates,
};
