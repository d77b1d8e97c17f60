//! Builders for domain primitives used across tests.
//!
//! Provides concise factory functions for [`RateQuote`],
//! [`NetProfitCalculation`], and the identifier newtypes so tests focus
//! on assertions rather than construction boilerplate.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::domain::{ExchangeId, NetProfitCalculation, RateQuote, Symbol, TimeBasis, UserId};

/// Standard taker fee across tests: 0.0005 per trade, 0.002 per cycle.
pub const TEST_FEE: Decimal = dec!(0.0005);

/// Create a [`Symbol`] from a string.
pub fn symbol(value: &str) -> Symbol {
    Symbol::new(value)
}

/// Create an [`ExchangeId`] from a string.
pub fn exchange(value: &str) -> ExchangeId {
    ExchangeId::new(value)
}

/// Create a [`UserId`] from a string.
pub fn user(value: &str) -> UserId {
    UserId::new(value)
}

/// An 8h-interval quote observed now.
pub fn quote(symbol_name: &str, exchange_name: &str, rate: Decimal) -> RateQuote {
    quote_at(symbol_name, exchange_name, rate, Utc::now())
}

/// An 8h-interval quote observed at `at`.
pub fn quote_at(
    symbol_name: &str,
    exchange_name: &str,
    rate: Decimal,
    at: DateTime<Utc>,
) -> RateQuote {
    RateQuote::new(
        Symbol::new(symbol_name),
        ExchangeId::new(exchange_name),
        rate,
        8,
        at,
    )
    .expect("valid test quote")
}

/// A BTCUSDT calculation on the 8h basis netting exactly `net` after
/// the [`TEST_FEE`] cycle cost.
pub fn calc_with_net(
    long_exchange: &str,
    short_exchange: &str,
    net: Decimal,
) -> NetProfitCalculation {
    calc_with_net_at(long_exchange, short_exchange, net, Utc::now())
}

/// Same as [`calc_with_net`] with an explicit computation time.
pub fn calc_with_net_at(
    long_exchange: &str,
    short_exchange: &str,
    net: Decimal,
    at: DateTime<Utc>,
) -> NetProfitCalculation {
    let short_rate = dec!(-0.001);
    let long_rate = net + TEST_FEE * Decimal::from(4) + short_rate;
    let long = quote_at("BTCUSDT", long_exchange, long_rate, at);
    let short = quote_at("BTCUSDT", short_exchange, short_rate, at);
    NetProfitCalculation::compute(&long, &short, TimeBasis::H8, TEST_FEE, at)
        .expect("valid test calculation")
}
