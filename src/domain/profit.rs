//! Fee-adjusted net profit for a long/short funding pair.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::ValidationError;

use super::ids::{ExchangeId, Symbol};
use super::quote::{Rate, RateQuote, TimeBasis};

/// Fee legs per arbitrage cycle: open and close on both exchanges.
pub const FEE_LEGS_PER_CYCLE: u32 = 4;

/// Cache key for a profit calculation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PairKey {
    symbol: Symbol,
    long_exchange: ExchangeId,
    short_exchange: ExchangeId,
    basis: TimeBasis,
}

impl PairKey {
    /// Create a new key.
    pub fn new(
        symbol: Symbol,
        long_exchange: ExchangeId,
        short_exchange: ExchangeId,
        basis: TimeBasis,
    ) -> Self {
        Self {
            symbol,
            long_exchange,
            short_exchange,
            basis,
        }
    }

    /// Get the symbol.
    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Get the long-leg exchange.
    pub fn long_exchange(&self) -> &ExchangeId {
        &self.long_exchange
    }

    /// Get the short-leg exchange.
    pub fn short_exchange(&self) -> &ExchangeId {
        &self.short_exchange
    }

    /// Get the time basis.
    pub fn basis(&self) -> TimeBasis {
        self.basis
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}/{}@{}",
            self.symbol, self.long_exchange, self.short_exchange, self.basis
        )
    }
}

/// Net profit of one long/short funding pair after round-trip fees.
///
/// Leg naming follows the funding flow: the long leg collects the higher
/// (positive) rate, the short leg carries the lower (negative) one, so a
/// viable pair always has a positive rate difference. All fields are
/// decimal-exact; `net_profit == rate_difference - total_fees` holds by
/// construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetProfitCalculation {
    symbol: Symbol,
    long_exchange: ExchangeId,
    short_exchange: ExchangeId,
    time_basis: TimeBasis,
    long_rate: Rate,
    short_rate: Rate,
    rate_difference: Rate,
    taker_fee_rate: Decimal,
    total_fees: Decimal,
    net_profit: Decimal,
    computed_at: DateTime<Utc>,
}

impl NetProfitCalculation {
    /// Compute the fee-adjusted profit for a pair of quotes.
    ///
    /// Both quotes are normalized to `basis` before differencing. Pure
    /// given its inputs; `computed_at` is supplied by the caller.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the quotes reference different
    /// symbols or the same exchange.
    pub fn compute(
        long_quote: &RateQuote,
        short_quote: &RateQuote,
        basis: TimeBasis,
        taker_fee_rate: Decimal,
        computed_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        if long_quote.symbol() != short_quote.symbol() {
            return Err(ValidationError::SymbolMismatch {
                long: long_quote.symbol().as_str().to_string(),
                short: short_quote.symbol().as_str().to_string(),
            });
        }
        if long_quote.exchange() == short_quote.exchange() {
            return Err(ValidationError::SameExchange {
                exchange: long_quote.exchange().as_str().to_string(),
            });
        }

        let long_rate = long_quote.normalized(basis);
        let short_rate = short_quote.normalized(basis);
        let rate_difference = long_rate - short_rate;
        let total_fees = taker_fee_rate * Decimal::from(FEE_LEGS_PER_CYCLE);
        let net_profit = rate_difference - total_fees;

        Ok(Self {
            symbol: long_quote.symbol().clone(),
            long_exchange: long_quote.exchange().clone(),
            short_exchange: short_quote.exchange().clone(),
            time_basis: basis,
            long_rate,
            short_rate,
            rate_difference,
            taker_fee_rate,
            total_fees,
            net_profit,
            computed_at,
        })
    }

    /// Get the symbol.
    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Get the long-leg exchange.
    pub fn long_exchange(&self) -> &ExchangeId {
        &self.long_exchange
    }

    /// Get the short-leg exchange.
    pub fn short_exchange(&self) -> &ExchangeId {
        &self.short_exchange
    }

    /// Get the time basis both legs were normalized to.
    pub fn time_basis(&self) -> TimeBasis {
        self.time_basis
    }

    /// Get the normalized long-leg rate.
    pub fn long_rate(&self) -> Rate {
        self.long_rate
    }

    /// Get the normalized short-leg rate.
    pub fn short_rate(&self) -> Rate {
        self.short_rate
    }

    /// Get the rate spread (`long_rate - short_rate`).
    pub fn rate_difference(&self) -> Rate {
        self.rate_difference
    }

    /// Get the per-trade taker fee rate.
    pub fn taker_fee_rate(&self) -> Decimal {
        self.taker_fee_rate
    }

    /// Get the round-trip fee total (`taker_fee_rate × 4`).
    pub fn total_fees(&self) -> Decimal {
        self.total_fees
    }

    /// Get the fee-adjusted profit per basis period.
    pub fn net_profit(&self) -> Decimal {
        self.net_profit
    }

    /// Get when the calculation was performed.
    pub fn computed_at(&self) -> DateTime<Utc> {
        self.computed_at
    }

    /// Cache key identifying this pair.
    pub fn pair_key(&self) -> PairKey {
        PairKey::new(
            self.symbol.clone(),
            self.long_exchange.clone(),
            self.short_exchange.clone(),
            self.time_basis,
        )
    }

    /// True when both calculations describe the same exchange pair.
    pub fn same_pair(&self, other: &NetProfitCalculation) -> bool {
        self.long_exchange == other.long_exchange && self.short_exchange == other.short_exchange
    }
}
