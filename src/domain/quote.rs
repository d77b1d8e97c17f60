//! Funding-rate quotes and time-basis normalization.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

use super::ids::{ExchangeId, Symbol};

/// Funding rate represented as a Decimal for precision.
pub type Rate = Decimal;

/// Settlement interval funding rates are normalized to for comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum TimeBasis {
    /// Hourly basis.
    H1,
    /// Eight-hour basis (the most common funding interval).
    H8,
    /// Daily basis.
    H24,
}

impl TimeBasis {
    /// Basis length in hours.
    #[must_use]
    pub fn hours(&self) -> u32 {
        match self {
            TimeBasis::H1 => 1,
            TimeBasis::H8 => 8,
            TimeBasis::H24 => 24,
        }
    }

    /// Number of settlement periods in a 365-day year.
    #[must_use]
    pub fn periods_per_year(&self) -> Decimal {
        match self {
            TimeBasis::H1 => Decimal::from(8760u32),
            TimeBasis::H8 => Decimal::from(1095u32),
            TimeBasis::H24 => Decimal::from(365u32),
        }
    }

    /// Parse a basis from its hour count.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnsupportedTimeBasis`] for anything other
    /// than 1, 8 or 24.
    pub fn from_hours(hours: u32) -> Result<Self, ValidationError> {
        match hours {
            1 => Ok(TimeBasis::H1),
            8 => Ok(TimeBasis::H8),
            24 => Ok(TimeBasis::H24),
            _ => Err(ValidationError::UnsupportedTimeBasis { hours }),
        }
    }
}

impl fmt::Display for TimeBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}h", self.hours())
    }
}

impl TryFrom<u32> for TimeBasis {
    type Error = ValidationError;

    fn try_from(hours: u32) -> Result<Self, Self::Error> {
        Self::from_hours(hours)
    }
}

impl From<TimeBasis> for u32 {
    fn from(basis: TimeBasis) -> Self {
        basis.hours()
    }
}

/// A funding-rate observation for one symbol on one exchange.
///
/// Immutable once constructed; the exchange adapter produces these and the
/// engine only reads them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateQuote {
    symbol: Symbol,
    exchange: ExchangeId,
    rate: Rate,
    interval_hours: u32,
    observed_at: DateTime<Utc>,
}

impl RateQuote {
    /// Create a new quote.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidFundingInterval`] if the funding
    /// interval is zero.
    pub fn new(
        symbol: Symbol,
        exchange: ExchangeId,
        rate: Rate,
        interval_hours: u32,
        observed_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        if interval_hours == 0 {
            return Err(ValidationError::InvalidFundingInterval {
                exchange: exchange.as_str().to_string(),
                hours: interval_hours,
            });
        }
        Ok(Self {
            symbol,
            exchange,
            rate,
            interval_hours,
            observed_at,
        })
    }

    /// Get the symbol.
    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Get the exchange.
    pub fn exchange(&self) -> &ExchangeId {
        &self.exchange
    }

    /// Get the raw per-interval funding rate.
    pub fn rate(&self) -> Rate {
        self.rate
    }

    /// Get the funding interval in hours.
    pub fn interval_hours(&self) -> u32 {
        self.interval_hours
    }

    /// Get the observation timestamp.
    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }

    /// Project the rate onto a time basis via linear scaling.
    ///
    /// `rate × basis_hours / interval_hours`, decimal-exact.
    pub fn normalized(&self, basis: TimeBasis) -> Rate {
        self.rate * Decimal::from(basis.hours()) / Decimal::from(self.interval_hours)
    }

    /// Age of the quote relative to `now`.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.observed_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn make_quote(rate: Rate, interval_hours: u32) -> RateQuote {
        RateQuote::new(
            Symbol::new("BTCUSDT"),
            ExchangeId::new("binance"),
            rate,
            interval_hours,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn basis_hours() {
        assert_eq!(TimeBasis::H1.hours(), 1);
        assert_eq!(TimeBasis::H8.hours(), 8);
        assert_eq!(TimeBasis::H24.hours(), 24);
    }

    #[test]
    fn basis_periods_per_year() {
        assert_eq!(TimeBasis::H1.periods_per_year(), dec!(8760));
        assert_eq!(TimeBasis::H8.periods_per_year(), dec!(1095));
        assert_eq!(TimeBasis::H24.periods_per_year(), dec!(365));
    }

    #[test]
    fn basis_from_hours_accepts_supported_values() {
        assert_eq!(TimeBasis::from_hours(1).unwrap(), TimeBasis::H1);
        assert_eq!(TimeBasis::from_hours(8).unwrap(), TimeBasis::H8);
        assert_eq!(TimeBasis::from_hours(24).unwrap(), TimeBasis::H24);
    }

    #[test]
    fn basis_from_hours_rejects_unsupported_values() {
        let err = TimeBasis::from_hours(4).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::UnsupportedTimeBasis { hours: 4 }
        ));
    }

    #[test]
    fn basis_display() {
        assert_eq!(TimeBasis::H8.to_string(), "8h");
    }

    #[test]
    fn quote_rejects_zero_interval() {
        let result = RateQuote::new(
            Symbol::new("BTCUSDT"),
            ExchangeId::new("binance"),
            dec!(0.0001),
            0,
            Utc::now(),
        );
        assert!(matches!(
            result.unwrap_err(),
            ValidationError::InvalidFundingInterval { hours: 0, .. }
        ));
    }

    #[test]
    fn normalization_is_linear() {
        // 0.0002 per 4h scaled to each basis
        let quote = make_quote(dec!(0.0002), 4);

        assert_eq!(quote.normalized(TimeBasis::H1), dec!(0.00005));
        assert_eq!(quote.normalized(TimeBasis::H8), dec!(0.0004));
        assert_eq!(quote.normalized(TimeBasis::H24), dec!(0.0012));
    }

    #[test]
    fn normalization_identity_on_matching_interval() {
        let quote = make_quote(dec!(0.0003), 8);
        assert_eq!(quote.normalized(TimeBasis::H8), dec!(0.0003));
    }

    #[test]
    fn normalization_is_transitive() {
        let quote = make_quote(dec!(0.0002), 4);

        // Reinterpret the 8h-normalized rate as an 8h quote, then project
        // it to 24h. Must equal the direct projection.
        let via_h8 = RateQuote::new(
            quote.symbol().clone(),
            quote.exchange().clone(),
            quote.normalized(TimeBasis::H8),
            TimeBasis::H8.hours(),
            quote.observed_at(),
        )
        .unwrap();

        assert_eq!(
            via_h8.normalized(TimeBasis::H24),
            quote.normalized(TimeBasis::H24)
        );
    }

    #[test]
    fn quote_age() {
        let observed = Utc::now();
        let quote = RateQuote::new(
            Symbol::new("BTCUSDT"),
            ExchangeId::new("binance"),
            dec!(0.0001),
            8,
            observed,
        )
        .unwrap();

        let later = observed + Duration::seconds(90);
        assert_eq!(quote.age(later), Duration::seconds(90));
    }

    #[test]
    fn basis_serializes_as_hours() {
        let json = serde_json::to_string(&TimeBasis::H8).unwrap();
        assert_eq!(json, "8");

        let parsed: TimeBasis = serde_json::from_str("24").unwrap();
        assert_eq!(parsed, TimeBasis::H24);
    }
}
