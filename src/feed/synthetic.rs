//! Random-walk quote generator for demo runs.
//!
//! Stands in for the real exchange adapters: emits one funding-rate
//! quote per (symbol, exchange) on a fixed cadence, seeded so that
//! viable long/short pairs exist from the first round.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::domain::{ExchangeId, RateQuote, Symbol};
use crate::error::Result;

/// Hard bounds for the walk; keeps rates in a realistic band around
/// the detection threshold so lifecycle events keep firing.
const MAX_DRIFT: Decimal = dec!(0.0035);

/// Alternating collect/pay seed rates, assigned per exchange index.
const SEED_RATES: [Decimal; 6] = [
    dec!(0.0018),
    dec!(-0.0016),
    dec!(0.0012),
    dec!(-0.0010),
    dec!(0.0008),
    dec!(-0.0006),
];

/// Synthetic funding-rate feed over a fixed symbol/exchange universe.
pub struct SyntheticFeed {
    universe: Vec<(Symbol, ExchangeId)>,
    rates: Vec<Decimal>,
    rng: StdRng,
    interval: Duration,
    funding_interval_hours: u32,
}

impl SyntheticFeed {
    #[must_use]
    pub fn new(
        symbols: Vec<Symbol>,
        exchanges: Vec<ExchangeId>,
        interval: Duration,
        funding_interval_hours: u32,
    ) -> Self {
        let mut universe = Vec::with_capacity(symbols.len() * exchanges.len());
        let mut rates = Vec::with_capacity(symbols.len() * exchanges.len());
        for symbol in &symbols {
            for (index, exchange) in exchanges.iter().enumerate() {
                universe.push((symbol.clone(), exchange.clone()));
                rates.push(SEED_RATES[index % SEED_RATES.len()]);
            }
        }
        Self {
            universe,
            rates,
            rng: StdRng::from_entropy(),
            interval,
            funding_interval_hours,
        }
    }

    /// Emit quote rounds into `sink` forever.
    pub async fn run<F>(mut self, mut sink: F) -> Result<()>
    where
        F: FnMut(RateQuote),
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let round = self.next_round(Utc::now())?;
            debug!(quotes = round.len(), "Emitted synthetic quote round");
            for quote in round {
                sink(quote);
            }
        }
    }

    /// Advance every rate one walk step and build the round's quotes.
    pub fn next_round(&mut self, now: DateTime<Utc>) -> Result<Vec<RateQuote>> {
        let mut quotes = Vec::with_capacity(self.universe.len());
        for (index, (symbol, exchange)) in self.universe.iter().enumerate() {
            let step = Decimal::new(self.rng.gen_range(-30..=30), 6);
            self.rates[index] = (self.rates[index] + step).clamp(-MAX_DRIFT, MAX_DRIFT);
            quotes.push(RateQuote::new(
                symbol.clone(),
                exchange.clone(),
                self.rates[index],
                self.funding_interval_hours,
                now,
            )?);
        }
        Ok(quotes)
    }
}
