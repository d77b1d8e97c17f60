//! Net-profit computation behind a short-lived freshness cache.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::{NetProfitCalculation, PairKey, RateQuote, TimeBasis};
use crate::error::Result;

struct CacheEntry {
    calc: NetProfitCalculation,
    stored_at: Instant,
}

/// Calculator with a TTL cache keyed by (symbol, long, short, basis).
///
/// Funding rates move slowly, so entries stay valid for seconds; an
/// expired entry is recomputed, never served. Concurrent misses for one
/// key are collapsed to a single computation through a per-key gate: the
/// winner computes and stores, waiters re-read the fresh entry.
pub struct ProfitCalculator {
    taker_fee_rate: Decimal,
    ttl: Duration,
    entries: DashMap<PairKey, CacheEntry>,
    // One gate per key, created on first miss. The key universe is the
    // configured symbol/exchange set, so gates are never evicted.
    in_flight: DashMap<PairKey, Arc<Mutex<()>>>,
}

impl ProfitCalculator {
    /// Create a calculator with the given fee rate and cache TTL.
    #[must_use]
    pub fn new(taker_fee_rate: Decimal, ttl: Duration) -> Self {
        Self {
            taker_fee_rate,
            ttl,
            entries: DashMap::new(),
            in_flight: DashMap::new(),
        }
    }

    /// Get the per-trade taker fee rate the calculator applies.
    #[must_use]
    pub fn taker_fee_rate(&self) -> Decimal {
        self.taker_fee_rate
    }

    /// Compute a calculation directly, bypassing the cache.
    ///
    /// # Errors
    ///
    /// Propagates quote validation failures.
    pub fn compute(
        &self,
        long_quote: &RateQuote,
        short_quote: &RateQuote,
        basis: TimeBasis,
    ) -> Result<NetProfitCalculation> {
        let calc = NetProfitCalculation::compute(
            long_quote,
            short_quote,
            basis,
            self.taker_fee_rate,
            Utc::now(),
        )?;
        Ok(calc)
    }

    /// Return the cached calculation for `key` if fresh, otherwise fetch
    /// quotes, compute, cache and return.
    ///
    /// `fetch` is only invoked on a miss, and by at most one caller per
    /// key at a time.
    ///
    /// # Errors
    ///
    /// Propagates fetch failures (typically missing quotes) and quote
    /// validation failures.
    pub async fn get_or_compute<F, Fut>(&self, key: &PairKey, fetch: F) -> Result<NetProfitCalculation>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(RateQuote, RateQuote)>>,
    {
        if let Some(calc) = self.fresh(key) {
            return Ok(calc);
        }

        let gate = {
            let entry = self.in_flight.entry(key.clone()).or_default();
            Arc::clone(entry.value())
        };
        let _guard = gate.lock().await;

        // A waiter that lost the race finds the winner's entry here
        if let Some(calc) = self.fresh(key) {
            return Ok(calc);
        }

        let (long_quote, short_quote) = fetch().await?;
        let calc = NetProfitCalculation::compute(
            &long_quote,
            &short_quote,
            key.basis(),
            self.taker_fee_rate,
            Utc::now(),
        )?;
        self.entries.insert(
            key.clone(),
            CacheEntry {
                calc: calc.clone(),
                stored_at: Instant::now(),
            },
        );
        debug!(pair = %key, net_profit = %calc.net_profit(), "Recomputed net profit");
        Ok(calc)
    }

    /// Drop entries past their TTL.
    pub fn purge_expired(&self) {
        self.entries
            .retain(|_, entry| entry.stored_at.elapsed() < self.ttl);
    }

    /// Number of cached calculations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn fresh(&self, key: &PairKey) -> Option<NetProfitCalculation> {
        self.entries.get(key).and_then(|entry| {
            if entry.stored_at.elapsed() < self.ttl {
                Some(entry.calc.clone())
            } else {
                None
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExchangeId, Symbol};
    use crate::error::{DataError, Error};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use rust_decimal_macros::dec;

    fn make_quote(exchange: &str, rate: Decimal) -> RateQuote {
        RateQuote::new(
            Symbol::new("BTCUSDT"),
            ExchangeId::new(exchange),
            rate,
            8,
            Utc::now(),
        )
        .unwrap()
    }

    fn make_key() -> PairKey {
        PairKey::new(
            Symbol::new("BTCUSDT"),
            ExchangeId::new("binance"),
            ExchangeId::new("bybit"),
            TimeBasis::H8,
        )
    }

    #[tokio::test]
    async fn fresh_hit_returns_identical_calculation() {
        let calculator = ProfitCalculator::new(dec!(0.0005), Duration::from_secs(60));
        let key = make_key();

        let first = calculator
            .get_or_compute(&key, || async {
                Ok((make_quote("binance", dec!(0.003)), make_quote("bybit", dec!(-0.001))))
            })
            .await
            .unwrap();

        let second = calculator
            .get_or_compute(&key, || async {
                panic!("fetch must not run on a fresh hit");
            })
            .await
            .unwrap();

        assert_eq!(second.computed_at(), first.computed_at());
        assert_eq!(second.net_profit(), first.net_profit());
    }

    #[tokio::test]
    async fn expired_entry_is_recomputed() {
        // Zero TTL expires entries immediately
        let calculator = ProfitCalculator::new(dec!(0.0005), Duration::ZERO);
        let key = make_key();

        let fetch = || async {
            Ok((make_quote("binance", dec!(0.003)), make_quote("bybit", dec!(-0.001))))
        };

        let first = calculator.get_or_compute(&key, fetch).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = calculator.get_or_compute(&key, fetch).await.unwrap();

        assert!(second.computed_at() > first.computed_at());
    }

    #[tokio::test]
    async fn concurrent_misses_compute_once() {
        let calculator = ProfitCalculator::new(dec!(0.0005), Duration::from_secs(60));
        let key = make_key();
        let fetches = AtomicUsize::new(0);

        let fetch = || async {
            fetches.fetch_add(1, Ordering::SeqCst);
            // Suspend so the other callers pile up on the gate
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok((make_quote("binance", dec!(0.003)), make_quote("bybit", dec!(-0.001))))
        };

        let (a, b, c, d) = tokio::join!(
            calculator.get_or_compute(&key, fetch),
            calculator.get_or_compute(&key, fetch),
            calculator.get_or_compute(&key, fetch),
            calculator.get_or_compute(&key, fetch),
        );

        assert_eq!(fetches.load(Ordering::SeqCst), 1);
        let reference = a.unwrap().computed_at();
        assert_eq!(b.unwrap().computed_at(), reference);
        assert_eq!(c.unwrap().computed_at(), reference);
        assert_eq!(d.unwrap().computed_at(), reference);
    }

    #[tokio::test]
    async fn fetch_failure_propagates_and_leaves_no_entry() {
        let calculator = ProfitCalculator::new(dec!(0.0005), Duration::from_secs(60));
        let key = make_key();

        let result = calculator
            .get_or_compute(&key, || async {
                Err(Error::Data(DataError::MissingQuote {
                    symbol: "BTCUSDT".to_string(),
                    exchange: "bybit".to_string(),
                }))
            })
            .await;

        assert!(result.is_err());
        assert!(calculator.is_empty());
    }

    #[tokio::test]
    async fn purge_expired_drops_old_entries() {
        let calculator = ProfitCalculator::new(dec!(0.0005), Duration::ZERO);
        let key = make_key();

        calculator
            .get_or_compute(&key, || async {
                Ok((make_quote("binance", dec!(0.003)), make_quote("bybit", dec!(-0.001))))
            })
            .await
            .unwrap();
        assert_eq!(calculator.len(), 1);

        calculator.purge_expired();
        assert!(calculator.is_empty());
    }

    #[test]
    fn compute_bypasses_cache() {
        let calculator = ProfitCalculator::new(dec!(0.0005), Duration::from_secs(60));

        let calc = calculator
            .compute(
                &make_quote("binance", dec!(0.003)),
                &make_quote("bybit", dec!(-0.001)),
                TimeBasis::H8,
            )
            .unwrap();

        assert_eq!(calc.net_profit(), dec!(0.002));
        assert!(calculator.is_empty());
    }
}
