//! Thread-safe board of the freshest quote per symbol and exchange.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;

use crate::domain::{ExchangeId, RateQuote, Symbol};

/// Latest-quote board shared by the ingestion surface and the detection
/// loop.
///
/// A new quote supersedes the held one only when its `observed_at` is not
/// older; out-of-order ticks are dropped rather than rolling the board
/// backwards.
pub struct QuoteBoard {
    quotes: RwLock<HashMap<(Symbol, ExchangeId), RateQuote>>,
}

impl QuoteBoard {
    /// Create an empty board.
    #[must_use]
    pub fn new() -> Self {
        Self {
            quotes: RwLock::new(HashMap::new()),
        }
    }

    /// Store a quote, superseding by observation timestamp.
    ///
    /// Returns false when the board already holds a newer quote for the
    /// same (symbol, exchange) and the incoming one was dropped.
    pub fn ingest(&self, quote: RateQuote) -> bool {
        let key = (quote.symbol().clone(), quote.exchange().clone());
        let mut quotes = self.quotes.write();
        match quotes.get(&key) {
            Some(held) if held.observed_at() > quote.observed_at() => false,
            _ => {
                quotes.insert(key, quote);
                true
            }
        }
    }

    /// Get a snapshot of one quote.
    #[must_use]
    pub fn get(&self, symbol: &Symbol, exchange: &ExchangeId) -> Option<RateQuote> {
        self.quotes
            .read()
            .get(&(symbol.clone(), exchange.clone()))
            .cloned()
    }

    /// Get snapshots of both legs of a pair atomically.
    #[must_use]
    pub fn get_pair(
        &self,
        symbol: &Symbol,
        long_exchange: &ExchangeId,
        short_exchange: &ExchangeId,
    ) -> (Option<RateQuote>, Option<RateQuote>) {
        let quotes = self.quotes.read();
        (
            quotes
                .get(&(symbol.clone(), long_exchange.clone()))
                .cloned(),
            quotes
                .get(&(symbol.clone(), short_exchange.clone()))
                .cloned(),
        )
    }

    /// All quotes for a symbol no older than `max_age` relative to `now`.
    #[must_use]
    pub fn fresh_for_symbol(
        &self,
        symbol: &Symbol,
        max_age: Duration,
        now: DateTime<Utc>,
    ) -> Vec<RateQuote> {
        self.quotes
            .read()
            .iter()
            .filter(|((sym, _), quote)| sym == symbol && quote.age(now) <= max_age)
            .map(|(_, quote)| quote.clone())
            .collect()
    }

    /// Distinct symbols currently on the board.
    #[must_use]
    pub fn symbols(&self) -> Vec<Symbol> {
        let mut symbols: Vec<Symbol> = self
            .quotes
            .read()
            .keys()
            .map(|(sym, _)| sym.clone())
            .collect();
        symbols.sort();
        symbols.dedup();
        symbols
    }

    /// Number of (symbol, exchange) entries held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.quotes.read().len()
    }

    /// Returns true if the board holds no quotes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for QuoteBoard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn make_quote(
        symbol: &str,
        exchange: &str,
        rate: rust_decimal::Decimal,
        observed_at: DateTime<Utc>,
    ) -> RateQuote {
        RateQuote::new(
            Symbol::new(symbol),
            ExchangeId::new(exchange),
            rate,
            8,
            observed_at,
        )
        .unwrap()
    }

    #[test]
    fn ingest_and_get() {
        let board = QuoteBoard::new();
        let quote = make_quote("BTCUSDT", "binance", dec!(0.0003), Utc::now());

        assert!(board.ingest(quote));

        let held = board
            .get(&Symbol::new("BTCUSDT"), &ExchangeId::new("binance"))
            .unwrap();
        assert_eq!(held.rate(), dec!(0.0003));
        assert_eq!(board.len(), 1);
    }

    #[test]
    fn newer_quote_supersedes() {
        let board = QuoteBoard::new();
        let t0 = Utc::now();

        board.ingest(make_quote("BTCUSDT", "binance", dec!(0.0001), t0));
        board.ingest(make_quote(
            "BTCUSDT",
            "binance",
            dec!(0.0002),
            t0 + Duration::seconds(5),
        ));

        let held = board
            .get(&Symbol::new("BTCUSDT"), &ExchangeId::new("binance"))
            .unwrap();
        assert_eq!(held.rate(), dec!(0.0002));
        assert_eq!(board.len(), 1);
    }

    #[test]
    fn out_of_order_quote_is_dropped() {
        let board = QuoteBoard::new();
        let t0 = Utc::now();

        board.ingest(make_quote("BTCUSDT", "binance", dec!(0.0002), t0));
        let accepted = board.ingest(make_quote(
            "BTCUSDT",
            "binance",
            dec!(0.0009),
            t0 - Duration::seconds(30),
        ));

        assert!(!accepted);
        let held = board
            .get(&Symbol::new("BTCUSDT"), &ExchangeId::new("binance"))
            .unwrap();
        assert_eq!(held.rate(), dec!(0.0002));
    }

    #[test]
    fn get_pair_reads_both_legs() {
        let board = QuoteBoard::new();
        let now = Utc::now();
        board.ingest(make_quote("BTCUSDT", "binance", dec!(0.0003), now));
        board.ingest(make_quote("BTCUSDT", "bybit", dec!(-0.0002), now));

        let (long, short) = board.get_pair(
            &Symbol::new("BTCUSDT"),
            &ExchangeId::new("binance"),
            &ExchangeId::new("bybit"),
        );

        assert_eq!(long.unwrap().rate(), dec!(0.0003));
        assert_eq!(short.unwrap().rate(), dec!(-0.0002));
    }

    #[test]
    fn fresh_for_symbol_filters_stale_quotes() {
        let board = QuoteBoard::new();
        let now = Utc::now();

        board.ingest(make_quote("BTCUSDT", "binance", dec!(0.0003), now));
        board.ingest(make_quote(
            "BTCUSDT",
            "bybit",
            dec!(-0.0002),
            now - Duration::seconds(300),
        ));
        board.ingest(make_quote("ETHUSDT", "binance", dec!(0.0001), now));

        let fresh = board.fresh_for_symbol(&Symbol::new("BTCUSDT"), Duration::seconds(120), now);

        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].exchange().as_str(), "binance");
    }

    #[test]
    fn symbols_are_distinct_and_sorted() {
        let board = QuoteBoard::new();
        let now = Utc::now();
        board.ingest(make_quote("ETHUSDT", "binance", dec!(0.0001), now));
        board.ingest(make_quote("BTCUSDT", "binance", dec!(0.0001), now));
        board.ingest(make_quote("BTCUSDT", "bybit", dec!(0.0001), now));

        assert_eq!(
            board.symbols(),
            vec![Symbol::new("BTCUSDT"), Symbol::new("ETHUSDT")]
        );
    }
}
