//! Upstream quote intake.
//!
//! The exchange-adapter collaborator pushes typed [`RateQuote`]s into the
//! [`QuoteBoard`]; the engine only ever reads the freshest quote per
//! (symbol, exchange) and treats missing or stale entries as partial data.
//!
//! [`RateQuote`]: crate::domain::RateQuote

mod board;
mod synthetic;

pub use board::QuoteBoard;
pub use synthetic::SyntheticFeed;
