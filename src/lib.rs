//! Carrywatch - funding-rate arbitrage monitoring and simulated tracking.
//!
//! The engine consumes funding-rate quotes from multiple exchanges,
//! normalizes them to a common time basis, computes fee-adjusted net
//! profit for every viable long/short pair, and tracks which symbols
//! currently constitute an opportunity. Users may track a pair; a
//! background loop then snapshots its evolving profitability into a
//! simulated APY curve, and lifecycle changes are broadcast to live
//! subscribers.
//!
//! # Architecture
//!
//! Data flows bottom-up through the services:
//!
//! - **`feed`** - quote board holding the latest observation per
//!   (symbol, exchange), plus a synthetic random-walk demo feed
//! - **`service`** - the engine core:
//!   - `ProfitCalculator` - fee-adjusted net profit with a TTL cache
//!     and single-flight recomputation per pair
//!   - `OpportunityDetector` - per-symbol `{Absent, Active, Expired}`
//!     lifecycle emitting detected/updated/expired events
//!   - `NotificationDispatcher` - fault-isolated fan-out to channels
//!   - `TrackingService` - simulated trackings and snapshot series
//!   - `RateLimiter` - sliding-window admission control
//! - **`app`** - the assembled [`app::Engine`] facade and its loops
//!
//! # Modules
//!
//! - [`config`] - Configuration loading from TOML files with full defaults
//! - [`domain`] - Quotes, calculations, opportunities, trackings
//! - [`error`] - Error types for the crate
//! - [`feed`] - Quote storage and the synthetic feed
//! - [`service`] - Calculation, detection, dispatch, tracking, limits
//! - [`app`] - Engine assembly and runtime loops
//!
//! # Example
//!
//! ```no_run
//! use carrywatch::app::Engine;
//! use carrywatch::config::Config;
//!
//! let engine = Engine::new(&Config::default());
//! let opportunities = engine.current_opportunities(None, None);
//! ```

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod feed;
pub mod service;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
