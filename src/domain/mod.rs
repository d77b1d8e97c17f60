//! Exchange-agnostic domain types for funding-rate arbitrage.

mod ids;
mod opportunity;
mod profit;
mod quote;
mod tracking;

// Identifiers
pub use ids::{ExchangeId, OpportunityId, Symbol, TrackingId, UserId};

// Quotes and time-basis normalization
pub use quote::{Rate, RateQuote, TimeBasis};

// Fee-adjusted profit
pub use profit::{NetProfitCalculation, PairKey, FEE_LEGS_PER_CYCLE};

// Opportunities and lifecycle events
pub use opportunity::{ArbitrageOpportunity, OpportunityEvent};

// Trackings and snapshots
pub use tracking::{
    running_mean, simulated_apy, Snapshot, SnapshotKind, Tracking, TrackingStatus,
};
