//! Engine services: profit calculation, opportunity detection, event
//! dispatch, rate limiting, and simulated tracking.

mod broadcast;
mod calculator;
mod detector;
mod dispatcher;
mod rate_limit;
mod tracking;

pub use broadcast::{BroadcastChannel, BroadcastHub};
pub use calculator::ProfitCalculator;
pub use detector::{DetectorConfig, OpportunityDetector};
pub use dispatcher::{LogChannel, NotificationChannel, NotificationDispatcher, NullChannel};
pub use rate_limit::RateLimiter;
pub use tracking::{
    MemoryStore, Page, SnapshotFilter, SnapshotQuery, SnapshotStore, TrackingDetail,
    TrackingService, TrackingStore,
};
