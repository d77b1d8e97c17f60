//! Simulated tracking of opportunity pairs.
//!
//! A tracking pins one (user, symbol, long/short exchange) pair at its
//! entry economics; a background loop appends snapshots whose running
//! mean, annualized on the pair's time basis, gives the simulated APY.

use std::collections::HashMap;
use std::future::Future;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use crate::domain::{
    simulated_apy, ExchangeId, NetProfitCalculation, Snapshot, SnapshotKind, Symbol, Tracking,
    TrackingId, UserId,
};
use crate::error::{Result, TrackingError, ValidationError};

/// Storage operations for trackings.
pub trait TrackingStore: Send + Sync {
    /// Save a tracking, replacing if it exists.
    fn save_tracking(&self, tracking: &Tracking) -> impl Future<Output = Result<()>> + Send;

    /// Get a tracking by ID.
    fn tracking(&self, id: &TrackingId) -> impl Future<Output = Result<Option<Tracking>>> + Send;

    /// List all Active trackings, oldest first.
    fn active_trackings(&self) -> impl Future<Output = Result<Vec<Tracking>>> + Send;

    /// Find the Active tracking for an exact (user, symbol, pair) tuple.
    fn active_for_pair(
        &self,
        user_id: &UserId,
        symbol: &Symbol,
        long_exchange: &ExchangeId,
        short_exchange: &ExchangeId,
    ) -> impl Future<Output = Result<Option<Tracking>>> + Send;
}

/// Storage operations for snapshot series.
pub trait SnapshotStore: Send + Sync {
    /// Append one snapshot to its tracking's series.
    fn append_snapshot(&self, snapshot: &Snapshot) -> impl Future<Output = Result<()>> + Send;

    /// Get a tracking's snapshots in capture order.
    fn snapshots(&self, id: &TrackingId) -> impl Future<Output = Result<Vec<Snapshot>>> + Send;

    /// Drop a tracking's entire snapshot series. Returns count removed.
    fn purge_snapshots(&self, id: &TrackingId) -> impl Future<Output = Result<usize>> + Send;
}

/// In-memory store backing the engine.
#[derive(Debug, Default)]
pub struct MemoryStore {
    trackings: RwLock<HashMap<TrackingId, Tracking>>,
    snapshots: RwLock<HashMap<TrackingId, Vec<Snapshot>>>,
}

impl MemoryStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TrackingStore for MemoryStore {
    async fn save_tracking(&self, tracking: &Tracking) -> Result<()> {
        self.trackings
            .write()
            .insert(tracking.id(), tracking.clone());
        Ok(())
    }

    async fn tracking(&self, id: &TrackingId) -> Result<Option<Tracking>> {
        Ok(self.trackings.read().get(id).cloned())
    }

    async fn active_trackings(&self) -> Result<Vec<Tracking>> {
        let trackings = self.trackings.read();
        let mut active: Vec<Tracking> = trackings
            .values()
            .filter(|t| t.is_active())
            .cloned()
            .collect();
        active.sort_by_key(Tracking::created_at);
        Ok(active)
    }

    async fn active_for_pair(
        &self,
        user_id: &UserId,
        symbol: &Symbol,
        long_exchange: &ExchangeId,
        short_exchange: &ExchangeId,
    ) -> Result<Option<Tracking>> {
        Ok(self
            .trackings
            .read()
            .values()
            .find(|t| t.is_active() && t.matches_pair(user_id, symbol, long_exchange, short_exchange))
            .cloned())
    }
}

impl SnapshotStore for MemoryStore {
    async fn append_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        self.snapshots
            .write()
            .entry(snapshot.tracking_id())
            .or_default()
            .push(snapshot.clone());
        Ok(())
    }

    async fn snapshots(&self, id: &TrackingId) -> Result<Vec<Snapshot>> {
        Ok(self.snapshots.read().get(id).cloned().unwrap_or_default())
    }

    async fn purge_snapshots(&self, id: &TrackingId) -> Result<usize> {
        Ok(self
            .snapshots
            .write()
            .remove(id)
            .map_or(0, |series| series.len()))
    }
}

/// Which snapshots a listing returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapshotFilter {
    /// Every snapshot.
    #[default]
    All,
    /// Only snapshots marking a state change (entry and closing).
    StateChanges,
    /// Only the scheduled interval samples.
    Scheduled,
}

impl SnapshotFilter {
    fn admits(self, kind: SnapshotKind) -> bool {
        match self {
            Self::All => true,
            Self::StateChanges => kind.marks_state_change(),
            Self::Scheduled => kind == SnapshotKind::Scheduled,
        }
    }
}

/// Validated pagination parameters for a snapshot listing.
#[derive(Debug, Clone)]
pub struct SnapshotQuery {
    filter: SnapshotFilter,
    limit: usize,
    offset: usize,
}

impl SnapshotQuery {
    pub const DEFAULT_LIMIT: usize = 100;
    pub const MAX_LIMIT: usize = 500;

    /// Build a query, rejecting a zero or oversized limit.
    pub fn new(filter: SnapshotFilter, limit: usize, offset: usize) -> Result<Self> {
        if limit == 0 || limit > Self::MAX_LIMIT {
            return Err(ValidationError::InvalidLimit {
                limit,
                max: Self::MAX_LIMIT,
            }
            .into());
        }
        Ok(Self {
            filter,
            limit,
            offset,
        })
    }

    /// Get the snapshot filter.
    #[must_use]
    pub fn filter(&self) -> SnapshotFilter {
        self.filter
    }

    /// Get the page size.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Get the page offset.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl Default for SnapshotQuery {
    fn default() -> Self {
        Self {
            filter: SnapshotFilter::All,
            limit: Self::DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

/// One page of results plus pagination metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    items: Vec<T>,
    total: usize,
    limit: usize,
    offset: usize,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(items: Vec<T>, total: usize, limit: usize, offset: usize) -> Self {
        Self {
            items,
            total,
            limit,
            offset,
        }
    }

    /// Get the items on this page.
    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Total matching items across all pages.
    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Get the page size that produced this page.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Get the offset of this page.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// True when the page carries no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A tracking together with its derived series statistics.
#[derive(Debug, Clone, Serialize)]
pub struct TrackingDetail {
    tracking: Tracking,
    snapshot_count: usize,
    simulated_apy: Decimal,
}

impl TrackingDetail {
    /// Get the tracking.
    #[must_use]
    pub fn tracking(&self) -> &Tracking {
        &self.tracking
    }

    /// Number of snapshots captured so far.
    #[must_use]
    pub fn snapshot_count(&self) -> usize {
        self.snapshot_count
    }

    /// Get the annualized simulated return.
    #[must_use]
    pub fn simulated_apy(&self) -> Decimal {
        self.simulated_apy
    }
}

/// User-facing tracking lifecycle over a snapshot/tracking store.
pub struct TrackingService<S> {
    store: S,
}

impl<S> TrackingService<S>
where
    S: TrackingStore + SnapshotStore,
{
    #[must_use]
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Start tracking an opportunity pair at its current economics.
    ///
    /// Rejects a second Active tracking for the identical
    /// (user, symbol, pair) tuple, and captures the entry snapshot
    /// immediately.
    pub async fn start_tracking(
        &self,
        user_id: UserId,
        entry: NetProfitCalculation,
        now: DateTime<Utc>,
    ) -> Result<Tracking> {
        let existing = self
            .store
            .active_for_pair(
                &user_id,
                entry.symbol(),
                entry.long_exchange(),
                entry.short_exchange(),
            )
            .await?;
        if existing.is_some() {
            return Err(TrackingError::DuplicateActive {
                user_id: user_id.to_string(),
                symbol: entry.symbol().to_string(),
                long_exchange: entry.long_exchange().to_string(),
                short_exchange: entry.short_exchange().to_string(),
            }
            .into());
        }

        let tracking = Tracking::new(user_id, entry.clone(), now);
        self.store.save_tracking(&tracking).await?;
        let snapshot = Snapshot::new(
            tracking.id(),
            now,
            SnapshotKind::Entry,
            entry,
            Decimal::ZERO,
        );
        self.store.append_snapshot(&snapshot).await?;
        info!(
            tracking_id = %tracking.id(),
            user_id = %tracking.user_id(),
            symbol = %tracking.symbol(),
            "Started tracking"
        );
        Ok(tracking)
    }

    /// Get a tracking with its series statistics. Trackings owned by a
    /// different user come back as not-found.
    pub async fn get_tracking(&self, id: &TrackingId, user_id: &UserId) -> Result<TrackingDetail> {
        let tracking = self.owned(id, user_id).await?;
        let snapshots = self.store.snapshots(id).await?;
        Ok(TrackingDetail {
            snapshot_count: snapshots.len(),
            simulated_apy: simulated_apy(&snapshots, tracking.time_basis()),
            tracking,
        })
    }

    /// Page through a tracking's snapshots in capture order.
    pub async fn get_snapshots(
        &self,
        id: &TrackingId,
        user_id: &UserId,
        query: &SnapshotQuery,
    ) -> Result<Page<Snapshot>> {
        self.owned(id, user_id).await?;
        let filtered: Vec<Snapshot> = self
            .store
            .snapshots(id)
            .await?
            .into_iter()
            .filter(|s| query.filter().admits(s.kind()))
            .collect();
        let total = filtered.len();
        let items = filtered
            .into_iter()
            .skip(query.offset())
            .take(query.limit())
            .collect();
        Ok(Page::new(items, total, query.limit(), query.offset()))
    }

    /// Close an Active tracking, capturing its closing snapshot.
    ///
    /// `final_calc` carries the pair's current economics when the caller
    /// has fresh data; otherwise the last captured calculation stands in.
    pub async fn close_tracking(
        &self,
        id: &TrackingId,
        user_id: &UserId,
        final_calc: Option<NetProfitCalculation>,
        now: DateTime<Utc>,
    ) -> Result<Tracking> {
        let mut tracking = self.owned(id, user_id).await?;
        if !tracking.is_active() {
            return Err(TrackingError::NotActive { id: *id }.into());
        }

        let calc = match final_calc {
            Some(calc) => calc,
            None => self
                .store
                .snapshots(id)
                .await?
                .last()
                .map_or_else(|| tracking.entry().clone(), |s| s.calculation().clone()),
        };
        self.capture_snapshot(&tracking, calc, SnapshotKind::Closing, now)
            .await?;

        tracking.close(now);
        self.store.save_tracking(&tracking).await?;
        info!(tracking_id = %tracking.id(), user_id = %user_id, "Closed tracking");
        Ok(tracking)
    }

    /// Delete a non-Active tracking and purge its snapshot series.
    ///
    /// The tracking row itself is kept with status Deleted; listings of
    /// its snapshots return an empty page from here on.
    pub async fn delete_tracking(&self, id: &TrackingId, user_id: &UserId) -> Result<()> {
        let mut tracking = self.owned(id, user_id).await?;
        if tracking.is_active() {
            return Err(TrackingError::StillActive { id: *id }.into());
        }

        tracking.mark_deleted();
        self.store.save_tracking(&tracking).await?;
        let purged = self.store.purge_snapshots(id).await?;
        info!(tracking_id = %id, purged, "Deleted tracking");
        Ok(())
    }

    /// Append one snapshot with the series' updated cumulative return.
    ///
    /// The cumulative return is the running mean of every captured
    /// `net_profit` (this one included) scaled by the basis periods
    /// elapsed since tracking start.
    pub async fn capture_snapshot(
        &self,
        tracking: &Tracking,
        calc: NetProfitCalculation,
        kind: SnapshotKind,
        now: DateTime<Utc>,
    ) -> Result<Snapshot> {
        let existing = self.store.snapshots(&tracking.id()).await?;
        let sum = existing
            .iter()
            .map(|s| s.calculation().net_profit())
            .fold(calc.net_profit(), |acc, net| acc + net);
        let mean = sum / Decimal::from(existing.len() as u64 + 1);
        let cumulative = mean * tracking.elapsed_periods(now);

        let snapshot = Snapshot::new(tracking.id(), now, kind, calc, cumulative);
        self.store.append_snapshot(&snapshot).await?;
        Ok(snapshot)
    }

    /// List every Active tracking, oldest first.
    pub async fn active_trackings(&self) -> Result<Vec<Tracking>> {
        self.store.active_trackings().await
    }

    /// Users holding an Active tracking on `symbol`, deduplicated.
    pub async fn users_tracking(&self, symbol: &Symbol) -> Result<Vec<UserId>> {
        let mut users: Vec<UserId> = Vec::new();
        for tracking in self.store.active_trackings().await? {
            if tracking.symbol() == symbol && !users.contains(tracking.user_id()) {
                users.push(tracking.user_id().clone());
            }
        }
        Ok(users)
    }

    // Another user's tracking is indistinguishable from a missing one
    async fn owned(&self, id: &TrackingId, user_id: &UserId) -> Result<Tracking> {
        match self.store.tracking(id).await? {
            Some(tracking) if tracking.user_id() == user_id => Ok(tracking),
            _ => Err(TrackingError::NotFound { id: *id }.into()),
        }
    }
}
