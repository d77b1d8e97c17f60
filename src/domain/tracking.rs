//! Simulated trackings and their snapshot time series.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::ids::{ExchangeId, Symbol, TrackingId, UserId};
use super::profit::NetProfitCalculation;
use super::quote::TimeBasis;

/// Status of a tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingStatus {
    /// Being sampled by the snapshot loop.
    Active,
    /// Closed by its owner; series frozen.
    Closed,
    /// Soft-deleted; series purged.
    Deleted,
}

impl TrackingStatus {
    /// Returns true if the tracking is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, TrackingStatus::Active)
    }

    /// Returns true if the tracking is closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self, TrackingStatus::Closed)
    }

    /// Returns true if the tracking is deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        matches!(self, TrackingStatus::Deleted)
    }
}

/// What a snapshot marks in the tracking's life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotKind {
    /// Captured when the tracking was created.
    Entry,
    /// Captured by the periodic snapshot loop.
    Scheduled,
    /// Captured when the tracking was closed.
    Closing,
}

impl SnapshotKind {
    /// Returns true for snapshots marking a state change (entry/closing).
    #[must_use]
    pub fn marks_state_change(&self) -> bool {
        matches!(self, SnapshotKind::Entry | SnapshotKind::Closing)
    }
}

/// One timestamped sample of a tracked pair's profitability.
///
/// Append-only; a tracking's snapshots are never mutated or individually
/// removed, only purged en masse when the tracking is deleted.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    tracking_id: TrackingId,
    captured_at: DateTime<Utc>,
    kind: SnapshotKind,
    calculation: NetProfitCalculation,
    cumulative_return: Decimal,
}

impl Snapshot {
    /// Create a new snapshot.
    #[must_use]
    pub fn new(
        tracking_id: TrackingId,
        captured_at: DateTime<Utc>,
        kind: SnapshotKind,
        calculation: NetProfitCalculation,
        cumulative_return: Decimal,
    ) -> Self {
        Self {
            tracking_id,
            captured_at,
            kind,
            calculation,
            cumulative_return,
        }
    }

    /// Get the owning tracking's ID.
    #[must_use]
    pub fn tracking_id(&self) -> TrackingId {
        self.tracking_id
    }

    /// Get the capture timestamp.
    #[must_use]
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Get the snapshot kind.
    #[must_use]
    pub fn kind(&self) -> SnapshotKind {
        self.kind
    }

    /// Get the calculation captured at this point in time.
    #[must_use]
    pub fn calculation(&self) -> &NetProfitCalculation {
        &self.calculation
    }

    /// Get the simulated return accumulated since tracking start.
    #[must_use]
    pub fn cumulative_return(&self) -> Decimal {
        self.cumulative_return
    }
}

/// A user's simulated subscription to one opportunity pair.
#[derive(Debug, Clone, Serialize)]
pub struct Tracking {
    id: TrackingId,
    user_id: UserId,
    symbol: Symbol,
    long_exchange: ExchangeId,
    short_exchange: ExchangeId,
    time_basis: TimeBasis,
    entry: NetProfitCalculation,
    status: TrackingStatus,
    created_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
}

impl Tracking {
    /// Create an active tracking anchored at `created_at`, keyed off the
    /// entry calculation's pair.
    #[must_use]
    pub fn new(user_id: UserId, entry: NetProfitCalculation, created_at: DateTime<Utc>) -> Self {
        Self {
            id: TrackingId::generate(),
            user_id,
            symbol: entry.symbol().clone(),
            long_exchange: entry.long_exchange().clone(),
            short_exchange: entry.short_exchange().clone(),
            time_basis: entry.time_basis(),
            entry,
            status: TrackingStatus::Active,
            created_at,
            closed_at: None,
        }
    }

    /// Get the tracking ID.
    #[must_use]
    pub fn id(&self) -> TrackingId {
        self.id
    }

    /// Get the owning user.
    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Get the symbol.
    #[must_use]
    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Get the long-leg exchange.
    #[must_use]
    pub fn long_exchange(&self) -> &ExchangeId {
        &self.long_exchange
    }

    /// Get the short-leg exchange.
    #[must_use]
    pub fn short_exchange(&self) -> &ExchangeId {
        &self.short_exchange
    }

    /// Get the time basis the tracking samples on.
    #[must_use]
    pub fn time_basis(&self) -> TimeBasis {
        self.time_basis
    }

    /// Get the calculation the tracking was entered at.
    #[must_use]
    pub fn entry(&self) -> &NetProfitCalculation {
        &self.entry
    }

    /// Get the current status.
    #[must_use]
    pub fn status(&self) -> TrackingStatus {
        self.status
    }

    /// Get when the tracking was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Get when the tracking was closed, if it has been.
    #[must_use]
    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.closed_at
    }

    /// Returns true if the tracking is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// True when this tracking covers the given (user, symbol, pair) tuple.
    #[must_use]
    pub fn matches_pair(
        &self,
        user_id: &UserId,
        symbol: &Symbol,
        long_exchange: &ExchangeId,
        short_exchange: &ExchangeId,
    ) -> bool {
        &self.user_id == user_id
            && &self.symbol == symbol
            && &self.long_exchange == long_exchange
            && &self.short_exchange == short_exchange
    }

    /// Close the tracking at `closed_at`.
    pub fn close(&mut self, closed_at: DateTime<Utc>) {
        self.status = TrackingStatus::Closed;
        self.closed_at = Some(closed_at);
    }

    /// Soft-delete the tracking.
    pub fn mark_deleted(&mut self) {
        self.status = TrackingStatus::Deleted;
    }

    /// Number of basis periods elapsed between tracking start and `at`.
    ///
    /// Fractional; a tracking sampled mid-period counts the partial window.
    #[must_use]
    pub fn elapsed_periods(&self, at: DateTime<Utc>) -> Decimal {
        let elapsed_secs = (at - self.created_at).num_seconds().max(0);
        let period_secs = i64::from(self.time_basis.hours()) * 3600;
        Decimal::from(elapsed_secs) / Decimal::from(period_secs)
    }
}

/// Mean `net_profit` across a snapshot series, zero when empty.
#[must_use]
pub fn running_mean(snapshots: &[Snapshot]) -> Decimal {
    if snapshots.is_empty() {
        return Decimal::ZERO;
    }
    let sum = snapshots
        .iter()
        .map(|s| s.calculation().net_profit())
        .fold(Decimal::ZERO, |acc, net| acc + net);
    sum / Decimal::from(snapshots.len() as u64)
}

/// Simulated APY: the running mean annualized on the tracking's basis.
#[must_use]
pub fn simulated_apy(snapshots: &[Snapshot], basis: TimeBasis) -> Decimal {
    running_mean(snapshots) * basis.periods_per_year()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::quote::RateQuote;
    use rust_decimal_macros::dec;

    fn make_calc(long_rate: Decimal, short_rate: Decimal) -> NetProfitCalculation {
        let now = Utc::now();
        let long = RateQuote::new(
            Symbol::new("BTCUSDT"),
            ExchangeId::new("binance"),
            long_rate,
            8,
            now,
        )
        .unwrap();
        let short = RateQuote::new(
            Symbol::new("BTCUSDT"),
            ExchangeId::new("bybit"),
            short_rate,
            8,
            now,
        )
        .unwrap();
        NetProfitCalculation::compute(&long, &short, TimeBasis::H8, dec!(0.0005), now).unwrap()
    }

    fn make_tracking() -> Tracking {
        Tracking::new(
            UserId::new("user-1"),
            make_calc(dec!(0.002), dec!(-0.001)),
            Utc::now(),
        )
    }

    fn make_snapshot(tracking: &Tracking, net_rates: (Decimal, Decimal)) -> Snapshot {
        Snapshot::new(
            tracking.id(),
            Utc::now(),
            SnapshotKind::Scheduled,
            make_calc(net_rates.0, net_rates.1),
            Decimal::ZERO,
        )
    }

    #[test]
    fn status_predicates() {
        assert!(TrackingStatus::Active.is_active());
        assert!(!TrackingStatus::Active.is_closed());
        assert!(TrackingStatus::Closed.is_closed());
        assert!(TrackingStatus::Deleted.is_deleted());
    }

    #[test]
    fn snapshot_kind_state_change_markers() {
        assert!(SnapshotKind::Entry.marks_state_change());
        assert!(SnapshotKind::Closing.marks_state_change());
        assert!(!SnapshotKind::Scheduled.marks_state_change());
    }

    #[test]
    fn tracking_derives_pair_fields_from_entry() {
        let tracking = make_tracking();

        assert_eq!(tracking.symbol().as_str(), "BTCUSDT");
        assert_eq!(tracking.long_exchange().as_str(), "binance");
        assert_eq!(tracking.short_exchange().as_str(), "bybit");
        assert_eq!(tracking.time_basis(), TimeBasis::H8);
        assert!(tracking.is_active());
        assert!(tracking.closed_at().is_none());
    }

    #[test]
    fn tracking_close() {
        let mut tracking = make_tracking();
        let closed_at = Utc::now();

        tracking.close(closed_at);

        assert!(tracking.status().is_closed());
        assert_eq!(tracking.closed_at(), Some(closed_at));
    }

    #[test]
    fn tracking_matches_pair() {
        let tracking = make_tracking();

        assert!(tracking.matches_pair(
            &UserId::new("user-1"),
            &Symbol::new("BTCUSDT"),
            &ExchangeId::new("binance"),
            &ExchangeId::new("bybit"),
        ));
        assert!(!tracking.matches_pair(
            &UserId::new("user-2"),
            &Symbol::new("BTCUSDT"),
            &ExchangeId::new("binance"),
            &ExchangeId::new("bybit"),
        ));
        assert!(!tracking.matches_pair(
            &UserId::new("user-1"),
            &Symbol::new("BTCUSDT"),
            &ExchangeId::new("okx"),
            &ExchangeId::new("bybit"),
        ));
    }

    #[test]
    fn elapsed_periods_counts_fractional_windows() {
        let tracking = make_tracking();
        let start = tracking.created_at();

        assert_eq!(tracking.elapsed_periods(start), dec!(0));
        assert_eq!(
            tracking.elapsed_periods(start + chrono::Duration::hours(16)),
            dec!(2)
        );
        assert_eq!(
            tracking.elapsed_periods(start + chrono::Duration::hours(4)),
            dec!(0.5)
        );
    }

    #[test]
    fn elapsed_periods_clamps_before_start() {
        let tracking = make_tracking();
        let before = tracking.created_at() - chrono::Duration::hours(1);
        assert_eq!(tracking.elapsed_periods(before), dec!(0));
    }

    #[test]
    fn running_mean_of_empty_series_is_zero() {
        assert_eq!(running_mean(&[]), Decimal::ZERO);
    }

    #[test]
    fn simulated_apy_annualizes_constant_series() {
        let tracking = make_tracking();
        // Each calc nets 0.003 - 0.002 fees = 0.001 per 8h period
        let snapshots = vec![
            make_snapshot(&tracking, (dec!(0.002), dec!(-0.001))),
            make_snapshot(&tracking, (dec!(0.002), dec!(-0.001))),
            make_snapshot(&tracking, (dec!(0.002), dec!(-0.001))),
        ];

        assert_eq!(running_mean(&snapshots), dec!(0.001));
        assert_eq!(simulated_apy(&snapshots, TimeBasis::H8), dec!(1.095));
    }

    #[test]
    fn simulated_apy_uses_basis_periods() {
        let tracking = make_tracking();
        let snapshots = vec![make_snapshot(&tracking, (dec!(0.002), dec!(-0.001)))];

        assert_eq!(simulated_apy(&snapshots, TimeBasis::H1), dec!(8.760));
        assert_eq!(simulated_apy(&snapshots, TimeBasis::H24), dec!(0.365));
    }
}
