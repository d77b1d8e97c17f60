//! The assembled opportunity and tracking engine.
//!
//! One `Engine` owns the quote board, profit cache, detector state,
//! notification channels and tracking store, and exposes the surfaces
//! the outer layers call: quote ingestion, opportunity queries, the
//! tracking commands and live-event subscription. The periodic loops
//! in the orchestrator drive it.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::config::Config;
use crate::domain::{
    ArbitrageOpportunity, ExchangeId, NetProfitCalculation, OpportunityEvent, PairKey, RateQuote,
    Snapshot, SnapshotKind, Symbol, TimeBasis, Tracking, TrackingId, UserId,
};
use crate::error::{DataError, Error, Result};
use crate::feed::QuoteBoard;
use crate::service::{
    BroadcastChannel, BroadcastHub, DetectorConfig, LogChannel, MemoryStore,
    NotificationDispatcher, OpportunityDetector, Page, ProfitCalculator, RateLimiter,
    SnapshotQuery, TrackingDetail, TrackingService,
};

pub struct Engine {
    board: QuoteBoard,
    calculator: ProfitCalculator,
    detector: OpportunityDetector,
    dispatcher: NotificationDispatcher,
    hub: Arc<BroadcastHub>,
    trackings: TrackingService<MemoryStore>,
    ingest_limiter: RateLimiter,
    query_limiter: RateLimiter,
    basis: TimeBasis,
    staleness: chrono::Duration,
}

impl Engine {
    /// Assemble an engine from configuration.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let hub = Arc::new(BroadcastHub::new(config.engine.broadcast_capacity));
        let mut dispatcher = NotificationDispatcher::new();
        dispatcher.register(Box::new(LogChannel));
        dispatcher.register(Box::new(BroadcastChannel::new(hub.clone())));
        info!(
            channels = dispatcher.len(),
            basis = %config.engine.time_basis(),
            "Engine assembled"
        );

        Self {
            board: QuoteBoard::new(),
            calculator: ProfitCalculator::new(
                config.fees.taker_fee_rate,
                Duration::from_secs(config.cache.profit_ttl_secs),
            ),
            detector: OpportunityDetector::new(DetectorConfig::from(config)),
            dispatcher,
            hub,
            trackings: TrackingService::new(MemoryStore::new()),
            ingest_limiter: RateLimiter::new(
                config.limiter.ingest.max_requests,
                config.limiter.ingest.window(),
            ),
            query_limiter: RateLimiter::new(
                config.limiter.query.max_requests,
                config.limiter.query.window(),
            ),
            basis: config.engine.time_basis(),
            staleness: config.engine.staleness(),
        }
    }

    /// Accept one quote onto the board, rate limited per exchange.
    ///
    /// Returns false when the board already holds a newer observation
    /// for the same (symbol, exchange).
    pub fn ingest_quote(&self, quote: RateQuote) -> Result<bool> {
        let key = format!("ingest:{}", quote.exchange());
        if !self.ingest_limiter.check(&key) {
            return Err(Error::RateLimited { key });
        }
        Ok(self.board.ingest(quote))
    }

    /// Snapshot the currently active opportunities, optionally narrowed
    /// to one symbol or one time basis.
    #[must_use]
    pub fn current_opportunities(
        &self,
        symbol: Option<&Symbol>,
        basis: Option<TimeBasis>,
    ) -> Vec<ArbitrageOpportunity> {
        let current = match symbol {
            Some(symbol) => self.detector.current_for(symbol).into_iter().collect(),
            None => self.detector.current(),
        };
        match basis {
            Some(basis) => current
                .into_iter()
                .filter(|opportunity| {
                    opportunity
                        .best()
                        .map_or(false, |pair| pair.time_basis() == basis)
                })
                .collect(),
            None => current,
        }
    }

    /// Subscribe to every lifecycle event.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<OpportunityEvent> {
        self.hub.subscribe()
    }

    /// Subscribe to events routed to one user's room.
    #[must_use]
    pub fn subscribe_user(&self, user_id: &UserId) -> broadcast::Receiver<OpportunityEvent> {
        self.hub.subscribe_user(user_id)
    }

    /// Start tracking a pair at its current economics.
    pub async fn start_tracking(&self, user_id: UserId, pair: &PairKey) -> Result<Tracking> {
        self.admit_query(&user_id)?;
        let entry = self.pair_calculation(pair).await?;
        self.trackings.start_tracking(user_id, entry, Utc::now()).await
    }

    /// Get a tracking with its series statistics.
    pub async fn get_tracking(&self, id: &TrackingId, user_id: &UserId) -> Result<TrackingDetail> {
        self.admit_query(user_id)?;
        self.trackings.get_tracking(id, user_id).await
    }

    /// Page through a tracking's snapshots.
    pub async fn get_snapshots(
        &self,
        id: &TrackingId,
        user_id: &UserId,
        query: &SnapshotQuery,
    ) -> Result<Page<Snapshot>> {
        self.admit_query(user_id)?;
        self.trackings.get_snapshots(id, user_id, query).await
    }

    /// Close an active tracking, capturing final economics when fresh
    /// quotes are on the board.
    pub async fn close_tracking(&self, id: &TrackingId, user_id: &UserId) -> Result<Tracking> {
        self.admit_query(user_id)?;
        let detail = self.trackings.get_tracking(id, user_id).await?;
        let key = pair_key_of(detail.tracking());
        let final_calc = self.pair_calculation(&key).await.ok();
        self.trackings
            .close_tracking(id, user_id, final_calc, Utc::now())
            .await
    }

    /// Delete a closed tracking and purge its snapshots.
    pub async fn delete_tracking(&self, id: &TrackingId, user_id: &UserId) -> Result<()> {
        self.admit_query(user_id)?;
        self.trackings.delete_tracking(id, user_id).await
    }

    /// Run one detection pass over every symbol on the board.
    ///
    /// Symbols are evaluated sequentially, so each symbol's lifecycle
    /// events reach the channels in order.
    pub async fn detection_tick(&self) {
        let now = Utc::now();
        for symbol in self.board.symbols() {
            let pairs = self.viable_pairs(&symbol, now).await;
            let events = self.detector.evaluate(&symbol, pairs, now);
            for event in events {
                self.dispatcher.dispatch(&event).await;
                self.route_to_trackers(&event).await;
            }
        }
    }

    /// Append one scheduled snapshot per active tracking.
    ///
    /// A failure for one tracking is logged and skipped; the tracking is
    /// retried on the next pass.
    pub async fn snapshot_tick(&self) {
        let trackings = match self.trackings.active_trackings().await {
            Ok(trackings) => trackings,
            Err(error) => {
                warn!(error = %error, "Could not list active trackings");
                return;
            }
        };

        let now = Utc::now();
        for tracking in trackings {
            let key = pair_key_of(&tracking);
            let calc = match self.pair_calculation(&key).await {
                Ok(calc) => calc,
                Err(error) => {
                    warn!(tracking_id = %tracking.id(), error = %error, "Snapshot skipped");
                    continue;
                }
            };
            if let Err(error) = self
                .trackings
                .capture_snapshot(&tracking, calc, SnapshotKind::Scheduled, now)
                .await
            {
                warn!(tracking_id = %tracking.id(), error = %error, "Snapshot append failed");
            }
        }
    }

    /// Housekeeping: drop expired detector state, stale cache entries,
    /// idle limiter keys and empty broadcast rooms.
    pub fn maintenance_tick(&self) {
        self.detector.sweep_expired();
        self.calculator.purge_expired();
        self.ingest_limiter.cleanup();
        self.query_limiter.cleanup();
        self.hub.prune_rooms();
    }

    /// Compute all viable long/short pairs for a symbol from fresh board
    /// quotes. Positive-rate legs go long, negative-rate legs go short.
    async fn viable_pairs(&self, symbol: &Symbol, now: chrono::DateTime<Utc>) -> Vec<NetProfitCalculation> {
        let quotes = self.board.fresh_for_symbol(symbol, self.staleness, now);
        let longs: Vec<&RateQuote> = quotes.iter().filter(|q| q.rate() > Decimal::ZERO).collect();
        let shorts: Vec<&RateQuote> = quotes.iter().filter(|q| q.rate() < Decimal::ZERO).collect();

        let mut pairs = Vec::with_capacity(longs.len() * shorts.len());
        for long in &longs {
            for short in &shorts {
                let key = PairKey::new(
                    symbol.clone(),
                    long.exchange().clone(),
                    short.exchange().clone(),
                    self.basis,
                );
                let fetched = ((*long).clone(), (*short).clone());
                match self
                    .calculator
                    .get_or_compute(&key, || async move { Ok(fetched) })
                    .await
                {
                    Ok(calc) => pairs.push(calc),
                    Err(error) => {
                        warn!(pair = %key, error = %error, "Net profit computation failed");
                    }
                }
            }
        }
        pairs
    }

    /// Compute the current calculation for a pair from board quotes,
    /// through the cache.
    async fn pair_calculation(&self, key: &PairKey) -> Result<NetProfitCalculation> {
        self.calculator
            .get_or_compute(key, || {
                let (long, short) =
                    self.board
                        .get_pair(key.symbol(), key.long_exchange(), key.short_exchange());
                let long = self.fresh_quote(long, key.symbol(), key.long_exchange());
                let short = self.fresh_quote(short, key.symbol(), key.short_exchange());
                async move { Ok((long?, short?)) }
            })
            .await
    }

    fn fresh_quote(
        &self,
        quote: Option<RateQuote>,
        symbol: &Symbol,
        exchange: &ExchangeId,
    ) -> Result<RateQuote> {
        let quote = quote.ok_or_else(|| DataError::MissingQuote {
            symbol: symbol.to_string(),
            exchange: exchange.to_string(),
        })?;
        let age = quote.age(Utc::now());
        if age > self.staleness {
            return Err(DataError::StaleQuote {
                symbol: symbol.to_string(),
                exchange: exchange.to_string(),
                age_secs: age.num_seconds(),
            }
            .into());
        }
        Ok(quote)
    }

    /// Mirror an event into the rooms of users actively tracking its
    /// symbol.
    async fn route_to_trackers(&self, event: &OpportunityEvent) {
        match self.trackings.users_tracking(event.symbol()).await {
            Ok(users) => {
                for user in users {
                    self.hub.publish_for(&user, event);
                }
            }
            Err(error) => {
                warn!(error = %error, "Could not resolve tracking users for event routing");
            }
        }
    }

    fn admit_query(&self, user_id: &UserId) -> Result<()> {
        let key = format!("query:{user_id}");
        if self.query_limiter.check(&key) {
            Ok(())
        } else {
            Err(Error::RateLimited { key })
        }
    }
}

fn pair_key_of(tracking: &Tracking) -> PairKey {
    PairKey::new(
        tracking.symbol().clone(),
        tracking.long_exchange().clone(),
        tracking.short_exchange().clone(),
        tracking.time_basis(),
    )
}
