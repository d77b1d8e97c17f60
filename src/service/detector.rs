//! Per-symbol opportunity lifecycle detection.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rust_decimal::Decimal;
use tracing::debug;

use crate::domain::{
    ArbitrageOpportunity, NetProfitCalculation, OpportunityEvent, OpportunityId, Symbol,
};

/// Detection thresholds and lifecycle timing.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Minimum net profit for a symbol to become Active.
    pub min_spread: Decimal,
    /// Inclusion cutoff for the published pair list.
    pub approaching_spread: Decimal,
    /// Smallest best-pair profit change worth an update event.
    pub min_update_delta: Decimal,
    /// How long an expired symbol's state lingers before being dropped.
    pub expiry_grace: Duration,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_spread: Decimal::new(1, 3),          // 0.001
            approaching_spread: Decimal::new(5, 4),  // 0.0005
            min_update_delta: Decimal::new(1, 4),    // 0.0001
            expiry_grace: Duration::from_secs(300),
        }
    }
}

enum SymbolState {
    Active { opportunity: ArbitrageOpportunity },
    Expired { since: Instant },
}

/// State machine over `{Absent, Active, Expired}` per symbol.
///
/// Absent symbols hold no entry at all. One evaluation per symbol runs at
/// a time (the detection loop is the only writer), which keeps lifecycle
/// events for a symbol strictly ordered.
pub struct OpportunityDetector {
    config: DetectorConfig,
    states: DashMap<Symbol, SymbolState>,
}

impl OpportunityDetector {
    /// Create a detector with the given thresholds.
    #[must_use]
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            states: DashMap::new(),
        }
    }

    /// Advance the state machine for one symbol with this tick's
    /// calculations and return the lifecycle events to publish.
    ///
    /// An empty `pairs` slice (no viable pairs, or stale data upstream)
    /// drives the below-threshold path.
    pub fn evaluate(
        &self,
        symbol: &Symbol,
        pairs: Vec<NetProfitCalculation>,
        now: DateTime<Utc>,
    ) -> Vec<OpportunityEvent> {
        let candidates: Vec<NetProfitCalculation> = pairs
            .into_iter()
            .filter(|pair| pair.net_profit() >= self.config.approaching_spread)
            .collect();
        let best_net = candidates
            .iter()
            .map(NetProfitCalculation::net_profit)
            .max();
        let above_threshold = best_net.is_some_and(|net| net >= self.config.min_spread);

        let mut events = Vec::new();
        match self.states.entry(symbol.clone()) {
            Entry::Vacant(vacant) => {
                if above_threshold {
                    let opportunity = ArbitrageOpportunity::new(
                        OpportunityId::generate(),
                        symbol.clone(),
                        candidates,
                        now,
                    );
                    events.push(OpportunityEvent::detected(opportunity.clone()));
                    vacant.insert(SymbolState::Active { opportunity });
                }
            }
            Entry::Occupied(mut occupied) => {
                let next = match occupied.get() {
                    SymbolState::Active { opportunity } => {
                        if above_threshold {
                            self.refresh_active(opportunity, candidates, &mut events)
                        } else {
                            events.push(OpportunityEvent::expired(
                                opportunity.id(),
                                symbol.clone(),
                            ));
                            Some(SymbolState::Expired {
                                since: Instant::now(),
                            })
                        }
                    }
                    SymbolState::Expired { .. } => {
                        if above_threshold {
                            // The expired id is already public; mint a new one
                            let opportunity = ArbitrageOpportunity::new(
                                OpportunityId::generate(),
                                symbol.clone(),
                                candidates,
                                now,
                            );
                            events.push(OpportunityEvent::detected(opportunity.clone()));
                            Some(SymbolState::Active { opportunity })
                        } else {
                            None
                        }
                    }
                };
                if let Some(state) = next {
                    occupied.insert(state);
                }
            }
        }
        events
    }

    /// Drop expired symbols whose grace period has passed. Bookkeeping
    /// only; emits no events.
    pub fn sweep_expired(&self) {
        let grace = self.config.expiry_grace;
        self.states.retain(|symbol, state| match state {
            SymbolState::Expired { since } if since.elapsed() >= grace => {
                debug!(symbol = %symbol, "Dropped expired opportunity state");
                false
            }
            _ => true,
        });
    }

    /// Snapshot every Active opportunity, ordered by symbol.
    #[must_use]
    pub fn current(&self) -> Vec<ArbitrageOpportunity> {
        let mut opportunities: Vec<ArbitrageOpportunity> = self
            .states
            .iter()
            .filter_map(|entry| match entry.value() {
                SymbolState::Active { opportunity } => Some(opportunity.clone()),
                SymbolState::Expired { .. } => None,
            })
            .collect();
        opportunities.sort_by(|a, b| a.symbol().cmp(b.symbol()));
        opportunities
    }

    /// Snapshot the Active opportunity for one symbol.
    #[must_use]
    pub fn current_for(&self, symbol: &Symbol) -> Option<ArbitrageOpportunity> {
        self.states.get(symbol).and_then(|entry| match entry.value() {
            SymbolState::Active { opportunity } => Some(opportunity.clone()),
            SymbolState::Expired { .. } => None,
        })
    }

    /// Number of symbols holding detector state (Active or Expired).
    #[must_use]
    pub fn tracked_symbols(&self) -> usize {
        self.states.len()
    }

    fn refresh_active(
        &self,
        previous: &ArbitrageOpportunity,
        candidates: Vec<NetProfitCalculation>,
        events: &mut Vec<OpportunityEvent>,
    ) -> Option<SymbolState> {
        let refreshed = ArbitrageOpportunity::new(
            previous.id(),
            previous.symbol().clone(),
            candidates,
            previous.detected_at(),
        );
        let (Some(new_best), Some(old_best)) = (refreshed.best(), previous.best()) else {
            return None;
        };

        let pair_changed = !new_best.same_pair(old_best);
        // Drift is measured against the last published value, so small
        // moves accumulate instead of being suppressed forever
        let delta = (new_best.net_profit() - old_best.net_profit()).abs();
        if pair_changed || delta >= self.config.min_update_delta {
            events.push(OpportunityEvent::updated(refreshed.clone()));
            Some(SymbolState::Active {
                opportunity: refreshed,
            })
        } else {
            None
        }
    }
}
