//! Arbitrage opportunities and their lifecycle events.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ids::{OpportunityId, Symbol};
use super::profit::NetProfitCalculation;

/// A symbol whose best exchange pair clears the profitability threshold.
///
/// Holds every viable pair ordered by net profit descending (lexical
/// (long, short) tie-break), best pair first. Published by the detector as
/// an immutable snapshot; consumers never mutate it.
#[derive(Debug, Clone, Serialize)]
pub struct ArbitrageOpportunity {
    id: OpportunityId,
    symbol: Symbol,
    pairs: Vec<NetProfitCalculation>,
    detected_at: DateTime<Utc>,
}

impl ArbitrageOpportunity {
    /// Create an opportunity, ordering `pairs` best-first.
    pub fn new(
        id: OpportunityId,
        symbol: Symbol,
        mut pairs: Vec<NetProfitCalculation>,
        detected_at: DateTime<Utc>,
    ) -> Self {
        pairs.sort_by(compare_pairs);
        Self {
            id,
            symbol,
            pairs,
            detected_at,
        }
    }

    /// Get the opportunity ID.
    pub fn id(&self) -> OpportunityId {
        self.id
    }

    /// Get the symbol.
    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Get all viable pairs, best first.
    pub fn pairs(&self) -> &[NetProfitCalculation] {
        &self.pairs
    }

    /// Get the most profitable pair.
    pub fn best(&self) -> Option<&NetProfitCalculation> {
        self.pairs.first()
    }

    /// Get when this opportunity was first detected.
    pub fn detected_at(&self) -> DateTime<Utc> {
        self.detected_at
    }
}

/// Net profit descending, then lexical (long, short) for determinism.
fn compare_pairs(a: &NetProfitCalculation, b: &NetProfitCalculation) -> Ordering {
    b.net_profit()
        .cmp(&a.net_profit())
        .then_with(|| a.long_exchange().cmp(b.long_exchange()))
        .then_with(|| a.short_exchange().cmp(b.short_exchange()))
}

/// Opportunity lifecycle event, tagged by type.
///
/// Serializes to the `{type, data}` payload shape the notification
/// channels deliver.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OpportunityEvent {
    /// A symbol crossed the profitability threshold.
    OpportunityDetected { opportunity: ArbitrageOpportunity },
    /// The best pair or its profit changed materially.
    OpportunityUpdated { opportunity: ArbitrageOpportunity },
    /// The opportunity fell below the threshold or its data went stale.
    OpportunityExpired { id: OpportunityId, symbol: Symbol },
}

impl OpportunityEvent {
    /// Wrap an opportunity in a detection event.
    pub fn detected(opportunity: ArbitrageOpportunity) -> Self {
        Self::OpportunityDetected { opportunity }
    }

    /// Wrap an opportunity in an update event.
    pub fn updated(opportunity: ArbitrageOpportunity) -> Self {
        Self::OpportunityUpdated { opportunity }
    }

    /// Build an expiry event carrying identity only.
    pub fn expired(id: OpportunityId, symbol: Symbol) -> Self {
        Self::OpportunityExpired { id, symbol }
    }

    /// The wire tag for this event.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::OpportunityDetected { .. } => "OPPORTUNITY_DETECTED",
            Self::OpportunityUpdated { .. } => "OPPORTUNITY_UPDATED",
            Self::OpportunityExpired { .. } => "OPPORTUNITY_EXPIRED",
        }
    }

    /// The symbol this event concerns.
    pub fn symbol(&self) -> &Symbol {
        match self {
            Self::OpportunityDetected { opportunity }
            | Self::OpportunityUpdated { opportunity } => opportunity.symbol(),
            Self::OpportunityExpired { symbol, .. } => symbol,
        }
    }

    /// The identity of the opportunity this event concerns.
    pub fn opportunity_id(&self) -> OpportunityId {
        match self {
            Self::OpportunityDetected { opportunity }
            | Self::OpportunityUpdated { opportunity } => opportunity.id(),
            Self::OpportunityExpired { id, .. } => *id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::ExchangeId;
    use crate::domain::quote::{RateQuote, TimeBasis};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn make_calc(
        long_exchange: &str,
        short_exchange: &str,
        long_rate: Decimal,
        short_rate: Decimal,
    ) -> NetProfitCalculation {
        let now = Utc::now();
        let long = RateQuote::new(
            Symbol::new("BTCUSDT"),
            ExchangeId::new(long_exchange),
            long_rate,
            8,
            now,
        )
        .unwrap();
        let short = RateQuote::new(
            Symbol::new("BTCUSDT"),
            ExchangeId::new(short_exchange),
            short_rate,
            8,
            now,
        )
        .unwrap();
        NetProfitCalculation::compute(&long, &short, TimeBasis::H8, dec!(0.0005), now).unwrap()
    }

    #[test]
    fn pairs_are_ordered_best_first() {
        let weak = make_calc("binance", "bybit", dec!(0.001), dec!(-0.001));
        let strong = make_calc("okx", "kraken", dec!(0.003), dec!(-0.002));

        let opp = ArbitrageOpportunity::new(
            OpportunityId::generate(),
            Symbol::new("BTCUSDT"),
            vec![weak, strong],
            Utc::now(),
        );

        assert_eq!(opp.pairs().len(), 2);
        assert_eq!(opp.best().unwrap().long_exchange().as_str(), "okx");
        assert_eq!(opp.pairs()[1].long_exchange().as_str(), "binance");
    }

    #[test]
    fn equal_profit_breaks_ties_lexically() {
        let bc = make_calc("bexch", "cexch", dec!(0.002), dec!(-0.001));
        let ad = make_calc("aexch", "dexch", dec!(0.002), dec!(-0.001));

        let opp = ArbitrageOpportunity::new(
            OpportunityId::generate(),
            Symbol::new("BTCUSDT"),
            vec![bc, ad],
            Utc::now(),
        );

        assert_eq!(opp.best().unwrap().long_exchange().as_str(), "aexch");
    }

    #[test]
    fn event_type_tags() {
        let opp = ArbitrageOpportunity::new(
            OpportunityId::generate(),
            Symbol::new("BTCUSDT"),
            vec![make_calc("binance", "bybit", dec!(0.003), dec!(-0.001))],
            Utc::now(),
        );

        assert_eq!(
            OpportunityEvent::detected(opp.clone()).event_type(),
            "OPPORTUNITY_DETECTED"
        );
        assert_eq!(
            OpportunityEvent::updated(opp.clone()).event_type(),
            "OPPORTUNITY_UPDATED"
        );
        assert_eq!(
            OpportunityEvent::expired(opp.id(), opp.symbol().clone()).event_type(),
            "OPPORTUNITY_EXPIRED"
        );
    }

    #[test]
    fn events_serialize_with_type_and_data() {
        let opp = ArbitrageOpportunity::new(
            OpportunityId::generate(),
            Symbol::new("BTCUSDT"),
            vec![make_calc("binance", "bybit", dec!(0.003), dec!(-0.001))],
            Utc::now(),
        );

        let value = serde_json::to_value(OpportunityEvent::detected(opp.clone())).unwrap();
        assert_eq!(value["type"], "OPPORTUNITY_DETECTED");
        assert_eq!(value["data"]["opportunity"]["symbol"], "BTCUSDT");

        let value =
            serde_json::to_value(OpportunityEvent::expired(opp.id(), opp.symbol().clone()))
                .unwrap();
        assert_eq!(value["type"], "OPPORTUNITY_EXPIRED");
        assert_eq!(value["data"]["id"], opp.id().as_uuid().to_string());
        assert_eq!(value["data"]["symbol"], "BTCUSDT");
    }

    #[test]
    fn event_symbol_and_id_accessors() {
        let opp = ArbitrageOpportunity::new(
            OpportunityId::generate(),
            Symbol::new("ETHUSDT"),
            vec![make_calc("binance", "bybit", dec!(0.003), dec!(-0.001))],
            Utc::now(),
        );
        let id = opp.id();

        let detected = OpportunityEvent::detected(opp);
        assert_eq!(detected.symbol().as_str(), "ETHUSDT");
        assert_eq!(detected.opportunity_id(), id);
    }
}
