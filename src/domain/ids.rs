//! Domain identifier types with proper encapsulation.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Trading symbol - newtype for type safety.
///
/// The inner String is private to ensure all construction goes through
/// the defined constructors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Symbol(String);

impl Symbol {
    /// Create a new Symbol from a string.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    /// Get the symbol as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Exchange identifier - newtype for type safety.
///
/// Ordered so that equal-profit pairs can be tie-broken by lexical
/// (long, short) order deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExchangeId(String);

impl ExchangeId {
    /// Create a new ExchangeId from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the exchange ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ExchangeId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for ExchangeId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// User identifier - newtype for type safety.
///
/// Supplied by the (external) authentication layer; the engine treats it
/// as an opaque ownership key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Create a new UserId from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the user ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Tracking identifier backed by a v4 UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackingId(Uuid);

impl TrackingId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for TrackingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for TrackingId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Opportunity identifier backed by a v4 UUID.
///
/// Minted when a symbol transitions to Active; a re-activation after
/// expiry mints a new one rather than resurrecting a published id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OpportunityId(Uuid);

impl OpportunityId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for OpportunityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for OpportunityId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_new_and_as_str() {
        let symbol = Symbol::new("BTCUSDT");
        assert_eq!(symbol.as_str(), "BTCUSDT");
    }

    #[test]
    fn symbol_display() {
        let symbol = Symbol::new("ETHUSDT");
        assert_eq!(format!("{}", symbol), "ETHUSDT");
    }

    #[test]
    fn exchange_id_from_str() {
        let id = ExchangeId::from("binance");
        assert_eq!(id.as_str(), "binance");
    }

    #[test]
    fn exchange_id_lexical_order() {
        assert!(ExchangeId::new("binance") < ExchangeId::new("bybit"));
        assert!(ExchangeId::new("bybit") < ExchangeId::new("okx"));
    }

    #[test]
    fn user_id_from_string() {
        let id = UserId::from("user-1".to_string());
        assert_eq!(id.as_str(), "user-1");
    }

    #[test]
    fn tracking_ids_are_unique() {
        assert_ne!(TrackingId::generate(), TrackingId::generate());
    }

    #[test]
    fn opportunity_id_display_matches_uuid() {
        let id = OpportunityId::generate();
        assert_eq!(format!("{}", id), id.as_uuid().to_string());
    }
}
