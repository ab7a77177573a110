//! Auction events for off-chain indexers.
//!
//! Every state change of the engine emits one event into a bounded
//! `EventLog`. Events carry a content hash (SHA-256 of their bincode
//! encoding) so indexers can deduplicate and chain them.

use serde::{Deserialize, Serialize};

use crate::core::token::{Holdings, TokenAmount, UsdValue};
use crate::error::{Error, Result};
use crate::utils::constants::DEFAULT_MAX_EVENTS;
use crate::utils::crypto::{Address, Hash};
use crate::utils::math::Ratio;

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// All engine event types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuctionEvent {
    // Auction lifecycle
    /// A position was put up for auction
    AuctionStarted {
        nonce: u64,
        owner: Address,
        initiator: Address,
        total_collateral_value: UsdValue,
        total_debt_value: UsdValue,
        timestamp: u64,
    },
    /// A bidder claimed a slice of an auction
    BidFilled {
        nonce: u64,
        bidder: Address,
        delta_ratio: Ratio,
        filled_ratio: Ratio,
        debt_paid: UsdValue,
        stable_burned: TokenAmount,
        timestamp: u64,
    },
    /// The first bidder paid the initiator bonus
    InitiatorPaid {
        nonce: u64,
        initiator: Address,
        bidder: Address,
        amount: u128,
    },
    /// An auction reached its maximum ratio
    AuctionClosed {
        nonce: u64,
        owner: Address,
        refunded: Holdings,
        timestamp: u64,
    },

    // Administration
    /// A configuration value changed
    ConfigChanged {
        parameter: String,
        old_value: String,
        new_value: String,
        changed_by: Address,
        timestamp: u64,
    },
    /// An account joined the admin set
    AdminAdded { account: Address, timestamp: u64 },
    /// An account left the admin set
    AdminRemoved { account: Address, timestamp: u64 },
    /// The owner role moved
    OwnershipTransferred {
        previous: Address,
        new_owner: Address,
        timestamp: u64,
    },
    /// Liquidations and bids were suspended
    Paused { by: Address, timestamp: u64 },
    /// Liquidations and bids resumed
    Unpaused { by: Address, timestamp: u64 },
}

impl AuctionEvent {
    /// Get event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::AuctionStarted { .. } => "AuctionStarted",
            Self::BidFilled { .. } => "BidFilled",
            Self::InitiatorPaid { .. } => "InitiatorPaid",
            Self::AuctionClosed { .. } => "AuctionClosed",
            Self::ConfigChanged { .. } => "ConfigChanged",
            Self::AdminAdded { .. } => "AdminAdded",
            Self::AdminRemoved { .. } => "AdminRemoved",
            Self::OwnershipTransferred { .. } => "OwnershipTransferred",
            Self::Paused { .. } => "Paused",
            Self::Unpaused { .. } => "Unpaused",
        }
    }

    /// Auction nonce this event belongs to, if any
    pub fn nonce(&self) -> Option<u64> {
        match self {
            Self::AuctionStarted { nonce, .. }
            | Self::BidFilled { nonce, .. }
            | Self::InitiatorPaid { nonce, .. }
            | Self::AuctionClosed { nonce, .. } => Some(*nonce),
            _ => None,
        }
    }

    /// Compute event hash
    pub fn hash(&self) -> Hash {
        let data = bincode::serialize(self).unwrap_or_default();
        Hash::sha256(&data)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT LOG
// ═══════════════════════════════════════════════════════════════════════════════

/// Event with its position in the emission sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Sequence number, starting at 1, never reused
    pub sequence: u64,
    /// The event
    pub event: AuctionEvent,
}

/// Bounded, append-only event log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLog {
    records: Vec<EventRecord>,
    max_events: usize,
    emitted: u64,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_EVENTS)
    }
}

impl EventLog {
    /// Create an empty log keeping at most `max_events` records
    pub fn new(max_events: usize) -> Self {
        Self {
            records: Vec::new(),
            max_events: max_events.max(1),
            emitted: 0,
        }
    }

    /// Append an event (with pruning) and return its sequence number
    pub fn push(&mut self, event: AuctionEvent) -> u64 {
        self.emitted += 1;
        self.records.push(EventRecord {
            sequence: self.emitted,
            event,
        });

        if self.records.len() > self.max_events {
            self.records.drain(0..self.records.len() - self.max_events);
        }
        self.emitted
    }

    /// Retained records, oldest first
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Retained records emitted after `sequence`
    pub fn since(&self, sequence: u64) -> &[EventRecord] {
        let start = self.records.partition_point(|r| r.sequence <= sequence);
        &self.records[start..]
    }

    /// Retained events of a specific type
    pub fn filter_by_type(&self, event_type: &str) -> Vec<&AuctionEvent> {
        self.records
            .iter()
            .map(|r| &r.event)
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Retained events of one auction
    pub fn for_auction(&self, nonce: u64) -> Vec<&AuctionEvent> {
        self.records
            .iter()
            .map(|r| &r.event)
            .filter(|e| e.nonce() == Some(nonce))
            .collect()
    }

    /// Total events ever emitted (including pruned ones)
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Number of retained records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Hash chain over the retained events
    pub fn digest(&self) -> Hash {
        self.records.iter().fold(Hash::zero(), |acc, record| {
            let mut data = acc.as_bytes().to_vec();
            data.extend_from_slice(record.event.hash().as_bytes());
            Hash::sha256(&data)
        })
    }

    /// Serialize to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| Error::Deserialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(nonce: u64) -> AuctionEvent {
        AuctionEvent::AuctionStarted {
            nonce,
            owner: Address::from_label("borrower"),
            initiator: Address::from_label("keeper"),
            total_collateral_value: UsdValue::from_dollars(100),
            total_debt_value: UsdValue::from_dollars(80),
            timestamp: 1_000,
        }
    }

    #[test]
    fn test_event_type_and_nonce() {
        let event = started(3);
        assert_eq!(event.event_type(), "AuctionStarted");
        assert_eq!(event.nonce(), Some(3));

        let paused = AuctionEvent::Paused {
            by: Address::from_label("admin"),
            timestamp: 0,
        };
        assert_eq!(paused.nonce(), None);
    }

    #[test]
    fn test_event_hash_is_content_based() {
        assert_eq!(started(1).hash(), started(1).hash());
        assert_ne!(started(1).hash(), started(2).hash());
    }

    #[test]
    fn test_log_pruning_keeps_sequence() {
        let mut log = EventLog::new(2);
        for nonce in 1..=3 {
            log.push(started(nonce));
        }

        assert_eq!(log.len(), 2);
        assert_eq!(log.emitted(), 3);
        assert_eq!(log.records()[0].sequence, 2);
        assert_eq!(log.since(2).len(), 1);
        assert!(log.for_auction(1).is_empty());
    }

    #[test]
    fn test_filter_by_type() {
        let mut log = EventLog::default();
        log.push(started(1));
        log.push(AuctionEvent::AdminAdded {
            account: Address::from_label("admin"),
            timestamp: 0,
        });

        assert_eq!(log.filter_by_type("AuctionStarted").len(), 1);
        assert_eq!(log.filter_by_type("AdminAdded").len(), 1);
        assert!(log.filter_by_type("BidFilled").is_empty());
    }

    #[test]
    fn test_log_bytes_roundtrip() {
        let mut log = EventLog::default();
        log.push(started(1));

        let restored = EventLog::from_bytes(&log.to_bytes().unwrap()).unwrap();
        assert_eq!(restored.records(), log.records());
        assert_eq!(restored.digest(), log.digest());
        assert_ne!(log.digest(), Hash::zero());
    }
}
