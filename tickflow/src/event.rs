//! Normalized market event record.
//!
//! `MarketEvent` is the binary contract between parsers and the data
//! plane: exactly 64 bytes, 64-byte aligned, trivially copyable. Field
//! order is part of the contract; reordering is a breaking change.

use std::hash::{Hash, Hasher};

/// Fixed-point scale for price and quantity: real value × 10^8
pub const PRICE_SCALE: i64 = 100_000_000;

/// Event kinds carried over the data plane
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Unknown = 0,
    Trade = 1,
    Quote = 2,
    BookUpdate = 3,
    Heartbeat = 4,
    Gap = 5,
    ConnectionStatus = 6,
}

impl EventType {
    /// Decode a wire byte; anything out of range maps to `Unknown`.
    #[inline]
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Trade,
            2 => Self::Quote,
            3 => Self::BookUpdate,
            4 => Self::Heartbeat,
            5 => Self::Gap,
            6 => Self::ConnectionStatus,
            _ => Self::Unknown,
        }
    }
}

impl Default for EventType {
    fn default() -> Self {
        Self::Unknown
    }
}

/// Book side
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Unknown = 0,
    Bid = 1,
    Ask = 2,
    Both = 3,
}

impl Side {
    #[inline]
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Bid,
            2 => Self::Ask,
            3 => Self::Both,
            _ => Self::Unknown,
        }
    }
}

impl Default for Side {
    fn default() -> Self {
        Self::Unknown
    }
}

/// Opaque 8-byte instrument symbol.
///
/// Equality and hashing are identity on the 8 bytes; no termination or
/// encoding is assumed.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct Symbol(pub [u8; 8]);

impl Symbol {
    /// Build from a string, truncated to 8 bytes and zero-padded.
    pub fn new(s: &str) -> Self {
        let mut data = [0u8; 8];
        let n = s.len().min(8);
        data[..n].copy_from_slice(&s.as_bytes()[..n]);
        Self(data)
    }

    #[inline(always)]
    pub fn as_u64(&self) -> u64 {
        u64::from_ne_bytes(self.0)
    }

    #[inline(always)]
    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

impl Hash for Symbol {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.as_u64());
    }
}

impl std::fmt::Debug for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(8);
        match std::str::from_utf8(&self.0[..end]) {
            Ok(s) => write!(f, "Symbol({:?})", s),
            Err(_) => write!(f, "Symbol({:02x?})", self.0),
        }
    }
}

/// Normalized market event - exactly 64 bytes for cache efficiency.
///
/// `receive_timestamp` is the ingest cycle counter ([`crate::time::cycles_now`]);
/// `price` and `quantity` are fixed-point at [`PRICE_SCALE`].
#[repr(C, align(64))]
#[derive(Debug, Clone, Copy, Default)]
pub struct MarketEvent {
    /// Exchange-provided timestamp (nanoseconds)
    pub exchange_timestamp: u64,
    /// Local receive timestamp (cycle counter)
    pub receive_timestamp: u64,
    pub symbol: Symbol,
    pub sequence_number: u64,
    /// Price in fixed-point (real × 10^8)
    pub price: i64,
    /// Quantity in fixed-point (real × 10^8)
    pub quantity: i64,
    /// Exchange/venue identifier
    pub venue_id: u32,
    pub order_id: u32,
    pub trade_id: u32,
    pub event_type: EventType,
    pub side: Side,
    /// For book updates (0-based)
    pub book_level: u8,
    pub flags: u8,
}

// Layout is a wire contract: 8+8+8+8+8+8+4+4+4+1+1+1+1 = 64, no padding.
const _: () = assert!(std::mem::size_of::<MarketEvent>() == 64);
const _: () = assert!(std::mem::align_of::<MarketEvent>() == 64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_size_and_alignment() {
        assert_eq!(std::mem::size_of::<MarketEvent>(), 64);
        assert_eq!(std::mem::align_of::<MarketEvent>(), 64);
    }

    #[test]
    fn test_event_copy_is_bitwise() {
        let mut ev = MarketEvent::default();
        ev.symbol = Symbol::new("AAPL");
        ev.sequence_number = 42;
        ev.price = 150 * PRICE_SCALE;
        ev.event_type = EventType::Trade;
        ev.side = Side::Bid;

        let copy = ev;
        assert_eq!(copy.symbol, ev.symbol);
        assert_eq!(copy.sequence_number, 42);
        assert_eq!(copy.price, 15_000_000_000);
        assert_eq!(copy.event_type, EventType::Trade);
        assert_eq!(copy.side, Side::Bid);
    }

    #[test]
    fn test_symbol_identity() {
        let a = Symbol::new("BTCUSD");
        let b = Symbol::new("BTCUSD");
        let c = Symbol::new("ETHUSD");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_u64(), b.as_u64());
    }

    #[test]
    fn test_symbol_truncation() {
        let s = Symbol::new("VERYLONGNAME");
        assert_eq!(s.as_bytes(), b"VERYLONG");

        let short = Symbol::new("ES");
        assert_eq!(short.as_bytes(), b"ES\0\0\0\0\0\0");
    }

    #[test]
    fn test_event_type_round_trip() {
        for raw in 0..=7u8 {
            let ty = EventType::from_u8(raw);
            if raw <= 6 {
                assert_eq!(ty as u8, raw);
            } else {
                assert_eq!(ty, EventType::Unknown);
            }
        }
        assert_eq!(Side::from_u8(1), Side::Bid);
        assert_eq!(Side::from_u8(200), Side::Unknown);
    }
}
