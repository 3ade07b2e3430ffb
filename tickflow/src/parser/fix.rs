//! Simplified FIX parser.
//!
//! Frame shape: `8=FIX.4.2|9=len|35=type|...|10=checksum|` where `|`
//! is SOH (0x01). Only the tags the data plane needs are extracted:
//! 35 (type), 34 (sequence), 55 (symbol), 44 (price), 38 (quantity).

use super::{parse_fixed_point, parse_int, ParseError, Parser};
use crate::event::{EventType, MarketEvent, Symbol};
use crate::time::cycles_now;

const SOH: u8 = 0x01;

/// Minimum bytes before a frame can possibly be complete.
const MIN_FRAME: usize = 20;

pub struct FixParser {
    venue_id: u32,
}

impl FixParser {
    pub fn new(venue_id: u32) -> Self {
        Self { venue_id }
    }

    /// Find the end of the frame: the SOH terminating the `10=` field.
    fn frame_end(buf: &[u8]) -> Option<usize> {
        let mut pos = 0;
        while pos < buf.len() {
            let soh = buf[pos..].iter().position(|&b| b == SOH)? + pos;
            if buf[soh + 1..].starts_with(b"10=") {
                let end = buf[soh + 1..].iter().position(|&b| b == SOH)? + soh + 1;
                return Some(end + 1);
            }
            pos = soh + 1;
        }
        None
    }
}

impl Parser for FixParser {
    fn parse(&self, buf: &[u8], event: &mut MarketEvent) -> Result<usize, ParseError> {
        if buf.len() < MIN_FRAME {
            return Ok(0);
        }
        if !buf.starts_with(b"8=FIX") {
            return Err(ParseError::Malformed("missing FIX begin string"));
        }

        let frame_len = match Self::frame_end(buf) {
            Some(len) => len,
            None => return Ok(0), // checksum field not yet buffered
        };
        let frame = &buf[..frame_len];

        event.venue_id = self.venue_id;
        event.receive_timestamp = cycles_now();

        for field in frame.split(|&b| b == SOH) {
            let eq = match field.iter().position(|&b| b == b'=') {
                Some(eq) => eq,
                None => continue,
            };
            let (tag, value) = (&field[..eq], &field[eq + 1..]);
            match tag {
                b"35" => {
                    event.event_type = match value.first() {
                        Some(b'D') => EventType::Trade,
                        Some(b'W') => EventType::BookUpdate,
                        Some(b'0') => EventType::Heartbeat,
                        _ => EventType::Unknown,
                    };
                }
                b"34" => event.sequence_number = parse_int(value) as u64,
                b"55" => {
                    let mut sym = [0u8; 8];
                    let n = value.len().min(8);
                    sym[..n].copy_from_slice(&value[..n]);
                    event.symbol = Symbol(sym);
                }
                b"44" => event.price = parse_fixed_point(value),
                b"38" => event.quantity = parse_fixed_point(value),
                _ => {}
            }
        }

        Ok(frame_len)
    }

    fn name(&self) -> &'static str {
        "FIX"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRADE: &[u8] =
        b"8=FIX.4.2\x019=52\x0135=D\x0134=7\x0155=AAPL\x0144=150.25\x0138=100\x0110=123\x01";

    #[test]
    fn test_parse_trade() {
        let parser = FixParser::new(3);
        let mut event = MarketEvent::default();

        let consumed = parser.parse(TRADE, &mut event).unwrap();
        assert_eq!(consumed, TRADE.len());
        assert_eq!(event.event_type, EventType::Trade);
        assert_eq!(event.sequence_number, 7);
        assert_eq!(event.symbol, Symbol::new("AAPL"));
        assert_eq!(event.price, 150_2500_0000);
        assert_eq!(event.quantity, 100_0000_0000);
        assert_eq!(event.venue_id, 3);
        assert!(event.receive_timestamp > 0);
    }

    #[test]
    fn test_incomplete_frame() {
        let parser = FixParser::new(1);
        let mut event = MarketEvent::default();

        // Short buffer.
        assert_eq!(parser.parse(b"8=FIX.4.2\x01", &mut event).unwrap(), 0);
        // Long enough but no checksum field yet.
        let partial = &TRADE[..TRADE.len() - 8];
        assert_eq!(parser.parse(partial, &mut event).unwrap(), 0);
    }

    #[test]
    fn test_malformed_frame() {
        let parser = FixParser::new(1);
        let mut event = MarketEvent::default();

        let garbage = b"GET / HTTP/1.1\r\nHost: x\r\n\r\n";
        assert_eq!(
            parser.parse(garbage, &mut event),
            Err(ParseError::Malformed("missing FIX begin string"))
        );
    }

    #[test]
    fn test_heartbeat_and_unknown_types() {
        let parser = FixParser::new(1);
        let mut event = MarketEvent::default();

        let hb = b"8=FIX.4.2\x019=12\x0135=0\x0134=9\x0110=001\x01";
        parser.parse(hb, &mut event).unwrap();
        assert_eq!(event.event_type, EventType::Heartbeat);

        let odd = b"8=FIX.4.2\x019=12\x0135=Z\x0134=9\x0110=001\x01";
        parser.parse(odd, &mut event).unwrap();
        assert_eq!(event.event_type, EventType::Unknown);
    }

    #[test]
    fn test_trailing_bytes_not_consumed() {
        let parser = FixParser::new(1);
        let mut event = MarketEvent::default();

        let mut buf = TRADE.to_vec();
        buf.extend_from_slice(b"8=FIX.4.2\x01");
        let consumed = parser.parse(&buf, &mut event).unwrap();
        assert_eq!(consumed, TRADE.len());
    }

    #[test]
    fn test_name() {
        assert_eq!(FixParser::new(1).name(), "FIX");
    }
}
