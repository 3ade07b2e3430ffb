//! Demo binary protocol parser.
//!
//! Little-endian frames with a fixed 4-byte header:
//!
//! ```text
//! offset 0  u16  message_length (whole frame, header included)
//! offset 2  u8   message_type
//! offset 3  u8   reserved
//! ```
//!
//! A full body carries symbol(8) seq(8) price(8) qty(8) side(1);
//! shorter frames (heartbeats) are header-only.

use super::{ParseError, Parser};
use crate::event::{EventType, MarketEvent, Side, Symbol};
use crate::time::cycles_now;

const HEADER_LEN: usize = 4;
const FULL_BODY_LEN: usize = HEADER_LEN + 8 + 8 + 8 + 8 + 1;

pub struct BinaryParser {
    venue_id: u32,
}

impl BinaryParser {
    pub fn new(venue_id: u32) -> Self {
        Self { venue_id }
    }
}

impl Parser for BinaryParser {
    fn parse(&self, buf: &[u8], event: &mut MarketEvent) -> Result<usize, ParseError> {
        if buf.len() < HEADER_LEN {
            return Ok(0);
        }

        let message_length = u16::from_le_bytes([buf[0], buf[1]]) as usize;
        if message_length < HEADER_LEN {
            return Err(ParseError::Malformed("frame length below header size"));
        }
        if buf.len() < message_length {
            return Ok(0); // incomplete frame
        }

        event.venue_id = self.venue_id;
        event.receive_timestamp = cycles_now();
        event.event_type = EventType::from_u8(buf[2]);

        if message_length >= FULL_BODY_LEN {
            let body = &buf[HEADER_LEN..];
            let mut sym = [0u8; 8];
            sym.copy_from_slice(&body[0..8]);
            event.symbol = Symbol(sym);
            event.sequence_number = u64::from_le_bytes(body[8..16].try_into().unwrap());
            event.price = i64::from_le_bytes(body[16..24].try_into().unwrap());
            event.quantity = i64::from_le_bytes(body[24..32].try_into().unwrap());
            event.side = Side::from_u8(body[32]);
        }

        Ok(message_length)
    }

    fn name(&self) -> &'static str {
        "Binary"
    }
}
