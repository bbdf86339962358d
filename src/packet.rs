//! Trade packet model and its fixed 17-byte wire layout.
//!
//! Layout: `[symbol:4 ascii][side:1 ascii][quantity:i32 BE][price:i32 BE][sequence:i32 BE]`.
//! The serde field names are the ones emitted in the output document.
use serde::{Deserialize, Serialize};

/// Size of one response record on the wire.
pub const PACKET_LEN: usize = 17;

const SYMBOL_LEN: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Packet {
    /// Four ASCII characters, kept exactly as received (no trimming).
    pub symbol: String,
    /// Buy/sell indicator, opaque.
    #[serde(rename = "BuySellIndicator")]
    pub side: char,
    pub quantity: i32,
    pub price: i32,
    /// Server-assigned sequence number.
    pub sequence: i32,
}

impl Packet {
    pub fn new(symbol: &str, side: char, quantity: i32, price: i32, sequence: i32) -> Self {
        Self { symbol: symbol.to_string(), side, quantity, price, sequence }
    }

    /// Decode a complete record. Non-ASCII bytes in the text fields become `?`.
    pub fn from_wire(buf: &[u8; PACKET_LEN]) -> Self {
        let ascii = |b: u8| if b.is_ascii() { b as char } else { '?' };
        let read_i32 = |off: usize| -> i32 { let mut tmp = [0u8; 4]; tmp.copy_from_slice(&buf[off..off + 4]); i32::from_be_bytes(tmp) };

        let symbol = buf[..SYMBOL_LEN].iter().copied().map(ascii).collect();
        let side = ascii(buf[4]);
        Self { symbol, side, quantity: read_i32(5), price: read_i32(9), sequence: read_i32(13) }
    }

    /// Encode into the wire layout. The symbol is space padded or cut to four
    /// bytes and non-ASCII characters are written as `?`.
    pub fn to_wire(&self) -> [u8; PACKET_LEN] {
        let mut buf = [b' '; PACKET_LEN];
        for (dst, c) in buf[..SYMBOL_LEN].iter_mut().zip(self.symbol.chars()) {
            *dst = if c.is_ascii() { c as u8 } else { b'?' };
        }
        buf[4] = if self.side.is_ascii() { self.side as u8 } else { b'?' };
        buf[5..9].copy_from_slice(&self.quantity.to_be_bytes());
        buf[9..13].copy_from_slice(&self.price.to_be_bytes());
        buf[13..17].copy_from_slice(&self.sequence.to_be_bytes());
        buf
    }
}
