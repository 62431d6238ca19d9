//! Minimal L2CAP basic-mode framing
//!
//! Channel management, fragmentation and flow control live outside this
//! crate; all the ATT server ever needs from L2CAP is the 4-octet basic
//! header in front of an outbound PDU when the integrator's transport
//! expects framed buffers.
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

/// Octets in the basic L2CAP header.
pub const L2CAP_BASIC_HEADER_SIZE: usize = 4;

/// L2CAP basic header: payload length and channel ID, both little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct L2capHeader {
    /// Length of the payload in bytes
    pub length: u16,
    /// Channel identifier
    pub channel_id: u16,
}

impl L2capHeader {
    pub fn new(length: u16, channel_id: u16) -> Self {
        Self { length, channel_id }
    }

    /// Parses a header from the front of `data`.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < L2CAP_BASIC_HEADER_SIZE {
            return None;
        }

        let mut cursor = Cursor::new(data);
        let length = cursor.read_u16::<LittleEndian>().ok()?;
        let channel_id = cursor.read_u16::<LittleEndian>().ok()?;

        Some(Self { length, channel_id })
    }

    /// Serializes the header.
    pub fn to_bytes(&self) -> [u8; L2CAP_BASIC_HEADER_SIZE] {
        let mut result = [0u8; L2CAP_BASIC_HEADER_SIZE];
        let mut cursor = Cursor::new(&mut result[..]);

        cursor.write_u16::<LittleEndian>(self.length).unwrap();
        cursor.write_u16::<LittleEndian>(self.channel_id).unwrap();

        result
    }
}

/// Wraps `payload` in a basic L2CAP frame for `channel_id`.
pub fn frame(channel_id: u16, payload: &[u8]) -> Vec<u8> {
    let header = L2capHeader::new(payload.len() as u16, channel_id);
    let mut packet = Vec::with_capacity(L2CAP_BASIC_HEADER_SIZE + payload.len());
    packet.extend_from_slice(&header.to_bytes());
    packet.extend_from_slice(payload);
    packet
}
