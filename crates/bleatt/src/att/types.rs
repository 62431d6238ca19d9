//! Wire types for the ATT protocol
//!
//! One struct per PDU, each parsing from and serializing to the exact octet
//! layout of the Attribute Protocol. All multi-byte fields are little-endian.
use super::constants::*;
use super::error::{AttError, AttErrorCode, AttResult};
use crate::uuid::Uuid;
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

/// An ATT protocol data unit.
///
/// `parse` consumes the whole PDU including the opcode octet and fails with
/// [`AttError::InvalidPdu`] when the buffer is shorter than the opcode's
/// minimum or an embedded length disagrees with the remaining size.
pub trait AttPacket: Sized {
    /// Opcode carried in the first octet.
    const OPCODE: u8;

    /// Parse a PDU from bytes.
    fn parse(data: &[u8]) -> AttResult<Self>;

    /// Serialize the PDU to bytes.
    fn serialize(&self) -> Vec<u8>;
}

/// Error Response: `req_opcode(1) handle(2) error_code(1)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Opcode of the request that failed
    pub request_opcode: u8,
    /// Attribute handle in error, 0 when none applies
    pub handle: u16,
    /// Error code
    pub error_code: AttErrorCode,
}

impl AttPacket for ErrorResponse {
    const OPCODE: u8 = ATT_ERROR_RSP;

    fn parse(data: &[u8]) -> AttResult<Self> {
        if data.len() != 5 || data[0] != Self::OPCODE {
            return Err(AttError::InvalidPdu);
        }

        let request_opcode = data[1];
        let mut cursor = Cursor::new(&data[2..]);
        let handle = cursor
            .read_u16::<LittleEndian>()
            .map_err(|_| AttError::InvalidPdu)?;
        let error_code = data[4].into();

        Ok(Self {
            request_opcode,
            handle,
            error_code,
        })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(5);

        packet.push(Self::OPCODE);
        packet.push(self.request_opcode);
        packet.extend_from_slice(&self.handle.to_le_bytes());
        packet.push(self.error_code.into());

        packet
    }
}

impl ErrorResponse {
    /// Builds the Error Response answering `request_opcode` with `error`.
    pub fn from_error(request_opcode: u8, error: &AttError) -> Self {
        Self {
            request_opcode,
            handle: error.handle().unwrap_or(0),
            error_code: error.to_error_code(),
        }
    }
}

/// Exchange MTU Request: `client_rx_mtu(2)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeMtuRequest {
    /// Client Rx MTU size
    pub client_mtu: u16,
}

impl AttPacket for ExchangeMtuRequest {
    const OPCODE: u8 = ATT_EXCHANGE_MTU_REQ;

    fn parse(data: &[u8]) -> AttResult<Self> {
        if data.len() != 3 || data[0] != Self::OPCODE {
            return Err(AttError::InvalidPdu);
        }

        let mut cursor = Cursor::new(&data[1..]);
        let client_mtu = cursor
            .read_u16::<LittleEndian>()
            .map_err(|_| AttError::InvalidPdu)?;

        Ok(Self { client_mtu })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(3);

        packet.push(Self::OPCODE);
        packet.extend_from_slice(&self.client_mtu.to_le_bytes());

        packet
    }
}

/// Exchange MTU Response: `server_rx_mtu(2)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeMtuResponse {
    /// Server Rx MTU size
    pub server_mtu: u16,
}

impl AttPacket for ExchangeMtuResponse {
    const OPCODE: u8 = ATT_EXCHANGE_MTU_RSP;

    fn parse(data: &[u8]) -> AttResult<Self> {
        if data.len() != 3 || data[0] != Self::OPCODE {
            return Err(AttError::InvalidPdu);
        }

        let mut cursor = Cursor::new(&data[1..]);
        let server_mtu = cursor
            .read_u16::<LittleEndian>()
            .map_err(|_| AttError::InvalidPdu)?;

        Ok(Self { server_mtu })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(3);

        packet.push(Self::OPCODE);
        packet.extend_from_slice(&self.server_mtu.to_le_bytes());

        packet
    }
}

/// Find Information Request: `start(2) end(2)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindInformationRequest {
    /// First requested handle
    pub start_handle: u16,
    /// Last requested handle
    pub end_handle: u16,
}

impl AttPacket for FindInformationRequest {
    const OPCODE: u8 = ATT_FIND_INFO_REQ;

    fn parse(data: &[u8]) -> AttResult<Self> {
        if data.len() != 5 || data[0] != Self::OPCODE {
            return Err(AttError::InvalidPdu);
        }

        let mut cursor = Cursor::new(&data[1..]);
        let start_handle = cursor
            .read_u16::<LittleEndian>()
            .map_err(|_| AttError::InvalidPdu)?;
        let end_handle = cursor
            .read_u16::<LittleEndian>()
            .map_err(|_| AttError::InvalidPdu)?;

        Ok(Self {
            start_handle,
            end_handle,
        })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(5);

        packet.push(Self::OPCODE);
        packet.extend_from_slice(&self.start_handle.to_le_bytes());
        packet.extend_from_slice(&self.end_handle.to_le_bytes());

        packet
    }
}

/// A handle/UUID pair in a Find Information Response.
///
/// The pair width is dictated by the response's format octet; a single
/// response never mixes widths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleUuidPair {
    /// 16-bit alias entry
    Uuid16(u16, u16),
    /// Full 128-bit entry
    Uuid128(u16, Uuid),
}

/// Find Information Response: `format(1) (handle(2) uuid(2 or 16))*`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindInformationResponse {
    /// Format of the information data
    pub format: u8,
    /// Handle/UUID pairs, in handle order
    pub information_data: Vec<HandleUuidPair>,
}

impl AttPacket for FindInformationResponse {
    const OPCODE: u8 = ATT_FIND_INFO_RSP;

    fn parse(data: &[u8]) -> AttResult<Self> {
        if data.len() < 2 || data[0] != Self::OPCODE {
            return Err(AttError::InvalidPdu);
        }

        let format = data[1];
        let information_data = Self::parse_pairs(format, &data[2..])?;

        Ok(Self {
            format,
            information_data,
        })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::new();

        packet.push(Self::OPCODE);
        packet.push(self.format);

        for pair in &self.information_data {
            match pair {
                HandleUuidPair::Uuid16(handle, alias) => {
                    packet.extend_from_slice(&handle.to_le_bytes());
                    packet.extend_from_slice(&alias.to_le_bytes());
                }
                HandleUuidPair::Uuid128(handle, uuid) => {
                    packet.extend_from_slice(&handle.to_le_bytes());
                    packet.extend_from_slice(uuid.as_bytes_le());
                }
            }
        }

        packet
    }
}

impl FindInformationResponse {
    fn parse_pairs(format: u8, data: &[u8]) -> AttResult<Vec<HandleUuidPair>> {
        let pair_size = match format {
            ATT_FIND_INFO_RSP_FORMAT_16BIT => 4,
            ATT_FIND_INFO_RSP_FORMAT_128BIT => 18,
            _ => return Err(AttError::InvalidPdu),
        };
        if data.is_empty() || data.len() % pair_size != 0 {
            return Err(AttError::InvalidPdu);
        }

        let mut pairs = Vec::with_capacity(data.len() / pair_size);
        for chunk in data.chunks_exact(pair_size) {
            let handle = u16::from_le_bytes([chunk[0], chunk[1]]);
            if format == ATT_FIND_INFO_RSP_FORMAT_16BIT {
                let alias = u16::from_le_bytes([chunk[2], chunk[3]]);
                pairs.push(HandleUuidPair::Uuid16(handle, alias));
            } else {
                let mut uuid_bytes = [0u8; 16];
                uuid_bytes.copy_from_slice(&chunk[2..18]);
                pairs.push(HandleUuidPair::Uuid128(handle, Uuid::from_bytes_le(uuid_bytes)));
            }
        }

        Ok(pairs)
    }
}

/// Find By Type Value Request: `start(2) end(2) attr_type(2) value(n)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindByTypeValueRequest {
    /// First requested handle
    pub start_handle: u16,
    /// Last requested handle
    pub end_handle: u16,
    /// Attribute type, always a 16-bit alias on the wire
    pub attribute_type: u16,
    /// Attribute value to match, byte-for-byte
    pub attribute_value: Vec<u8>,
}

impl AttPacket for FindByTypeValueRequest {
    const OPCODE: u8 = ATT_FIND_BY_TYPE_VALUE_REQ;

    fn parse(data: &[u8]) -> AttResult<Self> {
        if data.len() < 7 || data[0] != Self::OPCODE {
            return Err(AttError::InvalidPdu);
        }

        let mut cursor = Cursor::new(&data[1..]);
        let start_handle = cursor
            .read_u16::<LittleEndian>()
            .map_err(|_| AttError::InvalidPdu)?;
        let end_handle = cursor
            .read_u16::<LittleEndian>()
            .map_err(|_| AttError::InvalidPdu)?;
        let attribute_type = cursor
            .read_u16::<LittleEndian>()
            .map_err(|_| AttError::InvalidPdu)?;
        let attribute_value = data[7..].to_vec();

        Ok(Self {
            start_handle,
            end_handle,
            attribute_type,
            attribute_value,
        })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(7 + self.attribute_value.len());

        packet.push(Self::OPCODE);
        packet.extend_from_slice(&self.start_handle.to_le_bytes());
        packet.extend_from_slice(&self.end_handle.to_le_bytes());
        packet.extend_from_slice(&self.attribute_type.to_le_bytes());
        packet.extend_from_slice(&self.attribute_value);

        packet
    }
}

/// A found-handle/group-end pair in a Find By Type Value Response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleRange {
    /// Handle of the matching attribute
    pub found_handle: u16,
    /// Last handle of the group it starts
    pub group_end_handle: u16,
}

/// Find By Type Value Response: `(found(2) group_end(2))+`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindByTypeValueResponse {
    /// Handle ranges, in handle order
    pub handles: Vec<HandleRange>,
}

impl AttPacket for FindByTypeValueResponse {
    const OPCODE: u8 = ATT_FIND_BY_TYPE_VALUE_RSP;

    fn parse(data: &[u8]) -> AttResult<Self> {
        if data.len() < 5 || data[0] != Self::OPCODE || (data.len() - 1) % 4 != 0 {
            return Err(AttError::InvalidPdu);
        }

        let mut handles = Vec::with_capacity((data.len() - 1) / 4);
        for chunk in data[1..].chunks_exact(4) {
            handles.push(HandleRange {
                found_handle: u16::from_le_bytes([chunk[0], chunk[1]]),
                group_end_handle: u16::from_le_bytes([chunk[2], chunk[3]]),
            });
        }

        Ok(Self { handles })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(1 + self.handles.len() * 4);

        packet.push(Self::OPCODE);
        for range in &self.handles {
            packet.extend_from_slice(&range.found_handle.to_le_bytes());
            packet.extend_from_slice(&range.group_end_handle.to_le_bytes());
        }

        packet
    }
}

/// Read Request: `handle(2)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadRequest {
    /// Handle to read
    pub handle: u16,
}

impl AttPacket for ReadRequest {
    const OPCODE: u8 = ATT_READ_REQ;

    fn parse(data: &[u8]) -> AttResult<Self> {
        if data.len() != 3 || data[0] != Self::OPCODE {
            return Err(AttError::InvalidPdu);
        }

        let mut cursor = Cursor::new(&data[1..]);
        let handle = cursor
            .read_u16::<LittleEndian>()
            .map_err(|_| AttError::InvalidPdu)?;

        Ok(Self { handle })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(3);

        packet.push(Self::OPCODE);
        packet.extend_from_slice(&self.handle.to_le_bytes());

        packet
    }
}

/// Read Response: `value(<= mtu - 1)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadResponse {
    /// Attribute value, possibly truncated by the server
    pub value: Vec<u8>,
}

impl AttPacket for ReadResponse {
    const OPCODE: u8 = ATT_READ_RSP;

    fn parse(data: &[u8]) -> AttResult<Self> {
        if data.is_empty() || data[0] != Self::OPCODE {
            return Err(AttError::InvalidPdu);
        }

        Ok(Self {
            value: data[1..].to_vec(),
        })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(1 + self.value.len());

        packet.push(Self::OPCODE);
        packet.extend_from_slice(&self.value);

        packet
    }
}

/// Read By Group Type Request: `start(2) end(2) group_type(2 or 16)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadByGroupTypeRequest {
    /// First requested handle
    pub start_handle: u16,
    /// Last requested handle
    pub end_handle: u16,
    /// Grouping attribute type
    pub group_type: Uuid,
}

impl AttPacket for ReadByGroupTypeRequest {
    const OPCODE: u8 = ATT_READ_BY_GROUP_TYPE_REQ;

    fn parse(data: &[u8]) -> AttResult<Self> {
        if data.len() < 7 || data[0] != Self::OPCODE {
            return Err(AttError::InvalidPdu);
        }

        let mut cursor = Cursor::new(&data[1..]);
        let start_handle = cursor
            .read_u16::<LittleEndian>()
            .map_err(|_| AttError::InvalidPdu)?;
        let end_handle = cursor
            .read_u16::<LittleEndian>()
            .map_err(|_| AttError::InvalidPdu)?;

        // The UUID width is implied by the PDU length: 7 octets total for a
        // 16-bit type, 21 for a 128-bit type. Anything else is malformed.
        let group_type = match data.len() {
            7 => {
                let alias = u16::from_le_bytes([data[5], data[6]]);
                Uuid::from_u16(alias)
            }
            21 => {
                let mut uuid_bytes = [0u8; 16];
                uuid_bytes.copy_from_slice(&data[5..21]);
                Uuid::from_bytes_le(uuid_bytes)
            }
            _ => return Err(AttError::InvalidPdu),
        };

        Ok(Self {
            start_handle,
            end_handle,
            group_type,
        })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::new();

        packet.push(Self::OPCODE);
        packet.extend_from_slice(&self.start_handle.to_le_bytes());
        packet.extend_from_slice(&self.end_handle.to_le_bytes());

        if let Some(alias) = self.group_type.as_u16() {
            packet.extend_from_slice(&alias.to_le_bytes());
        } else {
            packet.extend_from_slice(self.group_type.as_bytes_le());
        }

        packet
    }
}

/// One service entry in a Read By Group Type Response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupEntry {
    /// Handle of the service declaration
    pub start_handle: u16,
    /// Last handle belonging to the service
    pub end_handle: u16,
    /// Value of the declaration attribute (the service UUID)
    pub value: Vec<u8>,
}

/// Read By Group Type Response: `length(1) (start(2) end(2) uuid(length-4))+`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadByGroupTypeResponse {
    /// Octet length of each entry
    pub length: u8,
    /// Service entries, in handle order
    pub data: Vec<GroupEntry>,
}

impl AttPacket for ReadByGroupTypeResponse {
    const OPCODE: u8 = ATT_READ_BY_GROUP_TYPE_RSP;

    fn parse(data: &[u8]) -> AttResult<Self> {
        if data.len() < 2 || data[0] != Self::OPCODE {
            return Err(AttError::InvalidPdu);
        }

        let length = data[1] as usize;
        if length < 6 || data.len() == 2 || (data.len() - 2) % length != 0 {
            return Err(AttError::InvalidPdu);
        }

        let mut entries = Vec::with_capacity((data.len() - 2) / length);
        for chunk in data[2..].chunks_exact(length) {
            entries.push(GroupEntry {
                start_handle: u16::from_le_bytes([chunk[0], chunk[1]]),
                end_handle: u16::from_le_bytes([chunk[2], chunk[3]]),
                value: chunk[4..].to_vec(),
            });
        }

        Ok(Self {
            length: length as u8,
            data: entries,
        })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::new();

        packet.push(Self::OPCODE);
        packet.push(self.length);

        for entry in &self.data {
            packet.extend_from_slice(&entry.start_handle.to_le_bytes());
            packet.extend_from_slice(&entry.end_handle.to_le_bytes());
            packet.extend_from_slice(&entry.value);
        }

        packet
    }
}

/// Write Request: `handle(2) value(n)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest {
    /// Handle to write
    pub handle: u16,
    /// Value to write
    pub value: Vec<u8>,
}

impl AttPacket for WriteRequest {
    const OPCODE: u8 = ATT_WRITE_REQ;

    fn parse(data: &[u8]) -> AttResult<Self> {
        if data.len() < 3 || data[0] != Self::OPCODE {
            return Err(AttError::InvalidPdu);
        }

        let mut cursor = Cursor::new(&data[1..]);
        let handle = cursor
            .read_u16::<LittleEndian>()
            .map_err(|_| AttError::InvalidPdu)?;
        let value = data[3..].to_vec();

        Ok(Self { handle, value })
    }

    fn serialize(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(3 + self.value.len());

        packet.push(Self::OPCODE);
        packet.extend_from_slice(&self.handle.to_le_bytes());
        packet.extend_from_slice(&self.value);

        packet
    }
}

/// Write Response: bare opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteResponse;

impl AttPacket for WriteResponse {
    const OPCODE: u8 = ATT_WRITE_RSP;

    fn parse(data: &[u8]) -> AttResult<Self> {
        if data.len() != 1 || data[0] != Self::OPCODE {
            return Err(AttError::InvalidPdu);
        }

        Ok(Self)
    }

    fn serialize(&self) -> Vec<u8> {
        vec![Self::OPCODE]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_buffers_are_malformed() {
        assert!(matches!(
            ExchangeMtuRequest::parse(&[ATT_EXCHANGE_MTU_REQ, 0x17]),
            Err(AttError::InvalidPdu)
        ));
        assert!(matches!(
            FindInformationRequest::parse(&[ATT_FIND_INFO_REQ, 1, 0, 2]),
            Err(AttError::InvalidPdu)
        ));
        assert!(matches!(ReadRequest::parse(&[]), Err(AttError::InvalidPdu)));
    }

    #[test]
    fn group_type_width_is_implied_by_length() {
        let req = ReadByGroupTypeRequest::parse(&[0x10, 0x01, 0x00, 0xFF, 0xFF, 0x00, 0x28]).unwrap();
        assert_eq!(req.group_type.as_u16(), Some(0x2800));

        let mut long = vec![0x10, 0x01, 0x00, 0xFF, 0xFF];
        long.extend_from_slice(Uuid::from_u16(0x2800).as_bytes_le());
        let req = ReadByGroupTypeRequest::parse(&long).unwrap();
        assert_eq!(req.group_type.as_u16(), Some(0x2800));

        // 8 octets fits neither the 16-bit nor the 128-bit layout.
        assert!(matches!(
            ReadByGroupTypeRequest::parse(&[0x10, 1, 0, 0xFF, 0xFF, 0, 0x28, 0xAA]),
            Err(AttError::InvalidPdu)
        ));
    }

    #[test]
    fn response_element_lengths_must_divide_payload() {
        // 5 trailing octets cannot hold whole 4-octet handle ranges.
        assert!(matches!(
            FindByTypeValueResponse::parse(&[0x07, 1, 0, 5, 0, 9]),
            Err(AttError::InvalidPdu)
        ));

        // length octet of 6, but 8 octets of entries.
        assert!(matches!(
            ReadByGroupTypeResponse::parse(&[0x11, 6, 1, 0, 5, 0, 0x22, 0x11, 6, 0]),
            Err(AttError::InvalidPdu)
        ));
    }

    #[test]
    fn error_response_round_trips_unknown_codes() {
        let rsp = ErrorResponse::parse(&[0x01, 0x0A, 0x10, 0x00, 0x80]).unwrap();
        assert_eq!(rsp.error_code, AttErrorCode::Unknown(0x80));
        assert_eq!(rsp.serialize(), vec![0x01, 0x0A, 0x10, 0x00, 0x80]);
    }
}
