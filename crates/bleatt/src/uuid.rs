use std::fmt;
use std::str::FromStr;

/// A 128-bit Bluetooth UUID.
///
/// Attribute types are always 128 bits wide internally; SIG-assigned 16-bit
/// aliases are expanded into the Bluetooth Base UUID on construction and
/// recovered with [`Uuid::as_u16`]. Bytes are stored in little-endian order,
/// matching how UUIDs appear on the wire.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Uuid {
    bytes: [u8; 16],
}

/// The Bluetooth Base UUID, "00000000-0000-1000-8000-00805F9B34FB",
/// little-endian. 16-bit aliases occupy octets 12-13.
const BASE_UUID_BYTES: [u8; 16] = [
    0xFB, 0x34, 0x9B, 0x5F, 0x80, 0x00, 0x00, 0x80, 0x00, 0x10, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Offset of the alias octets within the base UUID.
const BASE_OFFSET: usize = 12;

impl Uuid {
    /// Creates a UUID directly from 16 little-endian bytes.
    pub const fn from_bytes_le(bytes: [u8; 16]) -> Self {
        Uuid { bytes }
    }

    /// Creates a UUID from 16 big-endian bytes (the textual ordering).
    pub fn from_bytes_be(mut bytes: [u8; 16]) -> Self {
        bytes.reverse();
        Uuid { bytes }
    }

    /// Expands a SIG-assigned 16-bit alias into the base UUID.
    pub const fn from_u16(uuid16: u16) -> Self {
        let mut bytes = BASE_UUID_BYTES;
        bytes[BASE_OFFSET] = uuid16 as u8;
        bytes[BASE_OFFSET + 1] = (uuid16 >> 8) as u8;
        Uuid { bytes }
    }

    /// Builds a UUID from a little-endian slice of 2 (alias) or 16 bytes.
    ///
    /// Returns `None` for any other length.
    pub fn try_from_slice_le(slice: &[u8]) -> Option<Self> {
        match slice.len() {
            2 => Some(Uuid::from_u16(u16::from_le_bytes([slice[0], slice[1]]))),
            16 => {
                let mut bytes = [0u8; 16];
                bytes.copy_from_slice(slice);
                Some(Uuid::from_bytes_le(bytes))
            }
            _ => None,
        }
    }

    /// The underlying 16 bytes, little-endian.
    pub const fn as_bytes_le(&self) -> &[u8; 16] {
        &self.bytes
    }

    /// The underlying 16 bytes, big-endian.
    pub fn as_bytes_be(&self) -> [u8; 16] {
        let mut bytes = self.bytes;
        bytes.reverse();
        bytes
    }

    /// Reduces the UUID to its 16-bit alias.
    ///
    /// Succeeds iff every octet outside the alias position matches the
    /// Bluetooth Base UUID; all other UUIDs are 128-bit only.
    pub fn as_u16(&self) -> Option<u16> {
        if self.bytes[..BASE_OFFSET] == BASE_UUID_BYTES[..BASE_OFFSET]
            && self.bytes[BASE_OFFSET + 2] == 0
            && self.bytes[BASE_OFFSET + 3] == 0
        {
            Some(u16::from_le_bytes([
                self.bytes[BASE_OFFSET],
                self.bytes[BASE_OFFSET + 1],
            ]))
        } else {
            None
        }
    }
}

impl From<u16> for Uuid {
    fn from(uuid16: u16) -> Self {
        Uuid::from_u16(uuid16)
    }
}

impl From<[u8; 16]> for Uuid {
    /// Bytes are taken as little-endian.
    fn from(bytes: [u8; 16]) -> Self {
        Uuid::from_bytes_le(bytes)
    }
}

impl PartialEq<u16> for Uuid {
    fn eq(&self, other: &u16) -> bool {
        self.as_u16() == Some(*other)
    }
}

impl PartialEq<Uuid> for u16 {
    fn eq(&self, other: &Uuid) -> bool {
        other.as_u16() == Some(*self)
    }
}

impl PartialEq<[u8; 16]> for Uuid {
    fn eq(&self, other: &[u8; 16]) -> bool {
        &self.bytes == other
    }
}

impl<'a> PartialEq<&'a [u8]> for Uuid {
    fn eq(&self, other: &&'a [u8]) -> bool {
        Uuid::try_from_slice_le(other).map_or(false, |uuid| *self == uuid)
    }
}

impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Standard hyphenated big-endian form.
        let b = self.as_bytes_be();
        write!(
            f,
            "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
            b[8], b[9], b[10], b[11], b[12], b[13], b[14], b[15]
        )
    }
}

impl fmt::Debug for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(alias) = self.as_u16() {
            write!(f, "Uuid(0x{:04X})", alias)
        } else {
            fmt::Display::fmt(self, f)
        }
    }
}

/// Error produced when parsing a UUID from text.
#[derive(Debug)]
pub enum UuidParseError {
    InvalidLength,
    InvalidFormat,
    HexError(hex::FromHexError),
}

impl From<hex::FromHexError> for UuidParseError {
    fn from(err: hex::FromHexError) -> Self {
        UuidParseError::HexError(err)
    }
}

impl FromStr for Uuid {
    type Err = UuidParseError;

    /// Accepts the 4-digit short form ("2800") and the full 32-digit form,
    /// with or without hyphens.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned: String = s.chars().filter(|c| c.is_ascii_hexdigit()).collect();

        match cleaned.len() {
            4 => {
                let alias = u16::from_str_radix(&cleaned, 16)
                    .map_err(|_| UuidParseError::InvalidFormat)?;
                Ok(Uuid::from_u16(alias))
            }
            32 => {
                let mut bytes_be = [0u8; 16];
                hex::decode_to_slice(&cleaned, &mut bytes_be)?;
                Ok(Uuid::from_bytes_be(bytes_be))
            }
            _ => Err(UuidParseError::InvalidLength),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_expands_into_base_uuid() {
        let uuid = Uuid::from_u16(0x2800);
        let mut expected = BASE_UUID_BYTES;
        expected[12] = 0x00;
        expected[13] = 0x28;
        assert_eq!(*uuid.as_bytes_le(), expected);
        assert_eq!(uuid.as_u16(), Some(0x2800));
    }

    #[test]
    fn non_base_uuid_has_no_alias() {
        let uuid = Uuid::from_bytes_le([1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16]);
        assert_eq!(uuid.as_u16(), None);

        // Alias octets alone are not enough; octets 14-15 must be zero too.
        let mut bytes = BASE_UUID_BYTES;
        bytes[14] = 0x01;
        assert_eq!(Uuid::from_bytes_le(bytes).as_u16(), None);
    }

    #[test]
    fn slice_construction_accepts_2_and_16_bytes() {
        assert_eq!(
            Uuid::try_from_slice_le(&[0x0f, 0x00]),
            Some(Uuid::from_u16(0x000f))
        );
        assert!(Uuid::try_from_slice_le(&[1, 2, 3]).is_none());
    }

    #[test]
    fn parses_short_and_long_text_forms() {
        let short: Uuid = "180A".parse().unwrap();
        assert_eq!(short.as_u16(), Some(0x180A));

        let long: Uuid = "0000180a-0000-1000-8000-00805f9b34fb".parse().unwrap();
        assert_eq!(long, short);
    }
}
