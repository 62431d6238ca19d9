//! Error handling for the ATT protocol
use super::constants::*;
use super::transport::TransportError;
use thiserror::Error;

/// ATT error codes as they appear in an Error Response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttErrorCode {
    /// Invalid handle
    InvalidHandle,
    /// Read not permitted
    ReadNotPermitted,
    /// Write not permitted
    WriteNotPermitted,
    /// Invalid PDU
    InvalidPdu,
    /// Request not supported
    RequestNotSupported,
    /// Attribute not found
    AttributeNotFound,
    /// Unlikely error
    Unlikely,
    /// Unsupported group type
    UnsupportedGroupType,
    /// Any code this server neither emits nor interprets
    Unknown(u8),
}

impl From<u8> for AttErrorCode {
    fn from(code: u8) -> Self {
        match code {
            ATT_ERROR_INVALID_HANDLE => AttErrorCode::InvalidHandle,
            ATT_ERROR_READ_NOT_PERMITTED => AttErrorCode::ReadNotPermitted,
            ATT_ERROR_WRITE_NOT_PERMITTED => AttErrorCode::WriteNotPermitted,
            ATT_ERROR_INVALID_PDU => AttErrorCode::InvalidPdu,
            ATT_ERROR_REQUEST_NOT_SUPPORTED => AttErrorCode::RequestNotSupported,
            ATT_ERROR_ATTRIBUTE_NOT_FOUND => AttErrorCode::AttributeNotFound,
            ATT_ERROR_UNLIKELY => AttErrorCode::Unlikely,
            ATT_ERROR_UNSUPPORTED_GROUP_TYPE => AttErrorCode::UnsupportedGroupType,
            _ => AttErrorCode::Unknown(code),
        }
    }
}

impl From<AttErrorCode> for u8 {
    fn from(code: AttErrorCode) -> u8 {
        match code {
            AttErrorCode::InvalidHandle => ATT_ERROR_INVALID_HANDLE,
            AttErrorCode::ReadNotPermitted => ATT_ERROR_READ_NOT_PERMITTED,
            AttErrorCode::WriteNotPermitted => ATT_ERROR_WRITE_NOT_PERMITTED,
            AttErrorCode::InvalidPdu => ATT_ERROR_INVALID_PDU,
            AttErrorCode::RequestNotSupported => ATT_ERROR_REQUEST_NOT_SUPPORTED,
            AttErrorCode::AttributeNotFound => ATT_ERROR_ATTRIBUTE_NOT_FOUND,
            AttErrorCode::Unlikely => ATT_ERROR_UNLIKELY,
            AttErrorCode::UnsupportedGroupType => ATT_ERROR_UNSUPPORTED_GROUP_TYPE,
            AttErrorCode::Unknown(code) => code,
        }
    }
}

/// Failure returned by an attribute access callback.
///
/// The server reports every callback failure on the wire as an Unlikely
/// Error; the distinction between "operation not provided" and "operation
/// attempted and failed" stays inside the integrator's code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("attribute access failed")]
pub struct AccessError;

/// ATT server error type
#[derive(Debug, Error)]
pub enum AttError {
    #[error("invalid attribute handle {0}")]
    InvalidHandle(u16),

    #[error("no attribute found at or past handle {0}")]
    AttributeNotFound(u16),

    #[error("read not permitted on handle {0}")]
    ReadNotPermitted(u16),

    #[error("write not permitted on handle {0}")]
    WriteNotPermitted(u16),

    #[error("malformed PDU")]
    InvalidPdu,

    #[error("request opcode {0:#04x} not supported")]
    RequestNotSupported(u8),

    #[error("unsupported group type in request starting at handle {0}")]
    UnsupportedGroup(u16),

    #[error("attribute access failed on handle {0}")]
    Unlikely(u16),

    #[error("no ATT channel open for connection {0}")]
    UnknownChannel(u16),

    #[error("ATT channel already open for connection {0}")]
    ChannelExists(u16),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl AttError {
    /// The wire code this error is reported with.
    pub fn to_error_code(&self) -> AttErrorCode {
        match self {
            AttError::InvalidHandle(_) => AttErrorCode::InvalidHandle,
            AttError::AttributeNotFound(_) => AttErrorCode::AttributeNotFound,
            AttError::ReadNotPermitted(_) => AttErrorCode::ReadNotPermitted,
            AttError::WriteNotPermitted(_) => AttErrorCode::WriteNotPermitted,
            AttError::InvalidPdu => AttErrorCode::InvalidPdu,
            AttError::RequestNotSupported(_) => AttErrorCode::RequestNotSupported,
            AttError::UnsupportedGroup(_) => AttErrorCode::UnsupportedGroupType,
            AttError::Unlikely(_) => AttErrorCode::Unlikely,
            AttError::UnknownChannel(_) => AttErrorCode::Unlikely,
            AttError::ChannelExists(_) => AttErrorCode::Unlikely,
            AttError::Transport(_) => AttErrorCode::Unlikely,
        }
    }

    /// The handle reported in the Error Response, if one applies.
    pub fn handle(&self) -> Option<u16> {
        match self {
            AttError::InvalidHandle(handle)
            | AttError::AttributeNotFound(handle)
            | AttError::ReadNotPermitted(handle)
            | AttError::WriteNotPermitted(handle)
            | AttError::UnsupportedGroup(handle)
            | AttError::Unlikely(handle) => Some(*handle),
            _ => None,
        }
    }
}

/// ATT result type
pub type AttResult<T> = Result<T, AttError>;
