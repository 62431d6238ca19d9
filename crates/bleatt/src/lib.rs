//! bleatt - the server side of the Bluetooth Attribute Protocol
//!
//! This library implements an ATT server core: a handle-indexed attribute
//! table, a byte-exact codec for the request/response PDUs, and a dispatcher
//! that resolves each inbound PDU against the table and emits the response
//! or error response. Transport concerns (HCI, L2CAP channels, connection
//! lifecycle) stay outside; the integrator feeds inbound payloads to
//! [`AttServer::receive`] and supplies an [`AttTransport`] for outbound ones.
//!
//! Attribute values are never stored here. Each registration carries an
//! [`AttributeAccess`] implementation, and the server fetches or delivers
//! values through it while answering Read, Write, Find By Type Value and
//! Read By Group Type requests.

pub mod att;
pub mod l2cap;
pub mod uuid;

// Re-export common types for convenience
pub use att::{
    AccessError, AttError, AttErrorCode, AttFlags, AttResult, AttServer, AttServerConfig,
    AttTransport, Attribute, AttributeAccess, AttributeTable, FramingMode, TransportError,
};
pub use uuid::Uuid;
