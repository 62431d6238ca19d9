//! Attribute Protocol (ATT) server implementation
//!
//! This module implements the server role of the Attribute Protocol: an
//! attribute table populated by the integrator, a PDU codec, and a request
//! dispatcher that answers each inbound PDU with exactly one response over
//! the integrator's transport.

pub mod constants;
pub mod error;
pub mod mtu;
pub mod server;
pub mod table;
pub mod transport;
pub mod types;

// Re-export the public API
pub use self::constants::*;
pub use self::error::{AccessError, AttError, AttErrorCode, AttResult};
pub use self::mtu::ChannelMtu;
pub use self::server::{AttServer, AttServerConfig};
pub use self::table::{AttFlags, Attribute, AttributeAccess, AttributeTable};
pub use self::transport::{AttTransport, FramingMode, TransportError};
pub use self::types::*;
