//! Outbound path from the server to the integrator's send function
use super::constants::ATT_CID;
use super::error::AttResult;
use crate::l2cap;
use log::trace;
use std::sync::Arc;
use thiserror::Error;

/// Failure reported by an [`AttTransport`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("transmit failed: {0}")]
pub struct TransportError(pub String);

impl TransportError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// The integrator-supplied send function.
///
/// Called once per outbound PDU with the connection the PDU belongs to.
/// Whether the buffer is a bare ATT payload or a framed L2CAP packet is
/// decided by the server's [`FramingMode`].
pub trait AttTransport: Send + Sync {
    fn transmit(&self, conn_id: u16, pdu: &[u8]) -> Result<(), TransportError>;
}

/// How outbound buffers are presented to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FramingMode {
    /// Hand over the bare ATT payload; the layer below does its own framing.
    #[default]
    Raw,
    /// Prepend the basic L2CAP header for the ATT channel (CID 0x0004).
    Basic,
}

/// Applies the framing mode and hands the buffer to the transport.
pub(crate) struct TxAdapter {
    transport: Arc<dyn AttTransport>,
    framing: FramingMode,
}

impl TxAdapter {
    pub fn new(transport: Arc<dyn AttTransport>, framing: FramingMode) -> Self {
        Self { transport, framing }
    }

    pub fn send(&self, conn_id: u16, pdu: &[u8]) -> AttResult<()> {
        trace!(
            "conn {}: tx opcode {:#04x}, {} octets",
            conn_id,
            pdu.first().copied().unwrap_or(0),
            pdu.len()
        );
        match self.framing {
            FramingMode::Raw => self.transport.transmit(conn_id, pdu)?,
            FramingMode::Basic => {
                let framed = l2cap::frame(ATT_CID, pdu);
                self.transport.transmit(conn_id, &framed)?;
            }
        }
        Ok(())
    }
}
