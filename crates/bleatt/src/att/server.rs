//! ATT server: request dispatch and per-opcode handling
use super::constants::*;
use super::error::{AttError, AttResult};
use super::mtu::ChannelMtu;
use super::table::AttributeTable;
use super::transport::{AttTransport, FramingMode, TxAdapter};
use super::types::*;
use log::{debug, trace};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// ATT server configuration
#[derive(Debug, Clone)]
pub struct AttServerConfig {
    /// Local Rx MTU announced on newly opened channels
    pub mtu: u16,
}

impl Default for AttServerConfig {
    fn default() -> Self {
        Self {
            mtu: ATT_DEFAULT_MTU,
        }
    }
}

/// The server side of the Attribute Protocol.
///
/// One server instance answers requests from any number of connections
/// against a shared attribute table. Per-connection state is limited to the
/// negotiated MTU, created by [`connect`](Self::connect) and dropped by
/// [`disconnect`](Self::disconnect). Inbound PDUs enter through
/// [`receive`](Self::receive); every outbound PDU leaves through the
/// [`AttTransport`] handed in at construction.
pub struct AttServer {
    table: Arc<AttributeTable>,
    config: RwLock<AttServerConfig>,
    channels: RwLock<HashMap<u16, ChannelMtu>>,
    tx: TxAdapter,
}

impl AttServer {
    /// Creates a server over `table` transmitting bare ATT payloads.
    pub fn new(table: Arc<AttributeTable>, transport: Arc<dyn AttTransport>) -> Self {
        Self::with_framing(table, transport, FramingMode::Raw)
    }

    /// Creates a server with an explicit outbound framing mode.
    pub fn with_framing(
        table: Arc<AttributeTable>,
        transport: Arc<dyn AttTransport>,
        framing: FramingMode,
    ) -> Self {
        Self {
            table,
            config: RwLock::new(AttServerConfig::default()),
            channels: RwLock::new(HashMap::new()),
            tx: TxAdapter::new(transport, framing),
        }
    }

    /// Current configuration.
    pub fn config(&self) -> AttServerConfig {
        self.config.read().unwrap().clone()
    }

    /// Replaces the configuration. Affects channels opened afterwards.
    pub fn set_config(&self, config: AttServerConfig) {
        *self.config.write().unwrap() = config;
    }

    /// The attribute table this server answers from.
    pub fn table(&self) -> &Arc<AttributeTable> {
        &self.table
    }

    /// Opens ATT channel state for a connection.
    ///
    /// Call when the underlying L2CAP channel comes up; until then,
    /// [`receive`](Self::receive) rejects traffic for the connection.
    pub fn connect(&self, conn_id: u16) -> AttResult<()> {
        let mut channels = self.channels.write().unwrap();
        if channels.contains_key(&conn_id) {
            return Err(AttError::ChannelExists(conn_id));
        }

        let local_mtu = self.config.read().unwrap().mtu;
        channels.insert(conn_id, ChannelMtu::new(local_mtu));
        debug!("conn {}: ATT channel open, local MTU {}", conn_id, local_mtu);

        Ok(())
    }

    /// Drops the channel state of a connection.
    pub fn disconnect(&self, conn_id: u16) -> AttResult<()> {
        self.channels
            .write()
            .unwrap()
            .remove(&conn_id)
            .ok_or(AttError::UnknownChannel(conn_id))?;
        debug!("conn {}: ATT channel closed", conn_id);

        Ok(())
    }

    /// Dispatches one inbound ATT PDU.
    ///
    /// A processed request produces exactly one outbound PDU: the matching
    /// response, or an Error Response naming the request opcode, the
    /// offending handle (0 when none applies) and the error code. Command
    /// opcodes are consumed without a response, and PDUs too mangled to
    /// answer (empty input) are dropped.
    ///
    /// The returned error mirrors what went wrong for logging or metrics;
    /// when it concerns the request itself the peer has already been told,
    /// so callers need not act on it.
    pub fn receive(&self, conn_id: u16, pdu: &[u8]) -> AttResult<()> {
        let Some(&opcode) = pdu.first() else {
            debug!("conn {}: dropping empty ATT PDU", conn_id);
            return Err(AttError::InvalidPdu);
        };
        if !self.channels.read().unwrap().contains_key(&conn_id) {
            return Err(AttError::UnknownChannel(conn_id));
        }
        trace!(
            "conn {}: rx opcode {:#04x}, {} octets",
            conn_id,
            opcode,
            pdu.len()
        );

        let outcome = match opcode {
            ATT_EXCHANGE_MTU_REQ => self.handle_exchange_mtu(conn_id, pdu),
            ATT_FIND_INFO_REQ => self.handle_find_information(conn_id, pdu),
            ATT_FIND_BY_TYPE_VALUE_REQ => self.handle_find_by_type_value(conn_id, pdu),
            ATT_READ_REQ => self.handle_read(conn_id, pdu),
            ATT_READ_BY_GROUP_TYPE_REQ => self.handle_read_by_group_type(conn_id, pdu),
            ATT_WRITE_REQ => self.handle_write(pdu),
            op if op & ATT_OPCODE_COMMAND_FLAG != 0 => {
                // Commands never get a response, supported or not.
                trace!("conn {}: consuming command opcode {:#04x}", conn_id, op);
                return Ok(());
            }
            op => Err(AttError::RequestNotSupported(op)),
        };

        match outcome {
            Ok(response) => {
                self.tx.send(conn_id, &response)?;
                Ok(())
            }
            Err(error) => {
                debug!(
                    "conn {}: request {:#04x} failed: {}",
                    conn_id, opcode, error
                );
                let response = ErrorResponse::from_error(opcode, &error).serialize();
                self.tx.send(conn_id, &response)?;
                Err(error)
            }
        }
    }

    /// Effective MTU of a channel, for response sizing.
    fn effective_mtu(&self, conn_id: u16) -> AttResult<u16> {
        self.channels
            .read()
            .unwrap()
            .get(&conn_id)
            .map(ChannelMtu::effective)
            .ok_or(AttError::UnknownChannel(conn_id))
    }

    fn handle_exchange_mtu(&self, conn_id: u16, pdu: &[u8]) -> AttResult<Vec<u8>> {
        let request = ExchangeMtuRequest::parse(pdu)?;

        let mut channels = self.channels.write().unwrap();
        let channel = channels
            .get_mut(&conn_id)
            .ok_or(AttError::UnknownChannel(conn_id))?;
        let server_mtu = channel.exchange(request.client_mtu);
        debug!(
            "conn {}: MTU exchanged, peer {} -> effective {}",
            conn_id,
            channel.peer(),
            channel.effective()
        );

        Ok(ExchangeMtuResponse { server_mtu }.serialize())
    }

    fn handle_read(&self, conn_id: u16, pdu: &[u8]) -> AttResult<Vec<u8>> {
        let request = ReadRequest::parse(pdu)?;
        let attribute = self
            .table
            .find(request.handle)
            .ok_or(AttError::InvalidHandle(request.handle))?;

        let mut value = attribute
            .read_value()
            .map_err(|_| AttError::Unlikely(request.handle))?;

        // Truncate silently to what the channel can carry; never pad.
        let max_value_len = self.effective_mtu(conn_id)? as usize - 1;
        value.truncate(max_value_len);

        Ok(ReadResponse { value }.serialize())
    }

    fn handle_write(&self, pdu: &[u8]) -> AttResult<Vec<u8>> {
        let request = WriteRequest::parse(pdu)?;
        let attribute = self
            .table
            .find(request.handle)
            .ok_or(AttError::InvalidHandle(request.handle))?;

        attribute
            .write_value(&request.value)
            .map_err(|_| AttError::Unlikely(request.handle))?;

        Ok(WriteResponse.serialize())
    }

    fn handle_find_information(&self, conn_id: u16, pdu: &[u8]) -> AttResult<Vec<u8>> {
        let request = FindInformationRequest::parse(pdu)?;
        if request.start_handle == 0 || request.start_handle > request.end_handle {
            return Err(AttError::InvalidHandle(request.start_handle));
        }

        let info = self
            .table
            .find_information(request.start_handle, request.end_handle);
        if info.is_empty() {
            return Err(AttError::AttributeNotFound(request.start_handle));
        }

        // The first entry in range decides the response format; entries of
        // the other width end the response early.
        let sixteen_bit = info[0].1.as_u16().is_some();
        let (format, pair_size) = if sixteen_bit {
            (ATT_FIND_INFO_RSP_FORMAT_16BIT, 4)
        } else {
            (ATT_FIND_INFO_RSP_FORMAT_128BIT, 18)
        };

        let mtu = self.effective_mtu(conn_id)? as usize;
        let mut pairs = Vec::new();
        let mut size = 2;
        for (handle, uuid) in info {
            if size + pair_size > mtu {
                break;
            }
            match uuid.as_u16() {
                Some(alias) if sixteen_bit => pairs.push(HandleUuidPair::Uuid16(handle, alias)),
                None if !sixteen_bit => pairs.push(HandleUuidPair::Uuid128(handle, uuid)),
                _ => break,
            }
            size += pair_size;
        }

        Ok(FindInformationResponse {
            format,
            information_data: pairs,
        }
        .serialize())
    }

    fn handle_find_by_type_value(&self, conn_id: u16, pdu: &[u8]) -> AttResult<Vec<u8>> {
        let request = FindByTypeValueRequest::parse(pdu)?;
        if request.start_handle == 0 || request.start_handle > request.end_handle {
            return Err(AttError::InvalidHandle(request.start_handle));
        }

        let groups = self.table.find_by_type_value(
            request.start_handle,
            request.end_handle,
            request.attribute_type,
            &request.attribute_value,
        );
        if groups.is_empty() {
            return Err(AttError::AttributeNotFound(request.start_handle));
        }

        let mtu = self.effective_mtu(conn_id)? as usize;
        let max_pairs = (mtu - 1) / 4;
        let handles = groups
            .into_iter()
            .take(max_pairs)
            .map(|(found_handle, group_end_handle)| HandleRange {
                found_handle,
                group_end_handle,
            })
            .collect();

        Ok(FindByTypeValueResponse { handles }.serialize())
    }

    fn handle_read_by_group_type(&self, conn_id: u16, pdu: &[u8]) -> AttResult<Vec<u8>> {
        let request = ReadByGroupTypeRequest::parse(pdu)?;
        if request.start_handle == 0 || request.start_handle > request.end_handle {
            return Err(AttError::InvalidHandle(request.start_handle));
        }
        match request.group_type.as_u16() {
            Some(PRIMARY_SERVICE_UUID) | Some(SECONDARY_SERVICE_UUID) => {}
            _ => return Err(AttError::UnsupportedGroup(request.start_handle)),
        }

        let services = self.table.group_ranges(
            request.start_handle,
            request.end_handle,
            &request.group_type,
        );
        if services.is_empty() {
            return Err(AttError::AttributeNotFound(request.start_handle));
        }

        // The first service fixes the entry length; services whose UUID
        // width differs are left for a follow-up request.
        let entry_len = 4 + services[0].2.len();
        let mtu = self.effective_mtu(conn_id)? as usize;
        let mut data = Vec::new();
        let mut size = 2;
        for (start_handle, end_handle, value) in services {
            if 4 + value.len() != entry_len {
                continue;
            }
            if size + entry_len > mtu {
                break;
            }
            data.push(GroupEntry {
                start_handle,
                end_handle,
                value,
            });
            size += entry_len;
        }

        Ok(ReadByGroupTypeResponse {
            length: entry_len as u8,
            data,
        }
        .serialize())
    }
}
