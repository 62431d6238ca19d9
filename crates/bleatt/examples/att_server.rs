//! Example driving the ATT server entirely in memory
//!
//! Registers a few attributes, opens a channel and feeds raw ATT PDUs
//! through the server, printing every outbound PDU. No Bluetooth hardware
//! is involved; the transport just writes to stdout.

use bleatt::att::constants::PRIMARY_SERVICE_UUID;
use bleatt::{
    AccessError, AttFlags, AttServer, AttServerConfig, AttTransport, AttributeAccess,
    AttributeTable, TransportError, Uuid,
};
use std::sync::{Arc, Mutex};

/// Prints outbound PDUs instead of sending them anywhere.
struct StdoutTransport;

impl AttTransport for StdoutTransport {
    fn transmit(&self, conn_id: u16, pdu: &[u8]) -> Result<(), TransportError> {
        println!("conn {} <- {}", conn_id, hex::encode(pdu));
        Ok(())
    }
}

/// A fixed read-only value.
struct Constant(Vec<u8>);

impl AttributeAccess for Constant {
    fn read(&self, _handle: u16) -> Result<Vec<u8>, AccessError> {
        Ok(self.0.clone())
    }
}

/// A readable, writable value.
struct Stored(Mutex<Vec<u8>>);

impl AttributeAccess for Stored {
    fn read(&self, _handle: u16) -> Result<Vec<u8>, AccessError> {
        Ok(self.0.lock().unwrap().clone())
    }

    fn write(&self, handle: u16, value: &[u8]) -> Result<(), AccessError> {
        println!("handle {} written: {}", handle, hex::encode(value));
        *self.0.lock().unwrap() = value.to_vec();
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let table = Arc::new(AttributeTable::new());

    // A minimal GAP-like service: declaration plus a device-name attribute.
    let service_handle = table.register(
        Uuid::from_u16(PRIMARY_SERVICE_UUID),
        AttFlags::READ,
        Arc::new(Constant(0x1800u16.to_le_bytes().to_vec())),
    );
    let name_handle = table.register(
        Uuid::from_u16(0x2A00),
        AttFlags::READ | AttFlags::WRITE,
        Arc::new(Stored(Mutex::new(b"bleatt demo".to_vec()))),
    );
    println!(
        "registered service at handle {}, device name at handle {}",
        service_handle, name_handle
    );

    let server = AttServer::new(table, Arc::new(StdoutTransport));
    server.set_config(AttServerConfig { mtu: 64 });

    let conn = 1;
    server.connect(conn)?;

    // Exchange MTU: client announces 128, server answers with its own 64.
    server.receive(conn, &[0x02, 0x80, 0x00])?;

    // Discover services: Read By Group Type over the whole handle range.
    server.receive(conn, &[0x10, 0x01, 0x00, 0xFF, 0xFF, 0x00, 0x28])?;

    // Read and rewrite the device name.
    server.receive(conn, &[0x0A, 0x02, 0x00])?;
    let mut write = vec![0x12, 0x02, 0x00];
    write.extend_from_slice(b"renamed");
    server.receive(conn, &write)?;
    server.receive(conn, &[0x0A, 0x02, 0x00])?;

    // A read of a nonexistent handle comes back as an Error Response.
    let _ = server.receive(conn, &[0x0A, 0x63, 0x00]);

    server.disconnect(conn)?;
    Ok(())
}
