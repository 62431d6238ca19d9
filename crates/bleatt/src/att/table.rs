//! The attribute table backing the ATT server
use super::constants::*;
use super::error::AccessError;
use crate::uuid::Uuid;
use bitflags::bitflags;
use log::debug;
use std::fmt;
use std::sync::{Arc, RwLock};

bitflags! {
    /// Attribute permission flags.
    ///
    /// Stored with each attribute and reported to integrators; this layer
    /// never enforces them. Access control, when wanted, belongs in the
    /// callbacks.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AttFlags: u8 {
        const READ = 0x01;
        const WRITE = 0x02;
        const READ_ENCRYPTED = 0x04;
        const WRITE_ENCRYPTED = 0x08;
        const READ_AUTHENTICATED = 0x10;
        const WRITE_AUTHENTICATED = 0x20;
        const READ_AUTHORIZED = 0x40;
        const WRITE_AUTHORIZED = 0x80;
    }
}

impl AttFlags {
    pub fn can_read(&self) -> bool {
        self.contains(AttFlags::READ)
    }

    pub fn can_write(&self) -> bool {
        self.contains(AttFlags::WRITE)
    }
}

/// Access hooks for one attribute, supplied by the integrator.
///
/// Attribute values are never stored in the table; every Read-side request
/// fetches the current value through `read`, and Write Requests deliver the
/// incoming bytes through `write`. Both hooks are synchronous and must not
/// retain the value slice. The defaults fail, so a read-only attribute simply
/// leaves `write` unimplemented; the server answers the peer with an Unlikely
/// Error in that case.
pub trait AttributeAccess: Send + Sync {
    /// Produce the current attribute value.
    fn read(&self, handle: u16) -> Result<Vec<u8>, AccessError> {
        let _ = handle;
        Err(AccessError)
    }

    /// Accept an incoming attribute value.
    fn write(&self, handle: u16, value: &[u8]) -> Result<(), AccessError> {
        let _ = (handle, value);
        Err(AccessError)
    }
}

/// One entry of the attribute table.
#[derive(Clone)]
pub struct Attribute {
    /// Attribute handle, assigned at registration
    pub handle: u16,
    /// Attribute type
    pub uuid: Uuid,
    /// Permission flags, stored and reported only
    pub flags: AttFlags,
    access: Arc<dyn AttributeAccess>,
}

impl Attribute {
    /// Fetches the current value through the access hook.
    pub fn read_value(&self) -> Result<Vec<u8>, AccessError> {
        self.access.read(self.handle)
    }

    /// Delivers an incoming value through the access hook.
    pub fn write_value(&self, value: &[u8]) -> Result<(), AccessError> {
        self.access.write(self.handle, value)
    }
}

impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("handle", &self.handle)
            .field("uuid", &self.uuid)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

/// Ordered, append-only store of attributes, indexed by handle.
///
/// Handles are assigned sequentially from 1, so the handle space is exactly
/// `1..=len` with no gaps and iteration in table order is iteration in handle
/// order. Entries live for the lifetime of the table; nothing is removed.
pub struct AttributeTable {
    entries: RwLock<Vec<Attribute>>,
}

impl AttributeTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Appends an attribute and returns its handle.
    ///
    /// The first registration gets handle 1, each subsequent one the next
    /// handle up.
    ///
    /// # Panics
    ///
    /// Panics if the 16-bit handle space is exhausted.
    pub fn register(&self, uuid: Uuid, flags: AttFlags, access: Arc<dyn AttributeAccess>) -> u16 {
        let mut entries = self.entries.write().unwrap();
        assert!(
            entries.len() < ATT_HANDLE_MAX as usize,
            "attribute table full"
        );

        let handle = entries.len() as u16 + 1;
        entries.push(Attribute {
            handle,
            uuid,
            flags,
            access,
        });
        debug!("registered attribute {:?} as handle {}", uuid, handle);

        handle
    }

    /// Number of registered attributes.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Handle of the last registered attribute, 0 when the table is empty.
    pub fn last_handle(&self) -> u16 {
        self.entries.read().unwrap().len() as u16
    }

    /// Looks up an attribute by handle.
    pub fn find(&self, handle: u16) -> Option<Attribute> {
        if handle < ATT_HANDLE_MIN {
            return None;
        }
        self.entries
            .read()
            .unwrap()
            .get(handle as usize - 1)
            .cloned()
    }

    /// The attributes whose handles lie in `[start, end]`, in handle order.
    ///
    /// The range is clipped to the table; a single pass over the result is
    /// the scan, and calling again restarts it.
    pub fn scan(&self, start: u16, end: u16) -> Vec<Attribute> {
        let entries = self.entries.read().unwrap();
        let first = start.max(ATT_HANDLE_MIN) as usize - 1;
        let last = (end as usize).min(entries.len());
        if first >= last {
            return Vec::new();
        }
        entries[first..last].to_vec()
    }

    /// Handle and type of every attribute in `[start, end]`.
    pub fn find_information(&self, start: u16, end: u16) -> Vec<(u16, Uuid)> {
        self.scan(start, end)
            .iter()
            .map(|attr| (attr.handle, attr.uuid))
            .collect()
    }

    /// The groups started by attributes in `[start, end]` whose type is the
    /// base expansion of `attr_type` and whose current value equals `value`.
    ///
    /// For a grouping type (service declarations), each group runs to the
    /// handle just before the next declaration of that type, or to the end of
    /// the scanned range clipped to the table. Other types do not group, so
    /// the group end equals the found handle. Entries whose read hook fails
    /// never match.
    pub fn find_by_type_value(
        &self,
        start: u16,
        end: u16,
        attr_type: u16,
        value: &[u8],
    ) -> Vec<(u16, u16)> {
        let uuid = Uuid::from_u16(attr_type);
        let grouping =
            attr_type == PRIMARY_SERVICE_UUID || attr_type == SECONDARY_SERVICE_UUID;
        let entries = self.scan(start, end);
        let range_end = end.min(self.last_handle());

        let mut groups = Vec::new();
        for (i, entry) in entries.iter().enumerate() {
            if entry.uuid != uuid {
                continue;
            }
            let matches = entry.read_value().map_or(false, |v| v == value);
            if !matches {
                continue;
            }

            let group_end = if grouping {
                entries[i + 1..]
                    .iter()
                    .find(|e| e.uuid == uuid)
                    .map(|next| next.handle - 1)
                    .unwrap_or(range_end)
            } else {
                entry.handle
            };
            groups.push((entry.handle, group_end));
        }

        groups
    }

    /// The services declared in `[start, end]` by attributes of `group_type`,
    /// as `(start_handle, end_handle, service_uuid_bytes)`.
    ///
    /// A service runs from its declaration to the handle just before the next
    /// declaration of the requested type in the scanned range, else to the
    /// end of the range clipped to the table. Declarations whose read hook
    /// fails are skipped.
    pub fn group_ranges(&self, start: u16, end: u16, group_type: &Uuid) -> Vec<(u16, u16, Vec<u8>)> {
        let entries = self.scan(start, end);
        let range_end = end.min(self.last_handle());
        let declarations: Vec<&Attribute> =
            entries.iter().filter(|e| e.uuid == *group_type).collect();

        let mut services = Vec::new();
        for (i, declaration) in declarations.iter().enumerate() {
            let service_end = declarations
                .get(i + 1)
                .map(|next| next.handle - 1)
                .unwrap_or(range_end);
            match declaration.read_value() {
                Ok(value) => services.push((declaration.handle, service_end, value)),
                Err(_) => {
                    debug!(
                        "skipping unreadable service declaration at handle {}",
                        declaration.handle
                    );
                }
            }
        }

        services
    }
}

impl Default for AttributeTable {
    fn default() -> Self {
        Self::new()
    }
}
