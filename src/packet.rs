//! The boot packet: a fixed header followed by the image.
//!
//! ```text
//!  0          4          8          12
//!  +----------+----------+----------+-------------------------+
//!  |  magic   |  offset  |   size   |  payload (size bytes)   |
//!  +----------+----------+----------+-------------------------+
//! ```
//!
//! All three header words are 32-bit little endian. The magic marks the start
//! of the packet for the bootloader; `offset` is the load address on the
//! target and `size` the exact length of the payload that follows. There is no
//! escaping, no checksum and no acknowledgment: the packet is sent once, as a
//! single burst.

use std::{convert::TryFrom, fmt, fs, path::Path};

use hexplay::HexViewBuilder;
use log::{debug, info, log_enabled, Level::Debug};

use crate::error::{Error, Result};

// =============================================================================
// Public Interface
// =============================================================================

/// Synchronization word opening every packet.
pub const MAGIC: u32 = 0x9e9e_9e9e;

/// Length of the packet header in bytes.
pub const HEADER_LEN: usize = 12;

/// A boot image ready to be pushed to the target.
#[derive(Clone, Eq, PartialEq)]
pub struct Packet {
    offset: u32,
    size: u32,
    payload: Vec<u8>,
}
impl Packet {
    /// Wraps `payload` for loading at `offset`.
    ///
    /// Fails if the payload length cannot be represented in the 32-bit size
    /// field.
    pub fn new(offset: u32, payload: Vec<u8>) -> Result<Self> {
        let size = u32::try_from(payload.len()).map_err(|_| Error::ImageTooLarge {
            len: payload.len() as u64,
        })?;
        Ok(Packet {
            offset,
            size,
            payload,
        })
    }

    /// Reads the whole image file at `path` into a packet for loading at
    /// `offset`.
    pub fn from_file<P: AsRef<Path>>(path: P, offset: u32) -> Result<Self> {
        let path = path.as_ref();
        let payload = fs::read(path).map_err(|source| Error::Image {
            path: path.to_path_buf(),
            source,
        })?;
        info!(
            "Read {} bytes from `{}`, to be loaded at {:#010x}",
            payload.len(),
            path.display(),
            offset
        );
        let packet = Packet::new(offset, payload)?;

        if log_enabled!(Debug) {
            let header = packet.header();
            let view = HexViewBuilder::new(&header)
                .address_offset(0)
                .row_width(16)
                .finish();
            debug!("packet header:\n{}", view);
        }
        Ok(packet)
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Length of the payload, as written in the header.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// The serialized header: magic, offset and size.
    pub fn header(&self) -> [u8; HEADER_LEN] {
        let mut header = [0u8; HEADER_LEN];
        header[0..4].copy_from_slice(&MAGIC.to_le_bytes());
        header[4..8].copy_from_slice(&self.offset.to_le_bytes());
        header[8..12].copy_from_slice(&self.size.to_le_bytes());
        header
    }

    /// Total number of bytes that go on the wire.
    pub fn len(&self) -> usize {
        HEADER_LEN + self.payload.len()
    }

    /// Never true, the header is always there.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The packet exactly as it goes on the wire.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.len());
        bytes.extend_from_slice(&self.header());
        bytes.extend_from_slice(&self.payload);
        bytes
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("offset", &format_args!("{:#010x}", self.offset))
            .field("size", &self.size)
            .finish()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
