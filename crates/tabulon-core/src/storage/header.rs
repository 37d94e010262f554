use xxhash_rust::xxh64::xxh64;

use crate::error::StorageError;

/// Magic bytes identifying a Tabulon store file.
pub const MAGIC: &[u8; 4] = b"TBLS";

/// Current store file format version.
pub const VERSION: u32 = 1;

/// Size of the fixed header preceding the payload.
pub const HEADER_SIZE: usize = 32;

/// Fixed header at the start of every store file.
///
/// Layout:
/// ```text
/// [0..4]   magic: "TBLS" (4 bytes)
/// [4..8]   version: u32 (1) little-endian
/// [8..16]  payload_len: u64 little-endian
/// [16..24] xxhash64 checksum of the payload, little-endian
/// [24..32] reserved (zero)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreHeader {
    pub payload_len: u64,
    pub checksum: u64,
}

impl StoreHeader {
    /// Header describing `payload`.
    pub fn for_payload(payload: &[u8]) -> Self {
        Self {
            payload_len: payload.len() as u64,
            checksum: xxh64(payload, 0),
        }
    }

    pub fn write_to(&self, buf: &mut [u8; HEADER_SIZE]) {
        buf.fill(0);
        buf[0..4].copy_from_slice(MAGIC);
        buf[4..8].copy_from_slice(&VERSION.to_le_bytes());
        buf[8..16].copy_from_slice(&self.payload_len.to_le_bytes());
        buf[16..24].copy_from_slice(&self.checksum.to_le_bytes());
    }

    /// Parse and validate magic and version. The checksum is checked by
    /// [`verify_payload`](Self::verify_payload).
    pub fn read_from(store: &str, buf: &[u8]) -> Result<Self, StorageError> {
        if buf.len() < HEADER_SIZE {
            return Err(StorageError::Corrupted {
                store: store.to_string(),
                reason: format!("file is {} bytes, shorter than the header", buf.len()),
            });
        }
        if &buf[0..4] != MAGIC {
            return Err(StorageError::InvalidMagic(store.to_string()));
        }
        let version = u32::from_le_bytes(read_array(&buf[4..8]));
        if version != VERSION {
            return Err(StorageError::UnsupportedVersion(version));
        }
        Ok(Self {
            payload_len: u64::from_le_bytes(read_array(&buf[8..16])),
            checksum: u64::from_le_bytes(read_array(&buf[16..24])),
        })
    }

    /// Check `payload` against the recorded length and checksum.
    pub fn verify_payload(&self, store: &str, payload: &[u8]) -> Result<(), StorageError> {
        if payload.len() as u64 != self.payload_len {
            return Err(StorageError::Corrupted {
                store: store.to_string(),
                reason: format!(
                    "payload length mismatch: header={}, actual={}",
                    self.payload_len,
                    payload.len()
                ),
            });
        }
        let computed = xxh64(payload, 0);
        if computed != self.checksum {
            return Err(StorageError::Corrupted {
                store: store.to_string(),
                reason: format!(
                    "checksum mismatch: stored={:#018x}, computed={computed:#018x}",
                    self.checksum
                ),
            });
        }
        Ok(())
    }
}

/// Prefix `payload` with its header.
pub fn encode_file(payload: &[u8]) -> Vec<u8> {
    let mut header = [0u8; HEADER_SIZE];
    StoreHeader::for_payload(payload).write_to(&mut header);
    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    out.extend_from_slice(&header);
    out.extend_from_slice(payload);
    out
}

/// Validate a whole store file and return its payload.
pub fn decode_file<'a>(store: &str, bytes: &'a [u8]) -> Result<&'a [u8], StorageError> {
    let header = StoreHeader::read_from(store, bytes)?;
    let payload = &bytes[HEADER_SIZE..];
    header.verify_payload(store, payload)?;
    Ok(payload)
}

fn read_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    out
}
