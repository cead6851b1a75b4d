//! # Persistence Format
//!
//! Binary framing shared by ledger snapshots and the fixture checkpoint.
//!
//! Format: Header (5 bytes) + postcard-serialized payload.
//! - 4 bytes: Magic ("STKL")
//! - 1 byte: Version
//!
//! ## Validation
//!
//! Size limits and the header are checked before the payload is handed to
//! postcard, so corrupted or oversized input never reaches the decoder.

use crate::primitives::{FORMAT_VERSION, HEADER_LEN, MAGIC_BYTES, MAX_FRAMED_SIZE};
use crate::types::LedgerError;
use serde::Serialize;
use serde::de::DeserializeOwned;

// =============================================================================
// FILE HEADER
// =============================================================================

/// The header that precedes every framed payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistenceHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl PersistenceHeader {
    /// Create a new header with current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *MAGIC_BYTES,
            version: FORMAT_VERSION,
        }
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        if &self.magic != MAGIC_BYTES {
            return Err(LedgerError::Serialization(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != FORMAT_VERSION {
            return Err(LedgerError::Serialization(format!(
                "Unsupported version: {} (expected {})",
                self.version, FORMAT_VERSION
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LedgerError> {
        if bytes.len() < HEADER_LEN {
            return Err(LedgerError::Serialization(
                "Header too short".to_string(),
            ));
        }
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[0..4]);
        Ok(Self {
            magic,
            version: bytes[4],
        })
    }
}

impl Default for PersistenceHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SERIALIZATION FUNCTIONS
// =============================================================================

/// Serialize `value` behind a format header. No file I/O.
pub fn encode_framed<T: Serialize>(value: &T) -> Result<Vec<u8>, LedgerError> {
    let payload =
        postcard::to_stdvec(value).map_err(|e| LedgerError::Serialization(e.to_string()))?;

    if payload.len() + HEADER_LEN > MAX_FRAMED_SIZE {
        return Err(LedgerError::Serialization(format!(
            "Payload too large: {} bytes (max {})",
            payload.len(),
            MAX_FRAMED_SIZE - HEADER_LEN
        )));
    }

    let mut result = Vec::with_capacity(HEADER_LEN + payload.len());
    result.extend_from_slice(&PersistenceHeader::new().to_bytes());
    result.extend_from_slice(&payload);
    Ok(result)
}

/// Validate the header and size, then decode the payload. No file I/O.
pub fn decode_framed<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, LedgerError> {
    if bytes.len() > MAX_FRAMED_SIZE {
        return Err(LedgerError::Serialization(format!(
            "Data too large: {} bytes (max {})",
            bytes.len(),
            MAX_FRAMED_SIZE
        )));
    }

    let header = PersistenceHeader::from_bytes(bytes)?;
    header.validate()?;

    postcard::from_bytes(&bytes[HEADER_LEN..])
        .map_err(|e| LedgerError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_roundtrip() {
        let header = PersistenceHeader::new();
        let bytes = header.to_bytes();
        assert_eq!(&bytes[0..4], b"STKL");
        assert_eq!(PersistenceHeader::from_bytes(&bytes).expect("parse"), header);
    }

    #[test]
    fn framed_value_decodes() {
        let value = (7u64, String::from("custody"));
        let bytes = encode_framed(&value).expect("encode");
        assert_eq!(&bytes[..4], MAGIC_BYTES);

        let decoded: (u64, String) = decode_framed(&bytes).expect("decode");
        assert_eq!(decoded, value);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = encode_framed(&1u8).expect("encode");
        bytes[0] = b'X';
        assert!(decode_framed::<u8>(&bytes).is_err());
    }

    #[test]
    fn rejects_unknown_version() {
        let mut bytes = encode_framed(&1u8).expect("encode");
        bytes[4] = FORMAT_VERSION + 1;
        let err = decode_framed::<u8>(&bytes);
        assert!(matches!(err, Err(LedgerError::Serialization(msg)) if msg.contains("version")));
    }

    #[test]
    fn rejects_short_input() {
        assert!(decode_framed::<u8>(b"STK").is_err());
        assert!(decode_framed::<u8>(&[]).is_err());
    }

    #[test]
    fn rejects_truncated_payload() {
        let bytes = encode_framed(&(1u64, 2u64, String::from("payload"))).expect("encode");
        let truncated = &bytes[..bytes.len() - 3];
        assert!(decode_framed::<(u64, u64, String)>(truncated).is_err());
    }
}
