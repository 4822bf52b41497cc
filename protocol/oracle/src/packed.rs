//! Fixed-capacity strings packed into 31-byte chunks.

use alloc::string::String;
use alloc::vec::Vec;

use codec::{Decode, DecodeWithMemTracking, Encode, MaxEncodedLen};
use scale_info::TypeInfo;
use serde::{Deserialize, Serialize};

#[cfg(feature = "std")]
use thiserror::Error;

/// Bytes per chunk.
pub const CHUNK_BYTES: usize = 31;
/// Chunks per packed string.
pub const PACKED_CHUNKS: usize = 2;
/// Longest string a [`PackedString`] can hold.
pub const PACKED_CAPACITY: usize = CHUNK_BYTES * PACKED_CHUNKS;

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Error))]
pub enum PackedStringError {
    #[cfg_attr(feature = "std", error("string of {actual} bytes exceeds capacity {max}"))]
    TooLong { max: usize, actual: usize },
    #[cfg_attr(feature = "std", error("string contains a NUL byte"))]
    InteriorNul,
    #[cfg_attr(feature = "std", error("packed bytes are not valid UTF-8"))]
    InvalidUtf8,
}

#[cfg(not(feature = "std"))]
impl core::fmt::Display for PackedStringError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PackedStringError::TooLong { max, actual } => {
                write!(f, "string of {} bytes exceeds capacity {}", actual, max)
            }
            PackedStringError::InteriorNul => write!(f, "string contains a NUL byte"),
            PackedStringError::InvalidUtf8 => write!(f, "packed bytes are not valid UTF-8"),
        }
    }
}

/// UTF-8 string stored as a fixed number of zero padded chunks.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Encode,
    Decode,
    DecodeWithMemTracking,
    MaxEncodedLen,
    TypeInfo,
    Serialize,
    Deserialize,
)]
pub struct PackedString {
    chunks: [[u8; CHUNK_BYTES]; PACKED_CHUNKS],
}

/// Content pointer (an IPFS CID) for the price history blob.
pub type IpfsPointer = PackedString;

impl PackedString {
    pub fn pack(value: &str) -> Result<Self, PackedStringError> {
        let bytes = value.as_bytes();
        if bytes.len() > PACKED_CAPACITY {
            return Err(PackedStringError::TooLong {
                max: PACKED_CAPACITY,
                actual: bytes.len(),
            });
        }
        if bytes.contains(&0) {
            return Err(PackedStringError::InteriorNul);
        }
        let mut chunks = [[0u8; CHUNK_BYTES]; PACKED_CHUNKS];
        for (chunk, piece) in chunks.iter_mut().zip(bytes.chunks(CHUNK_BYTES)) {
            chunk[..piece.len()].copy_from_slice(piece);
        }
        Ok(Self { chunks })
    }

    pub fn unpack(&self) -> Result<String, PackedStringError> {
        let bytes: Vec<u8> = self
            .chunks
            .iter()
            .flatten()
            .copied()
            .take_while(|b| *b != 0)
            .collect();
        String::from_utf8(bytes).map_err(|_| PackedStringError::InvalidUtf8)
    }

    pub fn chunks(&self) -> &[[u8; CHUNK_BYTES]; PACKED_CHUNKS] {
        &self.chunks
    }

    pub fn is_empty(&self) -> bool {
        self.chunks[0][0] == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CID: &str = "bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi";

    #[test]
    fn packs_and_unpacks_a_cid() {
        let packed = PackedString::pack(CID).unwrap();
        assert_eq!(packed.unpack().unwrap(), CID);
        assert!(!packed.is_empty());
        assert_eq!(&packed.chunks()[0][..], &CID.as_bytes()[..CHUNK_BYTES]);
    }

    #[test]
    fn default_is_empty() {
        assert!(PackedString::default().is_empty());
        assert_eq!(PackedString::default().unpack().unwrap(), "");
    }

    #[test]
    fn rejects_oversized_and_nul() {
        let long = "x".repeat(PACKED_CAPACITY + 1);
        assert_eq!(
            PackedString::pack(&long),
            Err(PackedStringError::TooLong {
                max: PACKED_CAPACITY,
                actual: PACKED_CAPACITY + 1
            })
        );
        assert_eq!(PackedString::pack("a\0b"), Err(PackedStringError::InteriorNul));
        assert!(PackedString::pack(&"y".repeat(PACKED_CAPACITY)).is_ok());
    }
}
