//! Original and working document buffers.
//!
//! Byte ranges are offsets into one specific serialization of a document.
//! [`OriginalBuffer`] is the immutable snapshot taken at load time and is what
//! signatures are verified against. [`WorkingBuffer`] is the single mutable
//! copy the signing flow rewrites; it can only be edited in place at a fixed
//! length and is handed out as plain bytes once the signature is embedded.

use crate::error::{Error, Result};
use bytes::Bytes;

/// Immutable snapshot of a document as loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalBuffer {
    bytes: Bytes,
}

impl OriginalBuffer {
    /// Wrap loaded bytes.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Borrow the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Copy into a fresh working buffer with `extra` bytes appended. The
    /// snapshot itself is never touched.
    pub fn to_working(&self, extra: &[u8]) -> WorkingBuffer {
        let mut bytes = Vec::with_capacity(self.bytes.len() + extra.len());
        bytes.extend_from_slice(&self.bytes);
        bytes.extend_from_slice(extra);
        WorkingBuffer { bytes }
    }
}

impl AsRef<[u8]> for OriginalBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Fixed-length mutable buffer used while a signature is being embedded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingBuffer {
    bytes: Vec<u8>,
}

impl WorkingBuffer {
    /// Borrow the current bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Overwrite `replacement.len()` bytes at `offset`. The buffer length
    /// never changes.
    pub fn overwrite(&mut self, offset: usize, replacement: &[u8]) -> Result<()> {
        let end = offset
            .checked_add(replacement.len())
            .filter(|end| *end <= self.bytes.len())
            .ok_or(Error::ByteRangeOutOfBounds {
                end: offset.saturating_add(replacement.len()),
                len: self.bytes.len(),
            })?;
        self.bytes[offset..end].copy_from_slice(replacement);
        Ok(())
    }

    /// Finish editing and hand out the raw bytes.
    pub fn into_vec(self) -> Vec<u8> {
        self.bytes
    }
}
