//! ByteRange calculation for PDF signatures.
//!
//! PDF digital signatures use a ByteRange array to specify which portions
//! of the document are covered by the signature. The signature itself is
//! stored in a placeholder that is excluded from the signed bytes.
//!
//! ## ByteRange Format
//!
//! The ByteRange is an array of four integers:
//! `[offset1, length1, offset2, length2]`
//!
//! Where:
//! - `offset1` = 0 (start of file)
//! - `length1` = byte offset of the `<` opening the signature value
//! - `offset2` = byte offset just past the closing `>`
//! - `length2` = remaining bytes to end of file
//!
//! A freshly inserted field carries a zero-valued declaration of fixed width
//! ([`BYTE_RANGE_PLACEHOLDER`]) and a `/Contents` hex string filled with the
//! [`PENDING_SENTINEL`] pattern. Both are rewritten in place; the document
//! length never changes once the placeholder has been serialized.

use crate::buffer::WorkingBuffer;
use crate::error::{Error, Result};
use std::fmt;

/// Fixed-width byte range declaration written into unsigned fields.
pub const BYTE_RANGE_PLACEHOLDER: &str = "/ByteRange [0 0000000000 0000000000 0000000000]";

/// Filler pattern of an unsigned `/Contents` value.
pub const PENDING_SENTINEL: [u8; 12] = [
    0xEE, 0xBE, 0xAE, 0xEE, 0xBE, 0xAE, 0xEE, 0xBE, 0xAE, 0xEE, 0xBE, 0xAE,
];

const CONTENTS_KEY: &[u8] = b"/Contents";

/// Whether a decoded `/Contents` value still holds the unsigned filler.
pub fn is_pending(contents: &[u8]) -> bool {
    contents.starts_with(&PENDING_SENTINEL)
}

/// `[offset1, length1, offset2, length2]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteRange(pub [i64; 4]);

impl ByteRange {
    /// Build a range from its four components.
    pub fn new(offset1: i64, length1: i64, offset2: i64, length2: i64) -> Self {
        Self([offset1, length1, offset2, length2])
    }

    /// The raw array.
    pub fn values(&self) -> [i64; 4] {
        self.0
    }

    /// Number of bytes covered by both spans.
    pub fn signed_len(&self) -> i64 {
        self.0[1] + self.0[3]
    }

    /// The two spans as `usize` pairs, validated against a buffer length.
    fn spans(&self, len: usize) -> Result<[(usize, usize); 2]> {
        let [o1, l1, o2, l2] = self.0;
        let to_usize = |v: i64| usize::try_from(v).ok();
        let (Some(o1), Some(l1), Some(o2), Some(l2)) =
            (to_usize(o1), to_usize(l1), to_usize(o2), to_usize(l2))
        else {
            return Err(Error::InvalidPdf(format!("negative ByteRange {}", self)));
        };
        let end1 = o1.saturating_add(l1);
        let end2 = o2.saturating_add(l2);
        if end1 > o2 {
            return Err(Error::InvalidPdf(format!("overlapping ByteRange {}", self)));
        }
        if end2 > len {
            return Err(Error::ByteRangeOutOfBounds { end: end2, len });
        }
        Ok([(o1, end1), (o2, end2)])
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "[{} {} {} {}]", a, b, c, d)
    }
}

/// Offsets of an unsigned field inside a serialized document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaceholderLocation {
    /// Offset of the `/ByteRange` declaration
    pub declaration: usize,
    /// Offset of the `<` opening the contents
    pub contents_start: usize,
    /// Offset of the `>` closing the contents
    pub contents_end: usize,
}

/// Calculator for PDF signature byte ranges.
#[derive(Debug, Clone, Copy)]
pub struct ByteRangeCalculator {
    /// Bytes reserved for the DER signature
    signature_size: usize,
}

impl ByteRangeCalculator {
    /// Create a calculator reserving `signature_size` bytes of DER.
    pub fn new(signature_size: usize) -> Self {
        Self { signature_size }
    }

    /// Reserved DER capacity in bytes.
    pub fn signature_size(&self) -> usize {
        self.signature_size
    }

    /// Width of the `/Contents` value: two hex digits per byte plus `<>`.
    pub fn placeholder_size(&self) -> usize {
        self.signature_size * 2 + 2
    }

    /// The `<...>` hex string reserved for the signature.
    pub fn contents_placeholder(&self) -> String {
        let mut out = String::with_capacity(self.placeholder_size());
        out.push('<');
        for b in PENDING_SENTINEL.iter().cycle().take(self.signature_size) {
            out.push_str(&format!("{:02X}", b));
        }
        out.push('>');
        out
    }

    /// Find the unsigned field whose object starts at `anchor`.
    ///
    /// The declaration must sit inside that object, before its `endobj`.
    /// Placeholder text elsewhere in the document, such as inside a string
    /// of another object, is never picked up.
    pub fn locate(data: &[u8], anchor: usize) -> Result<PlaceholderLocation> {
        let token = BYTE_RANGE_PLACEHOLDER.as_bytes();
        let object = data.get(anchor..).ok_or_else(|| {
            Error::PlaceholderNotFound(format!("anchor {} past end of {} bytes", anchor, data.len()))
        })?;
        let end = find(object, b"endobj").unwrap_or(object.len());
        let declaration = find(&object[..end], token).map(|p| anchor + p).ok_or_else(|| {
            Error::PlaceholderNotFound(format!(
                "no zero-valued /ByteRange declaration in object at {}",
                anchor
            ))
        })?;
        let after = declaration + token.len();

        let key = find(&data[after..], CONTENTS_KEY)
            .map(|p| after + p + CONTENTS_KEY.len())
            .ok_or_else(|| Error::PlaceholderNotFound("no /Contents after /ByteRange".to_string()))?;
        let contents_start = data[key..]
            .iter()
            .position(|&b| b == b'<')
            .map(|p| key + p)
            .ok_or_else(|| Error::PlaceholderNotFound("/Contents is not a hex string".to_string()))?;
        let contents_end = data[contents_start..]
            .iter()
            .position(|&b| b == b'>')
            .map(|p| contents_start + p)
            .ok_or_else(|| Error::PlaceholderNotFound("unterminated /Contents".to_string()))?;

        Ok(PlaceholderLocation {
            declaration,
            contents_start,
            contents_end,
        })
    }

    /// Locate the placeholder of the object at `anchor`, compute the real
    /// range and rewrite the declaration in place.
    pub fn compute(buffer: &mut WorkingBuffer, anchor: usize) -> Result<ByteRange> {
        let location = Self::locate(buffer.as_slice(), anchor)?;
        let len = buffer.len() as i64;
        let after = location.contents_end as i64 + 1;
        let range = ByteRange::new(0, location.contents_start as i64, after, len - after);

        let declaration = Self::format_declaration(&range)?;
        buffer.overwrite(location.declaration, declaration.as_bytes())?;
        log::debug!("Computed ByteRange {} over {} bytes", range, len);
        Ok(range)
    }

    /// Render `range` at exactly the placeholder's width, space padded.
    pub fn format_declaration(range: &ByteRange) -> Result<String> {
        let width = BYTE_RANGE_PLACEHOLDER.len();
        let [a, b, c, d] = range.values();
        let mut text = format!("/ByteRange [{} {} {} {}", a, b, c, d);
        if text.len() + 1 > width {
            return Err(Error::PlaceholderWidth {
                expected: width,
                actual: text.len() + 1,
            });
        }
        while text.len() + 1 < width {
            text.push(' ');
        }
        text.push(']');
        Ok(text)
    }

    /// Concatenate the two spans of `range` in order.
    pub fn slice(data: &[u8], range: &ByteRange) -> Result<Vec<u8>> {
        let [(s1, e1), (s2, e2)] = range.spans(data.len())?;
        let mut out = Vec::with_capacity((e1 - s1) + (e2 - s2));
        out.extend_from_slice(&data[s1..e1]);
        out.extend_from_slice(&data[s2..e2]);
        Ok(out)
    }

    /// Write `der` as uppercase hex into the gap of `range`, zero padded.
    ///
    /// Nothing is written when the signature does not fit.
    pub fn embed(buffer: &mut WorkingBuffer, range: &ByteRange, der: &[u8]) -> Result<()> {
        let [(_, gap_start), (gap_end, _)] = range.spans(buffer.len())?;
        let slot = gap_end.saturating_sub(gap_start).saturating_sub(2);
        if der.len() * 2 > slot {
            return Err(Error::SignatureTooLarge {
                size: der.len(),
                capacity: slot / 2,
            });
        }

        let mut hex = String::with_capacity(slot);
        for b in der {
            hex.push_str(&format!("{:02X}", b));
        }
        while hex.len() < slot {
            hex.push('0');
        }
        buffer.overwrite(gap_start + 1, hex.as_bytes())
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
