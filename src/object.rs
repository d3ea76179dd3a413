//! PDF object types.
//!
//! Literal and hexadecimal strings are kept apart: a signature's `/Contents`
//! is only accepted when it was written as a hex string.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::io::Read;

/// Dictionary payload shared by dictionaries and stream headers.
pub type Dictionary = HashMap<String, Object>;

/// PDF object representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// Null object
    Null,
    /// Boolean value
    Boolean(bool),
    /// Integer value
    Integer(i64),
    /// Real (floating-point) value
    Real(f64),
    /// Literal string `( ... )`
    String(Vec<u8>),
    /// Hexadecimal string `< ... >`, already decoded to bytes
    HexString(Vec<u8>),
    /// Name (starting with /)
    Name(String),
    /// Array of objects
    Array(Vec<Object>),
    /// Dictionary (key-value pairs)
    Dictionary(Dictionary),
    /// Stream (dictionary + raw, still-encoded data)
    Stream {
        /// Stream dictionary
        dict: Dictionary,
        /// Stream data
        data: bytes::Bytes,
    },
    /// Indirect object reference
    Reference(ObjectRef),
}

/// Reference to an indirect object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef {
    /// Object number
    pub id: u32,
    /// Generation number
    pub gen: u16,
}

impl ObjectRef {
    /// Create a new object reference.
    pub fn new(id: u32, gen: u16) -> Self {
        Self { id, gen }
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} R", self.id, self.gen)
    }
}

impl Object {
    /// Get the type name of this object (without data).
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Null => "Null",
            Object::Boolean(_) => "Boolean",
            Object::Integer(_) => "Integer",
            Object::Real(_) => "Real",
            Object::String(_) => "String",
            Object::HexString(_) => "HexString",
            Object::Name(_) => "Name",
            Object::Array(_) => "Array",
            Object::Dictionary(_) => "Dictionary",
            Object::Stream { .. } => "Stream",
            Object::Reference(_) => "Reference",
        }
    }

    /// Try to cast to integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Object::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Integer or real as `f64`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Object::Integer(i) => Some(*i as f64),
            Object::Real(r) => Some(*r),
            _ => None,
        }
    }

    /// Try to cast to name.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Object::Name(s) => Some(s),
            _ => None,
        }
    }

    /// Try to cast to dictionary. Works for both Dictionary and Stream objects.
    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            Object::Dictionary(d) => Some(d),
            Object::Stream { dict, .. } => Some(dict),
            _ => None,
        }
    }

    /// Try to cast to array.
    pub fn as_array(&self) -> Option<&Vec<Object>> {
        match self {
            Object::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Try to cast to reference.
    pub fn as_reference(&self) -> Option<ObjectRef> {
        match self {
            Object::Reference(r) => Some(*r),
            _ => None,
        }
    }

    /// Literal string bytes.
    pub fn as_string(&self) -> Option<&[u8]> {
        match self {
            Object::String(s) => Some(s),
            _ => None,
        }
    }

    /// Hex string bytes.
    pub fn as_hex_string(&self) -> Option<&[u8]> {
        match self {
            Object::HexString(s) => Some(s),
            _ => None,
        }
    }

    /// String bytes regardless of how the string was written.
    pub fn as_text_bytes(&self) -> Option<&[u8]> {
        match self {
            Object::String(s) | Object::HexString(s) => Some(s),
            _ => None,
        }
    }

    /// Check if object is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }

    /// Decode stream data. Only unfiltered and FlateDecode streams are handled.
    pub fn decode_stream_data(&self) -> Result<Vec<u8>> {
        let (dict, data) = match self {
            Object::Stream { dict, data } => (dict, data),
            _ => {
                return Err(Error::InvalidObjectType {
                    expected: "Stream".to_string(),
                    found: self.type_name().to_string(),
                })
            },
        };

        let filters: Vec<&str> = match dict.get("Filter") {
            None => Vec::new(),
            Some(Object::Name(name)) => vec![name.as_str()],
            Some(Object::Array(arr)) => arr.iter().filter_map(|o| o.as_name()).collect(),
            Some(other) => {
                return Err(Error::InvalidObjectType {
                    expected: "Name or Array".to_string(),
                    found: other.type_name().to_string(),
                })
            },
        };

        let mut decoded = data.to_vec();
        for filter in filters {
            match filter {
                "FlateDecode" | "Fl" => {
                    let mut out = Vec::new();
                    flate2::read::ZlibDecoder::new(&decoded[..])
                        .read_to_end(&mut out)
                        .map_err(|e| Error::InvalidPdf(format!("FlateDecode failed: {}", e)))?;
                    decoded = out;
                },
                other => return Err(Error::Unsupported(format!("stream filter /{}", other))),
            }
        }

        if let Some(predictor) = dict
            .get("DecodeParms")
            .and_then(|p| p.as_dict())
            .and_then(|p| p.get("Predictor"))
            .and_then(|p| p.as_integer())
        {
            if predictor > 1 {
                return Err(Error::Unsupported(format!("stream predictor {}", predictor)));
            }
        }

        Ok(decoded)
    }
}

/// Decode a PDF text string that may be UTF-16BE (with BOM) or PDFDocEncoding.
///
/// Per ISO 32000-1:2008, Section 7.9.2.2: bytes starting with 0xFE 0xFF are
/// UTF-16BE, anything else is PDFDocEncoding. Returns `None` for unpaired
/// surrogates or an odd UTF-16 length.
pub fn decode_text_string(bytes: &[u8]) -> Option<String> {
    if let [0xFE, 0xFF, utf16 @ ..] = bytes {
        if utf16.len() % 2 != 0 {
            return None;
        }
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
            .collect();
        String::from_utf16(&units).ok()
    } else {
        Some(bytes.iter().filter_map(|&b| pdfdoc_char(b)).collect())
    }
}

/// Encode `text` as a PDF text string: plain bytes when it is ASCII,
/// UTF-16BE with BOM otherwise.
pub fn encode_text_string(text: &str) -> Vec<u8> {
    if text.is_ascii() {
        return text.as_bytes().to_vec();
    }
    let mut out = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out
}

// ISO 32000-1:2008, Annex D.2, Table D.2
fn pdfdoc_char(code: u8) -> Option<char> {
    let c = match code {
        0x18 => '\u{02D8}',
        0x19 => '\u{02C7}',
        0x1A => '\u{02C6}',
        0x1B => '\u{02D9}',
        0x1C => '\u{02DD}',
        0x1D => '\u{02DB}',
        0x1E => '\u{02DA}',
        0x1F => '\u{02DC}',
        0x7F | 0x9F | 0xAD => return None,
        0x00..=0x7E => code as char,
        0x80 => '\u{2022}',
        0x81 => '\u{2020}',
        0x82 => '\u{2021}',
        0x83 => '\u{2026}',
        0x84 => '\u{2014}',
        0x85 => '\u{2013}',
        0x86 => '\u{0192}',
        0x87 => '\u{2044}',
        0x88 => '\u{2039}',
        0x89 => '\u{203A}',
        0x8A => '\u{2212}',
        0x8B => '\u{2030}',
        0x8C => '\u{201E}',
        0x8D => '\u{201C}',
        0x8E => '\u{201D}',
        0x8F => '\u{2018}',
        0x90 => '\u{2019}',
        0x91 => '\u{201A}',
        0x92 => '\u{2122}',
        0x93 => '\u{FB01}',
        0x94 => '\u{FB02}',
        0x95 => '\u{0141}',
        0x96 => '\u{0152}',
        0x97 => '\u{0160}',
        0x98 => '\u{0178}',
        0x99 => '\u{017D}',
        0x9A => '\u{0131}',
        0x9B => '\u{0142}',
        0x9C => '\u{0153}',
        0x9D => '\u{0161}',
        0x9E => '\u{017E}',
        0xA0 => '\u{20AC}',
        // Latin-1 for the rest
        0xA1..=0xFF => code as char,
    };
    Some(c)
}
