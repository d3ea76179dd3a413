//! Object table built by scanning the file body.
//!
//! Instead of trusting cross-reference offsets, every `N G obj` header in the
//! file is parsed in file order. A later definition of the same object number
//! replaces an earlier one, which is exactly how incremental updates shadow
//! older revisions. Objects packed into `/Type /ObjStm` streams are expanded
//! at the position of their stream.

use crate::error::{Error, Result};
use crate::lexer::skip_ws;
use crate::object::{Dictionary, Object, ObjectRef};
use crate::parser::{parse_indirect_object, parse_object};
use lazy_static::lazy_static;
use std::collections::BTreeMap;

lazy_static! {
    /// "N G obj" headers
    static ref RE_OBJ_HEADER: regex::bytes::Regex =
        regex::bytes::Regex::new(r"(\d+)\s+(\d+)\s+obj").unwrap();

    /// "trailer <<" markers
    static ref RE_TRAILER: regex::bytes::Regex =
        regex::bytes::Regex::new(r"trailer\s*<<").unwrap();
}

/// Upper bound on objects unpacked from a single object stream.
const MAX_OBJSTM_ENTRIES: i64 = 1_000_000;

/// Latest revision of every object found in a PDF file.
#[derive(Debug, Default, Clone)]
pub struct ObjectTable {
    objects: BTreeMap<u32, (ObjectRef, Object)>,
    trailers: Vec<(usize, Dictionary)>,
}

impl ObjectTable {
    /// Scan `data` for object definitions and trailers.
    pub fn scan(data: &[u8]) -> Self {
        let mut table = ObjectTable::default();
        let mut pos = 0;

        while pos < data.len() {
            let m = match RE_OBJ_HEADER.find_at(data, pos) {
                Some(m) => m,
                None => break,
            };
            let start = m.start();
            if start > 0 && data[start - 1].is_ascii_digit() {
                pos = m.end();
                continue;
            }

            match parse_indirect_object(&data[start..]) {
                Ok((rest, (reference, object))) => {
                    table.record(start, reference, object);
                    pos = data.len() - rest.len();
                },
                Err(_) => {
                    log::debug!("Skipping unparseable object header at byte {}", start);
                    pos = m.end();
                },
            }
        }

        for m in RE_TRAILER.find_iter(data) {
            let dict_start = m.end() - 2;
            match parse_object(&data[dict_start..]) {
                Ok((_, Object::Dictionary(dict))) => table.trailers.push((m.start(), dict)),
                _ => log::warn!("Ignoring malformed trailer at byte {}", m.start()),
            }
        }
        table.trailers.sort_by_key(|(offset, _)| *offset);

        log::debug!(
            "Object table: {} objects, {} trailer dictionaries",
            table.objects.len(),
            table.trailers.len()
        );
        table
    }

    fn record(&mut self, offset: usize, reference: ObjectRef, object: Object) {
        let kind = object
            .as_dict()
            .and_then(|d| d.get("Type"))
            .and_then(|t| t.as_name())
            .map(str::to_string);

        match kind.as_deref() {
            Some("XRef") => {
                if let Some(dict) = object.as_dict() {
                    self.trailers.push((offset, dict.clone()));
                }
            },
            Some("ObjStm") => match expand_object_stream(&object) {
                Ok(members) => {
                    for (id, member) in members {
                        self.objects.insert(id, (ObjectRef::new(id, 0), member));
                    }
                },
                Err(e) => log::warn!("Could not expand object stream {}: {}", reference, e),
            },
            _ => {},
        }

        self.objects.insert(reference.id, (reference, object));
    }

    /// Look up the latest revision of an object.
    pub fn get(&self, reference: ObjectRef) -> Option<&Object> {
        self.objects.get(&reference.id).map(|(_, obj)| obj)
    }

    /// Look up an object, failing when it is absent.
    pub fn resolve(&self, reference: ObjectRef) -> Result<&Object> {
        self.get(reference)
            .ok_or(Error::ObjectNotFound(reference.id, reference.gen))
    }

    /// Objects ordered by object number.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectRef, &Object)> {
        self.objects.values().map(|(r, obj)| (*r, obj))
    }

    /// Number of distinct objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether no objects were found.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Highest object number in use.
    pub fn max_id(&self) -> u32 {
        self.objects.keys().next_back().copied().unwrap_or(0)
    }

    /// Trailer entries merged in file order, later trailers overriding
    /// earlier keys. Falls back to a synthetic trailer pointing at the
    /// first `/Type /Catalog` object.
    pub fn trailer(&self) -> Option<Dictionary> {
        let mut merged = Dictionary::new();
        for (_, dict) in &self.trailers {
            for (key, value) in dict {
                merged.insert(key.clone(), value.clone());
            }
        }
        if merged.contains_key("Root") {
            return Some(merged);
        }

        let catalog = self.iter().find(|(_, obj)| {
            obj.as_dict()
                .and_then(|d| d.get("Type"))
                .and_then(|t| t.as_name())
                == Some("Catalog")
        })?;
        log::warn!("No trailer with /Root, using catalog {}", catalog.0);
        merged.insert("Root".to_string(), Object::Reference(catalog.0));
        Some(merged)
    }
}

/// Offset recorded by the last `startxref` keyword.
pub fn last_startxref(data: &[u8]) -> Option<u64> {
    let keyword = b"startxref";
    let pos = data.windows(keyword.len()).rposition(|w| w == keyword)?;
    let rest = skip_ws(&data[pos + keyword.len()..]);
    let digits = rest.iter().take_while(|b| b.is_ascii_digit()).count();
    std::str::from_utf8(&rest[..digits]).ok()?.parse().ok()
}

/// Unpack the objects stored in an object stream.
fn expand_object_stream(stream: &Object) -> Result<Vec<(u32, Object)>> {
    let dict = stream
        .as_dict()
        .ok_or_else(|| Error::InvalidPdf("object stream is not a stream".to_string()))?;
    let count = dict
        .get("N")
        .and_then(|o| o.as_integer())
        .filter(|n| (0..=MAX_OBJSTM_ENTRIES).contains(n))
        .ok_or_else(|| Error::InvalidPdf("object stream has no valid /N".to_string()))?;
    let first = dict
        .get("First")
        .and_then(|o| o.as_integer())
        .and_then(|f| usize::try_from(f).ok())
        .ok_or_else(|| Error::InvalidPdf("object stream has no valid /First".to_string()))?;

    let decoded = stream.decode_stream_data()?;
    if decoded.len() < first {
        return Err(Error::InvalidPdf(format!(
            "object stream holds {} bytes, /First is {}",
            decoded.len(),
            first
        )));
    }

    let mut header = &decoded[..first];
    let mut pairs = Vec::new();
    for _ in 0..count {
        let (rest, id) = parse_object(header).map_err(|_| Error::ParseError {
            offset: first - header.len(),
            reason: "object stream header".to_string(),
        })?;
        let (rest, offset) = parse_object(rest).map_err(|_| Error::ParseError {
            offset: first - rest.len(),
            reason: "object stream header".to_string(),
        })?;
        let (Some(id), Some(offset)) = (id.as_integer(), offset.as_integer()) else {
            return Err(Error::InvalidPdf("object stream header is not integer pairs".to_string()));
        };
        let id = u32::try_from(id)
            .map_err(|_| Error::InvalidPdf(format!("object stream member number {} out of range", id)))?;
        let offset = usize::try_from(offset)
            .map_err(|_| Error::InvalidPdf(format!("object stream member offset {} out of range", offset)))?;
        pairs.push((id, offset));
        header = rest;
    }

    let body = &decoded[first..];
    let mut members = Vec::with_capacity(pairs.len());
    for (id, offset) in pairs {
        if offset >= body.len() {
            log::warn!("Object {} offset {} is past the object stream data", id, offset);
            continue;
        }
        match parse_object(&body[offset..]) {
            Ok((_, obj)) => members.push((id, obj)),
            Err(_) => log::warn!("Failed to parse object {} inside object stream", id),
        }
    }
    Ok(members)
}
