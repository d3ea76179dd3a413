//! Discovery of signature fields in a document's object graph.
//!
//! Every dictionary holding an `/Annots` array is visited in object-number
//! order. Entries whose `/T` equals the configured application identifier are
//! signature widgets of this crate; their `/V` dictionary is decoded strictly
//! and any malformed field aborts the whole scan.

use super::byterange::{is_pending, ByteRange};
use super::codec::{ParsedSignature, SignatureCodec};
use crate::document::PdfDocument;
use crate::error::{Error, Result};
use crate::object::{decode_text_string, Dictionary, Object, ObjectRef};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use x509_cert::Certificate;

/// Decoded view of one signature field.
#[derive(Debug, Clone)]
pub struct SignatureAnnotation {
    /// Widget holding the field, when it is an indirect object
    pub widget: Option<ObjectRef>,
    /// `/ByteRange`
    pub byte_range: ByteRange,
    /// Decoded `/Contents`
    pub contents: Vec<u8>,
    /// `/Location`
    pub location: String,
    /// `/Reason`
    pub reason: String,
    /// `/SubFilter`
    pub sub_filter: String,
    /// `/Type`
    pub sig_type: String,
    /// `/Prop_Build /App /Name`, when present
    pub creator: Option<String>,
    /// Document identifier, read from `/Reason`
    pub document_id: String,
    /// Contents still hold the unsigned filler
    pub pending: bool,
    /// Parsed signed-data; `None` while pending
    pub signature: Option<ParsedSignature>,
}

impl SignatureAnnotation {
    /// Signed message digest.
    pub fn message_digest(&self) -> Option<&[u8]> {
        self.signature.as_ref().map(|s| s.message_digest.as_slice())
    }

    /// Signed signing time.
    pub fn signing_time(&self) -> Option<DateTime<Utc>> {
        self.signature.as_ref().and_then(|s| s.signing_time)
    }

    /// Certificates embedded in the signature.
    pub fn certificates(&self) -> &[Certificate] {
        self.signature.as_ref().map(|s| s.certificates.as_slice()).unwrap_or(&[])
    }
}

/// Walks a document and collects its signature annotations.
#[derive(Debug)]
pub struct AnnotationScanner<'a> {
    document: &'a PdfDocument,
    app_identifier: &'a str,
}

impl<'a> AnnotationScanner<'a> {
    /// Scanner for fields named `app_identifier`.
    pub fn new(document: &'a PdfDocument, app_identifier: &'a str) -> Self {
        Self {
            document,
            app_identifier,
        }
    }

    /// Collect every signature annotation in discovery order.
    pub fn scan(&self) -> Result<Vec<SignatureAnnotation>> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();

        for (owner, object) in self.document.objects().iter() {
            let Some(annots) = object.as_dict().and_then(|d| d.get("Annots")) else {
                continue;
            };
            let entries = match self.document.resolve_or_null(annots)? {
                Object::Array(entries) => entries,
                Object::Null => continue,
                other => {
                    log::warn!("/Annots of {} is {}, skipping", owner, other.type_name());
                    continue;
                },
            };

            for entry in entries {
                let widget = entry.as_reference();
                if let Some(reference) = widget {
                    if !seen.insert(reference) {
                        continue;
                    }
                }
                let Some(dict) = self.document.resolve_or_null(entry)?.as_dict() else {
                    continue;
                };
                if let Some(annotation) = self.decode_field(widget, dict)? {
                    found.push(annotation);
                }
            }
        }

        log::debug!(
            "Found {} signature annotation(s) for {}",
            found.len(),
            self.app_identifier
        );
        Ok(found)
    }

    fn decode_field(
        &self,
        widget: Option<ObjectRef>,
        dict: &Dictionary,
    ) -> Result<Option<SignatureAnnotation>> {
        match dict.get("T").and_then(|t| t.as_text_bytes()).and_then(decode_text_string) {
            Some(name) if name == self.app_identifier => {},
            _ => return Ok(None),
        }

        let value = match dict.get("V") {
            Some(v @ Object::Reference(_)) | Some(v @ Object::Dictionary(_)) => {
                self.document.resolve(v)?
            },
            Some(other) => {
                return Err(Error::annotation("V", format!("expected dictionary, found {}", other.type_name())))
            },
            None => return Err(Error::annotation("V", "missing")),
        };
        let v = value
            .as_dict()
            .ok_or_else(|| Error::annotation("V", format!("resolves to {}", value.type_name())))?;

        let byte_range = self.byte_range(v)?;
        let contents = required(v, "Contents")?
            .as_hex_string()
            .ok_or_else(|| Error::annotation("Contents", "expected hex string"))?
            .to_vec();
        let location = self.string_field(v, "Location")?;
        let creator = self.creator(v)?;
        let reason = self.string_field(v, "Reason")?;
        let sub_filter = name_field(v, "SubFilter")?;
        let sig_type = name_field(v, "Type")?;
        // The identifier travels in /Reason; there is no separate key for it.
        let document_id = self.string_field(v, "Reason")?;

        let pending = is_pending(&contents);
        let signature = if pending {
            None
        } else {
            Some(SignatureCodec::parse(&contents)?)
        };

        Ok(Some(SignatureAnnotation {
            widget,
            byte_range,
            contents,
            location,
            reason,
            sub_filter,
            sig_type,
            creator,
            document_id,
            pending,
            signature,
        }))
    }

    fn byte_range(&self, v: &Dictionary) -> Result<ByteRange> {
        let array = self
            .document
            .resolve(required(v, "ByteRange")?)?
            .as_array()
            .ok_or_else(|| Error::annotation("ByteRange", "expected array"))?;
        let values: Vec<i64> = array
            .iter()
            .map(|item| {
                item.as_integer()
                    .ok_or_else(|| Error::annotation("ByteRange", format!("{} entry", item.type_name())))
            })
            .collect::<Result<_>>()?;
        match values[..] {
            [a, b, c, d] => Ok(ByteRange::new(a, b, c, d)),
            _ => Err(Error::annotation("ByteRange", format!("{} entries, expected 4", values.len()))),
        }
    }

    fn string_field(&self, v: &Dictionary, key: &'static str) -> Result<String> {
        let raw = self
            .document
            .resolve(required(v, key)?)?
            .as_string()
            .ok_or_else(|| Error::annotation(key, "expected string"))?;
        decode_text_string(raw).ok_or_else(|| Error::annotation(key, "invalid UTF-16 text"))
    }

    fn creator(&self, v: &Dictionary) -> Result<Option<String>> {
        let build = self
            .document
            .resolve(required(v, "Prop_Build")?)?
            .as_dict()
            .ok_or_else(|| Error::annotation("Prop_Build", "expected dictionary"))?;
        let app = match build.get("App") {
            Some(app) => self.document.resolve(app)?.as_dict(),
            None => None,
        };
        Ok(app
            .and_then(|app| app.get("Name"))
            .and_then(|name| name.as_name().map(str::to_string)))
    }
}

fn required<'d>(v: &'d Dictionary, key: &'static str) -> Result<&'d Object> {
    v.get(key).ok_or_else(|| Error::annotation(key, "missing"))
}

fn name_field(v: &Dictionary, key: &'static str) -> Result<String> {
    required(v, key)?
        .as_name()
        .map(str::to_string)
        .ok_or_else(|| Error::annotation(key, "expected name"))
}
