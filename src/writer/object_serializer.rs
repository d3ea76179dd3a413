//! PDF object serialization.
//!
//! Compact output: dictionaries are written with sorted keys and no
//! whitespace between entries, so the same object always serializes to the
//! same bytes.

use crate::error::Result;
use crate::object::{encode_text_string, Dictionary, Object, ObjectRef};
use std::io::Write;

/// Serializer for PDF objects.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectSerializer;

impl ObjectSerializer {
    /// Create a serializer.
    pub fn new() -> Self {
        Self
    }

    /// Serialize an object to bytes.
    pub fn serialize(&self, obj: &Object) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write_object(&mut buf, obj)?;
        Ok(buf)
    }

    /// Serialize the entries of a dictionary without the enclosing `<<` `>>`.
    pub fn serialize_entries(&self, dict: &Dictionary) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write_entries(&mut buf, dict)?;
        Ok(buf)
    }

    /// Wrap an already serialized body as `{id} {gen} obj ... endobj`.
    pub fn wrap_indirect(&self, reference: ObjectRef, body: &[u8]) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(body.len() + 32);
        writeln!(buf, "{} {} obj", reference.id, reference.gen)?;
        buf.extend_from_slice(body);
        write!(buf, "\nendobj\n")?;
        Ok(buf)
    }

    /// Serialize an indirect object definition.
    pub fn serialize_indirect(&self, reference: ObjectRef, obj: &Object) -> Result<Vec<u8>> {
        let body = self.serialize(obj)?;
        self.wrap_indirect(reference, &body)
    }

    fn write_object<W: Write>(&self, w: &mut W, obj: &Object) -> std::io::Result<()> {
        match obj {
            Object::Null => write!(w, "null"),
            Object::Boolean(b) => write!(w, "{}", b),
            Object::Integer(i) => write!(w, "{}", i),
            Object::Real(r) => write_real(w, *r),
            Object::String(s) => write_literal_string(w, s),
            Object::HexString(s) => write_hex_string(w, s),
            Object::Name(n) => write_name(w, n),
            Object::Array(items) => {
                write!(w, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(w, " ")?;
                    }
                    self.write_object(w, item)?;
                }
                write!(w, "]")
            },
            Object::Dictionary(dict) => {
                write!(w, "<<")?;
                self.write_entries(w, dict)?;
                write!(w, ">>")
            },
            Object::Stream { dict, data } => {
                let mut dict = dict.clone();
                dict.insert("Length".to_string(), Object::Integer(data.len() as i64));
                write!(w, "<<")?;
                self.write_entries(w, &dict)?;
                write!(w, ">>\nstream\n")?;
                w.write_all(data)?;
                write!(w, "\nendstream")
            },
            Object::Reference(r) => write!(w, "{} {} R", r.id, r.gen),
        }
    }

    fn write_entries<W: Write>(&self, w: &mut W, dict: &Dictionary) -> std::io::Result<()> {
        let mut keys: Vec<&String> = dict.keys().collect();
        keys.sort();
        for key in keys {
            if let Some(value) = dict.get(key) {
                write_name(w, key)?;
                write!(w, " ")?;
                self.write_object(w, value)?;
            }
        }
        Ok(())
    }
}

fn write_real<W: Write>(w: &mut W, value: f64) -> std::io::Result<()> {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return write!(w, "{}", value as i64);
    }
    let text = format!("{:.4}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    write!(w, "{}", text)
}

fn write_name<W: Write>(w: &mut W, name: &str) -> std::io::Result<()> {
    write!(w, "/")?;
    for &b in name.as_bytes() {
        let plain = b.is_ascii_graphic()
            && !matches!(b, b'#' | b'/' | b'%' | b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}');
        if plain {
            w.write_all(&[b])?;
        } else {
            write!(w, "#{:02X}", b)?;
        }
    }
    Ok(())
}

fn write_literal_string<W: Write>(w: &mut W, s: &[u8]) -> std::io::Result<()> {
    write!(w, "(")?;
    for &b in s {
        match b {
            b'(' | b')' | b'\\' => w.write_all(&[b'\\', b])?,
            b'\n' => w.write_all(b"\\n")?,
            b'\r' => w.write_all(b"\\r")?,
            0x20..=0x7E => w.write_all(&[b])?,
            _ => write!(w, "\\{:03o}", b)?,
        }
    }
    write!(w, ")")
}

fn write_hex_string<W: Write>(w: &mut W, s: &[u8]) -> std::io::Result<()> {
    write!(w, "<")?;
    for b in s {
        write!(w, "{:02X}", b)?;
    }
    write!(w, ">")
}

/// Build a name object.
pub fn name(value: &str) -> Object {
    Object::Name(value.to_string())
}

/// Build a literal string object.
pub fn string(value: impl AsRef<[u8]>) -> Object {
    Object::String(value.as_ref().to_vec())
}

/// Build a text string object, UTF-16BE with BOM when `value` is not ASCII.
pub fn text(value: &str) -> Object {
    Object::String(encode_text_string(value))
}

/// Build a dictionary object from key/value pairs.
pub fn dict<'a>(entries: impl IntoIterator<Item = (&'a str, Object)>) -> Object {
    Object::Dictionary(entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
}

/// Build a rectangle array.
pub fn rect(llx: f64, lly: f64, urx: f64, ury: f64) -> Object {
    Object::Array(vec![Object::Real(llx), Object::Real(lly), Object::Real(urx), Object::Real(ury)])
}
