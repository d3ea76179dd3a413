//! Incremental update writer.
//!
//! New and replaced objects are appended after the original bytes followed
//! by a cross-reference section and a trailer whose `/Prev` points at the
//! previous section. The original bytes are never rewritten, so byte ranges
//! of earlier signatures stay valid.

use crate::buffer::WorkingBuffer;
use crate::document::PdfDocument;
use crate::error::Result;
use crate::object::{Dictionary, Object, ObjectRef};
use crate::writer::object_serializer::ObjectSerializer;
use std::collections::BTreeMap;
use std::io::Write;

/// An appended revision and where each of its objects starts.
#[derive(Debug)]
pub struct Revision {
    /// Original bytes followed by the update
    pub buffer: WorkingBuffer,
    offsets: BTreeMap<ObjectRef, usize>,
}

impl Revision {
    /// Absolute offset of the `N G obj` header of `reference`.
    pub fn offset_of(&self, reference: ObjectRef) -> Option<usize> {
        self.offsets.get(&reference).copied()
    }
}

/// Collects the objects of one revision and writes them after the original.
#[derive(Debug)]
pub struct IncrementalUpdate<'a> {
    document: &'a PdfDocument,
    serializer: ObjectSerializer,
    objects: BTreeMap<u32, (ObjectRef, Vec<u8>)>,
    next_id: u32,
}

impl<'a> IncrementalUpdate<'a> {
    /// Start a revision on top of `document`.
    pub fn new(document: &'a PdfDocument) -> Self {
        Self {
            document,
            serializer: ObjectSerializer::new(),
            objects: BTreeMap::new(),
            next_id: document.next_object_id(),
        }
    }

    /// Reserve a fresh object number.
    pub fn allocate(&mut self) -> ObjectRef {
        let reference = ObjectRef::new(self.next_id, 0);
        self.next_id += 1;
        reference
    }

    /// Add or replace an object.
    pub fn put(&mut self, reference: ObjectRef, object: &Object) -> Result<()> {
        let body = self.serializer.serialize(object)?;
        self.put_raw(reference, body);
        Ok(())
    }

    /// Add or replace an object whose body is already serialized.
    pub fn put_raw(&mut self, reference: ObjectRef, body: Vec<u8>) {
        self.objects.insert(reference.id, (reference, body));
    }

    /// Number of objects in this revision.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the revision is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Append the revision to a copy of the original bytes.
    pub fn write(self) -> Result<Revision> {
        let original = self.document.original();
        let base = original.len();
        let mut update: Vec<u8> = Vec::new();
        if !original.as_bytes().ends_with(b"\n") {
            update.push(b'\n');
        }

        let mut offsets = Vec::with_capacity(self.objects.len());
        for (reference, body) in self.objects.values() {
            offsets.push((*reference, base + update.len()));
            update.extend_from_slice(&self.serializer.wrap_indirect(*reference, body)?);
        }

        let xref_offset = base + update.len();
        writeln!(update, "xref")?;
        for (reference, offset) in &offsets {
            writeln!(update, "{} 1", reference.id)?;
            writeln!(update, "{:010} {:05} n ", offset, reference.gen)?;
        }

        let trailer = self.trailer();
        writeln!(update, "trailer")?;
        update.extend_from_slice(&self.serializer.serialize(&Object::Dictionary(trailer))?);
        write!(update, "\nstartxref\n{}\n%%EOF\n", xref_offset)?;

        log::debug!(
            "Incremental update: {} objects, xref at {}, {} bytes appended",
            offsets.len(),
            xref_offset,
            update.len()
        );
        Ok(Revision {
            buffer: original.to_working(&update),
            offsets: offsets.into_iter().collect(),
        })
    }

    fn trailer(&self) -> Dictionary {
        let previous = self.document.trailer();
        let mut trailer = Dictionary::new();
        for key in ["Root", "Info", "ID"] {
            if let Some(value) = previous.get(key) {
                trailer.insert(key.to_string(), value.clone());
            }
        }
        trailer.insert("Size".to_string(), Object::Integer(i64::from(self.next_id)));
        if let Some(prev) = self.document.startxref() {
            trailer.insert("Prev".to_string(), Object::Integer(prev as i64));
        }
        trailer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::object_serializer::{dict, name};

    const BASE: &[u8] = b"%PDF-1.4\n\
1 0 obj\n<</Type /Catalog /Pages 2 0 R>>\nendobj\n\
2 0 obj\n<</Type /Pages /Kids [] /Count 0>>\nendobj\n\
xref\n0 3\n0000000000 65535 f \n0000000009 00000 n \n0000000058 00000 n \n\
trailer\n<</Size 3 /Root 1 0 R>>\nstartxref\n106\n%%EOF";

    #[test]
    fn test_append_revision() {
        let doc = PdfDocument::load(BASE.to_vec(), None).unwrap();
        let mut update = IncrementalUpdate::new(&doc);
        let fresh = update.allocate();
        assert_eq!(fresh, ObjectRef::new(3, 0));
        update.put(fresh, &dict([("Type", name("Sig"))])).unwrap();
        let revision = update.write().unwrap();
        let offset = BASE.len() + 1;
        assert_eq!(revision.offset_of(fresh), Some(offset));
        assert_eq!(revision.offset_of(ObjectRef::new(1, 0)), None);
        let out = revision.buffer.into_vec();

        assert!(out.starts_with(BASE));
        let tail = String::from_utf8_lossy(&out[BASE.len()..]).into_owned();
        assert!(tail.starts_with("\n3 0 obj\n<</Type /Sig>>\nendobj\n"));
        assert!(tail.contains("/Prev 106"));
        assert!(tail.contains("/Size 4"));
        assert!(tail.contains("/Root 1 0 R"));
        assert!(tail.ends_with("%%EOF\n"));
        assert!(tail.contains(&format!("3 1\n{:010} 00000 n \n", offset)));
        assert_eq!(&out[offset..offset + 7], b"3 0 obj");
    }

    #[test]
    fn test_appended_revision_reloads() {
        let doc = PdfDocument::load(BASE.to_vec(), None).unwrap();
        let mut update = IncrementalUpdate::new(&doc);
        update
            .put(ObjectRef::new(2, 0), &dict([("Type", name("Pages")), ("Count", Object::Integer(0))]))
            .unwrap();
        let reference = update.allocate();
        update.put_raw(reference, b"<</Type /Annot>>".to_vec());
        assert_eq!(update.len(), 2);
        let out = update.write().unwrap().buffer.into_vec();

        let reloaded = PdfDocument::load(out, None).unwrap();
        let pages = reloaded.get(ObjectRef::new(2, 0)).unwrap().as_dict().unwrap();
        assert!(!pages.contains_key("Kids"));
        assert!(reloaded.get(reference).is_ok());
        assert_eq!(reloaded.next_object_id(), 4);
    }
}
