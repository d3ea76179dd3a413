//! Loaded PDF document session.
//!
//! A [`PdfDocument`] owns the immutable [`OriginalBuffer`] it was loaded from
//! together with the object table and merged trailer derived from it. Nothing
//! in a session mutates the buffer; signing produces a new serialization.

use crate::buffer::OriginalBuffer;
use crate::error::{Error, Result};
use crate::object::{Dictionary, Object, ObjectRef};
use crate::xref::{last_startxref, ObjectTable};
use std::collections::HashSet;
use std::path::Path;

/// Longest chain of references followed by [`PdfDocument::resolve`].
const MAX_REFERENCE_CHAIN: usize = 32;

/// Letter size, used when no page in the inheritance chain has a MediaBox.
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// A PDF document loaded into memory.
#[derive(Debug, Clone)]
pub struct PdfDocument {
    original: OriginalBuffer,
    objects: ObjectTable,
    trailer: Dictionary,
    version: (u8, u8),
}

impl PdfDocument {
    /// Load a document from bytes.
    ///
    /// Encrypted documents are detected through the trailer's `/Encrypt`
    /// entry: without a password this fails with [`Error::PasswordRequired`];
    /// with one it fails with [`Error::Unsupported`] since object decryption
    /// is not carried by this crate.
    pub fn load(data: impl Into<bytes::Bytes>, password: Option<&str>) -> Result<Self> {
        let original = OriginalBuffer::new(data);
        let version = parse_header(original.as_bytes())?;
        let objects = ObjectTable::scan(original.as_bytes());
        if objects.is_empty() {
            return Err(Error::InvalidPdf("no indirect objects found".to_string()));
        }
        let trailer = objects
            .trailer()
            .ok_or_else(|| Error::InvalidPdf("no trailer and no catalog".to_string()))?;

        if trailer.contains_key("Encrypt") {
            return match password {
                None => Err(Error::PasswordRequired),
                Some(_) => Err(Error::Unsupported("encrypted documents".to_string())),
            };
        }

        log::info!(
            "Loaded PDF {}.{}: {} bytes, {} objects",
            version.0,
            version.1,
            original.len(),
            objects.len()
        );

        Ok(Self {
            original,
            objects,
            trailer,
            version,
        })
    }

    /// Read and load a document from disk.
    pub fn open(path: impl AsRef<Path>, password: Option<&str>) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        Self::load(data, password)
    }

    /// Header version as (major, minor).
    pub fn version(&self) -> (u8, u8) {
        self.version
    }

    /// The bytes this session was loaded from.
    pub fn original(&self) -> &OriginalBuffer {
        &self.original
    }

    /// The object table.
    pub fn objects(&self) -> &ObjectTable {
        &self.objects
    }

    /// Merged trailer dictionary.
    pub fn trailer(&self) -> &Dictionary {
        &self.trailer
    }

    /// Offset of the newest cross-reference section, if one is declared.
    pub fn startxref(&self) -> Option<u64> {
        last_startxref(self.original.as_bytes())
    }

    /// Object number to use for the first object of a new revision.
    pub fn next_object_id(&self) -> u32 {
        let size = self
            .trailer
            .get("Size")
            .and_then(|s| s.as_integer())
            .and_then(|s| u32::try_from(s).ok())
            .unwrap_or(0);
        size.max(self.objects.max_id() + 1)
    }

    /// Look up an indirect object.
    pub fn get(&self, reference: ObjectRef) -> Result<&Object> {
        self.objects.resolve(reference)
    }

    /// Follow references until a direct object is reached.
    pub fn resolve<'a>(&'a self, object: &'a Object) -> Result<&'a Object> {
        let mut current = object;
        for _ in 0..MAX_REFERENCE_CHAIN {
            match current {
                Object::Reference(r) => current = self.get(*r)?,
                direct => return Ok(direct),
            }
        }
        match object {
            Object::Reference(r) => Err(Error::CircularReference(*r)),
            direct => Ok(direct),
        }
    }

    /// Like [`resolve`](Self::resolve), but a reference to an undefined
    /// object resolves to null (ISO 32000-1:2008, Section 7.3.10).
    pub fn resolve_or_null<'a>(&'a self, object: &'a Object) -> Result<&'a Object> {
        match self.resolve(object) {
            Err(Error::ObjectNotFound(id, gen)) => {
                log::debug!("Object {} {} not found, treating as null", id, gen);
                Ok(&Object::Null)
            },
            other => other,
        }
    }

    /// Resolve an object and require it to be a dictionary.
    pub fn resolve_dict<'a>(&'a self, object: &'a Object) -> Result<&'a Dictionary> {
        let resolved = self.resolve(object)?;
        resolved.as_dict().ok_or_else(|| Error::InvalidObjectType {
            expected: "Dictionary".to_string(),
            found: resolved.type_name().to_string(),
        })
    }

    /// Reference to the document catalog.
    pub fn catalog_ref(&self) -> Result<ObjectRef> {
        self.trailer
            .get("Root")
            .and_then(|r| r.as_reference())
            .ok_or_else(|| Error::InvalidPdf("trailer has no /Root reference".to_string()))
    }

    /// The document catalog.
    pub fn catalog(&self) -> Result<&Dictionary> {
        let root = self.get(self.catalog_ref()?)?;
        root.as_dict().ok_or_else(|| Error::InvalidObjectType {
            expected: "Dictionary".to_string(),
            found: root.type_name().to_string(),
        })
    }

    /// Leaf page references in document order.
    pub fn pages(&self) -> Result<Vec<ObjectRef>> {
        let pages_root = self
            .catalog()?
            .get("Pages")
            .and_then(|p| p.as_reference())
            .ok_or_else(|| Error::InvalidPdf("catalog has no /Pages reference".to_string()))?;

        let mut pages = Vec::new();
        let mut visited = HashSet::new();
        self.collect_pages(pages_root, &mut visited, &mut pages)?;
        Ok(pages)
    }

    fn collect_pages(
        &self,
        node: ObjectRef,
        visited: &mut HashSet<ObjectRef>,
        pages: &mut Vec<ObjectRef>,
    ) -> Result<()> {
        if !visited.insert(node) {
            return Err(Error::CircularReference(node));
        }
        let dict = self.resolve_dict(self.get(node)?)?;
        match dict.get("Kids") {
            Some(kids) => {
                let kids = self.resolve(kids)?.as_array().ok_or_else(|| {
                    Error::InvalidPdf(format!("page tree node {} has non-array /Kids", node))
                })?;
                for kid in kids {
                    match kid.as_reference() {
                        Some(kid) => self.collect_pages(kid, visited, pages)?,
                        None => log::warn!("Ignoring direct object in /Kids of {}", node),
                    }
                }
            },
            None => pages.push(node),
        }
        Ok(())
    }

    /// Number of pages.
    pub fn page_count(&self) -> Result<usize> {
        Ok(self.pages()?.len())
    }

    /// MediaBox of a page as `[llx, lly, urx, ury]`, inherited through
    /// `/Parent` when the page itself has none.
    pub fn media_box(&self, page: ObjectRef) -> Result<[f64; 4]> {
        let mut node = page;
        let mut visited = HashSet::new();
        while visited.insert(node) {
            let dict = self.resolve_dict(self.get(node)?)?;
            if let Some(mb) = dict.get("MediaBox") {
                let values: Vec<f64> = self
                    .resolve(mb)?
                    .as_array()
                    .map(|a| a.iter().filter_map(|v| v.as_number()).collect())
                    .unwrap_or_default();
                if let [a, b, c, d] = values[..] {
                    return Ok([a, b, c, d]);
                }
                log::warn!("Malformed /MediaBox on {}, ignoring", node);
            }
            match dict.get("Parent").and_then(|p| p.as_reference()) {
                Some(parent) => node = parent,
                None => break,
            }
        }
        Ok(DEFAULT_MEDIA_BOX)
    }
}

/// Read the `%PDF-M.m` header. It may be preceded by junk within the first
/// kilobyte.
fn parse_header(data: &[u8]) -> Result<(u8, u8)> {
    let window = &data[..data.len().min(1024)];
    let pos = window
        .windows(5)
        .position(|w| w == b"%PDF-")
        .ok_or_else(|| Error::InvalidPdf("missing %PDF- header".to_string()))?;
    match data.get(pos + 5..pos + 8) {
        Some([major, b'.', minor]) if major.is_ascii_digit() && minor.is_ascii_digit() => {
            Ok((major - b'0', minor - b'0'))
        },
        _ => Err(Error::InvalidPdf("malformed PDF version in header".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_page_pdf() -> Vec<u8> {
        b"%PDF-1.7\n\
1 0 obj\n<</Type /Catalog /Pages 2 0 R>>\nendobj\n\
2 0 obj\n<</Type /Pages /Kids [3 0 R 4 0 R] /Count 2 /MediaBox [0 0 595 842]>>\nendobj\n\
3 0 obj\n<</Type /Page /Parent 2 0 R>>\nendobj\n\
4 0 obj\n<</Type /Page /Parent 2 0 R /MediaBox [0 0 300.5 400]>>\nendobj\n\
trailer\n<</Size 5 /Root 1 0 R>>\nstartxref\n0\n%%EOF\n"
            .to_vec()
    }

    #[test]
    fn test_load_and_pages() {
        let doc = PdfDocument::load(two_page_pdf(), None).unwrap();
        assert_eq!(doc.version(), (1, 7));
        assert_eq!(doc.page_count().unwrap(), 2);
        assert_eq!(doc.pages().unwrap(), vec![ObjectRef::new(3, 0), ObjectRef::new(4, 0)]);
        assert_eq!(doc.next_object_id(), 5);
    }

    #[test]
    fn test_media_box_inheritance() {
        let doc = PdfDocument::load(two_page_pdf(), None).unwrap();
        assert_eq!(doc.media_box(ObjectRef::new(3, 0)).unwrap(), [0.0, 0.0, 595.0, 842.0]);
        assert_eq!(doc.media_box(ObjectRef::new(4, 0)).unwrap(), [0.0, 0.0, 300.5, 400.0]);
    }

    #[test]
    fn test_missing_header() {
        assert!(matches!(
            PdfDocument::load(b"1 0 obj <<>> endobj".to_vec(), None),
            Err(Error::InvalidPdf(_))
        ));
    }

    #[test]
    fn test_encrypted_document_requires_password() {
        let mut data = two_page_pdf();
        data.extend_from_slice(b"trailer\n<</Size 5 /Root 1 0 R /Encrypt 9 0 R>>\n");
        let err = PdfDocument::load(data.clone(), None).unwrap_err();
        assert!(matches!(err, Error::PasswordRequired));
        let err = PdfDocument::load(data, Some("secret")).unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
    }

    #[test]
    fn test_circular_page_tree() {
        let data = b"%PDF-1.4\n\
1 0 obj <</Type /Catalog /Pages 2 0 R>> endobj\n\
2 0 obj <</Type /Pages /Kids [2 0 R]>> endobj\n\
trailer <</Root 1 0 R>>\n"
            .to_vec();
        let doc = PdfDocument::load(data, None).unwrap();
        assert!(matches!(doc.pages(), Err(Error::CircularReference(_))));
    }

    #[test]
    fn test_reference_loop_is_bounded() {
        let data = b"%PDF-1.4\n1 0 obj 2 0 R endobj\n2 0 obj 1 0 R endobj\n3 0 obj <</Type /Catalog>> endobj\n"
            .to_vec();
        let doc = PdfDocument::load(data, None).unwrap();
        let start = Object::Reference(ObjectRef::new(1, 0));
        assert!(matches!(doc.resolve(&start), Err(Error::CircularReference(_))));
    }

    #[test]
    fn test_missing_object_resolves_to_null() {
        let doc = PdfDocument::load(two_page_pdf(), None).unwrap();
        let dangling = Object::Reference(ObjectRef::new(99, 0));
        assert!(matches!(doc.resolve(&dangling), Err(Error::ObjectNotFound(99, 0))));
        assert_eq!(doc.resolve_or_null(&dangling).unwrap(), &Object::Null);
        assert_eq!(doc.resolve_or_null(&Object::Integer(1)).unwrap(), &Object::Integer(1));
    }

    #[test]
    fn test_open_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        std::fs::write(&path, two_page_pdf()).unwrap();
        let doc = PdfDocument::open(&path, None).unwrap();
        assert_eq!(doc.original().len(), two_page_pdf().len());
        assert!(matches!(PdfDocument::open(dir.path().join("missing.pdf"), None), Err(Error::Io(_))));
    }
}
