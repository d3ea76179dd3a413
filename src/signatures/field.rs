//! Signature field insertion.
//!
//! Appends an incremental update holding a signature dictionary with the
//! fixed-width placeholders, a widget annotation pointing at it, the target
//! page with its `/Annots` extended and the AcroForm with `/Fields` extended.

use super::byterange::{ByteRangeCalculator, BYTE_RANGE_PLACEHOLDER};
use super::types::{SignatureRequest, FILTER_ADOBE_PPKLITE, SUB_FILTER_PKCS7_DETACHED};
use crate::buffer::WorkingBuffer;
use crate::config::SigningConfig;
use crate::document::PdfDocument;
use crate::error::{Error, Result};
use crate::object::{Dictionary, Object, ObjectRef};
use crate::writer::object_serializer::{dict, name, rect, string, text};
use crate::writer::{IncrementalUpdate, ObjectSerializer};
use chrono::{DateTime, Utc};

/// `/F 4`: print the annotation.
const ANNOT_FLAG_PRINT: i64 = 4;
/// `/SigFlags 3`: SignaturesExist | AppendOnly.
const SIG_FLAGS: i64 = 3;

/// Where a new widget goes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldPlacement {
    /// Page receiving the widget
    pub page: ObjectRef,
    /// 1-based page number after clamping
    pub page_number: usize,
    /// `[llx, lly, urx, ury]`
    pub rect: [f64; 4],
}

/// Resolve the target page and rectangle for `request`.
pub fn place(
    document: &PdfDocument,
    request: &SignatureRequest,
    config: &SigningConfig,
) -> Result<FieldPlacement> {
    let pages = document.pages()?;
    if pages.is_empty() {
        return Err(Error::InvalidPdf("document has no pages".to_string()));
    }

    let (page_number, x, y, width, height) = if request.final_signature {
        (
            pages.len(),
            config.final_offset,
            config.final_offset,
            config.final_size,
            config.final_size,
        )
    } else {
        (
            request.page.clamp(1, pages.len()),
            request.x.max(0.0),
            request.y.max(0.0),
            config.field_width,
            config.field_height,
        )
    };

    let page = pages[page_number - 1];
    let media_box = document.media_box(page)?;
    let page_width = media_box[2] - media_box[0];
    let x = x.min(page_width - config.right_margin).max(0.0);

    Ok(FieldPlacement {
        page,
        page_number,
        rect: [x, y, x + width, y + height],
    })
}

/// PDF date string, `D:YYYYMMDDHHmmSS+00'00'`.
pub fn pdf_date(at: DateTime<Utc>) -> String {
    format!("D:{}+00'00'", at.format("%Y%m%d%H%M%S"))
}

/// A serialization carrying a new unsigned field.
#[derive(Debug)]
pub struct InsertedField {
    /// Original bytes plus the appended revision
    pub buffer: WorkingBuffer,
    /// Offset of the signature dictionary's object header
    pub signature_offset: usize,
}

/// Serialize `document` plus a new unsigned signature field.
pub fn insert_signature_field(
    document: &PdfDocument,
    request: &SignatureRequest,
    config: &SigningConfig,
    calculator: &ByteRangeCalculator,
    signing_time: DateTime<Utc>,
) -> Result<InsertedField> {
    let placement = place(document, request, config)?;
    let serializer = ObjectSerializer::new();
    let mut update = IncrementalUpdate::new(document);
    let sig_ref = update.allocate();
    let widget_ref = update.allocate();

    let creator = if request.creator.is_empty() {
        crate::NAME
    } else {
        request.creator.as_str()
    };
    let mut entries = Dictionary::new();
    entries.insert("Type".to_string(), name("Sig"));
    entries.insert("Filter".to_string(), name(FILTER_ADOBE_PPKLITE));
    entries.insert("SubFilter".to_string(), name(SUB_FILTER_PKCS7_DETACHED));
    entries.insert("Reason".to_string(), text(&request.reason));
    entries.insert("Location".to_string(), text(&request.location));
    entries.insert("M".to_string(), string(pdf_date(signing_time)));
    entries.insert(
        "Prop_Build".to_string(),
        dict([("App", dict([("Name", name(creator))]))]),
    );

    // The placeholders are spliced in as raw text so their width is exact.
    let mut body = Vec::with_capacity(calculator.placeholder_size() + 512);
    body.extend_from_slice(b"<<");
    body.extend_from_slice(BYTE_RANGE_PLACEHOLDER.as_bytes());
    body.extend_from_slice(b"/Contents ");
    body.extend_from_slice(calculator.contents_placeholder().as_bytes());
    body.extend_from_slice(&serializer.serialize_entries(&entries)?);
    body.extend_from_slice(b">>");
    update.put_raw(sig_ref, body);

    let [llx, lly, urx, ury] = placement.rect;
    let widget = dict([
        ("Type", name("Annot")),
        ("Subtype", name("Widget")),
        ("FT", name("Sig")),
        ("T", text(&config.app_identifier)),
        ("V", Object::Reference(sig_ref)),
        ("Rect", rect(llx, lly, urx, ury)),
        ("F", Object::Integer(ANNOT_FLAG_PRINT)),
        ("P", Object::Reference(placement.page)),
    ]);
    update.put(widget_ref, &widget)?;

    let mut page = document.resolve_dict(document.get(placement.page)?)?.clone();
    let annots = appended_array(document, page.get("Annots"), widget_ref)?;
    page.insert("Annots".to_string(), annots);
    update.put(placement.page, &Object::Dictionary(page))?;

    register_field(document, &mut update, widget_ref)?;

    log::info!(
        "Inserted signature field {} on page {} at {:?}",
        widget_ref,
        placement.page_number,
        placement.rect
    );
    let revision = update.write()?;
    let signature_offset = revision.offset_of(sig_ref).ok_or_else(|| {
        Error::PlaceholderNotFound(format!("signature dictionary {} was not written", sig_ref))
    })?;
    Ok(InsertedField {
        buffer: revision.buffer,
        signature_offset,
    })
}

/// Add the widget to the AcroForm, creating the form when needed.
fn register_field(
    document: &PdfDocument,
    update: &mut IncrementalUpdate<'_>,
    widget: ObjectRef,
) -> Result<()> {
    let catalog_ref = document.catalog_ref()?;
    let catalog = document.catalog()?;

    match catalog.get("AcroForm") {
        Some(Object::Reference(form_ref)) => {
            let mut form = document.resolve_dict(document.get(*form_ref)?)?.clone();
            extend_form(document, &mut form, widget)?;
            update.put(*form_ref, &Object::Dictionary(form))
        },
        Some(Object::Dictionary(inline)) => {
            let mut form = inline.clone();
            extend_form(document, &mut form, widget)?;
            let mut catalog = catalog.clone();
            catalog.insert("AcroForm".to_string(), Object::Dictionary(form));
            update.put(catalog_ref, &Object::Dictionary(catalog))
        },
        other => {
            if let Some(other) = other {
                log::warn!("Replacing /AcroForm of type {}", other.type_name());
            }
            let form_ref = update.allocate();
            let mut form = Dictionary::new();
            extend_form(document, &mut form, widget)?;
            update.put(form_ref, &Object::Dictionary(form))?;
            let mut catalog = catalog.clone();
            catalog.insert("AcroForm".to_string(), Object::Reference(form_ref));
            update.put(catalog_ref, &Object::Dictionary(catalog))
        },
    }
}

fn extend_form(document: &PdfDocument, form: &mut Dictionary, widget: ObjectRef) -> Result<()> {
    let fields = appended_array(document, form.get("Fields"), widget)?;
    form.insert("Fields".to_string(), fields);
    form.insert("SigFlags".to_string(), Object::Integer(SIG_FLAGS));
    Ok(())
}

/// Existing array (inlined if indirect) with `item` appended.
fn appended_array(
    document: &PdfDocument,
    existing: Option<&Object>,
    item: ObjectRef,
) -> Result<Object> {
    let mut items = match existing {
        Some(obj) => match document.resolve_or_null(obj)? {
            Object::Array(items) => items.clone(),
            Object::Null => Vec::new(),
            other => {
                return Err(Error::InvalidObjectType {
                    expected: "Array".to_string(),
                    found: other.type_name().to_string(),
                })
            },
        },
        None => Vec::new(),
    };
    items.push(Object::Reference(item));
    Ok(Object::Array(items))
}
