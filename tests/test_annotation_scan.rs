//! Integration tests for discovering and decoding signature fields.

mod common;

use common::*;
use pdf_seal::signatures::{AnnotationScanner, ByteRange};
use pdf_seal::{Error, PdfDocument, SignatureVerifier, SigningConfig};

const PENDING_HEX: &str = "EEBEAEEEBEAEEEBEAEEEBEAE0000";

/// One page whose /Annots holds a widget with `value` as its /V.
fn with_field(name: &str, value: &str) -> PdfDocument {
    let text = format!(
        "%PDF-1.4\n\
1 0 obj <</Type /Catalog /Pages 2 0 R>> endobj\n\
2 0 obj <</Type /Pages /Kids [3 0 R] /Count 1 /MediaBox [0 0 595 842]>> endobj\n\
3 0 obj <</Type /Page /Parent 2 0 R /Annots [4 0 R]>> endobj\n\
4 0 obj <</Type /Annot /Subtype /Widget /FT /Sig /T ({}) /V 5 0 R /Rect [0 0 10 10]>> endobj\n\
5 0 obj {} endobj\n\
trailer <</Size 6 /Root 1 0 R>>\n",
        name, value
    );
    PdfDocument::load(text.into_bytes(), None).unwrap()
}

fn sig_value(skip: &str) -> String {
    let entries = [
        ("ByteRange", "[0 10 40 20]".to_string()),
        ("Contents", format!("<{}>", PENDING_HEX)),
        ("Location", "(Porto)".to_string()),
        ("Prop_Build", "<</App <</Name /pdf_seal>>>>".to_string()),
        ("Reason", "(doc-5)".to_string()),
        ("SubFilter", "/adbe.pkcs7.detached".to_string()),
        ("Type", "/Sig".to_string()),
    ];
    let body: String = entries
        .iter()
        .filter(|(key, _)| *key != skip)
        .map(|(key, value)| format!("/{} {} ", key, value))
        .collect();
    format!("<<{}>>", body)
}

fn scan(doc: &PdfDocument) -> pdf_seal::Result<Vec<pdf_seal::SignatureAnnotation>> {
    AnnotationScanner::new(doc, "pmesp.signer").scan()
}

#[test]
fn test_pending_field_is_reported() {
    let doc = with_field("pmesp.signer", &sig_value(""));
    let found = scan(&doc).unwrap();
    assert_eq!(found.len(), 1);
    assert!(found[0].pending);
    assert!(found[0].signature.is_none());
    assert_eq!(found[0].document_id, "doc-5");
    assert_eq!(found[0].creator.as_deref(), Some("pdf_seal"));

    let verifier = SignatureVerifier::new(&doc, &SigningConfig::default()).unwrap();
    assert_eq!(verifier.pending_byte_range(), Some(ByteRange::new(0, 10, 40, 20)));
    assert!(!verifier.verify().unwrap());
}

#[test]
fn test_foreign_fields_are_ignored() {
    let doc = with_field("someone.else", &sig_value(""));
    assert!(scan(&doc).unwrap().is_empty());
}

#[test]
fn test_missing_required_fields_abort_the_scan() {
    for field in [
        "ByteRange",
        "Contents",
        "Location",
        "Prop_Build",
        "Reason",
        "SubFilter",
        "Type",
    ] {
        let doc = with_field("pmesp.signer", &sig_value(field));
        match scan(&doc) {
            Err(Error::InvalidAnnotation { field: reported, .. }) => assert_eq!(reported, field),
            other => panic!("{} missing: {:?}", field, other.map(|v| v.len())),
        }
    }
}

#[test]
fn test_creator_name_is_optional() {
    let value = sig_value("").replace("<</App <</Name /pdf_seal>>>>", "<<>>");
    let doc = with_field("pmesp.signer", &value);
    let found = scan(&doc).unwrap();
    assert_eq!(found[0].creator, None);
}

#[test]
fn test_short_byte_range_is_rejected() {
    let value = sig_value("").replace("[0 10 40 20]", "[0 10 40]");
    let doc = with_field("pmesp.signer", &value);
    assert!(matches!(
        scan(&doc),
        Err(Error::InvalidAnnotation { field: "ByteRange", .. })
    ));
}

#[test]
fn test_literal_contents_are_rejected() {
    let value = sig_value("").replace(&format!("<{}>", PENDING_HEX), "(not hex)");
    let doc = with_field("pmesp.signer", &value);
    assert!(matches!(
        scan(&doc),
        Err(Error::InvalidAnnotation { field: "Contents", .. })
    ));
}

#[test]
fn test_garbage_signature_is_malformed() {
    let value = sig_value("").replace(PENDING_HEX, "3003020101");
    let doc = with_field("pmesp.signer", &value);
    let err = scan(&doc).unwrap_err();
    assert!(matches!(err, Error::MalformedSignature(_)), "{:?}", err);
    assert_eq!(err.code(), pdf_seal::ErrorCategory::Crypto.code());
}

#[test]
fn test_signed_document_scan() {
    let signed = sign(&simple_pdf(2), "scan-me", 1_800_000_000);
    let doc = PdfDocument::load(signed, None).unwrap();
    let found = scan(&doc).unwrap();
    assert_eq!(found.len(), 1);
    assert!(found[0].widget.is_some());
    assert_eq!(found[0].reason, "scan-me");
    assert_eq!(found[0].message_digest().map(<[u8]>::len), Some(32));
}

#[test]
fn test_scan_is_repeatable() {
    let once = sign(&simple_pdf(1), "again", 1_800_000_000);
    let twice = sign(&once, "again", 1_800_000_100);
    let doc = PdfDocument::load(twice, None).unwrap();
    let summary = |found: Vec<pdf_seal::SignatureAnnotation>| -> Vec<_> {
        found
            .into_iter()
            .map(|a| (a.widget, a.byte_range, a.contents, a.reason))
            .collect()
    };
    let first = summary(scan(&doc).unwrap());
    let second = summary(scan(&doc).unwrap());
    assert_eq!(first.len(), 2);
    assert_eq!(first, second);
}
