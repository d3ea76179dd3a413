//! Shared helpers for the integration tests.
#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use pdf_seal::{PdfDocument, PdfSigner, SignatureRequest, SigningConfig};

pub const CERT: &[u8] = include_bytes!("../fixtures/keys/signer-cert.pem");
pub const KEY: &[u8] = include_bytes!("../fixtures/keys/signer-key.pem");
pub const KEY_PKCS1: &[u8] = include_bytes!("../fixtures/keys/signer-key-pkcs1.pem");
pub const KEY_ENCRYPTED: &[u8] = include_bytes!("../fixtures/keys/signer-key-encrypted.pem");
pub const OTHER_CERT: &[u8] = include_bytes!("../fixtures/keys/other-cert.pem");
pub const OTHER_KEY: &[u8] = include_bytes!("../fixtures/keys/other-key.pem");
pub const EC_CERT: &[u8] = include_bytes!("../fixtures/keys/ec-cert.pem");
pub const EC_KEY: &[u8] = include_bytes!("../fixtures/keys/ec-key.pem");
pub const EC_KEY_SEC1: &[u8] = include_bytes!("../fixtures/keys/ec-key-sec1.pem");

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A small uncompressed PDF with `pages` A4 pages and an Info string that
/// tests can tamper with.
pub fn simple_pdf(pages: usize) -> Vec<u8> {
    let first_page = 4;
    let kids: Vec<String> = (0..pages).map(|i| format!("{} 0 R", first_page + i)).collect();
    let mut out = String::from("%PDF-1.4\n");
    out.push_str("1 0 obj <</Type /Catalog /Pages 2 0 R>> endobj\n");
    out.push_str(&format!(
        "2 0 obj <</Type /Pages /Kids [{}] /Count {} /MediaBox [0 0 595 842]>> endobj\n",
        kids.join(" "),
        pages
    ));
    out.push_str("3 0 obj <</Title (Quarterly report) /Producer (fixture)>> endobj\n");
    for i in 0..pages {
        out.push_str(&format!("{} 0 obj <</Type /Page /Parent 2 0 R>> endobj\n", first_page + i));
    }
    out.push_str(&format!(
        "trailer <</Size {} /Root 1 0 R /Info 3 0 R>>\n",
        first_page + pages
    ));
    out.into_bytes()
}

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

pub fn request(reason: &str, secs: i64) -> SignatureRequest {
    SignatureRequest::new(1, 50.0, 50.0)
        .with_reason(reason)
        .with_location("Lisbon")
        .with_signing_time(at(secs))
}

/// Sign `pdf` with the given key pair and return the signed bytes.
pub fn sign_with(
    pdf: &[u8],
    cert: &[u8],
    key: &[u8],
    request: &SignatureRequest,
    config: &SigningConfig,
) -> Vec<u8> {
    let document = PdfDocument::load(pdf.to_vec(), None).expect("load");
    let mut signer = PdfSigner::new(document, config.clone());
    signer.load_pair_from_memory(cert, key, None).expect("key pair");
    signer.sign(request).expect("sign")
}

pub fn sign(pdf: &[u8], reason: &str, secs: i64) -> Vec<u8> {
    sign_with(pdf, CERT, KEY, &request(reason, secs), &SigningConfig::default())
}
