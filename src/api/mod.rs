//! High-level API: one call per operation, bytes in and values out.
//!
//! Every function loads its own document session, so calls are independent.
//! Errors carry a negative code through [`Error::code`](crate::Error::code)
//! for callers that need integers.
//!
//! ## Quick Start
//!
//! ```ignore
//! use pdf_seal::api;
//! use pdf_seal::{SignatureRequest, SigningConfig};
//!
//! let config = SigningConfig::default();
//! let request = SignatureRequest::new(1, 100.0, 100.0).with_reason("doc-42");
//! let signed = api::write_signature(&pdf, &cert_pem, &key_pem, None, &request, &config)?;
//! assert!(api::verify(&signed, &config)?);
//! assert_eq!(api::document_id(&signed, &config)?, "doc-42");
//!
//! // Several documents at once, one result per input
//! let results = api::write_signatures(&[&pdf, &other], &cert_pem, &key_pem, None, &request, &config);
//! let checks = api::verify_documents(&[&pdf, &other], &config);
//! ```

use crate::config::SigningConfig;
use crate::document::PdfDocument;
use crate::error::{Error, Result};
use std::thread;
use crate::signatures::{ByteRange, DigestAlgorithm, PdfSigner, SignatureRequest, SignatureVerifier};

/// A document with a random suffix appended and the hash of the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaltedDocument {
    /// Original bytes followed by a UUID
    pub bytes: Vec<u8>,
    /// Lowercase hex SHA-256 of `bytes`
    pub hash: String,
}

/// Sign `pdf` and return the signed bytes.
pub fn write_signature(
    pdf: &[u8],
    cert_pem: &[u8],
    key_pem: &[u8],
    password: Option<&str>,
    request: &SignatureRequest,
    config: &SigningConfig,
) -> Result<Vec<u8>> {
    let document = PdfDocument::load(pdf.to_vec(), None)?;
    let mut signer = PdfSigner::new(document, config.clone());
    signer.load_pair_from_memory(cert_pem, key_pem, password)?;
    signer.sign(request)
}

/// Sign `pdf` with the user's key pair, then seal it with a separate pair.
pub fn write_final_signature(
    pdf: &[u8],
    cert_pem: &[u8],
    key_pem: &[u8],
    password: Option<&str>,
    seal_cert_pem: &[u8],
    seal_key_pem: &[u8],
    request: &SignatureRequest,
    config: &SigningConfig,
) -> Result<Vec<u8>> {
    let document = PdfDocument::load(pdf.to_vec(), None)?;
    let mut signer = PdfSigner::new(document, config.clone());
    signer.load_pair_from_memory(cert_pem, key_pem, password)?;
    signer.load_seal_from_memory(seal_cert_pem, seal_key_pem, None)?;
    signer.sign_final(request)
}

/// Sign every document in `pdfs` with the same key pair and request.
///
/// Documents are signed concurrently. The result at index `i` belongs to
/// `pdfs[i]`; one failing document does not affect the others.
pub fn write_signatures(
    pdfs: &[&[u8]],
    cert_pem: &[u8],
    key_pem: &[u8],
    password: Option<&str>,
    request: &SignatureRequest,
    config: &SigningConfig,
) -> Vec<Result<Vec<u8>>> {
    for_each_document(pdfs, |pdf| {
        write_signature(pdf, cert_pem, key_pem, password, request, config)
    })
}

/// Verify every document in `pdfs`, one result per input.
pub fn verify_documents(pdfs: &[&[u8]], config: &SigningConfig) -> Vec<Result<bool>> {
    for_each_document(pdfs, |pdf| verify(pdf, config))
}

fn for_each_document<T, F>(pdfs: &[&[u8]], job: F) -> Vec<Result<T>>
where
    T: Send,
    F: Fn(&[u8]) -> Result<T> + Sync,
{
    let job = &job;
    let results: Vec<Result<T>> = thread::scope(|scope| {
        let handles: Vec<_> = pdfs
            .iter()
            .map(|&pdf| scope.spawn(move || job(pdf)))
            .collect();
        handles
            .into_iter()
            .enumerate()
            .map(|(index, handle)| {
                handle.join().unwrap_or_else(|_| {
                    Err(Error::Signing(format!("worker for document {} panicked", index)))
                })
            })
            .collect()
    });
    let failed = results.iter().filter(|r| r.is_err()).count();
    log::info!("Processed {} documents, {} failed", results.len(), failed);
    results
}

fn with_verifier<T>(
    pdf: &[u8],
    config: &SigningConfig,
    query: impl FnOnce(&SignatureVerifier<'_>) -> Result<T>,
) -> Result<T> {
    let document = PdfDocument::load(pdf.to_vec(), None)?;
    let verifier = SignatureVerifier::new(&document, config)?;
    query(&verifier)
}

/// Whether every signature in `pdf` verifies.
pub fn verify(pdf: &[u8], config: &SigningConfig) -> Result<bool> {
    with_verifier(pdf, config, |v| v.verify())
}

/// Digest of the latest signature by signing time.
pub fn last_signature(pdf: &[u8], config: &SigningConfig) -> Result<Vec<u8>> {
    with_verifier(pdf, config, |v| Ok(v.last_signature()))
}

/// Digest of the earliest signature by signing time.
pub fn first_signature(pdf: &[u8], config: &SigningConfig) -> Result<Vec<u8>> {
    with_verifier(pdf, config, |v| Ok(v.first_signature()))
}

/// Document identifier carried by the first signature.
pub fn document_id(pdf: &[u8], config: &SigningConfig) -> Result<String> {
    with_verifier(pdf, config, |v| Ok(v.document_id()))
}

/// Whether `id` matches the document identifier.
pub fn validate_id(pdf: &[u8], id: &str, config: &SigningConfig) -> Result<bool> {
    with_verifier(pdf, config, |v| Ok(v.validate_id(id)))
}

/// ByteRange of the first unsigned field, if any.
pub fn pending_byte_range(pdf: &[u8], config: &SigningConfig) -> Result<Option<ByteRange>> {
    with_verifier(pdf, config, |v| Ok(v.pending_byte_range()))
}

/// Append a random UUID to `pdf` so that identical uploads hash differently.
pub fn salt_document(pdf: &[u8]) -> Result<SaltedDocument> {
    let salt = uuid::Uuid::new_v4().to_string();
    let mut bytes = Vec::with_capacity(pdf.len() + salt.len());
    bytes.extend_from_slice(pdf);
    bytes.extend_from_slice(salt.as_bytes());
    let hash = DigestAlgorithm::Sha256
        .digest(&bytes)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect();
    log::debug!("Salted {} byte document", pdf.len());
    Ok(SaltedDocument { bytes, hash })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_salt_document() {
        let a = salt_document(b"%PDF-1.4").unwrap();
        let b = salt_document(b"%PDF-1.4").unwrap();
        assert_ne!(a.hash, b.hash);
        assert_eq!(a.bytes.len(), 8 + 36);
        assert!(uuid::Uuid::parse_str(std::str::from_utf8(&a.bytes[8..]).unwrap()).is_ok());
        assert_eq!(a.hash.len(), 64);
        assert!(a.hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_batch_of_nothing() {
        let config = SigningConfig::default();
        assert!(verify_documents(&[], &config).is_empty());
    }

    #[test]
    fn test_batch_keeps_input_order() {
        let config = SigningConfig::default();
        let results = verify_documents(&[b"not a pdf".as_slice(), b"still not a pdf"], &config);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| matches!(r, Err(e) if e.code() == -1)));
    }

    #[test]
    fn test_queries_on_invalid_input() {
        let config = SigningConfig::default();
        let err = verify(b"not a pdf", &config).unwrap_err();
        assert_eq!(err.code(), -1);
    }
}
