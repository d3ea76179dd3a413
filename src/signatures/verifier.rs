//! PDF signature verification and signature queries.

use super::annotations::{AnnotationScanner, SignatureAnnotation};
use super::byterange::{ByteRange, ByteRangeCalculator};
use super::codec::SignatureCodec;
use super::ordering::SignatureOrderer;
use crate::config::SigningConfig;
use crate::document::PdfDocument;
use crate::error::Result;

/// Verifier over the signature annotations of one document.
///
/// The annotations are scanned once at construction; every query reads the
/// same list.
#[derive(Debug)]
pub struct SignatureVerifier<'a> {
    document: &'a PdfDocument,
    annotations: Vec<SignatureAnnotation>,
}

impl<'a> SignatureVerifier<'a> {
    /// Scan `document` for fields named by `config.app_identifier`.
    pub fn new(document: &'a PdfDocument, config: &SigningConfig) -> Result<Self> {
        let annotations = AnnotationScanner::new(document, &config.app_identifier).scan()?;
        Ok(Self {
            document,
            annotations,
        })
    }

    /// Annotations in discovery order.
    pub fn annotations(&self) -> &[SignatureAnnotation] {
        &self.annotations
    }

    /// Whether every signature verifies against the bytes it covers.
    ///
    /// A document without signatures does not verify. A pending field has no
    /// signature yet and fails verification.
    pub fn verify(&self) -> Result<bool> {
        if self.annotations.is_empty() {
            log::debug!("No signature annotations to verify");
            return Ok(false);
        }
        let original = self.document.original().as_bytes();
        for (index, annotation) in self.annotations.iter().enumerate() {
            let Some(signature) = &annotation.signature else {
                log::info!("Signature {} is still pending", index);
                return Ok(false);
            };
            let data = ByteRangeCalculator::slice(original, &annotation.byte_range)?;
            if !SignatureCodec::verify(signature, &signature.certificates, &data)? {
                log::info!("Signature {} does not verify", index);
                return Ok(false);
            }
        }
        log::info!("All {} signature(s) verified", self.annotations.len());
        Ok(true)
    }

    /// Digest of the earliest signature by signing time.
    pub fn first_signature(&self) -> Vec<u8> {
        SignatureOrderer::first(&self.annotations)
    }

    /// Digest of the latest signature by signing time.
    pub fn last_signature(&self) -> Vec<u8> {
        SignatureOrderer::last(&self.annotations)
    }

    /// Digest of the last signature in discovery order.
    pub fn latest_digest(&self) -> Vec<u8> {
        self.annotations
            .last()
            .and_then(|a| a.message_digest())
            .map(<[u8]>::to_vec)
            .unwrap_or_default()
    }

    /// ByteRange of the first field still waiting for its signature.
    pub fn pending_byte_range(&self) -> Option<ByteRange> {
        self.annotations.iter().find(|a| a.pending).map(|a| a.byte_range)
    }

    /// Document identifier of the first signature; empty when unsigned.
    pub fn document_id(&self) -> String {
        self.annotations.first().map(|a| a.document_id.clone()).unwrap_or_default()
    }

    /// Whether `id` matches the document identifier. An empty `id` or a
    /// document without signatures always matches.
    pub fn validate_id(&self, id: &str) -> bool {
        if id.is_empty() || self.annotations.is_empty() {
            return true;
        }
        self.annotations[0].document_id == id
    }
}
