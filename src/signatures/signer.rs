//! PDF signing implementation.
//!
//! Signing walks a fixed sequence of typed states, each consuming the
//! previous one:
//!
//! `PdfSigner::prepare` → [`PlaceholderInserted`] → [`RangeComputed`] →
//! [`Signed`] → signed bytes.
//!
//! A failure at any step drops the working buffer; no partially signed
//! document is ever returned.
//!
//! [`PdfSigner::sign_final`] runs the sequence twice: once with the user's
//! key pair, then again over the result with a separate seal key pair whose
//! signature lands last in the document and last by signing time.

use super::byterange::{ByteRange, ByteRangeCalculator};
use super::codec::SignatureCodec;
use super::credentials::KeyMaterial;
use super::field::insert_signature_field;
use super::types::{DigestAlgorithm, SignatureRequest};
use crate::buffer::WorkingBuffer;
use crate::config::SigningConfig;
use crate::document::PdfDocument;
use crate::error::{Error, Result};
use chrono::{DateTime, Duration, SubsecRound, Utc};
use std::path::Path;

/// Signing session over one loaded document.
#[derive(Debug)]
pub struct PdfSigner {
    document: PdfDocument,
    keys: Option<KeyMaterial>,
    seal: Option<KeyMaterial>,
    config: SigningConfig,
}

impl PdfSigner {
    /// Create a signer for `document`.
    pub fn new(document: PdfDocument, config: SigningConfig) -> Self {
        Self {
            document,
            keys: None,
            seal: None,
            config,
        }
    }

    /// Open a document from disk and create a signer for it.
    pub fn open(path: impl AsRef<Path>, password: Option<&str>, config: SigningConfig) -> Result<Self> {
        Ok(Self::new(PdfDocument::open(path, password)?, config))
    }

    /// Load the certificate and private key from PEM text.
    pub fn load_pair_from_memory(
        &mut self,
        cert_pem: &[u8],
        key_pem: &[u8],
        password: Option<&str>,
    ) -> Result<()> {
        self.keys = Some(KeyMaterial::from_pem(cert_pem, key_pem, password)?);
        Ok(())
    }

    /// Load the certificate and private key from PEM files.
    pub fn load_pair_from_files(
        &mut self,
        cert_path: impl AsRef<Path>,
        key_path: impl AsRef<Path>,
        password: Option<&str>,
    ) -> Result<()> {
        self.keys = Some(KeyMaterial::from_files(cert_path, key_path, password)?);
        Ok(())
    }

    /// Whether a key pair has been loaded.
    pub fn is_pair_loaded(&self) -> bool {
        self.keys.is_some()
    }

    /// Load the seal certificate and key used by [`sign_final`](Self::sign_final).
    pub fn load_seal_from_memory(
        &mut self,
        cert_pem: &[u8],
        key_pem: &[u8],
        password: Option<&str>,
    ) -> Result<()> {
        self.seal = Some(KeyMaterial::from_pem(cert_pem, key_pem, password)?);
        Ok(())
    }

    /// Load the seal certificate and key from PEM files.
    pub fn load_seal_from_files(
        &mut self,
        cert_path: impl AsRef<Path>,
        key_path: impl AsRef<Path>,
        password: Option<&str>,
    ) -> Result<()> {
        self.seal = Some(KeyMaterial::from_files(cert_path, key_path, password)?);
        Ok(())
    }

    /// Whether a seal key pair has been loaded.
    pub fn is_seal_loaded(&self) -> bool {
        self.seal.is_some()
    }

    /// The document being signed.
    pub fn document(&self) -> &PdfDocument {
        &self.document
    }

    /// The configuration in use.
    pub fn config(&self) -> &SigningConfig {
        &self.config
    }

    /// Bytes reserved for the DER signature.
    pub fn signature_size(&self) -> usize {
        reserved_size(&self.config, self.keys.as_ref())
    }

    /// Insert an unsigned field for `request` into a fresh serialization.
    pub fn prepare(&self, request: &SignatureRequest) -> Result<PlaceholderInserted<'_>> {
        let keys = self.keys.as_ref().ok_or(Error::KeyPairNotLoaded)?;
        prepare_field(&self.document, keys, &self.config, request)
    }

    /// Run every signing step and return the signed document.
    pub fn sign(&self, request: &SignatureRequest) -> Result<Vec<u8>> {
        self.prepare(request)?.compute_range()?.sign()?.embed()
    }

    /// Sign with the user's key pair, then seal the result.
    ///
    /// The seal is a final signature carrying the same reason and location,
    /// placed on the last page and timed at least one second after the
    /// user's signature.
    pub fn sign_final(&self, request: &SignatureRequest) -> Result<Vec<u8>> {
        let keys = self.keys.as_ref().ok_or(Error::KeyPairNotLoaded)?;
        let seal = self.seal.as_ref().ok_or(Error::SealNotLoaded)?;

        let at = request.signing_time.unwrap_or_else(Utc::now).trunc_subsecs(0);
        let user = SignatureRequest {
            signing_time: Some(at),
            ..request.clone()
        };
        let signed = run(&self.document, keys, &self.config, &user)?;

        let sealed_at = Utc::now().trunc_subsecs(0).max(at + Duration::seconds(1));
        let final_request = SignatureRequest {
            reason: request.reason.clone(),
            location: request.location.clone(),
            creator: request.creator.clone(),
            signing_time: Some(sealed_at),
            ..SignatureRequest::final_signature()
        };
        let document = PdfDocument::load(signed, None)?;
        let sealed = run(&document, seal, &self.config, &final_request)?;
        log::info!("Sealed document at {}", sealed_at);
        Ok(sealed)
    }
}

fn reserved_size(config: &SigningConfig, keys: Option<&KeyMaterial>) -> usize {
    match (keys, config.grow_to_key_size) {
        (Some(keys), true) => config.signature_size.max(keys.minimum_signature_size()),
        _ => config.signature_size,
    }
}

fn prepare_field<'k>(
    document: &PdfDocument,
    keys: &'k KeyMaterial,
    config: &SigningConfig,
    request: &SignatureRequest,
) -> Result<PlaceholderInserted<'k>> {
    let signing_time = request
        .signing_time
        .unwrap_or_else(Utc::now)
        .trunc_subsecs(0);
    let calculator = ByteRangeCalculator::new(reserved_size(config, Some(keys)));
    let inserted = insert_signature_field(document, request, config, &calculator, signing_time)?;
    log::debug!(
        "Placeholder inserted: {} bytes, signature dictionary at {}, {} reserved for the signature",
        inserted.buffer.len(),
        inserted.signature_offset,
        calculator.signature_size()
    );
    Ok(PlaceholderInserted {
        keys,
        algorithm: config.digest_algorithm,
        buffer: inserted.buffer,
        signature_offset: inserted.signature_offset,
        signing_time,
    })
}

fn run(
    document: &PdfDocument,
    keys: &KeyMaterial,
    config: &SigningConfig,
    request: &SignatureRequest,
) -> Result<Vec<u8>> {
    prepare_field(document, keys, config, request)?
        .compute_range()?
        .sign()?
        .embed()
}

/// A serialization with an unsigned field appended.
#[derive(Debug)]
pub struct PlaceholderInserted<'s> {
    keys: &'s KeyMaterial,
    algorithm: DigestAlgorithm,
    buffer: WorkingBuffer,
    signature_offset: usize,
    signing_time: DateTime<Utc>,
}

impl<'s> PlaceholderInserted<'s> {
    /// Current bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.buffer.as_slice()
    }

    /// Offset of the new signature dictionary's object header.
    pub fn signature_offset(&self) -> usize {
        self.signature_offset
    }

    /// Rewrite the byte range declaration with real offsets.
    pub fn compute_range(mut self) -> Result<RangeComputed<'s>> {
        let range = ByteRangeCalculator::compute(&mut self.buffer, self.signature_offset)?;
        Ok(RangeComputed {
            keys: self.keys,
            algorithm: self.algorithm,
            buffer: self.buffer,
            range,
            signing_time: self.signing_time,
        })
    }
}

/// Byte range fixed; the covered bytes are final.
#[derive(Debug)]
pub struct RangeComputed<'s> {
    keys: &'s KeyMaterial,
    algorithm: DigestAlgorithm,
    buffer: WorkingBuffer,
    range: ByteRange,
    signing_time: DateTime<Utc>,
}

impl RangeComputed<'_> {
    /// The computed range.
    pub fn byte_range(&self) -> ByteRange {
        self.range
    }

    /// The bytes the signature will cover.
    pub fn signed_bytes(&self) -> Result<Vec<u8>> {
        ByteRangeCalculator::slice(self.buffer.as_slice(), &self.range)
    }

    /// Produce the detached signature over the covered bytes.
    pub fn sign(self) -> Result<Signed> {
        let data = self.signed_bytes()?;
        let signature = SignatureCodec::sign(&data, self.keys, self.algorithm, self.signing_time)?;
        Ok(Signed {
            buffer: self.buffer,
            range: self.range,
            signature,
        })
    }
}

/// Signature produced, not yet written into the document.
#[derive(Debug)]
pub struct Signed {
    buffer: WorkingBuffer,
    range: ByteRange,
    signature: Vec<u8>,
}

impl Signed {
    /// DER signature bytes.
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Write the signature into its slot and hand out the document.
    pub fn embed(mut self) -> Result<Vec<u8>> {
        ByteRangeCalculator::embed(&mut self.buffer, &self.range, &self.signature)?;
        log::info!(
            "Embedded {} byte signature, ByteRange {}",
            self.signature.len(),
            self.range
        );
        Ok(self.buffer.into_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signatures::annotations::AnnotationScanner;
    use chrono::TimeZone;

    const CERT: &[u8] = include_bytes!("../../tests/fixtures/keys/signer-cert.pem");
    const KEY: &[u8] = include_bytes!("../../tests/fixtures/keys/signer-key.pem");

    fn document() -> PdfDocument {
        let text = b"%PDF-1.4\n\
1 0 obj <</Type /Catalog /Pages 2 0 R>> endobj\n\
2 0 obj <</Type /Pages /Kids [3 0 R] /Count 1>> endobj\n\
3 0 obj <</Type /Page /Parent 2 0 R /MediaBox [0 0 612 792]>> endobj\n\
trailer <</Size 4 /Root 1 0 R>>\n";
        PdfDocument::load(text.to_vec(), None).unwrap()
    }

    fn signer() -> PdfSigner {
        let mut signer = PdfSigner::new(document(), SigningConfig::default());
        signer.load_pair_from_memory(CERT, KEY, None).unwrap();
        signer
    }

    #[test]
    fn test_sign_without_keys() {
        let signer = PdfSigner::new(document(), SigningConfig::default());
        assert!(!signer.is_pair_loaded());
        assert!(matches!(
            signer.sign(&SignatureRequest::new(1, 0.0, 0.0)),
            Err(Error::KeyPairNotLoaded)
        ));
    }

    #[test]
    fn test_signature_size_grows_with_key_material() {
        let signer = signer();
        assert!(signer.signature_size() >= CERT.len() + KEY.len() + 100);
        let fixed = PdfSigner {
            config: SigningConfig::default().with_signature_size(64).with_grow_to_key_size(false),
            ..signer
        };
        assert_eq!(fixed.signature_size(), 64);
    }

    #[test]
    fn test_state_transitions() {
        let signer = signer();
        let at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let request = SignatureRequest::new(1, 100.0, 100.0).with_signing_time(at);

        let inserted = signer.prepare(&request).unwrap();
        let len = inserted.as_bytes().len();
        let computed = inserted.compute_range().unwrap();
        let range = computed.byte_range();
        assert_eq!(range.values()[2] + range.values()[3], len as i64);
        let signed = computed.sign().unwrap();
        assert_eq!(signed.signature()[0], 0x30);
        let out = signed.embed().unwrap();
        assert_eq!(out.len(), len);

        let doc = PdfDocument::load(out, None).unwrap();
        let found = AnnotationScanner::new(&doc, "pmesp.signer").scan().unwrap();
        assert_eq!(found.len(), 1);
        assert!(!found[0].pending);
        assert_eq!(found[0].byte_range, range);
        assert_eq!(found[0].signing_time(), Some(at));
    }

    #[test]
    fn test_sign_final_requires_seal() {
        let signer = signer();
        assert!(!signer.is_seal_loaded());
        assert!(matches!(
            signer.sign_final(&SignatureRequest::new(1, 0.0, 0.0)),
            Err(Error::SealNotLoaded)
        ));
    }

    #[test]
    fn test_sign_final_appends_seal() {
        let mut signer = signer();
        signer.load_seal_from_memory(CERT, KEY, None).unwrap();
        let at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let request = SignatureRequest::new(1, 100.0, 100.0)
            .with_reason("seal-me")
            .with_signing_time(at);
        let out = signer.sign_final(&request).unwrap();

        let doc = PdfDocument::load(out, None).unwrap();
        let found = AnnotationScanner::new(&doc, "pmesp.signer").scan().unwrap();
        assert_eq!(found.len(), 2);
        let mut times: Vec<_> = found.iter().filter_map(|a| a.signing_time()).collect();
        times.sort();
        assert_eq!(times[0], at);
        assert!(times[1] > at);
        assert!(found.iter().all(|a| a.reason == "seal-me"));
    }

    #[test]
    fn test_oversized_signature_aborts() {
        let mut signer = PdfSigner::new(
            document(),
            SigningConfig::default().with_signature_size(16).with_grow_to_key_size(false),
        );
        signer.load_pair_from_memory(CERT, KEY, None).unwrap();
        let err = signer.sign(&SignatureRequest::new(1, 0.0, 0.0)).unwrap_err();
        assert!(matches!(err, Error::SignatureTooLarge { capacity: 16, .. }));
    }
}
