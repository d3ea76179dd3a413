//! Integration tests for signing a document and verifying the result.

mod common;

use common::*;
use pdf_seal::signatures::{ByteRangeCalculator, BYTE_RANGE_PLACEHOLDER, PENDING_SENTINEL};
use pdf_seal::{DigestAlgorithm, KeyMaterial, PdfDocument, PdfSigner, SignatureVerifier, SigningConfig};

#[test]
fn test_sign_then_verify() {
    init_logging();
    let pdf = simple_pdf(1);
    let signed = sign(&pdf, "invoice-2031", 1_800_000_000);

    assert!(signed.starts_with(&pdf), "signing must only append");
    let doc = PdfDocument::load(signed, None).unwrap();
    let verifier = SignatureVerifier::new(&doc, &SigningConfig::default()).unwrap();
    assert_eq!(verifier.annotations().len(), 1);
    assert!(verifier.verify().unwrap());
    assert_eq!(verifier.document_id(), "invoice-2031");

    let annotation = &verifier.annotations()[0];
    assert!(!annotation.pending);
    assert_eq!(annotation.location, "Lisbon");
    assert_eq!(annotation.sub_filter, "adbe.pkcs7.detached");
    assert_eq!(annotation.sig_type, "Sig");
    assert_eq!(annotation.creator.as_deref(), Some("pdf_seal"));
    assert_eq!(annotation.signing_time(), Some(at(1_800_000_000)));
    assert_eq!(annotation.certificates().len(), 1);
}

#[test]
fn test_byte_range_covers_everything_but_contents() {
    let signed = sign(&simple_pdf(1), "range", 1_800_000_000);
    let doc = PdfDocument::load(signed.clone(), None).unwrap();
    let verifier = SignatureVerifier::new(&doc, &SigningConfig::default()).unwrap();
    let [a, b, c, d] = verifier.annotations()[0].byte_range.values();

    assert_eq!(a, 0);
    assert_eq!((c + d) as usize, signed.len());
    assert_eq!(signed[b as usize], b'<');
    assert_eq!(signed[c as usize - 1], b'>');
    let hex = &signed[b as usize + 1..c as usize - 1];
    assert!(hex.iter().all(u8::is_ascii_hexdigit));
    assert_eq!(hex.len(), 2 * SigningConfig::default().signature_size);
}

#[test]
fn test_step_by_step_signing() {
    let document = PdfDocument::load(simple_pdf(2), None).unwrap();
    let mut signer = PdfSigner::new(document, SigningConfig::default());
    signer.load_pair_from_memory(CERT, KEY, None).unwrap();

    let inserted = signer.prepare(&request("steps", 1_800_000_000)).unwrap();
    let placeholder = ByteRangeCalculator::locate(inserted.as_bytes(), inserted.signature_offset()).unwrap();
    assert!(placeholder.contents_end > placeholder.contents_start);

    let computed = inserted.compute_range().unwrap();
    let range = computed.byte_range();
    let covered = computed.signed_bytes().unwrap();
    assert_eq!(covered.len() as i64, range.signed_len());

    let signed = computed.sign().unwrap();
    assert!(!signed.signature().starts_with(&PENDING_SENTINEL));
    let bytes = signed.embed().unwrap();

    let doc = PdfDocument::load(bytes, None).unwrap();
    let verifier = SignatureVerifier::new(&doc, &SigningConfig::default()).unwrap();
    assert_eq!(verifier.annotations()[0].byte_range, range);
    assert!(verifier.verify().unwrap());
}

#[test]
fn test_every_rsa_digest_verifies() {
    for algorithm in [DigestAlgorithm::Sha256, DigestAlgorithm::Sha384, DigestAlgorithm::Sha512] {
        let config = SigningConfig::default().with_digest_algorithm(algorithm);
        let signed = sign_with(&simple_pdf(1), CERT, KEY, &request("alg", 1_800_000_000), &config);
        let doc = PdfDocument::load(signed, None).unwrap();
        let verifier = SignatureVerifier::new(&doc, &config).unwrap();
        assert!(verifier.verify().unwrap(), "{:?}", algorithm);
        let signature = verifier.annotations()[0].signature.as_ref().unwrap();
        assert_eq!(signature.digest_algorithm, Some(algorithm));
    }
}

#[test]
fn test_ecdsa_signing() {
    let config = SigningConfig::default();
    let signed = sign_with(&simple_pdf(1), EC_CERT, EC_KEY, &request("ec", 1_800_000_000), &config);
    let doc = PdfDocument::load(signed, None).unwrap();
    let verifier = SignatureVerifier::new(&doc, &config).unwrap();
    assert!(verifier.verify().unwrap());
}

#[test]
fn test_ecdsa_rejects_other_digests() {
    let document = PdfDocument::load(simple_pdf(1), None).unwrap();
    let config = SigningConfig::default().with_digest_algorithm(DigestAlgorithm::Sha512);
    let mut signer = PdfSigner::new(document, config);
    signer.load_pair_from_memory(EC_CERT, EC_KEY, None).unwrap();
    let err = signer.sign(&request("ec", 1_800_000_000)).unwrap_err();
    assert!(matches!(err, pdf_seal::Error::Unsupported(_)));
}

#[test]
fn test_incremental_signatures_all_verify() {
    let pdf = simple_pdf(3);
    let once = sign(&pdf, "contract-9", 1_800_000_000);
    let twice = sign_with(
        &once,
        OTHER_CERT,
        OTHER_KEY,
        &request("contract-9", 1_800_000_500),
        &SigningConfig::default(),
    );
    assert!(twice.starts_with(&once));

    let doc = PdfDocument::load(twice, None).unwrap();
    let verifier = SignatureVerifier::new(&doc, &SigningConfig::default()).unwrap();
    assert_eq!(verifier.annotations().len(), 2);
    assert!(verifier.verify().unwrap());
    assert_ne!(verifier.first_signature(), verifier.last_signature());
}

#[test]
fn test_final_signature_goes_on_last_page() {
    let document = PdfDocument::load(simple_pdf(3), None).unwrap();
    let mut signer = PdfSigner::new(document, SigningConfig::default());
    signer.load_pair_from_memory(CERT, KEY, None).unwrap();
    let request = pdf_seal::SignatureRequest::final_signature()
        .with_reason("closing")
        .with_signing_time(at(1_800_000_000));
    let signed = signer.sign(&request).unwrap();

    let doc = PdfDocument::load(signed, None).unwrap();
    let last_page = *doc.pages().unwrap().last().unwrap();
    let page = doc.get(last_page).unwrap().as_dict().unwrap();
    assert!(page.get("Annots").is_some());
    let verifier = SignatureVerifier::new(&doc, &SigningConfig::default()).unwrap();
    assert!(verifier.verify().unwrap());
}

#[test]
fn test_custom_app_identifier_is_isolated() {
    let config = SigningConfig::default().with_app_identifier("acme.signer");
    let signed = sign_with(&simple_pdf(1), CERT, KEY, &request("acme", 1_800_000_000), &config);
    let doc = PdfDocument::load(signed, None).unwrap();

    let acme = SignatureVerifier::new(&doc, &config).unwrap();
    assert_eq!(acme.annotations().len(), 1);
    let default = SignatureVerifier::new(&doc, &SigningConfig::default()).unwrap();
    assert!(default.annotations().is_empty());
    assert!(!default.verify().unwrap());
}

#[test]
fn test_non_ascii_text_round_trips() {
    let config = SigningConfig::default();
    let request = pdf_seal::SignatureRequest::new(1, 50.0, 50.0)
        .with_reason("contrato-n\u{ba}7 \u{2014} S\u{e3}o")
        .with_location("S\u{e3}o Paulo")
        .with_signing_time(at(1_800_000_000));
    let signed = sign_with(&simple_pdf(1), CERT, KEY, &request, &config);

    // Non-ASCII text is written as UTF-16BE with a byte order mark.
    assert!(signed.windows(9).any(|w| w == b"(\\376\\377"));
    let doc = PdfDocument::load(signed, None).unwrap();
    let verifier = SignatureVerifier::new(&doc, &config).unwrap();
    assert!(verifier.verify().unwrap());
    let annotation = &verifier.annotations()[0];
    assert_eq!(annotation.location, "S\u{e3}o Paulo");
    assert_eq!(verifier.document_id(), "contrato-n\u{ba}7 \u{2014} S\u{e3}o");
    assert!(verifier.validate_id("contrato-n\u{ba}7 \u{2014} S\u{e3}o"));
}

#[test]
fn test_placeholder_text_in_later_object_is_not_rewritten() {
    // The widget /T is written after the signature dictionary and carries
    // the placeholder declaration as literal text.
    let config = SigningConfig::default().with_app_identifier(BYTE_RANGE_PLACEHOLDER);
    let once = sign_with(&simple_pdf(2), CERT, KEY, &request("decoy", 1_800_000_000), &config);
    assert_eq!(
        once.windows(BYTE_RANGE_PLACEHOLDER.len())
            .filter(|w| *w == BYTE_RANGE_PLACEHOLDER.as_bytes())
            .count(),
        1
    );
    let twice = sign_with(&once, OTHER_CERT, OTHER_KEY, &request("decoy", 1_800_000_100), &config);

    let doc = PdfDocument::load(twice, None).unwrap();
    let verifier = SignatureVerifier::new(&doc, &config).unwrap();
    assert_eq!(verifier.annotations().len(), 2);
    assert!(verifier.verify().unwrap());
}

#[test]
fn test_sign_final_seals_with_separate_keys() {
    let document = PdfDocument::load(simple_pdf(3), None).unwrap();
    let mut signer = PdfSigner::new(document, SigningConfig::default());
    signer.load_pair_from_memory(CERT, KEY, None).unwrap();
    signer.load_seal_from_memory(OTHER_CERT, OTHER_KEY, None).unwrap();
    let sealed = signer.sign_final(&request("contract-31", 1_800_000_000)).unwrap();

    let doc = PdfDocument::load(sealed, None).unwrap();
    let verifier = SignatureVerifier::new(&doc, &SigningConfig::default()).unwrap();
    assert_eq!(verifier.annotations().len(), 2);
    assert!(verifier.verify().unwrap());
    assert_eq!(verifier.document_id(), "contract-31");

    let seal_cert = KeyMaterial::from_pem(OTHER_CERT, OTHER_KEY, None).unwrap().certificate().clone();
    let seal = verifier
        .annotations()
        .iter()
        .max_by_key(|a| a.signing_time())
        .unwrap();
    assert_eq!(seal.certificates()[0], seal_cert);
    assert_eq!(verifier.last_signature(), seal.message_digest().unwrap());
    assert_ne!(verifier.first_signature(), verifier.last_signature());

    let last_page = *doc.pages().unwrap().last().unwrap();
    let page = doc.get(last_page).unwrap().as_dict().unwrap();
    assert!(page.get("Annots").is_some());
}
