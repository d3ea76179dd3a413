//! Integration tests for first/last signature selection across incremental
//! updates.

mod common;

use common::*;
use pdf_seal::signatures::{Edge, SignatureOrderer};
use pdf_seal::{PdfDocument, SignatureVerifier, SigningConfig};

/// Sign a fresh document once per entry of `times`, in order.
fn signed_at(times: &[i64]) -> PdfDocument {
    let mut bytes = simple_pdf(1);
    for &secs in times {
        bytes = sign(&bytes, "ordered", secs);
    }
    PdfDocument::load(bytes, None).unwrap()
}

fn digests(verifier: &SignatureVerifier<'_>) -> Vec<Vec<u8>> {
    verifier
        .annotations()
        .iter()
        .map(|a| a.message_digest().unwrap().to_vec())
        .collect()
}

#[test]
fn test_single_signature_is_both_ends() {
    let doc = signed_at(&[1_800_000_000]);
    let verifier = SignatureVerifier::new(&doc, &SigningConfig::default()).unwrap();
    let only = digests(&verifier).remove(0);
    assert_eq!(verifier.first_signature(), only);
    assert_eq!(verifier.last_signature(), only);
}

#[test]
fn test_out_of_order_signing_times() {
    let doc = signed_at(&[1_800_000_200, 1_800_000_100, 1_800_000_300]);
    let verifier = SignatureVerifier::new(&doc, &SigningConfig::default()).unwrap();
    let all = digests(&verifier);
    assert_eq!(all.len(), 3);
    assert!(verifier.verify().unwrap());
    assert_eq!(verifier.first_signature(), all[1]);
    assert_eq!(verifier.last_signature(), all[2]);
    assert_eq!(verifier.latest_digest(), all[2]);
}

#[test]
fn test_sweep_reports_last_pair_winner() {
    let doc = signed_at(&[1_800_000_100, 1_800_000_300, 1_800_000_200]);
    let verifier = SignatureVerifier::new(&doc, &SigningConfig::default()).unwrap();
    let annotations = verifier.annotations();
    assert_eq!(SignatureOrderer::winner(annotations, Edge::First), Some(2));
    assert_eq!(SignatureOrderer::winner(annotations, Edge::Last), Some(1));
}

#[test]
fn test_equal_times_have_no_winner() {
    let doc = signed_at(&[1_800_000_000, 1_800_000_000]);
    let verifier = SignatureVerifier::new(&doc, &SigningConfig::default()).unwrap();
    assert!(verifier.verify().unwrap());
    assert!(verifier.first_signature().is_empty());
    assert!(verifier.last_signature().is_empty());
}
