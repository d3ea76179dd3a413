//! Process-wide crypto registry.
//!
//! The registry maps the object identifiers found in signed-data structures
//! and certificates to the algorithms this crate implements. It is built once
//! by [`init_crypto_runtime`]; every later call returns the same instance.

use super::types::DigestAlgorithm;
use der::oid::ObjectIdentifier;
use std::sync::OnceLock;

/// `rsaEncryption`
pub const RSA_ENCRYPTION: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
/// `id-ecPublicKey`
pub const EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
/// `prime256v1` / `secp256r1`
pub const SECP256R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");

/// Key algorithm family of a signer certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFamily {
    /// RSA with PKCS#1 v1.5 padding
    Rsa,
    /// ECDSA over NIST P-256
    EcdsaP256,
}

/// Registry of supported algorithm identifiers.
#[derive(Debug)]
pub struct CryptoRuntime {
    digests: Vec<(ObjectIdentifier, DigestAlgorithm)>,
    signatures: Vec<(ObjectIdentifier, KeyFamily)>,
}

static RUNTIME: OnceLock<CryptoRuntime> = OnceLock::new();

/// Initialize the crypto registry. Idempotent; safe to call from any thread.
pub fn init_crypto_runtime() -> &'static CryptoRuntime {
    RUNTIME.get_or_init(|| {
        let runtime = CryptoRuntime::build();
        log::info!(
            "Crypto runtime ready: {} digest and {} signature algorithms",
            runtime.digests.len(),
            runtime.signatures.len()
        );
        runtime
    })
}

impl CryptoRuntime {
    fn build() -> Self {
        let digests = DigestAlgorithm::ALL.iter().map(|alg| (alg.oid(), *alg)).collect();
        let signatures = [
            (RSA_ENCRYPTION, KeyFamily::Rsa),
            // sha1/sha256/sha384/sha512 WithRSAEncryption
            (ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.5"), KeyFamily::Rsa),
            (ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.11"), KeyFamily::Rsa),
            (ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.12"), KeyFamily::Rsa),
            (ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.13"), KeyFamily::Rsa),
            (EC_PUBLIC_KEY, KeyFamily::EcdsaP256),
            // ecdsa-with-SHA256/384/512
            (ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.2"), KeyFamily::EcdsaP256),
            (ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.3"), KeyFamily::EcdsaP256),
            (ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.4"), KeyFamily::EcdsaP256),
        ]
        .to_vec();
        Self {
            digests,
            signatures,
        }
    }

    /// Digest algorithm for an `AlgorithmIdentifier` OID.
    pub fn digest_for_oid(&self, oid: &ObjectIdentifier) -> Option<DigestAlgorithm> {
        self.digests.iter().find(|(o, _)| o == oid).map(|(_, alg)| *alg)
    }

    /// Key family for a public key or signature algorithm OID.
    pub fn key_family_for_oid(&self, oid: &ObjectIdentifier) -> Option<KeyFamily> {
        self.signatures.iter().find(|(o, _)| o == oid).map(|(_, family)| *family)
    }

    /// Number of registered digest algorithms.
    pub fn digest_count(&self) -> usize {
        self.digests.len()
    }
}
