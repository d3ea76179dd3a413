//! Digital signature types and data structures.

use chrono::{DateTime, Utc};
use der::oid::ObjectIdentifier;
use serde::{Deserialize, Serialize};
use sha2::Digest;

/// `/SubFilter` written into new signature dictionaries.
pub const SUB_FILTER_PKCS7_DETACHED: &str = "adbe.pkcs7.detached";

/// `/Filter` written into new signature dictionaries.
pub const FILTER_ADOBE_PPKLITE: &str = "Adobe.PPKLite";

/// Digest algorithm used for signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// SHA-1 (verification of legacy signatures only)
    Sha1,
    /// SHA-256
    #[default]
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
}

impl DigestAlgorithm {
    /// Every supported algorithm.
    pub const ALL: [DigestAlgorithm; 4] = [
        DigestAlgorithm::Sha1,
        DigestAlgorithm::Sha256,
        DigestAlgorithm::Sha384,
        DigestAlgorithm::Sha512,
    ];

    /// Get the OID for this digest algorithm.
    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            DigestAlgorithm::Sha1 => ObjectIdentifier::new_unwrap("1.3.14.3.2.26"),
            DigestAlgorithm::Sha256 => ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.1"),
            DigestAlgorithm::Sha384 => ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.2"),
            DigestAlgorithm::Sha512 => ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.3"),
        }
    }

    /// Get the name of this algorithm.
    pub fn name(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha1 => "SHA-1",
            DigestAlgorithm::Sha256 => "SHA-256",
            DigestAlgorithm::Sha384 => "SHA-384",
            DigestAlgorithm::Sha512 => "SHA-512",
        }
    }

    /// Hash `data`.
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            DigestAlgorithm::Sha1 => sha1::Sha1::digest(data).to_vec(),
            DigestAlgorithm::Sha256 => sha2::Sha256::digest(data).to_vec(),
            DigestAlgorithm::Sha384 => sha2::Sha384::digest(data).to_vec(),
            DigestAlgorithm::Sha512 => sha2::Sha512::digest(data).to_vec(),
        }
    }
}

/// Where and how a new signature field is placed, plus the metadata written
/// into its signature dictionary. Lives for one signing call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignatureRequest {
    /// `/Reason`; also read back as the document identifier
    pub reason: String,
    /// `/Location`
    pub location: String,
    /// `/Prop_Build /App /Name`
    pub creator: String,
    /// 1-based page number, clamped into the document's page range
    pub page: usize,
    /// Left edge of the widget in default user space
    pub x: f64,
    /// Bottom edge of the widget in default user space
    pub y: f64,
    /// Append-only final signature with a minimal fixed footprint
    pub final_signature: bool,
    /// Signing time to embed; `None` uses the current time
    pub signing_time: Option<DateTime<Utc>>,
}

impl SignatureRequest {
    /// Provisional signature on `page` at (`x`, `y`).
    pub fn new(page: usize, x: f64, y: f64) -> Self {
        Self {
            page,
            x,
            y,
            ..Self::default()
        }
    }

    /// Final signature; placement is decided by the configuration.
    pub fn final_signature() -> Self {
        Self {
            final_signature: true,
            ..Self::default()
        }
    }

    /// Set the reason (document identifier).
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// Set the signing location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// Set the creator application name.
    pub fn with_creator(mut self, creator: impl Into<String>) -> Self {
        self.creator = creator.into();
        self
    }

    /// Pin the embedded signing time.
    pub fn with_signing_time(mut self, at: DateTime<Utc>) -> Self {
        self.signing_time = Some(at);
        self
    }
}
