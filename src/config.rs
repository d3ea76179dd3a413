//! Configuration for signing and verification.

use crate::error::{Error, Result};
use crate::signatures::DigestAlgorithm;
use serde::{Deserialize, Serialize};

/// Field name (`/T`) marking signature fields created by this crate.
pub const DEFAULT_APP_IDENTIFIER: &str = "pmesp.signer";

/// Bytes reserved for the DER signature when nothing else is configured.
pub const DEFAULT_SIGNATURE_SIZE: usize = 8192;

/// Signing and verification configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningConfig {
    /// `/T` value identifying this application's signature fields.
    pub app_identifier: String,

    /// Bytes reserved for the DER-encoded signature.
    pub signature_size: usize,

    /// Digest used for new signatures.
    pub digest_algorithm: DigestAlgorithm,

    /// Width of a provisional signature widget.
    pub field_width: f64,

    /// Height of a provisional signature widget.
    pub field_height: f64,

    /// Minimum distance kept between the widget's left edge and the page's
    /// right edge.
    pub right_margin: f64,

    /// Offset from the lower-left corner of the last page for final
    /// signatures.
    pub final_offset: f64,

    /// Side of the square footprint of a final signature.
    pub final_size: f64,

    /// Raise `signature_size` to what the loaded key pair needs.
    pub grow_to_key_size: bool,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SigningConfig {
    /// Create new configuration with defaults.
    pub fn new() -> Self {
        Self {
            app_identifier: DEFAULT_APP_IDENTIFIER.to_string(),
            signature_size: DEFAULT_SIGNATURE_SIZE,
            digest_algorithm: DigestAlgorithm::Sha256,
            field_width: 300.0,
            field_height: 100.0,
            right_margin: 180.0,
            final_offset: 10.0,
            final_size: 10.0,
            grow_to_key_size: true,
        }
    }

    /// Parse configuration from JSON. Missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    /// Set the field identifier.
    pub fn with_app_identifier(mut self, id: impl Into<String>) -> Self {
        self.app_identifier = id.into();
        self
    }

    /// Set the reserved signature size in bytes.
    pub fn with_signature_size(mut self, size: usize) -> Self {
        self.signature_size = size;
        self
    }

    /// Set the digest algorithm for new signatures.
    pub fn with_digest_algorithm(mut self, algorithm: DigestAlgorithm) -> Self {
        self.digest_algorithm = algorithm;
        self
    }

    /// Set the provisional widget size.
    pub fn with_field_size(mut self, width: f64, height: f64) -> Self {
        self.field_width = width;
        self.field_height = height;
        self
    }

    /// Enable or disable growing the reservation to the key pair's size.
    pub fn with_grow_to_key_size(mut self, grow: bool) -> Self {
        self.grow_to_key_size = grow;
        self
    }

    /// Set the right margin.
    pub fn with_right_margin(mut self, margin: f64) -> Self {
        self.right_margin = margin;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SigningConfig::default();
        assert_eq!(config.app_identifier, "pmesp.signer");
        assert_eq!(config.signature_size, 8192);
        assert_eq!(config.digest_algorithm, DigestAlgorithm::Sha256);
        assert_eq!((config.field_width, config.field_height), (300.0, 100.0));
        assert_eq!(config.right_margin, 180.0);
        assert!(config.grow_to_key_size);
    }

    #[test]
    fn test_builder() {
        let config = SigningConfig::new()
            .with_app_identifier("acme.signer")
            .with_signature_size(4096)
            .with_digest_algorithm(DigestAlgorithm::Sha512)
            .with_field_size(200.0, 50.0);
        assert_eq!(config.app_identifier, "acme.signer");
        assert_eq!(config.signature_size, 4096);
        assert_eq!(config.field_height, 50.0);
    }

    #[test]
    fn test_from_json_partial() {
        let config =
            SigningConfig::from_json(r#"{"signature_size": 16384, "digest_algorithm": "sha384"}"#)
                .unwrap();
        assert_eq!(config.signature_size, 16384);
        assert_eq!(config.digest_algorithm, DigestAlgorithm::Sha384);
        assert_eq!(config.app_identifier, DEFAULT_APP_IDENTIFIER);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        let err = SigningConfig::from_json("{signature_size:").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }
}
