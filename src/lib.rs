// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::too_many_arguments)]
#![allow(clippy::enum_variant_names)]
#![allow(clippy::manual_find)]
// Allow unused for tests
#![cfg_attr(test, allow(dead_code))]
#![cfg_attr(test, allow(unused_variables))]

//! # PDF Seal
//!
//! Detached PKCS#7 signatures for PDF documents: embed, verify, extract and
//! order them.
//!
//! ## Core Features
//!
//! - **Byte-exact signing**: a fixed-width placeholder is appended as an
//!   incremental update, its ByteRange rewritten in place and the DER
//!   signature embedded without changing the file length
//! - **CMS signed-data**: RSA (PKCS#1 v1.5) and ECDSA P-256 signers with
//!   content-type, message-digest and signing-time attributes
//! - **Strict field decoding**: malformed signature dictionaries abort the
//!   scan instead of being skipped
//! - **Verification**: every signature re-checked against the bytes it
//!   covers in the document as loaded
//! - **Ordering**: first/last signature by signing time
//!
//! ## Quick Start
//!
//! ```ignore
//! use pdf_seal::{PdfDocument, PdfSigner, SignatureRequest, SignatureVerifier, SigningConfig};
//!
//! # fn main() -> pdf_seal::Result<()> {
//! let config = SigningConfig::default();
//! let mut signer = PdfSigner::open("contract.pdf", None, config.clone())?;
//! signer.load_pair_from_files("cert.pem", "key.pem", Some("secret"))?;
//! let signed = signer.sign(&SignatureRequest::new(1, 72.0, 72.0).with_reason("contract-17"))?;
//!
//! let doc = PdfDocument::load(signed, None)?;
//! let verifier = SignatureVerifier::new(&doc, &config)?;
//! assert!(verifier.verify()?);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

// Error handling
pub mod error;

// Core PDF parsing
pub mod buffer;
pub mod document;
pub mod lexer;
pub mod object;
pub mod parser;
pub mod xref;

// Writing
pub mod writer;

// Signatures
pub mod signatures;

// High-level API
pub mod api;

// Configuration
pub mod config;

pub use buffer::{OriginalBuffer, WorkingBuffer};
pub use config::SigningConfig;
pub use document::PdfDocument;
pub use error::{Error, ErrorCategory, Result};
pub use signatures::{
    init_crypto_runtime, ByteRange, ByteRangeCalculator, DigestAlgorithm, KeyMaterial, PdfSigner,
    SignatureAnnotation, SignatureCodec, SignatureRequest, SignatureVerifier,
};

// Version info
/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
