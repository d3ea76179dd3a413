//! Detached PKCS#7 signatures for PDF documents.
//!
//! - [`byterange`]: placeholder location, ByteRange rewriting and slicing
//! - [`codec`]: CMS signed-data encoding, decoding and verification
//! - [`annotations`]: discovery of signature fields
//! - [`ordering`]: first/last signature selection
//! - [`signer`]: the signing state machine
//! - [`verifier`]: whole-document verification and queries

pub mod annotations;
pub mod byterange;
pub mod codec;
pub mod credentials;
pub mod field;
pub mod ordering;
pub mod runtime;
pub mod signer;
pub mod types;
pub mod verifier;

pub use annotations::{AnnotationScanner, SignatureAnnotation};
pub use byterange::{ByteRange, ByteRangeCalculator, BYTE_RANGE_PLACEHOLDER, PENDING_SENTINEL};
pub use codec::{ParsedSignature, SignatureCodec};
pub use credentials::{KeyMaterial, SignerSummary};
pub use ordering::{Edge, SignatureOrderer};
pub use runtime::init_crypto_runtime;
pub use signer::{PdfSigner, PlaceholderInserted, RangeComputed, Signed};
pub use types::{DigestAlgorithm, SignatureRequest};
pub use verifier::SignatureVerifier;
