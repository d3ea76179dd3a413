//! Error types for PDF signing and verification.
//!
//! Every failure is one of four kinds (structural, crypto, capacity, auth)
//! plus I/O and unsupported input. A signature that simply does not match
//! its data is not an error: verification reports it as `Ok(false)`.

/// Result type alias for signing and verification operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad classification of an [`Error`], used to pick a return code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Malformed document structure or signature field.
    Structural,
    /// ASN.1/PKCS#7 decoding or signing failure.
    Crypto,
    /// Placeholder missing or too small for the signature.
    Capacity,
    /// Missing or wrong credentials.
    Auth,
    /// Underlying I/O failure.
    Io,
    /// Valid input this crate does not handle.
    Unsupported,
}

impl ErrorCategory {
    /// Negative return code for this category.
    pub fn code(self) -> i32 {
        match self {
            ErrorCategory::Structural => -1,
            ErrorCategory::Crypto => -2,
            ErrorCategory::Capacity => -3,
            ErrorCategory::Auth => -4,
            ErrorCategory::Io => -5,
            ErrorCategory::Unsupported => -6,
        }
    }
}

/// Error types that can occur while signing or verifying a PDF.
#[derive(Debug, thiserror::Error)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    /// Parse error at specific byte offset
    #[error("Failed to parse object at byte {offset}: {reason}")]
    ParseError {
        /// Byte offset where error occurred
        offset: usize,
        /// Reason for parse failure
        reason: String,
    },

    /// Invalid PDF structure (generic)
    #[error("Invalid PDF: {0}")]
    InvalidPdf(String),

    /// Referenced object not found in the object table
    #[error("Object not found: {0} {1} R")]
    ObjectNotFound(u32, u16),

    /// Object has wrong type
    #[error("Invalid object type: expected {expected}, found {found}")]
    InvalidObjectType {
        /// Expected object type
        expected: String,
        /// Actual object type found
        found: String,
    },

    /// Circular reference detected in object graph
    #[error("Circular reference detected: object {0}")]
    CircularReference(crate::object::ObjectRef),

    /// A signature field dictionary is missing a key or holds the wrong type
    #[error("Invalid signature annotation field /{field}: {reason}")]
    InvalidAnnotation {
        /// Dictionary key that failed to decode
        field: &'static str,
        /// What was wrong with it
        reason: String,
    },

    /// PKCS#7 blob could not be decoded or is not signed-data
    #[error("Malformed signature: {0}")]
    MalformedSignature(String),

    /// Signer info carries no signed attributes
    #[error("Signer info has no signed attributes")]
    MissingSignedAttributes,

    /// PKCS#7 signing operation failed
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Certificate or private key could not be decoded or do not match
    #[error("Invalid key material: {0}")]
    InvalidKey(String),

    /// The fixed-width placeholder token was not found
    #[error("Signature placeholder not found: {0}")]
    PlaceholderNotFound(String),

    /// Rewriting the placeholder would change the document length
    #[error("Byte range declaration is {actual} bytes, placeholder holds {expected}")]
    PlaceholderWidth {
        /// Width of the reserved declaration
        expected: usize,
        /// Width of the substituted text
        actual: usize,
    },

    /// Signature does not fit in the reserved /Contents slot
    #[error("Signature value out of prescribed range: {size} bytes, {capacity} reserved")]
    SignatureTooLarge {
        /// DER size of the signature
        size: usize,
        /// Reserved placeholder capacity in bytes
        capacity: usize,
    },

    /// A byte range points past the end of the buffer
    #[error("Byte range ends at {end}, buffer holds {len} bytes")]
    ByteRangeOutOfBounds {
        /// End offset requested by the range
        end: usize,
        /// Length of the buffer
        len: usize,
    },

    /// Encrypted document opened without a password
    #[error("Document is encrypted and requires a password")]
    PasswordRequired,

    /// Password did not unlock the key or document
    #[error("Incorrect password")]
    InvalidPassword,

    /// Signing attempted before loading a certificate and key
    #[error("Key pair not loaded")]
    KeyPairNotLoaded,

    /// Final signature requested without seal credentials
    #[error("Seal key pair not loaded")]
    SealNotLoaded,

    /// Configuration could not be decoded
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unsupported feature
    #[error("Unsupported feature: {0}")]
    Unsupported(String),
}

impl Error {
    /// Classify this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::ParseError { .. }
            | Error::InvalidPdf(_)
            | Error::ObjectNotFound(..)
            | Error::InvalidObjectType { .. }
            | Error::CircularReference(_)
            | Error::InvalidAnnotation { .. }
            | Error::InvalidConfig(_) => ErrorCategory::Structural,
            Error::MalformedSignature(_)
            | Error::MissingSignedAttributes
            | Error::Signing(_)
            | Error::InvalidKey(_) => ErrorCategory::Crypto,
            Error::PlaceholderNotFound(_)
            | Error::PlaceholderWidth { .. }
            | Error::SignatureTooLarge { .. }
            | Error::ByteRangeOutOfBounds { .. } => ErrorCategory::Capacity,
            Error::PasswordRequired
            | Error::InvalidPassword
            | Error::KeyPairNotLoaded
            | Error::SealNotLoaded => ErrorCategory::Auth,
            Error::Io(_) => ErrorCategory::Io,
            Error::Unsupported(_) => ErrorCategory::Unsupported,
        }
    }

    /// Negative return code for callers that speak integers.
    pub fn code(&self) -> i32 {
        self.category().code()
    }

    pub(crate) fn annotation(field: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidAnnotation {
            field,
            reason: reason.into(),
        }
    }
}

impl From<der::Error> for Error {
    fn from(err: der::Error) -> Self {
        Error::MalformedSignature(err.to_string())
    }
}
