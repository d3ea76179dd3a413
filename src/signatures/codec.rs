//! Detached PKCS#7 / CMS signed-data encoding, decoding and verification.
//!
//! Only the first signer info of a signed-data structure is considered.
//! Verification checks that the embedded signer certificate signed the
//! supplied bytes; it does not build or validate a trust chain.

use super::credentials::{KeyMaterial, PrivateKey};
use super::runtime::{init_crypto_runtime, KeyFamily, SECP256R1};
use super::types::DigestAlgorithm;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use cms::builder::{SignedDataBuilder, SignerInfoBuilder};
use cms::cert::{CertificateChoices, IssuerAndSerialNumber};
use cms::content_info::ContentInfo;
use cms::signed_data::{EncapsulatedContentInfo, SignedData, SignerIdentifier, SignerInfo};
use der::asn1::{Any, GeneralizedTime, ObjectIdentifier, OctetString, SetOfVec, UtcTime};
use der::{Decode, Encode, SliceReader};
use pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Sign, RsaPublicKey};
use signature::hazmat::PrehashVerifier;
use spki::AlgorithmIdentifierOwned;
use std::fmt::Display;
use std::time::Duration;
use x509_cert::attr::Attribute;
use x509_cert::time::Time;
use x509_cert::Certificate;

/// `id-data`
pub const ID_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.1");
/// `id-signedData`
pub const ID_SIGNED_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.2");
/// `id-messageDigest`
pub const ID_MESSAGE_DIGEST: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.4");
/// `id-signingTime`
pub const ID_SIGNING_TIME: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.5");
/// `id-ce-subjectKeyIdentifier`
const ID_SUBJECT_KEY_IDENTIFIER: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.14");

/// Decoded view of a signed-data blob.
#[derive(Debug, Clone)]
pub struct ParsedSignature {
    /// First signer info of the structure
    pub signer_info: SignerInfo,
    /// Certificates carried in the structure
    pub certificates: Vec<Certificate>,
    /// Digest algorithm of the signer, when supported
    pub digest_algorithm: Option<DigestAlgorithm>,
    /// Signed `messageDigest` attribute
    pub message_digest: Vec<u8>,
    /// Signed `signingTime` attribute, when present
    pub signing_time: Option<DateTime<Utc>>,
}

/// Encoder and verifier for detached signed-data.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureCodec;

impl SignatureCodec {
    /// Produce a DER signed-data structure over `data` without embedding it.
    ///
    /// The signed attributes carry content-type, message-digest and
    /// signing-time. RSA keys accept SHA-256/384/512; P-256 keys sign with
    /// SHA-256.
    pub fn sign(
        data: &[u8],
        keys: &KeyMaterial,
        algorithm: DigestAlgorithm,
        signing_time: DateTime<Utc>,
    ) -> Result<Vec<u8>> {
        init_crypto_runtime();
        let cert = keys.certificate();
        let digest = algorithm.digest(data);
        let econtent = EncapsulatedContentInfo {
            econtent_type: ID_DATA,
            econtent: None,
        };
        let sid = SignerIdentifier::IssuerAndSerialNumber(IssuerAndSerialNumber {
            issuer: cert.tbs_certificate.issuer.clone(),
            serial_number: cert.tbs_certificate.serial_number.clone(),
        });
        let digest_alg = AlgorithmIdentifierOwned {
            oid: algorithm.oid(),
            parameters: None,
        };
        let time_attr = signing_time_attribute(signing_time)?;

        let mut builder = SignedDataBuilder::new(&econtent);
        builder
            .add_digest_algorithm(digest_alg.clone())
            .map_err(signing_error)?;
        for cert in keys.chain() {
            builder
                .add_certificate(CertificateChoices::Certificate(cert.clone()))
                .map_err(signing_error)?;
        }

        macro_rules! add_signer {
            ($signer:expr, $sig:ty) => {{
                let signer = $signer;
                let mut info = SignerInfoBuilder::new(
                    &signer,
                    sid.clone(),
                    digest_alg.clone(),
                    &econtent,
                    Some(digest.as_slice()),
                )
                .map_err(signing_error)?;
                info.add_signed_attribute(time_attr.clone()).map_err(signing_error)?;
                builder.add_signer_info::<_, $sig>(info).map_err(signing_error)?;
            }};
        }

        match (keys.private_key(), algorithm) {
            (PrivateKey::Rsa(key), DigestAlgorithm::Sha256) => add_signer!(
                rsa::pkcs1v15::SigningKey::<sha2::Sha256>::new(key.as_ref().clone()),
                rsa::pkcs1v15::Signature
            ),
            (PrivateKey::Rsa(key), DigestAlgorithm::Sha384) => add_signer!(
                rsa::pkcs1v15::SigningKey::<sha2::Sha384>::new(key.as_ref().clone()),
                rsa::pkcs1v15::Signature
            ),
            (PrivateKey::Rsa(key), DigestAlgorithm::Sha512) => add_signer!(
                rsa::pkcs1v15::SigningKey::<sha2::Sha512>::new(key.as_ref().clone()),
                rsa::pkcs1v15::Signature
            ),
            (PrivateKey::EcdsaP256(key), DigestAlgorithm::Sha256) => {
                add_signer!(key.clone(), p256::ecdsa::DerSignature)
            },
            (key, alg) => {
                return Err(Error::Unsupported(format!(
                    "signing with {} and {}",
                    key.algorithm(),
                    alg.name()
                )))
            },
        }

        let content_info = builder.build().map_err(signing_error)?;
        let der = content_info.to_der().map_err(signing_error)?;
        log::debug!(
            "Signed {} bytes with {}: {} bytes of DER",
            data.len(),
            algorithm.name(),
            der.len()
        );
        Ok(der)
    }

    /// Decode a signed-data blob. Trailing bytes (the zero padding of a
    /// `/Contents` slot) are ignored.
    pub fn parse(bytes: &[u8]) -> Result<ParsedSignature> {
        let runtime = init_crypto_runtime();
        let mut reader = SliceReader::new(bytes)?;
        let content_info = ContentInfo::decode(&mut reader)?;
        if content_info.content_type != ID_SIGNED_DATA {
            return Err(Error::MalformedSignature(format!(
                "content type {} is not signed-data",
                content_info.content_type
            )));
        }
        let signed_data: SignedData = decode_any(&content_info.content)?;

        let signer_info = signed_data
            .signer_infos
            .0
            .iter()
            .next()
            .cloned()
            .ok_or_else(|| Error::MalformedSignature("no signer info".to_string()))?;
        if signed_data.signer_infos.0.len() > 1 {
            log::debug!(
                "Signed-data has {} signer infos, reading the first",
                signed_data.signer_infos.0.len()
            );
        }

        let attrs = signer_info
            .signed_attrs
            .as_ref()
            .ok_or(Error::MissingSignedAttributes)?;
        let message_digest = attribute_value(attrs, ID_MESSAGE_DIGEST)
            .map(decode_any::<OctetString>)
            .transpose()?
            .ok_or(Error::MissingSignedAttributes)?
            .as_bytes()
            .to_vec();
        let signing_time = match attribute_value(attrs, ID_SIGNING_TIME) {
            Some(value) => time_to_chrono(&decode_any::<Time>(value)?),
            None => None,
        };

        let certificates = signed_data
            .certificates
            .as_ref()
            .map(|set| {
                set.0
                    .iter()
                    .filter_map(|choice| match choice {
                        CertificateChoices::Certificate(cert) => Some(cert.clone()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(ParsedSignature {
            digest_algorithm: runtime.digest_for_oid(&signer_info.digest_alg.oid),
            signer_info,
            certificates,
            message_digest,
            signing_time,
        })
    }

    /// Check that `parsed` is a valid signature over `data` by one of
    /// `certs`. A mismatch is `Ok(false)`.
    pub fn verify(parsed: &ParsedSignature, certs: &[Certificate], data: &[u8]) -> Result<bool> {
        let runtime = init_crypto_runtime();
        let Some(algorithm) = parsed.digest_algorithm else {
            log::warn!(
                "Unsupported digest algorithm {}",
                parsed.signer_info.digest_alg.oid
            );
            return Ok(false);
        };
        if algorithm.digest(data) != parsed.message_digest {
            log::debug!("Message digest does not match the signed bytes");
            return Ok(false);
        }

        let Some(cert) = find_signer(&parsed.signer_info.sid, certs) else {
            log::warn!("Signer certificate not present in signed-data");
            return Ok(false);
        };
        let attrs = parsed
            .signer_info
            .signed_attrs
            .as_ref()
            .ok_or(Error::MissingSignedAttributes)?;
        let hashed_attrs = algorithm.digest(&attrs.to_der()?);
        let signature = parsed.signer_info.signature.as_bytes();

        let spki = &cert.tbs_certificate.subject_public_key_info;
        let spki_der = spki.to_der()?;
        let valid = match runtime.key_family_for_oid(&spki.algorithm.oid) {
            Some(KeyFamily::Rsa) => {
                let Ok(key) = RsaPublicKey::from_public_key_der(&spki_der) else {
                    log::warn!("Unreadable RSA public key in signer certificate");
                    return Ok(false);
                };
                let scheme = match algorithm {
                    DigestAlgorithm::Sha1 => Pkcs1v15Sign::new::<sha1::Sha1>(),
                    DigestAlgorithm::Sha256 => Pkcs1v15Sign::new::<sha2::Sha256>(),
                    DigestAlgorithm::Sha384 => Pkcs1v15Sign::new::<sha2::Sha384>(),
                    DigestAlgorithm::Sha512 => Pkcs1v15Sign::new::<sha2::Sha512>(),
                };
                key.verify(scheme, &hashed_attrs, signature).is_ok()
            },
            Some(KeyFamily::EcdsaP256) => {
                let curve = spki
                    .algorithm
                    .parameters
                    .as_ref()
                    .and_then(|p| p.decode_as::<ObjectIdentifier>().ok());
                if curve != Some(SECP256R1) {
                    log::warn!("Unsupported elliptic curve in signer certificate");
                    return Ok(false);
                }
                let key = p256::ecdsa::VerifyingKey::from_public_key_der(&spki_der);
                let sig = p256::ecdsa::Signature::from_der(signature);
                match (key, sig) {
                    (Ok(key), Ok(sig)) => key.verify_prehash(&hashed_attrs, &sig).is_ok(),
                    _ => false,
                }
            },
            None => {
                log::warn!("Unsupported public key algorithm {}", spki.algorithm.oid);
                false
            },
        };
        log::debug!("Signature check with {}: {}", algorithm.name(), valid);
        Ok(valid)
    }
}

fn signing_error(err: impl Display) -> Error {
    Error::Signing(err.to_string())
}

fn decode_any<T: for<'a> Decode<'a>>(value: &Any) -> Result<T> {
    Ok(T::from_der(&value.to_der()?)?)
}

fn attribute_value(attrs: &SetOfVec<Attribute>, oid: ObjectIdentifier) -> Option<&Any> {
    attrs
        .iter()
        .find(|attr| attr.oid == oid)
        .and_then(|attr| attr.values.iter().next())
}

fn time_to_chrono(time: &Time) -> Option<DateTime<Utc>> {
    let secs = i64::try_from(time.to_unix_duration().as_secs()).ok()?;
    DateTime::<Utc>::from_timestamp(secs, 0)
}

fn signing_time_attribute(at: DateTime<Utc>) -> Result<Attribute> {
    let secs = u64::try_from(at.timestamp())
        .map_err(|_| Error::Signing(format!("signing time {} precedes 1970", at)))?;
    let dt = der::DateTime::from_unix_duration(Duration::from_secs(secs)).map_err(signing_error)?;
    // UTCTime covers 1950..2049, GeneralizedTime everything after.
    let time = if dt.year() >= 2050 {
        Time::GeneralTime(GeneralizedTime::from_date_time(dt))
    } else {
        Time::UtcTime(UtcTime::from_date_time(dt).map_err(signing_error)?)
    };
    let value = Any::encode_from(&time).map_err(signing_error)?;
    Ok(Attribute {
        oid: ID_SIGNING_TIME,
        values: SetOfVec::try_from(vec![value]).map_err(signing_error)?,
    })
}

fn find_signer<'a>(sid: &SignerIdentifier, certs: &'a [Certificate]) -> Option<&'a Certificate> {
    match sid {
        SignerIdentifier::IssuerAndSerialNumber(isn) => certs.iter().find(|cert| {
            cert.tbs_certificate.issuer == isn.issuer
                && cert.tbs_certificate.serial_number == isn.serial_number
        }),
        SignerIdentifier::SubjectKeyIdentifier(ski) => certs.iter().find(|cert| {
            cert.tbs_certificate
                .extensions
                .iter()
                .flatten()
                .filter(|ext| ext.extn_id == ID_SUBJECT_KEY_IDENTIFIER)
                .filter_map(|ext| OctetString::from_der(ext.extn_value.as_bytes()).ok())
                .any(|id| id == ski.0)
        }),
    }
}
