//! Identity certificates.
//!
//! A certificate is a data packet whose content carries a public key and a
//! validity period. Its name minus the final (version) component is the key
//! name that signatures point at through their key locator.
//!
//! On disk and in configuration a certificate is the base64 text of the encoded
//! data packet, optionally PEM-armoured with the `NDN CERTIFICATE` tag.

use crate::name::Name;
use crate::packet::Data;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use scale::{Decode, DecodeAll, Encode};
use std::path::Path;
use thiserror::Error;

pub const PEM_TAG: &str = "NDN CERTIFICATE";

#[derive(Debug, Error)]
pub enum CertificateError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid PEM: {0}")]
    Pem(#[from] pem::PemError),

    #[error("expected PEM tag NDN CERTIFICATE, got {0}")]
    UnexpectedPemTag(String),

    #[error("cannot decode certificate: {0}")]
    Decode(String),

    #[error("certificate name is empty")]
    EmptyName,

    #[error("certificate validity period is out of range")]
    InvalidValidity,
}

impl From<scale::Error> for CertificateError {
    fn from(e: scale::Error) -> Self {
        CertificateError::Decode(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum KeyType {
    /// SEC1-encoded P-256 point.
    Ecdsa,
    /// DER-encoded RSA public key.
    Rsa,
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct PublicKey {
    pub key_type: KeyType,
    pub bits: Vec<u8>,
}

#[derive(Encode, Decode)]
struct CertificateContent {
    not_before: i64,
    not_after: i64,
    public_key: PublicKey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityCertificate {
    data: Data,
    public_key: PublicKey,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
}

impl IdentityCertificate {
    /// Interpret a data packet as a certificate.
    pub fn from_data(data: Data) -> Result<Self, CertificateError> {
        if data.name().is_empty() {
            return Err(CertificateError::EmptyName);
        }
        let content = CertificateContent::decode_all(&mut data.content())?;
        let not_before = DateTime::<Utc>::from_timestamp_millis(content.not_before)
            .ok_or(CertificateError::InvalidValidity)?;
        let not_after = DateTime::<Utc>::from_timestamp_millis(content.not_after)
            .ok_or(CertificateError::InvalidValidity)?;

        Ok(IdentityCertificate {
            data,
            public_key: content.public_key,
            not_before,
            not_after,
        })
    }

    /// Content bytes for a certificate data packet.
    pub fn encode_content(
        public_key: &PublicKey,
        not_before: DateTime<Utc>,
        not_after: DateTime<Utc>,
    ) -> Vec<u8> {
        CertificateContent {
            not_before: not_before.timestamp_millis(),
            not_after: not_after.timestamp_millis(),
            public_key: public_key.clone(),
        }
        .encode()
    }

    pub fn name(&self) -> &Name {
        self.data.name()
    }

    /// The name signatures refer to: the certificate name minus its version.
    pub fn key_name(&self) -> Name {
        self.data.name().get_prefix(-1)
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn not_before(&self) -> DateTime<Utc> {
        self.not_before
    }

    pub fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.not_before <= now && now <= self.not_after
    }

    pub fn data(&self) -> &Data {
        &self.data
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.data.to_bytes())
    }

    pub fn to_pem(&self) -> String {
        pem::encode(&pem::Pem::new(PEM_TAG, self.data.to_bytes()))
    }

    /// Decode base64 text; embedded whitespace and line breaks are ignored.
    pub fn from_base64(text: &str) -> Result<Self, CertificateError> {
        let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = STANDARD.decode(compact)?;
        Self::from_data(Data::from_bytes(&bytes)?)
    }

    /// Decode either PEM-armoured or bare base64 text.
    pub fn from_text(text: &str) -> Result<Self, CertificateError> {
        if !text.trim_start().starts_with("-----BEGIN") {
            return Self::from_base64(text);
        }
        let parsed = pem::parse(text)?;
        if parsed.tag() != PEM_TAG {
            return Err(CertificateError::UnexpectedPemTag(parsed.tag().to_string()));
        }
        Self::from_data(Data::from_bytes(parsed.contents())?)
    }

    pub fn load_file(path: &Path) -> Result<Self, CertificateError> {
        let text = std::fs::read_to_string(path).map_err(|source| CertificateError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_text(&text)
    }
}
