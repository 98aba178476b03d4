//! Signing identities for unit tests.

use crate::certificate::{IdentityCertificate, KeyType, PublicKey};
use crate::name::Name;
use crate::packet::{Data, Interest, SignatureInfo, SignatureType, SignedPacket};
use chrono::{DateTime, Duration, Utc};
use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use rand_core::OsRng;

pub(crate) fn name(uri: &str) -> Name {
    Name::from_uri(uri).unwrap()
}

/// A P-256 key published under `key_name`; its certificate is `key_name/v1`.
pub(crate) struct Identity {
    key: SigningKey,
    key_name: Name,
}

impl Identity {
    pub(crate) fn new(key_name: &str) -> Self {
        Identity {
            key: SigningKey::random(&mut OsRng),
            key_name: name(key_name),
        }
    }

    pub(crate) fn key_name(&self) -> &Name {
        &self.key_name
    }

    pub(crate) fn public_key(&self) -> PublicKey {
        PublicKey {
            key_type: KeyType::Ecdsa,
            bits: VerifyingKey::from(&self.key)
                .to_encoded_point(true)
                .as_bytes()
                .to_vec(),
        }
    }

    pub(crate) fn sign(&self, bytes: &[u8]) -> Vec<u8> {
        let signature: Signature = self.key.sign(bytes);
        signature.to_der().as_bytes().to_vec()
    }

    fn info(&self) -> SignatureInfo {
        SignatureInfo::with_key_locator(SignatureType::Sha256WithEcdsa, self.key_name.clone())
    }

    pub(crate) fn certificate_valid_for(
        &self,
        issuer: &Identity,
        not_before: DateTime<Utc>,
        not_after: DateTime<Utc>,
    ) -> Data {
        let content = IdentityCertificate::encode_content(&self.public_key(), not_before, not_after);
        Data::signed(
            self.key_name.clone().append("v1"),
            content,
            issuer.info(),
            |bytes| issuer.sign(bytes),
        )
    }

    /// Certificate data for this key, issued by `issuer`, valid for a day.
    pub(crate) fn certificate(&self, issuer: &Identity) -> Data {
        let now = Utc::now();
        self.certificate_valid_for(issuer, now - Duration::hours(1), now + Duration::days(1))
    }

    pub(crate) fn self_signed(&self) -> IdentityCertificate {
        IdentityCertificate::from_data(self.certificate(self)).unwrap()
    }

    pub(crate) fn self_signed_for(
        &self,
        not_before: DateTime<Utc>,
        not_after: DateTime<Utc>,
    ) -> IdentityCertificate {
        IdentityCertificate::from_data(self.certificate_valid_for(self, not_before, not_after)).unwrap()
    }

    pub(crate) fn sign_data(&self, uri: &str) -> Data {
        Data::signed(name(uri), b"payload".to_vec(), self.info(), |bytes| {
            self.sign(bytes)
        })
    }

    pub(crate) fn sign_interest(&self, uri: &str) -> Interest {
        Interest::signed(name(uri), self.info(), |bytes| self.sign(bytes))
    }

    pub(crate) fn signed_data_packet(&self, uri: &str) -> SignedPacket {
        SignedPacket::from_data(self.sign_data(uri))
    }
}

/// Data carrying a valid `digest-sha256` signature.
pub(crate) fn digest_data(uri: &str) -> Data {
    use sha2::{Digest, Sha256};
    Data::signed(
        name(uri),
        b"content".to_vec(),
        SignatureInfo::digest_sha256(),
        |bytes| Sha256::digest(bytes).to_vec(),
    )
}
