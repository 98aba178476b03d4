#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use ndn_trust_policy::certificate::{IdentityCertificate, KeyType, PublicKey};
use ndn_trust_policy::name::Name;
use ndn_trust_policy::packet::{Data, Interest, SignatureInfo, SignatureType};
use ndn_trust_policy::policy::{CertificateFetcher, FetchError};
use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use parking_lot::Mutex;
use rand_core::OsRng;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn name(uri: &str) -> Name {
    Name::from_uri(uri).unwrap()
}

/// A P-256 key published under `key_name`; its certificate is `key_name/v1`.
pub struct Identity {
    key: SigningKey,
    key_name: Name,
}

impl Identity {
    pub fn new(key_name: &str) -> Self {
        Identity {
            key: SigningKey::random(&mut OsRng),
            key_name: name(key_name),
        }
    }

    pub fn key_name(&self) -> &Name {
        &self.key_name
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            key_type: KeyType::Ecdsa,
            bits: VerifyingKey::from(&self.key)
                .to_encoded_point(true)
                .as_bytes()
                .to_vec(),
        }
    }

    fn info(&self) -> SignatureInfo {
        SignatureInfo::with_key_locator(SignatureType::Sha256WithEcdsa, self.key_name.clone())
    }

    fn sign(&self, bytes: &[u8]) -> Vec<u8> {
        let signature: Signature = self.key.sign(bytes);
        signature.to_der().as_bytes().to_vec()
    }

    pub fn certificate_valid_for(
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
    pub fn certificate(&self, issuer: &Identity) -> Data {
        let now = Utc::now();
        self.certificate_valid_for(issuer, now - Duration::hours(1), now + Duration::days(1))
    }

    pub fn self_signed(&self) -> IdentityCertificate {
        IdentityCertificate::from_data(self.certificate(self)).unwrap()
    }

    pub fn sign_data(&self, uri: &str) -> Data {
        Data::signed(name(uri), b"payload".to_vec(), self.info(), |bytes| {
            self.sign(bytes)
        })
    }

    pub fn sign_interest(&self, uri: &str) -> Interest {
        Interest::signed(name(uri), self.info(), |bytes| self.sign(bytes))
    }
}

/// `trust-anchor` section carrying `identity`'s self-signed certificate.
pub fn anchor_section(identity: &Identity) -> String {
    format!(
        "trust-anchor\n{{\n  type base64\n  base64-string \"{}\"\n}}\n",
        identity.self_signed().to_base64()
    )
}

/// In-memory fetcher that counts requests and can time out a number of times
/// per name before answering.
#[derive(Default)]
pub struct MapFetcher {
    certificates: HashMap<Name, Data>,
    timeouts: Mutex<HashMap<Name, u32>>,
    calls: AtomicUsize,
}

impl MapFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key_name: &Name, certificate: Data) -> Self {
        self.certificates.insert(key_name.clone(), certificate);
        self
    }

    pub fn with_timeouts(self, key_name: &Name, count: u32) -> Self {
        self.timeouts.lock().insert(key_name.clone(), count);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CertificateFetcher for MapFetcher {
    async fn fetch(&self, certificate_name: &Name) -> Result<Data, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(remaining) = self.timeouts.lock().get_mut(certificate_name) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(FetchError::Timeout {
                    name: certificate_name.clone(),
                });
            }
        }

        self.certificates
            .get(certificate_name)
            .cloned()
            .ok_or_else(|| FetchError::NotFound {
                name: certificate_name.clone(),
            })
    }
}
