//! Signature verification primitives.
//!
//! The policy engine only decides *when* and *against which key* a signature
//! is checked. The check itself goes through [`SignatureVerifier`].

use crate::certificate::{KeyType, PublicKey};
use crate::packet::{Signature, SignatureType};
use log::{debug, warn};
use sha2::{Digest, Sha256};

/// Verify signature bytes against a public key.
pub trait SignatureVerifier: Send + Sync {
    /// Whether this verifier can check `signature_type` signatures made with
    /// a `key_type` key at all.
    fn supports(&self, signature_type: SignatureType, key_type: KeyType) -> bool {
        let _ = (signature_type, key_type);
        true
    }

    fn verify(&self, signed_bytes: &[u8], signature: &Signature, public_key: &PublicKey) -> bool;
}

/// ECDSA P-256 with SHA-256. RSA keys are not supported and never verify.
#[derive(Debug, Default, Clone, Copy)]
pub struct EcdsaP256Verifier;

impl SignatureVerifier for EcdsaP256Verifier {
    fn supports(&self, signature_type: SignatureType, key_type: KeyType) -> bool {
        signature_type == SignatureType::Sha256WithEcdsa && key_type == KeyType::Ecdsa
    }

    fn verify(&self, signed_bytes: &[u8], signature: &Signature, public_key: &PublicKey) -> bool {
        if signature.signature_type() != SignatureType::Sha256WithEcdsa {
            warn!(
                "Signature type {} cannot be verified with an ECDSA verifier",
                signature.signature_type()
            );
            return false;
        }
        match public_key.key_type {
            KeyType::Ecdsa => match verify_es256(&public_key.bits, signed_bytes, &signature.value) {
                Ok(valid) => valid,
                Err(reason) => {
                    debug!("ES256 verification error: {}", reason);
                    false
                }
            },
            KeyType::Rsa => {
                warn!("RSA public keys are not supported");
                false
            }
        }
    }
}

/// Verify an ES256 signature in either DER or fixed-size (r || s) form.
fn verify_es256(public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<bool, String> {
    use p256::ecdsa::signature::Verifier;
    use p256::ecdsa::{Signature, VerifyingKey};

    let verifying_key = VerifyingKey::from_sec1_bytes(public_key)
        .map_err(|e| format!("Invalid P-256 public key: {}", e))?;

    let sig = Signature::from_der(signature)
        .or_else(|_| Signature::from_slice(signature))
        .map_err(|e| format!("Invalid ES256 signature format: {}", e))?;

    Ok(verifying_key.verify(message, &sig).is_ok())
}

/// Check a `digest-sha256` signature: the value is SHA-256 of the signed bytes.
pub fn verify_digest_sha256(signed_bytes: &[u8], value: &[u8]) -> bool {
    let digest = Sha256::digest(signed_bytes);
    constant_time_eq(digest.as_slice(), value)
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
