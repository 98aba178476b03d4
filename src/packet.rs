//! Data and interest packets as seen by the validator.
//!
//! Packets are immutable once built. A data packet carries its signature as a
//! field; a signed interest carries it in the last two name components
//! (signature-info, signature-value).

use crate::name::{Component, Name};
use scale::{Decode, DecodeAll, Encode};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised while extracting a signature from a packet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PacketError {
    #[error("interest {name} has {count} components, a signed interest needs at least 2")]
    TooFewComponents { name: Name, count: usize },

    #[error("cannot decode signature info of {name}: {reason}")]
    SignatureInfo { name: Name, reason: String },
}

/// Which kind of packet a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PacketKind {
    Data,
    Interest,
}

impl PacketKind {
    /// Parse the value of a `for` key (case-insensitive).
    pub fn from_config(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("data") {
            Some(PacketKind::Data)
        } else if value.eq_ignore_ascii_case("interest") {
            Some(PacketKind::Interest)
        } else {
            None
        }
    }
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketKind::Data => write!(f, "data"),
            PacketKind::Interest => write!(f, "interest"),
        }
    }
}

/// Signature algorithms understood by the policy layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Encode, Decode, Serialize, Deserialize)]
pub enum SignatureType {
    #[serde(rename = "digest-sha256")]
    DigestSha256,
    #[serde(rename = "rsa-sha256")]
    Sha256WithRsa,
    #[serde(rename = "ecdsa-sha256")]
    Sha256WithEcdsa,
}

impl SignatureType {
    /// Parse a configured `sig-type` value (case-insensitive).
    pub fn from_config(value: &str) -> Option<Self> {
        [
            SignatureType::DigestSha256,
            SignatureType::Sha256WithRsa,
            SignatureType::Sha256WithEcdsa,
        ]
        .into_iter()
        .find(|t| t.as_str().eq_ignore_ascii_case(value))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureType::DigestSha256 => "digest-sha256",
            SignatureType::Sha256WithRsa => "rsa-sha256",
            SignatureType::Sha256WithEcdsa => "ecdsa-sha256",
        }
    }
}

impl fmt::Display for SignatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signature metadata: algorithm plus the name of the signing certificate.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct SignatureInfo {
    pub signature_type: SignatureType,
    pub key_locator: Option<Name>,
}

impl SignatureInfo {
    pub fn digest_sha256() -> Self {
        SignatureInfo {
            signature_type: SignatureType::DigestSha256,
            key_locator: None,
        }
    }

    pub fn with_key_locator(signature_type: SignatureType, key_locator: Name) -> Self {
        SignatureInfo {
            signature_type,
            key_locator: Some(key_locator),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct Signature {
    pub info: SignatureInfo,
    pub value: Vec<u8>,
}

impl Signature {
    pub fn signature_type(&self) -> SignatureType {
        self.info.signature_type
    }

    pub fn key_locator(&self) -> Option<&Name> {
        self.info.key_locator.as_ref()
    }
}

/// An immutable named content object.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct Data {
    name: Name,
    content: Vec<u8>,
    signature: Signature,
}

impl Data {
    pub fn new(name: Name, content: Vec<u8>, signature: Signature) -> Self {
        Data {
            name,
            content,
            signature,
        }
    }

    /// Build a data packet, producing the signature value over its signed portion.
    pub fn signed(
        name: Name,
        content: Vec<u8>,
        info: SignatureInfo,
        sign: impl FnOnce(&[u8]) -> Vec<u8>,
    ) -> Self {
        let value = sign(&Self::signed_portion(&name, &content, &info));
        Data::new(name, content, Signature { info, value })
    }

    /// Bytes covered by the signature of a data packet.
    pub fn signed_portion(name: &Name, content: &[u8], info: &SignatureInfo) -> Vec<u8> {
        (name, content, info).encode()
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn signed_bytes(&self) -> Vec<u8> {
        Self::signed_portion(&self.name, &self.content, &self.signature.info)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.encode()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, scale::Error> {
        Data::decode_all(&mut &bytes[..])
    }
}

/// A query packet. Signed interests carry their signature in the name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interest {
    name: Name,
}

impl Interest {
    pub fn new(name: Name) -> Self {
        Interest { name }
    }

    /// Build a signed interest: `signed_name` + encoded info + signature value.
    pub fn signed(
        signed_name: Name,
        info: SignatureInfo,
        sign: impl FnOnce(&[u8]) -> Vec<u8>,
    ) -> Self {
        let with_info = signed_name.append(Component::new(info.encode()));
        let value = sign(&with_info.encode());
        Interest::new(with_info.append(Component::new(value)))
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    /// The name without its two signature components.
    pub fn signed_name(&self) -> Result<Name, PacketError> {
        self.check_signed_shape()?;
        Ok(self.name.get_prefix(-2))
    }

    /// Reconstruct the signature from the trailing name components.
    pub fn signature(&self) -> Result<Signature, PacketError> {
        let (info_component, value_component) = match (self.name.get(-2), self.name.get(-1)) {
            (Some(info), Some(value)) => (info, value),
            _ => {
                return Err(PacketError::TooFewComponents {
                    name: self.name.clone(),
                    count: self.name.len(),
                })
            }
        };
        let info = SignatureInfo::decode_all(&mut info_component.as_bytes()).map_err(|e| {
            PacketError::SignatureInfo {
                name: self.name.clone(),
                reason: e.to_string(),
            }
        })?;
        Ok(Signature {
            info,
            value: value_component.as_bytes().to_vec(),
        })
    }

    /// Bytes covered by the signature: every component up to and including
    /// the signature-info component.
    pub fn signed_bytes(&self) -> Vec<u8> {
        self.name.get_prefix(-1).encode()
    }

    fn check_signed_shape(&self) -> Result<(), PacketError> {
        if self.name.len() < 2 {
            return Err(PacketError::TooFewComponents {
                name: self.name.clone(),
                count: self.name.len(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Data(Data),
    Interest(Interest),
}

impl Packet {
    pub fn kind(&self) -> PacketKind {
        match self {
            Packet::Data(_) => PacketKind::Data,
            Packet::Interest(_) => PacketKind::Interest,
        }
    }

    pub fn name(&self) -> &Name {
        match self {
            Packet::Data(data) => data.name(),
            Packet::Interest(interest) => interest.name(),
        }
    }
}

/// A packet with its signed name, signature and signed bytes extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPacket {
    packet: Packet,
    signed_name: Name,
    signature: Signature,
    signed_bytes: Vec<u8>,
}

impl SignedPacket {
    pub fn from_data(data: Data) -> Self {
        SignedPacket {
            signed_name: data.name().clone(),
            signature: data.signature().clone(),
            signed_bytes: data.signed_bytes(),
            packet: Packet::Data(data),
        }
    }

    pub fn from_interest(interest: Interest) -> Result<Self, PacketError> {
        let signature = interest.signature()?;
        Ok(SignedPacket {
            signed_name: interest.signed_name()?,
            signature,
            signed_bytes: interest.signed_bytes(),
            packet: Packet::Interest(interest),
        })
    }

    pub fn kind(&self) -> PacketKind {
        self.packet.kind()
    }

    /// Full packet name (for interests this still includes the signature).
    pub fn name(&self) -> &Name {
        self.packet.name()
    }

    pub fn signed_name(&self) -> &Name {
        &self.signed_name
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn signed_bytes(&self) -> &[u8] {
        &self.signed_bytes
    }

    pub fn packet(&self) -> &Packet {
        &self.packet
    }

    pub fn into_packet(self) -> Packet {
        self.packet
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(uri: &str) -> Name {
        Name::from_uri(uri).unwrap()
    }

    fn info() -> SignatureInfo {
        SignatureInfo::with_key_locator(SignatureType::Sha256WithEcdsa, name("/a/KEY/1"))
    }

    #[test]
    fn test_interest_reconstruction() {
        let interest = Interest::signed(name("/a/b/c"), info(), |_| vec![7, 7, 7]);
        assert_eq!(interest.name().len(), 5);
        assert_eq!(interest.signed_name().unwrap(), name("/a/b/c"));

        let signature = interest.signature().unwrap();
        assert_eq!(signature.info, info());
        assert_eq!(signature.value, vec![7, 7, 7]);
    }

    #[test]
    fn test_interest_signed_bytes_cover_signature_info() {
        let mut seen = Vec::new();
        let interest = Interest::signed(name("/a/b"), info(), |bytes| {
            seen = bytes.to_vec();
            vec![1]
        });
        assert_eq!(interest.signed_bytes(), seen);
    }

    #[test]
    fn test_short_interest_is_rejected() {
        for uri in ["/", "/only-one"] {
            let interest = Interest::new(name(uri));
            assert!(matches!(
                interest.signature(),
                Err(PacketError::TooFewComponents { .. })
            ));
            assert!(SignedPacket::from_interest(interest).is_err());
        }
    }

    #[test]
    fn test_garbage_signature_info() {
        let interest = Interest::new(name("/a/b/%FF%FF%FF/%01"));
        assert!(matches!(
            interest.signature(),
            Err(PacketError::SignatureInfo { .. })
        ));
    }

    #[test]
    fn test_signature_info_with_trailing_bytes() {
        let mut encoded = info().encode();
        encoded.push(0);
        let interest = Interest::new(
            name("/a/b")
                .append(Component::new(encoded))
                .append(Component::new(vec![1])),
        );
        assert!(matches!(
            interest.signature(),
            Err(PacketError::SignatureInfo { .. })
        ));
    }

    #[test]
    fn test_data_signed_bytes() {
        let mut seen = Vec::new();
        let data = Data::signed(name("/a/b"), b"hello".to_vec(), info(), |bytes| {
            seen = bytes.to_vec();
            vec![9]
        });
        assert_eq!(data.signed_bytes(), seen);
        assert_eq!(data.signature().value, vec![9]);

        let decoded = Data::from_bytes(&data.to_bytes()).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_signature_type_from_config() {
        assert_eq!(
            SignatureType::from_config("ECDSA-SHA256"),
            Some(SignatureType::Sha256WithEcdsa)
        );
        assert_eq!(
            SignatureType::from_config("rsa-sha256"),
            Some(SignatureType::Sha256WithRsa)
        );
        assert_eq!(SignatureType::from_config("md5"), None);
        assert_eq!(PacketKind::from_config("Interest"), Some(PacketKind::Interest));
        assert_eq!(PacketKind::from_config("both"), None);
    }
}
