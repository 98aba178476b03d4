//! Rule checkers: predicates over the signer of a packet.
//!
//! A checker either decides on its own ([`CheckOutcome::Accept`] or
//! [`CheckOutcome::Reject`]) or approves the signer and leaves the signature
//! to be verified against the signer's certificate
//! ([`CheckOutcome::Undecided`]).

use crate::certificate::IdentityCertificate;
use crate::conf::{ConfigSection, SectionError};
use crate::crypto::SignatureVerifier;
use crate::name::{Component, Name};
use crate::packet::{SignatureType, SignedPacket};
use crate::policy::anchor::certificate_from_config;
use crate::policy::error::ValidationError;
use crate::policy::filter::{compile_regex, NameRelation};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// `\1` or `\\1` back-references in expand templates.
static BACK_REFERENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\{1,2}(\d+)").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Accept,
    Reject(ValidationError),
    /// The signer is acceptable; its signature still has to be verified.
    Undecided,
}

/// The `key-locator` block of a customized checker.
#[derive(Debug, Clone)]
pub enum KeyLocatorCheck {
    /// `name` stands in `relation` to the key locator.
    Relation { name: Name, relation: NameRelation },
    /// Pattern matched against the key locator URI.
    Regex(Regex),
    /// Names derived from the key locator and the packet name through regex
    /// captures must stand in `relation`.
    HyperRelation {
        key_regex: Regex,
        key_expand: String,
        relation: NameRelation,
        packet_regex: Regex,
        packet_expand: String,
    },
}

impl KeyLocatorCheck {
    fn from_config(section: &ConfigSection) -> Result<Self, SectionError> {
        let mut cursor = section.cursor();
        let locator_type = cursor.expect_value("type", "checker.key-locator.type")?;
        if !locator_type.eq_ignore_ascii_case("name") {
            return Err(SectionError::unsupported("checker.key-locator.type", locator_type));
        }

        let check = if cursor.peek_is("name") {
            let name = Name::from_uri(cursor.expect_value("name", "checker.key-locator.name")?)?;
            let relation = relation(cursor.expect_value("relation", "checker.key-locator.relation")?)?;
            KeyLocatorCheck::Relation { name, relation }
        } else if cursor.peek_is("regex") {
            KeyLocatorCheck::Regex(compile_regex(
                cursor.expect_value("regex", "checker.key-locator.regex")?,
            )?)
        } else if let Some(hyper) = cursor.next_if("hyper-relation") {
            Self::hyper_relation(hyper)?
        } else {
            return Err(SectionError::MissingKey {
                key: "checker.key-locator.name, regex or hyper-relation".to_string(),
            });
        };

        cursor.finish("checker.key-locator")?;
        Ok(check)
    }

    fn hyper_relation(section: &ConfigSection) -> Result<Self, SectionError> {
        let mut cursor = section.cursor();
        let key_regex = compile_regex(cursor.expect_value("k-regex", "checker.key-locator.hyper-relation.k-regex")?)?;
        let key_expand = cursor.expect_value("k-expand", "checker.key-locator.hyper-relation.k-expand")?;
        let relation = relation(cursor.expect_value("h-relation", "checker.key-locator.hyper-relation.h-relation")?)?;
        let packet_regex = compile_regex(cursor.expect_value("p-regex", "checker.key-locator.hyper-relation.p-regex")?)?;
        let packet_expand = cursor.expect_value("p-expand", "checker.key-locator.hyper-relation.p-expand")?;
        cursor.finish("checker.key-locator.hyper-relation")?;

        Ok(KeyLocatorCheck::HyperRelation {
            key_regex,
            key_expand: expand_template(key_expand),
            relation,
            packet_regex,
            packet_expand: expand_template(packet_expand),
        })
    }

    pub fn check(&self, key_locator: &Name, signed_name: &Name) -> bool {
        match self {
            KeyLocatorCheck::Relation { name, relation } => relation.check(name, key_locator),
            KeyLocatorCheck::Regex(regex) => regex.is_match(&key_locator.to_uri()),
            KeyLocatorCheck::HyperRelation {
                key_regex,
                key_expand,
                relation,
                packet_regex,
                packet_expand,
            } => {
                let key_name = expand(key_regex, key_expand, key_locator);
                let packet_name = expand(packet_regex, packet_expand, signed_name);
                match (key_name, packet_name) {
                    (Some(key_name), Some(packet_name)) => relation.check(&key_name, &packet_name),
                    _ => false,
                }
            }
        }
    }
}

fn relation(value: &str) -> Result<NameRelation, SectionError> {
    NameRelation::from_config(value)
        .ok_or_else(|| SectionError::unsupported("relation", value))
}

/// Rewrite `\N` back-references into the `${N}` form `regex` expands.
fn expand_template(template: &str) -> String {
    BACK_REFERENCE.replace_all(template, "$${${1}}").into_owned()
}

fn expand(regex: &Regex, template: &str, name: &Name) -> Option<Name> {
    let uri = name.to_uri();
    let captures = regex.captures(&uri)?;
    let mut expanded = String::new();
    captures.expand(template, &mut expanded);
    Name::from_uri(&expanded).ok()
}

/// A checker of a rule. Each one only applies to packets whose signature type
/// equals its configured `sig-type`.
#[derive(Debug, Clone)]
pub enum Checker {
    Customized {
        signature_type: SignatureType,
        key_locator: Option<KeyLocatorCheck>,
    },
    Hierarchical {
        signature_type: SignatureType,
    },
    FixedSigner {
        signature_type: SignatureType,
        signers: HashMap<Name, Arc<IdentityCertificate>>,
    },
}

impl Checker {
    /// Build a checker from a `checker` section. Certificate files of
    /// fixed-signer checkers are resolved against `base_dir`.
    pub fn from_config(section: &ConfigSection, base_dir: &Path) -> Result<Self, SectionError> {
        let mut cursor = section.cursor();
        let checker_type = cursor.expect_value("type", "checker.type")?;
        let sig_type_value = cursor.expect_value("sig-type", "checker.sig-type")?;
        let signature_type = SignatureType::from_config(sig_type_value)
            .ok_or_else(|| SectionError::unsupported("checker.sig-type", sig_type_value))?;

        let checker = if checker_type.eq_ignore_ascii_case("customized") {
            let key_locator = match cursor.next_if("key-locator") {
                Some(block) => Some(KeyLocatorCheck::from_config(block)?),
                None if signature_type == SignatureType::DigestSha256 => None,
                None => {
                    return Err(SectionError::MissingKey {
                        key: "checker.key-locator".to_string(),
                    })
                }
            };
            Checker::Customized {
                signature_type,
                key_locator,
            }
        } else if checker_type.eq_ignore_ascii_case("hierarchical") {
            if signature_type == SignatureType::DigestSha256 {
                return Err(SectionError::unsupported(
                    "checker.sig-type for hierarchical checker",
                    sig_type_value,
                ));
            }
            Checker::Hierarchical { signature_type }
        } else if checker_type.eq_ignore_ascii_case("fixed-signer") {
            if signature_type == SignatureType::DigestSha256 {
                return Err(SectionError::unsupported(
                    "checker.sig-type for fixed-signer checker",
                    sig_type_value,
                ));
            }
            let mut signers = HashMap::new();
            while let Some(signer) = cursor.next_if("signer") {
                let certificate = certificate_from_config(signer, base_dir, "checker.signer")?;
                signers.insert(certificate.key_name(), Arc::new(certificate));
            }
            if signers.is_empty() {
                return Err(SectionError::MissingKey {
                    key: "checker.signer".to_string(),
                });
            }
            Checker::FixedSigner {
                signature_type,
                signers,
            }
        } else {
            return Err(SectionError::unsupported("checker.type", checker_type));
        };

        cursor.finish("checker")?;
        Ok(checker)
    }

    pub fn signature_type(&self) -> SignatureType {
        match self {
            Checker::Customized { signature_type, .. }
            | Checker::Hierarchical { signature_type }
            | Checker::FixedSigner { signature_type, .. } => *signature_type,
        }
    }

    pub fn applies_to(&self, signature_type: SignatureType) -> bool {
        self.signature_type() == signature_type
    }

    /// Evaluate the checker. The caller only invokes it when
    /// [`applies_to`](Self::applies_to) holds for the packet's signature.
    pub fn check(&self, packet: &SignedPacket, verifier: &dyn SignatureVerifier) -> CheckOutcome {
        let signature = packet.signature();
        let signed_name = packet.signed_name();

        match self {
            Checker::Customized {
                key_locator: None, ..
            } => CheckOutcome::Undecided,
            Checker::Customized {
                key_locator: Some(check),
                ..
            } => {
                let Some(locator) = signature.key_locator() else {
                    return missing_key_locator(signed_name);
                };
                if check.check(locator, signed_name) {
                    CheckOutcome::Undecided
                } else {
                    debug!("Key locator {} rejected for {}", locator, signed_name);
                    CheckOutcome::Reject(ValidationError::KeyLocatorRejected {
                        key_locator: locator.clone(),
                        name: signed_name.clone(),
                    })
                }
            }
            Checker::Hierarchical { .. } => {
                let Some(locator) = signature.key_locator() else {
                    return missing_key_locator(signed_name);
                };
                let Some(identity) = signer_identity(locator) else {
                    debug!("Key locator {} names no signer identity", locator);
                    return CheckOutcome::Reject(ValidationError::KeyLocatorRejected {
                        key_locator: locator.clone(),
                        name: signed_name.clone(),
                    });
                };
                if identity.is_prefix_of(signed_name) {
                    CheckOutcome::Undecided
                } else {
                    debug!("Signer {} is not an ancestor of {}", locator, signed_name);
                    CheckOutcome::Reject(ValidationError::KeyLocatorRejected {
                        key_locator: locator.clone(),
                        name: signed_name.clone(),
                    })
                }
            }
            Checker::FixedSigner { signers, .. } => {
                let Some(locator) = signature.key_locator() else {
                    return missing_key_locator(signed_name);
                };
                let Some(certificate) = signers.get(locator) else {
                    return CheckOutcome::Reject(ValidationError::SignerNotFixed {
                        signer: locator.clone(),
                    });
                };
                let public_key = certificate.public_key();
                if !verifier.supports(signature.signature_type(), public_key.key_type) {
                    return CheckOutcome::Reject(ValidationError::UnsupportedSignatureType {
                        name: signed_name.clone(),
                        signature_type: signature.signature_type(),
                    });
                }
                if verifier.verify(packet.signed_bytes(), signature, public_key) {
                    CheckOutcome::Accept
                } else {
                    CheckOutcome::Reject(ValidationError::SignatureInvalid {
                        name: signed_name.clone(),
                    })
                }
            }
        }
    }
}

fn missing_key_locator(name: &Name) -> CheckOutcome {
    CheckOutcome::Reject(ValidationError::MissingKeyLocator { name: name.clone() })
}

/// The identity a key belongs to: everything before the `KEY` component, or
/// the key name minus its last component. `None` when that identity would be
/// the root name, which is a prefix of everything.
fn signer_identity(key_locator: &Name) -> Option<Name> {
    let marker = Component::from("KEY");
    let identity = match key_locator.components().iter().position(|c| *c == marker) {
        Some(index) => key_locator.get_prefix(index as isize),
        None => key_locator.get_prefix(-1),
    };
    (!identity.is_empty()).then_some(identity)
}
