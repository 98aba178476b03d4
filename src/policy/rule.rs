//! Validation rules.

use crate::crypto::SignatureVerifier;
use crate::packet::{PacketKind, SignedPacket};
use crate::policy::checker::{CheckOutcome, Checker};
use crate::policy::error::ValidationError;
use crate::policy::filter::Filter;
use log::debug;

/// A named policy entry: which packets it covers (`kind` plus filters) and
/// how their signers are judged (checkers).
#[derive(Debug, Clone)]
pub struct Rule {
    id: String,
    kind: PacketKind,
    filters: Vec<Filter>,
    checkers: Vec<Checker>,
}

impl Rule {
    /// The loader never builds a rule without checkers.
    pub fn new(
        id: impl Into<String>,
        kind: PacketKind,
        filters: Vec<Filter>,
        checkers: Vec<Checker>,
    ) -> Self {
        debug_assert!(!checkers.is_empty(), "a rule needs at least one checker");
        Rule {
            id: id.into(),
            kind,
            filters,
            checkers,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> PacketKind {
        self.kind
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn checkers(&self) -> &[Checker] {
        &self.checkers
    }

    /// A rule covers a packet of its kind when any filter matches the signed
    /// name. A rule without filters covers every packet of its kind.
    pub fn matches(&self, packet: &SignedPacket) -> bool {
        packet.kind() == self.kind
            && (self.filters.is_empty()
                || self
                    .filters
                    .iter()
                    .any(|filter| filter.matches(packet.signed_name())))
    }

    /// The first checker configured for the packet's signature type decides.
    pub fn check(&self, packet: &SignedPacket, verifier: &dyn SignatureVerifier) -> CheckOutcome {
        let signature_type = packet.signature().signature_type();
        match self
            .checkers
            .iter()
            .find(|checker| checker.applies_to(signature_type))
        {
            Some(checker) => checker.check(packet, verifier),
            None => {
                debug!(
                    "Rule {} has no checker for signature type {}",
                    self.id, signature_type
                );
                CheckOutcome::Reject(ValidationError::NoApplicableChecker {
                    rule: self.id.clone(),
                    name: packet.signed_name().clone(),
                    signature_type,
                })
            }
        }
    }
}
