//! Validation results and continuation requests.

use crate::name::Name;
use crate::packet::SignedPacket;
use crate::policy::error::ValidationError;
use crate::policy::loader::Policy;
use std::sync::Arc;

/// Instruction to the caller: fetch `certificate_name`, then hand it back
/// through [`PolicyValidator::resume_request`](crate::policy::PolicyValidator::resume_request)
/// or report the failure through
/// [`PolicyValidator::fail_request`](crate::policy::PolicyValidator::fail_request).
#[derive(Debug, Clone)]
pub struct ValidationRequest {
    pub(crate) certificate_name: Name,
    pub(crate) step_count: usize,
    pub(crate) retries: u32,
    /// Packets blocked on this certificate, innermost first: `waiting[0]` is
    /// signed by the requested certificate, every later entry by the one
    /// before it. The last entry is the packet originally submitted.
    pub(crate) waiting: Vec<SignedPacket>,
    /// Policy the chain started under; a reload does not affect it.
    pub(crate) policy: Arc<Policy>,
}

impl ValidationRequest {
    /// Key name of the certificate to fetch.
    pub fn certificate_name(&self) -> &Name {
        &self.certificate_name
    }

    /// Step count the fetched certificate is validated at.
    pub fn step_count(&self) -> usize {
        self.step_count
    }

    /// Additional fetch attempts allowed after a timeout.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Name of the packet whose validation started the chain.
    pub fn original_name(&self) -> Option<&Name> {
        self.waiting.last().map(|packet| packet.name())
    }

    /// Number of packets waiting on this certificate.
    pub fn chain_len(&self) -> usize {
        self.waiting.len()
    }

    /// Policy the remaining steps of this chain are judged against.
    pub fn policy(&self) -> &Arc<Policy> {
        &self.policy
    }
}

/// Result of one policy evaluation step.
#[derive(Debug, Clone)]
pub enum ValidationOutcome {
    Accepted,
    Rejected(ValidationError),
    /// The decision waits for certificates the caller has to fetch.
    Pending(Vec<ValidationRequest>),
}

impl ValidationOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ValidationOutcome::Accepted)
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, ValidationOutcome::Rejected(_))
    }

    pub fn rejection(&self) -> Option<&ValidationError> {
        match self {
            ValidationOutcome::Rejected(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn requests(&self) -> &[ValidationRequest] {
        match self {
            ValidationOutcome::Pending(requests) => requests,
            _ => &[],
        }
    }
}
