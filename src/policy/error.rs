//! Error types for policy loading and packet validation.

use crate::conf::{InfoParseError, SectionError};
use crate::name::Name;
use crate::packet::SignatureType;
use thiserror::Error;

/// Reasons a packet fails validation. These are reported through
/// [`ValidationOutcome::Rejected`](crate::policy::ValidationOutcome), never
/// unwound.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("maximum steps reached (step limit {limit})")]
    StepLimitReached { limit: usize },

    #[error("no rule matched {name}")]
    NoRuleMatched { name: Name },

    #[error("malformed interest signature: {reason}")]
    MalformedInterest { reason: String },

    #[error("packet {name} cannot pass any checker of rule {rule} (signature type {signature_type})")]
    NoApplicableChecker {
        rule: String,
        name: Name,
        signature_type: SignatureType,
    },

    #[error("signature of {name} has no key locator")]
    MissingKeyLocator { name: Name },

    #[error("key locator {key_locator} does not satisfy the checker for {name}")]
    KeyLocatorRejected { key_locator: Name, name: Name },

    #[error("signer {signer} is not in the fixed signer list")]
    SignerNotFixed { signer: Name },

    #[error("signature verification failed for {name}")]
    SignatureInvalid { name: Name },

    #[error("unsupported signature type {signature_type} for {name}")]
    UnsupportedSignatureType {
        name: Name,
        signature_type: SignatureType,
    },

    #[error("unresolved certificate {certificate}: {reason}")]
    CertificateUnresolved { certificate: Name, reason: String },

    #[error("signing certificate {certificate} is no longer valid")]
    CertificateExpired { certificate: Name },

    #[error("cannot decode certificate {certificate}: {reason}")]
    CertificateMalformed { certificate: Name, reason: String },

    #[error("validation of {name} ended without a decision")]
    Undecided { name: Name },
}

/// Fatal errors while loading a validator configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration file {filename}: {source}")]
    Parse {
        filename: String,
        #[source]
        source: InfoParseError,
    },

    #[error("error processing configuration file {filename}: no data")]
    Empty { filename: String },

    #[error("error processing configuration file {filename}: unrecognized section {section}")]
    UnrecognizedSection { filename: String, section: String },

    #[error("error processing configuration file {filename}: {source}")]
    MissingRuleId {
        filename: String,
        #[source]
        source: SectionError,
    },

    #[error("error in rule {rule_id}: {source}")]
    Rule {
        rule_id: String,
        #[source]
        source: SectionError,
    },

    #[error("no <rule.checker> is specified in rule {rule_id}")]
    NoChecker { rule_id: String },

    #[error("error in trust-anchor of {filename}: {source}")]
    TrustAnchor {
        filename: String,
        #[source]
        source: SectionError,
    },
}
