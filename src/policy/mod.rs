//! Policy-driven trust validation.
//!
//! A policy is a list of rules plus pinned trust anchors. A packet is judged
//! by the first rule of its kind whose filters match; that rule's checker
//! either decides or approves the signer, in which case the signature is
//! verified against a trust anchor, a cached certificate, or a certificate
//! the caller fetches.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────────┐
//! │ INFO config │────▶│    Policy    │────▶│ PolicyValidator  │
//! │  (loader)   │     │ rules+anchors│     │  (step bounded)  │
//! └─────────────┘     └──────────────┘     └──────────────────┘
//!                                             │          ▲
//!                               Pending(req)  │          │ resume_request
//!                                             ▼          │
//!                     ┌──────────────────┐  ┌──────────────────┐
//!                     │ CertificateCache │  │CertificateFetcher│
//!                     │   (moka, TTL)    │  │    (caller)      │
//!                     └──────────────────┘  └──────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use ndn_trust_policy::policy::{PolicyValidator, ValidationOutcome};
//!
//! let validator = PolicyValidator::default();
//! validator.load_file(Path::new("/etc/ndn/validator.conf"))?;
//!
//! match validator.check_policy_data(&data, 0) {
//!     ValidationOutcome::Accepted => { /* deliver */ }
//!     ValidationOutcome::Rejected(reason) => { /* drop */ }
//!     ValidationOutcome::Pending(requests) => { /* fetch, then resume_request */ }
//! }
//! ```

pub mod anchor;
pub mod cache;
pub mod checker;
pub mod error;
pub mod fetcher;
pub mod filter;
pub mod loader;
pub mod rule;
pub mod types;
pub mod validator;

#[cfg(test)]
pub(crate) mod fixtures;

pub use anchor::TrustAnchorStore;
pub use cache::{CertificateCache, CertificateCacheTtl};
pub use checker::{CheckOutcome, Checker, KeyLocatorCheck};
pub use error::{ConfigError, ValidationError};
pub use fetcher::{CertificateFetcher, FetchError};
pub use filter::{Filter, NameRelation};
pub use loader::{load_policy_file, load_policy_section, load_policy_str, Policy};
pub use rule::Rule;
pub use types::{ValidationOutcome, ValidationRequest};
pub use validator::{PolicyValidator, DEFAULT_FETCH_RETRIES, DEFAULT_STEP_LIMIT};
