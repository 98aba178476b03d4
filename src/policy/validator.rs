//! Policy-driven packet validation.
//!
//! [`PolicyValidator::check_policy_data`] and
//! [`PolicyValidator::check_policy_interest`] never block: when a signer's
//! certificate is neither a trust anchor nor cached they return
//! [`ValidationOutcome::Pending`] and the caller fetches the certificate and
//! continues with [`PolicyValidator::resume_request`]. The async
//! [`PolicyValidator::validate_data`] / [`PolicyValidator::validate_interest`]
//! drive that loop with a [`CertificateFetcher`].

use crate::certificate::IdentityCertificate;
use crate::conf::ConfigSection;
use crate::crypto::{verify_digest_sha256, EcdsaP256Verifier, SignatureVerifier};
use crate::name::Name;
use crate::packet::{Data, Interest, Packet, SignatureType, SignedPacket};
use crate::policy::cache::{CertificateCache, CertificateCacheTtl};
use crate::policy::checker::CheckOutcome;
use crate::policy::error::{ConfigError, ValidationError};
use crate::policy::fetcher::{CertificateFetcher, FetchError};
use crate::policy::loader::{load_policy_file, load_policy_section, load_policy_str, Policy};
use crate::policy::types::{ValidationOutcome, ValidationRequest};
use crate::settings::ValidatorSettings;
use chrono::Utc;
use log::{debug, info, warn};
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Maximum certificate hops for one top-level validation.
pub const DEFAULT_STEP_LIMIT: usize = 10;

/// Extra fetch attempts after a timeout.
pub const DEFAULT_FETCH_RETRIES: u32 = 1;

/// Internal result of judging one packet at one step.
enum Decision {
    Accepted,
    Rejected(ValidationError),
    NeedCertificate(Name),
}

pub struct PolicyValidator {
    /// Swapped as a whole on reload; readers keep their snapshot.
    policy: RwLock<Arc<Policy>>,

    cache: Arc<dyn CertificateCache>,

    verifier: Arc<dyn SignatureVerifier>,

    step_limit: usize,

    fetch_retries: u32,
}

impl PolicyValidator {
    /// Create a validator with an empty policy.
    pub fn new(
        cache: Arc<dyn CertificateCache>,
        verifier: Arc<dyn SignatureVerifier>,
        step_limit: usize,
    ) -> Self {
        Self {
            policy: RwLock::new(Arc::new(Policy::empty())),
            cache,
            verifier,
            step_limit,
            fetch_retries: DEFAULT_FETCH_RETRIES,
        }
    }

    /// Create a validator with a TTL cache and ECDSA verification sized by
    /// `settings`. The policy file named in the settings is not loaded.
    pub fn with_settings(settings: &ValidatorSettings) -> Self {
        let cache = CertificateCacheTtl::new(
            Duration::from_secs(settings.cache_ttl_secs),
            settings.cache_capacity,
        );
        Self::new(Arc::new(cache), Arc::new(EcdsaP256Verifier), settings.step_limit)
            .with_fetch_retries(settings.fetch_retries)
    }

    pub fn with_fetch_retries(mut self, fetch_retries: u32) -> Self {
        self.fetch_retries = fetch_retries;
        self
    }

    pub fn step_limit(&self) -> usize {
        self.step_limit
    }

    /// Snapshot of the current policy.
    pub fn policy(&self) -> Arc<Policy> {
        self.policy.read().clone()
    }

    pub fn replace_policy(&self, policy: Policy) {
        *self.policy.write() = Arc::new(policy);
    }

    /// Load a policy file, replacing the current policy only on success.
    pub fn load_file(&self, path: &Path) -> Result<(), ConfigError> {
        let policy = load_policy_file(path)?;
        self.replace_policy(policy);
        Ok(())
    }

    pub fn load_str(&self, input: &str, filename: &str) -> Result<(), ConfigError> {
        let policy = load_policy_str(input, filename)?;
        self.replace_policy(policy);
        Ok(())
    }

    pub fn load_section(&self, section: &ConfigSection, filename: &str) -> Result<(), ConfigError> {
        let policy = load_policy_section(section, filename)?;
        self.replace_policy(policy);
        Ok(())
    }

    /// Judge a data packet at `step_count` (0 for a top-level validation).
    pub fn check_policy_data(&self, data: &Data, step_count: usize) -> ValidationOutcome {
        self.check_packet(SignedPacket::from_data(data.clone()), step_count)
    }

    /// Judge a signed interest at `step_count`.
    pub fn check_policy_interest(&self, interest: &Interest, step_count: usize) -> ValidationOutcome {
        if let Some(reason) = self.step_gate(step_count) {
            return ValidationOutcome::Rejected(reason);
        }
        match SignedPacket::from_interest(interest.clone()) {
            Ok(packet) => self.check_packet(packet, step_count),
            Err(e) => {
                debug!("Rejecting interest {}: {}", interest.name(), e);
                ValidationOutcome::Rejected(ValidationError::MalformedInterest {
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Continue a pending validation with the fetched certificate.
    ///
    /// The certificate is judged as a data packet at the request's step
    /// count. Once it is trusted, every waiting packet is verified in turn,
    /// each verified certificate being cached and used for the next one.
    /// Rules and anchors come from the policy the chain started under, even
    /// if the validator has been reloaded since.
    pub fn resume_request(&self, request: ValidationRequest, certificate: Data) -> ValidationOutcome {
        let ValidationRequest {
            certificate_name,
            step_count,
            waiting,
            policy,
            ..
        } = request;

        if let Some(reason) = self.step_gate(step_count) {
            return ValidationOutcome::Rejected(reason);
        }

        if certificate.name().get_prefix(-1) != certificate_name {
            warn!(
                "Fetched {} while resolving certificate {}",
                certificate.name(),
                certificate_name
            );
            return ValidationOutcome::Rejected(ValidationError::CertificateUnresolved {
                reason: format!("fetched data {} does not belong to this key", certificate.name()),
                certificate: certificate_name,
            });
        }

        let certificate_packet = SignedPacket::from_data(certificate.clone());
        match self.decide(&policy, &certificate_packet, step_count) {
            Decision::Accepted => self.unwind(certificate, waiting),
            Decision::Rejected(reason) => {
                debug!("Certificate {} rejected: {}", certificate.name(), reason);
                ValidationOutcome::Rejected(reason)
            }
            Decision::NeedCertificate(next) => {
                let mut chain = Vec::with_capacity(waiting.len() + 1);
                chain.push(certificate_packet);
                chain.extend(waiting);
                let request = self.request(&policy, next, step_count + 1, chain);
                ValidationOutcome::Pending(vec![request])
            }
        }
    }

    /// Abandon a pending validation: the certificate could not be retrieved.
    pub fn fail_request(
        &self,
        request: ValidationRequest,
        reason: impl Into<String>,
    ) -> ValidationOutcome {
        let reason = reason.into();
        info!(
            "Cannot retrieve certificate {}: {}",
            request.certificate_name, reason
        );
        ValidationOutcome::Rejected(ValidationError::CertificateUnresolved {
            certificate: request.certificate_name,
            reason,
        })
    }

    /// Validate a data packet, fetching missing certificates with `fetcher`.
    pub async fn validate_data(
        &self,
        data: &Data,
        fetcher: &dyn CertificateFetcher,
    ) -> Result<(), ValidationError> {
        let outcome = self.check_policy_data(data, 0);
        self.drive(outcome, data.name(), fetcher).await
    }

    /// Validate a signed interest, fetching missing certificates with `fetcher`.
    pub async fn validate_interest(
        &self,
        interest: &Interest,
        fetcher: &dyn CertificateFetcher,
    ) -> Result<(), ValidationError> {
        let outcome = self.check_policy_interest(interest, 0);
        self.drive(outcome, interest.name(), fetcher).await
    }

    async fn drive(
        &self,
        outcome: ValidationOutcome,
        name: &Name,
        fetcher: &dyn CertificateFetcher,
    ) -> Result<(), ValidationError> {
        let mut work = VecDeque::new();
        match outcome {
            ValidationOutcome::Accepted => return Ok(()),
            ValidationOutcome::Rejected(reason) => return Err(reason),
            ValidationOutcome::Pending(requests) => work.extend(requests),
        }

        while let Some(request) = work.pop_front() {
            let outcome = match self.fetch(&request, fetcher).await {
                Ok(certificate) => self.resume_request(request, certificate),
                Err(e) => self.fail_request(request, e.to_string()),
            };
            match outcome {
                ValidationOutcome::Accepted => return Ok(()),
                ValidationOutcome::Rejected(reason) => return Err(reason),
                ValidationOutcome::Pending(requests) => work.extend(requests),
            }
        }

        Err(ValidationError::Undecided { name: name.clone() })
    }

    async fn fetch(
        &self,
        request: &ValidationRequest,
        fetcher: &dyn CertificateFetcher,
    ) -> Result<Data, FetchError> {
        let attempts = request.retries + 1;
        let mut attempt = 1;
        loop {
            match fetcher.fetch(&request.certificate_name).await {
                Ok(data) => return Ok(data),
                Err(FetchError::Timeout { name }) if attempt < attempts => {
                    warn!(
                        "Timed out fetching {} (attempt {}/{}), retrying",
                        name, attempt, attempts
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn check_packet(&self, packet: SignedPacket, step_count: usize) -> ValidationOutcome {
        let policy = self.policy();
        match self.decide(&policy, &packet, step_count) {
            Decision::Accepted => {
                debug!("Accepted {}", packet.name());
                ValidationOutcome::Accepted
            }
            Decision::Rejected(reason) => {
                debug!("Rejected {}: {}", packet.name(), reason);
                ValidationOutcome::Rejected(reason)
            }
            Decision::NeedCertificate(certificate_name) => ValidationOutcome::Pending(vec![
                self.request(&policy, certificate_name, step_count + 1, vec![packet]),
            ]),
        }
    }

    fn step_gate(&self, step_count: usize) -> Option<ValidationError> {
        if step_count >= self.step_limit {
            debug!("Maximum steps of validation reached ({})", self.step_limit);
            return Some(ValidationError::StepLimitReached {
                limit: self.step_limit,
            });
        }
        None
    }

    fn decide(&self, policy: &Policy, packet: &SignedPacket, step_count: usize) -> Decision {
        if let Some(reason) = self.step_gate(step_count) {
            return Decision::Rejected(reason);
        }

        let Some(rule) = policy.find_rule(packet) else {
            return Decision::Rejected(ValidationError::NoRuleMatched {
                name: packet.signed_name().clone(),
            });
        };
        debug!("{} {} matched rule {}", packet.kind(), packet.signed_name(), rule.id());

        match rule.check(packet, self.verifier.as_ref()) {
            CheckOutcome::Accept => Decision::Accepted,
            CheckOutcome::Reject(reason) => Decision::Rejected(reason),
            CheckOutcome::Undecided => self.resolve_signature(policy, packet),
        }
    }

    /// Verify the signature against an anchor or cached certificate, or ask
    /// for the signer's certificate.
    fn resolve_signature(&self, policy: &Policy, packet: &SignedPacket) -> Decision {
        let signature = packet.signature();
        if signature.signature_type() == SignatureType::DigestSha256 {
            return if verify_digest_sha256(packet.signed_bytes(), &signature.value) {
                Decision::Accepted
            } else {
                warn!("Digest mismatch for {}", packet.signed_name());
                Decision::Rejected(ValidationError::SignatureInvalid {
                    name: packet.signed_name().clone(),
                })
            };
        }

        let Some(key_locator) = signature.key_locator() else {
            return Decision::Rejected(ValidationError::MissingKeyLocator {
                name: packet.signed_name().clone(),
            });
        };

        if let Some(anchor) = policy.anchors().lookup(key_locator) {
            debug!("Trust anchor hit for {}", key_locator);
            return self.verify_with(packet, &anchor);
        }

        if let Some(certificate) = self.cache.get_certificate(key_locator) {
            debug!("Cache hit for {}", key_locator);
            return self.verify_with(packet, &certificate);
        }

        debug!(
            "No certificate for {}, requesting it for {}",
            key_locator,
            packet.signed_name()
        );
        Decision::NeedCertificate(key_locator.clone())
    }

    fn verify_with(&self, packet: &SignedPacket, certificate: &IdentityCertificate) -> Decision {
        let signature = packet.signature();
        let public_key = certificate.public_key();
        if !self
            .verifier
            .supports(signature.signature_type(), public_key.key_type)
        {
            info!(
                "Cannot verify {} signature of {} with {}",
                signature.signature_type(),
                packet.signed_name(),
                certificate.name()
            );
            return Decision::Rejected(ValidationError::UnsupportedSignatureType {
                name: packet.signed_name().clone(),
                signature_type: signature.signature_type(),
            });
        }

        if self
            .verifier
            .verify(packet.signed_bytes(), signature, public_key)
        {
            Decision::Accepted
        } else {
            warn!(
                "Signature verification failed for {} with {}",
                packet.signed_name(),
                certificate.name()
            );
            Decision::Rejected(ValidationError::SignatureInvalid {
                name: packet.signed_name().clone(),
            })
        }
    }

    /// Verify the waiting packets innermost first, starting with a trusted
    /// certificate.
    fn unwind(&self, certificate: Data, waiting: Vec<SignedPacket>) -> ValidationOutcome {
        let mut signer = certificate;
        for packet in waiting {
            let signer_name = signer.name().clone();
            let certificate = match IdentityCertificate::from_data(signer) {
                Ok(certificate) => certificate,
                Err(e) => {
                    return ValidationOutcome::Rejected(ValidationError::CertificateMalformed {
                        certificate: signer_name,
                        reason: e.to_string(),
                    })
                }
            };

            if !certificate.is_valid_at(Utc::now()) {
                info!(
                    "Certificate {} is outside its validity period ({} - {})",
                    signer_name,
                    certificate.not_before(),
                    certificate.not_after()
                );
                return ValidationOutcome::Rejected(ValidationError::CertificateExpired {
                    certificate: signer_name,
                });
            }

            let certificate = Arc::new(certificate);
            self.cache.insert_certificate(certificate.clone());

            if let Decision::Rejected(reason) = self.verify_with(&packet, &certificate) {
                return ValidationOutcome::Rejected(reason);
            }

            match packet.into_packet() {
                Packet::Data(data) => signer = data,
                Packet::Interest(_) => break,
            }
        }
        ValidationOutcome::Accepted
    }

    fn request(
        &self,
        policy: &Arc<Policy>,
        certificate_name: Name,
        step_count: usize,
        waiting: Vec<SignedPacket>,
    ) -> ValidationRequest {
        ValidationRequest {
            certificate_name,
            step_count,
            retries: self.fetch_retries,
            waiting,
            policy: Arc::clone(policy),
        }
    }
}

impl Default for PolicyValidator {
    fn default() -> Self {
        Self::new(
            Arc::new(CertificateCacheTtl::default()),
            Arc::new(EcdsaP256Verifier),
            DEFAULT_STEP_LIMIT,
        )
    }
}
