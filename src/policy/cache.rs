//! Certificate cache with TTL eviction.
//!
//! Certificates verified while unwinding a chain are kept here so later
//! packets signed by the same key resolve without another fetch.

use crate::certificate::IdentityCertificate;
use crate::name::Name;
use chrono::Utc;
use log::debug;
use moka::sync::Cache;
use std::sync::Arc;
use std::time::Duration;

/// Default entry lifetime in seconds.
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 3600;

/// Default maximum number of cached certificates.
pub const DEFAULT_CACHE_CAPACITY: u64 = 10_000;

/// Storage for verified certificates, keyed by key name.
///
/// Shared between validators, so implementations must be safe for concurrent
/// use.
pub trait CertificateCache: Send + Sync {
    fn insert_certificate(&self, certificate: Arc<IdentityCertificate>);

    /// Look up by key name (certificate name minus version).
    fn get_certificate(&self, key_name: &Name) -> Option<Arc<IdentityCertificate>>;
}

/// In-memory certificate cache backed by moka.
pub struct CertificateCacheTtl {
    cache: Cache<Name, Arc<IdentityCertificate>>,
}

impl CertificateCacheTtl {
    pub fn new(ttl: Duration, max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();

        Self { cache }
    }

    /// Drop a single entry.
    pub fn invalidate(&self, key_name: &Name) {
        self.cache.invalidate(key_name);
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }
}

impl Default for CertificateCacheTtl {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(DEFAULT_CACHE_TTL_SECONDS),
            DEFAULT_CACHE_CAPACITY,
        )
    }
}

impl CertificateCache for CertificateCacheTtl {
    fn insert_certificate(&self, certificate: Arc<IdentityCertificate>) {
        let key_name = certificate.key_name();
        debug!("Caching certificate {} under {}", certificate.name(), key_name);
        self.cache.insert(key_name, certificate);
    }

    fn get_certificate(&self, key_name: &Name) -> Option<Arc<IdentityCertificate>> {
        let certificate = self.cache.get(key_name)?;

        // Validity periods can lapse before the TTL does
        if !certificate.is_valid_at(Utc::now()) {
            debug!("Evicting expired certificate {}", certificate.name());
            self.cache.invalidate(key_name);
            return None;
        }

        Some(certificate)
    }
}
