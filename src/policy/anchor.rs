//! Pinned trust anchors.

use crate::certificate::IdentityCertificate;
use crate::conf::{ConfigSection, SectionError};
use crate::name::Name;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Trusted certificates keyed by key name (certificate name minus version).
///
/// Filled while a configuration loads and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct TrustAnchorStore {
    anchors: HashMap<Name, Arc<IdentityCertificate>>,
}

impl TrustAnchorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin `certificate` under its key name. A later insert for the same key
    /// replaces the earlier one.
    pub fn insert(&mut self, certificate: IdentityCertificate) {
        self.anchors
            .insert(certificate.key_name(), Arc::new(certificate));
    }

    /// Exact-key lookup; partial prefixes never match.
    pub fn lookup(&self, key_name: &Name) -> Option<Arc<IdentityCertificate>> {
        self.anchors.get(key_name).cloned()
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    pub fn key_names(&self) -> impl Iterator<Item = &Name> {
        self.anchors.keys()
    }
}

/// Read a certificate from a `type file|base64` section, as used by
/// `trust-anchor` and fixed-signer `signer` blocks. Relative file names are
/// resolved against `base_dir`.
pub(crate) fn certificate_from_config(
    section: &ConfigSection,
    base_dir: &Path,
    section_name: &str,
) -> Result<IdentityCertificate, SectionError> {
    let mut cursor = section.cursor();
    let source_type = cursor.expect_value("type", &format!("{}.type", section_name))?;

    if source_type.eq_ignore_ascii_case("file") {
        let file = cursor.expect_value("file-name", &format!("{}.file-name", section_name))?;
        cursor.finish(section_name)?;

        let path = base_dir.join(file);
        IdentityCertificate::load_file(&path).map_err(|source| SectionError::CertificateFile {
            path: path.display().to_string(),
            source,
        })
    } else if source_type.eq_ignore_ascii_case("base64") {
        let encoded =
            cursor.expect_value("base64-string", &format!("{}.base64-string", section_name))?;
        cursor.finish(section_name)?;

        IdentityCertificate::from_base64(encoded).map_err(SectionError::CertificateBase64)
    } else {
        Err(SectionError::unsupported(
            &format!("{}.type", section_name),
            source_type,
        ))
    }
}
