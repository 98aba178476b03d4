//! Ordered configuration tree.

use crate::certificate::CertificateError;
use crate::name::NameError;
use thiserror::Error;

/// Errors found while walking a single configuration section.
#[derive(Debug, Error)]
pub enum SectionError {
    #[error("expected <{key}>")]
    MissingKey { key: String },

    #[error("expected <{expected}>, found <{found}>")]
    UnexpectedKey { expected: String, found: String },

    #[error("expected the end of {section}, found <{found}>")]
    TrailingKey { section: String, found: String },

    #[error("unsupported {key}: {value}")]
    Unsupported { key: String, value: String },

    #[error("invalid regex {pattern}: {source}")]
    Regex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid name: {0}")]
    Name(#[from] NameError),

    #[error("cannot read certificate from file {path}: {source}")]
    CertificateFile {
        path: String,
        #[source]
        source: CertificateError,
    },

    #[error("cannot decode certificate from base64-string: {0}")]
    CertificateBase64(#[source] CertificateError),
}

impl SectionError {
    pub(crate) fn unsupported(key: &str, value: &str) -> Self {
        SectionError::Unsupported {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

/// A node in the configuration tree: a value plus ordered, possibly
/// repeated, children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigSection {
    value: String,
    children: Vec<(String, ConfigSection)>,
}

impl ConfigSection {
    pub fn new(value: impl Into<String>) -> Self {
        ConfigSection {
            value: value.into(),
            children: Vec::new(),
        }
    }

    /// Builder-style child insertion.
    pub fn with(mut self, key: impl Into<String>, child: ConfigSection) -> Self {
        self.push(key, child);
        self
    }

    /// Builder-style leaf insertion.
    pub fn with_value(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.with(key, ConfigSection::new(value))
    }

    pub fn push(&mut self, key: impl Into<String>, child: ConfigSection) {
        self.children.push((key.into(), child));
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, &ConfigSection)> {
        self.children.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn cursor(&self) -> SectionCursor<'_> {
        SectionCursor {
            entries: &self.children,
            position: 0,
        }
    }
}

/// Walks the children of a section in order. Key comparison is
/// case-insensitive.
pub struct SectionCursor<'a> {
    entries: &'a [(String, ConfigSection)],
    position: usize,
}

impl<'a> SectionCursor<'a> {
    pub fn peek_key(&self) -> Option<&'a str> {
        self.entries.get(self.position).map(|(k, _)| k.as_str())
    }

    pub fn peek_is(&self, key: &str) -> bool {
        self.peek_key().is_some_and(|k| k.eq_ignore_ascii_case(key))
    }

    /// Consume the next entry if its key is `key`.
    pub fn next_if(&mut self, key: &str) -> Option<&'a ConfigSection> {
        if !self.peek_is(key) {
            return None;
        }
        let (_, section) = &self.entries[self.position];
        self.position += 1;
        Some(section)
    }

    /// Consume the next entry, which must have key `key`. `qualified` is the
    /// name used in error messages, e.g. `rule.for`.
    pub fn expect(&mut self, key: &str, qualified: &str) -> Result<&'a ConfigSection, SectionError> {
        match self.peek_key() {
            Some(found) if found.eq_ignore_ascii_case(key) => {
                let (_, section) = &self.entries[self.position];
                self.position += 1;
                Ok(section)
            }
            Some(found) => Err(SectionError::UnexpectedKey {
                expected: qualified.to_string(),
                found: found.to_string(),
            }),
            None => Err(SectionError::MissingKey {
                key: qualified.to_string(),
            }),
        }
    }

    pub fn expect_value(&mut self, key: &str, qualified: &str) -> Result<&'a str, SectionError> {
        self.expect(key, qualified).map(|section| section.value())
    }

    /// Fail if any entries are left.
    pub fn finish(&self, section: &str) -> Result<(), SectionError> {
        match self.peek_key() {
            Some(found) => Err(SectionError::TrailingKey {
                section: section.to_string(),
                found: found.to_string(),
            }),
            None => Ok(()),
        }
    }
}
