//! Hierarchical packet names.
//!
//! A name is an ordered list of opaque byte components, written in URI form as
//! `/a/b/c`. Bytes outside the unreserved set are percent-encoded.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while parsing a name URI.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("invalid percent-escape in name component: {component}")]
    InvalidEscape { component: String },
}

/// A single name component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, scale::Encode, scale::Decode)]
pub struct Component(Vec<u8>);

impl Component {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Component(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    fn from_escaped(escaped: &str) -> Result<Self, NameError> {
        let raw = escaped.as_bytes();
        let mut bytes = Vec::with_capacity(raw.len());
        let mut i = 0;
        while i < raw.len() {
            if raw[i] == b'%' {
                let decoded = raw
                    .get(i + 1..i + 3)
                    .and_then(|pair| hex::decode(pair).ok())
                    .ok_or_else(|| NameError::InvalidEscape {
                        component: escaped.to_string(),
                    })?;
                bytes.extend_from_slice(&decoded);
                i += 3;
            } else {
                bytes.push(raw[i]);
                i += 1;
            }
        }
        Ok(Component(bytes))
    }
}

impl From<&str> for Component {
    fn from(value: &str) -> Self {
        Component(value.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for Component {
    fn from(value: Vec<u8>) -> Self {
        Component(value)
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &byte in &self.0 {
            if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') {
                write!(f, "{}", byte as char)?;
            } else {
                write!(f, "%{:02X}", byte)?;
            }
        }
        Ok(())
    }
}

/// A hierarchical name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, scale::Encode, scale::Decode)]
pub struct Name {
    components: Vec<Component>,
}

impl Name {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a URI such as `/a/b/c`. An optional `ndn:` scheme is accepted.
    pub fn from_uri(uri: &str) -> Result<Self, NameError> {
        let path = uri.trim();
        let path = path.strip_prefix("ndn:").unwrap_or(path);
        let components = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(Component::from_escaped)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Name { components })
    }

    /// Return a copy of this name with `component` appended.
    pub fn append(mut self, component: impl Into<Component>) -> Self {
        self.components.push(component.into());
        self
    }

    pub fn push(&mut self, component: impl Into<Component>) {
        self.components.push(component.into());
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Component at `index`; negative indices count from the end.
    pub fn get(&self, index: isize) -> Option<&Component> {
        let resolved = if index < 0 {
            self.components.len().checked_sub(index.unsigned_abs())?
        } else {
            index as usize
        };
        self.components.get(resolved)
    }

    /// The first `count` components. A negative count drops `|count|` trailing
    /// components; the result saturates at the empty name.
    pub fn get_prefix(&self, count: isize) -> Name {
        let len = if count < 0 {
            self.components.len().saturating_sub(count.unsigned_abs())
        } else {
            (count as usize).min(self.components.len())
        };
        Name {
            components: self.components[..len].to_vec(),
        }
    }

    /// Whether every component of `self` is a leading component of `other`.
    pub fn is_prefix_of(&self, other: &Name) -> bool {
        self.components.len() <= other.components.len()
            && self
                .components
                .iter()
                .zip(other.components.iter())
                .all(|(a, b)| a == b)
    }

    pub fn to_uri(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.components.is_empty() {
            return f.write_str("/");
        }
        for component in &self.components {
            write!(f, "/{}", component)?;
        }
        Ok(())
    }
}

impl FromStr for Name {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Name::from_uri(s)
    }
}

impl Serialize for Name {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let uri = String::deserialize(deserializer)?;
        Name::from_uri(&uri).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(uri: &str) -> Name {
        Name::from_uri(uri).unwrap()
    }

    #[test]
    fn test_uri_round_trip() {
        assert_eq!(name("/a/b/c").to_uri(), "/a/b/c");
        assert_eq!(name("ndn:/a//b/").to_uri(), "/a/b");
        assert_eq!(name("/").len(), 0);
        assert_eq!(Name::new().to_uri(), "/");
    }

    #[test]
    fn test_percent_escapes() {
        let n = name("/a%2Fb/%00%FF");
        assert_eq!(n.len(), 2);
        assert_eq!(n.components()[0].as_bytes(), b"a/b");
        assert_eq!(n.components()[1].as_bytes(), &[0x00, 0xFF]);
        assert_eq!(n.to_uri(), "/a%2Fb/%00%FF");

        assert!(matches!(
            Name::from_uri("/bad%2"),
            Err(NameError::InvalidEscape { .. })
        ));
        assert!(Name::from_uri("/bad%zz").is_err());
    }

    #[test]
    fn test_get_prefix() {
        let n = name("/a/b/c");
        assert_eq!(n.get_prefix(-1), name("/a/b"));
        assert_eq!(n.get_prefix(-2), name("/a"));
        assert_eq!(n.get_prefix(-5), Name::new());
        assert_eq!(n.get_prefix(2), name("/a/b"));
        assert_eq!(n.get_prefix(10), n);
    }

    #[test]
    fn test_negative_index() {
        let n = name("/a/b/c");
        assert_eq!(n.get(-1), Some(&Component::from("c")));
        assert_eq!(n.get(0), Some(&Component::from("a")));
        assert_eq!(n.get(-4), None);
        assert_eq!(n.get(3), None);
    }

    #[test]
    fn test_is_prefix_of() {
        assert!(name("/a").is_prefix_of(&name("/a/b")));
        assert!(name("/a/b").is_prefix_of(&name("/a/b")));
        assert!(Name::new().is_prefix_of(&name("/a")));
        assert!(!name("/a/b").is_prefix_of(&name("/a")));
        assert!(!name("/a/c").is_prefix_of(&name("/a/b/c")));
    }

    #[test]
    fn test_serde_as_uri() {
        let json = serde_json::to_string(&name("/a/b")).unwrap();
        assert_eq!(json, "\"/a/b\"");
        let back: Name = serde_json::from_str(&json).unwrap();
        assert_eq!(back, name("/a/b"));
    }
}
