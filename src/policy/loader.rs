//! Building a [`Policy`] from configuration.
//!
//! The whole document is processed before anything is returned, so a failing
//! load never leaves a partially built policy behind.

use crate::conf::{parse_info, ConfigSection, SectionError};
use crate::packet::{PacketKind, SignedPacket};
use crate::policy::anchor::{certificate_from_config, TrustAnchorStore};
use crate::policy::checker::Checker;
use crate::policy::error::ConfigError;
use crate::policy::filter::Filter;
use crate::policy::rule::Rule;
use log::{debug, info};
use std::path::Path;

/// Rules and trust anchors loaded from one configuration document.
#[derive(Debug, Clone, Default)]
pub struct Policy {
    data_rules: Vec<Rule>,
    interest_rules: Vec<Rule>,
    anchors: TrustAnchorStore,
}

impl Policy {
    /// Assemble a policy from rules (in evaluation order) and anchors.
    pub fn new(rules: impl IntoIterator<Item = Rule>, anchors: TrustAnchorStore) -> Self {
        let mut policy = Policy {
            anchors,
            ..Policy::default()
        };
        for rule in rules {
            policy.push_rule(rule);
        }
        policy
    }

    /// A policy with no rules: every packet is rejected.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn data_rules(&self) -> &[Rule] {
        &self.data_rules
    }

    pub fn interest_rules(&self) -> &[Rule] {
        &self.interest_rules
    }

    pub fn anchors(&self) -> &TrustAnchorStore {
        &self.anchors
    }

    pub fn rules_for(&self, kind: PacketKind) -> &[Rule] {
        match kind {
            PacketKind::Data => &self.data_rules,
            PacketKind::Interest => &self.interest_rules,
        }
    }

    /// First rule, in configured order, that covers `packet`.
    pub fn find_rule(&self, packet: &SignedPacket) -> Option<&Rule> {
        self.rules_for(packet.kind())
            .iter()
            .find(|rule| rule.matches(packet))
    }

    fn push_rule(&mut self, rule: Rule) {
        match rule.kind() {
            PacketKind::Data => self.data_rules.push(rule),
            PacketKind::Interest => self.interest_rules.push(rule),
        }
    }
}

/// Read and load a configuration file. Relative certificate paths are
/// resolved against the file's directory.
pub fn load_policy_file(path: &Path) -> Result<Policy, ConfigError> {
    let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    load_policy_str(&input, &path.display().to_string())
}

/// Load configuration text. `filename` names the source in errors and
/// anchors relative certificate paths.
pub fn load_policy_str(input: &str, filename: &str) -> Result<Policy, ConfigError> {
    let section = parse_info(input).map_err(|source| ConfigError::Parse {
        filename: filename.to_string(),
        source,
    })?;
    load_policy_section(&section, filename)
}

/// Load an already parsed configuration tree.
pub fn load_policy_section(section: &ConfigSection, filename: &str) -> Result<Policy, ConfigError> {
    if section.is_empty() {
        return Err(ConfigError::Empty {
            filename: filename.to_string(),
        });
    }

    let base_dir = base_dir(filename);
    let mut policy = Policy::empty();

    for (key, child) in section.children() {
        if key.eq_ignore_ascii_case("rule") {
            let rule = rule_from_config(child, filename, base_dir)?;
            debug!("Loaded {} rule {}", rule.kind(), rule.id());
            policy.push_rule(rule);
        } else if key.eq_ignore_ascii_case("trust-anchor") {
            let certificate = certificate_from_config(child, base_dir, "trust-anchor")
                .map_err(|source| ConfigError::TrustAnchor {
                    filename: filename.to_string(),
                    source,
                })?;
            debug!("Loaded trust anchor {}", certificate.name());
            policy.anchors.insert(certificate);
        } else {
            return Err(ConfigError::UnrecognizedSection {
                filename: filename.to_string(),
                section: key.to_string(),
            });
        }
    }

    info!(
        "Loaded {}: {} data rules, {} interest rules, {} trust anchors",
        filename,
        policy.data_rules.len(),
        policy.interest_rules.len(),
        policy.anchors.len()
    );
    Ok(policy)
}

fn base_dir(filename: &str) -> &Path {
    Path::new(filename)
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
}

fn rule_from_config(
    section: &ConfigSection,
    filename: &str,
    base_dir: &Path,
) -> Result<Rule, ConfigError> {
    let mut cursor = section.cursor();
    let id = cursor
        .expect_value("id", "rule.id")
        .map_err(|source| ConfigError::MissingRuleId {
            filename: filename.to_string(),
            source,
        })?;
    let rule_error = |source: SectionError| ConfigError::Rule {
        rule_id: id.to_string(),
        source,
    };

    let usage = cursor.expect_value("for", "rule.for").map_err(rule_error)?;
    let kind = PacketKind::from_config(usage)
        .ok_or_else(|| rule_error(SectionError::unsupported("rule.for", usage)))?;

    let mut filters = Vec::new();
    while let Some(filter) = cursor.next_if("filter") {
        filters.push(Filter::from_config(filter).map_err(rule_error)?);
    }

    let mut checkers = Vec::new();
    while let Some(checker) = cursor.next_if("checker") {
        checkers.push(Checker::from_config(checker, base_dir).map_err(rule_error)?);
    }

    if let Some(found) = cursor.peek_key() {
        let source = if checkers.is_empty() {
            SectionError::UnexpectedKey {
                expected: "rule.checker".to_string(),
                found: found.to_string(),
            }
        } else {
            SectionError::TrailingKey {
                section: "rule".to_string(),
                found: found.to_string(),
            }
        };
        return Err(rule_error(source));
    }

    if checkers.is_empty() {
        return Err(ConfigError::NoChecker {
            rule_id: id.to_string(),
        });
    }

    Ok(Rule::new(id, kind, filters, checkers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::fixtures::Identity;

    const RULES: &str = r#"
rule
{
  id "data rule"
  for data
  filter
  {
    type name
    name /a
    relation is-prefix-of
  }
  checker
  {
    type hierarchical
    sig-type ecdsa-sha256
  }
}
rule
{
  id "interest rule"
  for INTEREST
  checker
  {
    type hierarchical
    sig-type ecdsa-sha256
  }
}
"#;

    #[test]
    fn test_rules_split_by_kind() {
        let policy = load_policy_str(RULES, "rules.conf").unwrap();
        assert_eq!(policy.data_rules().len(), 1);
        assert_eq!(policy.interest_rules().len(), 1);
        assert_eq!(policy.data_rules()[0].id(), "data rule");
        assert_eq!(policy.data_rules()[0].filters().len(), 1);
        assert!(policy.anchors().is_empty());
    }

    #[test]
    fn test_find_rule_first_match() {
        let config = format!(
            "{}{}",
            RULES,
            r#"
rule
{
  id "shadowed"
  for data
  checker
  {
    type hierarchical
    sig-type ecdsa-sha256
  }
}
"#
        );
        let policy = load_policy_str(&config, "rules.conf").unwrap();
        let signer = Identity::new("/a/key1");

        let packet = signer.signed_data_packet("/a/b");
        assert_eq!(policy.find_rule(&packet).unwrap().id(), "data rule");

        let packet = signer.signed_data_packet("/z");
        assert_eq!(policy.find_rule(&packet).unwrap().id(), "shadowed");
    }

    #[test]
    fn test_inline_trust_anchor() {
        let cert = Identity::new("/a/key1").self_signed();
        let config = format!(
            "trust-anchor\n{{\n  type base64\n  base64-string \"{}\"\n}}\n",
            cert.to_base64()
        );
        let policy = load_policy_str(&config, "anchors.conf").unwrap();
        assert!(policy.anchors().lookup(&cert.key_name()).is_some());
        assert!(policy.data_rules().is_empty());
    }

    #[test]
    fn test_rule_errors_name_the_rule() {
        let no_checker = "rule\n{\n  id r1\n  for data\n}\n";
        let err = load_policy_str(no_checker, "x.conf").unwrap_err();
        assert!(matches!(err, ConfigError::NoChecker { ref rule_id } if rule_id == "r1"));

        let bad_for = "rule\n{\n  id r2\n  for both\n}\n";
        let err = load_policy_str(bad_for, "x.conf").unwrap_err();
        assert!(matches!(err, ConfigError::Rule { ref rule_id, .. } if rule_id == "r2"));

        let out_of_order = r#"
rule
{
  id r3
  for data
  checker
  {
    type hierarchical
    sig-type ecdsa-sha256
  }
  filter
  {
    type name
    regex ^/a
  }
}
"#;
        let err = load_policy_str(out_of_order, "x.conf").unwrap_err();
        assert!(err.to_string().contains("r3"));
        assert!(matches!(
            err,
            ConfigError::Rule {
                source: SectionError::TrailingKey { .. },
                ..
            }
        ));

        let stray = "rule\n{\n  id r4\n  for data\n  owner bob\n}\n";
        let err = load_policy_str(stray, "x.conf").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Rule {
                source: SectionError::UnexpectedKey { .. },
                ..
            }
        ));

        let no_id = "rule\n{\n  for data\n}\n";
        assert!(matches!(
            load_policy_str(no_id, "x.conf").unwrap_err(),
            ConfigError::MissingRuleId { .. }
        ));
    }

    #[test]
    fn test_document_errors() {
        assert!(matches!(
            load_policy_str("; nothing\n", "x.conf").unwrap_err(),
            ConfigError::Empty { .. }
        ));
        assert!(matches!(
            load_policy_str("policy\n{\n  a b\n}\n", "x.conf").unwrap_err(),
            ConfigError::UnrecognizedSection { .. }
        ));
        assert!(matches!(
            load_policy_str("rule\n{\n", "x.conf").unwrap_err(),
            ConfigError::Parse { .. }
        ));
        assert!(matches!(
            load_policy_str("trust-anchor\n{\n  type any\n}\n", "x.conf").unwrap_err(),
            ConfigError::TrustAnchor { .. }
        ));
    }

    #[test]
    fn test_base_dir() {
        assert_eq!(base_dir("policy.conf"), Path::new("."));
        assert_eq!(base_dir("/etc/ndn/policy.conf"), Path::new("/etc/ndn"));
    }
}
