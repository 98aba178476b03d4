mod common;

use std::fs;

use common::{init_logging, name, Identity};
use ndn_trust_policy::packet::{PacketKind, SignatureType};
use ndn_trust_policy::policy::{
    load_policy_file, Checker, ConfigError, Filter, KeyLocatorCheck, NameRelation, PolicyValidator,
};

const POLICY: &str = r#"
; trust schema for the test site
rule
{
  id "site data"
  for data
  filter
  {
    type name
    name /site
    relation is-prefix-of
  }
  filter
  {
    type name
    regex ^/mirror/site/
  }
  checker
  {
    type customized
    sig-type ecdsa-sha256
    key-locator
    {
      type name
      hyper-relation
      {
        k-regex ^(/[^/]+)/KEY/[^/]+$
        k-expand \\1
        h-relation is-prefix-of
        p-regex ^(/[^/]+)(/.*)?$
        p-expand \\1
      }
    }
  }
}
rule
{
  id "operators"
  for interest
  checker
  {
    type fixed-signer
    sig-type ecdsa-sha256
    signer
    {
      type file
      file-name certs/operator.cert
    }
  }
}
trust-anchor
{
  type file
  file-name "anchor.cert"
}
"#;

#[test]
fn test_load_file_resolves_relative_certificates() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let anchor = Identity::new("/site/KEY/1");
    let operator = Identity::new("/ops/alice");

    fs::create_dir(dir.path().join("certs")).unwrap();
    fs::write(dir.path().join("anchor.cert"), anchor.self_signed().to_pem()).unwrap();
    fs::write(
        dir.path().join("certs/operator.cert"),
        operator.self_signed().to_base64(),
    )
    .unwrap();
    let policy_path = dir.path().join("validator.conf");
    fs::write(&policy_path, POLICY).unwrap();

    let policy = load_policy_file(&policy_path).unwrap();
    assert_eq!(policy.data_rules().len(), 1);
    assert_eq!(policy.interest_rules().len(), 1);
    assert!(policy.anchors().lookup(&name("/site/KEY/1")).is_some());

    let site = &policy.data_rules()[0];
    assert_eq!(site.id(), "site data");
    assert_eq!(site.kind(), PacketKind::Data);
    assert!(matches!(
        site.filters(),
        [
            Filter::Relation {
                relation: NameRelation::IsPrefixOf,
                ..
            },
            Filter::Regex(_)
        ]
    ));
    assert!(matches!(
        site.checkers(),
        [Checker::Customized {
            signature_type: SignatureType::Sha256WithEcdsa,
            key_locator: Some(KeyLocatorCheck::HyperRelation { .. }),
        }]
    ));

    match &policy.interest_rules()[0].checkers()[0] {
        Checker::FixedSigner { signers, .. } => {
            assert!(signers.contains_key(&name("/ops/alice")));
        }
        other => panic!("unexpected checker {:?}", other),
    }

    // the loaded schema works end to end
    let validator = PolicyValidator::default();
    validator.load_file(&policy_path).unwrap();
    assert!(validator
        .check_policy_data(&anchor.sign_data("/site/news/1"), 0)
        .is_accepted());
    assert!(validator
        .check_policy_data(&anchor.sign_data("/mirror/site/news/1"), 0)
        .is_rejected());
    assert!(validator
        .check_policy_interest(&operator.sign_interest("/ops/restart"), 0)
        .is_accepted());
}

#[test]
fn test_missing_files() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();

    let err = load_policy_file(&dir.path().join("absent.conf")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));

    let policy_path = dir.path().join("validator.conf");
    fs::write(
        &policy_path,
        "trust-anchor\n{\n  type file\n  file-name missing.cert\n}\n",
    )
    .unwrap();
    let err = load_policy_file(&policy_path).unwrap_err();
    assert!(matches!(err, ConfigError::TrustAnchor { .. }));
    assert!(err.to_string().contains("validator.conf"));
}

#[test]
fn test_failed_reload_keeps_previous_policy() {
    init_logging();
    let anchor = Identity::new("/site/KEY/1");
    let validator = PolicyValidator::default();
    validator
        .load_str(
            &format!(
                "rule\n{{\n  id ok\n  for data\n  checker\n  {{\n    type hierarchical\n    sig-type ecdsa-sha256\n  }}\n}}\ntrust-anchor\n{{\n  type base64\n  base64-string \"{}\"\n}}\n",
                anchor.self_signed().to_base64()
            ),
            "first.conf",
        )
        .unwrap();

    let broken = "rule\n{\n  id ok2\n  for data\n  checker\n  {\n    type hierarchical\n    sig-type ecdsa-sha256\n  }\n}\nrule\n{\n  id bad\n  for data\n}\n";
    let err = validator.load_str(broken, "second.conf").unwrap_err();
    assert!(err.to_string().contains("bad"));

    let policy = validator.policy();
    assert_eq!(policy.data_rules().len(), 1);
    assert_eq!(policy.data_rules()[0].id(), "ok");
    assert_eq!(policy.anchors().len(), 1);
}

#[test]
fn test_parse_errors_carry_filename_and_line() {
    let validator = PolicyValidator::default();
    let err = validator
        .load_str("rule\n{\n  id r\n  for data\n", "broken.conf")
        .unwrap_err();
    match &err {
        ConfigError::Parse { filename, source } => {
            assert_eq!(filename, "broken.conf");
            assert!(source.line >= 4);
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(err.to_string().contains("broken.conf"));

    assert!(matches!(
        validator.load_str("", "empty.conf").unwrap_err(),
        ConfigError::Empty { .. }
    ));
    assert!(matches!(
        validator
            .load_str("validator\n{\n  x y\n}\n", "unknown.conf")
            .unwrap_err(),
        ConfigError::UnrecognizedSection { ref section, .. } if section == "validator"
    ));
}
