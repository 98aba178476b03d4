use std::env;
use std::path::Path;

use log::{error, info};
use ndn_trust_policy::name::Name;
use ndn_trust_policy::packet::PacketKind;
use ndn_trust_policy::policy::{Policy, PolicyValidator, Rule};
use ndn_trust_policy::settings::ValidatorSettings;
use serde::Serialize;
use tokio::fs;

#[derive(Serialize, Debug)]
struct RuleSummary {
    id: String,
    #[serde(rename = "for")]
    kind: PacketKind,
    filters: usize,
    checkers: Vec<String>,
}

#[derive(Serialize, Debug)]
struct PolicySummary {
    file: String,
    step_limit: usize,
    rules: Vec<RuleSummary>,
    trust_anchors: Vec<Name>,
}

impl RuleSummary {
    fn from_rule(rule: &Rule) -> Self {
        RuleSummary {
            id: rule.id().to_string(),
            kind: rule.kind(),
            filters: rule.filters().len(),
            checkers: rule
                .checkers()
                .iter()
                .map(|checker| checker.signature_type().to_string())
                .collect(),
        }
    }
}

fn summarize(file: &str, step_limit: usize, policy: &Policy) -> PolicySummary {
    let mut trust_anchors: Vec<Name> = policy.anchors().key_names().cloned().collect();
    trust_anchors.sort();
    PolicySummary {
        file: file.to_string(),
        step_limit,
        rules: policy
            .data_rules()
            .iter()
            .chain(policy.interest_rules())
            .map(RuleSummary::from_rule)
            .collect(),
        trust_anchors,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::init();

    // Load configuration
    let settings = ValidatorSettings::from_env();
    let config_path = env::args()
        .nth(1)
        .or_else(|| settings.config_path.clone())
        .ok_or("usage: validator-lint <policy file> (or set VALIDATOR_CONFIG)")?;

    let input = fs::read_to_string(Path::new(&config_path)).await.map_err(|e| {
        error!("Failed to read {}: {}", config_path, e);
        e
    })?;

    let validator = PolicyValidator::with_settings(&settings);
    if let Err(e) = validator.load_str(&input, &config_path) {
        error!("{}", e);
        return Err(e.into());
    }

    let policy = validator.policy();
    info!(
        "{} is valid: {} rules, {} trust anchors",
        config_path,
        policy.data_rules().len() + policy.interest_rules().len(),
        policy.anchors().len()
    );

    let summary = summarize(&config_path, validator.step_limit(), &policy);
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
