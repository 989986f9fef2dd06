//! Handler configuration loaded from environment variables at cold start.
//!
//! Every config type has a `from_lookup` constructor taking a variable lookup
//! function so tests never touch the process environment.

use vote_pipeline_core::contract::{validate_voter, DEFAULT_VOTER};
use vote_pipeline_core::envelope::EnvelopeMode;

pub const VOTE_TOPIC_ARN: &str = "VOTE_TOPIC_ARN";
pub const VOTE_QUEUE_URL: &str = "VOTE_QUEUE_URL";
pub const VOTES_TABLE: &str = "VOTES_TABLE";
pub const DEFAULT_VOTER_VAR: &str = "DEFAULT_VOTER";
pub const VOTE_ENVELOPE: &str = "VOTE_ENVELOPE";
pub const VOTE_DEDUPLICATE: &str = "VOTE_DEDUPLICATE";
pub const VOTE_PARTIAL_BATCH_RESPONSE: &str = "VOTE_PARTIAL_BATCH_RESPONSE";
pub const VOTE_MARKER_TTL_HOURS: &str = "VOTE_MARKER_TTL_HOURS";

pub const DEFAULT_VOTES_TABLE: &str = "Votes";
pub const DEFAULT_MARKER_TTL_HOURS: u32 = 24;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("either {} or {} must be configured", VOTE_TOPIC_ARN, VOTE_QUEUE_URL)]
    MissingBusTarget,
    #[error("only one of {} and {} may be configured", VOTE_TOPIC_ARN, VOTE_QUEUE_URL)]
    AmbiguousBusTarget,
    #[error("{name} has invalid value '{value}': {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusTarget {
    Topic(String),
    Queue(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeConfig {
    pub bus: BusTarget,
    pub default_voter: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorConfig {
    pub table_name: String,
    pub envelope: EnvelopeMode,
    pub deduplicate: bool,
    pub partial_batch_response: bool,
    pub marker_ttl_hours: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultsConfig {
    pub table_name: String,
}

impl IntakeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let topic = non_empty(lookup(VOTE_TOPIC_ARN));
        let queue = non_empty(lookup(VOTE_QUEUE_URL));
        let bus = match (topic, queue) {
            (Some(topic_arn), None) => BusTarget::Topic(topic_arn),
            (None, Some(queue_url)) => BusTarget::Queue(queue_url),
            (Some(_), Some(_)) => return Err(ConfigError::AmbiguousBusTarget),
            (None, None) => return Err(ConfigError::MissingBusTarget),
        };

        let default_voter =
            non_empty(lookup(DEFAULT_VOTER_VAR)).unwrap_or_else(|| DEFAULT_VOTER.to_string());
        validate_voter(&default_voter).map_err(|error| ConfigError::InvalidValue {
            name: DEFAULT_VOTER_VAR,
            value: default_voter.clone(),
            reason: error.to_string(),
        })?;

        Ok(Self { bus, default_voter })
    }
}

impl ProcessorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let envelope = match non_empty(lookup(VOTE_ENVELOPE)) {
            Some(raw) => raw
                .parse::<EnvelopeMode>()
                .map_err(|reason| ConfigError::InvalidValue {
                    name: VOTE_ENVELOPE,
                    value: raw.clone(),
                    reason,
                })?,
            None => EnvelopeMode::default(),
        };

        let marker_ttl_hours = match non_empty(lookup(VOTE_MARKER_TTL_HOURS)) {
            Some(raw) => match raw.parse::<u32>() {
                Ok(hours) if hours > 0 => hours,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: VOTE_MARKER_TTL_HOURS,
                        value: raw,
                        reason: "must be a positive integer".to_string(),
                    })
                }
            },
            None => DEFAULT_MARKER_TTL_HOURS,
        };

        Ok(Self {
            table_name: table_name(&lookup),
            envelope,
            deduplicate: parse_flag(&lookup, VOTE_DEDUPLICATE)?,
            partial_batch_response: parse_flag(&lookup, VOTE_PARTIAL_BATCH_RESPONSE)?,
            marker_ttl_hours,
        })
    }
}

impl ResultsConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            table_name: table_name(&lookup),
        })
    }
}

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

fn table_name(lookup: &impl Fn(&str) -> Option<String>) -> String {
    non_empty(lookup(VOTES_TABLE)).unwrap_or_else(|| DEFAULT_VOTES_TABLE.to_string())
}

fn parse_flag(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<bool, ConfigError> {
    let Some(raw) = non_empty(lookup(name)) else {
        return Ok(false);
    };

    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            name,
            value: raw,
            reason: "expected true or false".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        move |name| values.get(name).cloned()
    }

    #[test]
    fn intake_prefers_configured_topic_and_default_voter() {
        let config = IntakeConfig::from_lookup(lookup_from(&[(
            VOTE_TOPIC_ARN,
            "arn:aws:sns:eu-central-1:000000000000:my-vote",
        )]))
        .expect("config should load");

        assert_eq!(
            config.bus,
            BusTarget::Topic("arn:aws:sns:eu-central-1:000000000000:my-vote".to_string())
        );
        assert_eq!(config.default_voter, "default_voter");
    }

    #[test]
    fn intake_requires_exactly_one_bus_target() {
        assert_eq!(
            IntakeConfig::from_lookup(lookup_from(&[(VOTE_TOPIC_ARN, "  ")])),
            Err(ConfigError::MissingBusTarget)
        );
        assert_eq!(
            IntakeConfig::from_lookup(lookup_from(&[
                (VOTE_TOPIC_ARN, "arn:topic"),
                (VOTE_QUEUE_URL, "https://sqs.example/queue"),
            ])),
            Err(ConfigError::AmbiguousBusTarget)
        );
    }

    #[test]
    fn intake_rejects_reserved_default_voter() {
        let error = IntakeConfig::from_lookup(lookup_from(&[
            (VOTE_QUEUE_URL, "https://sqs.example/queue"),
            (DEFAULT_VOTER_VAR, "count"),
        ]))
        .expect_err("tally key cannot be the default voter");

        assert!(error.to_string().contains("DEFAULT_VOTER has invalid value 'count'"));
    }

    #[test]
    fn processor_defaults_to_sns_envelope_without_deduplication() {
        let config = ProcessorConfig::from_lookup(lookup_from(&[])).expect("defaults load");

        assert_eq!(
            config,
            ProcessorConfig {
                table_name: "Votes".to_string(),
                envelope: EnvelopeMode::Sns,
                deduplicate: false,
                partial_batch_response: false,
                marker_ttl_hours: 24,
            }
        );
    }

    #[test]
    fn processor_parses_flags_and_envelope() {
        let config = ProcessorConfig::from_lookup(lookup_from(&[
            (VOTES_TABLE, "votes-prod"),
            (VOTE_ENVELOPE, "raw"),
            (VOTE_DEDUPLICATE, "TRUE"),
            (VOTE_PARTIAL_BATCH_RESPONSE, "1"),
            (VOTE_MARKER_TTL_HOURS, "48"),
        ]))
        .expect("config should load");

        assert_eq!(config.table_name, "votes-prod");
        assert_eq!(config.envelope, EnvelopeMode::Raw);
        assert!(config.deduplicate);
        assert!(config.partial_batch_response);
        assert_eq!(config.marker_ttl_hours, 48);
    }

    #[test]
    fn processor_rejects_unknown_flag_values() {
        let error = ProcessorConfig::from_lookup(lookup_from(&[(VOTE_DEDUPLICATE, "maybe")]))
            .expect_err("flag should fail");
        assert!(matches!(
            error,
            ConfigError::InvalidValue { name: VOTE_DEDUPLICATE, .. }
        ));

        let error = ProcessorConfig::from_lookup(lookup_from(&[(VOTE_MARKER_TTL_HOURS, "0")]))
            .expect_err("zero ttl should fail");
        assert!(error.to_string().contains("must be a positive integer"));
    }

    #[test]
    fn results_uses_table_override() {
        let config =
            ResultsConfig::from_lookup(lookup_from(&[(VOTES_TABLE, "votes-staging")])).unwrap();
        assert_eq!(config.table_name, "votes-staging");
    }
}
