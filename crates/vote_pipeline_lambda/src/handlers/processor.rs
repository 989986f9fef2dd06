use serde::{Deserialize, Serialize};
use serde_json::Value;
use vote_pipeline_core::contract::{Ballot, DecodeError, VoteEvent};
use vote_pipeline_core::envelope::{decode_record_body, decode_sqs_batch, QueueRecord};

use crate::adapters::store::{StoreError, TallyUpdate, VoteStore};
use crate::config::ProcessorConfig;

const COMPONENT: &str = "vote_processor";

/// SQS partial batch response. Empty when every record succeeded.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchResponse {
    #[serde(rename = "batchItemFailures")]
    pub batch_item_failures: Vec<BatchItemFailure>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchItemFailure {
    #[serde(rename = "itemIdentifier")]
    pub item_identifier: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    #[error("invalid SQS batch: {0}")]
    Batch(#[source] DecodeError),
    #[error("failed to decode message {message_id}: {source}")]
    Decode {
        message_id: String,
        #[source]
        source: DecodeError,
    },
    #[error("failed to persist message {message_id}: {source}")]
    Store {
        message_id: String,
        #[source]
        source: StoreError,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct BatchSummary {
    applied: usize,
    duplicates: usize,
    failed: usize,
}

/// Applies a batch of queued vote events.
///
/// Records are processed one at a time, in delivery order: decode, store the
/// ballot, then update the tally. Without partial batch responses the first
/// failure aborts the invocation and the queue redelivers the whole batch;
/// with them, failed records are reported by message id and the rest proceed.
pub fn handle_vote_batch(
    event: &Value,
    config: &ProcessorConfig,
    store: &dyn VoteStore,
) -> Result<BatchResponse, ProcessorError> {
    let records = decode_sqs_batch(event).map_err(ProcessorError::Batch)?;

    let mut summary = BatchSummary::default();
    let mut response = BatchResponse::default();
    for record in &records {
        match process_record(record, config, store) {
            Ok(TallyUpdate::Applied) => summary.applied += 1,
            Ok(TallyUpdate::AlreadyApplied) => summary.duplicates += 1,
            Err(error) if config.partial_batch_response => {
                tracing::error!(
                    component = COMPONENT,
                    event = "record_failed",
                    message_id = %record.message_id,
                    error = %error,
                );
                summary.failed += 1;
                response.batch_item_failures.push(BatchItemFailure {
                    item_identifier: record.message_id.clone(),
                });
            }
            Err(error) => return Err(error),
        }
    }

    tracing::info!(
        component = COMPONENT,
        event = "batch_completed",
        records = records.len(),
        applied = summary.applied,
        duplicates = summary.duplicates,
        failed = summary.failed,
    );
    Ok(response)
}

pub fn process_record(
    record: &QueueRecord,
    config: &ProcessorConfig,
    store: &dyn VoteStore,
) -> Result<TallyUpdate, ProcessorError> {
    let vote_event = decode_record_body(&record.body, config.envelope).map_err(|source| {
        ProcessorError::Decode {
            message_id: record.message_id.clone(),
            source,
        }
    })?;
    tracing::info!(
        component = COMPONENT,
        event = "record_decoded",
        message_id = %record.message_id,
        voter = %vote_event.voter,
        vote = %vote_event.vote,
    );

    let idempotency_key = config
        .deduplicate
        .then(|| idempotency_key_for(&vote_event, record));
    apply_vote_event(&vote_event, idempotency_key, store).map_err(|source| {
        ProcessorError::Store {
            message_id: record.message_id.clone(),
            source,
        }
    })
}

/// Stores the ballot, then updates the tally. The two writes are sequential.
pub fn apply_vote_event(
    vote_event: &VoteEvent,
    idempotency_key: Option<&str>,
    store: &dyn VoteStore,
) -> Result<TallyUpdate, StoreError> {
    store_vote(store, &vote_event.ballot())?;
    update_tally(store, &vote_event.vote, idempotency_key)
}

pub fn store_vote(store: &dyn VoteStore, ballot: &Ballot) -> Result<(), StoreError> {
    store.put_vote(ballot).map_err(|error| {
        tracing::error!(
            component = COMPONENT,
            event = "store_vote_failed",
            voter = %ballot.voter,
            error = %error,
        );
        error
    })
}

pub fn update_tally(
    store: &dyn VoteStore,
    vote: &str,
    idempotency_key: Option<&str>,
) -> Result<TallyUpdate, StoreError> {
    let update = match idempotency_key {
        Some(key) => store.increment_tally_once(vote, key)?,
        None => {
            store.increment_tally(vote)?;
            TallyUpdate::Applied
        }
    };

    match update {
        TallyUpdate::Applied => {
            tracing::info!(component = COMPONENT, event = "tally_incremented", vote);
        }
        TallyUpdate::AlreadyApplied => {
            tracing::info!(
                component = COMPONENT,
                event = "tally_duplicate_skipped",
                vote,
                idempotency_key = idempotency_key.unwrap_or_default(),
            );
        }
    }
    Ok(update)
}

// Events published by the intake handler carry their own id; anything else is
// keyed by the queue message id, which is stable across SQS redeliveries.
fn idempotency_key_for<'a>(vote_event: &'a VoteEvent, record: &'a QueueRecord) -> &'a str {
    vote_event
        .event_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .unwrap_or(&record.message_id)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use vote_pipeline_core::contract::Tally;
    use vote_pipeline_core::envelope::EnvelopeMode;

    use super::*;
    use crate::test_helpers::{sqs_batch, sqs_record, InMemoryVoteStore};

    fn raw_config() -> ProcessorConfig {
        ProcessorConfig {
            table_name: "Votes".to_string(),
            envelope: EnvelopeMode::Raw,
            deduplicate: false,
            partial_batch_response: false,
            marker_ttl_hours: 24,
        }
    }

    #[test]
    fn stores_ballot_and_increments_tally() {
        let store = InMemoryVoteStore::new();
        let batch = sqs_batch(vec![sqs_record("m-1", r#"{"voter":"alice","vote":"yes"}"#)]);

        let response = handle_vote_batch(&batch, &raw_config(), &store).expect("batch applies");

        assert!(response.batch_item_failures.is_empty());
        assert_eq!(store.ballot("alice"), Some("yes".to_string()));
        assert_eq!(store.tally(), Tally::from([("yes".to_string(), 1)]));
    }

    #[test]
    fn unwraps_sns_envelope_by_default_config() {
        let store = InMemoryVoteStore::new();
        let config = ProcessorConfig {
            envelope: EnvelopeMode::Sns,
            ..raw_config()
        };
        let body = json!({
            "Type": "Notification",
            "Message": "{\"voter\":\"default_voter\",\"vote\":\"no\"}"
        })
        .to_string();

        handle_vote_batch(&sqs_batch(vec![sqs_record("m-1", &body)]), &config, &store)
            .expect("batch applies");

        assert_eq!(store.ballot("default_voter"), Some("no".to_string()));
        assert_eq!(store.tally()["no"], 1);
    }

    #[test]
    fn decode_failure_skips_store_and_tally() {
        let store = InMemoryVoteStore::new();
        let batch = sqs_batch(vec![sqs_record("m-1", r#"{"voter":"alice"}"#)]);

        let error = handle_vote_batch(&batch, &raw_config(), &store).expect_err("decode fails");

        assert!(matches!(error, ProcessorError::Decode { ref message_id, .. } if message_id == "m-1"));
        assert_eq!(store.put_calls(), 0);
        assert_eq!(store.increment_calls(), 0);
    }

    #[test]
    fn store_failure_propagates_and_skips_tally() {
        let store = InMemoryVoteStore::new();
        store.fail_puts_for("alice");
        let batch = sqs_batch(vec![sqs_record("m-1", r#"{"voter":"alice","vote":"yes"}"#)]);

        let error = handle_vote_batch(&batch, &raw_config(), &store).expect_err("store fails");

        assert!(matches!(error, ProcessorError::Store { .. }));
        assert!(store.tally().is_empty());
    }

    #[test]
    fn first_failure_aborts_remaining_records() {
        let store = InMemoryVoteStore::new();
        let batch = sqs_batch(vec![
            sqs_record("m-1", r#"{"voter":"alice","vote":"yes"}"#),
            sqs_record("m-2", "not json"),
            sqs_record("m-3", r#"{"voter":"bob","vote":"no"}"#),
        ]);

        handle_vote_batch(&batch, &raw_config(), &store).expect_err("second record fails");

        assert_eq!(store.ballot("alice"), Some("yes".to_string()));
        assert_eq!(store.ballot("bob"), None);
    }

    #[test]
    fn partial_batch_response_reports_only_failed_records() {
        let store = InMemoryVoteStore::new();
        let config = ProcessorConfig {
            partial_batch_response: true,
            ..raw_config()
        };
        let batch = sqs_batch(vec![
            sqs_record("m-1", r#"{"voter":"alice","vote":"yes"}"#),
            sqs_record("m-2", "not json"),
            sqs_record("m-3", r#"{"voter":"bob","vote":"yes"}"#),
        ]);

        let response = handle_vote_batch(&batch, &config, &store).expect("batch completes");

        assert_eq!(
            response.batch_item_failures,
            vec![BatchItemFailure {
                item_identifier: "m-2".to_string()
            }]
        );
        assert_eq!(store.tally()["yes"], 2);
    }

    #[test]
    fn redelivery_without_deduplication_counts_twice() {
        let store = InMemoryVoteStore::new();
        let record = sqs_record("m-1", r#"{"voter":"alice","vote":"yes","event_id":"e-1"}"#);

        handle_vote_batch(&sqs_batch(vec![record.clone()]), &raw_config(), &store)
            .expect("first delivery");
        handle_vote_batch(&sqs_batch(vec![record]), &raw_config(), &store)
            .expect("redelivery");

        assert_eq!(store.tally()["yes"], 2);
        assert_eq!(store.ballot("alice"), Some("yes".to_string()));
        assert_eq!(store.ballot_count(), 1);
    }

    #[test]
    fn redelivery_with_deduplication_counts_once() {
        let store = InMemoryVoteStore::new();
        let config = ProcessorConfig {
            deduplicate: true,
            ..raw_config()
        };
        let record = sqs_record("m-1", r#"{"voter":"alice","vote":"yes","event_id":"e-1"}"#);

        handle_vote_batch(&sqs_batch(vec![record.clone()]), &config, &store)
            .expect("first delivery");
        handle_vote_batch(&sqs_batch(vec![record]), &config, &store).expect("redelivery");

        assert_eq!(store.tally()["yes"], 1);
    }

    #[test]
    fn deduplication_falls_back_to_message_id() {
        let store = InMemoryVoteStore::new();
        let config = ProcessorConfig {
            deduplicate: true,
            ..raw_config()
        };
        let batch = sqs_batch(vec![
            sqs_record("m-1", r#"{"voter":"alice","vote":"yes"}"#),
            sqs_record("m-1", r#"{"voter":"alice","vote":"yes"}"#),
            sqs_record("m-2", r#"{"voter":"bob","vote":"yes"}"#),
        ]);

        handle_vote_batch(&batch, &config, &store).expect("batch applies");

        assert_eq!(store.tally()["yes"], 2);
    }

    #[test]
    fn rejects_batch_without_records() {
        let store = InMemoryVoteStore::new();
        let error =
            handle_vote_batch(&json!({"vote": "yes"}), &raw_config(), &store).expect_err("no batch");
        assert!(matches!(error, ProcessorError::Batch(_)));
    }
}
