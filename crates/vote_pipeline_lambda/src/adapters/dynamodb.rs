use std::collections::HashMap;

use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::operation::transact_write_items::TransactWriteItemsError;
use aws_sdk_dynamodb::types::{AttributeValue, Put, TransactWriteItem, Update};
use chrono::Utc;
use vote_pipeline_core::contract::{Ballot, Tally, VOTER_ATTRIBUTE, VOTE_ATTRIBUTE};
use vote_pipeline_core::keys::{ballot_key, event_marker_key, tally_key};

use crate::adapters::store::{StoreError, TallyUpdate, VoteStore};

const INCREMENT_EXPRESSION: &str = "ADD #vote :incr";
const MARKER_ABSENT_CONDITION: &str = "attribute_not_exists(#key)";
const CONDITIONAL_CHECK_FAILED: &str = "ConditionalCheckFailed";

/// Votes table backed by DynamoDB.
///
/// `ADD` on a number attribute is DynamoDB's atomic counter and treats a
/// missing attribute as zero, so the first vote for an option takes the same
/// path as every later one.
pub struct DynamoVoteStore {
    pub table_name: String,
    pub dynamodb_client: aws_sdk_dynamodb::Client,
    pub marker_ttl_hours: u32,
}

impl DynamoVoteStore {
    fn tally_update(&self, vote: &str) -> Result<Update, StoreError> {
        Update::builder()
            .table_name(&self.table_name)
            .key(VOTER_ATTRIBUTE, AttributeValue::S(tally_key().to_string()))
            .update_expression(INCREMENT_EXPRESSION)
            .expression_attribute_names("#vote", vote)
            .expression_attribute_values(":incr", AttributeValue::N("1".to_string()))
            .build()
            .map_err(|error| StoreError::IncrementTally {
                vote: vote.to_string(),
                message: error.to_string(),
            })
    }

    fn marker_put(&self, vote: &str, idempotency_key: &str) -> Result<Put, StoreError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::hours(i64::from(self.marker_ttl_hours));
        Put::builder()
            .table_name(&self.table_name)
            .item(
                VOTER_ATTRIBUTE,
                AttributeValue::S(event_marker_key(idempotency_key)),
            )
            .item(VOTE_ATTRIBUTE, AttributeValue::S(vote.to_string()))
            .item("processed_at", AttributeValue::S(now.to_rfc3339()))
            .item(
                "expires_at",
                AttributeValue::N(expires_at.timestamp().to_string()),
            )
            .condition_expression(MARKER_ABSENT_CONDITION)
            .expression_attribute_names("#key", VOTER_ATTRIBUTE)
            .build()
            .map_err(|error| StoreError::IncrementTally {
                vote: vote.to_string(),
                message: error.to_string(),
            })
    }
}

impl VoteStore for DynamoVoteStore {
    fn put_vote(&self, ballot: &Ballot) -> Result<(), StoreError> {
        let client = self.dynamodb_client.clone();
        let table_name = self.table_name.clone();
        let voter = ballot_key(&ballot.voter).to_string();
        let vote = ballot.vote.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .put_item()
                    .table_name(table_name)
                    .item(VOTER_ATTRIBUTE, AttributeValue::S(voter.clone()))
                    .item(VOTE_ATTRIBUTE, AttributeValue::S(vote))
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|error| StoreError::PutVote {
                        voter,
                        message: DisplayErrorContext(&error).to_string(),
                    })
            })
        })
    }

    fn increment_tally(&self, vote: &str) -> Result<(), StoreError> {
        let client = self.dynamodb_client.clone();
        let table_name = self.table_name.clone();
        let vote = vote.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .update_item()
                    .table_name(table_name)
                    .key(VOTER_ATTRIBUTE, AttributeValue::S(tally_key().to_string()))
                    .update_expression(INCREMENT_EXPRESSION)
                    .expression_attribute_names("#vote", vote.clone())
                    .expression_attribute_values(":incr", AttributeValue::N("1".to_string()))
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|error| StoreError::IncrementTally {
                        vote,
                        message: DisplayErrorContext(&error).to_string(),
                    })
            })
        })
    }

    fn increment_tally_once(
        &self,
        vote: &str,
        idempotency_key: &str,
    ) -> Result<TallyUpdate, StoreError> {
        let marker = TransactWriteItem::builder()
            .put(self.marker_put(vote, idempotency_key)?)
            .build();
        let increment = TransactWriteItem::builder()
            .update(self.tally_update(vote)?)
            .build();
        let client = self.dynamodb_client.clone();
        let vote = vote.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                match client
                    .transact_write_items()
                    .transact_items(marker)
                    .transact_items(increment)
                    .send()
                    .await
                {
                    Ok(_) => Ok(TallyUpdate::Applied),
                    Err(error) => {
                        if error
                            .as_service_error()
                            .map(is_marker_conflict)
                            .unwrap_or(false)
                        {
                            Ok(TallyUpdate::AlreadyApplied)
                        } else {
                            Err(StoreError::IncrementTally {
                                vote,
                                message: DisplayErrorContext(&error).to_string(),
                            })
                        }
                    }
                }
            })
        })
    }

    fn read_tally(&self) -> Result<Tally, StoreError> {
        let client = self.dynamodb_client.clone();
        let table_name = self.table_name.clone();

        let output = tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .get_item()
                    .table_name(table_name)
                    .key(VOTER_ATTRIBUTE, AttributeValue::S(tally_key().to_string()))
                    .consistent_read(true)
                    .send()
                    .await
                    .map_err(|error| StoreError::ReadTally(DisplayErrorContext(&error).to_string()))
            })
        })?;

        match output.item() {
            Some(item) => tally_from_item(item),
            None => Ok(Tally::new()),
        }
    }
}

// The marker put is the first item of the transaction; only its condition can fail.
fn is_marker_conflict(error: &TransactWriteItemsError) -> bool {
    match error {
        TransactWriteItemsError::TransactionCanceledException(cancelled) => cancelled
            .cancellation_reasons()
            .first()
            .and_then(|reason| reason.code())
            .map(|code| code == CONDITIONAL_CHECK_FAILED)
            .unwrap_or(false),
        _ => false,
    }
}

fn tally_from_item(item: &HashMap<String, AttributeValue>) -> Result<Tally, StoreError> {
    let mut tally = Tally::new();
    for (attribute, value) in item {
        if attribute == VOTER_ATTRIBUTE {
            continue;
        }
        let count = value
            .as_n()
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
            .ok_or_else(|| StoreError::CorruptTally {
                attribute: attribute.clone(),
            })?;
        tally.insert(attribute.clone(), count);
    }
    Ok(tally)
}
