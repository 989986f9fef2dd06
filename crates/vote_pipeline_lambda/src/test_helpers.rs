//! Test helpers for handler and pipeline tests.
//!
//! In-memory stand-ins for the bus and the store, plus builders for SQS and
//! SNS event shapes. The in-memory store honours the same contract as the
//! DynamoDB one: increments are atomic and create missing options at zero.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use serde_json::{json, Value};
use vote_pipeline_core::contract::{encode_vote_event, Ballot, Tally, VoteEvent};
use vote_pipeline_core::keys::{ballot_key, classify_key, event_marker_key, RowKind};

use crate::adapters::bus::{BusError, VoteBus};
use crate::adapters::store::{StoreError, TallyUpdate, VoteStore};

#[derive(Debug, Default)]
struct TableState {
    ballots: HashMap<String, String>,
    tally: Tally,
    markers: HashSet<String>,
}

/// Votes table held in memory. One mutex guards the whole table, which makes
/// every increment atomic the way a conditional write is in DynamoDB.
#[derive(Debug, Default)]
pub struct InMemoryVoteStore {
    state: Mutex<TableState>,
    put_calls: AtomicUsize,
    increment_calls: AtomicUsize,
    failing_voters: Mutex<HashSet<String>>,
    fail_reads: AtomicBool,
}

impl InMemoryVoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later `put_vote` for `voter` fail.
    pub fn fail_puts_for(&self, voter: &str) {
        self.failing_voters
            .lock()
            .expect("poisoned mutex")
            .insert(voter.to_string());
    }

    pub fn fail_reads(&self) {
        self.fail_reads.store(true, Ordering::SeqCst);
    }

    pub fn ballot(&self, voter: &str) -> Option<String> {
        self.state().ballots.get(voter).cloned()
    }

    pub fn ballot_count(&self) -> usize {
        self.state().ballots.len()
    }

    pub fn tally(&self) -> Tally {
        self.state().tally.clone()
    }

    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    pub fn increment_calls(&self) -> usize {
        self.increment_calls.load(Ordering::SeqCst)
    }

    fn state(&self) -> MutexGuard<'_, TableState> {
        self.state.lock().expect("poisoned mutex")
    }
}

impl VoteStore for InMemoryVoteStore {
    fn put_vote(&self, ballot: &Ballot) -> Result<(), StoreError> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);

        let key = ballot_key(&ballot.voter);
        let refused = self
            .failing_voters
            .lock()
            .expect("poisoned mutex")
            .contains(key);
        let kind = classify_key(key);
        if refused || kind != RowKind::Ballot {
            return Err(StoreError::PutVote {
                voter: ballot.voter.clone(),
                message: format!("write to {} row refused by in-memory store", kind.as_str()),
            });
        }

        self.state()
            .ballots
            .insert(key.to_string(), ballot.vote.clone());
        Ok(())
    }

    fn increment_tally(&self, vote: &str) -> Result<(), StoreError> {
        self.increment_calls.fetch_add(1, Ordering::SeqCst);
        *self.state().tally.entry(vote.to_string()).or_insert(0) += 1;
        Ok(())
    }

    fn increment_tally_once(
        &self,
        vote: &str,
        idempotency_key: &str,
    ) -> Result<TallyUpdate, StoreError> {
        self.increment_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state();
        if !state.markers.insert(event_marker_key(idempotency_key)) {
            return Ok(TallyUpdate::AlreadyApplied);
        }
        *state.tally.entry(vote.to_string()).or_insert(0) += 1;
        Ok(TallyUpdate::Applied)
    }

    fn read_tally(&self) -> Result<Tally, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::ReadTally(
                "read refused by in-memory store".to_string(),
            ));
        }
        Ok(self.tally())
    }
}

/// Bus that keeps every published event.
#[derive(Debug, Default)]
pub struct RecordingVoteBus {
    events: Mutex<Vec<VoteEvent>>,
}

impl RecordingVoteBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<VoteEvent> {
        self.events.lock().expect("poisoned mutex").clone()
    }

    /// Drains published events as SNS-wrapped SQS records, the way a
    /// topic-subscribed queue would deliver them.
    pub fn drain_as_sqs_batch(&self) -> Value {
        let events = std::mem::take(&mut *self.events.lock().expect("poisoned mutex"));
        let records = events
            .iter()
            .enumerate()
            .map(|(index, event)| {
                let message = encode_vote_event(event).expect("vote event should encode");
                sqs_record(&format!("msg-{index}"), &sns_notification(&message))
            })
            .collect();
        sqs_batch(records)
    }
}

impl VoteBus for RecordingVoteBus {
    fn publish(&self, event: &VoteEvent) -> Result<(), BusError> {
        self.events
            .lock()
            .expect("poisoned mutex")
            .push(event.clone());
        Ok(())
    }
}

/// Bus whose every publish fails after being counted.
#[derive(Debug)]
pub struct FailingVoteBus {
    message: String,
    attempts: AtomicUsize,
}

impl FailingVoteBus {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl VoteBus for FailingVoteBus {
    fn publish(&self, _event: &VoteEvent) -> Result<(), BusError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(BusError::Topic(self.message.clone()))
    }
}

pub fn sqs_record(message_id: &str, body: &str) -> Value {
    json!({
        "messageId": message_id,
        "eventSource": "aws:sqs",
        "eventSourceARN": "arn:aws:sqs:eu-central-1:000000000000:my-vote-queue",
        "body": body,
    })
}

pub fn sqs_batch(records: Vec<Value>) -> Value {
    json!({ "Records": records })
}

pub fn sns_notification(message: &str) -> String {
    json!({
        "Type": "Notification",
        "MessageId": "00000000-0000-0000-0000-000000000000",
        "TopicArn": "arn:aws:sns:eu-central-1:000000000000:my-vote",
        "Message": message,
    })
    .to_string()
}
