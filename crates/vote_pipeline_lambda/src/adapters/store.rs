use vote_pipeline_core::contract::{Ballot, Tally};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to store vote for voter '{voter}': {message}")]
    PutVote { voter: String, message: String },
    #[error("failed to increment tally for '{vote}': {message}")]
    IncrementTally { vote: String, message: String },
    #[error("failed to read tally: {0}")]
    ReadTally(String),
    #[error("tally attribute '{attribute}' is not a non-negative integer")]
    CorruptTally { attribute: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TallyUpdate {
    Applied,
    AlreadyApplied,
}

/// Key-value persistence for ballots and the tally row.
///
/// Increments must use the store's own atomic counter primitive and create
/// the option's attribute when it is absent. Concurrent invocations rely on
/// that primitive; nothing here takes a lock.
pub trait VoteStore {
    /// Unconditional upsert of the ballot row keyed by voter.
    fn put_vote(&self, ballot: &Ballot) -> Result<(), StoreError>;

    fn increment_tally(&self, vote: &str) -> Result<(), StoreError>;

    /// Increments at most once per idempotency key.
    ///
    /// The marker row and the increment are written in one transaction, so a
    /// redelivered event either finds the marker and skips or applies both.
    fn increment_tally_once(
        &self,
        vote: &str,
        idempotency_key: &str,
    ) -> Result<TallyUpdate, StoreError>;

    fn read_tally(&self) -> Result<Tally, StoreError>;
}
