use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const DEFAULT_VOTER: &str = "default_voter";
pub const TALLY_KEY: &str = "count";
pub const EVENT_MARKER_PREFIX: &str = "event#";
pub const VOTER_ATTRIBUTE: &str = "voter";
pub const VOTE_ATTRIBUTE: &str = "vote";
pub const MAX_VOTE_LENGTH: usize = 255;

pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_ERROR: &str = "error";

pub type Tally = BTreeMap<String, u64>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ballot {
    pub voter: String,
    pub vote: String,
}

impl Ballot {
    pub fn new(voter: impl Into<String>, vote: impl Into<String>) -> Self {
        Self {
            voter: voter.into(),
            vote: vote.into(),
        }
    }
}

/// Message carried over the bus from the intake handler to the processor.
///
/// The canonical wire shape is the JSON object `{"voter": ..., "vote": ...}`.
/// `event_id` and `submitted_at` are optional and omitted when absent, so a
/// bare two-field body decodes as well.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoteEvent {
    pub voter: String,
    pub vote: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<String>,
}

impl VoteEvent {
    pub fn from_ballot(
        ballot: Ballot,
        event_id: Option<String>,
        submitted_at: Option<String>,
    ) -> Self {
        Self {
            voter: ballot.voter,
            vote: ballot.vote,
            event_id,
            submitted_at,
        }
    }

    pub fn ballot(&self) -> Ballot {
        Ballot::new(self.voter.clone(), self.vote.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmitVoteRequest {
    pub vote: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusResponse {
    pub fn success() -> Self {
        Self {
            status: STATUS_SUCCESS.to_string(),
            message: None,
        }
    }

    pub fn error() -> Self {
        Self {
            status: STATUS_ERROR.to_string(),
            message: None,
        }
    }

    pub fn error_with_message(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_ERROR.to_string(),
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TallyResponse {
    pub status: String,
    pub tally: Tally,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("vote cannot be empty")]
    EmptyVote,
    #[error("vote exceeds {} bytes", MAX_VOTE_LENGTH)]
    VoteTooLong,
    #[error("vote '{0}' is a reserved attribute name")]
    ReservedVote(String),
    #[error("voter cannot be empty")]
    EmptyVoter,
    #[error("voter '{0}' is reserved")]
    ReservedVoter(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed vote event: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("invalid vote event: {0}")]
    Invalid(#[from] ValidationError),
    #[error("{0}")]
    Envelope(String),
}

pub fn validate_ballot(ballot: &Ballot) -> Result<(), ValidationError> {
    let vote = ballot.vote.trim();
    if vote.is_empty() {
        return Err(ValidationError::EmptyVote);
    }
    if ballot.vote.len() > MAX_VOTE_LENGTH {
        return Err(ValidationError::VoteTooLong);
    }
    // The tally row stores one attribute per option next to its key attribute.
    if ballot.vote == VOTER_ATTRIBUTE {
        return Err(ValidationError::ReservedVote(ballot.vote.clone()));
    }

    validate_voter(&ballot.voter)
}

pub fn validate_voter(voter: &str) -> Result<(), ValidationError> {
    if voter.trim().is_empty() {
        return Err(ValidationError::EmptyVoter);
    }
    if voter == TALLY_KEY || voter.starts_with(EVENT_MARKER_PREFIX) {
        return Err(ValidationError::ReservedVoter(voter.to_string()));
    }
    Ok(())
}

pub fn encode_vote_event(event: &VoteEvent) -> Result<String, serde_json::Error> {
    serde_json::to_string(event)
}

pub fn decode_vote_event(payload: &str) -> Result<VoteEvent, DecodeError> {
    let event: VoteEvent = serde_json::from_str(payload)?;
    validate_ballot(&event.ballot())?;
    Ok(event)
}
