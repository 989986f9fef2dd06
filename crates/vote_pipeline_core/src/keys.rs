//! Partition keys of the votes table.
//!
//! Ballot rows, the tally row and idempotency markers share one table keyed by
//! `voter`. Ballot validation keeps voters out of the reserved namespaces.

use crate::contract::{EVENT_MARKER_PREFIX, TALLY_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Ballot,
    Tally,
    EventMarker,
}

impl RowKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ballot => "ballot",
            Self::Tally => "tally",
            Self::EventMarker => "event_marker",
        }
    }
}

pub fn tally_key() -> &'static str {
    TALLY_KEY
}

pub fn ballot_key(voter: &str) -> &str {
    voter
}

pub fn event_marker_key(idempotency_key: &str) -> String {
    format!("{EVENT_MARKER_PREFIX}{}", idempotency_key.trim())
}

pub fn classify_key(key: &str) -> RowKind {
    if key == TALLY_KEY {
        RowKind::Tally
    } else if key.starts_with(EVENT_MARKER_PREFIX) {
        RowKind::EventMarker
    } else {
        RowKind::Ballot
    }
}
