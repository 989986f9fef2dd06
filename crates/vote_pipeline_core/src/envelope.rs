//! Decoding of queue deliveries into vote events.
//!
//! The event itself has one canonical shape (see [`crate::contract::VoteEvent`]).
//! What varies is the transport framing around it: a topic-to-queue
//! subscription without raw delivery wraps the event in an SNS notification,
//! while raw delivery and direct queue publishing carry it as the body itself.
//! The framing is configured, never sniffed.

use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;

use crate::contract::{decode_vote_event, DecodeError, VoteEvent};

pub const SQS_EVENT_SOURCE: &str = "aws:sqs";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnvelopeMode {
    #[default]
    Sns,
    Raw,
}

impl FromStr for EnvelopeMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sns" => Ok(Self::Sns),
            "raw" => Ok(Self::Raw),
            other => Err(format!(
                "Unsupported envelope mode '{other}' (expected sns or raw)"
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SnsNotification {
    #[serde(rename = "Message")]
    message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueRecord {
    pub message_id: String,
    pub body: String,
}

pub fn decode_record_body(body: &str, mode: EnvelopeMode) -> Result<VoteEvent, DecodeError> {
    match mode {
        EnvelopeMode::Raw => decode_vote_event(body),
        EnvelopeMode::Sns => {
            let notification: SnsNotification = serde_json::from_str(body).map_err(|error| {
                DecodeError::Envelope(format!("invalid SNS notification envelope: {error}"))
            })?;
            decode_vote_event(&notification.message)
        }
    }
}

pub fn is_sqs_batch(event: &Value) -> bool {
    event
        .get("Records")
        .and_then(Value::as_array)
        .map(|records| {
            !records.is_empty()
                && records.iter().all(|record| {
                    record
                        .get("eventSource")
                        .and_then(Value::as_str)
                        .map(|source| source == SQS_EVENT_SOURCE)
                        .unwrap_or(false)
                })
        })
        .unwrap_or(false)
}

/// Splits an SQS batch into records without decoding their bodies.
///
/// Bodies are decoded one at a time by the processor so that a single bad
/// message can be reported on its own.
pub fn decode_sqs_batch(event: &Value) -> Result<Vec<QueueRecord>, DecodeError> {
    let records = event
        .get("Records")
        .and_then(Value::as_array)
        .ok_or_else(|| DecodeError::Envelope("SQS event must include Records array".to_string()))?;

    let mut decoded = Vec::with_capacity(records.len());
    for record in records {
        let message_id = record
            .get("messageId")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                DecodeError::Envelope("SQS record messageId must be a string".to_string())
            })?;
        let body = record
            .get("body")
            .and_then(Value::as_str)
            .ok_or_else(|| DecodeError::Envelope("SQS record body must be a string".to_string()))?;
        decoded.push(QueueRecord {
            message_id: message_id.to_string(),
            body: body.to_string(),
        });
    }

    Ok(decoded)
}
