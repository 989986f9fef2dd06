use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;
use vote_pipeline_core::contract::{
    validate_ballot, Ballot, StatusResponse, SubmitVoteRequest, VoteEvent,
};

use crate::adapters::bus::VoteBus;
use crate::config::IntakeConfig;
use crate::handlers::http::{normalize_apigw_event, status_response, ApiGatewayResponse};

const COMPONENT: &str = "vote_intake";

/// Authenticated principal locations, most specific first.
const PRINCIPAL_POINTERS: [&str; 4] = [
    "/requestContext/authorizer/claims/sub",
    "/requestContext/authorizer/jwt/claims/sub",
    "/requestContext/authorizer/principalId",
    "/requestContext/identity/cognitoIdentityId",
];

/// Accepts one ballot and publishes it as a vote event.
///
/// Exactly one publish is attempted per accepted request. Publish failures
/// turn into a 500; rejected input turns into a 400 and publishes nothing.
pub fn handle_submit_event(
    event: Value,
    config: &IntakeConfig,
    bus: &dyn VoteBus,
) -> ApiGatewayResponse {
    let voter = resolve_voter(&event, &config.default_voter);

    let payload = match normalize_apigw_event(event) {
        Ok(value) => value,
        Err(message) => return rejected(&message),
    };

    let request = match serde_json::from_value::<SubmitVoteRequest>(payload) {
        Ok(value) => value,
        Err(error) => return rejected(&format!("Malformed request: {error}")),
    };

    let ballot = Ballot::new(voter, request.vote);
    if let Err(error) = validate_ballot(&ballot) {
        return rejected(&error.to_string());
    }

    let vote_event = VoteEvent::from_ballot(
        ballot,
        Some(Uuid::new_v4().to_string()),
        Some(Utc::now().to_rfc3339()),
    );
    tracing::info!(
        component = COMPONENT,
        event = "vote_received",
        voter = %vote_event.voter,
        vote = %vote_event.vote,
        event_id = vote_event.event_id.as_deref().unwrap_or_default(),
    );

    if let Err(error) = bus.publish(&vote_event) {
        tracing::error!(
            component = COMPONENT,
            event = "publish_failed",
            voter = %vote_event.voter,
            error = %error,
        );
        return status_response(500, &StatusResponse::error());
    }

    tracing::info!(
        component = COMPONENT,
        event = "vote_published",
        event_id = vote_event.event_id.as_deref().unwrap_or_default(),
    );
    status_response(200, &StatusResponse::success())
}

/// Picks the caller identity from the request context, if the gateway
/// authenticated one, and falls back to the configured default voter.
pub fn resolve_voter(event: &Value, default_voter: &str) -> String {
    PRINCIPAL_POINTERS
        .iter()
        .filter_map(|pointer| event.pointer(pointer).and_then(Value::as_str))
        .map(str::trim)
        .find(|principal| !principal.is_empty())
        .unwrap_or(default_voter)
        .to_string()
}

fn rejected(message: &str) -> ApiGatewayResponse {
    tracing::warn!(component = COMPONENT, event = "vote_rejected", reason = message);
    status_response(400, &StatusResponse::error_with_message(message))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::BusTarget;
    use crate::test_helpers::{FailingVoteBus, RecordingVoteBus};

    fn sample_config() -> IntakeConfig {
        IntakeConfig {
            bus: BusTarget::Topic("arn:aws:sns:eu-central-1:000000000000:my-vote".to_string()),
            default_voter: "default_voter".to_string(),
        }
    }

    #[test]
    fn publishes_one_event_and_returns_success() {
        let bus = RecordingVoteBus::new();
        let response = handle_submit_event(
            json!({"httpMethod": "POST", "body": "{\"vote\":\"yes\"}"}),
            &sample_config(),
            &bus,
        );

        assert_eq!(response.status_code, 200);
        assert_eq!(response.body, r#"{"status":"success"}"#);

        let events = bus.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].voter, "default_voter");
        assert_eq!(events[0].vote, "yes");
        assert!(events[0].event_id.is_some());
        assert!(events[0].submitted_at.is_some());
    }

    #[test]
    fn publish_failure_returns_error_status() {
        let bus = FailingVoteBus::new("topic unavailable");
        let response = handle_submit_event(
            json!({"body": "{\"vote\":\"yes\"}"}),
            &sample_config(),
            &bus,
        );

        assert_eq!(response.status_code, 500);
        assert_eq!(response.body, r#"{"status":"error"}"#);
        assert_eq!(bus.attempts(), 1);
    }

    #[test]
    fn missing_vote_is_rejected_without_publishing() {
        let bus = RecordingVoteBus::new();
        let response =
            handle_submit_event(json!({"body": "{\"choice\":\"yes\"}"}), &sample_config(), &bus);

        assert_eq!(response.status_code, 400);
        let body = response.body_json().expect("body should be json");
        assert_eq!(body["status"], "error");
        assert!(body["message"]
            .as_str()
            .unwrap_or_default()
            .contains("missing field `vote`"));
        assert!(bus.events().is_empty());
    }

    #[test]
    fn malformed_body_is_rejected_without_publishing() {
        let bus = RecordingVoteBus::new();
        let response = handle_submit_event(json!({"body": "{vote"}), &sample_config(), &bus);

        assert_eq!(response.status_code, 400);
        assert!(bus.events().is_empty());
    }

    #[test]
    fn reserved_vote_option_is_rejected() {
        let bus = RecordingVoteBus::new();
        let response =
            handle_submit_event(json!({"body": {"vote": "voter"}}), &sample_config(), &bus);

        assert_eq!(response.status_code, 400);
        assert!(bus.events().is_empty());
    }

    #[test]
    fn authenticated_principal_replaces_default_voter() {
        let bus = RecordingVoteBus::new();
        let response = handle_submit_event(
            json!({
                "body": "{\"vote\":\"no\"}",
                "requestContext": {"authorizer": {"claims": {"sub": "user-42"}}}
            }),
            &sample_config(),
            &bus,
        );

        assert_eq!(response.status_code, 200);
        assert_eq!(bus.events()[0].voter, "user-42");
    }

    #[test]
    fn blank_principal_falls_back_to_next_source() {
        let event = json!({
            "requestContext": {
                "authorizer": {"claims": {"sub": " "}, "principalId": "lambda-principal"}
            }
        });
        assert_eq!(resolve_voter(&event, "default_voter"), "lambda-principal");
        assert_eq!(resolve_voter(&json!({}), "default_voter"), "default_voter");
    }
}
