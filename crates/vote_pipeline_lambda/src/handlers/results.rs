use serde_json::json;
use vote_pipeline_core::contract::{StatusResponse, TallyResponse, STATUS_SUCCESS};

use crate::adapters::store::VoteStore;
use crate::handlers::http::{json_response, status_response, ApiGatewayResponse};

const COMPONENT: &str = "vote_results";

/// Read side of `/my-vote`: the current tally row, one count per option.
///
/// Counts are eventually consistent with accepted submissions.
pub fn handle_results_request(store: &dyn VoteStore) -> ApiGatewayResponse {
    match store.read_tally() {
        Ok(tally) => {
            tracing::info!(
                component = COMPONENT,
                event = "tally_read",
                options = tally.len(),
            );
            json_response(
                200,
                json!(TallyResponse {
                    status: STATUS_SUCCESS.to_string(),
                    tally,
                }),
            )
        }
        Err(error) => {
            tracing::error!(component = COMPONENT, event = "tally_read_failed", error = %error);
            status_response(500, &StatusResponse::error())
        }
    }
}
