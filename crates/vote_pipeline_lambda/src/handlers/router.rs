use serde_json::Value;
use vote_pipeline_core::envelope::is_sqs_batch;

use crate::handlers::http::http_method;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    VoteBatch,
    Results,
    Submit,
}

/// Chooses the handler for an event reaching the combined runtime.
///
/// Queue batches go to the processor, `GET` to the results reader, and
/// everything else is treated as a vote submission.
pub fn route_event(event: &Value) -> Route {
    if is_sqs_batch(event) {
        return Route::VoteBatch;
    }

    match http_method(event) {
        Some(method) if method.eq_ignore_ascii_case("GET") => Route::Results,
        _ => Route::Submit,
    }
}
