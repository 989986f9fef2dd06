use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use vote_pipeline_lambda::adapters::clients::AwsClients;
use vote_pipeline_lambda::adapters::dynamodb::DynamoVoteStore;
use vote_pipeline_lambda::config::{ResultsConfig, DEFAULT_MARKER_TTL_HOURS};
use vote_pipeline_lambda::handlers::http::ApiGatewayResponse;
use vote_pipeline_lambda::handlers::results::handle_results_request;
use vote_pipeline_lambda::logging;

async fn handle_request(
    _event: LambdaEvent<Value>,
    store: &DynamoVoteStore,
) -> Result<ApiGatewayResponse, Error> {
    Ok(handle_results_request(store))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    logging::init("vote_results");

    let config = ResultsConfig::from_env()?;
    let clients = AwsClients::load().await;
    let store = clients.vote_store(&config.table_name, DEFAULT_MARKER_TTL_HOURS);

    let store = &store;
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handle_request(event, store).await
    }))
    .await
}
