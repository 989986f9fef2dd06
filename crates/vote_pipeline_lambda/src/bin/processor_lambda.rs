use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use vote_pipeline_lambda::adapters::clients::AwsClients;
use vote_pipeline_lambda::adapters::dynamodb::DynamoVoteStore;
use vote_pipeline_lambda::config::ProcessorConfig;
use vote_pipeline_lambda::handlers::processor::{handle_vote_batch, BatchResponse};
use vote_pipeline_lambda::logging;

async fn handle_request(
    event: LambdaEvent<Value>,
    config: &ProcessorConfig,
    store: &DynamoVoteStore,
) -> Result<BatchResponse, Error> {
    Ok(handle_vote_batch(&event.payload, config, store)?)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    logging::init("vote_processor");

    let config = ProcessorConfig::from_env()?;
    let clients = AwsClients::load().await;
    let store = clients.vote_store(&config.table_name, config.marker_ttl_hours);

    let config = &config;
    let store = &store;
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handle_request(event, config, store).await
    }))
    .await
}
