use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use vote_pipeline_lambda::adapters::bus::VoteBus;
use vote_pipeline_lambda::adapters::clients::AwsClients;
use vote_pipeline_lambda::config::IntakeConfig;
use vote_pipeline_lambda::handlers::http::ApiGatewayResponse;
use vote_pipeline_lambda::handlers::intake::handle_submit_event;
use vote_pipeline_lambda::logging;

async fn handle_request(
    event: LambdaEvent<Value>,
    config: &IntakeConfig,
    bus: &(dyn VoteBus + Send + Sync),
) -> Result<ApiGatewayResponse, Error> {
    Ok(handle_submit_event(event.payload, config, bus))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    logging::init("vote_intake");

    let config = IntakeConfig::from_env()?;
    let clients = AwsClients::load().await;
    let bus = clients.vote_bus(&config.bus);

    let config = &config;
    let bus = bus.as_ref();
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handle_request(event, config, bus).await
    }))
    .await
}
