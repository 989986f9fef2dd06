//! Single-function deployment of the whole pipeline.
//!
//! One Lambda behind both the gateway route and the queue trigger: SQS
//! batches go to the processor, `GET` to the results reader, other requests
//! to the intake handler.

use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use vote_pipeline_lambda::adapters::bus::VoteBus;
use vote_pipeline_lambda::adapters::clients::AwsClients;
use vote_pipeline_lambda::adapters::dynamodb::DynamoVoteStore;
use vote_pipeline_lambda::config::{IntakeConfig, ProcessorConfig};
use vote_pipeline_lambda::handlers::intake::handle_submit_event;
use vote_pipeline_lambda::handlers::processor::handle_vote_batch;
use vote_pipeline_lambda::handlers::results::handle_results_request;
use vote_pipeline_lambda::handlers::router::{route_event, Route};
use vote_pipeline_lambda::logging;

struct RuntimeDependencies {
    intake: IntakeConfig,
    processor: ProcessorConfig,
    bus: Box<dyn VoteBus + Send + Sync>,
    store: DynamoVoteStore,
}

impl RuntimeDependencies {
    async fn load() -> Result<Self, Error> {
        let intake = IntakeConfig::from_env()?;
        let processor = ProcessorConfig::from_env()?;
        let clients = AwsClients::load().await;
        Ok(Self {
            bus: clients.vote_bus(&intake.bus),
            store: clients.vote_store(&processor.table_name, processor.marker_ttl_hours),
            intake,
            processor,
        })
    }
}

async fn handle_request(
    event: LambdaEvent<Value>,
    deps: &RuntimeDependencies,
) -> Result<Value, Error> {
    let response = match route_event(&event.payload) {
        Route::VoteBatch => {
            serde_json::to_value(handle_vote_batch(&event.payload, &deps.processor, &deps.store)?)
        }
        Route::Results => serde_json::to_value(handle_results_request(&deps.store)),
        Route::Submit => serde_json::to_value(handle_submit_event(
            event.payload,
            &deps.intake,
            deps.bus.as_ref(),
        )),
    };
    response.map_err(|error| Error::from(format!("failed to serialize response: {error}")))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    logging::init("vote_runtime");

    let deps = RuntimeDependencies::load().await?;
    let deps = &deps;
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handle_request(event, deps).await
    }))
    .await
}
