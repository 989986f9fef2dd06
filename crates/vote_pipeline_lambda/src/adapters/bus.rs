use aws_sdk_sns::error::DisplayErrorContext;
use vote_pipeline_core::contract::{encode_vote_event, VoteEvent};

#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("failed to encode vote event: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to publish vote event to topic: {0}")]
    Topic(String),
    #[error("failed to enqueue vote event: {0}")]
    Queue(String),
}

/// Outbound side of the message bus.
///
/// One call is one publish attempt; retries belong to the SDK client.
pub trait VoteBus {
    fn publish(&self, event: &VoteEvent) -> Result<(), BusError>;
}

pub struct SnsVoteBus {
    pub topic_arn: String,
    pub sns_client: aws_sdk_sns::Client,
}

impl VoteBus for SnsVoteBus {
    fn publish(&self, event: &VoteEvent) -> Result<(), BusError> {
        let message = encode_vote_event(event)?;
        let topic_arn = self.topic_arn.clone();
        let client = self.sns_client.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .publish()
                    .topic_arn(topic_arn)
                    .message(message)
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|error| BusError::Topic(DisplayErrorContext(&error).to_string()))
            })
        })
    }
}

pub struct SqsVoteBus {
    pub queue_url: String,
    pub sqs_client: aws_sdk_sqs::Client,
}

impl VoteBus for SqsVoteBus {
    fn publish(&self, event: &VoteEvent) -> Result<(), BusError> {
        let body = encode_vote_event(event)?;
        let queue_url = self.queue_url.clone();
        let client = self.sqs_client.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .send_message()
                    .queue_url(queue_url)
                    .message_body(body)
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|error| {
                        BusError::Queue(
                            aws_sdk_sqs::error::DisplayErrorContext(&error).to_string(),
                        )
                    })
            })
        })
    }
}
