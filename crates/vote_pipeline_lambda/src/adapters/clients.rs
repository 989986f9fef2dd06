use crate::adapters::bus::{SnsVoteBus, SqsVoteBus, VoteBus};
use crate::adapters::dynamodb::DynamoVoteStore;
use crate::config::BusTarget;

/// Process-scoped AWS client handle.
///
/// Loaded once at cold start and borrowed by every invocation. SDK clients
/// are cheap to clone and share one connection pool.
#[derive(Clone)]
pub struct AwsClients {
    pub dynamodb: aws_sdk_dynamodb::Client,
    pub sns: aws_sdk_sns::Client,
    pub sqs: aws_sdk_sqs::Client,
}

impl AwsClients {
    pub async fn load() -> Self {
        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self {
            dynamodb: aws_sdk_dynamodb::Client::new(&aws_config),
            sns: aws_sdk_sns::Client::new(&aws_config),
            sqs: aws_sdk_sqs::Client::new(&aws_config),
        }
    }

    pub fn vote_bus(&self, target: &BusTarget) -> Box<dyn VoteBus + Send + Sync> {
        match target {
            BusTarget::Topic(topic_arn) => Box::new(SnsVoteBus {
                topic_arn: topic_arn.clone(),
                sns_client: self.sns.clone(),
            }),
            BusTarget::Queue(queue_url) => Box::new(SqsVoteBus {
                queue_url: queue_url.clone(),
                sqs_client: self.sqs.clone(),
            }),
        }
    }

    pub fn vote_store(&self, table_name: &str, marker_ttl_hours: u32) -> DynamoVoteStore {
        DynamoVoteStore {
            table_name: table_name.to_string(),
            dynamodb_client: self.dynamodb.clone(),
            marker_ttl_hours,
        }
    }
}
