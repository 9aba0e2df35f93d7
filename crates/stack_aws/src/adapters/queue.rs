use aws_sdk_sqs::types::QueueAttributeName;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateQueueRequest {
    pub queue_name: String,
    pub delay_seconds: String,
    pub visibility_timeout: String,
    /// Serialized access policy attached as the queue's `Policy` attribute.
    pub policy_json: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedQueue {
    pub queue_url: String,
}

pub trait QueueService {
    fn create_queue(&self, request: &CreateQueueRequest) -> Result<CreatedQueue, String>;
}

pub struct SdkQueueService {
    client: aws_sdk_sqs::Client,
}

impl SdkQueueService {
    pub fn new(client: aws_sdk_sqs::Client) -> Self {
        Self { client }
    }
}

impl QueueService for SdkQueueService {
    fn create_queue(&self, request: &CreateQueueRequest) -> Result<CreatedQueue, String> {
        let client = self.client.clone();
        let request = request.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let output = client
                    .create_queue()
                    .queue_name(&request.queue_name)
                    .attributes(QueueAttributeName::DelaySeconds, &request.delay_seconds)
                    .attributes(
                        QueueAttributeName::VisibilityTimeout,
                        &request.visibility_timeout,
                    )
                    .attributes(QueueAttributeName::Policy, &request.policy_json)
                    .send()
                    .await
                    .map_err(|error| {
                        format!("failed to create queue '{}': {error}", request.queue_name)
                    })?;
                let queue_url = output
                    .queue_url()
                    .map(ToString::to_string)
                    .ok_or_else(|| "create-queue response had no queue url".to_string())?;
                Ok(CreatedQueue { queue_url })
            })
        })
    }
}
