use std::fs;
use std::path::Path;

use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    BucketLocationConstraint, CreateBucketConfiguration, Event, FilterRule, FilterRuleName,
    NotificationConfiguration, NotificationConfigurationFilter, QueueConfiguration, S3KeyFilter,
};

/// One bucket-to-queue event notification rule. Applying it replaces any
/// notification configuration already on the bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRule {
    pub id: String,
    pub queue_arn: String,
    pub key_prefix: String,
}

pub trait ObjectStore {
    /// Creates a bucket. `region: None` issues the provider-default request;
    /// `Some` adds a location constraint for that region.
    fn create_bucket(&self, bucket_name: &str, region: Option<&str>) -> Result<(), String>;

    fn put_bucket_notification(
        &self,
        bucket_name: &str,
        rule: &NotificationRule,
    ) -> Result<(), String>;

    fn upload_object(
        &self,
        local_path: &Path,
        bucket_name: &str,
        object_key: &str,
    ) -> Result<(), String>;

    fn list_buckets(&self) -> Result<Vec<String>, String>;
}

pub struct SdkObjectStore {
    client: aws_sdk_s3::Client,
}

impl SdkObjectStore {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }
}

impl ObjectStore for SdkObjectStore {
    fn create_bucket(&self, bucket_name: &str, region: Option<&str>) -> Result<(), String> {
        let client = self.client.clone();
        let bucket = bucket_name.to_string();
        let region = region.map(ToString::to_string);

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let mut request = client.create_bucket().bucket(&bucket);
                if let Some(region) = region {
                    request = request.create_bucket_configuration(
                        CreateBucketConfiguration::builder()
                            .location_constraint(BucketLocationConstraint::from(region.as_str()))
                            .build(),
                    );
                }
                request
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|error| format!("failed to create bucket '{bucket}': {error}"))
            })
        })
    }

    fn put_bucket_notification(
        &self,
        bucket_name: &str,
        rule: &NotificationRule,
    ) -> Result<(), String> {
        let client = self.client.clone();
        let bucket = bucket_name.to_string();
        let rule = rule.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let filter = NotificationConfigurationFilter::builder()
                    .key(
                        S3KeyFilter::builder()
                            .filter_rules(
                                FilterRule::builder()
                                    .name(FilterRuleName::Prefix)
                                    .value(&rule.key_prefix)
                                    .build(),
                            )
                            .build(),
                    )
                    .build();
                let queue_configuration = QueueConfiguration::builder()
                    .id(&rule.id)
                    .queue_arn(&rule.queue_arn)
                    .events(Event::from("s3:ObjectCreated:*"))
                    .filter(filter)
                    .build()
                    .map_err(|error| format!("invalid notification rule: {error}"))?;

                client
                    .put_bucket_notification_configuration()
                    .bucket(&bucket)
                    .notification_configuration(
                        NotificationConfiguration::builder()
                            .queue_configurations(queue_configuration)
                            .build(),
                    )
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|error| {
                        format!("failed to configure notifications on '{bucket}': {error}")
                    })
            })
        })
    }

    fn upload_object(
        &self,
        local_path: &Path,
        bucket_name: &str,
        object_key: &str,
    ) -> Result<(), String> {
        let body = fs::read(local_path).map_err(|error| {
            format!("failed to read upload file '{}': {error}", local_path.display())
        })?;
        let client = self.client.clone();
        let bucket = bucket_name.to_string();
        let key = object_key.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .put_object()
                    .bucket(&bucket)
                    .key(key)
                    .body(ByteStream::from(body))
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|error| format!("failed to upload object to '{bucket}': {error}"))
            })
        })
    }

    fn list_buckets(&self) -> Result<Vec<String>, String> {
        let client = self.client.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let output = client
                    .list_buckets()
                    .send()
                    .await
                    .map_err(|error| format!("failed to list buckets: {error}"))?;
                Ok(output
                    .buckets()
                    .iter()
                    .filter_map(|bucket| bucket.name().map(ToString::to_string))
                    .collect())
            })
        })
    }
}
