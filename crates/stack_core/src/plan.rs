use serde::{Deserialize, Serialize};

pub const DEFAULT_REGION: &str = "us-east-1";

/// Everything a provisioning run needs to know up front. `Default` carries
/// the demo constants; the CLI overrides individual fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProvisionPlan {
    pub region: String,
    pub bucket_name: String,
    /// When set, bucket creation sends a location constraint for this region;
    /// when unset, the storage service default applies.
    pub bucket_region: Option<String>,
    pub queue_name: String,
    pub queue_delay_seconds: String,
    pub queue_visibility_timeout: String,
    /// Object-key prefix the bucket notification filters on.
    pub notification_prefix: String,
    pub upload_file: String,
    pub function_name: String,
    pub execution_role_name: String,
    /// Packaged function artifact, produced by `cargo run -p xtask -- lambda-package`.
    pub artifact_path: String,
    pub rest_api_name: String,
    pub stage_name: String,
}

impl Default for ProvisionPlan {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            bucket_name: "demo-stack-bucket-1".to_string(),
            bucket_region: None,
            queue_name: "demo-stack-queue".to_string(),
            queue_delay_seconds: "0".to_string(),
            queue_visibility_timeout: "60".to_string(),
            notification_prefix: "files/".to_string(),
            upload_file: "files/demo.txt".to_string(),
            function_name: "demoStackFunction".to_string(),
            execution_role_name: "LambdaBasicExecution".to_string(),
            artifact_path: "dist/lambda.zip".to_string(),
            rest_api_name: "demoStackApi".to_string(),
            stage_name: "dev".to_string(),
        }
    }
}

impl ProvisionPlan {
    /// Key the uploaded object is stored under. Matches the local path so the
    /// notification prefix filter applies to it.
    pub fn upload_object_key(&self) -> &str {
        &self.upload_file
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("region", &self.region),
            ("bucket_name", &self.bucket_name),
            ("queue_name", &self.queue_name),
            ("function_name", &self.function_name),
            ("execution_role_name", &self.execution_role_name),
            ("rest_api_name", &self.rest_api_name),
            ("stage_name", &self.stage_name),
            ("upload_file", &self.upload_file),
            ("artifact_path", &self.artifact_path),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::new(format!("{field} must not be empty")));
            }
        }

        for (field, value) in [
            ("queue_delay_seconds", &self.queue_delay_seconds),
            ("queue_visibility_timeout", &self.queue_visibility_timeout),
        ] {
            if value.parse::<u64>().is_err() {
                return Err(ValidationError::new(format!(
                    "{field} must be a whole number of seconds, got '{value}'"
                )));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_plan_is_valid() {
        assert!(ProvisionPlan::default().validate().is_ok());
    }

    #[test]
    fn empty_names_are_rejected() {
        let plan = ProvisionPlan {
            bucket_name: "  ".to_string(),
            ..ProvisionPlan::default()
        };
        let error = plan.validate().expect_err("blank bucket name must fail");
        assert!(error.message().contains("bucket_name"));
    }

    #[test]
    fn non_numeric_queue_settings_are_rejected() {
        let plan = ProvisionPlan {
            queue_visibility_timeout: "soon".to_string(),
            ..ProvisionPlan::default()
        };
        let error = plan.validate().expect_err("non-numeric timeout must fail");
        assert!(error.message().contains("queue_visibility_timeout"));
    }

    #[test]
    fn upload_key_tracks_local_path() {
        let plan = ProvisionPlan::default();
        assert_eq!(plan.upload_object_key(), "files/demo.txt");
        assert!(plan.upload_object_key().starts_with(&plan.notification_prefix));
    }
}
