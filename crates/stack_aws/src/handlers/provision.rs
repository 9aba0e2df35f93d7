use std::path::{Path, PathBuf};

use serde_json::json;
use stack_core::arn::{execute_api_source_arn, lambda_invocation_uri, queue_arn};
use stack_core::manifest::{StackManifest, MANIFEST_SCHEMA_VERSION};
use stack_core::plan::ProvisionPlan;
use stack_core::policy::{lambda_assume_role_policy, queue_send_message_policy};
use uuid::Uuid;

use crate::adapters::functions::{FunctionService, FunctionSpec};
use crate::adapters::identity::CallerIdentity;
use crate::adapters::object_store::{NotificationRule, ObjectStore};
use crate::adapters::queue::{CreateQueueRequest, QueueService};
use crate::adapters::rest_api::RestApiService;
use crate::adapters::roles::RoleStore;
use crate::events::{EventLevel, EventSink};
use crate::handlers::StepError;

pub const FUNCTION_RUNTIME: &str = "provided.al2023";
pub const FUNCTION_HANDLER: &str = "bootstrap";
pub const FUNCTION_TIMEOUT_SECONDS: i32 = 300;

/// All remote services the provisioning workflow drives.
pub struct Services<'a> {
    pub identity: &'a dyn CallerIdentity,
    pub object_store: &'a dyn ObjectStore,
    pub queues: &'a dyn QueueService,
    pub roles: &'a dyn RoleStore,
    pub functions: &'a dyn FunctionService,
    pub rest_apis: &'a dyn RestApiService,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProvisionOptions {
    /// Create the execution role (with the Lambda trust policy) instead of
    /// requiring it to pre-exist.
    pub bootstrap_role: bool,
}

/// Runs the fixed create sequence and returns the manifest of everything it
/// provisioned. Each step either halts the run (its output is consumed by a
/// later step) or is explicitly continue-on-error (upload, bucket inventory).
pub fn run(
    plan: &ProvisionPlan,
    options: ProvisionOptions,
    services: &Services<'_>,
    sink: &dyn EventSink,
) -> Result<StackManifest, StepError> {
    plan.validate()
        .map_err(|error| StepError::new("validate_plan", error.message()))?;

    let account_id = services
        .identity
        .account_id()
        .map_err(|error| fail(sink, "resolve_caller_identity", error))?;
    info(sink, "caller_identity_resolved", json!({ "account_id": account_id }));

    services
        .object_store
        .create_bucket(&plan.bucket_name, plan.bucket_region.as_deref())
        .map_err(|error| fail(sink, "create_bucket", error))?;
    info(
        sink,
        "bucket_created",
        json!({ "bucket_name": plan.bucket_name, "bucket_region": plan.bucket_region }),
    );

    // Inventory is diagnostic only.
    match services.object_store.list_buckets() {
        Ok(buckets) => info(
            sink,
            "bucket_inventory",
            json!({ "count": buckets.len(), "buckets": buckets }),
        ),
        Err(error) => error_event(sink, "list_buckets", &error),
    }

    let queue_arn = queue_arn(&plan.region, &account_id, &plan.queue_name);
    let policy_json = queue_send_message_policy(&queue_arn, &plan.bucket_name, &account_id)
        .to_json()
        .map_err(|error| {
            fail(
                sink,
                "create_queue",
                format!("failed to serialize queue policy: {error}"),
            )
        })?;
    let queue = services
        .queues
        .create_queue(&CreateQueueRequest {
            queue_name: plan.queue_name.clone(),
            delay_seconds: plan.queue_delay_seconds.clone(),
            visibility_timeout: plan.queue_visibility_timeout.clone(),
            policy_json,
        })
        .map_err(|error| fail(sink, "create_queue", error))?;
    info(
        sink,
        "queue_created",
        json!({ "queue_name": plan.queue_name, "queue_url": queue.queue_url }),
    );

    let rule = NotificationRule {
        id: format!("Notif_{}", plan.queue_name),
        queue_arn: queue_arn.clone(),
        key_prefix: plan.notification_prefix.clone(),
    };
    services
        .object_store
        .put_bucket_notification(&plan.bucket_name, &rule)
        .map_err(|error| fail(sink, "put_bucket_notification", error))?;
    info(
        sink,
        "bucket_notification_configured",
        json!({ "bucket_name": plan.bucket_name, "queue_arn": queue_arn, "prefix": rule.key_prefix }),
    );

    // Upload is the one mutation the workflow survives losing: nothing
    // downstream consumes the object.
    match services.object_store.upload_object(
        Path::new(&plan.upload_file),
        &plan.bucket_name,
        plan.upload_object_key(),
    ) {
        Ok(()) => info(
            sink,
            "object_uploaded",
            json!({ "file": plan.upload_file, "bucket_name": plan.bucket_name }),
        ),
        Err(error) => error_event(sink, "upload_object", &error),
    }

    let role = if options.bootstrap_role {
        let trust_policy = lambda_assume_role_policy().to_json().map_err(|error| {
            fail(
                sink,
                "create_execution_role",
                format!("failed to serialize trust policy: {error}"),
            )
        })?;
        services
            .roles
            .create_role(&plan.execution_role_name, &trust_policy)
            .map_err(|error| fail(sink, "create_execution_role", error))?
    } else {
        services
            .roles
            .get_role(&plan.execution_role_name)
            .map_err(|error| fail(sink, "lookup_execution_role", error))?
    };
    info(
        sink,
        "execution_role_resolved",
        json!({ "role_name": role.role_name, "role_arn": role.arn }),
    );

    let function_arn = services
        .functions
        .create_function(&FunctionSpec {
            function_name: plan.function_name.clone(),
            runtime: FUNCTION_RUNTIME.to_string(),
            handler: FUNCTION_HANDLER.to_string(),
            role_arn: role.arn.clone(),
            artifact_path: PathBuf::from(&plan.artifact_path),
            timeout_seconds: FUNCTION_TIMEOUT_SECONDS,
        })
        .map_err(|error| fail(sink, "create_function", error))?;
    info(
        sink,
        "function_created",
        json!({ "function_name": plan.function_name, "function_arn": function_arn }),
    );

    let rest_api_id = services
        .rest_apis
        .create_rest_api(&plan.rest_api_name)
        .map_err(|error| fail(sink, "create_rest_api", error))?;
    info(
        sink,
        "rest_api_created",
        json!({ "rest_api_name": plan.rest_api_name, "rest_api_id": rest_api_id }),
    );

    let root_resource_id = services
        .rest_apis
        .root_resource_id(&rest_api_id)
        .map_err(|error| fail(sink, "get_root_resource", error))?;

    let api_resource_id = services
        .rest_apis
        .create_resource(&rest_api_id, &root_resource_id, &plan.function_name)
        .map_err(|error| fail(sink, "create_api_resource", error))?;
    info(
        sink,
        "api_resource_created",
        json!({ "resource_id": api_resource_id, "path_part": plan.function_name }),
    );

    services
        .rest_apis
        .put_post_method(&rest_api_id, &api_resource_id)
        .map_err(|error| fail(sink, "put_post_method", error))?;
    info(
        sink,
        "post_method_configured",
        json!({ "rest_api_id": rest_api_id, "resource_id": api_resource_id }),
    );

    let invocation_uri = lambda_invocation_uri(&plan.region, &function_arn);
    services
        .rest_apis
        .put_lambda_integration(&rest_api_id, &api_resource_id, &invocation_uri)
        .map_err(|error| fail(sink, "put_lambda_integration", error))?;
    services
        .rest_apis
        .create_deployment(&rest_api_id, &plan.stage_name)
        .map_err(|error| fail(sink, "create_deployment", error))?;
    info(
        sink,
        "api_deployed",
        json!({ "rest_api_id": rest_api_id, "stage_name": plan.stage_name, "invocation_uri": invocation_uri }),
    );

    let statement_id = Uuid::new_v4().simple().to_string();
    let source_arn =
        execute_api_source_arn(&plan.region, &account_id, &rest_api_id, &plan.function_name);
    services
        .functions
        .add_invoke_permission(&plan.function_name, &statement_id, &source_arn)
        .map_err(|error| fail(sink, "add_invoke_permission", error))?;
    info(
        sink,
        "invoke_permission_granted",
        json!({ "statement_id": statement_id, "source_arn": source_arn }),
    );

    let manifest = StackManifest {
        schema_version: MANIFEST_SCHEMA_VERSION.to_string(),
        region: plan.region.clone(),
        account_id,
        bucket_name: plan.bucket_name.clone(),
        queue_name: plan.queue_name.clone(),
        queue_url: queue.queue_url,
        queue_arn,
        function_name: plan.function_name.clone(),
        function_arn,
        rest_api_id,
        root_resource_id,
        api_resource_id,
        stage_name: plan.stage_name.clone(),
    };
    info(
        sink,
        "provisioning_completed",
        json!({ "rest_api_id": manifest.rest_api_id, "function_arn": manifest.function_arn }),
    );
    Ok(manifest)
}

fn info(sink: &dyn EventSink, event: &str, details: serde_json::Value) {
    sink.emit(EventLevel::Info, event, details);
}

fn error_event(sink: &dyn EventSink, step: &str, message: &str) {
    sink.emit(EventLevel::Error, step, json!({ "error": message }));
}

fn fail(sink: &dyn EventSink, step: &'static str, message: String) -> StepError {
    error_event(sink, step, &message);
    StepError::new(step, message)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::Value;

    use super::*;
    use crate::adapters::queue::CreatedQueue;
    use crate::adapters::roles::RoleDescriptor;

    const ACCOUNT_ID: &str = "111122223333";
    const REST_API_ID: &str = "abc123";

    #[derive(Default)]
    struct FakeCloud {
        calls: Mutex<Vec<String>>,
        bucket_regions: Mutex<Vec<Option<String>>>,
        queue_policies: Mutex<Vec<String>>,
        role_policies: Mutex<Vec<String>>,
        statement_ids: Mutex<Vec<String>>,
        source_arns: Mutex<Vec<String>>,
        fail_upload: bool,
        fail_create_queue: bool,
        fail_list_buckets: bool,
    }

    impl FakeCloud {
        fn record(&self, call: impl Into<String>) {
            self.calls.lock().expect("poisoned mutex").push(call.into());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().expect("poisoned mutex").clone()
        }

        fn called(&self, prefix: &str) -> bool {
            self.calls().iter().any(|call| call.starts_with(prefix))
        }
    }

    impl CallerIdentity for FakeCloud {
        fn account_id(&self) -> Result<String, String> {
            self.record("account_id");
            Ok(ACCOUNT_ID.to_string())
        }
    }

    impl ObjectStore for FakeCloud {
        fn create_bucket(&self, bucket_name: &str, region: Option<&str>) -> Result<(), String> {
            self.record(format!("create_bucket:{bucket_name}"));
            self.bucket_regions
                .lock()
                .expect("poisoned mutex")
                .push(region.map(ToString::to_string));
            Ok(())
        }

        fn put_bucket_notification(
            &self,
            bucket_name: &str,
            rule: &NotificationRule,
        ) -> Result<(), String> {
            self.record(format!(
                "put_bucket_notification:{bucket_name}:{}:{}",
                rule.queue_arn, rule.key_prefix
            ));
            Ok(())
        }

        fn upload_object(
            &self,
            _local_path: &Path,
            bucket_name: &str,
            object_key: &str,
        ) -> Result<(), String> {
            self.record(format!("upload_object:{bucket_name}:{object_key}"));
            if self.fail_upload {
                return Err("simulated storage outage".to_string());
            }
            Ok(())
        }

        fn list_buckets(&self) -> Result<Vec<String>, String> {
            self.record("list_buckets");
            if self.fail_list_buckets {
                return Err("simulated listing outage".to_string());
            }
            Ok(vec!["demo-stack-bucket-1".to_string()])
        }
    }

    impl QueueService for FakeCloud {
        fn create_queue(&self, request: &CreateQueueRequest) -> Result<CreatedQueue, String> {
            self.record(format!("create_queue:{}", request.queue_name));
            self.queue_policies
                .lock()
                .expect("poisoned mutex")
                .push(request.policy_json.clone());
            if self.fail_create_queue {
                return Err("simulated queue outage".to_string());
            }
            Ok(CreatedQueue {
                queue_url: format!(
                    "https://sqs.us-east-1.amazonaws.com/{ACCOUNT_ID}/{}",
                    request.queue_name
                ),
            })
        }
    }

    impl RoleStore for FakeCloud {
        fn get_role(&self, role_name: &str) -> Result<RoleDescriptor, String> {
            self.record(format!("get_role:{role_name}"));
            Ok(RoleDescriptor {
                role_name: role_name.to_string(),
                arn: format!("arn:aws:iam::{ACCOUNT_ID}:role/{role_name}"),
            })
        }

        fn create_role(
            &self,
            role_name: &str,
            assume_role_policy_json: &str,
        ) -> Result<RoleDescriptor, String> {
            self.record(format!("create_role:{role_name}"));
            self.role_policies
                .lock()
                .expect("poisoned mutex")
                .push(assume_role_policy_json.to_string());
            Ok(RoleDescriptor {
                role_name: role_name.to_string(),
                arn: format!("arn:aws:iam::{ACCOUNT_ID}:role/{role_name}"),
            })
        }
    }

    impl FunctionService for FakeCloud {
        fn create_function(&self, spec: &FunctionSpec) -> Result<String, String> {
            self.record(format!("create_function:{}", spec.function_name));
            Ok(format!(
                "arn:aws:lambda:us-east-1:{ACCOUNT_ID}:function:{}",
                spec.function_name
            ))
        }

        fn add_invoke_permission(
            &self,
            function_name: &str,
            statement_id: &str,
            source_arn: &str,
        ) -> Result<(), String> {
            self.record(format!("add_invoke_permission:{function_name}"));
            self.statement_ids
                .lock()
                .expect("poisoned mutex")
                .push(statement_id.to_string());
            self.source_arns
                .lock()
                .expect("poisoned mutex")
                .push(source_arn.to_string());
            Ok(())
        }

        fn delete_function(&self, function_name: &str) -> Result<(), String> {
            self.record(format!("delete_function:{function_name}"));
            Ok(())
        }
    }

    impl RestApiService for FakeCloud {
        fn create_rest_api(&self, api_name: &str) -> Result<String, String> {
            self.record(format!("create_rest_api:{api_name}"));
            Ok(REST_API_ID.to_string())
        }

        fn root_resource_id(&self, rest_api_id: &str) -> Result<String, String> {
            self.record(format!("root_resource_id:{rest_api_id}"));
            Ok("root0".to_string())
        }

        fn create_resource(
            &self,
            rest_api_id: &str,
            parent_id: &str,
            path_part: &str,
        ) -> Result<String, String> {
            self.record(format!("create_resource:{rest_api_id}:{parent_id}:{path_part}"));
            Ok("res01".to_string())
        }

        fn put_post_method(&self, rest_api_id: &str, resource_id: &str) -> Result<(), String> {
            self.record(format!("put_post_method:{rest_api_id}:{resource_id}"));
            Ok(())
        }

        fn put_lambda_integration(
            &self,
            rest_api_id: &str,
            resource_id: &str,
            invocation_uri: &str,
        ) -> Result<(), String> {
            self.record(format!(
                "put_lambda_integration:{rest_api_id}:{resource_id}:{invocation_uri}"
            ));
            Ok(())
        }

        fn create_deployment(&self, rest_api_id: &str, stage_name: &str) -> Result<(), String> {
            self.record(format!("create_deployment:{rest_api_id}:{stage_name}"));
            Ok(())
        }

        fn delete_rest_api(&self, rest_api_id: &str) -> Result<(), String> {
            self.record(format!("delete_rest_api:{rest_api_id}"));
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<(EventLevel, String)>>,
    }

    impl RecordingSink {
        fn errors(&self) -> Vec<String> {
            self.events
                .lock()
                .expect("poisoned mutex")
                .iter()
                .filter(|(level, _)| *level == EventLevel::Error)
                .map(|(_, event)| event.clone())
                .collect()
        }
    }

    impl EventSink for RecordingSink {
        fn emit(&self, level: EventLevel, event: &str, _details: Value) {
            self.events
                .lock()
                .expect("poisoned mutex")
                .push((level, event.to_string()));
        }
    }

    fn services(fake: &FakeCloud) -> Services<'_> {
        Services {
            identity: fake,
            object_store: fake,
            queues: fake,
            roles: fake,
            functions: fake,
            rest_apis: fake,
        }
    }

    #[test]
    fn demo_sequence_provisions_everything_in_order() {
        let fake = FakeCloud::default();
        let sink = RecordingSink::default();
        let plan = ProvisionPlan::default();

        let manifest = run(&plan, ProvisionOptions::default(), &services(&fake), &sink)
            .expect("provisioning should pass");

        assert_eq!(
            fake.calls(),
            vec![
                "account_id".to_string(),
                "create_bucket:demo-stack-bucket-1".to_string(),
                "list_buckets".to_string(),
                "create_queue:demo-stack-queue".to_string(),
                format!(
                    "put_bucket_notification:demo-stack-bucket-1:arn:aws:sqs:us-east-1:{ACCOUNT_ID}:demo-stack-queue:files/"
                ),
                "upload_object:demo-stack-bucket-1:files/demo.txt".to_string(),
                "get_role:LambdaBasicExecution".to_string(),
                "create_function:demoStackFunction".to_string(),
                "create_rest_api:demoStackApi".to_string(),
                format!("root_resource_id:{REST_API_ID}"),
                format!("create_resource:{REST_API_ID}:root0:demoStackFunction"),
                format!("put_post_method:{REST_API_ID}:res01"),
                format!(
                    "put_lambda_integration:{REST_API_ID}:res01:arn:aws:apigateway:us-east-1:lambda:path/2015-03-31/functions/arn:aws:lambda:us-east-1:{ACCOUNT_ID}:function:demoStackFunction/invocations"
                ),
                format!("create_deployment:{REST_API_ID}:dev"),
                "add_invoke_permission:demoStackFunction".to_string(),
            ]
        );

        assert_eq!(manifest.account_id, ACCOUNT_ID);
        assert_eq!(manifest.rest_api_id, REST_API_ID);
        assert_eq!(
            manifest.queue_arn,
            format!("arn:aws:sqs:us-east-1:{ACCOUNT_ID}:demo-stack-queue")
        );
        assert_eq!(manifest.api_resource_id, "res01");
        assert!(sink.errors().is_empty());
    }

    #[test]
    fn upload_failure_is_logged_and_workflow_continues() {
        let fake = FakeCloud {
            fail_upload: true,
            ..FakeCloud::default()
        };
        let sink = RecordingSink::default();

        let result = run(
            &ProvisionPlan::default(),
            ProvisionOptions::default(),
            &services(&fake),
            &sink,
        );

        assert!(result.is_ok());
        assert!(fake.called("create_function:"));
        assert!(fake.called("add_invoke_permission:"));
        assert_eq!(sink.errors(), vec!["upload_object".to_string()]);
    }

    #[test]
    fn queue_failure_halts_before_notification_wiring() {
        let fake = FakeCloud {
            fail_create_queue: true,
            ..FakeCloud::default()
        };
        let sink = RecordingSink::default();

        let error = run(
            &ProvisionPlan::default(),
            ProvisionOptions::default(),
            &services(&fake),
            &sink,
        )
        .expect_err("queue outage should halt the run");

        assert_eq!(error.step, "create_queue");
        assert!(!fake.called("put_bucket_notification:"));
        assert!(!fake.called("create_function:"));
    }

    #[test]
    fn bucket_inventory_failure_does_not_halt() {
        let fake = FakeCloud {
            fail_list_buckets: true,
            ..FakeCloud::default()
        };
        let sink = RecordingSink::default();

        let result = run(
            &ProvisionPlan::default(),
            ProvisionOptions::default(),
            &services(&fake),
            &sink,
        );

        assert!(result.is_ok());
        assert_eq!(sink.errors(), vec!["list_buckets".to_string()]);
    }

    #[test]
    fn bucket_location_constraint_follows_plan() {
        let fake = FakeCloud::default();
        run(
            &ProvisionPlan::default(),
            ProvisionOptions::default(),
            &services(&fake),
            &RecordingSink::default(),
        )
        .expect("provisioning should pass");
        assert_eq!(*fake.bucket_regions.lock().expect("poisoned mutex"), vec![None]);

        let fake = FakeCloud::default();
        let plan = ProvisionPlan {
            bucket_region: Some("eu-west-1".to_string()),
            ..ProvisionPlan::default()
        };
        run(
            &plan,
            ProvisionOptions::default(),
            &services(&fake),
            &RecordingSink::default(),
        )
        .expect("provisioning should pass");
        assert_eq!(
            *fake.bucket_regions.lock().expect("poisoned mutex"),
            vec![Some("eu-west-1".to_string())]
        );
    }

    #[test]
    fn queue_policy_scopes_resource_bucket_and_account() {
        let fake = FakeCloud::default();
        run(
            &ProvisionPlan::default(),
            ProvisionOptions::default(),
            &services(&fake),
            &RecordingSink::default(),
        )
        .expect("provisioning should pass");

        let policies = fake.queue_policies.lock().expect("poisoned mutex");
        let policy: Value = serde_json::from_str(&policies[0]).expect("policy is valid JSON");
        let statement = &policy["Statement"][0];
        assert_eq!(
            statement["Resource"],
            format!("arn:aws:sqs:us-east-1:{ACCOUNT_ID}:demo-stack-queue")
        );
        assert_eq!(
            statement["Condition"]["ArnLike"]["aws:SourceArn"],
            "arn:aws:s3:::demo-stack-bucket-1"
        );
        assert_eq!(
            statement["Condition"]["StringEquals"]["aws:SourceAccount"],
            ACCOUNT_ID
        );
    }

    #[test]
    fn grant_statement_ids_are_unique_and_source_arn_matches_template() {
        let fake = FakeCloud::default();
        let plan = ProvisionPlan::default();

        for _ in 0..2 {
            run(
                &plan,
                ProvisionOptions::default(),
                &services(&fake),
                &RecordingSink::default(),
            )
            .expect("provisioning should pass");
        }

        let statement_ids = fake.statement_ids.lock().expect("poisoned mutex");
        assert_eq!(statement_ids.len(), 2);
        assert_ne!(statement_ids[0], statement_ids[1]);

        let source_arns = fake.source_arns.lock().expect("poisoned mutex");
        assert_eq!(
            source_arns[0],
            format!("arn:aws:execute-api:us-east-1:{ACCOUNT_ID}:{REST_API_ID}/*/POST/demoStackFunction")
        );
    }

    #[test]
    fn role_bootstrap_creates_role_with_lambda_trust_policy() {
        let fake = FakeCloud::default();
        let options = ProvisionOptions {
            bootstrap_role: true,
        };

        run(
            &ProvisionPlan::default(),
            options,
            &services(&fake),
            &RecordingSink::default(),
        )
        .expect("provisioning should pass");

        assert!(fake.called("create_role:LambdaBasicExecution"));
        assert!(!fake.called("get_role:"));

        let policies = fake.role_policies.lock().expect("poisoned mutex");
        let policy: Value = serde_json::from_str(&policies[0]).expect("policy is valid JSON");
        assert_eq!(
            policy["Statement"][0]["Principal"]["Service"],
            "lambda.amazonaws.com"
        );
    }
}
