use std::fs;
use std::path::PathBuf;

use aws_sdk_lambda::primitives::Blob;
use aws_sdk_lambda::types::{FunctionCode, Runtime};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSpec {
    pub function_name: String,
    pub runtime: String,
    pub handler: String,
    pub role_arn: String,
    /// Local zip the function's code is read from at creation time.
    pub artifact_path: PathBuf,
    pub timeout_seconds: i32,
}

pub trait FunctionService {
    /// Creates the function and returns its ARN.
    fn create_function(&self, spec: &FunctionSpec) -> Result<String, String>;

    fn add_invoke_permission(
        &self,
        function_name: &str,
        statement_id: &str,
        source_arn: &str,
    ) -> Result<(), String>;

    fn delete_function(&self, function_name: &str) -> Result<(), String>;
}

pub struct SdkFunctionService {
    client: aws_sdk_lambda::Client,
}

impl SdkFunctionService {
    pub fn new(client: aws_sdk_lambda::Client) -> Self {
        Self { client }
    }
}

impl FunctionService for SdkFunctionService {
    fn create_function(&self, spec: &FunctionSpec) -> Result<String, String> {
        let zipped_code = fs::read(&spec.artifact_path).map_err(|error| {
            format!(
                "failed to read function artifact '{}': {error}",
                spec.artifact_path.display()
            )
        })?;
        let client = self.client.clone();
        let spec = spec.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let output = client
                    .create_function()
                    .function_name(&spec.function_name)
                    .runtime(Runtime::from(spec.runtime.as_str()))
                    .role(&spec.role_arn)
                    .handler(&spec.handler)
                    .code(FunctionCode::builder().zip_file(Blob::new(zipped_code)).build())
                    .timeout(spec.timeout_seconds)
                    .send()
                    .await
                    .map_err(|error| {
                        format!("failed to create function '{}': {error}", spec.function_name)
                    })?;
                output
                    .function_arn()
                    .map(ToString::to_string)
                    .ok_or_else(|| "create-function response had no function arn".to_string())
            })
        })
    }

    fn add_invoke_permission(
        &self,
        function_name: &str,
        statement_id: &str,
        source_arn: &str,
    ) -> Result<(), String> {
        let client = self.client.clone();
        let function = function_name.to_string();
        let statement = statement_id.to_string();
        let source = source_arn.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .add_permission()
                    .function_name(&function)
                    .statement_id(statement)
                    .action("lambda:InvokeFunction")
                    .principal("apigateway.amazonaws.com")
                    .source_arn(source)
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|error| {
                        format!("failed to grant invoke permission on '{function}': {error}")
                    })
            })
        })
    }

    fn delete_function(&self, function_name: &str) -> Result<(), String> {
        let client = self.client.clone();
        let function = function_name.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .delete_function()
                    .function_name(&function)
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|error| format!("failed to delete function '{function}': {error}"))
            })
        })
    }
}
