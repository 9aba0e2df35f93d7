use std::fs;
use std::path::PathBuf;
use std::process::exit;

use aws_config::{BehaviorVersion, Region};
use clap::{Parser, ValueEnum};
use stack_aws::adapters::functions::SdkFunctionService;
use stack_aws::adapters::identity::SdkCallerIdentity;
use stack_aws::adapters::object_store::SdkObjectStore;
use stack_aws::adapters::queue::SdkQueueService;
use stack_aws::adapters::rest_api::SdkRestApiService;
use stack_aws::adapters::roles::SdkRoleStore;
use stack_aws::events::StderrJsonSink;
use stack_aws::handlers::provision::{self, ProvisionOptions, Services};
use stack_aws::handlers::teardown::{self, TeardownServices};
use stack_core::manifest::StackManifest;
use stack_core::plan::ProvisionPlan;

#[derive(Parser)]
#[command(
    name = "stack_demo",
    about = "Provisions and tears down the demo AWS stack",
    long_about = "Provisions an S3 bucket, an SQS queue with a bucket-to-queue\n\
                  event notification, a Lambda function, and a REST API with a\n\
                  POST method wired to the function. The destroy action tears\n\
                  down the REST API and function recorded in the manifest."
)]
struct Cli {
    /// Action the tool performs
    #[arg(value_enum)]
    action: Action,

    /// JSON file recording the identifiers a demo run created
    #[arg(long, env = "DEMO_STACK_STATE_FILE", default_value = "stack-manifest.json")]
    state_file: PathBuf,

    /// Create the Lambda execution role instead of requiring it to exist
    #[arg(long)]
    bootstrap_role: bool,

    /// Region used for clients and ARN templating
    #[arg(long, env = "DEMO_STACK_REGION")]
    region: Option<String>,

    /// Bucket to create
    #[arg(long, env = "DEMO_STACK_BUCKET_NAME")]
    bucket_name: Option<String>,

    /// Location constraint for bucket creation (omit for the provider default)
    #[arg(long)]
    bucket_region: Option<String>,

    /// Queue to create
    #[arg(long)]
    queue_name: Option<String>,

    /// Seconds a delivered message is delayed
    #[arg(long)]
    queue_delay_seconds: Option<String>,

    /// Seconds a received message stays invisible to other consumers
    #[arg(long)]
    queue_visibility_timeout: Option<String>,

    /// Function to create
    #[arg(long)]
    function_name: Option<String>,

    /// Execution role the function runs under
    #[arg(long)]
    role_name: Option<String>,

    /// REST API to create
    #[arg(long)]
    api_name: Option<String>,

    /// Packaged function artifact (see `cargo run -p xtask -- lambda-package`)
    #[arg(long)]
    artifact: Option<String>,

    /// Local file uploaded into the bucket
    #[arg(long)]
    upload_file: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Action {
    /// Provision the demo resources and record a manifest
    Demo,
    /// Delete the REST API and function recorded in the manifest
    Destroy,
}

impl Cli {
    fn plan(&self) -> ProvisionPlan {
        let defaults = ProvisionPlan::default();
        ProvisionPlan {
            region: self.region.clone().unwrap_or(defaults.region),
            bucket_name: self.bucket_name.clone().unwrap_or(defaults.bucket_name),
            bucket_region: self.bucket_region.clone().or(defaults.bucket_region),
            queue_name: self.queue_name.clone().unwrap_or(defaults.queue_name),
            queue_delay_seconds: self
                .queue_delay_seconds
                .clone()
                .unwrap_or(defaults.queue_delay_seconds),
            queue_visibility_timeout: self
                .queue_visibility_timeout
                .clone()
                .unwrap_or(defaults.queue_visibility_timeout),
            notification_prefix: defaults.notification_prefix,
            upload_file: self.upload_file.clone().unwrap_or(defaults.upload_file),
            function_name: self.function_name.clone().unwrap_or(defaults.function_name),
            execution_role_name: self.role_name.clone().unwrap_or(defaults.execution_role_name),
            artifact_path: self.artifact.clone().unwrap_or(defaults.artifact_path),
            rest_api_name: self.api_name.clone().unwrap_or(defaults.rest_api_name),
            stage_name: defaults.stage_name,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    banner();
    println!("Welcome to the demo stack provisioning tool!");

    let outcome = match cli.action {
        Action::Demo => {
            println!("Deploying the demo resources.");
            run_demo(&cli).await
        }
        Action::Destroy => {
            println!("Destroying the resources recorded in the manifest.");
            run_destroy(&cli).await
        }
    };

    banner();

    if let Err(message) = outcome {
        eprintln!("{message}");
        exit(1);
    }
}

fn banner() {
    println!("{}", "-".repeat(88));
}

async fn run_demo(cli: &Cli) -> Result<(), String> {
    let plan = cli.plan();
    let config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(plan.region.clone()))
        .load()
        .await;

    let identity = SdkCallerIdentity::new(aws_sdk_sts::Client::new(&config));
    let object_store = SdkObjectStore::new(aws_sdk_s3::Client::new(&config));
    let queues = SdkQueueService::new(aws_sdk_sqs::Client::new(&config));
    let roles = SdkRoleStore::new(aws_sdk_iam::Client::new(&config));
    let functions = SdkFunctionService::new(aws_sdk_lambda::Client::new(&config));
    let rest_apis = SdkRestApiService::new(aws_sdk_apigateway::Client::new(&config));

    let services = Services {
        identity: &identity,
        object_store: &object_store,
        queues: &queues,
        roles: &roles,
        functions: &functions,
        rest_apis: &rest_apis,
    };
    let options = ProvisionOptions {
        bootstrap_role: cli.bootstrap_role,
    };

    let manifest = provision::run(&plan, options, &services, &StderrJsonSink)
        .map_err(|error| error.to_string())?;

    let raw = manifest
        .to_json()
        .map_err(|error| format!("failed to serialize manifest: {error}"))?;
    fs::write(&cli.state_file, raw).map_err(|error| {
        format!(
            "failed to write manifest '{}': {error}",
            cli.state_file.display()
        )
    })?;
    println!(
        "Created resources are recorded in '{}'.",
        cli.state_file.display()
    );
    Ok(())
}

async fn run_destroy(cli: &Cli) -> Result<(), String> {
    let raw = fs::read_to_string(&cli.state_file).map_err(|error| {
        format!(
            "failed to read manifest '{}' (has a demo run recorded one?): {error}",
            cli.state_file.display()
        )
    })?;
    let manifest = StackManifest::from_json(&raw).map_err(|error| {
        format!(
            "failed to parse manifest '{}': {error}",
            cli.state_file.display()
        )
    })?;

    let config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(manifest.region.clone()))
        .load()
        .await;
    let functions = SdkFunctionService::new(aws_sdk_lambda::Client::new(&config));
    let rest_apis = SdkRestApiService::new(aws_sdk_apigateway::Client::new(&config));

    let report = teardown::run(
        &manifest,
        &TeardownServices {
            functions: &functions,
            rest_apis: &rest_apis,
        },
        &StderrJsonSink,
    );

    if !report.fully_deleted() {
        return Err("some resources could not be deleted; see the event log".to_string());
    }
    println!("Deleted the REST API and the function.");
    Ok(())
}
