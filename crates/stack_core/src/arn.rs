pub fn queue_arn(region: &str, account_id: &str, queue_name: &str) -> String {
    format!("arn:aws:sqs:{region}:{account_id}:{queue_name}")
}

pub fn bucket_arn(bucket_name: &str) -> String {
    format!("arn:aws:s3:::{bucket_name}")
}

/// Source ARN matching POST requests on one resource of a deployed REST API,
/// across all stages.
pub fn execute_api_source_arn(
    region: &str,
    account_id: &str,
    rest_api_id: &str,
    path_segment: &str,
) -> String {
    format!("arn:aws:execute-api:{region}:{account_id}:{rest_api_id}/*/POST/{path_segment}")
}

/// Gateway-side URI invoking a function through the Lambda service path.
pub fn lambda_invocation_uri(region: &str, function_arn: &str) -> String {
    format!(
        "arn:aws:apigateway:{region}:lambda:path/2015-03-31/functions/{function_arn}/invocations"
    )
}
