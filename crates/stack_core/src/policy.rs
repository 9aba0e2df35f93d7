use std::collections::BTreeMap;

use serde::Serialize;

use crate::arn::bucket_arn;

pub const POLICY_VERSION: &str = "2012-10-17";
pub const QUEUE_POLICY_ID: &str = "demo-stack-queue-policy";

/// Policy fields that accept either a single value or a list of values.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ValueOrList {
    Value(String),
    List(Vec<String>),
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Principal {
    #[serde(rename = "Service")]
    pub service: ValueOrList,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StatementCondition {
    #[serde(rename = "ArnLike")]
    pub arn_like: BTreeMap<String, String>,
    #[serde(rename = "StringEquals")]
    pub string_equals: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PolicyStatement {
    #[serde(rename = "Sid")]
    pub sid: String,
    #[serde(rename = "Effect")]
    pub effect: String,
    #[serde(rename = "Principal")]
    pub principal: Principal,
    #[serde(rename = "Action")]
    pub action: ValueOrList,
    #[serde(rename = "Resource", skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    #[serde(rename = "Condition", skip_serializing_if = "Option::is_none")]
    pub condition: Option<StatementCondition>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PolicyDocument {
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "Id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "Statement")]
    pub statement: Vec<PolicyStatement>,
}

impl PolicyDocument {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Access policy granting the storage service permission to send messages
/// into the queue, scoped to the bucket ARN and the owning account.
pub fn queue_send_message_policy(
    queue_arn: &str,
    bucket_name: &str,
    account_id: &str,
) -> PolicyDocument {
    PolicyDocument {
        version: POLICY_VERSION.to_string(),
        id: Some(QUEUE_POLICY_ID.to_string()),
        statement: vec![PolicyStatement {
            sid: String::new(),
            effect: "Allow".to_string(),
            principal: Principal {
                service: ValueOrList::Value("s3.amazonaws.com".to_string()),
            },
            action: ValueOrList::List(vec!["SQS:SendMessage".to_string()]),
            resource: Some(queue_arn.to_string()),
            condition: Some(StatementCondition {
                arn_like: BTreeMap::from([(
                    "aws:SourceArn".to_string(),
                    bucket_arn(bucket_name),
                )]),
                string_equals: BTreeMap::from([(
                    "aws:SourceAccount".to_string(),
                    account_id.to_string(),
                )]),
            }),
        }],
    }
}

/// Trust policy for the Lambda execution role.
pub fn lambda_assume_role_policy() -> PolicyDocument {
    assume_role_policy(ValueOrList::Value("lambda.amazonaws.com".to_string()))
}

/// Trust policy for a gateway execution role, assumable by both the gateway
/// and the function service.
pub fn gateway_assume_role_policy() -> PolicyDocument {
    assume_role_policy(ValueOrList::List(vec![
        "apigateway.amazonaws.com".to_string(),
        "lambda.amazonaws.com".to_string(),
    ]))
}

fn assume_role_policy(service: ValueOrList) -> PolicyDocument {
    PolicyDocument {
        version: POLICY_VERSION.to_string(),
        id: None,
        statement: vec![PolicyStatement {
            sid: String::new(),
            effect: "Allow".to_string(),
            principal: Principal { service },
            action: ValueOrList::Value("sts:AssumeRole".to_string()),
            resource: None,
            condition: None,
        }],
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;

    fn parse(document: &PolicyDocument) -> Value {
        serde_json::from_str(&document.to_json().expect("document serializes"))
            .expect("document is valid JSON")
    }

    #[test]
    fn queue_policy_scopes_resource_bucket_and_account() {
        let queue_arn = "arn:aws:sqs:us-east-1:111122223333:demo-stack-queue";
        let document = queue_send_message_policy(queue_arn, "demo-stack-bucket-1", "111122223333");
        let value = parse(&document);

        let statement = &value["Statement"][0];
        assert_eq!(statement["Resource"], queue_arn);
        assert_eq!(
            statement["Condition"]["ArnLike"]["aws:SourceArn"],
            "arn:aws:s3:::demo-stack-bucket-1"
        );
        assert_eq!(
            statement["Condition"]["StringEquals"]["aws:SourceAccount"],
            "111122223333"
        );
    }

    #[test]
    fn queue_policy_allows_send_message_from_storage_service() {
        let document = queue_send_message_policy(
            "arn:aws:sqs:us-east-1:111122223333:demo-stack-queue",
            "demo-stack-bucket-1",
            "111122223333",
        );
        let value = parse(&document);

        assert_eq!(value["Version"], POLICY_VERSION);
        let statement = &value["Statement"][0];
        assert_eq!(statement["Effect"], "Allow");
        assert_eq!(statement["Principal"]["Service"], "s3.amazonaws.com");
        assert_eq!(statement["Action"][0], "SQS:SendMessage");
    }

    #[test]
    fn lambda_trust_policy_names_single_service_principal() {
        let value = parse(&lambda_assume_role_policy());
        let statement = &value["Statement"][0];
        assert_eq!(statement["Principal"]["Service"], "lambda.amazonaws.com");
        assert_eq!(statement["Action"], "sts:AssumeRole");
        assert!(statement.get("Resource").is_none());
    }

    #[test]
    fn gateway_trust_policy_lists_both_service_principals() {
        let value = parse(&gateway_assume_role_policy());
        let services = &value["Statement"][0]["Principal"]["Service"];
        assert_eq!(services[0], "apigateway.amazonaws.com");
        assert_eq!(services[1], "lambda.amazonaws.com");
    }
}
