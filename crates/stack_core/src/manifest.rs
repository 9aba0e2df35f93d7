use serde::{Deserialize, Serialize};

pub const MANIFEST_SCHEMA_VERSION: &str = "v1";

/// Identifiers a `demo` run actually created, persisted so `destroy` tears
/// down exactly those resources instead of relying on stale literals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StackManifest {
    pub schema_version: String,
    pub region: String,
    pub account_id: String,
    pub bucket_name: String,
    pub queue_name: String,
    pub queue_url: String,
    pub queue_arn: String,
    pub function_name: String,
    pub function_arn: String,
    pub rest_api_id: String,
    pub root_resource_id: String,
    pub api_resource_id: String,
    pub stage_name: String,
}

impl StackManifest {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}
