use serde_json::json;
use stack_core::manifest::StackManifest;

use crate::adapters::functions::FunctionService;
use crate::adapters::rest_api::RestApiService;
use crate::events::{EventLevel, EventSink};

pub struct TeardownServices<'a> {
    pub functions: &'a dyn FunctionService,
    pub rest_apis: &'a dyn RestApiService,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeardownReport {
    pub rest_api_deleted: bool,
    pub function_deleted: bool,
}

impl TeardownReport {
    pub fn fully_deleted(&self) -> bool {
        self.rest_api_deleted && self.function_deleted
    }
}

/// Deletes the REST API and the function recorded in the manifest. The two
/// deletions are independent: one failing never blocks the other.
pub fn run(
    manifest: &StackManifest,
    services: &TeardownServices<'_>,
    sink: &dyn EventSink,
) -> TeardownReport {
    let rest_api_deleted = match services.rest_apis.delete_rest_api(&manifest.rest_api_id) {
        Ok(()) => {
            sink.emit(
                EventLevel::Info,
                "rest_api_deleted",
                json!({ "rest_api_id": manifest.rest_api_id }),
            );
            true
        }
        Err(error) => {
            sink.emit(
                EventLevel::Error,
                "delete_rest_api",
                json!({ "rest_api_id": manifest.rest_api_id, "error": error }),
            );
            false
        }
    };

    let function_deleted = match services.functions.delete_function(&manifest.function_name) {
        Ok(()) => {
            sink.emit(
                EventLevel::Info,
                "function_deleted",
                json!({ "function_name": manifest.function_name }),
            );
            true
        }
        Err(error) => {
            sink.emit(
                EventLevel::Error,
                "delete_function",
                json!({ "function_name": manifest.function_name, "error": error }),
            );
            false
        }
    };

    TeardownReport {
        rest_api_deleted,
        function_deleted,
    }
}
