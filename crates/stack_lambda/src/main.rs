//! The function the demo deploys: answers the REST API's POST method by
//! echoing the received payload. Packaged as a `bootstrap` zip by
//! `cargo run -p xtask -- lambda-package`.

use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::{json, Value};

async fn handle_request(event: LambdaEvent<Value>) -> Result<Value, Error> {
    Ok(json!({
        "status": "ok",
        "received": event.payload,
    }))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_runtime::run(service_fn(handle_request)).await
}
