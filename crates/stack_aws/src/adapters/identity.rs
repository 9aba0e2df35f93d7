pub trait CallerIdentity {
    /// Account id of the credentials the process is running under.
    fn account_id(&self) -> Result<String, String>;
}

pub struct SdkCallerIdentity {
    client: aws_sdk_sts::Client,
}

impl SdkCallerIdentity {
    pub fn new(client: aws_sdk_sts::Client) -> Self {
        Self { client }
    }
}

impl CallerIdentity for SdkCallerIdentity {
    fn account_id(&self) -> Result<String, String> {
        let client = self.client.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let output = client
                    .get_caller_identity()
                    .send()
                    .await
                    .map_err(|error| format!("failed to resolve caller identity: {error}"))?;
                output
                    .account()
                    .map(ToString::to_string)
                    .ok_or_else(|| "caller identity response had no account id".to_string())
            })
        })
    }
}
