use aws_sdk_apigateway::types::IntegrationType;

pub trait RestApiService {
    /// Creates a REST API with only a root resource; returns its id.
    fn create_rest_api(&self, api_name: &str) -> Result<String, String>;

    /// Id of the first (only) resource of a freshly created API.
    fn root_resource_id(&self, rest_api_id: &str) -> Result<String, String>;

    fn create_resource(
        &self,
        rest_api_id: &str,
        parent_id: &str,
        path_part: &str,
    ) -> Result<String, String>;

    /// Declares an unauthenticated, API-key-required POST method and its 200
    /// method response on the resource.
    fn put_post_method(&self, rest_api_id: &str, resource_id: &str) -> Result<(), String>;

    /// Wires the POST method to the function invocation URI and declares the
    /// 200 integration response with a catch-all selection pattern.
    fn put_lambda_integration(
        &self,
        rest_api_id: &str,
        resource_id: &str,
        invocation_uri: &str,
    ) -> Result<(), String>;

    fn create_deployment(&self, rest_api_id: &str, stage_name: &str) -> Result<(), String>;

    fn delete_rest_api(&self, rest_api_id: &str) -> Result<(), String>;
}

pub struct SdkRestApiService {
    client: aws_sdk_apigateway::Client,
}

impl SdkRestApiService {
    pub fn new(client: aws_sdk_apigateway::Client) -> Self {
        Self { client }
    }
}

impl RestApiService for SdkRestApiService {
    fn create_rest_api(&self, api_name: &str) -> Result<String, String> {
        let client = self.client.clone();
        let name = api_name.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let output = client
                    .create_rest_api()
                    .name(&name)
                    .send()
                    .await
                    .map_err(|error| format!("failed to create REST API '{name}': {error}"))?;
                output
                    .id()
                    .map(ToString::to_string)
                    .ok_or_else(|| "create-rest-api response had no api id".to_string())
            })
        })
    }

    fn root_resource_id(&self, rest_api_id: &str) -> Result<String, String> {
        let client = self.client.clone();
        let api_id = rest_api_id.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let output = client
                    .get_resources()
                    .rest_api_id(&api_id)
                    .send()
                    .await
                    .map_err(|error| {
                        format!("failed to list resources of API '{api_id}': {error}")
                    })?;
                output
                    .items()
                    .first()
                    .and_then(|resource| resource.id())
                    .map(ToString::to_string)
                    .ok_or_else(|| format!("API '{api_id}' has no root resource"))
            })
        })
    }

    fn create_resource(
        &self,
        rest_api_id: &str,
        parent_id: &str,
        path_part: &str,
    ) -> Result<String, String> {
        let client = self.client.clone();
        let api_id = rest_api_id.to_string();
        let parent = parent_id.to_string();
        let path = path_part.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let output = client
                    .create_resource()
                    .rest_api_id(&api_id)
                    .parent_id(parent)
                    .path_part(&path)
                    .send()
                    .await
                    .map_err(|error| {
                        format!("failed to create resource '{path}' on API '{api_id}': {error}")
                    })?;
                output
                    .id()
                    .map(ToString::to_string)
                    .ok_or_else(|| "create-resource response had no resource id".to_string())
            })
        })
    }

    fn put_post_method(&self, rest_api_id: &str, resource_id: &str) -> Result<(), String> {
        let client = self.client.clone();
        let api_id = rest_api_id.to_string();
        let resource = resource_id.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .put_method()
                    .rest_api_id(&api_id)
                    .resource_id(&resource)
                    .http_method("POST")
                    .authorization_type("NONE")
                    .api_key_required(true)
                    .send()
                    .await
                    .map_err(|error| {
                        format!("failed to put POST method on API '{api_id}': {error}")
                    })?;

                client
                    .put_method_response()
                    .rest_api_id(&api_id)
                    .resource_id(&resource)
                    .http_method("POST")
                    .status_code("200")
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|error| {
                        format!("failed to put POST method response on API '{api_id}': {error}")
                    })
            })
        })
    }

    fn put_lambda_integration(
        &self,
        rest_api_id: &str,
        resource_id: &str,
        invocation_uri: &str,
    ) -> Result<(), String> {
        let client = self.client.clone();
        let api_id = rest_api_id.to_string();
        let resource = resource_id.to_string();
        let uri = invocation_uri.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .put_integration()
                    .rest_api_id(&api_id)
                    .resource_id(&resource)
                    .http_method("POST")
                    .r#type(IntegrationType::Aws)
                    .integration_http_method("POST")
                    .uri(uri)
                    .send()
                    .await
                    .map_err(|error| {
                        format!("failed to put integration on API '{api_id}': {error}")
                    })?;

                client
                    .put_integration_response()
                    .rest_api_id(&api_id)
                    .resource_id(&resource)
                    .http_method("POST")
                    .status_code("200")
                    .selection_pattern(".*")
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|error| {
                        format!("failed to put integration response on API '{api_id}': {error}")
                    })
            })
        })
    }

    fn create_deployment(&self, rest_api_id: &str, stage_name: &str) -> Result<(), String> {
        let client = self.client.clone();
        let api_id = rest_api_id.to_string();
        let stage = stage_name.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .create_deployment()
                    .rest_api_id(&api_id)
                    .stage_name(stage)
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|error| format!("failed to deploy API '{api_id}': {error}"))
            })
        })
    }

    fn delete_rest_api(&self, rest_api_id: &str) -> Result<(), String> {
        let client = self.client.clone();
        let api_id = rest_api_id.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .delete_rest_api()
                    .rest_api_id(&api_id)
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|error| format!("failed to delete REST API '{api_id}': {error}"))
            })
        })
    }
}
