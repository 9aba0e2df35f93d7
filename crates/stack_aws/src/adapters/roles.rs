#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDescriptor {
    pub role_name: String,
    pub arn: String,
}

pub trait RoleStore {
    /// Looks up an existing role by name.
    fn get_role(&self, role_name: &str) -> Result<RoleDescriptor, String>;

    /// Creates a role with the given trust policy.
    fn create_role(
        &self,
        role_name: &str,
        assume_role_policy_json: &str,
    ) -> Result<RoleDescriptor, String>;
}

pub struct SdkRoleStore {
    client: aws_sdk_iam::Client,
}

impl SdkRoleStore {
    pub fn new(client: aws_sdk_iam::Client) -> Self {
        Self { client }
    }
}

fn descriptor(role: &aws_sdk_iam::types::Role) -> RoleDescriptor {
    RoleDescriptor {
        role_name: role.role_name().to_string(),
        arn: role.arn().to_string(),
    }
}

impl RoleStore for SdkRoleStore {
    fn get_role(&self, role_name: &str) -> Result<RoleDescriptor, String> {
        let client = self.client.clone();
        let name = role_name.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let output = client
                    .get_role()
                    .role_name(&name)
                    .send()
                    .await
                    .map_err(|error| format!("failed to look up role '{name}': {error}"))?;
                output
                    .role()
                    .map(descriptor)
                    .ok_or_else(|| format!("get-role response for '{name}' had no role"))
            })
        })
    }

    fn create_role(
        &self,
        role_name: &str,
        assume_role_policy_json: &str,
    ) -> Result<RoleDescriptor, String> {
        let client = self.client.clone();
        let name = role_name.to_string();
        let policy = assume_role_policy_json.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let output = client
                    .create_role()
                    .role_name(&name)
                    .assume_role_policy_document(policy)
                    .send()
                    .await
                    .map_err(|error| format!("failed to create role '{name}': {error}"))?;
                output
                    .role()
                    .map(descriptor)
                    .ok_or_else(|| format!("create-role response for '{name}' had no role"))
            })
        })
    }
}
