use crate::provide_credential::{
    AssumeRoleWithWebIdentityCredentialProvider, EcsCredentialProvider, EnvCredentialProvider,
    ImdsCredentialProvider, ProfileCredentialProvider,
};
use crate::Credential;
use async_trait::async_trait;
use searchgate_core::{Context, ProvideCredential, ProvideCredentialChain, Result};

/// DefaultCredentialProvider tries the ambient credential sources in order.
///
/// Resolution order:
///
/// 1. Environment variables
/// 2. Web identity token exchanged through STS (`AWS_ROLE_ARN` and
///    `AWS_WEB_IDENTITY_TOKEN_FILE`)
/// 3. Shared credentials file (`~/.aws/credentials`), then the shared config
///    file (`~/.aws/config`)
/// 4. Container credentials endpoint (ECS, EKS Pod Identity)
/// 5. EC2 instance metadata (IMDSv2)
///
/// Sources that fail are logged and skipped.
#[derive(Debug)]
pub struct DefaultCredentialProvider {
    chain: ProvideCredentialChain<Credential>,
}

impl Default for DefaultCredentialProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultCredentialProvider {
    /// Create a new `DefaultCredentialProvider` instance.
    pub fn new() -> Self {
        let chain = ProvideCredentialChain::new()
            .push(EnvCredentialProvider::new())
            .push(AssumeRoleWithWebIdentityCredentialProvider::new())
            .push(ProfileCredentialProvider::new())
            .push(EcsCredentialProvider::new())
            .push(ImdsCredentialProvider::new());

        Self { chain }
    }
}

#[async_trait]
impl ProvideCredential for DefaultCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        self.chain.provide_credential(ctx).await
    }
}
