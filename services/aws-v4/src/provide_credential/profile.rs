use crate::profile_file::{
    config_file_path, config_section_name, credentials_file_path, load_ini, profile_name,
    DEFAULT_PROFILE,
};
use crate::Credential;
use async_trait::async_trait;
use ini::Properties;
use log::debug;
use searchgate_core::{Context, ProvideCredential, Result};

/// ProfileCredentialProvider loads AWS credentials from the shared files.
///
/// This provider loads credentials from:
/// - `~/.aws/credentials` (or the path specified by `AWS_SHARED_CREDENTIALS_FILE`)
/// - `~/.aws/config` (or the path specified by `AWS_CONFIG_FILE`)
///
/// The profile to use is determined by:
/// 1. The `AWS_PROFILE` environment variable
/// 2. The profile specified via `with_profile()`
/// 3. Default to "default"
#[derive(Debug)]
pub struct ProfileCredentialProvider {
    profile: String,
    config_file: Option<String>,
    credentials_file: Option<String>,
}

impl Default for ProfileCredentialProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileCredentialProvider {
    /// Create a new ProfileCredentialProvider with default settings.
    pub fn new() -> Self {
        Self {
            profile: DEFAULT_PROFILE.to_string(),
            config_file: None,
            credentials_file: None,
        }
    }

    /// Set the profile name to use.
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    /// Set the path to the config file.
    pub fn with_config_file(mut self, path: impl Into<String>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Set the path to the credentials file.
    pub fn with_credentials_file(mut self, path: impl Into<String>) -> Self {
        self.credentials_file = Some(path.into());
        self
    }

    async fn load_from_credentials_file(
        &self,
        ctx: &Context,
        profile: &str,
    ) -> Result<Option<Credential>> {
        let path = credentials_file_path(ctx, self.credentials_file.as_deref());
        let Some(conf) = load_ini(ctx, &path).await? else {
            return Ok(None);
        };

        match conf.section(Some(profile)) {
            Some(props) => Ok(credential_from_props(props)),
            None => {
                debug!("profile {profile} not found in credentials file");
                Ok(None)
            }
        }
    }

    async fn load_from_config_file(
        &self,
        ctx: &Context,
        profile: &str,
    ) -> Result<Option<Credential>> {
        let path = config_file_path(ctx, self.config_file.as_deref());
        let Some(conf) = load_ini(ctx, &path).await? else {
            return Ok(None);
        };

        match conf.section(Some(config_section_name(profile))) {
            Some(props) => Ok(credential_from_props(props)),
            None => {
                debug!("section {profile} not found in config file");
                Ok(None)
            }
        }
    }
}

fn credential_from_props(props: &Properties) -> Option<Credential> {
    let access_key_id = props.get("aws_access_key_id")?;
    let secret_access_key = props.get("aws_secret_access_key")?;

    Some(Credential {
        access_key_id: access_key_id.to_string(),
        secret_access_key: secret_access_key.to_string(),
        session_token: props.get("aws_session_token").map(|s| s.to_string()),
        expires_in: None,
    })
}

#[async_trait]
impl ProvideCredential for ProfileCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let profile = profile_name(ctx, &self.profile);

        if let Some(cred) = self.load_from_credentials_file(ctx, &profile).await? {
            return Ok(Some(cred));
        }

        self.load_from_config_file(ctx, &profile).await
    }
}
