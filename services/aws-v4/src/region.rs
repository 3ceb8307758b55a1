use crate::constants::{AWS_DEFAULT_REGION, AWS_REGION};
use crate::imds::Imds;
use crate::profile_file::{config_file_path, config_section_name, load_ini, profile_name, DEFAULT_PROFILE};
use log::{debug, warn};
use searchgate_core::{Context, Result};

/// DefaultRegionProvider resolves the AWS region the way the AWS SDKs do.
///
/// Resolution order:
///
/// 1. `AWS_REGION`
/// 2. `AWS_DEFAULT_REGION`
/// 3. `region` of the selected profile in the shared config file
/// 4. the placement region of the EC2 instance, read through IMDSv2 unless
///    `AWS_EC2_METADATA_DISABLED=true`
#[derive(Debug, Default, Clone)]
pub struct DefaultRegionProvider {
    region: Option<String>,
    config_file: Option<String>,
    imds: Imds,
}

impl DefaultRegionProvider {
    /// Create a new region provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a fixed region instead of resolving it.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Set the path to the config file.
    pub fn with_config_file(mut self, path: impl Into<String>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Set the endpoint of the instance metadata service.
    pub fn with_imds_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.imds = self.imds.with_endpoint(endpoint);
        self
    }

    /// Resolve the region, `None` if no source has one.
    pub async fn provide_region(&self, ctx: &Context) -> Result<Option<String>> {
        if let Some(region) = &self.region {
            return Ok(Some(region.clone()));
        }

        for key in [AWS_REGION, AWS_DEFAULT_REGION] {
            if let Some(region) = ctx.env_var(key).filter(|v| !v.is_empty()) {
                debug!("region {region} loaded from {key}");
                return Ok(Some(region));
            }
        }

        if let Some(region) = self.profile_region(ctx).await? {
            return Ok(Some(region));
        }

        if Imds::is_disabled(ctx) {
            return Ok(None);
        }
        match self.imds.get(ctx, "/latest/meta-data/placement/region").await {
            Ok(region) if !region.trim().is_empty() => {
                let region = region.trim().to_string();
                debug!("region {region} loaded from imds");
                Ok(Some(region))
            }
            Ok(_) => Ok(None),
            Err(err) => {
                warn!("failed to load region from imds: {err}");
                Ok(None)
            }
        }
    }

    async fn profile_region(&self, ctx: &Context) -> Result<Option<String>> {
        let path = config_file_path(ctx, self.config_file.as_deref());
        let Some(conf) = load_ini(ctx, &path).await? else {
            return Ok(None);
        };
        let profile = profile_name(ctx, DEFAULT_PROFILE);
        let region = conf
            .section(Some(config_section_name(&profile)))
            .and_then(|props| props.get("region"))
            .map(|v| v.to_string());
        debug!("region {region:?} loaded from profile {profile}");
        Ok(region)
    }
}
