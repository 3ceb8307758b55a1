// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use crate::imds::Imds;
use crate::Credential;
use async_trait::async_trait;
use log::debug;
use searchgate_core::time::parse_rfc3339;
use searchgate_core::utils::Redact;
use searchgate_core::{Context, Error, ProvideCredential, Result};
use serde::Deserialize;
use std::fmt::{self, Debug};
use std::time::Duration;

const SECURITY_CREDENTIALS_PATH: &str = "/latest/meta-data/iam/security-credentials/";

/// ImdsCredentialProvider loads the credentials of the IAM role attached to
/// an EC2 instance through IMDSv2.
///
/// The metadata endpoint is taken from `AWS_EC2_METADATA_SERVICE_ENDPOINT`
/// and defaults to `http://169.254.169.254`. Setting
/// `AWS_EC2_METADATA_DISABLED=true` turns this provider off.
///
/// References:
/// - [Retrieve security credentials from instance metadata](https://docs.aws.amazon.com/AWSEC2/latest/UserGuide/iam-roles-for-amazon-ec2.html#instance-metadata-security-credentials)
#[derive(Debug, Default, Clone)]
pub struct ImdsCredentialProvider {
    imds: Imds,
}

impl ImdsCredentialProvider {
    /// Create a new `ImdsCredentialProvider` instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the endpoint for the metadata service.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.imds = self.imds.with_endpoint(endpoint);
        self
    }

    /// Set the timeout for each metadata request.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.imds = self.imds.with_timeout(timeout);
        self
    }
}

#[async_trait]
impl ProvideCredential for ImdsCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        if Imds::is_disabled(ctx) {
            debug!("imds is disabled, skipped");
            return Ok(None);
        }

        let roles = self.imds.get(ctx, SECURITY_CREDENTIALS_PATH).await?;
        let Some(role) = roles.lines().map(str::trim).find(|v| !v.is_empty()) else {
            return Err(Error::config_invalid("no iam role attached to ec2 instance"));
        };

        let content = self
            .imds
            .get(ctx, &format!("{SECURITY_CREDENTIALS_PATH}{role}"))
            .await?;
        let resp: InstanceCredentials = serde_json::from_str(&content).map_err(|e| {
            Error::unexpected("failed to parse imds credentials response").with_source(e)
        })?;
        if resp.code != "Success" {
            return Err(Error::credential_invalid(format!(
                "imds returned [{}] {} for role {role}",
                resp.code, resp.message
            )));
        }

        debug!("loaded credential of role {role} from imds");
        Ok(Some(Credential {
            access_key_id: resp.access_key_id,
            secret_access_key: resp.secret_access_key,
            session_token: Some(resp.token),
            expires_in: Some(parse_rfc3339(&resp.expiration)?),
        }))
    }
}

#[derive(Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct InstanceCredentials {
    code: String,
    message: String,
    access_key_id: String,
    secret_access_key: String,
    token: String,
    expiration: String,
}

impl Debug for InstanceCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceCredentials")
            .field("code", &self.code)
            .field("access_key_id", &Redact::from(&self.access_key_id))
            .field("secret_access_key", &Redact::from(&self.secret_access_key))
            .field("token", &Redact::from(&self.token))
            .field("expiration", &self.expiration)
            .finish()
    }
}
