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

use crate::constants::*;
use crate::imds::send_with_timeout;
use crate::Credential;
use async_trait::async_trait;
use bytes::Bytes;
use http::{Method, StatusCode};
use log::debug;
use quick_xml::de;
use searchgate_core::time::parse_rfc3339;
use searchgate_core::utils::Redact;
use searchgate_core::{Context, Error, ProvideCredential, Result};
use serde::Deserialize;
use std::fmt::{self, Debug};
use std::time::Duration;

const STS_TIMEOUT: Duration = Duration::from_secs(10);

/// AssumeRoleWithWebIdentityCredentialProvider exchanges an OIDC token for
/// role credentials through STS, the way EKS service accounts (IRSA) work.
///
/// Reads `AWS_ROLE_ARN` and `AWS_WEB_IDENTITY_TOKEN_FILE`; the provider is
/// skipped unless both are set. `AWS_ROLE_SESSION_NAME` names the session and
/// `AWS_STS_REGIONAL_ENDPOINTS=regional` selects the STS endpoint of
/// `AWS_REGION`.
///
/// References:
/// - [AssumeRoleWithWebIdentity](https://docs.aws.amazon.com/STS/latest/APIReference/API_AssumeRoleWithWebIdentity.html)
#[derive(Debug, Default, Clone)]
pub struct AssumeRoleWithWebIdentityCredentialProvider {
    role_arn: Option<String>,
    role_session_name: Option<String>,
    web_identity_token_file: Option<String>,
    region: Option<String>,
    use_regional_sts_endpoint: Option<bool>,
    endpoint: Option<String>,
}

impl AssumeRoleWithWebIdentityCredentialProvider {
    /// Create a new provider that reads its settings from the environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the role to assume.
    pub fn with_role_arn(mut self, role_arn: impl Into<String>) -> Self {
        self.role_arn = Some(role_arn.into());
        self
    }

    /// Set the file holding the web identity token.
    pub fn with_web_identity_token_file(mut self, path: impl Into<String>) -> Self {
        self.web_identity_token_file = Some(path.into());
        self
    }

    /// Set the role session name.
    pub fn with_role_session_name(mut self, name: impl Into<String>) -> Self {
        self.role_session_name = Some(name.into());
        self
    }

    /// Set the region used for the regional STS endpoint.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Call the regional STS endpoint instead of the global one.
    pub fn with_regional_sts_endpoint(mut self) -> Self {
        self.use_regional_sts_endpoint = Some(true);
        self
    }

    /// Call STS at `endpoint`, like `http://localhost:4566`, instead of AWS.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    fn endpoint(&self, ctx: &Context) -> Result<String> {
        if let Some(endpoint) = &self.endpoint {
            return Ok(endpoint.trim_end_matches('/').to_string());
        }

        let region = self.region.clone().or_else(|| ctx.env_var(AWS_REGION));
        let use_regional = self.use_regional_sts_endpoint.unwrap_or_else(|| {
            ctx.env_var(AWS_STS_REGIONAL_ENDPOINTS)
                .is_some_and(|v| v == "regional")
        });
        Ok(format!("https://{}", sts_host(region.as_deref(), use_regional)?))
    }
}

/// STS host for `region`, global unless `use_regional` is set.
fn sts_host(region: Option<&str>, use_regional: bool) -> Result<String> {
    let region = region.unwrap_or_default();
    let suffix = if region.starts_with("cn-") {
        "amazonaws.com.cn"
    } else {
        "amazonaws.com"
    };

    if use_regional {
        if region.is_empty() {
            return Err(Error::config_invalid("regional sts endpoint requires a region"));
        }
        Ok(format!("sts.{region}.{suffix}"))
    } else {
        Ok(format!("sts.{suffix}"))
    }
}

#[async_trait]
impl ProvideCredential for AssumeRoleWithWebIdentityCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let envs = ctx.env_vars();

        let role_arn = self
            .role_arn
            .clone()
            .or_else(|| envs.get(AWS_ROLE_ARN).cloned());
        let token_file = self
            .web_identity_token_file
            .clone()
            .or_else(|| envs.get(AWS_WEB_IDENTITY_TOKEN_FILE).cloned());
        let (Some(role_arn), Some(token_file)) = (role_arn, token_file) else {
            return Ok(None);
        };

        let token = ctx.file_read_as_string(&token_file).await.map_err(|e| {
            Error::config_invalid(format!("failed to read web identity token file {token_file}"))
                .with_source(e)
        })?;
        let session_name = self
            .role_session_name
            .clone()
            .or_else(|| envs.get(AWS_ROLE_SESSION_NAME).cloned())
            .unwrap_or_else(|| "searchgate".to_string());

        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("Action", "AssumeRoleWithWebIdentity")
            .append_pair("RoleArn", &role_arn)
            .append_pair("WebIdentityToken", token.trim())
            .append_pair("Version", "2011-06-15")
            .append_pair("RoleSessionName", &session_name)
            .finish();
        let endpoint = self.endpoint(ctx)?;
        let req = http::Request::builder()
            .method(Method::GET)
            .uri(format!("{endpoint}/?{query}"))
            .body(Bytes::new())?;

        let resp = send_with_timeout(ctx, req, STS_TIMEOUT).await.map_err(|e| {
            Error::unexpected(format!("failed to call AssumeRoleWithWebIdentity on {endpoint}"))
                .with_source(e)
        })?;
        if resp.status() != StatusCode::OK {
            return Err(sts_error(resp.status(), resp.body()));
        }

        let resp: AssumeRoleWithWebIdentityResponse = de::from_str(resp.body()).map_err(|e| {
            Error::unexpected("failed to parse AssumeRoleWithWebIdentity response").with_source(e)
        })?;
        let cred = resp.result.credentials;
        debug!("assumed role {role_arn} with web identity");

        Ok(Some(Credential {
            access_key_id: cred.access_key_id,
            secret_access_key: cred.secret_access_key,
            session_token: Some(cred.session_token),
            expires_in: Some(parse_rfc3339(&cred.expiration)?),
        }))
    }
}

/// Map an STS error document to an error, keeping the raw body when it does
/// not parse.
fn sts_error(status: StatusCode, body: &str) -> Error {
    let detail = de::from_str::<StsErrorResponse>(body)
        .map(|v| format!("[{}] {}", v.error.code, v.error.message))
        .unwrap_or_else(|_| body.to_string());
    let message = format!("AssumeRoleWithWebIdentity failed with {status}: {detail}");

    if status == StatusCode::FORBIDDEN || status == StatusCode::BAD_REQUEST {
        Error::credential_invalid(message)
    } else {
        Error::unexpected(message)
    }
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct AssumeRoleWithWebIdentityResponse {
    #[serde(rename = "AssumeRoleWithWebIdentityResult")]
    result: AssumeRoleWithWebIdentityResult,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct AssumeRoleWithWebIdentityResult {
    credentials: AssumeRoleWithWebIdentityCredentials,
}

#[derive(Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct AssumeRoleWithWebIdentityCredentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: String,
    expiration: String,
}

impl Debug for AssumeRoleWithWebIdentityCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssumeRoleWithWebIdentityCredentials")
            .field("access_key_id", &Redact::from(&self.access_key_id))
            .field("secret_access_key", &Redact::from(&self.secret_access_key))
            .field("session_token", &Redact::from(&self.session_token))
            .field("expiration", &self.expiration)
            .finish()
    }
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct StsErrorResponse {
    error: StsErrorDetail,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct StsErrorDetail {
    code: String,
    message: String,
}
