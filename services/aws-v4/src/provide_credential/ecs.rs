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
use crate::imds::{send_with_timeout, METADATA_TIMEOUT};
use crate::Credential;
use async_trait::async_trait;
use bytes::Bytes;
use http::header::AUTHORIZATION;
use http::{Method, StatusCode};
use log::debug;
use searchgate_core::time::parse_rfc3339;
use searchgate_core::utils::Redact;
use searchgate_core::{Context, Error, ProvideCredential, Result};
use serde::Deserialize;
use std::fmt::{self, Debug};
use std::time::Duration;

/// EcsCredentialProvider loads task role credentials from the container
/// credentials endpoint of ECS, EKS Pod Identity and similar runtimes.
///
/// - `AWS_CONTAINER_CREDENTIALS_RELATIVE_URI` is resolved against
///   `http://169.254.170.2`.
/// - Otherwise `AWS_CONTAINER_CREDENTIALS_FULL_URI` is used as is.
/// - `AWS_CONTAINER_AUTHORIZATION_TOKEN`, when set, is sent as the
///   `Authorization` header.
///
/// References:
/// - [IAM roles for tasks](https://docs.aws.amazon.com/AmazonECS/latest/developerguide/task-iam-roles.html)
#[derive(Debug, Clone)]
pub struct EcsCredentialProvider {
    endpoint: Option<String>,
    timeout: Duration,
}

impl Default for EcsCredentialProvider {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout: METADATA_TIMEOUT,
        }
    }
}

impl EcsCredentialProvider {
    /// Create a new `EcsCredentialProvider` instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the endpoint relative uris are resolved against.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the timeout for the credentials request.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl ProvideCredential for EcsCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let envs = ctx.env_vars();

        let url = match (
            envs.get(AWS_CONTAINER_CREDENTIALS_RELATIVE_URI),
            envs.get(AWS_CONTAINER_CREDENTIALS_FULL_URI),
        ) {
            (Some(relative), _) => {
                let endpoint = self.endpoint.as_deref().unwrap_or(ECS_CONTAINER_ENDPOINT);
                format!("{}{relative}", endpoint.trim_end_matches('/'))
            }
            (None, Some(full)) => full.clone(),
            (None, None) => return Ok(None),
        };

        let mut req = http::Request::builder().method(Method::GET).uri(&url);
        if let Some(token) = envs.get(AWS_CONTAINER_AUTHORIZATION_TOKEN) {
            req = req.header(AUTHORIZATION, token);
        }
        let req = req.body(Bytes::new())?;

        let resp = send_with_timeout(ctx, req, self.timeout)
            .await
            .map_err(|e| Error::unexpected("failed to fetch container credentials").with_source(e))?;
        if resp.status() != StatusCode::OK {
            return Err(Error::unexpected(format!(
                "container credentials request to {url} failed with {}: {}",
                resp.status(),
                resp.body()
            )));
        }

        let cred: ContainerCredentials = serde_json::from_str(resp.body()).map_err(|e| {
            Error::unexpected("failed to parse container credentials").with_source(e)
        })?;
        debug!("loaded container credential from {url}");

        Ok(Some(Credential {
            access_key_id: cred.access_key_id,
            secret_access_key: cred.secret_access_key,
            session_token: Some(cred.token),
            expires_in: Some(parse_rfc3339(&cred.expiration)?),
        }))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ContainerCredentials {
    access_key_id: String,
    secret_access_key: String,
    token: String,
    expiration: String,
}

impl Debug for ContainerCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerCredentials")
            .field("access_key_id", &Redact::from(&self.access_key_id))
            .field("secret_access_key", &Redact::from(&self.secret_access_key))
            .field("token", &Redact::from(&self.token))
            .field("expiration", &self.expiration)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server::TestServer;
    use pretty_assertions::assert_eq;
    use searchgate_core::StaticEnv;
    use searchgate_http_send_reqwest::ReqwestHttpSend;
    use std::collections::HashMap;

    const CREDENTIALS: &str = r#"{"AccessKeyId":"ASIAECSEXAMPLE","SecretAccessKey":"ecs/secret/EXAMPLEKEY","Token":"ecs-session-token","Expiration":"2024-05-01T16:00:00Z","RoleArn":"arn:aws:iam::123456789012:role/search"}"#;

    fn ctx(envs: &[(&str, &str)]) -> Context {
        Context::new()
            .with_http_send(ReqwestHttpSend::default())
            .with_env(StaticEnv {
                home_dir: None,
                envs: envs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect::<HashMap<_, _>>(),
            })
    }

    #[tokio::test]
    async fn test_full_uri_with_authorization() -> anyhow::Result<()> {
        let _ = env_logger::builder().is_test(true).try_init();
        let server = TestServer::start(&[("GET", "/v1/credentials", 200, CREDENTIALS)]).await;

        let full_uri = format!("{}/v1/credentials", server.url());
        let cred = EcsCredentialProvider::new()
            .provide_credential(&ctx(&[
                (AWS_CONTAINER_CREDENTIALS_FULL_URI, &full_uri),
                (AWS_CONTAINER_AUTHORIZATION_TOKEN, "Bearer pod-identity"),
            ]))
            .await?
            .expect("credential must load");

        assert_eq!(cred.access_key_id, "ASIAECSEXAMPLE");
        assert_eq!(cred.session_token.as_deref(), Some("ecs-session-token"));
        assert_eq!(server.seen()[0].headers["authorization"], "Bearer pod-identity");
        Ok(())
    }

    #[tokio::test]
    async fn test_relative_uri_wins() -> anyhow::Result<()> {
        let server = TestServer::start(&[("GET", "/v2/credentials/task-1", 200, CREDENTIALS)]).await;

        let cred = EcsCredentialProvider::new()
            .with_endpoint(server.url())
            .provide_credential(&ctx(&[
                (AWS_CONTAINER_CREDENTIALS_RELATIVE_URI, "/v2/credentials/task-1"),
                (AWS_CONTAINER_CREDENTIALS_FULL_URI, "http://127.0.0.1:1/never"),
            ]))
            .await?
            .expect("credential must load");

        assert_eq!(cred.secret_access_key, "ecs/secret/EXAMPLEKEY");
        let seen = server.seen();
        assert_eq!(seen.len(), 1);
        assert!(!seen[0].headers.contains_key("authorization"));
        Ok(())
    }

    #[tokio::test]
    async fn test_not_in_container() -> anyhow::Result<()> {
        let cred = EcsCredentialProvider::new().provide_credential(&ctx(&[])).await?;
        assert!(cred.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_endpoint_error_status() {
        let server = TestServer::start(&[]).await;

        let full_uri = format!("{}/v1/credentials", server.url());
        let err = EcsCredentialProvider::new()
            .provide_credential(&ctx(&[(AWS_CONTAINER_CREDENTIALS_FULL_URI, &full_uri)]))
            .await
            .expect_err("404 must fail");
        assert!(err.to_string().contains("404"));
    }
}
