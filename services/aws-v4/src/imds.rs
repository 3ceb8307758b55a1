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
use bytes::Bytes;
use http::header::CONTENT_LENGTH;
use http::{Method, Request, Response, StatusCode};
use log::debug;
use searchgate_core::time::{now, DateTime};
use searchgate_core::{Context, Error, Result};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Token lifetime asked from IMDS, the 6 hours AWS recommends.
const TOKEN_TTL_SECONDS: i64 = 21600;

/// Bound for one metadata call. Off AWS compute the link-local address
/// never answers, so this keeps the default chains from hanging.
pub(crate) const METADATA_TIMEOUT: Duration = Duration::from_secs(1);

/// Send `req` through the context, giving up after `timeout`.
pub(crate) async fn send_with_timeout(
    ctx: &Context,
    req: Request<Bytes>,
    timeout: Duration,
) -> Result<Response<String>> {
    let uri = req.uri().to_string();
    match tokio::time::timeout(timeout, ctx.http_send_as_string(req)).await {
        Ok(resp) => resp,
        Err(_) => Err(Error::timeout(format!(
            "no response from {uri} within {}ms",
            timeout.as_millis()
        ))),
    }
}

/// Client for the EC2 instance metadata service, speaking IMDSv2.
///
/// The session token is fetched once and reused until ten minutes before it
/// expires.
#[derive(Debug, Clone)]
pub(crate) struct Imds {
    endpoint: Option<String>,
    timeout: Duration,
    token: Arc<Mutex<(String, DateTime)>>,
}

impl Default for Imds {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout: METADATA_TIMEOUT,
            token: Arc::new(Mutex::new((String::new(), DateTime::default()))),
        }
    }
}

impl Imds {
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `AWS_EC2_METADATA_DISABLED=true` turns every IMDS lookup off.
    pub fn is_disabled(ctx: &Context) -> bool {
        ctx.env_var(AWS_EC2_METADATA_DISABLED)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    }

    fn endpoint(&self, ctx: &Context) -> String {
        let endpoint = self
            .endpoint
            .clone()
            .or_else(|| ctx.env_var(AWS_EC2_METADATA_SERVICE_ENDPOINT))
            .unwrap_or_else(|| EC2_METADATA_ENDPOINT.to_string());
        endpoint.trim_end_matches('/').to_string()
    }

    async fn token(&self, ctx: &Context) -> Result<String> {
        {
            let (token, expires_in) = self.token.lock().unwrap_or_else(|e| e.into_inner()).clone();
            if expires_in > now() {
                return Ok(token);
            }
        }

        let url = format!("{}/latest/api/token", self.endpoint(ctx));
        let req = http::Request::builder()
            .method(Method::PUT)
            .uri(&url)
            .header(CONTENT_LENGTH, "0")
            .header(X_AWS_EC2_METADATA_TOKEN_TTL_SECONDS, TOKEN_TTL_SECONDS.to_string())
            .body(Bytes::new())?;
        let resp = send_with_timeout(ctx, req, self.timeout)
            .await
            .map_err(|e| Error::unexpected("failed to fetch imds token").with_source(e))?;
        if resp.status() != StatusCode::OK {
            return Err(Error::unexpected(format!(
                "imds token request failed with {}: {}",
                resp.status(),
                resp.body()
            )));
        }

        let token = resp.into_body();
        let expires_in = now() + chrono::TimeDelta::seconds(TOKEN_TTL_SECONDS - 600);
        *self.token.lock().unwrap_or_else(|e| e.into_inner()) = (token.clone(), expires_in);
        debug!("fetched imds token from {url}");
        Ok(token)
    }

    /// GET `path` from the metadata service with a session token.
    pub async fn get(&self, ctx: &Context, path: &str) -> Result<String> {
        let token = self.token(ctx).await?;

        let url = format!("{}{path}", self.endpoint(ctx));
        let req = http::Request::builder()
            .method(Method::GET)
            .uri(&url)
            .header(X_AWS_EC2_METADATA_TOKEN, &token)
            .body(Bytes::new())?;
        let resp = send_with_timeout(ctx, req, self.timeout)
            .await
            .map_err(|e| Error::unexpected(format!("failed to fetch {path} from imds")).with_source(e))?;
        if resp.status() != StatusCode::OK {
            return Err(Error::unexpected(format!(
                "imds request for {path} failed with {}: {}",
                resp.status(),
                resp.body()
            )));
        }
        Ok(resp.into_body())
    }
}
