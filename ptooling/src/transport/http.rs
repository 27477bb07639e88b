//! REST transport trait and reqwest-based implementation.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;

use pcommon::BoxFuture;

use crate::error::ToolError;

/// Raw HTTP outcome; status classification happens in the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

pub trait HttpTransport: Send + Sync {
    /// Sends one POST with `body` as JSON. Only connection-level failures are errors.
    fn post_json<'a>(&'a self, url: &'a str, body: &'a Value)
    -> BoxFuture<'a, Result<HttpReply, ToolError>>;
}

#[derive(Debug, Clone)]
pub struct ReqwestHttpTransport {
    client: Client,
}

impl ReqwestHttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, ToolError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ToolError::invalid_definition(format!("http client: {err}")))?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl HttpTransport for ReqwestHttpTransport {
    fn post_json<'a>(
        &'a self,
        url: &'a str,
        body: &'a Value,
    ) -> BoxFuture<'a, Result<HttpReply, ToolError>> {
        Box::pin(async move {
            let payload = serde_json::to_vec(body)
                .map_err(|err| ToolError::invalid_arguments(err.to_string()))?;

            let response = self
                .client
                .post(url)
                .header(CONTENT_TYPE, "application/json")
                .body(payload)
                .send()
                .await
                .map_err(|err| {
                    if err.is_timeout() {
                        ToolError::timeout(err.to_string())
                    } else {
                        ToolError::transport(err.to_string())
                    }
                })?;

            let status = response.status().as_u16();
            let body = response
                .bytes()
                .await
                .map_err(|err| ToolError::transport(err.to_string()))?;

            Ok(HttpReply::new(status, body.to_vec()))
        })
    }
}
