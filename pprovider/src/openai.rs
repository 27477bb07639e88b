//! OpenAI-compatible `/v1/chat/completions` provider over reqwest.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use pcommon::{BoxFuture, MetadataMap};

use crate::{ChatCompletion, Message, ModelProvider, ModelRequest, ProviderError, SecretString};

pub const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(30);

const ERROR_EXCERPT_LIMIT: usize = 512;

#[derive(Debug, Clone)]
pub struct OpenAiCompatibleProvider {
    client: Client,
    api_base: String,
    api_key: SecretString,
}

impl OpenAiCompatibleProvider {
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<SecretString>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ProviderError::other(format!("http client: {err}")))?;
        Ok(Self::with_client(client, api_base, api_key))
    }

    pub fn with_client(
        client: Client,
        api_base: impl Into<String>,
        api_key: impl Into<SecretString>,
    ) -> Self {
        Self {
            client,
            api_base: api_base.into(),
            api_key: api_key.into(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.api_base.trim_end_matches('/'))
    }
}

impl ModelProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    fn complete<'a>(
        &'a self,
        request: ModelRequest,
    ) -> BoxFuture<'a, Result<ChatCompletion, ProviderError>> {
        Box::pin(async move {
            request.validate()?;
            let body = ApiRequest::from(&request);

            let mut builder = self
                .client
                .post(self.endpoint())
                .headers(metadata_headers(&request.metadata))
                .json(&body);
            if !self.api_key.is_empty() {
                builder = builder.bearer_auth(self.api_key.expose());
            }

            let response = builder.send().await.map_err(|err| {
                if err.is_timeout() {
                    ProviderError::timeout(err.to_string())
                } else {
                    ProviderError::transport(err.to_string())
                }
            })?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let error = classify_status(status, &body);
                tracing::warn!(
                    model = %request.model,
                    status = status.as_u16(),
                    error_kind = ?error.kind,
                    "chat completion rejected"
                );
                return Err(error);
            }

            response
                .json::<ChatCompletion>()
                .await
                .map_err(|err| ProviderError::decode(format!("completion body: {err}")))
        })
    }
}

/// Request metadata as `x-` headers: `trace_id` is sent as `x-trace-id`.
fn metadata_headers(metadata: &MetadataMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(metadata.len());
    for (key, value) in metadata {
        let name = format!("x-{}", key.to_ascii_lowercase().replace('_', "-"));
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => tracing::debug!(key = %key, "skipping metadata that is not a valid header"),
        }
    }
    headers
}

fn classify_status(status: StatusCode, body: &str) -> ProviderError {
    let message = extract_error_message(body).unwrap_or_else(|| {
        let end = body
            .char_indices()
            .nth(ERROR_EXCERPT_LIMIT)
            .map_or(body.len(), |(index, _)| index);
        format!("LLM API error {status}: {}", &body[..end])
    });

    let error = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::authentication(message),
        StatusCode::TOO_MANY_REQUESTS => ProviderError::rate_limited(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => ProviderError::timeout(message),
        status if status.is_client_error() => ProviderError::invalid_request(message),
        status if status.is_server_error() => ProviderError::unavailable(message),
        _ => ProviderError::other(message),
    };
    error.with_status(status.as_u16())
}

fn extract_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ApiErrorEnvelope>(body)
        .ok()
        .map(|envelope| envelope.error.message)
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

impl<'a> From<&'a ModelRequest> for ApiRequest<'a> {
    fn from(request: &'a ModelRequest) -> Self {
        Self {
            model: &request.model,
            messages: &request.messages,
            temperature: request.options.temperature,
            max_tokens: request.options.max_tokens,
            top_p: request.options.top_p,
        }
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use serde_json::json;

    use super::{ApiRequest, classify_status, metadata_headers};
    use crate::{Message, ModelRequest, ProviderErrorKind, Role};
    use pcommon::{GenerationOptions, MetadataMap};

    #[test]
    fn metadata_becomes_prefixed_headers() {
        let metadata = MetadataMap::from([
            ("trace_id".to_string(), "trace-7".to_string()),
            ("prompt_id".to_string(), "greet".to_string()),
            ("bad key".to_string(), "dropped".to_string()),
            ("note".to_string(), "line\nbreak".to_string()),
        ]);

        let headers = metadata_headers(&metadata);

        assert_eq!(headers.len(), 2);
        assert_eq!(headers["x-trace-id"], "trace-7");
        assert_eq!(headers["x-prompt-id"], "greet");
    }

    #[test]
    fn statuses_map_to_error_kinds() {
        let cases = [
            (StatusCode::UNAUTHORIZED, ProviderErrorKind::Authentication),
            (StatusCode::FORBIDDEN, ProviderErrorKind::Authentication),
            (StatusCode::TOO_MANY_REQUESTS, ProviderErrorKind::RateLimited),
            (StatusCode::NOT_FOUND, ProviderErrorKind::InvalidRequest),
            (StatusCode::UNPROCESSABLE_ENTITY, ProviderErrorKind::InvalidRequest),
            (StatusCode::INTERNAL_SERVER_ERROR, ProviderErrorKind::Unavailable),
            (StatusCode::BAD_GATEWAY, ProviderErrorKind::Unavailable),
        ];

        for (status, kind) in cases {
            let error = classify_status(status, "");
            assert_eq!(error.kind, kind, "status {status}");
            assert_eq!(error.status, Some(status.as_u16()));
        }
    }

    #[test]
    fn structured_error_message_is_preferred() {
        let error = classify_status(
            StatusCode::BAD_REQUEST,
            r#"{"error":{"message":"model not found"}}"#,
        );
        assert_eq!(error.message, "model not found");
    }

    #[test]
    fn request_body_omits_unset_options() {
        let request = ModelRequest::new("gpt-4o-mini", vec![Message::new(Role::User, "hi")])
            .with_options(GenerationOptions::default().with_max_tokens(64));

        let body = serde_json::to_value(ApiRequest::from(&request)).expect("serialize");

        assert_eq!(
            body,
            json!({
                "model": "gpt-4o-mini",
                "messages": [{"role": "user", "content": "hi"}],
                "max_tokens": 64
            })
        );
    }
}
