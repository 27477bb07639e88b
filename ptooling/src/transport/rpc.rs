//! gRPC transport that forwards JSON-encoded arguments as raw message bytes.

use std::time::Duration;

use bytes::{Buf, BufMut, Bytes};
use tonic::codec::{Codec, DecodeBuf, Decoder, EncodeBuf, Encoder};
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::Endpoint;
use tonic::{Code, Status};

use pcommon::BoxFuture;

use crate::error::ToolError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcRequest {
    pub url: String,
    pub service: String,
    pub method: String,
    pub payload: Vec<u8>,
}

impl RpcRequest {
    /// `/<service>/<method>`
    pub fn path(&self) -> String {
        format!("/{}/{}", self.service, self.method)
    }
}

pub trait RpcTransport: Send + Sync {
    /// Performs one unary call and returns the response bytes.
    fn invoke<'a>(&'a self, request: &'a RpcRequest) -> BoxFuture<'a, Result<Vec<u8>, ToolError>>;
}

#[derive(Debug, Clone)]
pub struct TonicRpcTransport {
    connect_timeout: Duration,
    call_timeout: Duration,
}

impl Default for TonicRpcTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(5), Duration::from_secs(10))
    }
}

impl TonicRpcTransport {
    pub fn new(connect_timeout: Duration, call_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            call_timeout,
        }
    }
}

impl RpcTransport for TonicRpcTransport {
    fn invoke<'a>(&'a self, request: &'a RpcRequest) -> BoxFuture<'a, Result<Vec<u8>, ToolError>> {
        Box::pin(async move {
            let url = if request.url.contains("://") {
                request.url.clone()
            } else {
                format!("http://{}", request.url)
            };

            let endpoint = Endpoint::from_shared(url)
                .map_err(|err| ToolError::invalid_definition(format!("rpc endpoint: {err}")))?
                .connect_timeout(self.connect_timeout);

            let channel = tokio::time::timeout(self.connect_timeout, endpoint.connect())
                .await
                .map_err(|_| ToolError::timeout("rpc dial timed out"))?
                .map_err(|err| ToolError::unavailable(format!("rpc dial failed: {err}")))?;

            let path = PathAndQuery::from_maybe_shared(request.path())
                .map_err(|err| ToolError::invalid_definition(format!("rpc method: {err}")))?;

            let mut client = tonic::client::Grpc::new(channel);
            client
                .ready()
                .await
                .map_err(|err| ToolError::unavailable(format!("rpc channel not ready: {err}")))?;

            let mut call = tonic::Request::new(Bytes::from(request.payload.clone()));
            call.set_timeout(self.call_timeout);

            let response = tokio::time::timeout(
                self.call_timeout,
                client.unary(call, path, RawBytesCodec),
            )
            .await
            .map_err(|_| ToolError::timeout("rpc call timed out"))?
            .map_err(classify_status)?;

            Ok(response.into_inner().to_vec())
        })
    }
}

fn classify_status(status: Status) -> ToolError {
    let message = format!("{:?}: {}", status.code(), status.message());
    match status.code() {
        Code::DeadlineExceeded => ToolError::timeout(message),
        Code::Unavailable => ToolError::unavailable(message),
        _ => ToolError::upstream(message),
    }
}

/// Passes message bytes through untouched.
#[derive(Debug, Clone, Copy, Default)]
struct RawBytesCodec;

impl Codec for RawBytesCodec {
    type Encode = Bytes;
    type Decode = Bytes;
    type Encoder = RawBytesCodec;
    type Decoder = RawBytesCodec;

    fn encoder(&mut self) -> Self::Encoder {
        RawBytesCodec
    }

    fn decoder(&mut self) -> Self::Decoder {
        RawBytesCodec
    }
}

impl Encoder for RawBytesCodec {
    type Item = Bytes;
    type Error = Status;

    fn encode(&mut self, item: Self::Item, dst: &mut EncodeBuf<'_>) -> Result<(), Self::Error> {
        dst.put(item);
        Ok(())
    }
}

impl Decoder for RawBytesCodec {
    type Item = Bytes;
    type Error = Status;

    fn decode(&mut self, src: &mut DecodeBuf<'_>) -> Result<Option<Self::Item>, Self::Error> {
        let remaining = src.remaining();
        Ok(Some(src.copy_to_bytes(remaining)))
    }
}
