//! Wire transports, one per tool protocol.

mod http;
mod pluggable;
mod rpc;

pub use http::{HttpReply, HttpTransport, ReqwestHttpTransport};
pub use pluggable::{PluggableTransport, UnimplementedPluggableTransport};
pub use rpc::{RpcRequest, RpcTransport, TonicRpcTransport};
