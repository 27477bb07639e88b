//! Tool dispatch for promptshell: schema validation, protocol routing, and retry.
//!
//! REST and RPC tools are retried on transient failures with linear backoff.
//! The pluggable protocol is an extension point that reports
//! [`ToolErrorKind::NotImplemented`] unless a transport is supplied.
//!
//! ```rust
//! use ptooling::{ToolError, ToolErrorKind};
//!
//! let failed = ToolError::call_failed(ToolError::unavailable("HTTP 502"), 3);
//! assert_eq!(failed.kind, ToolErrorKind::CallFailed);
//! assert_eq!(failed.root_cause().kind, ToolErrorKind::Unavailable);
//! ```

mod context;
mod dispatcher;
mod error;
mod hooks;
mod retry;
mod stats;
mod transport;
mod validate;

pub mod prelude {
    pub use crate::{
        CallContext, CallStats, HttpReply, HttpTransport, NoopToolCallHooks, PluggableTransport,
        RetryPolicy, RpcRequest, RpcTransport, ToolCallHooks, ToolDispatcher,
        ToolDispatcherBuilder, ToolError, ToolErrorKind,
    };
}

pub use context::CallContext;
pub use dispatcher::{BoundTool, ToolDispatcher, ToolDispatcherBuilder, ToolTable};
pub use error::{ToolError, ToolErrorKind};
pub use hooks::{NoopToolCallHooks, ToolCallHooks};
pub use retry::{RetryPolicy, execute_with_retry};
pub use stats::CallStats;
pub use transport::{
    HttpReply, HttpTransport, PluggableTransport, ReqwestHttpTransport, RpcRequest, RpcTransport,
    TonicRpcTransport, UnimplementedPluggableTransport,
};
pub use validate::ArgumentValidator;
