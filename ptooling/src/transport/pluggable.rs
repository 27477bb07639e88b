//! Extension point for a third tool protocol.

use serde_json::Value;

use pcache::Tool;
use pcommon::BoxFuture;

use crate::error::ToolError;

pub trait PluggableTransport: Send + Sync {
    fn call<'a>(&'a self, tool: &'a Tool, args: &'a Value) -> BoxFuture<'a, Result<Value, ToolError>>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UnimplementedPluggableTransport;

impl PluggableTransport for UnimplementedPluggableTransport {
    fn call<'a>(&'a self, tool: &'a Tool, _args: &'a Value) -> BoxFuture<'a, Result<Value, ToolError>> {
        Box::pin(async move {
            Err(ToolError::not_implemented(format!(
                "pluggable protocol is not implemented (tool '{}')",
                tool.name
            )))
        })
    }
}
