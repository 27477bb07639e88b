//! Tool lookup, argument validation, protocol routing, and retry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;

use pcache::{Snapshot, SnapshotCell, Tool, ToolKind};

use crate::context::CallContext;
use crate::error::{ToolError, ToolErrorKind};
use crate::hooks::{NoopToolCallHooks, ToolCallHooks};
use crate::retry::{RetryPolicy, execute_with_retry};
use crate::stats::{CallStats, CallStatsBook};
use crate::transport::{
    HttpReply, HttpTransport, PluggableTransport, ReqwestHttpTransport, RpcRequest, RpcTransport,
    TonicRpcTransport, UnimplementedPluggableTransport,
};
use crate::validate::ArgumentValidator;

const BODY_EXCERPT_LIMIT: usize = 1024;

/// A tool paired with its compiled argument validator.
#[derive(Debug)]
pub struct BoundTool {
    pub id: String,
    pub tool: Tool,
    validator: ArgumentValidator,
}

pub type ToolTable = HashMap<String, Arc<BoundTool>>;

pub struct ToolDispatcher {
    tools: SnapshotCell<ToolTable>,
    http: Arc<dyn HttpTransport>,
    rpc: Arc<dyn RpcTransport>,
    pluggable: Arc<dyn PluggableTransport>,
    policy: RetryPolicy,
    hooks: Arc<dyn ToolCallHooks>,
    stats: CallStatsBook,
}

impl std::fmt::Debug for ToolDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDispatcher")
            .field("tools", &self.tools.load().len())
            .field("policy", &self.policy)
            .finish()
    }
}

impl ToolDispatcher {
    pub fn builder() -> ToolDispatcherBuilder {
        ToolDispatcherBuilder::default()
    }

    /// Rebuilds the tool table from a tools snapshot.
    ///
    /// Tools whose schema does not compile are left out. Returns the number
    /// of tools bound.
    pub fn bind(&self, tools: &Snapshot<Tool>) -> usize {
        let mut table = ToolTable::with_capacity(tools.len());
        for (id, tool) in tools.iter() {
            match ArgumentValidator::compile(&tool.parameters) {
                Ok(validator) => {
                    table.insert(
                        id.clone(),
                        Arc::new(BoundTool {
                            id: id.clone(),
                            tool: tool.clone(),
                            validator,
                        }),
                    );
                }
                Err(err) => {
                    tracing::warn!(tool_id = %id, error = %err, "skipping tool with invalid schema");
                }
            }
        }

        let bound = table.len();
        self.tools.store(table);
        bound
    }

    pub fn tool_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.tools.load().keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    pub fn contains(&self, tool_id: &str) -> bool {
        self.tools.load().contains_key(tool_id)
    }

    pub fn stats(&self, tool_id: &str) -> Option<CallStats> {
        self.stats.get(tool_id)
    }

    pub fn all_stats(&self) -> Vec<(String, CallStats)> {
        self.stats.all()
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn call(
        &self,
        context: &CallContext,
        tool_id: &str,
        args: Value,
    ) -> Result<Value, ToolError> {
        let started = Instant::now();
        self.hooks.on_call_start(tool_id, context);

        let result = self.call_inner(context, tool_id, args).await;
        let elapsed = started.elapsed();

        match &result {
            Ok((_, attempts)) => {
                self.stats.record_success(tool_id, elapsed);
                self.hooks.on_call_success(tool_id, *attempts, elapsed);
            }
            Err(err) => {
                if err.kind != ToolErrorKind::NotFound {
                    self.stats.record_failure(tool_id, elapsed, err.to_string());
                }
                self.hooks.on_call_failure(tool_id, err, elapsed);
            }
        }

        result.map(|(value, _)| value)
    }

    async fn call_inner(
        &self,
        context: &CallContext,
        tool_id: &str,
        args: Value,
    ) -> Result<(Value, u32), ToolError> {
        let bound = self.tools.load().get(tool_id).cloned().ok_or_else(|| {
            ToolError::not_found(format!("tool '{tool_id}' is not registered")).with_tool_id(tool_id)
        })?;

        bound
            .validator
            .validate(&args)
            .map_err(|err| err.with_tool_id(tool_id))?;

        if context.is_cancelled() {
            return Err(ToolError::cancelled("call cancelled before dispatch").with_tool_id(tool_id));
        }

        let dispatch = async {
            match bound.tool.kind {
                ToolKind::Restful => self.call_restful(&bound, &args).await,
                ToolKind::Rpc => self.call_rpc(&bound, &args).await,
                ToolKind::Pluggable => self.pluggable.call(&bound.tool, &args).await.map(|v| (v, 1)),
            }
        };

        tokio::select! {
            biased;
            _ = context.cancel.cancelled() => {
                Err(ToolError::cancelled("call cancelled by caller").with_tool_id(tool_id))
            }
            result = dispatch => result.map_err(|err| err.with_tool_id(tool_id)),
        }
    }

    async fn call_restful(&self, bound: &BoundTool, args: &Value) -> Result<(Value, u32), ToolError> {
        let endpoint = bound.tool.restful.as_ref().ok_or_else(|| {
            ToolError::invalid_definition("restful tool has no endpoint").with_tool_id(&bound.id)
        })?;
        let url = endpoint.url.as_str();

        execute_with_retry(
            &bound.id,
            &self.policy,
            self.hooks.as_ref(),
            |_| async move {
                let reply = self.http.post_json(url, args).await?;
                classify_reply(reply)
            },
            tokio::time::sleep,
        )
        .await
    }

    async fn call_rpc(&self, bound: &BoundTool, args: &Value) -> Result<(Value, u32), ToolError> {
        let endpoint = bound.tool.rpc.as_ref().ok_or_else(|| {
            ToolError::invalid_definition("rpc tool has no endpoint").with_tool_id(&bound.id)
        })?;
        let method = if endpoint.method.is_empty() {
            bound.tool.name.clone()
        } else {
            endpoint.method.clone()
        };
        let payload =
            serde_json::to_vec(args).map_err(|err| ToolError::invalid_arguments(err.to_string()))?;
        let request = RpcRequest {
            url: endpoint.url.clone(),
            service: bound.tool.module.clone(),
            method,
            payload,
        };
        let request = &request;

        execute_with_retry(
            &bound.id,
            &self.policy,
            self.hooks.as_ref(),
            |_| async move {
                let bytes = self.rpc.invoke(request).await?;
                serde_json::from_slice(&bytes)
                    .map_err(|err| ToolError::decode(format!("rpc response: {err}")))
            },
            tokio::time::sleep,
        )
        .await
    }
}

/// Maps an HTTP reply onto a result: 5xx retryable, 4xx terminal, else JSON.
fn classify_reply(reply: HttpReply) -> Result<Value, ToolError> {
    let status = reply.status;
    if status >= 500 {
        return Err(ToolError::unavailable(format!(
            "HTTP {status}: {}",
            body_excerpt(&reply.body)
        )));
    }
    if status >= 400 {
        return Err(ToolError::upstream(format!(
            "HTTP {status}: {}",
            body_excerpt(&reply.body)
        )));
    }
    if reply.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&reply.body)
        .map_err(|err| ToolError::decode(format!("response body: {err}")))
}

fn body_excerpt(body: &[u8]) -> String {
    let end = body.len().min(BODY_EXCERPT_LIMIT);
    String::from_utf8_lossy(&body[..end]).into_owned()
}

pub struct ToolDispatcherBuilder {
    http: Option<Arc<dyn HttpTransport>>,
    http_timeout: Duration,
    rpc: Option<Arc<dyn RpcTransport>>,
    pluggable: Arc<dyn PluggableTransport>,
    policy: RetryPolicy,
    hooks: Arc<dyn ToolCallHooks>,
}

impl Default for ToolDispatcherBuilder {
    fn default() -> Self {
        Self {
            http: None,
            http_timeout: Duration::from_secs(10),
            rpc: None,
            pluggable: Arc::new(UnimplementedPluggableTransport),
            policy: RetryPolicy::default(),
            hooks: Arc::new(NoopToolCallHooks),
        }
    }
}

impl ToolDispatcherBuilder {
    pub fn http_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.http = Some(transport);
        self
    }

    /// Client timeout for the default reqwest transport.
    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn rpc_transport(mut self, transport: Arc<dyn RpcTransport>) -> Self {
        self.rpc = Some(transport);
        self
    }

    pub fn pluggable_transport(mut self, transport: Arc<dyn PluggableTransport>) -> Self {
        self.pluggable = transport;
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn hooks(mut self, hooks: Arc<dyn ToolCallHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn build(self) -> Result<ToolDispatcher, ToolError> {
        let http = match self.http {
            Some(http) => http,
            None => Arc::new(ReqwestHttpTransport::new(self.http_timeout)?),
        };
        let rpc = self
            .rpc
            .unwrap_or_else(|| Arc::new(TonicRpcTransport::default()));

        Ok(ToolDispatcher {
            tools: SnapshotCell::new(ToolTable::new()),
            http,
            rpc,
            pluggable: self.pluggable,
            policy: self.policy,
            hooks: self.hooks,
            stats: CallStatsBook::default(),
        })
    }
}
