//! Tool-backed template helpers.
//!
//! Each bound tool becomes a helper named after its id, lowercased with `.`
//! replaced by `_`. Helpers call the dispatcher synchronously from the
//! blocking render thread through the render scope installed by the
//! renderer.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::sync::Arc;

use handlebars::{
    Context, Handlebars, Helper, HelperDef, HelperResult, Output, RenderContext,
    RenderError as TemplateRenderError, RenderErrorReason, ScopedJson,
};
use serde_json::{Map, Value};
use tokio::runtime::Handle;

use ptooling::{CallContext, ToolDispatcher, ToolError};

use crate::clock::ToolClock;

thread_local! {
    static ACTIVE_SCOPE: RefCell<Option<ScopeState>> = const { RefCell::new(None) };
}

struct ScopeState {
    handle: Handle,
    context: CallContext,
    clock: Arc<ToolClock>,
    failure: Option<ToolError>,
}

/// Makes the runtime handle and call context visible to tool helpers on the
/// current thread until dropped.
pub(crate) struct RenderScope {
    _not_send: std::marker::PhantomData<*const ()>,
}

impl RenderScope {
    pub(crate) fn enter(handle: Handle, context: CallContext, clock: Arc<ToolClock>) -> Self {
        ACTIVE_SCOPE.with(|scope| {
            *scope.borrow_mut() = Some(ScopeState {
                handle,
                context,
                clock,
                failure: None,
            });
        });
        Self {
            _not_send: std::marker::PhantomData,
        }
    }

    /// The first tool failure raised while this scope was active.
    pub(crate) fn take_failure(&self) -> Option<ToolError> {
        ACTIVE_SCOPE.with(|scope| {
            scope
                .borrow_mut()
                .as_mut()
                .and_then(|state| state.failure.take())
        })
    }
}

impl Drop for RenderScope {
    fn drop(&mut self) {
        ACTIVE_SCOPE.with(|scope| scope.borrow_mut().take());
    }
}

pub fn helper_name(tool_id: &str) -> String {
    tool_id.to_lowercase().replace('.', "_")
}

/// Helper that forwards its arguments to one tool.
#[derive(Clone)]
pub struct ToolInvoker {
    tool_id: String,
    dispatcher: Arc<ToolDispatcher>,
}

impl std::fmt::Debug for ToolInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolInvoker")
            .field("tool_id", &self.tool_id)
            .finish()
    }
}

impl ToolInvoker {
    pub fn new(tool_id: impl Into<String>, dispatcher: Arc<ToolDispatcher>) -> Self {
        Self {
            tool_id: tool_id.into(),
            dispatcher,
        }
    }

    pub fn tool_id(&self) -> &str {
        &self.tool_id
    }

    fn invoke(&self, args: Value) -> Result<Value, TemplateRenderError> {
        let scope = ACTIVE_SCOPE.with(|scope| {
            scope.borrow().as_ref().map(|state| {
                (
                    state.handle.clone(),
                    state.context.clone(),
                    Arc::clone(&state.clock),
                )
            })
        });
        let Some((handle, context, clock)) = scope else {
            return Err(RenderErrorReason::Other(format!(
                "tool helper '{}' used outside of a render",
                self.tool_id
            ))
            .into());
        };

        let result = {
            let _timing = clock.start();
            handle.block_on(self.dispatcher.call(&context, &self.tool_id, args))
        };

        result.map_err(|err| {
            let message = err.to_string();
            ACTIVE_SCOPE.with(|scope| {
                if let Some(state) = scope.borrow_mut().as_mut() {
                    state.failure.get_or_insert(err);
                }
            });
            RenderErrorReason::Other(message).into()
        })
    }
}

/// Hash params win, then a single positional, then all positionals as an
/// array, then the template's own `args`.
fn helper_args(h: &Helper<'_>, ctx: &Context) -> Value {
    if !h.hash().is_empty() {
        let object: Map<String, Value> = h
            .hash()
            .iter()
            .map(|(key, value)| ((*key).to_string(), value.value().clone()))
            .collect();
        return Value::Object(object);
    }

    match h.params().as_slice() {
        [] => ctx
            .data()
            .get("args")
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new())),
        [single] => single.value().clone(),
        many => Value::Array(many.iter().map(|param| param.value().clone()).collect()),
    }
}

/// Strings render raw; everything else renders as compact JSON.
pub(crate) fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl HelperDef for ToolInvoker {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        ctx: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'rc>, TemplateRenderError> {
        self.invoke(helper_args(h, ctx)).map(ScopedJson::Derived)
    }

    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        ctx: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let value = self.invoke(helper_args(h, ctx))?;
        out.write(&display_value(&value))?;
        Ok(())
    }
}

/// Helper name to tool invoker, rebuilt whenever the tool set changes.
#[derive(Debug, Clone, Default)]
pub struct FunctionTable {
    helpers: BTreeMap<String, ToolInvoker>,
}

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// One helper per tool currently bound in `dispatcher`.
    pub fn from_dispatcher(dispatcher: &Arc<ToolDispatcher>) -> Self {
        let mut table = Self::new();
        for tool_id in dispatcher.tool_ids() {
            table.insert(ToolInvoker::new(tool_id, Arc::clone(dispatcher)));
        }
        table
    }

    /// Adds `invoker` unless its helper name is taken; returns whether it was added.
    pub fn insert(&mut self, invoker: ToolInvoker) -> bool {
        let name = helper_name(invoker.tool_id());
        if let Some(existing) = self.helpers.get(&name) {
            tracing::warn!(
                helper = %name,
                kept = %existing.tool_id(),
                dropped = %invoker.tool_id(),
                "helper name collision"
            );
            return false;
        }
        self.helpers.insert(name, invoker);
        true
    }

    pub fn get(&self, name: &str) -> Option<&ToolInvoker> {
        self.helpers.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.helpers.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ToolInvoker)> {
        self.helpers.iter().map(|(name, invoker)| (name.as_str(), invoker))
    }

    pub fn len(&self) -> usize {
        self.helpers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.helpers.is_empty()
    }
}
