//! Compiles the prompt catalog into a handlebars registry.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use handlebars::{
    Context, Handlebars, Helper, HelperDef, HelperResult, Output, RenderContext,
    RenderError as TemplateRenderError, RenderErrorReason, ScopedJson,
};
use parking_lot::Mutex;
use serde_json::Value;

use pcache::{PromptBody, PromptCatalog, SnapshotCell};
use ptooling::ArgumentValidator;

use crate::error::RenderError;
use crate::functions::FunctionTable;

pub fn template_key(prompt_id: &str) -> String {
    format!("{prompt_id}.prompt")
}

pub fn message_key(prompt_id: &str, index: usize) -> String {
    format!("{prompt_id}.messages.{index}")
}

/// One compiled generation of templates and prompt argument validators.
pub struct TemplateSet {
    registry: Handlebars<'static>,
    validators: HashMap<String, ArgumentValidator>,
    revision: u64,
}

impl std::fmt::Debug for TemplateSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateSet")
            .field("templates", &self.registry.get_templates().len())
            .field("revision", &self.revision)
            .finish()
    }
}

impl TemplateSet {
    fn empty() -> Self {
        Self {
            registry: Handlebars::new(),
            validators: HashMap::new(),
            revision: 0,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.registry.has_template(key)
    }

    pub fn template_count(&self) -> usize {
        self.registry.get_templates().len()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn validator(&self, prompt_id: &str) -> Option<&ArgumentValidator> {
        self.validators.get(prompt_id)
    }

    pub(crate) fn render(&self, key: &str, context: &Value) -> Result<String, RenderError> {
        if !self.contains(key) {
            return Err(RenderError::TemplateUnavailable(key.to_string()));
        }
        self.registry
            .render(key, context)
            .map_err(|err| RenderError::Template {
                key: key.to_string(),
                message: err.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompileReport {
    pub compiled: usize,
    pub failed: usize,
    pub revision: u64,
}

/// Lets one helper instance be registered into every generation.
#[derive(Clone)]
struct SharedHelper(Arc<dyn HelperDef + Send + Sync>);

impl HelperDef for SharedHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        r: &'reg Handlebars<'reg>,
        ctx: &'rc Context,
        rc: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'rc>, TemplateRenderError> {
        self.0.call_inner(h, r, ctx, rc)
    }

    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        r: &'reg Handlebars<'reg>,
        ctx: &'rc Context,
        rc: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        self.0.call(h, r, ctx, rc, out)
    }
}

/// `{{json value}}` renders its parameter as compact JSON.
#[derive(Debug, Clone, Copy)]
struct JsonHelper;

impl HelperDef for JsonHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'rc>, TemplateRenderError> {
        let param = h
            .param(0)
            .ok_or_else(|| RenderErrorReason::ParamNotFoundForIndex("json", 0))?;
        Ok(ScopedJson::Derived(Value::String(param.value().to_string())))
    }
}

/// Owns the current [`TemplateSet`] and rebuilds it from the prompt catalog
/// and the current [`FunctionTable`].
pub struct TemplateCompiler {
    functions: SnapshotCell<FunctionTable>,
    helpers: Mutex<BTreeMap<String, SharedHelper>>,
    templates: SnapshotCell<TemplateSet>,
    compile_lock: Mutex<u64>,
}

impl Default for TemplateCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TemplateCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateCompiler")
            .field("functions", &self.functions.load().len())
            .field("templates", &self.templates.load())
            .finish()
    }
}

impl TemplateCompiler {
    pub fn new() -> Self {
        Self {
            functions: SnapshotCell::new(FunctionTable::new()),
            helpers: Mutex::new(BTreeMap::new()),
            templates: SnapshotCell::new(TemplateSet::empty()),
            compile_lock: Mutex::new(0),
        }
    }

    /// Replaces the function table used by the next compile.
    pub fn bind_functions(&self, functions: FunctionTable) {
        self.functions.store(functions);
    }

    pub fn functions(&self) -> Arc<FunctionTable> {
        self.functions.load()
    }

    /// Registers a custom helper for all later compiles.
    ///
    /// Tool helpers with the same name take precedence.
    pub fn register_helper<H>(&self, name: impl Into<String>, helper: H)
    where
        H: HelperDef + Send + Sync + 'static,
    {
        self.helpers
            .lock()
            .insert(name.into(), SharedHelper(Arc::new(helper)));
    }

    pub fn templates(&self) -> Arc<TemplateSet> {
        self.templates.load()
    }

    /// Compiles every prompt in the catalog and installs the result.
    ///
    /// Compiles are serialized and each one reads the catalog and function
    /// table after taking the lock, so the last compile to finish always
    /// reflects the latest installed generation. Prompts that fail to compile
    /// are left out with a warning.
    pub fn compile(&self, catalog: &PromptCatalog) -> CompileReport {
        let mut revision = self.compile_lock.lock();
        let prompts = catalog.current();
        let functions = self.functions.load();

        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);
        registry.register_helper("json", Box::new(JsonHelper));
        for (name, helper) in self.helpers.lock().iter() {
            registry.register_helper(name, Box::new(helper.clone()));
        }
        for (name, invoker) in functions.iter() {
            registry.register_helper(name, Box::new(invoker.clone()));
        }

        let mut validators = HashMap::with_capacity(prompts.len());
        let mut report = CompileReport::default();

        for (id, entry) in prompts.iter() {
            let registered = match entry.prompt.body() {
                Ok(PromptBody::Template(source)) => {
                    register(&mut registry, id, &template_key(id), source)
                }
                Ok(PromptBody::Messages(messages)) => {
                    let keys: Vec<String> =
                        (0..messages.len()).map(|index| message_key(id, index)).collect();
                    let ok = keys
                        .iter()
                        .zip(messages)
                        .all(|(key, message)| register(&mut registry, id, key, &message.content));
                    if !ok {
                        for key in &keys {
                            registry.unregister_template(key);
                        }
                    }
                    ok
                }
                Err(err) => {
                    tracing::warn!(prompt_id = %id, error = %err, "skipping prompt without a body");
                    false
                }
            };

            if !registered {
                report.failed += 1;
                continue;
            }
            report.compiled += 1;

            let validator = ArgumentValidator::compile(&entry.prompt.parameters).unwrap_or_else(|err| {
                tracing::warn!(prompt_id = %id, error = %err, "ignoring invalid prompt parameter schema");
                ArgumentValidator::accept_all()
            });
            validators.insert(id.clone(), validator);
        }

        *revision += 1;
        report.revision = *revision;
        self.templates.store(TemplateSet {
            registry,
            validators,
            revision: *revision,
        });

        tracing::debug!(
            compiled = report.compiled,
            failed = report.failed,
            helpers = functions.len(),
            revision = report.revision,
            "templates compiled"
        );
        report
    }
}

fn register(registry: &mut Handlebars<'static>, prompt_id: &str, key: &str, source: &str) -> bool {
    match registry.register_template_string(key, source) {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(prompt_id = %prompt_id, template = %key, error = %err, "template failed to compile");
            false
        }
    }
}
