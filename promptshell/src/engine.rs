//! The assembled engine: snapshots, refresh, rendering, tool calls, and chat.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::Mutex;

use pcache::{
    EntityKind, EnvironmentTree, Extension, LoadError, Loaded, MetadataLoader, Namespaces,
    NoopRefreshHooks, PromptCatalog, PromptEntry, RefreshHooks, Snapshot, SnapshotCell,
    SnapshotStore, Tool,
};
use pchat::{ChatError, ChatRequest, ChatService};
use pprovider::{ChatCompletion, ModelProvider};
use prender::{
    DEFAULT_RENDER_DEADLINE, FunctionTable, RenderError, RenderOptions, Rendered, Renderer,
    TemplateCompiler,
};
use pstore::{DocumentStore, InMemoryDocumentStore};
use ptooling::{
    CallContext, CallStats, HttpTransport, PluggableTransport, RetryPolicy, RpcTransport,
    ToolCallHooks, ToolDispatcher, ToolDispatcherBuilder, ToolError,
};

use crate::error::EngineError;
use crate::refresh::{self, DEFAULT_REFRESH_TIMEOUT, RefreshHandle, RefreshIntervals, RefreshReport};

pub struct EngineBuilder {
    store: Option<Arc<dyn DocumentStore>>,
    namespaces: Namespaces,
    dispatcher: ToolDispatcherBuilder,
    render_deadline: Duration,
    refresh_timeout: Duration,
    refresh_hooks: Arc<dyn RefreshHooks>,
    provider: Option<Arc<dyn ModelProvider>>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            namespaces: Namespaces::default(),
            dispatcher: ToolDispatcher::builder(),
            render_deadline: DEFAULT_RENDER_DEADLINE,
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
            refresh_hooks: Arc::new(NoopRefreshHooks),
            provider: None,
        }
    }

    /// Defaults to an empty in-memory store.
    pub fn store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn namespaces(mut self, namespaces: Namespaces) -> Self {
        self.namespaces = namespaces;
        self
    }

    pub fn http_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.dispatcher = self.dispatcher.http_transport(transport);
        self
    }

    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.dispatcher = self.dispatcher.http_timeout(timeout);
        self
    }

    pub fn rpc_transport(mut self, transport: Arc<dyn RpcTransport>) -> Self {
        self.dispatcher = self.dispatcher.rpc_transport(transport);
        self
    }

    pub fn pluggable_transport(mut self, transport: Arc<dyn PluggableTransport>) -> Self {
        self.dispatcher = self.dispatcher.pluggable_transport(transport);
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.dispatcher = self.dispatcher.retry_policy(policy);
        self
    }

    pub fn tool_hooks(mut self, hooks: Arc<dyn ToolCallHooks>) -> Self {
        self.dispatcher = self.dispatcher.hooks(hooks);
        self
    }

    pub fn render_deadline(mut self, deadline: Duration) -> Self {
        self.render_deadline = deadline;
        self
    }

    pub fn refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    pub fn refresh_hooks(mut self, hooks: Arc<dyn RefreshHooks>) -> Self {
        self.refresh_hooks = hooks;
        self
    }

    pub fn provider(mut self, provider: Arc<dyn ModelProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Builds an engine with empty snapshots; call [`Engine::refresh_all`] to load.
    pub fn build(self) -> Result<Engine, EngineError> {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryDocumentStore::new()));
        let dispatcher = Arc::new(self.dispatcher.build().map_err(EngineError::Dispatcher)?);
        let prompts = Arc::new(PromptCatalog::new());
        let environment = Arc::new(SnapshotCell::new(EnvironmentTree::default()));
        let compiler = Arc::new(TemplateCompiler::new());
        let renderer = Renderer::new(
            Arc::clone(&prompts),
            Arc::clone(&environment),
            Arc::clone(&compiler),
        )
        .with_deadline(self.render_deadline);
        let chat = self
            .provider
            .map(|provider| ChatService::new(renderer.clone(), provider));

        Ok(Engine {
            inner: Arc::new(EngineInner {
                loader: MetadataLoader::new(store, self.namespaces),
                tools: SnapshotStore::new(),
                tools_refresh: Mutex::new(()),
                prompts,
                extensions: SnapshotStore::new(),
                environment,
                environment_revision: AtomicU64::new(0),
                dispatcher,
                compiler,
                renderer,
                chat,
                refresh_timeout: self.refresh_timeout,
                refresh_hooks: self.refresh_hooks,
            }),
        })
    }
}

struct EngineInner {
    loader: MetadataLoader,
    tools: SnapshotStore<Tool>,
    /// Serializes tools refreshes so the dispatcher binds the installed snapshot.
    tools_refresh: Mutex<()>,
    prompts: Arc<PromptCatalog>,
    extensions: SnapshotStore<Extension>,
    environment: Arc<SnapshotCell<EnvironmentTree>>,
    environment_revision: AtomicU64,
    dispatcher: Arc<ToolDispatcher>,
    compiler: Arc<TemplateCompiler>,
    renderer: Renderer,
    chat: Option<ChatService>,
    refresh_timeout: Duration,
    refresh_hooks: Arc<dyn RefreshHooks>,
}

/// Cheap to clone; every clone shares the same snapshots.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("tools", &self.inner.tools.current().len())
            .field("prompts", &self.inner.prompts.current().len())
            .field("extensions", &self.inner.extensions.current().len())
            .field("environment", &self.inner.environment.load().len())
            .field("chat", &self.inner.chat.is_some())
            .finish()
    }
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Reloads tools, rebinds the dispatcher and tool helpers, and recompiles templates.
    pub async fn refresh_tools(&self) -> Result<RefreshReport, LoadError> {
        let inner = &self.inner;
        let _serial = inner.tools_refresh.lock().await;
        let loaded = self
            .load(EntityKind::Tools, inner.loader.load_tools())
            .await?;
        let skipped = loaded.skipped;
        let snapshot = inner.tools.install(loaded.entries);

        let bound = inner.dispatcher.bind(&snapshot);
        inner
            .compiler
            .bind_functions(FunctionTable::from_dispatcher(&inner.dispatcher));
        inner.compiler.compile(&inner.prompts);

        tracing::info!(
            kind = %EntityKind::Tools,
            entries = snapshot.len(),
            bound,
            revision = snapshot.revision(),
            "tools refreshed"
        );
        Ok(RefreshReport {
            kind: EntityKind::Tools,
            entries: snapshot.len(),
            skipped,
            revision: snapshot.revision(),
        })
    }

    pub async fn refresh_prompts(&self) -> Result<RefreshReport, LoadError> {
        let inner = &self.inner;
        let loaded = self
            .load(EntityKind::Prompts, inner.loader.load_prompts())
            .await?;
        let skipped = loaded.skipped;
        let entries = loaded.entries.len();
        let snapshot = inner.prompts.install_direct(loaded.entries);
        inner.compiler.compile(&inner.prompts);

        tracing::info!(
            kind = %EntityKind::Prompts,
            entries,
            catalog = snapshot.len(),
            revision = snapshot.revision(),
            "prompts refreshed"
        );
        Ok(RefreshReport {
            kind: EntityKind::Prompts,
            entries,
            skipped,
            revision: snapshot.revision(),
        })
    }

    pub async fn refresh_extensions(&self) -> Result<RefreshReport, LoadError> {
        let inner = &self.inner;
        let loaded = self
            .load(EntityKind::Extensions, inner.loader.load_extensions())
            .await?;
        let skipped = loaded.skipped;
        let snapshot = inner.extensions.install(loaded.entries);
        inner.prompts.merge_extensions(snapshot.entries().values());
        inner.compiler.compile(&inner.prompts);

        tracing::info!(
            kind = %EntityKind::Extensions,
            entries = snapshot.len(),
            revision = snapshot.revision(),
            "extensions refreshed"
        );
        Ok(RefreshReport {
            kind: EntityKind::Extensions,
            entries: snapshot.len(),
            skipped,
            revision: snapshot.revision(),
        })
    }

    pub async fn refresh_environment(&self) -> Result<RefreshReport, LoadError> {
        let inner = &self.inner;
        let loaded = self
            .load(EntityKind::Environment, inner.loader.load_environment())
            .await?;
        let skipped = loaded.skipped;
        let revision = inner.environment_revision.fetch_add(1, Ordering::Relaxed) + 1;
        let tree = EnvironmentTree::from_entries(loaded.entries, revision);
        let entries = tree.len();
        inner.environment.store(tree);

        tracing::info!(
            kind = %EntityKind::Environment,
            entries,
            revision,
            "environment refreshed"
        );
        Ok(RefreshReport {
            kind: EntityKind::Environment,
            entries,
            skipped,
            revision,
        })
    }

    pub async fn refresh(&self, kind: EntityKind) -> Result<RefreshReport, LoadError> {
        match kind {
            EntityKind::Tools => self.refresh_tools().await,
            EntityKind::Prompts => self.refresh_prompts().await,
            EntityKind::Extensions => self.refresh_extensions().await,
            EntityKind::Environment => self.refresh_environment().await,
        }
    }

    /// Refreshes every kind in dependency order: tools, environment, prompts, extensions.
    ///
    /// A failing kind keeps its previous snapshot and does not stop the others;
    /// the first error is returned after all kinds were attempted.
    pub async fn refresh_all(&self) -> Result<Vec<RefreshReport>, LoadError> {
        let mut reports = Vec::with_capacity(4);
        let mut first_error = None;

        for kind in [
            EntityKind::Tools,
            EntityKind::Environment,
            EntityKind::Prompts,
            EntityKind::Extensions,
        ] {
            match self.refresh(kind).await {
                Ok(report) => reports.push(report),
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(reports),
        }
    }

    /// Starts one periodic refresh task per entity kind.
    pub fn spawn_refresh_tasks(&self, intervals: RefreshIntervals) -> RefreshHandle {
        refresh::spawn(self, intervals)
    }

    async fn load<T>(
        &self,
        kind: EntityKind,
        load: impl Future<Output = Result<Loaded<T>, LoadError>>,
    ) -> Result<Loaded<T>, LoadError> {
        let hooks = &self.inner.refresh_hooks;
        let timeout = self.inner.refresh_timeout;
        let started = Instant::now();
        hooks.on_refresh_start(kind);

        let result = match tokio::time::timeout(timeout, load).await {
            Ok(result) => result,
            Err(_) => Err(LoadError::Timeout {
                kind,
                after: timeout,
            }),
        };

        let elapsed = started.elapsed();
        match &result {
            Ok(loaded) => {
                hooks.on_refresh_success(kind, loaded.entries.len(), loaded.skipped, elapsed)
            }
            Err(err) => hooks.on_refresh_failure(kind, err, elapsed),
        }
        result
    }

    pub fn tools(&self) -> Arc<Snapshot<Tool>> {
        self.inner.tools.current()
    }

    pub fn tool(&self, id: &str) -> Option<Tool> {
        self.inner.tools.get(id)
    }

    pub fn prompts(&self) -> Arc<Snapshot<PromptEntry>> {
        self.inner.prompts.current()
    }

    pub fn prompt(&self, id: &str) -> Option<PromptEntry> {
        self.inner.prompts.get(id)
    }

    pub fn extensions(&self) -> Arc<Snapshot<Extension>> {
        self.inner.extensions.current()
    }

    pub fn extension(&self, id: &str) -> Option<Extension> {
        self.inner.extensions.get(id)
    }

    pub fn environment(&self) -> Arc<EnvironmentTree> {
        self.inner.environment.load()
    }

    /// Value or subtree at a dotted environment path.
    pub fn environ(&self, path: &str) -> Option<Value> {
        self.inner.environment.load().get(path).cloned()
    }

    pub fn tool_stats(&self, id: &str) -> Option<CallStats> {
        self.inner.dispatcher.stats(id)
    }

    pub fn all_tool_stats(&self) -> Vec<(String, CallStats)> {
        self.inner.dispatcher.all_stats()
    }

    pub fn dispatcher(&self) -> &Arc<ToolDispatcher> {
        &self.inner.dispatcher
    }

    pub fn compiler(&self) -> &Arc<TemplateCompiler> {
        &self.inner.compiler
    }

    pub fn renderer(&self) -> &Renderer {
        &self.inner.renderer
    }

    pub fn has_chat(&self) -> bool {
        self.inner.chat.is_some()
    }

    pub async fn render(
        &self,
        prompt_id: &str,
        args: Value,
        options: RenderOptions,
    ) -> Result<Rendered, RenderError> {
        self.inner.renderer.render(prompt_id, args, options).await
    }

    pub async fn call_tool(
        &self,
        context: &CallContext,
        tool_id: &str,
        args: Value,
    ) -> Result<Value, ToolError> {
        self.inner.dispatcher.call(context, tool_id, args).await
    }

    pub async fn chat(
        &self,
        prompt_id: &str,
        request: ChatRequest,
        options: RenderOptions,
    ) -> Result<ChatCompletion, ChatError> {
        let chat = self.inner.chat.as_ref().ok_or(ChatError::ProviderMissing)?;
        chat.chat(prompt_id, request, options).await
    }
}
