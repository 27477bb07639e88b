use std::sync::Arc;

use pcache::{
    EnvironmentTree, MetadataLoader, Namespaces, PromptCatalog, PromptOrigin, SnapshotCell,
    SnapshotStore, Tool,
};
use pstore::{DocumentStore, InMemoryDocumentStore};
use serde_json::json;

async fn put(store: &InMemoryDocumentStore, key: &str, value: serde_json::Value) {
    store
        .put(key, value.to_string())
        .await
        .expect("put should succeed");
}

#[tokio::test]
async fn store_edits_become_visible_only_after_reload() {
    let store = Arc::new(InMemoryDocumentStore::new());
    put(
        &store,
        "prompt-shell:tools:echo",
        json!({ "name": "echo", "type": "restful", "restful": { "url": "http://echo" } }),
    )
    .await;

    let loader = MetadataLoader::new(store.clone(), Namespaces::default());
    let tools: SnapshotStore<Tool> = SnapshotStore::new();
    tools.install(loader.load_tools().await.expect("load should succeed").entries);
    let first = tools.current();

    store
        .delete("prompt-shell:tools:echo")
        .await
        .expect("delete should succeed");
    put(
        &store,
        "prompt-shell:tools:weather:now",
        json!({ "name": "now", "type": "rpc", "rpc": { "url": "localhost:9000" } }),
    )
    .await;

    assert!(tools.get("echo").is_some());

    tools.install(loader.load_tools().await.expect("load should succeed").entries);

    assert!(first.contains("echo"));
    assert!(tools.get("echo").is_none());
    assert!(tools.get("weather.now").is_some());
}

#[tokio::test]
async fn prompts_and_extensions_follow_override_rules_through_the_loader() {
    let store = Arc::new(InMemoryDocumentStore::new());
    put(
        &store,
        "prompt-shell:extensions:review",
        json!({
            "name": "review",
            "version": "1.0.0",
            "contributes": { "prompts": [{ "name": "summarize", "userPrompt": "ext {{args.diff}}" }] }
        }),
    )
    .await;
    put(
        &store,
        "prompt-shell:prompts:review:summarize",
        json!({ "name": "summarize", "prompt": "direct {{args.diff}}" }),
    )
    .await;

    let loader = MetadataLoader::new(store.clone(), Namespaces::default());
    let catalog = PromptCatalog::new();

    let extensions = loader.load_extensions().await.expect("load should succeed");
    catalog.merge_extensions(extensions.entries.values());
    catalog.install_direct(loader.load_prompts().await.expect("load should succeed").entries);
    assert_eq!(catalog.origin("review.summarize"), PromptOrigin::Direct);

    store
        .delete("prompt-shell:prompts:review:summarize")
        .await
        .expect("delete should succeed");
    catalog.install_direct(loader.load_prompts().await.expect("load should succeed").entries);
    assert_eq!(catalog.origin("review.summarize"), PromptOrigin::NotExist);

    let extensions = loader.load_extensions().await.expect("load should succeed");
    catalog.merge_extensions(extensions.entries.values());
    let entry = catalog
        .get("review.summarize")
        .expect("extension prompt should be back");
    assert_eq!(entry.origin, PromptOrigin::Extension);
    assert_eq!(entry.prompt.prompt, "ext {{args.diff}}");
}

#[tokio::test]
async fn environment_reload_replaces_the_whole_tree() {
    let store = Arc::new(InMemoryDocumentStore::new());
    put(&store, "prompt-shell:environs:bot_name", json!("Helper")).await;
    put(&store, "prompt-shell:environs:llm:model", json!("small")).await;

    let loader = MetadataLoader::new(store.clone(), Namespaces::default());
    let cell = SnapshotCell::new(EnvironmentTree::default());
    let loaded = loader
        .load_environment()
        .await
        .expect("load should succeed");
    cell.store(EnvironmentTree::from_entries(loaded.entries, 1));

    store
        .delete("prompt-shell:environs:llm:model")
        .await
        .expect("delete should succeed");
    let loaded = loader
        .load_environment()
        .await
        .expect("load should succeed");
    cell.store(EnvironmentTree::from_entries(loaded.entries, 2));

    let tree = cell.load();
    assert_eq!(tree.root(), &json!({ "bot_name": "Helper" }));
    assert_eq!(tree.revision(), 2);
}
