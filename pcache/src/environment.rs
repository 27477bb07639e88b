//! Environment values rebuilt from dotted paths into a nested tree.
//!
//! ```rust
//! use pcache::EnvironmentTree;
//! use serde_json::json;
//!
//! let tree = EnvironmentTree::from_entries(
//!     vec![("app.ui.title".to_string(), json!("Prompt Shell"))],
//!     1,
//! );
//!
//! assert_eq!(tree.get("app.ui.title"), Some(&json!("Prompt Shell")));
//! assert_eq!(tree.root(), &json!({ "app": { "ui": { "title": "Prompt Shell" } } }));
//! ```

use std::collections::BTreeMap;

use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentTree {
    root: Value,
    entries: BTreeMap<String, Value>,
    revision: u64,
}

impl Default for EnvironmentTree {
    fn default() -> Self {
        Self {
            root: Value::Object(Map::new()),
            entries: BTreeMap::new(),
            revision: 0,
        }
    }
}

impl EnvironmentTree {
    /// Builds the tree in path order, so `a.b` replaces a scalar stored at `a`.
    pub fn from_entries(entries: impl IntoIterator<Item = (String, Value)>, revision: u64) -> Self {
        let entries: BTreeMap<String, Value> = entries
            .into_iter()
            .filter(|(path, _)| !path.is_empty())
            .collect();

        let mut root = Value::Object(Map::new());
        for (path, value) in &entries {
            set_path(&mut root, path, value.clone());
        }

        Self {
            root,
            entries,
            revision,
        }
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Top-level keys used as the render context.
    pub fn top_level(&self) -> Map<String, Value> {
        match &self.root {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        }
    }

    /// Subtree or leaf at a dotted path.
    pub fn get(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .try_fold(&self.root, |node, segment| node.as_object()?.get(segment))
    }

    /// The flat `(path, value)` pairs the tree was built from.
    pub fn entries(&self) -> &BTreeMap<String, Value> {
        &self.entries
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn set_path(root: &mut Value, path: &str, value: Value) {
    let mut node = root;
    let mut segments = path.split('.').peekable();

    while let Some(segment) = segments.next() {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        let Value::Object(map) = node else {
            return;
        };

        if segments.peek().is_none() {
            map.insert(segment.to_string(), value);
            return;
        }
        node = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::EnvironmentTree;

    #[test]
    fn siblings_share_parent_objects() {
        let tree = EnvironmentTree::from_entries(
            vec![
                ("bot_name".to_string(), json!("Helper")),
                ("llm.model".to_string(), json!("gpt-4o-mini")),
                ("llm.limits.tokens".to_string(), json!(512)),
            ],
            3,
        );

        assert_eq!(
            tree.root(),
            &json!({
                "bot_name": "Helper",
                "llm": { "model": "gpt-4o-mini", "limits": { "tokens": 512 } }
            })
        );
        assert_eq!(tree.get("llm.limits"), Some(&json!({ "tokens": 512 })));
        assert_eq!(tree.get("llm.missing"), None);
        assert_eq!(tree.top_level().len(), 2);
        assert_eq!(tree.revision(), 3);
    }

    #[test]
    fn deeper_path_overwrites_scalar_intermediate() {
        let tree = EnvironmentTree::from_entries(
            vec![
                ("a.b".to_string(), json!(1)),
                ("a".to_string(), json!("scalar")),
            ],
            1,
        );

        assert_eq!(tree.root(), &json!({ "a": { "b": 1 } }));
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn empty_paths_are_ignored() {
        let tree = EnvironmentTree::from_entries(vec![(String::new(), json!(1))], 1);
        assert!(tree.is_empty());
        assert_eq!(tree.root(), &json!({}));
    }
}
