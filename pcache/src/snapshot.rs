//! Immutable snapshots behind a single swappable reference.
//!
//! ```rust
//! use std::collections::HashMap;
//! use pcache::SnapshotStore;
//!
//! let store: SnapshotStore<u32> = SnapshotStore::new();
//! let before = store.current();
//!
//! store.install(HashMap::from([("a".to_string(), 1)]));
//!
//! assert!(before.is_empty());
//! assert_eq!(store.get("a"), Some(1));
//! assert_eq!(store.current().revision(), 1);
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

/// Holds one `Arc<T>` that readers clone and writers replace wholesale.
///
/// The read lock only guards the pointer clone, so readers never wait on a
/// writer computing its replacement.
#[derive(Debug)]
pub struct SnapshotCell<T> {
    current: RwLock<Arc<T>>,
    writer: Mutex<()>,
}

impl<T> SnapshotCell<T> {
    pub fn new(initial: T) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
            writer: Mutex::new(()),
        }
    }

    pub fn load(&self) -> Arc<T> {
        Arc::clone(&self.current.read())
    }

    /// Swaps in `next`, returning the previous value.
    pub fn store(&self, next: T) -> Arc<T> {
        let _writer = self.writer.lock();
        self.swap(Arc::new(next))
    }

    /// Derives the next value from the current one.
    ///
    /// Writers are serialized so a derived value never discards a concurrent
    /// update; readers keep seeing the old value until the swap.
    pub fn update(&self, derive: impl FnOnce(&T) -> T) -> Arc<T> {
        let _writer = self.writer.lock();
        let previous = self.load();
        let next = Arc::new(derive(&previous));
        self.swap(Arc::clone(&next));
        next
    }

    fn swap(&self, next: Arc<T>) -> Arc<T> {
        std::mem::replace(&mut *self.current.write(), next)
    }
}

impl<T: Default> Default for SnapshotCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Point-in-time copy of every entry of one entity kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<V> {
    entries: HashMap<String, V>,
    revision: u64,
}

impl<V> Default for Snapshot<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            revision: 0,
        }
    }
}

impl<V> Snapshot<V> {
    pub fn new(entries: HashMap<String, V>, revision: u64) -> Self {
        Self { entries, revision }
    }

    pub fn get(&self, id: &str) -> Option<&V> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
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

    pub fn iter(&self) -> impl Iterator<Item = (&String, &V)> {
        self.entries.iter()
    }

    /// Ids in lexical order.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn entries(&self) -> &HashMap<String, V> {
        &self.entries
    }
}

/// Snapshot container for one entity kind.
#[derive(Debug)]
pub struct SnapshotStore<V> {
    cell: SnapshotCell<Snapshot<V>>,
}

impl<V> Default for SnapshotStore<V> {
    fn default() -> Self {
        Self {
            cell: SnapshotCell::new(Snapshot::default()),
        }
    }
}

impl<V> SnapshotStore<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole snapshot with `entries` under the next revision.
    pub fn install(&self, entries: HashMap<String, V>) -> Arc<Snapshot<V>> {
        self.cell
            .update(|previous| Snapshot::new(entries, previous.revision + 1))
    }

    pub fn current(&self) -> Arc<Snapshot<V>> {
        self.cell.load()
    }

    pub(crate) fn update(
        &self,
        derive: impl FnOnce(&Snapshot<V>) -> HashMap<String, V>,
    ) -> Arc<Snapshot<V>> {
        self.cell.update(|previous| {
            let entries = derive(previous);
            Snapshot::new(entries, previous.revision + 1)
        })
    }
}

impl<V: Clone> SnapshotStore<V> {
    pub fn get(&self, id: &str) -> Option<V> {
        self.current().get(id).cloned()
    }
}
