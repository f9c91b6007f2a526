use std::collections::BTreeMap;

use tracing::trace;

/// Durable string slots addressed by key, shaped after the browser's
/// `localStorage`. Each shell brings its own backing store.
pub trait KeyValueStore {
    fn get_item(&self, key: &str) -> anyhow::Result<Option<String>>;

    fn set_item(&mut self, key: &str, value: &str) -> anyhow::Result<()>;

    fn remove_item(&mut self, key: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStorage {
    slots: BTreeMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item(mut self, key: &str, value: &str) -> Self {
        self.slots.insert(key.to_string(), value.to_string());
        self
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get_item(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.slots.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        trace!(key, bytes = value.len(), "memory slot written");
        self.slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> anyhow::Result<()> {
        self.slots.remove(key);
        Ok(())
    }
}
