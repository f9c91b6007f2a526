use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use myfuture_core::KeyValueStore;
use tempfile::NamedTempFile;
use tracing::{debug, info};

pub const STORAGE_FILE: &str = "storage.json";

/// Key-value slots kept as one JSON object on disk.
///
/// Every read goes to the file so that a long-running `watch` sees writes
/// made by other invocations. Writes merge into the current file content
/// and replace it atomically.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let path = data_dir.join(STORAGE_FILE);
        if !path.exists() {
            save_slots_atomic(&path, &BTreeMap::new())?;
        }
        // refuse to start over a container we cannot parse rather than
        // overwrite it on the first write
        load_slots(&path)?;

        info!(
            data_dir = %data_dir.display(),
            storage = %path.display(),
            "opened storage"
        );

        Ok(Self { path })
    }
}

impl KeyValueStore for FileStorage {
    fn get_item(&self, key: &str) -> anyhow::Result<Option<String>> {
        let mut slots = load_slots(&self.path)?;
        Ok(slots.remove(key))
    }

    #[tracing::instrument(skip(self, value), fields(bytes = value.len()))]
    fn set_item(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut slots = load_slots(&self.path)?;
        slots.insert(key.to_string(), value.to_string());
        save_slots_atomic(&self.path, &slots)
    }

    #[tracing::instrument(skip(self))]
    fn remove_item(&mut self, key: &str) -> anyhow::Result<()> {
        let mut slots = load_slots(&self.path)?;
        if slots.remove(key).is_some() {
            save_slots_atomic(&self.path, &slots)?;
        }
        Ok(())
    }
}

fn load_slots(path: &Path) -> anyhow::Result<BTreeMap<String, String>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed reading {}", path.display()))?;
    if raw.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    let slots: BTreeMap<String, String> = serde_json::from_str(&raw)
        .with_context(|| format!("failed parsing {}", path.display()))?;
    debug!(file = %path.display(), slots = slots.len(), "loaded storage slots");
    Ok(slots)
}

fn save_slots_atomic(path: &Path, slots: &BTreeMap<String, String>) -> anyhow::Result<()> {
    debug!(file = %path.display(), slots = slots.len(), "saving storage atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    let serialized = serde_json::to_string_pretty(slots)?;
    writeln!(temp, "{serialized}")?;
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}
