use anyhow::anyhow;
use myfuture_core::{
  KeyValueStore,
  MemoryStorage
};

/// `window.localStorage` behind the core
/// storage trait. When the browser
/// refuses access (private mode,
/// sandboxed frame) the app keeps
/// working in memory for this visit.
pub enum LocalStorage {
  Browser(web_sys::Storage),
  Memory(MemoryStorage)
}

impl LocalStorage {
  pub fn open() -> Self {
    match browser_storage() {
      | Ok(storage) => {
        Self::Browser(storage)
      }
      | Err(err) => {
        tracing::warn!(
          error = %err,
          "localStorage unavailable; tasks will not survive a reload"
        );
        Self::Memory(MemoryStorage::new())
      }
    }
  }
}

fn browser_storage()
-> anyhow::Result<web_sys::Storage> {
  web_sys::window()
    .ok_or_else(|| {
      anyhow!("no browser window")
    })?
    .local_storage()
    .map_err(|err| {
      anyhow!(
        "localStorage blocked: {err:?}"
      )
    })?
    .ok_or_else(|| {
      anyhow!("localStorage missing")
    })
}

impl KeyValueStore for LocalStorage {
  fn get_item(
    &self,
    key: &str
  ) -> anyhow::Result<Option<String>> {
    match self {
      | Self::Browser(storage) => {
        storage.get_item(key).map_err(
          |err| {
            anyhow!(
              "failed reading \
               localStorage[{key}]: \
               {err:?}"
            )
          }
        )
      }
      | Self::Memory(memory) => {
        memory.get_item(key)
      }
    }
  }

  fn set_item(
    &mut self,
    key: &str,
    value: &str
  ) -> anyhow::Result<()> {
    match self {
      | Self::Browser(storage) => storage
        .set_item(key, value)
        .map_err(|err| {
          anyhow!(
            "failed writing \
             localStorage[{key}]: \
             {err:?}"
          )
        }),
      | Self::Memory(memory) => {
        memory.set_item(key, value)
      }
    }
  }

  fn remove_item(
    &mut self,
    key: &str
  ) -> anyhow::Result<()> {
    match self {
      | Self::Browser(storage) => storage
        .remove_item(key)
        .map_err(|err| {
          anyhow!(
            "failed removing \
             localStorage[{key}]: \
             {err:?}"
          )
        }),
      | Self::Memory(memory) => {
        memory.remove_item(key)
      }
    }
  }
}
