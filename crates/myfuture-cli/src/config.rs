use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use myfuture_core::FilterMode;
use tracing::{
  debug,
  info,
  trace,
  warn
};

const RC_ENV_VAR: &str = "MYFUTURERC";
const RC_FILE_NAME: &str = ".myfuturerc";
const DEFAULT_DATA_DIR: &str =
  ".myfuture";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyMode {
  Ask,
  On,
  Off
}

#[derive(Debug, Clone)]
pub struct Config {
  map: HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Config {
  #[tracing::instrument(skip(
    rc_override
  ))]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::defaults();

    let rc = resolve_rc_path(
      rc_override
    )?;
    if let Some(path) = rc {
      info!(rc = %path.display(), "loading rc file");
      cfg.load_file(&path)?;
    } else {
      debug!(
        "no rc file found; using \
         defaults"
      );
    }

    Ok(cfg)
  }

  pub fn defaults() -> Self {
    let mut map = HashMap::new();
    for (key, value) in [
      ("data.location", "~/.myfuture"),
      ("color", "on"),
      ("default.filter", "all"),
      ("notifications", "ask"),
      ("reminder.sound", "on"),
      ("watch.poll_seconds", "5"),
      ("due_soon.hours", "24")
    ] {
      map.insert(
        key.to_string(),
        value.to_string()
      );
    }
    Config {
      map,
      loaded_files: vec![]
    }
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self.map.insert(key, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  pub fn get_bool(
    &self,
    key: &str
  ) -> Option<bool> {
    self
      .map
      .get(key)
      .map(|v| parse_bool(v))
  }

  pub fn get_u64(
    &self,
    key: &str
  ) -> anyhow::Result<Option<u64>> {
    self
      .map
      .get(key)
      .map(|v| {
        v.trim().parse::<u64>().map_err(
          |_| {
            anyhow!(
              "config {key} must be a \
               whole number, got '{v}'"
            )
          }
        )
      })
      .transpose()
  }

  pub fn default_filter(
    &self
  ) -> anyhow::Result<FilterMode> {
    match self.get("default.filter") {
      | Some(raw) => raw
        .parse()
        .context(
          "invalid default.filter"
        ),
      | None => Ok(FilterMode::All)
    }
  }

  pub fn notify_mode(
    &self
  ) -> anyhow::Result<NotifyMode> {
    let raw = self
      .get("notifications")
      .unwrap_or_else(|| {
        "ask".to_string()
      });
    match raw
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "ask" => Ok(NotifyMode::Ask),
      | "on" | "yes" | "true" | "1" => {
        Ok(NotifyMode::On)
      }
      | "off" | "no" | "false"
      | "0" => Ok(NotifyMode::Off),
      | other => Err(anyhow!(
        "invalid notifications \
         setting: {other}"
      ))
    }
  }

  pub fn due_soon_window(
    &self
  ) -> anyhow::Result<chrono::Duration>
  {
    let hours = self
      .get_u64("due_soon.hours")?
      .unwrap_or(
        myfuture_core::datetime::DUE_SOON_WINDOW_HOURS
          as u64
      );
    // Duration::hours panics past
    // i64 milliseconds
    let hours = hours.min(24 * 365 * 100);
    Ok(chrono::Duration::hours(
      hours as i64
    ))
  }

  pub fn poll_interval(
    &self
  ) -> anyhow::Result<std::time::Duration>
  {
    let secs = self
      .get_u64("watch.poll_seconds")?
      .unwrap_or(5)
      .max(1);
    Ok(
      std::time::Duration::from_secs(
        secs
      )
    )
  }

  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    self
      .loaded_files
      .push(path.clone());

    let base_dir = path
      .parent()
      .map(|p| p.to_path_buf())
      .unwrap_or_else(|| {
        PathBuf::from(".")
      });

    for (line_num, raw_line) in
      text.lines().enumerate()
    {
      let mut line = raw_line.trim();
      if line.is_empty()
        || line.starts_with('#')
      {
        continue;
      }

      if let Some((before, _)) =
        line.split_once('#')
      {
        line = before.trim();
      }

      if line.is_empty() {
        continue;
      }

      if let Some(include_rest) =
        line.strip_prefix("include ")
      {
        let include_path =
          resolve_include_path(
            &base_dir,
            include_rest.trim()
          )?;
        debug!(
            file = %path.display(),
            include = %include_path.display(),
            line = line_num + 1,
            "processing include"
        );

        if include_path.exists() {
          self
            .load_file(&include_path)?;
        } else {
          warn!(include = %include_path.display(), "include file does not exist; skipping");
        }
        continue;
      }

      let (k, v) = line
        .split_once('=')
        .ok_or_else(|| {
          anyhow!(
            "invalid config line \
             {}:{}: {}",
            path.display(),
            line_num + 1,
            raw_line
          )
        })?;

      let key = k.trim().to_string();
      let value = v.trim().to_string();
      trace!(key = %key, value = %value, "loaded config key");
      self.map.insert(key, value);
    }

    Ok(())
  }
}

#[tracing::instrument(skip(
  cfg,
  override_dir
))]
pub fn resolve_data_dir(
  cfg: &Config,
  override_dir: Option<&Path>
) -> anyhow::Result<PathBuf> {
  let dir = if let Some(path) =
    override_dir
  {
    path.to_path_buf()
  } else if let Some(cfg_value) =
    cfg.get("data.location")
  {
    expand_tilde(Path::new(&cfg_value))
  } else {
    default_data_dir()?
  };

  if !dir.exists() {
    info!(dir = %dir.display(), "creating data directory");
    fs::create_dir_all(&dir)
      .with_context(|| {
        format!(
          "failed to create {}",
          dir.display()
        )
      })?;
  }

  Ok(dir)
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_rc_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(rc_env) =
    std::env::var(RC_ENV_VAR)
  {
    if rc_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      rc_env
    )));
  }

  let Some(home) = dirs::home_dir()
  else {
    return Ok(None);
  };
  let candidate = home.join(RC_FILE_NAME);
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn default_data_dir()
-> anyhow::Result<PathBuf> {
  let home = dirs::home_dir()
    .ok_or_else(|| {
      anyhow!(
        "cannot determine home \
         directory"
      )
    })?;
  Ok(home.join(DEFAULT_DATA_DIR))
}

fn resolve_include_path(
  base_dir: &Path,
  include: &str
) -> anyhow::Result<PathBuf> {
  if include.trim().is_empty() {
    return Err(anyhow!(
      "include path cannot be empty"
    ));
  }

  let raw = PathBuf::from(include);
  let expanded = expand_tilde(&raw);
  if expanded.is_absolute() {
    Ok(expanded)
  } else {
    Ok(base_dir.join(expanded))
  }
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

fn parse_bool(s: &str) -> bool {
  matches!(
    s.trim()
      .to_ascii_lowercase()
      .as_str(),
    "1" | "y" | "yes" | "on" | "true"
  )
}

#[cfg(test)]
mod tests {
  use std::fs;

  use myfuture_core::FilterMode;
  use tempfile::tempdir;

  use super::{
    Config,
    NotifyMode
  };

  #[test]
  fn rc_file_with_include_and_overrides()
  {
    let dir = tempdir().unwrap();
    let extra =
      dir.path().join("extra.rc");
    fs::write(
      &extra,
      "reminder.sound = off\n"
    )
    .unwrap();
    let rc = dir.path().join("main.rc");
    fs::write(
      &rc,
      "# comment\n\
       default.filter = active  # trailing\n\
       include extra.rc\n\
       include missing.rc\n\
       notifications=on\n"
    )
    .unwrap();

    let mut cfg = Config::load(Some(
      rc.as_path()
    ))
    .unwrap();
    assert_eq!(cfg.loaded_files.len(), 2);
    assert_eq!(
      cfg.default_filter().unwrap(),
      FilterMode::Active
    );
    assert_eq!(
      cfg.get_bool("reminder.sound"),
      Some(false)
    );
    assert_eq!(
      cfg.notify_mode().unwrap(),
      NotifyMode::On
    );

    cfg.apply_overrides(vec![(
      "rc.notifications".to_string(),
      "off".to_string()
    )]);
    assert_eq!(
      cfg.notify_mode().unwrap(),
      NotifyMode::Off
    );
  }

  #[test]
  fn malformed_lines_are_rejected() {
    let dir = tempdir().unwrap();
    let rc = dir.path().join("bad.rc");
    fs::write(&rc, "no equals sign\n")
      .unwrap();
    let err = Config::load(Some(
      rc.as_path()
    ))
    .unwrap_err();
    assert!(
      format!("{err:#}")
        .contains("invalid config line")
    );
  }

  #[test]
  fn numeric_settings_validate() {
    let mut cfg = Config::defaults();
    assert_eq!(
      cfg.poll_interval().unwrap(),
      std::time::Duration::from_secs(5)
    );
    assert_eq!(
      cfg.due_soon_window().unwrap(),
      chrono::Duration::hours(24)
    );

    cfg.apply_overrides(vec![(
      "watch.poll_seconds".to_string(),
      "0".to_string()
    )]);
    assert_eq!(
      cfg.poll_interval().unwrap(),
      std::time::Duration::from_secs(1)
    );

    cfg.apply_overrides(vec![(
      "due_soon.hours".to_string(),
      "soon".to_string()
    )]);
    assert!(
      cfg
        .due_soon_window()
        .is_err()
    );
  }
}
