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
use tracing::{
  debug,
  info,
  trace,
  warn
};

use crate::directory::StaticDirectory;
use crate::drag::{
  DEFAULT_NO_DRAG_MARKER,
  DragGate
};
use crate::session::SessionSettings;
use crate::sort::SortState;

const RC_ENV_VAR: &str = "TASKBOARD_RC";
const RC_FILE_NAME: &str =
  ".taskboardrc";

#[derive(Debug, Clone)]
pub struct Config {
  map:              HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    let mut map = HashMap::new();
    for (key, value) in [
      ("data.location", "~/.taskboard"),
      ("sort.by", "createdAt"),
      ("sort.order", "desc"),
      ("color", "on"),
      (
        "drag.marker",
        DEFAULT_NO_DRAG_MARKER
      )
    ] {
      map.insert(
        key.to_string(),
        value.to_string()
      );
    }

    Self {
      map,
      loaded_files: vec![]
    }
  }
}

impl Config {
  /// Defaults overlaid with the rc file,
  /// if one is found.
  #[tracing::instrument]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    if let Some(path) =
      resolve_rc_path(rc_override)
    {
      info!(rc = %path.display(), "loading taskboardrc");
      cfg.load_file(&path)?;
    } else {
      debug!(
        "no taskboardrc found; using \
         defaults"
      );
    }

    Ok(cfg)
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

  /// `(suffix, value)` pairs for every
  /// key starting with `prefix`,
  /// sorted by suffix.
  pub fn with_prefix(
    &self,
    prefix: &str
  ) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> =
      self
        .map
        .iter()
        .filter_map(|(k, v)| {
          k.strip_prefix(prefix).map(
            |rest| {
              (
                rest.to_string(),
                v.clone()
              )
            }
          )
        })
        .collect();
    out.sort();
    out
  }

  /// Current user id handed to the
  /// auth collaborator.
  pub fn current_user(
    &self
  ) -> Option<String> {
    self
      .get("user.id")
      .map(|v| v.trim().to_string())
      .filter(|v| !v.is_empty())
  }

  pub fn sort_state(
    &self
  ) -> anyhow::Result<SortState> {
    let sort_by = self
      .get("sort.by")
      .unwrap_or_default()
      .parse()
      .context("invalid sort.by")?;
    let sort_order = self
      .get("sort.order")
      .unwrap_or_default()
      .parse()
      .context("invalid sort.order")?;
    Ok(SortState::new(
      sort_by, sort_order
    ))
  }

  pub fn session_settings(
    &self
  ) -> anyhow::Result<SessionSettings> {
    let marker = self
      .get("drag.marker")
      .filter(|m| !m.trim().is_empty())
      .unwrap_or_else(|| {
        DEFAULT_NO_DRAG_MARKER
          .to_string()
      });
    Ok(SessionSettings {
      sort:      self.sort_state()?,
      drag_gate: DragGate::new(marker)
    })
  }

  /// Labels from `directory.project.*`
  /// and `directory.user.*` keys.
  pub fn directory(
    &self
  ) -> StaticDirectory {
    let mut directory =
      StaticDirectory::default();
    for (id, label) in self.with_prefix(
      "directory.project."
    ) {
      directory
        .insert_project(id, label);
    }
    for (id, label) in
      self.with_prefix("directory.user.")
    {
      directory.insert_user(id, label);
    }
    directory
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
      .map(Path::to_path_buf)
      .unwrap_or_default();

    for (idx, raw_line) in
      text.lines().enumerate()
    {
      let parsed = RcLine::parse(
        raw_line
      )
      .with_context(|| {
        format!(
          "{}:{}",
          path.display(),
          idx + 1
        )
      })?;

      match parsed {
        | RcLine::Blank => {}
        | RcLine::Include(target) => {
          self.include(
            &base_dir, target
          )?;
        }
        | RcLine::Entry(key, value) => {
          trace!(key, value, "rc entry");
          self.map.insert(
            key.to_string(),
            value.to_string()
          );
        }
      }
    }

    Ok(())
  }

  fn include(
    &mut self,
    base_dir: &Path,
    target: &str
  ) -> anyhow::Result<()> {
    let target =
      expand_tilde(Path::new(target));
    let target = if target.is_absolute()
    {
      target
    } else {
      base_dir.join(target)
    };

    if self
      .loaded_files
      .contains(&target)
    {
      warn!(include = %target.display(), "rc include already loaded; skipping");
      return Ok(());
    }
    if !target.exists() {
      warn!(include = %target.display(), "rc include missing; skipping");
      return Ok(());
    }
    debug!(include = %target.display(), "following rc include");
    self.load_file(&target)
  }
}

/// One meaningful line of an rc file.
#[derive(Debug, PartialEq, Eq)]
enum RcLine<'a> {
  Blank,
  Include(&'a str),
  Entry(&'a str, &'a str)
}

impl<'a> RcLine<'a> {
  fn parse(
    raw: &'a str
  ) -> anyhow::Result<Self> {
    let line = raw
      .split_once('#')
      .map_or(raw, |(before, _)| before)
      .trim();
    if line.is_empty() {
      return Ok(Self::Blank);
    }

    if let Some(target) =
      line.strip_prefix("include ")
    {
      let target = target.trim();
      if target.is_empty() {
        return Err(anyhow!(
          "include needs a path"
        ));
      }
      return Ok(Self::Include(target));
    }

    match line.split_once('=') {
      | Some((key, value))
        if !key.trim().is_empty() =>
      {
        Ok(Self::Entry(
          key.trim(),
          value.trim()
        ))
      }
      | _ => {
        Err(anyhow!(
          "expected key = value, got \
           `{line}`"
        ))
      }
    }
  }
}

/// Directory holding `tasks.jsonl`:
/// `--data`, then `data.location`,
/// then `~/.taskboard`. Created when
/// missing.
#[tracing::instrument(skip(cfg))]
pub fn resolve_data_dir(
  cfg: &Config,
  override_dir: Option<&Path>
) -> anyhow::Result<PathBuf> {
  let dir = match override_dir {
    | Some(path) => path.to_path_buf(),
    | None => {
      match cfg.get("data.location") {
        | Some(location) => {
          expand_tilde(Path::new(
            &location
          ))
        }
        | None => {
          dirs::home_dir()
            .map(|home| {
              home.join(".taskboard")
            })
            .ok_or_else(|| {
              anyhow!(
                "cannot determine home \
                 directory"
              )
            })?
        }
      }
    }
  };

  if !dir.is_dir() {
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

/// `--config`, then `$TASKBOARD_RC`
/// (`/dev/null` disables), then
/// `~/.taskboardrc` if it exists.
fn resolve_rc_path(
  override_path: Option<&Path>
) -> Option<PathBuf> {
  if let Some(path) = override_path {
    return Some(path.to_path_buf());
  }

  match std::env::var(RC_ENV_VAR) {
    | Ok(value) if value == "/dev/null" => {
      debug!("rc loading disabled via {RC_ENV_VAR}");
      None
    }
    | Ok(value) => {
      Some(PathBuf::from(value))
    }
    | Err(_) => {
      dirs::home_dir()
        .map(|home| {
          home.join(RC_FILE_NAME)
        })
        .filter(|path| path.exists())
    }
  }
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  match (
    path.strip_prefix("~"),
    dirs::home_dir()
  ) {
    | (Ok(rest), Some(home)) => {
      home.join(rest)
    }
    | _ => path.to_path_buf()
  }
}

fn parse_bool(s: &str) -> bool {
  matches!(
    s.trim()
      .to_ascii_lowercase()
      .as_str(),
    "1" | "y" | "yes" | "on" | "true"
  )
}
