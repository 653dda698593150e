use std::{
  path::{
    Path,
    PathBuf,
  },
  sync::OnceLock,
};

use etcetera::base_strategy::{
  BaseStrategy,
  choose_base_strategy,
};

const APP_DIR: &str = "the-autocorrect";
const WORKSPACE_DIR: &str = ".the-autocorrect";

static CONFIG_FILE: OnceLock<PathBuf> = OnceLock::new();

static LOG_FILE: OnceLock<PathBuf> = OnceLock::new();

/// Use `specified_file` instead of the user config file. Only the first call
/// has an effect.
pub fn initialize_config_file(specified_file: Option<PathBuf>) {
  let config_file = specified_file.unwrap_or_else(default_config_file);
  CONFIG_FILE.set(config_file).ok();
}

pub fn initialize_log_file(specified_file: Option<PathBuf>) {
  let log_file = specified_file.unwrap_or_else(default_log_file);
  ensure_parent_dir(&log_file);
  LOG_FILE.set(log_file).ok();
}

pub fn config_dir() -> PathBuf {
  if let Ok(dir) = std::env::var("THE_AUTOCORRECT_CONFIG_DIR") {
    return expand_tilde(Path::new(&dir));
  }
  match choose_base_strategy() {
    Ok(strategy) => strategy.config_dir().join(APP_DIR),
    Err(err) => {
      tracing::warn!(%err, "no platform config directory, using the working directory");
      PathBuf::from(APP_DIR)
    },
  }
}

pub fn cache_dir() -> PathBuf {
  if let Ok(dir) = std::env::var("THE_AUTOCORRECT_CACHE_DIR") {
    return expand_tilde(Path::new(&dir));
  }
  match choose_base_strategy() {
    Ok(strategy) => strategy.cache_dir().join(APP_DIR),
    Err(err) => {
      tracing::warn!(%err, "no platform cache directory, using the working directory");
      PathBuf::from(APP_DIR)
    },
  }
}

pub fn config_file() -> PathBuf {
  CONFIG_FILE.get_or_init(default_config_file).clone()
}

pub fn log_file() -> PathBuf {
  LOG_FILE
    .get_or_init(|| {
      let path = default_log_file();
      ensure_parent_dir(&path);
      path
    })
    .clone()
}

pub fn workspace_config_file() -> PathBuf {
  find_workspace().0.join(WORKSPACE_DIR).join("config.toml")
}

pub fn default_log_file() -> PathBuf {
  cache_dir().join("the-autocorrect.log")
}

fn default_config_file() -> PathBuf {
  config_dir().join("config.toml")
}

/// Merge two TOML documents, merging values from `right` onto `left`.
///
/// `merge_depth` sets the nesting depth up to which values are merged instead
/// of overridden.
///
/// Tables are merged key by key. Arrays are appended, except that an entry of
/// `right` with the same `from` (a replacement) or `open` (a pair) as an entry
/// of `left` is merged onto that entry and moved to the end. So a workspace
/// rule redefines a user rule for the same sequence instead of shadowing it.
///
/// `merge_toml_values(user, workspace, 3)` combines
///
/// ```toml
/// [[replacements]]
/// from = "->"
/// to = "→"
///
/// [[replacements]]
/// from = "<<"
/// to = "«"
/// ```
///
/// and
///
/// ```toml
/// [[replacements]]
/// from = "->"
/// to = "⟶"
/// ```
///
/// into
///
/// ```toml
/// [[replacements]]
/// from = "<<"
/// to = "«"
///
/// [[replacements]]
/// from = "->"
/// to = "⟶"
/// ```
pub fn merge_toml_values(left: toml::Value, right: toml::Value, merge_depth: usize) -> toml::Value {
  use toml::Value;

  fn get_key(v: &Value) -> Option<(&'static str, &str)> {
    ["from", "open"]
      .into_iter()
      .find_map(|key| v.get(key).and_then(Value::as_str).map(|value| (key, value)))
  }

  match (left, right) {
    (Value::Array(mut left_items), Value::Array(right_items)) => {
      if merge_depth > 0 {
        left_items.reserve(right_items.len());
        for rvalue in right_items {
          let lvalue = get_key(&rvalue)
            .and_then(|rkey| left_items.iter().position(|v| get_key(v) == Some(rkey)))
            .map(|lpos| left_items.remove(lpos));
          let mvalue = match lvalue {
            Some(lvalue) => merge_toml_values(lvalue, rvalue, merge_depth - 1),
            None => rvalue,
          };
          left_items.push(mvalue);
        }
        Value::Array(left_items)
      } else {
        Value::Array(right_items)
      }
    },
    (Value::Table(mut left_map), Value::Table(right_map)) => {
      if merge_depth > 0 {
        for (rname, rvalue) in right_map {
          match left_map.remove(&rname) {
            Some(lvalue) => {
              let merged_value = merge_toml_values(lvalue, rvalue, merge_depth - 1);
              left_map.insert(rname, merged_value);
            },
            None => {
              left_map.insert(rname, rvalue);
            },
          }
        }
        Value::Table(left_map)
      } else {
        Value::Table(right_map)
      }
    },
    // Catch everything else we didn't handle, and use the right value
    (_, value) => value,
  }
}

/// Finds the current workspace folder.
///
/// Searches upward from the working directory and returns the first directory
/// that contains `.git`, `.svn`, `.jj` or `.the-autocorrect`. If none is found
/// returns (CWD, true). Otherwise (workspace, false) is returned.
pub fn find_workspace() -> (PathBuf, bool) {
  match std::env::current_dir() {
    Ok(current_dir) => find_workspace_in(current_dir),
    Err(_) => (PathBuf::new(), true),
  }
}

pub fn find_workspace_in(dir: impl AsRef<Path>) -> (PathBuf, bool) {
  let dir = dir.as_ref();
  for ancestor in dir.ancestors() {
    if ancestor.join(".git").exists()
      || ancestor.join(".svn").exists()
      || ancestor.join(".jj").exists()
      || ancestor.join(WORKSPACE_DIR).exists()
    {
      return (ancestor.to_owned(), false);
    }
  }

  (dir.to_owned(), true)
}

/// Replace a leading `~` with the home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let mut components = path.components();
  if let Some(std::path::Component::Normal(first)) = components.next()
    && first == "~"
    && let Ok(mut home) = etcetera::home_dir()
  {
    home.push(components.as_path());
    return home;
  }
  path.to_path_buf()
}

fn ensure_parent_dir(path: &Path) {
  if let Some(parent) = path.parent()
    && !parent.exists()
  {
    std::fs::create_dir_all(parent).ok();
  }
}
