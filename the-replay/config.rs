//! Layered configuration: the user file, then the workspace file on top.

use std::{
  fmt,
  fs,
  io::{
    Error as IOError,
    ErrorKind,
  },
};

use the_autocorrect_lib::AutocorrectConfig;
use the_autocorrect_loader::merge_toml_values;
use toml::{
  Value,
  de::Error as TomlError,
};

#[derive(Debug)]
pub enum ConfigLoadError {
  BadConfig(TomlError),
  Error(IOError),
}

impl fmt::Display for ConfigLoadError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::BadConfig(err) => write!(f, "bad config: {err}"),
      Self::Error(err) => write!(f, "failed to read config: {err}"),
    }
  }
}

impl std::error::Error for ConfigLoadError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      Self::BadConfig(err) => Some(err),
      Self::Error(err) => Some(err),
    }
  }
}

impl ConfigLoadError {
  fn is_missing(&self) -> bool {
    matches!(self, Self::Error(err) if err.kind() == ErrorKind::NotFound)
  }
}

/// Combine the user (`global`) and workspace (`local`) file contents.
///
/// A file that failed to read is skipped; a file that fails to parse fails
/// the whole load. With neither file present the defaults apply.
pub fn load(
  global: Result<String, ConfigLoadError>,
  local: Result<String, ConfigLoadError>,
) -> Result<AutocorrectConfig, ConfigLoadError> {
  let global_config: Result<Value, ConfigLoadError> =
    global.and_then(|file| toml::from_str(&file).map_err(ConfigLoadError::BadConfig));
  let local_config: Result<Value, ConfigLoadError> =
    local.and_then(|file| toml::from_str(&file).map_err(ConfigLoadError::BadConfig));

  let merged = match (global_config, local_config) {
    (Ok(global), Ok(local)) => merge_toml_values(global, local, 3),
    (_, Err(ConfigLoadError::BadConfig(err))) | (Err(ConfigLoadError::BadConfig(err)), _) => {
      return Err(ConfigLoadError::BadConfig(err));
    },
    (Ok(config), Err(err)) | (Err(err), Ok(config)) => {
      tracing::debug!(%err, "using a single config file");
      config
    },
    (Err(global), Err(local)) => {
      if !global.is_missing() {
        return Err(global);
      }
      if !local.is_missing() {
        return Err(local);
      }
      tracing::debug!("no config files, using defaults");
      return Ok(AutocorrectConfig::default());
    },
  };

  AutocorrectConfig::from_toml(merged).map_err(ConfigLoadError::BadConfig)
}

/// Load the user config and the workspace config using the loader's file
/// locations.
pub fn load_user() -> Result<AutocorrectConfig, ConfigLoadError> {
  let global_config =
    fs::read_to_string(the_autocorrect_loader::config_file()).map_err(ConfigLoadError::Error);
  let local_config = fs::read_to_string(the_autocorrect_loader::workspace_config_file())
    .map_err(ConfigLoadError::Error);
  load(global_config, local_config)
}

#[cfg(test)]
mod test {
  use std::io::Write;

  use the_autocorrect_lib::config::{
    DEFAULT_PAIRS,
    ReplacementConfig,
  };

  use super::*;

  fn missing() -> Result<String, ConfigLoadError> {
    Err(ConfigLoadError::Error(IOError::from(ErrorKind::NotFound)))
  }

  fn file(text: &str) -> Result<String, ConfigLoadError> {
    Ok(text.to_string())
  }

  #[test]
  fn no_files_yield_defaults() {
    let config = load(missing(), missing()).unwrap();
    assert_eq!(config, AutocorrectConfig::default());
  }

  #[test]
  fn single_file_is_used() {
    let config = load(missing(), file("[quotes]\nenabled = false\n")).unwrap();
    assert!(!config.quotes.enabled);
    assert_eq!(config.pairs.len(), DEFAULT_PAIRS.len());

    let config = load(file("pairs = []\n"), missing()).unwrap();
    assert!(config.pairs.is_empty());
  }

  #[test]
  fn workspace_rules_come_after_user_rules() {
    let user = r#"
      [[replacements]]
      from = "->"
      to = "→"

      [[replacements]]
      from = "<<"
      to = "«"
    "#;
    let workspace = r#"
      [[replacements]]
      from = "->"
      to = "⟶"

      [[replacements]]
      from = "(c)"
      to = "©"
    "#;

    let config = load(file(user), file(workspace)).unwrap();
    assert_eq!(config.replacements, vec![
      ReplacementConfig::from(("<<", "«")),
      ReplacementConfig::from(("->", "⟶")),
      ReplacementConfig::from(("(c)", "©")),
    ]);
  }

  #[test]
  fn parse_errors_are_fatal() {
    let result = load(file("[[replacements]\n"), missing());
    assert!(matches!(result, Err(ConfigLoadError::BadConfig(_))));

    let result = load(file("pairs = []\n"), file("quotes = 3\n"));
    assert!(matches!(result, Err(ConfigLoadError::BadConfig(_))));

    let result = load(missing(), file("unknown = true\n"));
    assert!(matches!(result, Err(ConfigLoadError::BadConfig(_))));
  }

  #[test]
  fn unreadable_files_are_reported() {
    let denied = Err(ConfigLoadError::Error(IOError::from(
      ErrorKind::PermissionDenied,
    )));
    let result = load(denied, missing());
    assert!(matches!(result, Err(ConfigLoadError::Error(_))));
  }

  #[test]
  fn reads_from_disk() {
    let mut config_file = tempfile::NamedTempFile::new().unwrap();
    writeln!(config_file, "[[pairs]]\nopen = \"(\"\nclose = \")\"").unwrap();

    let global = fs::read_to_string(config_file.path()).map_err(ConfigLoadError::Error);
    let config = load(global, missing()).unwrap();
    assert_eq!(config.pairs.len(), 1);
    assert_eq!(config.pairs[0].open, "(");
  }
}
