use std::path::PathBuf;

use clap::{
  ArgAction,
  Parser,
  ValueEnum,
};

#[derive(Clone, Debug)]
pub struct CliOptions {
  pub verbosity:    u8,
  /// `Some(None)` logs to the default log file in the cache directory.
  pub log_file:     Option<Option<PathBuf>>,
  pub config_file:  Option<PathBuf>,
  pub regions:      RegionMode,
  pub close_quotes: bool,
  pub initial:      Option<PathBuf>,
  pub script:       Option<PathBuf>,
}

impl CliOptions {
  pub fn parse() -> Self {
    RawCli::parse().into()
  }
}

/// How the replayed document is classified for excluded regions.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum RegionMode {
  /// Scan the document as Markdown.
  Markdown,
  /// Rewrite everywhere.
  #[value(name = "none")]
  Disabled,
}

#[derive(Parser, Debug)]
#[command(
  name = "the-autocorrect",
  about = "Replay a keystroke script through the autocorrect engine",
  long_about = None,
  version
)]
struct RawCli {
  /// Increase logging verbosity (repeat for more detail)
  #[arg(short = 'v', action = ArgAction::Count)]
  verbosity: u8,

  /// Save logs to a file instead of stderr (the cache directory's log file
  /// unless `--log=FILE` is given)
  #[arg(long = "log", value_name = "FILE", num_args = 0..=1, require_equals = true)]
  log_file: Option<Option<PathBuf>>,

  /// Load configuration from a specific file instead of the user config
  #[arg(short = 'c', long = "config", value_name = "FILE")]
  config_file: Option<PathBuf>,

  /// Excluded-region detection
  #[arg(long, value_enum, default_value = "markdown")]
  regions: RegionMode,

  /// Auto-close typed straight double quotes, as many editors do
  #[arg(long)]
  close_quotes: bool,

  /// Starting document; the cursor is placed at its end
  #[arg(long, value_name = "FILE")]
  initial: Option<PathBuf>,

  /// Keystroke script (`\b` backspace, `\n` newline, `\\` backslash); read
  /// from stdin when omitted
  #[arg(value_name = "SCRIPT")]
  script: Option<PathBuf>,
}

impl From<RawCli> for CliOptions {
  fn from(raw: RawCli) -> Self {
    Self {
      verbosity:    raw.verbosity,
      log_file:     raw.log_file,
      config_file:  raw.config_file,
      regions:      raw.regions,
      close_quotes: raw.close_quotes,
      initial:      raw.initial,
      script:       raw.script,
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;

  fn parse(args: &[&str]) -> CliOptions {
    RawCli::try_parse_from(std::iter::once("the-autocorrect").chain(args.iter().copied()))
      .unwrap()
      .into()
  }

  #[test]
  fn defaults() {
    let options = parse(&[]);
    assert_eq!(options.verbosity, 0);
    assert_eq!(options.regions, RegionMode::Markdown);
    assert!(!options.close_quotes);
    assert!(options.script.is_none());
    assert!(options.config_file.is_none());
    assert!(options.log_file.is_none());
  }

  #[test]
  fn log_without_file_uses_default() {
    let options = parse(&["--log", "keys.txt"]);
    assert_eq!(options.log_file, Some(None));
    assert_eq!(options.script, Some(PathBuf::from("keys.txt")));
  }

  #[test]
  fn all_options() {
    let options = parse(&[
      "-vv",
      "--log=replay.log",
      "-c",
      "rules.toml",
      "--regions",
      "none",
      "--close-quotes",
      "--initial",
      "note.md",
      "keys.txt",
    ]);
    assert_eq!(options.verbosity, 2);
    assert_eq!(options.log_file, Some(Some(PathBuf::from("replay.log"))));
    assert_eq!(options.config_file, Some(PathBuf::from("rules.toml")));
    assert_eq!(options.regions, RegionMode::Disabled);
    assert!(options.close_quotes);
    assert_eq!(options.initial, Some(PathBuf::from("note.md")));
    assert_eq!(options.script, Some(PathBuf::from("keys.txt")));
  }

  #[test]
  fn rejects_unknown_region_mode() {
    let result = RawCli::try_parse_from(["the-autocorrect", "--regions", "org"]);
    assert!(result.is_err());
  }
}
