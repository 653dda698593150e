//! Scripted host for the autocorrect engine.
//!
//! Reads a keystroke script, replays it keystroke by keystroke through the
//! engine with the layered user/workspace configuration, and prints the
//! resulting document.

mod cli;
mod config;
mod host;
mod logging;

use std::{
  fs,
  io::{
    self,
    Read,
  },
};

use eyre::{
  Result,
  WrapErr,
  bail,
};
use the_autocorrect_lib::{
  Autocorrect,
  region::{
    MarkdownRegions,
    NoRegions,
  },
};

use crate::{
  cli::{
    CliOptions,
    RegionMode,
  },
  host::{
    Host,
    parse_script,
  },
};

fn main() -> Result<()> {
  let args = CliOptions::parse();

  if let Some(file) = &args.log_file {
    the_autocorrect_loader::initialize_log_file(file.clone());
    logging::setup_logging(
      args.verbosity,
      Some(the_autocorrect_loader::log_file().as_path()),
    )?;
  } else {
    logging::setup_logging(args.verbosity, None)?;
  }

  if let Some(file) = &args.config_file {
    if !file.exists() {
      bail!("config file {} does not exist", file.display());
    }
  }
  the_autocorrect_loader::initialize_config_file(args.config_file.clone());
  let config = config::load_user().wrap_err("failed to load configuration")?;

  let engine = match args.regions {
    RegionMode::Markdown => Autocorrect::new(&config, MarkdownRegions),
    RegionMode::Disabled => Autocorrect::new(&config, NoRegions),
  };

  let initial = match &args.initial {
    Some(path) => {
      fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read initial document {}", path.display()))?
    },
    None => String::new(),
  };

  let script = match &args.script {
    Some(path) => {
      fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read script {}", path.display()))?
    },
    None => {
      let mut script = String::new();
      io::stdin()
        .read_to_string(&mut script)
        .wrap_err("failed to read script from stdin")?;
      script
    },
  };

  let keys = parse_script(&script);
  log::info!("replaying {} keystrokes", keys.len());

  let mut host = Host::new(engine, &initial, args.close_quotes);
  host.replay(keys)?;

  println!("{}", host.text());
  Ok(())
}
