use smartstring::{LazyCompact, SmartString};

pub mod config;
pub mod engine;
pub mod interceptor;
pub mod region;
pub mod rules;
pub mod selection;
pub mod transaction;

pub type Tendril = SmartString<LazyCompact>;

pub use crate::{
  config::AutocorrectConfig,
  engine::Autocorrect,
  interceptor::{
    EditKind,
    EditProposal,
  },
  region::RegionClassifier,
  rules::RuleIndex,
};
