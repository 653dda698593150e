//! The engine handle a host keeps around.
//!
//! [`Autocorrect`] owns the active [`RuleIndex`] and the region classifier.
//! Rebuilding swaps a fresh index in wholesale: a filter call that already
//! loaded the previous snapshot finishes with it, the next call sees the new
//! one. Nothing is locked.

use std::{
  fmt,
  sync::Arc,
};

use arc_swap::ArcSwap;
use ropey::Rope;

use crate::{
  config::AutocorrectConfig,
  interceptor::{
    self,
    EditProposal,
  },
  region::RegionClassifier,
  rules::RuleIndex,
  selection::Selection,
  transaction::Transaction,
};

pub struct Autocorrect {
  index:   ArcSwap<RuleIndex>,
  regions: Box<dyn RegionClassifier + Send + Sync>,
}

impl Autocorrect {
  pub fn new<R>(config: &AutocorrectConfig, regions: R) -> Self
  where
    R: RegionClassifier + Send + Sync + 'static,
  {
    Self {
      index:   ArcSwap::from_pointee(RuleIndex::build(config)),
      regions: Box::new(regions),
    }
  }

  /// Compile `config` and make it the active rule set.
  pub fn rebuild_index(&self, config: &AutocorrectConfig) {
    let index = RuleIndex::build(config);
    self.index.store(Arc::new(index));
    tracing::debug!("swapped in rebuilt rule index");
  }

  /// The active rule set.
  pub fn index(&self) -> Arc<RuleIndex> {
    self.index.load_full()
  }

  /// Filter a proposed edit against the rule set active at call time. See
  /// [`interceptor::filter`].
  pub fn filter(&self, doc: &Rope, selection: &Selection, proposal: EditProposal) -> Transaction {
    let index = self.index.load();
    interceptor::filter(&index, self.regions.as_ref(), doc, selection, proposal)
  }
}

impl fmt::Debug for Autocorrect {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Autocorrect")
      .field("index", &self.index.load_full())
      .finish_non_exhaustive()
  }
}
