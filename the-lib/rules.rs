//! Compiled rule lookups.
//!
//! [`RuleIndex::build`] turns an [`AutocorrectConfig`] into the structures the
//! interceptor consults on every keystroke:
//!
//! - replacement rules grouped by their trigger character, in declaration
//!   order,
//! - the closer for each single-character pairing opener,
//! - the set of empty pairs that collapse on backspace,
//! - the quote pair, when quote conversion is enabled.
//!
//! Building never fails. Malformed rules are dropped and reported at `trace`
//! level only.

use std::collections::{
  HashMap,
  HashSet,
};

use crate::{
  Tendril,
  config::{
    AutocorrectConfig,
    PairConfig,
    QuoteConfig,
    ReplacementConfig,
  },
};

/// The literal a host inserts when it auto-closes a straight double quote.
pub const QUOTE_LITERAL: &str = "\"\"";

/// A replacement keyed by the last character of its trigger sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplacementRule {
  pub trigger:     char,
  /// Text that must directly precede the typed trigger. May be empty.
  pub context:     Tendril,
  pub replacement: Tendril,
}

impl ReplacementRule {
  /// Split a raw `from -> to` rule. `None` when either side is empty.
  pub fn new(from: &str, to: &str) -> Option<Self> {
    if to.is_empty() {
      return None;
    }
    let (context_len, trigger) = from.char_indices().last()?;
    Some(Self {
      trigger,
      context: Tendril::from(&from[..context_len]),
      replacement: Tendril::from(to),
    })
  }

  pub fn context_len(&self) -> usize {
    self.context.chars().count()
  }

  /// Length in chars of the whole trigger sequence, context included.
  pub fn trigger_len(&self) -> usize {
    self.context_len() + 1
  }

  pub fn replacement_len(&self) -> usize {
    self.replacement.chars().count()
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotePair {
  pub opening: Tendril,
  pub closing: Tendril,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RuleIndex {
  replacements: HashMap<char, Vec<ReplacementRule>>,
  closers:      HashMap<char, Tendril>,
  empty_pairs:  HashSet<Tendril>,
  quotes:       Option<QuotePair>,
}

impl RuleIndex {
  pub fn build(config: &AutocorrectConfig) -> Self {
    let mut index = Self::default();

    for rule in &config.replacements {
      index.add_replacement(rule);
    }
    for pair in &config.pairs {
      index.add_pair(pair);
    }
    index.set_quotes(&config.quotes);

    tracing::debug!(
      triggers = index.replacements.len(),
      openers = index.closers.len(),
      empty_pairs = index.empty_pairs.len(),
      quotes = index.quotes.is_some(),
      "built autocorrect rule index"
    );
    index
  }

  fn add_replacement(&mut self, raw: &ReplacementConfig) {
    let Some(rule) = ReplacementRule::new(&raw.from, &raw.to) else {
      tracing::trace!(from = %raw.from, to = %raw.to, "skipping malformed replacement");
      return;
    };
    self.replacements.entry(rule.trigger).or_default().push(rule);
  }

  fn add_pair(&mut self, raw: &PairConfig) {
    if raw.open.is_empty() || raw.close.is_empty() {
      tracing::trace!(open = %raw.open, close = %raw.close, "skipping malformed pair");
      return;
    }

    let mut empty = Tendril::from(raw.open.as_str());
    empty.push_str(&raw.close);
    self.empty_pairs.insert(empty);

    let mut chars = raw.open.chars();
    match (chars.next(), chars.next()) {
      (Some(open), None) => {
        self.closers.insert(open, Tendril::from(raw.close.as_str()));
      },
      _ => {
        // only single characters are typed as triggers
        tracing::trace!(open = %raw.open, "pair opener is not a single character");
      },
    }
  }

  fn set_quotes(&mut self, quotes: &QuoteConfig) {
    if !quotes.enabled {
      return;
    }
    if quotes.opening.is_empty() || quotes.closing.is_empty() {
      tracing::trace!("quote conversion enabled without quote marks");
      return;
    }

    let pair = QuotePair {
      opening: Tendril::from(quotes.opening.as_str()),
      closing: Tendril::from(quotes.closing.as_str()),
    };
    let mut empty = pair.opening.clone();
    empty.push_str(&pair.closing);
    self.empty_pairs.insert(empty);
    self.quotes = Some(pair);
  }

  /// Replacement rules for `trigger`, in declaration order.
  pub fn replacements(&self, trigger: char) -> &[ReplacementRule] {
    self
      .replacements
      .get(&trigger)
      .map(Vec::as_slice)
      .unwrap_or_default()
  }

  pub fn closer(&self, open: char) -> Option<&str> {
    self.closers.get(&open).map(Tendril::as_str)
  }

  pub fn is_empty_pair(&self, text: &str) -> bool {
    self.empty_pairs.contains(text)
  }

  pub fn quotes(&self) -> Option<&QuotePair> {
    self.quotes.as_ref()
  }

  /// True when no rule of any kind is registered.
  pub fn is_empty(&self) -> bool {
    self.replacements.is_empty() && self.closers.is_empty() && self.quotes.is_none()
  }
}
