//! The edit interceptor: decides, for every proposed edit, whether to hand it
//! back untouched or to rewrite it.
//!
//! Two kinds of edit are candidates:
//!
//! - a backward deletion with a collapsed cursor sitting inside a recognized
//!   empty pair, e.g. `«|»`: both halves go at once;
//! - typing: a literal `""` becomes the configured quote pair, a pairing
//!   opener gets its closer, and a trigger character completing a replacement
//!   sequence turns the sequence into its replacement.
//!
//! Everything else passes through and is returned as the very same
//! transaction. Text typed inside an excluded region is never rewritten; see
//! [`crate::region`].

use ropey::Rope;

use crate::{
  Tendril,
  region::{
    ExclusionCheck,
    RegionClassifier,
  },
  rules::{
    QUOTE_LITERAL,
    RuleIndex,
  },
  selection::{
    Range,
    Selection,
  },
  transaction::{
    Change,
    Transaction,
  },
};

/// What the user did to produce an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditKind {
  Type,
  DeleteBackward,
  DeleteForward,
  Paste,
  Undo,
  Redo,
  Other,
}

/// Dotted user-event prefixes, most specific first.
const USER_EVENTS: &[(&str, EditKind)] = &[
  ("input.type", EditKind::Type),
  ("input.paste", EditKind::Paste),
  ("delete.backward", EditKind::DeleteBackward),
  ("delete.forward", EditKind::DeleteForward),
  ("undo", EditKind::Undo),
  ("redo", EditKind::Redo),
];

impl EditKind {
  /// Parse a dotted user-event tag such as `input.type.compose`. A more
  /// specific suffix keeps the kind of its parent; unknown tags are `Other`.
  pub fn from_user_event(event: &str) -> Self {
    USER_EVENTS
      .iter()
      .find(|(prefix, _)| {
        event
          .strip_prefix(prefix)
          .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
      })
      .map_or(EditKind::Other, |&(_, kind)| kind)
  }
}

/// An edit the host is about to apply, expressed against the document before
/// the edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditProposal {
  pub kind:        EditKind,
  pub transaction: Transaction,
}

impl EditProposal {
  pub fn new(kind: EditKind, transaction: Transaction) -> Self {
    Self { kind, transaction }
  }
}

/// Filter a proposed edit.
///
/// `doc` and `selection` describe the document before the edit. Returns
/// either the proposed transaction itself or a rewritten one carrying a
/// single collapsed cursor. Never fails: if a rewrite cannot be built the
/// proposal is returned as is.
pub fn filter(
  index: &RuleIndex,
  regions: &dyn RegionClassifier,
  doc: &Rope,
  selection: &Selection,
  proposal: EditProposal,
) -> Transaction {
  let EditProposal { kind, transaction } = proposal;

  if transaction.changes().len() != doc.len_chars() {
    tracing::warn!(
      ?kind,
      expected = doc.len_chars(),
      found = transaction.changes().len(),
      "edit does not match the document, keeping the original"
    );
    return transaction;
  }

  let rewritten = match kind {
    EditKind::DeleteBackward if selection.primary().is_empty() => {
      collapse_pair(index, doc, selection.primary().head)
    },
    EditKind::Type if !transaction.changes().is_empty() => {
      expand_typing(index, regions, doc, &transaction)
    },
    _ => None,
  };

  match rewritten {
    Some(Ok(rewritten)) => rewritten,
    Some(Err(err)) => {
      tracing::warn!(?kind, %err, "failed to rewrite edit, keeping the original");
      transaction
    },
    None => transaction,
  }
}

type Rewrite = Option<crate::transaction::Result<Transaction>>;

/// Backspace between the halves of an empty pair removes both.
fn collapse_pair(index: &RuleIndex, doc: &Rope, cursor: usize) -> Rewrite {
  if cursor == 0 || cursor + 1 > doc.len_chars() {
    return None;
  }

  let around = Range::new(cursor - 1, cursor + 1).fragment(doc.slice(..));
  if !index.is_empty_pair(&around) {
    tracing::trace!(cursor, %around, "no empty pair around cursor");
    return None;
  }

  tracing::debug!(cursor, pair = %around, "collapsing empty pair");
  Some(
    Transaction::delete(doc, [(cursor - 1, cursor + 1)])
      .map(|tx| tx.with_selection(Selection::point(cursor - 1))),
  )
}

/// A rewritten sub-edit and where the cursor goes inside its new text.
struct Candidate {
  change: Change,
  /// Offset of the cursor from the start of the rewritten change, in chars.
  cursor: usize,
  rule:   &'static str,
}

/// Fold state over the sub-edits of a typing batch.
#[derive(Default)]
struct Expansion {
  changes:   Vec<Change>,
  /// End of the last sub-edit seen, in before-document coordinates. Context
  /// lookups never reach behind it.
  floor:     usize,
  /// Chars inserted and removed by the sub-edits kept so far.
  inserted:  usize,
  deleted:   usize,
  /// Set once a sub-edit has been rewritten; everything after it passes
  /// through.
  rewritten: Option<usize>,
}

impl Expansion {
  fn keep(&mut self, change: Change) {
    let (from, to, ref text) = change;
    self.inserted += text.as_ref().map_or(0, |text| text.chars().count());
    self.deleted += to - from;
    self.floor = to;
    self.changes.push(change);
  }
}

fn expand_typing(
  index: &RuleIndex,
  regions: &dyn RegionClassifier,
  doc: &Rope,
  transaction: &Transaction,
) -> Rewrite {
  let mut exclusions = ExclusionCheck::new(regions, doc);

  let expansion = transaction
    .changes_iter()
    .fold(Expansion::default(), |mut acc, change| {
      if acc.rewritten.is_some() {
        acc.keep(change);
        return acc;
      }

      let from = change.0;
      match candidate(index, doc, &change, acc.floor) {
        Some(rewrite) if !exclusions.is_excluded(from) => {
          let (start, ..) = rewrite.change;
          // earlier sub-edits are all kept verbatim and lie before `start`
          let cursor = start - acc.deleted + acc.inserted + rewrite.cursor;
          tracing::debug!(rule = rewrite.rule, from, cursor, "rewriting typed text");
          acc.keep(rewrite.change);
          acc.rewritten = Some(cursor);
        },
        Some(_) => {
          tracing::trace!(from, "typed inside an excluded region");
          acc.keep(change);
        },
        None => acc.keep(change),
      }
      acc
    });

  let cursor = expansion.rewritten?;
  Some(
    Transaction::change(doc, expansion.changes)
      .map(|tx| tx.with_selection(Selection::point(cursor))),
  )
}

/// The rewrite for a single sub-edit, if a rule applies to it.
fn candidate(index: &RuleIndex, doc: &Rope, change: &Change, floor: usize) -> Option<Candidate> {
  let (from, to, Some(text)) = change else {
    return None;
  };
  let (from, to) = (*from, *to);

  if text.as_str() == QUOTE_LITERAL && from == to {
    if let Some(quotes) = index.quotes() {
      let mut pair = quotes.opening.clone();
      pair.push_str(&quotes.closing);
      return Some(Candidate {
        change: (from, to, Some(pair)),
        cursor: quotes.opening.chars().count(),
        rule:   "quote",
      });
    }
  }

  let mut chars = text.chars();
  let (Some(typed), None) = (chars.next(), chars.next()) else {
    return None;
  };

  if let Some(closer) = index.closer(typed) {
    let mut pair = Tendril::new();
    pair.push(typed);
    pair.push_str(closer);
    return Some(Candidate {
      change: (from, to, Some(pair)),
      cursor: 1,
      rule:   "pair",
    });
  }

  index
    .replacements(typed)
    .iter()
    .find_map(|rule| {
      let context_len = rule.context_len();
      let start = from.checked_sub(context_len).filter(|&start| start >= floor)?;
      (doc.slice(start..from) == rule.context.as_str()).then(|| {
        Candidate {
          change: (start, to, Some(rule.replacement.clone())),
          cursor: rule.replacement_len(),
          rule:   "replacement",
        }
      })
    })
}
