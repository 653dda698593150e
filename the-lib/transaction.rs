//! Edit batches as seen by the interceptor.
//!
//! A host proposes an edit as a [`Transaction`]: a [`ChangeSet`] expressed
//! against the document *before* the edit, plus an optional resulting
//! [`Selection`]. The interceptor either hands that transaction back untouched
//! or builds a replacement with [`Transaction::change`].
//!
//! # Operations
//!
//! A [`ChangeSet`] is a sequence of [`Operation`]s walked from the start of
//! the document:
//!
//! - **Retain(n)** - keep `n` characters
//! - **Delete(n)** - remove `n` characters
//! - **Insert(s)** - insert `s`
//!
//! All lengths and positions are char indices, matching [`ropey::Rope`].
//!
//! ```
//! use ropey::Rope;
//! use the_autocorrect_lib::transaction::{
//!   Transaction,
//!   TransactionError,
//! };
//!
//! # fn main() -> Result<(), TransactionError> {
//! let doc = Rope::from("a<");
//! let tx = Transaction::change(&doc, [(1, 2, Some("«".into()))])?;
//! assert_eq!(tx.apply_to(&doc)?.to_string(), "a«");
//! # Ok(())
//! # }
//! ```
//!
//! # Sub-edits
//!
//! [`Transaction::changes_iter`] yields the atomic `(from, to, text)` sub-edits
//! of a batch in document order. The interceptor folds over exactly this
//! sequence.

use ropey::{
  Rope,
  RopeBuilder,
  RopeSlice,
};
use thiserror::Error;

use crate::{
  Tendril,
  selection::Selection,
};

pub type Result<T> = std::result::Result<T, TransactionError>;

/// (from, to) replacement.
pub type Change = (usize, usize, Option<Tendril>);
pub type Deletion = (usize, usize);

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransactionError {
  #[error("changeset length mismatch: expected {expected}, got {actual}")]
  LengthMismatch { expected: usize, actual: usize },
  #[error("invalid change range: start {from} is after end {to}")]
  InvalidRange { from: usize, to: usize },
  #[error("change range {from}..{to} is out of bounds for document length {len}")]
  RangeOutOfBounds {
    from: usize,
    to:   usize,
    len:  usize,
  },
  #[error("change range {from}..{to} overlaps previous end {prev_end}")]
  OverlappingRange {
    prev_end: usize,
    from:     usize,
    to:       usize,
  },
  #[error("position {pos} is out of bounds for changeset length {len}")]
  PositionOutOfBounds { pos: usize, len: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
  /// Move cursor by n characters.
  Retain(usize),

  /// Delete n characters.
  Delete(usize),

  /// Insert text at position.
  Insert(Tendril),
}

/// Which side of an insertion a mapped position sticks to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Assoc {
  Before,
  After,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ChangeSet {
  changes:   Vec<Operation>,
  /// The required document length. Will refuse to apply changes unless it
  /// matches.
  len:       usize,
  len_after: usize,
}

impl ChangeSet {
  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      changes:   Vec::with_capacity(capacity),
      len:       0,
      len_after: 0,
    }
  }

  #[must_use]
  pub fn new(doc: RopeSlice) -> Self {
    let len = doc.len_chars();
    Self {
      changes: Vec::new(),
      len,
      len_after: len,
    }
  }

  pub fn operations(&self) -> &[Operation] {
    &self.changes
  }

  /// Returns the expected document length for this changeset
  pub fn len(&self) -> usize {
    self.len
  }

  /// Document length once the changeset is applied.
  pub fn len_after(&self) -> usize {
    self.len_after
  }

  // Changeset builder operations: delete/insert/retain.
  //

  pub fn delete(&mut self, n: usize) {
    use Operation::*;

    if n == 0 {
      return;
    }

    self.len += n;

    if let Some(Delete(count)) = self.changes.last_mut() {
      *count += n;
    } else {
      self.changes.push(Delete(n))
    }
  }

  pub fn insert(&mut self, fragment: Tendril) {
    use Operation::*;

    if fragment.is_empty() {
      return;
    }

    self.len_after += fragment.chars().count();

    // Keep inserts in front of deletes so a replacement always reads as
    // Insert followed by Delete.
    let new_last = match self.changes.as_mut_slice() {
      [.., Insert(prev)] | [.., Insert(prev), Delete(_)] => {
        prev.push_str(&fragment);
        return;
      },
      [.., last @ Delete(_)] => std::mem::replace(last, Insert(fragment)),
      _ => Insert(fragment),
    };

    self.changes.push(new_last);
  }

  pub fn retain(&mut self, n: usize) {
    use Operation::*;

    if n == 0 {
      return;
    }

    self.len += n;
    self.len_after += n;

    if let Some(Retain(count)) = self.changes.last_mut() {
      *count += n;
    } else {
      self.changes.push(Retain(n))
    }
  }

  fn ensure_len(&self, text_len: usize) -> Result<()> {
    if text_len != self.len {
      return Err(TransactionError::LengthMismatch {
        expected: self.len,
        actual:   text_len,
      });
    }
    Ok(())
  }

  /// Apply this changeset in-place.
  pub fn apply(&self, text: &mut Rope) -> Result<()> {
    self.ensure_len(text.len_chars())?;
    let mut pos = 0;

    for change in &self.changes {
      use Operation::*;
      match change {
        Retain(n) => pos += n,
        Delete(n) => text.remove(pos..pos + *n),
        Insert(s) => {
          text.insert(pos, s);
          pos += s.chars().count();
        },
      }
    }

    Ok(())
  }

  /// Apply this changeset to a rope and return the updated rope.
  pub fn apply_to(&self, text: &Rope) -> Result<Rope> {
    self.ensure_len(text.len_chars())?;
    if self.is_empty() {
      return Ok(text.clone());
    }

    let mut builder = RopeBuilder::new();
    let mut pos = 0;

    let append_slice = |from: usize, to: usize, builder: &mut RopeBuilder| {
      if from >= to {
        return;
      }
      for chunk in text.slice(from..to).chunks() {
        builder.append(chunk);
      }
    };

    for change in &self.changes {
      use Operation::*;
      match change {
        Retain(n) => {
          append_slice(pos, pos + *n, &mut builder);
          pos += n;
        },
        Delete(n) => pos += n,
        Insert(s) => builder.append(s.as_str()),
      }
    }

    append_slice(pos, self.len, &mut builder);

    Ok(builder.finish())
  }

  /// True when applying the changeset leaves the document as it was.
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.changes.is_empty() || self.changes == [Operation::Retain(self.len)]
  }

  /// Map a position in the old document to the new document.
  ///
  /// Positions inside a deleted span collapse to its start. At an insertion
  /// point `Before` stays in front of the inserted text and `After` moves past
  /// it. For a replacement (insert directly followed by delete) a position at
  /// its start keeps to the start regardless of `assoc`.
  pub fn map_pos(&self, pos: usize, assoc: Assoc) -> Result<usize> {
    use Operation::*;

    if pos > self.len {
      return Err(TransactionError::PositionOutOfBounds { pos, len: self.len });
    }

    let mut old_pos = 0;
    let mut new_pos = 0;
    let mut iter = self.changes.iter().peekable();

    while let Some(change) = iter.next() {
      match change {
        Retain(n) => {
          if pos < old_pos + n {
            return Ok(new_pos + (pos - old_pos));
          }
          old_pos += n;
          new_pos += n;
        },
        Delete(n) => {
          if pos < old_pos + n {
            return Ok(new_pos);
          }
          old_pos += n;
        },
        Insert(s) => {
          let ins = s.chars().count();
          // a subsequent delete means a replace, consume it
          if let Some(Delete(n)) = iter.peek() {
            let n = *n;
            iter.next();
            if pos == old_pos {
              return Ok(new_pos);
            }
            if pos < old_pos + n {
              return Ok(match assoc {
                Assoc::Before => new_pos,
                Assoc::After => new_pos + ins,
              });
            }
            old_pos += n;
          } else if pos == old_pos {
            return Ok(match assoc {
              Assoc::Before => new_pos,
              Assoc::After => new_pos + ins,
            });
          }
          new_pos += ins;
        },
      }
    }

    // only the end of the document is left
    Ok(new_pos)
  }

  pub fn changes_iter(&self) -> ChangeIterator<'_> {
    ChangeIterator::new(self)
  }
}

/// Yields the `(from, to, text)` sub-edits of a changeset in document order.
pub struct ChangeIterator<'a> {
  iter: std::iter::Peekable<std::slice::Iter<'a, Operation>>,
  pos:  usize,
}

impl<'a> ChangeIterator<'a> {
  fn new(changeset: &'a ChangeSet) -> Self {
    let iter = changeset.changes.iter().peekable();
    Self { iter, pos: 0 }
  }
}

impl Iterator for ChangeIterator<'_> {
  type Item = Change;

  fn next(&mut self) -> Option<Self::Item> {
    use Operation::*;

    loop {
      match self.iter.next()? {
        Retain(len) => {
          self.pos += len;
        },
        Delete(len) => {
          let start = self.pos;
          self.pos += len;
          return Some((start, self.pos, None));
        },
        Insert(s) => {
          let start = self.pos;
          if let Some(Delete(len)) = self.iter.peek() {
            self.iter.next();

            self.pos += len;
            return Some((start, self.pos, Some(s.clone())));
          } else {
            return Some((start, start, Some(s.clone())));
          }
        },
      }
    }
  }
}

fn validate_change_bounds(from: usize, to: usize, len: usize) -> Result<()> {
  if from > to {
    return Err(TransactionError::InvalidRange { from, to });
  }
  if to > len {
    return Err(TransactionError::RangeOutOfBounds { from, to, len });
  }
  Ok(())
}

impl From<ChangeSet> for Transaction {
  fn from(changes: ChangeSet) -> Self {
    Self {
      changes,
      selection: None,
    }
  }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Transaction {
  changes:   ChangeSet,
  selection: Option<Selection>,
}

impl Transaction {
  pub fn new(doc: &Rope) -> Self {
    Self {
      changes:   ChangeSet::new(doc.slice(..)),
      selection: None,
    }
  }

  /// Changes made to the buffer.
  pub fn changes(&self) -> &ChangeSet {
    &self.changes
  }

  /// When set, explicitly updates the selection.
  pub fn selection(&self) -> Option<&Selection> {
    self.selection.as_ref()
  }

  /// Apply this transaction in-place.
  pub fn apply(&self, doc: &mut Rope) -> Result<()> {
    self.changes.apply(doc)
  }

  /// Apply this transaction to a rope and return the updated rope.
  pub fn apply_to(&self, doc: &Rope) -> Result<Rope> {
    self.changes.apply_to(doc)
  }

  pub fn with_selection(mut self, selection: Selection) -> Self {
    self.selection = Some(selection);
    self
  }

  /// Generate a transaction from a set of sorted, non-overlapping changes.
  pub fn change<I>(doc: &Rope, changes: I) -> Result<Self>
  where
    I: IntoIterator<Item = Change>,
  {
    let len = doc.len_chars();
    let changes = changes.into_iter();
    let (lower, upper) = changes.size_hint();
    let size = upper.unwrap_or(lower);
    let mut changeset = ChangeSet::with_capacity(2 * size + 1); // rough estimate

    let mut last = 0;
    for (from, to, tendril) in changes {
      validate_change_bounds(from, to, len)?;
      if from < last {
        return Err(TransactionError::OverlappingRange {
          prev_end: last,
          from,
          to,
        });
      }

      // Retain from last "to" to current "from"
      changeset.retain(from - last);
      let span = to - from;
      match tendril {
        Some(text) => {
          changeset.insert(text);
          changeset.delete(span);
        },
        None => changeset.delete(span),
      }
      last = to;
    }

    changeset.retain(len - last);

    Ok(Self::from(changeset))
  }

  /// Generate a transaction from a set of potentially overlapping deletions
  /// by merging overlapping deletions together.
  pub fn delete<I>(doc: &Rope, deletions: I) -> Result<Self>
  where
    I: IntoIterator<Item = Deletion>,
  {
    let len = doc.len_chars();

    let mut deletions: Vec<_> = deletions.into_iter().collect();
    deletions.sort_by_key(|(from, to)| (*from, *to));

    let mut merged = Vec::with_capacity(deletions.len());
    for (from, to) in deletions {
      validate_change_bounds(from, to, len)?;
      match merged.last_mut() {
        Some((_, last_end)) if from <= *last_end => {
          *last_end = (*last_end).max(to);
        },
        _ => merged.push((from, to)),
      }
    }

    Self::change(doc, merged.into_iter().map(|(from, to)| (from, to, None)))
  }

  /// Replace every selection range with `text`.
  pub fn insert(doc: &Rope, selection: &Selection, text: Tendril) -> Result<Self> {
    Self::change(
      doc,
      selection
        .iter()
        .map(|range| (range.from(), range.to(), Some(text.clone()))),
    )
  }

  pub fn changes_iter(&self) -> ChangeIterator<'_> {
    self.changes.changes_iter()
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn map_pos() {
    use Operation::*;

    // maps inserts
    let cs = ChangeSet {
      changes:   vec![Retain(4), Insert("!!".into()), Retain(4)],
      len:       8,
      len_after: 10,
    };

    assert_eq!(cs.map_pos(0, Assoc::Before).unwrap(), 0); // before insert region
    assert_eq!(cs.map_pos(4, Assoc::Before).unwrap(), 4); // at insert, track before
    assert_eq!(cs.map_pos(4, Assoc::After).unwrap(), 6); // at insert, track after
    assert_eq!(cs.map_pos(5, Assoc::Before).unwrap(), 7); // after insert region
    assert_eq!(cs.map_pos(8, Assoc::Before).unwrap(), 10); // document end

    // maps deletes
    let cs = ChangeSet {
      changes:   vec![Retain(4), Delete(4), Retain(4)],
      len:       12,
      len_after: 8,
    };
    assert_eq!(cs.map_pos(0, Assoc::Before).unwrap(), 0); // at start
    assert_eq!(cs.map_pos(4, Assoc::Before).unwrap(), 4); // before a delete
    assert_eq!(cs.map_pos(5, Assoc::Before).unwrap(), 4); // inside a delete
    assert_eq!(cs.map_pos(5, Assoc::After).unwrap(), 4); // inside a delete
    assert_eq!(cs.map_pos(9, Assoc::After).unwrap(), 5); // after a delete

    // replacements
    let cs = ChangeSet {
      changes:   vec![Retain(1), Insert("«".into()), Delete(2), Retain(1)],
      len:       4,
      len_after: 3,
    };
    assert_eq!(cs.map_pos(1, Assoc::After).unwrap(), 1); // at start of replace
    assert_eq!(cs.map_pos(2, Assoc::Before).unwrap(), 1); // inside, before
    assert_eq!(cs.map_pos(2, Assoc::After).unwrap(), 2); // inside, after
    assert_eq!(cs.map_pos(3, Assoc::Before).unwrap(), 2); // after the replace

    assert_eq!(
      cs.map_pos(5, Assoc::Before),
      Err(TransactionError::PositionOutOfBounds { pos: 5, len: 4 })
    );
  }

  #[test]
  fn transaction_change() {
    let mut doc = Rope::from("hello world!\ntest 123");
    let transaction = Transaction::change(
      &doc,
      // (1, 1, None) is a useless 0-width delete that gets factored out
      vec![(1, 1, None), (6, 11, Some("void".into())), (12, 17, None)],
    )
    .unwrap();
    transaction.apply(&mut doc).unwrap();
    assert_eq!(doc, Rope::from_str("hello void! 123"));
  }

  #[test]
  fn transaction_change_rejects_overlap() {
    let doc = Rope::from("abcdef");
    let err = Transaction::change(&doc, vec![(1, 3, None), (2, 4, Some("x".into()))]).unwrap_err();
    assert_eq!(err, TransactionError::OverlappingRange {
      prev_end: 3,
      from:     2,
      to:       4,
    });

    let err = Transaction::change(&doc, vec![(4, 9, None)]).unwrap_err();
    assert_eq!(err, TransactionError::RangeOutOfBounds {
      from: 4,
      to:   9,
      len:  6,
    });
  }

  #[test]
  fn changes_iter() {
    let doc = Rope::from("hello world!\ntest 123");
    let changes = vec![
      (0, 0, Some("> ".into())),
      (6, 11, Some("void".into())),
      (12, 17, None),
    ];
    let transaction = Transaction::change(&doc, changes.clone()).unwrap();
    assert_eq!(transaction.changes_iter().collect::<Vec<_>>(), changes);
  }

  #[test]
  fn delete_merges_overlapping_ranges() {
    let doc = Rope::from("a«»b");
    let tx = Transaction::delete(&doc, vec![(2, 3), (1, 2)]).unwrap();
    assert_eq!(tx.changes_iter().collect::<Vec<_>>(), vec![(1, 3, None)]);
    assert_eq!(tx.apply_to(&doc).unwrap(), "ab");
  }

  #[test]
  fn insert_replaces_selection_ranges() {
    let doc = Rope::from("one two");
    let selection = Selection::new(smallvec::smallvec![
      crate::selection::Range::point(3),
      crate::selection::Range::new(4, 7),
    ])
    .unwrap();
    let tx = Transaction::insert(&doc, &selection, "!".into()).unwrap();
    assert_eq!(tx.apply_to(&doc).unwrap(), "one! !");
  }

  #[test]
  fn apply_to_matches_in_place() {
    let doc = Rope::from("hello world!");
    let transaction = Transaction::change(&doc, vec![
      (6, 11, Some("void".into())),
      (12, 12, Some("!!".into())),
    ])
    .unwrap();

    let mut in_place = doc.clone();
    transaction.apply(&mut in_place).unwrap();
    let persistent = transaction.apply_to(&doc).unwrap();

    assert_eq!(in_place, persistent);
    assert_eq!(doc, Rope::from("hello world!"));
  }

  #[test]
  fn empty_changeset_is_identity() {
    let doc = Rope::from("hello");
    let tx = Transaction::change(&doc, std::iter::empty()).unwrap();
    assert!(tx.changes().is_empty());
    assert_eq!(tx.apply_to(&doc).unwrap(), doc);
    assert_eq!(tx.changes_iter().count(), 0);
  }

  #[test]
  fn apply_errors_on_length_mismatch() {
    let doc = Rope::from("hello");
    let changes = ChangeSet::new(doc.slice(..));
    let mut other = Rope::from("nope");

    let err = changes.apply(&mut other).unwrap_err();
    assert!(matches!(err, TransactionError::LengthMismatch {
      expected: 5,
      actual:   4,
    }));
    assert_eq!(other, Rope::from("nope"));
  }
}
