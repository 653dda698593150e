//! Cursor positions and selections.
//!
//! A [`Range`] has an `anchor` and a `head`; the head is where the cursor
//! sits. When `anchor == head` the range is a collapsed cursor.
//!
//! ```text
//! anchor=2, head=7: "he[llo w]orld"  (forward selection)
//! anchor=7, head=2: "he]llo w[orld"  (backward selection)
//! anchor=5, head=5: "hello|world"    (collapsed cursor)
//! ```
//!
//! A [`Selection`] holds one or more ranges, sorted and non-overlapping, and
//! remembers which one is primary. The interceptor only ever reads the
//! primary range and only ever produces single-cursor selections.

use std::borrow::Cow;

use ropey::RopeSlice;
use smallvec::{
  SmallVec,
  smallvec,
};
use thiserror::Error;

use crate::transaction::{
  Assoc,
  ChangeSet,
  TransactionError,
};

pub type Result<T> = std::result::Result<T, SelectionError>;

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum SelectionError {
  #[error("selection must contain at least one range")]
  EmptySelection,
  #[error("primary index {index} out of bounds for selection of length {len}")]
  PrimaryIndexOutOfBounds { index: usize, len: usize },
  #[error(transparent)]
  Transaction(#[from] TransactionError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
  pub anchor: usize,
  pub head:   usize,
}

impl Range {
  pub fn new(anchor: usize, head: usize) -> Self {
    Self { anchor, head }
  }

  #[inline]
  pub fn point(head: usize) -> Self {
    Self::new(head, head)
  }

  /// Start of the range
  #[inline]
  #[must_use]
  pub fn from(&self) -> usize {
    std::cmp::min(self.anchor, self.head)
  }

  /// End of the range
  #[inline]
  #[must_use]
  pub fn to(&self) -> usize {
    std::cmp::max(self.anchor, self.head)
  }

  #[inline]
  #[must_use]
  pub fn len(&self) -> usize {
    self.to() - self.from()
  }

  /// When the head and anchor are in the same position, we have no range.
  #[inline]
  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.anchor == self.head
  }

  #[inline]
  pub fn contains(&self, pos: usize) -> bool {
    self.from() <= pos && pos < self.to()
  }

  /// Check if two `Ranges` overlap
  pub fn overlaps(&self, other: &Self) -> bool {
    self.from() == other.from() || (self.to() > other.from() && other.to() > self.from())
  }

  /// Map a range through a set of changes.
  ///
  /// Collapsed cursors follow inserted text; a non-empty range grows to cover
  /// text inserted at its edges.
  pub fn map(self, changes: &ChangeSet) -> Result<Self> {
    use std::cmp::Ordering;

    if changes.is_empty() {
      return Ok(self);
    }

    let (anchor_assoc, head_assoc) = match self.anchor.cmp(&self.head) {
      Ordering::Equal => (Assoc::After, Assoc::After),
      Ordering::Less => (Assoc::Before, Assoc::After),
      Ordering::Greater => (Assoc::After, Assoc::Before),
    };

    Ok(Self {
      anchor: changes.map_pos(self.anchor, anchor_assoc)?,
      head:   changes.map_pos(self.head, head_assoc)?,
    })
  }

  /// Returns a `Range` that encompasses both input ranges.
  pub fn merge(&self, other: Self) -> Self {
    if self.anchor > self.head && other.anchor > other.head {
      Self {
        anchor: self.anchor.max(other.anchor),
        head:   self.head.min(other.head),
      }
    } else {
      Self {
        anchor: self.from().min(other.from()),
        head:   self.to().max(other.to()),
      }
    }
  }

  /// Returns the text inside this range given the text of the whole buffer.
  #[inline]
  pub fn fragment<'a, 'b: 'a>(&'a self, text: RopeSlice<'b>) -> Cow<'b, str> {
    self.slice(text).into()
  }

  #[inline]
  pub fn slice<'a, 'b: 'a>(&'a self, text: RopeSlice<'b>) -> RopeSlice<'b> {
    text.slice(self.from()..self.to())
  }
}

impl From<(usize, usize)> for Range {
  fn from(value: (usize, usize)) -> Self {
    Self::new(value.0, value.1)
  }
}

/// A selection is one or more ranges.
/// INVARIANT: A selection can never be empty (always contain at least one
/// range).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
  ranges:        SmallVec<[Range; 1]>,
  primary_index: usize,
}

impl Selection {
  /// Build a selection whose first range is primary.
  pub fn new(ranges: SmallVec<[Range; 1]>) -> Result<Self> {
    Self::with_primary(ranges, 0)
  }

  pub fn with_primary(ranges: SmallVec<[Range; 1]>, primary_index: usize) -> Result<Self> {
    if ranges.is_empty() {
      return Err(SelectionError::EmptySelection);
    }
    if primary_index >= ranges.len() {
      return Err(SelectionError::PrimaryIndexOutOfBounds {
        index: primary_index,
        len:   ranges.len(),
      });
    }

    Ok(
      Self {
        ranges,
        primary_index,
      }
      .normalize(),
    )
  }

  /// A single collapsed cursor.
  pub fn point(pos: usize) -> Self {
    Self::single(pos, pos)
  }

  pub fn single(anchor: usize, head: usize) -> Self {
    Self {
      ranges:        smallvec![Range::new(anchor, head)],
      primary_index: 0,
    }
  }

  pub fn primary(&self) -> Range {
    self.ranges[self.primary_index]
  }

  pub fn primary_index(&self) -> usize {
    self.primary_index
  }

  pub fn ranges(&self) -> &[Range] {
    &self.ranges
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Range> {
    self.ranges.iter()
  }

  pub fn len(&self) -> usize {
    self.ranges.len()
  }

  /// Always false, kept for symmetry with `len`.
  pub fn is_empty(&self) -> bool {
    self.ranges.is_empty()
  }

  /// Map every range through a set of changes.
  pub fn map(mut self, changes: &ChangeSet) -> Result<Self> {
    if changes.is_empty() {
      return Ok(self);
    }

    for range in self.ranges.iter_mut() {
      *range = range.map(changes)?;
    }

    Ok(self.normalize())
  }

  /// Sort ranges and merge the overlapping ones, keeping track of the
  /// primary range.
  fn normalize(mut self) -> Self {
    if self.ranges.len() < 2 {
      return self;
    }

    let primary = self.ranges[self.primary_index];
    self.ranges.sort_unstable_by_key(|range| range.from());
    self.primary_index = self
      .ranges
      .iter()
      .position(|&range| range == primary)
      .unwrap_or(0);

    let mut merged: SmallVec<[Range; 1]> = SmallVec::with_capacity(self.ranges.len());
    let mut primary_index = 0;
    for (i, range) in self.ranges.into_iter().enumerate() {
      match merged.last_mut() {
        Some(prev) if prev.overlaps(&range) => {
          *prev = prev.merge(range);
        },
        _ => merged.push(range),
      }
      if i == self.primary_index {
        primary_index = merged.len() - 1;
      }
    }

    Self {
      ranges: merged,
      primary_index,
    }
  }
}

impl<'a> IntoIterator for &'a Selection {
  type IntoIter = std::slice::Iter<'a, Range>;
  type Item = &'a Range;

  fn into_iter(self) -> std::slice::Iter<'a, Range> {
    self.ranges().iter()
  }
}

impl From<Range> for Selection {
  fn from(range: Range) -> Self {
    Self {
      ranges:        smallvec![range],
      primary_index: 0,
    }
  }
}
