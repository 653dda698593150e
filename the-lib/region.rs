//! Excluded-region classification.
//!
//! The interceptor never rewrites text typed inside code, math, front matter,
//! templating syntax or tags. Whether an offset lies in such a region is the
//! host's call: it answers through a [`RegionClassifier`].
//!
//! Two ready-made classifiers are provided:
//!
//! - [`LabelClassifier`] for hosts with a syntax tree. The host resolves an
//!   offset to a node label and the label is matched against
//!   [`EXCLUDED_LABELS`].
//! - [`MarkdownRegions`] for hosts without one. It scans the document itself.
//!
//! Classification always fails open: an offset that cannot be resolved is not
//! excluded.

mod markdown;

use std::borrow::Cow;

use ropey::Rope;

pub use self::markdown::{
  MarkdownRegions,
  Region,
  markdown_regions,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionKind {
  Code,
  Math,
  FrontMatter,
  Template,
  Tag,
}

/// Label fragments that mark an excluded region, matched case-insensitively
/// as substrings of a syntax label. Checked in order.
pub const EXCLUDED_LABELS: &[(&str, RegionKind)] = &[
  ("frontmatter", RegionKind::FrontMatter),
  ("front-matter", RegionKind::FrontMatter),
  ("templater", RegionKind::Template),
  ("template", RegionKind::Template),
  ("math", RegionKind::Math),
  ("code", RegionKind::Code),
  ("tag", RegionKind::Tag),
];

/// Answers whether an offset of the document lies in an excluded region.
///
/// `doc` is the document *before* the edit under consideration and `offset`
/// is a char index into it.
pub trait RegionClassifier {
  fn is_excluded(&self, doc: &Rope, offset: usize) -> bool;
}

impl<F> RegionClassifier for F
where
  F: Fn(&Rope, usize) -> bool,
{
  fn is_excluded(&self, doc: &Rope, offset: usize) -> bool {
    self(doc, offset)
  }
}

/// Never excludes anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRegions;

impl RegionClassifier for NoRegions {
  fn is_excluded(&self, _doc: &Rope, _offset: usize) -> bool {
    false
  }
}

/// Resolves a document offset to the label of the syntax node around it.
pub trait SyntaxLabels {
  /// `None` when the host cannot resolve the offset.
  fn label_at(&self, doc: &Rope, offset: usize) -> Option<Cow<'_, str>>;
}

pub fn classify_label(label: &str) -> Option<RegionKind> {
  let label = label.to_ascii_lowercase();
  EXCLUDED_LABELS
    .iter()
    .find(|(pattern, _)| label.contains(pattern))
    .map(|&(_, kind)| kind)
}

/// Excludes offsets whose syntax label matches [`EXCLUDED_LABELS`].
#[derive(Debug, Clone)]
pub struct LabelClassifier<L> {
  labels: L,
}

impl<L: SyntaxLabels> LabelClassifier<L> {
  pub fn new(labels: L) -> Self {
    Self { labels }
  }

  pub fn region_at(&self, doc: &Rope, offset: usize) -> Option<RegionKind> {
    let label = self.labels.label_at(doc, offset)?;
    classify_label(&label)
  }
}

impl<L: SyntaxLabels> RegionClassifier for LabelClassifier<L> {
  fn is_excluded(&self, doc: &Rope, offset: usize) -> bool {
    self.region_at(doc, offset).is_some()
  }
}

/// Remembers the last classification made while processing a single edit
/// batch, so consecutive questions about the same offset hit the classifier
/// once.
///
/// Lives for one filter call only; it is never carried over to another
/// document state.
pub(crate) struct ExclusionCheck<'a> {
  classifier: &'a dyn RegionClassifier,
  doc:        &'a Rope,
  last:       Option<(usize, bool)>,
}

impl<'a> ExclusionCheck<'a> {
  pub(crate) fn new(classifier: &'a dyn RegionClassifier, doc: &'a Rope) -> Self {
    Self {
      classifier,
      doc,
      last: None,
    }
  }

  pub(crate) fn is_excluded(&mut self, offset: usize) -> bool {
    match self.last {
      Some((pos, excluded)) if pos == offset => excluded,
      _ => {
        let excluded = self.classifier.is_excluded(self.doc, offset);
        tracing::trace!(offset, excluded, "classified edit origin");
        self.last = Some((offset, excluded));
        excluded
      },
    }
  }
}

#[cfg(test)]
mod test {
  use std::cell::Cell;

  use super::*;

  struct FixedLabels(Vec<(std::ops::Range<usize>, &'static str)>);

  impl SyntaxLabels for FixedLabels {
    fn label_at(&self, _doc: &Rope, offset: usize) -> Option<Cow<'_, str>> {
      self
        .0
        .iter()
        .find(|(range, _)| range.contains(&offset))
        .map(|(_, label)| Cow::Borrowed(*label))
    }
  }

  #[test]
  fn labels_match_by_substring() {
    assert_eq!(classify_label("inline-code"), Some(RegionKind::Code));
    assert_eq!(classify_label("HyperMD-codeblock"), Some(RegionKind::Code));
    assert_eq!(classify_label("formatting-math-begin"), Some(RegionKind::Math));
    assert_eq!(classify_label("hmd-frontmatter"), Some(RegionKind::FrontMatter));
    assert_eq!(classify_label("templater-command"), Some(RegionKind::Template));
    assert_eq!(classify_label("hashtag-end"), Some(RegionKind::Tag));
    assert_eq!(classify_label("strong"), None);
    assert_eq!(classify_label(""), None);
  }

  #[test]
  fn label_classifier_fails_open() {
    let doc = Rope::from("some `code` here");
    let classifier = LabelClassifier::new(FixedLabels(vec![(5..11, "inline-code")]));
    assert!(classifier.is_excluded(&doc, 7));
    assert_eq!(classifier.region_at(&doc, 7), Some(RegionKind::Code));
    // unresolvable offsets are permitted
    assert!(!classifier.is_excluded(&doc, 2));
    assert!(!classifier.is_excluded(&doc, 100));
  }

  #[test]
  fn closures_are_classifiers() {
    let doc = Rope::from("abc");
    let classifier = |_: &Rope, offset: usize| offset == 1;
    assert!(classifier.is_excluded(&doc, 1));
    assert!(!classifier.is_excluded(&doc, 2));
    assert!(!NoRegions.is_excluded(&doc, 1));
  }

  #[test]
  fn exclusion_check_memoizes_per_offset() {
    let doc = Rope::from("abc");
    let calls = Cell::new(0);
    let classifier = |_: &Rope, offset: usize| {
      calls.set(calls.get() + 1);
      offset == 0
    };

    let mut check = ExclusionCheck::new(&classifier, &doc);
    assert!(check.is_excluded(0));
    assert!(check.is_excluded(0));
    assert_eq!(calls.get(), 1);

    assert!(!check.is_excluded(2));
    assert_eq!(calls.get(), 2);
  }
}
