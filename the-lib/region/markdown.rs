//! Excluded regions of a Markdown document, for hosts without a syntax tree.
//!
//! Code, math, front matter and raw HTML come from `pulldown-cmark`. Templating
//! spans and hashtags are not CommonMark, so a small scanner picks them up.

use std::ops::Range;

use pulldown_cmark::{
  CodeBlockKind,
  Event,
  Options,
  Parser,
  Tag,
};
use ropey::Rope;

use super::{
  RegionClassifier,
  RegionKind,
};

/// Delimiters of templating spans, as `(open, close)`.
const TEMPLATE_DELIMITERS: &[(&str, &str)] = &[("<%", "%>"), ("{{", "}}")];

/// A contiguous excluded region, in char offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
  pub kind:       RegionKind,
  pub start:      usize,
  pub end:        usize,
  /// The region is still open (an unterminated fence, a tag being typed), so
  /// its end offset belongs to it too.
  pub open_ended: bool,
}

impl Region {
  /// Offsets on a delimiter boundary are outside; only the interior counts.
  pub fn contains(&self, offset: usize) -> bool {
    (self.start < offset && offset < self.end) || (self.open_ended && offset == self.end)
  }
}

/// Scans the whole document on every query; nothing is cached.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkdownRegions;

impl MarkdownRegions {
  pub fn region_at(&self, doc: &Rope, offset: usize) -> Option<RegionKind> {
    if offset > doc.len_chars() {
      return None;
    }
    markdown_regions(doc)
      .into_iter()
      .find(|region| region.contains(offset))
      .map(|region| region.kind)
  }
}

impl RegionClassifier for MarkdownRegions {
  fn is_excluded(&self, doc: &Rope, offset: usize) -> bool {
    self.region_at(doc, offset).is_some()
  }
}

/// All excluded regions of `doc`, in no particular order. Regions may nest or
/// overlap.
pub fn markdown_regions(doc: &Rope) -> Vec<Region> {
  let text = doc.to_string();
  let mut spans = Vec::new();

  scan_markdown(&text, &mut spans);
  scan_templates(&text, &mut spans);
  scan_hashtags(&text, &mut spans);

  spans
    .into_iter()
    .map(|(kind, bytes, open_ended)| {
      Region {
        kind,
        start: doc.byte_to_char(bytes.start),
        end: doc.byte_to_char(bytes.end),
        open_ended,
      }
    })
    .collect()
}

type Span = (RegionKind, Range<usize>, bool);

fn scan_markdown(text: &str, spans: &mut Vec<Span>) {
  let options = Options::ENABLE_MATH
    | Options::ENABLE_YAML_STYLE_METADATA_BLOCKS
    | Options::ENABLE_TABLES
    | Options::ENABLE_STRIKETHROUGH;

  for (event, range) in Parser::new_ext(text, options).into_offset_iter() {
    match event {
      Event::Start(Tag::CodeBlock(kind)) => {
        let open_ended = match kind {
          CodeBlockKind::Fenced(_) => {
            range.end >= text.len() && !fence_is_closed(&text[range.clone()])
          },
          CodeBlockKind::Indented => false,
        };
        spans.push((RegionKind::Code, range, open_ended));
      },
      Event::Start(Tag::MetadataBlock(_)) => {
        spans.push((RegionKind::FrontMatter, range, false));
      },
      Event::Code(_) => spans.push((RegionKind::Code, range, false)),
      Event::InlineMath(_) | Event::DisplayMath(_) => spans.push((RegionKind::Math, range, false)),
      Event::Html(_) | Event::InlineHtml(_) => spans.push((RegionKind::Tag, range, false)),
      _ => {},
    }
  }
}

/// Whether a fenced block's last line repeats its opening fence.
fn fence_is_closed(block: &str) -> bool {
  let mut lines = block.lines();
  let Some(first) = lines.next() else {
    return false;
  };
  let first = first.trim_start();
  let Some(marker) = first.chars().next() else {
    return false;
  };
  let fence_len = first.chars().take_while(|&c| c == marker).count();

  lines.last().is_some_and(|last| {
    let last = last.trim();
    last.chars().take_while(|&c| c == marker).count() >= fence_len
  })
}

/// Unterminated spans run to the end of their line.
fn scan_templates(text: &str, spans: &mut Vec<Span>) {
  for (open, close) in TEMPLATE_DELIMITERS {
    let mut from = 0;
    while let Some(start) = text[from..].find(open).map(|i| from + i) {
      let body = start + open.len();
      match text[body..].find(close) {
        Some(i) => {
          let end = body + i + close.len();
          spans.push((RegionKind::Template, start..end, false));
          from = end;
        },
        None => {
          let end = text[body..].find('\n').map_or(text.len(), |i| body + i);
          spans.push((RegionKind::Template, start..end, true));
          from = end;
        },
      }
    }
  }
}

fn is_tag_char(c: char) -> bool {
  c.is_alphanumeric() || matches!(c, '_' | '-' | '/')
}

/// `#word` at the start of a line or after whitespace. Typing at the end of a
/// tag extends it, so tags are open ended.
fn scan_hashtags(text: &str, spans: &mut Vec<Span>) {
  let mut prev: Option<char> = None;
  let mut chars = text.char_indices().peekable();

  while let Some((i, c)) = chars.next() {
    if c != '#' || !prev.is_none_or(char::is_whitespace) {
      prev = Some(c);
      continue;
    }

    let mut end = i + c.len_utf8();
    while let Some(&(j, next)) = chars.peek() {
      if !is_tag_char(next) {
        break;
      }
      end = j + next.len_utf8();
      prev = Some(next);
      chars.next();
    }

    if end > i + 1 {
      spans.push((RegionKind::Tag, i..end, true));
    } else {
      prev = Some(c);
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;

  fn region_at(text: &str, offset: usize) -> Option<RegionKind> {
    MarkdownRegions.region_at(&Rope::from(text), offset)
  }

  #[test]
  fn inline_code_interior_is_excluded() {
    let text = "a `b<` c";
    assert_eq!(region_at(text, 4), Some(RegionKind::Code));
    assert_eq!(region_at(text, 5), Some(RegionKind::Code));
    // on the backticks' outer edges
    assert_eq!(region_at(text, 2), None);
    assert_eq!(region_at(text, 6), None);
    assert_eq!(region_at(text, 8), None);
  }

  #[test]
  fn unterminated_fence_runs_to_end_of_document() {
    let text = "intro\n\n```rust\nlet a = 1;";
    let end = text.chars().count();
    assert_eq!(region_at(text, end), Some(RegionKind::Code));
    assert_eq!(region_at(text, 2), None);

    let text = "```\ncode\n```\n";
    let end = text.chars().count();
    assert_eq!(region_at(text, 5), Some(RegionKind::Code));
    assert_eq!(region_at(text, end), None);
  }

  #[test]
  fn indented_code_block() {
    let text = "para\n\n    code <<\n\nafter";
    assert_eq!(region_at(text, 12), Some(RegionKind::Code));
    assert_eq!(region_at(text, 2), None);
  }

  #[test]
  fn math_spans() {
    let text = "a $x<y$ b";
    assert_eq!(region_at(text, 4), Some(RegionKind::Math));
    assert_eq!(region_at(text, 8), None);

    let text = "$$x <= y$$ and text";
    assert_eq!(region_at(text, 5), Some(RegionKind::Math));
    assert_eq!(region_at(text, text.chars().count()), None);
  }

  #[test]
  fn front_matter() {
    let text = "---\ntitle: a\n---\nbody";
    assert_eq!(region_at(text, 6), Some(RegionKind::FrontMatter));
    assert_eq!(region_at(text, text.chars().count()), None);
  }

  #[test]
  fn raw_html_tags() {
    let text = "a <span class=\"x\">b</span>";
    assert_eq!(region_at(text, 5), Some(RegionKind::Tag));
    assert_eq!(region_at(text, 1), None);
  }

  #[test]
  fn templating_spans() {
    let text = "due <% tp.date.now() %> and {{title}} done";
    assert_eq!(region_at(text, 8), Some(RegionKind::Template));
    assert_eq!(region_at(text, 30), Some(RegionKind::Template));
    assert_eq!(region_at(text, 25), None);

    // still being typed
    let text = "due {{ name\nnext";
    assert_eq!(region_at(text, 11), Some(RegionKind::Template));
    assert_eq!(region_at(text, 14), None);
  }

  #[test]
  fn hashtags() {
    let text = "see #tag/sub-name here";
    assert_eq!(region_at(text, 6), Some(RegionKind::Tag));
    // the end of a tag is still part of it
    assert_eq!(region_at(text, 17), Some(RegionKind::Tag));
    assert_eq!(region_at(text, 18), None);

    assert_eq!(region_at("a#b c", 2), None);
    assert_eq!(region_at("# heading", 1), None);
    assert_eq!(region_at("#tag", 4), Some(RegionKind::Tag));
  }

  #[test]
  fn offsets_outside_document_are_not_excluded() {
    let text = "```\ncode";
    assert_eq!(region_at(text, 100), None);
  }

  #[test]
  fn regions_use_char_offsets() {
    let regions = markdown_regions(&Rope::from("«» `x`"));
    assert_eq!(regions, vec![Region {
      kind:       RegionKind::Code,
      start:      3,
      end:        6,
      open_ended: false,
    }]);
  }
}
