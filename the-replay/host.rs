//! A scripted stand-in for an editor: turns keystrokes into edit proposals,
//! runs them through the engine and applies what comes back.

use eyre::Result;
use ropey::Rope;
use the_autocorrect_lib::{
  Autocorrect,
  EditKind,
  EditProposal,
  selection::Selection,
  transaction::Transaction,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
  Char(char),
  Backspace,
}

/// Parse a keystroke script.
///
/// Every character is typed, except that `\b` is a backspace, `\n` a newline
/// and `\\` a backslash. Raw line breaks are ignored so long scripts can be
/// wrapped. Any other backslash is typed as is.
pub fn parse_script(script: &str) -> Vec<Key> {
  let mut keys = Vec::with_capacity(script.len());
  let mut chars = script.chars().peekable();

  while let Some(c) = chars.next() {
    match c {
      '\n' | '\r' => {},
      '\\' => {
        match chars.peek() {
          Some('b') => keys.push(Key::Backspace),
          Some('n') => keys.push(Key::Char('\n')),
          Some('\\') => keys.push(Key::Char('\\')),
          _ => {
            keys.push(Key::Char('\\'));
            continue;
          },
        }
        chars.next();
      },
      c => keys.push(Key::Char(c)),
    }
  }

  keys
}

pub struct Host {
  engine:       Autocorrect,
  doc:          Rope,
  selection:    Selection,
  /// Type `""` with the cursor in between when `"` is pressed.
  close_quotes: bool,
}

impl Host {
  pub fn new(engine: Autocorrect, initial: &str, close_quotes: bool) -> Self {
    let doc = Rope::from(initial);
    let selection = Selection::point(doc.len_chars());
    Self {
      engine,
      doc,
      selection,
      close_quotes,
    }
  }

  pub fn text(&self) -> String {
    self.doc.to_string()
  }

  pub fn cursor(&self) -> usize {
    self.selection.primary().head
  }

  pub fn replay(&mut self, keys: impl IntoIterator<Item = Key>) -> Result<()> {
    for key in keys {
      self.press(key)?;
    }
    Ok(())
  }

  pub fn press(&mut self, key: Key) -> Result<()> {
    match key {
      Key::Char('"') if self.close_quotes => self.type_text("\"\"", 1),
      Key::Char(c) => self.type_text(c.encode_utf8(&mut [0; 4]), 1),
      Key::Backspace => self.delete_backward(),
    }
  }

  /// Replace the primary selection with `text`, cursor `cursor` chars into
  /// it.
  fn type_text(&mut self, text: &str, cursor: usize) -> Result<()> {
    let range = self.selection.primary();
    let tx = Transaction::change(&self.doc, [(range.from(), range.to(), Some(text.into()))])?
      .with_selection(Selection::point(range.from() + cursor));
    self.propose(EditKind::Type, tx)
  }

  fn delete_backward(&mut self) -> Result<()> {
    let range = self.selection.primary();
    let (from, to) = if range.is_empty() {
      match range.head.checked_sub(1) {
        Some(prev) => (prev, range.head),
        None => return Ok(()),
      }
    } else {
      (range.from(), range.to())
    };

    let tx = Transaction::delete(&self.doc, [(from, to)])?.with_selection(Selection::point(from));
    self.propose(EditKind::DeleteBackward, tx)
  }

  fn propose(&mut self, kind: EditKind, tx: Transaction) -> Result<()> {
    let proposal = EditProposal::new(kind, tx);
    let tx = self.engine.filter(&self.doc, &self.selection, proposal);

    let selection = match tx.selection() {
      Some(selection) => selection.clone(),
      None => self.selection.clone().map(tx.changes())?,
    };
    tx.apply(&mut self.doc)?;
    self.selection = selection;

    tracing::trace!(?kind, cursor = self.cursor(), "applied edit");
    Ok(())
  }
}
