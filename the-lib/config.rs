//! Raw rule configuration, as supplied by the configuration manager.
//!
//! These types are what a user writes in `config.toml`. Every field has a
//! default, so a rule with a missing field still deserializes (with an empty
//! string) and is then dropped by
//! [`RuleIndex::build`](crate::rules::RuleIndex::build) instead of failing the
//! whole file.

use serde::{
  Deserialize,
  Serialize,
};

/// Typographic replacements enabled out of the box, as `(from, to)`.
pub const DEFAULT_REPLACEMENTS: &[(&str, &str)] = &[
  ("--", "–"),
  ("–-", "—"),
  ("...", "…"),
  ("->", "→"),
  ("<-", "←"),
  ("<<", "«"),
  (">>", "»"),
  ("!=", "≠"),
  ("<=", "≤"),
  (">=", "≥"),
  ("+-", "±"),
];

/// Pairs closed automatically out of the box, as `(open, close)`.
pub const DEFAULT_PAIRS: &[(&str, &str)] = &[("«", "»"), ("“", "”"), ("‘", "’")];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct AutocorrectConfig {
  /// Declaration order matters: the first matching rule wins.
  pub replacements: Vec<ReplacementConfig>,
  pub pairs:        Vec<PairConfig>,
  pub quotes:       QuoteConfig,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplacementConfig {
  pub from: String,
  pub to:   String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PairConfig {
  pub open:  String,
  pub close: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuoteConfig {
  pub enabled: bool,
  pub opening: String,
  pub closing: String,
}

impl AutocorrectConfig {
  /// A configuration without any rule, quotes disabled.
  pub fn empty() -> Self {
    Self {
      replacements: Vec::new(),
      pairs:        Vec::new(),
      quotes:       QuoteConfig {
        enabled: false,
        ..QuoteConfig::default()
      },
    }
  }

  /// Deserialize from an already merged TOML value.
  pub fn from_toml(value: toml::Value) -> Result<Self, toml::de::Error> {
    value.try_into()
  }
}

impl Default for AutocorrectConfig {
  fn default() -> Self {
    Self {
      replacements: DEFAULT_REPLACEMENTS
        .iter()
        .copied()
        .map(ReplacementConfig::from)
        .collect(),
      pairs:        DEFAULT_PAIRS.iter().copied().map(PairConfig::from).collect(),
      quotes:       QuoteConfig::default(),
    }
  }
}

impl Default for QuoteConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      opening: "“".to_string(),
      closing: "”".to_string(),
    }
  }
}

impl From<(&str, &str)> for ReplacementConfig {
  fn from((from, to): (&str, &str)) -> Self {
    Self {
      from: from.to_string(),
      to:   to.to_string(),
    }
  }
}

impl From<(&str, &str)> for PairConfig {
  fn from((open, close): (&str, &str)) -> Self {
    Self {
      open:  open.to_string(),
      close: close.to_string(),
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn parses_full_config() {
    let config: AutocorrectConfig = toml::from_str(
      r#"
        [[replacements]]
        from = "<<"
        to = "«"

        [[pairs]]
        open = "("
        close = ")"

        [quotes]
        enabled = true
        opening = "«"
        closing = "»"
      "#,
    )
    .unwrap();

    assert_eq!(config.replacements, vec![ReplacementConfig::from(("<<", "«"))]);
    assert_eq!(config.pairs, vec![PairConfig::from(("(", ")"))]);
    assert_eq!(config.quotes, QuoteConfig {
      enabled: true,
      opening: "«".to_string(),
      closing: "»".to_string(),
    });
  }

  #[test]
  fn missing_sections_fall_back_to_defaults() {
    let config: AutocorrectConfig = toml::from_str("[quotes]\nenabled = false\n").unwrap();
    assert_eq!(config.replacements.len(), DEFAULT_REPLACEMENTS.len());
    assert_eq!(config.pairs.len(), DEFAULT_PAIRS.len());
    assert!(!config.quotes.enabled);
    assert_eq!(config.quotes.opening, "“");
  }

  #[test]
  fn missing_rule_fields_deserialize_empty() {
    let config: AutocorrectConfig = toml::from_str(
      r#"
        [[replacements]]
        from = "->"

        [[pairs]]
        close = "]"
      "#,
    )
    .unwrap();
    assert_eq!(config.replacements, vec![ReplacementConfig {
      from: "->".to_string(),
      to:   String::new(),
    }]);
    assert_eq!(config.pairs[0].open, "");
  }

  #[test]
  fn unknown_top_level_keys_are_rejected() {
    let result: Result<AutocorrectConfig, _> = toml::from_str("replacement = []\n");
    assert!(result.is_err());
  }

  #[test]
  fn from_toml_value() {
    let value: toml::Value = toml::from_str("pairs = [{ open = \"[\", close = \"]\" }]").unwrap();
    let config = AutocorrectConfig::from_toml(value).unwrap();
    assert_eq!(config.pairs, vec![PairConfig::from(("[", "]"))]);
  }
}
