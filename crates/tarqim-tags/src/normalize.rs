//! Text normalization applied before any tag matching.
//!
//! Captions arrive with invisible writing-direction marks (pasted from RTL
//! clients) and digits in either script. Everything downstream assumes both
//! have been folded away, so [`clean`] runs once over the whole caption at
//! the parse entry point.

// ─── Cleaning ────────────────────────────────────────────────────────────────

fn is_bidi_mark(c: char) -> bool {
  matches!(c, '\u{200E}' | '\u{200F}' | '\u{202A}'..='\u{202E}')
}

/// Fold an Arabic-Indic digit to its ASCII equivalent; other chars pass
/// through.
fn fold_digit(c: char) -> char {
  match c {
    '٠'..='٩' => {
      let offset = c as u32 - '٠' as u32;
      char::from_digit(offset, 10).unwrap_or(c)
    }
    _ => c,
  }
}

/// Remove bidirectional control marks and fold Arabic-Indic digits.
/// Total function; the output contains no char for which [`is_bidi_mark`]
/// holds.
pub fn clean(text: &str) -> String {
  text
    .chars()
    .filter(|c| !is_bidi_mark(*c))
    .map(fold_digit)
    .collect()
}

// ─── Alias keys ──────────────────────────────────────────────────────────────

fn is_arabic_diacritic(c: char) -> bool {
  matches!(c, '\u{064B}'..='\u{0652}')
}

/// Normalize a tag token into the form alias tables are keyed by: cleaned,
/// marker-stripped, diacritic-free, ASCII-lowercased. Table entries are
/// stored pre-normalized.
pub fn alias_key(token: &str) -> String {
  clean(token)
    .trim_start_matches('#')
    .chars()
    .filter(|c| !is_arabic_diacritic(*c))
    .flat_map(char::to_lowercase)
    .collect()
}

// ─── Display names ───────────────────────────────────────────────────────────

/// Turn an underscore-joined tag fragment into a display name: underscores
/// become spaces, runs of whitespace collapse, ends are trimmed.
pub fn display_name(raw: &str) -> String {
  clean(raw)
    .replace('_', " ")
    .split_whitespace()
    .collect::<Vec<_>>()
    .join(" ")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn clean_strips_bidi_marks() {
    assert_eq!(clean("\u{200F}#تجربة\u{200E}"), "#تجربة");
    assert_eq!(clean("a\u{202B}b\u{202C}c"), "abc");
  }

  #[test]
  fn clean_folds_arabic_digits() {
    assert_eq!(clean("١٤٤٦"), "1446");
    assert_eq!(clean("#المحاضرة_٥"), "#المحاضرة_5");
  }

  #[test]
  fn clean_is_idempotent() {
    let once = clean("سنة #١٤٤٦هـ\u{200F}");
    assert_eq!(clean(&once), once);
  }

  #[test]
  fn alias_key_is_case_and_mark_insensitive() {
    assert_eq!(alias_key("#Te\u{200F}ST1"), "test1");
    assert_eq!(alias_key("#PHYsics١"), "physics1");
    assert_eq!(alias_key("#تجربة\u{200F}"), "تجربة");
  }

  #[test]
  fn alias_key_drops_diacritics() {
    assert_eq!(alias_key("#مُحَاضَرَة"), "محاضرة");
  }

  #[test]
  fn display_name_joins_underscores() {
    assert_eq!(display_name("أحمد_الزهراني"), "أحمد الزهراني");
    assert_eq!(display_name("  فلان  _ الفلاني "), "فلان الفلاني");
  }
}
