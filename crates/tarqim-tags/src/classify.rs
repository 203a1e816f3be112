//! Tag classification against the alias registry.
//!
//! The registry is a set of const tables, not scattered conditionals: the
//! grammar in [`crate::grammar`] is only auditable if every surface form a
//! tag can take is listed in one place. Table entries are stored
//! pre-normalized (see [`crate::normalize::alias_key`]).

use tarqim_core::annotation::ContentType;

use crate::normalize::{alias_key, display_name};

// ─── Registry tables ─────────────────────────────────────────────────────────

/// Content-type surface forms. Each content type accepts its canonical
/// snake_case name plus the Arabic forms contributors actually type.
const CONTENT_ALIASES: &[(&str, ContentType)] = &[
  ("محاضرة", ContentType::Lecture),
  ("المحاضرة", ContentType::Lecture),
  ("lecture", ContentType::Lecture),
  ("صور_السبورة", ContentType::BoardImages),
  ("السبورة", ContentType::BoardImages),
  ("board_images", ContentType::BoardImages),
  ("سلايدات", ContentType::Slides),
  ("شرائح", ContentType::Slides),
  ("slides", ContentType::Slides),
  ("تسجيل_صوتي", ContentType::Audio),
  ("صوت", ContentType::Audio),
  ("audio", ContentType::Audio),
  ("تسجيل_فيديو", ContentType::Video),
  ("فيديو", ContentType::Video),
  ("video", ContentType::Video),
  ("خريطة_ذهنية", ContentType::MindMap),
  ("خرائط_ذهنية", ContentType::MindMap),
  ("mind_map", ContentType::MindMap),
  ("تفريغ", ContentType::Transcript),
  ("transcript", ContentType::Transcript),
  ("ملفات_ذات_صلة", ContentType::Related),
  ("مرفقات", ContentType::Related),
  ("related", ContentType::Related),
  ("نموذج_النصفي", ContentType::ExamMid),
  ("النصفي", ContentType::ExamMid),
  ("exam_mid", ContentType::ExamMid),
  ("نموذج_النهائي", ContentType::ExamFinal),
  ("النهائي", ContentType::ExamFinal),
  ("exam_final", ContentType::ExamFinal),
  ("التوصيف", ContentType::Syllabus),
  ("توصيف", ContentType::Syllabus),
  ("syllabus", ContentType::Syllabus),
  ("التحضير", ContentType::Attendance),
  ("تحضير", ContentType::Attendance),
  ("attendance", ContentType::Attendance),
];

/// Labels accepted on the left of `_<number>` in a session tag.
const SESSION_LABELS: &[&str] =
  &["المحاضرة", "محاضرة", "الدرس", "درس", "lecture"];

/// Honorific prefixes; stripping the matched prefix yields the lecturer's
/// display name. The underscore is part of the prefix so a bare honorific
/// never swallows an ordinary word.
const LECTURER_PREFIXES: &[&str] = &[
  "الدكتور_",
  "الدكتورة_",
  "الأستاذ_",
  "الأستاذة_",
  "المهندس_",
  "المهندسة_",
  "م_",
];

/// Ordinal words accepted in place of a session number.
const ARABIC_ORDINALS: &[(&str, u32)] = &[
  ("الأولى", 1),
  ("الثانية", 2),
  ("الثالثة", 3),
  ("الرابعة", 4),
  ("الخامسة", 5),
  ("السادسة", 6),
  ("السابعة", 7),
  ("الثامنة", 8),
  ("التاسعة", 9),
  ("العاشرة", 10),
];

/// Hijri year bounds accepted by the year matcher.
pub const YEAR_MIN: u16 = 1300;
pub const YEAR_MAX: u16 = 1600;

/// The surface form used when composing guidance text for a content type.
pub fn primary_alias(content_type: ContentType) -> &'static str {
  match content_type {
    ContentType::Lecture => "محاضرة",
    ContentType::BoardImages => "صور_السبورة",
    ContentType::Slides => "سلايدات",
    ContentType::Audio => "تسجيل_صوتي",
    ContentType::Video => "تسجيل_فيديو",
    ContentType::MindMap => "خريطة_ذهنية",
    ContentType::Transcript => "تفريغ",
    ContentType::Related => "ملفات_ذات_صلة",
    ContentType::ExamMid => "نموذج_النصفي",
    ContentType::ExamFinal => "نموذج_النهائي",
    ContentType::Syllabus => "التوصيف",
    ContentType::Attendance => "التحضير",
  }
}

// ─── Classification ──────────────────────────────────────────────────────────

/// The semantic kind of one classified tag token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagKind {
  Content(ContentType),
  /// A session tag. `number` is `None` when the label matched but no usable
  /// number followed (digits or an ordinal word); the grammar reports that
  /// as a missing session rather than an unknown tag.
  Session {
    number: Option<u32>,
    title:  Option<String>,
  },
  Year(u16),
  Lecturer(String),
  Unknown,
}

/// Classify one tag line.
///
/// `token` is the leading whitespace-delimited word of the line (marker
/// included); `line` is the full cleaned line, which only the session
/// matcher consults so an embedded title survives its spaces.
pub fn classify(token: &str, line: &str) -> TagKind {
  let key = alias_key(token);

  if let Some(ct) = lookup_content(&key) {
    return TagKind::Content(ct);
  }
  if let Some(year) = match_year(&key) {
    return TagKind::Year(year);
  }
  if let Some(kind) = match_session(line) {
    return kind;
  }
  if let Some(name) = match_lecturer(token) {
    return TagKind::Lecturer(name);
  }
  TagKind::Unknown
}

fn lookup_content(key: &str) -> Option<ContentType> {
  CONTENT_ALIASES
    .iter()
    .find(|(alias, _)| *alias == key)
    .map(|(_, ct)| *ct)
}

/// Bare 4-digit numeral in `YEAR_MIN..=YEAR_MAX`, optionally suffixed with
/// the era marker `هـ` or `ه`. Out-of-range numerals are not years.
fn match_year(key: &str) -> Option<u16> {
  let digits = key
    .strip_suffix("هـ")
    .or_else(|| key.strip_suffix('ه'))
    .unwrap_or(key);
  if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
    return None;
  }
  let year: u16 = digits.parse().ok()?;
  (YEAR_MIN..=YEAR_MAX).contains(&year).then_some(year)
}

/// `#<label>_<number>[: title]` where `<label>` is a registered session
/// label and `<number>` is digits or an ordinal word. A recognized label
/// with a missing or unusable number still classifies as a session tag,
/// with `number: None`.
fn match_session(line: &str) -> Option<TagKind> {
  let rest = line.trim().strip_prefix('#')?;
  let word_end = rest.find(char::is_whitespace).unwrap_or(rest.len());

  // The label and number live in the tag word itself; a colon there hands
  // the remainder of the line over as the title.
  let (head, title) = match rest[..word_end].split_once(':') {
    Some((head, _)) => {
      let tail = rest[head.len() + 1..].trim();
      (head.trim(), (!tail.is_empty()).then(|| tail.to_string()))
    }
    None => (&rest[..word_end], None),
  };

  let (label, ident) = match head.split_once('_') {
    Some((label, ident)) => (label, Some(ident.trim())),
    None => (head, None),
  };

  let label_key = alias_key(label);
  if !SESSION_LABELS.contains(&label_key.as_str()) {
    return None;
  }

  let number = ident.and_then(session_number);
  Some(TagKind::Session { number, title })
}

fn session_number(ident: &str) -> Option<u32> {
  if !ident.is_empty() && ident.bytes().all(|b| b.is_ascii_digit()) {
    return ident.parse().ok().filter(|n| *n > 0);
  }
  let key = alias_key(ident);
  ARABIC_ORDINALS
    .iter()
    .find(|(word, _)| *word == key)
    .map(|(_, n)| *n)
}

fn match_lecturer(token: &str) -> Option<String> {
  let rest = token.trim().strip_prefix('#')?;
  for prefix in LECTURER_PREFIXES {
    if let Some(name) = rest.strip_prefix(prefix) {
      let name = display_name(name);
      if !name.is_empty() {
        return Some(name);
      }
    }
  }
  None
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::normalize::clean;

  fn classify_token(token: &str) -> TagKind {
    let cleaned = clean(token);
    let word = cleaned.split_whitespace().next().unwrap_or("");
    classify(word, &cleaned)
  }

  #[test]
  fn content_aliases_resolve_across_scripts() {
    assert_eq!(
      classify_token("#محاضرة"),
      TagKind::Content(ContentType::Lecture)
    );
    assert_eq!(
      classify_token("#Lecture"),
      TagKind::Content(ContentType::Lecture)
    );
    assert_eq!(
      classify_token("#سلايدات"),
      TagKind::Content(ContentType::Slides)
    );
    assert_eq!(
      classify_token("#board_images"),
      TagKind::Content(ContentType::BoardImages)
    );
    assert_eq!(
      classify_token("#نموذج_النصفي"),
      TagKind::Content(ContentType::ExamMid)
    );
    assert_eq!(
      classify_token("#التوصيف"),
      TagKind::Content(ContentType::Syllabus)
    );
  }

  #[test]
  fn content_alias_survives_bidi_marks() {
    assert_eq!(
      classify_token("#سلايدا\u{200F}ت"),
      TagKind::Content(ContentType::Slides)
    );
  }

  #[test]
  fn year_forms() {
    assert_eq!(classify_token("#1446"), TagKind::Year(1446));
    assert_eq!(classify_token("#1446هـ"), TagKind::Year(1446));
    assert_eq!(classify_token("#1446ه"), TagKind::Year(1446));
    assert_eq!(classify_token("#١٤٤٦هـ"), TagKind::Year(1446));
  }

  #[test]
  fn out_of_range_numerals_are_not_years() {
    assert_eq!(classify_token("#2024"), TagKind::Unknown);
    assert_eq!(classify_token("#1299"), TagKind::Unknown);
    assert_eq!(classify_token("#144"), TagKind::Unknown);
  }

  #[test]
  fn session_with_digits_and_title() {
    let cleaned = clean("#المحاضرة_5: المقدمة");
    let kind = classify(cleaned.split_whitespace().next().unwrap(), &cleaned);
    assert_eq!(kind, TagKind::Session {
      number: Some(5),
      title:  Some("المقدمة".to_string()),
    });
  }

  #[test]
  fn session_accepts_ordinal_words() {
    let cleaned = clean("#المحاضرة_الخامسة");
    let kind = classify(cleaned.split_whitespace().next().unwrap(), &cleaned);
    assert_eq!(kind, TagKind::Session {
      number: Some(5),
      title:  None,
    });
  }

  #[test]
  fn session_label_without_number_keeps_session_kind() {
    let cleaned = clean("#المحاضرة: المقدمة");
    let kind = classify(cleaned.split_whitespace().next().unwrap(), &cleaned);
    assert_eq!(kind, TagKind::Session {
      number: None,
      title:  Some("المقدمة".to_string()),
    });
  }

  #[test]
  fn session_folds_arabic_digits() {
    let cleaned = clean("#المحاضرة_٣");
    let kind = classify(cleaned.split_whitespace().next().unwrap(), &cleaned);
    assert_eq!(kind, TagKind::Session {
      number: Some(3),
      title:  None,
    });
  }

  #[test]
  fn lecturer_prefixes_strip_to_display_name() {
    assert_eq!(
      classify_token("#الدكتور_أحمد_الزهراني"),
      TagKind::Lecturer("أحمد الزهراني".to_string())
    );
    assert_eq!(
      classify_token("#الدكتورة_سارة"),
      TagKind::Lecturer("سارة".to_string())
    );
    assert_eq!(
      classify_token("#م_خالد"),
      TagKind::Lecturer("خالد".to_string())
    );
  }

  #[test]
  fn bare_honorific_is_not_a_lecturer() {
    assert_eq!(classify_token("#الدكتور_"), TagKind::Unknown);
  }

  #[test]
  fn unregistered_tokens_are_unknown() {
    assert_eq!(classify_token("#غامض"), TagKind::Unknown);
    assert_eq!(classify_token("#not_a_tag"), TagKind::Unknown);
  }
}
