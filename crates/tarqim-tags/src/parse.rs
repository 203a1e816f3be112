//! Caption parser entry point.
//!
//! Pipeline:
//!   raw caption &str
//!     └─ normalize::clean()      → folded, mark-free text
//!          └─ line_tokens()      → (position, token) per line
//!               └─ classify()    → Vec<Tag>
//!                    └─ screen + grammar::validate()
//!                         └─ ParsedAnnotation

use tarqim_core::annotation::{ContentType, ParsedAnnotation};

use crate::{
  classify::{self, TagKind},
  error::{Error, Result},
  grammar, normalize,
};

// ─── Tokenizer ───────────────────────────────────────────────────────────────

struct Tag {
  raw:  String,
  kind: TagKind,
}

/// Whitespace-separated words of a line, each with its byte offset. A word is
/// a tag only if it starts with `#`.
pub(crate) fn line_tokens(line: &str) -> Vec<(usize, &str)> {
  let mut words = Vec::new();
  let mut start: Option<usize> = None;
  for (i, ch) in line.char_indices() {
    if ch.is_whitespace() {
      if let Some(s) = start.take() {
        words.push((s, &line[s..i]));
      }
    } else if start.is_none() {
      start = Some(i);
    }
  }
  if let Some(s) = start {
    words.push((s, &line[s..]));
  }
  words
}

/// Scan the cleaned caption for tag tokens, classifying each as it is found.
///
/// A session tag with a `:` swallows the remainder of its line as the session
/// title, so scanning resumes on the next line.
fn scan(text: &str) -> Vec<Tag> {
  let mut tags = Vec::new();
  for line in text.lines() {
    for (pos, word) in line_tokens(line) {
      if !word.starts_with('#') {
        continue;
      }
      let rest = &line[pos..];
      let kind = classify::classify(word, rest);
      let consumed_line =
        matches!(kind, TagKind::Session { .. }) && word.contains(':');
      tags.push(Tag {
        raw: word.to_string(),
        kind,
      });
      if consumed_line {
        break;
      }
    }
  }
  tags
}

// ─── Screening and assembly ──────────────────────────────────────────────────

/// Exactly one content tag, or the refusal that says why not.
///
/// When no content tag is present but unrecognized tokens are, the unknown
/// token is the more useful report, so it wins over the bare no-content code.
fn single_content(tags: &[Tag]) -> Result<ContentType> {
  let mut found: Option<(usize, ContentType)> = None;
  for (i, tag) in tags.iter().enumerate() {
    if let TagKind::Content(ct) = tag.kind {
      match found {
        None => found = Some((i, ct)),
        Some((first, _)) => {
          return Err(Error::MultipleContentTags {
            first:  tags[first].raw.clone(),
            second: tag.raw.clone(),
          });
        }
      }
    }
  }
  match found {
    Some((_, ct)) => Ok(ct),
    None => match first_unknown(tags) {
      Some(raw) => Err(Error::UnknownAlias(raw)),
      None => Err(Error::NoContentTag),
    },
  }
}

fn first_unknown(tags: &[Tag]) -> Option<String> {
  tags
    .iter()
    .find(|t| matches!(t.kind, TagKind::Unknown))
    .map(|t| t.raw.clone())
}

/// Parse a raw caption into an annotation, or the refusal explaining what to
/// fix. Infrastructure never fails here; every error is a user correction.
pub fn parse(caption: &str) -> Result<ParsedAnnotation> {
  let text = normalize::clean(caption);
  let tags = scan(&text);

  if tags.is_empty() {
    return Err(Error::NoContentTag);
  }

  let content_type = single_content(&tags)?;
  if let Some(raw) = first_unknown(&tags) {
    return Err(Error::UnknownAlias(raw));
  }

  let kinds: Vec<TagKind> = tags.iter().map(|t| t.kind.clone()).collect();
  grammar::validate(content_type, &kinds)?;

  let mut annotation = ParsedAnnotation {
    content_type,
    session_no: None,
    title: None,
    year: None,
    lecturer: None,
    raw_tags: tags.iter().map(|t| t.raw.clone()).collect(),
  };
  for tag in &tags {
    match &tag.kind {
      TagKind::Session { number, title } => {
        annotation.session_no = *number;
        annotation.title = title.clone();
      }
      TagKind::Year(year) => annotation.year = Some(*year),
      TagKind::Lecturer(name) => annotation.lecturer = Some(name.clone()),
      TagKind::Content(_) | TagKind::Unknown => {}
    }
  }
  Ok(annotation)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn words_carry_their_offsets() {
    let words = line_tokens("  #محاضرة   #1446");
    assert_eq!(words.len(), 2);
    assert_eq!(words[0].1, "#محاضرة");
    assert_eq!(words[1].1, "#1446");
    assert_eq!(&"  #محاضرة   #1446"[words[1].0..], "#1446");
  }

  #[test]
  fn session_title_consumes_the_line() {
    let tags = scan("#محاضرة\n#المحاضرة_1: شرح #مفصل\n#1446");
    let raws: Vec<&str> = tags.iter().map(|t| t.raw.as_str()).collect();
    assert_eq!(raws, ["#محاضرة", "#المحاضرة_1:", "#1446"]);
    assert!(matches!(
      &tags[1].kind,
      TagKind::Session { number: Some(1), title: Some(t) } if t == "شرح #مفصل"
    ));
  }

  #[test]
  fn hash_inside_a_word_is_not_a_tag() {
    let tags = scan("see docs#anchor\n#تفريغ");
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].raw, "#تفريغ");
  }

  #[test]
  fn unknown_wins_over_no_content_when_both_apply() {
    let err = parse("#وسم_غامض").unwrap_err();
    assert_eq!(err, Error::UnknownAlias("#وسم_غامض".to_string()));
  }

  #[test]
  fn caption_without_tags_has_no_content_tag() {
    assert_eq!(parse("مرحبا بالجميع").unwrap_err(), Error::NoContentTag);
    assert_eq!(parse("").unwrap_err(), Error::NoContentTag);
  }

  #[test]
  fn multiple_content_reports_both_tokens() {
    let err = parse("#محاضرة\n#سلايدات\n#المحاضرة_1: x\n#1446").unwrap_err();
    assert_eq!(err, Error::MultipleContentTags {
      first:  "#محاضرة".to_string(),
      second: "#سلايدات".to_string(),
    });
  }

  #[test]
  fn multiple_content_wins_over_unknown() {
    let err = parse("#محاضرة #سلايدات #غامض").unwrap_err();
    assert!(matches!(err, Error::MultipleContentTags { .. }));
  }

  #[test]
  fn unknown_wins_over_grammar_when_content_present() {
    let err = parse("#محاضرة\n#غامض\n#المحاضرة_1: x\n#1446").unwrap_err();
    assert_eq!(err, Error::UnknownAlias("#غامض".to_string()));
  }

  #[test]
  fn full_lecture_caption_parses() {
    let parsed = parse(
      "#محاضرة\n#المحاضرة_3: مدخل إلى علم التشريح\n#1446\n#الدكتور_خالد_العمري",
    )
    .unwrap();
    assert_eq!(parsed.content_type, ContentType::Lecture);
    assert_eq!(parsed.session_no, Some(3));
    assert_eq!(parsed.title.as_deref(), Some("مدخل إلى علم التشريح"));
    assert_eq!(parsed.year, Some(1446));
    assert_eq!(parsed.lecturer.as_deref(), Some("خالد العمري"));
    assert_eq!(parsed.raw_tags.len(), 4);
  }

  #[test]
  fn tags_share_a_line_when_space_separated() {
    let parsed = parse("#تفريغ #المحاضرة_2 #1446").unwrap();
    assert_eq!(parsed.content_type, ContentType::Transcript);
    assert_eq!(parsed.session_no, Some(2));
    assert_eq!(parsed.title, None);
    assert_eq!(parsed.year, Some(1446));
  }

  #[test]
  fn arabic_digits_and_marks_fold_before_scanning() {
    let parsed = parse("\u{200f}#محاضرة\n#المحاضرة_\u{661}: مقدمة\n#١٤٤٦هـ")
      .unwrap();
    assert_eq!(parsed.session_no, Some(1));
    assert_eq!(parsed.year, Some(1446));
  }

  #[test]
  fn order_violation_surfaces_from_grammar() {
    let err = parse("#محاضرة\n#1446\n#المحاضرة_1: x").unwrap_err();
    assert!(matches!(err, Error::OrderViolation {
      content_type: ContentType::Lecture,
    }));
  }

  #[test]
  fn exam_caption_parses_without_session() {
    let parsed = parse("#نموذج_النصفي\n#1445\n#الدكتورة_سارة").unwrap();
    assert_eq!(parsed.content_type, ContentType::ExamMid);
    assert_eq!(parsed.session_no, None);
    assert_eq!(parsed.year, Some(1445));
    assert_eq!(parsed.lecturer.as_deref(), Some("سارة"));
  }

  #[test]
  fn attendance_caption_is_a_single_tag() {
    let parsed = parse("#التحضير").unwrap();
    assert_eq!(parsed.content_type, ContentType::Attendance);
    assert_eq!(parsed.raw_tags, ["#التحضير"]);
  }
}
