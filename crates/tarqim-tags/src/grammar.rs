//! The per-content-type tag grammar and its validator.
//!
//! Each content type declares an ordered expected sequence of token kinds;
//! validation is a walk over that sequence with positions as states. A token
//! either advances the position, skips a trailing optional element, or is a
//! failing transition. The tables and the walk are all the grammar there is.

use tarqim_core::annotation::ContentType;

use crate::{classify::TagKind, error::Error};

// ─── Expected sequences ──────────────────────────────────────────────────────

/// The grammar's view of a classified token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
  Content,
  Session,
  Year,
  Lecturer,
}

/// One slot in an expected sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expect {
  pub kind:     TokenKind,
  pub required: bool,
}

const fn req(kind: TokenKind) -> Expect {
  Expect {
    kind,
    required: true,
  }
}

const fn opt(kind: TokenKind) -> Expect {
  Expect {
    kind,
    required: false,
  }
}

const LECTURE_SEQ: &[Expect] = &[
  req(TokenKind::Content),
  req(TokenKind::Session),
  req(TokenKind::Year),
  opt(TokenKind::Lecturer),
];

const EXAM_SEQ: &[Expect] = &[
  req(TokenKind::Content),
  req(TokenKind::Year),
  opt(TokenKind::Lecturer),
];

const SYLLABUS_SEQ: &[Expect] = &[
  req(TokenKind::Content),
  opt(TokenKind::Year),
  opt(TokenKind::Lecturer),
];

const ATTENDANCE_SEQ: &[Expect] = &[req(TokenKind::Content)];

/// The declared order for a content type. Lecture attachments share the
/// lecture grammar: they carry the session numbering of the lecture they
/// belong to.
pub fn expected_sequence(content_type: ContentType) -> &'static [Expect] {
  match content_type {
    ContentType::Lecture
    | ContentType::BoardImages
    | ContentType::Slides
    | ContentType::Audio
    | ContentType::Video
    | ContentType::MindMap
    | ContentType::Transcript
    | ContentType::Related => LECTURE_SEQ,
    ContentType::ExamMid | ContentType::ExamFinal => EXAM_SEQ,
    ContentType::Syllabus => SYLLABUS_SEQ,
    ContentType::Attendance => ATTENDANCE_SEQ,
  }
}

// ─── Guidance text ───────────────────────────────────────────────────────────

/// A literal caption in this content type's expected order, for error
/// guidance. Optional slots are marked so users know they may be left out.
pub fn example_caption(content_type: ContentType) -> String {
  let mut lines = Vec::new();
  for exp in expected_sequence(content_type) {
    let line = match exp.kind {
      TokenKind::Content => {
        format!("#{}", crate::classify::primary_alias(content_type))
      }
      TokenKind::Session => "#المحاضرة_1: العنوان".to_string(),
      TokenKind::Year => "#1446".to_string(),
      TokenKind::Lecturer => "#الدكتور_فلان".to_string(),
    };
    if exp.required {
      lines.push(line);
    } else {
      lines.push(format!("{line} (اختياري)"));
    }
  }
  lines.join("\n")
}

// ─── Validator ───────────────────────────────────────────────────────────────

fn token_kind(kind: &TagKind) -> Option<TokenKind> {
  match kind {
    TagKind::Content(_) => Some(TokenKind::Content),
    TagKind::Session { .. } => Some(TokenKind::Session),
    TagKind::Year(_) => Some(TokenKind::Year),
    TagKind::Lecturer(_) => Some(TokenKind::Lecturer),
    TagKind::Unknown => None,
  }
}

fn has_usable_session(kinds: &[TagKind]) -> bool {
  kinds
    .iter()
    .any(|k| matches!(k, TagKind::Session { number: Some(_), .. }))
}

/// A required slot went unfilled. Distinguish "the session tag is absent or
/// unusable" from every other ordering failure.
fn unfilled(
  content_type: ContentType,
  expected: TokenKind,
  usable_session: bool,
) -> Error {
  if expected == TokenKind::Session && !usable_session {
    Error::MissingSession { content_type }
  } else {
    Error::OrderViolation { content_type }
  }
}

/// Check the classified sequence against the content type's declared order.
///
/// `kinds` is the full sequence including the content token itself. Unknown
/// tokens are failing transitions here; callers that want the dedicated
/// unknown-alias code must screen for them first.
pub fn validate(
  content_type: ContentType,
  kinds: &[TagKind],
) -> Result<(), Error> {
  let seq = expected_sequence(content_type);
  let usable_session = has_usable_session(kinds);
  let mut pos = 0;

  for kind in kinds {
    let Some(observed) = token_kind(kind) else {
      return Err(Error::OrderViolation { content_type });
    };
    loop {
      match seq.get(pos) {
        None => return Err(Error::OrderViolation { content_type }),
        Some(exp) if exp.kind == observed => {
          if exp.kind == TokenKind::Session
            && !matches!(kind, TagKind::Session { number: Some(_), .. })
          {
            return Err(Error::MissingSession { content_type });
          }
          pos += 1;
          break;
        }
        Some(exp) if !exp.required => pos += 1,
        Some(exp) => {
          return Err(unfilled(content_type, exp.kind, usable_session));
        }
      }
    }
  }

  for exp in &seq[pos..] {
    if exp.required {
      return Err(unfilled(content_type, exp.kind, usable_session));
    }
  }
  Ok(())
}
