//! Refusal conditions for the tag parsing pipeline.

use tarqim_core::annotation::ContentType;
use thiserror::Error;

use crate::grammar;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
  #[error("caption carries no content tag")]
  NoContentTag,

  #[error("caption carries more than one content tag: {first}, {second}")]
  MultipleContentTags { first: String, second: String },

  #[error("unrecognized tag: {0}")]
  UnknownAlias(String),

  #[error("tags out of order for {content_type}")]
  OrderViolation { content_type: ContentType },

  #[error("no usable session tag for {content_type}")]
  MissingSession { content_type: ContentType },
}

impl Error {
  /// Stable machine-readable code, independent of display wording.
  pub fn code(&self) -> &'static str {
    match self {
      Error::NoContentTag => "NO-CONTENT-TAG",
      Error::MultipleContentTags { .. } => "MULTIPLE-CONTENT-TAGS",
      Error::UnknownAlias(_) => "UNKNOWN-ALIAS",
      Error::OrderViolation { .. } => "ORDER-VIOLATION",
      Error::MissingSession { .. } => "MISSING-SESSION",
    }
  }

  /// User-facing correction text, with a literal example caption where the
  /// failure has one.
  pub fn guidance(&self) -> String {
    match self {
      Error::NoContentTag => format!(
        "أول وسم في التعليق يجب أن يحدد نوع المحتوى، مثل:\n{}",
        grammar::example_caption(ContentType::Lecture)
      ),
      Error::MultipleContentTags { first, second } => format!(
        "وسم محتوى واحد فقط لكل رسالة، وجدنا {first} و{second} معاً"
      ),
      Error::UnknownAlias(tag) => {
        format!("الوسم {tag} غير مسجل، تأكد من كتابته كما في الدليل")
      }
      Error::OrderViolation { content_type }
      | Error::MissingSession { content_type } => format!(
        "الترتيب المطلوب:\n{}",
        grammar::example_caption(*content_type)
      ),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
