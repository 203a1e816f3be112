//! Where a submission belongs.
//!
//! A chat topic binding is the primary source of context; chats without
//! bindings fall back to in-text tags resolved through the store's
//! `context_aliases`. Every resolved piece is cross-checked: two pieces
//! that disagree on the subject or on the section refuse the submission
//! instead of silently picking one.

use tarqim_core::ids::SubjectId;
use tarqim_core::material::Section;
use tarqim_core::store::{ContextTarget, TopicBinding};

use crate::pipeline::Refusal;

/// Subject and optional section a submission resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedContext {
  pub subject: SubjectId,
  pub section: Option<Section>,
}

/// Context resolution failure. User-facing, not an infrastructure error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextFault {
  /// Neither a topic binding nor an in-text tag established a subject.
  NoContext,
  /// Independently resolved pieces of context disagree.
  AliasConflict,
}

impl ContextFault {
  pub fn code(self) -> &'static str {
    match self {
      Self::NoContext => "NO-CONTEXT",
      Self::AliasConflict => "ALIAS-CONFLICT",
    }
  }

  pub fn refusal(self) -> Refusal {
    let guidance = match self {
      Self::NoContext => {
        "تعذر تحديد المادة. أرسل الملف داخل موضوع مرتبط بمادة أو أضف وسم المادة إلى الوصف."
      }
      Self::AliasConflict => {
        "الوسوم تشير إلى أكثر من مادة أو شعبة. أبقِ وسم مادة واحدة فقط."
      }
    };
    Refusal { code: self.code(), guidance: guidance.to_string() }
  }
}

/// Merge the topic binding with in-text alias hits into one context.
pub(crate) fn merge(
  binding: Option<TopicBinding>,
  hits: &[ContextTarget],
) -> Result<ResolvedContext, ContextFault> {
  let mut subject = binding.map(|b| b.subject);
  let mut section = binding.and_then(|b| b.section);

  for hit in hits {
    match *hit {
      ContextTarget::Subject(s) => match subject {
        Some(prev) if prev != s => return Err(ContextFault::AliasConflict),
        _ => subject = Some(s),
      },
      ContextTarget::Section(s) => match section {
        Some(prev) if prev != s => return Err(ContextFault::AliasConflict),
        _ => section = Some(s),
      },
    }
  }

  match subject {
    Some(subject) => Ok(ResolvedContext { subject, section }),
    None => Err(ContextFault::NoContext),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn binding(subject: i64, section: Option<Section>) -> Option<TopicBinding> {
    Some(TopicBinding { subject: SubjectId(subject), section })
  }

  #[test]
  fn a_binding_alone_resolves() {
    let ctx = merge(binding(1, Some(Section::Theory)), &[]).unwrap();
    assert_eq!(ctx.subject, SubjectId(1));
    assert_eq!(ctx.section, Some(Section::Theory));
  }

  #[test]
  fn tags_alone_resolve() {
    let hits = [
      ContextTarget::Subject(SubjectId(3)),
      ContextTarget::Section(Section::Lab),
    ];
    let ctx = merge(None, &hits).unwrap();
    assert_eq!(ctx.subject, SubjectId(3));
    assert_eq!(ctx.section, Some(Section::Lab));
  }

  #[test]
  fn a_tag_agreeing_with_the_binding_is_fine() {
    let hits = [ContextTarget::Subject(SubjectId(1))];
    let ctx = merge(binding(1, None), &hits).unwrap();
    assert_eq!(ctx.subject, SubjectId(1));
  }

  #[test]
  fn tags_refine_a_binding_without_a_section() {
    let hits = [ContextTarget::Section(Section::Discussion)];
    let ctx = merge(binding(1, None), &hits).unwrap();
    assert_eq!(ctx.section, Some(Section::Discussion));
  }

  #[test]
  fn disagreeing_subjects_conflict() {
    let hits = [ContextTarget::Subject(SubjectId(2))];
    assert_eq!(merge(binding(1, None), &hits), Err(ContextFault::AliasConflict));

    let hits = [
      ContextTarget::Subject(SubjectId(2)),
      ContextTarget::Subject(SubjectId(3)),
    ];
    assert_eq!(merge(None, &hits), Err(ContextFault::AliasConflict));
  }

  #[test]
  fn disagreeing_sections_conflict() {
    let hits = [ContextTarget::Section(Section::Lab)];
    let out = merge(binding(1, Some(Section::Theory)), &hits);
    assert_eq!(out, Err(ContextFault::AliasConflict));
  }

  #[test]
  fn nothing_resolves_to_no_context() {
    assert_eq!(merge(None, &[]), Err(ContextFault::NoContext));

    // A bare section is not enough; the subject is what archives key on.
    let hits = [ContextTarget::Section(Section::Theory)];
    assert_eq!(merge(None, &hits), Err(ContextFault::NoContext));
  }
}
