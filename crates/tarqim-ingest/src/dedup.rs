//! Identity-key construction and duplicate lookup support.
//!
//! Lecture-family materials store their title in the composed
//! `محاضرة {n}: {title}` form so the session number is part of the identity.
//! Other content types key on the canonical display name of the type, which
//! makes them one-per-`(subject, section, year, lecturer)` by construction.

use tarqim_core::annotation::{ContentType, ParsedAnnotation};
use tarqim_core::material::MaterialKey;
use tarqim_core::store::ArchiveStore;
use tarqim_tags::{display_name, primary_alias};

use crate::context::ResolvedContext;
use crate::error::{Error, Result};

/// The title under which an annotation is archived.
pub fn stored_title(annotation: &ParsedAnnotation) -> String {
  let lecture_family = annotation.content_type == ContentType::Lecture
    || annotation.content_type.is_lecture_attachment();
  if lecture_family {
    match (annotation.session_no, &annotation.title) {
      (Some(n), Some(title)) => format!("محاضرة {n}: {title}"),
      (Some(n), None) => format!("محاضرة {n}"),
      (None, Some(title)) => title.clone(),
      (None, None) => display_name(primary_alias(annotation.content_type)),
    }
  } else {
    display_name(primary_alias(annotation.content_type))
  }
}

/// Bare-title fallback for lecture attachments, matching records archived
/// before the numbered-title convention. Not part of the identity key.
pub fn legacy_title(annotation: &ParsedAnnotation) -> Option<String> {
  annotation
    .content_type
    .is_lecture_attachment()
    .then(|| annotation.title.clone())
    .flatten()
}

/// Build the identity key for an annotation in its resolved context,
/// creating year and lecturer rows on first use.
pub async fn identity_key<S: ArchiveStore>(
  store: &S,
  context: ResolvedContext,
  annotation: &ParsedAnnotation,
) -> Result<MaterialKey> {
  let year = match annotation.year {
    Some(year) => {
      Some(store.ensure_year(&year.to_string()).await.map_err(Error::store)?)
    }
    None => None,
  };
  let lecturer = match &annotation.lecturer {
    Some(name) => {
      Some(store.ensure_lecturer(name).await.map_err(Error::store)?)
    }
    None => None,
  };

  Ok(MaterialKey {
    subject:      context.subject,
    section:      context.section,
    content_type: annotation.content_type,
    title:        stored_title(annotation),
    year,
    lecturer,
  })
}
