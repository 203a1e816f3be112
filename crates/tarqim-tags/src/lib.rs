//! Caption tag parser for Tarqim.
//!
//! Turns a raw message caption into a [`ParsedAnnotation`] for
//! [`tarqim_core`], or a refusal carrying a stable code and user-facing
//! guidance. Pure synchronous; no Telegram or database dependencies.
//!
//! # Quick start
//!
//! ```no_run
//! use tarqim_tags::parse;
//!
//! let caption = "#محاضرة\n#المحاضرة_1: المقدمة\n#1446\n#الدكتور_خالد";
//! let parsed = parse(caption).unwrap();
//! println!("{} session={:?}", parsed.content_type, parsed.session_no);
//! ```

mod classify;
pub mod error;
mod grammar;
mod normalize;
mod parse;

pub use classify::{TagKind, classify, primary_alias};
pub use error::{Error, Result};
pub use grammar::{Expect, TokenKind, example_caption, expected_sequence};
pub use normalize::{alias_key, clean, display_name};
use tarqim_core::annotation::ParsedAnnotation;

// ─── Public API
// ───────────────────────────────────────────────────────────────

/// Parse a message caption into an annotation.
///
/// Every `Err` here is a user correction, never an infrastructure failure:
/// the variant's [`Error::code`] is stable and [`Error::guidance`] tells the
/// submitter what to fix.
pub fn parse(caption: &str) -> Result<ParsedAnnotation> {
  parse::parse(caption)
}

// ─── Caption round-trip test ─────────────────────────────────────────────────
