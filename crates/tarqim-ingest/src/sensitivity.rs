//! Pre-parse screen for personal data in captions and filenames.
//!
//! Runs before any state is created. Keyword and pattern hits are counted
//! together; at or above the threshold the submission is refused outright
//! with `SENSITIVITY-BLOCK`. Keywords are extensible through configuration,
//! the digit patterns are built in.

use regex::Regex;
use tarqim_tags::clean;

use crate::pipeline::Refusal;

/// Digit runs that look like national ids and local phone numbers. The
/// normalizer has already folded Arabic-Indic digits by the time these run.
const DIGIT_PATTERNS: &[&str] = &[
  r"\b[12]\d{9}\b",
  r"\b05\d{8}\b",
  r"\+9665\d{8}\b",
];

const BASE_KEYWORDS: &[&str] = &[
  "رقم الهوية",
  "الهوية الوطنية",
  "السجل المدني",
  "رقم الجوال",
  "كلمة المرور",
];

const DEFAULT_THRESHOLD: usize = 2;

const GUIDANCE: &str =
  "يبدو أن المحتوى يتضمن بيانات شخصية، لذا رُفض حفظه في الأرشيف.";

pub struct SensitivityPolicy {
  keywords:  Vec<String>,
  patterns:  Vec<Regex>,
  threshold: usize,
}

impl SensitivityPolicy {
  pub fn new(extra_keywords: &[String]) -> Result<Self, regex::Error> {
    let patterns = DIGIT_PATTERNS
      .iter()
      .map(|p| Regex::new(p))
      .collect::<Result<Vec<_>, _>>()?;
    let keywords = BASE_KEYWORDS
      .iter()
      .copied()
      .map(str::to_string)
      .chain(extra_keywords.iter().map(|k| clean(k)))
      .map(|k| k.to_lowercase())
      .collect();
    Ok(Self { keywords, patterns, threshold: DEFAULT_THRESHOLD })
  }

  /// Count keyword and pattern hits over the caption and filename together.
  /// `Some` means the submission must be refused.
  pub fn screen(&self, caption: &str, file_name: Option<&str>) -> Option<Refusal> {
    let mut text = clean(caption).to_lowercase();
    if let Some(name) = file_name {
      text.push('\n');
      text.push_str(&clean(name).to_lowercase());
    }

    let keyword_hits: usize = self
      .keywords
      .iter()
      .map(|k| text.matches(k.as_str()).count())
      .sum();
    let pattern_hits: usize = self
      .patterns
      .iter()
      .map(|p| p.find_iter(&text).count())
      .sum();

    (keyword_hits + pattern_hits >= self.threshold).then(|| Refusal {
      code:     "SENSITIVITY-BLOCK",
      guidance: GUIDANCE.to_string(),
    })
  }
}
