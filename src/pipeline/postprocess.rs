//! Post-processing: turn a feedback response into a typed [`Feedback`].
//!
//! Three deterministic steps, applied in order:
//!
//! 1. **Normalise the payload shape.** [`FeedbackContent`] is either a plain
//!    string or a list of content blocks; both collapse into one string here
//!    so nothing downstream cares which provider answered.
//! 2. **Strip an outer code fence.** Models wrap JSON in ```` ```json ````
//!    fences even when told not to.
//! 3. **Parse and validate.** `serde_json` into [`Feedback`], then reject
//!    scores outside 0–100.
//!
//! Every step returns a [`FeedbackParseError`]; nothing here panics on
//! malformed model output.

use crate::backend::FeedbackContent;
use crate::record::Feedback;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Why a feedback payload could not be used.
#[derive(Debug, Error)]
pub enum FeedbackParseError {
    /// A multi-part payload had no parts.
    #[error("response contained no content blocks")]
    NoContent,

    /// The payload text was empty after trimming.
    #[error("response text was empty")]
    EmptyText,

    /// The text was not the expected JSON object.
    #[error("response is not valid feedback JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The JSON parsed but a value is out of range.
    #[error("feedback out of range: {0}")]
    OutOfRange(String),
}

/// Collapse either payload shape into one string.
///
/// For multi-part content only the first block is used.
pub fn extract_text(content: FeedbackContent) -> Result<String, FeedbackParseError> {
    match content {
        FeedbackContent::Text(text) => Ok(text),
        FeedbackContent::Parts(parts) => parts
            .into_iter()
            .next()
            .map(|part| part.text)
            .ok_or(FeedbackParseError::NoContent),
    }
}

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json|JSON)?[ \t]*\r?\n(.*?)\r?\n?```$").unwrap());

/// Remove a single fence wrapping the whole payload, if present.
pub fn strip_json_fences(input: &str) -> &str {
    let trimmed = input.trim();
    match RE_OUTER_FENCES.captures(trimmed) {
        Some(caps) => caps.get(1).map_or(trimmed, |m| m.as_str().trim()),
        None => trimmed,
    }
}

/// Parse the extracted text into validated feedback.
pub fn parse_feedback(text: &str) -> Result<Feedback, FeedbackParseError> {
    let body = strip_json_fences(text);
    if body.is_empty() {
        return Err(FeedbackParseError::EmptyText);
    }
    let feedback: Feedback = serde_json::from_str(body)?;
    feedback.validate().map_err(FeedbackParseError::OutOfRange)?;
    Ok(feedback)
}

/// [`extract_text`] followed by [`parse_feedback`].
pub fn feedback_from_content(content: FeedbackContent) -> Result<Feedback, FeedbackParseError> {
    let text = extract_text(content)?;
    parse_feedback(&text)
}
