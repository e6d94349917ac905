//! The persisted submission record and the structured feedback it carries.
//!
//! A [`SubmissionRecord`] is written to the key-value store twice under
//! [`record_key`]: once with [`FeedbackSlot::Pending`] before the analysis
//! starts, and once with [`FeedbackSlot::Ready`] after the model's answer has
//! been parsed. Readers must accept both forms.
//!
//! ## Wire format
//!
//! ```json
//! {
//!   "id": "1b4e…",
//!   "resumePath": "/8f1c…/resume.pdf",
//!   "imagePath": "/2a9d…/resume.png",
//!   "company": "Acme",
//!   "jobTitle": "SWE",
//!   "jobDescription": "Build things",
//!   "feedback": ""
//! }
//! ```
//!
//! `feedback` is the empty string while processing and an object afterwards.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Prefix of every record key in the key-value store.
pub const RECORD_KEY_PREFIX: &str = "resume:";

/// Prefix of the detail-view route the caller navigates to on success.
pub const RECORD_ROUTE_PREFIX: &str = "/resume/";

/// Key under which the record with `id` is stored.
pub fn record_key(id: &str) -> String {
    format!("{RECORD_KEY_PREFIX}{id}")
}

/// Route of the detail view for the record with `id`.
pub fn navigation_target(id: &str) -> String {
    format!("{RECORD_ROUTE_PREFIX}{id}")
}

/// One résumé analysis request and, eventually, its result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    pub id: String,
    pub resume_path: String,
    pub image_path: String,
    pub company: String,
    pub job_title: String,
    pub job_description: String,
    pub feedback: FeedbackSlot,
}

impl SubmissionRecord {
    pub fn key(&self) -> String {
        record_key(&self.id)
    }

    pub fn state(&self) -> RecordState {
        match self.feedback {
            FeedbackSlot::Pending => RecordState::Processing,
            FeedbackSlot::Ready(_) => RecordState::Complete,
        }
    }

    /// Serialise for the key-value store.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(value: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(value)
    }
}

/// What a reader should show for a stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// Placeholder written; feedback not stored (yet, or ever).
    Processing,
    Complete,
}

/// The record's one mutable field.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FeedbackSlot {
    /// Stored as `""`.
    #[default]
    Pending,
    Ready(Feedback),
}

impl FeedbackSlot {
    pub fn as_ready(&self) -> Option<&Feedback> {
        match self {
            FeedbackSlot::Pending => None,
            FeedbackSlot::Ready(f) => Some(f),
        }
    }
}

impl Serialize for FeedbackSlot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FeedbackSlot::Pending => serializer.serialize_str(""),
            FeedbackSlot::Ready(feedback) => feedback.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for FeedbackSlot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Placeholder(String),
            Parsed(Feedback),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Placeholder(s) if s.is_empty() => Ok(FeedbackSlot::Pending),
            Raw::Placeholder(s) => Err(serde::de::Error::custom(format!(
                "feedback must be \"\" or an object, got string of {} bytes",
                s.len()
            ))),
            Raw::Parsed(feedback) => Ok(FeedbackSlot::Ready(feedback)),
        }
    }
}

// ── Structured feedback ──────────────────────────────────────────────────

/// The analysis the model is asked to return.
///
/// Field names match the JSON described in [`crate::prompts::RESPONSE_FORMAT`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    /// 0–100, overall fit for the posting.
    pub overall_score: u32,
    #[serde(rename = "ATS")]
    pub ats: AtsFeedback,
    pub tone_and_style: CategoryFeedback,
    pub content: CategoryFeedback,
    pub structure: CategoryFeedback,
    pub skills: CategoryFeedback,
}

impl Feedback {
    /// Every score, labelled, in display order.
    pub fn scores(&self) -> [(&'static str, u32); 6] {
        [
            ("overall", self.overall_score),
            ("ATS", self.ats.score),
            ("tone & style", self.tone_and_style.score),
            ("content", self.content.score),
            ("structure", self.structure.score),
            ("skills", self.skills.score),
        ]
    }

    /// Check every score lies in `0..=100`.
    pub fn validate(&self) -> Result<(), String> {
        match self.scores().iter().find(|(_, score)| *score > 100) {
            Some((name, score)) => Err(format!("{name} score {score} is outside 0–100")),
            None => Ok(()),
        }
    }
}

/// Applicant-tracking-system compatibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtsFeedback {
    pub score: u32,
    #[serde(default)]
    pub tips: Vec<AtsTip>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtsTip {
    #[serde(rename = "type")]
    pub kind: TipKind,
    pub tip: String,
}

/// One scored section of the review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryFeedback {
    pub score: u32,
    #[serde(default)]
    pub tips: Vec<DetailedTip>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedTip {
    #[serde(rename = "type")]
    pub kind: TipKind,
    pub tip: String,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TipKind {
    /// Something the résumé already does well.
    Good,
    /// Something to change.
    Improve,
}
