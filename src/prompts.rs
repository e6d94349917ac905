//! Prompts sent to the feedback model.
//!
//! Every prompt lives here so wording changes touch exactly one file and
//! unit tests can inspect the text without calling a model.
//!
//! Callers can override the system prompt via
//! [`crate::config::PipelineConfig::system_prompt`]; the per-submission
//! instructions always come from [`prepare_instructions`].

/// Default system prompt for reviewing a résumé rendered as page images.
pub const FEEDBACK_SYSTEM_PROMPT: &str = r#"You are an expert in Applicant Tracking Systems (ATS) and technical recruiting. You review résumés page by page from the images you are given.

Be thorough and honest:
- Low scores are fine when the résumé is weak; do not inflate them.
- Every tip must point at something concrete on the page.
- Judge the résumé against the job it is submitted for, not in the abstract."#;

/// JSON shape the model must answer with.
///
/// Mirrors [`crate::record::Feedback`]; keep both in sync.
pub const RESPONSE_FORMAT: &str = r#"{
  "overallScore": number,            // 0-100
  "ATS": {
    "score": number,                 // 0-100, how well an ATS parses and ranks this résumé
    "tips": [ { "type": "good" | "improve", "tip": string } ]   // 3-4 tips
  },
  "toneAndStyle": {
    "score": number,
    "tips": [ { "type": "good" | "improve", "tip": string, "explanation": string } ]
  },
  "content":   { "score": number, "tips": [ same shape as toneAndStyle.tips ] },
  "structure": { "score": number, "tips": [ same shape as toneAndStyle.tips ] },
  "skills":    { "score": number, "tips": [ same shape as toneAndStyle.tips ] }
}"#;

/// Build the per-submission instructions from the job context.
///
/// Empty fields are passed through; the model is told the posting is
/// unspecified rather than the prompt being rejected.
pub fn prepare_instructions(job_title: &str, job_description: &str) -> String {
    let job_title = non_empty_or(job_title, "(not specified)");
    let job_description = non_empty_or(job_description, "(not specified)");
    format!(
        "Analyze and rate this résumé and suggest how to improve it.\n\
         If provided, take the job description into consideration.\n\
         The job title is: {job_title}\n\
         The job description is: {job_description}\n\n\
         Provide the feedback using the following format:\n{RESPONSE_FORMAT}\n\n\
         Return the analysis as a JSON object, without any other text and \
         without backticks. Do not include any commentary."
    )
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}
