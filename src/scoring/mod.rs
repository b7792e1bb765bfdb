pub mod error;
pub mod heuristic;
pub mod validate;

pub use error::ScoringError;
pub use validate::CandidateResult;

use tracing::{info, warn};

use crate::{
    config::{
        self, JOB_DESCRIPTION_PROMPT_LIMIT, Lexicon, RESUME_PROMPT_LIMIT,
    },
    llm::{ChatMessage, LlmClient, LlmProvider, LlmRequest, MessageRole},
};

const METHOD_PRIMARY: &str = "Groq Llama-3.1";
const METHOD_SECONDARY: &str = "Gemini Flash (Fallback)";
const METHOD_SECONDARY_CORRECTED: &str = "Gemini Flash (Corrected Fallback)";

/// Entry point used by the routing layer. `use_ai` selects the model path;
/// the rule-based path is also the guaranteed fallback, so this function
/// cannot fail. Callers are responsible for rejecting blank resume text.
pub async fn analyze_resume(
    llm: &LlmClient,
    lexicon: &Lexicon,
    resume_text: &str,
    job_description: &str,
    use_ai: bool,
) -> CandidateResult {
    if use_ai {
        analyze_with_ai(llm, lexicon, resume_text, job_description).await
    } else {
        heuristic::analyze(lexicon, resume_text)
    }
}

/// Model-backed analysis: primary backend, then secondary with one
/// self-correction round, then the rule-based scorer. Backend errors are
/// absorbed here and only eliminate that backend for this invocation.
pub async fn analyze_with_ai(
    llm: &LlmClient,
    lexicon: &Lexicon,
    resume_text: &str,
    job_description: &str,
) -> CandidateResult {
    let user_content = format!(
        "Resume: {}\nJob Description: {}",
        truncate_chars(resume_text, RESUME_PROMPT_LIMIT),
        truncate_chars(job_description, JOB_DESCRIPTION_PROMPT_LIMIT),
    );

    if llm.has_provider(LlmProvider::Groq) {
        match call_primary(llm, &user_content).await {
            Ok(mut result) => {
                result.analysis_method = METHOD_PRIMARY.to_string();
                return result;
            }
            Err(err) => {
                warn!(%err, "primary backend failed, trying secondary");
            }
        }
    }

    if llm.has_provider(LlmProvider::Gemini) {
        match call_secondary(llm, &user_content).await {
            Ok(result) => return result,
            Err(err) => {
                warn!(%err, "secondary backend failed");
            }
        }
    }

    info!("no model backend produced a usable result, using rule-based fallback");
    heuristic::analyze(lexicon, resume_text)
}

async fn call_primary(llm: &LlmClient, user_content: &str) -> Result<CandidateResult, ScoringError> {
    let system = format!(
        "{}\nIMPORTANT: Return ONLY the JSON object. No markdown formatting.",
        config::SCORING_SYSTEM_PROMPT
    );
    let request = LlmRequest::new(
        config::PRIMARY_MODEL,
        vec![
            ChatMessage::new(MessageRole::System, system),
            ChatMessage::new(MessageRole::User, user_content),
        ],
    );

    let response = llm
        .execute(request)
        .await
        .map_err(|err| ScoringError::BackendUnavailable(err.to_string()))?;

    process_model_response(&response.text)
}

/// Bounded self-correction: at most one retry, tracked explicitly so the
/// termination bound stays visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CorrectionState {
    Normal,
    Correcting,
    Exhausted,
}

impl CorrectionState {
    fn advance(self) -> Self {
        match self {
            CorrectionState::Normal => CorrectionState::Correcting,
            CorrectionState::Correcting | CorrectionState::Exhausted => {
                CorrectionState::Exhausted
            }
        }
    }
}

async fn call_secondary(
    llm: &LlmClient,
    user_content: &str,
) -> Result<CandidateResult, ScoringError> {
    let request = LlmRequest::new(
        config::SECONDARY_MODEL,
        vec![ChatMessage::new(
            MessageRole::User,
            format!("{}\n{}", config::SCORING_SYSTEM_PROMPT, user_content),
        )],
    );
    let response = llm
        .execute(request)
        .await
        .map_err(|err| ScoringError::BackendUnavailable(err.to_string()))?;

    let mut state = CorrectionState::Normal;
    let mut raw = response.text;

    loop {
        match process_model_response(&raw) {
            Ok(mut result) => {
                result.analysis_method = match state {
                    CorrectionState::Normal => METHOD_SECONDARY.to_string(),
                    _ => METHOD_SECONDARY_CORRECTED.to_string(),
                };
                return Ok(result);
            }
            Err(err) => {
                state = state.advance();
                match state {
                    CorrectionState::Correcting => {
                        warn!(%err, "secondary output unusable, attempting self-correction");
                        let fix_prompt = format!(
                            "Fix this invalid JSON based on schema:\n{raw}\nError: {err}\nReturn ONLY valid JSON."
                        );
                        let retry = LlmRequest::new(
                            config::SECONDARY_MODEL,
                            vec![ChatMessage::new(MessageRole::User, fix_prompt)],
                        );
                        raw = llm
                            .execute(retry)
                            .await
                            .map_err(|e| ScoringError::BackendUnavailable(e.to_string()))?
                            .text;
                    }
                    _ => return Err(err),
                }
            }
        }
    }
}

/// Normalize, parse, clamp and validate one raw model response.
fn process_model_response(raw: &str) -> Result<CandidateResult, ScoringError> {
    let cleaned = normalize_response_text(raw);
    let mut value: serde_json::Value = serde_json::from_str(&cleaned)
        .map_err(|err| ScoringError::MalformedResponse(err.to_string()))?;
    validate::sanitize_scores(&mut value);
    validate::validate(value)
}

/// Strip markdown code fences and a stray leading "json" label. Runs on
/// every response before the structured parse, whichever backend produced
/// it.
fn normalize_response_text(raw: &str) -> String {
    let mut text = raw.trim();

    if text.starts_with("```") {
        // Drop the opening fence line (which may carry a language tag).
        text = match text.split_once('\n') {
            Some((_, rest)) => rest,
            None => "",
        };
        if text.ends_with("```") {
            text = match text.rsplit_once('\n') {
                Some((head, _)) => head,
                None => "",
            };
        }
    }

    match text.strip_prefix("json") {
        Some(rest) => rest.trim().to_string(),
        None => text.to_string(),
    }
}

fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_JSON: &str = r#"{
        "name": "Jane Doe",
        "university": "Example University",
        "skills": ["Python"],
        "python_score": 8,
        "python_evidence": "Strong Python background.",
        "uni_tier_score": 5,
        "uni_evidence": "Regional institution.",
        "experience_score": 6,
        "experience_evidence": "Six years in industry.",
        "python_experience_years": 6.0
    }"#;

    #[test]
    fn normalization_strips_fences_and_language_tag() {
        let fenced = format!("```json\n{VALID_JSON}\n```");
        assert_eq!(normalize_response_text(&fenced), VALID_JSON.trim());
    }

    #[test]
    fn normalization_strips_stray_json_label() {
        let labeled = format!("json\n{VALID_JSON}");
        assert_eq!(normalize_response_text(&labeled), VALID_JSON.trim());
    }

    #[test]
    fn normalization_is_idempotent() {
        let fenced = format!("```json\n{VALID_JSON}\n```");
        let once = normalize_response_text(&fenced);
        let twice = normalize_response_text(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn fenced_response_parses_identically_to_plain() {
        let fenced = format!("```json\n{VALID_JSON}\n```");
        let from_fenced = process_model_response(&fenced).unwrap();
        let from_plain = process_model_response(VALID_JSON).unwrap();
        assert_eq!(from_fenced, from_plain);
    }

    #[test]
    fn garbage_response_is_malformed() {
        let err = process_model_response("the candidate looks great").unwrap_err();
        assert!(matches!(err, ScoringError::MalformedResponse(_)));
    }

    #[test]
    fn correction_state_is_bounded() {
        let state = CorrectionState::Normal;
        let state = state.advance();
        assert_eq!(state, CorrectionState::Correcting);
        let state = state.advance();
        assert_eq!(state, CorrectionState::Exhausted);
        assert_eq!(state.advance(), CorrectionState::Exhausted);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let text = "résumé".repeat(10);
        let cut = truncate_chars(&text, 7);
        assert_eq!(cut.chars().count(), 7);
        assert!(text.starts_with(cut));
    }

    #[tokio::test]
    async fn falls_back_to_rules_when_no_backend_is_available() {
        let llm = LlmClient::with_keys(None, None).unwrap();
        let lexicon = Lexicon::builtin();
        let result = analyze_with_ai(&llm, &lexicon, "Alice White\nHarvard University", "").await;
        assert_eq!(result.analysis_method, heuristic::ANALYSIS_METHOD);
        assert_eq!(result.uni_tier_score, 10);
    }

    #[tokio::test]
    async fn use_ai_flag_selects_the_rule_based_path() {
        let llm = LlmClient::with_keys(None, None).unwrap();
        let lexicon = Lexicon::builtin();
        let result = analyze_resume(&llm, &lexicon, "Bob\nSome College", "", false).await;
        assert_eq!(result.analysis_method, heuristic::ANALYSIS_METHOD);
    }
}
