use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::ScoringError;

/// Method label applied when the caller does not override it with the name
/// of the backend that actually produced the record.
pub const ANALYSIS_METHOD_DEFAULT: &str = "AI Analysis";

const SCORE_FIELDS: [&str; 3] = ["python_score", "uni_tier_score", "experience_score"];

const PYTHON_WEIGHT: f64 = 0.5;
const EXPERIENCE_WEIGHT: f64 = 0.3;
const UNI_TIER_WEIGHT: f64 = 0.2;

/// The canonical scored record. `final_rank_score` is derived from the three
/// component scores and is never accepted from an external source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResult {
    pub name: String,
    pub university: String,
    pub skills: Vec<String>,
    pub python_score: i64,
    pub python_evidence: String,
    /// Duplicate of `python_evidence` retained for older record consumers.
    pub evidence_quote: String,
    pub uni_tier_score: i64,
    pub uni_evidence: String,
    /// Whole integers when produced by the validator; the rule-based scorer
    /// carries half points from its impact-verb term.
    pub experience_score: f64,
    pub experience_evidence: String,
    pub python_experience_years: f64,
    pub final_rank_score: f64,
    pub analysis_method: String,
}

impl CandidateResult {
    /// Weighted final rank: Python 50%, experience 30%, university tier 20%.
    pub fn final_score(python: f64, experience: f64, uni_tier: f64) -> f64 {
        round2(python * PYTHON_WEIGHT + experience * EXPERIENCE_WEIGHT + uni_tier * UNI_TIER_WEIGHT)
    }

    /// Recompute the derived rank from the current component scores. Must be
    /// called whenever a component changes so a stale rank is never persisted.
    pub fn recompute_final_rank(&mut self) {
        self.final_rank_score = Self::final_score(
            self.python_score as f64,
            self.experience_score,
            self.uni_tier_score as f64,
        );
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Clamp the three score fields into [0, 10] ahead of strict validation.
/// A value that cannot be read as an integer at all becomes 0: model output
/// is untrusted and a type mismatch in these fields must not abort the
/// pipeline.
pub fn sanitize_scores(value: &mut Value) {
    let Some(map) = value.as_object_mut() else {
        return;
    };
    for field in SCORE_FIELDS {
        if let Some(entry) = map.get_mut(field) {
            let coerced = coerce_int(entry).map(|v| v.clamp(0, 10)).unwrap_or(0);
            *entry = Value::from(coerced);
        }
    }
}

fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(num) => num.as_i64().or_else(|| num.as_f64().map(|f| f as i64)),
        // Strings must already look like integers; "7.5" and "high" both
        // fail coercion and fall back to 0 via the caller.
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Validate a loose record (typically sanitized model output) into the
/// canonical shape, recomputing the derived rank.
pub fn validate(value: Value) -> Result<CandidateResult, ScoringError> {
    let Value::Object(map) = value else {
        return Err(ScoringError::MalformedResponse(
            "expected a JSON object".to_string(),
        ));
    };

    let name = required_text(&map, "name")?;
    let university = required_text(&map, "university")?;
    let skills = skills_list(map.get("skills"))?;
    let python_score = required_score(&map, "python_score")?;
    let uni_tier_score = required_score(&map, "uni_tier_score")?;
    let experience_score = required_score(&map, "experience_score")?;
    let python_experience_years = optional_years(map.get("python_experience_years"))?;
    let python_evidence = optional_text(map.get("python_evidence"));
    let uni_evidence = optional_text(map.get("uni_evidence"));
    let experience_evidence = optional_text(map.get("experience_evidence"));

    let mut result = CandidateResult {
        name,
        university,
        skills,
        python_score,
        evidence_quote: python_evidence.clone(),
        python_evidence,
        uni_tier_score,
        uni_evidence,
        experience_score: experience_score as f64,
        experience_evidence,
        python_experience_years,
        final_rank_score: 0.0,
        analysis_method: ANALYSIS_METHOD_DEFAULT.to_string(),
    };
    result.recompute_final_rank();
    Ok(result)
}

fn required_text(map: &Map<String, Value>, field: &'static str) -> Result<String, ScoringError> {
    match map.get(field) {
        Some(Value::String(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                Err(ScoringError::EmptyField(field))
            } else {
                Ok(trimmed.to_string())
            }
        }
        Some(Value::Null) | None => Err(ScoringError::EmptyField(field)),
        Some(other) => Err(ScoringError::invalid(
            field,
            format!("expected a string, got {other}"),
        )),
    }
}

fn optional_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(text)) => text.clone(),
        _ => String::new(),
    }
}

/// Absent or null skills become an empty list; a single comma-separated
/// string is split into entries with blanks dropped.
fn skills_list(value: Option<&Value>) -> Result<Vec<String>, ScoringError> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(text)) => Ok(text
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(text) => Ok(text.clone()),
                other => Err(ScoringError::invalid(
                    "skills",
                    format!("expected string entries, got {other}"),
                )),
            })
            .collect(),
        Some(other) => Err(ScoringError::invalid(
            "skills",
            format!("expected a list or string, got {other}"),
        )),
    }
}

fn required_score(map: &Map<String, Value>, field: &'static str) -> Result<i64, ScoringError> {
    let value = map
        .get(field)
        .ok_or_else(|| ScoringError::invalid(field, "missing"))?;
    let score = coerce_int(value)
        .ok_or_else(|| ScoringError::invalid(field, format!("not an integer: {value}")))?;
    if !(0..=10).contains(&score) {
        return Err(ScoringError::invalid(
            field,
            format!("{score} is outside the 0-10 range"),
        ));
    }
    Ok(score)
}

fn optional_years(value: Option<&Value>) -> Result<f64, ScoringError> {
    let years = match value {
        None | Some(Value::Null) => 0.0,
        Some(Value::Number(num)) => num.as_f64().unwrap_or(0.0),
        Some(Value::String(text)) => text.trim().parse::<f64>().map_err(|_| {
            ScoringError::invalid(
                "python_experience_years",
                format!("not a number: {text}"),
            )
        })?,
        Some(other) => {
            return Err(ScoringError::invalid(
                "python_experience_years",
                format!("expected a number, got {other}"),
            ));
        }
    };
    if years < 0.0 {
        return Err(ScoringError::invalid(
            "python_experience_years",
            format!("{years} is negative"),
        ));
    }
    Ok(years)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base_payload() -> Value {
        json!({
            "name": "Jane Doe",
            "university": "Example University",
            "skills": ["Python", "AWS"],
            "python_score": 8,
            "python_evidence": "Heavy Python usage across three roles.",
            "uni_tier_score": 5,
            "uni_evidence": "Regional institution.",
            "experience_score": 6,
            "experience_evidence": "Six years in industry.",
            "python_experience_years": 6.0
        })
    }

    #[test]
    fn validates_and_derives_final_rank() {
        let result = validate(base_payload()).unwrap();
        assert_eq!(result.python_score, 8);
        assert_eq!(result.final_rank_score, 6.8);
        assert_eq!(result.evidence_quote, result.python_evidence);
        assert_eq!(result.analysis_method, ANALYSIS_METHOD_DEFAULT);
    }

    #[test]
    fn out_of_range_scores_are_clamped() {
        let mut payload = base_payload();
        payload["python_score"] = json!(15);
        payload["experience_score"] = json!(-3);
        sanitize_scores(&mut payload);
        let result = validate(payload).unwrap();
        assert_eq!(result.python_score, 10);
        assert_eq!(result.experience_score, 0.0);
    }

    #[test]
    fn non_numeric_scores_become_zero() {
        let mut payload = base_payload();
        payload["python_score"] = json!("very good");
        payload["uni_tier_score"] = json!("7.5");
        sanitize_scores(&mut payload);
        let result = validate(payload).unwrap();
        assert_eq!(result.python_score, 0);
        assert_eq!(result.uni_tier_score, 0);
    }

    #[test]
    fn float_scores_truncate_like_integers() {
        let mut payload = base_payload();
        payload["python_score"] = json!(7.9);
        sanitize_scores(&mut payload);
        let result = validate(payload).unwrap();
        assert_eq!(result.python_score, 7);
    }

    #[test]
    fn blank_name_is_rejected() {
        let mut payload = base_payload();
        payload["name"] = json!("   ");
        let err = validate(payload).unwrap_err();
        assert!(matches!(err, ScoringError::EmptyField("name")));
    }

    #[test]
    fn missing_university_is_rejected() {
        let mut payload = base_payload();
        payload.as_object_mut().unwrap().remove("university");
        let err = validate(payload).unwrap_err();
        assert!(matches!(err, ScoringError::EmptyField("university")));
    }

    #[test]
    fn comma_separated_skills_are_split() {
        let mut payload = base_payload();
        payload["skills"] = json!("Python, React,  , AWS");
        let result = validate(payload).unwrap();
        assert_eq!(result.skills, vec!["Python", "React", "AWS"]);
    }

    #[test]
    fn absent_skills_default_to_empty() {
        let mut payload = base_payload();
        payload.as_object_mut().unwrap().remove("skills");
        let result = validate(payload).unwrap();
        assert!(result.skills.is_empty());
    }

    #[test]
    fn absent_evidence_defaults_to_empty_string() {
        let mut payload = base_payload();
        let map = payload.as_object_mut().unwrap();
        map.remove("python_evidence");
        map.remove("python_experience_years");
        let result = validate(payload).unwrap();
        assert_eq!(result.python_evidence, "");
        assert_eq!(result.python_experience_years, 0.0);
    }

    #[test]
    fn unvalidated_out_of_range_score_fails_strict_validation() {
        let mut payload = base_payload();
        payload["python_score"] = json!(15);
        // Without the sanitize pass, strict validation refuses the value.
        let err = validate(payload).unwrap_err();
        assert!(matches!(
            err,
            ScoringError::InvalidField {
                field: "python_score",
                ..
            }
        ));
    }

    #[test]
    fn recompute_keeps_rank_consistent() {
        let mut result = validate(base_payload()).unwrap();
        result.python_score = 2;
        result.recompute_final_rank();
        assert_eq!(
            result.final_rank_score,
            CandidateResult::final_score(2.0, 6.0, 5.0)
        );
    }
}
