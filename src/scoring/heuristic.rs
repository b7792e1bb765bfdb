use std::sync::LazyLock;

use regex::Regex;

use crate::config::Lexicon;

use super::validate::CandidateResult;

pub const ANALYSIS_METHOD: &str = "Rule-Based (Fallback)";

const UNKNOWN_CANDIDATE: &str = "Unknown Candidate";
const UNKNOWN_INSTITUTION: &str = "Unknown Institution";

// The two years patterns are intentionally separate pipelines: the Python
// one accepts decimals, the experience one is integer-only, and their score
// thresholds were tuned independently. Do not unify them.
static PYTHON_YEARS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)\+?\s*years?").expect("valid years pattern"));
static EXPERIENCE_YEARS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\+?\s*years?").expect("valid years pattern"));

/// Deterministic rule-based analysis. Never fails: malformed or empty input
/// yields a best-effort low score instead of an error.
pub fn analyze(lexicon: &Lexicon, resume_text: &str) -> CandidateResult {
    let lines: Vec<&str> = resume_text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let name = lines.first().copied().unwrap_or(UNKNOWN_CANDIDATE).to_string();
    let university = lines
        .iter()
        .find(|line| {
            lexicon
                .university_markers
                .iter()
                .any(|marker| line.contains(marker))
        })
        .copied()
        .unwrap_or(UNKNOWN_INSTITUTION)
        .to_string();

    let (python_score, python_years, python_evidence) = python_score(lexicon, resume_text);
    let (uni_tier_score, uni_evidence) = university_tier(lexicon, &university);
    let (experience_score, experience_evidence) = experience_score(lexicon, resume_text);
    let skills = extract_skills(lexicon, resume_text);

    let final_rank_score =
        CandidateResult::final_score(python_score as f64, experience_score, uni_tier_score as f64);

    CandidateResult {
        name,
        university,
        skills,
        python_score,
        evidence_quote: python_evidence.clone(),
        python_evidence,
        uni_tier_score,
        uni_evidence,
        experience_score,
        experience_evidence,
        python_experience_years: python_years,
        final_rank_score,
        analysis_method: ANALYSIS_METHOD.to_string(),
    }
}

/// Tier lookup on the extracted institution line: top tier first, then the
/// leading-national set, otherwise a baseline of 5.
pub fn university_tier(lexicon: &Lexicon, university: &str) -> (i64, String) {
    let lowered = university.to_lowercase();
    let lowered = lowered.trim();

    if lexicon
        .top_tier_universities
        .iter()
        .any(|uni| lowered.contains(uni))
    {
        (10, "Global Top Tier University detected.".to_string())
    } else if lexicon
        .leading_national_universities
        .iter()
        .any(|uni| lowered.contains(uni))
    {
        (8, "Leading National University detected.".to_string())
    } else {
        (5, "Standard University tier.".to_string())
    }
}

fn python_score(lexicon: &Lexicon, resume_text: &str) -> (i64, f64, String) {
    let lowered = resume_text.to_lowercase();
    let keyword_count = lexicon
        .python_keywords
        .iter()
        .filter(|kw| lowered.contains(**kw))
        .count();

    let years = PYTHON_YEARS_RE
        .captures(&lowered)
        .and_then(|caps| caps[1].parse::<f64>().ok())
        .unwrap_or(0.0);

    let score = if keyword_count >= 8 && years >= 4.0 {
        9
    } else if keyword_count >= 4 && years >= 2.0 {
        7
    } else if keyword_count >= 1 {
        5
    } else {
        2
    };

    let evidence =
        format!("Found {keyword_count} Python-related keywords and {years} years experience context.");
    (score, years, evidence)
}

fn experience_score(lexicon: &Lexicon, resume_text: &str) -> (f64, String) {
    let lowered = resume_text.to_lowercase();
    let years = EXPERIENCE_YEARS_RE
        .captures(&lowered)
        .and_then(|caps| caps[1].parse::<i64>().ok())
        .unwrap_or(0);
    let impact_count = lexicon
        .impact_verbs
        .iter()
        .filter(|kw| lowered.contains(**kw))
        .count();

    let score = (years as f64 + impact_count as f64 * 0.5).min(10.0);
    let evidence =
        format!("Detected {years} years total experience and {impact_count} impact verbs.");
    (score, evidence)
}

/// Substring scan of the technology lexicon. Entries longer than three
/// characters are title-cased, short ones upper-cased ("python" becomes
/// "Python", "aws" stays "AWS"). Output order follows the lexicon.
fn extract_skills(lexicon: &Lexicon, resume_text: &str) -> Vec<String> {
    let lowered = resume_text.to_lowercase();
    lexicon
        .skill_keywords
        .iter()
        .filter(|kw| lowered.contains(**kw))
        .map(|kw| {
            if kw.len() > 3 {
                title_case(kw)
            } else {
                kw.to_uppercase()
            }
        })
        .collect()
}

fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for ch in text.chars() {
        if at_word_start {
            out.extend(ch.to_uppercase());
        } else {
            out.extend(ch.to_lowercase());
        }
        at_word_start = !ch.is_alphabetic();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lexicon() -> Lexicon {
        Lexicon::builtin()
    }

    const SAMPLE: &str =
        "Alice White\nData Scientist\nHarvard University\n6 years experience in Python and AI.";

    #[test]
    fn scores_sample_resume() {
        let result = analyze(&lexicon(), SAMPLE);
        assert_eq!(result.name, "Alice White");
        assert_eq!(result.university, "Harvard University");
        assert_eq!(result.uni_tier_score, 10);
        // Two python keyword hits (python, ai) with 6 years lands in the
        // single-hit bucket because the count is below 4.
        assert_eq!(result.python_score, 5);
        assert_eq!(result.python_experience_years, 6.0);
        assert_eq!(result.experience_score, 6.0);
        assert_eq!(result.final_rank_score, 6.3);
        assert_eq!(result.analysis_method, ANALYSIS_METHOD);
        assert!(result.skills.contains(&"Python".to_string()));
    }

    #[test]
    fn empty_input_never_fails() {
        let result = analyze(&lexicon(), "");
        assert_eq!(result.name, "Unknown Candidate");
        assert_eq!(result.university, "Unknown Institution");
        assert_eq!(result.uni_tier_score, 5);
        assert_eq!(result.python_score, 2);
        assert_eq!(result.experience_score, 0.0);
        assert_eq!(result.python_experience_years, 0.0);
        assert_eq!(result.final_rank_score, 2.0);
        assert!(!result.python_evidence.is_empty());
        assert!(!result.experience_evidence.is_empty());
    }

    #[test]
    fn is_deterministic() {
        let first = analyze(&lexicon(), SAMPLE);
        let second = analyze(&lexicon(), SAMPLE);
        assert_eq!(first, second);
    }

    #[test]
    fn tier_matching_is_case_insensitive() {
        let lex = lexicon();
        assert_eq!(university_tier(&lex, "STANFORD University").0, 10);
        assert_eq!(university_tier(&lex, "Carnegie Mellon University").0, 8);
        assert_eq!(university_tier(&lex, "Somewhere State College").0, 5);
    }

    #[test]
    fn decimal_years_feed_python_but_not_experience() {
        let text = "Bob\nWorked 2.5 years with python pandas numpy tensorflow projects.";
        let result = analyze(&lexicon(), text);
        // Python pipeline reads 2.5; the integer-only experience pipeline
        // first matches at the fractional digit and reads 5. The
        // disagreement is inherited behavior.
        assert_eq!(result.python_experience_years, 2.5);
        assert_eq!(result.python_score, 7);
        assert!(result.experience_evidence.contains("5 years"));
        assert_eq!(result.experience_score, 5.0);
    }

    #[test]
    fn short_keywords_match_inside_words() {
        // "maintainer" contains "ai"; accepted imprecision of substring
        // matching.
        let result = analyze(&lexicon(), "Carol\nOpen source maintainer.");
        assert_eq!(result.python_score, 5);
    }

    #[test]
    fn experience_score_caps_at_ten() {
        let text = "Dave\n20 years experience. Led, managed, scaled and optimized teams.";
        let result = analyze(&lexicon(), text);
        assert_eq!(result.experience_score, 10.0);
    }

    #[test]
    fn skills_follow_lexicon_order_and_casing() {
        let result = analyze(&lexicon(), "Eve\nBuilt services in go and rust on aws with docker.");
        assert_eq!(result.skills, vec!["GO", "Rust", "AWS", "Docker"]);
    }

    #[test]
    fn title_case_handles_separators() {
        assert_eq!(title_case("machine learning"), "Machine Learning");
        assert_eq!(title_case("node.js"), "Node.Js");
        assert_eq!(title_case("ci/cd"), "Ci/Cd");
    }
}
