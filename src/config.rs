use std::{
    env,
    path::PathBuf,
    time::Duration,
};

/// Resume text is cut to this many characters before it is embedded in a
/// model prompt; anything longer blows past the smaller backends' limits.
pub const RESUME_PROMPT_LIMIT: usize = 12_000;
pub const JOB_DESCRIPTION_PROMPT_LIMIT: usize = 2_000;

/// Upper bound on a single backend call. The upstream services give no
/// guarantee about stalled connections, so the client enforces its own.
pub const BACKEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Model identifiers carry a provider prefix understood by the LLM client.
pub const PRIMARY_MODEL: &str = "groq/llama-3.1-8b-instant";
pub const SECONDARY_MODEL: &str = "gemini/gemini-flash-latest";

/// Sampling temperature used for every scoring call. Near-deterministic on
/// purpose: the same resume should score the same way twice.
pub const SCORING_TEMPERATURE: f32 = 0.1;

/// Fixed extraction/scoring contract sent as the system instruction. The
/// output keys here are the exact field names the validator expects.
pub const SCORING_SYSTEM_PROMPT: &str = r#"Role: Expert Technical Recruiter and Data Entry Specialist.
Task: Extract candidate information and analyze resume against Job Description.
Constraint: Evidence-Based. If skill is missing, score 0.

Extraction:
- name: Full name of the candidate
- university: Educational institution name. Extract the exact name as written in the resume.
- skills: List of technical skills found in resume (e.g. ["Python", "React", "AWS"])

Scoring:
- python_score (0-10): libs, complexity, years
- uni_tier_score (0-10): 10=Top Global, 7-9=Top National, 4-6=Regional, 1-3=Unknown
- experience_score (0-10): Score from 0 to 10 based on quality and years.
IMPORTANT: ALL scores must be between 0 and 10. DO NOT exceed 10.

Output JSON ONLY:
{
  "name": "Candidate Name",
  "university": "University Name",
  "skills": ["Skill1", "Skill2", "Skill3"],
  "python_score": 0-10,
  "python_evidence": "1-sentence justification",
  "uni_tier_score": 0-10,
  "uni_evidence": "1-sentence justification",
  "experience_score": 0-10,
  "experience_evidence": "1-sentence justification",
  "python_experience_years": float
}"#;

/// Location of the flat JSON store. Relative paths resolve against the
/// working directory.
pub fn data_file() -> PathBuf {
    env::var("DATA_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data.json"))
}

/// Directory that receives uploaded resume files.
pub fn upload_dir() -> PathBuf {
    env::var("UPLOAD_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("uploads"))
}

/// Static keyword tables used by the rule-based scorer. Built once at startup
/// and shared read-only; nothing in the pipeline mutates these.
pub struct Lexicon {
    /// Matched case-insensitively as substrings of the extracted
    /// institution line.
    pub top_tier_universities: &'static [&'static str],
    pub leading_national_universities: &'static [&'static str],
    /// Case-sensitive markers that identify the institution line itself.
    pub university_markers: &'static [&'static str],
    /// Technology lexicon for skill extraction, emitted in this order.
    pub skill_keywords: &'static [&'static str],
    /// Keywords that feed the Python proficiency score. Short entries such
    /// as "ai" and "ml" match inside unrelated words; that imprecision is
    /// inherited behavior, not something to correct here.
    pub python_keywords: &'static [&'static str],
    pub impact_verbs: &'static [&'static str],
}

impl Lexicon {
    pub fn builtin() -> Self {
        Self {
            top_tier_universities: &[
                "stanford", "mit", "harvard", "caltech", "oxford", "cambridge",
                "princeton", "yale", "columbia", "cornell", "upenn", "berkeley",
                "iit bombay", "iit delhi", "iit madras", "iit kanpur", "iit kharagpur",
                "iit roorkee", "iit guwahati", "iit hyderabad", "iisc",
                "brown", "dartmouth", "penn", "california institute of technology",
            ],
            leading_national_universities: &[
                "nit trichy", "nit warangal", "nit surathkal", "nit calicut",
                "nit durgapur", "nit jamshedpur", "nit allahabad", "nit bhopal",
                "university of michigan", "university of texas", "carnegie mellon",
                "georgia tech", "eth zurich", "ethz", "nus",
                "national university of singapore",
            ],
            university_markers: &["University", "Institute", "IIT", "NIT", "College"],
            skill_keywords: &[
                "python", "java", "javascript", "typescript", "c++", "c#", "go", "rust",
                "ruby", "php", "react", "angular", "vue", "node.js", "django", "flask",
                "fastapi", "spring", "sql", "postgresql", "mysql", "mongodb", "redis",
                "elasticsearch", "aws", "azure", "gcp", "docker", "kubernetes",
                "terraform", "machine learning", "deep learning", "tensorflow",
                "pytorch", "scikit-learn", "pandas", "numpy", "data science", "nlp",
                "computer vision", "git", "ci/cd", "agile", "scrum", "rest api",
                "graphql",
            ],
            python_keywords: &[
                "python", "pandas", "numpy", "tensorflow", "pytorch", "scikit-learn",
                "keras", "ml", "ai", "fastapi", "django",
            ],
            impact_verbs: &[
                "led", "managed", "scaled", "optimized", "architected", "impact",
                "delivered",
            ],
        }
    }
}
