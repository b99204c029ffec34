// src/services/scorer.rs

use std::{fmt, str::FromStr};

use serde::Serialize;

/// Points awarded for a correct answer.
pub const POINTS_PER_CORRECT: f64 = 1.0;

/// How a submitted answer is matched against the model answer.
///
/// Both sides are normalized first (see [`normalize`]). The policy is read
/// once from configuration and stays fixed for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringPolicy {
    /// Normalized texts must be equal.
    Exact,
    /// The normalized model answer must appear inside the normalized submission.
    Contains,
}

impl fmt::Display for ScoringPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoringPolicy::Exact => f.write_str("exact"),
            ScoringPolicy::Contains => f.write_str("contains"),
        }
    }
}

impl FromStr for ScoringPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(ScoringPolicy::Exact),
            "contains" | "substring" => Ok(ScoringPolicy::Contains),
            other => Err(format!("unknown scoring policy '{other}' (expected exact or contains)")),
        }
    }
}

/// Outcome for a single answer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grade {
    pub is_correct: bool,
    pub score: f64,
}

/// Trims, lowercases and collapses whitespace runs into single spaces.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Grades one answer. Blank submissions are never correct, whatever the policy.
pub fn grade(policy: ScoringPolicy, submitted: &str, model_answer: &str) -> Grade {
    let submitted = normalize(submitted);
    let model = normalize(model_answer);

    let is_correct = !submitted.is_empty()
        && match policy {
            ScoringPolicy::Exact => submitted == model,
            ScoringPolicy::Contains => !model.is_empty() && submitted.contains(&model),
        };

    Grade {
        is_correct,
        score: if is_correct { POINTS_PER_CORRECT } else { 0.0 },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_ignores_case_and_spacing() {
        let g = grade(ScoringPolicy::Exact, "  The  Mitochondria ", "the mitochondria");
        assert!(g.is_correct);
        assert_eq!(g.score, 1.0);
    }

    #[test]
    fn exact_match_rejects_extra_words() {
        let g = grade(ScoringPolicy::Exact, "it is the mitochondria", "the mitochondria");
        assert!(!g.is_correct);
        assert_eq!(g.score, 0.0);
    }

    #[test]
    fn contains_accepts_model_answer_inside_longer_text() {
        let g = grade(ScoringPolicy::Contains, "I think it is Paris, France", "paris");
        assert!(g.is_correct);
    }

    #[test]
    fn contains_is_one_directional() {
        // A fragment of the model answer is not enough.
        let g = grade(ScoringPolicy::Contains, "par", "paris");
        assert!(!g.is_correct);
    }

    #[test]
    fn blank_answers_score_zero() {
        for policy in [ScoringPolicy::Exact, ScoringPolicy::Contains] {
            assert!(!grade(policy, "   ", "").is_correct);
            assert!(!grade(policy, "", "paris").is_correct);
        }
    }

    #[test]
    fn unicode_is_lowercased() {
        assert!(grade(ScoringPolicy::Exact, "ÉCOLE", "école").is_correct);
    }

    #[test]
    fn policy_parses_from_config_text() {
        assert_eq!("Exact".parse::<ScoringPolicy>(), Ok(ScoringPolicy::Exact));
        assert_eq!("substring".parse::<ScoringPolicy>(), Ok(ScoringPolicy::Contains));
        assert!("fuzzy".parse::<ScoringPolicy>().is_err());
    }
}
