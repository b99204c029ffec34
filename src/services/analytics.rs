// src/services/analytics.rs

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::result::ExamResult;

/// Correct/total counts for one topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicSummary {
    pub topic: String,
    pub correct: usize,
    pub total: usize,
}

/// Parallel arrays in the shape a bar chart consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicChart {
    pub labels: Vec<String>,
    pub correct: Vec<usize>,
    pub total: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSummary {
    pub total_score: f64,
    pub max_score: usize,
    pub correct_count: usize,
    pub incorrect_count: usize,
    pub topics: Vec<TopicSummary>,
    pub chart: TopicChart,
}

/// Groups results by topic. Topics come back sorted by label.
pub fn topic_breakdown(results: &[ExamResult]) -> Vec<TopicSummary> {
    let mut by_topic: BTreeMap<&str, (usize, usize)> = BTreeMap::new();

    for r in results {
        let entry = by_topic.entry(r.topic.as_str()).or_default();
        entry.1 += 1;
        if r.is_correct {
            entry.0 += 1;
        }
    }

    by_topic
        .into_iter()
        .map(|(topic, (correct, total))| TopicSummary {
            topic: topic.to_string(),
            correct,
            total,
        })
        .collect()
}

/// Rolls a set of results up into the numbers shown on the results page.
pub fn summarize(results: &[ExamResult]) -> ResultSummary {
    let topics = topic_breakdown(results);
    let correct_count = results.iter().filter(|r| r.is_correct).count();

    let chart = TopicChart {
        labels: topics.iter().map(|t| t.topic.clone()).collect(),
        correct: topics.iter().map(|t| t.correct).collect(),
        total: topics.iter().map(|t| t.total).collect(),
    };

    ResultSummary {
        total_score: results.iter().map(|r| r.score).sum(),
        max_score: results.len(),
        correct_count,
        incorrect_count: results.len() - correct_count,
        topics,
        chart,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(question_id: i64, topic: &str, is_correct: bool) -> ExamResult {
        ExamResult {
            session_id: 1,
            question_id,
            position: question_id,
            topic: topic.to_string(),
            prompt: format!("Q{question_id}"),
            submitted_answer: "a".to_string(),
            model_answer: "a".to_string(),
            is_correct,
            score: if is_correct { 1.0 } else { 0.0 },
            scored_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn groups_by_topic_in_label_order() {
        let results = vec![
            result(1, "Physics", true),
            result(2, "Biology", false),
            result(3, "Physics", false),
            result(4, "Biology", true),
            result(5, "Physics", true),
        ];

        let topics = topic_breakdown(&results);
        assert_eq!(
            topics,
            vec![
                TopicSummary { topic: "Biology".into(), correct: 1, total: 2 },
                TopicSummary { topic: "Physics".into(), correct: 2, total: 3 },
            ]
        );
    }

    #[test]
    fn summary_totals_and_chart_agree() {
        let results = vec![
            result(1, "General", true),
            result(2, "General", false),
            result(3, "Maths", true),
        ];

        let summary = summarize(&results);
        assert_eq!(summary.total_score, 2.0);
        assert_eq!(summary.max_score, 3);
        assert_eq!(summary.correct_count, 2);
        assert_eq!(summary.incorrect_count, 1);
        assert_eq!(summary.chart.labels, vec!["General", "Maths"]);
        assert_eq!(summary.chart.correct, vec![1, 1]);
        assert_eq!(summary.chart.total, vec![2, 1]);
    }

    #[test]
    fn recomputing_gives_the_same_summary() {
        let results = vec![result(1, "General", true), result(2, "Maths", false)];
        assert_eq!(summarize(&results), summarize(&results));
    }

    #[test]
    fn empty_results_summarize_to_zero() {
        let summary = summarize(&[]);
        assert_eq!(summary.max_score, 0);
        assert!(summary.topics.is_empty());
        assert!(summary.chart.labels.is_empty());
    }
}
