//! Turn a finished attempt (quiz + picks + timing) into a `QuizResult`.

use std::collections::HashMap;

use crate::domain::{AnswerRecord, Quiz, QuizResult};

/// Score is the rounded percentage of correct picks; an empty quiz scores 0.
/// Picks for unknown question ids count as wrong. A question picked more than
/// once counts its last pick only.
pub fn grade_attempt(quiz: &Quiz, answers: Vec<AnswerRecord>, started_at: i64, finished_at: i64) -> QuizResult {
  let mut last_pick: HashMap<&str, usize> = HashMap::new();
  for a in &answers {
    last_pick.insert(a.question_id.as_str(), a.selected_index);
  }

  let correct_count = quiz.questions
    .iter()
    .filter(|q| last_pick.get(q.id.as_str()) == Some(&q.correct_answer_index))
    .count() as u32;

  // One record per answered question, in quiz order.
  let answers: Vec<AnswerRecord> = quiz.questions
    .iter()
    .filter_map(|q| {
      last_pick.get(q.id.as_str()).map(|&selected_index| AnswerRecord { question_id: q.id.clone(), selected_index })
    })
    .collect();

  let total_questions = quiz.questions.len() as u32;
  let score = if total_questions > 0 {
    ((correct_count as f64 / total_questions as f64) * 100.0).round() as u32
  } else {
    0
  };
  let elapsed_ms = finished_at.saturating_sub(started_at).max(0);

  QuizResult {
    quiz_id: quiz.id.clone(),
    quiz_title: quiz.title.clone(),
    score,
    total_questions,
    correct_count,
    time_spent_seconds: (elapsed_ms as f64 / 1000.0).round() as u64,
    completed_at: finished_at,
    answers,
  }
}
