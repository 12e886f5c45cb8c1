//! Derived statistics over quiz history.

use crate::domain::{QuizResult, UserStats};

const XP_PER_QUESTION: u64 = 10;
const XP_PER_LEVEL: u64 = 1000;

/// Recompute `UserStats` from the full history. Pure: same input, same output,
/// independent of order.
pub fn compute_stats(history: &[QuizResult]) -> UserStats {
  let total_quizzes = history.len() as u64;
  let total_score: u64 = history.iter().map(|r| r.score as u64).sum();
  let total_questions: u64 = history.iter().map(|r| r.total_questions as u64).sum();

  let average_score = if total_quizzes > 0 {
    (total_score as f64 / total_quizzes as f64).round() as u32
  } else {
    0
  };

  let xp = total_questions * XP_PER_QUESTION + total_score;

  UserStats {
    total_quizzes: total_quizzes as u32,
    average_score,
    // Placeholder kept as-is: any history counts as a one-day streak.
    study_streak: if total_quizzes > 0 { 1 } else { 0 },
    total_questions_answered: total_questions,
    xp,
    level: xp / XP_PER_LEVEL + 1,
  }
}
