//! Seed data: the fixed badge catalog every store starts with.

use crate::domain::{Badge, BadgeIcon};

fn locked(id: &str, name: &str, description: &str, icon: BadgeIcon, max_progress: u32) -> Badge {
  Badge {
    id: id.into(),
    name: name.into(),
    description: description.into(),
    icon_name: icon,
    is_locked: true,
    current_progress: 0,
    max_progress,
    unlocked_at: None,
  }
}

/// The eight built-in badges, all locked with zero progress.
pub fn seed_badges() -> Vec<Badge> {
  vec![
    locked("b-1", "Early Bird", "Complete a quiz before 8 AM", BadgeIcon::Sun, 1),
    locked("b-2", "Quiz Master", "Score 100% on 3 quizzes", BadgeIcon::Crown, 3),
    locked("b-3", "Streak Fire", "Reach a 7-day study streak", BadgeIcon::Flame, 7),
    locked("b-4", "Knowledge Seeker", "Create 5 custom quizzes", BadgeIcon::Brain, 5),
    locked("b-5", "Speedster", "Finish a quiz in under 60 seconds", BadgeIcon::Zap, 1),
    locked("b-6", "Perfectionist", "Answer 50 questions correctly", BadgeIcon::Target, 50),
    locked("b-7", "Explorer", "Try quizzes in 3 different topics", BadgeIcon::Rocket, 3),
    locked("b-8", "Scholar", "Study for 10 hours total", BadgeIcon::Trophy, 10),
  ]
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashSet;

  #[test]
  fn catalog_has_eight_unique_locked_badges() {
    let badges = seed_badges();
    assert_eq!(badges.len(), 8);
    let ids: HashSet<_> = badges.iter().map(|b| b.id.as_str()).collect();
    assert_eq!(ids.len(), 8);
    assert!(badges.iter().all(|b| b.is_locked && b.unlocked_at.is_none() && b.current_progress == 0));
  }
}
