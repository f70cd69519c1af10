//! Conversation Context Manager.
//!
//! Keeps the bounded history of one session:
//! - Appends turns in arrival order
//! - Drops the oldest turns past the cap
//! - Renders the most recent turns as grounding prefix text

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::config::ConversationTuning;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Turns retained after every append
    pub max_turns: usize,
    /// Turns included by `render_for_grounding`
    pub grounding_turns: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            max_turns: 10,
            grounding_turns: 5,
        }
    }
}

impl From<&ConversationTuning> for WindowConfig {
    fn from(tuning: &ConversationTuning) -> Self {
        Self {
            max_turns: tuning.max_turns,
            grounding_turns: tuning.grounding_turns,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Assistant => f.write_str("assistant"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
    /// Position in the session, counting every turn ever appended.
    pub sequence: u64,
    pub created_at: DateTime<Utc>,
}

/// Window of recent turns owned by a single session.
#[derive(Debug, Clone, Default)]
pub struct ConversationWindow {
    config: WindowConfig,
    turns: VecDeque<ConversationTurn>,
    next_sequence: u64,
}

impl ConversationWindow {
    pub fn new(config: WindowConfig) -> Self {
        Self {
            config,
            turns: VecDeque::new(),
            next_sequence: 0,
        }
    }

    pub fn append(&mut self, role: Role, text: impl Into<String>) {
        self.turns.push_back(ConversationTurn {
            role,
            text: text.into(),
            sequence: self.next_sequence,
            created_at: Utc::now(),
        });
        self.next_sequence += 1;

        while self.turns.len() > self.config.max_turns {
            self.turns.pop_front();
        }
    }

    /// The most recent turns as `role: text` lines, oldest first.
    /// Empty when there is no history.
    pub fn render_for_grounding(&self) -> String {
        let skip = self.turns.len().saturating_sub(self.config.grounding_turns);
        self.turns
            .iter()
            .skip(skip)
            .map(|turn| format!("{}: {}\n", turn.role, turn.text))
            .collect()
    }

    pub fn reset(&mut self) {
        self.turns.clear();
    }

    pub fn turns(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(n: usize) -> ConversationWindow {
        let mut window = ConversationWindow::new(WindowConfig::default());
        for i in 0..n {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            window.append(role, format!("turn {}", i));
        }
        window
    }

    #[test]
    fn keeps_the_ten_most_recent_turns_in_order() {
        let window = filled(12);
        assert_eq!(window.len(), 10);
        let texts: Vec<_> = window.turns().map(|t| t.text.clone()).collect();
        let expected: Vec<_> = (2..12).map(|i| format!("turn {}", i)).collect();
        assert_eq!(texts, expected);
        assert_eq!(window.turns().next().map(|t| t.sequence), Some(2));
    }

    #[test]
    fn grounding_renders_last_five_turns() {
        let window = filled(12);
        let rendered = window.render_for_grounding();
        let lines: Vec<_> = rendered.lines().collect();
        assert_eq!(
            lines,
            vec![
                "assistant: turn 7",
                "user: turn 8",
                "assistant: turn 9",
                "user: turn 10",
                "assistant: turn 11",
            ]
        );
        assert!(!rendered.contains("turn 6"));
    }

    #[test]
    fn short_history_renders_everything() {
        let window = filled(2);
        assert_eq!(window.render_for_grounding(), "user: turn 0\nassistant: turn 1\n");
    }

    #[test]
    fn reset_empties_the_window() {
        let mut window = filled(4);
        window.reset();
        assert!(window.is_empty());
        assert_eq!(window.render_for_grounding(), "");
    }
}
