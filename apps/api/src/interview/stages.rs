//! Interview stages and the forward-only transition table.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Intro,
    Resume,
    GapChallenge,
    Conclusion,
    End,
}

impl Stage {
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Intro => "intro",
            Stage::Resume => "resume",
            Stage::GapChallenge => "gap_challenge",
            Stage::Conclusion => "conclusion",
            Stage::End => "end",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageRule {
    pub stage: Stage,
    pub required_turns: u32,
    pub next: Stage,
}

/// What `TransitionTable::advance` decided for the current stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Stay,
    To(Stage),
    /// The table named a stage that is not strictly later; ignored.
    Rejected(Stage),
}

/// Stage budgets plus the per-session limits that go with them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionTable {
    pub name: &'static str,
    rules: Vec<StageRule>,
    pub max_turns: u32,
    /// Messages of history sent with each interviewer prompt.
    pub history_window: usize,
    /// Messages of history sent to the evaluator.
    pub evaluation_window: usize,
}

fn rule(stage: Stage, required_turns: u32, next: Stage) -> StageRule {
    StageRule {
        stage,
        required_turns,
        next,
    }
}

impl TransitionTable {
    pub fn new(
        name: &'static str,
        rules: Vec<StageRule>,
        max_turns: u32,
        history_window: usize,
        evaluation_window: usize,
    ) -> Self {
        Self {
            name,
            rules,
            max_turns,
            history_window,
            evaluation_window,
        }
    }

    pub fn standard() -> Self {
        Self::new(
            "standard",
            vec![
                rule(Stage::Intro, 2, Stage::Resume),
                rule(Stage::Resume, 3, Stage::GapChallenge),
                rule(Stage::GapChallenge, 4, Stage::Conclusion),
                rule(Stage::Conclusion, 2, Stage::End),
            ],
            15,
            4,
            8,
        )
    }

    pub fn compact() -> Self {
        Self::new(
            "compact",
            vec![
                rule(Stage::Intro, 1, Stage::Resume),
                rule(Stage::Resume, 2, Stage::GapChallenge),
                rule(Stage::GapChallenge, 2, Stage::Conclusion),
                rule(Stage::Conclusion, 1, Stage::End),
            ],
            6,
            6,
            10,
        )
    }

    pub fn by_name(name: &str) -> Result<Self, AppError> {
        match name.trim() {
            "standard" => Ok(Self::standard()),
            "compact" => Ok(Self::compact()),
            other => Err(AppError::Validation(format!(
                "Unknown interview profile '{other}'. Expected 'standard' or 'compact'"
            ))),
        }
    }

    pub fn rule(&self, stage: Stage) -> Option<&StageRule> {
        self.rules.iter().find(|r| r.stage == stage)
    }

    /// Decides whether `stage` has used up its budget. Never moves backwards or sideways.
    pub fn advance(&self, stage: Stage, stage_turn: u32) -> Advance {
        let Some(rule) = self.rule(stage) else {
            return Advance::Stay;
        };
        if stage_turn < rule.required_turns {
            debug!(stage = stage.as_str(), stage_turn, required = rule.required_turns, "staying");
            return Advance::Stay;
        }
        if rule.next.index() <= stage.index() {
            warn!(
                from = stage.as_str(),
                to = rule.next.as_str(),
                "blocked non-forward stage transition"
            );
            return Advance::Rejected(rule.next);
        }
        Advance::To(rule.next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_matches_index() {
        let order = [
            Stage::Intro,
            Stage::Resume,
            Stage::GapChallenge,
            Stage::Conclusion,
            Stage::End,
        ];
        for (i, stage) in order.iter().enumerate() {
            assert_eq!(stage.index(), i);
        }
        assert!(Stage::Intro < Stage::End);
    }

    #[test]
    fn test_advance_waits_for_budget() {
        let table = TransitionTable::standard();
        assert_eq!(table.advance(Stage::Intro, 0), Advance::Stay);
        assert_eq!(table.advance(Stage::Intro, 1), Advance::Stay);
        assert_eq!(table.advance(Stage::Intro, 2), Advance::To(Stage::Resume));
        assert_eq!(table.advance(Stage::Conclusion, 2), Advance::To(Stage::End));
        assert_eq!(table.advance(Stage::End, 99), Advance::Stay);
    }

    #[test]
    fn test_backward_transition_is_rejected() {
        let table = TransitionTable::new(
            "broken",
            vec![rule(Stage::Resume, 1, Stage::Intro), rule(Stage::Intro, 1, Stage::Intro)],
            10,
            4,
            8,
        );
        assert_eq!(table.advance(Stage::Resume, 1), Advance::Rejected(Stage::Intro));
        assert_eq!(table.advance(Stage::Intro, 5), Advance::Rejected(Stage::Intro));
    }

    #[test]
    fn test_profiles_by_name() {
        assert_eq!(TransitionTable::by_name("compact").unwrap().max_turns, 6);
        assert_eq!(
            TransitionTable::by_name("standard")
                .unwrap()
                .rule(Stage::GapChallenge)
                .map(|r| r.required_turns),
            Some(4)
        );
        assert!(TransitionTable::by_name("marathon").is_err());
    }

    #[test]
    fn test_stage_serializes_snake_case() {
        assert_eq!(serde_json::to_value(Stage::GapChallenge).unwrap(), "gap_challenge");
    }
}
