//! Beginner selection and the two free-build rounds.

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::board::CornerId;

/// One roll per candidate; a tie for the highest sum sends only the tied
/// players into another round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeginnerSelection {
    candidates: Vec<usize>,
    rolls: Vec<(usize, u8)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// Still waiting on candidates of this round.
    Pending,
    /// The round ended in a tie; these players roll again.
    Reroll(Vec<usize>),
    Decided(usize),
}

impl BeginnerSelection {
    pub fn new(candidates: Vec<usize>) -> Self {
        Self {
            candidates,
            rolls: Vec::new(),
        }
    }

    pub fn may_roll(&self, player: usize) -> bool {
        self.candidates.contains(&player) && self.rolls.iter().all(|(p, _)| *p != player)
    }

    /// Records `sum` for `player`, who must be allowed to roll.
    pub fn record(&mut self, player: usize, sum: u8) -> SelectionOutcome {
        self.rolls.push((player, sum));
        if self.rolls.len() < self.candidates.len() {
            return SelectionOutcome::Pending;
        }
        let best = self.rolls.iter().map(|(_, s)| *s).max().unwrap_or(0);
        let tied: Vec<usize> = self
            .rolls
            .iter()
            .filter(|(_, s)| *s == best)
            .map(|(p, _)| *p)
            .sorted_unstable()
            .collect();
        self.rolls.clear();
        if let [winner] = tied.as_slice() {
            let winner = *winner;
            self.candidates = vec![winner];
            return SelectionOutcome::Decided(winner);
        }
        self.candidates = tied.clone();
        SelectionOutcome::Reroll(tied)
    }
}

/// Walks the snake order of free builds: every player once in turn order,
/// then once more in reverse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupRounds {
    order: Vec<usize>,
    step: usize,
    players: usize,
    /// Settlement placed in the current step; the road must touch it.
    pub anchor: Option<CornerId>,
}

impl SetupRounds {
    pub fn new(turn_order: &[usize]) -> Self {
        let order = turn_order
            .iter()
            .chain(turn_order.iter().rev())
            .copied()
            .collect();
        Self {
            order,
            step: 0,
            players: turn_order.len(),
            anchor: None,
        }
    }

    pub fn current(&self) -> Option<usize> {
        self.order.get(self.step).copied()
    }

    pub fn is_second_round(&self) -> bool {
        self.step >= self.players
    }

    /// Moves to the next step and returns its player, or `None` once both
    /// rounds are done.
    pub fn advance(&mut self) -> Option<usize> {
        self.step += 1;
        self.anchor = None;
        self.current()
    }
}
