//! Longest Road and Largest Army bookkeeping.
//!
//! Road length is the longest simple path over a player's own edges, where a
//! corner holding an opponent's locality may end a path but never be passed
//! through.

use serde::{Deserialize, Serialize};

use crate::board::{Board, CornerId};
use crate::game::players::PlayerState;

pub const LONGEST_ROAD_MINIMUM: u8 = 5;
pub const LARGEST_ARMY_MINIMUM: u8 = 3;

pub fn longest_road(board: &Board, player: usize) -> u8 {
    let opponent_locality = |corner: CornerId| {
        board
            .locality_at(corner)
            .is_some_and(|locality| locality.owner() != player)
    };
    longest_path(board, player, &opponent_locality)
}

/// Longest simple edge path over `player`'s roads. `is_cut` marks corners a
/// path may end on but not continue through.
pub fn longest_path(board: &Board, player: usize, is_cut: &dyn Fn(CornerId) -> bool) -> u8 {
    let mut visited = vec![false; board.edges().len()];
    let mut best = 0;
    for edge in board.roads_of(player) {
        for start in edge.corners {
            best = best.max(walk(board, player, start, is_cut, &mut visited));
        }
    }
    best
}

fn walk(
    board: &Board,
    player: usize,
    corner: CornerId,
    is_cut: &dyn Fn(CornerId) -> bool,
    visited: &mut [bool],
) -> u8 {
    let Some(site) = board.corner(corner) else {
        return 0;
    };
    let mut best = 0;
    for &edge in &site.edges {
        let idx = edge as usize;
        if visited[idx] || board.road_at(edge) != Some(player) {
            continue;
        }
        let Some(next) = board.edge(edge).and_then(|e| e.other_end(corner)) else {
            continue;
        };
        visited[idx] = true;
        let onward = if is_cut(next) {
            0
        } else {
            walk(board, player, next, is_cut, visited)
        };
        visited[idx] = false;
        best = best.max(1 + onward);
    }
    best
}

/// Players other than `placer` whose road passes straight through `corner`,
/// i.e. who own two or more of its edges. A locality there may split them.
pub fn split_candidates(board: &Board, corner: CornerId, placer: usize) -> Vec<usize> {
    let Some(site) = board.corner(corner) else {
        return Vec::new();
    };
    let mut owners: Vec<usize> = site
        .edges
        .iter()
        .filter_map(|edge| board.road_at(*edge))
        .filter(|owner| *owner != placer)
        .collect();
    owners.sort_unstable();
    owners
        .chunk_by(|a, b| a == b)
        .filter(|run| run.len() > 1)
        .map(|run| run[0])
        .collect()
}

/// An ownership change of one of the bonus cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub previous: Option<usize>,
    pub owner: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialCards {
    pub longest_road: Option<usize>,
    pub largest_army: Option<usize>,
    sequence: u64,
}

impl SpecialCards {
    /// Recomputes road length for each of `changed` and re-runs the contest.
    pub fn refresh_longest_road(
        &mut self,
        board: &Board,
        players: &mut [PlayerState],
        changed: &[usize],
    ) -> Option<Transfer> {
        for &idx in changed {
            let length = longest_road(board, idx);
            let Some(player) = players.get_mut(idx) else {
                continue;
            };
            if length != player.longest_road {
                self.sequence += 1;
                player.longest_road = length;
                player.road_stamp = self.sequence;
            }
        }
        let scores: Vec<(u8, u64)> = players
            .iter()
            .map(|p| (p.longest_road, p.road_stamp))
            .collect();
        let winner = contest(self.longest_road, LONGEST_ROAD_MINIMUM, &scores);
        if winner == self.longest_road {
            return None;
        }
        for (idx, player) in players.iter_mut().enumerate() {
            player.has_longest_road = winner == Some(idx);
        }
        let transfer = Transfer {
            previous: self.longest_road,
            owner: winner,
        };
        self.longest_road = winner;
        Some(transfer)
    }

    /// Call after `knight_player` has played a knight.
    pub fn refresh_largest_army(
        &mut self,
        players: &mut [PlayerState],
        knight_player: usize,
    ) -> Option<Transfer> {
        self.sequence += 1;
        if let Some(player) = players.get_mut(knight_player) {
            player.army_stamp = self.sequence;
        }
        let scores: Vec<(u8, u64)> = players
            .iter()
            .map(|p| (p.knights_played, p.army_stamp))
            .collect();
        let winner = contest(self.largest_army, LARGEST_ARMY_MINIMUM, &scores);
        if winner == self.largest_army {
            return None;
        }
        for (idx, player) in players.iter_mut().enumerate() {
            player.has_largest_army = winner == Some(idx);
        }
        let transfer = Transfer {
            previous: self.largest_army,
            owner: winner,
        };
        self.largest_army = winner;
        Some(transfer)
    }
}

/// The holder keeps the card while qualified and not strictly beaten.
/// Otherwise the best qualified score wins, earlier stamp first on ties.
fn contest(holder: Option<usize>, minimum: u8, scores: &[(u8, u64)]) -> Option<usize> {
    if let Some(held) = holder.and_then(|h| scores.get(h).map(|s| (h, s.0))) {
        let (idx, score) = held;
        if score >= minimum && scores.iter().all(|(other, _)| *other <= score) {
            return Some(idx);
        }
    }
    scores
        .iter()
        .enumerate()
        .filter(|(_, (score, _))| *score >= minimum)
        .max_by(|(_, (sa, ta)), (_, (sb, tb))| sa.cmp(sb).then(tb.cmp(ta)))
        .map(|(idx, _)| idx)
}
