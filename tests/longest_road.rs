//! Longest Road as the engine awards it: claimed by the fifth connected road,
//! lost when an opponent settles inside the road, and kept on a tie.

mod common;

use hexarbiter::board::{Board, CornerId, EdgeId};
use hexarbiter::game::{Dispatch, validator};
use hexarbiter::{BuildingKind, GameEvent, GameState, MatchPhase, Request, Resource};
use pretty_assertions::assert_eq;

use common::{choose_beginner, config, give, roll};

/// Corners and edges picked on the empty board before setup.
struct Layout {
    /// Player 0's first settlement; the road starts here.
    start: CornerId,
    /// Five edges in a simple chain; the first one is the setup road.
    path: Vec<EdgeId>,
    corners: Vec<CornerId>,
    /// Middle corner of the chain that player 1 will settle on.
    split: CornerId,
    /// The free edge into `split`.
    access: EdgeId,
    /// Player 1's first settlement and its setup road, which ends next to
    /// `split`.
    rival: CornerId,
    rival_road: EdgeId,
}

fn other_end(board: &Board, edge: EdgeId, from: CornerId) -> CornerId {
    board.edge(edge).unwrap().other_end(from).unwrap()
}

/// A simple chain of `len` free edges from `start` that never enters a
/// corner rejected by `avoid`.
fn plan_path(
    board: &Board,
    start: CornerId,
    len: usize,
    avoid: &dyn Fn(CornerId) -> bool,
) -> Option<Vec<EdgeId>> {
    fn search(
        board: &Board,
        at: CornerId,
        len: usize,
        avoid: &dyn Fn(CornerId) -> bool,
        seen: &mut Vec<CornerId>,
        path: &mut Vec<EdgeId>,
    ) -> bool {
        if path.len() == len {
            return true;
        }
        for &edge in &board.corner(at).unwrap().edges {
            if board.road_at(edge).is_some() {
                continue;
            }
            let next = other_end(board, edge, at);
            if seen.contains(&next) || avoid(next) {
                continue;
            }
            seen.push(next);
            path.push(edge);
            if search(board, next, len, avoid, seen, path) {
                return true;
            }
            seen.pop();
            path.pop();
        }
        false
    }
    let mut path = Vec::new();
    search(board, start, len, avoid, &mut vec![start], &mut path).then_some(path)
}

fn plan_layout(board: &Board) -> Layout {
    board
        .corners()
        .iter()
        .find_map(|corner| {
            let path = plan_path(board, corner.id, 5, &|_| false)?;
            let mut corners = vec![corner.id];
            for edge in &path {
                let last = *corners.last().unwrap();
                corners.push(other_end(board, *edge, last));
            }
            let split = corners[2];
            let access = board
                .corner(split)
                .unwrap()
                .edges
                .iter()
                .copied()
                .find(|edge| !path.contains(edge))?;
            let outpost = other_end(board, access, split);
            let rival_road = board
                .corner(outpost)
                .unwrap()
                .edges
                .iter()
                .copied()
                .find(|edge| *edge != access)?;
            Some(Layout {
                start: corner.id,
                rival: other_end(board, rival_road, outpost),
                path,
                corners,
                split,
                access,
                rival_road,
            })
        })
        .expect("the board has room for a five-road chain")
}

fn settle(state: &mut GameState, player: usize, corner: CornerId, road: EdgeId) {
    build(state, player, BuildingKind::Settlement, corner);
    build(state, player, BuildingKind::Road, road);
}

fn build(state: &mut GameState, player: usize, kind: BuildingKind, position: u16) -> Vec<Dispatch> {
    state
        .step(player, Request::Build { kind, position })
        .unwrap()
}

/// A legal setup corner at least two steps away from everything in
/// `reserved`, with the free edge its road will take.
fn remote_site(state: &GameState, player: usize, reserved: &[CornerId]) -> (CornerId, EdgeId) {
    let board = state.board();
    board
        .corners()
        .iter()
        .filter(|corner| {
            !reserved.contains(&corner.id)
                && corner.neighbors.iter().all(|n| !reserved.contains(n))
                && validator::check_settlement(board, &state.players()[player], corner.id, false)
                    .is_ok()
        })
        .find_map(|corner| {
            let edge = corner
                .edges
                .iter()
                .copied()
                .find(|edge| board.road_at(*edge).is_none())?;
            Some((corner.id, edge))
        })
        .expect("a remote setup corner is left")
}

fn road_changes(dispatches: &[Dispatch]) -> Vec<GameEvent> {
    dispatches
        .iter()
        .filter(|d| matches!(d.event, GameEvent::LongestRoadChanged { .. }))
        .map(|d| d.event.clone())
        .collect()
}

/// Runs setup around the planned layout and leaves player 0 in its build
/// phase with only the setup road of the chain placed.
fn prepared() -> (GameState, Layout) {
    let mut state = GameState::new(config(2)).unwrap();
    let layout = plan_layout(state.board());
    choose_beginner(&mut state);

    settle(&mut state, 0, layout.start, layout.path[0]);
    settle(&mut state, 1, layout.rival, layout.rival_road);

    let outpost = other_end(state.board(), layout.access, layout.split);
    let mut reserved = layout.corners.clone();
    reserved.extend([outpost, layout.rival]);
    for player in [1, 0] {
        let (corner, edge) = remote_site(&state, player, &reserved);
        settle(&mut state, player, corner, edge);
        reserved.extend([corner, other_end(state.board(), edge, corner)]);
    }
    assert_eq!(state.current_player(), 0);
    assert_ne!(state.phase(), MatchPhase::FreeBuild);

    roll(&mut state, 0, 4, 4);
    give(&mut state, 0, Resource::Wood, 4);
    give(&mut state, 0, Resource::Brick, 4);
    (state, layout)
}

fn complete_chain(state: &mut GameState, layout: &Layout) {
    for edge in &layout.path[1..] {
        build(state, 0, BuildingKind::Road, *edge);
    }
}

/// Ends player 0's turn and lets player 1 roll a quiet 8.
fn hand_over(state: &mut GameState) {
    state.step(0, Request::EndTurn).unwrap();
    roll(state, 1, 4, 4);
}

#[test]
fn fifth_connected_road_claims_longest_road() {
    let (mut state, layout) = prepared();
    for edge in &layout.path[1..4] {
        let dispatches = build(&mut state, 0, BuildingKind::Road, *edge);
        assert!(road_changes(&dispatches).is_empty());
    }
    assert_eq!(state.players()[0].longest_road, 4);
    assert_eq!(state.special_cards().longest_road, None);
    let points_before = state.players()[0].public_points();

    let dispatches = build(&mut state, 0, BuildingKind::Road, layout.path[4]);
    assert_eq!(
        road_changes(&dispatches),
        vec![GameEvent::LongestRoadChanged {
            previous: None,
            owner: Some(0),
            length: 5,
        }]
    );
    let player = &state.players()[0];
    assert_eq!(player.longest_road, 5);
    assert!(player.has_longest_road);
    assert_eq!(player.public_points(), points_before + 2);
    assert_eq!(state.snapshot().longest_road, Some(0));
}

#[test]
fn settlement_inside_the_road_breaks_the_claim() {
    let (mut state, layout) = prepared();
    complete_chain(&mut state, &layout);
    assert_eq!(state.special_cards().longest_road, Some(0));
    let holder_points = state.players()[0].public_points();

    hand_over(&mut state);
    give(&mut state, 1, Resource::Wood, 2);
    give(&mut state, 1, Resource::Brick, 2);
    give(&mut state, 1, Resource::Sheep, 1);
    give(&mut state, 1, Resource::Wheat, 1);
    build(&mut state, 1, BuildingKind::Road, layout.access);
    let dispatches = build(&mut state, 1, BuildingKind::Settlement, layout.split);

    assert_eq!(
        road_changes(&dispatches),
        vec![GameEvent::LongestRoadChanged {
            previous: Some(0),
            owner: None,
            length: 0,
        }]
    );
    let holder = &state.players()[0];
    assert_eq!(holder.longest_road, 3);
    assert!(!holder.has_longest_road);
    assert_eq!(holder.public_points(), holder_points - 2);
    assert_eq!(state.special_cards().longest_road, None);
}

#[test]
fn matching_length_does_not_take_the_card() {
    let (mut state, layout) = prepared();
    complete_chain(&mut state, &layout);
    assert_eq!(state.special_cards().longest_road, Some(0));

    hand_over(&mut state);
    let outpost = other_end(state.board(), layout.access, layout.split);
    let board = state.board();
    let occupied = |corner: CornerId| {
        let site = board.corner(corner).unwrap();
        site.locality.is_some() || site.edges.iter().any(|e| board.road_at(*e).is_some())
    };
    let extension = plan_path(board, outpost, 4, &|c| c == layout.rival || occupied(c))
        .or_else(|| plan_path(board, layout.rival, 4, &|c| c == outpost || occupied(c)))
        .expect("player 1 can extend its setup road by four");

    give(&mut state, 1, Resource::Wood, 4);
    give(&mut state, 1, Resource::Brick, 4);
    for edge in extension {
        let dispatches = build(&mut state, 1, BuildingKind::Road, edge);
        assert!(road_changes(&dispatches).is_empty());
    }

    assert_eq!(state.players()[1].longest_road, 5);
    assert_eq!(state.players()[0].longest_road, 5);
    assert_eq!(state.special_cards().longest_road, Some(0));
    assert!(!state.players()[1].has_longest_road);
}
