#![allow(dead_code)]

use hexarbiter::board::CornerId;
use hexarbiter::game::validator;
use hexarbiter::{BuildingKind, GameConfig, GameState, MatchPhase, Request, Resource};

pub fn config(num_players: usize) -> GameConfig {
    GameConfig {
        num_players,
        seed: Some(11),
        cheats_enabled: true,
        ..GameConfig::default()
    }
}

pub fn say(state: &mut GameState, player: usize, text: &str) {
    state
        .step(
            player,
            Request::ChatMessage {
                text: text.to_string(),
            },
        )
        .unwrap();
}

/// Rolls fixed dice for `player`.
pub fn roll(state: &mut GameState, player: usize, a: u8, b: u8) {
    say(state, player, &format!("#dice {a} {b}"));
    state.step(player, Request::RollDice).unwrap();
}

pub fn give(state: &mut GameState, player: usize, resource: Resource, amount: u8) {
    say(state, player, &format!("#give {resource} {amount}"));
}

/// Lets player 0 win the beginner roll.
pub fn choose_beginner(state: &mut GameState) {
    for player in 0..state.players().len() {
        let die = if player == 0 { 6 } else { 1 };
        roll(state, player, die, die);
    }
    assert_eq!(state.phase(), MatchPhase::FreeBuild);
}

pub fn first_legal_corner(state: &GameState, player: usize) -> CornerId {
    state
        .board()
        .corners()
        .iter()
        .map(|corner| corner.id)
        .find(|corner| {
            validator::check_settlement(state.board(), &state.players()[player], *corner, false)
                .is_ok()
        })
        .unwrap()
}

pub fn place_setup(state: &mut GameState, player: usize, corner: CornerId) {
    state
        .step(
            player,
            Request::Build {
                kind: BuildingKind::Settlement,
                position: corner,
            },
        )
        .unwrap();
    let edge = state.board().corner(corner).unwrap().edges[0];
    state
        .step(
            player,
            Request::Build {
                kind: BuildingKind::Road,
                position: edge,
            },
        )
        .unwrap();
}

/// Runs both setup rounds. `pick` may name a corner for a player's step;
/// otherwise the first legal corner is taken.
pub fn run_setup(
    state: &mut GameState,
    mut pick: impl FnMut(&GameState, usize) -> Option<CornerId>,
) {
    while state.phase() == MatchPhase::FreeBuild {
        let player = state.current_player();
        let corner = pick(state, player).unwrap_or_else(|| first_legal_corner(state, player));
        place_setup(state, player, corner);
    }
}

/// A match past setup with player 0 about to roll.
pub fn started(num_players: usize) -> GameState {
    let mut state = GameState::new(config(num_players)).unwrap();
    choose_beginner(&mut state);
    run_setup(&mut state, |_, _| None);
    state
}

/// A match past setup where player 0 has rolled a quiet 8.
pub fn building(num_players: usize) -> GameState {
    let mut state = started(num_players);
    roll(&mut state, 0, 4, 4);
    state
}

pub fn total_resources(state: &GameState) -> u32 {
    state.bank().resources().total()
        + state
            .players()
            .iter()
            .map(|player| player.hand_size())
            .sum::<u32>()
}
