mod common;

use hexarbiter::board::Harbor;
use hexarbiter::game::validator;
use hexarbiter::game::ResourceBundle;
use hexarbiter::{GameError, GameEvent, GameState, PlayerPhase, Request, Resource};
use pretty_assertions::assert_eq;

use common::{choose_beginner, config, give, roll, run_setup};

fn bundle(entries: &[(Resource, u8)]) -> ResourceBundle {
    entries
        .iter()
        .map(|(resource, amount)| (*resource, *amount))
        .collect()
}

/// Player 0 opens on the brick harbor.
fn brick_harbor_match() -> GameState {
    let mut state = GameState::new(config(2)).unwrap();
    choose_beginner(&mut state);
    let mut placed = false;
    run_setup(&mut state, |state, player| {
        if player != 0 || placed {
            return None;
        }
        placed = true;
        state
            .board()
            .corners()
            .iter()
            .filter(|corner| corner.harbor == Some(Harbor::Special(Resource::Brick)))
            .map(|corner| corner.id)
            .find(|corner| {
                validator::check_settlement(state.board(), &state.players()[0], *corner, false)
                    .is_ok()
            })
    });
    roll(&mut state, 0, 4, 4);
    state
}

#[test]
fn brick_harbor_trades_two_for_one() {
    let mut state = brick_harbor_match();
    assert_eq!(state.players()[0].ratio(Resource::Brick), 2);
    give(&mut state, 0, Resource::Brick, 4);
    let before = state.players()[0].resources;

    state
        .step(
            0,
            Request::SeaTrade {
                supply: bundle(&[(Resource::Brick, 2)]),
                demand: bundle(&[(Resource::Wheat, 1)]),
            },
        )
        .unwrap();
    let after = state.players()[0].resources;
    assert_eq!(after.get(Resource::Brick), before.get(Resource::Brick) - 2);
    assert_eq!(after.get(Resource::Wheat), before.get(Resource::Wheat) + 1);
    assert_eq!(common::total_resources(&state), 95);

    assert_eq!(
        state
            .step(
                0,
                Request::SeaTrade {
                    supply: bundle(&[(Resource::Brick, 1)]),
                    demand: bundle(&[(Resource::Wheat, 1)]),
                },
            )
            .unwrap_err(),
        GameError::WrongTradeRatio
    );
}

#[test]
fn without_the_harbor_two_for_one_is_refused() {
    let mut state = brick_harbor_match();
    state.step(0, Request::EndTurn).unwrap();
    roll(&mut state, 1, 4, 4);
    let ratio = state.players()[1].ratio(Resource::Brick);
    assert!(ratio > 2);
    give(&mut state, 1, Resource::Brick, 4);
    let before = state.snapshot();

    assert_eq!(
        state
            .step(
                1,
                Request::SeaTrade {
                    supply: bundle(&[(Resource::Brick, 2)]),
                    demand: bundle(&[(Resource::Wheat, 1)]),
                },
            )
            .unwrap_err(),
        GameError::WrongTradeRatio
    );
    assert_eq!(state.snapshot(), before);

    state
        .step(
            1,
            Request::SeaTrade {
                supply: bundle(&[(Resource::Brick, ratio)]),
                demand: bundle(&[(Resource::Ore, 1)]),
            },
        )
        .unwrap();
}

#[test]
fn sea_trade_needs_disjoint_sides() {
    let mut state = brick_harbor_match();
    give(&mut state, 0, Resource::Brick, 4);
    assert!(matches!(
        state.step(
            0,
            Request::SeaTrade {
                supply: bundle(&[(Resource::Brick, 2)]),
                demand: bundle(&[(Resource::Brick, 1)]),
            },
        ),
        Err(GameError::InvalidTrade(_))
    ));
}

#[test]
fn player_trade_swaps_hands() {
    let mut state = common::building(3);
    give(&mut state, 0, Resource::Brick, 1);
    give(&mut state, 2, Resource::Sheep, 1);
    let dispatches = state
        .step(
            0,
            Request::OfferTrade {
                supply: bundle(&[(Resource::Brick, 1)]),
                demand: bundle(&[(Resource::Sheep, 1)]),
            },
        )
        .unwrap();
    let trade_id = match &dispatches[0].event {
        GameEvent::TradeOffered { trade } => trade.id,
        other => panic!("unexpected event {other:?}"),
    };
    assert_eq!(
        state
            .step(
                0,
                Request::OfferTrade {
                    supply: bundle(&[(Resource::Brick, 1)]),
                    demand: bundle(&[(Resource::Wood, 1)]),
                },
            )
            .unwrap_err(),
        GameError::TradeAlreadyOpen
    );

    assert_eq!(state.players()[2].phase, PlayerPhase::Wait);
    state
        .step(
            2,
            Request::AcceptTrade {
                trade_id,
                accept: true,
            },
        )
        .unwrap();
    assert!(matches!(
        state.step(
            0,
            Request::FinishTrade {
                trade_id,
                partner: 1
            }
        ),
        Err(GameError::InvalidTrade(_))
    ));

    let brick_0 = state.players()[0].resources.get(Resource::Brick);
    let sheep_2 = state.players()[2].resources.get(Resource::Sheep);
    state
        .step(
            0,
            Request::FinishTrade {
                trade_id,
                partner: 2,
            },
        )
        .unwrap();
    assert_eq!(state.players()[0].resources.get(Resource::Brick), brick_0 - 1);
    assert_eq!(state.players()[2].resources.get(Resource::Sheep), sheep_2 - 1);
    assert!(state.active_trade().is_none());
}

#[test]
fn declines_from_everyone_cancel_the_offer() {
    let mut state = common::building(3);
    give(&mut state, 0, Resource::Ore, 1);
    state
        .step(
            0,
            Request::OfferTrade {
                supply: bundle(&[(Resource::Ore, 1)]),
                demand: bundle(&[(Resource::Wood, 1)]),
            },
        )
        .unwrap();
    let trade_id = state.active_trade().unwrap().id;
    state
        .step(
            1,
            Request::AcceptTrade {
                trade_id,
                accept: false,
            },
        )
        .unwrap();
    assert!(state.active_trade().is_some());
    let dispatches = state
        .step(
            2,
            Request::AcceptTrade {
                trade_id,
                accept: false,
            },
        )
        .unwrap();
    assert!(state.active_trade().is_none());
    assert!(
        dispatches
            .iter()
            .any(|d| d.event == GameEvent::TradeCanceled { trade_id })
    );
}

#[test]
fn only_the_current_player_offers() {
    let mut state = common::building(2);
    give(&mut state, 1, Resource::Ore, 1);
    assert_eq!(
        state
            .step(
                1,
                Request::OfferTrade {
                    supply: bundle(&[(Resource::Ore, 1)]),
                    demand: bundle(&[(Resource::Wood, 1)]),
                },
            )
            .unwrap_err(),
        GameError::NotYourTurn
    );
}
