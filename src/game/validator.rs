//! Placement rules. Every check here is a pure read of the board and one
//! player's ledger; callers mutate only after a check has passed.

use crate::board::{Board, CornerId, EdgeId, Locality};
use crate::game::error::GameError;
use crate::game::players::PlayerState;
use crate::game::resources::{COST_CITY, COST_ROAD, COST_SETTLEMENT, ResourceBundle};
use crate::types::BuildingKind;

pub fn cost_of(kind: BuildingKind) -> ResourceBundle {
    match kind {
        BuildingKind::Road => COST_ROAD,
        BuildingKind::Settlement => COST_SETTLEMENT,
        BuildingKind::City => COST_CITY,
    }
}

pub fn check_cost(player: &PlayerState, cost: &ResourceBundle) -> Result<(), GameError> {
    if player.resources.can_afford(cost) {
        Ok(())
    } else {
        Err(GameError::InsufficientResources)
    }
}

/// `require_road` is false during the free-build setup rounds.
pub fn check_settlement(
    board: &Board,
    player: &PlayerState,
    corner: CornerId,
    require_road: bool,
) -> Result<(), GameError> {
    let site = board.corner(corner).ok_or(GameError::UnknownCorner(corner))?;
    if player.pieces_left(BuildingKind::Settlement) == 0 {
        return Err(GameError::PieceLimit(BuildingKind::Settlement));
    }
    if site.locality.is_some() {
        return Err(GameError::IllegalBuildPosition("corner already occupied"));
    }
    if site
        .neighbors
        .iter()
        .any(|neighbor| board.locality_at(*neighbor).is_some())
    {
        return Err(GameError::IllegalBuildPosition(
            "too close to another settlement",
        ));
    }
    if require_road
        && !site
            .edges
            .iter()
            .any(|edge| board.road_at(*edge) == Some(player.index))
    {
        return Err(GameError::IllegalBuildPosition(
            "settlement must touch one of your roads",
        ));
    }
    Ok(())
}

pub fn check_city(board: &Board, player: &PlayerState, corner: CornerId) -> Result<(), GameError> {
    board.corner(corner).ok_or(GameError::UnknownCorner(corner))?;
    if player.pieces_left(BuildingKind::City) == 0 {
        return Err(GameError::PieceLimit(BuildingKind::City));
    }
    match board.locality_at(corner) {
        Some(Locality::Settlement { owner }) if owner == player.index => Ok(()),
        _ => Err(GameError::IllegalBuildPosition(
            "a city must replace one of your settlements",
        )),
    }
}

/// With `anchor` set (setup), only that corner qualifies as a connection.
pub fn check_road(
    board: &Board,
    player: &PlayerState,
    edge: EdgeId,
    anchor: Option<CornerId>,
) -> Result<(), GameError> {
    let site = board.edge(edge).ok_or(GameError::UnknownEdge(edge))?;
    if player.pieces_left(BuildingKind::Road) == 0 {
        return Err(GameError::PieceLimit(BuildingKind::Road));
    }
    if site.road.is_some() {
        return Err(GameError::IllegalBuildPosition("edge already has a road"));
    }
    if let Some(anchor) = anchor {
        return if site.touches(anchor) {
            Ok(())
        } else {
            Err(GameError::IllegalBuildPosition(
                "road must touch the settlement just placed",
            ))
        };
    }
    let connected = site.corners.iter().any(|corner| {
        let owns_locality = board
            .locality_at(*corner)
            .is_some_and(|locality| locality.owner() == player.index);
        let owns_road = board
            .corner(*corner)
            .map(|c| {
                c.edges
                    .iter()
                    .any(|other| *other != edge && board.road_at(*other) == Some(player.index))
            })
            .unwrap_or(false);
        owns_locality || owns_road
    });
    if connected {
        Ok(())
    } else {
        Err(GameError::IllegalBuildPosition(
            "road must connect to your road or building",
        ))
    }
}
