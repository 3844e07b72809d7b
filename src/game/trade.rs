//! Player-to-player trading. An offer only announces intent; resources move
//! once, atomically, when the offering player settles with an acceptor.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::error::GameError;
use crate::game::players::PlayerState;
use crate::game::resources::ResourceBundle;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub id: Uuid,
    pub offerer: usize,
    pub supply: ResourceBundle,
    pub demand: ResourceBundle,
    pub accepted: BTreeSet<usize>,
    pub declined: BTreeSet<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Accepted,
    Declined,
    /// The last undecided player declined; the trade is gone.
    DeclinedByAll(Trade),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Withdrawal {
    Cancelled(Trade),
    AcceptanceWithdrawn,
}

/// Holds the single trade that may be open game-wide.
#[derive(Debug, Clone, Default)]
pub struct TradeNegotiator {
    active: Option<Trade>,
}

impl TradeNegotiator {
    pub fn active(&self) -> Option<&Trade> {
        self.active.as_ref()
    }

    pub fn open(
        &mut self,
        offerer: &PlayerState,
        supply: ResourceBundle,
        demand: ResourceBundle,
    ) -> Result<&Trade, GameError> {
        if self.active.is_some() {
            return Err(GameError::TradeAlreadyOpen);
        }
        if supply.is_empty() || demand.is_empty() {
            return Err(GameError::InvalidTrade(
                "supply and demand must both be non-empty",
            ));
        }
        if !supply.is_disjoint(&demand) {
            return Err(GameError::InvalidTrade(
                "supply and demand must name different resources",
            ));
        }
        if !offerer.resources.can_afford(&supply) {
            return Err(GameError::InsufficientResources);
        }
        Ok(self.active.insert(Trade {
            id: Uuid::new_v4(),
            offerer: offerer.index,
            supply,
            demand,
            accepted: BTreeSet::new(),
            declined: BTreeSet::new(),
        }))
    }

    pub fn respond(
        &mut self,
        trade_id: Uuid,
        responder: &PlayerState,
        accept: bool,
        num_players: usize,
    ) -> Result<Response, GameError> {
        let trade = self.lookup_mut(trade_id)?;
        if responder.index == trade.offerer {
            return Err(GameError::InvalidTrade("cannot answer your own offer"));
        }
        if accept {
            if !responder.resources.can_afford(&trade.demand) {
                return Err(GameError::InsufficientResources);
            }
            trade.declined.remove(&responder.index);
            trade.accepted.insert(responder.index);
            return Ok(Response::Accepted);
        }
        trade.accepted.remove(&responder.index);
        trade.declined.insert(responder.index);
        if trade.declined.len() + 1 >= num_players {
            return Ok(self
                .active
                .take()
                .map(Response::DeclinedByAll)
                .unwrap_or(Response::Declined));
        }
        Ok(Response::Declined)
    }

    /// The offerer cancels for everyone; anyone else only takes back their
    /// own acceptance.
    pub fn withdraw(&mut self, trade_id: Uuid, actor: usize) -> Result<Withdrawal, GameError> {
        let trade = self.lookup_mut(trade_id)?;
        if actor != trade.offerer {
            trade.accepted.remove(&actor);
            return Ok(Withdrawal::AcceptanceWithdrawn);
        }
        self.active
            .take()
            .map(Withdrawal::Cancelled)
            .ok_or(GameError::UnknownTrade(trade_id))
    }

    /// Swaps supply and demand between the offerer and `partner`.
    pub fn settle(
        &mut self,
        trade_id: Uuid,
        actor: usize,
        partner: usize,
        players: &mut [PlayerState],
    ) -> Result<Trade, GameError> {
        let trade = self.lookup_mut(trade_id)?;
        if actor != trade.offerer {
            return Err(GameError::InvalidTrade(
                "only the offering player can finish the trade",
            ));
        }
        if !trade.accepted.contains(&partner) || trade.declined.contains(&partner) {
            return Err(GameError::InvalidTrade("partner has not accepted"));
        }
        let (supply, demand, offerer) = (trade.supply, trade.demand, trade.offerer);
        let partner_holds = players
            .get(partner)
            .is_some_and(|p| p.resources.can_afford(&demand));
        let offerer_holds = players
            .get(offerer)
            .is_some_and(|p| p.resources.can_afford(&supply));
        if !partner_holds || !offerer_holds {
            return Err(GameError::InsufficientResources);
        }
        players[offerer]
            .remove_resources(&supply)
            .map_err(|_| GameError::InsufficientResources)?;
        players[partner]
            .remove_resources(&demand)
            .map_err(|_| GameError::InsufficientResources)?;
        players[offerer].add_resources(&demand);
        players[partner].add_resources(&supply);
        self.active.take().ok_or(GameError::UnknownTrade(trade_id))
    }

    pub fn clear(&mut self) -> Option<Trade> {
        self.active.take()
    }

    fn lookup_mut(&mut self, trade_id: Uuid) -> Result<&mut Trade, GameError> {
        self.active
            .as_mut()
            .filter(|trade| trade.id == trade_id)
            .ok_or(GameError::UnknownTrade(trade_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Color, Resource};

    fn players() -> Vec<PlayerState> {
        let mut players: Vec<PlayerState> = (0..3)
            .map(|i| PlayerState::new(i, Color::ORDERED[i]))
            .collect();
        players[0].resources = ResourceBundle::single(Resource::Brick, 2);
        players[1].resources = ResourceBundle::single(Resource::Wheat, 1);
        players[2].resources = ResourceBundle::single(Resource::Wheat, 3);
        players
    }

    fn brick_for_wheat() -> (ResourceBundle, ResourceBundle) {
        (
            ResourceBundle::single(Resource::Brick, 2),
            ResourceBundle::single(Resource::Wheat, 1),
        )
    }

    #[test]
    fn settle_swaps_atomically() {
        let mut players = players();
        let mut negotiator = TradeNegotiator::default();
        let (supply, demand) = brick_for_wheat();
        let id = negotiator.open(&players[0], supply, demand).unwrap().id;
        assert_eq!(
            negotiator.respond(id, &players[2], true, 3).unwrap(),
            Response::Accepted
        );
        assert!(negotiator.settle(id, 0, 1, &mut players).is_err());
        let trade = negotiator.settle(id, 0, 2, &mut players).unwrap();
        assert_eq!(trade.offerer, 0);
        assert_eq!(players[0].resources, ResourceBundle::single(Resource::Wheat, 1));
        assert_eq!(players[2].resources.get(Resource::Brick), 2);
        assert_eq!(players[2].resources.get(Resource::Wheat), 2);
        assert!(negotiator.active().is_none());
    }

    #[test]
    fn only_one_trade_at_a_time() {
        let players = players();
        let mut negotiator = TradeNegotiator::default();
        let (supply, demand) = brick_for_wheat();
        negotiator.open(&players[0], supply, demand).unwrap();
        assert_eq!(
            negotiator.open(&players[0], supply, demand).unwrap_err(),
            GameError::TradeAlreadyOpen
        );
    }

    #[test]
    fn offer_validation() {
        let players = players();
        let mut negotiator = TradeNegotiator::default();
        let brick = ResourceBundle::single(Resource::Brick, 1);
        assert!(negotiator.open(&players[0], brick, ResourceBundle::zero()).is_err());
        assert!(negotiator.open(&players[0], brick, brick).is_err());
        let too_much = ResourceBundle::single(Resource::Brick, 3);
        assert_eq!(
            negotiator
                .open(&players[0], too_much, ResourceBundle::single(Resource::Ore, 1))
                .unwrap_err(),
            GameError::InsufficientResources
        );
    }

    #[test]
    fn everyone_declining_cancels() {
        let players = players();
        let mut negotiator = TradeNegotiator::default();
        let (supply, demand) = brick_for_wheat();
        let id = negotiator.open(&players[0], supply, demand).unwrap().id;
        assert_eq!(
            negotiator.respond(id, &players[1], false, 3).unwrap(),
            Response::Declined
        );
        assert!(matches!(
            negotiator.respond(id, &players[2], false, 3).unwrap(),
            Response::DeclinedByAll(_)
        ));
        assert!(negotiator.active().is_none());
    }

    #[test]
    fn non_offerer_withdraw_keeps_trade_open() {
        let mut players = players();
        let mut negotiator = TradeNegotiator::default();
        let (supply, demand) = brick_for_wheat();
        let id = negotiator.open(&players[0], supply, demand).unwrap().id;
        negotiator.respond(id, &players[1], true, 3).unwrap();
        assert_eq!(
            negotiator.withdraw(id, 1).unwrap(),
            Withdrawal::AcceptanceWithdrawn
        );
        assert!(negotiator.active().is_some());
        assert!(negotiator.settle(id, 0, 1, &mut players).is_err());
        assert!(matches!(
            negotiator.withdraw(id, 0).unwrap(),
            Withdrawal::Cancelled(_)
        ));
        assert!(negotiator.active().is_none());
    }

    #[test]
    fn accepting_requires_the_demand() {
        let mut players = players();
        players[1].resources = ResourceBundle::zero();
        let mut negotiator = TradeNegotiator::default();
        let (supply, demand) = brick_for_wheat();
        let id = negotiator.open(&players[0], supply, demand).unwrap().id;
        assert_eq!(
            negotiator.respond(id, &players[1], true, 3).unwrap_err(),
            GameError::InsufficientResources
        );
        let stale = Uuid::new_v4();
        assert_eq!(
            negotiator.respond(stale, &players[2], true, 3).unwrap_err(),
            GameError::UnknownTrade(stale)
        );
    }
}
