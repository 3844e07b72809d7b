//! Outbound events and their addressing.
//!
//! Resource movements and development-card purchases are private: the owner
//! receives the exact cards, everybody else only a count.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::board::{CornerId, EdgeId, HexId};
use crate::game::players::PlayerState;
use crate::game::resources::ResourceBundle;
use crate::game::trade::Trade;
use crate::types::{Color, DevelopmentCard, MatchPhase, PlayerPhase};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    All,
    Player(usize),
    AllExcept(usize),
}

impl Recipient {
    pub fn includes(self, player: usize) -> bool {
        match self {
            Recipient::All => true,
            Recipient::Player(target) => target == player,
            Recipient::AllExcept(excluded) => excluded != player,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispatch {
    pub recipient: Recipient,
    pub event: GameEvent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceDelta {
    Exact(ResourceBundle),
    Hidden { count: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Construction {
    Road(EdgeId),
    Settlement(CornerId),
    City(CornerId),
}

/// What every participant may know about a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    pub index: usize,
    pub color: Color,
    pub phase: PlayerPhase,
    pub public_points: u8,
    pub resource_count: u32,
    pub development_cards: usize,
    pub roads: u8,
    pub settlements: u8,
    pub cities: u8,
    pub knights_played: u8,
    pub longest_road: u8,
    pub has_longest_road: bool,
    pub has_largest_army: bool,
}

impl From<&PlayerState> for PlayerView {
    fn from(player: &PlayerState) -> Self {
        Self {
            index: player.index,
            color: player.color,
            phase: player.phase,
            public_points: player.public_points(),
            resource_count: player.hand_size(),
            development_cards: player.hand.len(),
            roads: player.roads,
            settlements: player.settlements,
            cities: player.cities,
            knights_played: player.knights_played,
            longest_road: player.longest_road,
            has_longest_road: player.has_longest_road,
            has_largest_army: player.has_largest_army,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    StateUpdate {
        player: PlayerView,
    },
    MatchPhaseChanged {
        phase: MatchPhase,
    },
    DiceRolled {
        player: usize,
        dice: (u8, u8),
        sum: u8,
    },
    Built {
        player: usize,
        construction: Construction,
    },
    ResourceGain {
        player: usize,
        delta: ResourceDelta,
    },
    ResourceLoss {
        player: usize,
        delta: ResourceDelta,
    },
    RobberMoved {
        player: usize,
        hex: HexId,
        victim: Option<usize>,
    },
    DevelopmentCardBought {
        player: usize,
        card: Option<DevelopmentCard>,
    },
    DevelopmentCardPlayed {
        player: usize,
        card: DevelopmentCard,
    },
    LongestRoadChanged {
        previous: Option<usize>,
        owner: Option<usize>,
        length: u8,
    },
    LargestArmyChanged {
        previous: Option<usize>,
        owner: Option<usize>,
        knights: u8,
    },
    TradeOffered {
        trade: Trade,
    },
    TradeAccepted {
        trade_id: Uuid,
        player: usize,
        accepted: bool,
    },
    TradeCanceled {
        trade_id: Uuid,
    },
    TradeExecuted {
        trade_id: Uuid,
        offerer: usize,
        partner: usize,
        supply: ResourceBundle,
        demand: ResourceBundle,
    },
    Chat {
        player: usize,
        text: String,
    },
    GameFinished {
        winner: Option<usize>,
    },
}

/// Collects the dispatches produced while one request is applied.
#[derive(Debug, Default)]
pub struct Outbox {
    items: Vec<Dispatch>,
}

impl Outbox {
    pub fn broadcast(&mut self, event: GameEvent) {
        self.items.push(Dispatch {
            recipient: Recipient::All,
            event,
        });
    }

    pub fn send(&mut self, recipient: Recipient, event: GameEvent) {
        self.items.push(Dispatch { recipient, event });
    }

    pub fn resource_gain(&mut self, player: usize, bundle: ResourceBundle) {
        if bundle.is_empty() {
            return;
        }
        self.split(player, bundle, |player, delta| GameEvent::ResourceGain {
            player,
            delta,
        });
    }

    pub fn resource_loss(&mut self, player: usize, bundle: ResourceBundle) {
        if bundle.is_empty() {
            return;
        }
        self.split(player, bundle, |player, delta| GameEvent::ResourceLoss {
            player,
            delta,
        });
    }

    pub fn state_update(&mut self, player: &PlayerState) {
        self.broadcast(GameEvent::StateUpdate {
            player: PlayerView::from(player),
        });
    }

    pub fn into_vec(self) -> Vec<Dispatch> {
        self.items
    }

    fn split(
        &mut self,
        player: usize,
        bundle: ResourceBundle,
        make: impl Fn(usize, ResourceDelta) -> GameEvent,
    ) {
        self.send(
            Recipient::Player(player),
            make(player, ResourceDelta::Exact(bundle)),
        );
        self.send(
            Recipient::AllExcept(player),
            make(
                player,
                ResourceDelta::Hidden {
                    count: bundle.total(),
                },
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Resource;

    #[test]
    fn resource_movements_hide_card_types_from_others() {
        let mut outbox = Outbox::default();
        outbox.resource_gain(2, ResourceBundle::single(Resource::Ore, 2));
        outbox.resource_loss(1, ResourceBundle::zero());
        let items = outbox.into_vec();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].recipient, Recipient::Player(2));
        assert_eq!(items[1].recipient, Recipient::AllExcept(2));
        match &items[1].event {
            GameEvent::ResourceGain { player, delta } => {
                assert_eq!(*player, 2);
                assert_eq!(*delta, ResourceDelta::Hidden { count: 2 });
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn recipient_membership() {
        assert!(Recipient::All.includes(3));
        assert!(Recipient::Player(1).includes(1));
        assert!(!Recipient::Player(1).includes(0));
        assert!(!Recipient::AllExcept(1).includes(1));
        assert!(Recipient::AllExcept(1).includes(2));
    }
}
