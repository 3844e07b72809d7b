use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::board::HexId;
use crate::game::resources::ResourceBundle;
use crate::types::{BuildingKind, DevelopmentCard, Resource};

/// A typed request from one participant. The actor travels alongside it,
/// see [`crate::game::GameState::step`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    RollDice,
    /// `position` is a corner id for settlements and cities, an edge id for
    /// roads.
    Build {
        kind: BuildingKind,
        position: u16,
    },
    BuyDevelopmentCard,
    PlayDevelopmentCard {
        card: CardPlay,
    },
    SeaTrade {
        supply: ResourceBundle,
        demand: ResourceBundle,
    },
    OfferTrade {
        supply: ResourceBundle,
        demand: ResourceBundle,
    },
    /// `accept: false` declines.
    AcceptTrade {
        trade_id: Uuid,
        accept: bool,
    },
    CancelTrade {
        trade_id: Uuid,
    },
    FinishTrade {
        trade_id: Uuid,
        partner: usize,
    },
    MoveRobber {
        hex: HexId,
        target: Option<usize>,
    },
    DiscardResources {
        resources: ResourceBundle,
    },
    EndTurn,
    ChatMessage {
        text: String,
    },
}

impl Request {
    pub fn name(&self) -> &'static str {
        match self {
            Request::RollDice => "roll dice",
            Request::Build { .. } => "build",
            Request::BuyDevelopmentCard => "buy development card",
            Request::PlayDevelopmentCard { .. } => "play development card",
            Request::SeaTrade { .. } => "sea trade",
            Request::OfferTrade { .. } => "offer trade",
            Request::AcceptTrade { .. } => "answer trade",
            Request::CancelTrade { .. } => "cancel trade",
            Request::FinishTrade { .. } => "finish trade",
            Request::MoveRobber { .. } => "move robber",
            Request::DiscardResources { .. } => "discard",
            Request::EndTurn => "end turn",
            Request::ChatMessage { .. } => "chat",
        }
    }

    /// Requests accepted no matter whose turn it is.
    pub fn ignores_turn(&self) -> bool {
        matches!(
            self,
            Request::ChatMessage { .. }
                | Request::AcceptTrade { .. }
                | Request::CancelTrade { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "card", rename_all = "snake_case")]
pub enum CardPlay {
    /// Followed by a `MoveRobber` request.
    Knight,
    RoadBuilding,
    YearOfPlenty {
        first: Resource,
        second: Option<Resource>,
    },
    Monopoly {
        resource: Resource,
    },
}

impl CardPlay {
    pub fn card(self) -> DevelopmentCard {
        match self {
            CardPlay::Knight => DevelopmentCard::Knight,
            CardPlay::RoadBuilding => DevelopmentCard::RoadBuilding,
            CardPlay::YearOfPlenty { .. } => DevelopmentCard::YearOfPlenty,
            CardPlay::Monopoly { .. } => DevelopmentCard::Monopoly,
        }
    }
}
