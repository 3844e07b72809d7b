//! Rejection reasons for requests. None of these end the match; the state
//! is left exactly as it was before the request arrived.

use uuid::Uuid;

use crate::board::{CornerId, EdgeId, HexId};
use crate::types::{BuildingKind, DevelopmentCard, PlayerPhase, Resource};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("game already finished")]
    GameFinished,
    #[error("unknown player {0}")]
    UnknownPlayer(usize),
    #[error("not your turn")]
    NotYourTurn,
    #[error("{action} not allowed while {phase}")]
    WrongPhase {
        action: &'static str,
        phase: PlayerPhase,
    },
    #[error("insufficient resources")]
    InsufficientResources,
    #[error("illegal build position: corner {0} is unknown")]
    UnknownCorner(CornerId),
    #[error("illegal build position: edge {0} is unknown")]
    UnknownEdge(EdgeId),
    #[error("illegal build position: {0}")]
    IllegalBuildPosition(&'static str),
    #[error("no {0} pieces left")]
    PieceLimit(BuildingKind),
    #[error("no development cards left")]
    OutOfCards,
    #[error("card already played or not yet playable: {0}")]
    CardNotPlayable(DevelopmentCard),
    #[error("only one development card may be played per turn")]
    CardAlreadyPlayedThisTurn,
    #[error("wrong trade ratio")]
    WrongTradeRatio,
    #[error("invalid trade: {0}")]
    InvalidTrade(&'static str),
    #[error("a trade is already open")]
    TradeAlreadyOpen,
    #[error("no open trade with id {0}")]
    UnknownTrade(Uuid),
    #[error("bank has no {0} left")]
    BankDepleted(Resource),
    #[error("illegal robber move: {0}")]
    IllegalRobberMove(&'static str),
    #[error("unknown hex {0}")]
    UnknownHex(HexId),
    #[error("must discard exactly {required} cards, offered {offered}")]
    WrongDiscardCount { required: u32, offered: u32 },
    #[error("unknown operator command: {0}")]
    UnknownCommand(String),
    #[error("operator commands are disabled")]
    CheatsDisabled,
    #[error("invalid parameters: {0}")]
    InvalidParameters(&'static str),
}
