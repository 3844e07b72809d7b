pub mod action;
pub mod arbiter;
pub mod bank;
pub mod cheats;
pub mod error;
pub mod events;
pub mod players;
pub mod resources;
pub mod setup;
pub mod state;
pub mod trade;
pub mod validator;

pub use action::{CardPlay, Request};
pub use bank::Bank;
pub use cheats::Cheat;
pub use error::GameError;
pub use events::{Construction, Dispatch, GameEvent, PlayerView, Recipient, ResourceDelta};
pub use players::{HeldCard, PlayerState};
pub use resources::{
    COST_CITY, COST_DEVELOPMENT, COST_ROAD, COST_SETTLEMENT, ResourceBundle, ResourceError,
};
pub use state::{GameState, MatchSnapshot, PendingDiscard};
pub use trade::Trade;
