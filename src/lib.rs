#![warn(clippy::all)]
#![deny(rust_2018_idioms)]

pub mod board;
pub mod config;
pub mod coords;
pub mod game;
pub mod server;
pub mod types;

pub use board::{Board, MapType};
pub use config::{GameConfig, ServerConfig, ShortagePolicy};
pub use game::{Dispatch, GameError, GameEvent, GameState, Recipient, Request};
pub use server::{MatchHandle, ServerError, spawn_match};
pub use types::{BuildingKind, Color, DevelopmentCard, MatchPhase, PlayerPhase, Resource};
