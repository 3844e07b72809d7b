//! Operator commands typed into chat. They skip rule validation entirely and
//! exist for testing and demos.

use std::str::FromStr;

use crate::board::HexId;
use crate::game::error::GameError;
use crate::types::{DevelopmentCard, Resource};

pub const COMMAND_PREFIX: char = '#';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cheat {
    /// Grant resources from the bank, as many as it still holds.
    Give { resource: Resource, amount: u8 },
    Win,
    /// The leading other player wins.
    Lose,
    Robber(HexId),
    /// Pull a specific card out of the deck, playable immediately.
    DevCard(DevelopmentCard),
    /// Fix the next dice roll.
    Dice(u8, u8),
}

impl Cheat {
    pub fn is_command(text: &str) -> bool {
        text.trim_start().starts_with(COMMAND_PREFIX)
    }
}

impl FromStr for Cheat {
    type Err = GameError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let unknown = || GameError::UnknownCommand(text.trim().to_string());
        let body = text
            .trim()
            .strip_prefix(COMMAND_PREFIX)
            .ok_or_else(unknown)?;
        let mut words = body.split_whitespace();
        let command = words.next().ok_or_else(unknown)?.to_ascii_lowercase();
        let args: Vec<&str> = words.collect();

        let cheat = match (command.as_str(), args.as_slice()) {
            ("give", [resource, amount]) => Cheat::Give {
                resource: resource
                    .parse()
                    .map_err(|_| GameError::InvalidParameters("unknown resource"))?,
                amount: amount
                    .parse()
                    .map_err(|_| GameError::InvalidParameters("amount must be 0-255"))?,
            },
            ("win", []) => Cheat::Win,
            ("lose", []) => Cheat::Lose,
            ("robber", [hex]) => Cheat::Robber(
                hex.parse()
                    .map_err(|_| GameError::InvalidParameters("hex must be a number"))?,
            ),
            ("devcard", [card]) => Cheat::DevCard(
                card.parse()
                    .map_err(|_| GameError::InvalidParameters("unknown development card"))?,
            ),
            ("dice", [a, b]) => {
                let die = |raw: &str| {
                    raw.parse::<u8>()
                        .ok()
                        .filter(|v| (1..=6).contains(v))
                        .ok_or(GameError::InvalidParameters("dice values must be 1-6"))
                };
                Cheat::Dice(die(*a)?, die(*b)?)
            }
            _ => return Err(unknown()),
        };
        Ok(cheat)
    }
}
