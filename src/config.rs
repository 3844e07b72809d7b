//! Match and actor configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::board::MapType;

pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 4;

/// What happens when a roll owes more of a resource than the bank holds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ShortagePolicy {
    /// Each player's claim is checked against the bank on its own, paying
    /// players in turn order from the roller.
    #[default]
    PerPlayer,
    /// Nobody receives a resource the bank cannot pay to every claimant,
    /// unless a single player claims it and takes what is left.
    Tabletop,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub num_players: usize,
    pub map_type: MapType,
    pub vps_to_win: u8,
    /// `None` draws a seed from the OS.
    pub seed: Option<u64>,
    pub shortage_policy: ShortagePolicy,
    /// Allows `#` operator commands in chat.
    pub cheats_enabled: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            num_players: 4,
            map_type: MapType::Base,
            vps_to_win: 10,
            seed: None,
            shortage_policy: ShortagePolicy::PerPlayer,
            cheats_enabled: false,
        }
    }
}

impl GameConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&self.num_players) {
            return Err(ConfigError::PlayerCount(self.num_players));
        }
        if self.vps_to_win < 3 {
            return Err(ConfigError::VictoryThreshold(self.vps_to_win));
        }
        Ok(())
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }
}

/// Settings of the match actor in [`crate::server`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Capacity of the bounded command channel.
    pub channel_size: usize,
    pub liveness_interval: Duration,
    /// A player silent for longer than this is considered gone.
    pub liveness_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            channel_size: 64,
            liveness_interval: Duration::from_secs(1),
            liveness_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("player count must be between 2 and 4, got {0}")]
    PlayerCount(usize),
    #[error("victory threshold must be at least 3, got {0}")]
    VictoryThreshold(u8),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = GameConfig::default();
        assert_eq!(config.num_players, 4);
        assert_eq!(config.vps_to_win, 10);
        assert_eq!(config.shortage_policy, ShortagePolicy::PerPlayer);
        assert!(!config.cheats_enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config = GameConfig::from_json_str(
            r#"{"num_players": 3, "map_type": "Mini", "shortage_policy": "tabletop"}"#,
        )
        .unwrap();
        assert_eq!(config.num_players, 3);
        assert_eq!(config.map_type, MapType::Mini);
        assert_eq!(config.shortage_policy, ShortagePolicy::Tabletop);
        assert_eq!(config.vps_to_win, 10);
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(matches!(
            GameConfig::from_json_str(r#"{"num_players": 6}"#),
            Err(ConfigError::PlayerCount(6))
        ));
        assert!(matches!(
            GameConfig::from_json_str(r#"{"vps_to_win": 1}"#),
            Err(ConfigError::VictoryThreshold(1))
        ));
        assert!(matches!(
            GameConfig::from_json_str("not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn shortage_policy_parses_from_text() {
        assert_eq!(
            "Tabletop".parse::<ShortagePolicy>().unwrap(),
            ShortagePolicy::Tabletop
        );
        assert_eq!(ShortagePolicy::PerPlayer.to_string(), "per_player");
    }
}
