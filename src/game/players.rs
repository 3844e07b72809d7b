use serde::{Deserialize, Serialize};

use crate::board::Harbor;
use crate::game::error::GameError;
use crate::game::resources::{ResourceBundle, ResourceError};
use crate::types::{BuildingKind, Color, DevelopmentCard, PlayerPhase, Resource};

pub const MAX_ROADS: u8 = 15;
pub const MAX_SETTLEMENTS: u8 = 5;
pub const MAX_CITIES: u8 = 4;
pub const DEFAULT_TRADE_RATIO: u8 = 4;

/// A development card in hand, stamped with the turn it was bought.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeldCard {
    pub card: DevelopmentCard,
    pub acquired_turn: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerState {
    pub index: usize,
    pub color: Color,
    pub phase: PlayerPhase,
    pub resources: ResourceBundle,
    pub roads: u8,
    pub settlements: u8,
    pub cities: u8,
    pub hand: Vec<HeldCard>,
    pub trade_ratios: [u8; Resource::ALL.len()],
    pub knights_played: u8,
    pub longest_road: u8,
    pub has_longest_road: bool,
    pub has_largest_army: bool,
    pub played_card_this_turn: bool,
    /// Sequence numbers of the moment the current road length and army size
    /// were first reached; earlier wins a tie for the bonus cards.
    pub road_stamp: u64,
    pub army_stamp: u64,
}

impl PlayerState {
    pub fn new(index: usize, color: Color) -> Self {
        Self {
            index,
            color,
            phase: PlayerPhase::SetupAwaitStart,
            resources: ResourceBundle::zero(),
            roads: 0,
            settlements: 0,
            cities: 0,
            hand: Vec::new(),
            trade_ratios: [DEFAULT_TRADE_RATIO; Resource::ALL.len()],
            knights_played: 0,
            longest_road: 0,
            has_longest_road: false,
            has_largest_army: false,
            played_card_this_turn: false,
            road_stamp: 0,
            army_stamp: 0,
        }
    }

    pub fn hand_size(&self) -> u32 {
        self.resources.total()
    }

    pub fn add_resources(&mut self, bundle: &ResourceBundle) {
        self.resources.add_bundle(bundle);
    }

    pub fn remove_resources(&mut self, bundle: &ResourceBundle) -> Result<(), ResourceError> {
        self.resources.subtract_bundle(bundle)
    }

    pub fn add_dev_card(&mut self, card: DevelopmentCard, turn: u32) {
        self.hand.push(HeldCard {
            card,
            acquired_turn: turn,
        });
    }

    /// Position in hand of a copy of `card` that may be played on `turn`.
    pub fn playable_card(&self, card: DevelopmentCard, turn: u32) -> Result<usize, GameError> {
        if self.played_card_this_turn {
            return Err(GameError::CardAlreadyPlayedThisTurn);
        }
        if !card.is_playable() {
            return Err(GameError::CardNotPlayable(card));
        }
        self.hand
            .iter()
            .position(|held| held.card == card && held.acquired_turn < turn)
            .ok_or(GameError::CardNotPlayable(card))
    }

    pub fn consume_card(&mut self, card: DevelopmentCard, turn: u32) -> Result<(), GameError> {
        let pos = self.playable_card(card, turn)?;
        self.hand.remove(pos);
        self.played_card_this_turn = true;
        if matches!(card, DevelopmentCard::Knight) {
            self.knights_played = self.knights_played.saturating_add(1);
        }
        Ok(())
    }

    pub fn ratio(&self, resource: Resource) -> u8 {
        self.trade_ratios[resource.index()]
    }

    /// Harbor ratios only ever improve.
    pub fn apply_harbor(&mut self, harbor: Harbor) {
        let ratio = harbor.ratio();
        match harbor {
            Harbor::Generic => {
                for slot in self.trade_ratios.iter_mut() {
                    *slot = (*slot).min(ratio);
                }
            }
            Harbor::Special(resource) => {
                let slot = &mut self.trade_ratios[resource.index()];
                *slot = (*slot).min(ratio);
            }
        }
    }

    pub fn pieces_left(&self, kind: BuildingKind) -> u8 {
        match kind {
            BuildingKind::Road => MAX_ROADS.saturating_sub(self.roads),
            BuildingKind::Settlement => MAX_SETTLEMENTS.saturating_sub(self.settlements),
            BuildingKind::City => MAX_CITIES.saturating_sub(self.cities),
        }
    }

    pub fn victory_point_cards(&self) -> u8 {
        self.hand
            .iter()
            .filter(|held| held.card == DevelopmentCard::VictoryPoint)
            .count() as u8
    }

    pub fn total_points(&self) -> u8 {
        self.public_points() + self.victory_point_cards()
    }

    pub fn public_points(&self) -> u8 {
        self.settlements + self.cities * 2 + self.bonus_points()
    }

    pub fn bonus_points(&self) -> u8 {
        let mut bonus = 0;
        if self.has_longest_road {
            bonus += 2;
        }
        if self.has_largest_army {
            bonus += 2;
        }
        bonus
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cards_are_not_playable_in_the_turn_bought() {
        let mut player = PlayerState::new(0, Color::Red);
        player.add_dev_card(DevelopmentCard::Knight, 4);
        assert_eq!(
            player.consume_card(DevelopmentCard::Knight, 4),
            Err(GameError::CardNotPlayable(DevelopmentCard::Knight))
        );
        player.consume_card(DevelopmentCard::Knight, 5).unwrap();
        assert_eq!(player.knights_played, 1);
        assert!(player.hand.is_empty());
    }

    #[test]
    fn one_card_per_turn() {
        let mut player = PlayerState::new(0, Color::Red);
        player.add_dev_card(DevelopmentCard::Monopoly, 0);
        player.add_dev_card(DevelopmentCard::YearOfPlenty, 0);
        player.consume_card(DevelopmentCard::Monopoly, 3).unwrap();
        assert_eq!(
            player.consume_card(DevelopmentCard::YearOfPlenty, 3),
            Err(GameError::CardAlreadyPlayedThisTurn)
        );
    }

    #[test]
    fn victory_point_cards_count_but_never_play() {
        let mut player = PlayerState::new(1, Color::Blue);
        player.settlements = 2;
        player.cities = 1;
        player.add_dev_card(DevelopmentCard::VictoryPoint, 0);
        assert_eq!(player.public_points(), 4);
        assert_eq!(player.total_points(), 5);
        assert_eq!(
            player.consume_card(DevelopmentCard::VictoryPoint, 9),
            Err(GameError::CardNotPlayable(DevelopmentCard::VictoryPoint))
        );
    }

    #[test]
    fn harbors_improve_ratios_monotonically() {
        let mut player = PlayerState::new(0, Color::Red);
        assert_eq!(player.ratio(Resource::Brick), 4);
        player.apply_harbor(Harbor::Special(Resource::Brick));
        player.apply_harbor(Harbor::Generic);
        assert_eq!(player.ratio(Resource::Brick), 2);
        assert_eq!(player.ratio(Resource::Ore), 3);
    }

    #[test]
    fn piece_limits() {
        let mut player = PlayerState::new(0, Color::Red);
        player.settlements = 5;
        player.roads = 14;
        assert_eq!(player.pieces_left(BuildingKind::Settlement), 0);
        assert_eq!(player.pieces_left(BuildingKind::Road), 1);
        assert_eq!(player.pieces_left(BuildingKind::City), 4);
    }
}
