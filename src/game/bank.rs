use rand::seq::SliceRandom;

use crate::game::error::GameError;
use crate::game::resources::{ResourceBundle, ResourceError};
use crate::types::{DevelopmentCard, Resource};

pub const RESOURCES_PER_TYPE: u8 = 19;

/// The shared supply. Every resource a player gains or loses passes through
/// here, and development cards only ever leave it.
#[derive(Debug, Clone)]
pub struct Bank {
    resources: ResourceBundle,
    development_deck: Vec<DevelopmentCard>,
}

impl Bank {
    pub fn standard(rng: &mut impl rand::Rng) -> Self {
        let mut deck = build_development_deck();
        deck.shuffle(rng);
        Self {
            resources: ResourceBundle::from_counts([RESOURCES_PER_TYPE; 5]),
            development_deck: deck,
        }
    }

    pub fn resources(&self) -> &ResourceBundle {
        &self.resources
    }

    pub fn receive(&mut self, bundle: &ResourceBundle) {
        self.resources.add_bundle(bundle);
    }

    pub fn dispense(&mut self, bundle: &ResourceBundle) -> Result<(), ResourceError> {
        self.resources.subtract_bundle(bundle)
    }

    pub fn draw_development_card(&mut self) -> Result<DevelopmentCard, GameError> {
        self.development_deck.pop().ok_or(GameError::OutOfCards)
    }

    /// Pulls a specific card out of the deck, if one is left.
    pub fn take_development_card(&mut self, card: DevelopmentCard) -> Option<DevelopmentCard> {
        let pos = self.development_deck.iter().position(|c| *c == card)?;
        Some(self.development_deck.remove(pos))
    }

    pub fn available(&self, resource: Resource) -> u8 {
        self.resources.get(resource)
    }

    pub fn development_deck_len(&self) -> usize {
        self.development_deck.len()
    }
}

fn build_development_deck() -> Vec<DevelopmentCard> {
    use DevelopmentCard::*;
    const DISTRIBUTION: &[(DevelopmentCard, usize)] = &[
        (Knight, 14),
        (VictoryPoint, 5),
        (RoadBuilding, 2),
        (YearOfPlenty, 2),
        (Monopoly, 2),
    ];

    let mut deck = Vec::with_capacity(25);
    for (card, count) in DISTRIBUTION {
        for _ in 0..*count {
            deck.push(*card);
        }
    }
    deck
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn bank() -> Bank {
        Bank::standard(&mut StdRng::seed_from_u64(3))
    }

    #[test]
    fn standard_bank_holds_full_supply() {
        let bank = bank();
        assert_eq!(bank.resources().total(), 95);
        assert_eq!(bank.development_deck_len(), 25);
    }

    #[test]
    fn draining_the_deck_reports_out_of_cards() {
        let mut bank = bank();
        for _ in 0..25 {
            bank.draw_development_card().unwrap();
        }
        assert_eq!(bank.draw_development_card(), Err(GameError::OutOfCards));
    }

    #[test]
    fn dispense_refuses_more_than_held() {
        let mut bank = bank();
        let too_much = ResourceBundle::single(Resource::Ore, RESOURCES_PER_TYPE + 1);
        assert!(bank.dispense(&too_much).is_err());
        assert_eq!(bank.available(Resource::Ore), RESOURCES_PER_TYPE);
    }

    #[test]
    fn take_specific_card_shrinks_deck() {
        let mut bank = bank();
        for _ in 0..2 {
            assert_eq!(
                bank.take_development_card(DevelopmentCard::Monopoly),
                Some(DevelopmentCard::Monopoly)
            );
        }
        assert_eq!(bank.take_development_card(DevelopmentCard::Monopoly), None);
        assert_eq!(bank.development_deck_len(), 23);
    }
}
