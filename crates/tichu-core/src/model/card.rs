use crate::model::rank::Rank;
use crate::model::suit::Suit;
use core::fmt;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub const fn new(rank: Rank, suit: Suit) -> Self {
        Self { rank, suit }
    }

    pub const DOG: Card = Card::new(Rank::Dog, Suit::Special);
    pub const MAH_JONG: Card = Card::new(Rank::MahJong, Suit::Special);
    pub const DRAGON: Card = Card::new(Rank::Dragon, Suit::Special);
    pub const PHOENIX: Card = Card::new(Rank::Phoenix, Suit::Special);

    pub const fn is_special(self) -> bool {
        self.rank.is_special()
    }

    pub const fn is_phoenix(self) -> bool {
        matches!(self.rank, Rank::Phoenix)
    }

    pub const fn points(self) -> i8 {
        self.rank.points()
    }

    /// True when rank and suit agree: special ranks carry the special suit,
    /// numeric ranks one of the four colors.
    pub const fn is_valid(self) -> bool {
        self.rank.is_special() == self.suit.is_special()
    }

    /// Compact 0..=55 encoding: the four specials first, then the numeric
    /// ranks in ascending order, four suits each.
    pub const fn to_id(self) -> u8 {
        match self.rank {
            Rank::Dog => 0,
            Rank::MahJong => 1,
            Rank::Dragon => 2,
            Rank::Phoenix => 3,
            rank => 4 + (rank as u8 - 2) * 4 + (self.suit as u8 - 1),
        }
    }

    pub const fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Card::DOG),
            1 => Some(Card::MAH_JONG),
            2 => Some(Card::DRAGON),
            3 => Some(Card::PHOENIX),
            4..=55 => {
                let rank = match Rank::from_value((id - 4) / 4 + 2) {
                    Some(rank) => rank,
                    None => return None,
                };
                let suit = match Suit::from_index(((id - 4) % 4 + 1) as usize) {
                    Some(suit) => suit,
                    None => return None,
                };
                Some(Card::new(rank, suit))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_special() {
            write!(f, "{}", self.rank)
        } else {
            write!(f, "{}{}", self.suit, self.rank)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Card, Rank, Suit};

    #[test]
    fn id_roundtrip_covers_all_56_cards() {
        for id in 0..56u8 {
            let card = Card::from_id(id).expect("valid card id");
            assert!(card.is_valid());
            assert_eq!(card.to_id(), id);
        }
        assert_eq!(Card::from_id(56), None);
    }

    #[test]
    fn specials_carry_special_suit() {
        assert!(Card::DRAGON.is_special());
        assert!(Card::PHOENIX.is_phoenix());
        assert!(!Card::new(Rank::Two, Suit::Star).is_special());
    }

    #[test]
    fn invalid_pairings_are_detected() {
        assert!(!Card::new(Rank::Dragon, Suit::Star).is_valid());
        assert!(!Card::new(Rank::Two, Suit::Special).is_valid());
    }

    #[test]
    fn display_prefixes_color() {
        assert_eq!(Card::new(Rank::King, Suit::Star).to_string(), "RK");
        assert_eq!(Card::DRAGON.to_string(), "Dr");
    }

    #[test]
    fn card_points_sum_to_one_hundred() {
        let total: i32 = (0..56u8)
            .map(|id| Card::from_id(id).unwrap().points() as i32)
            .sum();
        assert_eq!(total, 100);
    }
}
