//! The multiset of cards hidden from the observer.

use crate::model::card::Card;
use crate::model::rank::Rank;
use crate::model::suit::Suit;
use std::fmt;

/// Cards not yet seen by the observer: everybody else's hands plus the
/// undealt rest, with own hand and played cards excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnseenPool {
    present: [bool; 56],
    len: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    DuplicateCard(Card),
    InvalidCard(Card),
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::DuplicateCard(card) => write!(f, "duplicate card {card} in pool"),
            PoolError::InvalidCard(card) => write!(f, "invalid card {card} in pool"),
        }
    }
}

impl std::error::Error for PoolError {}

impl UnseenPool {
    pub fn from_cards(cards: &[Card]) -> Result<Self, PoolError> {
        let mut present = [false; 56];
        let mut len = 0;
        for &card in cards {
            if !card.is_valid() {
                return Err(PoolError::InvalidCard(card));
            }
            let id = card.to_id() as usize;
            if present[id] {
                return Err(PoolError::DuplicateCard(card));
            }
            present[id] = true;
            len += 1;
        }
        Ok(Self { present, len })
    }

    pub fn full_deck() -> Self {
        Self {
            present: [true; 56],
            len: 56,
        }
    }

    /// The full deck minus every card the observer has seen: own hand plus
    /// all played cards.
    pub fn excluding(seen: &[Card]) -> Result<Self, PoolError> {
        let mut pool = Self::full_deck();
        for &card in seen {
            if !card.is_valid() {
                return Err(PoolError::InvalidCard(card));
            }
            let id = card.to_id() as usize;
            if !pool.present[id] {
                return Err(PoolError::DuplicateCard(card));
            }
            pool.present[id] = false;
            pool.len -= 1;
        }
        Ok(pool)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contains(&self, card: Card) -> bool {
        self.present[card.to_id() as usize]
    }

    /// Unseen cards at a rank code, 0..=4 (0..=1 for the specials).
    pub fn rank_avail(&self, rank_value: u8) -> u8 {
        let Some(rank) = Rank::from_value(rank_value) else {
            return 0;
        };
        if rank.is_special() {
            let card = match rank {
                Rank::Dog => Card::DOG,
                Rank::MahJong => Card::MAH_JONG,
                Rank::Dragon => Card::DRAGON,
                _ => Card::PHOENIX,
            };
            return self.contains(card) as u8;
        }
        Suit::COLORS
            .iter()
            .filter(|&&suit| self.contains(Card::new(rank, suit)))
            .count() as u8
    }

    pub fn has_phoenix(&self) -> bool {
        self.contains(Card::PHOENIX)
    }

    /// Presence of each numeric rank of `suit`, indexed by rank value.
    pub(crate) fn suit_presence(&self, suit: Suit) -> [bool; 15] {
        let mut presence = [false; 15];
        for rank in Rank::NUMERIC {
            presence[rank.value() as usize] = self.contains(Card::new(rank, suit));
        }
        presence
    }

    pub fn cards(&self) -> Vec<Card> {
        (0..56u8)
            .filter(|&id| self.present[id as usize])
            .map(|id| Card::from_id(id).expect("valid card id"))
            .collect()
    }
}

impl Default for UnseenPool {
    fn default() -> Self {
        Self::full_deck()
    }
}
