use crate::model::rank::Rank;
use core::fmt;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum FigureKind {
    Pass = 0,
    Single = 1,
    Pair = 2,
    Triple = 3,
    Stair = 4,
    FullHouse = 5,
    Street = 6,
    Bomb = 7,
}

impl FigureKind {
    /// Generator emission order: the most constraining kinds come first.
    pub const fn precedence(self) -> u8 {
        self as u8
    }
}

/// A `(kind, length, rank)` triple classifying a playable set of cards.
///
/// `rank` is the comparison key within a `(kind, length)` class: the pair
/// rank, the triple rank of a full house, the top rank of a stair, street
/// or bomb run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Figure {
    pub kind: FigureKind,
    pub length: u8,
    pub rank: Rank,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FigureError {
    InvalidFigure {
        kind: FigureKind,
        length: u8,
        rank: Rank,
    },
}

impl fmt::Display for FigureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FigureError::InvalidFigure { kind, length, rank } => {
                write!(f, "invalid figure {kind:?} of length {length} at {rank}")
            }
        }
    }
}

impl std::error::Error for FigureError {}

/// Follow-order key for singles in doubled-rank units: the Phoenix slots
/// strictly between Ace and Dragon.
pub(crate) const fn single_follow_key(rank: Rank) -> u8 {
    match rank {
        Rank::Dog => 0,
        Rank::Phoenix => 29,
        rank => 2 * rank.value(),
    }
}

/// Lead key of the Phoenix single (effective rank 1.5).
pub(crate) const PHOENIX_LEAD_KEY: u8 = 3;

impl Figure {
    /// Checks the triple against the fixed combinatorial bounds.
    pub fn new(kind: FigureKind, length: u8, rank: Rank) -> Result<Self, FigureError> {
        let value = rank.value();
        let numeric = (2..=14).contains(&value);
        let valid = match kind {
            FigureKind::Pass => length == 0 && value == 0,
            FigureKind::Single => length == 1,
            FigureKind::Pair => length == 2 && numeric,
            FigureKind::Triple => length == 3 && numeric,
            FigureKind::Stair => {
                length >= 4 && length <= 14 && length % 2 == 0 && numeric && value >= length / 2 + 1
            }
            FigureKind::FullHouse => length == 5 && numeric,
            FigureKind::Street => (5..=14).contains(&length) && numeric && value >= length,
            FigureKind::Bomb => {
                (length == 4 && numeric)
                    || ((5..=13).contains(&length) && numeric && value >= length + 1)
            }
        };
        if valid {
            Ok(Self { kind, length, rank })
        } else {
            Err(FigureError::InvalidFigure { kind, length, rank })
        }
    }

    pub fn pass() -> Self {
        Self {
            kind: FigureKind::Pass,
            length: 0,
            rank: Rank::Dog,
        }
    }

    pub fn single(rank: Rank) -> Self {
        Self {
            kind: FigureKind::Single,
            length: 1,
            rank,
        }
    }

    pub fn pair(rank: Rank) -> Result<Self, FigureError> {
        Self::new(FigureKind::Pair, 2, rank)
    }

    pub fn triple(rank: Rank) -> Result<Self, FigureError> {
        Self::new(FigureKind::Triple, 3, rank)
    }

    pub fn stair(length: u8, rank: Rank) -> Result<Self, FigureError> {
        Self::new(FigureKind::Stair, length, rank)
    }

    pub fn full_house(rank: Rank) -> Result<Self, FigureError> {
        Self::new(FigureKind::FullHouse, 5, rank)
    }

    pub fn street(length: u8, rank: Rank) -> Result<Self, FigureError> {
        Self::new(FigureKind::Street, length, rank)
    }

    pub fn quad_bomb(rank: Rank) -> Result<Self, FigureError> {
        Self::new(FigureKind::Bomb, 4, rank)
    }

    pub fn color_bomb(length: u8, rank: Rank) -> Result<Self, FigureError> {
        Self::new(FigureKind::Bomb, length, rank)
    }

    pub const fn is_bomb(&self) -> bool {
        matches!(self.kind, FigureKind::Bomb)
    }

    /// Whether this figure wins a trick currently headed by `other`.
    ///
    /// Only meaningful for playable figures; the Dog never beats and is
    /// never beaten, and nothing beats a Pass.
    pub fn beats(&self, other: &Figure) -> bool {
        if matches!(self.kind, FigureKind::Pass) || matches!(other.kind, FigureKind::Pass) {
            return false;
        }
        if matches!(self.rank, Rank::Dog) || matches!(other.rank, Rank::Dog) {
            return false;
        }
        if self.is_bomb() {
            if !other.is_bomb() {
                return true;
            }
            return match self.length.cmp(&other.length) {
                std::cmp::Ordering::Greater => true,
                std::cmp::Ordering::Less => false,
                std::cmp::Ordering::Equal => self.rank > other.rank,
            };
        }
        if other.is_bomb() {
            return false;
        }
        if self.kind != other.kind || self.length != other.length {
            return false;
        }
        match self.kind {
            FigureKind::Single => single_follow_key(self.rank) > single_follow_key(other.rank),
            _ => self.rank > other.rank,
        }
    }
}

impl fmt::Display for Figure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FigureKind::Pass => f.write_str("Pass"),
            FigureKind::Single => write!(f, "Single({})", self.rank),
            FigureKind::Pair => write!(f, "Pair({})", self.rank),
            FigureKind::Triple => write!(f, "Triple({})", self.rank),
            FigureKind::Stair => write!(f, "Stair({}, {})", self.length, self.rank),
            FigureKind::FullHouse => write!(f, "FullHouse({})", self.rank),
            FigureKind::Street => write!(f, "Street({}, {})", self.length, self.rank),
            FigureKind::Bomb if self.length == 4 => write!(f, "Bomb({})", self.rank),
            FigureKind::Bomb => write!(f, "ColorBomb({}, {})", self.length, self.rank),
        }
    }
}
