use core::fmt;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[repr(u8)]
pub enum Rank {
    Dog = 0,
    MahJong = 1,
    Two = 2,
    Three = 3,
    Four = 4,
    Five = 5,
    Six = 6,
    Seven = 7,
    Eight = 8,
    Nine = 9,
    Ten = 10,
    Jack = 11,
    Queen = 12,
    King = 13,
    Ace = 14,
    Dragon = 15,
    Phoenix = 16,
}

impl Rank {
    pub const ORDERED: [Rank; 17] = [
        Rank::Dog,
        Rank::MahJong,
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
        Rank::Ace,
        Rank::Dragon,
        Rank::Phoenix,
    ];

    /// The thirteen ranks that exist in all four suits.
    pub const NUMERIC: [Rank; 13] = [
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
        Rank::Ace,
    ];

    pub const fn from_value(value: u8) -> Option<Self> {
        match value {
            0 => Some(Rank::Dog),
            1 => Some(Rank::MahJong),
            2 => Some(Rank::Two),
            3 => Some(Rank::Three),
            4 => Some(Rank::Four),
            5 => Some(Rank::Five),
            6 => Some(Rank::Six),
            7 => Some(Rank::Seven),
            8 => Some(Rank::Eight),
            9 => Some(Rank::Nine),
            10 => Some(Rank::Ten),
            11 => Some(Rank::Jack),
            12 => Some(Rank::Queen),
            13 => Some(Rank::King),
            14 => Some(Rank::Ace),
            15 => Some(Rank::Dragon),
            16 => Some(Rank::Phoenix),
            _ => None,
        }
    }

    pub const fn value(self) -> u8 {
        self as u8
    }

    pub const fn is_special(self) -> bool {
        matches!(
            self,
            Rank::Dog | Rank::MahJong | Rank::Dragon | Rank::Phoenix
        )
    }

    /// Card points scored at the end of a round.
    pub const fn points(self) -> i8 {
        match self {
            Rank::Five => 5,
            Rank::Ten | Rank::King => 10,
            Rank::Dragon => 25,
            Rank::Phoenix => -25,
            _ => 0,
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Rank::Dog => "Do",
            Rank::MahJong => "1",
            Rank::Two => "2",
            Rank::Three => "3",
            Rank::Four => "4",
            Rank::Five => "5",
            Rank::Six => "6",
            Rank::Seven => "7",
            Rank::Eight => "8",
            Rank::Nine => "9",
            Rank::Ten => "10",
            Rank::Jack => "J",
            Rank::Queen => "Q",
            Rank::King => "K",
            Rank::Ace => "A",
            Rank::Dragon => "Dr",
            Rank::Phoenix => "Ph",
        };
        f.write_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::Rank;

    #[test]
    fn from_value_maps() {
        assert_eq!(Rank::from_value(11), Some(Rank::Jack));
        assert_eq!(Rank::from_value(16), Some(Rank::Phoenix));
        assert_eq!(Rank::from_value(17), None);
    }

    #[test]
    fn points_follow_tichu_scoring() {
        assert_eq!(Rank::Five.points(), 5);
        assert_eq!(Rank::Ten.points(), 10);
        assert_eq!(Rank::King.points(), 10);
        assert_eq!(Rank::Dragon.points(), 25);
        assert_eq!(Rank::Phoenix.points(), -25);
        assert_eq!(Rank::Ace.points(), 0);
    }

    #[test]
    fn specials_are_flagged() {
        assert!(Rank::Dog.is_special());
        assert!(Rank::Phoenix.is_special());
        assert!(!Rank::Two.is_special());
    }

    #[test]
    fn display_matches_symbols() {
        assert_eq!(Rank::Queen.to_string(), "Q");
        assert_eq!(Rank::Dragon.to_string(), "Dr");
        assert_eq!(Rank::MahJong.to_string(), "1");
    }
}
