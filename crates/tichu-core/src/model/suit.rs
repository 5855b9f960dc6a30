use core::fmt;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Suit {
    Special = 0,
    Jade = 1,
    Pagoda = 2,
    Sword = 3,
    Star = 4,
}

impl Suit {
    /// The four ordinary suits; the special cards live outside them.
    pub const COLORS: [Suit; 4] = [Suit::Jade, Suit::Pagoda, Suit::Sword, Suit::Star];

    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Suit::Special),
            1 => Some(Suit::Jade),
            2 => Some(Suit::Pagoda),
            3 => Some(Suit::Sword),
            4 => Some(Suit::Star),
            _ => None,
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn is_special(self) -> bool {
        matches!(self, Suit::Special)
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Suit::Special => "*",
            Suit::Jade => "G",
            Suit::Pagoda => "B",
            Suit::Sword => "S",
            Suit::Star => "R",
        };
        f.write_str(symbol)
    }
}
