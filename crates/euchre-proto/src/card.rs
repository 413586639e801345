//! The 24-card Euchre deck.
//!
//! Ref: spec §3 "Card" — `{suit, rank}`, canonical id `"suit:rank"`, exactly
//! 24 cards (9 through ace, four suits).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Suit {
    Clubs,
    Diamonds,
    Hearts,
    Spades,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Clubs, Suit::Diamonds, Suit::Hearts, Suit::Spades];

    /// The suit of the same color (used for left-bower resolution).
    pub fn same_color(self) -> Suit {
        match self {
            Suit::Clubs => Suit::Spades,
            Suit::Spades => Suit::Clubs,
            Suit::Diamonds => Suit::Hearts,
            Suit::Hearts => Suit::Diamonds,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Suit::Clubs => "clubs",
            Suit::Diamonds => "diamonds",
            Suit::Hearts => "hearts",
            Suit::Spades => "spades",
        }
    }

    pub fn parse(s: &str) -> Option<Suit> {
        match s {
            "clubs" => Some(Suit::Clubs),
            "diamonds" => Some(Suit::Diamonds),
            "hearts" => Some(Suit::Hearts),
            "spades" => Some(Suit::Spades),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Rank {
    #[serde(rename = "9")]
    Nine,
    #[serde(rename = "10")]
    Ten,
    J,
    Q,
    K,
    A,
}

impl Rank {
    pub const ALL: [Rank; 6] = [Rank::Nine, Rank::Ten, Rank::J, Rank::Q, Rank::K, Rank::A];

    pub fn as_str(self) -> &'static str {
        match self {
            Rank::Nine => "9",
            Rank::Ten => "10",
            Rank::J => "J",
            Rank::Q => "Q",
            Rank::K => "K",
            Rank::A => "A",
        }
    }

    pub fn parse(s: &str) -> Option<Rank> {
        match s {
            "9" => Some(Rank::Nine),
            "10" => Some(Rank::Ten),
            "J" => Some(Rank::J),
            "Q" => Some(Rank::Q),
            "K" => Some(Rank::K),
            "A" => Some(Rank::A),
            _ => None,
        }
    }

    /// Non-bower, off-suit rank order, lowest first.
    fn plain_order(self) -> u8 {
        match self {
            Rank::Nine => 0,
            Rank::Ten => 1,
            Rank::J => 2,
            Rank::Q => 3,
            Rank::K => 4,
            Rank::A => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub suit: Suit,
    pub rank: Rank,
}

impl Card {
    pub fn new(suit: Suit, rank: Rank) -> Self {
        Self { suit, rank }
    }

    /// Canonical id: `"suit:rank"`, e.g. `"clubs:9"`.
    pub fn id(self) -> String {
        format!("{}:{}", self.suit.as_str(), self.rank.as_str())
    }

    pub fn parse_id(s: &str) -> Option<Card> {
        let (suit_str, rank_str) = s.split_once(':')?;
        Some(Card::new(Suit::parse(suit_str)?, Rank::parse(rank_str)?))
    }

    /// Whether this card is the right or left bower given `trump`.
    pub fn is_right_bower(self, trump: Suit) -> bool {
        self.rank == Rank::J && self.suit == trump
    }

    pub fn is_left_bower(self, trump: Suit) -> bool {
        self.rank == Rank::J && self.suit == trump.same_color()
    }

    pub fn is_bower(self, trump: Suit) -> bool {
        self.is_right_bower(trump) || self.is_left_bower(trump)
    }

    /// The suit this card follows for suit-matching purposes: the left
    /// bower's effective suit is trump, not its printed suit.
    pub fn effective_suit(self, trump: Suit) -> Suit {
        if self.is_left_bower(trump) {
            trump
        } else {
            self.suit
        }
    }

    /// Trick-taking rank, higher wins. Only meaningful for comparing cards
    /// within the same trick given a known trump and led suit.
    pub fn trick_rank(self, trump: Suit, led: Suit) -> u8 {
        if self.is_right_bower(trump) {
            return 100;
        }
        if self.is_left_bower(trump) {
            return 99;
        }
        let effective = self.effective_suit(trump);
        if effective == trump {
            50 + self.rank.plain_order()
        } else if effective == led {
            self.rank.plain_order()
        } else {
            0
        }
    }
}

/// The canonical, ordered 24-card deck: clubs/diamonds/hearts/spades ×
/// 9/10/J/Q/K/A.
pub fn full_deck() -> Vec<Card> {
    let mut deck = Vec::with_capacity(24);
    for suit in Suit::ALL {
        for rank in Rank::ALL {
            deck.push(Card::new(suit, rank));
        }
    }
    deck
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_deck_has_24_unique_cards() {
        let deck = full_deck();
        assert_eq!(deck.len(), 24);
        let mut ids: Vec<String> = deck.iter().map(|c| c.id()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 24);
    }

    #[test]
    fn test_card_id_roundtrip() {
        let card = Card::new(Suit::Hearts, Rank::J);
        assert_eq!(card.id(), "hearts:J");
        assert_eq!(Card::parse_id("hearts:J"), Some(card));
    }

    #[test]
    fn test_left_bower_effective_suit_is_trump() {
        let left_bower = Card::new(Suit::Diamonds, Rank::J);
        assert!(left_bower.is_left_bower(Suit::Hearts));
        assert_eq!(left_bower.effective_suit(Suit::Hearts), Suit::Hearts);
    }

    #[test]
    fn test_right_bower_outranks_left_bower_outranks_ace_of_trump() {
        let right = Card::new(Suit::Hearts, Rank::J);
        let left = Card::new(Suit::Diamonds, Rank::J);
        let ace_trump = Card::new(Suit::Hearts, Rank::A);
        assert!(right.trick_rank(Suit::Hearts, Suit::Hearts) > left.trick_rank(Suit::Hearts, Suit::Hearts));
        assert!(left.trick_rank(Suit::Hearts, Suit::Hearts) > ace_trump.trick_rank(Suit::Hearts, Suit::Hearts));
    }
}
