use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    fmt::{self},
};
use uuid::Uuid;

/// Authenticated user identifier handed to the engine by the identity layer.
pub type UserId = i64;

/// Session identifier handed to the engine by matchmaking.
pub type SessionId = Uuid;

/// Globally-unique identity of a single card instance.
pub type CardId = Uuid;

pub const DECK_SIZE: usize = 52;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Suit {
    Heart,
    Diamond,
    Club,
    Spade,
}

impl Suit {
    pub const ALL: [Self; 4] = [Self::Heart, Self::Diamond, Self::Club, Self::Spade];
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Heart => "♥",
            Self::Diamond => "♦",
            Self::Club => "♣",
            Self::Spade => "♠",
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Rank {
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl Rank {
    pub const ALL: [Self; 13] = [
        Self::Two,
        Self::Three,
        Self::Four,
        Self::Five,
        Self::Six,
        Self::Seven,
        Self::Eight,
        Self::Nine,
        Self::Ten,
        Self::Jack,
        Self::Queen,
        Self::King,
        Self::Ace,
    ];

    /// Arithmetic value used when summing table cards (ace=1 ... king=13).
    /// Only capture arithmetic uses this; it says nothing about ordering.
    pub const fn value(self) -> u8 {
        match self {
            Self::Ace => 1,
            Self::Two => 2,
            Self::Three => 3,
            Self::Four => 4,
            Self::Five => 5,
            Self::Six => 6,
            Self::Seven => 7,
            Self::Eight => 8,
            Self::Nine => 9,
            Self::Ten => 10,
            Self::Jack => 11,
            Self::Queen => 12,
            Self::King => 13,
        }
    }

    /// Aces and pip cards take part in sum captures.
    pub const fn is_numeric(self) -> bool {
        self.value() <= 10
    }

    /// Kings and queens only pair with their own rank and survive a jack sweep.
    pub const fn is_court(self) -> bool {
        matches!(self, Self::Queen | Self::King)
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Ace => write!(f, "A"),
            Self::Jack => write!(f, "J"),
            Self::Queen => write!(f, "Q"),
            Self::King => write!(f, "K"),
            other => write!(f, "{}", other.value()),
        }
    }
}

/// A single physical card. Two cards with the same suit and rank never
/// exist in one session, but the instance id is what the engine tracks.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Card {
    pub suit: Suit,
    pub rank: Rank,
    pub id: CardId,
}

impl Card {
    pub fn new(suit: Suit, rank: Rank) -> Self {
        Self {
            suit,
            rank,
            id: Uuid::new_v4(),
        }
    }

    pub const fn value(&self) -> u8 {
        self.rank.value()
    }

    pub fn is(&self, suit: Suit, rank: Rank) -> bool {
        self.suit == suit && self.rank == rank
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = format!("{}/{}", self.rank, self.suit);
        write!(f, "{repr:>4}")
    }
}

/// Undealt cards. Dealing takes from the front, drawing takes from the back.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// A fresh, unshuffled 52-card deck with new instance ids.
    pub fn new() -> Self {
        let mut cards = Vec::with_capacity(DECK_SIZE);
        for suit in Suit::ALL {
            for rank in Rank::ALL {
                cards.push(Card::new(suit, rank));
            }
        }
        Self { cards }
    }

    /// A deck holding exactly `cards`, top of the deck first.
    pub fn from_cards(cards: Vec<Card>) -> Self {
        Self { cards }
    }

    /// Unbiased in-place permutation (Fisher-Yates).
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.cards.shuffle(rng);
    }

    /// Deals up to `count` cards from the top of the deck.
    pub fn deal(&mut self, count: usize) -> Vec<Card> {
        let count = count.min(self.cards.len());
        self.cards.drain(..count).collect()
    }

    pub fn draw(&mut self) -> Option<Card> {
        self.cards.pop()
    }

    pub fn put_back(&mut self, card: Card) {
        self.cards.push(card);
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }
}

impl Default for Deck {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns the first instance id seen twice, if any.
pub fn first_duplicate<'a>(cards: impl IntoIterator<Item = &'a Card>) -> Option<CardId> {
    let mut seen = HashSet::with_capacity(DECK_SIZE);
    cards.into_iter().map(|c| c.id).find(|id| !seen.insert(*id))
}

/// One seat of a session.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Player {
    pub user_id: UserId,
    pub hand: Vec<Card>,
    pub collected: Vec<Card>,
    pub surs: u32,
    pub consecutive_timeouts: u32,
}

impl Player {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            hand: Vec::with_capacity(4),
            collected: Vec::new(),
            surs: 0,
            consecutive_timeouts: 0,
        }
    }

    pub fn holds(&self, card_id: CardId) -> bool {
        self.hand.iter().any(|c| c.id == card_id)
    }
}
