//! End-of-round scoring.

use serde::{Deserialize, Serialize};

use super::entities::{Card, Player, Rank, Suit, UserId};

/// Points for each sur a player earned.
pub const SUR_POINTS: u32 = 5;
/// Points for holding the bonus ten.
pub const TEN_BONUS_POINTS: u32 = 3;
/// Points for holding the bonus two.
pub const TWO_BONUS_POINTS: u32 = 2;
/// Points awarded to whoever holds the control threshold of the control suit.
pub const CONTROL_BONUS_POINTS: u32 = 7;

/// Suits that drive the bonus cards and the control bonus.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ScoringRules {
    /// Suit whose captured count earns the control bonus
    pub control_suit: Suit,
    /// Suit of the ten worth [`TEN_BONUS_POINTS`]
    pub ten_bonus_suit: Suit,
    /// Suit of the two worth [`TWO_BONUS_POINTS`]
    pub two_bonus_suit: Suit,
    /// Captured control-suit cards needed for the control bonus
    pub control_threshold: usize,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            control_suit: Suit::Club,
            ten_bonus_suit: Suit::Diamond,
            two_bonus_suit: Suit::Club,
            control_threshold: 7,
        }
    }
}

impl ScoringRules {
    /// Every bonus keyed off a single suit.
    pub fn single_suit(suit: Suit) -> Self {
        Self {
            control_suit: suit,
            ten_bonus_suit: suit,
            two_bonus_suit: suit,
            ..Self::default()
        }
    }
}

/// Score breakdown for one player.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PlayerScore {
    pub user_id: UserId,
    pub control_count: usize,
    pub sur_points: u32,
    pub ten_bonus: u32,
    pub two_bonus: u32,
    pub jacks: u32,
    pub aces: u32,
    pub control_bonus: u32,
    pub total: u32,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", content = "user_id", rename_all = "snake_case")]
pub enum RoundWinner {
    Player(UserId),
    Tie,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RoundScore {
    pub scores: Vec<PlayerScore>,
    pub winner: RoundWinner,
}

fn bonus_tally(user_id: UserId, collected: &[Card], surs: u32, rules: &ScoringRules) -> PlayerScore {
    let control_count = collected
        .iter()
        .filter(|c| c.suit == rules.control_suit)
        .count();
    let has = |suit, rank| collected.iter().any(|c| c.is(suit, rank));
    let count_rank = |rank| collected.iter().filter(|c| c.rank == rank).count() as u32;

    let sur_points = surs * SUR_POINTS;
    let ten_bonus = if has(rules.ten_bonus_suit, Rank::Ten) {
        TEN_BONUS_POINTS
    } else {
        0
    };
    let two_bonus = if has(rules.two_bonus_suit, Rank::Two) {
        TWO_BONUS_POINTS
    } else {
        0
    };
    let jacks = count_rank(Rank::Jack);
    let aces = count_rank(Rank::Ace);

    PlayerScore {
        user_id,
        control_count,
        sur_points,
        ten_bonus,
        two_bonus,
        jacks,
        aces,
        control_bonus: 0,
        total: sur_points + ten_bonus + two_bonus + jacks + aces,
    }
}

/// Scores a finished round.
///
/// Each player gets their bonus tally. The player at or above the control
/// threshold also gets [`CONTROL_BONUS_POINTS`]. Equal totals are a
/// [`RoundWinner::Tie`].
pub fn score_round(players: &[Player; 2], rules: &ScoringRules) -> RoundScore {
    let mut scores: Vec<PlayerScore> = players
        .iter()
        .map(|p| bonus_tally(p.user_id, &p.collected, p.surs, rules))
        .collect();

    for score in scores.iter_mut() {
        if score.control_count >= rules.control_threshold {
            score.control_bonus = CONTROL_BONUS_POINTS;
            score.total += CONTROL_BONUS_POINTS;
        }
    }

    let winner = match scores[0].total.cmp(&scores[1].total) {
        std::cmp::Ordering::Greater => RoundWinner::Player(scores[0].user_id),
        std::cmp::Ordering::Less => RoundWinner::Player(scores[1].user_id),
        std::cmp::Ordering::Equal => RoundWinner::Tie,
    };

    RoundScore { scores, winner }
}
