//! Capture search.
//!
//! Given the face-up table and the rank of the card being played, the solver
//! enumerates every group of table cards the play may take:
//!
//! - a **jack** sweeps every table card that is not a king or a queen,
//! - a **king** or **queen** pairs with one table card of the same rank,
//! - an **ace** or **pip card** takes any group of numeric table cards whose
//!   values add up to `11 - played value`.
//!
//! Tables stay small by construction (four cards after the deal, rarely more
//! than eight), so the sum search is an exhaustive depth-first walk with
//! pruning on the running total.

use rand::{Rng, seq::IndexedRandom};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::entities::{Card, CardId, Rank};
use super::errors::{GameError, GameResult};

/// Sum every numeric capture must reach together with the played card.
pub const CAPTURE_SUM: u8 = 11;

/// Which kind of choice a player owes when more than one capture exists.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionKind {
    /// Several table subsets sum to the target
    Combination,
    /// Several kings (or queens) lie on the table
    Pair,
}

/// What a play does to the table once the choice (if any) is settled.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Resolution {
    /// Nothing to capture, the played card goes face-up on the table
    Place,
    /// These table cards are taken
    Capture(Vec<Card>),
    /// The acting player must pick one of these
    Ambiguous(Vec<Vec<Card>>),
}

/// Enumerates the capture candidates for `played` against `table`.
///
/// For a jack the single candidate is the sweep (absent when nothing is
/// sweepable). Candidates may share cards with each other; whichever one is
/// chosen is removed from the table as a unit.
pub fn find_captures(table: &[Card], played: Rank) -> Vec<Vec<Card>> {
    match played {
        Rank::Jack => {
            let sweep: Vec<Card> = table.iter().filter(|c| !c.rank.is_court()).copied().collect();
            if sweep.is_empty() {
                Vec::new()
            } else {
                vec![sweep]
            }
        }
        Rank::King | Rank::Queen => table
            .iter()
            .filter(|c| c.rank == played)
            .map(|c| vec![*c])
            .collect(),
        numeric => {
            let numeric_cards: Vec<Card> =
                table.iter().filter(|c| c.rank.is_numeric()).copied().collect();
            let target = CAPTURE_SUM - numeric.value();
            let mut found = Vec::new();
            let mut current = Vec::with_capacity(numeric_cards.len());
            collect_sums(&numeric_cards, 0, target, &mut current, &mut found);
            found
        }
    }
}

fn collect_sums(
    cards: &[Card],
    start: usize,
    remaining: u8,
    current: &mut Vec<Card>,
    found: &mut Vec<Vec<Card>>,
) {
    for idx in start..cards.len() {
        let card = cards[idx];
        let value = card.value();
        if value > remaining {
            continue;
        }
        current.push(card);
        if value == remaining {
            found.push(current.clone());
        } else {
            collect_sums(cards, idx + 1, remaining - value, current, found);
        }
        current.pop();
    }
}

/// Selection kind a play of `played` would ask for, if it can be ambiguous.
pub fn selection_kind(played: Rank) -> Option<SelectionKind> {
    match played {
        Rank::Jack => None,
        Rank::King | Rank::Queen => Some(SelectionKind::Pair),
        _ => Some(SelectionKind::Combination),
    }
}

/// Applies the disambiguation policy to a candidate list.
///
/// A non-empty `selection` must name exactly the id set of one candidate.
/// Without one, zero candidates place the card, one candidate is taken
/// outright and several are handed back as [`Resolution::Ambiguous`].
pub fn resolve(candidates: Vec<Vec<Card>>, selection: Option<&[CardId]>) -> GameResult<Resolution> {
    if let Some(selected) = selection.filter(|s| !s.is_empty()) {
        let wanted: BTreeSet<CardId> = selected.iter().copied().collect();
        if wanted.len() != selected.len() {
            return Err(GameError::InvalidSelection);
        }
        return candidates
            .into_iter()
            .find(|candidate| {
                candidate.len() == wanted.len() && candidate.iter().all(|c| wanted.contains(&c.id))
            })
            .map(Resolution::Capture)
            .ok_or(GameError::InvalidSelection);
    }

    let mut candidates = candidates;
    Ok(match candidates.len() {
        0 => Resolution::Place,
        1 => Resolution::Capture(candidates.remove(0)),
        _ => Resolution::Ambiguous(candidates),
    })
}

/// Uniform pick among ambiguous candidates for plays nobody is watching.
pub fn choose_random<R: Rng + ?Sized>(candidates: &[Vec<Card>], rng: &mut R) -> Option<Vec<Card>> {
    candidates.choose(rng).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::Suit;
    use proptest::prelude::*;
    use rand::{SeedableRng, rngs::StdRng};

    fn card(rank: Rank) -> Card {
        Card::new(Suit::Heart, rank)
    }

    fn ids(cards: &[Card]) -> BTreeSet<CardId> {
        cards.iter().map(|c| c.id).collect()
    }

    // === Jack Tests ===

    #[test]
    fn test_jack_sweeps_everything_but_courts() {
        let king = card(Rank::King);
        let three = card(Rank::Three);
        let queen = card(Rank::Queen);
        let five = card(Rank::Five);
        let table = vec![king, three, queen, five];

        let captures = find_captures(&table, Rank::Jack);
        assert_eq!(captures.len(), 1);
        assert_eq!(ids(&captures[0]), ids(&[three, five]));
    }

    #[test]
    fn test_jack_sweeps_other_jacks() {
        let jack = card(Rank::Jack);
        let table = vec![jack, card(Rank::King)];
        let captures = find_captures(&table, Rank::Jack);
        assert_eq!(captures, vec![vec![jack]]);
    }

    #[test]
    fn test_jack_on_court_only_table_captures_nothing() {
        let table = vec![card(Rank::King), card(Rank::Queen)];
        assert!(find_captures(&table, Rank::Jack).is_empty());
    }

    #[test]
    fn test_jack_on_empty_table() {
        assert!(find_captures(&[], Rank::Jack).is_empty());
    }

    // === Court Tests ===

    #[test]
    fn test_king_pairs_with_each_king() {
        let k1 = card(Rank::King);
        let k2 = Card::new(Suit::Spade, Rank::King);
        let table = vec![k1, card(Rank::Queen), k2, card(Rank::Four)];
        let captures = find_captures(&table, Rank::King);
        assert_eq!(captures, vec![vec![k1], vec![k2]]);
    }

    #[test]
    fn test_queen_without_match() {
        let table = vec![card(Rank::King), card(Rank::Six)];
        assert!(find_captures(&table, Rank::Queen).is_empty());
    }

    // === Numeric Tests ===

    #[test]
    fn test_nine_takes_the_two() {
        let two = card(Rank::Two);
        let table = vec![two, card(Rank::Three), Card::new(Suit::Diamond, Rank::Ten)];
        let captures = find_captures(&table, Rank::Nine);
        assert_eq!(captures, vec![vec![two]]);
    }

    #[test]
    fn test_ten_ignores_jack_on_table() {
        let table = vec![
            card(Rank::Four),
            card(Rank::Five),
            card(Rank::Six),
            card(Rank::Jack),
        ];
        assert!(find_captures(&table, Rank::Ten).is_empty());
    }

    #[test]
    fn test_ace_counts_as_one() {
        let ace = card(Rank::Ace);
        let nine = card(Rank::Nine);
        let table = vec![ace, nine, card(Rank::King)];
        // 10 + ace = 11
        assert_eq!(find_captures(&table, Rank::Ten), vec![vec![ace]]);
        // ace played needs 10 on the table: 9 + ace
        assert_eq!(ids(&find_captures(&table, Rank::Ace)[0]), ids(&[ace, nine]));
    }

    #[test]
    fn test_overlapping_candidates() {
        let two = card(Rank::Two);
        let three = card(Rank::Three);
        let four = card(Rank::Four);
        let five = card(Rank::Five);
        let table = vec![two, three, four, five];
        // played 4 => target 7: {2,5} and {3,4}
        let captures = find_captures(&table, Rank::Four);
        let sets: Vec<BTreeSet<CardId>> = captures.iter().map(|c| ids(c)).collect();
        assert_eq!(sets.len(), 2);
        assert!(sets.contains(&ids(&[two, five])));
        assert!(sets.contains(&ids(&[three, four])));
    }

    #[test]
    fn test_court_cards_never_join_sums() {
        let table = vec![card(Rank::Queen), card(Rank::King)];
        assert!(find_captures(&table, Rank::Ace).is_empty());
    }

    // === Resolve Tests ===

    #[test]
    fn test_resolve_without_candidates_places() {
        assert_eq!(resolve(vec![], None).unwrap(), Resolution::Place);
    }

    #[test]
    fn test_resolve_single_candidate_captures() {
        let two = card(Rank::Two);
        assert_eq!(
            resolve(vec![vec![two]], None).unwrap(),
            Resolution::Capture(vec![two])
        );
    }

    #[test]
    fn test_resolve_many_candidates_is_ambiguous() {
        let a = card(Rank::Two);
        let b = Card::new(Suit::Club, Rank::Two);
        let res = resolve(vec![vec![a], vec![b]], Some(&[])).unwrap();
        assert_eq!(res, Resolution::Ambiguous(vec![vec![a], vec![b]]));
    }

    #[test]
    fn test_resolve_matching_selection_in_any_order() {
        let two = card(Rank::Two);
        let five = card(Rank::Five);
        let three = card(Rank::Three);
        let four = card(Rank::Four);
        let candidates = vec![vec![two, five], vec![three, four]];
        let res = resolve(candidates, Some(&[four.id, three.id])).unwrap();
        assert_eq!(res, Resolution::Capture(vec![three, four]));
    }

    #[test]
    fn test_resolve_rejects_partial_selection() {
        let two = card(Rank::Two);
        let five = card(Rank::Five);
        let candidates = vec![vec![two, five], vec![card(Rank::Seven)]];
        assert_eq!(
            resolve(candidates, Some(&[two.id])),
            Err(GameError::InvalidSelection)
        );
    }

    #[test]
    fn test_resolve_rejects_duplicated_ids() {
        let two = card(Rank::Two);
        let candidates = vec![vec![two], vec![card(Rank::Two)]];
        assert_eq!(
            resolve(candidates, Some(&[two.id, two.id])),
            Err(GameError::InvalidSelection)
        );
    }

    #[test]
    fn test_resolve_rejects_selection_when_nothing_to_capture() {
        assert_eq!(
            resolve(vec![], Some(&[CardId::new_v4()])),
            Err(GameError::InvalidSelection)
        );
    }

    #[test]
    fn test_selection_kind() {
        assert_eq!(selection_kind(Rank::Jack), None);
        assert_eq!(selection_kind(Rank::King), Some(SelectionKind::Pair));
        assert_eq!(selection_kind(Rank::Seven), Some(SelectionKind::Combination));
    }

    #[test]
    fn test_choose_random_picks_a_candidate() {
        let a = vec![card(Rank::Two)];
        let b = vec![card(Rank::Three)];
        let candidates = vec![a.clone(), b.clone()];
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            let picked = choose_random(&candidates, &mut rng).unwrap();
            assert!(picked == a || picked == b);
        }
        assert!(choose_random(&[], &mut rng).is_none());
    }

    // === Property Tests ===

    fn rank_strategy() -> impl Strategy<Value = Rank> {
        (0usize..13).prop_map(|i| Rank::ALL[i])
    }

    proptest! {
        #[test]
        fn prop_numeric_captures_match_bruteforce(
            table_ranks in prop::collection::vec(rank_strategy(), 0..9),
            played in (0usize..10).prop_map(|i| [Rank::Ace, Rank::Two, Rank::Three, Rank::Four,
                Rank::Five, Rank::Six, Rank::Seven, Rank::Eight, Rank::Nine, Rank::Ten][i]),
        ) {
            let table: Vec<Card> = table_ranks.iter().map(|r| Card::new(Suit::Club, *r)).collect();
            let target = CAPTURE_SUM - played.value();

            let mut expected: BTreeSet<BTreeSet<CardId>> = BTreeSet::new();
            for mask in 1u32..(1 << table.len()) {
                let subset: Vec<&Card> = table
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| mask & (1 << i) != 0)
                    .map(|(_, c)| c)
                    .collect();
                if subset.iter().all(|c| c.rank.is_numeric())
                    && subset.iter().map(|c| c.value() as u32).sum::<u32>() == target as u32
                {
                    expected.insert(subset.iter().map(|c| c.id).collect());
                }
            }

            let found: Vec<BTreeSet<CardId>> =
                find_captures(&table, played).iter().map(|c| ids(c)).collect();
            let found_set: BTreeSet<BTreeSet<CardId>> = found.iter().cloned().collect();
            prop_assert_eq!(found.len(), found_set.len());
            prop_assert_eq!(found_set, expected);
        }
    }
}
