//! Sprint result ranking.
//!
//! Scored results are sorted by words written, highest first, keeping the
//! input order between equal counts. Positions are sequential (1, 2, 3,
//! ...) even across ties. Anyone matching the highest count so far is a
//! winner. In the top five, and only when more than one result was scored,
//! each entry earns `ceil(WIN_BONUS_XP / d)` where `d` is 1 for winners and
//! the position otherwise.

use crate::UserId;

/// XP for finishing a sprint.
pub const COMPLETION_XP: i64 = 25;

/// XP for winning a sprint; lower positions get a fraction.
pub const WIN_BONUS_XP: i64 = 100;

/// Positions that earn a bonus.
pub const BONUS_POSITIONS: usize = 5;

/// One participant's scored result.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredResult {
    pub user: UserId,
    pub words: i64,
    pub wpm: f64,
    pub new_personal_best: bool,
}

/// A scored result with its place in the ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct Placing {
    pub result: ScoredResult,
    /// 1-based, ties-inclusive sequential.
    pub position: usize,
    pub winner: bool,
    pub bonus_xp: i64,
}

impl Placing {
    /// Completion plus bonus.
    pub fn total_xp(&self) -> i64 {
        COMPLETION_XP + self.bonus_xp
    }
}

/// Rank scored results.
pub fn rank(mut results: Vec<ScoredResult>) -> Vec<Placing> {
    // sort_by is stable
    results.sort_by(|a, b| b.words.cmp(&a.words));

    let contested = results.len() > 1;
    let mut highest = 0;

    results
        .into_iter()
        .enumerate()
        .map(|(index, result)| {
            let position = index + 1;
            highest = highest.max(result.words);
            let winner = result.words == highest;

            let bonus_xp = if contested && position <= BONUS_POSITIONS {
                let divisor = if winner { 1 } else { position as i64 };
                div_ceil(WIN_BONUS_XP, divisor)
            } else {
                0
            };

            Placing {
                result,
                position,
                winner: winner || position == 1,
                bonus_xp,
            }
        })
        .collect()
}

fn div_ceil(numerator: i64, divisor: i64) -> i64 {
    (numerator + divisor - 1) / divisor
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn scored(user: UserId, words: i64) -> ScoredResult {
        ScoredResult {
            user,
            words,
            wpm: words as f64 / 20.0,
            new_personal_best: false,
        }
    }

    fn summary(placings: &[Placing]) -> Vec<(UserId, usize, bool, i64)> {
        placings
            .iter()
            .map(|p| (p.result.user, p.position, p.winner, p.bonus_xp))
            .collect()
    }

    // === Unit Tests ===

    #[test]
    fn test_tied_leaders_share_the_win() {
        let placings = rank(vec![scored(1, 500), scored(2, 500), scored(3, 300), scored(4, 100)]);

        assert_eq!(
            summary(&placings),
            vec![(1, 1, true, 100), (2, 2, true, 100), (3, 3, false, 34), (4, 4, false, 25)]
        );
    }

    #[test]
    fn test_input_order_does_not_matter_except_for_ties() {
        let placings = rank(vec![scored(4, 100), scored(2, 500), scored(3, 300), scored(1, 500)]);

        let users: Vec<_> = placings.iter().map(|p| p.result.user).collect();
        assert_eq!(users, vec![2, 1, 3, 4]);
    }

    #[test]
    fn test_single_result_gets_no_bonus_but_wins() {
        let placings = rank(vec![scored(1, 800)]);

        assert_eq!(summary(&placings), vec![(1, 1, true, 0)]);
        assert_eq!(placings[0].total_xp(), COMPLETION_XP);
    }

    #[test]
    fn test_only_top_five_earn_bonus() {
        let results = (1..=7).map(|u| scored(u, 1000 - u as i64 * 10)).collect();
        let bonuses: Vec<_> = rank(results).iter().map(|p| p.bonus_xp).collect();

        assert_eq!(bonuses, vec![100, 50, 34, 25, 20, 0, 0]);
    }

    #[test]
    fn test_lower_tie_is_paid_by_position() {
        // Ties below the top are not winners, so each is paid by its own position
        let placings = rank(vec![scored(1, 900), scored(2, 400), scored(3, 400)]);

        assert_eq!(
            summary(&placings),
            vec![(1, 1, true, 100), (2, 2, false, 50), (3, 3, false, 34)]
        );
    }

    #[test]
    fn test_empty() {
        assert!(rank(Vec::new()).is_empty());
    }

    // === Property-Based Tests ===

    proptest! {
        // Output is sorted descending and keeps every input
        #[test]
        fn ranking_is_sorted_permutation(words in prop::collection::vec(1i64..5000, 0..12)) {
            let results: Vec<_> = words.iter().enumerate().map(|(i, w)| scored(i as u64, *w)).collect();
            let placings = rank(results);

            prop_assert_eq!(placings.len(), words.len());
            prop_assert!(placings.windows(2).all(|w| w[0].result.words >= w[1].result.words));
            prop_assert!(placings.iter().enumerate().all(|(i, p)| p.position == i + 1));
        }

        // Winners are exactly those matching the maximum
        #[test]
        fn winners_match_maximum(words in prop::collection::vec(1i64..50, 1..12)) {
            let max = *words.iter().max().unwrap();
            let results: Vec<_> = words.iter().enumerate().map(|(i, w)| scored(i as u64, *w)).collect();

            for p in rank(results) {
                prop_assert_eq!(p.winner, p.result.words == max);
            }
        }

        // Bonus never exceeds the win bonus and is zero outside the top five
        #[test]
        fn bonus_is_bounded(words in prop::collection::vec(1i64..5000, 2..12)) {
            let results: Vec<_> = words.iter().enumerate().map(|(i, w)| scored(i as u64, *w)).collect();

            for p in rank(results) {
                prop_assert!(p.bonus_xp <= WIN_BONUS_XP);
                if p.position > BONUS_POSITIONS {
                    prop_assert_eq!(p.bonus_xp, 0);
                } else {
                    prop_assert!(p.bonus_xp > 0);
                }
            }
        }

        // Equal counts keep their input order
        #[test]
        fn ties_are_stable(count in 2usize..8) {
            let results: Vec<_> = (0..count).map(|i| scored(i as u64, 300)).collect();
            let users: Vec<_> = rank(results).iter().map(|p| p.result.user).collect();
            prop_assert_eq!(users, (0..count as u64).collect::<Vec<_>>());
        }
    }
}
