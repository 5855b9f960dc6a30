//! Decomposition of a hand into disjoint covering combination sequences.

use crate::combi::generator::Combination;
use crate::model::hand::Hand;
use crate::prob::engine::CombiStats;
use std::collections::{HashMap, HashSet};

/// One complete covering of a hand: disjoint combinations whose cards are
/// exactly the hand, listed strongest first.
#[derive(Debug, Clone)]
pub struct Partition {
    pub combinations: Vec<Combination>,
}

/// Result of the bounded partition search. `exhaustive` distinguishes
/// "every partition" from "a sample cut off at the limit".
#[derive(Debug, Clone)]
pub struct PartitionSearch {
    pub partitions: Vec<Partition>,
    pub exhaustive: bool,
}

/// Enumerates partitions of `hand` over the generator's combination list.
///
/// The search is recursive backtracking in list order, so for a fixed input
/// it always finds the same partitions in the same order and aborts at the
/// same point when `max_partitions` is reached.
pub fn enumerate_partitions(
    hand: &Hand,
    combinations: &[Combination],
    max_partitions: usize,
) -> PartitionSearch {
    let hand_mask: u64 = hand
        .iter()
        .fold(0u64, |mask, card| mask | 1u64 << card.to_id());

    let usable: Vec<&Combination> = combinations
        .iter()
        .filter(|combination| {
            let mask = combination.card_mask();
            mask & hand_mask == mask
        })
        .collect();
    let masks: Vec<u64> = usable.iter().map(|c| c.card_mask()).collect();

    let mut partitions = Vec::new();
    let mut acc = Vec::new();
    let exhaustive = search(
        &usable,
        &masks,
        hand_mask,
        0,
        &mut acc,
        &mut partitions,
        max_partitions,
    );

    PartitionSearch {
        partitions,
        exhaustive,
    }
}

fn search(
    combinations: &[&Combination],
    masks: &[u64],
    remaining: u64,
    from: usize,
    acc: &mut Vec<usize>,
    out: &mut Vec<Partition>,
    max_partitions: usize,
) -> bool {
    if remaining == 0 {
        out.push(Partition {
            combinations: acc.iter().map(|&i| combinations[i].clone()).collect(),
        });
        return true;
    }
    for index in from..combinations.len() {
        if masks[index] & remaining != masks[index] {
            continue;
        }
        if out.len() >= max_partitions {
            return false;
        }
        acc.push(index);
        let subtree_done = search(
            combinations,
            masks,
            remaining & !masks[index],
            index + 1,
            acc,
            out,
            max_partitions,
        );
        acc.pop();
        if !subtree_done {
            return false;
        }
    }
    true
}

/// Scores a partition in [-1, 1] from per-combination beat statistics.
///
/// Every combination contributes `1 - 2 * hi_opponent`. The first
/// combination that is playable in the current trick keeps its full value
/// (it can be played before anyone answers), as does the planned closer,
/// the combination least likely to be overplayed.
pub fn partition_quality(
    partition: &Partition,
    playable_now: &[Combination],
    stats: &HashMap<u64, CombiStats>,
) -> f64 {
    let count = partition.combinations.len();
    if count == 0 {
        return 0.0;
    }

    let playable: HashSet<u64> = playable_now.iter().map(|c| c.card_mask()).collect();
    let risks: Vec<f64> = partition
        .combinations
        .iter()
        .map(|combination| {
            stats
                .get(&combination.card_mask())
                .map(|entry| entry.hi_opponent)
                .unwrap_or(0.0)
        })
        .collect();

    let lead_index = partition
        .combinations
        .iter()
        .position(|combination| playable.contains(&combination.card_mask()));
    let closer_index = (0..count)
        .filter(|&i| Some(i) != lead_index)
        .min_by(|&a, &b| risks[a].total_cmp(&risks[b]));

    let mut total = 0.0;
    for (index, risk) in risks.iter().enumerate() {
        let dropped = Some(index) == lead_index || Some(index) == closer_index;
        total += if dropped { 1.0 } else { 1.0 - 2.0 * risk };
    }
    (total / count as f64).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::{enumerate_partitions, partition_quality};
    use crate::combi::generator::enumerate_combinations;
    use crate::model::card::Card;
    use crate::model::hand::Hand;
    use crate::model::rank::Rank;
    use crate::model::suit::Suit;
    use crate::prob::engine::CombiStats;
    use std::collections::HashMap;

    fn two_pair_hand() -> Hand {
        Hand::try_from_cards(vec![
            Card::new(Rank::Two, Suit::Jade),
            Card::new(Rank::Two, Suit::Star),
            Card::new(Rank::Three, Suit::Pagoda),
            Card::new(Rank::Three, Suit::Sword),
        ])
        .expect("valid hand")
    }

    #[test]
    fn partitions_cover_the_hand_exactly() {
        let hand = two_pair_hand();
        let combinations = enumerate_combinations(&hand);
        let search = enumerate_partitions(&hand, &combinations, 1000);
        assert!(search.exhaustive);
        let hand_mask: u64 = hand.iter().fold(0, |m, c| m | 1u64 << c.to_id());
        for partition in &search.partitions {
            let mut covered = 0u64;
            for combination in &partition.combinations {
                let mask = combination.card_mask();
                assert_eq!(covered & mask, 0, "combinations overlap");
                covered |= mask;
            }
            assert_eq!(covered, hand_mask, "partition misses cards");
        }
    }

    #[test]
    fn two_pairs_decompose_five_ways() {
        let hand = two_pair_hand();
        let combinations = enumerate_combinations(&hand);
        let search = enumerate_partitions(&hand, &combinations, 1000);
        // stair | 33+22 | 33+2+2 | 3+3+22 | 3+3+2+2
        assert_eq!(search.partitions.len(), 5);
    }

    #[test]
    fn limit_aborts_deterministically() {
        let hand = two_pair_hand();
        let combinations = enumerate_combinations(&hand);
        let bounded = enumerate_partitions(&hand, &combinations, 3);
        assert!(!bounded.exhaustive);
        assert_eq!(bounded.partitions.len(), 3);

        let again = enumerate_partitions(&hand, &combinations, 3);
        for (a, b) in bounded.partitions.iter().zip(again.partitions.iter()) {
            let ids_a: Vec<u64> = a.combinations.iter().map(|c| c.card_mask()).collect();
            let ids_b: Vec<u64> = b.combinations.iter().map(|c| c.card_mask()).collect();
            assert_eq!(ids_a, ids_b);
        }
    }

    #[test]
    fn empty_hand_has_the_empty_partition() {
        let hand = Hand::new();
        let search = enumerate_partitions(&hand, &[], 10);
        assert!(search.exhaustive);
        assert_eq!(search.partitions.len(), 1);
        assert!(search.partitions[0].combinations.is_empty());
    }

    #[test]
    fn quality_stays_in_unit_interval_and_rewards_safety() {
        let hand = two_pair_hand();
        let combinations = enumerate_combinations(&hand);
        let search = enumerate_partitions(&hand, &combinations, 1000);

        let mut risky = HashMap::new();
        let mut safe = HashMap::new();
        for combination in &combinations {
            risky.insert(combination.card_mask(), CombiStats::with_hi_opponent(0.9));
            safe.insert(combination.card_mask(), CombiStats::with_hi_opponent(0.05));
        }

        for partition in &search.partitions {
            let q_risky = partition_quality(partition, &combinations, &risky);
            let q_safe = partition_quality(partition, &combinations, &safe);
            assert!((-1.0..=1.0).contains(&q_risky));
            assert!((-1.0..=1.0).contains(&q_safe));
            assert!(q_safe >= q_risky);
        }
    }
}
