//! Enumeration of every legal combination a hand can form.

use crate::model::card::Card;
use crate::model::figure::{Figure, single_follow_key};
use crate::model::hand::Hand;
use crate::model::rank::Rank;
use std::collections::HashSet;

/// A playable set of cards together with its figure classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Combination {
    pub cards: Vec<Card>,
    pub figure: Figure,
}

impl Combination {
    fn new(mut cards: Vec<Card>, figure: Figure) -> Self {
        cards.sort_by_key(|card| card.to_id());
        Self { cards, figure }
    }

    /// Bit mask over card ids, used for disjointness tests.
    pub fn card_mask(&self) -> u64 {
        self.cards
            .iter()
            .fold(0u64, |mask, card| mask | 1u64 << card.to_id())
    }

    pub fn uses_phoenix(&self) -> bool {
        self.cards.iter().any(|card| card.is_phoenix())
    }
}

/// Enumerates all legal combinations of `hand`, strongest first: Bombs,
/// Streets, FullHouses, Stairs, Triples, Pairs, Singles, descending by rank
/// within a kind. An empty hand yields an empty list.
pub fn enumerate_combinations(hand: &Hand) -> Vec<Combination> {
    let mut out = Vec::new();
    let phoenix = hand.contains_phoenix();
    let groups = rank_groups(hand);

    push_singles(hand, &mut out);
    push_pairs(&groups, phoenix, &mut out);
    push_triples(&groups, phoenix, &mut out);
    push_quad_bombs(&groups, &mut out);
    push_stairs(&groups, phoenix, &mut out);
    push_full_houses(&groups, phoenix, &mut out);
    push_streets(hand, &groups, phoenix, &mut out);

    dedup(&mut out);
    sort_strongest_first(&mut out);
    out
}

fn rank_groups(hand: &Hand) -> [Vec<Card>; 15] {
    let mut groups: [Vec<Card>; 15] = Default::default();
    for &card in hand.cards() {
        let value = card.rank.value();
        if (2..=14).contains(&value) {
            groups[value as usize].push(card);
        }
    }
    groups
}

fn push_singles(hand: &Hand, out: &mut Vec<Combination>) {
    for &card in hand.cards() {
        out.push(Combination::new(vec![card], Figure::single(card.rank)));
    }
}

/// All pairs at `rank`: natural two-card choices plus one Phoenix variant
/// per card when the Phoenix is available.
fn pairs_at(group: &[Card], phoenix: bool) -> Vec<Vec<Card>> {
    let mut pairs = Vec::new();
    for i in 0..group.len() {
        for j in i + 1..group.len() {
            pairs.push(vec![group[i], group[j]]);
        }
    }
    if phoenix {
        for &card in group {
            pairs.push(vec![card, Card::PHOENIX]);
        }
    }
    pairs
}

fn push_pairs(groups: &[Vec<Card>; 15], phoenix: bool, out: &mut Vec<Combination>) {
    for value in 2..=14u8 {
        let rank = Rank::from_value(value).expect("numeric rank");
        for cards in pairs_at(&groups[value as usize], phoenix) {
            let figure = Figure::pair(rank).expect("numeric pair");
            out.push(Combination::new(cards, figure));
        }
    }
}

fn triples_at(group: &[Card], phoenix: bool) -> Vec<Vec<Card>> {
    let mut triples = Vec::new();
    for i in 0..group.len() {
        for j in i + 1..group.len() {
            for l in j + 1..group.len() {
                triples.push(vec![group[i], group[j], group[l]]);
            }
        }
    }
    if phoenix {
        for i in 0..group.len() {
            for j in i + 1..group.len() {
                triples.push(vec![group[i], group[j], Card::PHOENIX]);
            }
        }
    }
    triples
}

fn push_triples(groups: &[Vec<Card>; 15], phoenix: bool, out: &mut Vec<Combination>) {
    for value in 2..=14u8 {
        let rank = Rank::from_value(value).expect("numeric rank");
        for cards in triples_at(&groups[value as usize], phoenix) {
            let figure = Figure::triple(rank).expect("numeric triple");
            out.push(Combination::new(cards, figure));
        }
    }
}

fn push_quad_bombs(groups: &[Vec<Card>; 15], out: &mut Vec<Combination>) {
    for value in 2..=14u8 {
        let group = &groups[value as usize];
        if group.len() == 4 {
            let rank = Rank::from_value(value).expect("numeric rank");
            let figure = Figure::quad_bomb(rank).expect("numeric bomb");
            out.push(Combination::new(group.clone(), figure));
        }
    }
}

fn push_stairs(groups: &[Vec<Card>; 15], phoenix: bool, out: &mut Vec<Combination>) {
    for start in 2..=13u8 {
        extend_stair(groups, phoenix, start, &Vec::new(), false, out);
    }
}

/// Grows a chain of adjacent-rank pairs upward; every prefix of at least
/// two ranks is emitted. At most one chain slot may lean on the Phoenix.
fn extend_stair(
    groups: &[Vec<Card>; 15],
    phoenix: bool,
    rank: u8,
    acc: &[Vec<Card>],
    phoenix_used: bool,
    out: &mut Vec<Combination>,
) {
    if rank > 14 {
        return;
    }
    let natural = &groups[rank as usize];
    let mut options: Vec<(Vec<Card>, bool)> = Vec::new();
    for i in 0..natural.len() {
        for j in i + 1..natural.len() {
            options.push((vec![natural[i], natural[j]], false));
        }
    }
    if phoenix && !phoenix_used {
        for &card in natural {
            options.push((vec![card, Card::PHOENIX], true));
        }
    }
    for (pair, used_now) in options {
        let mut chain = acc.to_vec();
        chain.push(pair);
        if chain.len() >= 2 {
            let top = Rank::from_value(rank).expect("numeric rank");
            let length = (chain.len() * 2) as u8;
            let figure = Figure::stair(length, top).expect("stair bounds");
            out.push(Combination::new(chain.concat(), figure));
        }
        extend_stair(groups, phoenix, rank + 1, &chain, phoenix_used || used_now, out);
    }
}

fn push_full_houses(groups: &[Vec<Card>; 15], phoenix: bool, out: &mut Vec<Combination>) {
    for triple_value in 2..=14u8 {
        let triple_rank = Rank::from_value(triple_value).expect("numeric rank");
        for triple in triples_at(&groups[triple_value as usize], phoenix) {
            let triple_phoenix = triple.iter().any(|card| card.is_phoenix());
            for pair_value in 2..=14u8 {
                if pair_value == triple_value {
                    continue;
                }
                for pair in pairs_at(&groups[pair_value as usize], phoenix) {
                    let pair_phoenix = pair.iter().any(|card| card.is_phoenix());
                    if triple_phoenix && pair_phoenix {
                        continue;
                    }
                    let mut cards = triple.clone();
                    cards.extend_from_slice(&pair);
                    let figure = Figure::full_house(triple_rank).expect("numeric full house");
                    out.push(Combination::new(cards, figure));
                }
            }
        }
    }
}

/// Street slots in ascending rank order; `None` marks the Phoenix bridging
/// a missing rank.
type StreetSlot = (u8, Option<Card>);

fn push_streets(
    hand: &Hand,
    groups: &[Vec<Card>; 15],
    phoenix: bool,
    out: &mut Vec<Combination>,
) {
    let mut at_rank: [Vec<Card>; 15] = Default::default();
    if hand.contains(Card::MAH_JONG) {
        at_rank[1].push(Card::MAH_JONG);
    }
    for value in 2..=14usize {
        at_rank[value] = groups[value].clone();
    }
    for start in 1..=10u8 {
        if at_rank[start as usize].is_empty() {
            continue;
        }
        extend_street(&at_rank, phoenix, start, &Vec::new(), false, out);
    }
}

fn extend_street(
    at_rank: &[Vec<Card>; 15],
    phoenix: bool,
    rank: u8,
    acc: &[StreetSlot],
    gap_used: bool,
    out: &mut Vec<Combination>,
) {
    if rank > 14 {
        return;
    }
    let cards = &at_rank[rank as usize];
    if cards.is_empty() {
        // A single missing rank can be bridged by the Phoenix, but only in
        // the interior of the run.
        if phoenix && !gap_used && !acc.is_empty() {
            let mut chain = acc.to_vec();
            chain.push((rank, None));
            extend_street(at_rank, phoenix, rank + 1, &chain, true, out);
        }
        return;
    }
    for &card in cards {
        let mut chain = acc.to_vec();
        chain.push((rank, Some(card)));
        if chain.len() >= 5 {
            emit_street(&chain, phoenix, gap_used, out);
        }
        extend_street(at_rank, phoenix, rank + 1, &chain, gap_used, out);
    }
}

fn emit_street(chain: &[StreetSlot], phoenix: bool, gap_used: bool, out: &mut Vec<Combination>) {
    let top = Rank::from_value(chain[chain.len() - 1].0).expect("numeric rank");
    let length = chain.len() as u8;
    let bridged = chain.iter().any(|(_, card)| card.is_none());
    let cards: Vec<Card> = chain
        .iter()
        .map(|(_, card)| card.unwrap_or(Card::PHOENIX))
        .collect();

    if bridged {
        let figure = Figure::street(length, top).expect("street bounds");
        out.push(Combination::new(cards, figure));
        return;
    }

    // Monochromatic natural runs are color bombs, not streets.
    if is_monochromatic(&cards) {
        let figure = Figure::color_bomb(length, top).expect("color bomb bounds");
        out.push(Combination::new(cards.clone(), figure));
    } else {
        let figure = Figure::street(length, top).expect("street bounds");
        out.push(Combination::new(cards.clone(), figure));
    }

    // Each interior card of a natural run can hand its slot to the Phoenix;
    // the substitute is classified after the swap, so it is never a bomb.
    if phoenix && !gap_used {
        for index in 1..cards.len() - 1 {
            let mut variant = cards.clone();
            variant[index] = Card::PHOENIX;
            let figure = Figure::street(length, top).expect("street bounds");
            out.push(Combination::new(variant, figure));
        }
    }
}

fn is_monochromatic(cards: &[Card]) -> bool {
    let first = cards[0].suit;
    !first.is_special() && cards.iter().all(|card| card.suit == first)
}

fn dedup(out: &mut Vec<Combination>) {
    let mut seen: HashSet<(Figure, Vec<u8>)> = HashSet::new();
    out.retain(|combination| {
        let ids: Vec<u8> = combination.cards.iter().map(|card| card.to_id()).collect();
        seen.insert((combination.figure, ids))
    });
}

fn sort_strongest_first(out: &mut Vec<Combination>) {
    out.sort_by(|a, b| {
        let fa = &a.figure;
        let fb = &b.figure;
        fb.kind
            .precedence()
            .cmp(&fa.kind.precedence())
            .then(fb.length.cmp(&fa.length))
            .then(single_follow_key(fb.rank).cmp(&single_follow_key(fa.rank)))
            .then_with(|| {
                let ids_a: Vec<u8> = a.cards.iter().map(|card| card.to_id()).collect();
                let ids_b: Vec<u8> = b.cards.iter().map(|card| card.to_id()).collect();
                ids_a.cmp(&ids_b)
            })
    });
}

#[cfg(test)]
mod tests {
    use super::{Combination, enumerate_combinations};
    use crate::model::card::Card;
    use crate::model::figure::FigureKind;
    use crate::model::hand::Hand;
    use crate::model::rank::Rank;
    use crate::model::suit::Suit;

    fn hand(cards: Vec<Card>) -> Hand {
        Hand::try_from_cards(cards).expect("valid hand")
    }

    fn of_kind(all: &[Combination], kind: FigureKind) -> Vec<&Combination> {
        all.iter().filter(|c| c.figure.kind == kind).collect()
    }

    #[test]
    fn empty_hand_yields_nothing() {
        assert!(enumerate_combinations(&Hand::new()).is_empty());
    }

    #[test]
    fn every_card_appears_as_a_single() {
        let hand = hand(vec![
            Card::DOG,
            Card::DRAGON,
            Card::new(Rank::Seven, Suit::Star),
        ]);
        let all = enumerate_combinations(&hand);
        let singles = of_kind(&all, FigureKind::Single);
        assert_eq!(singles.len(), 3);
    }

    #[test]
    fn group_sizes_fall_out_as_pairs_triples_and_bombs() {
        let hand = hand(vec![
            Card::new(Rank::Nine, Suit::Jade),
            Card::new(Rank::Nine, Suit::Pagoda),
            Card::new(Rank::Nine, Suit::Sword),
            Card::new(Rank::Nine, Suit::Star),
        ]);
        let all = enumerate_combinations(&hand);
        assert_eq!(of_kind(&all, FigureKind::Pair).len(), 6);
        assert_eq!(of_kind(&all, FigureKind::Triple).len(), 4);
        let bombs = of_kind(&all, FigureKind::Bomb);
        assert_eq!(bombs.len(), 1);
        assert_eq!(bombs[0].figure.length, 4);
    }

    #[test]
    fn phoenix_extends_pairs_and_triples() {
        let hand = hand(vec![
            Card::new(Rank::Jack, Suit::Jade),
            Card::new(Rank::Jack, Suit::Star),
            Card::PHOENIX,
        ]);
        let all = enumerate_combinations(&hand);
        // natural JJ plus two phoenix pairs
        assert_eq!(of_kind(&all, FigureKind::Pair).len(), 3);
        // JJ + Phoenix
        assert_eq!(of_kind(&all, FigureKind::Triple).len(), 1);
    }

    #[test]
    fn stairs_chain_adjacent_pairs() {
        let hand = hand(vec![
            Card::new(Rank::Four, Suit::Jade),
            Card::new(Rank::Four, Suit::Star),
            Card::new(Rank::Five, Suit::Pagoda),
            Card::new(Rank::Five, Suit::Sword),
            Card::new(Rank::Six, Suit::Jade),
            Card::new(Rank::Six, Suit::Star),
        ]);
        let all = enumerate_combinations(&hand);
        let stairs = of_kind(&all, FigureKind::Stair);
        // 4-5, 5-6, 4-5-6
        assert_eq!(stairs.len(), 3);
        assert!(
            stairs
                .iter()
                .any(|c| c.figure.length == 6 && c.figure.rank == Rank::Six)
        );
    }

    #[test]
    fn phoenix_fills_one_stair_slot() {
        let hand = hand(vec![
            Card::new(Rank::Four, Suit::Jade),
            Card::new(Rank::Four, Suit::Star),
            Card::new(Rank::Five, Suit::Pagoda),
            Card::PHOENIX,
        ]);
        let all = enumerate_combinations(&hand);
        let stairs = of_kind(&all, FigureKind::Stair);
        assert_eq!(stairs.len(), 1);
        assert!(stairs[0].uses_phoenix());
        assert_eq!(stairs[0].figure.rank, Rank::Five);
    }

    #[test]
    fn full_house_rejects_phoenix_on_both_sides() {
        let hand = hand(vec![
            Card::new(Rank::Ten, Suit::Jade),
            Card::new(Rank::Ten, Suit::Star),
            Card::new(Rank::Queen, Suit::Pagoda),
            Card::new(Rank::Queen, Suit::Sword),
            Card::PHOENIX,
        ]);
        let all = enumerate_combinations(&hand);
        let houses = of_kind(&all, FigureKind::FullHouse);
        // (T T Ph) + (Q Q) and (Q Q Ph) + (T T)
        assert_eq!(houses.len(), 2);
        assert!(houses.iter().all(|c| c.uses_phoenix()));
    }

    #[test]
    fn streets_branch_on_duplicates() {
        let hand = hand(vec![
            Card::new(Rank::Five, Suit::Jade),
            Card::new(Rank::Six, Suit::Jade),
            Card::new(Rank::Seven, Suit::Star),
            Card::new(Rank::Seven, Suit::Sword),
            Card::new(Rank::Eight, Suit::Jade),
            Card::new(Rank::Nine, Suit::Jade),
        ]);
        let all = enumerate_combinations(&hand);
        let streets = of_kind(&all, FigureKind::Street);
        // two choices of Seven for each of 5..9 and 5..9 is the only window
        assert_eq!(streets.len(), 2);
    }

    #[test]
    fn mah_jong_opens_the_lowest_street() {
        let hand = hand(vec![
            Card::MAH_JONG,
            Card::new(Rank::Two, Suit::Jade),
            Card::new(Rank::Three, Suit::Star),
            Card::new(Rank::Four, Suit::Sword),
            Card::new(Rank::Five, Suit::Pagoda),
        ]);
        let all = enumerate_combinations(&hand);
        let streets = of_kind(&all, FigureKind::Street);
        assert_eq!(streets.len(), 1);
        assert_eq!(streets[0].figure.rank, Rank::Five);
    }

    #[test]
    fn monochromatic_run_is_a_color_bomb() {
        let hand = hand(vec![
            Card::new(Rank::Five, Suit::Star),
            Card::new(Rank::Six, Suit::Star),
            Card::new(Rank::Seven, Suit::Star),
            Card::new(Rank::Eight, Suit::Star),
            Card::new(Rank::Nine, Suit::Star),
        ]);
        let all = enumerate_combinations(&hand);
        let bombs = of_kind(&all, FigureKind::Bomb);
        assert_eq!(bombs.len(), 1);
        assert_eq!(bombs[0].figure.length, 5);
        assert!(of_kind(&all, FigureKind::Street).is_empty());
    }

    #[test]
    fn phoenix_substitution_never_hides_a_bomb() {
        let hand = hand(vec![
            Card::new(Rank::Five, Suit::Star),
            Card::new(Rank::Six, Suit::Star),
            Card::new(Rank::Seven, Suit::Star),
            Card::new(Rank::Eight, Suit::Star),
            Card::new(Rank::Nine, Suit::Star),
            Card::PHOENIX,
        ]);
        let all = enumerate_combinations(&hand);
        let bombs = of_kind(&all, FigureKind::Bomb);
        assert_eq!(bombs.len(), 1);
        // the three interior slots each yield a phoenix street variant
        let streets = of_kind(&all, FigureKind::Street);
        assert_eq!(streets.len(), 3);
        assert!(streets.iter().all(|c| c.uses_phoenix()));
    }

    #[test]
    fn phoenix_bridges_one_interior_gap() {
        let hand = hand(vec![
            Card::new(Rank::Five, Suit::Jade),
            Card::new(Rank::Six, Suit::Star),
            Card::new(Rank::Eight, Suit::Sword),
            Card::new(Rank::Nine, Suit::Pagoda),
            Card::PHOENIX,
        ]);
        let all = enumerate_combinations(&hand);
        let streets = of_kind(&all, FigureKind::Street);
        assert_eq!(streets.len(), 1);
        assert_eq!(streets[0].figure.rank, Rank::Nine);
        assert!(streets[0].uses_phoenix());
    }

    #[test]
    fn output_is_subset_of_hand_and_strongest_first() {
        let hand = hand(vec![
            Card::new(Rank::Five, Suit::Star),
            Card::new(Rank::Six, Suit::Star),
            Card::new(Rank::Seven, Suit::Star),
            Card::new(Rank::Eight, Suit::Star),
            Card::new(Rank::Nine, Suit::Star),
            Card::new(Rank::Nine, Suit::Jade),
            Card::DRAGON,
        ]);
        let all = enumerate_combinations(&hand);
        for combination in &all {
            for card in &combination.cards {
                assert!(hand.contains(*card));
            }
        }
        let precedences: Vec<u8> = all
            .iter()
            .map(|c| c.figure.kind.precedence())
            .collect();
        let mut sorted = precedences.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(precedences, sorted);
    }
}
