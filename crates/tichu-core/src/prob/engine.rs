//! Online estimation: hypergeometric counting over the case tables.

use crate::combi::generator::Combination;
use crate::model::figure::{Figure, FigureKind, PHOENIX_LEAD_KEY, single_follow_key};
use crate::model::rank::Rank;
use crate::model::suit::Suit;
use crate::prob::pool::UnseenPool;
use crate::prob::provider::TableProvider;
use crate::prob::tables::{CountCase, FULL_CLASS, PhoenixReq};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbError {
    DrawTooLarge { requested: usize, available: usize },
    UnsupportedFigure(Figure),
}

impl fmt::Display for ProbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbError::DrawTooLarge {
                requested,
                available,
            } => {
                write!(
                    f,
                    "cannot draw {requested} cards from {available} unseen ones"
                )
            }
            ProbError::UnsupportedFigure(figure) => {
                write!(f, "no probability defined for {figure}")
            }
        }
    }
}

impl std::error::Error for ProbError {}

/// Probability interval. Exact results collapse to `min == max`; the bounds
/// only split when a possible color bomb overlaps the same-class event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbRange {
    pub min: f64,
    pub max: f64,
}

impl ProbRange {
    pub fn point(p: f64) -> Self {
        Self { min: p, max: p }
    }

    pub fn midpoint(self) -> f64 {
        (self.min + self.max) / 2.0
    }

    pub fn is_point(self) -> bool {
        self.min == self.max
    }
}

/// Beat statistics for one combination against the three other seats.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CombiStats {
    pub lo_opponent: f64,
    pub lo_partner: f64,
    pub hi_opponent: f64,
    pub hi_partner: f64,
    pub eq_opponent: f64,
    pub eq_partner: f64,
}

impl CombiStats {
    pub fn with_hi_opponent(hi_opponent: f64) -> Self {
        Self {
            hi_opponent,
            ..Self::default()
        }
    }
}

struct Binomial {
    table: Vec<Vec<u64>>,
}

impl Binomial {
    fn new() -> Self {
        let mut table = vec![vec![0u64; 57]; 57];
        for n in 0..57 {
            table[n][0] = 1;
            for k in 1..=n {
                table[n][k] = table[n - 1][k - 1] + table[n - 1][k];
            }
        }
        Self { table }
    }

    fn c(&self, n: usize, k: usize) -> u64 {
        if k > n { 0 } else { self.table[n][k] }
    }
}

/// The estimator. Holds the injected table provider; every query is a pure
/// function of the pool, the draw size and the candidate figure.
pub struct ProbabilityEngine<P: TableProvider> {
    provider: P,
    binomial: Binomial,
}

impl<P: TableProvider> ProbabilityEngine<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            binomial: Binomial::new(),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Probability that a `k`-card draw from `pool` holds a combination of
    /// the same kind and length with strictly lower rank.
    pub fn prob_of_lower_combi(
        &self,
        pool: &UnseenPool,
        k: usize,
        figure: Figure,
    ) -> Result<f64, ProbError> {
        self.validate(pool, k, figure)?;
        if is_dog(figure) {
            return Ok(0.0);
        }
        if figure.kind == FigureKind::Bomb && figure.length > 4 {
            let (length, top) = (figure.length, figure.rank.value());
            return Ok(self.color_run_prob(pool, k, &|len, run_top| {
                len == length && run_top < top
            }));
        }
        let table = self.provider.table(figure.kind, figure.length);
        let key = threshold_key(figure);
        let cases: Vec<&CountCase> = table.lowest.range(..key).flat_map(|(_, v)| v).collect();
        Ok(self.cases_prob(&cases, pool, k))
    }

    /// Probability that the draw can beat `figure`: a same-class combination
    /// of higher rank, any quad bomb, or any color bomb. The quad overlap is
    /// removed exactly by inclusion-exclusion; the color-bomb overlap is
    /// bounded, which is what widens the result into a range.
    pub fn prob_of_higher_combi_or_bomb(
        &self,
        pool: &UnseenPool,
        k: usize,
        figure: Figure,
    ) -> Result<ProbRange, ProbError> {
        self.validate(pool, k, figure)?;
        if is_dog(figure) {
            return Ok(ProbRange::point(0.0));
        }
        let n = pool.len();
        let total = self.binomial.c(n, k) as f64;

        if figure.kind == FigureKind::Bomb && figure.length > 4 {
            let (length, top) = (figure.length, figure.rank.value());
            let p = self.color_run_prob(pool, k, &|len, run_top| {
                len > length || (len == length && run_top > top)
            });
            return Ok(ProbRange::point(p));
        }

        if figure.kind == FigureKind::Bomb {
            let quad = self.provider.table(FigureKind::Bomb, 4);
            let key = threshold_key(figure);
            let cases: Vec<&CountCase> =
                quad.highest.range(key + 1..).flat_map(|(_, v)| v).collect();
            let p_quad = self.cases_ways(&cases, pool, k) as f64 / total;
            let p_color = self.color_run_prob(pool, k, &|_, _| true);
            return Ok(ProbRange {
                min: p_quad.max(p_color),
                max: (p_quad + p_color).min(1.0),
            });
        }

        let table = self.provider.table(figure.kind, figure.length);
        let key = threshold_key(figure);
        let same_cases: Vec<&CountCase> =
            table.highest.range(key + 1..).flat_map(|(_, v)| v).collect();
        let quad = self.provider.table(FigureKind::Bomb, 4);
        let quad_cases: Vec<&CountCase> = quad.highest.values().flatten().collect();

        let same_ways = self.cases_ways(&same_cases, pool, k);
        let quad_ways = self.cases_ways(&quad_cases, pool, k);
        let mut overlap_ways = 0u64;
        for same in &same_cases {
            for bomb in &quad_cases {
                if let Some(joint) = intersect_cases(same, bomb) {
                    overlap_ways += self.case_ways(&joint, pool, k);
                }
            }
        }
        let union = (same_ways + quad_ways - overlap_ways) as f64 / total;
        let p_color = self.color_run_prob(pool, k, &|_, _| true);
        Ok(ProbRange {
            min: union.max(p_color),
            max: (union + p_color).min(1.0),
        })
    }

    /// Probability of a same-class combination at exactly the figure's rank.
    pub fn prob_of_equal_combi(
        &self,
        pool: &UnseenPool,
        k: usize,
        figure: Figure,
    ) -> Result<f64, ProbError> {
        self.validate(pool, k, figure)?;
        if is_dog(figure) {
            return Ok(0.0);
        }
        if figure.kind == FigureKind::Bomb && figure.length > 4 {
            let (length, top) = (figure.length, figure.rank.value());
            return Ok(self.color_run_prob(pool, k, &|len, run_top| {
                len == length && run_top == top
            }));
        }
        let table = self.provider.table(figure.kind, figure.length);
        let key = threshold_key(figure);
        let cases: Vec<&CountCase> = table
            .exact
            .get(&key)
            .map(|v| v.iter().collect())
            .unwrap_or_default();
        Ok(self.cases_prob(&cases, pool, k))
    }

    /// The per-combination 6-tuple against two opponents and the partner.
    /// Seats are combined independently; the keyed map uses the card masks
    /// of the input combinations.
    pub fn combination_stats(
        &self,
        combinations: &[Combination],
        pool: &UnseenPool,
        opponent_counts: [usize; 2],
        partner_count: usize,
    ) -> Result<HashMap<u64, CombiStats>, ProbError> {
        let mut out = HashMap::new();
        for combination in combinations {
            let figure = combination.figure;
            let lo = [
                self.prob_of_lower_combi(pool, opponent_counts[0], figure)?,
                self.prob_of_lower_combi(pool, opponent_counts[1], figure)?,
            ];
            let hi = [
                self.prob_of_higher_combi_or_bomb(pool, opponent_counts[0], figure)?
                    .midpoint(),
                self.prob_of_higher_combi_or_bomb(pool, opponent_counts[1], figure)?
                    .midpoint(),
            ];
            let eq = [
                self.prob_of_equal_combi(pool, opponent_counts[0], figure)?,
                self.prob_of_equal_combi(pool, opponent_counts[1], figure)?,
            ];
            let stats = CombiStats {
                lo_opponent: either_seat(lo[0], lo[1]),
                lo_partner: self.prob_of_lower_combi(pool, partner_count, figure)?,
                hi_opponent: either_seat(hi[0], hi[1]),
                hi_partner: self
                    .prob_of_higher_combi_or_bomb(pool, partner_count, figure)?
                    .midpoint(),
                eq_opponent: either_seat(eq[0], eq[1]),
                eq_partner: self.prob_of_equal_combi(pool, partner_count, figure)?,
            };
            out.insert(combination.card_mask(), stats);
        }
        Ok(out)
    }

    fn validate(&self, pool: &UnseenPool, k: usize, figure: Figure) -> Result<(), ProbError> {
        if figure.kind == FigureKind::Pass {
            return Err(ProbError::UnsupportedFigure(figure));
        }
        if k > pool.len() {
            return Err(ProbError::DrawTooLarge {
                requested: k,
                available: pool.len(),
            });
        }
        Ok(())
    }

    fn cases_prob(&self, cases: &[&CountCase], pool: &UnseenPool, k: usize) -> f64 {
        let ways = self.cases_ways(cases, pool, k);
        if ways == 0 {
            return 0.0;
        }
        ways as f64 / self.binomial.c(pool.len(), k) as f64
    }

    fn cases_ways(&self, cases: &[&CountCase], pool: &UnseenPool, k: usize) -> u64 {
        cases
            .iter()
            .map(|case| self.case_ways(case, pool, k))
            .sum()
    }

    /// Hypergeometric product for one case: choose the required counts at
    /// every mentioned rank, the rest of the draw from the unconstrained
    /// tail.
    fn case_ways(&self, case: &CountCase, pool: &UnseenPool, k: usize) -> u64 {
        let n = pool.len();
        let phoenix_avail = pool.has_phoenix() as usize;
        let (phoenix_slot, phoenix_excluded) = match case.phoenix {
            PhoenixReq::Drawn => {
                if phoenix_avail == 0 {
                    return 0;
                }
                (1, 1)
            }
            PhoenixReq::Absent => (0, phoenix_avail),
            PhoenixReq::Free => (0, 0),
        };
        if k < phoenix_slot {
            return 0;
        }
        let budget = k - phoenix_slot;

        let mut coeffs = vec![0u64; budget + 1];
        coeffs[0] = 1;
        let mut mentioned = 0usize;
        for &(rank, class) in &case.reqs {
            let avail = pool.rank_avail(rank);
            mentioned += avail as usize;
            let mut next = vec![0u64; budget + 1];
            let mut feasible = false;
            for count in class.counts() {
                if count > avail || count as usize > budget {
                    continue;
                }
                let weight = self.binomial.c(avail as usize, count as usize);
                for used in 0..=budget - count as usize {
                    if coeffs[used] != 0 {
                        next[used + count as usize] += coeffs[used] * weight;
                        feasible = true;
                    }
                }
            }
            if !feasible {
                return 0;
            }
            coeffs = next;
        }

        let tail = n - mentioned - phoenix_excluded;
        let mut ways = 0u64;
        for (used, &coeff) in coeffs.iter().enumerate() {
            if coeff != 0 {
                ways += coeff * self.binomial.c(tail, budget - used);
            }
        }
        ways
    }

    /// Probability the draw holds a color run for which `hit(length, top)`
    /// is true, via an exact per-suit scan (no case table can express suit
    /// identity).
    fn color_run_prob(&self, pool: &UnseenPool, k: usize, hit: &dyn Fn(u8, u8) -> bool) -> f64 {
        if k == 0 {
            return 0.0;
        }
        let n = pool.len();
        let mut combined = vec![0u64; k + 1];
        combined[0] = 1;
        let mut suited_total = 0usize;
        for suit in Suit::COLORS {
            let presence = pool.suit_presence(suit);
            suited_total += presence.iter().filter(|&&p| p).count();
            let per_suit = suit_no_hit_counts(&presence, k, hit);
            let mut next = vec![0u64; k + 1];
            for (s, &ways) in combined.iter().enumerate() {
                if ways == 0 {
                    continue;
                }
                for (extra, &suit_ways) in per_suit.iter().enumerate() {
                    if s + extra <= k && suit_ways != 0 {
                        next[s + extra] += ways * suit_ways;
                    }
                }
            }
            combined = next;
        }
        let specials = n - suited_total;
        let mut no_hit = 0u64;
        for (s, &ways) in combined.iter().enumerate() {
            if ways != 0 {
                no_hit += ways * self.binomial.c(specials, k - s);
            }
        }
        let total = self.binomial.c(n, k);
        1.0 - no_hit as f64 / total as f64
    }
}

fn is_dog(figure: Figure) -> bool {
    figure.kind == FigureKind::Single && figure.rank == Rank::Dog
}

fn either_seat(p1: f64, p2: f64) -> f64 {
    1.0 - (1.0 - p1) * (1.0 - p2)
}

/// Threshold level of a candidate figure. Singles live on the doubled
/// follow-key scale; a Phoenix single leads at effective rank 1.5, so its
/// threshold sits between MahJong and Two.
fn threshold_key(figure: Figure) -> u8 {
    match figure.kind {
        FigureKind::Single => match figure.rank {
            Rank::Phoenix => PHOENIX_LEAD_KEY,
            rank => single_follow_key(rank),
        },
        _ => figure.rank.value(),
    }
}

fn intersect_cases(a: &CountCase, b: &CountCase) -> Option<CountCase> {
    let phoenix = match (a.phoenix, b.phoenix) {
        (x, PhoenixReq::Free) => x,
        (PhoenixReq::Free, y) => y,
        (x, y) if x == y => x,
        _ => return None,
    };
    let mut classes = [FULL_CLASS; 16];
    for &(rank, class) in a.reqs.iter().chain(b.reqs.iter()) {
        classes[rank as usize] &= class.0;
        if classes[rank as usize] == 0 {
            return None;
        }
    }
    let reqs = (1..=15u8)
        .filter(|&rank| classes[rank as usize] != FULL_CLASS)
        .map(|rank| (rank, crate::prob::tables::CountClass(classes[rank as usize])))
        .collect();
    Some(CountCase { reqs, phoenix })
}

/// Subsets of one suit's cards, counted by size, that contain no run for
/// which `hit` fires. Runs are checked at every extension, so any window of
/// a longer run is seen at its own top rank.
fn suit_no_hit_counts(presence: &[bool; 15], k: usize, hit: &dyn Fn(u8, u8) -> bool) -> Vec<u64> {
    let mut dp = vec![vec![0u64; k + 1]; 14];
    dp[0][0] = 1;
    for rank in 2..=14u8 {
        let mut next = vec![vec![0u64; k + 1]; 14];
        for streak in 0..14usize {
            for taken in 0..=k {
                let ways = dp[streak][taken];
                if ways == 0 {
                    continue;
                }
                if !presence[rank as usize] {
                    next[0][taken] += ways;
                    continue;
                }
                // leave the card in the pool
                next[0][taken] += ways;
                // or draw it, unless that completes a hitting run
                let grown = streak + 1;
                if taken + 1 <= k && !(5..=grown).any(|len| hit(len as u8, rank)) {
                    next[grown.min(13)][taken + 1] += ways;
                }
            }
        }
        dp = next;
    }
    let mut out = vec![0u64; k + 1];
    for streak in 0..14 {
        for (taken, &ways) in dp[streak].iter().enumerate() {
            out[taken] += ways;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{ProbRange, ProbabilityEngine};
    use crate::model::card::Card;
    use crate::model::figure::Figure;
    use crate::model::rank::Rank;
    use crate::model::suit::Suit;
    use crate::prob::pool::UnseenPool;
    use crate::prob::provider::CachedTableProvider;

    const TOL: f64 = 1e-12;

    fn engine() -> ProbabilityEngine<CachedTableProvider> {
        ProbabilityEngine::new(CachedTableProvider::new())
    }

    fn card(rank: Rank, suit: Suit) -> Card {
        Card::new(rank, suit)
    }

    /// Dr RK GK BB SB RB R2, the pair-at-Jack corpus scenario.
    fn jack_pool() -> UnseenPool {
        UnseenPool::from_cards(&[
            Card::DRAGON,
            card(Rank::King, Suit::Star),
            card(Rank::King, Suit::Jade),
            card(Rank::Jack, Suit::Pagoda),
            card(Rank::Jack, Suit::Sword),
            card(Rank::Jack, Suit::Star),
            card(Rank::Two, Suit::Star),
        ])
        .unwrap()
    }

    #[test]
    fn pair_at_jack_beaten_by_kings_ten_of_twentyone() {
        let engine = engine();
        let figure = Figure::pair(Rank::Jack).unwrap();
        let range = engine
            .prob_of_higher_combi_or_bomb(&jack_pool(), 5, figure)
            .unwrap();
        assert!(range.is_point());
        assert!((range.min - 10.0 / 21.0).abs() < TOL);
    }

    #[test]
    fn pair_at_jack_has_no_lower_pair() {
        let engine = engine();
        let figure = Figure::pair(Rank::Jack).unwrap();
        let p = engine.prob_of_lower_combi(&jack_pool(), 5, figure).unwrap();
        assert_eq!(p, 0.0);
    }

    #[test]
    fn pair_at_jack_equal_pairs_from_three_jacks() {
        let engine = engine();
        let figure = Figure::pair(Rank::Jack).unwrap();
        let p = engine.prob_of_equal_combi(&jack_pool(), 5, figure).unwrap();
        assert!((p - 18.0 / 21.0).abs() < TOL);
    }

    /// RK GB BB SB RB BZ R2, the quad-bomb corpus scenario.
    #[test]
    fn quad_bomb_of_jacks_three_of_twentyone() {
        let engine = engine();
        let pool = UnseenPool::from_cards(&[
            card(Rank::King, Suit::Star),
            card(Rank::Jack, Suit::Jade),
            card(Rank::Jack, Suit::Pagoda),
            card(Rank::Jack, Suit::Sword),
            card(Rank::Jack, Suit::Star),
            card(Rank::Ten, Suit::Pagoda),
            card(Rank::Two, Suit::Star),
        ])
        .unwrap();
        let figure = Figure::quad_bomb(Rank::Ten).unwrap();
        let range = engine.prob_of_higher_combi_or_bomb(&pool, 5, figure).unwrap();
        assert!(range.is_point());
        assert!((range.min - 3.0 / 21.0).abs() < TOL);
    }

    /// Ph R5 G5 RK GK BA SA with a phoenix-completed triple of fives.
    #[test]
    fn phoenix_full_house_below_ten_four_of_seven() {
        let engine = engine();
        let pool = UnseenPool::from_cards(&[
            Card::PHOENIX,
            card(Rank::Five, Suit::Star),
            card(Rank::Five, Suit::Jade),
            card(Rank::King, Suit::Star),
            card(Rank::King, Suit::Jade),
            card(Rank::Ace, Suit::Pagoda),
            card(Rank::Ace, Suit::Sword),
        ])
        .unwrap();
        let figure = Figure::full_house(Rank::Ten).unwrap();
        let p = engine.prob_of_lower_combi(&pool, 6, figure).unwrap();
        assert!((p - 4.0 / 7.0).abs() < TOL);
    }

    #[test]
    fn color_run_beats_a_street_exactly_once_in_six() {
        let engine = engine();
        let pool = UnseenPool::from_cards(&[
            card(Rank::Five, Suit::Star),
            card(Rank::Six, Suit::Star),
            card(Rank::Seven, Suit::Star),
            card(Rank::Eight, Suit::Star),
            card(Rank::Nine, Suit::Star),
            card(Rank::Two, Suit::Jade),
        ])
        .unwrap();
        let figure = Figure::street(5, Rank::Nine).unwrap();
        let range = engine.prob_of_higher_combi_or_bomb(&pool, 5, figure).unwrap();
        assert!(range.is_point());
        assert!((range.min - 1.0 / 6.0).abs() < TOL);
    }

    #[test]
    fn dragon_single_is_only_beaten_by_bombs() {
        let engine = engine();
        let figure = Figure::single(Rank::Dragon);
        let range = engine
            .prob_of_higher_combi_or_bomb(&jack_pool(), 5, figure)
            .unwrap();
        assert_eq!(range, ProbRange::point(0.0));

        let quad_pool = UnseenPool::from_cards(&[
            card(Rank::Nine, Suit::Jade),
            card(Rank::Nine, Suit::Pagoda),
            card(Rank::Nine, Suit::Sword),
            card(Rank::Nine, Suit::Star),
            card(Rank::Two, Suit::Jade),
        ])
        .unwrap();
        let range = engine
            .prob_of_higher_combi_or_bomb(&quad_pool, 4, figure)
            .unwrap();
        // exactly the draws containing all four nines: C(1,0) of 5 choose 4
        assert!(range.is_point());
        assert!((range.min - 1.0 / 5.0).abs() < TOL);
    }

    #[test]
    fn dog_short_circuits_to_zero() {
        let engine = engine();
        let figure = Figure::single(Rank::Dog);
        assert_eq!(
            engine.prob_of_lower_combi(&jack_pool(), 5, figure).unwrap(),
            0.0
        );
        assert_eq!(
            engine
                .prob_of_higher_combi_or_bomb(&jack_pool(), 5, figure)
                .unwrap(),
            ProbRange::point(0.0)
        );
    }

    #[test]
    fn phoenix_single_leads_at_one_and_a_half() {
        let engine = engine();
        let pool = UnseenPool::from_cards(&[
            Card::MAH_JONG,
            card(Rank::Two, Suit::Star),
            card(Rank::King, Suit::Jade),
        ])
        .unwrap();
        let figure = Figure::single(Rank::Phoenix);
        // only the MahJong is lower than a led Phoenix
        let lower = engine.prob_of_lower_combi(&pool, 1, figure).unwrap();
        assert!((lower - 1.0 / 3.0).abs() < TOL);
        // the Two and the King both beat it
        let higher = engine.prob_of_higher_combi_or_bomb(&pool, 1, figure).unwrap();
        assert!(higher.is_point());
        assert!((higher.min - 2.0 / 3.0).abs() < TOL);
    }

    #[test]
    fn draw_larger_than_pool_is_an_error() {
        let engine = engine();
        let figure = Figure::pair(Rank::Jack).unwrap();
        let result = engine.prob_of_lower_combi(&jack_pool(), 8, figure);
        assert!(result.is_err());
    }

    #[test]
    fn zero_draw_has_zero_probability() {
        let engine = engine();
        let figure = Figure::pair(Rank::Jack).unwrap();
        assert_eq!(
            engine.prob_of_lower_combi(&jack_pool(), 0, figure).unwrap(),
            0.0
        );
        let range = engine
            .prob_of_higher_combi_or_bomb(&jack_pool(), 0, figure)
            .unwrap();
        assert_eq!(range, ProbRange::point(0.0));
    }

    #[test]
    fn stats_tuple_stays_in_bounds() {
        let engine = engine();
        let pool = jack_pool();
        let hand = crate::model::hand::Hand::try_from_cards(vec![
            card(Rank::Queen, Suit::Star),
            card(Rank::Queen, Suit::Jade),
            card(Rank::Ace, Suit::Star),
        ])
        .unwrap();
        let combinations = crate::combi::generator::enumerate_combinations(&hand);
        let stats = engine
            .combination_stats(&combinations, &pool, [3, 2], 2)
            .unwrap();
        assert_eq!(stats.len(), combinations.len());
        for entry in stats.values() {
            for p in [
                entry.lo_opponent,
                entry.lo_partner,
                entry.hi_opponent,
                entry.hi_partner,
                entry.eq_opponent,
                entry.eq_partner,
            ] {
                assert!((0.0..=1.0 + 1e-12).contains(&p));
            }
        }
    }
}
