//! Offline-built case tables for the probability engine.
//!
//! For one `(kind, length)` class the table answers, per threshold level,
//! which per-rank count requirements witness a qualifying combination. Cases
//! inside one family partition the event space: the `highest` family splits
//! hands by the highest qualifying rank, `lowest` by the lowest, `exact`
//! holds the witnesses for one specific rank. Summing hypergeometric counts
//! over a family range is therefore exact, with no double counting across
//! thresholds.

use crate::model::figure::{FigureKind, single_follow_key};
use crate::model::rank::Rank;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

pub(crate) const FULL_CLASS: u8 = 0b1_1111;

/// Allowed card counts at one rank, one bit per count 0..=4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CountClass(pub u8);

impl CountClass {
    pub const fn exactly(count: u8) -> Self {
        Self(1 << count)
    }

    pub const fn at_least(count: u8) -> Self {
        Self(FULL_CLASS & (FULL_CLASS << count))
    }

    pub const fn at_most(count: u8) -> Self {
        Self(FULL_CLASS >> (4 - count))
    }

    pub fn allows(self, count: u8) -> bool {
        count <= 4 && self.0 & (1 << count) != 0
    }

    pub fn counts(self) -> impl Iterator<Item = u8> {
        (0..=4u8).filter(move |&count| self.allows(count))
    }
}

/// Whether a case requires the Phoenix among the drawn cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PhoenixReq {
    Drawn,
    Absent,
    Free,
}

/// One case: count requirements for the mentioned ranks; unmentioned ranks
/// are unconstrained and feed the hypergeometric tail.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CountCase {
    pub reqs: Vec<(u8, CountClass)>,
    pub phoenix: PhoenixReq,
}

/// Case families for one `(kind, length)` class, keyed by threshold level.
/// Levels are rank values, except for singles where they are the doubled
/// follow keys (Phoenix between Ace and Dragon).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FigureTable {
    pub kind: FigureKind,
    pub length: u8,
    pub highest: BTreeMap<u8, Vec<CountCase>>,
    pub lowest: BTreeMap<u8, Vec<CountCase>>,
    pub exact: BTreeMap<u8, Vec<CountCase>>,
}

impl FigureTable {
    pub fn build(kind: FigureKind, length: u8) -> Self {
        let mut table = match kind {
            FigureKind::Single => build_single_table(),
            FigureKind::Pair => build_group_table(kind, 2, 2, Some(1)),
            FigureKind::Triple => build_group_table(kind, 3, 3, Some(2)),
            FigureKind::Bomb => build_group_table(kind, 4, 4, None),
            FigureKind::Stair => build_stair_table(length),
            FigureKind::Street => build_street_table(length),
            FigureKind::FullHouse => build_full_house_table(),
            FigureKind::Pass => FigureTable::empty(kind, length),
        };
        table.length = length;
        for family in [&mut table.highest, &mut table.lowest, &mut table.exact] {
            for cases in family.values_mut() {
                let merged = merge_cases(std::mem::take(cases));
                *cases = merged;
            }
        }
        table
    }

    fn empty(kind: FigureKind, length: u8) -> Self {
        Self {
            kind,
            length,
            highest: BTreeMap::new(),
            lowest: BTreeMap::new(),
            exact: BTreeMap::new(),
        }
    }
}

#[derive(Clone)]
struct Row {
    classes: [u8; 16],
    phoenix: PhoenixReq,
}

impl Row {
    fn new(phoenix: PhoenixReq) -> Self {
        Self {
            classes: [FULL_CLASS; 16],
            phoenix,
        }
    }

    /// Intersects the class at `rank`; false when the case became empty.
    fn restrict(&mut self, rank: u8, class: CountClass) -> bool {
        let slot = &mut self.classes[rank as usize];
        *slot &= class.0;
        *slot != 0
    }

    fn into_case(self) -> CountCase {
        let reqs = (1..=15u8)
            .filter(|&rank| self.classes[rank as usize] != FULL_CLASS)
            .map(|rank| (rank, CountClass(self.classes[rank as usize])))
            .collect();
        CountCase {
            reqs,
            phoenix: self.phoenix,
        }
    }
}

/// Pairs, triples and quad bombs: one rank carries the whole combination.
/// `natural` is the required natural count, `assisted` the count sufficient
/// once the Phoenix fills in (None for bombs, which refuse the wildcard).
fn build_group_table(
    kind: FigureKind,
    length: u8,
    natural: u8,
    assisted: Option<u8>,
) -> FigureTable {
    let base_ph = if assisted.is_some() {
        PhoenixReq::Absent
    } else {
        PhoenixReq::Free
    };
    let mut table = FigureTable::empty(kind, length);
    for t in 2..=14u8 {
        let mut highest = Vec::new();
        let mut lowest = Vec::new();
        let mut exact = Vec::new();

        let mut row = Row::new(base_ph);
        row.restrict(t, CountClass::at_least(natural));
        exact.push(row.clone());
        let mut high = row.clone();
        for r in t + 1..=14 {
            high.restrict(r, CountClass::at_most(natural - 1));
        }
        highest.push(high);
        let mut low = row;
        for r in 2..t {
            low.restrict(r, CountClass::at_most(natural - 1));
        }
        lowest.push(low);

        if let Some(with_phoenix) = assisted {
            let mut row = Row::new(PhoenixReq::Drawn);
            row.restrict(t, CountClass::at_least(with_phoenix));
            exact.push(row.clone());
            let mut high = row.clone();
            for r in t + 1..=14 {
                high.restrict(r, CountClass::at_most(with_phoenix - 1));
            }
            highest.push(high);
            let mut low = row;
            for r in 2..t {
                low.restrict(r, CountClass::at_most(with_phoenix - 1));
            }
            lowest.push(low);
        }

        table
            .highest
            .insert(t, highest.into_iter().map(Row::into_case).collect());
        table
            .lowest
            .insert(t, lowest.into_iter().map(Row::into_case).collect());
        table
            .exact
            .insert(t, exact.into_iter().map(Row::into_case).collect());
    }
    table
}

/// Single levels in follow order: MahJong, 2..Ace, Phoenix, Dragon. The Dog
/// can neither follow nor be followed and stays out of the table.
fn single_levels() -> Vec<(u8, Option<u8>)> {
    let mut levels = vec![(single_follow_key(Rank::MahJong), Some(1u8))];
    for value in 2..=14u8 {
        let rank = Rank::from_value(value).expect("numeric rank");
        levels.push((single_follow_key(rank), Some(value)));
    }
    levels.push((single_follow_key(Rank::Phoenix), None));
    levels.push((single_follow_key(Rank::Dragon), Some(15)));
    levels
}

fn build_single_table() -> FigureTable {
    let levels = single_levels();
    let mut table = FigureTable::empty(FigureKind::Single, 1);
    for (index, &(key, rank)) in levels.iter().enumerate() {
        let mut highest = match rank {
            None => {
                // Phoenix on top: drawn, and the only level above it absent.
                let mut row = Row::new(PhoenixReq::Drawn);
                row.restrict(15, CountClass::exactly(0));
                row
            }
            Some(15) => {
                let mut row = Row::new(PhoenixReq::Free);
                row.restrict(15, CountClass::at_least(1));
                row
            }
            Some(r) => {
                let mut row = Row::new(PhoenixReq::Absent);
                row.restrict(r, CountClass::at_least(1));
                row
            }
        };
        if rank.is_some() && rank != Some(15) {
            for &(_, above) in &levels[index + 1..] {
                if let Some(above_rank) = above {
                    highest.restrict(above_rank, CountClass::exactly(0));
                }
            }
        }
        table.highest.insert(key, vec![highest.into_case()]);

        let mut lowest = match rank {
            None => Row::new(PhoenixReq::Drawn),
            Some(15) => {
                let mut row = Row::new(PhoenixReq::Absent);
                row.restrict(15, CountClass::at_least(1));
                row
            }
            Some(r) => {
                let mut row = Row::new(PhoenixReq::Free);
                row.restrict(r, CountClass::at_least(1));
                row
            }
        };
        for &(_, below) in &levels[..index] {
            if let Some(below_rank) = below {
                lowest.restrict(below_rank, CountClass::exactly(0));
            }
        }
        table.lowest.insert(key, vec![lowest.into_case()]);

        let exact = match rank {
            None => Row::new(PhoenixReq::Drawn),
            Some(r) => {
                let mut row = Row::new(PhoenixReq::Free);
                row.restrict(r, CountClass::at_least(1));
                row
            }
        };
        table.exact.insert(key, vec![exact.into_case()]);
    }
    table
}

/// Splits `∃ rank q != excluded with count >= min_count` into disjoint cases
/// by the highest such q, on top of the constraints already in `base`.
fn exists_at_least(base: &Row, excluded: u8, min_count: u8) -> Vec<Row> {
    let mut out = Vec::new();
    for q in (2..=14u8).rev() {
        if q == excluded {
            continue;
        }
        let mut row = base.clone();
        if !row.restrict(q, CountClass::at_least(min_count)) {
            continue;
        }
        let mut feasible = true;
        for r in q + 1..=14 {
            if r == excluded {
                continue;
            }
            if !row.restrict(r, CountClass::at_most(min_count - 1)) {
                feasible = false;
                break;
            }
        }
        if feasible {
            out.push(row);
        }
    }
    out
}

fn build_full_house_table() -> FigureTable {
    let mut table = FigureTable::empty(FigureKind::FullHouse, 5);
    for t in 2..=14u8 {
        // natural triple, phoenix-assisted triple, phoenix-assisted pair
        let bases = |blocked: Option<std::ops::Range<u8>>| -> Vec<Row> {
            let mut rows = Vec::new();
            let specs: [(PhoenixReq, CountClass, u8, u8); 3] = [
                (PhoenixReq::Absent, CountClass::at_least(3), 2, 2),
                (PhoenixReq::Drawn, CountClass::exactly(2), 2, 1),
                (PhoenixReq::Drawn, CountClass::at_least(3), 1, 1),
            ];
            for (phoenix, triple_class, pair_min, block_max) in specs {
                let mut base = Row::new(phoenix);
                base.restrict(t, triple_class);
                let mut feasible = true;
                if let Some(range) = blocked.clone() {
                    for r in range {
                        if r == t {
                            continue;
                        }
                        if !base.restrict(r, CountClass::at_most(block_max)) {
                            feasible = false;
                            break;
                        }
                    }
                }
                if feasible {
                    rows.extend(exists_at_least(&base, t, pair_min));
                }
            }
            rows
        };

        let exact = bases(None);
        let highest = bases(Some(t + 1..15));
        let lowest = bases(Some(2..t));

        table
            .exact
            .insert(t, exact.into_iter().map(Row::into_case).collect());
        table
            .highest
            .insert(t, highest.into_iter().map(Row::into_case).collect());
        table
            .lowest
            .insert(t, lowest.into_iter().map(Row::into_case).collect());
    }
    table
}

fn class_pairs_satisfied(mask: u8) -> bool {
    mask != 0 && mask & CountClass::at_most(1).0 == 0
}

/// Whether a fully-assigned stair window is playable for hands matching the
/// row: every rank paired, or exactly one single completed by the Phoenix.
fn stair_window_threat(row: &Row, lo: u8, hi: u8) -> bool {
    let mut deficits = 0u8;
    for r in lo..=hi {
        let mask = row.classes[r as usize];
        if class_pairs_satisfied(mask) {
            continue;
        }
        if row.phoenix == PhoenixReq::Drawn && mask == CountClass::exactly(1).0 {
            deficits += 1;
            if deficits > 1 {
                return false;
            }
            continue;
        }
        return false;
    }
    true
}

/// Whether a fully-assigned street window is playable: all ranks present, or
/// exactly one interior rank bridged by the Phoenix.
fn street_window_threat(row: &Row, lo: u8, hi: u8) -> bool {
    let mut missing = None;
    for r in lo..=hi {
        let mask = row.classes[r as usize];
        if mask == 0 {
            return false;
        }
        if mask == CountClass::exactly(0).0 {
            if row.phoenix != PhoenixReq::Drawn || missing.is_some() || r == lo || r == hi {
                return false;
            }
            missing = Some(r);
        } else if mask & 1 != 0 {
            // class admits zero cards, presence is not certain
            return false;
        }
    }
    true
}

struct RunEnum<'a, F: Fn(&Row, u8) -> bool> {
    choices: &'a [CountClass],
    threat_at: F,
    out: Vec<Row>,
}

impl<'a, F: Fn(&Row, u8) -> bool> RunEnum<'a, F> {
    /// Assigns classes over `ranks` in order, pruning prefixes that already
    /// admit a qualifying window, and collects surviving rows.
    fn run(&mut self, row: &mut Row, ranks: &[u8], leaf_check: &dyn Fn(&Row) -> bool) {
        let Some((&rank, rest)) = ranks.split_first() else {
            if leaf_check(row) {
                self.out.push(row.clone());
            }
            return;
        };
        let choices = self.choices;
        for &class in choices {
            row.classes[rank as usize] = class.0;
            if !(self.threat_at)(row, rank) {
                self.run(row, rest, leaf_check);
            }
        }
        row.classes[rank as usize] = FULL_CLASS;
    }
}

fn build_stair_table(length: u8) -> FigureTable {
    let m = length / 2;
    let mut table = FigureTable::empty(FigureKind::Stair, length);
    for t in m + 1..=14u8 {
        let w_lo = t - m + 1;
        let mut subcases: Vec<(PhoenixReq, Option<u8>)> =
            vec![(PhoenixReq::Absent, None), (PhoenixReq::Drawn, None)];
        for w in w_lo..=t {
            subcases.push((PhoenixReq::Drawn, Some(w)));
        }

        let mut exact = Vec::new();
        let mut highest = Vec::new();
        let mut lowest = Vec::new();
        for &(phoenix, gap) in &subcases {
            let mut window = Row::new(phoenix);
            for w in w_lo..=t {
                let class = if Some(w) == gap {
                    CountClass::exactly(1)
                } else {
                    CountClass::at_least(2)
                };
                window.restrict(w, class);
            }
            exact.push(window.clone());

            let natural = [CountClass::at_most(1), CountClass::at_least(2)];
            let with_phoenix = [
                CountClass::exactly(0),
                CountClass::exactly(1),
                CountClass::at_least(2),
            ];
            let choices: &[CountClass] = if phoenix == PhoenixReq::Drawn {
                &with_phoenix
            } else {
                &natural
            };

            // no playable window topping out above t
            let up_ranks: Vec<u8> = (t + 1..=14).collect();
            let mut walker = RunEnum {
                choices,
                threat_at: |row: &Row, rank: u8| {
                    rank >= m + 1 && stair_window_threat(row, rank - m + 1, rank)
                },
                out: Vec::new(),
            };
            walker.run(&mut window.clone(), &up_ranks, &|_| true);
            highest.extend(walker.out);

            // no playable window topping out below t
            let down_ranks: Vec<u8> = (2..=t.saturating_sub(m)).collect();
            let down_hi = t.saturating_sub(m);
            let mut walker = RunEnum {
                choices,
                threat_at: |row: &Row, rank: u8| {
                    rank >= m + 1 && rank - m + 1 >= 2 && stair_window_threat(row, rank - m + 1, rank)
                },
                out: Vec::new(),
            };
            let straddle_check = |row: &Row| {
                for top in (m + 1).max(down_hi + 1)..t {
                    if stair_window_threat(row, top - m + 1, top) {
                        return false;
                    }
                }
                true
            };
            walker.run(&mut window.clone(), &down_ranks, &straddle_check);
            lowest.extend(walker.out);
        }

        table
            .exact
            .insert(t, exact.into_iter().map(Row::into_case).collect());
        table
            .highest
            .insert(t, highest.into_iter().map(Row::into_case).collect());
        table
            .lowest
            .insert(t, lowest.into_iter().map(Row::into_case).collect());
    }
    table
}

fn build_street_table(length: u8) -> FigureTable {
    let mut table = FigureTable::empty(FigureKind::Street, length);
    for t in length..=14u8 {
        let w_lo = t - length + 1;
        let mut subcases: Vec<(PhoenixReq, Option<u8>)> =
            vec![(PhoenixReq::Absent, None), (PhoenixReq::Drawn, None)];
        for w in w_lo + 1..t {
            subcases.push((PhoenixReq::Drawn, Some(w)));
        }

        let mut exact = Vec::new();
        let mut highest = Vec::new();
        let mut lowest = Vec::new();
        for &(phoenix, gap) in &subcases {
            let mut window = Row::new(phoenix);
            for w in w_lo..=t {
                let class = if Some(w) == gap {
                    CountClass::exactly(0)
                } else {
                    CountClass::at_least(1)
                };
                window.restrict(w, class);
            }
            // the natural window needs no phoenix split for the exact family
            if gap.is_some() || phoenix == PhoenixReq::Absent {
                let mut witness = window.clone();
                if gap.is_none() {
                    witness.phoenix = PhoenixReq::Free;
                }
                exact.push(witness);
            }

            let choices = [CountClass::exactly(0), CountClass::at_least(1)];

            let up_ranks: Vec<u8> = (t + 1..=14).collect();
            let mut walker = RunEnum {
                choices: &choices,
                threat_at: |row: &Row, rank: u8| {
                    rank >= length && street_window_threat(row, rank - length + 1, rank)
                },
                out: Vec::new(),
            };
            walker.run(&mut window.clone(), &up_ranks, &|_| true);
            highest.extend(walker.out);

            let down_hi = t.saturating_sub(length);
            let down_ranks: Vec<u8> = (1..=down_hi).collect();
            let mut walker = RunEnum {
                choices: &choices,
                threat_at: |row: &Row, rank: u8| {
                    rank >= length && street_window_threat(row, rank - length + 1, rank)
                },
                out: Vec::new(),
            };
            let straddle_check = |row: &Row| {
                for top in length.max(down_hi + 1)..t {
                    if street_window_threat(row, top - length + 1, top) {
                        return false;
                    }
                }
                true
            };
            walker.run(&mut window.clone(), &down_ranks, &straddle_check);
            lowest.extend(walker.out);
        }

        table
            .exact
            .insert(t, exact.into_iter().map(Row::into_case).collect());
        table
            .highest
            .insert(t, highest.into_iter().map(Row::into_case).collect());
        table
            .lowest
            .insert(t, lowest.into_iter().map(Row::into_case).collect());
    }
    table
}

/// Trims ranks that cannot affect the outcome: disjoint cases identical
/// everywhere but one rank collapse into one case with the merged class.
fn merge_cases(mut cases: Vec<CountCase>) -> Vec<CountCase> {
    loop {
        let mut changed = false;
        let ranks: BTreeSet<u8> = cases
            .iter()
            .flat_map(|case| case.reqs.iter().map(|&(rank, _)| rank))
            .collect();
        for &rank in &ranks {
            let mut groups: HashMap<(PhoenixReq, Vec<(u8, u8)>), Vec<u8>> = HashMap::new();
            for case in &cases {
                let rest: Vec<(u8, u8)> = case
                    .reqs
                    .iter()
                    .filter(|&&(r, _)| r != rank)
                    .map(|&(r, class)| (r, class.0))
                    .collect();
                let mask = case
                    .reqs
                    .iter()
                    .find(|&&(r, _)| r == rank)
                    .map(|&(_, class)| class.0)
                    .unwrap_or(FULL_CLASS);
                groups.entry((case.phoenix, rest)).or_default().push(mask);
            }
            let mergeable = groups.values().any(|masks| {
                masks.len() > 1 && {
                    let combined: u8 = masks.iter().fold(0, |acc, &m| acc | m);
                    combined.count_ones() == masks.iter().map(|m| m.count_ones()).sum::<u32>()
                }
            });
            if !mergeable {
                continue;
            }
            let mut merged = Vec::new();
            for ((phoenix, rest), masks) in groups {
                let combined: u8 = masks.iter().fold(0, |acc, &m| acc | m);
                let disjoint =
                    combined.count_ones() == masks.iter().map(|m| m.count_ones()).sum::<u32>();
                if masks.len() > 1 && disjoint {
                    let mut reqs: Vec<(u8, CountClass)> = rest
                        .iter()
                        .map(|&(r, mask)| (r, CountClass(mask)))
                        .collect();
                    if combined != FULL_CLASS {
                        reqs.push((rank, CountClass(combined)));
                    }
                    reqs.sort_by_key(|&(r, _)| r);
                    merged.push(CountCase {
                        reqs,
                        phoenix,
                    });
                    changed = true;
                } else {
                    for mask in masks {
                        let mut reqs: Vec<(u8, CountClass)> = rest
                            .iter()
                            .map(|&(r, m)| (r, CountClass(m)))
                            .collect();
                        if mask != FULL_CLASS {
                            reqs.push((rank, CountClass(mask)));
                        }
                        reqs.sort_by_key(|&(r, _)| r);
                        merged.push(CountCase { reqs, phoenix });
                    }
                }
            }
            merged.sort();
            cases = merged;
        }
        if !changed {
            cases.sort();
            return cases;
        }
    }
}
