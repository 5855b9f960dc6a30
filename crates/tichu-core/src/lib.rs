#![deny(warnings)]
pub mod combi;
pub mod model;
pub mod prob;

pub use combi::generator::{Combination, enumerate_combinations};
pub use combi::partition::{Partition, PartitionSearch, enumerate_partitions, partition_quality};
pub use model::card::Card;
pub use model::figure::{Figure, FigureKind};
pub use model::hand::Hand;
pub use model::rank::Rank;
pub use model::suit::Suit;
pub use prob::engine::{CombiStats, ProbError, ProbRange, ProbabilityEngine};
pub use prob::pool::UnseenPool;
pub use prob::provider::{CachedTableProvider, TableProvider};
