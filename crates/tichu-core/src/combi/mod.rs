pub mod generator;
pub mod partition;
