pub mod algorithm;

pub use algorithm::{calculate_score, rank, MatchScore, RankedMatch};
