pub mod analysis;
pub mod args;
pub mod cache;
pub mod engine;
pub mod rank;
pub mod report;
pub mod scoring;
pub mod snapshot;
pub mod source;
pub mod text;
pub mod utils;

pub use args::Args;
pub use engine::{analyze_relationship, classify, follow_score, total_score, ScoreEngine, Weights};
pub use report::{AnalysisOutcome, RelationshipLevel, RelationshipReport};
pub use snapshot::{AccountSnapshot, RawSnapshot};
