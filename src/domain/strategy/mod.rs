//! Optimization strategies
//!
//! A closed set of savings heuristics, a name-keyed registry that ranks them
//! for a usage context, and the suggester that maps analysis flags onto them.

mod builtin;
mod context;
mod registry;
mod suggester;

pub use builtin::{OptimizationStrategy, StrategyCategory, StrategyResult, compress_text};
pub use context::StrategyContext;
pub use registry::{StrategyRanking, StrategyRegistry, priority, rank};
pub use suggester::{Impact, OptimizationSuggester, OptimizationSuggestion};
