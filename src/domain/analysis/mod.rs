//! Token analysis

mod token_analyzer;

pub use token_analyzer::{AnalyzerThresholds, TokenAnalysis, TokenAnalyzer, TokenDistribution};
