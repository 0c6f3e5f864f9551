//! Pricing domain
//!
//! Rate tables and the per-call cost calculation shared by sessions, the cost
//! tracker and the usage simulator.

mod cost;
mod rates;

pub use cost::{
    CHARS_PER_TOKEN, CostBreakdown, TokenBreakdown, calculate_cost, estimate_tokens, round_cost,
    round_to,
};
pub use rates::{ModelRate, PricingTable, ProviderPricing, default_pricing_table};
