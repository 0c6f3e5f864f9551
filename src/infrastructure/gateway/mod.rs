//! Provider gateway adapters

mod registry;
mod simulated;

pub use registry::GatewayRegistry;
pub use simulated::{LatencyProfile, SimulatedGateway};
