//! Infrastructure layer - Gateway adapters, storage backends and services

pub mod api_key;
pub mod baseline;
pub mod call;
pub mod gateway;
pub mod logging;
pub mod observability;
pub mod sandbox;
pub mod services;
pub mod storage;
