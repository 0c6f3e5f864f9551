//! Infrastructure services

mod lab_service;

pub use lab_service::{LabCallOutcome, LabCallRequest, LabService};
