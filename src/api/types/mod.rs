//! HTTP request, response and error types

pub mod error;
pub mod json;
pub mod lab;

pub use error::{ApiError, ApiErrorResponse, ApiErrorType};
pub use json::Json;
pub use lab::{
    AnalyzeRequest, BaselineRequest, CallSample, CompareBaselineRequest, CreateSessionRequest,
    PriceRequest, PurgeResponse, StoreKeyRequest, StrategyInfo, SuggestionsRequest,
    SuggestionsResponse, context_from_records, samples_into_records,
};
