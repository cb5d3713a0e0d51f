//! API request/response envelopes

pub mod response;

pub use response::{DataResponse, ListResponse};

use axum::Json;
use axum_extra::extract::WithRejection;

use crate::error::ApiError;

/// JSON body whose parse failures are reported as `VALIDATION_ERROR`.
pub type ValidJson<T> = WithRejection<Json<T>, ApiError>;
