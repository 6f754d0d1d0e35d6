//! `application/problem+json` responses.
//!
//! Web layers call [`exception_response`] from their error handler: any
//! recoverable problem becomes a response carrying its wire form and status,
//! and everything else (bugs, foreign errors) becomes an opaque 500 so that
//! internals never reach the client.

use crate::problem::Problem;
use crate::roots::{BUG, ERROR};
use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::{Response, StatusCode};
use indexmap::IndexMap;
use std::error::Error as StdError;

/// Media type of RFC 7807 bodies.
pub const PROBLEM_JSON: &str = "application/problem+json";

/// Builds the response for a problem: body is its wire form, status is its
/// status code.
#[must_use]
pub fn problem_response(problem: &Problem) -> Response<Bytes> {
    let status =
        StatusCode::from_u16(problem.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = Response::new(Bytes::from(problem.to_json()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(PROBLEM_JSON));
    response
}

/// Builds the response for any error leaving a request handler.
#[must_use]
pub fn exception_response(error: &(dyn StdError + 'static)) -> Response<Bytes> {
    match error.downcast_ref::<Problem>() {
        Some(problem) if problem.is_a(&ERROR) => problem_response(problem),
        _ => {
            tracing::error!(error = %error, "unhandled error mapped to 500");
            problem_response(&Problem::trusted(&BUG, IndexMap::new()))
        }
    }
}
