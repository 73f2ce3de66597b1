// Expectation primitives: the assertions every contract case is built from

use crate::booking::BookingRecord;
use crate::client::{ApiError, ApiResponse};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Status codes a call may legitimately answer with.
///
/// The remote is inconsistent between endpoints (401 vs 403, 200 vs 201), so
/// several expectations accept more than one code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    Exactly(u16),
    OneOf(&'static [u16]),
}

impl Expected {
    pub const UNAUTHORIZED: Expected = Expected::OneOf(&[401, 403]);
    pub const DELETED: Expected = Expected::OneOf(&[200, 201]);

    pub fn matches(&self, status: u16) -> bool {
        match self {
            Expected::Exactly(code) => *code == status,
            Expected::OneOf(codes) => codes.contains(&status),
        }
    }
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expected::Exactly(code) => write!(f, "{}", code),
            Expected::OneOf(codes) => {
                let joined: Vec<String> = codes.iter().map(|c| c.to_string()).collect();
                f.write_str(&joined.join("|"))
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum ContractViolation {
    #[error("{operation}: expected status {expected}, got {actual} ({body})")]
    UnexpectedStatus {
        operation: &'static str,
        expected: Expected,
        actual: u16,
        body: String,
    },

    #[error("{operation}: unexpected body shape: {detail}")]
    ShapeMismatch {
        operation: &'static str,
        detail: String,
    },

    #[error("field {field}: expected {expected:?}, got {actual:?}")]
    FieldMismatch {
        field: &'static str,
        expected: String,
        actual: String,
    },

    #[error("{operation}: took {elapsed_ms}ms, limit is {limit_ms}ms")]
    TooSlow {
        operation: &'static str,
        elapsed_ms: u128,
        limit_ms: u128,
    },

    #[error(transparent)]
    Api(#[from] ApiError),
}

// Long error pages would drown the useful part of the message
fn excerpt(body: &str) -> String {
    const LIMIT: usize = 200;
    match body.char_indices().nth(LIMIT) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

pub fn expect_status(
    operation: &'static str,
    response: &ApiResponse,
    expected: Expected,
) -> Result<(), ContractViolation> {
    if expected.matches(response.status) {
        Ok(())
    } else {
        Err(ContractViolation::UnexpectedStatus {
            operation,
            expected,
            actual: response.status,
            body: excerpt(&response.body),
        })
    }
}

fn body_json(operation: &'static str, response: &ApiResponse) -> Result<Value, ContractViolation> {
    response
        .json_value()
        .map_err(|e| ContractViolation::ShapeMismatch {
            operation,
            detail: e.to_string(),
        })
}

/// The body must be exactly `expected`, no more and no fewer keys.
pub fn expect_exact_json(
    operation: &'static str,
    response: &ApiResponse,
    expected: &Value,
) -> Result<(), ContractViolation> {
    let actual = body_json(operation, response)?;
    if &actual == expected {
        Ok(())
    } else {
        Err(ContractViolation::ShapeMismatch {
            operation,
            detail: format!("expected {}, got {}", expected, actual),
        })
    }
}

pub fn expect_array(
    operation: &'static str,
    response: &ApiResponse,
) -> Result<Vec<Value>, ContractViolation> {
    match body_json(operation, response)? {
        Value::Array(items) => Ok(items),
        other => Err(ContractViolation::ShapeMismatch {
            operation,
            detail: format!("expected a JSON array, got {}", json_kind(&other)),
        }),
    }
}

pub fn expect_field<'a>(
    operation: &'static str,
    body: &'a Value,
    field: &str,
) -> Result<&'a Value, ContractViolation> {
    body.get(field)
        .ok_or_else(|| ContractViolation::ShapeMismatch {
            operation,
            detail: format!("missing field {:?}", field),
        })
}

/// Strictly below `limit`; a property of the call, not a timeout.
pub fn expect_within(
    operation: &'static str,
    response: &ApiResponse,
    limit: Duration,
) -> Result<(), ContractViolation> {
    if response.elapsed < limit {
        Ok(())
    } else {
        Err(ContractViolation::TooSlow {
            operation,
            elapsed_ms: response.elapsed.as_millis(),
            limit_ms: limit.as_millis(),
        })
    }
}

fn expect_eq(field: &'static str, expected: &str, actual: &str) -> Result<(), ContractViolation> {
    if expected == actual {
        Ok(())
    } else {
        Err(ContractViolation::FieldMismatch {
            field,
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }
}

/// Identity of a booking: names and stay dates. Price and extras are not compared.
pub fn expect_same_booking(
    expected: &BookingRecord,
    actual: &BookingRecord,
) -> Result<(), ContractViolation> {
    expect_eq("firstname", &expected.firstname, &actual.firstname)?;
    expect_eq("lastname", &expected.lastname, &actual.lastname)?;
    expect_eq(
        "bookingdates.checkin",
        &expected.bookingdates.checkin,
        &actual.bookingdates.checkin,
    )?;
    expect_eq(
        "bookingdates.checkout",
        &expected.bookingdates.checkout,
        &actual.bookingdates.checkout,
    )
}

pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
