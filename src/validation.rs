use crate::errors::{ApiError, Entity};
use regex::Regex;
use std::sync::LazyLock;
use validator::{Validate, ValidationErrors};

/// `local@domain.tld`: no whitespace anywhere, exactly one `@`, and a dot
/// somewhere after it.
pub static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

pub const INVALID_EMAIL: &str = "Invalid email format.";
pub const INVALID_BODY: &str = "Request body is missing or invalid.";

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Largest integer an `f64` holds exactly (2^53).
const MAX_EXACT_F64: f64 = 9_007_199_254_740_992.0;

/// Parses a path segment as a base-10 identifier.
///
/// A segment that is not a number at all is a 400. A number that cannot be
/// an identifier (negative, zero, fractional) is reported as not found,
/// since no document can carry it.
pub fn parse_id(raw: &str, entity: Entity) -> Result<u64, ApiError> {
    if let Ok(id) = raw.parse::<u64>() {
        return if id == 0 {
            Err(ApiError::NotFound(entity))
        } else {
            Ok(id)
        };
    }

    let value = raw
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ApiError::invalid_id(entity))?;

    if value >= 1.0 && value <= MAX_EXACT_F64 && value.fract() == 0.0 {
        Ok(value as u64)
    } else {
        Err(ApiError::NotFound(entity))
    }
}

/// Runs the derived rules and reports the first failing message.
pub fn check(payload: &impl Validate) -> Result<(), ApiError> {
    payload
        .validate()
        .map_err(|e| ApiError::ValidationError(first_message(&e)))
}

/// Picks one message out of a set of field errors, ordered by field name so
/// the response is stable.
pub fn first_message(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .into_iter()
        .flat_map(|(_, errs)| errs.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| errors.to_string())
}
