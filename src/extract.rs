//! Effective-query extraction.
//!
//! Clients may send the query either as the request body (POST) or as the
//! `q` query-string parameter (GET). The body wins when both are present.
//! A failed or absent body read is not an error; it falls through to `q`.

use crate::error::ServiceError;

/// Pick the effective query: body first, then the `q` parameter.
///
/// Values are whitespace-trimmed; a value that trims to nothing counts as
/// absent. With no usable source the request carries no query at all.
pub fn effective_query(
    body: Option<&str>,
    param: Option<&str>,
) -> Result<String, ServiceError> {
    if let Some(query) = non_empty(body) {
        return Ok(query);
    }
    if let Some(query) = non_empty(param) {
        return Ok(query);
    }
    Err(ServiceError::EmptyQuery)
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
