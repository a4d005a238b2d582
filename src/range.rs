//! Page-range validation for job submission.
//!
//! A [`PageRange`] is what the user is typing: either side may still be
//! empty. [`validate`] applies the cross-field rules in a fixed precedence
//! (first match wins):
//!
//! 1. a side is missing → [`RangeError::Incomplete`]
//! 2. `from > to` → [`RangeError::RangeOrder`]
//! 3. a side exceeds a known page count → [`RangeError::RangeBounds`]
//! 4. otherwise valid
//!
//! Bounds are only checked once the page count is known (`> 0`) so the user
//! can type a range while the document is still loading. [`check_submission`]
//! is the stricter gate used before anything is sent to the backend.

use crate::error::RangeError;
use serde::{Deserialize, Serialize};

/// A possibly incomplete, user-entered page interval (1-based, inclusive).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub from: Option<i64>,
    pub to: Option<i64>,
}

impl PageRange {
    /// A range with both sides filled in.
    pub fn new(from: i64, to: i64) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }
}

/// A complete, ordered range that fits the known page count.
///
/// Sides below 1 are field errors (see [`field_errors`]); [`validate`] raises
/// them to 1 and only [`check_submission`] rejects them. A `ValidRange` from
/// [`check_submission`] therefore lies within `1..=page_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidRange {
    pub from: u32,
    pub to: u32,
}

/// Single-field problems, shown to the user ahead of cross-field ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldError {
    /// The field is empty.
    Required,
    /// The field is below 1.
    BelowMinimum,
}

/// Per-field check results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldErrors {
    pub from: Option<FieldError>,
    pub to: Option<FieldError>,
}

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }
}

/// Apply the cross-field rules. See the module docs for precedence.
pub fn validate(range: &PageRange, page_count: u32) -> Result<ValidRange, RangeError> {
    let (Some(from), Some(to)) = (range.from, range.to) else {
        return Err(RangeError::Incomplete);
    };
    if from > to {
        return Err(RangeError::RangeOrder);
    }
    if page_count > 0 && (from > i64::from(page_count) || to > i64::from(page_count)) {
        return Err(RangeError::RangeBounds { page_count });
    }
    // Sides below 1 belong to `field_errors`.
    Ok(ValidRange {
        from: clamp_page(from),
        to: clamp_page(to),
    })
}

/// Check each field on its own.
pub fn field_errors(range: &PageRange) -> FieldErrors {
    FieldErrors {
        from: field_error(range.from),
        to: field_error(range.to),
    }
}

fn field_error(value: Option<i64>) -> Option<FieldError> {
    match value {
        None => Some(FieldError::Required),
        Some(v) if v < 1 => Some(FieldError::BelowMinimum),
        Some(_) => None,
    }
}

/// The message to show next to the range inputs, if any.
///
/// Field-level problems win over cross-field ones. An incomplete range is not
/// an error worth showing, so it produces `None` unless a filled-in field is
/// itself invalid.
pub fn message(range: &PageRange, page_count: u32) -> Option<String> {
    let fields = field_errors(range);
    for (name, err) in [("From", fields.from), ("To", fields.to)] {
        match err {
            Some(FieldError::BelowMinimum) => {
                return Some(format!("{name} page must be at least 1"));
            }
            Some(FieldError::Required) | None => {}
        }
    }
    match validate(range, page_count) {
        Ok(_) | Err(RangeError::Incomplete) => None,
        Err(e) => Some(e.to_string()),
    }
}

/// The gate in front of job submission.
///
/// On top of [`validate`] this requires a loaded document (`page_count > 0`)
/// and both fields to be at least 1.
pub fn check_submission(range: &PageRange, page_count: u32) -> Result<ValidRange, RangeError> {
    let valid = validate(range, page_count)?;
    if page_count == 0 {
        return Err(RangeError::NoDocument);
    }
    if !field_errors(range).is_empty() {
        return Err(RangeError::BelowMinimum);
    }
    Ok(valid)
}

fn clamp_page(v: i64) -> u32 {
    u32::try_from(v.max(1)).unwrap_or(u32::MAX)
}
