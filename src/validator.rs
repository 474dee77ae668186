//! Input validation.
//!
//! [`Validator`] collects free-form errors and at most one error per field.
//! It never fails on its own: the handler checks [`has_errors`](Validator::has_errors)
//! and decides what to send back, usually the validator itself as a `422`.
//!
//! ```rust
//! use strata::validator::{self, Validator};
//!
//! let mut v = Validator::new();
//! v.check_field(validator::not_blank(""), "name", "must be provided");
//! v.check_field(validator::is_email("nope"), "email", "must be a valid address");
//! assert!(v.has_errors());
//! ```
//!
//! The free functions are plain predicates and work without a validator.

use std::collections::{BTreeMap, HashSet};
use std::hash::Hash;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::response::{IntoResponse, Response};
use crate::Status;

/// Accumulated validation errors.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Validator {
    pub errors: Vec<String>,
    pub field_errors: BTreeMap<String, String>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty() || !self.field_errors.is_empty()
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Records `message` for `key` unless the key already has one.
    pub fn add_field_error(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.field_errors.entry(key.into()).or_insert_with(|| message.into());
    }

    pub fn check(&mut self, ok: bool, message: impl Into<String>) {
        if !ok {
            self.add_error(message);
        }
    }

    pub fn check_field(&mut self, ok: bool, key: impl Into<String>, message: impl Into<String>) {
        if !ok {
            self.add_field_error(key, message);
        }
    }
}

/// `422 Unprocessable Content` with the errors as a JSON body:
/// `{"errors":[...],"field_errors":{"email":"..."}}`.
impl IntoResponse for Validator {
    fn into_response(self) -> Response {
        match serde_json::to_vec(&self) {
            Ok(body) => Response::builder().status(Status::UNPROCESSABLE_ENTITY).json(body),
            Err(_) => Response::status(Status::INTERNAL_SERVER_ERROR),
        }
    }
}

// ── Predicates ────────────────────────────────────────────────────────────────

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("email pattern is valid")
});

/// Not empty after trimming whitespace.
pub fn not_blank(value: &str) -> bool {
    !value.trim().is_empty()
}

/// At least `n` characters (Unicode scalar values, not bytes).
pub fn min_chars(value: &str, n: usize) -> bool {
    value.chars().count() >= n
}

/// At most `n` characters.
pub fn max_chars(value: &str, n: usize) -> bool {
    value.chars().count() <= n
}

/// `min <= value <= max`.
pub fn between<T: PartialOrd>(value: T, min: T, max: T) -> bool {
    value >= min && value <= max
}

pub fn matches(value: &str, rx: &Regex) -> bool {
    rx.is_match(value)
}

/// `value` is one of `safelist`.
pub fn is_in<T: PartialEq>(value: &T, safelist: &[T]) -> bool {
    safelist.contains(value)
}

/// Every element of `values` is in `safelist`.
pub fn all_in<T: PartialEq>(values: &[T], safelist: &[T]) -> bool {
    values.iter().all(|v| safelist.contains(v))
}

/// `value` is none of `blocklist`.
pub fn not_in<T: PartialEq>(value: &T, blocklist: &[T]) -> bool {
    !blocklist.contains(value)
}

pub fn no_duplicates<T: Eq + Hash>(values: &[T]) -> bool {
    let mut seen = HashSet::with_capacity(values.len());
    values.iter().all(|v| seen.insert(v))
}

/// At most 254 bytes and shaped like `local@domain`.
pub fn is_email(value: &str) -> bool {
    value.len() <= 254 && EMAIL.is_match(value)
}

/// An absolute URL with both a scheme and a host.
pub fn is_url(value: &str) -> bool {
    url::Url::parse(value)
        .map(|u| u.host_str().is_some_and(|h| !h.is_empty()))
        .unwrap_or(false)
}

/// Non-empty and made only of letters and digits.
pub fn is_alphanumeric(value: &str) -> bool {
    !value.is_empty() && value.chars().all(char::is_alphanumeric)
}

/// Non-empty and every character is lowercase.
pub fn is_lowercase(value: &str) -> bool {
    !value.is_empty() && value.chars().all(char::is_lowercase)
}

/// Non-empty and every character is uppercase.
pub fn is_uppercase(value: &str) -> bool {
    !value.is_empty() && value.chars().all(char::is_uppercase)
}

/// Equality whose running time depends only on the lengths of the inputs.
pub fn is_equal(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// A calendar-valid `YYYY-MM-DD` date.
pub fn is_date(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return false;
    }
    let number = |range: std::ops::Range<usize>| {
        bytes[range].iter().try_fold(0u32, |acc, &b| {
            b.is_ascii_digit().then(|| acc * 10 + u32::from(b - b'0'))
        })
    };
    let (Some(year), Some(month), Some(day)) = (number(0..4), number(5..7), number(8..10)) else {
        return false;
    };
    (1..=12).contains(&month) && day >= 1 && day <= days_in_month(year, month)
}

fn days_in_month(year: u32, month: u32) -> u32 {
    match month {
        2 if year % 4 == 0 && (year % 100 != 0 || year % 400 == 0) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}
