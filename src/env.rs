//! Typed environment-variable accessors.
//!
//! Every accessor takes a key and a default. The default is used only when
//! the variable is absent. A variable that is present but does not parse is a
//! deployment mistake, so the plain accessors log it and panic at startup
//! rather than quietly falling back. The `try_` variants return the error.
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use strata::env;
//!
//! let port = env::get_int("PORT", 3000);
//! let debug = env::get_bool("DEBUG", false);
//! let grace = env::get_duration("SHUTDOWN_GRACE", Duration::from_secs(30));
//! ```

use std::ffi::OsString;
use std::time::Duration;

use tracing::error;

/// A variable that is set but cannot be read as the requested type.
#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    #[error("environment variable {key}={value:?} cannot be converted to {kind}")]
    Invalid { key: String, value: String, kind: &'static str },

    #[error("environment variable {key}={value:?} is not valid unicode")]
    NotUnicode { key: String, value: OsString },
}

pub fn try_get_int(key: &str, default: i64) -> Result<i64, EnvError> {
    lookup(key, default, "an int", |raw| raw.parse().ok())
}

pub fn try_get_string(key: &str, default: &str) -> Result<String, EnvError> {
    lookup(key, default.to_owned(), "a string", |raw| Some(raw.to_owned()))
}

pub fn try_get_float(key: &str, default: f64) -> Result<f64, EnvError> {
    lookup(key, default, "a float", |raw| raw.parse().ok())
}

pub fn try_get_bool(key: &str, default: bool) -> Result<bool, EnvError> {
    lookup(key, default, "a bool", parse_bool)
}

pub fn try_get_duration(key: &str, default: Duration) -> Result<Duration, EnvError> {
    lookup(key, default, "a duration", parse_duration)
}

pub fn get_int(key: &str, default: i64) -> i64 {
    try_get_int(key, default).unwrap_or_else(|e| fatal(e))
}

pub fn get_string(key: &str, default: &str) -> String {
    try_get_string(key, default).unwrap_or_else(|e| fatal(e))
}

pub fn get_float(key: &str, default: f64) -> f64 {
    try_get_float(key, default).unwrap_or_else(|e| fatal(e))
}

pub fn get_bool(key: &str, default: bool) -> bool {
    try_get_bool(key, default).unwrap_or_else(|e| fatal(e))
}

pub fn get_duration(key: &str, default: Duration) -> Duration {
    try_get_duration(key, default).unwrap_or_else(|e| fatal(e))
}

fn lookup<T>(
    key: &str,
    default: T,
    kind: &'static str,
    parse: impl FnOnce(&str) -> Option<T>,
) -> Result<T, EnvError> {
    let Some(raw) = std::env::var_os(key) else {
        return Ok(default);
    };
    let raw = raw.into_string()
        .map_err(|value| EnvError::NotUnicode { key: key.to_owned(), value })?;
    parse(&raw).ok_or_else(|| EnvError::Invalid { key: key.to_owned(), value: raw, kind })
}

fn fatal(e: EnvError) -> ! {
    error!(error = %e, "invalid configuration");
    panic!("{e}");
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

// ── Durations ─────────────────────────────────────────────────────────────────

const NANOS_PER_UNIT: &[(&str, u128)] = &[
    ("ns", 1),
    ("us", 1_000),
    ("µs", 1_000),
    ("μs", 1_000),
    ("ms", 1_000_000),
    ("s", 1_000_000_000),
    ("m", 60_000_000_000),
    ("h", 3_600_000_000_000),
];

/// Parses `"300ms"`, `"1.5h"`, `"2h45m"`. A bare `"0"` is zero. Negative
/// values are rejected unless they are zero.
fn parse_duration(raw: &str) -> Option<Duration> {
    let (negative, mut rest) = match raw.as_bytes().first()? {
        b'-' => (true, &raw[1..]),
        b'+' => (false, &raw[1..]),
        _ => (false, raw),
    };
    if rest == "0" {
        return Some(Duration::ZERO);
    }
    if rest.is_empty() {
        return None;
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let int_len = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        let (int_part, after) = rest.split_at(int_len);

        let (frac_part, after) = match after.strip_prefix('.') {
            Some(tail) => {
                let len = tail.find(|c: char| !c.is_ascii_digit()).unwrap_or(tail.len());
                tail.split_at(len)
            }
            None => ("", after),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }

        let unit_len = after.find(|c: char| c.is_ascii_digit() || c == '.').unwrap_or(after.len());
        let (unit, after) = after.split_at(unit_len);
        let &(_, scale) = NANOS_PER_UNIT.iter().find(|(name, _)| *name == unit)?;

        let whole: u128 = if int_part.is_empty() { 0 } else { int_part.parse().ok()? };
        total = total.checked_add(whole.checked_mul(scale)?)?;

        // Keep enough fractional digits for nanosecond precision on hours.
        let frac_digits = &frac_part[..frac_part.len().min(19)];
        if !frac_digits.is_empty() {
            let numerator: u128 = frac_digits.parse().ok()?;
            let denominator = 10u128.pow(frac_digits.len() as u32);
            total = total.checked_add(numerator * scale / denominator)?;
        }

        rest = after;
    }

    if negative && total != 0 {
        return None;
    }
    u64::try_from(total).ok().map(Duration::from_nanos)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each test owns its variables so parallel tests never race on a key.
    fn set(key: &str, value: &str) {
        unsafe { std::env::set_var(key, value) }
    }

    #[test]
    fn int_uses_default_when_unset() {
        assert_eq!(get_int("STRATA_TEST_PORT_UNSET", 8080), 8080);
    }

    #[test]
    fn int_reads_value_when_set() {
        set("STRATA_TEST_PORT_SET", "9090");
        assert_eq!(get_int("STRATA_TEST_PORT_SET", 8080), 9090);
    }

    #[test]
    #[should_panic(expected = "cannot be converted to an int")]
    fn int_panics_on_garbage() {
        set("STRATA_TEST_PORT_BAD", "abc");
        get_int("STRATA_TEST_PORT_BAD", 8080);
    }

    #[test]
    fn try_variant_returns_error() {
        set("STRATA_TEST_RATIO_BAD", "half");
        let err = try_get_float("STRATA_TEST_RATIO_BAD", 0.5).unwrap_err();
        assert!(matches!(err, EnvError::Invalid { kind: "a float", .. }));
    }

    #[test]
    fn empty_value_is_not_a_default() {
        set("STRATA_TEST_EMPTY_INT", "");
        assert!(try_get_int("STRATA_TEST_EMPTY_INT", 1).is_err());
        set("STRATA_TEST_EMPTY_STR", "");
        assert_eq!(get_string("STRATA_TEST_EMPTY_STR", "fallback"), "");
    }

    #[test]
    fn bool_accepts_the_usual_spellings() {
        for raw in ["1", "t", "TRUE", "True"] {
            assert_eq!(parse_bool(raw), Some(true), "{raw}");
        }
        for raw in ["0", "f", "FALSE", "false"] {
            assert_eq!(parse_bool(raw), Some(false), "{raw}");
        }
        assert_eq!(parse_bool("yes"), None);
    }

    #[test]
    fn duration_syntax() {
        assert_eq!(parse_duration("0"), Some(Duration::ZERO));
        assert_eq!(parse_duration("300ms"), Some(Duration::from_millis(300)));
        assert_eq!(parse_duration("1.5s"), Some(Duration::from_millis(1500)));
        assert_eq!(parse_duration("2h45m"), Some(Duration::from_secs(2 * 3600 + 45 * 60)));
        assert_eq!(parse_duration(".5m"), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration("10µs"), Some(Duration::from_micros(10)));
        assert_eq!(parse_duration("-0s"), Some(Duration::ZERO));
    }

    #[test]
    fn duration_rejects_malformed_input() {
        for raw in ["", "5", "ms", "1x", "-1s", "1..5s", "+"] {
            assert_eq!(parse_duration(raw), None, "{raw:?}");
        }
    }

    #[test]
    fn duration_accessor_uses_default() {
        let d = get_duration("STRATA_TEST_GRACE_UNSET", Duration::from_secs(30));
        assert_eq!(d, Duration::from_secs(30));
    }
}
