//! The static template function set
//!
//! Everything here is deterministic except `Now`, `NowFmt` and
//! `RandomString` (registered by the engine, which owns the random source).
//! Decode and parse helpers fail closed: bad input gives an empty string or
//! zero rather than aborting the render.

use base64::Engine as _;
use chrono::{SecondsFormat, Utc};
use minijinja::{Error, ErrorKind, Value};
use rand::Rng;

use crate::number::{Number, Op};

/// Characters `RandomString` draws from when no charset is given
pub const DEFAULT_RANDOM_CHARSET: &str =
    "_ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Current UTC time, RFC3339
pub fn now() -> String {
    now_fmt(None)
}

/// Current UTC time in a Go reference-time layout (`2006-01-02`)
///
/// Usage: repl{{ NowFmt("20060102") }}
pub fn now_fmt(format: Option<String>) -> String {
    let now = Utc::now();
    match format.as_deref() {
        None | Some("") => now.to_rfc3339_opts(SecondsFormat::Secs, true),
        Some(layout) => now.format(&go_layout_to_strftime(layout)).to_string(),
    }
}

/// Translate a Go time layout into a chrono format string
///
/// Times are always UTC, so `Z07:00` collapses to a literal `Z`.
pub fn go_layout_to_strftime(layout: &str) -> String {
    // Longest tokens first so "January" wins over "Jan"
    const TOKENS: &[(&str, &str)] = &[
        ("January", "%B"),
        ("Monday", "%A"),
        ("Z07:00", "Z"),
        ("-07:00", "%:z"),
        ("-0700", "%z"),
        ("2006", "%Y"),
        ("Jan", "%b"),
        ("Mon", "%a"),
        ("MST", "%Z"),
        ("01", "%m"),
        ("02", "%d"),
        ("15", "%H"),
        ("03", "%I"),
        ("04", "%M"),
        ("05", "%S"),
        ("06", "%y"),
        ("PM", "%p"),
    ];

    let mut out = String::with_capacity(layout.len() * 2);
    let mut rest = layout;

    'outer: while let Some(c) = rest.chars().next() {
        for (token, replacement) in TOKENS {
            if let Some(after) = rest.strip_prefix(token) {
                out.push_str(replacement);
                rest = after;
                continue 'outer;
            }
        }
        if c == '%' {
            out.push_str("%%");
        } else {
            out.push(c);
        }
        rest = &rest[c.len_utf8()..];
    }

    out
}

pub fn to_lower(s: String) -> String {
    s.to_lowercase()
}

pub fn to_upper(s: String) -> String {
    s.to_uppercase()
}

pub fn trim_space(s: String) -> String {
    s.trim().to_string()
}

/// Trim whitespace, or every character of `cutset` from both ends
///
/// Usage: repl{{ Trim("--x--", "-") }}
pub fn trim(s: String, cutset: Option<String>) -> String {
    match cutset {
        None => s.trim().to_string(),
        Some(cutset) => s.trim_matches(|c| cutset.contains(c)).to_string(),
    }
}

/// Query-string escape (`a b` becomes `a+b`)
pub fn url_encode(s: String) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

pub fn base64_encode(s: String) -> String {
    base64::engine::general_purpose::STANDARD.encode(s.as_bytes())
}

/// Decode standard base64, empty string on invalid input
pub fn base64_decode(s: String) -> String {
    base64::engine::general_purpose::STANDARD
        .decode(s.as_bytes())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_default()
}

/// Usage: repl{{ Split("a,b,c", ",") }}
pub fn split(s: String, sep: String) -> Vec<String> {
    if sep.is_empty() {
        return s.chars().map(String::from).collect();
    }
    s.split(sep.as_str()).map(str::to_string).collect()
}

fn arithmetic(op: Op, a: Value, b: Value) -> Result<Value, Error> {
    Number::apply(op, Number::from_value(&a), Number::from_value(&b))
        .map(Value::from)
        .map_err(|e| Error::new(ErrorKind::InvalidOperation, e.to_string()))
}

pub fn add(a: Value, b: Value) -> Result<Value, Error> {
    arithmetic(Op::Add, a, b)
}

pub fn sub(a: Value, b: Value) -> Result<Value, Error> {
    arithmetic(Op::Sub, a, b)
}

pub fn mult(a: Value, b: Value) -> Result<Value, Error> {
    arithmetic(Op::Mult, a, b)
}

pub fn div(a: Value, b: Value) -> Result<Value, Error> {
    arithmetic(Op::Div, a, b)
}

/// Accepts 1, t, T, TRUE, true, True and their false counterparts
pub fn parse_bool(s: String) -> bool {
    matches!(s.as_str(), "1" | "t" | "T" | "TRUE" | "true" | "True")
}

pub fn parse_float(s: String) -> f64 {
    s.trim().parse().unwrap_or(0.0)
}

/// Parse a signed integer; base 0 infers it from a `0x`/`0o`/`0b`/`0` prefix
///
/// Usage: repl{{ ParseInt("ff", 16) }}
pub fn parse_int(s: String, base: Option<u32>) -> i64 {
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(&s)),
    };
    let Some((digits, radix)) = split_radix(digits, base.unwrap_or(10)) else {
        return 0;
    };
    let signed = if negative {
        format!("-{}", digits)
    } else {
        digits.to_string()
    };
    i64::from_str_radix(&signed, radix).unwrap_or(0)
}

pub fn parse_uint(s: String, base: Option<u32>) -> u64 {
    split_radix(&s, base.unwrap_or(10))
        .and_then(|(digits, radix)| u64::from_str_radix(digits, radix).ok())
        .unwrap_or(0)
}

fn split_radix(s: &str, base: u32) -> Option<(&str, u32)> {
    if base != 0 {
        return (2..=36).contains(&base).then_some((s, base));
    }
    let lower = s.to_ascii_lowercase();
    if lower.starts_with("0x") {
        Some((&s[2..], 16))
    } else if lower.starts_with("0o") {
        Some((&s[2..], 8))
    } else if lower.starts_with("0b") {
        Some((&s[2..], 2))
    } else if s.len() > 1 && s.starts_with('0') {
        Some((&s[1..], 8))
    } else {
        Some((s, 10))
    }
}

/// Human readable size with decimal units and four significant digits
///
/// Usage: repl{{ HumanSize(1024) }} renders `1.024kB`
pub fn human_size(size: Value) -> String {
    const UNITS: &[&str] = &["B", "kB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

    let mut size = Number::from_value(&size).map_or(0.0, Number::as_f64);
    let mut unit = 0;
    while size >= 1000.0 && unit < UNITS.len() - 1 {
        size /= 1000.0;
        unit += 1;
    }

    format!("{}{}", format_significant(size, 4), UNITS[unit])
}

/// `%.Ng`-style formatting without exponent for the ranges `human_size` produces
fn format_significant(value: f64, digits: i32) -> String {
    if value == 0.0 || !value.is_finite() {
        return format!("{}", value);
    }
    let magnitude = value.abs().log10().floor() as i32;
    let decimals = (digits - 1 - magnitude).max(0) as usize;
    let formatted = format!("{:.*}", decimals, value);
    if formatted.contains('.') {
        formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    } else {
        formatted
    }
}

/// Expand a charset argument: a bracket class like `[a-z0-9]` or a literal set
pub fn expand_charset(spec: &str) -> Vec<char> {
    let Some(inner) = spec.strip_prefix('[').and_then(|s| s.strip_suffix(']')) else {
        return spec.chars().collect();
    };

    let chars: Vec<char> = inner.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if i + 2 < chars.len() && chars[i + 1] == '-' && chars[i] <= chars[i + 2] {
            out.extend(chars[i]..=chars[i + 2]);
            i += 3;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out.dedup();
    out
}

/// Random string of `length` characters drawn from `charset`
pub fn random_string<R: Rng + ?Sized>(rng: &mut R, length: usize, charset: &[char]) -> String {
    if charset.is_empty() {
        return String::new();
    }
    (0..length)
        .map(|_| charset[rng.random_range(0..charset.len())])
        .collect()
}
