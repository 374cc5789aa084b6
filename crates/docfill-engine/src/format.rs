/*
 * format.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Invariant-culture pattern formatting for the `format` operator.
//!
//! Numeric patterns follow the `#,##0.00` convention: `0` is a required
//! digit, `#` an optional one, `,` enables thousands grouping, and a `%` or
//! `‰` anywhere in the pattern multiplies the value by 100 or 1000 while
//! staying in the output verbatim. Date patterns use `yyyy`/`MM`/`dd`/
//! `HH`/`mm`/`ss` runs (single-letter forms unpadded); any other character
//! is a literal, so patterns like `yyyy年M月` work as-is.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

/// Format a number with a `#,##0.00`-style pattern.
pub fn format_number(value: f64, pattern: &str) -> String {
    if pattern.trim().is_empty() {
        return crate::value::Value::Float(value).to_text();
    }

    let mut scaled = value;
    for c in pattern.chars() {
        match c {
            '%' => scaled *= 100.0,
            '‰' => scaled *= 1000.0,
            _ => {}
        }
    }

    let chars: Vec<char> = pattern.chars().collect();
    let first = chars.iter().position(|c| matches!(c, '#' | '0'));
    let last = chars.iter().rposition(|c| matches!(c, '#' | '0'));
    let (first, last) = match (first, last) {
        (Some(f), Some(l)) => (f, l),
        // No digit placeholders: the pattern is all literal text.
        _ => return pattern.to_string(),
    };

    let prefix: String = chars[..first].iter().collect();
    let suffix: String = chars[last + 1..].iter().collect();
    let core: String = chars[first..=last]
        .iter()
        .filter(|c| matches!(c, '#' | '0' | ',' | '.'))
        .collect();

    let (int_pattern, frac_pattern) = match core.split_once('.') {
        Some((i, f)) => (i, f),
        None => (core.as_str(), ""),
    };
    let grouped = int_pattern.contains(',');
    let min_int_digits = int_pattern.chars().filter(|c| *c == '0').count().max(1);
    let min_frac_digits = frac_pattern.chars().filter(|c| *c == '0').count();
    let max_frac_digits = frac_pattern.chars().filter(|c| matches!(c, '#' | '0')).count();

    let negative = scaled < 0.0;
    // Round half away from zero at the pattern's precision.
    let factor = 10f64.powi(max_frac_digits as i32);
    let rounded = (scaled.abs() * factor).round() / factor;

    let digits = format!("{:.*}", max_frac_digits, rounded);
    let (int_digits, frac_digits) = match digits.split_once('.') {
        Some((i, f)) => (i.to_string(), f.to_string()),
        None => (digits, String::new()),
    };

    let mut int_digits = int_digits;
    while int_digits.len() < min_int_digits {
        int_digits.insert(0, '0');
    }
    if grouped {
        int_digits = group_thousands(&int_digits);
    }

    let mut frac_digits = frac_digits;
    while frac_digits.len() > min_frac_digits && frac_digits.ends_with('0') {
        frac_digits.pop();
    }

    let mut out = String::new();
    if negative && rounded != 0.0 {
        out.push('-');
    }
    out.push_str(&prefix);
    out.push_str(&int_digits);
    if !frac_digits.is_empty() {
        out.push('.');
        out.push_str(&frac_digits);
    }
    out.push_str(&suffix);
    out
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    let chars: Vec<char> = digits.chars().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(*c);
    }
    out
}

/// Parse a date/time string: round-trip ISO-8601 first, then the common
/// locale-free forms.
pub fn parse_datetime(input: &str) -> Option<NaiveDateTime> {
    let text = input.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_local());
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(dt);
        }
    }
    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(text, fmt) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    // Year-month only, e.g. "2025-01".
    if let Some((year, month)) = text.split_once('-') {
        if year.len() == 4 && !month.contains(['-', ':', ' ']) {
            if let (Ok(y), Ok(m)) = (year.parse::<i32>(), month.parse::<u32>()) {
                return NaiveDate::from_ymd_opt(y, m, 1)?.and_hms_opt(0, 0, 0);
            }
        }
    }
    if let Ok(time) = NaiveTime::parse_from_str(text, "%H:%M:%S") {
        return NaiveDate::from_ymd_opt(1, 1, 1)?.and_time(time).into();
    }
    None
}

/// Format a date/time with a `yyyy`/`MM`/`dd`/`HH`/`mm`/`ss` pattern.
/// Unrecognized characters pass through as literals.
pub fn format_datetime(dt: NaiveDateTime, pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let mut run = 1;
        while i + run < chars.len() && chars[i + run] == c {
            run += 1;
        }
        match c {
            'y' => {
                if run >= 4 {
                    out.push_str(&format!("{:04}", dt.year()));
                } else if run >= 2 {
                    out.push_str(&format!("{:02}", dt.year().rem_euclid(100)));
                } else {
                    out.push_str(&dt.year().to_string());
                }
            }
            'M' => push_padded(&mut out, dt.month(), run),
            'd' => push_padded(&mut out, dt.day(), run),
            'H' => push_padded(&mut out, dt.hour(), run),
            'm' => push_padded(&mut out, dt.minute(), run),
            's' => push_padded(&mut out, dt.second(), run),
            _ => {
                for _ in 0..run {
                    out.push(c);
                }
            }
        }
        i += run;
    }
    out
}

fn push_padded(out: &mut String, n: u32, run: usize) {
    if run >= 2 {
        out.push_str(&format!("{:02}", n));
    } else {
        out.push_str(&n.to_string());
    }
}
