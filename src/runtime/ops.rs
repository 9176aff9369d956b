//! Pure helpers behind unit conversion, number formatting, text casing and
//! validation.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{Error, Result};
use crate::parser::{Unit, ValidationKind};
use crate::runtime::Value;

lazy_static! {
    static ref EMAIL: Regex = Regex::new(r"^[\w.-]+@[\w.-]+\.\w+$").expect("valid email regex");
    static ref URL: Regex = Regex::new(r"^https?://[\w.-]+\.\w+").expect("valid url regex");
}

const PI_APPROX: f64 = 3.14159265;

/// Converts between two units, rounded to 4 decimals
pub fn convert(value: f64, from: Unit, to: Unit) -> Result<f64> {
    use Unit::*;
    let converted = match (from, to) {
        (Celsius, Fahrenheit) => value * 9.0 / 5.0 + 32.0,
        (Fahrenheit, Celsius) => (value - 32.0) * 5.0 / 9.0,
        (Kilometers, Miles) => value * 0.621371,
        (Miles, Kilometers) => value * 1.60934,
        (Bytes, Kilobytes) | (Kilobytes, Megabytes) => value / 1024.0,
        (Kilobytes, Bytes) | (Megabytes, Kilobytes) => value * 1024.0,
        (Bytes, Megabytes) => value / (1024.0 * 1024.0),
        (Megabytes, Bytes) => value * 1024.0 * 1024.0,
        (Seconds, Minutes) | (Minutes, Hours) => value / 60.0,
        (Minutes, Seconds) | (Hours, Minutes) => value * 60.0,
        (Seconds, Hours) => value / 3600.0,
        (Hours, Seconds) => value * 3600.0,
        (Degrees, Radians) => value * PI_APPROX / 180.0,
        (Radians, Degrees) => value * 180.0 / PI_APPROX,
        _ => return Err(Error::value(format!("cannot convert {} to {}", from, to))),
    };
    Ok(round_to(converted, 4))
}

/// Rounds to `decimals` places
pub fn round_to(x: f64, decimals: i64) -> f64 {
    let factor = 10f64.powi(decimals.clamp(-15, 15) as i32);
    let scaled = x * factor;
    if !scaled.is_finite() {
        return x;
    }
    round_half_even(scaled) / factor
}

/// Rounds to the nearest whole number, ties to even
pub fn round_half_even(x: f64) -> f64 {
    let rounded = x.round();
    if (x - x.trunc()).abs() == 0.5 {
        2.0 * (x / 2.0).round()
    } else {
        rounded
    }
}

/// `value rounded to N`: integers stay integers
pub fn round_value(value: &Value, decimals: i64) -> Result<Value> {
    match value {
        Value::Int(n) => Ok(Value::Int(*n)),
        other => Ok(Value::Float(round_to(other.as_float()?, decimals))),
    }
}

/// Inserts thousands separators into the integer part of a number's
/// rendering; anything else renders unchanged
pub fn thousands(value: &Value) -> String {
    if !value.is_number() {
        return value.to_string();
    }
    let rendered = value.to_string();
    let (sign, unsigned) = match rendered.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", rendered.as_str()),
    };
    let (whole, fraction) = match unsigned.find('.') {
        Some(dot) => unsigned.split_at(dot),
        None => (unsigned, ""),
    };
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{}{}{}", sign, grouped, fraction)
}

/// `value as percentage`
pub fn percentage(value: &Value) -> Result<String> {
    if !value.is_number() {
        return Ok(value.to_string());
    }
    Ok(format!("{}%", value.mul(&Value::Int(100))?))
}

/// `value in binary`
pub fn binary(value: &Value) -> Result<String> {
    let n = value.as_int()?;
    let sign = if n < 0 { "-" } else { "" };
    Ok(format!("{}{:b}", sign, n.unsigned_abs()))
}

/// `value in hexadecimal`, upper-case digits
pub fn hexadecimal(value: &Value) -> Result<String> {
    let n = value.as_int()?;
    let sign = if n < 0 { "-" } else { "" };
    Ok(format!("{}{:X}", sign, n.unsigned_abs()))
}

/// Upper-cases the first letter of every word and lower-cases the rest
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

/// First `n` characters (all of them when `n` is larger)
pub fn first_chars(text: &str, n: i64) -> String {
    if n < 0 {
        let keep = text.chars().count().saturating_sub(n.unsigned_abs() as usize);
        return text.chars().take(keep).collect();
    }
    text.chars().take(n as usize).collect()
}

/// Last `n` characters (all of them when `n` is larger or zero)
pub fn last_chars(text: &str, n: i64) -> String {
    let count = text.chars().count();
    if n <= 0 {
        // `last 0 letters` keeps the whole text
        let skip = if n == 0 { 0 } else { (n.unsigned_abs() as usize).min(count) };
        return text.chars().skip(skip).collect();
    }
    text.chars().skip(count.saturating_sub(n as usize)).collect()
}

/// Checks text against a validation rule
pub fn is_valid(kind: ValidationKind, text: &str) -> bool {
    match kind {
        ValidationKind::Email => EMAIL.is_match(text),
        ValidationKind::Url => URL.is_match(text),
        ValidationKind::Number => text.trim().parse::<f64>().is_ok(),
    }
}
