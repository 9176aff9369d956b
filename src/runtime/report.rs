//! Multi-line reports printed by `explain`, `compare` and `show`.

use std::cmp::Ordering;

use crate::error::{Error, Result};
use crate::parser::Constraint;
use crate::runtime::{Value, Variable};

const BAR_WIDTH: f64 = 20.0;

/// What `explain` knows about a state variable
pub struct StateInfo<'a> {
    /// Current state
    pub current: &'a str,
    /// Declared states, if any
    pub possible: Option<&'a [String]>,
}

fn joined<T: ToString>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Lines printed by `explain NAME`
pub fn explain(
    name: &str,
    var: &Variable,
    requirements: Option<&[Constraint]>,
    state: Option<StateInfo<'_>>,
) -> Vec<String> {
    let value = var.value();
    let mut lines = vec![
        String::new(),
        format!("── explain: {} ──────────────────", name),
        format!("  current value   : {}", value),
        format!("  certainty       : {}", var.certainty),
        format!("  type            : {}", value.type_name()),
        format!("  changed         : {} time(s)", var.change_count()),
        format!("  history         : {}", Value::list(var.history().to_vec())),
    ];

    if value.is_number() {
        lines.push(format!("  highest ever    : {}", var.highest()));
        lines.push(format!("  lowest ever     : {}", var.lowest()));
        let trend = if var.is_going_up() {
            "going up"
        } else if var.is_going_down() {
            "going down"
        } else {
            "stable"
        };
        lines.push(format!("  trend           : {}", trend));
    }
    if var.history().len() >= 2 {
        lines.push(format!("  previous value  : {}", var.previous()));
    }
    if !var.limits.is_empty() {
        let limits: Vec<String> = var
            .limits
            .iter()
            .map(|(direction, bound)| format!("{} {}", direction, bound))
            .collect();
        lines.push(format!("  limits          : {}", limits.join(", ")));
    }
    for (key, text) in &var.annotations {
        lines.push(format!("  {:<16}: {}", key, text));
    }
    if let Some(constraints) = requirements {
        lines.push(format!("  requirements    : {}", joined(constraints)));
    }
    if let Some(info) = state {
        lines.push(format!("  current state   : {}", info.current));
        if let Some(possible) = info.possible {
            lines.push(format!("  possible states : {}", possible.join(", ")));
        }
    }

    lines.push("────────────────────────────────────".to_string());
    lines.push(String::new());
    lines
}

/// Lines printed by `compare A and B`
pub fn compare(left_label: &str, left: &Value, right_label: &str, right: &Value) -> Vec<String> {
    let mut lines = vec![
        String::new(),
        "── compare ──────────────────────".to_string(),
        format!("  {} = {}", left_label, left),
        format!("  {} = {}", right_label, right),
    ];

    match (left, right) {
        (a, b) if a.is_number() && b.is_number() => {
            if let Ok(diff) = b.sub(a) {
                let sign = if diff.ordering(&Value::Int(0)) != Some(Ordering::Less) {
                    "+"
                } else {
                    ""
                };
                lines.push(format!("  difference: {}{}", sign, diff));
            }
            if let (Some(x), Some(y)) = (a.as_number(), b.as_number()) {
                if x != 0.0 {
                    let pct = super::ops::round_to((y - x) / x.abs() * 100.0, 1);
                    let direction = if pct >= 0.0 { "higher" } else { "lower" };
                    lines.push(format!(
                        "  {} is {:.1}% {}",
                        right_label,
                        pct.abs(),
                        direction
                    ));
                }
            }
        }
        (Value::List(a), Value::List(b)) => {
            let both: Vec<Value> = a.iter().filter(|x| b.contains(x)).cloned().collect();
            let only_a: Vec<Value> = a.iter().filter(|x| !b.contains(x)).cloned().collect();
            let only_b: Vec<Value> = b.iter().filter(|x| !a.contains(x)).cloned().collect();
            lines.push(format!("  in both     : {}", Value::list(both)));
            lines.push(format!("  only in {} : {}", left_label, Value::list(only_a)));
            lines.push(format!("  only in {} : {}", right_label, Value::list(only_b)));
        }
        (Value::Text(a), Value::Text(b)) => {
            lines.push(format!("  same: {}", if a == b { "yes" } else { "no" }));
            lines.push(format!(
                "  length: {} vs {}",
                a.chars().count(),
                b.chars().count()
            ));
        }
        _ => {}
    }

    lines.push("─────────────────────────────────".to_string());
    lines.push(String::new());
    lines
}

/// Lines printed by `show E as list`
pub fn numbered_list(value: &Value) -> Vec<String> {
    match value {
        Value::List(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| format!("  {}. {}", i + 1, item))
            .collect(),
        _ => Vec::new(),
    }
}

/// Lines printed by `show E as bar chart`
///
/// Bars are scaled against the largest value; lists are labelled by
/// zero-based position.
pub fn bar_chart(value: &Value) -> Result<Vec<String>> {
    let entries: Vec<(String, &Value)> = match value {
        Value::Map(fields) => fields.iter().map(|(k, v)| (k.clone(), v)).collect(),
        Value::List(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        _ => return Ok(Vec::new()),
    };

    let mut numbers = Vec::with_capacity(entries.len());
    for (_, v) in &entries {
        numbers.push(v.as_number().ok_or_else(|| Error::TypeError {
            expected: "number".to_string(),
            got: v.type_name().to_string(),
        })?);
    }
    let max = numbers.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    Ok(entries
        .iter()
        .zip(numbers)
        .map(|((label, v), n)| {
            let bars = if max > 0.0 {
                ((n / max) * BAR_WIDTH).max(0.0) as usize
            } else {
                0
            };
            format!("  {:<12} | {} {}", label, "█".repeat(bars), v)
        })
        .collect())
}
