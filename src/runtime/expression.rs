//! Expression and condition evaluation.

use rand::seq::SliceRandom;
use rand::Rng;
use std::cmp::Ordering;

use super::evaluator::{sorted_values, FigEvaluator};
use crate::error::{Error, Result};
use crate::parser::{
    BinaryOp, ClockQuery, CollectionOp, CompareOp, Condition, Expression, FormatStyle, LogicalOp,
    MathOp, MemoryQuery, TextOp, Trend,
};
use crate::runtime::{ops, value, Value};

impl FigEvaluator {
    /// Evaluates an expression against the current state
    pub fn evaluate(&mut self, expr: &Expression) -> Result<Value> {
        match expr {
            Expression::IntLiteral(n) => Ok(Value::Int(*n)),
            Expression::FloatLiteral(x) => Ok(Value::Float(*x)),
            Expression::StringLiteral(s) => Ok(Value::text(s.as_str())),
            Expression::BoolLiteral(b) => Ok(Value::Bool(*b)),
            Expression::ListLiteral(items) => {
                let values = items
                    .iter()
                    .map(|item| self.evaluate(item))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::list(values))
            }

            Expression::Variable(name) => self.lookup(name),

            Expression::Binary { op, left, right } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                self.eval_binary(*op, &left, &right)
            }

            Expression::Negate(inner) => match self.evaluate(inner)? {
                Value::Int(n) => Ok(n
                    .checked_neg()
                    .map(Value::Int)
                    .unwrap_or(Value::Float(-(n as f64)))),
                Value::Float(x) => Ok(Value::Float(-x)),
                other => Err(Error::TypeError {
                    expected: "number".to_string(),
                    got: other.type_name().to_string(),
                }),
            },

            Expression::Format { style, value } => {
                let value = self.evaluate(value)?;
                match style {
                    FormatStyle::Thousands => Ok(Value::Text(ops::thousands(&value))),
                    FormatStyle::Percentage => Ok(Value::Text(ops::percentage(&value)?)),
                    FormatStyle::Binary => Ok(Value::Text(ops::binary(&value)?)),
                    FormatStyle::Hexadecimal => Ok(Value::Text(ops::hexadecimal(&value)?)),
                    FormatStyle::Rounded(decimals) => {
                        let decimals = self.evaluate(decimals)?.as_int()?;
                        ops::round_value(&value, decimals)
                    }
                }
            }

            Expression::Convert { value, from, to } => {
                let x = self.evaluate(value)?.as_float()?;
                Ok(Value::Float(ops::convert(x, *from, *to)?))
            }

            Expression::PercentOf { percent, of } => {
                let percent = self.evaluate(percent)?.as_float()?;
                let of = self.evaluate(of)?.as_float()?;
                Ok(Value::Float(percent / 100.0 * of))
            }

            Expression::Math { op, operand } => {
                let value = self.evaluate(operand)?;
                match op {
                    MathOp::Half => value.div(&Value::Int(2)),
                    MathOp::Double => value.mul(&Value::Int(2)),
                    MathOp::Square => value.mul(&value),
                    MathOp::Round => match value {
                        Value::Int(n) => Ok(Value::Int(n)),
                        other => {
                            let rounded = ops::round_half_even(other.as_float()?);
                            if rounded.is_finite() && rounded.abs() < i64::MAX as f64 {
                                Ok(Value::Int(rounded as i64))
                            } else {
                                Ok(Value::Float(rounded))
                            }
                        }
                    },
                }
            }

            Expression::Memory { query, name } => self.eval_memory(*query, name),

            Expression::Collection { op, name } => self.eval_collection(*op, name),

            Expression::Text { op, name } => self.eval_text(op, name),

            Expression::Clock(query) => {
                let now = chrono::Local::now();
                Ok(match query {
                    ClockQuery::Time => Value::Text(now.format("%H:%M:%S").to_string()),
                    ClockQuery::Date => Value::Text(now.format("%Y-%m-%d").to_string()),
                    ClockQuery::Day => Value::Text(now.format("%A").to_string()),
                    ClockQuery::Elapsed => self
                        .state
                        .value_of("elapsed_time")
                        .cloned()
                        .unwrap_or(Value::Int(0)),
                })
            }

            Expression::RandomBetween { low, high } => {
                let low = self.evaluate(low)?.as_int()?;
                let high = self.evaluate(high)?.as_int()?;
                if low > high {
                    return Err(Error::value(format!(
                        "random number between {} and {} has an empty range",
                        low, high
                    )));
                }
                Ok(Value::Int(self.rng.gen_range(low..=high)))
            }

            Expression::RandomItem(list) => {
                let list = self.evaluate(list)?;
                let items = list.as_list()?;
                Ok(items.choose(&mut self.rng).cloned().unwrap_or(Value::Null))
            }

            Expression::RandomBool => Ok(Value::Bool(self.rng.gen_bool(0.5))),

            Expression::Shuffled(list) => {
                let list = self.evaluate(list)?;
                let mut items = list.as_list()?.to_vec();
                items.shuffle(&mut self.rng);
                Ok(Value::list(items))
            }

            Expression::TableRow { table, index } => {
                let index = self.evaluate(index)?.as_int()?;
                let row = self
                    .state
                    .tables
                    .get(table)
                    .and_then(|rows| one_based(index).and_then(|i| rows.get(i)))
                    .cloned()
                    .unwrap_or_default();
                Ok(Value::list(row))
            }

            Expression::TableColumn { table, index } => {
                let index = self.evaluate(index)?.as_int()?;
                let column = match (self.state.tables.get(table), one_based(index)) {
                    (Some(rows), Some(i)) => rows.iter().filter_map(|r| r.get(i).cloned()).collect(),
                    _ => Vec::new(),
                };
                Ok(Value::list(column))
            }

            Expression::Field { map, field } => {
                let declared = self.state.maps.get(map).and_then(|m| m.get(field));
                let from_variable = || match self.state.value_of(map) {
                    Some(Value::Map(fields)) => fields.get(field),
                    _ => None,
                };
                declared
                    .or_else(from_variable)
                    .cloned()
                    .ok_or_else(|| Error::NameError {
                        what: "field",
                        name: format!("{} of {}", field, map),
                    })
            }

            Expression::Timer => Ok(Value::Float(self.state.timer_value)),
        }
    }

    /// Variable value, or a declared state name used as text
    pub(super) fn lookup(&self, name: &str) -> Result<Value> {
        if let Some(value) = self.state.value_of(name) {
            return Ok(value.clone());
        }
        if self.state.is_state_name(name) {
            return Ok(Value::text(name));
        }
        Err(Error::undefined(name))
    }

    /// Table cells may be bare words, which read as text when undefined
    pub(super) fn evaluate_cell(&mut self, cell: &Expression) -> Result<Value> {
        match (self.evaluate(cell), cell) {
            (Err(Error::NameError { .. }), Expression::Variable(word)) => Ok(Value::text(word.as_str())),
            (result, _) => result,
        }
    }

    fn eval_binary(&self, op: BinaryOp, left: &Value, right: &Value) -> Result<Value> {
        let symbol = op.to_string();
        match op {
            BinaryOp::Add => left.add(right),
            BinaryOp::Sub => left.sub(right),
            BinaryOp::Mul => left.mul(right),
            BinaryOp::Div => left.div(right),
            BinaryOp::Gt => Ok(Value::Bool(left.compare(right, &symbol)? == Ordering::Greater)),
            BinaryOp::Lt => Ok(Value::Bool(left.compare(right, &symbol)? == Ordering::Less)),
            BinaryOp::GtEq => Ok(Value::Bool(left.compare(right, &symbol)? != Ordering::Less)),
            BinaryOp::LtEq => Ok(Value::Bool(left.compare(right, &symbol)? != Ordering::Greater)),
            BinaryOp::Eq => Ok(Value::Bool(left == right)),
            BinaryOp::Concat => Ok(Value::Text(format!("{}{}", left, right))),
        }
    }

    fn eval_memory(&self, query: MemoryQuery, name: &str) -> Result<Value> {
        let var = self
            .state
            .variable(name)
            .ok_or_else(|| Error::undefined(name))?;
        let list_extreme = |wanted: Ordering| match var.value() {
            Value::List(items) => Some(
                items
                    .iter()
                    .filter(|v| v.is_number())
                    .fold(None::<&Value>, |best, v| match best {
                        Some(b) if v.ordering(b) != Some(wanted) => Some(b),
                        _ => Some(v),
                    })
                    .cloned()
                    .unwrap_or(Value::Null),
            ),
            _ => None,
        };
        Ok(match query {
            MemoryQuery::Previous => var.previous().clone(),
            MemoryQuery::History => Value::list(var.history().to_vec()),
            MemoryQuery::Highest => list_extreme(Ordering::Greater).unwrap_or_else(|| var.highest()),
            MemoryQuery::Lowest => list_extreme(Ordering::Less).unwrap_or_else(|| var.lowest()),
        })
    }

    fn eval_collection(&self, op: CollectionOp, name: &str) -> Result<Value> {
        let items = match self.lookup(name)? {
            Value::List(items) => items.to_vec(),
            single => vec![single],
        };
        match op {
            CollectionOp::Average => {
                let numbers: Vec<f64> = items.iter().filter_map(Value::as_number).collect();
                if numbers.is_empty() {
                    return Ok(Value::Int(0));
                }
                Ok(Value::Float(numbers.iter().sum::<f64>() / numbers.len() as f64))
            }
            CollectionOp::Total => {
                let numbers: Vec<&Value> = items.iter().filter(|v| v.is_number()).collect();
                if numbers.iter().all(|v| matches!(v, Value::Int(_))) {
                    numbers
                        .iter()
                        .try_fold(Value::Int(0), |sum, v| sum.add(v))
                } else {
                    let sum: f64 = numbers.iter().filter_map(|v| v.as_number()).sum();
                    Ok(Value::Float(sum))
                }
            }
            CollectionOp::Sorted => Ok(Value::list(sorted_values(&items)?)),
            CollectionOp::Reversed => Ok(Value::list(items.into_iter().rev().collect())),
        }
    }

    fn eval_text(&mut self, op: &TextOp, name: &str) -> Result<Value> {
        let text = self.lookup(name)?.to_string();
        Ok(match op {
            TextOp::Length => Value::Int(text.chars().count() as i64),
            TextOp::Uppercase => Value::Text(text.to_uppercase()),
            TextOp::Lowercase => Value::Text(text.to_lowercase()),
            TextOp::Capitalized => Value::Text(ops::title_case(&text)),
            TextOp::First(n) => {
                let n = self.evaluate(n)?.as_int()?;
                Value::Text(ops::first_chars(&text, n))
            }
            TextOp::Last(n) => {
                let n = self.evaluate(n)?.as_int()?;
                Value::Text(ops::last_chars(&text, n))
            }
            TextOp::Without(removed) => {
                let removed = self.evaluate(removed)?.to_string();
                if removed.is_empty() {
                    Value::Text(text)
                } else {
                    Value::Text(text.replace(&removed, ""))
                }
            }
            TextOp::Repeated(n) => {
                let n = self.evaluate(n)?.as_int()?;
                Value::Text(value::repeat_text(&text, n)?)
            }
        })
    }

    /// Decides whether a condition currently holds
    pub fn test_condition(&mut self, cond: &Condition) -> Result<bool> {
        match cond {
            Condition::Compare { left, op, right } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                Ok(match op {
                    CompareOp::Eq => left == right,
                    CompareOp::NotEq => left != right,
                    CompareOp::Gt => left.compare(&right, "is above")? == Ordering::Greater,
                    CompareOp::Lt => left.compare(&right, "is below")? == Ordering::Less,
                    CompareOp::GtEq => left.compare(&right, "is at least")? != Ordering::Less,
                    CompareOp::LtEq => left.compare(&right, "is at most")? != Ordering::Greater,
                })
            }

            Condition::Between { value, low, high } => {
                let bounds = (|| -> Result<(f64, f64, f64)> {
                    Ok((
                        self.evaluate(value)?.as_float()?,
                        self.evaluate(low)?.as_float()?,
                        self.evaluate(high)?.as_float()?,
                    ))
                })();
                Ok(matches!(bounds, Ok((v, lo, hi)) if lo <= v && v <= hi))
            }

            Condition::IsEmpty(expr) => Ok(self.evaluate(expr)?.is_empty()),
            Condition::NotEmpty(expr) => Ok(!self.evaluate(expr)?.is_empty()),

            Condition::Trend { value, direction } => {
                let var = value.as_variable().and_then(|n| self.state.variable(n));
                Ok(match (var, direction) {
                    (Some(var), Trend::Up) => var.is_going_up(),
                    (Some(var), Trend::Down) => var.is_going_down(),
                    (None, _) => false,
                })
            }

            Condition::Changes(expr) => Ok(expr
                .as_variable()
                .and_then(|n| self.state.variable(n))
                .is_some_and(|var| var.has_changed())),

            Condition::Hits { value, target } => {
                Ok(self.evaluate(value)? == self.evaluate(target)?)
            }

            Condition::Contains { haystack, needle } => {
                let haystack = self.evaluate(haystack)?;
                let needle = self.evaluate(needle)?;
                Ok(match &haystack {
                    Value::List(items) => items.contains(&needle),
                    other => other.to_string().contains(&needle.to_string()),
                })
            }

            Condition::StartsWith { text, prefix } => {
                let text = self.evaluate(text)?.to_string();
                let prefix = self.evaluate(prefix)?.to_string();
                Ok(text.starts_with(&prefix))
            }

            Condition::Valid { kind, value } => {
                let text = self.evaluate(value)?.to_string();
                Ok(ops::is_valid(*kind, &text))
            }

            Condition::Qualified {
                certainty,
                condition,
            } => {
                if !self.test_condition(condition)? {
                    return Ok(false);
                }
                Ok(self.rng.gen::<f64>() < certainty.probability())
            }

            Condition::Logical { op, left, right } => match op {
                LogicalOp::And => Ok(self.test_condition(left)? && self.test_condition(right)?),
                LogicalOp::Or => Ok(self.test_condition(left)? || self.test_condition(right)?),
            },

            Condition::Not(inner) => Ok(!self.test_condition(inner)?),

            Condition::Truthy(expr) => Ok(self.evaluate(expr)?.is_truthy()),
        }
    }
}

fn one_based(index: i64) -> Option<usize> {
    usize::try_from(index).ok().and_then(|i| i.checked_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::console::BufferedConsole;
    use crate::runtime::EvaluatorConfig;

    fn evaluator(setup: &str) -> FigEvaluator {
        let mut ev = FigEvaluator::new()
            .with_console(BufferedConsole::new())
            .with_seed(42)
            .with_config(EvaluatorConfig::default().without_sleep());
        ev.run_source(setup).unwrap();
        ev
    }

    fn eval(ev: &mut FigEvaluator, source: &str) -> Value {
        let program = crate::parser::parse_source(&format!("say {}", source)).unwrap();
        match &program.statements[0] {
            crate::parser::Statement::Say(expr) => ev.evaluate(expr).unwrap(),
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn test_lookup_falls_back_to_state_names() {
        let ev = evaluator("light can be red, green\nlight starts as red");
        assert_eq!(ev.lookup("green").unwrap(), Value::text("green"));
        assert!(matches!(
            ev.lookup("blue"),
            Err(Error::NameError { what: "variable", .. })
        ));
    }

    #[test]
    fn test_collection_ops() {
        let mut ev = evaluator("scores is [3, 1, 2]\nmixed is [1, 2.5]");
        assert_eq!(eval(&mut ev, "total of scores"), Value::Int(6));
        assert_eq!(eval(&mut ev, "total of mixed"), Value::Float(3.5));
        assert_eq!(eval(&mut ev, "average of scores"), Value::Float(2.0));
        assert_eq!(
            eval(&mut ev, "sorted scores"),
            Value::list(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
        assert_eq!(eval(&mut ev, "highest of scores"), Value::Int(3));
    }

    #[test]
    fn test_math_round_ties_to_even() {
        let mut ev = evaluator("low is 2.5\nhigh is 3.5");
        assert_eq!(eval(&mut ev, "round low"), Value::Int(2));
        assert_eq!(eval(&mut ev, "round high"), Value::Int(4));
        assert_eq!(eval(&mut ev, "half of 7"), Value::Float(3.5));
    }

    #[test]
    fn test_seeded_random_is_reproducible() {
        let mut a = evaluator("");
        let mut b = evaluator("");
        let first: Vec<Value> = (0..5)
            .map(|_| eval(&mut a, "random number between 1 and 100"))
            .collect();
        let second: Vec<Value> = (0..5)
            .map(|_| eval(&mut b, "random number between 1 and 100"))
            .collect();
        assert_eq!(first, second);
        for value in first {
            let n = value.as_int().unwrap();
            assert!((1..=100).contains(&n));
        }
    }

    #[test]
    fn test_one_based() {
        assert_eq!(one_based(1), Some(0));
        assert_eq!(one_based(0), None);
        assert_eq!(one_based(-3), None);
    }
}
