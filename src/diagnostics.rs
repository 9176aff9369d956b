//! Human-readable failure reports for the command line

use crate::error::Error;
use crate::runtime::FigEvaluator;

const RULE_WIDTH: usize = 50;

/// Framed block naming the error family, the line and the message
pub fn banner(title: &str, message: &str, line: Option<usize>) -> Vec<String> {
    let rule = "=".repeat(RULE_WIDTH);
    let mut lines = vec![String::new(), rule.clone(), format!("  FigLang {}", title)];
    if let Some(line) = line {
        lines.push(format!("  on line {}", line));
    }
    lines.push(format!("  {}", message));
    lines.push(rule);
    lines.push(String::new());
    lines
}

/// Full report for a failed run
///
/// Syntax failures are followed by the source hints; unresolved names by
/// the variables sharing their first letter when an evaluator is at hand.
pub fn report(err: &Error, evaluator: Option<&FigEvaluator>, hints: &[String]) -> Vec<String> {
    let mut lines = banner(err.category().title(), &err.enhanced_message(), err.line());

    if err.is_syntax() && !hints.is_empty() {
        lines.push("  Hints:".to_string());
        lines.extend(hints.iter().cloned());
    }

    if let (Some(name), Some(evaluator)) = (err.unresolved_name(), evaluator) {
        let similar = evaluator.similar_names(name);
        if !similar.is_empty() {
            lines.push(format!("  Did you mean one of: {}?", similar.join(", ")));
            lines.push(String::new());
        }
    }

    lines
}
