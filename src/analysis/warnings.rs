use std::collections::BTreeSet;

use crate::parser::{
    Block, Condition, Constraint, Expression, FormatStyle, ListenMode, PipelineStep, Program,
    ShowStyle, Statement, TextOp,
};

/// Lint messages for a parsed program, sorted
///
/// `source` is accepted for parity with [`super::suggest`]; the current
/// rules only need the tree.
pub fn analyze(program: &Program, _source: &str) -> Vec<String> {
    let mut checker = WarningChecker::default();
    for stmt in &program.statements {
        checker.check_statement(stmt);
    }
    checker.finish()
}

/// Walks the tree once, recording assignments, reads and loop shapes
#[derive(Default)]
struct WarningChecker {
    assigned: BTreeSet<String>,
    used: BTreeSet<String>,
    required: BTreeSet<String>,
    warnings: Vec<String>,
}

impl WarningChecker {
    fn finish(mut self) -> Vec<String> {
        for name in self.assigned.difference(&self.used) {
            if name != "it" {
                self.warnings.push(format!(
                    "Warning: variable \"{}\" is assigned but never used",
                    name
                ));
            }
        }
        for name in &self.required {
            if !self.assigned.contains(name) {
                self.warnings.push(format!(
                    "Warning: require on \"{}\" but \"{}\" is never assigned",
                    name, name
                ));
            }
        }
        self.warnings.sort();
        self.warnings.dedup();
        self.warnings
    }

    fn check_block(&mut self, block: &Block) {
        for stmt in block.iter() {
            self.check_statement(stmt);
        }
    }

    fn use_name(&mut self, name: &str) {
        self.used.insert(name.to_string());
    }

    fn check_statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::Assign { name, value, .. } => {
                self.assigned.insert(name.clone());
                self.collect_expr(value);
            }
            Statement::Say(e) | Statement::SayWithContext(e) | Statement::Wait(e) => {
                self.collect_expr(e)
            }
            Statement::Expression(e) | Statement::SaveLogs(e) => self.collect_expr(e),
            Statement::Ask { target, .. } | Statement::Listen { target, .. } => {
                if let Statement::Listen {
                    mode: ListenMode::OneOf(options),
                    ..
                } = stmt
                {
                    self.collect_expr(options);
                }
                self.assigned.insert(target.clone());
            }
            Statement::If {
                condition,
                then_branch,
                else_ifs,
                else_branch,
            } => {
                self.collect_cond(condition);
                self.check_block(then_branch);
                for (cond, block) in else_ifs {
                    self.collect_cond(cond);
                    self.check_block(block);
                }
                if let Some(block) = else_branch {
                    self.check_block(block);
                }
            }
            Statement::Given { condition, body } | Statement::Whenever { condition, body } => {
                self.collect_cond(condition);
                self.check_block(body);
            }
            Statement::Until { condition, body } => {
                self.collect_cond(condition);
                self.check_until(condition, body);
                self.check_block(body);
            }
            Statement::Repeat { count, body } => {
                if *count == Expression::IntLiteral(0) {
                    self.warnings
                        .push("Warning: repeat 0 times does nothing".to_string());
                }
                self.collect_expr(count);
                self.check_block(body);
            }
            Statement::CountFrom { from, to, body } => {
                self.collect_expr(from);
                self.collect_expr(to);
                self.check_block(body);
            }
            Statement::ForEach {
                variable,
                collection,
                body,
            } => {
                self.assigned.insert(variable.clone());
                self.collect_expr(collection);
                self.check_block(body);
            }
            Statement::Every { times, variable, body } => {
                self.collect_expr(times);
                self.use_name(variable);
                self.check_block(body);
            }
            Statement::Reacts {
                dependencies, body, ..
            } => {
                for dep in dependencies {
                    self.use_name(dep);
                }
                self.check_block(body);
            }
            Statement::Link { name, other, body } => {
                self.use_name(name);
                self.use_name(other);
                self.check_block(body);
            }
            Statement::Assume { name, value } => {
                self.assigned.insert(name.clone());
                self.collect_expr(value);
            }
            Statement::Require { name, constraints } => {
                self.required.insert(name.clone());
                for constraint in constraints {
                    match constraint {
                        Constraint::Above(e)
                        | Constraint::Below(e)
                        | Constraint::Not(e)
                        | Constraint::Equals(e) => self.collect_expr(e),
                        Constraint::Between(lo, hi) => {
                            self.collect_expr(lo);
                            self.collect_expr(hi);
                        }
                        Constraint::NotEmpty | Constraint::Empty => {}
                    }
                }
            }
            Statement::Limits { limits, .. } => {
                for (_, bound) in limits {
                    self.collect_expr(bound);
                }
            }
            Statement::Pipeline { source, steps } => {
                self.collect_expr(source);
                for step in steps {
                    if let PipelineStep::Keep { bound, .. } = step {
                        self.collect_expr(bound);
                    }
                }
            }
            Statement::Try { body, fallback } => {
                self.check_statement(body);
                if let Some(fallback) = fallback {
                    self.check_statement(fallback);
                }
            }
            Statement::Zone { body, .. }
            | Statement::Role { body, .. }
            | Statement::Alias { body, .. }
            | Statement::MeasureTime(body) => self.check_block(body),
            Statement::After { delay, body } => {
                self.collect_expr(delay);
                self.check_block(body);
            }
            Statement::Invoke { subject, args, .. } => {
                self.use_name(subject);
                for arg in args {
                    self.collect_expr(arg);
                }
            }
            Statement::Watch(name)
            | Statement::Explain(name)
            | Statement::Remember { variable: name, .. }
            | Statement::Chain { target: name, .. } => self.use_name(name),
            Statement::Recall { target, .. }
            | Statement::ReadFile { target, .. }
            | Statement::LinesOf { target, .. } => {
                if let Statement::ReadFile { path, .. } | Statement::LinesOf { path, .. } = stmt {
                    self.collect_expr(path);
                }
                self.assigned.insert(target.clone());
            }
            Statement::Check(cond) => self.collect_cond(cond),
            Statement::StateStart { name, .. } | Statement::StateBecome { name, .. } => {
                self.assigned.insert(name.clone());
            }
            Statement::AddToGroup { item, group } => {
                self.collect_expr(item);
                self.use_name(group);
            }
            Statement::MapDecl { fields, .. } => {
                for (_, expr) in fields {
                    self.collect_expr(expr);
                }
            }
            Statement::WriteFile { content, path } | Statement::AppendFile { content, path } => {
                self.collect_expr(content);
                self.collect_expr(path);
            }
            Statement::Show { value, style } => {
                self.collect_expr(value);
                if let ShowStyle::SortedBy(column) = style {
                    self.collect_expr(column);
                }
            }
            Statement::Validate { value, .. } => self.collect_expr(value),
            Statement::Log { message, .. } => self.collect_expr(message),
            Statement::Compare { left, right } => {
                self.collect_expr(left);
                self.collect_expr(right);
            }
            Statement::Clamp {
                target, low, high, ..
            } => {
                self.use_name(target);
                self.collect_expr(low);
                self.collect_expr(high);
            }
            // Table cells are often bare words, not variable reads
            Statement::TableDecl { .. }
            | Statement::DoZone(_)
            | Statement::Unwatch(_)
            | Statement::Debug(_)
            | Statement::TakeSnapshot(_)
            | Statement::RestoreSnapshot(_)
            | Statement::Forget(_)
            | Statement::StartTimer
            | Statement::StopTimer
            | Statement::StateDecl { .. }
            | Statement::StateTransition { .. }
            | Statement::Annotate { .. }
            | Statement::GroupDecl { .. }
            | Statement::Use(_) => {}
        }
    }

    /// An `until` whose condition reads no variable the body assigns
    fn check_until(&mut self, condition: &Condition, body: &Block) {
        let mut cond_vars = BTreeSet::new();
        collect_cond_into(condition, &mut cond_vars);
        if cond_vars.is_empty() {
            return;
        }
        let assigned_in_body: BTreeSet<&str> = body
            .iter()
            .filter_map(|stmt| match stmt {
                Statement::Assign { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect();
        if cond_vars.iter().any(|v| assigned_in_body.contains(v.as_str())) {
            return;
        }
        let names: Vec<String> = cond_vars.iter().map(|v| format!("\"{}\"", v)).collect();
        self.warnings.push(format!(
            "Warning: possible infinite loop in \"until\" - condition variables {} never change in body",
            names.join(", ")
        ));
    }

    fn collect_expr(&mut self, expr: &Expression) {
        collect_expr_into(expr, &mut self.used);
    }

    fn collect_cond(&mut self, cond: &Condition) {
        collect_cond_into(cond, &mut self.used);
    }
}

fn collect_expr_into(expr: &Expression, names: &mut BTreeSet<String>) {
    match expr {
        Expression::Variable(name)
        | Expression::Memory { name, .. }
        | Expression::Collection { name, .. } => {
            names.insert(name.clone());
        }
        Expression::Text { op, name } => {
            names.insert(name.clone());
            match op {
                TextOp::First(e) | TextOp::Last(e) | TextOp::Without(e) | TextOp::Repeated(e) => {
                    collect_expr_into(e, names)
                }
                TextOp::Length | TextOp::Uppercase | TextOp::Lowercase | TextOp::Capitalized => {}
            }
        }
        Expression::Field { map, .. } => {
            names.insert(map.clone());
        }
        Expression::TableRow { index, .. } | Expression::TableColumn { index, .. } => {
            collect_expr_into(index, names)
        }
        Expression::ListLiteral(items) => {
            for item in items {
                collect_expr_into(item, names);
            }
        }
        Expression::Binary { left, right, .. }
        | Expression::PercentOf {
            percent: left,
            of: right,
        }
        | Expression::RandomBetween {
            low: left,
            high: right,
        } => {
            collect_expr_into(left, names);
            collect_expr_into(right, names);
        }
        Expression::Format { style, value } => {
            collect_expr_into(value, names);
            if let FormatStyle::Rounded(decimals) = style {
                collect_expr_into(decimals, names);
            }
        }
        Expression::Negate(inner)
        | Expression::Convert { value: inner, .. }
        | Expression::Math { operand: inner, .. }
        | Expression::RandomItem(inner)
        | Expression::Shuffled(inner) => collect_expr_into(inner, names),
        Expression::IntLiteral(_)
        | Expression::FloatLiteral(_)
        | Expression::StringLiteral(_)
        | Expression::BoolLiteral(_)
        | Expression::Clock(_)
        | Expression::RandomBool
        | Expression::Timer => {}
    }
}

fn collect_cond_into(cond: &Condition, names: &mut BTreeSet<String>) {
    match cond {
        Condition::Compare { left, right, .. } => {
            collect_expr_into(left, names);
            collect_expr_into(right, names);
        }
        Condition::Between { value, low, high } => {
            collect_expr_into(value, names);
            collect_expr_into(low, names);
            collect_expr_into(high, names);
        }
        Condition::Hits {
            value: a,
            target: b,
        }
        | Condition::Contains {
            haystack: a,
            needle: b,
        }
        | Condition::StartsWith { text: a, prefix: b } => {
            collect_expr_into(a, names);
            collect_expr_into(b, names);
        }
        Condition::IsEmpty(e)
        | Condition::NotEmpty(e)
        | Condition::Changes(e)
        | Condition::Truthy(e)
        | Condition::Trend { value: e, .. }
        | Condition::Valid { value: e, .. } => collect_expr_into(e, names),
        Condition::Qualified { condition, .. } | Condition::Not(condition) => {
            collect_cond_into(condition, names)
        }
        Condition::Logical { left, right, .. } => {
            collect_cond_into(left, names);
            collect_cond_into(right, names);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;

    fn warnings_for(source: &str) -> Vec<String> {
        let program = parse_source(source).unwrap();
        analyze(&program, source)
    }

    #[test]
    fn test_unused_variable() {
        let warnings = warnings_for("x is 1\ny is 2\nsay y");
        assert_eq!(
            warnings,
            vec!["Warning: variable \"x\" is assigned but never used"]
        );
    }

    #[test]
    fn test_loop_variable_it_is_exempt() {
        assert!(warnings_for("it is 3\ncount from 1 to 2: say it").is_empty());
    }

    #[test]
    fn test_repeat_zero() {
        let warnings = warnings_for("repeat 0 times: say \"never\"");
        assert_eq!(warnings, vec!["Warning: repeat 0 times does nothing"]);
    }

    #[test]
    fn test_until_never_changes_condition() {
        let warnings = warnings_for("n is 0\nm is 0\nuntil n is 5: m is m + 1");
        assert_eq!(
            warnings,
            vec!["Warning: possible infinite loop in \"until\" - condition variables \"n\" never change in body"]
        );
        assert!(warnings_for("n is 0\nuntil n is 5: n is n + 1").is_empty());
    }

    #[test]
    fn test_require_without_assignment() {
        let warnings = warnings_for("require age to be above 0");
        assert_eq!(
            warnings,
            vec!["Warning: require on \"age\" but \"age\" is never assigned"]
        );
    }

    #[test]
    fn test_output_is_sorted() {
        let warnings = warnings_for("b is 1\nc is 2\nrepeat 0 times: say \"x\"");
        let mut sorted = warnings.clone();
        sorted.sort();
        assert_eq!(warnings, sorted);
        assert_eq!(warnings.len(), 3);
    }
}
