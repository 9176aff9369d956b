use rand::rngs::StdRng;
use rand::SeedableRng;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::parser::{
    parse_source, Block, Certainty, ChainStep, Condition, Constraint, Expression, ListenMode,
    LogLevel, LogicalOp, PipelineStep, Program, ShowStyle, Statement,
};
use crate::runtime::console::{Console, StdConsole};
use crate::runtime::state::{EveryEntry, Group, Reaction, RuntimeState, WheneverEntry};
use crate::runtime::{ops, persistence, report, EvaluatorConfig, Value, Variable};

/// Subscribers of the after-assignment hook, in firing order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AssignmentHook {
    /// Print a notice for watched variables whose value changed
    Watch,
    /// Enforce `require` constraints
    Require,
    /// Re-check every `whenever` condition
    Whenever,
    /// Count changes for `every N times` blocks
    Every,
    /// Run `reacts to` blocks depending on the variable
    React,
}

const ASSIGNMENT_HOOKS: [AssignmentHook; 5] = [
    AssignmentHook::Watch,
    AssignmentHook::Require,
    AssignmentHook::Whenever,
    AssignmentHook::Every,
    AssignmentHook::React,
];

/// Tree-walking evaluator for FigLang programs
///
/// Owns the single global [`RuntimeState`]; statements, expressions and
/// conditions all read and write it through `&mut self`. Output and input
/// go through an injectable [`Console`], and the random source can be
/// seeded for reproducible runs.
pub struct FigEvaluator {
    pub(super) state: RuntimeState,
    pub(super) config: EvaluatorConfig,
    pub(super) console: Box<dyn Console>,
    pub(super) rng: StdRng,
    /// Current block nesting
    depth: usize,
    /// Directory of the file being run, for `use` lookups
    source_dir: Option<PathBuf>,
}

impl Default for FigEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl FigEvaluator {
    /// Creates an evaluator printing to stdout with default limits
    pub fn new() -> Self {
        FigEvaluator {
            state: RuntimeState::new(),
            config: EvaluatorConfig::default(),
            console: Box::new(StdConsole::new()),
            rng: StdRng::from_entropy(),
            depth: 0,
            source_dir: None,
        }
    }

    /// Replaces the console
    pub fn with_console(mut self, console: impl Console + 'static) -> Self {
        self.console = Box::new(console);
        self
    }

    /// Makes certainty rolls and random expressions reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Replaces the configuration
    pub fn with_config(mut self, config: EvaluatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Directory `use` searches for a `libs/` folder, normally the
    /// directory of the running file
    pub fn with_source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.source_dir = Some(dir.into());
        self
    }

    /// Runtime state, for inspection after a run
    pub fn state(&self) -> &RuntimeState {
        &self.state
    }

    /// Looks up a variable
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.state.variable(name)
    }

    /// Current value of a variable
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.state.value_of(name)
    }

    /// Existing variable names that might be what `name` meant
    pub fn similar_names(&self, name: &str) -> Vec<String> {
        self.state.similar_names(name)
    }

    /// Parses and runs source text
    pub fn run_source(&mut self, source: &str) -> Result<()> {
        let program = parse_source(source)?;
        self.run(&program)
    }

    /// Reads, parses and runs a file; `use` then also searches next to it
    pub fn run_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let source = persistence::read_text(path)?;
        let previous_dir = self.source_dir.replace(parent_dir(path));
        let result = self.run_source(&source);
        self.source_dir = previous_dir;
        result
    }

    /// Executes every statement in order, stopping at the first error
    pub fn run(&mut self, program: &Program) -> Result<()> {
        for statement in &program.statements {
            self.execute(statement)?;
        }
        Ok(())
    }

    pub(super) fn say(&mut self, line: impl AsRef<str>) -> Result<()> {
        self.console.write_line(line.as_ref())
    }

    fn say_all(&mut self, lines: Vec<String>) -> Result<()> {
        for line in lines {
            self.say(line)?;
        }
        Ok(())
    }

    /// Runs a nested block, enforcing the nesting bound
    pub(super) fn execute_block(&mut self, block: &Block) -> Result<()> {
        if self.depth >= self.config.max_block_depth {
            return Err(Error::RecursionLimit {
                depth: self.config.max_block_depth,
            });
        }
        self.depth += 1;
        let result = block.iter().try_for_each(|stmt| self.execute(stmt));
        self.depth -= 1;
        result
    }

    // Assignment and its hooks

    /// Assigns a value and runs the after-assignment hook
    pub fn assign(&mut self, name: &str, value: Value, certainty: Certainty) -> Result<()> {
        let old = match self.state.variables.get_mut(name) {
            Some(var) => Some(var.set(value, certainty)),
            None => {
                self.state.variables.insert(
                    name.to_string(),
                    Variable::with_certainty(value, certainty),
                );
                None
            }
        };
        if self.state.debug {
            let current = self.current_value(name);
            self.say(format!("  [assign] {} = {}", name, current))?;
        }
        self.after_assignment(name, old)
    }

    fn current_value(&self, name: &str) -> Value {
        self.state.value_of(name).cloned().unwrap_or(Value::Null)
    }

    fn after_assignment(&mut self, name: &str, old: Option<Value>) -> Result<()> {
        for hook in ASSIGNMENT_HOOKS {
            match hook {
                AssignmentHook::Watch => self.notify_watchers(name, old.as_ref())?,
                AssignmentHook::Require => self.check_requirements(name)?,
                AssignmentHook::Whenever => self.check_whenevers()?,
                AssignmentHook::Every => self.check_everys(name)?,
                AssignmentHook::React => self.check_reactions(name)?,
            }
        }
        Ok(())
    }

    fn notify_watchers(&mut self, name: &str, old: Option<&Value>) -> Result<()> {
        if !self.state.watchers.contains(name) {
            return Ok(());
        }
        let new = self.current_value(name);
        match old {
            Some(old) if *old != new => {
                self.say(format!("  [watch] {} changed: {} -> {}", name, old, new))
            }
            _ => Ok(()),
        }
    }

    fn check_requirements(&mut self, name: &str) -> Result<()> {
        let Some(constraints) = self.state.requires.get(name).cloned() else {
            return Ok(());
        };
        let value = self.current_value(name);
        for constraint in &constraints {
            self.check_constraint(name, &value, constraint)?;
        }
        Ok(())
    }

    fn check_constraint(&mut self, name: &str, value: &Value, constraint: &Constraint) -> Result<()> {
        let violation = match constraint {
            Constraint::Above(limit) => {
                let limit = self.evaluate(limit)?;
                (value.compare(&limit, ">")? != Ordering::Greater)
                    .then(|| format!("'{}' must be above {}, got {}", name, limit, value))
            }
            Constraint::Below(limit) => {
                let limit = self.evaluate(limit)?;
                (value.compare(&limit, "<")? != Ordering::Less)
                    .then(|| format!("'{}' must be below {}, got {}", name, limit, value))
            }
            Constraint::Between(low, high) => {
                let (low, high) = (self.evaluate(low)?, self.evaluate(high)?);
                let inside = value.compare(&low, ">=")? != Ordering::Less
                    && value.compare(&high, "<=")? != Ordering::Greater;
                (!inside).then(|| {
                    format!(
                        "'{}' must be between {} and {}, got {}",
                        name, low, high, value
                    )
                })
            }
            Constraint::Not(bad) => {
                let bad = self.evaluate(bad)?;
                (*value == bad).then(|| format!("'{}' must not be {}, got {}", name, bad, value))
            }
            Constraint::Equals(expected) => {
                let expected = self.evaluate(expected)?;
                (*value != expected)
                    .then(|| format!("'{}' must be {}, got {}", name, expected, value))
            }
            Constraint::NotEmpty => value
                .is_empty()
                .then(|| format!("'{}' must not be empty", name)),
            Constraint::Empty => (!value.is_empty())
                .then(|| format!("'{}' must be empty, got {}", name, value)),
        };
        match violation {
            Some(message) => Err(Error::value(message)),
            None => Ok(()),
        }
    }

    fn check_whenevers(&mut self) -> Result<()> {
        let registered = self.state.whenevers.clone();
        for entry in &registered {
            if self.test_condition(&entry.condition)? {
                self.execute_block(&entry.body)?;
            }
        }
        Ok(())
    }

    fn check_everys(&mut self, name: &str) -> Result<()> {
        let mut due = Vec::new();
        for entry in self.state.everys.iter_mut().filter(|e| e.variable == name) {
            entry.counter += 1;
            if entry.counter >= entry.times {
                entry.counter = 0;
                due.push(entry.body.clone());
            }
        }
        for body in &due {
            self.execute_block(body)?;
        }
        Ok(())
    }

    fn check_reactions(&mut self, name: &str) -> Result<()> {
        let due: Vec<Block> = self
            .state
            .reactions
            .iter()
            .filter(|r| r.dependencies.iter().any(|d| d == name))
            .map(|r| r.body.clone())
            .collect();
        for body in &due {
            self.execute_block(body)?;
        }
        Ok(())
    }

    // Statements

    /// Executes one statement
    pub fn execute(&mut self, stmt: &Statement) -> Result<()> {
        if self.state.debug {
            self.say(format!("  [debug] {}", stmt.kind_name()))?;
        }

        match stmt {
            Statement::Assign {
                name,
                value,
                certainty,
            } => {
                let value = self.evaluate(value)?;
                self.assign(name, value, *certainty)
            }

            Statement::Say(expr) => {
                let value = self.evaluate(expr)?;
                self.say(value.to_string())
            }

            Statement::SayWithContext(expr) => self.exec_say_with_context(expr),

            Statement::Ask { prompt, target } => {
                self.console.write(&format!("{} ", prompt))?;
                let answer = self.console.read_line()?.ok_or(Error::InputClosed)?;
                self.state.store(target, Value::parse_input(&answer));
                Ok(())
            }

            Statement::If {
                condition,
                then_branch,
                else_ifs,
                else_branch,
            } => {
                if self.test_condition(condition)? {
                    return self.execute_block(then_branch);
                }
                for (cond, block) in else_ifs {
                    if self.test_condition(cond)? {
                        return self.execute_block(block);
                    }
                }
                match else_branch {
                    Some(block) => self.execute_block(block),
                    None => Ok(()),
                }
            }

            Statement::Given { condition, body } => {
                if self.test_condition(condition)? {
                    self.execute_block(body)?;
                }
                Ok(())
            }

            Statement::Until { condition, body } => self.exec_until(condition, body),

            Statement::Repeat { count, body } => {
                let count = self.evaluate(count)?.as_int()?;
                for _ in 0..count.max(0) {
                    self.execute_block(body)?;
                }
                Ok(())
            }

            Statement::CountFrom { from, to, body } => {
                let from = self.evaluate(from)?.as_int()?;
                let to = self.evaluate(to)?.as_int()?;
                for i in from..=to {
                    self.state.store("it", Value::Int(i));
                    self.execute_block(body)?;
                }
                Ok(())
            }

            Statement::ForEach {
                variable,
                collection,
                body,
            } => {
                let collection = self.evaluate(collection)?;
                let Value::List(items) = collection else {
                    tracing::debug!(
                        got = collection.type_name(),
                        "for each over a non-collection does nothing"
                    );
                    return Ok(());
                };
                for item in items.iter() {
                    self.state.store(variable, item.clone());
                    self.state.store("it", item.clone());
                    self.execute_block(body)?;
                }
                Ok(())
            }

            Statement::Whenever { condition, body } => {
                self.state.whenevers.push(WheneverEntry {
                    condition: condition.clone(),
                    body: body.clone(),
                });
                Ok(())
            }

            Statement::Every {
                times,
                variable,
                body,
            } => {
                let times = self.evaluate(times)?.as_int()?;
                self.state.everys.push(EveryEntry {
                    times,
                    variable: variable.clone(),
                    body: body.clone(),
                    counter: 0,
                });
                Ok(())
            }

            Statement::Reacts {
                name,
                dependencies,
                body,
            } => {
                self.state.define_reaction(Reaction {
                    name: name.clone(),
                    dependencies: dependencies.clone(),
                    body: body.clone(),
                });
                Ok(())
            }

            Statement::Link { name, other, body } => {
                let changes = |n: &String| Box::new(Condition::Changes(Expression::Variable(n.clone())));
                self.state.whenevers.push(WheneverEntry {
                    condition: Condition::Logical {
                        op: LogicalOp::Or,
                        left: changes(name),
                        right: changes(other),
                    },
                    body: body.clone(),
                });
                Ok(())
            }

            Statement::Assume { name, value } => {
                if !self.state.variables.contains_key(name) {
                    let value = self.evaluate(value)?;
                    self.state.store(name, value);
                }
                Ok(())
            }

            Statement::Require { name, constraints } => {
                self.state
                    .requires
                    .entry(name.clone())
                    .or_default()
                    .extend(constraints.iter().cloned());
                Ok(())
            }

            Statement::Limits { name, limits } => {
                let mut evaluated = Vec::with_capacity(limits.len());
                for (direction, bound) in limits {
                    evaluated.push((*direction, self.evaluate(bound)?));
                }
                if !self.state.variables.contains_key(name) {
                    self.state.store(name, Value::Int(0));
                }
                if let Some(var) = self.state.variables.get_mut(name) {
                    var.set_limits(evaluated);
                }
                Ok(())
            }

            Statement::Pipeline { source, steps } => self.exec_pipeline(source, steps),

            Statement::Try { body, fallback } => match self.execute(body) {
                Ok(()) => Ok(()),
                Err(err) => {
                    tracing::debug!(error = %err, "try body failed");
                    match fallback {
                        Some(fallback) => self.execute(fallback),
                        None => Ok(()),
                    }
                }
            },

            Statement::Zone { name, body } => {
                self.state.zones.insert(name.clone(), body.clone());
                Ok(())
            }

            Statement::DoZone(name) => {
                let block = self
                    .state
                    .zones
                    .get(name)
                    .or_else(|| self.state.aliases.get(name))
                    .cloned()
                    .ok_or_else(|| Error::NameError {
                        what: "zone",
                        name: name.clone(),
                    })?;
                self.execute_block(&block)
            }

            Statement::Role { name, body } => {
                self.state.roles.insert(name.clone(), body.clone());
                Ok(())
            }

            Statement::Alias { name, body } => {
                self.state.aliases.insert(name.clone(), body.clone());
                Ok(())
            }

            Statement::Invoke {
                subject, action, ..
            } => {
                let block = self.state.aliases.get(action).cloned().ok_or_else(|| {
                    Error::NameError {
                        what: "action",
                        name: action.clone(),
                    }
                })?;
                tracing::trace!(subject = %subject, action = %action, "invoking alias");
                self.execute_block(&block)
            }

            Statement::Watch(name) => {
                self.state.watchers.insert(name.clone());
                self.say(format!("  [watch] now watching '{}'", name))
            }

            Statement::Unwatch(name) => {
                self.state.watchers.remove(name);
                self.say(format!("  [watch] stopped watching '{}'", name))
            }

            Statement::Explain(name) => self.exec_explain(name),

            Statement::Debug(on) => {
                self.state.debug = *on;
                self.say(format!("  [debug] {}", if *on { "on" } else { "off" }))
            }

            Statement::TakeSnapshot(name) => {
                self.state.take_snapshot(name);
                self.say(format!("  [snapshot] saved '{}'", name))
            }

            Statement::RestoreSnapshot(name) => {
                if self.state.restore_snapshot(name) {
                    self.say(format!("  [snapshot] restored '{}'", name))
                } else {
                    tracing::debug!(snapshot = %name, "snapshot not found");
                    self.say(format!("FigLang: snapshot '{}' not found", name))
                }
            }

            Statement::Remember { variable, key } => {
                let Some(value) = self.state.value_of(variable).cloned() else {
                    tracing::debug!(variable = %variable, "nothing to remember");
                    return Ok(());
                };
                persistence::save_memory(&self.config.memory_dir, key, &value)?;
                self.say(format!("  [remember] saved '{}' as '{}'", variable, key))
            }

            Statement::Recall { key, target } => {
                match persistence::load_memory(&self.config.memory_dir, key)? {
                    Some(value) => {
                        self.state.store(target, value);
                        self.say(format!("  [recall] loaded '{}' into '{}'", key, target))
                    }
                    None => self.say(format!("FigLang: no memory for '{}'", key)),
                }
            }

            Statement::Forget(key) => {
                if persistence::forget_memory(&self.config.memory_dir, key)? {
                    self.say(format!("  [forget] deleted '{}'", key))
                } else {
                    self.say(format!("FigLang: no memory for '{}'", key))
                }
            }

            Statement::Check(condition) => {
                let passed = self.test_condition(condition)?;
                if passed {
                    self.say(format!("  ✓ {}", condition))
                } else {
                    self.say(format!("  ✗ FAILED: {}", condition))
                }
            }

            Statement::Listen { mode, target } => self.exec_listen(mode, target),

            Statement::MeasureTime(body) => {
                let start = Instant::now();
                self.execute_block(body)?;
                let elapsed = ops::round_to(start.elapsed().as_secs_f64(), 4);
                self.state.store("elapsed_time", Value::Float(elapsed));
                Ok(())
            }

            Statement::Wait(amount) => self.pause(amount),

            Statement::After { delay, body } => {
                self.pause(delay)?;
                self.execute_block(body)
            }

            Statement::StartTimer => {
                self.state.timer_start = Some(Instant::now());
                Ok(())
            }

            Statement::StopTimer => {
                if let Some(start) = self.state.timer_start {
                    self.state.timer_value = ops::round_to(start.elapsed().as_secs_f64(), 4);
                    let value = Value::Float(self.state.timer_value);
                    self.state.store("timer", value);
                }
                Ok(())
            }

            Statement::StateDecl { name, states } => {
                self.state.states.insert(name.clone(), states.clone());
                self.state.store(name, Value::Null);
                Ok(())
            }

            Statement::StateStart { name, state } => {
                self.ensure_declared_state(name, state)?;
                self.state.state_current.insert(name.clone(), state.clone());
                self.assign(name, Value::text(state), Certainty::Definitely)
            }

            Statement::StateBecome { name, state } => self.exec_state_become(name, state),

            Statement::StateTransition { name, from, to } => {
                self.state
                    .state_transitions
                    .entry(name.clone())
                    .or_default()
                    .entry(from.clone())
                    .or_default()
                    .push(to.clone());
                Ok(())
            }

            Statement::Annotate { name, annotations } => {
                if !self.state.variables.contains_key(name) {
                    self.state.store(name, Value::Null);
                }
                if let Some(var) = self.state.variables.get_mut(name) {
                    for (annotation, text) in annotations {
                        var.annotations
                            .insert(annotation.key().to_string(), text.clone());
                    }
                }
                Ok(())
            }

            Statement::GroupDecl { name, item_type } => {
                self.state.groups.insert(
                    name.clone(),
                    Group {
                        item_type: item_type.clone(),
                        items: Vec::new(),
                    },
                );
                self.state.store(name, Value::list(Vec::new()));
                Ok(())
            }

            Statement::AddToGroup { item, group } => {
                let item = self.evaluate(item)?;
                self.exec_add_to_group(item, group)
            }

            Statement::MapDecl { name, fields } => {
                let mut map = BTreeMap::new();
                for (field, expr) in fields {
                    map.insert(field.clone(), self.evaluate(expr)?);
                }
                self.state.maps.insert(name.clone(), map.clone());
                self.state.store(name, Value::map(map));
                Ok(())
            }

            Statement::TableDecl { name, rows } => {
                let mut table = Vec::with_capacity(rows.len());
                for row in rows {
                    let mut cells = Vec::with_capacity(row.len());
                    for cell in row {
                        cells.push(self.evaluate_cell(cell)?);
                    }
                    table.push(cells);
                }
                self.state.tables.insert(name.clone(), table);
                Ok(())
            }

            Statement::ReadFile { path, target } => {
                let path = self.evaluate(path)?.to_string();
                let content = persistence::read_text(&path)?;
                self.state.store(target, Value::Text(content));
                Ok(())
            }

            Statement::WriteFile { content, path } => {
                let content = self.evaluate(content)?.to_string();
                let path = self.evaluate(path)?.to_string();
                persistence::write_text(&path, &content)?;
                self.say(format!("  [file] wrote to '{}'", path))
            }

            Statement::AppendFile { content, path } => {
                let content = self.evaluate(content)?.to_string();
                let path = self.evaluate(path)?.to_string();
                persistence::append_line(&path, &content)?;
                self.say(format!("  [file] appended to '{}'", path))
            }

            Statement::LinesOf { path, target } => {
                let path = self.evaluate(path)?.to_string();
                let lines = persistence::read_lines(&path)?
                    .into_iter()
                    .map(Value::Text)
                    .collect();
                self.state.store(target, Value::list(lines));
                Ok(())
            }

            Statement::Show { value, style } => self.exec_show(value, style),

            Statement::Validate { kind, value } => {
                let text = self.evaluate(value)?.to_string();
                let valid = ops::is_valid(*kind, &text);
                self.say(format!("  validate {} \"{}\": {}", kind, text, valid))
            }

            Statement::Log { message, level } => {
                let message = self.evaluate(message)?.to_string();
                self.exec_log(message, *level)
            }

            Statement::SaveLogs(path) => {
                let path = self.evaluate(path)?.to_string();
                persistence::write_text(&path, &self.state.logs.join("\n"))?;
                let count = self.state.logs.len();
                self.say(format!("  [log] saved {} entries to '{}'", count, path))
            }

            Statement::Compare { left, right } => {
                let a = self.evaluate(left)?;
                let b = self.evaluate(right)?;
                let lines = report::compare(&left.to_string(), &a, &right.to_string(), &b);
                self.say_all(lines)
            }

            Statement::Chain { target, steps } => self.exec_chain(target, steps),

            Statement::Clamp {
                target,
                low,
                high,
                say,
            } => {
                let value = self.lookup(target)?;
                let low = self.evaluate(low)?;
                let high = self.evaluate(high)?;
                let capped = if high.compare(&value, "clamp")? == Ordering::Less {
                    high
                } else {
                    value
                };
                let clamped = if capped.compare(&low, "clamp")? == Ordering::Less {
                    low
                } else {
                    capped
                };
                self.state.store(target, clamped.clone());
                if *say {
                    self.say(clamped.to_string())?;
                }
                Ok(())
            }

            Statement::Use(name) => self.exec_use(name),

            Statement::Expression(expr) => self.evaluate(expr).map(|_| ()),
        }
    }

    fn exec_say_with_context(&mut self, expr: &Expression) -> Result<()> {
        let value = self.evaluate(expr)?;
        let Some(var) = expr.as_variable().and_then(|name| self.state.variable(name)) else {
            return self.say(value.to_string());
        };
        let notes = &var.annotations;
        let mut out = expr.to_string();
        if let Some(owner) = notes.get("owned_by") {
            out.push_str(&format!(" ({}'s)", owner));
        }
        if let Some(description) = notes.get("described_as") {
            out.push_str(&format!(" [{}]", description));
        }
        out.push_str(&format!(": {}", value));
        if let Some(unit) = notes.get("measured_in") {
            out.push_str(&format!(" {}", unit));
        }
        self.say(out)
    }

    fn exec_until(&mut self, condition: &Condition, body: &Block) -> Result<()> {
        let limit = self.config.max_until_iterations;
        let mut iterations = 0;
        while !self.test_condition(condition)? {
            self.execute_block(body)?;
            iterations += 1;
            if iterations >= limit {
                tracing::warn!(limit, "until loop hit its iteration cap");
                return Err(Error::TooManyIterations { limit });
            }
        }
        Ok(())
    }

    fn exec_pipeline(&mut self, source: &Expression, steps: &[PipelineStep]) -> Result<()> {
        let mut data = match self.evaluate(source)? {
            Value::List(items) => items.to_vec(),
            single => vec![single],
        };
        for step in steps {
            match step {
                PipelineStep::Keep { direction, bound } => {
                    let bound = self.evaluate(bound)?;
                    let wanted = match direction {
                        crate::parser::Direction::Above => Ordering::Greater,
                        crate::parser::Direction::Below => Ordering::Less,
                    };
                    let mut kept = Vec::with_capacity(data.len());
                    for item in data {
                        if item.compare(&bound, "keep")? == wanted {
                            kept.push(item);
                        }
                    }
                    data = kept;
                }
                PipelineStep::DoubleEach => {
                    data = data
                        .iter()
                        .map(|item| item.mul(&Value::Int(2)))
                        .collect::<Result<_>>()?;
                }
                PipelineStep::Sort => data = sorted_values(&data)?,
                PipelineStep::Reverse => data.reverse(),
                PipelineStep::SayEach => {
                    for item in &data {
                        self.say(item.to_string())?;
                    }
                }
            }
        }
        Ok(())
    }

    fn exec_explain(&mut self, name: &str) -> Result<()> {
        let Some(var) = self.state.variable(name) else {
            return self.say(format!("FigLang: '{}' is not defined", name));
        };
        let state = self
            .state
            .state_current
            .get(name)
            .map(|current| report::StateInfo {
                current,
                possible: self.state.states.get(name).map(Vec::as_slice),
            });
        let lines = report::explain(
            name,
            var,
            self.state.requires.get(name).map(Vec::as_slice),
            state,
        );
        self.say_all(lines)
    }

    fn exec_listen(&mut self, mode: &ListenMode, target: &str) -> Result<()> {
        let options = match mode {
            ListenMode::OneOf(expr) => Some(self.evaluate(expr)?),
            _ => None,
        };
        loop {
            self.console.write("> ")?;
            let raw = self.console.read_line()?.ok_or(Error::InputClosed)?;
            let raw = raw.trim();
            let accepted = match mode {
                ListenMode::Number => parse_number_answer(raw),
                ListenMode::YesNo => match raw.to_lowercase().as_str() {
                    "yes" | "y" => Some(Value::Bool(true)),
                    "no" | "n" => Some(Value::Bool(false)),
                    _ => None,
                },
                ListenMode::OneOf(_) => {
                    let choices = match &options {
                        Some(Value::List(items)) => items.to_vec(),
                        Some(other) => vec![other.clone()],
                        None => Vec::new(),
                    };
                    choices
                        .iter()
                        .any(|choice| choice.to_string() == raw)
                        .then(|| Value::text(raw))
                }
                ListenMode::Anything => Some(Value::text(raw)),
            };

            if let Some(value) = accepted {
                self.state.store(target, value);
                return Ok(());
            }

            let retry = match mode {
                ListenMode::Number => "  Please enter a valid number.".to_string(),
                ListenMode::YesNo => "  Please answer yes or no.".to_string(),
                _ => {
                    let choices = match &options {
                        Some(Value::List(items)) => items
                            .iter()
                            .map(ToString::to_string)
                            .collect::<Vec<_>>()
                            .join(", "),
                        Some(other) => other.to_string(),
                        None => String::new(),
                    };
                    format!("  Choose one of: {}", choices)
                }
            };
            self.say(retry)?;
        }
    }

    fn pause(&mut self, amount: &Expression) -> Result<()> {
        let seconds = self.evaluate(amount)?.as_float()?;
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(Error::value(format!("cannot wait {} seconds", seconds)));
        }
        if self.config.allow_sleep {
            std::thread::sleep(Duration::from_secs_f64(seconds));
        }
        Ok(())
    }

    fn ensure_declared_state(&self, name: &str, state: &str) -> Result<()> {
        match self.state.states.get(name) {
            Some(states) if !states.iter().any(|s| s == state) => Err(Error::value(format!(
                "'{}' is not valid for '{}'",
                state, name
            ))),
            _ => Ok(()),
        }
    }

    fn exec_state_become(&mut self, name: &str, new_state: &str) -> Result<()> {
        self.ensure_declared_state(name, new_state)?;
        let current = self.state.state_current.get(name).cloned();
        if let Some(graph) = self.state.state_transitions.get(name) {
            let allowed = current
                .as_ref()
                .and_then(|from| graph.get(from))
                .is_some_and(|targets| targets.iter().any(|t| t == new_state));
            if !allowed {
                return Err(Error::value(format!(
                    "'{}' cannot go from '{}' to '{}'",
                    name,
                    current.as_deref().unwrap_or("nothing"),
                    new_state
                )));
            }
        }
        if self.state.debug {
            self.say(format!(
                "  [state] {}: {} -> {}",
                name,
                current.as_deref().unwrap_or("nothing"),
                new_state
            ))?;
        }
        self.state
            .state_current
            .insert(name.to_string(), new_state.to_string());
        self.assign(name, Value::text(new_state), Certainty::Definitely)
    }

    fn exec_add_to_group(&mut self, item: Value, group: &str) -> Result<()> {
        if let Some(declared) = self.state.groups.get_mut(group) {
            declared.items.push(item);
            let items = Value::list(declared.items.clone());
            self.state.store(group, items);
            return Ok(());
        }
        match self.state.value_of(group) {
            Some(Value::List(items)) => {
                let mut items = items.to_vec();
                items.push(item);
                self.state.store(group, Value::list(items));
                Ok(())
            }
            _ => Err(Error::NameError {
                what: "group",
                name: group.to_string(),
            }),
        }
    }

    fn exec_show(&mut self, value: &Expression, style: &ShowStyle) -> Result<()> {
        match style {
            ShowStyle::Plain => {
                let value = self.evaluate(value)?;
                self.say(value.to_string())
            }
            ShowStyle::List => {
                let value = self.evaluate(value)?;
                self.say_all(report::numbered_list(&value))
            }
            ShowStyle::BarChart => {
                let value = self.evaluate(value)?;
                let lines = report::bar_chart(&value)?;
                self.say_all(lines)
            }
            ShowStyle::SortedBy(column) => {
                let table_name = value.as_variable().unwrap_or_default();
                let column = self.evaluate(column)?.as_int()? - 1;
                let rows = self.state.tables.get(table_name).cloned().ok_or_else(|| {
                    Error::NameError {
                        what: "table",
                        name: value.to_string(),
                    }
                })?;
                let key = |row: &Vec<Value>| {
                    usize::try_from(column)
                        .ok()
                        .and_then(|c| row.get(c).cloned())
                        .unwrap_or(Value::Int(0))
                };
                let mut failure = None;
                let mut sorted = rows;
                sorted.sort_by(|a, b| {
                    let (ka, kb) = (key(a), key(b));
                    ka.ordering(&kb).unwrap_or_else(|| {
                        failure.get_or_insert((ka.type_name(), kb.type_name()));
                        Ordering::Equal
                    })
                });
                if let Some((left, right)) = failure {
                    return Err(Error::InvalidOperation {
                        op: "sort".to_string(),
                        left_type: left.to_string(),
                        right_type: right.to_string(),
                    });
                }
                for row in sorted {
                    let cells: Vec<String> = row.iter().map(ToString::to_string).collect();
                    self.say(format!("  {}", cells.join(" | ")))?;
                }
                Ok(())
            }
        }
    }

    fn exec_log(&mut self, message: String, level: LogLevel) -> Result<()> {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        let tag = match level {
            LogLevel::Info => "",
            LogLevel::Warning => "WARNING: ",
            LogLevel::Error => "ERROR: ",
        };
        match level {
            LogLevel::Info => tracing::info!(target: "figlang::program", "{}", message),
            LogLevel::Warning => tracing::warn!(target: "figlang::program", "{}", message),
            LogLevel::Error => tracing::error!(target: "figlang::program", "{}", message),
        }
        let entry = format!("[{}] {}{}", timestamp, tag, message);
        self.state.logs.push(entry.clone());
        self.say(format!("  {}", entry))
    }

    fn exec_chain(&mut self, target: &str, steps: &[ChainStep]) -> Result<()> {
        let mut text = match self.state.value_of(target) {
            Some(value) => value.to_string(),
            None => target.to_string(),
        };
        for step in steps {
            match step {
                ChainStep::Clean => text = text.trim().to_string(),
                ChainStep::Capitalize => text = ops::title_case(&text),
                ChainStep::Uppercase => text = text.to_uppercase(),
                ChainStep::Lowercase => text = text.to_lowercase(),
                ChainStep::Say => self.say(&text)?,
            }
        }
        self.state.store(target, Value::Text(text));
        Ok(())
    }

    fn exec_use(&mut self, name: &str) -> Result<()> {
        let path = persistence::resolve_library(
            name,
            self.source_dir.as_deref(),
            &self.config.library_dirs,
        )?;
        tracing::debug!(library = %path.display(), "loading library");
        let source = persistence::read_text(&path)?;
        let program = parse_source(&source)?;

        let previous_dir = self.source_dir.replace(parent_dir(&path));
        let result = self.run(&program);
        self.source_dir = previous_dir;
        result?;

        if self.state.debug {
            self.say(format!("  [use] loaded '{}'", path.display()))?;
        }
        Ok(())
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Accepts `12` or `1.5`; a dot makes the answer a decimal
fn parse_number_answer(raw: &str) -> Option<Value> {
    if raw.contains('.') {
        raw.parse::<f64>()
            .ok()
            .filter(|x| x.is_finite())
            .map(Value::Float)
    } else {
        raw.parse::<i64>().ok().map(Value::Int)
    }
}

/// Ascending copy; fails when two items cannot be ordered
pub(super) fn sorted_values(items: &[Value]) -> Result<Vec<Value>> {
    let mut sorted = items.to_vec();
    let mut failure = None;
    sorted.sort_by(|a, b| {
        a.ordering(b).unwrap_or_else(|| {
            failure.get_or_insert((a.type_name(), b.type_name()));
            Ordering::Equal
        })
    });
    match failure {
        Some((left, right)) => Err(Error::InvalidOperation {
            op: "sort".to_string(),
            left_type: left.to_string(),
            right_type: right.to_string(),
        }),
        None => Ok(sorted),
    }
}
