use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Instant;

use crate::parser::{Block, Condition, Constraint};
use crate::runtime::{Value, Variable};

/// `whenever` registration
#[derive(Debug, Clone)]
pub struct WheneverEntry {
    /// Re-checked after every assignment
    pub condition: Condition,
    /// Run each time the condition holds
    pub body: Block,
}

/// `every N times NAME changes` registration with its own counter
#[derive(Debug, Clone)]
pub struct EveryEntry {
    /// Changes between firings
    pub times: i64,
    /// Watched variable
    pub variable: String,
    /// Block to run
    pub body: Block,
    /// Changes seen since the last firing
    pub counter: i64,
}

/// `NAME reacts to A and B` registration
#[derive(Debug, Clone)]
pub struct Reaction {
    /// Reaction name, unique among reactions
    pub name: String,
    /// Variables whose assignment runs the body
    pub dependencies: Vec<String>,
    /// Block to run
    pub body: Block,
}

/// Typed, appendable collection declared with `is a group of`
#[derive(Debug, Clone, Default)]
pub struct Group {
    /// Declared item type (informational)
    pub item_type: String,
    /// Items in insertion order
    pub items: Vec<Value>,
}

/// Everything a running program has defined
///
/// One flat namespace; reactive registrations are keyed by variable name
/// so redefining a variable keeps its subscriptions.
#[derive(Debug, Default)]
pub struct RuntimeState {
    /// Global variables
    pub variables: HashMap<String, Variable>,
    /// `zone called` blocks
    pub zones: HashMap<String, Block>,
    /// `role ... has` blocks
    pub roles: HashMap<String, Block>,
    /// `alias ... means` blocks
    pub aliases: HashMap<String, Block>,
    /// Whenever registrations in declaration order
    pub whenevers: Vec<WheneverEntry>,
    /// Every-N-changes registrations in declaration order
    pub everys: Vec<EveryEntry>,
    /// Variables whose changes are announced
    pub watchers: HashSet<String>,
    /// Constraints per variable
    pub requires: HashMap<String, Vec<Constraint>>,
    /// Legal states per state variable, in declaration order
    pub states: HashMap<String, Vec<String>>,
    /// Allowed transitions per state variable: from -> [to]
    pub state_transitions: HashMap<String, HashMap<String, Vec<String>>>,
    /// Current state per state variable
    pub state_current: HashMap<String, String>,
    /// Reactions in declaration order
    pub reactions: Vec<Reaction>,
    /// Named deep copies of the variables
    pub snapshots: HashMap<String, HashMap<String, Variable>>,
    /// Declared groups
    pub groups: HashMap<String, Group>,
    /// Tables as rows of evaluated cells
    pub tables: HashMap<String, Vec<Vec<Value>>>,
    /// Declared maps
    pub maps: HashMap<String, BTreeMap<String, Value>>,
    /// Formatted log entries
    pub logs: Vec<String>,
    /// Set by `start timer`
    pub timer_start: Option<Instant>,
    /// Seconds measured by the last `stop timer`
    pub timer_value: f64,
    /// `debug on`
    pub debug: bool,
}

impl RuntimeState {
    /// Creates an empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a variable
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    /// Current value of a variable
    pub fn value_of(&self, name: &str) -> Option<&Value> {
        self.variables.get(name).map(Variable::value)
    }

    /// Stores a value without running any reactive hooks
    ///
    /// Existing variables keep their history and limits; new ones are
    /// created. Returns the previous value when there was one.
    pub fn store(&mut self, name: &str, value: Value) -> Option<Value> {
        match self.variables.get_mut(name) {
            Some(var) => Some(var.set(value, Default::default())),
            None => {
                self.variables.insert(name.to_string(), Variable::new(value));
                None
            }
        }
    }

    /// Adds a reaction, replacing an earlier one with the same name in place
    pub fn define_reaction(&mut self, reaction: Reaction) {
        match self.reactions.iter_mut().find(|r| r.name == reaction.name) {
            Some(existing) => *existing = reaction,
            None => self.reactions.push(reaction),
        }
    }

    /// Copies every variable under `name`
    pub fn take_snapshot(&mut self, name: &str) {
        self.snapshots
            .insert(name.to_string(), self.variables.clone());
    }

    /// Writes the saved variables back; variables created after the
    /// snapshot are left alone. False when no such snapshot exists.
    pub fn restore_snapshot(&mut self, name: &str) -> bool {
        match self.snapshots.get(name) {
            Some(saved) => {
                for (var_name, var) in saved {
                    self.variables.insert(var_name.clone(), var.clone());
                }
                true
            }
            None => false,
        }
    }

    /// True when `name` is a declared state of any state variable
    pub fn is_state_name(&self, name: &str) -> bool {
        self.states.values().any(|states| states.iter().any(|s| s == name))
    }

    /// Variable names sharing the first character of `name`, sorted
    pub fn similar_names(&self, name: &str) -> Vec<String> {
        let Some(first) = name.chars().next() else {
            return Vec::new();
        };
        let mut similar: Vec<String> = self
            .variables
            .keys()
            .filter(|k| k.starts_with(first) && k.as_str() != name)
            .cloned()
            .collect();
        similar.sort();
        similar
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_store_keeps_history() {
        let mut state = RuntimeState::new();
        assert_eq!(state.store("x", Value::Int(1)), None);
        assert_eq!(state.store("x", Value::Int(2)), Some(Value::Int(1)));
        assert_eq!(state.variable("x").unwrap().history().len(), 2);
    }

    #[test]
    fn test_snapshot_restore_leaves_newer_variables() {
        let mut state = RuntimeState::new();
        state.store("a", Value::Int(1));
        state.take_snapshot("s");
        state.store("a", Value::Int(9));
        state.store("b", Value::Int(5));
        assert!(state.restore_snapshot("s"));
        assert_eq!(state.value_of("a"), Some(&Value::Int(1)));
        assert_eq!(state.value_of("b"), Some(&Value::Int(5)));
        assert!(!state.restore_snapshot("missing"));
    }

    #[test]
    fn test_reactions_replace_by_name() {
        let mut state = RuntimeState::new();
        let body = Arc::new(Vec::new());
        state.define_reaction(Reaction {
            name: "r".into(),
            dependencies: vec!["a".into()],
            body: body.clone(),
        });
        state.define_reaction(Reaction {
            name: "other".into(),
            dependencies: vec![],
            body: body.clone(),
        });
        state.define_reaction(Reaction {
            name: "r".into(),
            dependencies: vec!["b".into()],
            body,
        });
        assert_eq!(state.reactions.len(), 2);
        assert_eq!(state.reactions[0].dependencies, vec!["b".to_string()]);
    }

    #[test]
    fn test_similar_names() {
        let mut state = RuntimeState::new();
        for name in ["total", "tax", "price"] {
            state.store(name, Value::Int(0));
        }
        assert_eq!(state.similar_names("totl"), vec!["tax", "total"]);
        assert!(state.similar_names("").is_empty());
    }
}
