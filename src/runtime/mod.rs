//! Runtime execution for FigLang programs: values, variables with history,
//! the reactive evaluator and its side-effect helpers

pub mod config;
pub mod console;
mod evaluator;
mod expression;
pub mod ops;
pub mod persistence;
pub mod report;
pub mod state;
mod value;
mod variable;

pub use config::EvaluatorConfig;
pub use console::{BufferedConsole, CapturedOutput, Console, StdConsole};
pub use evaluator::FigEvaluator;
pub use state::{EveryEntry, Group, Reaction, RuntimeState, WheneverEntry};
pub use value::Value;
pub use variable::Variable;
