//! # FigLang - An English-like Scripting Language
//!
//! FigLang reads like plain English and keeps track of more than just the
//! current value of each variable: every variable remembers its history,
//! carries a certainty, may be clamped by limits and annotated with units
//! or owners. Programs can react to change (`whenever`, `reacts to`,
//! `every N times`), model state machines and persist values between runs.
//!
//! ## Quick Start
//!
//! ```rust
//! use figlang::{BufferedConsole, Evaluator, Parser, Scanner, Value};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let code = "price is 40\nsay price + 2";
//!
//! // Tokenize (scan)
//! let mut scanner = Scanner::new(code);
//! let tokens = scanner.scan_tokens()?;
//!
//! // Parse into AST
//! let mut parser = Parser::new(tokens);
//! let program = parser.parse()?;
//!
//! // Execute, capturing what the program says
//! let console = BufferedConsole::new();
//! let output = console.output();
//! let mut evaluator = Evaluator::new().with_console(console);
//! evaluator.run(&program)?;
//!
//! assert_eq!(output.lines(), vec!["42"]);
//! assert_eq!(evaluator.value("price"), Some(&Value::Int(40)));
//! # Ok(())
//! # }
//! ```
//!
//! ## Language Overview
//!
//! ### Variables
//! - Assignment: `name is value`, optionally `probably`/`maybe`
//! - Limits: `speed is never goes below 0 or above 120`
//! - Rules: `require age to be between 0 and 120`
//! - Annotations: `weight described as "net" measured in "kg"`
//!
//! ### Control Flow
//! - `if`, `but if`, `otherwise`, `given`
//! - `repeat N times`, `count from A to B`, `for each x in list`, `until`
//! - `zone called name:` and `do name`
//!
//! ### Reactivity
//!
//! Registered blocks run after every assignment, in a fixed order: watch
//! notices, `require` checks, `whenever` conditions, `every N times`
//! counters, then `reacts to` blocks.
//!
//! ```rust
//! use figlang::{BufferedConsole, Evaluator};
//!
//! # fn main() -> figlang::Result<()> {
//! let console = BufferedConsole::new();
//! let output = console.output();
//! let mut evaluator = Evaluator::new().with_console(console);
//! evaluator.run_source(
//!     "whenever temperature is above 30: say \"hot\"\n\
//!      temperature is 25\n\
//!      temperature is 35",
//! )?;
//! assert_eq!(output.lines(), vec!["hot"]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! 1. **Lexer** ([`lexer`]) - phrases, keywords, symbols, identifiers
//! 2. **Parser** ([`parser`]) - recursive descent into [`Program`]
//! 3. **Evaluator** ([`runtime`]) - tree walking over a single global state
//!
//! [`analysis`] and [`diagnostics`] sit around that pipeline and only
//! produce advice and reports.
//!
//! ## Error Handling
//!
//! ```rust
//! use figlang::error::ErrorCategory;
//! use figlang::{BufferedConsole, Error, Evaluator};
//!
//! let mut evaluator = Evaluator::new().with_console(BufferedConsole::new());
//! match evaluator.run_source("say missing") {
//!     Err(e @ Error::NameError { .. }) => {
//!         assert_eq!(e.category(), ErrorCategory::Name);
//!         assert_eq!(e.to_string(), "variable 'missing' is not defined");
//!     }
//!     other => panic!("expected a name error, got {:?}", other),
//! }
//! ```
//!
//! ## License
//!
//! Licensed under the [MIT License](https://opensource.org/licenses/MIT).

/// Version of the FigLang interpreter
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod analysis;
pub mod diagnostics;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod runtime;

// Re-export main types
pub use error::{Error, Result};
pub use lexer::{FigScanner, Token, TokenKind};
pub use parser::{Condition, Expression, FigParser, Program, Statement};
pub use runtime::{
    BufferedConsole, CapturedOutput, Console, EvaluatorConfig, FigEvaluator, RuntimeState,
    StdConsole, Value, Variable,
};

// Convenient type aliases for the pipeline stages
/// Type alias for the scanner (lexer).
pub type Scanner = FigScanner;

/// Type alias for the parser.
pub type Parser = FigParser;

/// Type alias for the evaluator.
pub type Evaluator = FigEvaluator;
