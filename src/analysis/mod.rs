//! Advisory analyzers run around the interpreter pipeline
//!
//! Neither analyzer affects execution: [`hints`] looks at raw source for
//! words borrowed from other languages or misspelled keywords, and
//! [`warnings`] walks a parsed program for likely mistakes.

pub mod hints;
pub mod warnings;

pub use hints::suggest;
pub use warnings::analyze;
