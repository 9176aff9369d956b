//! FigLang Parser Module
//!
//! Parses the token stream into an Abstract Syntax Tree (AST).

mod ast;
mod expression;
mod fig_parser;

pub use ast::{
    Annotation, BinaryOp, Block, Certainty, ChainStep, ClockQuery, CollectionOp, CompareOp,
    Condition, Constraint, Direction, Expression, FormatStyle, ListenMode, LogLevel, LogicalOp,
    MathOp, MemoryQuery, PipelineStep, Program, ShowStyle, Statement, TextOp, Trend, Unit,
    ValidationKind,
};
pub use fig_parser::{parse_source, FigParser, MAX_NESTING};
