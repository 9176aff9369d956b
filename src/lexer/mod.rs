//! Lexical analysis for FigLang
//!
//! Converts source text into a stream of tokens, resolving multi-word
//! phrases before single-word keywords and identifiers.

mod scanner;
mod token;

pub use scanner::{tokenize, FigScanner};
pub use token::{Token, TokenKind};
