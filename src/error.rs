//! Error types for the FigLang interpreter

use thiserror::Error;

/// FigLang interpreter errors
#[derive(Error, Debug, Clone)]
pub enum Error {
    // Front-end errors
    /// Character that matches none of the token patterns
    ///
    /// **Triggered by:** Stray symbols such as `=`, `!` or an unterminated `"`
    /// **Example:** `x = 5` (assignment is written `x is 5`)
    #[error("unexpected character '{character}' on line {line}")]
    LexError {
        /// The offending character
        character: char,
        /// Line number where the character appears (1-indexed)
        line: usize,
    },

    /// Unexpected or missing token while parsing
    ///
    /// **Triggered by:** A statement keyword followed by the wrong shape
    /// **Example:** `repeat 3:` (missing `times`)
    #[error("expected {expected} but found {found} on line {line}")]
    ParseError {
        /// Description of what the grammar wanted
        expected: String,
        /// Description of the token actually present
        found: String,
        /// Line number of the offending token
        line: usize,
    },

    // Runtime errors
    /// Reference to something that was never defined
    ///
    /// **Triggered by:** Reading a variable, zone, group, field or action by a name
    /// that does not exist
    /// **Example:** `say total` before `total is ...`
    #[error("{what} '{name}' is not defined")]
    NameError {
        /// What kind of thing was looked up (variable, zone, field, ...)
        what: &'static str,
        /// The unresolved name
        name: String,
    },

    /// A value broke a declared rule
    ///
    /// **Triggered by:** Failed `require` constraints, invalid state transitions,
    /// unsupported unit conversions
    #[error("{0}")]
    ValueError(String),

    /// Type mismatch error
    #[error("expected {expected}, got {got}")]
    TypeError {
        /// Expected type
        expected: String,
        /// Actual type
        got: String,
    },

    /// Operator applied to incompatible operand types
    ///
    /// **Example:** `"apples" - 3`
    #[error("cannot apply {op} to {left_type} and {right_type}")]
    InvalidOperation {
        /// Operator name
        op: String,
        /// Left operand type
        left_type: String,
        /// Right operand type
        right_type: String,
    },

    /// Division by zero error
    #[error("cannot divide by zero")]
    DivisionByZero,

    /// Runaway `until` loop
    #[error("until loop exceeded {limit} iterations")]
    TooManyIterations {
        /// Maximum allowed iterations
        limit: usize,
    },

    /// Nested blocks went deeper than the configured bound
    ///
    /// **Triggered by:** A zone calling itself, or a whenever body that keeps
    /// re-triggering itself through assignment
    #[error("blocks nested deeper than {depth} levels (infinite loop?)")]
    RecursionLimit {
        /// Configured maximum depth
        depth: usize,
    },

    // File errors
    /// File or library could not be found
    #[error("file '{path}' not found")]
    FileNotFound {
        /// Path that was looked up
        path: String,
    },

    /// Any other I/O failure
    #[error("could not access '{path}': {message}")]
    Io {
        /// Path involved in the failure
        path: String,
        /// Underlying error message
        message: String,
    },

    /// Interactive input reached end of stream
    #[error("input ended while waiting for an answer")]
    InputClosed,
}

/// Broad family an error belongs to, used for report titles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Lexing or parsing failed; nothing was executed
    Syntax,
    /// Undefined name
    Name,
    /// Rule or conversion violation
    Value,
    /// Incompatible types
    Type,
    /// Arithmetic failure
    Math,
    /// Runaway loop or recursion
    Loop,
    /// Missing or unreadable file
    File,
    /// Interactive input failure
    Input,
}

impl ErrorCategory {
    /// Human-readable title used in diagnostic banners
    pub fn title(&self) -> &'static str {
        match self {
            ErrorCategory::Syntax => "Syntax Error",
            ErrorCategory::Name => "Name Error",
            ErrorCategory::Value => "Value Error",
            ErrorCategory::Type => "Type Error",
            ErrorCategory::Math => "Math Error",
            ErrorCategory::Loop => "Loop Error",
            ErrorCategory::File => "File Error",
            ErrorCategory::Input => "Input Error",
        }
    }
}

impl Error {
    /// Create a value error with a message
    pub fn value(msg: impl Into<String>) -> Self {
        Error::ValueError(msg.into())
    }

    /// Create a name error for an undefined variable
    pub fn undefined(name: impl Into<String>) -> Self {
        Error::NameError {
            what: "variable",
            name: name.into(),
        }
    }

    /// Create an I/O error tied to a path
    pub fn io(path: impl Into<String>, err: &std::io::Error) -> Self {
        let path = path.into();
        if err.kind() == std::io::ErrorKind::NotFound {
            Error::FileNotFound { path }
        } else {
            Error::Io {
                path,
                message: err.to_string(),
            }
        }
    }

    /// Classify the error into its reporting family
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::LexError { .. } | Error::ParseError { .. } => ErrorCategory::Syntax,
            Error::NameError { .. } => ErrorCategory::Name,
            Error::ValueError(_) => ErrorCategory::Value,
            Error::TypeError { .. } | Error::InvalidOperation { .. } => ErrorCategory::Type,
            Error::DivisionByZero => ErrorCategory::Math,
            Error::TooManyIterations { .. } | Error::RecursionLimit { .. } => ErrorCategory::Loop,
            Error::FileNotFound { .. } | Error::Io { .. } => ErrorCategory::File,
            Error::InputClosed => ErrorCategory::Input,
        }
    }

    /// True for errors raised before execution starts
    pub fn is_syntax(&self) -> bool {
        self.category() == ErrorCategory::Syntax
    }

    /// Source line attached to the error, if any
    pub fn line(&self) -> Option<usize> {
        match self {
            Error::LexError { line, .. } | Error::ParseError { line, .. } => Some(*line),
            _ => None,
        }
    }

    /// Name that failed to resolve, for "did you mean" suggestions
    pub fn unresolved_name(&self) -> Option<&str> {
        match self {
            Error::NameError { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Message with a friendlier explanation for the most common type mistake
    pub fn enhanced_message(&self) -> String {
        match self {
            Error::InvalidOperation {
                left_type,
                right_type,
                ..
            } if (left_type == "text") != (right_type == "text") => format!(
                "{}\n  make sure both values are numbers",
                self
            ),
            _ => self.to_string(),
        }
    }
}

/// Result type for FigLang operations
pub type Result<T> = std::result::Result<T, Error>;
