use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A nested statement block. Shared so zones, aliases and reactive
/// registrations can hold on to it without copying the tree.
pub type Block = Arc<Vec<Statement>>;

/// Complete FigLang program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Program {
    /// Top-level statements in source order
    pub statements: Vec<Statement>,
}

/// Statement types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    /// `name is [certainty] value`
    Assign {
        /// Variable name
        name: String,
        /// Value expression
        value: Expression,
        /// Certainty qualifier attached to the value
        certainty: Certainty,
    },

    /// `say value`
    Say(Expression),

    /// `say name with context`
    SayWithContext(Expression),

    /// `ask "prompt" -> name`
    Ask {
        /// Prompt text
        prompt: String,
        /// Variable receiving the answer
        target: String,
    },

    /// `if cond: ... but if cond: ... otherwise: ...`
    If {
        /// Primary condition
        condition: Condition,
        /// Block run when the condition holds
        then_branch: Block,
        /// `but if` branches in order
        else_ifs: Vec<(Condition, Block)>,
        /// `otherwise` block
        else_branch: Option<Block>,
    },

    /// `given cond:` (a single-branch if)
    Given {
        /// Guard condition
        condition: Condition,
        /// Guarded block
        body: Block,
    },

    /// `until cond:`
    Until {
        /// Loop exit condition
        condition: Condition,
        /// Loop body
        body: Block,
    },

    /// `repeat N times:`
    Repeat {
        /// Iteration count
        count: Expression,
        /// Loop body
        body: Block,
    },

    /// `count from A to B:` binding `it`
    CountFrom {
        /// First value (inclusive)
        from: Expression,
        /// Last value (inclusive)
        to: Expression,
        /// Loop body
        body: Block,
    },

    /// `for each x in collection:`
    ForEach {
        /// Loop variable name
        variable: String,
        /// Sequence to iterate
        collection: Expression,
        /// Loop body
        body: Block,
    },

    /// `whenever cond:`
    Whenever {
        /// Condition re-checked after every assignment
        condition: Condition,
        /// Block run while it holds
        body: Block,
    },

    /// `every N times name changes:`
    Every {
        /// Number of changes between firings
        times: Expression,
        /// Watched variable
        variable: String,
        /// Block run on every Nth change
        body: Block,
    },

    /// `name reacts to a and b:`
    Reacts {
        /// Reaction name
        name: String,
        /// Variables whose assignment triggers the block
        dependencies: Vec<String>,
        /// Reaction body
        body: Block,
    },

    /// `name and other are linked:`
    Link {
        /// First linked variable
        name: String,
        /// Second linked variable
        other: String,
        /// Block run when either changes
        body: Block,
    },

    /// `assume name is value unless defined`
    Assume {
        /// Variable name
        name: String,
        /// Default value
        value: Expression,
    },

    /// `require name to be ...`
    Require {
        /// Constrained variable
        name: String,
        /// Constraints checked on every assignment
        constraints: Vec<Constraint>,
    },

    /// `name is never goes below X or above Y`
    Limits {
        /// Clamped variable
        name: String,
        /// (direction, bound) pairs
        limits: Vec<(Direction, Expression)>,
    },

    /// `start with data, keep above 3, double each, sorted, say each`
    Pipeline {
        /// Data source
        source: Expression,
        /// Processing steps in order
        steps: Vec<PipelineStep>,
    },

    /// `try to stmt but if it fails stmt`
    Try {
        /// Guarded statement
        body: Box<Statement>,
        /// Statement run if the guarded one fails
        fallback: Option<Box<Statement>>,
    },

    /// `zone called name:`
    Zone {
        /// Zone name
        name: String,
        /// Zone body
        body: Block,
    },

    /// `do name [again]`
    DoZone(String),

    /// `role name has:`
    Role {
        /// Role name
        name: String,
        /// Role body
        body: Block,
    },

    /// `alias "name" means: ...`
    Alias {
        /// Alias name
        name: String,
        /// Block the alias stands for
        body: Block,
    },

    /// `subject action args...`
    Invoke {
        /// Subject variable
        subject: String,
        /// Action (alias) name
        action: String,
        /// Trailing argument expressions
        args: Vec<Expression>,
    },

    /// `watch name`
    Watch(String),

    /// `unwatch name`
    Unwatch(String),

    /// `explain name`
    Explain(String),

    /// `debug on|off`
    Debug(bool),

    /// `take snapshot "name"`
    TakeSnapshot(String),

    /// `restore snapshot "name"`
    RestoreSnapshot(String),

    /// `remember name as "key"`
    Remember {
        /// Variable to persist
        variable: String,
        /// Storage key
        key: String,
    },

    /// `recall "key" -> name`
    Recall {
        /// Storage key
        key: String,
        /// Variable receiving the value
        target: String,
    },

    /// `forget "key"`
    Forget(String),

    /// `check that cond`
    Check(Condition),

    /// `listen for ... -> name`
    Listen {
        /// Shape the input must have
        mode: ListenMode,
        /// Variable receiving the answer
        target: String,
    },

    /// `measure time:`
    MeasureTime(Block),

    /// `wait N [seconds]`
    Wait(Expression),

    /// `after N [seconds]:`
    After {
        /// Delay in seconds
        delay: Expression,
        /// Block run after the delay
        body: Block,
    },

    /// `start timer`
    StartTimer,

    /// `stop timer`
    StopTimer,

    /// `name can be a, b, c`
    StateDecl {
        /// State variable
        name: String,
        /// Legal states
        states: Vec<String>,
    },

    /// `name starts as state`
    StateStart {
        /// State variable
        name: String,
        /// Initial state
        state: String,
    },

    /// `name becomes state`
    StateBecome {
        /// State variable
        name: String,
        /// Target state
        state: String,
    },

    /// `name can go from a to b`
    StateTransition {
        /// State variable
        name: String,
        /// Source state
        from: String,
        /// Destination state
        to: String,
    },

    /// `name described as "..." measured in "..." owned by "..."`
    Annotate {
        /// Annotated variable
        name: String,
        /// Annotations in source order
        annotations: Vec<(Annotation, String)>,
    },

    /// `name is a group of item`
    GroupDecl {
        /// Group name
        name: String,
        /// Declared item type
        item_type: String,
    },

    /// `add item to group`
    AddToGroup {
        /// Item expression
        item: Expression,
        /// Group (or list variable) name
        group: String,
    },

    /// `name has:` followed by `field is value` lines
    MapDecl {
        /// Map name
        name: String,
        /// Field definitions
        fields: Vec<(String, Expression)>,
    },

    /// `table name:` followed by `a | b` rows
    TableDecl {
        /// Table name
        name: String,
        /// Row cells
        rows: Vec<Vec<Expression>>,
    },

    /// `read path -> name`
    ReadFile {
        /// File path
        path: Expression,
        /// Variable receiving the content
        target: String,
    },

    /// `write content to path`
    WriteFile {
        /// Content to write
        content: Expression,
        /// File path
        path: Expression,
    },

    /// `append content to path`
    AppendFile {
        /// Content to append
        content: Expression,
        /// File path
        path: Expression,
    },

    /// `lines of path -> name`
    LinesOf {
        /// File path
        path: Expression,
        /// Variable receiving the lines
        target: String,
    },

    /// `show value [as list | as bar chart | sorted by N]`
    Show {
        /// Value to display
        value: Expression,
        /// Display style
        style: ShowStyle,
    },

    /// `validate email|url|number value`
    Validate {
        /// Validation rule
        kind: ValidationKind,
        /// Value to check
        value: Expression,
    },

    /// `log message [with level warning]`
    Log {
        /// Message expression
        message: Expression,
        /// Severity
        level: LogLevel,
    },

    /// `save logs to path`
    SaveLogs(Expression),

    /// `compare a and b`
    Compare {
        /// Left operand
        left: Expression,
        /// Right operand
        right: Expression,
    },

    /// `clean name then capitalize then say`
    Chain {
        /// Variable transformed in place
        target: String,
        /// Steps applied in order
        steps: Vec<ChainStep>,
    },

    /// `clamp name between low and high [then say]`
    Clamp {
        /// Variable clamped in place
        target: String,
        /// Lower bound
        low: Expression,
        /// Upper bound
        high: Expression,
        /// Print the result afterwards
        say: bool,
    },

    /// `use "library"`
    Use(String),

    /// Bare expression evaluated for its effects
    Expression(Expression),
}

impl Statement {
    /// Short name shown by `debug on`
    pub fn kind_name(&self) -> &'static str {
        match self {
            Statement::Assign { .. } => "assign",
            Statement::Say(_) => "say",
            Statement::SayWithContext(_) => "say_context",
            Statement::Ask { .. } => "ask",
            Statement::If { .. } => "if",
            Statement::Given { .. } => "given",
            Statement::Until { .. } => "until",
            Statement::Repeat { .. } => "repeat",
            Statement::CountFrom { .. } => "count",
            Statement::ForEach { .. } => "for_each",
            Statement::Whenever { .. } => "whenever",
            Statement::Every { .. } => "every",
            Statement::Reacts { .. } => "react",
            Statement::Link { .. } => "link",
            Statement::Assume { .. } => "assume",
            Statement::Require { .. } => "require",
            Statement::Limits { .. } => "set_limits",
            Statement::Pipeline { .. } => "pipeline",
            Statement::Try { .. } => "try",
            Statement::Zone { .. } => "zone_def",
            Statement::DoZone(_) => "do_zone",
            Statement::Role { .. } => "role_def",
            Statement::Alias { .. } => "alias",
            Statement::Invoke { .. } => "call_method",
            Statement::Watch(_) => "watch",
            Statement::Unwatch(_) => "unwatch",
            Statement::Explain(_) => "explain",
            Statement::Debug(_) => "debug",
            Statement::TakeSnapshot(_) => "snapshot",
            Statement::RestoreSnapshot(_) => "restore",
            Statement::Remember { .. } => "remember",
            Statement::Recall { .. } => "recall",
            Statement::Forget(_) => "forget",
            Statement::Check(_) => "check",
            Statement::Listen { .. } => "listen",
            Statement::MeasureTime(_) => "measure",
            Statement::Wait(_) => "wait",
            Statement::After { .. } => "after",
            Statement::StartTimer => "start_timer",
            Statement::StopTimer => "stop_timer",
            Statement::StateDecl { .. } => "state_def",
            Statement::StateStart { .. } => "state_start",
            Statement::StateBecome { .. } => "state_become",
            Statement::StateTransition { .. } => "state_transition",
            Statement::Annotate { .. } => "annotate",
            Statement::GroupDecl { .. } => "group_def",
            Statement::AddToGroup { .. } => "add_to_group",
            Statement::MapDecl { .. } => "map_def",
            Statement::TableDecl { .. } => "table_def",
            Statement::ReadFile { .. } => "read_file",
            Statement::WriteFile { .. } => "write_file",
            Statement::AppendFile { .. } => "append_file",
            Statement::LinesOf { .. } => "lines_of",
            Statement::Show { .. } => "show",
            Statement::Validate { .. } => "validate",
            Statement::Log { .. } => "log",
            Statement::SaveLogs(_) => "save_logs",
            Statement::Compare { .. } => "compare",
            Statement::Chain { .. } => "chain",
            Statement::Clamp { .. } => "clamp",
            Statement::Use(_) => "use",
            Statement::Expression(_) => "expr",
        }
    }
}

/// Expression types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    // Literals
    /// Integer literal
    IntLiteral(i64),
    /// Float literal
    FloatLiteral(f64),
    /// String literal
    StringLiteral(String),
    /// Boolean literal
    BoolLiteral(bool),
    /// List literal `[a, b]`
    ListLiteral(Vec<Expression>),

    /// Variable reference
    Variable(String),

    /// Binary operation (left-associative, no precedence)
    Binary {
        /// Operator
        op: BinaryOp,
        /// Left operand
        left: Box<Expression>,
        /// Right operand
        right: Box<Expression>,
    },

    /// Leading minus
    Negate(Box<Expression>),

    /// Formatting suffix applied to a whole expression
    Format {
        /// Formatting style
        style: FormatStyle,
        /// Formatted expression
        value: Box<Expression>,
    },

    /// `100 celsius in fahrenheit`
    Convert {
        /// Number being converted
        value: Box<Expression>,
        /// Source unit
        from: Unit,
        /// Target unit
        to: Unit,
    },

    /// `N percent of E`
    PercentOf {
        /// Percentage
        percent: Box<Expression>,
        /// Base value
        of: Box<Expression>,
    },

    /// `half of`, `double of`, `square of`, `round`
    Math {
        /// Operation
        op: MathOp,
        /// Operand
        operand: Box<Expression>,
    },

    /// `previous value of x`, `history of x`, `highest of x`, `lowest of x`
    Memory {
        /// What to read from the variable's history
        query: MemoryQuery,
        /// Variable name
        name: String,
    },

    /// `average of x`, `total of x`, `sorted x`, `reversed x`
    Collection {
        /// Operation
        op: CollectionOp,
        /// Variable name
        name: String,
    },

    /// Text operations on a variable's rendering
    Text {
        /// Operation
        op: TextOp,
        /// Variable name
        name: String,
    },

    /// `current time|date|day`, `elapsed time`
    Clock(ClockQuery),

    /// `random number between a and b`
    RandomBetween {
        /// Lower bound (inclusive)
        low: Box<Expression>,
        /// Upper bound (inclusive)
        high: Box<Expression>,
    },

    /// `random item from list`
    RandomItem(Box<Expression>),

    /// `random true or false`
    RandomBool,

    /// `shuffled list`
    Shuffled(Box<Expression>),

    /// `row N of table`
    TableRow {
        /// Table name
        table: String,
        /// 1-based row index
        index: Box<Expression>,
    },

    /// `column N of table`
    TableColumn {
        /// Table name
        table: String,
        /// 1-based column index
        index: Box<Expression>,
    },

    /// `field of map`
    Field {
        /// Map name
        map: String,
        /// Field name
        field: String,
    },

    /// `timer`
    Timer,
}

impl Expression {
    /// Variable name if this is a bare variable reference
    pub fn as_variable(&self) -> Option<&str> {
        match self {
            Expression::Variable(name) => Some(name),
            _ => None,
        }
    }
}

/// Condition types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    /// `x is y`, `x is above y`, `x is at least y`, ...
    Compare {
        /// Left operand
        left: Expression,
        /// Comparison
        op: CompareOp,
        /// Right operand
        right: Expression,
    },
    /// `x is between a and b`
    Between {
        /// Tested value
        value: Expression,
        /// Lower bound (inclusive)
        low: Expression,
        /// Upper bound (inclusive)
        high: Expression,
    },
    /// `x is empty`
    IsEmpty(Expression),
    /// `x is not empty`
    NotEmpty(Expression),
    /// `x keeps going up|down`
    Trend {
        /// Tested value (must name a variable)
        value: Expression,
        /// Direction
        direction: Trend,
    },
    /// `x changes`
    Changes(Expression),
    /// `x hits y`
    Hits {
        /// Tested value
        value: Expression,
        /// Target value
        target: Expression,
    },
    /// `x contains y`
    Contains {
        /// Text searched
        haystack: Expression,
        /// Text searched for
        needle: Expression,
    },
    /// `x starts with y`
    StartsWith {
        /// Text tested
        text: Expression,
        /// Prefix
        prefix: Expression,
    },
    /// `x is valid email|url|number`
    Valid {
        /// Validation rule
        kind: ValidationKind,
        /// Value tested
        value: Expression,
    },
    /// A condition softened by `probably` or `maybe`
    Qualified {
        /// Certainty qualifier
        certainty: Certainty,
        /// Underlying condition
        condition: Box<Condition>,
    },
    /// `a and b`, `a or b` (right-associated)
    Logical {
        /// Connective
        op: LogicalOp,
        /// Left condition
        left: Box<Condition>,
        /// Right condition
        right: Box<Condition>,
    },
    /// `x is not between a and b`, `x is not valid email`
    Not(Box<Condition>),
    /// Plain expression tested for truthiness
    Truthy(Expression),
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    /// Addition (+)
    Add,
    /// Subtraction (-)
    Sub,
    /// Multiplication (*)
    Mul,
    /// Division (/)
    Div,
    /// Greater than (>)
    Gt,
    /// Less than (<)
    Lt,
    /// Greater or equal (>=)
    GtEq,
    /// Less or equal (<=)
    LtEq,
    /// Equality (==)
    Eq,
    /// Text concatenation (`and`)
    Concat,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Gt => ">",
            BinaryOp::Lt => "<",
            BinaryOp::GtEq => ">=",
            BinaryOp::LtEq => "<=",
            BinaryOp::Eq => "==",
            BinaryOp::Concat => "and",
        };
        write!(f, "{}", s)
    }
}

/// Comparison operators used by conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    /// `is`
    Eq,
    /// `is not`
    NotEq,
    /// `is above`
    Gt,
    /// `is below`
    Lt,
    /// `is at least`
    GtEq,
    /// `is at most`
    LtEq,
}

impl CompareOp {
    /// The comparison that holds exactly when this one does not
    pub fn negated(self) -> Self {
        match self {
            CompareOp::Eq => CompareOp::NotEq,
            CompareOp::NotEq => CompareOp::Eq,
            CompareOp::Gt => CompareOp::LtEq,
            CompareOp::Lt => CompareOp::GtEq,
            CompareOp::GtEq => CompareOp::Lt,
            CompareOp::LtEq => CompareOp::Gt,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            CompareOp::Eq => "is",
            CompareOp::NotEq => "is not",
            CompareOp::Gt => "is above",
            CompareOp::Lt => "is below",
            CompareOp::GtEq => "is at least",
            CompareOp::LtEq => "is at most",
        };
        write!(f, "{}", s)
    }
}

/// Logical connectives between conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalOp {
    /// Both must hold
    And,
    /// Either must hold
    Or,
}

/// Certainty qualifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Certainty {
    /// Deterministic (the default)
    #[default]
    Definitely,
    /// True 80% of the time when the underlying test holds
    Probably,
    /// True 50% of the time when the underlying test holds
    Maybe,
}

impl Certainty {
    /// Chance that a structurally true condition reports true
    pub fn probability(self) -> f64 {
        match self {
            Certainty::Definitely => 1.0,
            Certainty::Probably => 0.8,
            Certainty::Maybe => 0.5,
        }
    }
}

impl fmt::Display for Certainty {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Certainty::Definitely => "definitely",
            Certainty::Probably => "probably",
            Certainty::Maybe => "maybe",
        };
        write!(f, "{}", s)
    }
}

/// Direction of a limit or pipeline filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Upper side
    Above,
    /// Lower side
    Below,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Direction::Above => write!(f, "above"),
            Direction::Below => write!(f, "below"),
        }
    }
}

/// Trend direction for `keeps going`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    /// Last value greater than the one before
    Up,
    /// Last value smaller than the one before
    Down,
}

/// Constraint registered by `require`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constraint {
    /// Value must be strictly greater
    Above(Expression),
    /// Value must be strictly smaller
    Below(Expression),
    /// Value must lie in the inclusive range
    Between(Expression, Expression),
    /// Value must differ
    Not(Expression),
    /// Value must equal
    Equals(Expression),
    /// Value must not be empty text, an empty list or nothing
    NotEmpty,
    /// Value must be empty
    Empty,
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Constraint::Above(e) => write!(f, "above {}", e),
            Constraint::Below(e) => write!(f, "below {}", e),
            Constraint::Between(lo, hi) => write!(f, "between {} and {}", lo, hi),
            Constraint::Not(e) => write!(f, "not {}", e),
            Constraint::Equals(e) => write!(f, "{}", e),
            Constraint::NotEmpty => write!(f, "not empty"),
            Constraint::Empty => write!(f, "empty"),
        }
    }
}

/// Step in a `start with` pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PipelineStep {
    /// Keep items above/below a bound
    Keep {
        /// Which side to keep
        direction: Direction,
        /// Bound expression
        bound: Expression,
    },
    /// Multiply every item by two
    DoubleEach,
    /// Sort ascending
    Sort,
    /// Reverse order
    Reverse,
    /// Print each item on its own line
    SayEach,
}

/// Step in a `clean ... then ...` chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainStep {
    /// Trim surrounding whitespace
    Clean,
    /// Title-case every word
    Capitalize,
    /// Upper-case
    Uppercase,
    /// Lower-case
    Lowercase,
    /// Print the current text
    Say,
}

/// What `listen for` accepts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ListenMode {
    /// A number
    Number,
    /// `yes`/`no` (also `y`/`n`)
    YesNo,
    /// One of the listed options
    OneOf(Expression),
    /// Any text
    Anything,
}

/// Display style for `show`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShowStyle {
    /// Same as `say`
    Plain,
    /// Numbered list
    List,
    /// Horizontal bar chart
    BarChart,
    /// Table rows sorted by a 1-based column
    SortedBy(Expression),
}

/// Validation rules for `validate` and `is valid`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationKind {
    /// Email address
    Email,
    /// http(s) URL
    Url,
    /// Parses as a number
    Number,
}

impl fmt::Display for ValidationKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ValidationKind::Email => write!(f, "email"),
            ValidationKind::Url => write!(f, "url"),
            ValidationKind::Number => write!(f, "number"),
        }
    }
}

/// Severity for `log`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LogLevel {
    /// No tag
    #[default]
    Info,
    /// `WARNING:` tag
    Warning,
    /// `ERROR:` tag
    Error,
}

/// Variable annotation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Annotation {
    /// `described as`
    Description,
    /// `measured in`
    Unit,
    /// `owned by`
    Owner,
}

impl Annotation {
    /// Key used when listing annotations
    pub fn key(self) -> &'static str {
        match self {
            Annotation::Description => "described_as",
            Annotation::Unit => "measured_in",
            Annotation::Owner => "owned_by",
        }
    }
}

/// Suffix formatting styles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FormatStyle {
    /// Thousands separators (`formatted`)
    Thousands,
    /// Multiply by 100 and add `%`
    Percentage,
    /// Base 2
    Binary,
    /// Base 16, upper-case
    Hexadecimal,
    /// Round to N decimals
    Rounded(Box<Expression>),
}

/// Measurement units for conversions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    /// Degrees Celsius
    Celsius,
    /// Degrees Fahrenheit
    Fahrenheit,
    /// Kilometers
    Kilometers,
    /// Miles
    Miles,
    /// Bytes
    Bytes,
    /// Kilobytes (1024 bytes)
    Kilobytes,
    /// Megabytes (1024 kilobytes)
    Megabytes,
    /// Seconds
    Seconds,
    /// Minutes
    Minutes,
    /// Hours
    Hours,
    /// Angle in degrees
    Degrees,
    /// Angle in radians
    Radians,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Unit::Celsius => "celsius",
            Unit::Fahrenheit => "fahrenheit",
            Unit::Kilometers => "kilometers",
            Unit::Miles => "miles",
            Unit::Bytes => "bytes",
            Unit::Kilobytes => "kilobytes",
            Unit::Megabytes => "megabytes",
            Unit::Seconds => "seconds",
            Unit::Minutes => "minutes",
            Unit::Hours => "hours",
            Unit::Degrees => "degrees",
            Unit::Radians => "radians",
        };
        write!(f, "{}", s)
    }
}

/// One-operand math operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MathOp {
    /// Divide by two
    Half,
    /// Multiply by two
    Double,
    /// Multiply by itself
    Square,
    /// Round to the nearest integer (ties to even)
    Round,
}

/// History queries on a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoryQuery {
    /// Value before the last assignment
    Previous,
    /// Whole history
    History,
    /// Largest value (list maximum or historic maximum)
    Highest,
    /// Smallest value (list minimum or historic minimum)
    Lowest,
}

/// Operations over a collection variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectionOp {
    /// Mean of the numeric items
    Average,
    /// Sum of the numeric items
    Total,
    /// Ascending copy
    Sorted,
    /// Reversed copy
    Reversed,
}

/// Text operations over a variable's rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TextOp {
    /// Character count
    Length,
    /// Upper-case copy
    Uppercase,
    /// Lower-case copy
    Lowercase,
    /// Title-case copy
    Capitalized,
    /// First N characters
    First(Box<Expression>),
    /// Last N characters
    Last(Box<Expression>),
    /// Copy with every occurrence removed
    Without(Box<Expression>),
    /// Copy repeated N times
    Repeated(Box<Expression>),
}

/// Wall-clock queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClockQuery {
    /// `HH:MM:SS`
    Time,
    /// `YYYY-MM-DD`
    Date,
    /// Weekday name
    Day,
    /// Duration of the last `measure time` block
    Elapsed,
}

// Source-like rendering, used for `check that` labels and `compare` headings

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expression::IntLiteral(n) => write!(f, "{}", n),
            Expression::FloatLiteral(x) => write!(f, "{}", x),
            Expression::StringLiteral(s) => write!(f, "\"{}\"", s),
            Expression::BoolLiteral(b) => write!(f, "{}", b),
            Expression::ListLiteral(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Expression::Variable(name) => write!(f, "{}", name),
            Expression::Binary { op, left, right } => write!(f, "{} {} {}", left, op, right),
            Expression::Negate(inner) => write!(f, "-{}", inner),
            Expression::Format { style, value } => match style {
                FormatStyle::Thousands => write!(f, "{} formatted", value),
                FormatStyle::Percentage => write!(f, "{} as percentage", value),
                FormatStyle::Binary => write!(f, "{} in binary", value),
                FormatStyle::Hexadecimal => write!(f, "{} in hexadecimal", value),
                FormatStyle::Rounded(n) => write!(f, "{} rounded to {}", value, n),
            },
            Expression::Convert { value, from, to } => write!(f, "{} {} in {}", value, from, to),
            Expression::PercentOf { percent, of } => write!(f, "{} percent of {}", percent, of),
            Expression::Math { op, operand } => match op {
                MathOp::Half => write!(f, "half of {}", operand),
                MathOp::Double => write!(f, "double of {}", operand),
                MathOp::Square => write!(f, "square of {}", operand),
                MathOp::Round => write!(f, "round {}", operand),
            },
            Expression::Memory { query, name } => match query {
                MemoryQuery::Previous => write!(f, "previous value of {}", name),
                MemoryQuery::History => write!(f, "history of {}", name),
                MemoryQuery::Highest => write!(f, "highest of {}", name),
                MemoryQuery::Lowest => write!(f, "lowest of {}", name),
            },
            Expression::Collection { op, name } => match op {
                CollectionOp::Average => write!(f, "average of {}", name),
                CollectionOp::Total => write!(f, "total of {}", name),
                CollectionOp::Sorted => write!(f, "sorted {}", name),
                CollectionOp::Reversed => write!(f, "reversed {}", name),
            },
            Expression::Text { op, name } => match op {
                TextOp::Length => write!(f, "length of {}", name),
                TextOp::Uppercase => write!(f, "{} in uppercase", name),
                TextOp::Lowercase => write!(f, "{} in lowercase", name),
                TextOp::Capitalized => write!(f, "{} capitalized", name),
                TextOp::First(n) => write!(f, "first {} letters of {}", n, name),
                TextOp::Last(n) => write!(f, "last {} letters of {}", n, name),
                TextOp::Without(e) => write!(f, "{} without {}", name, e),
                TextOp::Repeated(n) => write!(f, "{} repeated {} times", name, n),
            },
            Expression::Clock(query) => match query {
                ClockQuery::Time => write!(f, "current time"),
                ClockQuery::Date => write!(f, "current date"),
                ClockQuery::Day => write!(f, "current day"),
                ClockQuery::Elapsed => write!(f, "elapsed time"),
            },
            Expression::RandomBetween { low, high } => {
                write!(f, "random number between {} and {}", low, high)
            }
            Expression::RandomItem(list) => write!(f, "random item from {}", list),
            Expression::RandomBool => write!(f, "random true or false"),
            Expression::Shuffled(list) => write!(f, "shuffled {}", list),
            Expression::TableRow { table, index } => write!(f, "row {} of {}", index, table),
            Expression::TableColumn { table, index } => {
                write!(f, "column {} of {}", index, table)
            }
            Expression::Field { map, field } => write!(f, "{} of {}", field, map),
            Expression::Timer => write!(f, "timer"),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Condition::Compare { left, op, right } => write!(f, "{} {} {}", left, op, right),
            Condition::Between { value, low, high } => {
                write!(f, "{} is between {} and {}", value, low, high)
            }
            Condition::IsEmpty(e) => write!(f, "{} is empty", e),
            Condition::NotEmpty(e) => write!(f, "{} is not empty", e),
            Condition::Trend { value, direction } => match direction {
                Trend::Up => write!(f, "{} keeps going up", value),
                Trend::Down => write!(f, "{} keeps going down", value),
            },
            Condition::Changes(e) => write!(f, "{} changes", e),
            Condition::Hits { value, target } => write!(f, "{} hits {}", value, target),
            Condition::Contains { haystack, needle } => {
                write!(f, "{} contains {}", haystack, needle)
            }
            Condition::StartsWith { text, prefix } => write!(f, "{} starts with {}", text, prefix),
            Condition::Valid { kind, value } => write!(f, "{} is valid {}", value, kind),
            Condition::Qualified {
                certainty,
                condition,
            } => write!(f, "{} {}", certainty, condition),
            Condition::Logical { op, left, right } => match op {
                LogicalOp::And => write!(f, "{} and {}", left, right),
                LogicalOp::Or => write!(f, "{} or {}", left, right),
            },
            Condition::Not(inner) => write!(f, "not ({})", inner),
            Condition::Truthy(e) => write!(f, "{}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_labels() {
        let cond = Condition::Compare {
            left: Expression::Variable("age".into()),
            op: CompareOp::GtEq,
            right: Expression::IntLiteral(18),
        };
        assert_eq!(cond.to_string(), "age is at least 18");

        let between = Condition::Between {
            value: Expression::Variable("t".into()),
            low: Expression::IntLiteral(1),
            high: Expression::IntLiteral(5),
        };
        assert_eq!(between.to_string(), "t is between 1 and 5");
    }

    #[test]
    fn test_compare_negation_is_involutive() {
        for op in [
            CompareOp::Eq,
            CompareOp::NotEq,
            CompareOp::Gt,
            CompareOp::Lt,
            CompareOp::GtEq,
            CompareOp::LtEq,
        ] {
            assert_eq!(op.negated().negated(), op);
        }
    }

    #[test]
    fn test_certainty_probabilities() {
        assert_eq!(Certainty::default(), Certainty::Definitely);
        assert_eq!(Certainty::Probably.probability(), 0.8);
        assert_eq!(Certainty::Maybe.probability(), 0.5);
    }
}
