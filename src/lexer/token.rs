use std::collections::HashMap;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

/// A single token from the source code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// The type of token
    pub kind: TokenKind,
    /// Original text of the token
    pub lexeme: String,
    /// Line number where token appears (1-indexed)
    pub line: usize,
    /// Column number where token starts (1-indexed)
    pub column: usize,
}

impl Token {
    /// Creates a new token with the given properties
    pub fn new(kind: TokenKind, lexeme: String, line: usize, column: usize) -> Self {
        Token {
            kind,
            lexeme,
            line,
            column,
        }
    }
}

/// All possible token types in FigLang
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TokenKind {
    // Literals
    /// Integer literal
    Integer(i64),
    /// Floating-point literal
    Float(f64),
    /// String literal (quotes stripped, no escapes)
    String(String),
    /// Identifier
    Identifier(String),

    // Multi-word phrases
    /// `take snapshot`
    TakeSnapshot,
    /// `restore snapshot`
    RestoreSnapshot,
    /// `check that`
    CheckThat,
    /// `listen for`
    ListenFor,
    /// `reacts to`
    ReactsTo,
    /// `described as`
    DescribedAs,
    /// `measured in`
    MeasuredIn,
    /// `owned by`
    OwnedBy,
    /// `measure time`
    MeasureTime,
    /// `elapsed time`
    ElapsedTime,
    /// `can be`
    CanBe,
    /// `starts as`
    StartsAs,
    /// `can go`
    CanGo,
    /// `with context`
    WithContext,
    /// `random number between`
    RandomNumberBetween,
    /// `random item from`
    RandomItemFrom,
    /// `random true or false`
    RandomTrueOrFalse,
    /// `valid email`
    ValidEmail,
    /// `valid url`
    ValidUrl,
    /// `valid number`
    ValidNumber,
    /// `lines of`
    LinesOf,
    /// `save logs to`
    SaveLogsTo,
    /// `stop timer`
    StopTimer,
    /// `start timer`
    StartTimer,
    /// `as bar chart`
    AsBarChart,
    /// `as list`
    AsList,
    /// `as percentage`
    AsPercentage,
    /// `in binary`
    InBinary,
    /// `in hexadecimal`
    InHexadecimal,
    /// `rounded to`
    RoundedTo,
    /// `sorted by`
    SortedBy,

    // Files, tables, output
    /// VALIDATE keyword
    Validate,
    /// DECIMALS keyword
    Decimals,
    /// READ keyword
    Read,
    /// WRITE keyword
    Write,
    /// APPEND keyword
    Append,
    /// TABLE keyword
    Table,
    /// ROW keyword
    Row,
    /// COLUMN keyword
    Column,
    /// SHUFFLED keyword
    Shuffled,
    /// FORMATTED keyword
    Formatted,
    /// SHOW keyword
    Show,
    /// LOG keyword
    Log,
    /// LEVEL keyword
    Level,
    /// WARNING log level
    Warning,
    /// ERROR log level
    ErrorLevel,
    /// INFO log level
    Info,
    /// AFTER keyword
    After,
    /// TIMER keyword
    Timer,
    /// COMPARE keyword
    Compare,
    /// ALIAS keyword
    Alias,
    /// MEANS keyword
    Means,
    /// THEN keyword
    Then,
    /// CLEAN keyword
    Clean,
    /// CAPITALIZE keyword
    Capitalize,
    /// CLAMP keyword
    Clamp,

    // Units
    /// Celsius unit
    Celsius,
    /// Fahrenheit unit
    Fahrenheit,
    /// Kilometers unit
    Kilometers,
    /// Miles unit
    Miles,
    /// Bytes unit
    Bytes,
    /// Kilobytes unit
    Kilobytes,
    /// Megabytes unit
    Megabytes,
    /// Seconds unit (plural; `second` is a separate word)
    Seconds,
    /// Minutes unit
    Minutes,
    /// Hours unit
    Hours,
    /// Degrees unit
    Degrees,
    /// Radians unit
    Radians,

    // Control flow and reactivity
    /// GIVEN keyword
    Given,
    /// REMEMBER keyword
    Remember,
    /// RECALL keyword
    Recall,
    /// FORGET keyword
    Forget,
    /// EXPLAIN keyword
    Explain,
    /// WATCH keyword
    Watch,
    /// UNWATCH keyword
    Unwatch,
    /// DEBUG keyword
    Debug,
    /// USE keyword
    Use,
    /// WAIT keyword
    Wait,
    /// CURRENT keyword
    Current,
    /// UNTIL keyword
    Until,
    /// EVERY keyword
    Every,
    /// WHENEVER keyword
    Whenever,
    /// OTHERWISE keyword (block terminator)
    Otherwise,
    /// ASSUME keyword
    Assume,
    /// REQUIRE keyword
    Require,
    /// UNLESS keyword
    Unless,
    /// DEFINED keyword
    Defined,
    /// NEVER keyword
    Never,
    /// BECOMES keyword
    Becomes,
    /// ABOVE keyword
    Above,
    /// BELOW keyword
    Below,
    /// BETWEEN keyword
    Between,
    /// REPEAT keyword
    Repeat,
    /// TIMES keyword
    Times,
    /// COUNT keyword
    Count,
    /// FROM keyword
    From,
    /// START keyword
    Start,
    /// WITH keyword
    With,
    /// KEEP keyword
    Keep,
    /// EACH keyword
    Each,
    /// ONLY keyword
    Only,
    /// ONES keyword
    Ones,
    /// THE keyword
    The,

    // Math and collections
    /// DOUBLE keyword
    Double,
    /// HALF keyword
    Half,
    /// SQUARE keyword
    Square,
    /// ROUND keyword
    Round,
    /// PERCENT keyword
    Percent,
    /// REMAINDER keyword (reserved)
    Remainder,
    /// DIVIDED keyword (reserved)
    Divided,
    /// AVERAGE keyword
    Average,
    /// TOTAL keyword
    Total,
    /// SORTED keyword
    Sorted,
    /// REVERSED keyword
    Reversed,
    /// BEST keyword (reserved)
    Best,
    /// WORST keyword (reserved)
    Worst,

    // Trends
    /// HITS keyword
    Hits,
    /// GOES keyword
    Goes,
    /// GOING keyword
    Going,
    /// KEEPS keyword
    Keeps,
    /// FALLS keyword (reserved)
    Falls,
    /// CHANGES keyword
    Changes,
    /// LINKED keyword
    Linked,
    /// WHEN keyword (reserved)
    When,
    /// FASTER keyword (reserved)
    Faster,
    /// SLOWER keyword (reserved)
    Slower,
    /// MUCH keyword (reserved)
    Much,

    // Definitions
    /// ROLE keyword
    Role,
    /// ROLES keyword (reserved)
    Roles,
    /// ZONE keyword
    Zone,
    /// CALLED keyword
    Called,

    // Text
    /// UPPERCASE keyword
    Uppercase,
    /// LOWERCASE keyword
    Lowercase,
    /// CAPITALIZED keyword
    Capitalized,
    /// LENGTH keyword
    Length,
    /// CONTAINS keyword
    Contains,
    /// STARTS keyword
    Starts,
    /// ENDS keyword (reserved)
    Ends,
    /// WITHOUT keyword
    Without,
    /// REPEATED keyword
    Repeated,
    /// FIRST keyword
    First,
    /// LAST keyword
    Last,
    /// LETTERS keyword
    Letters,
    /// EMPTY keyword
    Empty,

    // Memory
    /// PREVIOUS keyword
    Previous,
    /// VALUE keyword
    Value,
    /// HISTORY keyword
    History,
    /// HIGHEST keyword
    Highest,
    /// LOWEST keyword
    Lowest,

    // Certainty
    /// DEFINITELY qualifier
    Definitely,
    /// PROBABLY qualifier
    Probably,
    /// MAYBE qualifier
    Maybe,

    // Common words
    /// DO keyword
    Do,
    /// TRY keyword
    Try,
    /// TO keyword
    To,
    /// BUT keyword (block terminator)
    But,
    /// IF keyword
    If,
    /// AND keyword
    And,
    /// OR keyword
    Or,
    /// NOT keyword
    Not,
    /// IS keyword
    Is,
    /// AT keyword
    At,
    /// LEAST keyword
    Least,
    /// MOST keyword
    Most,
    /// SAY keyword
    Say,
    /// ASK keyword
    Ask,
    /// HAS keyword
    Has,
    /// HAVE keyword (reserved)
    Have,
    /// CAN keyword
    Can,
    /// BY keyword
    By,
    /// UP keyword
    Up,
    /// DOWN keyword
    Down,
    /// FOR keyword
    For,
    /// IN keyword
    In,
    /// OF keyword
    Of,
    /// FAILS keyword
    Fails,
    /// Boolean true literal
    True,
    /// Boolean false literal
    False,
    /// AN article
    An,
    /// A article
    A,
    /// GIVE keyword (reserved)
    Give,
    /// BACK keyword (reserved)
    Back,
    /// AGAIN keyword
    Again,
    /// YES keyword
    Yes,
    /// NO keyword
    No,
    /// NUMBER keyword
    Number,
    /// SECOND keyword
    Second,
    /// TIME keyword
    Time,
    /// DATE keyword
    Date,
    /// DAY keyword
    Day,
    /// WEEK keyword (reserved)
    Week,
    /// ON keyword
    On,
    /// OFF keyword
    Off,
    /// AS keyword
    As,
    /// CONTEXT keyword
    Context,
    /// ADD keyword
    Add,
    /// REMOVE keyword (reserved)
    Remove,
    /// WHERE keyword (reserved)
    Where,
    /// POSITIVE keyword
    Positive,
    /// NEGATIVE keyword
    Negative,
    /// ONE keyword
    One,
    /// ARE keyword
    Are,

    // Symbols
    /// Arrow (`->` or `>>`)
    Arrow,
    /// Comma delimiter
    Comma,
    /// Colon (opens a block)
    Colon,
    /// Left bracket [
    LeftBracket,
    /// Right bracket ]
    RightBracket,
    /// Left parenthesis (
    LeftParen,
    /// Right parenthesis )
    RightParen,
    /// Pipe (table cell separator)
    Pipe,
    /// Plus operator
    Plus,
    /// Minus operator
    Minus,
    /// Multiplication operator
    Star,
    /// Division operator
    Slash,
    /// Greater than or equal (>=)
    GtEq,
    /// Less than or equal (<=)
    LtEq,
    /// Greater than (>)
    Gt,
    /// Less than (<)
    Lt,
    /// Equality (==)
    EqEq,

    // Special
    /// Newline (statement separator)
    Newline,
    /// End of file marker
    Eof,
}

lazy_static! {
    /// Multi-word phrases in match priority order. Earlier entries win, so
    /// longer phrases must precede any phrase that is a prefix of them.
    pub(crate) static ref PHRASES: Vec<(&'static str, TokenKind)> = vec![
        ("take snapshot", TokenKind::TakeSnapshot),
        ("restore snapshot", TokenKind::RestoreSnapshot),
        ("check that", TokenKind::CheckThat),
        ("listen for", TokenKind::ListenFor),
        ("reacts to", TokenKind::ReactsTo),
        ("described as", TokenKind::DescribedAs),
        ("measured in", TokenKind::MeasuredIn),
        ("owned by", TokenKind::OwnedBy),
        ("measure time", TokenKind::MeasureTime),
        ("elapsed time", TokenKind::ElapsedTime),
        ("can be", TokenKind::CanBe),
        ("starts as", TokenKind::StartsAs),
        ("can go", TokenKind::CanGo),
        ("with context", TokenKind::WithContext),
        ("random number between", TokenKind::RandomNumberBetween),
        ("random item from", TokenKind::RandomItemFrom),
        ("random true or false", TokenKind::RandomTrueOrFalse),
        ("valid email", TokenKind::ValidEmail),
        ("valid url", TokenKind::ValidUrl),
        ("valid number", TokenKind::ValidNumber),
        ("lines of", TokenKind::LinesOf),
        ("save logs to", TokenKind::SaveLogsTo),
        ("stop timer", TokenKind::StopTimer),
        ("start timer", TokenKind::StartTimer),
        ("as bar chart", TokenKind::AsBarChart),
        ("as list", TokenKind::AsList),
        ("as percentage", TokenKind::AsPercentage),
        ("in binary", TokenKind::InBinary),
        ("in hexadecimal", TokenKind::InHexadecimal),
        ("rounded to", TokenKind::RoundedTo),
        ("sorted by", TokenKind::SortedBy),
    ];

    static ref KEYWORDS: HashMap<&'static str, TokenKind> = {
        use TokenKind::*;
        let words = vec![
            ("validate", Validate), ("decimals", Decimals),
            ("read", Read), ("write", Write), ("append", Append),
            ("table", Table), ("row", Row), ("column", Column), ("shuffled", Shuffled),
            ("celsius", Celsius), ("fahrenheit", Fahrenheit),
            ("kilometers", Kilometers), ("miles", Miles),
            ("bytes", Bytes), ("kilobytes", Kilobytes), ("megabytes", Megabytes),
            ("seconds", Seconds), ("minutes", Minutes), ("hours", Hours),
            ("degrees", Degrees), ("radians", Radians),
            ("formatted", Formatted), ("show", Show), ("log", Log), ("level", Level),
            ("warning", Warning), ("error", ErrorLevel), ("info", Info),
            ("after", After), ("timer", Timer), ("compare", Compare),
            ("alias", Alias), ("means", Means), ("then", Then),
            ("clean", Clean), ("capitalize", Capitalize), ("clamp", Clamp),
            ("given", Given), ("remember", Remember), ("recall", Recall), ("forget", Forget),
            ("explain", Explain), ("watch", Watch), ("unwatch", Unwatch), ("debug", Debug),
            ("use", Use), ("wait", Wait), ("current", Current),
            ("until", Until), ("every", Every), ("whenever", Whenever), ("otherwise", Otherwise),
            ("assume", Assume), ("require", Require), ("unless", Unless), ("defined", Defined),
            ("never", Never), ("becomes", Becomes),
            ("above", Above), ("below", Below), ("between", Between),
            ("repeat", Repeat), ("times", Times), ("count", Count), ("from", From),
            ("start", Start), ("with", With), ("keep", Keep), ("each", Each),
            ("only", Only), ("ones", Ones), ("the", The),
            ("double", Double), ("half", Half), ("square", Square), ("round", Round),
            ("percent", Percent), ("remainder", Remainder), ("divided", Divided),
            ("average", Average), ("total", Total), ("sorted", Sorted), ("reversed", Reversed),
            ("best", Best), ("worst", Worst),
            ("hits", Hits), ("goes", Goes), ("going", Going), ("keeps", Keeps),
            ("falls", Falls), ("changes", Changes), ("linked", Linked), ("when", When),
            ("faster", Faster), ("slower", Slower), ("much", Much),
            ("role", Role), ("roles", Roles), ("zone", Zone), ("called", Called),
            ("uppercase", Uppercase), ("lowercase", Lowercase), ("capitalized", Capitalized),
            ("length", Length), ("contains", Contains), ("starts", Starts), ("ends", Ends),
            ("without", Without), ("repeated", Repeated),
            ("first", First), ("last", Last), ("letters", Letters), ("empty", Empty),
            ("previous", Previous), ("value", Value), ("history", History),
            ("highest", Highest), ("lowest", Lowest),
            ("definitely", Definitely), ("probably", Probably), ("maybe", Maybe),
            ("do", Do), ("try", Try), ("to", To), ("but", But), ("if", If),
            ("and", And), ("or", Or), ("not", Not), ("is", Is),
            ("at", At), ("least", Least), ("most", Most),
            ("say", Say), ("ask", Ask), ("has", Has), ("have", Have), ("can", Can),
            ("by", By), ("up", Up), ("down", Down), ("for", For), ("in", In), ("of", Of),
            ("fails", Fails), ("true", True), ("false", False),
            ("an", An), ("a", A), ("give", Give), ("back", Back), ("again", Again),
            ("yes", Yes), ("no", No), ("number", Number), ("second", Second),
            ("time", Time), ("date", Date), ("day", Day), ("week", Week),
            ("on", On), ("off", Off), ("as", As), ("context", Context),
            ("add", Add), ("remove", Remove), ("where", Where),
            ("positive", Positive), ("negative", Negative), ("one", One), ("are", Are),
        ];
        words.into_iter().collect()
    };
}

impl TokenKind {
    /// Looks up a single-word keyword
    pub fn keyword(word: &str) -> Option<TokenKind> {
        KEYWORDS.get(word).cloned()
    }

    /// Check if token is a keyword or multi-word phrase
    pub fn is_keyword(&self) -> bool {
        self.spelling().is_some() && !self.is_symbol()
    }

    /// Check if token is punctuation or an operator
    pub fn is_symbol(&self) -> bool {
        matches!(
            self,
            TokenKind::Arrow
                | TokenKind::Comma
                | TokenKind::Colon
                | TokenKind::LeftBracket
                | TokenKind::RightBracket
                | TokenKind::LeftParen
                | TokenKind::RightParen
                | TokenKind::Pipe
                | TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::Star
                | TokenKind::Slash
                | TokenKind::GtEq
                | TokenKind::LtEq
                | TokenKind::Gt
                | TokenKind::Lt
                | TokenKind::EqEq
        )
    }

    /// Check if token names a measurement unit
    pub fn is_unit(&self) -> bool {
        matches!(
            self,
            TokenKind::Celsius
                | TokenKind::Fahrenheit
                | TokenKind::Kilometers
                | TokenKind::Miles
                | TokenKind::Bytes
                | TokenKind::Kilobytes
                | TokenKind::Megabytes
                | TokenKind::Seconds
                | TokenKind::Minutes
                | TokenKind::Hours
                | TokenKind::Degrees
                | TokenKind::Radians
        )
    }

    /// Source spelling for keywords, phrases and symbols
    pub fn spelling(&self) -> Option<&'static str> {
        let symbol = match self {
            TokenKind::Arrow => Some("->"),
            TokenKind::Comma => Some(","),
            TokenKind::Colon => Some(":"),
            TokenKind::LeftBracket => Some("["),
            TokenKind::RightBracket => Some("]"),
            TokenKind::LeftParen => Some("("),
            TokenKind::RightParen => Some(")"),
            TokenKind::Pipe => Some("|"),
            TokenKind::Plus => Some("+"),
            TokenKind::Minus => Some("-"),
            TokenKind::Star => Some("*"),
            TokenKind::Slash => Some("/"),
            TokenKind::GtEq => Some(">="),
            TokenKind::LtEq => Some("<="),
            TokenKind::Gt => Some(">"),
            TokenKind::Lt => Some("<"),
            TokenKind::EqEq => Some("=="),
            _ => None,
        };
        if symbol.is_some() {
            return symbol;
        }
        if let Some((text, _)) = PHRASES.iter().find(|(_, kind)| kind == self) {
            return Some(*text);
        }
        KEYWORDS
            .iter()
            .find(|(_, kind)| *kind == self)
            .map(|(text, _)| *text)
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            TokenKind::Integer(n) => write!(f, "{}", n),
            TokenKind::Float(fl) => write!(f, "{}", fl),
            TokenKind::String(s) => write!(f, "\"{}\"", s),
            TokenKind::Identifier(id) => write!(f, "'{}'", id),
            TokenKind::Newline => write!(f, "end of line"),
            TokenKind::Eof => write!(f, "end of file"),
            other => match other.spelling() {
                Some(text) => write!(f, "'{}'", text),
                None => write!(f, "{:?}", other),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_detection() {
        assert_eq!(TokenKind::keyword("say"), Some(TokenKind::Say));
        assert_eq!(TokenKind::keyword("otherwise"), Some(TokenKind::Otherwise));
        assert_eq!(TokenKind::keyword("error"), Some(TokenKind::ErrorLevel));
        assert_eq!(TokenKind::keyword("Say"), None);
        assert_eq!(TokenKind::keyword("banana"), None);
    }

    #[test]
    fn test_is_keyword() {
        assert!(TokenKind::If.is_keyword());
        assert!(TokenKind::TakeSnapshot.is_keyword());
        assert!(!TokenKind::Colon.is_keyword());
        assert!(!TokenKind::Integer(42).is_keyword());
        assert!(!TokenKind::Identifier("test".to_string()).is_keyword());
    }

    #[test]
    fn test_spelling_and_display() {
        assert_eq!(TokenKind::RandomTrueOrFalse.spelling(), Some("random true or false"));
        assert_eq!(TokenKind::Seconds.spelling(), Some("seconds"));
        assert_eq!(TokenKind::Otherwise.to_string(), "'otherwise'");
        assert_eq!(TokenKind::Identifier("x".into()).to_string(), "'x'");
        assert_eq!(TokenKind::Eof.to_string(), "end of file");
    }

    #[test]
    fn test_units() {
        assert!(TokenKind::Celsius.is_unit());
        assert!(TokenKind::Seconds.is_unit());
        assert!(!TokenKind::Second.is_unit());
    }
}
