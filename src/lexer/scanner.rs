use super::token::{Token, TokenKind, PHRASES};
use crate::error::{Error, Result};

/// Scanner for FigLang's English-like surface syntax
///
/// Tokens are recognised in a fixed priority order: comments, arrows,
/// numbers, strings, multi-word phrases, single-word keywords, symbols and
/// finally identifiers. Phrases are tried before keywords so that
/// `take snapshot` never splits into `take` + `snapshot`.
pub struct FigScanner {
    /// Source code as character vector
    source: Vec<char>,
    /// Accumulated tokens
    tokens: Vec<Token>,
    /// Start position of current token
    start: usize,
    /// Current position in source
    current: usize,
    /// Current line number (1-indexed)
    line: usize,
    /// Current column number (1-indexed)
    column: usize,
    /// Column where the current token started
    start_column: usize,
}

impl FigScanner {
    /// Creates a new scanner from source code
    pub fn new(source: &str) -> Self {
        FigScanner {
            source: source.chars().collect(),
            tokens: Vec::new(),
            start: 0,
            current: 0,
            line: 1,
            column: 1,
            start_column: 1,
        }
    }

    /// Scans all tokens from source code and returns them as a vector
    pub fn scan_tokens(&mut self) -> Result<Vec<Token>> {
        while !self.is_at_end() {
            self.start = self.current;
            self.start_column = self.column;
            self.scan_token()?;
        }

        self.tokens.push(Token::new(
            TokenKind::Eof,
            String::new(),
            self.line,
            self.column,
        ));

        Ok(std::mem::take(&mut self.tokens))
    }

    fn scan_token(&mut self) -> Result<()> {
        let c = self.peek();

        match c {
            ' ' | '\t' | '\r' => {
                self.advance();
            }

            '\n' => {
                self.advance();
                self.add_token(TokenKind::Newline);
                self.line += 1;
                self.column = 1;
            }

            '-' if self.peek_next() == '-' => self.skip_line_comment(),
            '-' if self.peek_next() == '>' => {
                self.advance();
                self.advance();
                self.add_token(TokenKind::Arrow);
            }
            '>' if self.peek_next() == '>' => {
                self.advance();
                self.advance();
                self.add_token(TokenKind::Arrow);
            }

            c if c.is_ascii_digit() => self.scan_number()?,

            '"' => self.scan_string()?,

            c if c.is_ascii_alphabetic() || c == '_' => self.scan_word(),

            _ => self.scan_symbol(c)?,
        }

        Ok(())
    }

    fn scan_symbol(&mut self, c: char) -> Result<()> {
        self.advance();
        let kind = match c {
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '|' => TokenKind::Pipe,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '>' => {
                if self.match_char('=') {
                    TokenKind::GtEq
                } else {
                    TokenKind::Gt
                }
            }
            '<' => {
                if self.match_char('=') {
                    TokenKind::LtEq
                } else {
                    TokenKind::Lt
                }
            }
            '=' if self.match_char('=') => TokenKind::EqEq,
            _ => {
                return Err(Error::LexError {
                    character: c,
                    line: self.line,
                })
            }
        };
        self.add_token(kind);
        Ok(())
    }

    fn skip_line_comment(&mut self) {
        while !self.is_at_end() && self.peek() != '\n' {
            self.advance();
        }
    }

    fn scan_string(&mut self) -> Result<()> {
        let opening_line = self.line;
        self.advance(); // Opening "

        let mut value = String::new();
        let mut newlines = 0;
        while !self.is_at_end() && self.peek() != '"' {
            let c = self.advance();
            if c == '\n' {
                newlines += 1;
            }
            value.push(c);
        }

        if self.is_at_end() {
            return Err(Error::LexError {
                character: '"',
                line: opening_line,
            });
        }

        self.advance(); // Closing "
        self.add_token(TokenKind::String(value));
        // Line numbers advance after the token so it reports where it opened
        if newlines > 0 {
            self.line += newlines;
            self.column = 1;
        }
        Ok(())
    }

    fn scan_number(&mut self) -> Result<()> {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        let mut is_float = false;
        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            is_float = true;
            self.advance(); // consume .
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let text: String = self.source[self.start..self.current].iter().collect();

        let kind = if is_float {
            TokenKind::Float(text.parse().map_err(|_| Error::LexError {
                character: '.',
                line: self.line,
            })?)
        } else {
            match text.parse::<i64>() {
                Ok(value) => TokenKind::Integer(value),
                // Too large for an integer: keep the magnitude as a float
                Err(_) => TokenKind::Float(text.parse().unwrap_or(f64::MAX)),
            }
        };
        self.add_token(kind);

        Ok(())
    }

    fn scan_word(&mut self) {
        if let Some((len, kind)) = self.match_phrase() {
            for _ in 0..len {
                self.advance();
            }
            self.add_token(kind);
            return;
        }

        while is_word_char(self.peek()) {
            self.advance();
        }

        let text: String = self.source[self.start..self.current].iter().collect();
        let kind = TokenKind::keyword(&text).unwrap_or(TokenKind::Identifier(text));
        self.add_token(kind);
    }

    /// Tries every multi-word phrase at the current position, returning the
    /// number of characters it spans
    fn match_phrase(&self) -> Option<(usize, TokenKind)> {
        PHRASES.iter().find_map(|(phrase, kind)| {
            self.phrase_len(phrase).map(|len| (len, kind.clone()))
        })
    }

    fn phrase_len(&self, phrase: &str) -> Option<usize> {
        let mut pos = self.current;
        let words: Vec<&str> = phrase.split(' ').collect();

        for (i, word) in words.iter().enumerate() {
            for expected in word.chars() {
                if self.source.get(pos) != Some(&expected) {
                    return None;
                }
                pos += 1;
            }
            // Whole words only
            if self.source.get(pos).copied().is_some_and(is_word_char) {
                return None;
            }
            if i + 1 < words.len() {
                let gap_start = pos;
                while matches!(self.source.get(pos), Some(' ') | Some('\t')) {
                    pos += 1;
                }
                if pos == gap_start {
                    return None;
                }
            }
        }

        Some(pos - self.current)
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn advance(&mut self) -> char {
        let c = self.source[self.current];
        self.current += 1;
        self.column += 1;
        c
    }

    fn peek(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.source[self.current]
        }
    }

    fn peek_next(&self) -> char {
        if self.current + 1 >= self.source.len() {
            '\0'
        } else {
            self.source[self.current + 1]
        }
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.source[self.current] != expected {
            false
        } else {
            self.current += 1;
            self.column += 1;
            true
        }
    }

    fn add_token(&mut self, kind: TokenKind) {
        let lexeme: String = self.source[self.start..self.current].iter().collect();
        self.tokens
            .push(Token::new(kind, lexeme, self.line, self.start_column));
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Tokenizes a source string in one call
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    FigScanner::new(source).scan_tokens()
}
