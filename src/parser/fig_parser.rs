use std::sync::Arc;

use super::ast::{
    Annotation, Block, Certainty, ChainStep, Constraint, Direction, Expression, ListenMode,
    LogLevel, PipelineStep, Program, ShowStyle, Statement, ValidationKind,
};
use crate::error::{Error, Result};
use crate::lexer::{Token, TokenKind};

/// Deepest nesting of blocks, parentheses, negations and chained conditions
/// the parser accepts
pub const MAX_NESTING: usize = 32;

/// Recursive-descent parser for FigLang
///
/// Blocks are not indentation sensitive. A `:` followed by a line break opens
/// a block that runs until `otherwise`, `but` or the end of the file; a `:`
/// followed by statements on the same line opens a block that ends with the
/// line.
pub struct FigParser {
    pub(super) tokens: Vec<Token>,
    pub(super) current: usize,
    /// Inside a condition `and` is a logical connective, not concatenation
    pub(super) in_condition: bool,
    /// Current nesting, bounded by [`MAX_NESTING`]
    pub(super) depth: usize,
}

impl FigParser {
    /// Creates a new parser over a token stream
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if !matches!(tokens.last().map(|t| &t.kind), Some(TokenKind::Eof)) {
            let line = tokens.last().map(|t| t.line).unwrap_or(1);
            tokens.push(Token::new(TokenKind::Eof, String::new(), line, 1));
        }
        FigParser {
            tokens,
            current: 0,
            in_condition: false,
            depth: 0,
        }
    }

    /// Parses the tokens into a program
    pub fn parse(&mut self) -> Result<Program> {
        let mut statements = Vec::new();

        while !self.is_at_end() {
            if self.match_token(&TokenKind::Newline) {
                continue;
            }
            if let Some(stmt) = self.parse_statement()? {
                statements.push(stmt);
            }
        }

        Ok(Program { statements })
    }

    /// Parses one statement, or skips a token that starts none
    fn parse_statement(&mut self) -> Result<Option<Statement>> {
        let kind = self.peek().kind.clone();
        let stmt = match kind {
            TokenKind::Say => self.parse_say()?,
            TokenKind::Ask => self.parse_ask()?,
            TokenKind::If => self.parse_if()?,
            TokenKind::Given => self.parse_given()?,
            TokenKind::Until => self.parse_until()?,
            TokenKind::Repeat => self.parse_repeat()?,
            TokenKind::Count => self.parse_count()?,
            TokenKind::For => self.parse_for_each()?,
            TokenKind::Whenever => self.parse_whenever()?,
            TokenKind::Every => self.parse_every()?,
            TokenKind::Assume => self.parse_assume()?,
            TokenKind::Require => self.parse_require()?,
            TokenKind::Start => self.parse_pipeline()?,
            TokenKind::Try => self.parse_try()?,
            TokenKind::Zone => self.parse_zone()?,
            TokenKind::Do => self.parse_do_zone()?,
            TokenKind::Role => self.parse_role()?,
            TokenKind::Watch => {
                self.advance();
                Statement::Watch(self.consume_identifier()?)
            }
            TokenKind::Unwatch => {
                self.advance();
                Statement::Unwatch(self.consume_identifier()?)
            }
            TokenKind::Explain => {
                self.advance();
                Statement::Explain(self.consume_identifier()?)
            }
            TokenKind::Debug => self.parse_debug(),
            TokenKind::TakeSnapshot => {
                self.advance();
                Statement::TakeSnapshot(self.consume_string()?)
            }
            TokenKind::RestoreSnapshot => {
                self.advance();
                Statement::RestoreSnapshot(self.consume_string()?)
            }
            TokenKind::Remember => self.parse_remember()?,
            TokenKind::Recall => self.parse_recall()?,
            TokenKind::Forget => {
                self.advance();
                Statement::Forget(self.consume_string()?)
            }
            TokenKind::CheckThat => {
                self.advance();
                Statement::Check(self.parse_condition()?)
            }
            TokenKind::ListenFor => self.parse_listen()?,
            TokenKind::MeasureTime => {
                self.advance();
                Statement::MeasureTime(self.parse_block()?)
            }
            TokenKind::Wait => self.parse_wait()?,
            TokenKind::After => self.parse_after()?,
            TokenKind::StartTimer => {
                self.advance();
                Statement::StartTimer
            }
            TokenKind::StopTimer => {
                self.advance();
                Statement::StopTimer
            }
            TokenKind::Add => self.parse_add_to_group()?,
            TokenKind::Read => self.parse_read()?,
            TokenKind::Write => self.parse_write(false)?,
            TokenKind::Append => self.parse_write(true)?,
            TokenKind::LinesOf => self.parse_lines_of()?,
            TokenKind::Table => self.parse_table()?,
            TokenKind::Show => self.parse_show()?,
            TokenKind::Validate => self.parse_validate()?,
            TokenKind::Log => self.parse_log()?,
            TokenKind::SaveLogsTo => {
                self.advance();
                Statement::SaveLogs(self.parse_expression()?)
            }
            TokenKind::Compare => self.parse_compare()?,
            TokenKind::Alias => self.parse_alias()?,
            TokenKind::Clean => self.parse_chain()?,
            TokenKind::Clamp => self.parse_clamp()?,
            TokenKind::Use => {
                self.advance();
                Statement::Use(self.consume_string()?)
            }
            TokenKind::Identifier(_) => self.parse_identifier_statement()?,
            _ => {
                let token = self.advance();
                tracing::debug!(
                    line = token.line,
                    token = %token.kind,
                    "skipping token that starts no statement"
                );
                return Ok(None);
            }
        };
        Ok(Some(stmt))
    }

    /// Parses `:` and the block that follows it
    pub(super) fn parse_block(&mut self) -> Result<Block> {
        self.consume(TokenKind::Colon)?;
        self.nested(|p| p.parse_block_body())
    }

    fn parse_block_body(&mut self) -> Result<Block> {
        let mut statements = Vec::new();

        if self.check(&TokenKind::Newline) {
            self.skip_newlines();
            while !self.at_block_end() {
                if self.match_token(&TokenKind::Newline) {
                    continue;
                }
                if let Some(stmt) = self.parse_statement()? {
                    statements.push(stmt);
                }
            }
        } else {
            while !self.at_block_end() && !self.check(&TokenKind::Newline) {
                if let Some(stmt) = self.parse_statement()? {
                    statements.push(stmt);
                }
            }
        }

        Ok(Arc::new(statements))
    }

    fn at_block_end(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::Otherwise | TokenKind::But | TokenKind::Eof
        )
    }

    // Output and input

    fn parse_say(&mut self) -> Result<Statement> {
        self.consume(TokenKind::Say)?;
        let expr = self.parse_expression()?;
        if self.match_token(&TokenKind::WithContext) {
            return Ok(Statement::SayWithContext(expr));
        }
        Ok(Statement::Say(expr))
    }

    fn parse_ask(&mut self) -> Result<Statement> {
        self.consume(TokenKind::Ask)?;
        let prompt = self.consume_string()?;
        self.consume(TokenKind::Arrow)?;
        let target = self.consume_identifier()?;
        Ok(Statement::Ask { prompt, target })
    }

    fn parse_listen(&mut self) -> Result<Statement> {
        self.consume(TokenKind::ListenFor)?;
        let mode = match self.peek().kind {
            TokenKind::Number => {
                self.advance();
                ListenMode::Number
            }
            TokenKind::Yes => {
                self.advance();
                self.consume(TokenKind::Or)?;
                self.consume(TokenKind::No)?;
                ListenMode::YesNo
            }
            TokenKind::One => {
                self.advance();
                self.consume(TokenKind::Of)?;
                ListenMode::OneOf(self.parse_expression()?)
            }
            // `listen for anything -> x`, `listen for text -> x`
            TokenKind::Identifier(_) => {
                self.advance();
                ListenMode::Anything
            }
            _ => ListenMode::Anything,
        };
        self.consume(TokenKind::Arrow)?;
        let target = self.consume_identifier()?;
        Ok(Statement::Listen { mode, target })
    }

    fn parse_show(&mut self) -> Result<Statement> {
        self.consume(TokenKind::Show)?;
        let value = self.parse_expression()?;
        let style = if self.match_token(&TokenKind::AsList) {
            ShowStyle::List
        } else if self.match_token(&TokenKind::AsBarChart) {
            ShowStyle::BarChart
        } else if self.match_token(&TokenKind::SortedBy) {
            ShowStyle::SortedBy(self.parse_expression()?)
        } else {
            ShowStyle::Plain
        };
        Ok(Statement::Show { value, style })
    }

    fn parse_validate(&mut self) -> Result<Statement> {
        self.consume(TokenKind::Validate)?;
        let kind = match &self.peek().kind {
            TokenKind::Number => ValidationKind::Number,
            TokenKind::Identifier(word) if word == "email" => ValidationKind::Email,
            TokenKind::Identifier(word) if word == "url" => ValidationKind::Url,
            _ => return Err(self.expected_error("'email', 'url' or 'number'")),
        };
        self.advance();
        let value = self.parse_expression()?;
        Ok(Statement::Validate { kind, value })
    }

    fn parse_log(&mut self) -> Result<Statement> {
        self.consume(TokenKind::Log)?;
        let message = self.parse_expression()?;
        let mut level = LogLevel::Info;
        if self.match_token(&TokenKind::With) {
            self.consume(TokenKind::Level)?;
            level = match self.peek().kind {
                TokenKind::Warning => LogLevel::Warning,
                TokenKind::ErrorLevel => LogLevel::Error,
                TokenKind::Info => LogLevel::Info,
                _ => return Err(self.expected_error("'info', 'warning' or 'error'")),
            };
            self.advance();
        }
        Ok(Statement::Log { message, level })
    }

    fn parse_compare(&mut self) -> Result<Statement> {
        self.consume(TokenKind::Compare)?;
        let left = self.parse_primary()?;
        self.consume(TokenKind::And)?;
        let right = self.parse_primary()?;
        Ok(Statement::Compare { left, right })
    }

    fn parse_debug(&mut self) -> Statement {
        self.advance();
        if self.match_token(&TokenKind::Off) {
            return Statement::Debug(false);
        }
        self.match_token(&TokenKind::On);
        Statement::Debug(true)
    }

    // Control flow

    fn parse_if(&mut self) -> Result<Statement> {
        self.consume(TokenKind::If)?;
        let condition = self.parse_condition()?;
        let then_branch = self.parse_block()?;

        let mut else_ifs = Vec::new();
        loop {
            let saved = self.save();
            self.skip_newlines();
            if self.check(&TokenKind::But) && self.peek_at(1) == &TokenKind::If {
                self.advance();
                self.advance();
                let cond = self.parse_condition()?;
                let body = self.parse_block()?;
                else_ifs.push((cond, body));
            } else {
                self.restore(saved);
                break;
            }
        }

        let saved = self.save();
        self.skip_newlines();
        let else_branch = if self.match_token(&TokenKind::Otherwise) {
            Some(self.parse_block()?)
        } else {
            self.restore(saved);
            None
        };

        Ok(Statement::If {
            condition,
            then_branch,
            else_ifs,
            else_branch,
        })
    }

    fn parse_given(&mut self) -> Result<Statement> {
        self.consume(TokenKind::Given)?;
        let condition = self.parse_condition()?;
        let body = self.parse_block()?;
        Ok(Statement::Given { condition, body })
    }

    fn parse_until(&mut self) -> Result<Statement> {
        self.consume(TokenKind::Until)?;
        let condition = self.parse_condition()?;
        let body = self.parse_block()?;
        Ok(Statement::Until { condition, body })
    }

    fn parse_repeat(&mut self) -> Result<Statement> {
        self.consume(TokenKind::Repeat)?;
        let count = self.parse_expression()?;
        self.consume(TokenKind::Times)?;
        let body = self.parse_block()?;
        Ok(Statement::Repeat { count, body })
    }

    fn parse_count(&mut self) -> Result<Statement> {
        self.consume(TokenKind::Count)?;
        self.consume(TokenKind::From)?;
        let from = self.parse_expression()?;
        self.consume(TokenKind::To)?;
        let to = self.parse_expression()?;
        let body = self.parse_block()?;
        Ok(Statement::CountFrom { from, to, body })
    }

    fn parse_for_each(&mut self) -> Result<Statement> {
        self.consume(TokenKind::For)?;
        self.consume(TokenKind::Each)?;
        let variable = self.consume_identifier()?;
        self.consume(TokenKind::In)?;
        let collection = self.parse_expression()?;
        let body = self.parse_block()?;
        Ok(Statement::ForEach {
            variable,
            collection,
            body,
        })
    }

    fn parse_try(&mut self) -> Result<Statement> {
        self.consume(TokenKind::Try)?;
        self.consume(TokenKind::To)?;
        let body = match self.parse_statement()? {
            Some(stmt) => Box::new(stmt),
            None => return Err(self.expected_error("a statement after 'try to'")),
        };

        let saved = self.save();
        self.skip_newlines();
        if !self.match_token(&TokenKind::But) {
            self.restore(saved);
            return Ok(Statement::Try {
                body,
                fallback: None,
            });
        }
        // `but if it fails`
        self.match_token(&TokenKind::If);
        if matches!(self.peek().kind, TokenKind::Identifier(_)) {
            self.advance();
        }
        self.match_token(&TokenKind::Fails);

        let fallback = self.parse_statement()?.map(Box::new);
        Ok(Statement::Try { body, fallback })
    }

    fn parse_wait(&mut self) -> Result<Statement> {
        self.consume(TokenKind::Wait)?;
        let amount = self.parse_expression()?;
        self.skip_seconds();
        Ok(Statement::Wait(amount))
    }

    fn parse_after(&mut self) -> Result<Statement> {
        self.consume(TokenKind::After)?;
        let delay = self.parse_expression()?;
        self.skip_seconds();
        let body = self.parse_block()?;
        Ok(Statement::After { delay, body })
    }

    fn skip_seconds(&mut self) {
        if matches!(self.peek().kind, TokenKind::Seconds | TokenKind::Second) {
            self.advance();
        }
    }

    // Reactivity and rules

    fn parse_whenever(&mut self) -> Result<Statement> {
        self.consume(TokenKind::Whenever)?;
        let condition = self.parse_condition()?;
        let body = self.parse_block()?;
        Ok(Statement::Whenever { condition, body })
    }

    fn parse_every(&mut self) -> Result<Statement> {
        self.consume(TokenKind::Every)?;
        let times = self.parse_expression()?;
        self.consume(TokenKind::Times)?;
        let variable = self.consume_identifier()?;
        self.consume(TokenKind::Changes)?;
        let body = self.parse_block()?;
        Ok(Statement::Every {
            times,
            variable,
            body,
        })
    }

    fn parse_assume(&mut self) -> Result<Statement> {
        self.consume(TokenKind::Assume)?;
        let name = self.consume_identifier()?;
        self.consume(TokenKind::Is)?;
        let value = self.parse_expression()?;
        self.consume(TokenKind::Unless)?;
        self.consume(TokenKind::Defined)?;
        Ok(Statement::Assume { name, value })
    }

    fn parse_require(&mut self) -> Result<Statement> {
        self.consume(TokenKind::Require)?;
        let name = self.consume_identifier()?;
        self.consume(TokenKind::To)?;
        if matches!(&self.peek().kind, TokenKind::Identifier(word) if word == "be") {
            self.advance();
        }

        let constraints = self.in_condition_context(|p| {
            let mut constraints = Vec::new();
            while !matches!(p.peek().kind, TokenKind::Newline | TokenKind::Eof) {
                if p.match_token(&TokenKind::And)
                    || p.match_token(&TokenKind::Or)
                    || p.match_token(&TokenKind::Comma)
                {
                    continue;
                }
                constraints.push(p.parse_constraint()?);
            }
            Ok(constraints)
        })?;

        if constraints.is_empty() {
            return Err(self.expected_error("a constraint such as 'above 0'"));
        }
        Ok(Statement::Require { name, constraints })
    }

    fn parse_constraint(&mut self) -> Result<Constraint> {
        let constraint = match self.peek().kind {
            TokenKind::Not => {
                self.advance();
                if self.match_token(&TokenKind::Empty) {
                    Constraint::NotEmpty
                } else {
                    Constraint::Not(self.parse_expression()?)
                }
            }
            TokenKind::Above => {
                self.advance();
                Constraint::Above(self.parse_expression()?)
            }
            TokenKind::Below => {
                self.advance();
                Constraint::Below(self.parse_expression()?)
            }
            TokenKind::Between => {
                self.advance();
                let low = self.parse_expression()?;
                self.match_token(&TokenKind::And);
                Constraint::Between(low, self.parse_expression()?)
            }
            TokenKind::Positive => {
                self.advance();
                Constraint::Above(Expression::IntLiteral(0))
            }
            TokenKind::Negative => {
                self.advance();
                Constraint::Below(Expression::IntLiteral(0))
            }
            TokenKind::Empty => {
                self.advance();
                Constraint::Empty
            }
            _ => Constraint::Equals(self.parse_expression()?),
        };
        Ok(constraint)
    }

    fn parse_pipeline(&mut self) -> Result<Statement> {
        self.consume(TokenKind::Start)?;
        self.consume(TokenKind::With)?;
        let source = self.parse_expression()?;

        let mut steps = Vec::new();
        loop {
            if self.match_token(&TokenKind::Comma) {
                continue;
            }
            match self.peek().kind {
                TokenKind::Keep => {
                    self.advance();
                    while matches!(
                        self.peek().kind,
                        TokenKind::Only | TokenKind::The | TokenKind::Ones
                    ) {
                        self.advance();
                    }
                    let direction = match self.peek().kind {
                        TokenKind::Above => Direction::Above,
                        TokenKind::Below => Direction::Below,
                        _ => return Err(self.expected_error("'above' or 'below'")),
                    };
                    self.advance();
                    let bound = self.parse_expression()?;
                    steps.push(PipelineStep::Keep { direction, bound });
                }
                TokenKind::Double if self.peek_at(1) == &TokenKind::Each => {
                    self.advance();
                    self.advance();
                    steps.push(PipelineStep::DoubleEach);
                }
                TokenKind::Say if self.peek_at(1) == &TokenKind::Each => {
                    self.advance();
                    self.advance();
                    steps.push(PipelineStep::SayEach);
                }
                TokenKind::Sorted => {
                    self.advance();
                    steps.push(PipelineStep::Sort);
                }
                TokenKind::Reversed => {
                    self.advance();
                    steps.push(PipelineStep::Reverse);
                }
                _ => break,
            }
        }

        Ok(Statement::Pipeline { source, steps })
    }

    fn parse_chain(&mut self) -> Result<Statement> {
        self.consume(TokenKind::Clean)?;
        let target = self.consume_identifier()?;
        let mut steps = vec![ChainStep::Clean];
        while self.match_token(&TokenKind::Then) {
            let step = match self.peek().kind {
                TokenKind::Capitalize => ChainStep::Capitalize,
                TokenKind::Uppercase => ChainStep::Uppercase,
                TokenKind::Lowercase => ChainStep::Lowercase,
                TokenKind::Say => ChainStep::Say,
                _ => {
                    return Err(
                        self.expected_error("'capitalize', 'uppercase', 'lowercase' or 'say'")
                    )
                }
            };
            self.advance();
            steps.push(step);
        }
        Ok(Statement::Chain { target, steps })
    }

    fn parse_clamp(&mut self) -> Result<Statement> {
        self.consume(TokenKind::Clamp)?;
        let target = self.consume_identifier()?;
        self.consume(TokenKind::Between)?;
        let (low, high) = self.in_condition_context(|p| {
            let low = p.parse_expression()?;
            p.match_token(&TokenKind::And);
            Ok((low, p.parse_expression()?))
        })?;
        let mut say = false;
        if self.check(&TokenKind::Then) && self.peek_at(1) == &TokenKind::Say {
            self.advance();
            self.advance();
            say = true;
        }
        Ok(Statement::Clamp {
            target,
            low,
            high,
            say,
        })
    }

    // Named blocks

    fn parse_zone(&mut self) -> Result<Statement> {
        self.consume(TokenKind::Zone)?;
        self.consume(TokenKind::Called)?;
        let name = self.consume_identifier()?;
        let body = self.parse_block()?;
        Ok(Statement::Zone { name, body })
    }

    fn parse_do_zone(&mut self) -> Result<Statement> {
        self.consume(TokenKind::Do)?;
        self.match_token(&TokenKind::Zone);
        let name = self.consume_identifier()?;
        self.match_token(&TokenKind::Again);
        Ok(Statement::DoZone(name))
    }

    fn parse_role(&mut self) -> Result<Statement> {
        self.consume(TokenKind::Role)?;
        let name = self.consume_identifier()?;
        self.consume(TokenKind::Has)?;
        let body = self.parse_block()?;
        Ok(Statement::Role { name, body })
    }

    fn parse_alias(&mut self) -> Result<Statement> {
        self.consume(TokenKind::Alias)?;
        let name = self.consume_string()?;
        self.consume(TokenKind::Means)?;
        if self.check(&TokenKind::Colon) {
            let body = self.parse_block()?;
            return Ok(Statement::Alias { name, body });
        }
        match self.parse_statement()? {
            Some(stmt) => Ok(Statement::Alias {
                name,
                body: Arc::new(vec![stmt]),
            }),
            None => Err(self.expected_error("a statement after 'means'")),
        }
    }

    // Memory and snapshots

    fn parse_remember(&mut self) -> Result<Statement> {
        self.consume(TokenKind::Remember)?;
        let variable = self.consume_identifier()?;
        self.consume(TokenKind::As)?;
        let key = self.consume_string()?;
        Ok(Statement::Remember { variable, key })
    }

    fn parse_recall(&mut self) -> Result<Statement> {
        self.consume(TokenKind::Recall)?;
        let key = self.consume_string()?;
        self.consume(TokenKind::Arrow)?;
        let target = self.consume_identifier()?;
        Ok(Statement::Recall { key, target })
    }

    // Files and data

    fn parse_add_to_group(&mut self) -> Result<Statement> {
        self.consume(TokenKind::Add)?;
        let item = self.parse_expression()?;
        self.consume(TokenKind::To)?;
        let group = self.consume_identifier()?;
        Ok(Statement::AddToGroup { item, group })
    }

    fn parse_read(&mut self) -> Result<Statement> {
        self.consume(TokenKind::Read)?;
        let path = self.parse_expression()?;
        self.consume(TokenKind::Arrow)?;
        let target = self.consume_identifier()?;
        Ok(Statement::ReadFile { path, target })
    }

    fn parse_write(&mut self, append: bool) -> Result<Statement> {
        self.advance();
        let content = self.parse_expression()?;
        self.consume(TokenKind::To)?;
        let path = self.parse_expression()?;
        if append {
            Ok(Statement::AppendFile { content, path })
        } else {
            Ok(Statement::WriteFile { content, path })
        }
    }

    fn parse_lines_of(&mut self) -> Result<Statement> {
        self.consume(TokenKind::LinesOf)?;
        let path = self.parse_expression()?;
        self.consume(TokenKind::Arrow)?;
        let target = self.consume_identifier()?;
        Ok(Statement::LinesOf { path, target })
    }

    fn parse_table(&mut self) -> Result<Statement> {
        self.consume(TokenKind::Table)?;
        let name = self.consume_identifier()?;
        self.consume(TokenKind::Colon)?;
        self.skip_newlines();

        let mut rows = Vec::new();
        while self.starts_table_cell() {
            let saved = self.save();
            match self.parse_table_row() {
                Ok(Some(row)) => rows.push(row),
                Ok(None) | Err(_) => {
                    // Not a row after all: leave it for the statement parser
                    self.restore(saved);
                    break;
                }
            }
            self.skip_newlines();
        }

        Ok(Statement::TableDecl { name, rows })
    }

    fn starts_table_cell(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::String(_)
                | TokenKind::Integer(_)
                | TokenKind::Float(_)
                | TokenKind::Identifier(_)
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Minus
        )
    }

    /// A row is `cell | cell ...` ending at a line break. A single cell
    /// that is not alone on its line is the start of a statement instead.
    fn parse_table_row(&mut self) -> Result<Option<Vec<Expression>>> {
        let mut row = vec![self.parse_expression()?];
        while self.match_token(&TokenKind::Pipe) {
            row.push(self.parse_expression()?);
        }
        let at_line_end = matches!(self.peek().kind, TokenKind::Newline | TokenKind::Eof);
        if !at_line_end && row.len() == 1 {
            return Ok(None);
        }
        Ok(Some(row))
    }

    // Statements that start with a name

    fn parse_identifier_statement(&mut self) -> Result<Statement> {
        let start = self.save();
        let name = self.consume_identifier()?;

        match self.peek().kind.clone() {
            TokenKind::Is => {
                self.advance();
                let certainty = self.parse_certainty().unwrap_or_default();

                if self.check(&TokenKind::Never) {
                    return self.parse_limits(name);
                }

                if let Some(stmt) = self.try_group_declaration(&name)? {
                    return Ok(stmt);
                }

                let value = self.parse_expression()?;
                Ok(Statement::Assign {
                    name,
                    value,
                    certainty,
                })
            }
            TokenKind::Never => self.parse_limits(name),
            TokenKind::ReactsTo => {
                self.advance();
                let mut dependencies = vec![self.consume_identifier()?];
                while self.match_token(&TokenKind::And) || self.match_token(&TokenKind::Comma) {
                    dependencies.push(self.consume_identifier()?);
                }
                let body = self.parse_block()?;
                Ok(Statement::Reacts {
                    name,
                    dependencies,
                    body,
                })
            }
            TokenKind::And => {
                if let Some(stmt) = self.try_link(&name)? {
                    return Ok(stmt);
                }
                self.restore(start);
                Ok(Statement::Expression(self.parse_expression()?))
            }
            TokenKind::Has => {
                if let Some(stmt) = self.try_map_declaration(&name)? {
                    return Ok(stmt);
                }
                self.restore(start);
                Ok(Statement::Expression(self.parse_expression()?))
            }
            TokenKind::CanBe => {
                self.advance();
                let mut states = vec![self.consume_word()?];
                while self.match_token(&TokenKind::Comma) || self.match_token(&TokenKind::Or) {
                    self.match_token(&TokenKind::Or);
                    states.push(self.consume_word()?);
                }
                Ok(Statement::StateDecl { name, states })
            }
            TokenKind::StartsAs => {
                self.advance();
                let state = self.consume_word()?;
                Ok(Statement::StateStart { name, state })
            }
            TokenKind::Becomes => {
                self.advance();
                let state = self.consume_word()?;
                Ok(Statement::StateBecome { name, state })
            }
            TokenKind::CanGo => {
                self.advance();
                self.consume(TokenKind::From)?;
                let from = self.consume_word()?;
                self.consume(TokenKind::To)?;
                let to = self.consume_word()?;
                Ok(Statement::StateTransition { name, from, to })
            }
            TokenKind::DescribedAs | TokenKind::MeasuredIn | TokenKind::OwnedBy => {
                let mut annotations = Vec::new();
                loop {
                    let kind = match self.peek().kind {
                        TokenKind::DescribedAs => Annotation::Description,
                        TokenKind::MeasuredIn => Annotation::Unit,
                        TokenKind::OwnedBy => Annotation::Owner,
                        _ => break,
                    };
                    self.advance();
                    annotations.push((kind, self.consume_string()?));
                }
                Ok(Statement::Annotate { name, annotations })
            }
            TokenKind::Identifier(action) => {
                self.advance();
                let mut args = Vec::new();
                while !self.at_block_end() && !self.check(&TokenKind::Newline) {
                    args.push(self.parse_expression()?);
                }
                Ok(Statement::Invoke {
                    subject: name,
                    action,
                    args,
                })
            }
            _ => {
                self.restore(start);
                Ok(Statement::Expression(self.parse_expression()?))
            }
        }
    }

    /// `x is never goes below 0 or above 100`, `x never goes above 10`
    fn parse_limits(&mut self, name: String) -> Result<Statement> {
        self.consume(TokenKind::Never)?;
        self.match_token(&TokenKind::Goes);

        let mut limits = Vec::new();
        loop {
            if self.match_token(&TokenKind::Or) || self.match_token(&TokenKind::And) {
                continue;
            }
            let direction = match self.peek().kind {
                TokenKind::Above => Direction::Above,
                TokenKind::Below => Direction::Below,
                _ => break,
            };
            self.advance();
            let bound = self.in_condition_context(|p| p.parse_expression())?;
            limits.push((direction, bound));
        }

        if limits.is_empty() {
            return Err(self.expected_error("'above' or 'below'"));
        }
        Ok(Statement::Limits { name, limits })
    }

    /// `name is a group of item`, rolled back when `group of` is absent
    fn try_group_declaration(&mut self, name: &str) -> Result<Option<Statement>> {
        if !matches!(self.peek().kind, TokenKind::A | TokenKind::An) {
            return Ok(None);
        }
        let saved = self.save();
        self.advance();
        let is_group = matches!(&self.peek().kind, TokenKind::Identifier(w) if w == "group")
            && self.peek_at(1) == &TokenKind::Of;
        if !is_group {
            self.restore(saved);
            return Ok(None);
        }
        self.advance();
        self.advance();
        let item_type = self.consume_word()?;
        Ok(Some(Statement::GroupDecl {
            name: name.to_string(),
            item_type,
        }))
    }

    /// `name and other [are] linked:`, rolled back when `linked` is absent
    fn try_link(&mut self, name: &str) -> Result<Option<Statement>> {
        let saved = self.save();
        self.consume(TokenKind::And)?;
        let other = match &self.peek().kind {
            TokenKind::Identifier(other) => other.clone(),
            _ => {
                self.restore(saved);
                return Ok(None);
            }
        };
        self.advance();
        self.match_token(&TokenKind::Are);
        if !self.match_token(&TokenKind::Linked) {
            self.restore(saved);
            return Ok(None);
        }
        let body = self.parse_block()?;
        Ok(Some(Statement::Link {
            name: name.to_string(),
            other,
            body,
        }))
    }

    /// `name has:` followed by `field is value` entries separated by commas
    /// or single line breaks; a blank line ends the map
    fn try_map_declaration(&mut self, name: &str) -> Result<Option<Statement>> {
        let saved = self.save();
        self.consume(TokenKind::Has)?;
        if !self.match_token(&TokenKind::Colon) {
            self.restore(saved);
            return Ok(None);
        }
        self.match_token(&TokenKind::Newline);

        let mut fields = Vec::new();
        while matches!(self.peek().kind, TokenKind::Identifier(_))
            && self.peek_at(1) == &TokenKind::Is
        {
            let field = self.consume_identifier()?;
            self.advance();
            fields.push((field, self.parse_expression()?));
            if !self.match_token(&TokenKind::Comma) && !self.match_token(&TokenKind::Newline) {
                break;
            }
        }

        Ok(Some(Statement::MapDecl {
            name: name.to_string(),
            fields,
        }))
    }

    pub(super) fn parse_certainty(&mut self) -> Option<Certainty> {
        let certainty = match self.peek().kind {
            TokenKind::Definitely => Certainty::Definitely,
            TokenKind::Probably => Certainty::Probably,
            TokenKind::Maybe => Certainty::Maybe,
            _ => return None,
        };
        self.advance();
        Some(certainty)
    }

    // Helper methods

    /// Runs `f` one nesting level deeper, failing past [`MAX_NESTING`]
    pub(super) fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= MAX_NESTING {
            return Err(self.expected_error("less deeply nested expression"));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    pub(super) fn in_condition_context<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let outer = std::mem::replace(&mut self.in_condition, true);
        let result = f(self);
        self.in_condition = outer;
        result
    }

    pub(super) fn save(&self) -> usize {
        self.current
    }

    pub(super) fn restore(&mut self, position: usize) {
        self.current = position;
    }

    pub(super) fn is_at_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    pub(super) fn peek(&self) -> &Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    /// Kind of the token `offset` places ahead, clamped to the end marker
    pub(super) fn peek_at(&self, offset: usize) -> &TokenKind {
        let index = (self.current + offset).min(self.tokens.len() - 1);
        &self.tokens[index].kind
    }

    pub(super) fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !self.is_at_end() {
            self.current += 1;
        }
        token
    }

    pub(super) fn check(&self, kind: &TokenKind) -> bool {
        if self.is_at_end() {
            return false;
        }
        std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(kind)
    }

    pub(super) fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(super) fn consume(&mut self, kind: TokenKind) -> Result<Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.build_error(&kind))
        }
    }

    pub(super) fn consume_identifier(&mut self) -> Result<String> {
        match &self.peek().kind {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.expected_error("a name")),
        }
    }

    fn consume_string(&mut self) -> Result<String> {
        match &self.peek().kind {
            TokenKind::String(text) => {
                let text = text.clone();
                self.advance();
                Ok(text)
            }
            _ => Err(self.expected_error("a quoted string")),
        }
    }

    /// A bare word: an identifier, or a keyword used as a state or type name
    fn consume_word(&mut self) -> Result<String> {
        let token = self.peek();
        let is_word = matches!(token.kind, TokenKind::Identifier(_))
            || (token.kind.is_keyword() && token.kind.spelling().is_some_and(|s| !s.contains(' ')));
        if is_word {
            Ok(self.advance().lexeme)
        } else {
            Err(self.expected_error("a name"))
        }
    }

    pub(super) fn skip_newlines(&mut self) {
        while self.match_token(&TokenKind::Newline) {}
    }

    fn build_error(&self, expected: &TokenKind) -> Error {
        let expected = match expected {
            TokenKind::Identifier(_) => "a name".to_string(),
            TokenKind::String(_) => "a quoted string".to_string(),
            TokenKind::Integer(_) | TokenKind::Float(_) => "a number".to_string(),
            other => other.to_string(),
        };
        self.expected_error(&expected)
    }

    pub(super) fn expected_error(&self, expected: &str) -> Error {
        let token = self.peek();
        Error::ParseError {
            expected: expected.to_string(),
            found: token.kind.to_string(),
            line: token.line,
        }
    }
}

/// Tokenizes and parses a source string in one call
pub fn parse_source(source: &str) -> Result<Program> {
    let tokens = crate::lexer::tokenize(source)?;
    FigParser::new(tokens).parse()
}
