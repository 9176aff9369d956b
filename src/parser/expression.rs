//! Expression and condition grammar
//!
//! Expressions are a single left-to-right chain with no precedence tiers:
//! `a + b * c` is `(a + b) * c`. A formatting suffix applies once to the
//! whole chain. Conditions are a separate grammar built on top of
//! expressions and joined by right-associated `and`/`or`.

use super::ast::{
    BinaryOp, ClockQuery, CollectionOp, CompareOp, Condition, Expression, FormatStyle,
    LogicalOp, MathOp, MemoryQuery, TextOp, Trend, Unit, ValidationKind,
};
use super::fig_parser::FigParser;
use crate::error::Result;
use crate::lexer::TokenKind;

impl FigParser {
    /// Parses a condition, where `and`/`or` connect sub-conditions
    pub(super) fn parse_condition(&mut self) -> Result<Condition> {
        self.in_condition_context(|p| p.parse_condition_chain())
    }

    fn parse_condition_chain(&mut self) -> Result<Condition> {
        let left = self.parse_simple_condition()?;
        let op = match self.peek().kind {
            TokenKind::And => LogicalOp::And,
            TokenKind::Or => LogicalOp::Or,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.nested(|p| p.parse_condition_chain())?;
        Ok(Condition::Logical {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn parse_simple_condition(&mut self) -> Result<Condition> {
        let mut certainty = self.parse_certainty();
        let left = self.parse_expression()?;

        let condition = match self.peek().kind {
            TokenKind::Keeps => {
                self.advance();
                self.consume(TokenKind::Going)?;
                let direction = match self.peek().kind {
                    TokenKind::Up => Trend::Up,
                    TokenKind::Down => Trend::Down,
                    _ => return Err(self.expected_error("'up' or 'down'")),
                };
                self.advance();
                Condition::Trend {
                    value: left,
                    direction,
                }
            }
            TokenKind::Changes => {
                self.advance();
                Condition::Changes(left)
            }
            TokenKind::Hits => {
                self.advance();
                Condition::Hits {
                    value: left,
                    target: self.parse_expression()?,
                }
            }
            TokenKind::Contains => {
                self.advance();
                Condition::Contains {
                    haystack: left,
                    needle: self.parse_expression()?,
                }
            }
            TokenKind::Starts => {
                self.advance();
                self.consume(TokenKind::With)?;
                Condition::StartsWith {
                    text: left,
                    prefix: self.parse_expression()?,
                }
            }
            TokenKind::Is => {
                self.advance();
                if let Some(qualifier) = self.parse_certainty() {
                    certainty = Some(qualifier);
                }
                self.parse_is_condition(left)?
            }
            _ => Condition::Truthy(left),
        };

        Ok(match certainty {
            Some(certainty) if certainty.probability() < 1.0 => Condition::Qualified {
                certainty,
                condition: Box::new(condition),
            },
            _ => condition,
        })
    }

    /// Everything that can follow `x is`
    fn parse_is_condition(&mut self, left: Expression) -> Result<Condition> {
        let negated = self.match_token(&TokenKind::Not);
        let wrap = |cond: Condition| {
            if negated {
                Condition::Not(Box::new(cond))
            } else {
                cond
            }
        };

        let validation = match self.peek().kind {
            TokenKind::ValidEmail => Some(ValidationKind::Email),
            TokenKind::ValidUrl => Some(ValidationKind::Url),
            TokenKind::ValidNumber => Some(ValidationKind::Number),
            _ => None,
        };
        if let Some(kind) = validation {
            self.advance();
            return Ok(wrap(Condition::Valid { kind, value: left }));
        }

        let (op, right) = match self.peek().kind {
            TokenKind::At => {
                self.advance();
                let op = match self.peek().kind {
                    TokenKind::Least => CompareOp::GtEq,
                    TokenKind::Most => CompareOp::LtEq,
                    _ => return Err(self.expected_error("'least' or 'most'")),
                };
                self.advance();
                (op, self.parse_expression()?)
            }
            TokenKind::Above => {
                self.advance();
                (CompareOp::Gt, self.parse_expression()?)
            }
            TokenKind::Below => {
                self.advance();
                (CompareOp::Lt, self.parse_expression()?)
            }
            TokenKind::Between => {
                self.advance();
                let low = self.parse_primary()?;
                self.match_token(&TokenKind::And);
                let high = self.parse_primary()?;
                return Ok(wrap(Condition::Between {
                    value: left,
                    low,
                    high,
                }));
            }
            TokenKind::Empty => {
                self.advance();
                return Ok(if negated {
                    Condition::NotEmpty(left)
                } else {
                    Condition::IsEmpty(left)
                });
            }
            _ => (CompareOp::Eq, self.parse_expression()?),
        };

        let op = if negated { op.negated() } else { op };
        Ok(Condition::Compare { left, op, right })
    }

    /// Parses a full expression chain with an optional formatting suffix
    pub(super) fn parse_expression(&mut self) -> Result<Expression> {
        self.nested(|p| p.parse_expression_chain())
    }

    fn parse_expression_chain(&mut self) -> Result<Expression> {
        let mut left = self.parse_primary()?;

        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::GtEq => BinaryOp::GtEq,
                TokenKind::LtEq => BinaryOp::LtEq,
                TokenKind::EqEq => BinaryOp::Eq,
                TokenKind::And if !self.in_condition => BinaryOp::Concat,
                _ => break,
            };
            self.advance();
            let right = self.parse_primary()?;
            left = Expression::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        let style = match self.peek().kind {
            TokenKind::Formatted => FormatStyle::Thousands,
            TokenKind::AsPercentage => FormatStyle::Percentage,
            TokenKind::InBinary => FormatStyle::Binary,
            TokenKind::InHexadecimal => FormatStyle::Hexadecimal,
            TokenKind::RoundedTo => {
                self.advance();
                let places = self.parse_primary()?;
                self.match_token(&TokenKind::Decimals);
                return Ok(Expression::Format {
                    style: FormatStyle::Rounded(Box::new(places)),
                    value: Box::new(left),
                });
            }
            _ => return Ok(left),
        };
        self.advance();
        Ok(Expression::Format {
            style,
            value: Box::new(left),
        })
    }

    /// Parses a single operand
    pub(super) fn parse_primary(&mut self) -> Result<Expression> {
        let token = self.peek().clone();

        match token.kind {
            TokenKind::Integer(n) => {
                self.advance();
                self.parse_number_suffix(Expression::IntLiteral(n))
            }
            TokenKind::Float(x) => {
                self.advance();
                self.parse_number_suffix(Expression::FloatLiteral(x))
            }
            TokenKind::String(text) => {
                self.advance();
                Ok(Expression::StringLiteral(text))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expression::BoolLiteral(true))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expression::BoolLiteral(false))
            }
            TokenKind::Empty => {
                self.advance();
                Ok(Expression::StringLiteral(String::new()))
            }
            TokenKind::LeftBracket => self.parse_list(),
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.consume(TokenKind::RightParen)?;
                Ok(inner)
            }
            TokenKind::Minus => {
                self.advance();
                let operand = self.nested(|p| p.parse_primary())?;
                Ok(Expression::Negate(Box::new(operand)))
            }

            // History
            TokenKind::Previous => {
                self.advance();
                self.consume(TokenKind::Value)?;
                self.consume(TokenKind::Of)?;
                self.memory(MemoryQuery::Previous)
            }
            TokenKind::History => {
                self.advance();
                self.consume(TokenKind::Of)?;
                self.memory(MemoryQuery::History)
            }
            TokenKind::Highest => {
                self.advance();
                self.consume(TokenKind::Of)?;
                self.memory(MemoryQuery::Highest)
            }
            TokenKind::Lowest => {
                self.advance();
                self.consume(TokenKind::Of)?;
                self.memory(MemoryQuery::Lowest)
            }

            // Collections
            TokenKind::Average => {
                self.advance();
                self.consume(TokenKind::Of)?;
                self.collection(CollectionOp::Average)
            }
            TokenKind::Total => {
                self.advance();
                self.consume(TokenKind::Of)?;
                self.collection(CollectionOp::Total)
            }
            TokenKind::Sorted => {
                self.advance();
                self.collection(CollectionOp::Sorted)
            }
            TokenKind::Reversed => {
                self.advance();
                self.collection(CollectionOp::Reversed)
            }

            // Text
            TokenKind::Length => {
                self.advance();
                self.consume(TokenKind::Of)?;
                let name = self.consume_identifier()?;
                Ok(Expression::Text {
                    op: TextOp::Length,
                    name,
                })
            }
            TokenKind::First | TokenKind::Last => {
                self.advance();
                let count = Box::new(self.parse_expression()?);
                self.consume(TokenKind::Letters)?;
                self.consume(TokenKind::Of)?;
                let name = self.consume_identifier()?;
                let op = if token.kind == TokenKind::First {
                    TextOp::First(count)
                } else {
                    TextOp::Last(count)
                };
                Ok(Expression::Text { op, name })
            }

            // Math
            TokenKind::Half => self.math_of(MathOp::Half),
            TokenKind::Double => self.math_of(MathOp::Double),
            TokenKind::Square => self.math_of(MathOp::Square),
            TokenKind::Round => {
                self.advance();
                Ok(Expression::Math {
                    op: MathOp::Round,
                    operand: Box::new(self.parse_expression()?),
                })
            }

            // Clock
            TokenKind::Current => {
                self.advance();
                let query = match self.peek().kind {
                    TokenKind::Date => ClockQuery::Date,
                    TokenKind::Day => ClockQuery::Day,
                    TokenKind::Time => ClockQuery::Time,
                    _ => return Ok(Expression::Clock(ClockQuery::Time)),
                };
                self.advance();
                Ok(Expression::Clock(query))
            }
            TokenKind::ElapsedTime => {
                self.advance();
                Ok(Expression::Clock(ClockQuery::Elapsed))
            }
            TokenKind::Timer => {
                self.advance();
                Ok(Expression::Timer)
            }

            // Randomness
            TokenKind::RandomNumberBetween => {
                self.advance();
                let low = self.parse_primary()?;
                self.consume(TokenKind::And)?;
                let high = self.parse_primary()?;
                Ok(Expression::RandomBetween {
                    low: Box::new(low),
                    high: Box::new(high),
                })
            }
            TokenKind::RandomItemFrom => {
                self.advance();
                Ok(Expression::RandomItem(Box::new(self.parse_expression()?)))
            }
            TokenKind::RandomTrueOrFalse => {
                self.advance();
                Ok(Expression::RandomBool)
            }
            TokenKind::Shuffled => {
                self.advance();
                Ok(Expression::Shuffled(Box::new(self.parse_expression()?)))
            }

            // Tables
            TokenKind::Row | TokenKind::Column => {
                self.advance();
                let index = Box::new(self.parse_expression()?);
                self.consume(TokenKind::Of)?;
                let table = self.consume_identifier()?;
                if token.kind == TokenKind::Row {
                    Ok(Expression::TableRow { table, index })
                } else {
                    Ok(Expression::TableColumn { table, index })
                }
            }

            TokenKind::Identifier(name) => {
                self.advance();
                self.parse_identifier_suffix(name)
            }

            _ => Err(self.expected_error("a value")),
        }
    }

    /// `100 celsius in fahrenheit`, `20 percent of price`
    fn parse_number_suffix(&mut self, number: Expression) -> Result<Expression> {
        if let (Some(from), TokenKind::In, Some(to)) = (
            unit_of(self.peek_at(0)),
            self.peek_at(1),
            unit_of(self.peek_at(2)),
        ) {
            self.advance();
            self.advance();
            self.advance();
            return Ok(Expression::Convert {
                value: Box::new(number),
                from,
                to,
            });
        }

        if self.check(&TokenKind::Percent) && self.peek_at(1) == &TokenKind::Of {
            self.advance();
            self.advance();
            return Ok(Expression::PercentOf {
                percent: Box::new(number),
                of: Box::new(self.parse_expression()?),
            });
        }

        Ok(number)
    }

    /// Operations written after a variable name
    fn parse_identifier_suffix(&mut self, name: String) -> Result<Expression> {
        match self.peek().kind {
            TokenKind::In if matches!(self.peek_at(1), TokenKind::Uppercase | TokenKind::Lowercase) => {
                self.advance();
                let op = if self.match_token(&TokenKind::Uppercase) {
                    TextOp::Uppercase
                } else {
                    self.advance();
                    TextOp::Lowercase
                };
                Ok(Expression::Text { op, name })
            }
            TokenKind::Capitalized => {
                self.advance();
                Ok(Expression::Text {
                    op: TextOp::Capitalized,
                    name,
                })
            }
            TokenKind::Without => {
                self.advance();
                let removed = Box::new(self.parse_expression()?);
                Ok(Expression::Text {
                    op: TextOp::Without(removed),
                    name,
                })
            }
            TokenKind::Repeated => {
                self.advance();
                let count = Box::new(self.parse_expression()?);
                self.consume(TokenKind::Times)?;
                Ok(Expression::Text {
                    op: TextOp::Repeated(count),
                    name,
                })
            }
            TokenKind::Percent if self.peek_at(1) == &TokenKind::Of => {
                self.advance();
                self.advance();
                Ok(Expression::PercentOf {
                    percent: Box::new(Expression::Variable(name)),
                    of: Box::new(self.parse_expression()?),
                })
            }
            TokenKind::Of if matches!(self.peek_at(1), TokenKind::Identifier(_)) => {
                self.advance();
                let map = self.consume_identifier()?;
                Ok(Expression::Field { map, field: name })
            }
            _ => Ok(Expression::Variable(name)),
        }
    }

    fn parse_list(&mut self) -> Result<Expression> {
        self.consume(TokenKind::LeftBracket)?;
        let mut items = Vec::new();
        self.skip_newlines();
        while !self.check(&TokenKind::RightBracket) {
            if self.is_at_end() {
                return Err(self.expected_error("']'"));
            }
            items.push(self.parse_expression()?);
            self.match_token(&TokenKind::Comma);
            self.skip_newlines();
        }
        self.consume(TokenKind::RightBracket)?;
        Ok(Expression::ListLiteral(items))
    }

    fn memory(&mut self, query: MemoryQuery) -> Result<Expression> {
        let name = self.consume_identifier()?;
        Ok(Expression::Memory { query, name })
    }

    fn collection(&mut self, op: CollectionOp) -> Result<Expression> {
        let name = self.consume_identifier()?;
        Ok(Expression::Collection { op, name })
    }

    /// `half of E`, `double of E`, `square of E`
    fn math_of(&mut self, op: MathOp) -> Result<Expression> {
        self.advance();
        self.consume(TokenKind::Of)?;
        Ok(Expression::Math {
            op,
            operand: Box::new(self.parse_expression()?),
        })
    }
}

fn unit_of(kind: &TokenKind) -> Option<Unit> {
    let unit = match kind {
        TokenKind::Celsius => Unit::Celsius,
        TokenKind::Fahrenheit => Unit::Fahrenheit,
        TokenKind::Kilometers => Unit::Kilometers,
        TokenKind::Miles => Unit::Miles,
        TokenKind::Bytes => Unit::Bytes,
        TokenKind::Kilobytes => Unit::Kilobytes,
        TokenKind::Megabytes => Unit::Megabytes,
        TokenKind::Seconds => Unit::Seconds,
        TokenKind::Minutes => Unit::Minutes,
        TokenKind::Hours => Unit::Hours,
        TokenKind::Degrees => Unit::Degrees,
        TokenKind::Radians => Unit::Radians,
        _ => return None,
    };
    Some(unit)
}
