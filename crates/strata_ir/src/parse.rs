//! Text syntax for parameter expressions.
//!
//! Used by declaration sources to write widths, defaults and overrides as
//! strings such as `log2ceil(depth_p + 1)` or `0xFF & mask_p`. Parsing is a
//! Pratt parser over the binding powers defined on [`BinaryOp`].

use crate::expr::{BinaryOp, Builtin, Expr, ExprNode, UnaryOp, PREFIX_BP};
use crate::value::Value;

/// A syntax error with the byte offset where it was detected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} at offset {offset} in '{source_text}'")]
pub struct ParseError {
    /// What went wrong.
    pub message: String,
    /// Byte offset into the source text.
    pub offset: usize,
    /// The complete source text.
    pub source_text: String,
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Int(i64),
    Name(String),
    Op(&'static str),
    LParen,
    RParen,
    Comma,
    Eof,
}

const OPERATORS: [&str; 22] = [
    "**", "<<", ">>", "&&", "||", "==", "!=", "<=", ">=", "+", "-", "*", "/", "%", "&", "|", "^",
    "<", ">", "!", "~", "=",
];

/// Parses a complete expression.
pub fn parse_expr(source: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
    };
    let expr = parser.parse_expr_bp(0)?;
    match parser.current() {
        Token::Eof => Ok(expr),
        other => Err(parser.error(format!("unexpected {}", describe(other)))),
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Int(v) => format!("number {v}"),
        Token::Name(n) => format!("name '{n}'"),
        Token::Op(op) => format!("'{op}'"),
        Token::LParen => "'('".to_string(),
        Token::RParen => "')'".to_string(),
        Token::Comma => "','".to_string(),
        Token::Eof => "end of input".to_string(),
    }
}

fn tokenize(source: &str) -> Result<Vec<(Token, usize)>, ParseError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;
    let error = |message: String, offset: usize| ParseError {
        message,
        offset,
        source_text: source.to_string(),
    };

    while pos < bytes.len() {
        let b = bytes[pos];
        if b.is_ascii_whitespace() {
            pos += 1;
            continue;
        }
        let start = pos;
        if b.is_ascii_digit() {
            while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_') {
                pos += 1;
            }
            let text: String = source[start..pos].chars().filter(|c| *c != '_').collect();
            let parsed = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
                i64::from_str_radix(hex, 16)
            } else if let Some(bin) = text.strip_prefix("0b").or_else(|| text.strip_prefix("0B")) {
                i64::from_str_radix(bin, 2)
            } else {
                text.parse::<i64>()
            };
            let value = parsed.map_err(|_| error(format!("invalid number '{}'", &source[start..pos]), start))?;
            tokens.push((Token::Int(value), start));
            continue;
        }
        if b.is_ascii_alphabetic() || b == b'_' {
            while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_') {
                pos += 1;
            }
            tokens.push((Token::Name(source[start..pos].to_string()), start));
            continue;
        }
        match b {
            b'(' => tokens.push((Token::LParen, start)),
            b')' => tokens.push((Token::RParen, start)),
            b',' => tokens.push((Token::Comma, start)),
            _ => {
                let rest = &source[start..];
                let op = OPERATORS
                    .iter()
                    .find(|op| rest.starts_with(**op))
                    .ok_or_else(|| error(format!("unexpected character '{}'", b as char), start))?;
                if *op == "=" {
                    return Err(error("unexpected '='; use '=='".to_string(), start));
                }
                tokens.push((Token::Op(*op), start));
                pos += op.len();
                continue;
            }
        }
        pos += 1;
    }
    tokens.push((Token::Eof, source.len()));
    Ok(tokens)
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl Parser<'_> {
    fn current(&self) -> &Token {
        self.tokens
            .get(self.pos)
            .map_or(&Token::Eof, |(token, _)| token)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map_or(self.source.len(), |(_, offset)| *offset)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            offset: self.offset(),
            source_text: self.source.to_string(),
        }
    }

    fn expect(&mut self, token: Token) -> Result<(), ParseError> {
        if *self.current() == token {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!(
                "expected {}, found {}",
                describe(&token),
                describe(self.current())
            )))
        }
    }

    fn parse_expr_bp(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_prefix_expr()?;

        loop {
            let op = match self.current_as_binary_op() {
                Some(op) => op,
                None => break,
            };

            let (l_bp, r_bp) = op.binding_power();
            if l_bp < min_bp {
                break;
            }

            self.advance(); // consume operator token

            let rhs = self.parse_expr_bp(r_bp)?;
            lhs = Expr::binary(op, lhs, rhs);
        }

        Ok(lhs)
    }

    fn parse_prefix_expr(&mut self) -> Result<Expr, ParseError> {
        if let Some(op) = self.current_as_unary_op() {
            self.advance();
            let operand = self.parse_expr_bp(PREFIX_BP)?;
            // Keep negative literals as constants so rendering round-trips.
            if let (UnaryOp::Neg, ExprNode::Const(Value::Int(v))) = (op, operand.node()) {
                if let Some(neg) = v.checked_neg() {
                    return Ok(Expr::int(neg));
                }
            }
            return Ok(Expr::unary(op, operand));
        }

        match self.current().clone() {
            Token::Int(v) => {
                self.advance();
                Ok(Expr::int(v))
            }
            Token::Name(name) => {
                self.advance();
                match name.as_str() {
                    "true" => return Ok(Expr::bool(true)),
                    "false" => return Ok(Expr::bool(false)),
                    _ => {}
                }
                if *self.current() != Token::LParen {
                    return Ok(Expr::param(name.as_str()));
                }
                let args = self.parse_call_args()?;
                if name == "abs" {
                    return match args.as_slice() {
                        [arg] => Ok(Expr::unary(UnaryOp::Abs, *arg)),
                        _ => Err(self.error("abs expects one argument")),
                    };
                }
                let builtin = Builtin::from_name(&name)
                    .ok_or_else(|| self.error(format!("unknown function '{name}'")))?;
                Expr::call(builtin, args).map_err(|e| self.error(e.to_string()))
            }
            Token::LParen => {
                self.advance();
                let inner = self.parse_expr_bp(0)?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            other => Err(self.error(format!("unexpected {}", describe(&other)))),
        }
    }

    fn parse_call_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect(Token::LParen)?;
        let mut args = Vec::new();
        if *self.current() == Token::RParen {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr_bp(0)?);
            if *self.current() == Token::Comma {
                self.advance();
                continue;
            }
            self.expect(Token::RParen)?;
            return Ok(args);
        }
    }

    fn current_as_binary_op(&self) -> Option<BinaryOp> {
        let Token::Op(op) = self.current() else {
            return None;
        };
        Some(match *op {
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Mod,
            "**" => BinaryOp::Pow,
            "&" => BinaryOp::BitAnd,
            "|" => BinaryOp::BitOr,
            "^" => BinaryOp::BitXor,
            "<<" => BinaryOp::Shl,
            ">>" => BinaryOp::Shr,
            "&&" => BinaryOp::And,
            "||" => BinaryOp::Or,
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::Ne,
            "<" => BinaryOp::Lt,
            "<=" => BinaryOp::Le,
            ">" => BinaryOp::Gt,
            ">=" => BinaryOp::Ge,
            _ => return None,
        })
    }

    fn current_as_unary_op(&self) -> Option<UnaryOp> {
        match self.current() {
            Token::Op("-") => Some(UnaryOp::Neg),
            Token::Op("~") => Some(UnaryOp::BitNot),
            Token::Op("!") => Some(UnaryOp::Not),
            _ => None,
        }
    }
}
