//! `.proto` source parser.
//!
//! A small tokenizer followed by a recursive-descent parser over the subset of
//! the protobuf language that matters for stub generation. Constructs that do
//! not affect messages, enums or services (`reserved`, `extensions`, `extend`,
//! field options) are consumed and dropped.

use crate::ast::{
    Constant, Enum, EnumValue, Field, FieldType, HttpRule, Label, Message, OptionDecl, ProtoFile,
    Rpc, Service,
};
use std::iter::Peekable;
use std::str::CharIndices;
use thiserror::Error;
use tracing::{debug, trace};

/// Error type for `.proto` parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("line {line}: unexpected character {ch:?}")]
    UnexpectedChar { line: usize, ch: char },

    #[error("line {line}: unterminated string literal")]
    UnterminatedString { line: usize },

    #[error("line {line}: unterminated block comment")]
    UnterminatedComment { line: usize },

    #[error("line {line}: expected {expected}, found {found}")]
    Unexpected {
        line: usize,
        expected: String,
        found: String,
    },

    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: String },

    #[error("line {line}: invalid number {text:?}")]
    InvalidNumber { line: usize, text: String },

    #[error("line {line}: {construct} is not supported")]
    Unsupported { line: usize, construct: String },
}

impl ParseError {
    /// Source line the error points at, if any
    #[must_use]
    pub const fn line(&self) -> Option<usize> {
        match self {
            Self::UnexpectedChar { line, .. }
            | Self::UnterminatedString { line }
            | Self::UnterminatedComment { line }
            | Self::Unexpected { line, .. }
            | Self::InvalidNumber { line, .. }
            | Self::Unsupported { line, .. } => Some(*line),
            Self::UnexpectedEof { .. } => None,
        }
    }
}

type Result<T> = std::result::Result<T, ParseError>;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    /// Identifier or dotted name, e.g. `foo`, `google.api.http`, `.pkg.Type`
    Ident(String),
    /// Numeric literal text, validated when used
    Number(String),
    Str(String),
    Symbol(char),
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Self::Ident(s) => format!("identifier `{s}`"),
            Self::Number(s) => format!("number `{s}`"),
            Self::Str(s) => format!("string {s:?}"),
            Self::Symbol(c) => format!("`{c}`"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Spanned {
    token: Token,
    line: usize,
}

// ============================================================================
// Tokenizer
// ============================================================================

struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    line: usize,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            line: 1,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let (_, c) = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn peek_second(&self) -> Option<char> {
        let mut ahead = self.chars.clone();
        ahead.next();
        ahead.next().map(|(_, c)| c)
    }

    fn offset(&mut self) -> usize {
        self.chars.peek().map_or(self.source.len(), |&(i, _)| i)
    }

    fn take_while(&mut self, keep: impl Fn(char) -> bool) -> &'a str {
        let start = self.offset();
        while self.peek().is_some_and(&keep) {
            self.bump();
        }
        let end = self.offset();
        self.source.get(start..end).unwrap_or_default()
    }

    fn skip_block_comment(&mut self) -> Result<()> {
        let line = self.line;
        let mut previous = '\0';
        while let Some(c) = self.bump() {
            if previous == '*' && c == '/' {
                return Ok(());
            }
            previous = c;
        }
        Err(ParseError::UnterminatedComment { line })
    }

    fn string(&mut self, quote: char) -> Result<String> {
        let line = self.line;
        let mut value = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => return Err(ParseError::UnterminatedString { line }),
                Some(c) if c == quote => return Ok(value),
                Some('\\') => match self.bump() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('r') => value.push('\r'),
                    Some('0') => value.push('\0'),
                    Some(other) => value.push(other),
                    None => return Err(ParseError::UnterminatedString { line }),
                },
                Some(c) => value.push(c),
            }
        }
    }

    fn tokenize(mut self) -> Result<Vec<Spanned>> {
        let mut tokens = Vec::new();

        while let Some(c) = self.peek() {
            let line = self.line;
            let token = match c {
                c if c.is_whitespace() => {
                    self.bump();
                    continue;
                }
                '/' if self.peek_second() == Some('/') => {
                    self.take_while(|c| c != '\n');
                    continue;
                }
                '/' if self.peek_second() == Some('*') => {
                    self.bump();
                    self.bump();
                    self.skip_block_comment()?;
                    continue;
                }
                '"' | '\'' => {
                    self.bump();
                    Token::Str(self.string(c)?)
                }
                c if c.is_ascii_digit() => Token::Number(
                    self.take_while(|c| c.is_ascii_alphanumeric() || c == '.')
                        .to_string(),
                ),
                c if c.is_ascii_alphabetic() || c == '_' || c == '.' => Token::Ident(
                    self.take_while(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
                        .to_string(),
                ),
                '{' | '}' | '(' | ')' | '[' | ']' | '<' | '>' | ';' | ',' | '=' | ':' | '-'
                | '+' => {
                    self.bump();
                    Token::Symbol(c)
                }
                other => return Err(ParseError::UnexpectedChar { line, ch: other }),
            };
            tokens.push(Spanned { token, line });
        }

        Ok(tokens)
    }
}

// ============================================================================
// Parser
// ============================================================================

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(1, |s| s.line)
    }

    fn next(&mut self, expected: &str) -> Result<Spanned> {
        let spanned = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| ParseError::UnexpectedEof {
                expected: expected.to_string(),
            })?;
        self.pos += 1;
        Ok(spanned)
    }

    fn unexpected(expected: &str, found: &Spanned) -> ParseError {
        ParseError::Unexpected {
            line: found.line,
            expected: expected.to_string(),
            found: found.token.describe(),
        }
    }

    fn peek_is_ident(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(s)) if s == keyword)
    }

    fn peek_is_symbol(&self, symbol: char) -> bool {
        self.peek() == Some(&Token::Symbol(symbol))
    }

    fn eat_symbol(&mut self, symbol: char) -> bool {
        let matched = self.peek_is_symbol(symbol);
        if matched {
            self.pos += 1;
        }
        matched
    }

    fn eat_ident(&mut self, keyword: &str) -> bool {
        let matched = self.peek_is_ident(keyword);
        if matched {
            self.pos += 1;
        }
        matched
    }

    fn expect_symbol(&mut self, symbol: char) -> Result<()> {
        let expected = format!("`{symbol}`");
        let spanned = self.next(&expected)?;
        match spanned.token {
            Token::Symbol(c) if c == symbol => Ok(()),
            _ => Err(Self::unexpected(&expected, &spanned)),
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<String> {
        let spanned = self.next(what)?;
        match spanned.token {
            Token::Ident(s) => Ok(s),
            _ => Err(Self::unexpected(what, &spanned)),
        }
    }

    fn expect_string(&mut self, what: &str) -> Result<String> {
        let spanned = self.next(what)?;
        match spanned.token {
            Token::Str(s) => Ok(s),
            _ => Err(Self::unexpected(what, &spanned)),
        }
    }

    fn expect_int(&mut self, what: &str) -> Result<i64> {
        let negative = self.eat_symbol('-');
        let spanned = self.next(what)?;
        let Token::Number(text) = &spanned.token else {
            return Err(Self::unexpected(what, &spanned));
        };
        let value = parse_int(text).ok_or_else(|| ParseError::InvalidNumber {
            line: spanned.line,
            text: text.clone(),
        })?;
        Ok(if negative { -value } else { value })
    }

    fn expect_i32(&mut self, what: &str) -> Result<i32> {
        let line = self.line();
        let value = self.expect_int(what)?;
        i32::try_from(value).map_err(|_| ParseError::InvalidNumber {
            line,
            text: value.to_string(),
        })
    }

    /// Skip tokens up to and including the next `;` at the current nesting level
    fn skip_statement(&mut self) -> Result<()> {
        let mut depth = 0usize;
        loop {
            let spanned = self.next("`;`")?;
            match spanned.token {
                Token::Symbol('{' | '[' | '(') => depth += 1,
                Token::Symbol('}' | ']' | ')') => depth = depth.saturating_sub(1),
                Token::Symbol(';') if depth == 0 => return Ok(()),
                _ => {}
            }
        }
    }

    /// Skip a `{ ... }` block, starting at its opening brace
    fn skip_block(&mut self) -> Result<()> {
        self.expect_symbol('{')?;
        let mut depth = 1usize;
        while depth > 0 {
            match self.next("`}`")?.token {
                Token::Symbol('{') => depth += 1,
                Token::Symbol('}') => depth -= 1,
                _ => {}
            }
        }
        Ok(())
    }

    fn parse_file(&mut self) -> Result<ProtoFile> {
        let mut file = ProtoFile::default();

        while let Some(token) = self.peek().cloned() {
            let line = self.line();
            match token {
                Token::Symbol(';') => self.pos += 1,
                Token::Ident(keyword) => match keyword.as_str() {
                    "syntax" | "edition" => {
                        self.pos += 1;
                        self.expect_symbol('=')?;
                        file.syntax = Some(self.expect_string("syntax string")?);
                        self.expect_symbol(';')?;
                    }
                    "package" => {
                        self.pos += 1;
                        file.package = Some(self.expect_ident("package name")?);
                        self.expect_symbol(';')?;
                    }
                    "import" => {
                        self.pos += 1;
                        let _ = self.eat_ident("public") || self.eat_ident("weak");
                        file.imports.push(self.expect_string("import path")?);
                        self.expect_symbol(';')?;
                    }
                    "option" => file.options.push(self.parse_option_statement()?),
                    "message" => file.messages.push(self.parse_message()?),
                    "enum" => file.enums.push(self.parse_enum()?),
                    "service" => file.services.push(self.parse_service()?),
                    "extend" => {
                        self.pos += 1;
                        self.expect_ident("extended type")?;
                        self.skip_block()?;
                    }
                    _ => {
                        return Err(ParseError::Unexpected {
                            line,
                            expected: "top-level declaration".to_string(),
                            found: format!("identifier `{keyword}`"),
                        })
                    }
                },
                other => {
                    return Err(ParseError::Unexpected {
                        line,
                        expected: "top-level declaration".to_string(),
                        found: other.describe(),
                    })
                }
            }
        }

        Ok(file)
    }

    /// `option name = constant;`, positioned at `option`
    fn parse_option_statement(&mut self) -> Result<OptionDecl> {
        self.pos += 1;
        let name = self.parse_option_name()?;
        self.expect_symbol('=')?;
        let value = self.parse_constant()?;
        self.expect_symbol(';')?;
        trace!(option = %name, "Parsed option");
        Ok(OptionDecl { name, value })
    }

    fn parse_option_name(&mut self) -> Result<String> {
        let mut name = if self.eat_symbol('(') {
            let inner = self.expect_ident("option extension name")?;
            self.expect_symbol(')')?;
            format!("({inner})")
        } else {
            self.expect_ident("option name")?
        };
        // `(ext).field` lexes as `)` then `.field`
        while let Some(Token::Ident(suffix)) = self.peek() {
            if !suffix.starts_with('.') {
                break;
            }
            name.push_str(suffix);
            self.pos += 1;
        }
        Ok(name)
    }

    fn parse_constant(&mut self) -> Result<Constant> {
        if self.peek_is_symbol('{') {
            return self.parse_aggregate();
        }
        if self.eat_symbol('[') {
            let mut items = Vec::new();
            while !self.eat_symbol(']') {
                items.push(self.parse_constant()?);
                self.eat_symbol(',');
            }
            return Ok(Constant::List(items));
        }

        let negative = self.eat_symbol('-');
        if !negative {
            self.eat_symbol('+');
        }
        let spanned = self.next("constant")?;
        match spanned.token {
            Token::Str(mut s) => {
                // Adjacent string literals concatenate
                while let Some(Token::Str(next)) = self.peek() {
                    s.push_str(next);
                    self.pos += 1;
                }
                Ok(Constant::Str(s))
            }
            Token::Number(text) => {
                if let Some(value) = parse_int(&text) {
                    Ok(Constant::Int(if negative { -value } else { value }))
                } else {
                    text.parse::<f64>()
                        .map(|v| Constant::Float(if negative { -v } else { v }))
                        .map_err(|_| ParseError::InvalidNumber {
                            line: spanned.line,
                            text,
                        })
                }
            }
            Token::Ident(ident) => Ok(match ident.as_str() {
                "true" => Constant::Bool(true),
                "false" => Constant::Bool(false),
                "inf" => Constant::Float(if negative { f64::NEG_INFINITY } else { f64::INFINITY }),
                "nan" => Constant::Float(f64::NAN),
                _ => Constant::Ident(ident),
            }),
            Token::Symbol(_) => Err(Self::unexpected("constant", &spanned)),
        }
    }

    /// Text-format aggregate: `{ key: value key2 { ... } }`
    fn parse_aggregate(&mut self) -> Result<Constant> {
        self.expect_symbol('{')?;
        let mut entries = Vec::new();
        while !self.eat_symbol('}') {
            let key = if self.eat_symbol('[') {
                let key = self.expect_ident("extension name")?;
                self.expect_symbol(']')?;
                key
            } else {
                self.expect_ident("field name")?
            };
            let has_colon = self.eat_symbol(':');
            let value = if self.peek_is_symbol('{') {
                self.parse_aggregate()?
            } else if has_colon {
                self.parse_constant()?
            } else {
                let spanned = self.next("`:`")?;
                return Err(Self::unexpected("`:`", &spanned));
            };
            entries.push((key, value));
            let _ = self.eat_symbol(',') || self.eat_symbol(';');
        }
        Ok(Constant::Aggregate(entries))
    }

    /// `[name = value, ...]` after a field or enum value; contents are dropped
    fn skip_field_options(&mut self) -> Result<()> {
        if !self.eat_symbol('[') {
            return Ok(());
        }
        let mut depth = 1usize;
        while depth > 0 {
            match self.next("`]`")?.token {
                Token::Symbol('[') => depth += 1,
                Token::Symbol(']') => depth -= 1,
                _ => {}
            }
        }
        Ok(())
    }

    /// `message Name { ... }`, positioned at `message`
    fn parse_message(&mut self) -> Result<Message> {
        self.pos += 1;
        let mut message = Message {
            name: self.expect_ident("message name")?,
            ..Message::default()
        };
        self.expect_symbol('{')?;

        while !self.eat_symbol('}') {
            let line = self.line();
            match self.peek().cloned() {
                None => {
                    return Err(ParseError::UnexpectedEof {
                        expected: format!("`}}` closing message {}", message.name),
                    })
                }
                Some(Token::Symbol(';')) => self.pos += 1,
                Some(Token::Ident(keyword)) => match keyword.as_str() {
                    "message" => message.messages.push(self.parse_message()?),
                    "enum" => message.enums.push(self.parse_enum()?),
                    "option" => {
                        self.parse_option_statement()?;
                    }
                    "reserved" | "extensions" => self.skip_statement()?,
                    "extend" => {
                        self.pos += 1;
                        self.expect_ident("extended type")?;
                        self.skip_block()?;
                    }
                    "oneof" => self.parse_oneof(&mut message)?,
                    "map" if self.tokens.get(self.pos + 1).map(|s| &s.token)
                        == Some(&Token::Symbol('<')) =>
                    {
                        message.fields.push(self.parse_map_field()?);
                    }
                    "group" => {
                        return Err(ParseError::Unsupported {
                            line,
                            construct: "group".to_string(),
                        })
                    }
                    _ => message.fields.push(self.parse_field(None)?),
                },
                Some(other) => {
                    return Err(ParseError::Unexpected {
                        line,
                        expected: "field or declaration".to_string(),
                        found: other.describe(),
                    })
                }
            }
        }

        debug!(message = %message.name, fields = message.fields.len(), "Parsed message");
        Ok(message)
    }

    fn parse_oneof(&mut self, message: &mut Message) -> Result<()> {
        self.pos += 1;
        let index = message.oneofs.len();
        message.oneofs.push(self.expect_ident("oneof name")?);
        self.expect_symbol('{')?;
        while !self.eat_symbol('}') {
            if self.peek_is_ident("option") {
                self.parse_option_statement()?;
            } else if !self.eat_symbol(';') {
                message.fields.push(self.parse_field(Some(index))?);
            }
        }
        Ok(())
    }

    /// `[label] type name = number [options];`
    fn parse_field(&mut self, oneof: Option<usize>) -> Result<Field> {
        let label = if self.eat_ident("repeated") {
            Label::Repeated
        } else if self.eat_ident("optional") {
            Label::Optional
        } else if self.eat_ident("required") {
            Label::Required
        } else {
            Label::None
        };
        let ty = FieldType::Named(self.expect_ident("field type")?);
        let name = self.expect_ident("field name")?;
        self.expect_symbol('=')?;
        let number = self.expect_i32("field number")?;
        self.skip_field_options()?;
        self.expect_symbol(';')?;

        Ok(Field {
            name,
            number,
            label,
            ty,
            oneof,
        })
    }

    /// `map<K, V> name = number [options];`
    fn parse_map_field(&mut self) -> Result<Field> {
        self.pos += 1;
        self.expect_symbol('<')?;
        let key = self.expect_ident("map key type")?;
        self.expect_symbol(',')?;
        let value = self.expect_ident("map value type")?;
        self.expect_symbol('>')?;
        let name = self.expect_ident("field name")?;
        self.expect_symbol('=')?;
        let number = self.expect_i32("field number")?;
        self.skip_field_options()?;
        self.expect_symbol(';')?;

        Ok(Field {
            name,
            number,
            label: Label::Repeated,
            ty: FieldType::Map { key, value },
            oneof: None,
        })
    }

    /// `enum Name { ... }`, positioned at `enum`
    fn parse_enum(&mut self) -> Result<Enum> {
        self.pos += 1;
        let mut proto_enum = Enum {
            name: self.expect_ident("enum name")?,
            values: Vec::new(),
        };
        self.expect_symbol('{')?;

        while !self.eat_symbol('}') {
            if self.eat_symbol(';') {
                continue;
            }
            if self.peek_is_ident("option") {
                self.parse_option_statement()?;
                continue;
            }
            if self.peek_is_ident("reserved") {
                self.skip_statement()?;
                continue;
            }
            let name = self.expect_ident("enum value name")?;
            self.expect_symbol('=')?;
            let number = self.expect_i32("enum value number")?;
            self.skip_field_options()?;
            self.expect_symbol(';')?;
            proto_enum.values.push(EnumValue { name, number });
        }

        Ok(proto_enum)
    }

    /// `service Name { rpc ... }`, positioned at `service`
    fn parse_service(&mut self) -> Result<Service> {
        self.pos += 1;
        let mut service = Service {
            name: self.expect_ident("service name")?,
            rpcs: Vec::new(),
        };
        self.expect_symbol('{')?;

        while !self.eat_symbol('}') {
            if self.eat_symbol(';') {
                continue;
            }
            if self.peek_is_ident("option") {
                self.parse_option_statement()?;
                continue;
            }
            if self.peek_is_ident("rpc") {
                service.rpcs.push(self.parse_rpc()?);
                continue;
            }
            let spanned = self.next("`rpc`")?;
            return Err(Self::unexpected("`rpc`", &spanned));
        }

        debug!(service = %service.name, rpcs = service.rpcs.len(), "Parsed service");
        Ok(service)
    }

    /// `rpc Name ([stream] Req) returns ([stream] Resp) (; | { options })`
    fn parse_rpc(&mut self) -> Result<Rpc> {
        self.pos += 1;
        let name = self.expect_ident("rpc name")?;

        self.expect_symbol('(')?;
        let client_streaming = self.eat_stream();
        let request = self.expect_ident("request type")?;
        self.expect_symbol(')')?;

        let returns = self.next("`returns`")?;
        if returns.token != Token::Ident("returns".to_string()) {
            return Err(Self::unexpected("`returns`", &returns));
        }

        self.expect_symbol('(')?;
        let server_streaming = self.eat_stream();
        let response = self.expect_ident("response type")?;
        self.expect_symbol(')')?;

        let mut rpc = Rpc {
            name,
            request,
            response,
            client_streaming,
            server_streaming,
            http: None,
        };

        if self.eat_symbol(';') {
            return Ok(rpc);
        }

        self.expect_symbol('{')?;
        while !self.eat_symbol('}') {
            if self.eat_symbol(';') {
                continue;
            }
            if !self.peek_is_ident("option") {
                let spanned = self.next("`option`")?;
                return Err(Self::unexpected("`option` or `}`", &spanned));
            }
            let option = self.parse_option_statement()?;
            if option.name == "(google.api.http)" {
                rpc.http = HttpRule::from_constant(&option.value);
                trace!(rpc = %rpc.name, http = ?rpc.http, "Parsed HTTP rule");
            }
        }
        self.eat_symbol(';');

        Ok(rpc)
    }

    fn eat_stream(&mut self) -> bool {
        // `stream` is only a keyword when a type name follows it
        let followed_by_type = matches!(
            self.tokens.get(self.pos + 1).map(|s| &s.token),
            Some(Token::Ident(_))
        );
        followed_by_type && self.eat_ident("stream")
    }
}

fn parse_int(text: &str) -> Option<i64> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).ok();
    }
    if text.len() > 1 && text.starts_with('0') && text.bytes().all(|b| b.is_ascii_digit()) {
        return i64::from_str_radix(text.get(1..)?, 8).ok();
    }
    text.parse().ok()
}

/// Parse `.proto` source text.
///
/// # Errors
///
/// Returns a `ParseError` carrying the offending line for lexical or syntax
/// errors.
pub fn parse_proto(source: &str) -> Result<ProtoFile> {
    let tokens = Lexer::new(source).tokenize()?;
    trace!(tokens = tokens.len(), "Tokenized proto source");
    Parser { tokens, pos: 0 }.parse_file()
}
