//! Lexer (tokenizer) for Python source code
//!
//! Converts raw source text into a flat [`Token`] stream consumed by the parser.
//! Indentation is turned into explicit `Indent`/`Dedent` tokens and logical
//! line ends into `Newline`, so the parser never looks at whitespace. Newlines
//! inside brackets and after a backslash continuation are not logical line ends.

use super::ast::SourceLocation;
use std::fmt;

/// Deepest bracket nesting accepted before the parser would recurse too far
const MAX_BRACKET_DEPTH: usize = 200;

/// Deepest block nesting accepted
const MAX_INDENT_LEVELS: usize = 100;

/// A token plus the location of its first character
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub location: SourceLocation,
}

/// One literal run or `{...}` field of an f-string, before the field
/// expression has been parsed.
#[derive(Debug, Clone, PartialEq)]
pub enum FStringSegment {
    Literal(String),
    Field {
        source: String,
        conversion: Option<char>,
        format_spec: Option<String>,
    },
}

/// All token variants produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Int(i64),
    Float(f64),
    Str(String),
    FString(Vec<FStringSegment>),

    // Identifiers
    Name(String),

    // Keywords
    False,
    None,
    True,
    And,
    As,
    Assert,
    Break,
    Class,
    Continue,
    Def,
    Del,
    Elif,
    Else,
    Except,
    Finally,
    For,
    From,
    Global,
    If,
    Import,
    In,
    Is,
    Lambda,
    Nonlocal,
    Not,
    Or,
    Pass,
    Raise,
    Return,
    Try,
    While,
    /// Reserved words the subset does not implement (`with`, `yield`, ...)
    Unsupported(&'static str),

    // Arithmetic
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    DoubleSlash,
    Percent,
    At,

    // Bitwise
    Amp,
    Pipe,
    Caret,
    Tilde,
    Shl,
    Shr,

    // Comparison
    Lt,
    Gt,
    LtE,
    GtE,
    EqEq,
    NotEq,

    // Assignment
    Eq,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    DoubleSlashEq,
    PercentEq,
    DoubleStarEq,
    AmpEq,
    PipeEq,
    CaretEq,
    ShlEq,
    ShrEq,

    // Punctuation
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Dot,
    Semicolon,
    Arrow,

    // Layout
    Newline,
    Indent,
    Dedent,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Int(n) => write!(f, "integer {}", n),
            TokenKind::Float(x) => write!(f, "float {}", x),
            TokenKind::Str(_) | TokenKind::FString(_) => write!(f, "string literal"),
            TokenKind::Name(s) => write!(f, "name '{}'", s),
            TokenKind::Unsupported(word) => write!(f, "'{}'", word),
            TokenKind::Newline => write!(f, "end of line"),
            TokenKind::Indent => write!(f, "indent"),
            TokenKind::Dedent => write!(f, "dedent"),
            TokenKind::Eof => write!(f, "end of input"),
            other => match keyword_or_symbol_text(other) {
                Some(text) => write!(f, "'{}'", text),
                None => write!(f, "{:?}", other),
            },
        }
    }
}

fn keyword_or_symbol_text(kind: &TokenKind) -> Option<&'static str> {
    let text = match kind {
        TokenKind::False => "False",
        TokenKind::None => "None",
        TokenKind::True => "True",
        TokenKind::And => "and",
        TokenKind::As => "as",
        TokenKind::Assert => "assert",
        TokenKind::Break => "break",
        TokenKind::Class => "class",
        TokenKind::Continue => "continue",
        TokenKind::Def => "def",
        TokenKind::Del => "del",
        TokenKind::Elif => "elif",
        TokenKind::Else => "else",
        TokenKind::Except => "except",
        TokenKind::Finally => "finally",
        TokenKind::For => "for",
        TokenKind::From => "from",
        TokenKind::Global => "global",
        TokenKind::If => "if",
        TokenKind::Import => "import",
        TokenKind::In => "in",
        TokenKind::Is => "is",
        TokenKind::Lambda => "lambda",
        TokenKind::Nonlocal => "nonlocal",
        TokenKind::Not => "not",
        TokenKind::Or => "or",
        TokenKind::Pass => "pass",
        TokenKind::Raise => "raise",
        TokenKind::Return => "return",
        TokenKind::Try => "try",
        TokenKind::While => "while",
        TokenKind::Plus => "+",
        TokenKind::Minus => "-",
        TokenKind::Star => "*",
        TokenKind::DoubleStar => "**",
        TokenKind::Slash => "/",
        TokenKind::DoubleSlash => "//",
        TokenKind::Percent => "%",
        TokenKind::At => "@",
        TokenKind::Amp => "&",
        TokenKind::Pipe => "|",
        TokenKind::Caret => "^",
        TokenKind::Tilde => "~",
        TokenKind::Shl => "<<",
        TokenKind::Shr => ">>",
        TokenKind::Lt => "<",
        TokenKind::Gt => ">",
        TokenKind::LtE => "<=",
        TokenKind::GtE => ">=",
        TokenKind::EqEq => "==",
        TokenKind::NotEq => "!=",
        TokenKind::Eq => "=",
        TokenKind::PlusEq => "+=",
        TokenKind::MinusEq => "-=",
        TokenKind::StarEq => "*=",
        TokenKind::SlashEq => "/=",
        TokenKind::DoubleSlashEq => "//=",
        TokenKind::PercentEq => "%=",
        TokenKind::DoubleStarEq => "**=",
        TokenKind::AmpEq => "&=",
        TokenKind::PipeEq => "|=",
        TokenKind::CaretEq => "^=",
        TokenKind::ShlEq => "<<=",
        TokenKind::ShrEq => ">>=",
        TokenKind::LParen => "(",
        TokenKind::RParen => ")",
        TokenKind::LBracket => "[",
        TokenKind::RBracket => "]",
        TokenKind::LBrace => "{",
        TokenKind::RBrace => "}",
        TokenKind::Comma => ",",
        TokenKind::Colon => ":",
        TokenKind::Dot => ".",
        TokenKind::Semicolon => ";",
        TokenKind::Arrow => "->",
        _ => return None,
    };
    Some(text)
}

/// Lexer error
#[derive(Debug, Clone)]
pub struct LexError {
    pub message: String,
    pub location: SourceLocation,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Lex error at line {}, column {}: {}",
            self.location.line, self.location.column, self.message
        )
    }
}

impl std::error::Error for LexError {}

/// Tokenizer state
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    indent_stack: Vec<usize>,
    bracket_depth: usize,
    at_line_start: bool,
    tokens: Vec<Token>,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            indent_stack: vec![0],
            bracket_depth: 0,
            at_line_start: true,
            tokens: Vec::new(),
        }
    }

    /// Lex an expression fragment (f-string field) that starts at `origin`.
    /// No layout tokens are produced; the caller appends `Eof`.
    pub fn fragment(input: &str, origin: SourceLocation) -> Self {
        let mut lexer = Lexer::new(input);
        lexer.line = origin.line;
        lexer.column = origin.column;
        lexer.at_line_start = false;
        lexer.bracket_depth = 1;
        lexer
    }

    /// Tokenize the entire input
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        loop {
            if self.at_line_start && self.bracket_depth == 0 {
                let indent = self.measure_indent();
                match self.peek() {
                    None => break,
                    Some('\n') => {
                        self.advance();
                        continue;
                    }
                    Some('#') => {
                        self.skip_comment();
                        continue;
                    }
                    Some('\\') if self.peek_ahead(1) == Some('\n') => {
                        self.advance();
                        self.advance();
                        continue;
                    }
                    _ => {}
                }
                self.handle_indent(indent)?;
                self.at_line_start = false;
            }

            self.skip_inline_whitespace()?;

            match self.peek() {
                None => break,
                Some('\n') => {
                    let loc = self.current_location();
                    self.advance();
                    if self.bracket_depth == 0 {
                        self.push_newline(loc);
                        self.at_line_start = true;
                    }
                }
                Some(_) => {
                    let token = self.next_token()?;
                    self.tokens.push(token);
                }
            }
        }

        let loc = self.current_location();
        if self.bracket_depth == 0 {
            self.push_newline(loc);
            while self.indent_stack.len() > 1 {
                self.indent_stack.pop();
                self.tokens.push(Token {
                    kind: TokenKind::Dedent,
                    location: loc,
                });
            }
        }
        self.tokens.push(Token {
            kind: TokenKind::Eof,
            location: loc,
        });
        Ok(self.tokens)
    }

    fn push_newline(&mut self, location: SourceLocation) {
        let needs_newline = self
            .tokens
            .last()
            .is_some_and(|t| !matches!(t.kind, TokenKind::Newline | TokenKind::Dedent | TokenKind::Indent));
        if needs_newline {
            self.tokens.push(Token {
                kind: TokenKind::Newline,
                location,
            });
        }
    }

    /// Count leading indentation columns (tabs advance to the next multiple of 8)
    fn measure_indent(&mut self) -> usize {
        let mut indent = 0;
        while let Some(ch) = self.peek() {
            match ch {
                ' ' => indent += 1,
                '\t' => indent = (indent / 8 + 1) * 8,
                '\x0c' => indent = 0,
                '\r' => {}
                _ => break,
            }
            self.advance();
        }
        indent
    }

    fn handle_indent(&mut self, indent: usize) -> Result<(), LexError> {
        let location = self.current_location();
        let current = *self.indent_stack.last().unwrap_or(&0);

        if indent > current {
            if self.indent_stack.len() > MAX_INDENT_LEVELS {
                return Err(LexError {
                    message: "too many levels of indentation".to_string(),
                    location,
                });
            }
            self.indent_stack.push(indent);
            self.tokens.push(Token {
                kind: TokenKind::Indent,
                location,
            });
        } else if indent < current {
            while let Some(&level) = self.indent_stack.last() {
                if level <= indent {
                    break;
                }
                self.indent_stack.pop();
                self.tokens.push(Token {
                    kind: TokenKind::Dedent,
                    location,
                });
            }
            if self.indent_stack.last().copied() != Some(indent) {
                return Err(LexError {
                    message: "unindent does not match any outer indentation level".to_string(),
                    location,
                });
            }
        }
        Ok(())
    }

    fn skip_inline_whitespace(&mut self) -> Result<(), LexError> {
        while let Some(ch) = self.peek() {
            match ch {
                ' ' | '\t' | '\r' | '\x0c' => {
                    self.advance();
                }
                '#' => self.skip_comment(),
                '\\' => {
                    if self.peek_ahead(1) == Some('\n') {
                        self.advance();
                        self.advance();
                    } else if self.peek_ahead(1) == Some('\r') && self.peek_ahead(2) == Some('\n') {
                        self.advance();
                        self.advance();
                        self.advance();
                    } else {
                        return Err(LexError {
                            message: "unexpected character after line continuation character"
                                .to_string(),
                            location: self.current_location(),
                        });
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn skip_comment(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        let location = self.current_location();
        let ch = self.peek().unwrap_or('\0');

        if ch == '"' || ch == '\'' {
            return self.string_literal("", location);
        }
        if ch.is_ascii_digit() || (ch == '.' && self.peek_ahead(1).is_some_and(|c| c.is_ascii_digit()))
        {
            return self.number_literal(location);
        }
        if ch.is_alphabetic() || ch == '_' {
            return self.identifier_or_keyword(location);
        }

        self.advance();
        let next = self.peek();
        let kind = match ch {
            '(' | '[' | '{' => {
                self.bracket_depth += 1;
                if self.bracket_depth > MAX_BRACKET_DEPTH {
                    return Err(LexError {
                        message: "too many nested parentheses".to_string(),
                        location,
                    });
                }
                match ch {
                    '(' => TokenKind::LParen,
                    '[' => TokenKind::LBracket,
                    _ => TokenKind::LBrace,
                }
            }
            ')' | ']' | '}' => {
                self.bracket_depth = self.bracket_depth.saturating_sub(1);
                match ch {
                    ')' => TokenKind::RParen,
                    ']' => TokenKind::RBracket,
                    _ => TokenKind::RBrace,
                }
            }
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            ';' => TokenKind::Semicolon,
            '.' => TokenKind::Dot,
            '~' => TokenKind::Tilde,
            '+' => self.with_eq(next, TokenKind::PlusEq, TokenKind::Plus),
            '%' => self.with_eq(next, TokenKind::PercentEq, TokenKind::Percent),
            '&' => self.with_eq(next, TokenKind::AmpEq, TokenKind::Amp),
            '|' => self.with_eq(next, TokenKind::PipeEq, TokenKind::Pipe),
            '^' => self.with_eq(next, TokenKind::CaretEq, TokenKind::Caret),
            '@' => TokenKind::At,
            '=' => self.with_eq(next, TokenKind::EqEq, TokenKind::Eq),
            '-' => {
                if next == Some('>') {
                    self.advance();
                    TokenKind::Arrow
                } else {
                    self.with_eq(next, TokenKind::MinusEq, TokenKind::Minus)
                }
            }
            '!' => {
                if next == Some('=') {
                    self.advance();
                    TokenKind::NotEq
                } else {
                    return Err(LexError {
                        message: "invalid syntax".to_string(),
                        location,
                    });
                }
            }
            '*' => {
                if next == Some('*') {
                    self.advance();
                    let after = self.peek();
                    self.with_eq(after, TokenKind::DoubleStarEq, TokenKind::DoubleStar)
                } else {
                    self.with_eq(next, TokenKind::StarEq, TokenKind::Star)
                }
            }
            '/' => {
                if next == Some('/') {
                    self.advance();
                    let after = self.peek();
                    self.with_eq(after, TokenKind::DoubleSlashEq, TokenKind::DoubleSlash)
                } else {
                    self.with_eq(next, TokenKind::SlashEq, TokenKind::Slash)
                }
            }
            '<' => {
                if next == Some('<') {
                    self.advance();
                    let after = self.peek();
                    self.with_eq(after, TokenKind::ShlEq, TokenKind::Shl)
                } else {
                    self.with_eq(next, TokenKind::LtE, TokenKind::Lt)
                }
            }
            '>' => {
                if next == Some('>') {
                    self.advance();
                    let after = self.peek();
                    self.with_eq(after, TokenKind::ShrEq, TokenKind::Shr)
                } else {
                    self.with_eq(next, TokenKind::GtE, TokenKind::Gt)
                }
            }
            other => {
                return Err(LexError {
                    message: format!("invalid character '{}' (U+{:04X})", other, other as u32),
                    location,
                });
            }
        };

        Ok(Token { kind, location })
    }

    /// Consume a trailing `=` when present and pick the compound form
    fn with_eq(&mut self, next: Option<char>, with: TokenKind, without: TokenKind) -> TokenKind {
        if next == Some('=') {
            self.advance();
            with
        } else {
            without
        }
    }

    fn identifier_or_keyword(&mut self, location: SourceLocation) -> Result<Token, LexError> {
        let mut ident = String::new();
        while let Some(ch) = self.peek() {
            if ch.is_alphanumeric() || ch == '_' {
                ident.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        // String prefixes: r"", f"", rf"", b"" ...
        if matches!(self.peek(), Some('"') | Some('\'')) {
            let lower = ident.to_ascii_lowercase();
            if matches!(
                lower.as_str(),
                "r" | "u" | "f" | "b" | "rf" | "fr" | "br" | "rb"
            ) {
                return self.string_literal(&lower, location);
            }
        }

        let kind = match ident.as_str() {
            "False" => TokenKind::False,
            "None" => TokenKind::None,
            "True" => TokenKind::True,
            "and" => TokenKind::And,
            "as" => TokenKind::As,
            "assert" => TokenKind::Assert,
            "break" => TokenKind::Break,
            "class" => TokenKind::Class,
            "continue" => TokenKind::Continue,
            "def" => TokenKind::Def,
            "del" => TokenKind::Del,
            "elif" => TokenKind::Elif,
            "else" => TokenKind::Else,
            "except" => TokenKind::Except,
            "finally" => TokenKind::Finally,
            "for" => TokenKind::For,
            "from" => TokenKind::From,
            "global" => TokenKind::Global,
            "if" => TokenKind::If,
            "import" => TokenKind::Import,
            "in" => TokenKind::In,
            "is" => TokenKind::Is,
            "lambda" => TokenKind::Lambda,
            "nonlocal" => TokenKind::Nonlocal,
            "not" => TokenKind::Not,
            "or" => TokenKind::Or,
            "pass" => TokenKind::Pass,
            "raise" => TokenKind::Raise,
            "return" => TokenKind::Return,
            "try" => TokenKind::Try,
            "while" => TokenKind::While,
            "with" => TokenKind::Unsupported("with"),
            "yield" => TokenKind::Unsupported("yield"),
            "async" => TokenKind::Unsupported("async"),
            "await" => TokenKind::Unsupported("await"),
            _ => TokenKind::Name(ident),
        };
        Ok(Token { kind, location })
    }

    fn number_literal(&mut self, location: SourceLocation) -> Result<Token, LexError> {
        let first = self.peek().unwrap_or('0');
        let second = self.peek_ahead(1).map(|c| c.to_ascii_lowercase());

        if first == '0' && matches!(second, Some('x') | Some('o') | Some('b')) {
            let radix = match second {
                Some('x') => 16,
                Some('o') => 8,
                _ => 2,
            };
            self.advance();
            self.advance();
            let mut digits = String::new();
            while let Some(ch) = self.peek() {
                if ch == '_' {
                    self.advance();
                } else if ch.is_digit(radix) {
                    digits.push(ch);
                    self.advance();
                } else {
                    break;
                }
            }
            let value = i64::from_str_radix(&digits, radix).map_err(|_| LexError {
                message: "invalid or too large integer literal".to_string(),
                location,
            })?;
            return Ok(Token {
                kind: TokenKind::Int(value),
                location,
            });
        }

        let mut text = String::new();
        let mut is_float = false;
        self.take_digits(&mut text);
        if self.peek() == Some('.') {
            is_float = true;
            text.push('.');
            self.advance();
            self.take_digits(&mut text);
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            let sign = self.peek_ahead(1);
            let digit_at = if matches!(sign, Some('+') | Some('-')) { 2 } else { 1 };
            if self.peek_ahead(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                text.push('e');
                self.advance();
                if let Some(s @ ('+' | '-')) = self.peek() {
                    text.push(s);
                    self.advance();
                }
                self.take_digits(&mut text);
            }
        }
        if matches!(self.peek(), Some('j') | Some('J')) {
            return Err(LexError {
                message: "complex numbers are not supported".to_string(),
                location,
            });
        }
        if self.peek().is_some_and(|c| c.is_alphabetic() || c == '_') {
            return Err(LexError {
                message: "invalid decimal literal".to_string(),
                location,
            });
        }

        let kind = if is_float {
            TokenKind::Float(text.parse::<f64>().map_err(|_| LexError {
                message: "invalid float literal".to_string(),
                location,
            })?)
        } else {
            TokenKind::Int(text.parse::<i64>().map_err(|_| LexError {
                message: "integer literal is too large".to_string(),
                location,
            })?)
        };
        Ok(Token { kind, location })
    }

    fn take_digits(&mut self, text: &mut String) {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                text.push(ch);
                self.advance();
            } else if ch == '_' && self.peek_ahead(1).is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Read a quoted literal; `prefix` is the lowercase string prefix (may be empty)
    fn string_literal(&mut self, prefix: &str, location: SourceLocation) -> Result<Token, LexError> {
        let raw = prefix.contains('r');
        let is_f = prefix.contains('f');
        if prefix.contains('b') {
            return Err(LexError {
                message: "bytes literals are not supported".to_string(),
                location,
            });
        }

        let quote = self.peek().unwrap_or('"');
        let triple = self.peek_ahead(1) == Some(quote) && self.peek_ahead(2) == Some(quote);
        let quote_len = if triple { 3 } else { 1 };
        for _ in 0..quote_len {
            self.advance();
        }

        let mut content = String::new();
        loop {
            match self.peek() {
                None => {
                    return Err(LexError {
                        message: if triple {
                            "unterminated triple-quoted string literal".to_string()
                        } else {
                            "unterminated string literal".to_string()
                        },
                        location,
                    });
                }
                Some('\n') if !triple => {
                    return Err(LexError {
                        message: format!(
                            "unterminated string literal (detected at line {})",
                            location.line
                        ),
                        location,
                    });
                }
                Some('\\') => {
                    content.push('\\');
                    self.advance();
                    if let Some(escaped) = self.peek() {
                        content.push(escaped);
                        self.advance();
                    }
                }
                Some(ch) if ch == quote => {
                    if !triple {
                        self.advance();
                        break;
                    }
                    if self.peek_ahead(1) == Some(quote) && self.peek_ahead(2) == Some(quote) {
                        self.advance();
                        self.advance();
                        self.advance();
                        break;
                    }
                    content.push(ch);
                    self.advance();
                }
                Some(ch) => {
                    content.push(ch);
                    self.advance();
                }
            }
        }

        if is_f {
            let segments = split_fstring(&content, raw, location)?;
            return Ok(Token {
                kind: TokenKind::FString(segments),
                location,
            });
        }

        let text = if raw {
            content
        } else {
            unescape(&content, location)?
        };
        Ok(Token {
            kind: TokenKind::Str(text),
            location,
        })
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_ahead(&self, n: usize) -> Option<char> {
        self.input.get(self.position + n).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.position += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }
}

/// Process backslash escapes in a non-raw literal
fn unescape(content: &str, location: SourceLocation) -> Result<String, LexError> {
    let mut out = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('a') => out.push('\x07'),
            Some('b') => out.push('\x08'),
            Some('f') => out.push('\x0c'),
            Some('v') => out.push('\x0b'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('\n') => {}
            Some('x') => out.push(hex_escape(&mut chars, 2, location)?),
            Some('u') => out.push(hex_escape(&mut chars, 4, location)?),
            Some('U') => out.push(hex_escape(&mut chars, 8, location)?),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    Ok(out)
}

fn hex_escape(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    len: usize,
    location: SourceLocation,
) -> Result<char, LexError> {
    let digits: String = (0..len).filter_map(|_| chars.next()).collect();
    u32::from_str_radix(&digits, 16)
        .ok()
        .filter(|_| digits.len() == len)
        .and_then(char::from_u32)
        .ok_or_else(|| LexError {
            message: format!("truncated \\{}XX escape", if len == 2 { 'x' } else { 'u' }),
            location,
        })
}

/// Split f-string content into literal runs and `{expr!c:spec}` fields
fn split_fstring(
    content: &str,
    raw: bool,
    location: SourceLocation,
) -> Result<Vec<FStringSegment>, LexError> {
    let chars: Vec<char> = content.chars().collect();
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut i = 0;

    let error = |message: &str| LexError {
        message: format!("f-string: {}", message),
        location,
    };

    while i < chars.len() {
        let ch = chars[i];
        if ch == '{' {
            if chars.get(i + 1) == Some(&'{') {
                literal.push('{');
                i += 2;
                continue;
            }
            if !literal.is_empty() {
                let text = if raw {
                    std::mem::take(&mut literal)
                } else {
                    unescape(&std::mem::take(&mut literal), location)?
                };
                segments.push(FStringSegment::Literal(text));
            }

            // Scan the expression up to a top-level '!', ':' or '}'
            i += 1;
            let start = i;
            let mut depth = 0usize;
            let mut in_quote: Option<char> = None;
            while i < chars.len() {
                let c = chars[i];
                if let Some(q) = in_quote {
                    if c == q {
                        in_quote = None;
                    }
                } else {
                    match c {
                        '\'' | '"' => in_quote = Some(c),
                        '(' | '[' | '{' => depth += 1,
                        ')' | ']' => depth = depth.saturating_sub(1),
                        '}' if depth > 0 => depth -= 1,
                        '}' | ':' if depth == 0 => break,
                        '!' if depth == 0 && chars.get(i + 1) != Some(&'=') => break,
                        _ => {}
                    }
                }
                i += 1;
            }
            let source: String = chars[start..i].iter().collect();
            if source.trim().is_empty() {
                return Err(error("empty expression not allowed"));
            }

            let mut conversion = None;
            if chars.get(i) == Some(&'!') {
                match chars.get(i + 1) {
                    Some(c @ ('r' | 's' | 'a')) => conversion = Some(*c),
                    _ => return Err(error("invalid conversion character")),
                }
                i += 2;
            }

            let mut format_spec = None;
            if chars.get(i) == Some(&':') {
                i += 1;
                let spec_start = i;
                while i < chars.len() && chars[i] != '}' {
                    i += 1;
                }
                format_spec = Some(chars[spec_start..i].iter().collect());
            }

            if chars.get(i) != Some(&'}') {
                return Err(error("expecting '}'"));
            }
            i += 1;

            segments.push(FStringSegment::Field {
                source,
                conversion,
                format_spec,
            });
            continue;
        }

        if ch == '}' {
            if chars.get(i + 1) == Some(&'}') {
                literal.push('}');
                i += 2;
                continue;
            }
            return Err(error("single '}' is not allowed"));
        }

        literal.push(ch);
        i += 1;
    }

    if !literal.is_empty() {
        let text = if raw {
            literal
        } else {
            unescape(&literal, location)?
        };
        segments.push(FStringSegment::Literal(text));
    }
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_simple_assignment() {
        let tokens = kinds("x = 1\n");
        assert_eq!(
            tokens,
            vec![
                TokenKind::Name("x".to_string()),
                TokenKind::Eq,
                TokenKind::Int(1),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_indent_and_dedent() {
        let tokens = kinds("if x:\n    y = 1\nz = 2");
        assert!(tokens.contains(&TokenKind::Indent));
        assert!(tokens.contains(&TokenKind::Dedent));
        let indent_pos = tokens.iter().position(|t| *t == TokenKind::Indent).unwrap();
        let dedent_pos = tokens.iter().position(|t| *t == TokenKind::Dedent).unwrap();
        assert!(indent_pos < dedent_pos);
    }

    #[test]
    fn test_blank_lines_and_comments_do_not_change_indentation() {
        let tokens = kinds("def f():\n    a = 1\n\n    # note\n    return a\n");
        assert_eq!(
            tokens.iter().filter(|t| **t == TokenKind::Indent).count(),
            1
        );
    }

    #[test]
    fn test_newlines_inside_brackets_are_joined() {
        let tokens = kinds("x = [1,\n     2]\n");
        assert_eq!(
            tokens.iter().filter(|t| **t == TokenKind::Newline).count(),
            1
        );
    }

    #[test]
    fn test_operators() {
        let tokens = kinds("a //= b ** c != d -> e");
        assert!(tokens.contains(&TokenKind::DoubleSlashEq));
        assert!(tokens.contains(&TokenKind::DoubleStar));
        assert!(tokens.contains(&TokenKind::NotEq));
        assert!(tokens.contains(&TokenKind::Arrow));
    }

    #[test]
    fn test_string_escapes_and_raw() {
        let tokens = kinds(r#"a = "x\ny" + r"\n""#);
        assert!(tokens.contains(&TokenKind::Str("x\ny".to_string())));
        assert!(tokens.contains(&TokenKind::Str("\\n".to_string())));
    }

    #[test]
    fn test_fstring_segments() {
        let tokens = kinds("f'a {x!r:>5} {{b}}'");
        match &tokens[0] {
            TokenKind::FString(segments) => {
                assert_eq!(segments[0], FStringSegment::Literal("a ".to_string()));
                assert_eq!(
                    segments[1],
                    FStringSegment::Field {
                        source: "x".to_string(),
                        conversion: Some('r'),
                        format_spec: Some(">5".to_string()),
                    }
                );
                assert_eq!(segments[2], FStringSegment::Literal(" {b}".to_string()));
            }
            other => panic!("Expected f-string, got {:?}", other),
        }
    }

    #[test]
    fn test_numbers() {
        let tokens = kinds("0x1F 1_000 2.5 1e3 .5");
        assert_eq!(tokens[0], TokenKind::Int(31));
        assert_eq!(tokens[1], TokenKind::Int(1000));
        assert_eq!(tokens[2], TokenKind::Float(2.5));
        assert_eq!(tokens[3], TokenKind::Float(1000.0));
        assert_eq!(tokens[4], TokenKind::Float(0.5));
    }

    #[test]
    fn test_bad_dedent_is_an_error() {
        let err = Lexer::new("if x:\n    y = 1\n  z = 2\n").tokenize().unwrap_err();
        assert!(err.message.contains("unindent"));
        assert_eq!(err.location.line, 3);
    }

    #[test]
    fn test_unterminated_string() {
        let err = Lexer::new("s = 'abc\n").tokenize().unwrap_err();
        assert!(err.message.contains("unterminated"));
    }
}
