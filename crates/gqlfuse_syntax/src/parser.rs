//! Recursive descent parser for GraphQL executable documents.
//!
//! Only operations built from fields are accepted; fragment definitions and
//! spreads are reported and skipped. Errors become diagnostics and parsing
//! continues after them.

use crate::ast::*;
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};
use gqlfuse_core::{codes, DiagnosticBag, Span};

/// Parser for GraphQL executable documents.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    diagnostics: DiagnosticBag,
}

/// Result of parsing.
#[derive(Debug)]
pub struct ParseResult {
    pub document: Document,
    pub diagnostics: DiagnosticBag,
}

/// Parses a source string into a document.
pub fn parse(source: &str) -> ParseResult {
    let mut parser = Parser::new(source);
    let document = parser.parse_document();
    ParseResult {
        document,
        diagnostics: parser.diagnostics,
    }
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token();
        Self {
            lexer,
            current,
            diagnostics: DiagnosticBag::new(),
        }
    }

    #[inline]
    fn at(&self) -> TokenKind {
        self.current.kind
    }

    #[inline]
    fn at_kind(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn advance(&mut self) {
        self.current = self.lexer.next_token();
    }

    /// Consumes `kind` if present; reports it as missing otherwise.
    fn expect(&mut self, kind: TokenKind) -> bool {
        if self.at_kind(kind) {
            self.advance();
            true
        } else {
            self.error_expected(kind.as_str());
            false
        }
    }

    fn current_text(&self) -> &'a str {
        self.lexer.span_text(self.current.span)
    }

    fn error_expected(&mut self, expected: &str) {
        let (code, found) = if self.at_kind(TokenKind::Eof) {
            (codes::UNEXPECTED_EOF, "end of input".to_string())
        } else {
            (codes::UNEXPECTED_TOKEN, format!("`{}`", self.current_text()))
        };
        self.diagnostics.error(
            code,
            "unexpected token",
            self.current.span,
            format!("expected {expected}, found {found}"),
        );
    }

    /// Parses a document.
    pub fn parse_document(&mut self) -> Document {
        let mut definitions = Vec::new();

        while !self.at_kind(TokenKind::Eof) {
            match self.at() {
                TokenKind::Query
                | TokenKind::Mutation
                | TokenKind::Subscription
                | TokenKind::LBrace => definitions.push(self.parse_operation()),
                TokenKind::Fragment => {
                    self.diagnostics.error(
                        codes::UNSUPPORTED_DEFINITION,
                        "fragments are not supported",
                        self.current.span,
                        "inline the fragment's fields into the operation",
                    );
                    self.skip_definition();
                }
                _ => {
                    self.error_expected("an operation");
                    self.advance();
                }
            }
        }

        Document { definitions }
    }

    /// Skips tokens up to and including the next balanced selection set.
    fn skip_definition(&mut self) {
        while !self.at_kind(TokenKind::LBrace) && !self.at_kind(TokenKind::Eof) {
            self.advance();
        }
        self.skip_braces();
    }

    fn skip_braces(&mut self) {
        if !self.at_kind(TokenKind::LBrace) {
            return;
        }
        let mut depth = 0usize;
        loop {
            match self.at() {
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace => {
                    depth -= 1;
                    if depth == 0 {
                        self.advance();
                        return;
                    }
                }
                TokenKind::Eof => return,
                _ => {}
            }
            self.advance();
        }
    }

    fn parse_name(&mut self) -> String {
        if self.at().is_name() {
            let name = self.current_text().to_string();
            self.advance();
            name
        } else {
            self.error_expected("a name");
            String::new()
        }
    }

    /// Parses an operation definition.
    fn parse_operation(&mut self) -> OperationDefinition {
        if self.at_kind(TokenKind::LBrace) {
            // Query shorthand: `{ viewer { id } }`
            let selection_set = self.parse_selection_set();
            let op = OperationDefinition::new(OperationKind::Query, selection_set);
            self.check_variable_usage(&op);
            return op;
        }

        let kind = match self.at() {
            TokenKind::Mutation => OperationKind::Mutation,
            TokenKind::Subscription => OperationKind::Subscription,
            _ => OperationKind::Query,
        };
        self.advance();

        let name = if self.at().is_name() {
            Some(self.parse_name())
        } else {
            None
        };

        let variables = if self.at_kind(TokenKind::LParen) {
            self.parse_variable_definitions()
        } else {
            Vec::new()
        };

        if self.at_kind(TokenKind::At) {
            let start = self.current.span;
            self.parse_directives();
            self.diagnostics.error(
                codes::UNSUPPORTED_DEFINITION,
                "operation directives are not supported",
                start,
                "move the directive onto a field",
            );
        }

        let selection_set = self.parse_selection_set();

        let op = OperationDefinition {
            kind,
            name,
            variables,
            selection_set,
        };
        self.check_variable_usage(&op);
        op
    }

    /// Warns about references to variables the operation never declares.
    fn check_variable_usage(&mut self, op: &OperationDefinition) {
        let mut reported: Vec<&str> = Vec::new();
        for name in op.variable_references() {
            if op.variable(name).is_none() && !reported.contains(&name) {
                reported.push(name);
                self.diagnostics.warning(
                    codes::UNDECLARED_VARIABLE,
                    "undeclared variable",
                    self.current.span,
                    format!("`${name}` is used but not declared"),
                );
            }
        }
    }

    fn parse_variable_definitions(&mut self) -> Vec<VariableDefinition> {
        self.advance(); // (
        let mut vars: Vec<VariableDefinition> = Vec::new();
        while !self.at_kind(TokenKind::RParen) && !self.at_kind(TokenKind::Eof) {
            let span = self.current.span;
            let before = self.lexer.pos();
            let var = self.parse_variable_definition();
            if vars.iter().any(|v| v.name == var.name) {
                self.diagnostics.error(
                    codes::DUPLICATE_VARIABLE,
                    "duplicate variable",
                    span,
                    format!("`${}` is declared more than once", var.name),
                );
            } else {
                vars.push(var);
            }
            if self.lexer.pos() == before {
                self.advance();
            }
        }
        self.expect(TokenKind::RParen);
        vars
    }

    fn parse_variable_definition(&mut self) -> VariableDefinition {
        self.expect(TokenKind::Dollar);
        let name = self.parse_name();
        self.expect(TokenKind::Colon);
        let ty = self.parse_type();

        let default_value = if self.at_kind(TokenKind::Eq) {
            self.advance();
            Some(self.parse_value(true))
        } else {
            None
        };

        VariableDefinition {
            name,
            ty,
            default_value,
        }
    }

    fn parse_type(&mut self) -> Type {
        let ty = if self.at_kind(TokenKind::LBracket) {
            self.advance();
            let inner = self.parse_type();
            self.expect(TokenKind::RBracket);
            Type::List(Box::new(inner))
        } else {
            Type::Named(self.parse_name())
        };

        if self.at_kind(TokenKind::Bang) {
            self.advance();
            Type::NonNull(Box::new(ty))
        } else {
            ty
        }
    }

    fn parse_directives(&mut self) -> Vec<Directive> {
        let mut directives = Vec::new();
        while self.at_kind(TokenKind::At) {
            self.advance();
            let name = self.parse_name();
            let arguments = self.parse_arguments();
            directives.push(Directive { name, arguments });
        }
        directives
    }

    fn parse_arguments(&mut self) -> Vec<Argument> {
        if !self.at_kind(TokenKind::LParen) {
            return Vec::new();
        }
        self.advance();
        let mut args = Vec::new();
        while !self.at_kind(TokenKind::RParen) && !self.at_kind(TokenKind::Eof) {
            let before = self.lexer.pos();
            let name = self.parse_name();
            self.expect(TokenKind::Colon);
            let value = self.parse_value(false);
            args.push(Argument { name, value });
            if self.lexer.pos() == before {
                self.advance();
            }
        }
        self.expect(TokenKind::RParen);
        args
    }

    /// Parses a value. Variables are rejected when `constant` is set.
    fn parse_value(&mut self, constant: bool) -> Value {
        let span = self.current.span;

        match self.at() {
            TokenKind::Dollar => {
                self.advance();
                let name = self.parse_name();
                if constant {
                    self.diagnostics.error(
                        codes::INVALID_SYNTAX,
                        "variable in constant value",
                        span,
                        format!("`${name}` cannot be used in a default value"),
                    );
                }
                Value::Variable(name)
            }
            TokenKind::IntLiteral => {
                let text = self.current_text();
                let value = match text.parse::<i64>() {
                    Ok(value) => value,
                    Err(_) => {
                        self.diagnostics.error(
                            codes::INVALID_LITERAL,
                            "integer out of range",
                            span,
                            format!("`{text}` does not fit in a 64-bit integer"),
                        );
                        0
                    }
                };
                self.advance();
                Value::Int(value)
            }
            TokenKind::FloatLiteral => {
                let text = self.current_text();
                let value = match text.parse::<f64>() {
                    Ok(value) if value.is_finite() => value,
                    _ => {
                        self.diagnostics.error(
                            codes::INVALID_LITERAL,
                            "float out of range",
                            span,
                            format!("`{text}` is not a finite 64-bit float"),
                        );
                        0.0
                    }
                };
                self.advance();
                Value::Float(value)
            }
            TokenKind::StringLiteral => {
                let value = self.unescape_string(span);
                self.advance();
                Value::String(value)
            }
            TokenKind::BlockStringLiteral => {
                let text = self.current_text();
                let value = block_string_value(&text[3..text.len() - 3]);
                self.advance();
                Value::String(value)
            }
            TokenKind::True => {
                self.advance();
                Value::Boolean(true)
            }
            TokenKind::False => {
                self.advance();
                Value::Boolean(false)
            }
            TokenKind::Null => {
                self.advance();
                Value::Null
            }
            TokenKind::LBracket => {
                self.advance();
                let mut values = Vec::new();
                while !self.at_kind(TokenKind::RBracket) && !self.at_kind(TokenKind::Eof) {
                    let before = self.lexer.pos();
                    values.push(self.parse_value(constant));
                    if self.lexer.pos() == before {
                        self.advance();
                    }
                }
                self.expect(TokenKind::RBracket);
                Value::List(values)
            }
            TokenKind::LBrace => {
                self.advance();
                let mut fields = Vec::new();
                while !self.at_kind(TokenKind::RBrace) && !self.at_kind(TokenKind::Eof) {
                    let before = self.lexer.pos();
                    let name = self.parse_name();
                    self.expect(TokenKind::Colon);
                    let value = self.parse_value(constant);
                    fields.push((name, value));
                    if self.lexer.pos() == before {
                        self.advance();
                    }
                }
                self.expect(TokenKind::RBrace);
                Value::Object(fields)
            }
            kind if kind.is_name() => Value::Enum(self.parse_name()),
            _ => {
                self.error_expected("a value");
                if !self.at_kind(TokenKind::Eof) {
                    self.advance();
                }
                Value::Null
            }
        }
    }

    /// Decodes the escapes of the string literal at `span`.
    fn unescape_string(&mut self, span: Span) -> String {
        let raw = self.current_text();
        let body = &raw[1..raw.len() - 1];
        let mut out = String::with_capacity(body.len());
        let mut chars = body.chars();

        while let Some(c) = chars.next() {
            if c != '\\' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('"') => out.push('"'),
                Some('\\') => out.push('\\'),
                Some('/') => out.push('/'),
                Some('b') => out.push('\u{8}'),
                Some('f') => out.push('\u{c}'),
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('t') => out.push('\t'),
                Some('u') => {
                    let hex: String = chars.by_ref().take(4).collect();
                    match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                        Some(decoded) if hex.len() == 4 => out.push(decoded),
                        _ => self.diagnostics.error(
                            codes::INVALID_LITERAL,
                            "invalid unicode escape",
                            span,
                            format!("`\\u{hex}` is not a valid escape"),
                        ),
                    }
                }
                other => self.diagnostics.error(
                    codes::INVALID_LITERAL,
                    "invalid escape",
                    span,
                    format!("`\\{}` is not a valid escape", other.unwrap_or(' ')),
                ),
            }
        }

        out
    }

    fn parse_selection_set(&mut self) -> SelectionSet {
        if !self.expect(TokenKind::LBrace) {
            return SelectionSet::default();
        }

        let mut fields = Vec::new();
        while !self.at_kind(TokenKind::RBrace) && !self.at_kind(TokenKind::Eof) {
            if self.at_kind(TokenKind::Spread) {
                self.diagnostics.error(
                    codes::UNSUPPORTED_SELECTION,
                    "fragment selections are not supported",
                    self.current.span,
                    "select the fields directly",
                );
                self.skip_fragment_selection();
                continue;
            }
            let before = self.lexer.pos();
            fields.push(self.parse_field());
            if self.lexer.pos() == before {
                self.advance();
            }
        }
        self.expect(TokenKind::RBrace);

        if fields.is_empty() {
            self.diagnostics.error(
                codes::INVALID_SYNTAX,
                "empty selection set",
                self.current.span,
                "a selection set must select at least one field",
            );
        }

        SelectionSet::new(fields)
    }

    /// Skips `...Name @dirs` or `... on Type @dirs { ... }`.
    fn skip_fragment_selection(&mut self) {
        self.advance(); // ...
        if self.at_kind(TokenKind::On) {
            self.advance();
            self.parse_name();
        } else if self.at().is_name() {
            self.advance();
        }
        self.parse_directives();
        self.skip_braces();
    }

    fn parse_field(&mut self) -> Field {
        let first = self.parse_name();
        let (alias, name) = if self.at_kind(TokenKind::Colon) {
            self.advance();
            (Some(first), self.parse_name())
        } else {
            (None, first)
        };

        let arguments = self.parse_arguments();
        let directives = self.parse_directives();

        let selection_set = if self.at_kind(TokenKind::LBrace) {
            Some(self.parse_selection_set())
        } else {
            None
        };

        Field {
            alias,
            name,
            arguments,
            directives,
            selection_set,
        }
    }
}

/// Applies the block string indentation rules to raw block string content.
fn block_string_value(raw: &str) -> String {
    let raw = raw.replace("\\\"\"\"", "\"\"\"");
    let lines: Vec<&str> = raw.lines().collect();

    let common_indent = lines
        .iter()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start_matches([' ', '\t']).len())
        .min()
        .unwrap_or(0);

    let mut out: Vec<&str> = lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                *line
            } else {
                line.get(common_indent..).unwrap_or("")
            }
        })
        .collect();

    while out.first().is_some_and(|line| line.trim().is_empty()) {
        out.remove(0);
    }
    while out.last().is_some_and(|line| line.trim().is_empty()) {
        out.pop();
    }

    out.join("\n")
}
